// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! PUB side

pub mod pub_socket;

pub use pub_socket::ZmqPub;
