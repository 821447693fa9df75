//! Brix bands
//!
//! Half-open ranges: `[-inf, 9) A`, `[9, 12) B`, `[12, 15) C`, `[15, 18) D`,
//! `[18, inf) E`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered categorical brix label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BrixBand {
    A,
    B,
    C,
    D,
    E,
}

impl BrixBand {
    /// Band for a predicted brix value (NaN maps to A)
    pub fn from_brix(value: f64) -> Self {
        if !(value >= 9.0) {
            BrixBand::A
        } else if value < 12.0 {
            BrixBand::B
        } else if value < 15.0 {
            BrixBand::C
        } else if value < 18.0 {
            BrixBand::D
        } else {
            BrixBand::E
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrixBand::A => "A",
            BrixBand::B => "B",
            BrixBand::C => "C",
            BrixBand::D => "D",
            BrixBand::E => "E",
        }
    }
}

impl fmt::Display for BrixBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
