//! `--debug-<crate>` flags and the `RIPELINE_DEBUG` variable

use std::collections::BTreeSet;
use std::env;

use crate::{crate_target, KNOWN_CRATES};

const FLAG_PREFIX: &str = "--debug-";
const DEBUG_ENV: &str = "RIPELINE_DEBUG";

/// Which crates log at `debug`, plus the level for everything else
///
/// ```rust
/// use ripeline_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-ripeline-sessions".to_string()]);
/// assert!(flags.is_enabled("ripeline-sessions"));
/// assert_eq!(flags.to_filter_string(), "ripeline_sessions=debug,info");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    enabled: BTreeSet<String>,
    base_level: Option<String>,
}

impl CrateDebugFlags {
    /// Picks `--debug-<crate>` and `--debug-all` out of an argument list;
    /// everything else is ignored
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if let Some(name) = arg.strip_prefix(FLAG_PREFIX) {
                flags.enable(name);
            }
        }
        flags
    }

    /// Adds crates from a comma-separated list such as `ripeline-sessions,all`
    pub fn merge_list(&mut self, list: &str) {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .for_each(|name| self.enable(name));
    }

    fn enable(&mut self, name: &str) {
        if name == "all" {
            self.enabled
                .extend(KNOWN_CRATES.iter().map(|known| known.to_string()));
        } else {
            self.enabled.insert(name.to_string());
        }
    }

    /// Level for crates without a flag; `info` when unset
    pub fn with_base_level(mut self, level: impl Into<String>) -> Self {
        self.base_level = Some(level.into());
        self
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled.contains(crate_name)
    }

    pub fn enabled_crates(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }

    /// `EnvFilter` directive, e.g. `ripeline_inference=debug,ripeline_sessions=debug,warn`
    pub fn to_filter_string(&self) -> String {
        let base = self
            .base_level
            .as_deref()
            .unwrap_or("info")
            .to_lowercase();

        self.enabled
            .iter()
            .map(|name| format!("{}=debug", crate_target(name)))
            .chain(std::iter::once(base))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Flags from the process arguments merged with `RIPELINE_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(list) = env::var(DEBUG_ENV) {
        flags.merge_list(&list);
    }
    flags
}

/// Appended to `--help`
pub fn debug_flags_help() -> String {
    format!(
        "Debug Flags:\n  \
         --debug-all              Debug logging for every crate\n  \
         --debug-<crate>          Debug logging for one crate\n\n\
         Crates: {}\n\n\
         {}=<crate>[,<crate>] or {}=all has the same effect\n",
        KNOWN_CRATES.join(", "),
        DEBUG_ENV,
        DEBUG_ENV
    )
}
