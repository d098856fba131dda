//! Store configuration.

/// Environment variable that turns on verbose tracing.
pub const DEBUG_ENV: &str = "STATETREE_DEBUG";

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Emit `log::debug!` traces for reads, writes, fetches and invalidations.
    ///
    /// Never changes behavior.
    pub debug: bool,
}

impl StoreConfig {
    /// Read the configuration from the environment.
    ///
    /// `STATETREE_DEBUG` set to `1`, `true` or `yes` enables debug tracing.
    pub fn from_env() -> Self {
        let debug = std::env::var(DEBUG_ENV)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self { debug }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_off_by_default() {
        assert!(!StoreConfig::default().debug);
        assert!(StoreConfig::default().with_debug(true).debug);
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
