//! Resolution of values that can come from the command line or the config file.

use std::fmt;

/// Where a resolved value came from.
///
/// The CLI layer declares its flags without defaults so that an explicit flag
/// is never mistaken for "not given", even when it equals the default.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting<T> {
    /// Neither source provided a value.
    Unset,
    /// Given explicitly on the command line.
    Cli(T),
    /// Read from the config file.
    Config(T),
}

impl<T> Setting<T> {
    /// Merge the two sources; the command line wins.
    pub fn from_sources(cli: Option<T>, config: Option<T>) -> Self {
        match (cli, config) {
            (Some(value), _) => Self::Cli(value),
            (None, Some(value)) => Self::Config(value),
            (None, None) => Self::Unset,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Cli(value) | Self::Config(value) => Some(value),
            Self::Unset => None,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.value().unwrap_or(default)
    }

    /// Short label of the source, for logging.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Unset => "default",
            Self::Cli(_) => "cli",
            Self::Config(_) => "config",
        }
    }
}

impl<T: fmt::Display> fmt::Display for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "<unset>"),
            Self::Cli(value) => write!(f, "{value} (cli)"),
            Self::Config(value) => write!(f, "{value} (config)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wins_even_when_equal_to_default() {
        // Passing the default explicitly must still beat the config value.
        let setting = Setting::from_sources(Some(3.0), Some(1.0));
        assert_eq!(setting, Setting::Cli(3.0));
        assert_eq!(setting.source(), "cli");
        assert_eq!(setting.unwrap_or(9.0), 3.0);
    }

    #[test]
    fn test_config_used_when_cli_absent() {
        let setting = Setting::from_sources(None, Some("4x4"));
        assert_eq!(setting.source(), "config");
        assert_eq!(setting.unwrap_or("3x3"), "4x4");
    }

    #[test]
    fn test_unset_falls_back() {
        let setting: Setting<f64> = Setting::from_sources(None, None);
        assert!(!setting.is_set());
        assert_eq!(setting.to_string(), "<unset>");
        assert_eq!(setting.unwrap_or(0.1), 0.1);
    }
}
