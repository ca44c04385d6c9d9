//! User configuration from ~/.witr/config.toml

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use witr_core::WarningPolicy;

/// Top-level configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output settings
    pub output: OutputConfig,
    /// Warning thresholds
    pub policy: WarningPolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Disable colored output by default
    pub no_color: bool,
    /// Use JSON output by default
    pub json: bool,
    /// Use short output by default
    pub short: bool,
    /// Use tree output by default
    pub tree: bool,
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".witr").join("config.toml"))
}

/// Load configuration from the default location
pub fn load_config() -> Config {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Config::default(),
    }
}

/// Load configuration from a file, falling back to defaults
///
/// A missing file is normal; an unreadable or malformed one is logged and
/// ignored.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read config file");
            return Config::default();
        }
    };

    match toml::from_str(&content) {
        Ok(config) => {
            debug!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            Config::default()
        }
    }
}

/// Generate a sample config file content
pub fn sample_config() -> &'static str {
    r#"# witr configuration file
# Place this file at ~/.witr/config.toml

[output]
# Disable colored output
no_color = false
# Use JSON output by default
json = false
# Use short (one-line) output by default
short = false
# Use tree view by default
tree = false

[policy]
# Warn about processes running longer than this many days
stale_after_days = 90
# Warn when one command appears at least this many times
restart_threshold = 5
# How declared service names are compared with commands: "fuzzy" or "exact"
identity_match = "fuzzy"
# Working directories under these paths are reported as suspicious
suspicious_dirs = ["/tmp", "/var/tmp", "/dev/shm", "/private/tmp"]
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use witr_core::IdentityMatch;

    #[test]
    fn test_sample_config_matches_defaults() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        assert!(!config.output.json);
        assert_eq!(config.policy, WarningPolicy::default());
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [output]
            tree = true

            [policy]
            identity_match = "exact"
            "#,
        )
        .unwrap();
        assert!(config.output.tree);
        assert!(!config.output.short);
        assert_eq!(config.policy.identity_match, IdentityMatch::Exact);
        assert_eq!(config.policy.restart_threshold, 5);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from(Path::new("/nonexistent/witr/config.toml"));
        assert_eq!(config.policy, WarningPolicy::default());
    }
}
