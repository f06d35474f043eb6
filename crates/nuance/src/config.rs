//! Configuration file loading for nuance.
//!
//! Reads `nuance.config.json` from the current working directory, or the
//! file given with `--config`.

use std::path::Path;

use nuance_calque::AnalyzerOptions;
use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const CONFIG_FILE: &str = "nuance.config.json";

/// Top-level nuance configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NuanceConfig {
    /// JSON Schema reference (for editor autocompletion).
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Analyzer tunables.
    #[serde(default)]
    pub analysis: AnalyzerOptions,
}

impl NuanceConfig {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Load the configuration from `path`, or from `nuance.config.json` in the
/// working directory when no path is given. A missing default file yields
/// defaults silently; an unreadable or malformed file yields a warning on
/// stderr and defaults.
pub fn load_config(path: Option<&Path>) -> NuanceConfig {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = std::env::current_dir().unwrap_or_default().join(CONFIG_FILE);
            if !default.exists() {
                return NuanceConfig::default();
            }
            default
        }
    };

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match NuanceConfig::from_json(&content) {
            Ok(config) => {
                tracing::debug!(path = %config_path.display(), "loaded config");
                config
            }
            Err(e) => {
                eprintln!(
                    "\x1b[33mWarning:\x1b[0m Failed to parse {}: {}",
                    config_path.display(),
                    e
                );
                NuanceConfig::default()
            }
        },
        Err(e) => {
            eprintln!(
                "\x1b[33mWarning:\x1b[0m Failed to read {}: {}",
                config_path.display(),
                e
            );
            NuanceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = NuanceConfig::from_json(
            r#"{ "$schema": "./schema.json", "analysis": { "maxColorDistance": 25 } }"#,
        )
        .unwrap();
        assert_eq!(config.schema.as_deref(), Some("./schema.json"));
        assert_eq!(config.analysis.max_color_distance, 25.0);
        assert!(config.analysis.is_excluded("@arguments"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = NuanceConfig::from_json("{}").unwrap();
        assert_eq!(config.analysis, AnalyzerOptions::default());
        assert!(NuanceConfig::from_json(r#"{ "analysis": 3 }"#).is_err());
    }

    #[test]
    fn test_missing_explicit_file_falls_back() {
        let config = load_config(Some(Path::new("/nonexistent/nuance.config.json")));
        assert_eq!(config.analysis, AnalyzerOptions::default());
    }
}
