//! Configuration loading: TOML file, then command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use recon_model::ReconConfig;
use tracing::{debug, warn};

/// Flag values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub threshold: Option<f32>,
    pub fallback_command: Option<String>,
}

/// Load configuration from `path`; a missing file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<ReconConfig> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    if !path.exists() {
        warn!(path = %path.display(), "configuration file not found, using defaults");
        return Ok(ReconConfig::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("read configuration {}", path.display()))?;
    let config = parse_config(&text)
        .with_context(|| format!("parse configuration {}", path.display()))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<ReconConfig> {
    Ok(toml::from_str(text)?)
}

/// Apply command-line overrides on top of a loaded configuration.
pub fn apply_overrides(mut config: ReconConfig, overrides: &ConfigOverrides) -> ReconConfig {
    if let Some(threshold) = overrides.threshold {
        config.matcher = config.matcher.with_threshold(threshold);
    }
    if let Some(command) = &overrides.fallback_command {
        config.fallback.command = Some(command.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [matcher]
            acceptance_threshold = 0.4

            [cleaning]
            default_country = "Nepal"
            "#,
        )
        .unwrap();
        assert_eq!(config.matcher.acceptance_threshold, 0.4);
        assert_eq!(config.matcher.keyword_bonus, 0.3);
        assert_eq!(config.cleaning.default_country, "Nepal");
        assert_eq!(config.cleaning.default_currency, "INR");
        assert_eq!(config.fallback.timeout_ms, 5000);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("recon.toml"))).unwrap();
        assert_eq!(config, ReconConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.toml");
        fs::write(&path, "[matcher\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let config = apply_overrides(
            ReconConfig::default(),
            &ConfigOverrides {
                threshold: Some(0.55),
                fallback_command: Some("classify-header".into()),
            },
        );
        assert_eq!(config.matcher.acceptance_threshold, 0.55);
        assert_eq!(config.fallback.command.as_deref(), Some("classify-header"));
    }
}
