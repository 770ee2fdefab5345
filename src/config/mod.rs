//! Application Configuration
//!
//! User settings stored in TOML format. Every section falls back to its
//! defaults, so a partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::capture::CaptureSettings;
use crate::narration::NarrationConfig;
use crate::stabilizer::{GeometryComparator, ScorerConfig, TrackerConfig};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture and per-tick settings
    pub capture: CaptureSettings,
    /// Phrase tracker thresholds and penalties
    pub tracker: TrackerConfig,
    /// Text quality weights and correction table
    pub scorer: ScorerConfig,
    /// Bounding box tolerances
    pub geometry: GeometryComparator,
    /// Speaking rate and de-duplication
    pub narration: NarrationConfig,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content).context("Failed to parse config")?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write config {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stabilizer::scorer::MatchAnchor;
    use crate::stabilizer::CorrectionRule;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // Check capture defaults
        assert_eq!(config.capture.language, "nl");
        assert_eq!(config.capture.poll_interval_ms, 600);
        assert_eq!(config.capture.confidence_threshold, 90);

        // Check tracker defaults
        assert_eq!(config.tracker.base_confidence, 100);
        assert_eq!(config.tracker.forced_emission_after, 5);
        assert_eq!(config.tracker.max_edit_distance, 10);

        // Check scorer defaults
        assert_eq!(config.scorer.corrections.len(), 10);
        assert_eq!(config.scorer.corrections[0].anchor, MatchAnchor::Prefix);

        // Check geometry and narration defaults
        assert!((config.geometry.width_tolerance - 5.0).abs() < 1e-9);
        assert!((config.narration.base_rate - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.capture.band_divisor, parsed.capture.band_divisor);
        assert_eq!(config.tracker.shrink_penalty, parsed.tracker.shrink_penalty);
        assert_eq!(config.scorer.corrections, parsed.scorer.corrections);
        assert_eq!(config.geometry, parsed.geometry);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [capture]
            confidence_threshold = 80
            quarter_frame = true

            [[scorer.corrections]]
            pattern = "rn"
            replacement = "m"
            penalty = 2
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.capture.confidence_threshold, 80);
        assert!(config.capture.quarter_frame);
        assert_eq!(config.capture.language, "nl");
        assert_eq!(config.tracker.forced_emission_after, 5);
        assert_eq!(config.scorer.stray_punctuation_weight, 3);
        assert_eq!(
            config.scorer.corrections,
            vec![CorrectionRule::anywhere("rn", "m", 2)]
        );
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.capture.poll_interval_ms = 400;
        config.narration.max_rate = 2.0;

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.capture.poll_interval_ms, 400);
        assert!((loaded.narration.max_rate - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
