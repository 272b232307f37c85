//! Generation parameters, loaded once before a pass from a TOML file.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Upper bound on noise octaves; more than this adds nothing visible and
/// lets the amplitude sum drift toward denormals.
pub const MAX_OCTAVES: u32 = 16;

pub const DEFAULT_MAX_OPS_PER_SLOT: usize = 32_768;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid generation settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TerrainSettings {
    pub iterations: u32,
    pub persistance: f32,
    pub scale: f32,
    pub low: f32,
    pub high: f32,
    #[serde(default)]
    pub seed: u32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            iterations: 4,
            persistance: 0.5,
            scale: 50.0,
            low: 0.0,
            high: 64.0,
            seed: 0,
        }
    }
}

impl TerrainSettings {
    /// Heights are stored as `u16`, so `[low, high]` must fit inside it;
    /// values outside are refused here rather than clamped later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 || self.iterations > MAX_OCTAVES {
            return Err(ConfigError::Invalid(format!(
                "iterations must be in 1..={MAX_OCTAVES}, got {}",
                self.iterations
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scale must be finite and positive, got {}",
                self.scale
            )));
        }
        if !self.persistance.is_finite() || self.persistance <= 0.0 || self.persistance > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "persistance must be in (0, 1], got {}",
                self.persistance
            )));
        }
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(ConfigError::Invalid("low and high must be finite".to_string()));
        }
        if self.low < 0.0 || self.high > f32::from(u16::MAX) || self.low > self.high {
            return Err(ConfigError::Invalid(format!(
                "height range [{}, {}] must satisfy 0 <= low <= high <= {}",
                self.low,
                self.high,
                u16::MAX
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PipelineSettings {
    /// `None` sizes the pool to the available cores.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_max_ops_per_slot")]
    pub max_ops_per_slot: usize,
}

fn default_max_ops_per_slot() -> usize {
    DEFAULT_MAX_OPS_PER_SLOT
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_ops_per_slot: DEFAULT_MAX_OPS_PER_SLOT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct GenConfig {
    pub terrain: TerrainSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl GenConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: GenConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        info!("Loaded generation settings from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        if self.pipeline.worker_threads == Some(0) {
            return Err(ConfigError::Invalid(
                "worker_threads must be at least 1 when set".to_string(),
            ));
        }
        if self.pipeline.max_ops_per_slot == 0 {
            return Err(ConfigError::Invalid(
                "max_ops_per_slot must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ConfigError, GenConfig, TerrainSettings, DEFAULT_MAX_OPS_PER_SLOT};

    #[test]
    fn parses_full_config() {
        let config = GenConfig::from_toml_str(
            r#"
            [terrain]
            iterations = 3
            persistance = 0.5
            scale = 50.0
            low = 0.0
            high = 10.0
            seed = 7

            [pipeline]
            worker_threads = 2
            max_ops_per_slot = 64
            "#,
        )
        .expect("valid config");

        assert_eq!(config.terrain.iterations, 3);
        assert_eq!(config.terrain.seed, 7);
        assert_eq!(config.pipeline.worker_threads, Some(2));
        assert_eq!(config.pipeline.max_ops_per_slot, 64);
    }

    #[test]
    fn pipeline_section_and_seed_are_optional() {
        let config = GenConfig::from_toml_str(
            r#"
            [terrain]
            iterations = 1
            persistance = 0.5
            scale = 50.0
            low = 0.0
            high = 10.0
            "#,
        )
        .expect("valid config");

        assert_eq!(config.terrain.seed, 0);
        assert_eq!(config.pipeline.worker_threads, None);
        assert_eq!(config.pipeline.max_ops_per_slot, DEFAULT_MAX_OPS_PER_SLOT);
    }

    #[test]
    fn missing_terrain_field_is_a_parse_error() {
        let err = GenConfig::from_toml_str("[terrain]\niterations = 1\n").expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let base = TerrainSettings::default();
        assert!(base.validate().is_ok());

        let cases = [
            TerrainSettings { iterations: 0, ..base },
            TerrainSettings { iterations: 17, ..base },
            TerrainSettings { scale: 0.0, ..base },
            TerrainSettings { persistance: f32::NAN, ..base },
            TerrainSettings { low: -1.0, ..base },
            TerrainSettings { high: 70_000.0, ..base },
            TerrainSettings { low: 20.0, high: 10.0, ..base },
        ];
        for settings in cases {
            let err = settings.validate().expect_err("invalid settings must fail");
            assert!(matches!(err, ConfigError::Invalid(_)), "{settings:?}");
        }
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = GenConfig::from_toml_str(include_str!("../../../strata.toml"))
            .expect("bundled config");
        assert_eq!(config.terrain, TerrainSettings::default());
    }

    #[test]
    fn zero_worker_threads_is_rejected() {
        let mut config = GenConfig::default();
        config.pipeline.worker_threads = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = GenConfig::load(Path::new("/nonexistent/strata/gen.toml")).expect_err("must fail");
        assert!(err.to_string().contains("/nonexistent/strata/gen.toml"));
    }
}
