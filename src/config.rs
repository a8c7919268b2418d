use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sequencer::SequencerConfig;
use crate::timing::{DEFAULT_TIME_SCALE, validate_scale};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hz
    pub sample_rate: u32,
    /// Frames per render block.
    pub block_size: usize,
    /// Slots in the control queue feeding the render thread.
    pub queue_capacity: usize,
    /// Sequencer ticks per second.
    pub time_scale: f64,
    /// Sleep one block period per block, so the loop runs at audio speed.
    pub realtime: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 64,
            queue_capacity: 1024,
            time_scale: DEFAULT_TIME_SCALE,
            realtime: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfiguration("sample_rate must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(Error::InvalidConfiguration("block_size must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "queue_capacity must be > 0".into(),
            ));
        }
        validate_scale(self.time_scale).map_err(|_| {
            Error::InvalidConfiguration(format!("invalid time_scale {}", self.time_scale))
        })?;
        Ok(())
    }

    pub fn sequencer(&self) -> SequencerConfig {
        SequencerConfig {
            time_scale: self.time_scale,
        }
    }

    /// Wall time covered by one block.
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let ron_string = fs::read_to_string(path)?;
        let config: EngineConfig = ron::from_str(&ron_string)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sequencer().time_scale, 1000.0);
    }

    #[test]
    fn rejects_zero_sizes_and_bad_scale() {
        let broken = [
            EngineConfig { sample_rate: 0, ..Default::default() },
            EngineConfig { block_size: 0, ..Default::default() },
            EngineConfig { queue_capacity: 0, ..Default::default() },
            EngineConfig { time_scale: 0.0, ..Default::default() },
            EngineConfig { time_scale: f64::NAN, ..Default::default() },
        ];
        for config in broken {
            assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn block_duration_follows_sample_rate() {
        let config = EngineConfig {
            sample_rate: 48000,
            block_size: 480,
            ..Default::default()
        };
        assert_eq!(config.block_duration(), std::time::Duration::from_millis(10));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("engine.ron");
        let config = EngineConfig {
            sample_rate: 48000,
            block_size: 128,
            queue_capacity: 32,
            time_scale: 480.0,
            realtime: false,
        };

        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: EngineConfig = ron::from_str("(block_size: 256)").unwrap();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.sample_rate, 44100);
    }

    #[test]
    fn load_reports_parse_and_validation_errors() {
        let dir = tempfile::tempdir().unwrap();

        let garbage = dir.path().join("garbage.ron");
        fs::write(&garbage, "(sample_rate: \"fast\")").unwrap();
        assert!(matches!(EngineConfig::load(&garbage), Err(Error::ConfigParse(_))));

        let invalid = dir.path().join("invalid.ron");
        fs::write(&invalid, "(queue_capacity: 0)").unwrap();
        assert!(matches!(
            EngineConfig::load(&invalid),
            Err(Error::InvalidConfiguration(_))
        ));

        let missing = dir.path().join("missing.ron");
        assert!(matches!(EngineConfig::load(&missing), Err(Error::Io(_))));
    }
}
