use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ScullError};

/// Load-time parameters of the scull devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quantum: usize,
    pub qset: usize,
    pub nr_devs: usize,
    pub minor: u32,
    pub max_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quantum: storage::DEFAULT_QUANTUM,
            qset: storage::DEFAULT_QSET,
            nr_devs: 4,
            minor: 0,
            max_bytes: 0, // unlimited
        }
    }
}

impl Config {
    pub fn new(quantum: usize, qset: usize, nr_devs: usize) -> Self {
        Self {
            quantum,
            qset,
            nr_devs,
            ..Self::default()
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nr_devs == 0 {
            return Err(ScullError::InvalidConfig(
                "nr_devs must be at least 1".to_string(),
            ));
        }

        storage::Geometry::new(self.quantum, self.qset)
            .map_err(|e| ScullError::InvalidConfig(e.to_string()))?;

        Ok(())
    }

    /// Bytes addressed by one quantum set.
    pub fn segment_span(&self) -> u64 {
        self.quantum as u64 * self.qset as u64
    }
}

impl From<Config> for storage::StoreConfig {
    fn from(config: Config) -> Self {
        storage::StoreConfig::new(config.quantum, config.qset).max_bytes(config.max_bytes)
    }
}

impl From<Config> for device::Config {
    fn from(config: Config) -> Self {
        device::Config {
            nr_devs: config.nr_devs,
            first_minor: config.minor,
            store: config.into(),
        }
    }
}
