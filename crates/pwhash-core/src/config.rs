//! Hasher configuration

use serde::{Deserialize, Serialize};

use crate::params::{ConfigError, CostParameters};
use crate::policy::CostCeiling;

/// Default memory cost (64 MiB)
pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;

/// Cost parameters and verification limits for a hasher instance
///
/// Stored as JSON:
/// ```json
/// { "time": 1, "memory_kib": 65536, "parallelism": 4, "max_memory_kib": 1048576 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// Argon2 passes over memory
    #[serde(default = "default_time")]
    pub time: u32,
    /// Argon2 memory size in KiB
    #[serde(default = "default_memory")]
    pub memory_kib: u32,
    /// Argon2 lanes
    #[serde(default = "default_parallelism")]
    pub parallelism: u8,
    /// Refuse to verify hashes with more passes than this
    #[serde(default)]
    pub max_time: Option<u32>,
    /// Refuse to verify hashes needing more memory than this
    #[serde(default)]
    pub max_memory_kib: Option<u32>,
    /// Refuse to verify hashes with more lanes than this
    #[serde(default)]
    pub max_parallelism: Option<u8>,
}

fn default_time() -> u32 {
    1
}

fn default_memory() -> u32 {
    DEFAULT_MEMORY_KIB
}

/// Half the available CPUs, rounded up
fn default_parallelism() -> u8 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    ((1 + cpus) / 2).clamp(1, u8::MAX as usize) as u8
}

impl HasherConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validated cost parameters for new hashes
    pub fn params(&self) -> Result<CostParameters, ConfigError> {
        CostParameters::new(self.time, self.memory_kib, self.parallelism)
    }

    /// Verification ceiling, if any limit is set
    pub fn ceiling(&self) -> Option<CostCeiling> {
        let ceiling = CostCeiling {
            max_time: self.max_time,
            max_memory_kib: self.max_memory_kib,
            max_parallelism: self.max_parallelism,
        };
        (!ceiling.is_unbounded()).then_some(ceiling)
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            time: default_time(),
            memory_kib: default_memory(),
            parallelism: default_parallelism(),
            max_time: None,
            max_memory_kib: None,
            max_parallelism: None,
        }
    }
}
