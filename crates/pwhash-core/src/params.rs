//! Argon2id cost parameters

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rejected cost configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("time cost must be at least 1, got {0}")]
    InvalidTime(u32),

    #[error("parallelism must be at least 1, got {0}")]
    InvalidParallelism(u8),
}

/// Argon2id cost triple
///
/// `time` is the number of passes over memory, `memory_kib` the memory size
/// in KiB and `parallelism` the number of lanes. Both `time` and
/// `parallelism` are at least 1; the only way to build a value is through
/// [`CostParameters::new`], so every instance in circulation is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCostParameters")]
pub struct CostParameters {
    time: u32,
    memory_kib: u32,
    parallelism: u8,
}

impl CostParameters {
    /// Validate and build a cost triple. Values are never clamped.
    pub fn new(time: u32, memory_kib: u32, parallelism: u8) -> Result<Self, ConfigError> {
        if time < 1 {
            return Err(ConfigError::InvalidTime(time));
        }
        if parallelism < 1 {
            return Err(ConfigError::InvalidParallelism(parallelism));
        }
        Ok(Self {
            time,
            memory_kib,
            parallelism,
        })
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn parallelism(&self) -> u8 {
        self.parallelism
    }
}

impl fmt::Display for CostParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={},m={}KiB,p={}",
            self.time, self.memory_kib, self.parallelism
        )
    }
}

/// Unvalidated wire shape, checked on the way in
#[derive(Deserialize)]
struct RawCostParameters {
    time: u32,
    memory_kib: u32,
    parallelism: u8,
}

impl TryFrom<RawCostParameters> for CostParameters {
    type Error = ConfigError;

    fn try_from(raw: RawCostParameters) -> Result<Self, Self::Error> {
        CostParameters::new(raw.time, raw.memory_kib, raw.parallelism)
    }
}
