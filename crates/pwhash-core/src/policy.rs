//! Rehash and DOS-protection policies
//!
//! Both are small capability traits. Closures of the right shape implement
//! them directly, and stock implementations cover the common cases.

use serde::{Deserialize, Serialize};

use crate::params::CostParameters;

/// Decides whether a verified record should be reissued
///
/// Must be a pure function of its two arguments.
pub trait RehashPolicy: Send + Sync {
    fn should_rehash(&self, record: &CostParameters, current: &CostParameters) -> bool;
}

impl<F> RehashPolicy for F
where
    F: Fn(&CostParameters, &CostParameters) -> bool + Send + Sync,
{
    fn should_rehash(&self, record: &CostParameters, current: &CostParameters) -> bool {
        self(record, current)
    }
}

/// Rehash when the record used less memory than currently configured
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryIncreased;

impl RehashPolicy for MemoryIncreased {
    fn should_rehash(&self, record: &CostParameters, current: &CostParameters) -> bool {
        record.memory_kib() < current.memory_kib()
    }
}

/// Rehash when any cost field of the record is below the current one
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyCostIncreased;

impl RehashPolicy for AnyCostIncreased {
    fn should_rehash(&self, record: &CostParameters, current: &CostParameters) -> bool {
        record.time() < current.time()
            || record.memory_kib() < current.memory_kib()
            || record.parallelism() < current.parallelism()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRehash;

impl RehashPolicy for NeverRehash {
    fn should_rehash(&self, _record: &CostParameters, _current: &CostParameters) -> bool {
        false
    }
}

/// Admission check run on a record's parameters before any KDF work
pub trait DosGate: Send + Sync {
    fn allow(&self, params: &CostParameters) -> bool;
}

impl<F> DosGate for F
where
    F: Fn(&CostParameters) -> bool + Send + Sync,
{
    fn allow(&self, params: &CostParameters) -> bool {
        self(params)
    }
}

/// No protection: every record is verified
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl DosGate for AllowAll {
    fn allow(&self, _params: &CostParameters) -> bool {
        true
    }
}

/// Refuse records whose cost exceeds any configured ceiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCeiling {
    pub max_time: Option<u32>,
    pub max_memory_kib: Option<u32>,
    pub max_parallelism: Option<u8>,
}

impl CostCeiling {
    pub fn is_unbounded(&self) -> bool {
        self.max_time.is_none() && self.max_memory_kib.is_none() && self.max_parallelism.is_none()
    }
}

impl DosGate for CostCeiling {
    fn allow(&self, params: &CostParameters) -> bool {
        self.max_time.map_or(true, |max| params.time() <= max)
            && self.max_memory_kib.map_or(true, |max| params.memory_kib() <= max)
            && self.max_parallelism.map_or(true, |max| params.parallelism() <= max)
    }
}
