//! Key derivation seam
//!
//! The service only needs `derive(password, salt, associated_data, params) -> tag`.
//! Production uses Argon2id; tests substitute counting doubles.

use argon2::{Algorithm, Argon2, AssociatedData, ParamsBuilder, Version};

use crate::params::CostParameters;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KdfError {
    /// The primitive refuses this parameter set
    #[error("unsupported KDF parameters: {0}")]
    Params(String),

    #[error("KDF failure: {0}")]
    Derive(String),
}

/// Longest associated data Argon2 accepts
pub const MAX_ASSOCIATED_DATA_LEN: usize = AssociatedData::MAX_LEN;

/// Memory-hard key derivation function
pub trait Kdf: Send + Sync {
    /// Fill `out` with the derived key for `password` and `salt`, bound to
    /// `associated_data` (empty when the caller has none)
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        associated_data: &[u8],
        params: &CostParameters,
        out: &mut [u8],
    ) -> Result<(), KdfError>;
}

/// Argon2id, version 0x13
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2id;

/// Argon2 needs at least 8 KiB of memory per lane
const MIN_MEMORY_PER_LANE: u32 = 8;

impl Kdf for Argon2id {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        associated_data: &[u8],
        params: &CostParameters,
        out: &mut [u8],
    ) -> Result<(), KdfError> {
        let lanes = u32::from(params.parallelism());
        let memory = params.memory_kib().max(MIN_MEMORY_PER_LANE * lanes);

        let data = AssociatedData::new(associated_data).map_err(|e| KdfError::Derive(e.to_string()))?;
        let argon_params = ParamsBuilder::new()
            .m_cost(memory)
            .t_cost(params.time())
            .p_cost(lanes)
            .output_len(out.len())
            .data(data)
            .build()
            .map_err(|e| KdfError::Params(e.to_string()))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
            .hash_password_into(password, salt, out)
            .map_err(|e| KdfError::Derive(e.to_string()))
    }
}

impl<K: Kdf + ?Sized> Kdf for std::sync::Arc<K> {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        associated_data: &[u8],
        params: &CostParameters,
        out: &mut [u8],
    ) -> Result<(), KdfError> {
        (**self).derive(password, salt, associated_data, params, out)
    }
}
