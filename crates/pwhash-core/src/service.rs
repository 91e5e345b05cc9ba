//! Hash/Verify protocol

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::HasherConfig;
use crate::error::Error;
use crate::kdf::{Argon2id, Kdf, KdfError, MAX_ASSOCIATED_DATA_LEN};
use crate::params::{ConfigError, CostParameters};
use crate::policy::{AllowAll, DosGate, MemoryIncreased, RehashPolicy};
use crate::record::{HashRecord, Salt, Tag, SALT_LEN, TAG_LEN};
use crate::store::ParameterStore;
use crate::Result;

/// Outcome of a successful verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verification {
    pub valid: bool,
    /// Only ever true together with `valid`
    pub rehash: bool,
}

/// Password hashing service
///
/// Stateless per call apart from the parameter store, so one instance is
/// shared behind an `Arc` by every request handler.
pub struct HashService<K = Argon2id> {
    kdf: K,
    store: ParameterStore,
    rehash: Box<dyn RehashPolicy>,
    gate: Box<dyn DosGate>,
}

impl HashService<Argon2id> {
    /// Argon2id service with the default policies
    pub fn new(params: CostParameters) -> Self {
        Self::with_kdf(Argon2id, params)
    }

    /// Build a service from configuration, installing a cost ceiling if one
    /// is configured
    pub fn from_config(config: &HasherConfig) -> std::result::Result<Self, ConfigError> {
        let service = Self::new(config.params()?);
        Ok(match config.ceiling() {
            Some(ceiling) => service.with_dos_gate(ceiling),
            None => service,
        })
    }
}

impl<K: Kdf> HashService<K> {
    pub fn with_kdf(kdf: K, params: CostParameters) -> Self {
        Self {
            kdf,
            store: ParameterStore::new(params),
            rehash: Box::new(MemoryIncreased),
            gate: Box::new(AllowAll),
        }
    }

    pub fn with_rehash_policy(mut self, policy: impl RehashPolicy + 'static) -> Self {
        self.rehash = Box::new(policy);
        self
    }

    pub fn with_dos_gate(mut self, gate: impl DosGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn kdf(&self) -> &K {
        &self.kdf
    }

    /// Parameters new hashes are issued with
    pub fn parameters(&self) -> CostParameters {
        self.store.current()
    }

    /// Validate and install new cost parameters, returning the previous ones
    ///
    /// Safe while requests are in flight: each call works with whichever
    /// snapshot it loaded.
    pub fn set_parameters(
        &self,
        time: u32,
        memory_kib: u32,
        parallelism: u8,
    ) -> std::result::Result<CostParameters, ConfigError> {
        let params = CostParameters::new(time, memory_kib, parallelism)?;
        Ok(self.replace_parameters(params))
    }

    pub fn replace_parameters(&self, params: CostParameters) -> CostParameters {
        let previous = self.store.replace(params);
        tracing::info!(%previous, current = %params, "Cost parameters rotated");
        previous
    }

    /// Hash a password under the current parameters with a fresh salt
    pub fn hash(&self, password: &[u8], pepper: &[u8]) -> Result<HashRecord> {
        self.hash_with_data(password, pepper, &[])
    }

    /// Hash a password bound to `associated_data`, which must be presented
    /// again on verification
    pub fn hash_with_data(&self, password: &[u8], pepper: &[u8], associated_data: &[u8]) -> Result<HashRecord> {
        check_associated_data(associated_data)?;
        let params = self.store.current();
        let salt = fresh_salt()?;

        let tag = self
            .derive(password, &salt, pepper, associated_data, &params)
            .map_err(Error::Kdf)?;

        Ok(HashRecord::new(params, salt, *tag))
    }

    /// Verify a password against untrusted record bytes
    pub fn verify(&self, password: &[u8], pepper: &[u8], record: &[u8]) -> Result<Verification> {
        self.verify_with_data(password, pepper, &[], record)
    }

    /// Verify a password hashed with [`hash_with_data`](Self::hash_with_data)
    pub fn verify_with_data(
        &self,
        password: &[u8],
        pepper: &[u8],
        associated_data: &[u8],
        record: &[u8],
    ) -> Result<Verification> {
        let record = HashRecord::decode(record)?;
        self.verify_record(password, pepper, associated_data, &record)
    }

    /// Verify a password against an already decoded record
    pub fn verify_record(
        &self,
        password: &[u8],
        pepper: &[u8],
        associated_data: &[u8],
        record: &HashRecord,
    ) -> Result<Verification> {
        check_associated_data(associated_data)?;
        let params = *record.params();

        if !self.gate.allow(&params) {
            tracing::warn!(%params, "Refusing to verify hash above cost limits");
            return Err(Error::CostRejected(params));
        }

        let expected = self
            .derive(password, record.salt(), pepper, associated_data, &params)
            .map_err(|e| match e {
                KdfError::Params(reason) => Error::UnusableParameters { params, reason },
                other => Error::Kdf(other),
            })?;

        let valid: bool = expected[..].ct_eq(&record.tag()[..]).into();

        // evaluated on both outcomes so timing does not depend on validity
        let rehash = self.rehash.should_rehash(&params, &self.store.current());

        Ok(Verification {
            valid,
            rehash: valid & rehash,
        })
    }

    fn derive(
        &self,
        password: &[u8],
        salt: &Salt,
        pepper: &[u8],
        associated_data: &[u8],
        params: &CostParameters,
    ) -> std::result::Result<Zeroizing<Tag>, KdfError> {
        let mut salted = Zeroizing::new(Vec::with_capacity(SALT_LEN + pepper.len()));
        salted.extend_from_slice(salt);
        salted.extend_from_slice(pepper);

        let mut tag = Zeroizing::new([0u8; TAG_LEN]);
        self.kdf.derive(password, &salted, associated_data, params, &mut tag[..])?;
        Ok(tag)
    }
}

fn check_associated_data(associated_data: &[u8]) -> Result<()> {
    if associated_data.len() > MAX_ASSOCIATED_DATA_LEN {
        return Err(Error::AssociatedDataTooLong(associated_data.len()));
    }
    Ok(())
}

fn fresh_salt() -> Result<Salt> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| Error::Entropy(e.to_string()))?;
    Ok(salt)
}
