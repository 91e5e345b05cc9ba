//! Hash record: `prefix || salt || tag`

use std::fmt;

use crate::codec::{decode_params, encode_params, DecodeError, FormatVersion, MAX_PREFIX_LEN};
use crate::params::CostParameters;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// KDF output length in bytes
pub const TAG_LEN: usize = 16;

pub type Salt = [u8; SALT_LEN];
pub type Tag = [u8; TAG_LEN];

/// A decoded password hash
///
/// Returned by `hash` and consumed by `verify`; the service keeps no
/// reference to it.
#[derive(Clone, PartialEq, Eq)]
pub struct HashRecord {
    version: FormatVersion,
    params: CostParameters,
    salt: Salt,
    tag: Tag,
}

impl HashRecord {
    /// Build a record in the current format version
    pub fn new(params: CostParameters, salt: Salt, tag: Tag) -> Self {
        Self {
            version: FormatVersion::CURRENT,
            params,
            salt,
            tag,
        }
    }

    /// Decode untrusted record bytes
    ///
    /// Anything other than one well-formed prefix followed by exactly
    /// `SALT_LEN + TAG_LEN` bytes is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (version, params, rest) = decode_params(bytes)?;
        if rest.len() != SALT_LEN + TAG_LEN {
            return Err(DecodeError::Length {
                expected: SALT_LEN + TAG_LEN,
                actual: rest.len(),
            });
        }

        let (salt, tag) = rest.split_at(SALT_LEN);
        let mut record = Self {
            version,
            params,
            salt: [0; SALT_LEN],
            tag: [0; TAG_LEN],
        };
        record.salt.copy_from_slice(salt);
        record.tag.copy_from_slice(tag);
        Ok(record)
    }

    /// Decode a hex-encoded record
    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| DecodeError::Hex(e.to_string()))?;
        Self::decode(&bytes)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_PREFIX_LEN + SALT_LEN + TAG_LEN);
        encode_params(self.version, &self.params, &mut buf);
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.tag);
        buf
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn params(&self) -> &CostParameters {
        &self.params
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }
}

impl fmt::Debug for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRecord")
            .field("version", &self.version)
            .field("params", &self.params)
            .field("salt", &hex::encode(self.salt))
            .finish_non_exhaustive()
    }
}
