//! Cost-parameter prefix codec
//!
//! The first byte of every prefix carries a unary version tag: the number of
//! consecutive low `1` bits before the first `0` bit. Version 0 is a clear
//! bit 0. Decoders read the version first and dispatch to the matching
//! layout, so a later version can extend the header without confusing an
//! older decoder, which simply refuses it.
//!
//! Version 0 layout, with `t = time - 1` and `p = parallelism - 1`:
//!
//! ```text
//! compact  (t <= 3, p <= 15):  0 t t p p p p 0              varint(memory)
//! extended:                    1 p p p p p p 0  varint(t)   varint(memory)
//! extended, p >= 0x3f:         1 1 1 1 1 1 1 0  p-0x3f  varint(t)  varint(memory)
//! ```
//!
//! Varints are unsigned LEB128 limited to 32 bits.

use crate::params::{ConfigError, CostParameters};

/// Longest LEB128 encoding of a `u32`
const MAX_VARINT_LEN32: usize = 5;

/// Longest version 0 prefix: header, overflow byte and two varints
pub const MAX_PREFIX_LEN: usize = 2 + 2 * MAX_VARINT_LEN32;

/// Largest `time - 1` that fits the compact header
const COMPACT_MAX_TIME: u32 = 0x03;

/// Largest `parallelism - 1` that fits the compact header
const COMPACT_MAX_LANES: u8 = 0x0f;

/// Extended-header lane field value meaning "one overflow byte follows"
const LANES_SENTINEL: u8 = 0x3f;

const EXTENDED_FLAG: u8 = 0x80;

/// Reasons a record or prefix can fail to decode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("record is empty")]
    Empty,

    #[error("unsupported record format version {0}")]
    UnsupportedVersion(u32),

    #[error("record truncated while reading {0}")]
    Truncated(&'static str),

    #[error("malformed {0} varint")]
    MalformedVarint(&'static str),

    #[error("parallelism overflow byte {0:#04x} exceeds 255 lanes")]
    ParallelismOverflow(u8),

    #[error("time cost overflows 32 bits")]
    TimeOverflow,

    #[error("invalid cost parameters: {0}")]
    Parameters(#[from] ConfigError),

    #[error("expected {expected} bytes of salt and tag, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    Hex(String),
}

/// Record format versions this decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    V0,
}

impl FormatVersion {
    /// Version written by [`encode_params`] for new records
    pub const CURRENT: FormatVersion = FormatVersion::V0;

    /// Unary tag value of this version
    pub fn tag(self) -> u32 {
        match self {
            FormatVersion::V0 => 0,
        }
    }

    /// Read the unary version tag from the first byte of a prefix
    pub fn detect(first: u8) -> Result<Self, DecodeError> {
        match (!first).trailing_zeros() {
            0 => Ok(FormatVersion::V0),
            n => Err(DecodeError::UnsupportedVersion(n)),
        }
    }
}

/// Append the prefix for `params` in the given format version
pub fn encode_params(version: FormatVersion, params: &CostParameters, buf: &mut Vec<u8>) {
    match version {
        FormatVersion::V0 => v0::encode(params, buf),
    }
}

/// Decode a prefix, returning its version, parameters and the remaining bytes
pub fn decode_params(buf: &[u8]) -> Result<(FormatVersion, CostParameters, &[u8]), DecodeError> {
    let first = *buf.first().ok_or(DecodeError::Empty)?;
    match FormatVersion::detect(first)? {
        FormatVersion::V0 => {
            let (params, rest) = v0::decode(buf)?;
            Ok((FormatVersion::V0, params, rest))
        }
    }
}

mod v0 {
    use super::*;

    pub(super) fn encode(params: &CostParameters, buf: &mut Vec<u8>) {
        let time = params.time() - 1;
        let lanes = params.parallelism() - 1;

        if time <= COMPACT_MAX_TIME && lanes <= COMPACT_MAX_LANES {
            buf.push(((time as u8) << 5) | (lanes << 1));
        } else {
            if lanes < LANES_SENTINEL {
                buf.push(EXTENDED_FLAG | (lanes << 1));
            } else {
                buf.push(EXTENDED_FLAG | (LANES_SENTINEL << 1));
                buf.push(lanes - LANES_SENTINEL);
            }
            put_varint32(buf, time);
        }

        put_varint32(buf, params.memory_kib());
    }

    pub(super) fn decode(buf: &[u8]) -> Result<(CostParameters, &[u8]), DecodeError> {
        let (&header, mut rest) = buf.split_first().ok_or(DecodeError::Empty)?;

        let (time, lanes) = if header & EXTENDED_FLAG == 0 {
            (u32::from(header >> 5), (header >> 1) & COMPACT_MAX_LANES)
        } else {
            let mut lanes = (header >> 1) & LANES_SENTINEL;
            if lanes == LANES_SENTINEL {
                let (&overflow, tail) = rest
                    .split_first()
                    .ok_or(DecodeError::Truncated("parallelism overflow"))?;
                lanes = LANES_SENTINEL
                    .checked_add(overflow)
                    .filter(|l| *l < u8::MAX)
                    .ok_or(DecodeError::ParallelismOverflow(overflow))?;
                rest = tail;
            }
            let (time, tail) = take_varint32(rest, "time")?;
            rest = tail;
            (time, lanes)
        };

        let (memory_kib, rest) = take_varint32(rest, "memory")?;

        let time = time.checked_add(1).ok_or(DecodeError::TimeOverflow)?;
        let params = CostParameters::new(time, memory_kib, lanes + 1)?;
        Ok((params, rest))
    }
}

fn put_varint32(buf: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn take_varint32<'a>(buf: &'a [u8], field: &'static str) -> Result<(u32, &'a [u8]), DecodeError> {
    let mut value = 0u32;
    for (i, &byte) in buf.iter().enumerate().take(MAX_VARINT_LEN32) {
        // the fifth byte may only contribute the top four bits
        if i == MAX_VARINT_LEN32 - 1 && byte > 0x0f {
            return Err(DecodeError::MalformedVarint(field));
        }
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, &buf[i + 1..]));
        }
    }
    Err(DecodeError::Truncated(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn params(time: u32, memory_kib: u32, parallelism: u8) -> CostParameters {
        CostParameters::new(time, memory_kib, parallelism).unwrap()
    }

    fn encode(p: &CostParameters) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_params(FormatVersion::CURRENT, p, &mut buf);
        buf
    }

    fn roundtrip(p: CostParameters) {
        let mut buf = encode(&p);
        assert!(buf.len() <= MAX_PREFIX_LEN, "{} encoded to {} bytes", p, buf.len());
        buf.extend_from_slice(b"trailer");
        let (version, decoded, rest) = decode_params(&buf).unwrap();
        assert_eq!(version, FormatVersion::V0);
        assert_eq!(decoded, p);
        assert_eq!(rest, b"trailer");
    }

    #[test]
    fn test_compact_layout() {
        assert_eq!(encode(&params(1, 0, 1)), vec![0x00, 0x00]);
        assert_eq!(encode(&params(2, 65536, 4)), vec![0x26, 0x80, 0x80, 0x04]);
        assert_eq!(encode(&params(4, 1, 16)), vec![0x7e, 0x01]);
    }

    #[test]
    fn test_extended_layout() {
        assert_eq!(encode(&params(5, 1, 1)), vec![0x80, 0x04, 0x01]);
        assert_eq!(encode(&params(1, 0, 17)), vec![0xa0, 0x00, 0x00]);
        assert_eq!(encode(&params(1, 0, 63)), vec![0xfc, 0x00, 0x00]);
    }

    #[test]
    fn test_parallelism_overflow_layout() {
        assert_eq!(encode(&params(1, 0, 64)), vec![0xfe, 0x00, 0x00, 0x00]);
        assert_eq!(encode(&params(1, 0, 255)), vec![0xfe, 0xbf, 0x00, 0x00]);
    }

    #[test]
    fn test_roundtrip_extremes() {
        roundtrip(params(1, 0, 1));
        roundtrip(params(1, 1, 1));
        roundtrip(params(4, 64 * 1024, 16));
        roundtrip(params(5, 64 * 1024, 16));
        roundtrip(params(4, 64 * 1024, 17));
        roundtrip(params(1, 0, 63));
        roundtrip(params(1, 0, 64));
        roundtrip(params(1, 0, 255));
        roundtrip(params(u32::MAX, 0, 1));
        roundtrip(params(1, u32::MAX, 1));
        roundtrip(params(u32::MAX, u32::MAX, 255));
    }

    #[test]
    fn test_max_prefix_len_is_tight() {
        assert_eq!(encode(&params(u32::MAX, u32::MAX, 255)).len(), MAX_PREFIX_LEN);
    }

    #[test]
    fn test_roundtrip_random() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        for _ in 0..10_000 {
            let time = rng.gen_range(1..=u32::MAX);
            let memory = rng.gen::<u32>();
            let lanes = rng.gen_range(1..=u8::MAX);
            roundtrip(params(time, memory, lanes));
        }
        for time in 1..=8 {
            for lanes in 1..=u8::MAX {
                roundtrip(params(time, 19 * 1024, lanes));
            }
        }
    }

    #[test]
    fn test_version_detection() {
        assert_eq!(FormatVersion::detect(0x00), Ok(FormatVersion::V0));
        assert_eq!(FormatVersion::detect(0xfe), Ok(FormatVersion::V0));
        assert_eq!(FormatVersion::detect(0x01), Err(DecodeError::UnsupportedVersion(1)));
        assert_eq!(FormatVersion::detect(0x03), Err(DecodeError::UnsupportedVersion(2)));
        assert_eq!(FormatVersion::detect(0x7f), Err(DecodeError::UnsupportedVersion(7)));
        assert_eq!(FormatVersion::detect(0xff), Err(DecodeError::UnsupportedVersion(8)));
    }

    #[test]
    fn test_rejects_empty_and_unknown_version() {
        assert_eq!(decode_params(&[]), Err(DecodeError::Empty));
        assert_eq!(
            decode_params(&[0x01, 0x00]),
            Err(DecodeError::UnsupportedVersion(1))
        );
    }

    #[test]
    fn test_rejects_truncation() {
        assert_eq!(decode_params(&[0x26]), Err(DecodeError::Truncated("memory")));
        assert_eq!(
            decode_params(&[0x26, 0x80, 0x80]),
            Err(DecodeError::Truncated("memory"))
        );
        assert_eq!(decode_params(&[0x80]), Err(DecodeError::Truncated("time")));
        assert_eq!(
            decode_params(&[0xfe]),
            Err(DecodeError::Truncated("parallelism overflow"))
        );
    }

    #[test]
    fn test_rejects_wide_varints() {
        assert_eq!(
            decode_params(&[0x80, 0xff, 0xff, 0xff, 0xff, 0x10, 0x00]),
            Err(DecodeError::MalformedVarint("time"))
        );
        assert_eq!(
            decode_params(&[0x00, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(DecodeError::MalformedVarint("memory"))
        );
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert_eq!(
            decode_params(&[0xfe, 0xc0, 0x00, 0x00]),
            Err(DecodeError::ParallelismOverflow(0xc0))
        );
        assert_eq!(
            decode_params(&[0x80, 0xff, 0xff, 0xff, 0xff, 0x0f, 0x00]),
            Err(DecodeError::TimeOverflow)
        );
    }

    #[test]
    fn test_accepts_non_minimal_extended_header() {
        // extended form is valid even when the compact form would fit
        let (_, decoded, rest) = decode_params(&[0x86, 0x01, 0x80, 0x02]).unwrap();
        assert_eq!(decoded, params(2, 256, 4));
        assert!(rest.is_empty());
    }
}
