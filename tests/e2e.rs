//! End-to-end integration tests for the hashing core
//!
//! Tests the full pipeline without a network: config -> service -> stored hex -> verify

use pwhash_core::{
    decode_params, AnyCostIncreased, CostParameters, ErrorKind, FormatVersion, HashRecord, HashService,
    HasherConfig, SALT_LEN, TAG_LEN,
};

fn config(time: u32, memory_kib: u32, parallelism: u8) -> HasherConfig {
    HasherConfig {
        time,
        memory_kib,
        parallelism,
        ..HasherConfig::default()
    }
}

/// Records survive a trip through storage as hex and still verify
#[test]
fn test_stored_hex_roundtrip_e2e() {
    let service = HashService::from_config(&config(1, 64, 1)).unwrap();

    let stored = service.hash(b"password", b"pepper").unwrap().to_hex();
    let loaded = HashRecord::from_hex(&stored).unwrap();

    let v = service.verify(b"password", b"pepper", &loaded.encode()).unwrap();
    assert!(v.valid);
    assert!(!v.rehash);
}

/// Config file on disk drives the service, including its ceiling
#[test]
fn test_config_file_e2e() {
    let temp_dir = std::env::temp_dir().join("pwhash-test-e2e");
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();

    let path = temp_dir.join("hasher.json");
    let mut cfg = config(2, 128, 1);
    cfg.max_memory_kib = Some(256);
    cfg.save(&path).unwrap();

    let loaded = HasherConfig::load(&path).unwrap();
    let service = HashService::from_config(&loaded).unwrap();
    assert_eq!(service.parameters(), CostParameters::new(2, 128, 1).unwrap());

    let record = service.hash(b"password", b"").unwrap();
    let bytes = record.encode();
    let (version, params, rest) = decode_params(&bytes).unwrap();
    assert_eq!(version, FormatVersion::V0);
    assert_eq!(params, *record.params());
    assert_eq!(rest.len(), SALT_LEN + TAG_LEN);

    // a stored hash above the ceiling is refused, not derived
    let forged = HashRecord::new(CostParameters::new(1, 512, 1).unwrap(), [0; SALT_LEN], [0; TAG_LEN]);
    let err = service.verify(b"password", b"", &forged.encode()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

    let _ = std::fs::remove_dir_all(&temp_dir);
}

/// Full migration: old hashes flag rehash until replaced
#[test]
fn test_parameter_migration_e2e() {
    let service = HashService::from_config(&config(1, 64, 1))
        .unwrap()
        .with_rehash_policy(AnyCostIncreased);

    let users: Vec<(String, Vec<u8>)> = (0..4)
        .map(|i| {
            let password = format!("user-{}", i);
            let hash = service.hash(password.as_bytes(), b"pepper").unwrap().encode();
            (password, hash)
        })
        .collect();

    let previous = service.set_parameters(2, 64, 1).unwrap();
    assert_eq!(previous.time(), 1);

    let mut migrated = Vec::new();
    for (password, hash) in &users {
        let v = service.verify(password.as_bytes(), b"pepper", hash).unwrap();
        assert!(v.valid);
        assert!(v.rehash, "time increase should trigger rehash");

        let fresh = service.hash(password.as_bytes(), b"pepper").unwrap();
        assert_eq!(fresh.params().time(), 2);
        migrated.push((password.clone(), fresh.encode()));
    }

    for (password, hash) in &migrated {
        let v = service.verify(password.as_bytes(), b"pepper", hash).unwrap();
        assert!(v.valid);
        assert!(!v.rehash);
    }

    // someone else's hash never validates, nor signals rehash
    let v = service.verify(b"user-0", b"pepper", &users[1].1).unwrap();
    assert!(!v.valid);
    assert!(!v.rehash);
}
