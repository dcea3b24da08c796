// Master key generation and per-identity key extraction.
// SM9 identity-based cryptographic algorithms
// Part 1: General
// 6.2 Generation of keys

use hex_literal::hex;
use sm9_ibc::*;

fn master_key() -> MasterPrivateKey {
    MasterPrivateKey::new(&hex!(
        "0001EDEE 3778F441 F8DEA3D9 FA0ACC4E 07EE36C9 3F9A0861 8AF4AD85 CEDE1C22"
    ))
}

#[test]
fn test_generate_master_key() {
    let master = MasterPrivateKey::generate(&mut rand::rng());
    assert!(master.master_public_key().is_ok());
    assert!(master.master_signature_public_key().is_ok());
}

#[test]
fn test_extracted_keys_decode() {
    let master = master_key();
    let mpk = master.master_public_key().unwrap();
    let smpk = master.master_signature_public_key().unwrap();

    let enc = master.user_private_key(b"Bob").unwrap();
    let sig = master.user_signature_key(b"Alice").unwrap();
    assert!(SigningKey::new(&sig, &smpk).is_some());
    assert!(VerifyingKey::new(b"Alice", &smpk).is_some());

    // a usable pair: encrypt to Bob, decrypt with the extracted key
    let ct = mpk.encrypt(b"Bob", b"hello").unwrap();
    assert_eq!(enc.decrypt(b"Bob", &ct).unwrap().as_slice(), b"hello");
}

#[test]
fn test_extraction_is_deterministic_per_family() {
    let master = master_key();
    let a = master.user_private_key(b"Bob").unwrap();
    let b = master.user_private_key(b"Bob").unwrap();
    assert_eq!(a, b);

    // hid separates the encryption and exchange families
    let x = master.user_exchange_key(b"Bob").unwrap();
    assert_ne!(a, x);
}

#[test]
fn test_pem_round_trip() {
    let dir = std::env::temp_dir();
    let master = master_key();

    let path = dir.join("sm9_test_master_private_key.pem");
    master.write_pem_file(&path, LineEnding::LF).unwrap();
    let loaded = MasterPrivateKey::read_pem_file(&path).unwrap();
    assert_eq!(master, loaded);
    std::fs::remove_file(&path).unwrap();

    let mpk = master.master_public_key().unwrap();
    let pem = mpk.to_pem(LineEnding::LF).unwrap();
    assert!(pem.starts_with("-----BEGIN SM9 MASTER PUBLIC KEY-----"));
    let loaded = MasterPublicKey::from_pem(&pem).unwrap();
    assert_eq!(mpk, loaded);
}

#[test]
fn test_pem_label_mismatch_rejected() {
    let master = master_key();
    let pem = master.to_pem(LineEnding::LF).unwrap();
    // A master private key document must not load as a user key.
    assert!(UserPrivateKey::from_pem(&pem).is_err());
}

#[test]
fn test_malformed_master_key_rejected() {
    // Not a scalar: wrong length.
    let master = MasterPrivateKey::new(&[0x01, 0x02, 0x03]);
    assert!(matches!(
        master.master_public_key(),
        Err(Error::InvalidKey)
    ));
}
