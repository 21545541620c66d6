mod common;

use common::{issuer_keystore, STRANGER_PEM, WEAK_PEM};
use registra_license::{KeyStore, LicenseError};

#[test]
fn private_pem_loads_and_signs() {
    let ks = issuer_keystore();
    assert!(ks.can_sign());
    let sig = ks.sign(b"payload bytes").unwrap();
    assert!(ks.verify(b"payload bytes", &sig));
}

#[test]
fn signing_is_deterministic() {
    // PKCS#1 v1.5 has no randomized padding
    let ks = issuer_keystore();
    assert_eq!(ks.sign(b"abc").unwrap(), ks.sign(b"abc").unwrap());
}

#[test]
fn verify_rejects_different_message() {
    let ks = issuer_keystore();
    let sig = ks.sign(b"payload bytes").unwrap();
    assert!(!ks.verify(b"payload byteZ", &sig));
}

#[test]
fn verify_rejects_wrong_length_signature() {
    let ks = issuer_keystore();
    assert!(!ks.verify(b"payload", b"too short"));
}

#[test]
fn public_only_store_verifies_but_cannot_sign() {
    let issuer = issuer_keystore();
    let sig = issuer.sign(b"payload").unwrap();

    let public = KeyStore::from_public_pem(&issuer.public_pem().unwrap()).unwrap();
    assert!(!public.can_sign());
    assert!(public.verify(b"payload", &sig));
    assert!(matches!(
        public.sign(b"payload"),
        Err(LicenseError::KeyMaterial(_))
    ));
}

#[test]
fn stranger_key_does_not_verify() {
    let issuer = issuer_keystore();
    let stranger = KeyStore::from_private_pem(STRANGER_PEM).unwrap();
    let sig = issuer.sign(b"payload").unwrap();
    assert!(!stranger.verify(b"payload", &sig));
}

#[test]
fn weak_key_is_rejected() {
    assert!(matches!(
        KeyStore::from_private_pem(WEAK_PEM),
        Err(LicenseError::KeyMaterial(_))
    ));
}

#[test]
fn garbage_pem_is_rejected() {
    assert!(matches!(
        KeyStore::from_private_pem("not a pem"),
        Err(LicenseError::KeyMaterial(_))
    ));
    assert!(matches!(
        KeyStore::from_public_pem("not a pem"),
        Err(LicenseError::KeyMaterial(_))
    ));
}

#[test]
fn missing_key_file_is_key_material_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.pem");
    assert!(matches!(
        KeyStore::load_private(&missing),
        Err(LicenseError::KeyMaterial(_))
    ));
    assert!(matches!(
        KeyStore::load_public(&missing),
        Err(LicenseError::KeyMaterial(_))
    ));
}

#[test]
fn pem_round_trip() {
    let ks = issuer_keystore();
    let reloaded = KeyStore::from_private_pem(&ks.private_pem().unwrap()).unwrap();
    let sig = reloaded.sign(b"payload").unwrap();
    assert!(ks.verify(b"payload", &sig));
}
