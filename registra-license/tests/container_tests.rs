mod common;

use common::{issue_bound, issue_unlimited, issuer_keystore};
use pretty_assertions::assert_eq;
use registra_license::{LicenseError, LicenseStatus, SignedLicense};

#[test]
fn json_round_trip() {
    let license = issue_unlimited(&issuer_keystore());
    let json = license.to_json().unwrap();
    let parsed = SignedLicense::parse(json.as_bytes()).unwrap();
    assert_eq!(parsed, license);
}

#[test]
fn fresh_license_is_unused() {
    let license = issue_unlimited(&issuer_keystore());
    assert_eq!(license.status, LicenseStatus::Unused);
    assert_eq!(license.activation_count, 0);
}

#[test]
fn parse_preserves_signed_bytes_exactly() {
    let license = issue_bound(&issuer_keystore(), "AABBCC");
    let json = license.to_json().unwrap();
    let parsed = SignedLicense::parse(json.as_bytes()).unwrap();
    assert_eq!(parsed.payload_bytes().unwrap(), license.payload_bytes().unwrap());
    assert_eq!(
        parsed.signature_bytes().unwrap(),
        license.signature_bytes().unwrap()
    );
}

#[test]
fn mirror_fields_match_payload_at_issuance() {
    let license = issue_bound(&issuer_keystore(), "AABBCC");
    let payload = license.decode_payload().unwrap();
    assert_eq!(license.license_key, payload.license_key);
    assert_eq!(license.max_devices, payload.max_devices);
    assert_eq!(license.created_at, payload.created_at);
}

#[test]
fn status_defaults_when_absent_from_file() {
    let license = issue_unlimited(&issuer_keystore());
    let mut value: serde_json::Value = serde_json::from_str(&license.to_json().unwrap()).unwrap();
    let map = value.as_object_mut().unwrap();
    map.remove("status");
    map.remove("activation_count");
    let parsed = SignedLicense::parse(value.to_string().as_bytes()).unwrap();
    assert_eq!(parsed.status, LicenseStatus::Unused);
    assert_eq!(parsed.activation_count, 0);
}

// ── Format errors ────────────────────────────────────────────────

#[test]
fn parse_rejects_non_json() {
    assert!(matches!(
        SignedLicense::parse(b"not a license"),
        Err(LicenseError::Format(_))
    ));
}

#[test]
fn parse_rejects_missing_payload() {
    let json = br#"{"license_key":"X","signature":"AA==","max_devices":1,"created_at":"2026-01-01T00:00:00Z"}"#;
    assert!(matches!(
        SignedLicense::parse(json),
        Err(LicenseError::Format(_))
    ));
}

#[test]
fn parse_rejects_missing_signature() {
    let json = br#"{"license_key":"X","payload":"AA==","max_devices":1,"created_at":"2026-01-01T00:00:00Z"}"#;
    assert!(matches!(
        SignedLicense::parse(json),
        Err(LicenseError::Format(_))
    ));
}

#[test]
fn parse_rejects_truncated_file() {
    let license = issue_unlimited(&issuer_keystore());
    let json = license.to_json().unwrap();
    assert!(SignedLicense::parse(&json.as_bytes()[..json.len() / 2]).is_err());
}
