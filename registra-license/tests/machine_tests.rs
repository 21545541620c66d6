use registra_license::{FixedIdentity, IdentitySource, MachineIdentity, PlatformIdentity};

#[test]
fn normalize_is_case_and_punctuation_insensitive() {
    let colon = MachineIdentity::normalize("aa:bb:cc:dd:ee:ff").unwrap();
    let dash = MachineIdentity::normalize("AA-BB-CC-DD-EE-FF").unwrap();
    let plain = MachineIdentity::normalize("AABBCCDDEEFF").unwrap();
    assert_eq!(colon, dash);
    assert_eq!(dash, plain);
    assert_eq!(plain.as_str(), "AABBCCDDEEFF");
}

#[test]
fn normalize_rejects_empty_identifiers() {
    assert!(MachineIdentity::normalize("").is_none());
    assert!(MachineIdentity::normalize(" :-/ ").is_none());
}

#[test]
fn fixed_identity_returns_its_value() {
    let id = MachineIdentity::normalize("DISK123").unwrap();
    assert_eq!(FixedIdentity(Some(id.clone())).resolve(), Some(id));
    assert_eq!(FixedIdentity(None).resolve(), None);
}

#[test]
fn platform_identity_never_panics() {
    // Whatever the host exposes, resolve() must answer; None is a valid
    // answer meaning "bind dynamically"
    let resolved = PlatformIdentity.resolve();
    if let Some(id) = resolved {
        assert!(!id.as_str().is_empty());
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
