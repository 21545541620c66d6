//! License issuance and verification for Registra.
//!
//! This crate covers:
//! - Signed entitlement records with a deterministic payload encoding
//! - Human-presentable license key generation (two shapes, plus a
//!   legacy-compatible compact binary variant)
//! - RSA-2048 PKCS#1 v1.5 / SHA-256 signing and verification
//! - Machine binding via normalized hardware identifiers
//! - The JSON license file container and a get/put/activate record store
//!
//! # Design principles
//!
//! - **Offline-first**: verification needs only the license artifact and
//!   the public key; no network, no store.
//! - **The signed payload is authoritative**: the container carries
//!   plaintext mirror fields for operators, but every authorization
//!   decision reads the payload the signature covers.
//! - **Exact bytes**: signatures cover the encoded payload bytes as
//!   distributed; nothing is ever re-serialized before verifying.
//! - **Classified rejection**: an invalid license is reported as a
//!   specific verdict (not authentic, expired, wrong machine) so callers
//!   can show the right remediation instead of a generic failure.

mod container;
mod error;
mod issue;
mod keygen;
mod keystore;
mod machine;
mod payload;
mod store;
mod verify;

pub use container::{LicenseStatus, SignedLicense};
pub use error::{LicenseError, LicenseResult};
pub use issue::{IssueOptions, Issuer};
pub use keygen::{generate_key, CompactPayload, KeyMode};
pub use keystore::{KeyStore, MIN_KEY_BITS};
pub use machine::{FixedIdentity, IdentitySource, MachineIdentity, PlatformIdentity};
pub use payload::{decode, decode_text, encode, encode_text, EntitlementPayload, Expiry};
pub use store::{FileStore, LicenseStore, MemoryStore};
pub use verify::{check_binding, check_expiry, BindingCheck, ExpiryCheck, Validity, Verifier};
