//! End-to-end license issuance.
//!
//! One call runs the whole pipeline: generate a key, build the
//! entitlement payload, encode it, sign the encoded bytes, and assemble
//! the container. The signature always covers the exact bytes placed in
//! the container.

use crate::container::SignedLicense;
use crate::error::LicenseResult;
use crate::keygen::{self, CompactPayload, KeyMode};
use crate::keystore::KeyStore;
use crate::machine::MachineIdentity;
use crate::payload::{self, EntitlementPayload, Expiry};
use chrono::Utc;

/// What to issue.
#[derive(Debug, Clone)]
pub struct IssueOptions {
    /// Expiry instant or unlimited.
    pub expiry: Expiry,
    /// Device cap, at least 1.
    pub max_devices: u32,
    /// Pre-bind the license to this machine; `None` issues a dynamically
    /// bound license.
    pub machine_id: Option<MachineIdentity>,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            expiry: Expiry::Never,
            max_devices: 1,
            machine_id: None,
        }
    }
}

/// Issues signed licenses with one key store.
#[derive(Debug, Clone, Copy)]
pub struct Issuer<'a> {
    keystore: &'a KeyStore,
    mode: KeyMode,
}

impl<'a> Issuer<'a> {
    #[must_use]
    pub fn new(keystore: &'a KeyStore) -> Self {
        Self {
            keystore,
            mode: KeyMode::default(),
        }
    }

    /// Selects the license key shape for subsequent issuances.
    #[must_use]
    pub fn with_mode(mut self, mode: KeyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Issues a structured-payload license.
    ///
    /// # Errors
    ///
    /// [`crate::LicenseError::KeyMaterial`] when the store cannot sign;
    /// [`crate::LicenseError::Codec`] when the options do not form a
    /// valid payload.
    pub fn issue(&self, options: IssueOptions) -> LicenseResult<SignedLicense> {
        let entitlement = EntitlementPayload {
            license_key: keygen::generate_key(self.mode),
            expiry: options.expiry,
            max_devices: options.max_devices,
            created_at: Utc::now(),
            machine_id: options.machine_id,
        };
        self.sign_and_assemble(&entitlement, payload::encode(&entitlement)?)
    }

    /// Issues a compact-variant license: the rendered Base32 key is
    /// itself the signed payload. Always single-device and dynamically
    /// bound, as the layout has no room for more.
    pub fn issue_compact(&self, product_code: &str, expiry: Expiry) -> LicenseResult<SignedLicense> {
        let compact = CompactPayload::new(product_code, expiry)?;
        let bytes = compact.to_bytes();
        let entitlement = compact.into_entitlement();
        self.sign_and_assemble(&entitlement, bytes)
    }

    fn sign_and_assemble(
        &self,
        entitlement: &EntitlementPayload,
        payload_bytes: Vec<u8>,
    ) -> LicenseResult<SignedLicense> {
        let signature = self.keystore.sign(&payload_bytes)?;
        tracing::debug!(key = %entitlement.license_key, "issued license");
        Ok(SignedLicense::assemble(entitlement, &payload_bytes, &signature))
    }
}
