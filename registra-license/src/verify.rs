//! License verification: authenticity, expiry, and machine binding.
//!
//! Verification order is fixed: the signature is checked over the exact
//! distributed payload bytes first, and only an authentic payload is
//! consulted for business rules. The container's plaintext mirror fields
//! are never read here.
//!
//! A well-formed but invalid license produces a classified [`Validity`],
//! not an error; hard errors are reserved for structurally malformed
//! input (unparseable payload, bad base64).

use crate::container::SignedLicense;
use crate::error::LicenseResult;
use crate::keystore::KeyStore;
use crate::machine::MachineIdentity;
use crate::payload::{EntitlementPayload, Expiry};
use chrono::{DateTime, Utc};

/// Outcome of the expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    /// Within the validity window (the boundary instant is valid).
    Valid,
    /// Past expiry.
    Expired,
}

/// Outcome of the binding check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingCheck {
    /// Bound to the observed machine.
    Bound,
    /// Not bound to any machine yet; binds on first activation.
    NotBound,
    /// Bound to a different machine. Hard failure.
    Mismatch,
}

/// Classified verification verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    /// Authentic, unexpired, and not bound elsewhere.
    Valid {
        payload: EntitlementPayload,
        binding: BindingCheck,
    },
    /// Signature does not verify; nothing in the payload is trusted.
    NotAuthentic,
    /// Authentic but past expiry.
    Expired { expire_at: DateTime<Utc> },
    /// Authentic but bound to a different machine.
    WrongMachine,
}

impl Validity {
    /// A license is usable iff it is authentic, unexpired, and its
    /// binding check is not a mismatch.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Converts the verdict into a `Result` for callers that propagate
    /// errors. Each negative verdict maps to its own error kind so the
    /// remediation message stays specific.
    pub fn into_result(self) -> LicenseResult<EntitlementPayload> {
        match self {
            Self::Valid { payload, .. } => Ok(payload),
            Self::NotAuthentic => Err(crate::LicenseError::InvalidSignature),
            Self::Expired { expire_at } => {
                Err(crate::LicenseError::Expired(expire_at.to_rfc3339()))
            }
            Self::WrongMachine => Err(crate::LicenseError::MachineMismatch),
        }
    }
}

/// Checks the payload's expiry against a caller-supplied clock.
#[must_use]
pub fn check_expiry(payload: &EntitlementPayload, now: DateTime<Utc>) -> ExpiryCheck {
    if payload.expiry.is_valid_at(now) {
        ExpiryCheck::Valid
    } else {
        ExpiryCheck::Expired
    }
}

/// Compares the payload's binding against the observed machine identity.
///
/// An absent payload binding is [`BindingCheck::NotBound`] regardless of
/// the observed identity: the license binds on first activation and the
/// caller persists the binding. An absent *observed* identity also counts
/// as not bound — a machine with no obtainable identifier is treated as
/// dynamic, never blocked. A mismatch requires two differing identities.
#[must_use]
pub fn check_binding(
    payload: &EntitlementPayload,
    observed: Option<&MachineIdentity>,
) -> BindingCheck {
    match (&payload.machine_id, observed) {
        (None, _) | (Some(_), None) => BindingCheck::NotBound,
        (Some(bound), Some(seen)) if bound == seen => BindingCheck::Bound,
        (Some(_), Some(_)) => BindingCheck::Mismatch,
    }
}

/// Verifies signed licenses against one key store.
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'a> {
    keystore: &'a KeyStore,
}

impl<'a> Verifier<'a> {
    #[must_use]
    pub fn new(keystore: &'a KeyStore) -> Self {
        Self { keystore }
    }

    /// Runs the combined decision: authenticity, then expiry, then
    /// binding, all over the signed payload only.
    ///
    /// # Errors
    ///
    /// Only for structurally malformed input: bad base64 wrapping, an
    /// undecodable payload, a signature field that is not base64. An
    /// invalid-but-well-formed license is an `Ok` with a negative
    /// [`Validity`].
    pub fn validate(
        &self,
        license: &SignedLicense,
        now: DateTime<Utc>,
        observed: Option<&MachineIdentity>,
    ) -> LicenseResult<Validity> {
        let payload_bytes = license.payload_bytes()?;
        let signature = license.signature_bytes()?;

        if !self.keystore.verify(&payload_bytes, &signature) {
            tracing::warn!(key = %license.license_key, "license signature rejected");
            return Ok(Validity::NotAuthentic);
        }

        let payload = license.decode_payload()?;

        if check_expiry(&payload, now) == ExpiryCheck::Expired {
            let Expiry::At(expire_at) = payload.expiry else {
                unreachable!("unlimited licenses never expire");
            };
            tracing::debug!(key = %license.license_key, %expire_at, "license expired");
            return Ok(Validity::Expired { expire_at });
        }

        match check_binding(&payload, observed) {
            BindingCheck::Mismatch => {
                tracing::warn!(key = %license.license_key, "license bound to a different machine");
                Ok(Validity::WrongMachine)
            }
            binding => Ok(Validity::Valid { payload, binding }),
        }
    }
}
