//! The persisted license artifact.
//!
//! A [`SignedLicense`] wraps the base64-encoded payload and signature
//! together with plaintext mirror fields for operators and database
//! queries. The mirrors are convenience only; authorization decisions are
//! made from the signed payload exclusively (see [`crate::verify`]).

use crate::error::{LicenseError, LicenseResult};
use crate::payload::{self, EntitlementPayload, Expiry};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle tag of a license record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Issued, never activated.
    #[default]
    Unused,
    /// Distributed but deliberately disabled.
    Inactive,
    /// Activated on at least one device.
    Active,
    /// Disabled by an administrator.
    Revoked,
}

/// The distributable license artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLicense {
    /// Human-presentable license key; also the record's lookup key.
    pub license_key: String,
    /// Base64 of the exact encoded payload bytes the signature covers.
    pub payload: String,
    /// Base64 of the signature.
    pub signature: String,
    /// Plaintext mirror of the payload expiry. Untrusted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    /// Plaintext mirror of the device cap. Untrusted.
    pub max_devices: u32,
    /// Plaintext mirror of the issuance instant. Untrusted.
    pub created_at: DateTime<Utc>,
    /// Lifecycle tag, mutated only by activation or administration.
    #[serde(default)]
    pub status: LicenseStatus,
    /// Binding events consumed so far; never exceeds `max_devices`.
    #[serde(default)]
    pub activation_count: u32,
}

impl SignedLicense {
    /// Assembles the artifact from payload bytes and their signature,
    /// mirroring the payload's operator-facing fields.
    #[must_use]
    pub fn assemble(payload: &EntitlementPayload, payload_bytes: &[u8], signature: &[u8]) -> Self {
        let expire_at = match payload.expiry {
            Expiry::Never => None,
            Expiry::At(t) => Some(t),
        };
        Self {
            license_key: payload.license_key.clone(),
            payload: BASE64.encode(payload_bytes),
            signature: BASE64.encode(signature),
            expire_at,
            max_devices: payload.max_devices,
            created_at: payload.created_at,
            status: LicenseStatus::Unused,
            activation_count: 0,
        }
    }

    /// Parses a license file.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Format`] when the container is not valid
    /// JSON or lacks `payload`/`signature`.
    pub fn parse(bytes: &[u8]) -> LicenseResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LicenseError::Format(format!("unparseable license file: {e}")))
    }

    /// Serializes the artifact as its JSON file form.
    pub fn to_json(&self) -> LicenseResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Recovers the exact payload bytes the signature was computed over.
    pub fn payload_bytes(&self) -> LicenseResult<Vec<u8>> {
        payload::text_to_bytes(&self.payload)
    }

    /// Recovers the signature bytes.
    pub fn signature_bytes(&self) -> LicenseResult<Vec<u8>> {
        BASE64
            .decode(self.signature.trim())
            .map_err(|e| LicenseError::Format(format!("invalid signature base64: {e}")))
    }

    /// Decodes the signed payload. Does not authenticate it; see
    /// [`crate::verify::Verifier::validate`].
    pub fn decode_payload(&self) -> LicenseResult<EntitlementPayload> {
        payload::decode(&self.payload_bytes()?)
    }
}
