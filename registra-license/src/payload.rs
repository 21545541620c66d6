//! Entitlement payload and its wire codec.
//!
//! The payload is the authoritative signed business record. Its canonical
//! encoding is a JSON object with a fixed key order, so encoding is
//! deterministic: the signature covers the encoded bytes, not the logical
//! structure, and any re-serialization before signing or verifying must
//! be byte-identical.
//!
//! Two import-compatible formats are accepted on decode, distinguished by
//! the leading byte: `{` selects the structured JSON variant, anything
//! else is parsed as the compact binary layout (see [`crate::keygen`]).

use crate::error::{LicenseError, LicenseResult};
use crate::keygen::CompactPayload;
use crate::machine::MachineIdentity;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a license stops being valid.
///
/// Collapses the ad hoc sentinels of older issuance tooling (`0`,
/// `"unlimited"`, far-future dates) into one tagged representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Never expires.
    Never,
    /// Valid through the given instant, inclusive.
    At(DateTime<Utc>),
}

impl Expiry {
    /// Returns true if the license is still within its validity window.
    /// The boundary instant itself is valid.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Never => true,
            Self::At(t) => now <= *t,
        }
    }
}

/// The signed business record describing what is licensed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementPayload {
    /// Human-presentable license key, unique per issuance.
    pub license_key: String,
    /// Expiry instant or the unlimited sentinel. Never absent.
    pub expiry: Expiry,
    /// Device-binding cardinality, at least 1.
    pub max_devices: u32,
    /// Issuance timestamp, informational only.
    pub created_at: DateTime<Utc>,
    /// Binding target; present only for pre-bound licenses. This is the
    /// only location of the binding that verification may consult.
    pub machine_id: Option<MachineIdentity>,
}

/// JSON wire form of the payload. Field order here fixes the canonical
/// key order of the encoding.
#[derive(Serialize, Deserialize)]
struct PayloadWire {
    license_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expire_at: Option<DateTime<Utc>>,
    max_devices: u32,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    unlimited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    machine_id: Option<String>,
}

impl From<&EntitlementPayload> for PayloadWire {
    fn from(p: &EntitlementPayload) -> Self {
        let (expire_at, unlimited) = match p.expiry {
            Expiry::Never => (None, true),
            Expiry::At(t) => (Some(t), false),
        };
        Self {
            license_key: p.license_key.clone(),
            expire_at,
            max_devices: p.max_devices,
            created_at: p.created_at,
            unlimited,
            machine_id: p.machine_id.as_ref().map(|m| m.as_str().to_string()),
        }
    }
}

impl TryFrom<PayloadWire> for EntitlementPayload {
    type Error = LicenseError;

    fn try_from(w: PayloadWire) -> LicenseResult<Self> {
        let expiry = if w.unlimited {
            Expiry::Never
        } else {
            match w.expire_at {
                Some(t) => Expiry::At(t),
                None => {
                    return Err(LicenseError::Codec(
                        "payload has neither expire_at nor unlimited".to_string(),
                    ));
                }
            }
        };
        if w.max_devices == 0 {
            return Err(LicenseError::Codec(
                "max_devices must be a positive integer".to_string(),
            ));
        }
        let machine_id = match w.machine_id {
            None => None,
            Some(raw) => Some(MachineIdentity::normalize(&raw).ok_or_else(|| {
                LicenseError::Codec(format!("machine_id {raw:?} is empty after normalization"))
            })?),
        };
        Ok(Self {
            license_key: w.license_key,
            expiry,
            max_devices: w.max_devices,
            created_at: w.created_at,
            machine_id,
        })
    }
}

/// Encodes a payload to its canonical bytes.
///
/// Deterministic: the same payload always produces the same bytes.
pub fn encode(payload: &EntitlementPayload) -> LicenseResult<Vec<u8>> {
    Ok(serde_json::to_vec(&PayloadWire::from(payload))?)
}

/// Decodes payload bytes, accepting both supported formats.
///
/// # Errors
///
/// Returns [`LicenseError::Codec`] on truncated input, an unrecognized
/// format, or a structurally invalid payload.
pub fn decode(bytes: &[u8]) -> LicenseResult<EntitlementPayload> {
    match bytes.first() {
        Some(b'{') => {
            let wire: PayloadWire = serde_json::from_slice(bytes)
                .map_err(|e| LicenseError::Codec(format!("invalid payload JSON: {e}")))?;
            wire.try_into()
        }
        Some(_) => CompactPayload::from_bytes(bytes).map(|c| c.into_entitlement()),
        None => Err(LicenseError::Codec("empty payload".to_string())),
    }
}

/// Encodes a payload and wraps the bytes in base64 for embedding in
/// JSON documents or URLs.
pub fn encode_text(payload: &EntitlementPayload) -> LicenseResult<String> {
    Ok(BASE64.encode(encode(payload)?))
}

/// Reverses [`encode_text`].
pub fn decode_text(text: &str) -> LicenseResult<EntitlementPayload> {
    decode(&text_to_bytes(text)?)
}

/// Unwraps the base64 transport layer without decoding the payload.
pub(crate) fn text_to_bytes(text: &str) -> LicenseResult<Vec<u8>> {
    BASE64
        .decode(text.trim())
        .map_err(|e| LicenseError::Codec(format!("invalid payload base64: {e}")))
}
