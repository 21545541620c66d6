//! Error types for the licensing crate.
//!
//! Each variant corresponds to one failure class with its own remediation
//! (re-issue, renew, contact an administrator). Cryptographic and
//! structural failures are terminal for the record they concern; only
//! store I/O is worth retrying, and never on the offline path.

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Private or public key material is unavailable or unusable.
    #[error("key material unavailable: {0}")]
    KeyMaterial(String),

    /// Payload bytes are truncated, version-mismatched, or structurally invalid.
    #[error("invalid license payload: {0}")]
    Codec(String),

    /// License container file is malformed or missing required fields.
    #[error("invalid license file: {0}")]
    Format(String),

    /// Signature does not verify against the payload bytes.
    #[error("license signature invalid")]
    InvalidSignature,

    /// Valid signature, but the license expired at the given instant.
    #[error("license expired on {0}")]
    Expired(String),

    /// Valid signature, but the license is bound to a different machine.
    #[error("license is bound to a different machine")]
    MachineMismatch,

    /// Activation would exceed the license's device cap.
    #[error("device limit exceeded (max {0} devices)")]
    DeviceLimitExceeded(u32),

    /// License has been revoked by an administrator.
    #[error("license has been revoked")]
    Revoked,

    /// A license record was not found in the store.
    #[error("unknown license key: {0}")]
    UnknownKey(String),

    /// Store read/write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
