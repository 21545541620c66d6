//! Key material loading, signing, and signature verification.
//!
//! A [`KeyStore`] is constructed once and passed by reference wherever
//! signing or verification happens; there is no process-wide key cache.
//! Signatures are RSA PKCS#1 v1.5 with a SHA-256 digest over the exact
//! encoded payload bytes. Once loaded, a store is read-only and safe to
//! share across threads.

use crate::error::{LicenseError, LicenseResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;

/// Minimum accepted modulus size in bits.
pub const MIN_KEY_BITS: usize = 2048;

/// Holds the key pair for issuance, or just the public half for
/// verification-only use.
#[derive(Debug, Clone)]
pub struct KeyStore {
    private: Option<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl KeyStore {
    /// Generates a fresh 2048-bit key pair.
    pub fn generate() -> LicenseResult<Self> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, MIN_KEY_BITS)
            .map_err(|e| LicenseError::KeyMaterial(format!("key generation failed: {e}")))?;
        let public = private.to_public_key();
        Ok(Self {
            private: Some(private),
            public,
        })
    }

    /// Builds a store from a PEM-encoded private key (PKCS#8 or PKCS#1).
    pub fn from_private_pem(pem: &str) -> LicenseResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| LicenseError::KeyMaterial(format!("unreadable private key: {e}")))?;
        if private.size() * 8 < MIN_KEY_BITS {
            return Err(LicenseError::KeyMaterial(format!(
                "private key is {} bits, need at least {MIN_KEY_BITS}",
                private.size() * 8
            )));
        }
        let public = private.to_public_key();
        Ok(Self {
            private: Some(private),
            public,
        })
    }

    /// Builds a verification-only store from a PEM-encoded public key
    /// (SPKI or PKCS#1).
    pub fn from_public_pem(pem: &str) -> LicenseResult<Self> {
        let public = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| LicenseError::KeyMaterial(format!("unreadable public key: {e}")))?;
        Ok(Self {
            private: None,
            public,
        })
    }

    /// Reads a private key PEM file from disk.
    pub fn load_private(path: &Path) -> LicenseResult<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            LicenseError::KeyMaterial(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_private_pem(&pem)
    }

    /// Reads a public key PEM file from disk.
    pub fn load_public(path: &Path) -> LicenseResult<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            LicenseError::KeyMaterial(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_public_pem(&pem)
    }

    /// Returns true if this store can sign.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.private.is_some()
    }

    /// Signs payload bytes with RSA PKCS#1 v1.5 / SHA-256.
    ///
    /// The bytes must be the exact codec output that will be distributed;
    /// verification compares byte-for-byte.
    pub fn sign(&self, payload_bytes: &[u8]) -> LicenseResult<Vec<u8>> {
        let private = self.private.as_ref().ok_or_else(|| {
            LicenseError::KeyMaterial("no private key loaded, cannot sign".to_string())
        })?;
        let signing_key = SigningKey::<Sha256>::new(private.clone());
        Ok(signing_key.sign(payload_bytes).to_vec())
    }

    /// Verifies a signature over payload bytes. Returns false for any
    /// mismatch, including a signature of the wrong length.
    #[must_use]
    pub fn verify(&self, payload_bytes: &[u8], signature: &[u8]) -> bool {
        let verifying_key = VerifyingKey::<Sha256>::new(self.public.clone());
        match Signature::try_from(signature) {
            Ok(sig) => verifying_key.verify(payload_bytes, &sig).is_ok(),
            Err(_) => false,
        }
    }

    /// Serializes the private key as PKCS#8 PEM.
    pub fn private_pem(&self) -> LicenseResult<String> {
        let private = self
            .private
            .as_ref()
            .ok_or_else(|| LicenseError::KeyMaterial("no private key loaded".to_string()))?;
        private
            .to_pkcs8_pem(LineEnding::LF)
            .map(|p| p.to_string())
            .map_err(|e| LicenseError::KeyMaterial(format!("cannot encode private key: {e}")))
    }

    /// Serializes the public key as SPKI PEM.
    pub fn public_pem(&self) -> LicenseResult<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| LicenseError::KeyMaterial(format!("cannot encode public key: {e}")))
    }
}
