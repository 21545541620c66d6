//! License key generation and the compact binary payload variant.
//!
//! Generated keys are a courtesy identifier: uniqueness is statistical,
//! not enforced, and authenticity always comes from the signature rather
//! than key secrecy.
//!
//! The compact variant is a legacy-compatible fixed byte layout whose
//! Base32 rendering doubles as the human license key:
//!
//! ```text
//! product_code (UTF-8) ‖ 4 zero bytes ‖ 8 random bytes ‖ expiry (u32 BE)
//! ```
//!
//! with `0xFFFF_FFFF` as the unlimited expiry sentinel.

use crate::error::{LicenseError, LicenseResult};
use crate::payload::{EntitlementPayload, Expiry};
use chrono::DateTime;
use rand::Rng;

/// RFC 4648 Base32 alphabet, no padding characters.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Alphabet for classic keys: uppercase letters and digits.
const CLASSIC_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Expiry sentinel in the compact layout.
const UNLIMITED_SECS: u32 = 0xFFFF_FFFF;

/// Reserved bytes between product code and nonce.
const RESERVED_LEN: usize = 4;

/// Random bytes per compact payload.
const NONCE_LEN: usize = 8;

/// How generated keys are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// 5 dash-separated groups of 5 over `[A-Z0-9]`.
    #[default]
    Classic,
    /// 4 groups of 4 over the Base32 alphabet (ambiguity-reduced: no
    /// padding characters, no `0`/`1`).
    Compact,
}

impl KeyMode {
    fn alphabet(self) -> &'static [u8] {
        match self {
            Self::Classic => CLASSIC_ALPHABET,
            Self::Compact => BASE32_ALPHABET,
        }
    }

    fn shape(self) -> (usize, usize) {
        match self {
            Self::Classic => (5, 5),
            Self::Compact => (4, 4),
        }
    }
}

/// Generates a human-presentable license key for the given mode.
#[must_use]
pub fn generate_key(mode: KeyMode) -> String {
    let alphabet = mode.alphabet();
    let (groups, group_len) = mode.shape();
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(groups * (group_len + 1));
    for g in 0..groups {
        if g > 0 {
            out.push('-');
        }
        for _ in 0..group_len {
            out.push(alphabet[rng.gen_range(0..alphabet.len())] as char);
        }
    }
    out
}

/// The compact binary payload: product code, nonce, and expiry packed
/// into a fixed layout whose Base32 rendering is the license key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactPayload {
    product_code: String,
    nonce: [u8; NONCE_LEN],
    expire_secs: u32,
}

impl CompactPayload {
    /// Builds a compact payload with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Codec`] when the expiry instant does not
    /// fit the layout's 32-bit Unix-seconds field.
    pub fn new(product_code: &str, expiry: Expiry) -> LicenseResult<Self> {
        let expire_secs = Self::pack_expiry(expiry)?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce);
        Ok(Self {
            product_code: product_code.to_string(),
            nonce,
            expire_secs,
        })
    }

    fn pack_expiry(expiry: Expiry) -> LicenseResult<u32> {
        match expiry {
            Expiry::Never => Ok(UNLIMITED_SECS),
            Expiry::At(t) => {
                let secs = t.timestamp();
                match u32::try_from(secs) {
                    Ok(s) if s != UNLIMITED_SECS => Ok(s),
                    _ => Err(LicenseError::Codec(format!(
                        "expiry {t} does not fit the compact layout"
                    ))),
                }
            }
        }
    }

    /// Returns the product code.
    #[must_use]
    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    /// Returns the expiry carried by this payload.
    #[must_use]
    pub fn expiry(&self) -> Expiry {
        if self.expire_secs == UNLIMITED_SECS {
            Expiry::Never
        } else {
            // In-range by construction
            Expiry::At(DateTime::from_timestamp(i64::from(self.expire_secs), 0).unwrap())
        }
    }

    /// Serializes to the fixed byte layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.product_code.len() + RESERVED_LEN + NONCE_LEN + 4);
        out.extend_from_slice(self.product_code.as_bytes());
        out.extend_from_slice(&[0u8; RESERVED_LEN]);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.expire_secs.to_be_bytes());
        out
    }

    /// Parses the fixed byte layout. The trailing fields are fixed-width,
    /// so the product code is whatever precedes them.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Codec`] on truncated input, non-zero
    /// reserved bytes, or a non-UTF-8 product code.
    pub fn from_bytes(bytes: &[u8]) -> LicenseResult<Self> {
        let fixed = RESERVED_LEN + NONCE_LEN + 4;
        if bytes.len() < fixed {
            return Err(LicenseError::Codec(format!(
                "compact payload truncated ({} bytes, need at least {fixed})",
                bytes.len()
            )));
        }
        let (head, tail) = bytes.split_at(bytes.len() - fixed);
        let (reserved, tail) = tail.split_at(RESERVED_LEN);
        if reserved.iter().any(|&b| b != 0) {
            return Err(LicenseError::Codec(
                "compact payload reserved bytes are not zero".to_string(),
            ));
        }
        let (nonce_bytes, expiry_bytes) = tail.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        let expire_secs = u32::from_be_bytes(expiry_bytes.try_into().expect("4 bytes"));
        let product_code = std::str::from_utf8(head)
            .map_err(|_| LicenseError::Codec("product code is not valid UTF-8".to_string()))?
            .to_string();
        Ok(Self {
            product_code,
            nonce,
            expire_secs,
        })
    }

    /// Renders the human license key: Base32 without padding, grouped in
    /// fives with dashes.
    #[must_use]
    pub fn render(&self) -> String {
        let raw = base32_encode(&self.to_bytes());
        let mut out = String::with_capacity(raw.len() + raw.len() / 5);
        for (i, c) in raw.chars().enumerate() {
            if i > 0 && i % 5 == 0 {
                out.push('-');
            }
            out.push(c);
        }
        out
    }

    /// Parses a rendered key back to the payload. Dashes are ignored;
    /// truncated legacy renderings do not decode.
    pub fn parse_key(key: &str) -> LicenseResult<Self> {
        let compact: String = key.chars().filter(|&c| c != '-').collect();
        Self::from_bytes(&base32_decode(&compact)?)
    }

    /// Lifts the compact form to the full entitlement record. The layout
    /// carries no issuance timestamp or binding, so `created_at` is the
    /// Unix epoch and the license is single-device, dynamically bound.
    #[must_use]
    pub fn into_entitlement(self) -> EntitlementPayload {
        let expiry = self.expiry();
        EntitlementPayload {
            license_key: self.render(),
            expiry,
            max_devices: 1,
            created_at: DateTime::UNIX_EPOCH,
            machine_id: None,
        }
    }
}

/// RFC 4648 Base32 without padding.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for &b in data {
        buffer = (buffer << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Reverses [`base32_encode`]. Case-insensitive on input.
fn base32_decode(text: &str) -> LicenseResult<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for c in text.bytes() {
        let value = match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a',
            b'2'..=b'7' => c - b'2' + 26,
            _ => {
                return Err(LicenseError::Codec(format!(
                    "invalid base32 character {:?}",
                    c as char
                )));
            }
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Ok(out)
}
