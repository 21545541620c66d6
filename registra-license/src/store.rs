//! Persistent license records and the activation step.
//!
//! A store is a key-value map of [`SignedLicense`] records addressed by
//! `license_key`, with get/put/conditional-activate semantics. Activation
//! is the only mutation: it checks the device cap and the revocation flag
//! under the record lock, so two concurrent activations cannot both pass
//! the count check.
//!
//! Store I/O failures are reported as [`LicenseError::Storage`] and must
//! never block the offline verification path; callers verify from the
//! file artifact when the store is unreachable.

use crate::container::{LicenseStatus, SignedLicense};
use crate::error::{LicenseError, LicenseResult};
use crate::machine::MachineIdentity;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key-value access to issued license records.
pub trait LicenseStore {
    /// Looks up a record by license key.
    fn get(&self, license_key: &str) -> LicenseResult<Option<SignedLicense>>;

    /// Inserts or replaces a record.
    fn put(&self, record: SignedLicense) -> LicenseResult<()>;

    /// Consumes one binding event for the given machine.
    ///
    /// # Errors
    ///
    /// [`LicenseError::UnknownKey`] when no record exists,
    /// [`LicenseError::Revoked`] for revoked records, and
    /// [`LicenseError::DeviceLimitExceeded`] when the cap is already
    /// reached — in which case the count is left untouched.
    fn activate(
        &self,
        license_key: &str,
        machine: &MachineIdentity,
    ) -> LicenseResult<SignedLicense>;
}

/// Applies the activation rules to one record. Shared by all stores so
/// the cap check and the increment cannot drift apart.
fn apply_activation(
    record: &mut SignedLicense,
    machine: &MachineIdentity,
) -> LicenseResult<()> {
    if record.status == LicenseStatus::Revoked {
        return Err(LicenseError::Revoked);
    }
    if record.activation_count >= record.max_devices {
        return Err(LicenseError::DeviceLimitExceeded(record.max_devices));
    }
    record.activation_count += 1;
    record.status = LicenseStatus::Active;
    tracing::debug!(
        key = %record.license_key,
        machine = %machine,
        count = record.activation_count,
        "license activated"
    );
    Ok(())
}

/// In-memory store. The mutex makes each activation an atomic
/// check-and-increment when the store is shared across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SignedLicense>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> LicenseResult<std::sync::MutexGuard<'_, HashMap<String, SignedLicense>>> {
        self.records
            .lock()
            .map_err(|_| LicenseError::Storage("store lock poisoned".to_string()))
    }
}

impl LicenseStore for MemoryStore {
    fn get(&self, license_key: &str) -> LicenseResult<Option<SignedLicense>> {
        Ok(self.lock()?.get(license_key).cloned())
    }

    fn put(&self, record: SignedLicense) -> LicenseResult<()> {
        self.lock()?.insert(record.license_key.clone(), record);
        Ok(())
    }

    fn activate(
        &self,
        license_key: &str,
        machine: &MachineIdentity,
    ) -> LicenseResult<SignedLicense> {
        let mut records = self.lock()?;
        let record = records
            .get_mut(license_key)
            .ok_or_else(|| LicenseError::UnknownKey(license_key.to_string()))?;
        apply_activation(record, machine)?;
        Ok(record.clone())
    }
}

/// File-backed store: one JSON document holding the whole record map,
/// replaced atomically on every write via a temp file and rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Opens a store at the given path. The file is created on first
    /// write; a missing file reads as an empty store.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> LicenseResult<HashMap<String, SignedLicense>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                LicenseError::Storage(format!("corrupt store {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(LicenseError::Storage(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, records: &HashMap<String, SignedLicense>) -> LicenseResult<()> {
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| LicenseError::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            LicenseError::Storage(format!("cannot replace {}: {e}", self.path.display()))
        })
    }

    /// Returns the store's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LicenseStore for FileStore {
    fn get(&self, license_key: &str) -> LicenseResult<Option<SignedLicense>> {
        Ok(self.read_all()?.remove(license_key))
    }

    fn put(&self, record: SignedLicense) -> LicenseResult<()> {
        let mut records = self.read_all()?;
        records.insert(record.license_key.clone(), record);
        self.write_all(&records)
    }

    fn activate(
        &self,
        license_key: &str,
        machine: &MachineIdentity,
    ) -> LicenseResult<SignedLicense> {
        let mut records = self.read_all()?;
        let record = records
            .get_mut(license_key)
            .ok_or_else(|| LicenseError::UnknownKey(license_key.to_string()))?;
        apply_activation(record, machine)?;
        let updated = record.clone();
        self.write_all(&records)?;
        Ok(updated)
    }
}
