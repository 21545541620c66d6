//! Machine identity resolution for license binding.
//!
//! A [`MachineIdentity`] is a normalized hardware identifier: uppercased,
//! with every character outside `[A-Z0-9]` removed. Two identities are
//! equal iff their normalized forms are byte-equal, so `aa:bb:cc:dd:ee:ff`
//! and `AABBCCDDEEFF` name the same machine.
//!
//! Resolution is platform-dependent and lives behind [`IdentitySource`];
//! the portable core only depends on the trait. A machine with no
//! obtainable identifier resolves to `None`, which callers must treat as
//! "dynamic/unbound" rather than an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized hardware identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineIdentity(String);

impl MachineIdentity {
    /// Normalizes a raw identifier: uppercase, strip everything outside
    /// `[A-Z0-9]`. Returns `None` when nothing survives normalization.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let id: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Returns the normalized identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MachineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MachineIdentity({})", self.0)
    }
}

/// A source of the local machine's identity.
///
/// Implementations probe platform facilities; the core never calls the
/// platform directly. `None` means no identifier is obtainable and the
/// license should be treated as dynamically bound.
pub trait IdentitySource {
    fn resolve(&self) -> Option<MachineIdentity>;
}

/// Resolves the identity of the machine the process is running on.
///
/// Probes in priority order: primary disk serial, BIOS/firmware serial,
/// first non-loopback network adapter hardware address.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformIdentity;

impl IdentitySource for PlatformIdentity {
    fn resolve(&self) -> Option<MachineIdentity> {
        let id = first_normalized([disk_serial, firmware_serial, mac_address]);
        match &id {
            Some(id) => tracing::debug!("resolved machine identity {id}"),
            None => tracing::debug!("no hardware identifier survived normalization"),
        }
        id
    }
}

/// Runs probes in order; the first result that survives normalization
/// wins. A non-empty raw value that normalizes to nothing (vendor
/// placeholders like `"----"`) does not stop the chain.
fn first_normalized<const N: usize>(
    probes: [fn() -> Option<String>; N],
) -> Option<MachineIdentity> {
    probes
        .into_iter()
        .find_map(|probe| probe().as_deref().and_then(MachineIdentity::normalize))
}

/// An identity source with a fixed answer. Used by callers that receive
/// the identifier externally (CLI argument, test fixture).
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub Option<MachineIdentity>);

impl IdentitySource for FixedIdentity {
    fn resolve(&self) -> Option<MachineIdentity> {
        self.0.clone()
    }
}

#[cfg(target_os = "linux")]
fn disk_serial() -> Option<String> {
    let blocks = std::fs::read_dir("/sys/block").ok()?;
    for entry in blocks.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Loop and ram devices have no serial worth reading
        if name.starts_with("loop") || name.starts_with("ram") {
            continue;
        }
        let path = entry.path().join("device/serial");
        if let Ok(serial) = std::fs::read_to_string(path) {
            let serial = serial.trim();
            if !serial.is_empty() {
                return Some(serial.to_string());
            }
        }
    }
    None
}

#[cfg(target_os = "macos")]
fn disk_serial() -> Option<String> {
    // IOPlatformSerialNumber is the hardware serial on macOS
    std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|output| {
            output
                .lines()
                .find(|l| l.contains("IOPlatformSerialNumber"))
                .and_then(|l| l.split('"').nth(3))
                .map(String::from)
        })
}

#[cfg(target_os = "windows")]
fn disk_serial() -> Option<String> {
    wmic_value(&["diskdrive", "get", "SerialNumber"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn disk_serial() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn firmware_serial() -> Option<String> {
    for path in ["/sys/class/dmi/id/product_serial", "/sys/class/dmi/id/board_serial"] {
        if let Ok(serial) = std::fs::read_to_string(path) {
            let serial = serial.trim();
            // Firmware vendors ship placeholder serials on consumer boards
            if !serial.is_empty() && serial != "None" && serial != "Default string" {
                return Some(serial.to_string());
            }
        }
    }
    None
}

#[cfg(target_os = "macos")]
fn firmware_serial() -> Option<String> {
    std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|output| {
            output
                .lines()
                .find(|l| l.contains("IOPlatformUUID"))
                .and_then(|l| l.split('"').nth(3))
                .map(String::from)
        })
}

#[cfg(target_os = "windows")]
fn firmware_serial() -> Option<String> {
    wmic_value(&["bios", "get", "SerialNumber"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn firmware_serial() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn mac_address() -> Option<String> {
    let ifaces = std::fs::read_dir("/sys/class/net").ok()?;
    for entry in ifaces.flatten() {
        if entry.file_name().to_string_lossy() == "lo" {
            continue;
        }
        if let Ok(addr) = std::fs::read_to_string(entry.path().join("address")) {
            let addr = addr.trim();
            if !addr.is_empty() && addr != "00:00:00:00:00:00" {
                return Some(addr.to_string());
            }
        }
    }
    None
}

#[cfg(target_os = "macos")]
fn mac_address() -> Option<String> {
    std::process::Command::new("ifconfig")
        .arg("en0")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|output| {
            output
                .lines()
                .find_map(|l| l.trim().strip_prefix("ether "))
                .map(|s| s.trim().to_string())
        })
}

#[cfg(target_os = "windows")]
fn mac_address() -> Option<String> {
    wmic_value(&["nic", "where", "NetEnabled=true", "get", "MACAddress"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn mac_address() -> Option<String> {
    None
}

#[cfg(target_os = "windows")]
fn wmic_value(args: &[&str]) -> Option<String> {
    std::process::Command::new("wmic")
        .args(args)
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|output| {
            output
                .lines()
                .skip(1)
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(String::from)
        })
}
