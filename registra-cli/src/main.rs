//! Registra license tool.
//!
//! Usage:
//!   registra keygen --out-dir keys/
//!   registra issue --key keys/registra.pem --days 365 --out store.lic
//!   registra verify store.lic --public keys/registra.pub.pem --machine <id>
//!   registra machine-id
//!
//! `verify` exit codes are stable and script-facing:
//!   0 = valid (including dynamically bound, not yet activated)
//!   1 = usage or I/O failure (including an unusable --machine value)
//!   2 = license file not found
//!   3 = license file or payload unparseable
//!   4 = bound to a different machine
//!   5 = signature rejected
//!   6 = expired

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use registra_license::{
    Expiry, IdentitySource, IssueOptions, Issuer, KeyMode, KeyStore, LicenseError,
    MachineIdentity, PlatformIdentity, SignedLicense, Validity, Verifier,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const EXIT_VALID: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_NOT_FOUND: u8 = 2;
const EXIT_PARSE: u8 = 3;
const EXIT_MACHINE_MISMATCH: u8 = 4;
const EXIT_NOT_AUTHENTIC: u8 = 5;
const EXIT_EXPIRED: u8 = 6;

#[derive(Parser, Debug)]
#[command(name = "registra")]
#[command(about = "Registra license issuance and verification")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an RSA-2048 key pair as PEM files
    Keygen {
        /// Directory to write registra.pem and registra.pub.pem into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Issue a signed license file
    Issue {
        /// Path to the private key PEM
        #[arg(short, long)]
        key: PathBuf,

        /// Validity in days from now (omit for an unlimited license)
        #[arg(long, conflicts_with = "unlimited", allow_negative_numbers = true)]
        days: Option<i64>,

        /// Issue a license that never expires
        #[arg(long)]
        unlimited: bool,

        /// Device cap
        #[arg(long, default_value = "1")]
        devices: u32,

        /// Pre-bind to a machine identifier (normalized before use)
        #[arg(long, conflicts_with = "bind_this")]
        bind: Option<String>,

        /// Pre-bind to this machine's resolved identity
        #[arg(long)]
        bind_this: bool,

        /// Issue the legacy compact key for this product code instead of
        /// a structured payload
        #[arg(long)]
        product: Option<String>,

        /// Where to write the license file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Verify a license file and report a stable exit code
    Verify {
        /// Path to the license file
        path: PathBuf,

        /// Path to the public key PEM
        #[arg(short, long)]
        public: PathBuf,

        /// Machine identifier to check binding against (default: resolve
        /// this machine's identity)
        #[arg(short, long)]
        machine: Option<String>,
    },

    /// Print this machine's resolved identity
    MachineId,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match run(args.command) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(command: Command) -> Result<u8> {
    match command {
        Command::Keygen { out_dir } => keygen(&out_dir).map(|()| EXIT_VALID),
        Command::Issue {
            key,
            days,
            unlimited,
            devices,
            bind,
            bind_this,
            product,
            out,
        } => issue(&key, days, unlimited, devices, bind, bind_this, product, &out)
            .map(|()| EXIT_VALID),
        Command::Verify {
            path,
            public,
            machine,
        } => verify(&path, &public, machine),
        Command::MachineId => {
            match PlatformIdentity.resolve() {
                Some(id) => println!("{id}"),
                None => println!("(no machine identity obtainable; licenses bind dynamically)"),
            }
            Ok(EXIT_VALID)
        }
    }
}

fn keygen(out_dir: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;
    info!("generating RSA-2048 key pair...");
    let keystore = KeyStore::generate()?;
    let private_path = out_dir.join("registra.pem");
    let public_path = out_dir.join("registra.pub.pem");
    std::fs::write(&private_path, keystore.private_pem()?)
        .with_context(|| format!("cannot write {}", private_path.display()))?;
    std::fs::write(&public_path, keystore.public_pem()?)
        .with_context(|| format!("cannot write {}", public_path.display()))?;
    info!("wrote {} and {}", private_path.display(), public_path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn issue(
    key: &PathBuf,
    days: Option<i64>,
    unlimited: bool,
    devices: u32,
    bind: Option<String>,
    bind_this: bool,
    product: Option<String>,
    out: &PathBuf,
) -> Result<()> {
    let expiry = match (days, unlimited) {
        (Some(d), false) => Expiry::At(Utc::now() + Duration::days(d)),
        (None, true) => Expiry::Never,
        (None, false) => bail!("specify either --days or --unlimited"),
        (Some(_), true) => unreachable!("clap rejects the combination"),
    };

    let machine_id = if bind_this {
        let id = PlatformIdentity
            .resolve()
            .context("no machine identity obtainable on this host")?;
        Some(id)
    } else {
        match bind {
            Some(raw) => Some(
                MachineIdentity::normalize(&raw)
                    .with_context(|| format!("machine identifier {raw:?} normalizes to nothing"))?,
            ),
            None => None,
        }
    };

    let keystore = KeyStore::load_private(key)?;
    let issuer = Issuer::new(&keystore);

    let license = match product {
        Some(code) => {
            if machine_id.is_some() || devices != 1 {
                bail!("compact licenses are single-device and dynamically bound");
            }
            issuer.with_mode(KeyMode::Compact).issue_compact(&code, expiry)?
        }
        None => issuer.issue(IssueOptions {
            expiry,
            max_devices: devices,
            machine_id,
        })?,
    };

    std::fs::write(out, license.to_json()?)
        .with_context(|| format!("cannot write {}", out.display()))?;

    println!("license key: {}", license.license_key);
    println!("expires:     {}", match license.expire_at {
        Some(t) => t.to_rfc3339(),
        None => "never".to_string(),
    });
    println!("devices:     {}", license.max_devices);
    println!("written to:  {}", out.display());
    Ok(())
}

fn verify(path: &PathBuf, public: &PathBuf, machine: Option<String>) -> Result<u8> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("license file not found: {}", path.display());
            return Ok(EXIT_NOT_FOUND);
        }
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
    };

    let license = match SignedLicense::parse(&bytes) {
        Ok(license) => license,
        Err(e) => {
            eprintln!("cannot parse license: {e}");
            return Ok(EXIT_PARSE);
        }
    };

    // An explicit --machine that normalizes to nothing is an operator
    // mistake, not a dynamically bound host; rejecting it keeps a bound
    // license from verifying as valid against a typo.
    let observed = match machine {
        Some(raw) => Some(
            MachineIdentity::normalize(&raw)
                .with_context(|| format!("machine identifier {raw:?} normalizes to nothing"))?,
        ),
        None => PlatformIdentity.resolve(),
    };

    let keystore = KeyStore::load_public(public)?;
    let verifier = Verifier::new(&keystore);
    let verdict = match verifier.validate(&license, Utc::now(), observed.as_ref()) {
        Ok(verdict) => verdict,
        Err(e @ (LicenseError::Codec(_) | LicenseError::Format(_))) => {
            eprintln!("cannot parse license: {e}");
            return Ok(EXIT_PARSE);
        }
        Err(e) => return Err(e.into()),
    };

    match verdict {
        Validity::Valid { binding, .. } => {
            println!("license {} is valid ({binding:?})", license.license_key);
            Ok(EXIT_VALID)
        }
        Validity::NotAuthentic => {
            warn!("signature rejected; the license is not trusted");
            println!("license {} is NOT authentic", license.license_key);
            Ok(EXIT_NOT_AUTHENTIC)
        }
        Validity::Expired { expire_at } => {
            println!(
                "license {} expired on {} (renew to continue)",
                license.license_key,
                expire_at.to_rfc3339()
            );
            Ok(EXIT_EXPIRED)
        }
        Validity::WrongMachine => {
            println!(
                "license {} is bound to a different machine (contact your administrator)",
                license.license_key
            );
            Ok(EXIT_MACHINE_MISMATCH)
        }
    }
}
