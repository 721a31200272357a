//! Where and how an audited operation ran
//!
//! The location is the first active hardware address, else an IPv4 address of
//! this host, else the host name. The application string names the binary,
//! its version and the SHA-256 of the executable file.

use std::io::Read;
use std::net::{IpAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::OnceLock;

use sha2::{Digest, Sha256};

const UNKNOWN_HOST: &str = "unknown-host";
const UNAVAILABLE_HASH: &str = "UnavailableHash";

/// Location and application fingerprint attached to every audit event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingContext {
    pub location: String,
    pub application: String,
}

impl OperatingContext {
    pub fn new(location: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            application: application.into(),
        }
    }

    /// Capture the context of the running process
    ///
    /// Never fails; each source falls through to the next.
    pub fn capture() -> Self {
        let location = mac_address()
            .or_else(ipv4_address)
            .or_else(host_name)
            .unwrap_or_else(|| UNKNOWN_HOST.to_string());

        Self {
            location,
            application: application_metadata().to_string(),
        }
    }
}

fn host_name() -> Option<String> {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
}

fn ipv4_address() -> Option<String> {
    let host = host_name()?;
    (host.as_str(), 0)
        .to_socket_addrs()
        .ok()?
        .map(|addr| addr.ip())
        .find(|ip| matches!(ip, IpAddr::V4(v4) if !v4.is_loopback()))
        .map(|ip| ip.to_string())
}

#[cfg(target_os = "linux")]
fn mac_address() -> Option<String> {
    let entries = std::fs::read_dir("/sys/class/net").ok()?;

    let mut names: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "lo")
        .collect();
    names.sort();

    names.iter().find_map(|name| {
        let dir = Path::new("/sys/class/net").join(name);
        let state = std::fs::read_to_string(dir.join("operstate")).ok()?;
        if state.trim() != "up" {
            return None;
        }
        let address = std::fs::read_to_string(dir.join("address")).ok()?;
        format_hardware_address(address.trim())
    })
}

#[cfg(not(target_os = "linux"))]
fn mac_address() -> Option<String> {
    None
}

/// Normalize `aa:bb:cc:dd:ee:ff` to `AA-BB-CC-DD-EE-FF`; all-zero is no address
fn format_hardware_address(raw: &str) -> Option<String> {
    let octets: Vec<&str> = raw.split(':').collect();
    if octets.len() < 6 || octets.iter().all(|o| o.trim_start_matches('0').is_empty()) {
        return None;
    }
    Some(octets.join("-").to_uppercase())
}

fn application_metadata() -> &'static str {
    static METADATA: OnceLock<String> = OnceLock::new();
    METADATA.get_or_init(|| {
        let hash = std::env::current_exe()
            .ok()
            .and_then(|path| sha256_of_file(&path))
            .unwrap_or_else(|| UNAVAILABLE_HASH.to_string());

        format!(
            "Name={}; Version={}; Sha256={}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            hash
        )
    })
}

fn sha256_of_file(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = file.read(&mut buffer).ok()?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Some(hex::encode_upper(hasher.finalize()))
}
