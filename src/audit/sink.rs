//! Audit sinks
//!
//! The primary sink is the host's system event log; the fallback is an
//! append-only text file next to the ledger data.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, SecondsFormat, Utc};

use crate::error::{LedgerError, LedgerResult};

use super::entry::Severity;

/// A destination for rendered audit messages
pub trait EventSink: Send + Sync {
    /// Prepare the sink for writing (register the event source)
    fn register(&self) -> LedgerResult<()>;

    /// Write one message
    fn write(&self, severity: Severity, message: &str) -> LedgerResult<()>;
}

/// Default location of the local syslog socket
pub const SYSLOG_SOCKET: &str = "/dev/log";

// RFC 3164 facility "user-level messages"
const FACILITY_USER: u8 = 1;

/// System event log sink speaking the BSD syslog protocol over a local socket
pub struct SyslogSink {
    source: String,
    socket_path: PathBuf,
    #[cfg(unix)]
    socket: Mutex<Option<std::os::unix::net::UnixDatagram>>,
}

impl SyslogSink {
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_socket(source, SYSLOG_SOCKET)
    }

    pub fn with_socket(source: impl Into<String>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            socket_path: socket_path.into(),
            #[cfg(unix)]
            socket: Mutex::new(None),
        }
    }

    fn frame(&self, severity: Severity, message: &str) -> String {
        let level: u8 = match severity {
            Severity::Information => 6,
            Severity::Warning => 4,
        };
        let priority = FACILITY_USER * 8 + level;
        let tag: String = self
            .source
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();

        format!(
            "<{}>{} {}[{}]: {}",
            priority,
            Local::now().format("%b %e %H:%M:%S"),
            tag,
            std::process::id(),
            message.replace('\n', " | ")
        )
    }
}

#[cfg(unix)]
impl EventSink for SyslogSink {
    fn register(&self) -> LedgerResult<()> {
        let mut socket = self
            .socket
            .lock()
            .map_err(|_| LedgerError::Io("event log lock poisoned".to_string()))?;
        if socket.is_some() {
            return Ok(());
        }

        let datagram = std::os::unix::net::UnixDatagram::unbound()?;
        datagram.connect(&self.socket_path)?;
        *socket = Some(datagram);
        Ok(())
    }

    fn write(&self, severity: Severity, message: &str) -> LedgerResult<()> {
        let socket = self
            .socket
            .lock()
            .map_err(|_| LedgerError::Io("event log lock poisoned".to_string()))?;
        let datagram = socket
            .as_ref()
            .ok_or_else(|| LedgerError::Io("event source is not registered".to_string()))?;

        datagram.send(self.frame(severity, message).as_bytes())?;
        Ok(())
    }
}

#[cfg(not(unix))]
impl EventSink for SyslogSink {
    fn register(&self) -> LedgerResult<()> {
        Err(LedgerError::Io(format!(
            "no system event log at {}",
            self.socket_path.display()
        )))
    }

    fn write(&self, _severity: Severity, _message: &str) -> LedgerResult<()> {
        Err(LedgerError::Io("no system event log".to_string()))
    }
}

/// Append-only fallback file
///
/// Each message is written as `[<UTC timestamp>] <message>` followed by a
/// blank line.
pub struct FallbackLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FallbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one message block
    pub fn append(&self, message: &str) -> std::io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| std::io::Error::other("fallback log lock poisoned"))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let block = format!(
            "[{}] {}\n\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            message
        );
        file.write_all(block.as_bytes())?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fallback_block_format() {
        let temp_dir = TempDir::new().unwrap();
        let log = FallbackLog::new(temp_dir.path().join("audit-fallback.log"));

        log.append("WHO: a\nWHAT: b").unwrap();
        log.append("second").unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let blocks: Vec<&str> = contents.split("\n\n").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with('['));
        assert!(blocks[0].contains("] WHO: a\nWHAT: b"));
        assert!(blocks[1].ends_with("] second"));
    }

    #[test]
    fn test_fallback_unwritable_path_errors() {
        let temp_dir = TempDir::new().unwrap();
        let log = FallbackLog::new(temp_dir.path().join("missing-dir").join("audit.log"));
        assert!(log.append("x").is_err());
    }

    #[test]
    fn test_syslog_frame() {
        let sink = SyslogSink::new("Teller Ledger");
        let frame = sink.frame(Severity::Warning, "WHO: a\nWHAT: b");
        assert!(frame.starts_with("<12>"));
        assert!(frame.contains(" Teller-Ledger["));
        assert!(frame.ends_with("]: WHO: a | WHAT: b"));
    }

    #[cfg(unix)]
    #[test]
    fn test_syslog_missing_socket_fails_register() {
        let temp_dir = TempDir::new().unwrap();
        let sink = SyslogSink::with_socket("teller", temp_dir.path().join("no-such-socket"));
        assert!(sink.register().is_err());
        assert!(sink.write(Severity::Information, "x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_syslog_delivers_datagram() {
        use std::os::unix::net::UnixDatagram;

        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("log.sock");
        let receiver = UnixDatagram::bind(&socket_path).unwrap();

        let sink = SyslogSink::with_socket("teller", &socket_path);
        sink.register().unwrap();
        sink.register().unwrap();
        sink.write(Severity::Information, "hello").unwrap();

        let mut buf = [0u8; 512];
        let n = receiver.recv(&mut buf).unwrap();
        let received = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(received.starts_with("<14>"));
        assert!(received.ends_with(": hello"));
    }
}
