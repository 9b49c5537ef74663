//! Audit logging for provider decisions
//!
//! Every processed request ends in exactly one audit entry, written as a JSON
//! line. Entries record who asked, from where, which client network matched
//! and why a request was refused. Secrets and credentials are never recorded.

use chrono::{SecondsFormat, Utc};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Audit event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Access-Accept sent
    AuthSuccess,
    /// Access-Reject sent
    AuthFailure,
    /// Source address outside every client network
    UnauthorizedClient,
    /// Datagram could not be decoded
    MalformedPacket,
    /// Message-Authenticator missing or wrong
    BadAuthenticator,
    /// Decoded request failed validation or password decryption
    InvalidRequest,
    /// Status-Server answered
    StatusServer,
    /// Packet arrived while no configuration was active
    ProviderUnavailable,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Timestamp (Unix epoch seconds)
    pub timestamp: i64,
    /// RFC 3339 timestamp
    pub timestamp_iso: String,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Client network that authorized the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub provider_version: String,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        let now = Utc::now();

        AuditEntry {
            timestamp: now.timestamp(),
            timestamp_iso: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            event_type,
            provider: None,
            username: None,
            client_ip: None,
            matched_network: None,
            request_id: None,
            reason: None,
            provider_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip.to_string());
        self
    }

    pub fn with_matched_network(mut self, network: Option<IpNetwork>) -> Self {
        self.matched_network = network.map(|n| n.to_string());
        self
    }

    pub fn with_request_id(mut self, id: u8) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_reason(mut self, reason: impl ToString) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

/// Audit logger
#[derive(Default)]
pub struct AuditLogger {
    file_path: Option<String>,
    file: Option<Arc<Mutex<std::fs::File>>>,
}

impl AuditLogger {
    /// Open (or create) the audit log. `None` disables auditing.
    pub fn new(file_path: Option<String>) -> std::io::Result<Self> {
        let file = match file_path {
            Some(ref path) => {
                let f = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Arc::new(Mutex::new(f)))
            }
            None => None,
        };

        Ok(AuditLogger { file_path, file })
    }

    pub fn disabled() -> Self {
        AuditLogger::default()
    }

    /// Append an entry. Write failures are reported through `tracing` only.
    pub async fn log(&self, entry: AuditEntry) {
        let Some(ref file) = self.file else {
            return;
        };

        match serde_json::to_string(&entry) {
            Ok(json) => {
                let mut f = file.lock().await;
                if let Err(e) = writeln!(f, "{}", json) {
                    error!("Failed to write audit log: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize audit entry: {}", e),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_audit_entry_creation() {
        let entry = AuditEntry::new(AuditEventType::AuthSuccess)
            .with_username("testuser")
            .with_client_ip("192.168.1.1".parse().unwrap())
            .with_matched_network(Some("192.168.0.0/16".parse().unwrap()))
            .with_request_id(42);

        assert_eq!(entry.username.as_deref(), Some("testuser"));
        assert_eq!(entry.client_ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(entry.matched_network.as_deref(), Some("192.168.0.0/16"));
        assert_eq!(entry.request_id, Some(42));
        assert!(entry.timestamp_iso.ends_with('Z'));
    }

    #[test]
    fn test_audit_entry_serialization() {
        let entry = AuditEntry::new(AuditEventType::UnauthorizedClient)
            .with_client_ip("10.0.0.1".parse().unwrap())
            .with_reason("no matching client network");

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("unauthorized_client"));
        assert!(json.contains("no matching client network"));
        assert!(!json.contains("username"));
        assert!(!json.contains("matched_network"));
    }

    #[tokio::test]
    async fn test_audit_logger_appends_lines() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let logger = AuditLogger::new(Some(path.clone())).unwrap();
        assert!(logger.is_enabled());
        assert_eq!(logger.file_path(), Some(path.as_str()));

        logger
            .log(AuditEntry::new(AuditEventType::AuthSuccess).with_username("alice"))
            .await;
        logger
            .log(AuditEntry::new(AuditEventType::AuthFailure).with_username("bob"))
            .await;

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.event_type, AuditEventType::AuthFailure);
        assert_eq!(second.username.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_audit_logger_disabled() {
        let logger = AuditLogger::disabled();
        assert!(!logger.is_enabled());
        logger.log(AuditEntry::new(AuditEventType::StatusServer)).await;
    }
}
