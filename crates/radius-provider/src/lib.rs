//! RADIUS Provider Core
//!
//! The server-side decisions of a RADIUS authentication provider, built on
//! top of the `radius-proto` protocol implementation. The socket is owned by
//! the caller; this crate turns an inbound datagram into the bytes to send
//! back, or into nothing.
//!
//! # Features
//!
//! - Client authorization by most specific CIDR match
//! - `password;code` credential splitting for MFA
//! - Pluggable async credential verification
//! - Signed Access-Accept with configured vendor attributes (Cisco AVPair)
//! - Atomic configuration reload and JSON audit logging
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_provider::{AuditLogger, ProviderConfig, ProviderHandle, RequestHandler, StaticVerifier};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut verifier = StaticVerifier::new();
//!     verifier.add_mfa_user("alice", "password", "123456");
//!
//!     let config = ProviderConfig::from_file("config.json")?;
//!     let handler = RequestHandler::new(
//!         Arc::new(ProviderHandle::from_config(&config)?),
//!         Arc::new(verifier),
//!         Arc::new(AuditLogger::new(config.audit_log_path.clone())?),
//!     );
//!
//!     let socket = tokio::net::UdpSocket::bind("0.0.0.0:1812").await?;
//!     let mut buf = vec![0u8; 4096];
//!     loop {
//!         let (len, addr) = socket.recv_from(&mut buf).await?;
//!         if let Some(reply) = handler.handle(&buf[..len], addr.ip()).await {
//!             socket.send_to(&reply, addr).await?;
//!         }
//!     }
//! }
//! ```

pub mod audit;
pub mod clients;
pub mod config;
pub mod credential;
pub mod handler;
pub mod outpost;
pub mod provider;
pub mod response;
pub mod verifier;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use clients::{AuthorizeError, ClientMatch, ClientNetworks};
pub use config::{AttributeRule, ConfigError, ProviderConfig};
pub use credential::Credential;
pub use handler::{RequestError, RequestHandler};
pub use outpost::{decode_attribute_payload, encode_attribute_payload, render_attributes};
pub use provider::{ProviderHandle, ProviderSnapshot};
pub use response::{build_accept, build_reject, Response};
pub use verifier::{
    CredentialVerifier, RejectReason, StaticVerifier, VerificationRequest, Verdict, VerifierError,
};
