use crate::credential::Credential;
use async_trait::async_trait;
use radius_proto::Attribute;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("Credential backend unavailable: {0}")]
    Unavailable(String),
    #[error("Credential backend error: {0}")]
    Backend(String),
}

/// Everything a credential backend learns about one request
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub username: String,
    pub credential: Credential,
    pub source: IpAddr,
    pub nas_identifier: Option<String>,
    pub calling_station_id: Option<String>,
}

/// Why a credential was refused. Only ever written to logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnknownUser,
    InvalidPassword,
    MissingOneTimeCode,
    InvalidOneTimeCode,
    UnsupportedAuthMethod,
    AccountDisabled,
    VerifierFailed(String),
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnknownUser => write!(f, "unknown user"),
            RejectReason::InvalidPassword => write!(f, "invalid password"),
            RejectReason::MissingOneTimeCode => write!(f, "missing one-time code"),
            RejectReason::InvalidOneTimeCode => write!(f, "invalid one-time code"),
            RejectReason::UnsupportedAuthMethod => write!(f, "unsupported authentication method"),
            RejectReason::AccountDisabled => write!(f, "account disabled"),
            RejectReason::VerifierFailed(e) => write!(f, "verifier failed: {}", e),
            RejectReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Outcome of credential verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Accept, with attributes appended after the configured ones
    Accept { attributes: Vec<Attribute> },
    Reject { reason: RejectReason },
}

impl Verdict {
    pub fn accept() -> Self {
        Verdict::Accept { attributes: vec![] }
    }

    pub fn reject(reason: RejectReason) -> Self {
        Verdict::Reject { reason }
    }
}

/// Credential verification backend
///
/// Implement this trait to check users against a directory. It is the only
/// point where request processing awaits.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, request: &VerificationRequest) -> Result<Verdict, VerifierError>;
}

#[derive(Clone)]
struct StaticUser {
    password: String,
    one_time_code: Option<String>,
}

/// Simple in-memory verifier for testing and local runs
#[derive(Default)]
pub struct StaticVerifier {
    users: HashMap<String, StaticUser>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        StaticVerifier::default()
    }

    pub fn add_user(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(
            username.into(),
            StaticUser {
                password: password.into(),
                one_time_code: None,
            },
        );
    }

    /// Add a user that must also present `code` after the password
    pub fn add_mfa_user(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.users.insert(
            username.into(),
            StaticUser {
                password: password.into(),
                one_time_code: Some(code.into()),
            },
        );
    }
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<Verdict, VerifierError> {
        let Some(user) = self.users.get(&request.username) else {
            return Ok(Verdict::reject(RejectReason::UnknownUser));
        };

        let credential = &request.credential;
        if credential.password.is_empty() || credential.password != user.password {
            return Ok(Verdict::reject(RejectReason::InvalidPassword));
        }

        match (&user.one_time_code, &credential.one_time_code) {
            (Some(_), None) => Ok(Verdict::reject(RejectReason::MissingOneTimeCode)),
            (Some(expected), Some(given)) if expected != given => {
                Ok(Verdict::reject(RejectReason::InvalidOneTimeCode))
            }
            _ => Ok(Verdict::accept()),
        }
    }
}
