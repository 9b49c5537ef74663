//! Splitting of combined password and one-time code credentials
//!
//! NAS devices have a single password field, so with MFA enabled users type
//! `password;123456`. The code follows the last `;`, which lets the password
//! itself contain semicolons.

use std::fmt;

/// Separator between the password and the one-time code
pub const MFA_SEPARATOR: char = ';';

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub password: String,
    pub one_time_code: Option<String>,
}

impl Credential {
    /// Split a submitted password.
    ///
    /// The base password may be empty (`";123456"`); rejecting it is left to
    /// credential verification.
    pub fn split(raw: &str, mfa_enabled: bool) -> Self {
        if mfa_enabled {
            if let Some((password, code)) = raw.rsplit_once(MFA_SEPARATOR) {
                return Credential {
                    password: password.to_string(),
                    one_time_code: Some(code.to_string()),
                };
            }
        }

        Credential {
            password: raw.to_string(),
            one_time_code: None,
        }
    }

    pub fn has_one_time_code(&self) -> bool {
        self.one_time_code.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("password", &"<redacted>")
            .field(
                "one_time_code",
                &self.one_time_code.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
