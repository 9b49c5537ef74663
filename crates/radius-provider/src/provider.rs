//! Compiled provider state and its atomic publication
//!
//! Request processing never reads [`ProviderConfig`] directly. A config is
//! compiled into a [`ProviderSnapshot`] once, and in-flight requests keep the
//! `Arc` they started with while a reload swaps in the next one.

use crate::clients::{ClientMatch, ClientNetworks};
use crate::config::{ConfigError, ProviderConfig};
use radius_proto::{Attribute, Dictionary, ValidationMode};
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Immutable, validated form of a [`ProviderConfig`]
pub struct ProviderSnapshot {
    name: String,
    secret: Vec<u8>,
    networks: ClientNetworks,
    mfa_support: bool,
    dictionary: Arc<Dictionary>,
    accept_attributes: Vec<Attribute>,
    require_message_authenticator: bool,
    validation_mode: ValidationMode,
}

impl ProviderSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        secret: Vec<u8>,
        networks: ClientNetworks,
        mfa_support: bool,
        dictionary: Dictionary,
        accept_attributes: Vec<Attribute>,
        require_message_authenticator: bool,
        validation_mode: ValidationMode,
    ) -> Self {
        ProviderSnapshot {
            name,
            secret,
            networks,
            mfa_support,
            dictionary: Arc::new(dictionary),
            accept_attributes,
            require_message_authenticator,
            validation_mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn networks(&self) -> &ClientNetworks {
        &self.networks
    }

    pub fn mfa_support(&self) -> bool {
        self.mfa_support
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Encoded vendor attributes attached to every Access-Accept, in order
    pub fn accept_attributes(&self) -> &[Attribute] {
        &self.accept_attributes
    }

    pub fn require_message_authenticator(&self) -> bool {
        self.require_message_authenticator
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }

    pub fn authorize(&self, source: IpAddr) -> ClientMatch {
        self.networks.authorize(source)
    }
}

impl fmt::Debug for ProviderSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSnapshot")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("networks", &self.networks.to_string())
            .field("mfa_support", &self.mfa_support)
            .field("accept_attributes", &self.accept_attributes.len())
            .field(
                "require_message_authenticator",
                &self.require_message_authenticator,
            )
            .field("validation_mode", &self.validation_mode)
            .finish()
    }
}

/// Shared handle to the active snapshot
#[derive(Default)]
pub struct ProviderHandle {
    active: RwLock<Option<Arc<ProviderSnapshot>>>,
}

impl ProviderHandle {
    /// Handle with no active snapshot; requests are dropped until
    /// [`apply`](Self::apply) succeeds.
    pub fn new() -> Self {
        ProviderHandle::default()
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let handle = ProviderHandle::new();
        handle.apply(config)?;
        Ok(handle)
    }

    /// Currently active snapshot, if any
    pub fn current(&self) -> Option<Arc<ProviderSnapshot>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Compile `config` and publish it.
    ///
    /// On failure the previous snapshot is withdrawn as well: a provider whose
    /// latest configuration is invalid answers nothing.
    pub fn apply(&self, config: &ProviderConfig) -> Result<Arc<ProviderSnapshot>, ConfigError> {
        match config.compile() {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.publish(Some(Arc::clone(&snapshot)));
                info!(
                    provider = %snapshot.name(),
                    networks = %snapshot.networks(),
                    mfa_support = snapshot.mfa_support(),
                    "Applied provider configuration"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.publish(None);
                warn!(provider = %config.name, error = %e, "Rejected provider configuration");
                Err(e)
            }
        }
    }

    /// Withdraw the active snapshot
    pub fn clear(&self) {
        self.publish(None);
    }

    fn publish(&self, snapshot: Option<Arc<ProviderSnapshot>>) {
        *self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }
}
