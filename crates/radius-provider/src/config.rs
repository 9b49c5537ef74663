use crate::clients::ClientNetworks;
use crate::provider::ProviderSnapshot;
use radius_proto::{Attribute, Dictionary, DictionaryError, ValidationMode};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid client network: {0}")]
    InvalidNetwork(String),
    #[error("Shared secret cannot be empty")]
    EmptySecret,
    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),
}

/// A vendor attribute attached to every Access-Accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub vendor: String,
    pub attribute: String,
    /// Textual value, converted per the attribute's dictionary type
    pub value: String,
}

impl AttributeRule {
    pub fn new(
        vendor: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        AttributeRule {
            vendor: vendor.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name of the provider
    #[serde(default = "default_name")]
    pub name: String,

    /// Shared secret used by every authorized client
    #[serde(default = "default_shared_secret")]
    pub shared_secret: String,

    /// Comma-separated list of networks allowed to send requests
    #[serde(default = "default_client_networks")]
    pub client_networks: String,

    /// Accept `password;code` credentials and pass the code to verification
    #[serde(default = "default_mfa_support")]
    pub mfa_support: bool,

    /// Vendor attributes attached to every Access-Accept
    #[serde(default = "default_attributes")]
    pub attributes: Vec<AttributeRule>,

    /// FreeRADIUS-style dictionary file with additional vendors (optional)
    #[serde(default)]
    pub dictionary_path: Option<String>,

    /// Drop requests without a Message-Authenticator (RFC 3579)
    #[serde(default)]
    pub require_message_authenticator: bool,

    /// Strict RFC 2865 compliance mode (default: false)
    /// When enabled, requests must identify their NAS and carry well-formed
    /// attribute values.
    #[serde(default)]
    pub strict_rfc_compliance: bool,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Audit log file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

fn default_name() -> String {
    "radius".to_string()
}

fn default_shared_secret() -> String {
    generate_secret()
}

fn default_client_networks() -> String {
    "0.0.0.0/0, ::/0".to_string()
}

fn default_mfa_support() -> bool {
    true
}

fn default_attributes() -> Vec<AttributeRule> {
    vec![AttributeRule::new(
        Dictionary::CISCO_VENDOR,
        Dictionary::CISCO_AVPAIR,
        "shell:priv-level=15",
    )]
}

/// Random 40 character alphanumeric secret
pub fn generate_secret() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 40)
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            name: default_name(),
            shared_secret: default_shared_secret(),
            client_networks: default_client_networks(),
            mfa_support: default_mfa_support(),
            attributes: default_attributes(),
            dictionary_path: None,
            require_message_authenticator: false,
            strict_rfc_compliance: false,
            log_level: None,
            audit_log_path: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("shared_secret", &"<redacted>")
            .field("client_networks", &self.client_networks)
            .field("mfa_support", &self.mfa_support)
            .field("attributes", &self.attributes)
            .field("dictionary_path", &self.dictionary_path)
            .field(
                "require_message_authenticator",
                &self.require_message_authenticator,
            )
            .field("strict_rfc_compliance", &self.strict_rfc_compliance)
            .field("log_level", &self.log_level)
            .field("audit_log_path", &self.audit_log_path)
            .finish()
    }
}

impl ProviderConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: ProviderConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// Performs the same checks as [`compile`](Self::compile) without keeping
    /// the result.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    pub fn validation_mode(&self) -> ValidationMode {
        if self.strict_rfc_compliance {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        }
    }

    /// Build the dictionary: builtin vendors plus the configured file
    pub fn dictionary(&self) -> Result<Dictionary, ConfigError> {
        let mut dictionary = Dictionary::builtin();
        if let Some(ref path) = self.dictionary_path {
            dictionary.load_file(path)?;
        }
        Ok(dictionary)
    }

    /// Compile into the immutable snapshot read by request processing
    pub fn compile(&self) -> Result<ProviderSnapshot, ConfigError> {
        if self.shared_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let networks = ClientNetworks::parse(&self.client_networks)?;
        if networks.is_empty() {
            return Err(ConfigError::Invalid(
                "client_networks must list at least one network".to_string(),
            ));
        }

        let dictionary = self.dictionary()?;
        let accept_attributes = self
            .attributes
            .iter()
            .map(|rule| dictionary.vendor_attribute(&rule.vendor, &rule.attribute, &rule.value))
            .collect::<Result<Vec<Attribute>, _>>()?;

        Ok(ProviderSnapshot::new(
            self.name.clone(),
            self.shared_secret.as_bytes().to_vec(),
            networks,
            self.mfa_support,
            dictionary,
            accept_attributes,
            self.require_message_authenticator,
            self.validation_mode(),
        ))
    }

    /// Create an example configuration file
    pub fn example() -> Self {
        ProviderConfig {
            name: "network-devices".to_string(),
            shared_secret: generate_secret(),
            client_networks: "10.0.0.0/8, 192.168.1.0/24, 2001:db8::/32".to_string(),
            mfa_support: true,
            attributes: default_attributes(),
            dictionary_path: None,
            require_message_authenticator: true,
            strict_rfc_compliance: false,
            log_level: Some("info".to_string()),
            audit_log_path: Some("/var/log/radius/audit.log".to_string()),
        }
    }
}
