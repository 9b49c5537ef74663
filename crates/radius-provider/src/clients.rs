//! Client authorization by source network
//!
//! A provider lists the networks NAS devices may connect from as
//! comma-separated CIDR text. A request is authorized by the most specific
//! network containing its source address; addresses outside every network are
//! dropped without a response.

use crate::config::ConfigError;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeError {
    #[error("Malformed source address: {0}")]
    MalformedAddress(String),
}

/// Result of matching a source address against the configured networks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMatch {
    pub allowed: bool,
    pub matched_prefix: Option<IpNetwork>,
}

impl ClientMatch {
    fn denied() -> Self {
        ClientMatch {
            allowed: false,
            matched_prefix: None,
        }
    }
}

/// Ordered list of networks parsed at configuration load
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientNetworks {
    networks: Vec<IpNetwork>,
}

impl ClientNetworks {
    /// Parse comma-separated CIDR text. Bare addresses become host networks.
    ///
    /// Empty entries (from stray or trailing commas) are skipped; any other
    /// unparsable entry fails the whole list.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let networks = text
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_network)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ClientNetworks { networks })
    }

    pub fn from_networks(networks: Vec<IpNetwork>) -> Self {
        ClientNetworks { networks }
    }

    /// Find the most specific configured network containing `source`.
    ///
    /// Longest prefix wins. Among equally specific networks the first one
    /// configured wins. IPv4-mapped IPv6 sources are matched as IPv4.
    pub fn authorize(&self, source: IpAddr) -> ClientMatch {
        let source = source.to_canonical();
        let mut best: Option<IpNetwork> = None;

        for network in self.networks.iter().filter(|n| n.contains(source)) {
            match best {
                Some(current) if current.prefix() >= network.prefix() => {}
                _ => best = Some(*network),
            }
        }

        match best {
            Some(network) => ClientMatch {
                allowed: true,
                matched_prefix: Some(network),
            },
            None => ClientMatch::denied(),
        }
    }

    /// Like [`authorize`](Self::authorize) for a textual source address
    pub fn authorize_str(&self, source: &str) -> Result<ClientMatch, AuthorizeError> {
        let addr: IpAddr = source
            .trim()
            .parse()
            .map_err(|_| AuthorizeError::MalformedAddress(source.to_string()))?;
        Ok(self.authorize(addr))
    }

    pub fn networks(&self) -> &[IpNetwork] {
        &self.networks
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }
}

impl fmt::Display for ClientNetworks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, network) in self.networks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", network)?;
        }
        Ok(())
    }
}

fn parse_network(entry: &str) -> Result<IpNetwork, ConfigError> {
    if let Ok(network) = entry.parse::<IpNetwork>() {
        return Ok(network);
    }

    if let Ok(ip) = entry.parse::<IpAddr>() {
        return Ok(IpNetwork::from(ip));
    }

    Err(ConfigError::InvalidNetwork(entry.to_string()))
}
