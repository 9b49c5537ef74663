//! Vendor attribute dictionary
//!
//! Maps `(vendor, attribute)` names to wire codes and declared value types, so
//! that configured attribute values are encoded by their declared type rather
//! than by guessing from the text. A dictionary is built once (at startup or on
//! configuration reload) and shared read-only afterwards.
//!
//! The text format is the subset of the FreeRADIUS dictionary syntax needed to
//! describe vendor attributes:
//!
//! ```text
//! VENDOR          Cisco   9
//! BEGIN-VENDOR    Cisco
//! ATTRIBUTE       AVPair  1   string
//! END-VENDOR      Cisco
//! ```

use crate::attributes::{Attribute, VendorAttribute};
use crate::packet::PacketError;
use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Unknown vendor: {0}")]
    UnknownVendor(String),
    #[error("Vendor {name} already registered with id {existing}")]
    DuplicateVendor { name: String, existing: u32 },
    #[error("Attribute {vendor}/{attribute} already defined differently")]
    DuplicateDefinition { vendor: String, attribute: String },
    #[error("Attribute not found: {vendor}/{attribute}")]
    NotFound { vendor: String, attribute: String },
    #[error("Unknown attribute type: {0}")]
    UnknownKind(String),
    #[error("Invalid {kind} value {value:?}")]
    InvalidValue { kind: AttributeKind, value: String },
    #[error("Dictionary syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Failed to read dictionary: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
}

/// Declared wire type of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// UTF-8 text
    String,
    /// 32-bit unsigned, network byte order
    Integer,
    /// IPv4 address, 4 octets
    IpAddr,
    /// IPv6 address, 16 octets
    Ipv6Addr,
    /// Opaque bytes
    Octets,
}

impl AttributeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Integer => "integer",
            AttributeKind::IpAddr => "ipaddr",
            AttributeKind::Ipv6Addr => "ipv6addr",
            AttributeKind::Octets => "octets",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = DictionaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "text" => Ok(AttributeKind::String),
            "integer" => Ok(AttributeKind::Integer),
            "ipaddr" => Ok(AttributeKind::IpAddr),
            "ipv6addr" => Ok(AttributeKind::Ipv6Addr),
            "octets" => Ok(AttributeKind::Octets),
            other => Err(DictionaryError::UnknownKind(other.to_string())),
        }
    }
}

/// Metadata for one vendor attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub code: u8,
    pub kind: AttributeKind,
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Integer(u32),
    IpAddr(Ipv4Addr),
    Ipv6Addr(Ipv6Addr),
    Octets(Vec<u8>),
}

impl AttributeValue {
    /// Parse configured text according to the declared kind.
    ///
    /// Octets are written as `0x`-prefixed hex.
    pub fn parse(kind: AttributeKind, text: &str) -> Result<Self, DictionaryError> {
        let invalid = || DictionaryError::InvalidValue {
            kind,
            value: text.to_string(),
        };
        match kind {
            AttributeKind::String => Ok(AttributeValue::String(text.to_string())),
            AttributeKind::Integer => text
                .trim()
                .parse()
                .map(AttributeValue::Integer)
                .map_err(|_| invalid()),
            AttributeKind::IpAddr => text
                .trim()
                .parse()
                .map(AttributeValue::IpAddr)
                .map_err(|_| invalid()),
            AttributeKind::Ipv6Addr => text
                .trim()
                .parse()
                .map(AttributeValue::Ipv6Addr)
                .map_err(|_| invalid()),
            AttributeKind::Octets => {
                let text = text.trim();
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .ok_or_else(invalid)?;
                hex::decode(digits)
                    .map(AttributeValue::Octets)
                    .map_err(|_| invalid())
            }
        }
    }

    /// Decode raw wire bytes according to the declared kind
    pub fn decode(kind: AttributeKind, bytes: &[u8]) -> Result<Self, DictionaryError> {
        let invalid = || DictionaryError::InvalidValue {
            kind,
            value: format!("{:02x?}", bytes),
        };
        match kind {
            AttributeKind::String => std::str::from_utf8(bytes)
                .map(|s| AttributeValue::String(s.to_string()))
                .map_err(|_| invalid()),
            AttributeKind::Integer => <[u8; 4]>::try_from(bytes)
                .map(|b| AttributeValue::Integer(u32::from_be_bytes(b)))
                .map_err(|_| invalid()),
            AttributeKind::IpAddr => <[u8; 4]>::try_from(bytes)
                .map(|b| AttributeValue::IpAddr(Ipv4Addr::from(b)))
                .map_err(|_| invalid()),
            AttributeKind::Ipv6Addr => <[u8; 16]>::try_from(bytes)
                .map(|b| AttributeValue::Ipv6Addr(Ipv6Addr::from(b)))
                .map_err(|_| invalid()),
            AttributeKind::Octets => Ok(AttributeValue::Octets(bytes.to_vec())),
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::String(_) => AttributeKind::String,
            AttributeValue::Integer(_) => AttributeKind::Integer,
            AttributeValue::IpAddr(_) => AttributeKind::IpAddr,
            AttributeValue::Ipv6Addr(_) => AttributeKind::Ipv6Addr,
            AttributeValue::Octets(_) => AttributeKind::Octets,
        }
    }

    /// Wire representation
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            AttributeValue::String(s) => s.as_bytes().to_vec(),
            AttributeValue::Integer(n) => n.to_be_bytes().to_vec(),
            AttributeValue::IpAddr(ip) => ip.octets().to_vec(),
            AttributeValue::Ipv6Addr(ip) => ip.octets().to_vec(),
            AttributeValue::Octets(b) => b.clone(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Integer(n) => write!(f, "{}", n),
            AttributeValue::IpAddr(ip) => write!(f, "{}", ip),
            AttributeValue::Ipv6Addr(ip) => write!(f, "{}", ip),
            AttributeValue::Octets(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

/// Immutable-after-build table of vendors and their attributes
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    vendors: HashMap<String, u32>,
    attributes: HashMap<(String, String), AttributeDescriptor>,
    /// `(vendor id, code)` to the first `(vendor, attribute)` defined for it
    names: HashMap<(u32, u8), (String, String)>,
}

impl Dictionary {
    pub const CISCO_VENDOR: &'static str = "Cisco";
    pub const CISCO_VENDOR_ID: u32 = 9;
    pub const CISCO_AVPAIR: &'static str = "AVPair";
    pub const CISCO_AVPAIR_CODE: u8 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary preloaded with the Cisco AVPair attribute
    pub fn builtin() -> Self {
        let mut dict = Self::new();
        dict.vendors
            .insert(Self::CISCO_VENDOR.to_string(), Self::CISCO_VENDOR_ID);
        dict.insert_attribute(
            Self::CISCO_VENDOR_ID,
            (Self::CISCO_VENDOR.to_string(), Self::CISCO_AVPAIR.to_string()),
            AttributeDescriptor {
                code: Self::CISCO_AVPAIR_CODE,
                kind: AttributeKind::String,
            },
        );
        dict
    }

    /// Register a vendor. Re-registering the same id is a no-op.
    pub fn register(&mut self, vendor_name: &str, vendor_id: u32) -> Result<(), DictionaryError> {
        match self.vendors.get(vendor_name) {
            Some(&existing) if existing != vendor_id => Err(DictionaryError::DuplicateVendor {
                name: vendor_name.to_string(),
                existing,
            }),
            Some(_) => Ok(()),
            None => {
                self.vendors.insert(vendor_name.to_string(), vendor_id);
                Ok(())
            }
        }
    }

    /// Define an attribute under a registered vendor. Identical redefinition is a no-op.
    pub fn define(
        &mut self,
        vendor_name: &str,
        attribute_name: &str,
        code: u8,
        kind: AttributeKind,
    ) -> Result<(), DictionaryError> {
        let vendor_id = self
            .vendor_id(vendor_name)
            .ok_or_else(|| DictionaryError::UnknownVendor(vendor_name.to_string()))?;

        let key = (vendor_name.to_string(), attribute_name.to_string());
        let descriptor = AttributeDescriptor { code, kind };
        match self.attributes.get(&key) {
            Some(existing) if *existing != descriptor => {
                Err(DictionaryError::DuplicateDefinition {
                    vendor: key.0,
                    attribute: key.1,
                })
            }
            Some(_) => Ok(()),
            None => {
                self.insert_attribute(vendor_id, key, descriptor);
                Ok(())
            }
        }
    }

    fn insert_attribute(
        &mut self,
        vendor_id: u32,
        key: (String, String),
        descriptor: AttributeDescriptor,
    ) {
        self.names
            .entry((vendor_id, descriptor.code))
            .or_insert_with(|| key.clone());
        self.attributes.insert(key, descriptor);
    }

    pub fn lookup(
        &self,
        vendor_name: &str,
        attribute_name: &str,
    ) -> Result<AttributeDescriptor, DictionaryError> {
        self.attributes
            .get(&(vendor_name.to_string(), attribute_name.to_string()))
            .copied()
            .ok_or_else(|| DictionaryError::NotFound {
                vendor: vendor_name.to_string(),
                attribute: attribute_name.to_string(),
            })
    }

    pub fn vendor_id(&self, vendor_name: &str) -> Option<u32> {
        self.vendors.get(vendor_name).copied()
    }

    /// Reverse lookup of a decoded vendor sub-attribute.
    ///
    /// When several names share a code, the one defined first is returned.
    pub fn describe(
        &self,
        vendor_id: u32,
        code: u8,
    ) -> Option<(&str, &str, AttributeDescriptor)> {
        let key = self.names.get(&(vendor_id, code))?;
        let descriptor = self.attributes.get(key)?;
        Some((key.0.as_str(), key.1.as_str(), *descriptor))
    }

    /// Build an encodable Vendor-Specific attribute from configured text
    pub fn vendor_attribute(
        &self,
        vendor_name: &str,
        attribute_name: &str,
        text: &str,
    ) -> Result<Attribute, DictionaryError> {
        let descriptor = self.lookup(vendor_name, attribute_name)?;
        let vendor_id = self
            .vendor_id(vendor_name)
            .ok_or_else(|| DictionaryError::UnknownVendor(vendor_name.to_string()))?;
        let value = AttributeValue::parse(descriptor.kind, text)?;
        let attribute = VendorAttribute::new(vendor_id, descriptor.code, value.to_bytes())?;
        Ok(attribute.to_attribute()?)
    }

    /// Merge definitions from dictionary text into this dictionary
    pub fn parse_str(&mut self, text: &str) -> Result<(), DictionaryError> {
        let mut current_vendor: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let syntax = |message: &str| DictionaryError::Syntax {
                line: line_no,
                message: message.to_string(),
            };
            let fields: Vec<&str> = line.split_whitespace().collect();

            match fields.as_slice() {
                ["VENDOR", name, id, ..] => {
                    let id: u32 = id.parse().map_err(|_| syntax("invalid vendor id"))?;
                    self.register(name, id)?;
                }
                ["BEGIN-VENDOR", name, ..] => {
                    if current_vendor.is_some() {
                        return Err(syntax("nested BEGIN-VENDOR"));
                    }
                    if !self.vendors.contains_key(*name) {
                        return Err(DictionaryError::UnknownVendor(name.to_string()));
                    }
                    current_vendor = Some(name.to_string());
                }
                ["END-VENDOR", name, ..] => {
                    if current_vendor.as_deref() != Some(*name) {
                        return Err(syntax("END-VENDOR does not match BEGIN-VENDOR"));
                    }
                    current_vendor = None;
                }
                ["ATTRIBUTE", name, code, kind, ..] => {
                    let vendor = current_vendor
                        .as_deref()
                        .ok_or_else(|| syntax("ATTRIBUTE outside BEGIN-VENDOR block"))?;
                    let code: u8 = code.parse().map_err(|_| syntax("invalid attribute code"))?;
                    let kind: AttributeKind = kind.parse()?;
                    self.define(vendor, name, code, kind)?;
                }
                _ => return Err(syntax("unrecognized statement")),
            }
        }

        if let Some(vendor) = current_vendor {
            return Err(DictionaryError::Syntax {
                line: text.lines().count(),
                message: format!("missing END-VENDOR {}", vendor),
            });
        }
        Ok(())
    }

    /// Merge definitions from a dictionary file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), DictionaryError> {
        let text = std::fs::read_to_string(path)?;
        self.parse_str(&text)
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_cisco_avpair() {
        let dict = Dictionary::builtin();
        let desc = dict.lookup("Cisco", "AVPair").unwrap();
        assert_eq!(desc.code, 1);
        assert_eq!(desc.kind, AttributeKind::String);
        assert_eq!(dict.vendor_id("Cisco"), Some(9));
    }

    #[test]
    fn test_define_before_register() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.define("Juniper", "Local-User-Name", 1, AttributeKind::String),
            Err(DictionaryError::UnknownVendor(v)) if v == "Juniper"
        ));
    }

    #[test]
    fn test_duplicate_definition() {
        let mut dict = Dictionary::builtin();
        assert!(dict.define("Cisco", "AVPair", 1, AttributeKind::String).is_ok());
        assert!(matches!(
            dict.define("Cisco", "AVPair", 2, AttributeKind::String),
            Err(DictionaryError::DuplicateDefinition { .. })
        ));
        assert!(matches!(
            dict.define("Cisco", "AVPair", 1, AttributeKind::Octets),
            Err(DictionaryError::DuplicateDefinition { .. })
        ));
    }

    #[test]
    fn test_duplicate_vendor() {
        let mut dict = Dictionary::builtin();
        assert!(dict.register("Cisco", 9).is_ok());
        assert!(matches!(
            dict.register("Cisco", 10),
            Err(DictionaryError::DuplicateVendor { existing: 9, .. })
        ));
    }

    #[test]
    fn test_lookup_case_sensitive() {
        let dict = Dictionary::builtin();
        assert!(dict.lookup("cisco", "AVPair").is_err());
        assert!(dict.lookup("Cisco", "avpair").is_err());
    }

    #[test]
    fn test_describe() {
        let dict = Dictionary::builtin();
        let (vendor, name, desc) = dict.describe(9, 1).unwrap();
        assert_eq!((vendor, name, desc.kind), ("Cisco", "AVPair", AttributeKind::String));
        assert!(dict.describe(9, 2).is_none());
        assert!(dict.describe(10, 1).is_none());
    }

    #[test]
    fn test_describe_alias_prefers_first_definition() {
        for _ in 0..32 {
            let mut dict = Dictionary::builtin();
            dict.parse_str("BEGIN-VENDOR Cisco\nATTRIBUTE Cisco-AVPair 1 string\nEND-VENDOR Cisco")
                .unwrap();
            assert_eq!(dict.lookup("Cisco", "Cisco-AVPair").unwrap().code, 1);
            let (_, name, _) = dict.describe(9, 1).unwrap();
            assert_eq!(name, "AVPair");
        }

        let mut dict = Dictionary::new();
        dict.register("Cisco", 9).unwrap();
        dict.define("Cisco", "Cisco-AVPair", 1, AttributeKind::String)
            .unwrap();
        dict.define("Cisco", "AVPair", 1, AttributeKind::String).unwrap();
        assert_eq!(dict.describe(9, 1).unwrap().1, "Cisco-AVPair");
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(
            AttributeValue::parse(AttributeKind::Integer, "15").unwrap().to_bytes(),
            vec![0, 0, 0, 15]
        );
        assert_eq!(
            AttributeValue::parse(AttributeKind::IpAddr, "10.1.2.3").unwrap().to_bytes(),
            vec![10, 1, 2, 3]
        );
        assert_eq!(
            AttributeValue::parse(AttributeKind::Octets, "0xdeadBEEF").unwrap().to_bytes(),
            vec![0xde, 0xad, 0xbe, 0xef]
        );
        // the declared type decides: digits stay text for a string attribute
        assert_eq!(
            AttributeValue::parse(AttributeKind::String, "15").unwrap().to_bytes(),
            b"15".to_vec()
        );
        assert!(AttributeValue::parse(AttributeKind::Integer, "fifteen").is_err());
        assert!(AttributeValue::parse(AttributeKind::Octets, "dead").is_err());
        assert!(AttributeValue::parse(AttributeKind::Octets, "0xabc").is_err());
        assert!(AttributeValue::parse(AttributeKind::Octets, "0xzz").is_err());
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(
            AttributeValue::decode(AttributeKind::Integer, &[0, 0, 1, 0]).unwrap(),
            AttributeValue::Integer(256)
        );
        assert!(AttributeValue::decode(AttributeKind::Integer, &[0, 1]).is_err());
        assert_eq!(
            AttributeValue::Octets(vec![0x0a, 0xff]).to_string(),
            "0x0aff"
        );
    }

    #[test]
    fn test_vendor_attribute() {
        let dict = Dictionary::builtin();
        let attr = dict
            .vendor_attribute("Cisco", "AVPair", "shell:priv-level=15")
            .unwrap();
        assert_eq!(attr.attr_type, 26);
        assert_eq!(&attr.value[..6], &[0, 0, 0, 9, 1, 21]);
        assert_eq!(&attr.value[6..], b"shell:priv-level=15");

        assert!(matches!(
            dict.vendor_attribute("Cisco", "Missing", "x"),
            Err(DictionaryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_str() {
        let text = "\
# Juniper attributes
VENDOR          Juniper     2636

BEGIN-VENDOR    Juniper
ATTRIBUTE       Local-User-Name     1   string
ATTRIBUTE       Allow-Commands      2   string  # trailing comment
ATTRIBUTE       Ingress-Policy-Id   10  integer
END-VENDOR      Juniper
";
        let mut dict = Dictionary::builtin();
        dict.parse_str(text).unwrap();
        assert_eq!(dict.vendor_id("Juniper"), Some(2636));
        assert_eq!(dict.vendor_count(), 2);
        assert_eq!(dict.attribute_count(), 4);
        assert_eq!(
            dict.lookup("Juniper", "Ingress-Policy-Id").unwrap(),
            AttributeDescriptor {
                code: 10,
                kind: AttributeKind::Integer
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.parse_str("ATTRIBUTE Foo 1 string"),
            Err(DictionaryError::Syntax { line: 1, .. })
        ));

        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.parse_str("BEGIN-VENDOR Nobody"),
            Err(DictionaryError::UnknownVendor(v)) if v == "Nobody"
        ));

        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.parse_str("VENDOR Acme 99\nBEGIN-VENDOR Acme\nATTRIBUTE X 1 float\nEND-VENDOR Acme"),
            Err(DictionaryError::UnknownKind(_))
        ));

        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.parse_str("VENDOR Acme 99\nBEGIN-VENDOR Acme\nATTRIBUTE X 1 string"),
            Err(DictionaryError::Syntax { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "VENDOR Aruba 14823").unwrap();
        writeln!(file, "BEGIN-VENDOR Aruba").unwrap();
        writeln!(file, "ATTRIBUTE Aruba-User-Role 1 string").unwrap();
        writeln!(file, "END-VENDOR Aruba").unwrap();

        let mut dict = Dictionary::builtin();
        dict.load_file(file.path()).unwrap();
        assert_eq!(dict.lookup("Aruba", "Aruba-User-Role").unwrap().code, 1);

        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.load_file("/nonexistent/dictionary"),
            Err(DictionaryError::Io(_))
        ));
    }
}
