use crate::packet::PacketError;
use std::net::{Ipv4Addr, Ipv6Addr};

/// One type-length-value entry of a packet (RFC 2865 Section 5)
///
/// ```text
/// +--------+--------+-----------------
/// |  Type  | Length |  Value ...
/// +--------+--------+-----------------
/// ```
///
/// `Length` covers the two header octets, so a value holds at most 253 bytes.
/// Values are raw; their interpretation depends on the attribute type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: u8,
    pub value: Vec<u8>,
}

impl Attribute {
    /// Type and length octets
    pub const MIN_LENGTH: usize = 2;
    pub const MAX_LENGTH: usize = u8::MAX as usize;
    pub const MAX_VALUE_LENGTH: usize = Self::MAX_LENGTH - Self::MIN_LENGTH;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "type {} value is {} bytes, limit is {}",
                attr_type,
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Big-endian 32-bit value
    pub fn integer(attr_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    pub fn ipv4(attr_type: u8, value: Ipv4Addr) -> Result<Self, PacketError> {
        Self::new(attr_type, value.octets().to_vec())
    }

    pub fn ipv6(attr_type: u8, value: Ipv6Addr) -> Result<Self, PacketError> {
        Self::new(attr_type, value.octets().to_vec())
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.encoded_length());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Append the wire form to `buffer`
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        // `value` is public, so the limit is checked again here
        let length = u8::try_from(self.encoded_length()).map_err(|_| {
            PacketError::AttributeError(format!(
                "type {} encodes to {} bytes",
                self.attr_type,
                self.encoded_length()
            ))
        })?;

        buffer.push(self.attr_type);
        buffer.push(length);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    /// Decode the attribute at the start of `data`. Trailing bytes are left
    /// to the caller, who advances by [`encoded_length`](Self::encoded_length).
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let &[attr_type, length, ..] = data else {
            return Err(PacketError::AttributeError(format!(
                "{} byte(s) left, attribute header needs 2",
                data.len()
            )));
        };

        let length = length as usize;
        if length < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "type {} declares length {}",
                attr_type, length
            )));
        }

        let value = data.get(Self::MIN_LENGTH..length).ok_or_else(|| {
            PacketError::AttributeError(format!(
                "type {} declares length {} but only {} bytes remain",
                attr_type,
                length,
                data.len()
            ))
        })?;

        Ok(Attribute {
            attr_type,
            value: value.to_vec(),
        })
    }

    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    pub fn as_string(&self) -> Result<String, std::str::Utf8Error> {
        std::str::from_utf8(&self.value).map(str::to_owned)
    }

    pub fn as_integer(&self) -> Result<u32, PacketError> {
        self.fixed::<4>("integer").map(u32::from_be_bytes)
    }

    pub fn as_ipv4(&self) -> Result<Ipv4Addr, PacketError> {
        self.fixed::<4>("ipaddr").map(Ipv4Addr::from)
    }

    pub fn as_ipv6(&self) -> Result<Ipv6Addr, PacketError> {
        self.fixed::<16>("ipv6addr").map(Ipv6Addr::from)
    }

    fn fixed<const N: usize>(&self, kind: &str) -> Result<[u8; N], PacketError> {
        self.value.as_slice().try_into().map_err(|_| {
            PacketError::AttributeError(format!(
                "type {} as {} needs {} bytes, has {}",
                self.attr_type,
                kind,
                N,
                self.value.len()
            ))
        })
    }
}
