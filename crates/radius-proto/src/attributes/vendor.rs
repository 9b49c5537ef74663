use super::{Attribute, AttributeType};
use crate::packet::PacketError;

/// A single sub-attribute carried inside a Vendor-Specific attribute (RFC 2865 Section 5.26)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Type (26)    |  Length       |            Vendor-Id
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      Vendor-Id (cont)           | Vendor type   | Vendor length |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorAttribute {
    /// SMI Private Enterprise Number (e.g. 9 for Cisco)
    pub vendor_id: u32,
    /// Vendor-assigned attribute code
    pub vendor_type: u8,
    pub value: Vec<u8>,
}

impl VendorAttribute {
    /// Vendor-Id field size
    pub const VENDOR_ID_LENGTH: usize = 4;
    /// Largest inner value that still fits in one outer attribute
    /// (253 - 4 byte vendor id - 2 byte inner header)
    pub const MAX_VALUE_LENGTH: usize =
        Attribute::MAX_VALUE_LENGTH - Self::VENDOR_ID_LENGTH - Attribute::MIN_LENGTH;

    pub fn new(vendor_id: u32, vendor_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor attribute value too long: {} bytes (max {})",
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(VendorAttribute {
            vendor_id,
            vendor_type,
            value,
        })
    }

    /// Wrap into an outer Vendor-Specific (26) attribute
    pub fn to_attribute(&self) -> Result<Attribute, PacketError> {
        let mut payload =
            Vec::with_capacity(Self::VENDOR_ID_LENGTH + Attribute::MIN_LENGTH + self.value.len());
        payload.extend_from_slice(&self.vendor_id.to_be_bytes());
        payload.push(self.vendor_type);
        payload.push((self.value.len() + Attribute::MIN_LENGTH) as u8);
        payload.extend_from_slice(&self.value);
        Attribute::new(AttributeType::VendorSpecific as u8, payload)
    }

    /// Decode every sub-attribute in a Vendor-Specific value.
    ///
    /// The inner TLVs must fill the payload exactly; a short or overrunning
    /// inner length is an error.
    pub fn decode_all(payload: &[u8]) -> Result<Vec<Self>, PacketError> {
        if payload.len() < Self::VENDOR_ID_LENGTH + Attribute::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor-Specific payload too short: {} bytes",
                payload.len()
            )));
        }

        let vendor_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let mut rest = &payload[Self::VENDOR_ID_LENGTH..];
        let mut out = Vec::new();

        while !rest.is_empty() {
            if rest.len() < Attribute::MIN_LENGTH {
                return Err(PacketError::AttributeError(format!(
                    "Truncated vendor sub-attribute for vendor {}",
                    vendor_id
                )));
            }
            let vendor_type = rest[0];
            let length = rest[1] as usize;
            if length < Attribute::MIN_LENGTH || length > rest.len() {
                return Err(PacketError::AttributeError(format!(
                    "Vendor sub-attribute length {} inconsistent with {} remaining bytes",
                    length,
                    rest.len()
                )));
            }
            out.push(VendorAttribute {
                vendor_id,
                vendor_type,
                value: rest[Attribute::MIN_LENGTH..length].to_vec(),
            });
            rest = &rest[length..];
        }

        Ok(out)
    }
}
