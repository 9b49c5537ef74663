//! Accept attributes handed to the outpost
//!
//! The outpost that owns the UDP socket receives the configured accept
//! attributes pre-encoded: a base64 Access-Request whose attribute list is
//! exactly the attributes to copy into every Access-Accept.

use crate::provider::ProviderSnapshot;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use radius_proto::{
    generate_request_authenticator, Attribute, AttributeType, AttributeValue, Code, Dictionary,
    Packet, PacketError, VendorAttribute,
};
use rand::Rng;

/// Encode the snapshot's accept attributes as a base64 Access-Request
pub fn encode_attribute_payload(snapshot: &ProviderSnapshot) -> Result<String, PacketError> {
    let identifier: u8 = rand::rng().random();
    let mut packet = Packet::new(Code::AccessRequest, identifier, generate_request_authenticator());
    packet
        .attributes
        .extend(snapshot.accept_attributes().iter().cloned());
    Ok(STANDARD.encode(packet.encode()?))
}

/// Decode a payload produced by [`encode_attribute_payload`]
pub fn decode_attribute_payload(payload: &str) -> Result<Vec<Attribute>, PacketError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| PacketError::AttributeError(format!("invalid base64 payload: {}", e)))?;
    Ok(Packet::decode(&bytes)?.attributes)
}

/// One line per attribute, naming vendor attributes through `dictionary`.
///
/// Unknown vendors and attributes are shown by number with a hex value.
pub fn render_attributes(dictionary: &Dictionary, attributes: &[Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attributes {
        if attr.attr_type != AttributeType::VendorSpecific as u8 {
            let name = AttributeType::from_u8(attr.attr_type)
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| format!("Attr-{}", attr.attr_type));
            lines.push(format!("{} = {}", name, hex_value(&attr.value)));
            continue;
        }

        let vsas = match VendorAttribute::decode_all(&attr.value) {
            Ok(vsas) => vsas,
            Err(_) => {
                lines.push(format!("Vendor-Specific = {}", hex_value(&attr.value)));
                continue;
            }
        };

        for vsa in vsas {
            let line = match dictionary.describe(vsa.vendor_id, vsa.vendor_type) {
                Some((vendor, name, descriptor)) => {
                    match AttributeValue::decode(descriptor.kind, &vsa.value) {
                        Ok(value) => format!("{}-{} = {}", vendor, name, value),
                        Err(_) => format!("{}-{} = {}", vendor, name, hex_value(&vsa.value)),
                    }
                }
                None => format!(
                    "Vendor-{}-Attr-{} = {}",
                    vsa.vendor_id,
                    vsa.vendor_type,
                    hex_value(&vsa.value)
                ),
            };
            lines.push(line);
        }
    }
    lines
}

fn hex_value(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn snapshot() -> ProviderSnapshot {
        ProviderConfig::default().compile().unwrap()
    }

    #[test]
    fn test_payload_carries_accept_attributes() {
        let snapshot = snapshot();
        let payload = encode_attribute_payload(&snapshot).unwrap();
        let attributes = decode_attribute_payload(&payload).unwrap();
        assert_eq!(attributes, snapshot.accept_attributes());

        let bytes = STANDARD.decode(&payload).unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes.len(), 20 + 27);
    }

    #[test]
    fn test_payloads_use_fresh_authenticators() {
        let snapshot = snapshot();
        let a = STANDARD.decode(encode_attribute_payload(&snapshot).unwrap()).unwrap();
        let b = STANDARD.decode(encode_attribute_payload(&snapshot).unwrap()).unwrap();
        assert_ne!(a[4..20], b[4..20]);
        assert_eq!(a[20..], b[20..]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_attribute_payload("not base64!").is_err());
        assert!(decode_attribute_payload(&STANDARD.encode([1u8, 2, 3])).is_err());
    }

    #[test]
    fn test_render_attributes() {
        let dictionary = Dictionary::builtin();
        let attributes = vec![
            dictionary
                .vendor_attribute("Cisco", "AVPair", "shell:priv-level=15")
                .unwrap(),
            VendorAttribute::new(2636, 1, vec![0xde, 0xad])
                .unwrap()
                .to_attribute()
                .unwrap(),
            Attribute::integer(27, 3600).unwrap(),
            Attribute::new(200, vec![1]).unwrap(),
        ];

        assert_eq!(
            render_attributes(&dictionary, &attributes),
            vec![
                "Cisco-AVPair = shell:priv-level=15".to_string(),
                "Vendor-2636-Attr-1 = 0xdead".to_string(),
                "Session-Timeout = 0x00000e10".to_string(),
                "Attr-200 = 0x01".to_string(),
            ]
        );
    }
}
