//! RADIUS Packet and Attribute Validation
//!
//! Checks inbound requests against RFC 2865 before they reach authentication.
//!
//! ## Validation Modes
//!
//! - **Lenient Mode**: only what authentication needs
//!   - User-Name present, exactly one of User-Password/CHAP-Password
//!   - Type-specific lengths (prevents parsing errors later)
//!
//! - **Strict Mode**: additionally
//!   - NAS-IP-Address, NAS-IPv6-Address or NAS-Identifier present
//!   - Enumerated values in range (Service-Type, NAS-Port-Type)
//!   - String attributes are valid UTF-8

use crate::attributes::{Attribute, AttributeType};
use crate::auth::MAX_PASSWORD_LENGTH;
use crate::packet::{Code, Packet};

/// Validation mode for RADIUS packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Only enforces critical requirements, for compatibility with non-compliant NAS devices
    #[default]
    Lenient,
    /// Full RFC 2865 compliance
    Strict,
}

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub attribute_type: Option<u8>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
            attribute_type: None,
        }
    }

    pub fn with_attribute(message: impl Into<String>, attr_type: u8) -> Self {
        ValidationError {
            message: message.into(),
            attribute_type: Some(attr_type),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(attr_type) = self.attribute_type {
            write!(f, "Attribute {}: {}", attr_type, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate an inbound RADIUS request
pub fn validate_packet(packet: &Packet, mode: ValidationMode) -> Result<(), ValidationError> {
    match packet.code {
        Code::AccessRequest => validate_access_request(packet, mode)?,
        Code::StatusServer => {}
        other => {
            return Err(ValidationError::new(format!(
                "Unexpected packet type from client: {:?}",
                other
            )))
        }
    }

    for attr in &packet.attributes {
        validate_attribute(attr, mode)?;
    }

    Ok(())
}

fn validate_access_request(packet: &Packet, mode: ValidationMode) -> Result<(), ValidationError> {
    let has = |t: AttributeType| packet.find_attribute(t as u8).is_some();

    // RFC 2865 Section 4.1: User-Name is REQUIRED
    if !has(AttributeType::UserName) {
        return Err(ValidationError::with_attribute(
            "User-Name attribute is required in Access-Request",
            AttributeType::UserName as u8,
        ));
    }

    match (has(AttributeType::UserPassword), has(AttributeType::ChapPassword)) {
        (true, true) => {
            return Err(ValidationError::new(
                "User-Password and CHAP-Password cannot both be present in Access-Request",
            ))
        }
        // EAP carries its own credentials (RFC 3579 Section 3.1)
        (false, false) if !has(AttributeType::EapMessage) => {
            return Err(ValidationError::new(
                "Either User-Password or CHAP-Password is required in Access-Request",
            ))
        }
        _ => {}
    }

    if mode == ValidationMode::Strict
        && !has(AttributeType::NasIpAddress)
        && !has(AttributeType::NasIpv6Address)
        && !has(AttributeType::NasIdentifier)
    {
        return Err(ValidationError::new(
            "Either NAS-IP-Address, NAS-IPv6-Address or NAS-Identifier is required in Access-Request",
        ));
    }

    Ok(())
}

/// Validate an individual attribute
fn validate_attribute(attr: &Attribute, mode: ValidationMode) -> Result<(), ValidationError> {
    let Some(attr_type) = AttributeType::from_u8(attr.attr_type) else {
        return Ok(());
    };

    match attr_type {
        AttributeType::UserName => {
            if attr.value.is_empty() {
                return Err(ValidationError::with_attribute(
                    "User-Name must not be empty",
                    attr.attr_type,
                ));
            }
            validate_string(attr, mode)
        }
        AttributeType::FilterId
        | AttributeType::ReplyMessage
        | AttributeType::CalledStationId
        | AttributeType::CallingStationId
        | AttributeType::NasIdentifier => validate_string(attr, mode),
        AttributeType::UserPassword => {
            let len = attr.value.len();
            if len == 0 || len % 16 != 0 || len > MAX_PASSWORD_LENGTH {
                return Err(ValidationError::with_attribute(
                    format!("User-Password must be 16-128 bytes in blocks of 16, got {}", len),
                    attr.attr_type,
                ));
            }
            Ok(())
        }
        AttributeType::ChapPassword => validate_length(attr, 17),
        AttributeType::NasIpAddress | AttributeType::FramedIpAddress => validate_length(attr, 4),
        AttributeType::NasIpv6Address => validate_length(attr, 16),
        AttributeType::MessageAuthenticator => validate_length(attr, 16),
        AttributeType::NasPort | AttributeType::SessionTimeout | AttributeType::IdleTimeout => {
            validate_length(attr, 4)
        }
        // RFC 2865 Section 5.6 defines 1-11, later RFCs extend it
        AttributeType::ServiceType => validate_enumerated(attr, mode, 1..=20),
        // RFC 2865 Section 5.41 plus IANA registrations
        AttributeType::NasPortType => validate_enumerated(attr, mode, 0..=40),
        _ => Ok(()),
    }
}

fn validate_string(attr: &Attribute, mode: ValidationMode) -> Result<(), ValidationError> {
    if mode == ValidationMode::Strict && attr.as_string().is_err() {
        return Err(ValidationError::with_attribute(
            "Invalid UTF-8 in string attribute",
            attr.attr_type,
        ));
    }
    Ok(())
}

fn validate_length(attr: &Attribute, expected: usize) -> Result<(), ValidationError> {
    if attr.value.len() != expected {
        return Err(ValidationError::with_attribute(
            format!(
                "Attribute must be {} bytes, got {}",
                expected,
                attr.value.len()
            ),
            attr.attr_type,
        ));
    }
    Ok(())
}

fn validate_enumerated(
    attr: &Attribute,
    mode: ValidationMode,
    range: std::ops::RangeInclusive<u32>,
) -> Result<(), ValidationError> {
    let value = attr
        .as_integer()
        .map_err(|e| ValidationError::with_attribute(e.to_string(), attr.attr_type))?;

    if mode == ValidationMode::Strict && !range.contains(&value) {
        return Err(ValidationError::with_attribute(
            format!("Invalid enumerated value: {}", value),
            attr.attr_type,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> Packet {
        let mut packet = Packet::new(Code::AccessRequest, 1, [0u8; 16]);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "test").unwrap());
        packet.add_attribute(
            Attribute::new(AttributeType::UserPassword as u8, vec![0u8; 16]).unwrap(),
        );
        packet
    }

    #[test]
    fn test_validate_access_request_with_user_name() {
        let mut packet = base_request();
        packet.add_attribute(
            Attribute::new(AttributeType::NasIpAddress as u8, vec![192, 168, 0, 1]).unwrap(),
        );

        assert!(validate_packet(&packet, ValidationMode::Lenient).is_ok());
        assert!(validate_packet(&packet, ValidationMode::Strict).is_ok());
    }

    #[test]
    fn test_strict_requires_nas_identification() {
        let packet = base_request();
        assert!(validate_packet(&packet, ValidationMode::Lenient).is_ok());
        assert!(validate_packet(&packet, ValidationMode::Strict).is_err());
    }

    #[test]
    fn test_validate_access_request_missing_user_name() {
        let mut packet = Packet::new(Code::AccessRequest, 1, [0u8; 16]);
        packet.add_attribute(
            Attribute::new(AttributeType::UserPassword as u8, vec![0u8; 16]).unwrap(),
        );

        let err = validate_packet(&packet, ValidationMode::Lenient).unwrap_err();
        assert!(err.message.contains("User-Name attribute is required"));
        assert_eq!(err.attribute_type, Some(1));
        assert!(err.to_string().starts_with("Attribute 1:"));
    }

    #[test]
    fn test_validate_access_request_missing_password() {
        let mut packet = Packet::new(Code::AccessRequest, 1, [0u8; 16]);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "test").unwrap());

        let err = validate_packet(&packet, ValidationMode::Lenient).unwrap_err();
        assert!(err.message.contains("User-Password or CHAP-Password is required"));
    }

    #[test]
    fn test_validate_access_request_both_passwords() {
        let mut packet = base_request();
        packet.add_attribute(
            Attribute::new(AttributeType::ChapPassword as u8, vec![0u8; 17]).unwrap(),
        );

        let err = validate_packet(&packet, ValidationMode::Lenient).unwrap_err();
        assert!(err.message.contains("cannot both be present"));
    }

    #[test]
    fn test_response_codes_rejected() {
        let packet = Packet::new(Code::AccessAccept, 1, [0u8; 16]);
        assert!(validate_packet(&packet, ValidationMode::Lenient).is_err());
    }

    #[test]
    fn test_user_password_length() {
        let attr = Attribute::new(AttributeType::UserPassword as u8, vec![0u8; 15]).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Lenient).is_err());
        let attr = Attribute::new(AttributeType::UserPassword as u8, vec![0u8; 32]).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Lenient).is_ok());
    }

    #[test]
    fn test_validate_service_type() {
        let attr = Attribute::integer(AttributeType::ServiceType as u8, 6).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Strict).is_ok());

        let attr = Attribute::integer(AttributeType::ServiceType as u8, 99).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Strict).is_err());
        assert!(validate_attribute(&attr, ValidationMode::Lenient).is_ok());
    }

    #[test]
    fn test_validate_integer_wrong_length() {
        let attr = Attribute::new(AttributeType::SessionTimeout as u8, vec![1, 2, 3]).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Lenient).is_err());
    }

    #[test]
    fn test_validate_string_invalid_utf8() {
        let attr = Attribute::new(AttributeType::UserName as u8, vec![0xFF, 0xFE, 0xFD]).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Strict).is_err());
        assert!(validate_attribute(&attr, ValidationMode::Lenient).is_ok());
    }

    #[test]
    fn test_unknown_attributes_pass() {
        let attr = Attribute::new(200, vec![1, 2, 3]).unwrap();
        assert!(validate_attribute(&attr, ValidationMode::Strict).is_ok());
    }
}
