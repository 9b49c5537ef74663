//! RADIUS Protocol Implementation
//!
//! Wire-level building blocks for a RADIUS authentication provider, as defined
//! in RFC 2865, RFC 3579 and RFC 5997.
//!
//! # Features
//!
//! - Packet encoding and decoding with strict length checks
//! - Vendor-Specific attributes (nested TLV) and a typed vendor dictionary
//! - MD5-based User-Password hiding
//! - Request verification and Response Authenticator calculation
//! - Message-Authenticator (HMAC-MD5)
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Code, Dictionary, Packet};
//! use radius_proto::auth::{generate_request_authenticator, sign_response};
//!
//! let dictionary = Dictionary::builtin();
//! let request_auth = generate_request_authenticator();
//!
//! let mut accept = Packet::new(Code::AccessAccept, 7, [0u8; 16]);
//! accept.add_attribute(
//!     dictionary
//!         .vendor_attribute("Cisco", "AVPair", "shell:priv-level=15")
//!         .unwrap(),
//! );
//!
//! let bytes = sign_response(&mut accept, &request_auth, b"secret").unwrap();
//! assert_eq!(bytes.len(), accept.length());
//! ```

pub mod attributes;
pub mod auth;
pub mod dictionary;
pub mod message_auth;
pub mod packet;
pub mod validation;

pub use attributes::{Attribute, AttributeType, VendorAttribute};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, sign_response, verify_request, verify_response_authenticator,
    AuthError,
};
pub use dictionary::{
    AttributeDescriptor, AttributeKind, AttributeValue, Dictionary, DictionaryError,
};
pub use message_auth::{calculate_message_authenticator, verify_message_authenticator};
pub use packet::{Code, Packet, PacketError};
pub use validation::{validate_packet, ValidationError, ValidationMode};
