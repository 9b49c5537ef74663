use crate::attributes::{Attribute, AttributeType};
use crate::message_auth::{
    calculate_message_authenticator, verify_message_authenticator, MESSAGE_AUTHENTICATOR_LENGTH,
};
use crate::packet::{Code, Packet, PacketError};
use rand::Rng;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Bad authenticator: {0}")]
    BadAuthenticator(&'static str),
    #[error("Invalid encrypted password length: {0}")]
    InvalidPasswordLength(usize),
    #[error("Password is not valid UTF-8")]
    InvalidPasswordEncoding,
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
}

/// Longest User-Password ciphertext allowed by RFC 2865 Section 5.2
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
///
/// The authenticator currently stored in `packet` is ignored.
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let encoded = packet.encode()?;
    Ok(response_digest(&encoded, request_authenticator, secret))
}

fn response_digest(encoded: &[u8], request_authenticator: &[u8; 16], secret: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(&encoded[..Packet::AUTHENTICATOR_OFFSET]);
    ctx.consume(request_authenticator);
    ctx.consume(&encoded[Packet::MIN_PACKET_SIZE..]);
    ctx.consume(secret);
    ctx.compute().0
}

/// Verify Response Authenticator
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    calculate_response_authenticator(response, request_authenticator, secret)
        .map(|calculated| bool::from(calculated[..].ct_eq(&response.authenticator[..])))
        .unwrap_or(false)
}

/// Sign a response in place and return its wire bytes.
///
/// If the response carries a Message-Authenticator attribute its value is
/// computed first (over the packet with the request authenticator in the
/// header, RFC 3579 Section 3.2), then the Response Authenticator is computed
/// over the final attributes.
pub fn sign_response(
    response: &mut Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<Vec<u8>, PacketError> {
    let ma_type = AttributeType::MessageAuthenticator as u8;
    let ma_lengths: Vec<usize> = response
        .find_all_attributes(ma_type)
        .iter()
        .map(|attr| attr.value.len())
        .collect();

    match ma_lengths.as_slice() {
        [] => {}
        [MESSAGE_AUTHENTICATOR_LENGTH] => {
            let Some(offset) = response.attribute_value_offset(ma_type) else {
                return Err(PacketError::AttributeError(
                    "Message-Authenticator offset not found".to_string(),
                ));
            };
            response.authenticator = *request_authenticator;
            let mut encoded = response.encode()?;
            encoded[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH].fill(0);
            let mac = calculate_message_authenticator(&encoded, secret);
            if let Some(attr) = response
                .attributes
                .iter_mut()
                .find(|a| a.attr_type == ma_type)
            {
                attr.value = mac.to_vec();
            }
        }
        [length] => {
            return Err(PacketError::AttributeError(format!(
                "Message-Authenticator must be {} bytes, got {}",
                MESSAGE_AUTHENTICATOR_LENGTH, length
            )))
        }
        _ => {
            return Err(PacketError::AttributeError(
                "more than one Message-Authenticator".to_string(),
            ))
        }
    }

    let mut encoded = response.encode()?;
    let authenticator = response_digest(&encoded, request_authenticator, secret);
    encoded[Packet::AUTHENTICATOR_OFFSET..Packet::MIN_PACKET_SIZE].copy_from_slice(&authenticator);
    response.authenticator = authenticator;
    Ok(encoded)
}

/// A zeroed Message-Authenticator placeholder, filled in by [`sign_response`]
pub fn message_authenticator_placeholder() -> Attribute {
    Attribute {
        attr_type: AttributeType::MessageAuthenticator as u8,
        value: vec![0u8; 16],
    }
}

/// Verify the integrity of an inbound request.
///
/// An Access-Request authenticator is a random nonce, so the keyed check that
/// applies is the Message-Authenticator attribute (RFC 3579 Section 3.2). When
/// present it must be valid. When absent the request fails if
/// `require_message_authenticator` is set. Status-Server always requires one
/// (RFC 5997 Section 3).
pub fn verify_request(
    packet: &Packet,
    secret: &[u8],
    require_message_authenticator: bool,
) -> Result<(), AuthError> {
    let ma_type = AttributeType::MessageAuthenticator as u8;
    let present = packet.find_all_attributes(ma_type);

    match present.as_slice() {
        [] => {
            if require_message_authenticator || packet.code == Code::StatusServer {
                Err(AuthError::BadAuthenticator("missing Message-Authenticator"))
            } else {
                Ok(())
            }
        }
        [attr] => {
            if attr.value.len() != 16 {
                return Err(AuthError::BadAuthenticator(
                    "Message-Authenticator must be 16 bytes",
                ));
            }
            let offset = packet
                .attribute_value_offset(ma_type)
                .ok_or(AuthError::BadAuthenticator("missing Message-Authenticator"))?;
            let encoded = packet.encode()?;
            if verify_message_authenticator(&encoded, secret, offset) {
                Ok(())
            } else {
                Err(AuthError::BadAuthenticator("Message-Authenticator mismatch"))
            }
        }
        _ => Err(AuthError::BadAuthenticator(
            "multiple Message-Authenticator attributes",
        )),
    }
}

/// Encrypt User-Password attribute per RFC 2865 Section 5.2
///
/// The password is first padded to a multiple of 16 bytes, then XORed with
/// MD5(secret + request_authenticator) for the first 16 bytes, and
/// MD5(secret + previous_block) for subsequent blocks.
pub fn encrypt_user_password(password: &str, secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut padded = password.as_bytes().to_vec();
    let padded_len = padded.len().max(1).div_ceil(16) * 16;
    padded.resize(padded_len, 0);

    let mut result = Vec::with_capacity(padded_len);
    let mut previous_block = *authenticator;

    for chunk in padded.chunks(16) {
        let hash = password_pad(secret, &previous_block);
        let mut encrypted_block = [0u8; 16];
        for (i, byte) in encrypted_block.iter_mut().enumerate() {
            *byte = chunk[i] ^ hash[i];
        }
        previous_block = encrypted_block;
        result.extend_from_slice(&encrypted_block);
    }

    result
}

/// Decrypt User-Password attribute per RFC 2865 Section 5.2
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, AuthError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 || encrypted.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::InvalidPasswordLength(encrypted.len()));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous_block: &[u8] = authenticator;

    for chunk in encrypted.chunks(16) {
        let hash = password_pad(secret, previous_block);
        result.extend(chunk.iter().zip(hash.iter()).map(|(c, h)| c ^ h));
        previous_block = chunk;
    }

    // Remove padding (null bytes at the end)
    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result).map_err(|_| AuthError::InvalidPasswordEncoding)
}

fn password_pad(secret: &[u8], previous_block: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(secret);
    ctx.consume(previous_block);
    ctx.compute().0
}
