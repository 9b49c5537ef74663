//! Message-Authenticator (RFC 3579 Section 3.2)
//!
//! HMAC-MD5 keyed with the shared secret over the whole packet, with the
//! attribute's own 16 value bytes zeroed. For a response the header carries
//! the authenticator of the request being answered.

use hmac::{Hmac, Mac};
use md5_digest::Md5;
use subtle::ConstantTimeEq;

type HmacMd5 = Hmac<Md5>;

/// Length of the Message-Authenticator value
pub const MESSAGE_AUTHENTICATOR_LENGTH: usize = 16;

/// HMAC-MD5 of `packet_bytes`, which must already have the
/// Message-Authenticator value zeroed.
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    // HMAC accepts keys of any length
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(packet_bytes);

    let mut output = [0u8; 16];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Check the Message-Authenticator whose value starts at `offset`.
///
/// Returns false when the value would run past the end of the packet.
pub fn verify_message_authenticator(packet_bytes: &[u8], secret: &[u8], offset: usize) -> bool {
    let Some(end) = offset.checked_add(MESSAGE_AUTHENTICATOR_LENGTH) else {
        return false;
    };
    let Some(received) = packet_bytes.get(offset..end) else {
        return false;
    };

    let mut zeroed = packet_bytes.to_vec();
    zeroed[offset..end].fill(0);
    let expected = calculate_message_authenticator(&zeroed, secret);

    received.ct_eq(&expected[..]).into()
}
