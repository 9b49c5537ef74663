use crate::provider::ProviderSnapshot;
use crate::verifier::RejectReason;
use radius_proto::auth::{message_authenticator_placeholder, sign_response};
use radius_proto::{Attribute, AttributeType, Code, Packet, PacketError};
use tracing::debug;

/// A signed response ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub packet: Packet,
    pub bytes: Vec<u8>,
}

impl Response {
    pub fn code(&self) -> Code {
        self.packet.code
    }

    pub fn identifier(&self) -> u8 {
        self.packet.identifier
    }
}

/// Build and sign an Access-Accept.
///
/// Attribute order: Message-Authenticator (when the request had one), the
/// configured vendor attributes, `extra`, then the request's Proxy-State
/// attributes.
/// Message-Authenticator and Proxy-State entries in `extra` are discarded.
pub fn build_accept(
    snapshot: &ProviderSnapshot,
    request: &Packet,
    extra: Vec<Attribute>,
) -> Result<Response, PacketError> {
    let mut packet = response_for(request, Code::AccessAccept);
    packet
        .attributes
        .extend(snapshot.accept_attributes().iter().cloned());
    // Message-Authenticator and Proxy-State are only ever set here
    packet.attributes.extend(extra.into_iter().filter(|attr| {
        let reserved = RESERVED_TYPES.contains(&attr.attr_type);
        if reserved {
            debug!(
                request_id = request.identifier,
                attr_type = attr.attr_type,
                "Dropping reserved attribute from verifier"
            );
        }
        !reserved
    }));
    finish(snapshot, request, packet)
}

const RESERVED_TYPES: [u8; 2] = [
    AttributeType::MessageAuthenticator as u8,
    AttributeType::ProxyState as u8,
];

/// Build and sign an Access-Reject. `reason` stays off the wire.
pub fn build_reject(
    snapshot: &ProviderSnapshot,
    request: &Packet,
    reason: &RejectReason,
) -> Result<Response, PacketError> {
    debug!(request_id = request.identifier, reason = %reason, "Building Access-Reject");
    let packet = response_for(request, Code::AccessReject);
    finish(snapshot, request, packet)
}

/// Access-Accept answering a Status-Server probe (RFC 5997 Section 3)
pub fn build_status_accept(
    snapshot: &ProviderSnapshot,
    request: &Packet,
) -> Result<Response, PacketError> {
    let packet = response_for(request, Code::AccessAccept);
    finish(snapshot, request, packet)
}

fn response_for(request: &Packet, code: Code) -> Packet {
    let mut packet = Packet::new(code, request.identifier, [0u8; 16]);
    if request
        .find_attribute(AttributeType::MessageAuthenticator as u8)
        .is_some()
    {
        packet.add_attribute(message_authenticator_placeholder());
    }
    packet
}

fn finish(
    snapshot: &ProviderSnapshot,
    request: &Packet,
    mut packet: Packet,
) -> Result<Response, PacketError> {
    // RFC 2865 Section 5.33
    packet.attributes.extend(
        request
            .find_all_attributes(AttributeType::ProxyState as u8)
            .into_iter()
            .cloned(),
    );

    let bytes = sign_response(&mut packet, &request.authenticator, snapshot.secret())?;
    Ok(Response { packet, bytes })
}
