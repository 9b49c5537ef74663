use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::credential::Credential;
use crate::provider::{ProviderHandle, ProviderSnapshot};
use crate::response::{build_accept, build_reject, build_status_accept, Response};
use crate::verifier::{CredentialVerifier, RejectReason, VerificationRequest, Verdict};
use radius_proto::{
    decrypt_user_password, validate_packet, verify_request, AttributeType, AuthError, Code, Packet,
    PacketError,
};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a datagram is dropped without a response
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("No active provider configuration")]
    ProviderUnavailable,
    #[error("Malformed packet: {0}")]
    MalformedPacket(#[from] PacketError),
    #[error("Unexpected packet type from client: {0:?}")]
    UnexpectedCode(Code),
    #[error("Client not authorized: {0}")]
    ClientNotAuthorized(IpAddr),
    #[error("{0}")]
    BadAuthenticator(AuthError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Failed to encode response: {0}")]
    Encode(PacketError),
}

/// Per-request pipeline: decode, authorize, verify, answer
///
/// Each call reads the snapshot active when the datagram arrived, so a
/// concurrent reload never mixes two configurations within one request.
pub struct RequestHandler {
    provider: Arc<ProviderHandle>,
    verifier: Arc<dyn CredentialVerifier>,
    audit: Arc<AuditLogger>,
}

impl RequestHandler {
    pub fn new(
        provider: Arc<ProviderHandle>,
        verifier: Arc<dyn CredentialVerifier>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        RequestHandler {
            provider,
            verifier,
            audit,
        }
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    /// Process one datagram, returning the bytes to send back if any.
    pub async fn handle(&self, data: &[u8], source: IpAddr) -> Option<Vec<u8>> {
        match self.process(data, source).await {
            Ok(response) => Some(response.bytes),
            Err(e) => {
                debug!(client_ip = %source, error = %e, "Dropped request");
                None
            }
        }
    }

    /// Process one datagram. `Err` means the request is dropped silently.
    pub async fn process(&self, data: &[u8], source: IpAddr) -> Result<Response, RequestError> {
        let request_id = data.get(1).copied().unwrap_or(0);

        let Some(snapshot) = self.provider.current() else {
            warn!(client_ip = %source, request_id = request_id, "No active configuration, dropping request");
            self.audit
                .log(
                    AuditEntry::new(AuditEventType::ProviderUnavailable)
                        .with_client_ip(source)
                        .with_request_id(request_id),
                )
                .await;
            return Err(RequestError::ProviderUnavailable);
        };

        let base_entry = |event: AuditEventType| {
            AuditEntry::new(event)
                .with_provider(snapshot.name())
                .with_client_ip(source)
                .with_request_id(request_id)
        };

        let request = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(client_ip = %source, request_id = request_id, error = %e, "Rejected malformed packet");
                self.audit
                    .log(base_entry(AuditEventType::MalformedPacket).with_reason(&e))
                    .await;
                return Err(RequestError::MalformedPacket(e));
            }
        };

        if !request.code.is_request() {
            warn!(client_ip = %source, request_id = request_id, packet_type = ?request.code, "Unexpected packet type");
            self.audit
                .log(
                    base_entry(AuditEventType::InvalidRequest)
                        .with_reason(format!("unexpected packet type {:?}", request.code)),
                )
                .await;
            return Err(RequestError::UnexpectedCode(request.code));
        }

        // RFC 2865 Section 3: only known clients get an answer
        let client = snapshot.authorize(source);
        if !client.allowed {
            warn!(client_ip = %source, request_id = request_id, "Rejected request from unauthorized client");
            self.audit
                .log(
                    base_entry(AuditEventType::UnauthorizedClient)
                        .with_reason("no matching client network"),
                )
                .await;
            return Err(RequestError::ClientNotAuthorized(source));
        }

        let base_entry =
            |event: AuditEventType| base_entry(event).with_matched_network(client.matched_prefix);

        if let Err(e) = verify_request(
            &request,
            snapshot.secret(),
            snapshot.require_message_authenticator(),
        ) {
            warn!(client_ip = %source, request_id = request_id, error = %e, "Request failed integrity check");
            self.audit
                .log(base_entry(AuditEventType::BadAuthenticator).with_reason(&e))
                .await;
            return Err(RequestError::BadAuthenticator(e));
        }

        if request.code == Code::StatusServer {
            debug!(client_ip = %source, request_id = request_id, "Status-Server request received");
            let response =
                build_status_accept(&snapshot, &request).map_err(RequestError::Encode)?;
            self.audit.log(base_entry(AuditEventType::StatusServer)).await;
            return Ok(response);
        }

        if let Err(e) = validate_packet(&request, snapshot.validation_mode()) {
            warn!(client_ip = %source, request_id = request_id, error = %e, "Rejected invalid request");
            self.audit
                .log(base_entry(AuditEventType::InvalidRequest).with_reason(&e))
                .await;
            return Err(RequestError::InvalidRequest(e.to_string()));
        }

        let username = match string_attribute(&request, AttributeType::UserName) {
            Some(name) => name,
            None => {
                self.audit
                    .log(
                        base_entry(AuditEventType::InvalidRequest)
                            .with_reason("User-Name is not valid UTF-8"),
                    )
                    .await;
                return Err(RequestError::InvalidRequest(
                    "User-Name is not valid UTF-8".to_string(),
                ));
            }
        };

        info!(
            username = %username,
            client_ip = %source,
            matched_network = ?client.matched_prefix,
            request_id = request_id,
            "Authentication request received"
        );

        let password_attr = request.find_attribute(AttributeType::UserPassword as u8);
        let Some(password_attr) = password_attr else {
            // CHAP and EAP need the cleartext password or a tunnel, neither of
            // which this provider has
            let reason = RejectReason::UnsupportedAuthMethod;
            return self
                .reject(&snapshot, &request, &username, reason, base_entry)
                .await;
        };

        let raw = match decrypt_user_password(
            &password_attr.value,
            snapshot.secret(),
            &request.authenticator,
        ) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(username = %username, client_ip = %source, error = %e, "Failed to decrypt User-Password");
                self.audit
                    .log(
                        base_entry(AuditEventType::InvalidRequest)
                            .with_username(&username)
                            .with_reason(&e),
                    )
                    .await;
                return Err(RequestError::InvalidRequest(e.to_string()));
            }
        };

        let verification = VerificationRequest {
            username: username.clone(),
            credential: Credential::split(&raw, snapshot.mfa_support()),
            source,
            nas_identifier: string_attribute(&request, AttributeType::NasIdentifier),
            calling_station_id: string_attribute(&request, AttributeType::CallingStationId),
        };

        match self.verifier.verify(&verification).await {
            Ok(Verdict::Accept { attributes }) => {
                let response = build_accept(&snapshot, &request, attributes)
                    .map_err(RequestError::Encode)?;
                info!(
                    username = %username,
                    client_ip = %source,
                    request_id = request_id,
                    "Authentication successful"
                );
                self.audit
                    .log(base_entry(AuditEventType::AuthSuccess).with_username(&username))
                    .await;
                Ok(response)
            }
            Ok(Verdict::Reject { reason }) => {
                self.reject(&snapshot, &request, &username, reason, base_entry)
                    .await
            }
            Err(e) => {
                warn!(username = %username, client_ip = %source, error = %e, "Credential verification failed");
                let reason = RejectReason::VerifierFailed(e.to_string());
                self.reject(&snapshot, &request, &username, reason, base_entry)
                    .await
            }
        }
    }

    async fn reject(
        &self,
        snapshot: &ProviderSnapshot,
        request: &Packet,
        username: &str,
        reason: RejectReason,
        base_entry: impl Fn(AuditEventType) -> AuditEntry,
    ) -> Result<Response, RequestError> {
        let response = build_reject(snapshot, request, &reason).map_err(RequestError::Encode)?;
        warn!(
            username = %username,
            request_id = request.identifier,
            reason = %reason,
            "Authentication failed"
        );
        self.audit
            .log(
                base_entry(AuditEventType::AuthFailure)
                    .with_username(username)
                    .with_reason(&reason),
            )
            .await;
        Ok(response)
    }
}

fn string_attribute(packet: &Packet, attr_type: AttributeType) -> Option<String> {
    packet
        .find_attribute(attr_type as u8)
        .and_then(|attr| attr.as_string().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::verifier::{StaticVerifier, VerifierError};
    use async_trait::async_trait;
    use radius_proto::{
        calculate_message_authenticator, encrypt_user_password, generate_request_authenticator,
        verify_message_authenticator, Attribute,
    };

    struct FailingVerifier;

    #[async_trait]
    impl CredentialVerifier for FailingVerifier {
        async fn verify(&self, _: &VerificationRequest) -> Result<Verdict, VerifierError> {
            Err(VerifierError::Unavailable("directory offline".to_string()))
        }
    }

    /// Accepts everyone and hands back fixed reply attributes
    struct ReplyVerifier(Vec<Attribute>);

    #[async_trait]
    impl CredentialVerifier for ReplyVerifier {
        async fn verify(&self, _: &VerificationRequest) -> Result<Verdict, VerifierError> {
            Ok(Verdict::Accept {
                attributes: self.0.clone(),
            })
        }
    }

    fn reserved_reply() -> Arc<dyn CredentialVerifier> {
        Arc::new(ReplyVerifier(vec![
            Attribute::new(AttributeType::MessageAuthenticator as u8, vec![0; 4]).unwrap(),
            Attribute::new(AttributeType::ProxyState as u8, b"forged".to_vec()).unwrap(),
            Attribute::integer(AttributeType::SessionTimeout as u8, 3600).unwrap(),
        ]))
    }

    fn handler_with(verifier: Arc<dyn CredentialVerifier>) -> RequestHandler {
        let config = ProviderConfig {
            shared_secret: "testing123".to_string(),
            client_networks: "10.0.0.0/8".to_string(),
            ..ProviderConfig::default()
        };
        RequestHandler::new(
            Arc::new(ProviderHandle::from_config(&config).unwrap()),
            verifier,
            Arc::new(AuditLogger::disabled()),
        )
    }

    fn access_request(user: &str, password: &str) -> Vec<u8> {
        let authenticator = generate_request_authenticator();
        let mut packet = Packet::new(Code::AccessRequest, 5, authenticator);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, user).unwrap());
        packet.add_attribute(
            Attribute::new(
                AttributeType::UserPassword as u8,
                encrypt_user_password(password, b"testing123", &authenticator),
            )
            .unwrap(),
        );
        packet.encode().unwrap()
    }

    fn request_with_password_bytes(hidden: Vec<u8>) -> Vec<u8> {
        let mut packet = Packet::new(Code::AccessRequest, 6, [0x11; 16]);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "alice").unwrap());
        packet.add_attribute(Attribute::new(AttributeType::UserPassword as u8, hidden).unwrap());
        packet.encode().unwrap()
    }

    fn source() -> IpAddr {
        "10.1.2.3".parse().unwrap()
    }

    #[tokio::test]
    async fn test_verifier_error_answered_with_reject() {
        let handler = handler_with(Arc::new(FailingVerifier));
        let response = handler
            .process(&access_request("alice", "pw"), source())
            .await
            .unwrap();
        assert_eq!(response.code(), Code::AccessReject);
    }

    #[tokio::test]
    async fn test_chap_request_rejected() {
        let handler = handler_with(Arc::new(StaticVerifier::new()));
        let mut packet = Packet::new(Code::AccessRequest, 8, generate_request_authenticator());
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "alice").unwrap());
        packet.add_attribute(
            Attribute::new(AttributeType::ChapPassword as u8, vec![1; 17]).unwrap(),
        );

        let response = handler
            .process(&packet.encode().unwrap(), source())
            .await
            .unwrap();
        assert_eq!(response.code(), Code::AccessReject);
        assert_eq!(response.identifier(), 8);
    }

    #[tokio::test]
    async fn test_response_packet_dropped() {
        let handler = handler_with(Arc::new(StaticVerifier::new()));
        let packet = Packet::new(Code::AccessAccept, 1, [0u8; 16]);
        let result = handler.process(&packet.encode().unwrap(), source()).await;
        assert!(matches!(result, Err(RequestError::UnexpectedCode(Code::AccessAccept))));
    }

    #[tokio::test]
    async fn test_missing_user_name_dropped() {
        let handler = handler_with(Arc::new(StaticVerifier::new()));
        let mut packet = Packet::new(Code::AccessRequest, 1, [0u8; 16]);
        packet.add_attribute(
            Attribute::new(AttributeType::UserPassword as u8, vec![0; 16]).unwrap(),
        );
        let result = handler.process(&packet.encode().unwrap(), source()).await;
        assert!(matches!(result, Err(RequestError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_cleared_provider_drops() {
        let handler = handler_with(Arc::new(StaticVerifier::new()));
        handler.provider().clear();
        let result = handler.process(&access_request("alice", "pw"), source()).await;
        assert!(matches!(result, Err(RequestError::ProviderUnavailable)));
        assert!(handler.handle(&access_request("alice", "pw"), source()).await.is_none());
    }

    #[tokio::test]
    async fn test_reserved_reply_attributes_discarded() {
        let handler = handler_with(reserved_reply());
        let response = handler
            .process(&access_request("alice", "pw"), source())
            .await
            .unwrap();

        assert_eq!(response.code(), Code::AccessAccept);
        let packet = &response.packet;
        assert!(packet
            .find_attribute(AttributeType::MessageAuthenticator as u8)
            .is_none());
        assert!(packet
            .find_attribute(AttributeType::ProxyState as u8)
            .is_none());
        assert!(packet
            .find_attribute(AttributeType::SessionTimeout as u8)
            .is_some());
    }

    #[tokio::test]
    async fn test_reserved_reply_keeps_single_signed_message_authenticator() {
        let handler = handler_with(reserved_reply());

        let authenticator = generate_request_authenticator();
        let mut packet = Packet::new(Code::AccessRequest, 9, authenticator);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "alice").unwrap());
        packet.add_attribute(
            Attribute::new(
                AttributeType::UserPassword as u8,
                encrypt_user_password("pw", b"testing123", &authenticator),
            )
            .unwrap(),
        );
        packet.add_attribute(
            Attribute::new(AttributeType::MessageAuthenticator as u8, vec![0; 16]).unwrap(),
        );
        let offset = packet
            .attribute_value_offset(AttributeType::MessageAuthenticator as u8)
            .unwrap();
        let mut bytes = packet.encode().unwrap();
        let mac = calculate_message_authenticator(&bytes, b"testing123");
        bytes[offset..offset + 16].copy_from_slice(&mac);

        let response = handler.handle(&bytes, source()).await.unwrap();
        let decoded = Packet::decode(&response).unwrap();
        assert_eq!(decoded.code, Code::AccessAccept);
        assert_eq!(
            decoded
                .find_all_attributes(AttributeType::MessageAuthenticator as u8)
                .len(),
            1
        );

        let mut check = response.clone();
        check[4..20].copy_from_slice(&authenticator);
        let offset = decoded
            .attribute_value_offset(AttributeType::MessageAuthenticator as u8)
            .unwrap();
        assert!(verify_message_authenticator(&check, b"testing123", offset));
    }

    #[tokio::test]
    async fn test_undecryptable_password_dropped() {
        let handler = handler_with(Arc::new(StaticVerifier::new()));

        // 0xff 0xfe is never valid UTF-8
        let mut hidden = encrypt_user_password("", b"testing123", &[0x11; 16]);
        hidden[0] ^= 0xff;
        hidden[1] ^= 0xfe;
        let bytes = request_with_password_bytes(hidden);
        let result = handler.process(&bytes, source()).await;
        assert!(matches!(result, Err(RequestError::InvalidRequest(_))));
        assert!(handler.handle(&bytes, source()).await.is_none());

        let bytes = request_with_password_bytes(vec![0x42; 20]);
        let result = handler.process(&bytes, source()).await;
        assert!(matches!(result, Err(RequestError::InvalidRequest(_))));
        assert!(handler.handle(&bytes, source()).await.is_none());
    }
}
