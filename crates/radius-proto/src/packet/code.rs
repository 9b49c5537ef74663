/// RADIUS packet codes handled by an authentication provider (RFC 2865 Section 4, RFC 5997)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    /// Access-Request (1)
    AccessRequest = 1,
    /// Access-Accept (2)
    AccessAccept = 2,
    /// Access-Reject (3)
    AccessReject = 3,
    /// Access-Challenge (11)
    AccessChallenge = 11,
    /// Status-Server (12) - RFC 5997
    StatusServer = 12,
}

impl Code {
    /// Map a wire code to a recognized authentication code.
    ///
    /// Accounting codes (RFC 2866) are deliberately absent and decode as unknown.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Code::AccessRequest),
            2 => Some(Code::AccessAccept),
            3 => Some(Code::AccessReject),
            11 => Some(Code::AccessChallenge),
            12 => Some(Code::StatusServer),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for codes a NAS sends to the server
    pub fn is_request(self) -> bool {
        matches!(self, Code::AccessRequest | Code::StatusServer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            Code::AccessRequest,
            Code::AccessAccept,
            Code::AccessReject,
            Code::AccessChallenge,
            Code::StatusServer,
        ] {
            assert_eq!(Code::from_u8(code.as_u8()), Some(code));
        }
    }

    #[test]
    fn test_accounting_codes_unrecognized() {
        assert_eq!(Code::from_u8(4), None);
        assert_eq!(Code::from_u8(5), None);
        assert_eq!(Code::from_u8(0), None);
    }

    #[test]
    fn test_is_request() {
        assert!(Code::AccessRequest.is_request());
        assert!(Code::StatusServer.is_request());
        assert!(!Code::AccessAccept.is_request());
    }
}
