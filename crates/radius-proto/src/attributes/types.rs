//! Standard attribute numbers seen by an authentication provider
//! (RFC 2865, RFC 3162, RFC 3579). Anything else stays a raw number.

macro_rules! attribute_types {
    ($($variant:ident = $code:literal => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum AttributeType {
            $($variant = $code,)*
        }

        impl AttributeType {
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($code => Some(AttributeType::$variant),)*
                    _ => None,
                }
            }

            /// Dictionary name, e.g. `User-Name`
            pub fn name(self) -> &'static str {
                match self {
                    $(AttributeType::$variant => $name,)*
                }
            }
        }
    };
}

attribute_types! {
    UserName = 1 => "User-Name",
    UserPassword = 2 => "User-Password",
    ChapPassword = 3 => "CHAP-Password",
    NasIpAddress = 4 => "NAS-IP-Address",
    NasPort = 5 => "NAS-Port",
    ServiceType = 6 => "Service-Type",
    FramedIpAddress = 8 => "Framed-IP-Address",
    FilterId = 11 => "Filter-Id",
    ReplyMessage = 18 => "Reply-Message",
    State = 24 => "State",
    Class = 25 => "Class",
    VendorSpecific = 26 => "Vendor-Specific",
    SessionTimeout = 27 => "Session-Timeout",
    IdleTimeout = 28 => "Idle-Timeout",
    CalledStationId = 30 => "Called-Station-Id",
    CallingStationId = 31 => "Calling-Station-Id",
    NasIdentifier = 32 => "NAS-Identifier",
    ProxyState = 33 => "Proxy-State",
    ChapChallenge = 60 => "CHAP-Challenge",
    NasPortType = 61 => "NAS-Port-Type",
    EapMessage = 79 => "EAP-Message",
    MessageAuthenticator = 80 => "Message-Authenticator",
    NasIpv6Address = 95 => "NAS-IPv6-Address",
}

impl AttributeType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
