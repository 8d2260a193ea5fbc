//! VPN backend enumeration and visitor dispatch
//!
//! `VpnType` is the closed set of backends. The string tag doubles as the
//! `vpn_type` value in the data file and as the key of the global `config`
//! map. Code that needs per-backend behaviour implements `VpnTypeVisitor`
//! and calls [`VpnType::visit`]; the `match` there is the only place that
//! enumerates the variants.

use super::error::VpnError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VpnType {
    /// Sentinel for a missing or empty tag, never valid for an instance
    None,
    Pritunl,
    WireGuard,
    OpenVpn,
    GlobalProtect,
}

impl VpnType {
    /// Tag used in JSON and as the `config` map key
    pub fn as_str(&self) -> &'static str {
        match self {
            VpnType::None => "",
            VpnType::Pritunl => "PRITUNL",
            VpnType::WireGuard => "WIREGUARD",
            VpnType::OpenVpn => "OPEN_VPN",
            VpnType::GlobalProtect => "GLOBAL_PROTECT",
        }
    }

    /// Canonical name, used to build global ids
    pub fn name(&self) -> &'static str {
        match self {
            VpnType::None => "NONE",
            other => other.as_str(),
        }
    }

    /// Route to the visitor handler for this variant
    pub fn visit<V: VpnTypeVisitor>(self, visitor: &mut V) -> Result<V::Output, VpnError> {
        match self {
            VpnType::None => visitor.visit_none(),
            VpnType::Pritunl => visitor.visit_pritunl(),
            VpnType::WireGuard => visitor.visit_wireguard(),
            VpnType::OpenVpn => visitor.visit_open_vpn(),
            VpnType::GlobalProtect => visitor.visit_global_protect(),
        }
    }
}

impl FromStr for VpnType {
    type Err = VpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(VpnType::None),
            "PRITUNL" => Ok(VpnType::Pritunl),
            "WIREGUARD" => Ok(VpnType::WireGuard),
            "OPEN_VPN" => Ok(VpnType::OpenVpn),
            "GLOBAL_PROTECT" => Ok(VpnType::GlobalProtect),
            _ => Err(VpnError::InvalidType(s.to_string())),
        }
    }
}

impl fmt::Display for VpnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for VpnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VpnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// One handler per backend.
///
/// Backends without an implementation keep the default handlers, which fail
/// instead of doing nothing. `visit_none` fails the same way: the sentinel
/// never names a usable backend.
pub trait VpnTypeVisitor {
    type Output;

    fn visit_none(&mut self) -> Result<Self::Output, VpnError> {
        Err(VpnError::InvalidType(VpnType::None.as_str().to_string()))
    }

    fn visit_pritunl(&mut self) -> Result<Self::Output, VpnError>;

    fn visit_wireguard(&mut self) -> Result<Self::Output, VpnError> {
        Err(VpnError::Unimplemented(VpnType::WireGuard))
    }

    fn visit_open_vpn(&mut self) -> Result<Self::Output, VpnError> {
        Err(VpnError::Unimplemented(VpnType::OpenVpn))
    }

    fn visit_global_protect(&mut self) -> Result<Self::Output, VpnError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Visitor that reports which handler ran
    struct EchoVisitor;

    impl VpnTypeVisitor for EchoVisitor {
        type Output = VpnType;

        fn visit_none(&mut self) -> Result<VpnType, VpnError> {
            Ok(VpnType::None)
        }

        fn visit_pritunl(&mut self) -> Result<VpnType, VpnError> {
            Ok(VpnType::Pritunl)
        }

        fn visit_wireguard(&mut self) -> Result<VpnType, VpnError> {
            Ok(VpnType::WireGuard)
        }

        fn visit_open_vpn(&mut self) -> Result<VpnType, VpnError> {
            Ok(VpnType::OpenVpn)
        }

        fn visit_global_protect(&mut self) -> Result<VpnType, VpnError> {
            Ok(VpnType::GlobalProtect)
        }
    }

    /// Visitor relying on the default handlers
    struct PartialVisitor;

    impl VpnTypeVisitor for PartialVisitor {
        type Output = &'static str;

        fn visit_pritunl(&mut self) -> Result<&'static str, VpnError> {
            Ok("pritunl")
        }

        fn visit_global_protect(&mut self) -> Result<&'static str, VpnError> {
            Ok("global protect")
        }
    }

    const ALL: [VpnType; 5] = [
        VpnType::None,
        VpnType::Pritunl,
        VpnType::WireGuard,
        VpnType::OpenVpn,
        VpnType::GlobalProtect,
    ];

    #[test]
    fn test_visit_routes_to_matching_handler() {
        for vpn_type in ALL {
            assert_eq!(vpn_type.visit(&mut EchoVisitor).unwrap(), vpn_type);
        }
    }

    #[test]
    fn test_default_handlers_fail() {
        assert!(matches!(
            VpnType::None.visit(&mut PartialVisitor),
            Err(VpnError::InvalidType(_))
        ));
        assert!(matches!(
            VpnType::WireGuard.visit(&mut PartialVisitor),
            Err(VpnError::Unimplemented(VpnType::WireGuard))
        ));
        assert!(matches!(
            VpnType::OpenVpn.visit(&mut PartialVisitor),
            Err(VpnError::Unimplemented(VpnType::OpenVpn))
        ));
        assert_eq!(VpnType::Pritunl.visit(&mut PartialVisitor).unwrap(), "pritunl");
    }

    #[test]
    fn test_tag_parse() {
        for vpn_type in ALL {
            assert_eq!(vpn_type.as_str().parse::<VpnType>().unwrap(), vpn_type);
        }
        assert_eq!("".parse::<VpnType>().unwrap(), VpnType::None);
        assert!(matches!(
            "pritunl".parse::<VpnType>(),
            Err(VpnError::InvalidType(tag)) if tag == "pritunl"
        ));
        assert!("IPSEC".parse::<VpnType>().is_err());
    }

    #[test]
    fn test_name_and_display() {
        assert_eq!(VpnType::None.name(), "NONE");
        assert_eq!(VpnType::GlobalProtect.name(), "GLOBAL_PROTECT");
        assert_eq!(VpnType::OpenVpn.to_string(), "OPEN_VPN");
    }

    #[test]
    fn test_serde_uses_tag() {
        let json = serde_json::to_string(&VpnType::GlobalProtect).unwrap();
        assert_eq!(json, "\"GLOBAL_PROTECT\"");

        let parsed: VpnType = serde_json::from_str("\"PRITUNL\"").unwrap();
        assert_eq!(parsed, VpnType::Pritunl);

        assert!(serde_json::from_str::<VpnType>("\"UNKNOWN\"").is_err());
    }
}
