//! VPN configs, models and backend dispatch
//!
//! Each backend contributes two types:
//!
//! - a config (`PritunlConfig`, `GlobalProtectConfig`) holding settings shared
//!   by every VPN of that backend, such as the client executable path
//! - a model (`PritunlVpn`, `GlobalProtectVpn`) for one connection target,
//!   holding its id, credentials and an `Arc` to the shared config
//!
//! Models are handed out as [`Vpn`], a sum type over the implemented
//! backends, so callers can work with a uniform list and still reach the
//! backend-specific getters.

pub mod error;
pub mod global_protect;
pub mod kind;
pub mod pritunl;

pub use error::VpnError;
pub use global_protect::{GlobalProtectConfig, GlobalProtectVpn};
pub use kind::{VpnType, VpnTypeVisitor};
pub use pritunl::{PritunlConfig, PritunlVpn};

use crate::process::{ProcessError, ProcessResult};
use serde_json::Value;

/// JSON key holding the backend tag in configs and entries
pub const VPN_TYPE_KEY: &str = "vpn_type";
/// JSON key holding the instance id in entries
pub const VPN_ID_KEY: &str = "vpn_id";

/// Behaviour shared by every backend model
pub trait VpnModel {
    fn id(&self) -> &str;

    fn vpn_type(&self) -> VpnType;

    /// `"{TYPE}_{id}"`, for logs only
    fn global_id(&self) -> String {
        format!("{}_{}", self.vpn_type().name(), self.id())
    }

    /// Start the connection through the backend's client
    ///
    /// `verbose` only controls progress logging, never the commands run.
    fn connect(&self, verbose: bool) -> Result<ProcessResult, ProcessError>;

    /// Stop the connection through the backend's client
    fn disconnect(&self, verbose: bool) -> Result<ProcessResult, ProcessError>;

    fn to_json(&self) -> Value;
}

/// Handle to one parsed VPN
#[derive(Debug, Clone)]
pub enum Vpn {
    Pritunl(PritunlVpn),
    GlobalProtect(GlobalProtectVpn),
}

impl Vpn {
    fn model(&self) -> &dyn VpnModel {
        match self {
            Vpn::Pritunl(vpn) => vpn,
            Vpn::GlobalProtect(vpn) => vpn,
        }
    }

    pub fn as_pritunl(&self) -> Option<&PritunlVpn> {
        match self {
            Vpn::Pritunl(vpn) => Some(vpn),
            _ => None,
        }
    }

    pub fn as_global_protect(&self) -> Option<&GlobalProtectVpn> {
        match self {
            Vpn::GlobalProtect(vpn) => Some(vpn),
            _ => None,
        }
    }
}

impl VpnModel for Vpn {
    fn id(&self) -> &str {
        self.model().id()
    }

    fn vpn_type(&self) -> VpnType {
        self.model().vpn_type()
    }

    fn connect(&self, verbose: bool) -> Result<ProcessResult, ProcessError> {
        self.model().connect(verbose)
    }

    fn disconnect(&self, verbose: bool) -> Result<ProcessResult, ProcessError> {
        self.model().disconnect(verbose)
    }

    fn to_json(&self) -> Value {
        self.model().to_json()
    }
}

impl From<PritunlVpn> for Vpn {
    fn from(vpn: PritunlVpn) -> Self {
        Vpn::Pritunl(vpn)
    }
}

impl From<GlobalProtectVpn> for Vpn {
    fn from(vpn: GlobalProtectVpn) -> Self {
        Vpn::GlobalProtect(vpn)
    }
}

/// Read the `vpn_type` tag of a JSON object, `None` when the key is absent
fn read_type_tag(json: &Value) -> Result<Option<VpnType>, VpnError> {
    match json.get(VPN_TYPE_KEY) {
        None => Ok(None),
        Some(Value::String(tag)) => tag.parse().map(Some),
        Some(other) => Err(VpnError::InvalidType(other.to_string())),
    }
}

/// Configs may omit their tag; a present tag must match
pub(crate) fn check_config_tag(json: &Value, expected: VpnType) -> Result<(), VpnError> {
    match read_type_tag(json)? {
        None => Ok(()),
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(VpnError::TypeMismatch { expected, found }),
    }
}

/// Entries must carry their tag and it must match
pub(crate) fn check_model_tag(json: &Value, expected: VpnType) -> Result<(), VpnError> {
    match read_type_tag(json)? {
        None => Err(VpnError::InvalidType(String::new())),
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(VpnError::TypeMismatch { expected, found }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_check_config_tag() {
        assert!(check_config_tag(&json!({}), VpnType::Pritunl).is_ok());
        assert!(check_config_tag(&json!({"vpn_type": "PRITUNL"}), VpnType::Pritunl).is_ok());
        assert!(matches!(
            check_config_tag(&json!({"vpn_type": "GLOBAL_PROTECT"}), VpnType::Pritunl),
            Err(VpnError::TypeMismatch {
                expected: VpnType::Pritunl,
                found: VpnType::GlobalProtect
            })
        ));
        assert!(matches!(
            check_config_tag(&json!({"vpn_type": "BOGUS"}), VpnType::Pritunl),
            Err(VpnError::InvalidType(_))
        ));
    }

    #[test]
    fn test_check_model_tag_requires_tag() {
        assert!(matches!(
            check_model_tag(&json!({"vpn_id": "a"}), VpnType::Pritunl),
            Err(VpnError::InvalidType(_))
        ));
        assert!(matches!(
            check_model_tag(&json!({"vpn_type": 7}), VpnType::Pritunl),
            Err(VpnError::InvalidType(_))
        ));
        assert!(check_model_tag(&json!({"vpn_type": "GLOBAL_PROTECT"}), VpnType::GlobalProtect).is_ok());
    }

    #[test]
    fn test_handle_delegates() {
        let config = Arc::new(PritunlConfig::default());
        let vpn: Vpn = PritunlVpn::new("abc", config).into();

        assert_eq!(vpn.id(), "abc");
        assert_eq!(vpn.vpn_type(), VpnType::Pritunl);
        assert_eq!(vpn.global_id(), "PRITUNL_abc");
        assert!(vpn.as_pritunl().is_some());
        assert!(vpn.as_global_protect().is_none());
        assert_eq!(vpn.to_json()["vpn_id"], "abc");

        let config = Arc::new(GlobalProtectConfig::default());
        let vpn: Vpn = GlobalProtectVpn::new("corp", config).into();
        assert_eq!(vpn.global_id(), "GLOBAL_PROTECT_corp");
        assert!(vpn.as_global_protect().is_some());
    }
}
