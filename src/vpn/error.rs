//! Errors raised while building configs and models from JSON

use super::kind::VpnType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VpnError {
    #[error("Invalid VPN type: {0:?}")]
    InvalidType(String),
    #[error("VPN type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: VpnType, found: VpnType },
    #[error("VPN type {0} is not supported yet")]
    Unimplemented(VpnType),
    #[error("Invalid VPN entry: {0}")]
    InvalidEntry(#[from] serde_json::Error),
    #[error("VPN entry has an empty vpn_id")]
    EmptyId,
    #[error("Invalid TOTP URL: {0}")]
    InvalidTotpUrl(String),
}
