//! VPN data file parsing
//!
//! The data file lists the VPNs to manage plus optional per-backend config
//! blocks:
//!
//! ```json
//! {
//!   "config": { "PRITUNL": { "cli_path": "/usr/local/bin/pritunl-client" } },
//!   "vpn_list": [
//!     { "vpn_type": "PRITUNL", "vpn_id": "abc123", "pin": "1234", "totp_url": "otpauth://..." },
//!     { "vpn_type": "GLOBAL_PROTECT", "vpn_id": "corp" }
//!   ]
//! }
//! ```
//!
//! Parsing is all-or-nothing: the first bad entry fails the whole document.

use crate::vpn::{
    GlobalProtectConfig, GlobalProtectVpn, PritunlConfig, PritunlVpn, Vpn, VpnError, VpnType,
    VpnTypeVisitor, VPN_TYPE_KEY,
};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_KEY: &str = "config";
const VPN_LIST_KEY: &str = "vpn_list";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read VPN data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("VPN data must be a JSON object")]
    NotAnObject,
    #[error("Missing required key: {0}")]
    MissingKey(&'static str),
    #[error("\"vpn_list\" must be an array")]
    InvalidVpnList,
    #[error("\"config\" must be an object keyed by VPN type")]
    InvalidConfigBlock,
    #[error("VPN entry {index}: {source}")]
    Entry { index: usize, source: VpnError },
}

impl ParseError {
    /// Model-level cause, if the failure came from a single entry
    pub fn vpn_error(&self) -> Option<&VpnError> {
        match self {
            ParseError::Entry { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Per-backend configs for one parse, built on first use and shared
struct ConfigSet<'a> {
    raw: Option<&'a Map<String, Value>>,
    pritunl: Option<Arc<PritunlConfig>>,
    global_protect: Option<Arc<GlobalProtectConfig>>,
}

impl<'a> ConfigSet<'a> {
    fn new(raw: Option<&'a Map<String, Value>>) -> Self {
        Self {
            raw,
            pritunl: None,
            global_protect: None,
        }
    }

    /// Block for a backend, `{}` when absent or null
    fn block(&self, vpn_type: VpnType) -> Value {
        self.raw
            .and_then(|raw| raw.get(vpn_type.as_str()))
            .filter(|block| !block.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    fn pritunl(&mut self) -> Result<Arc<PritunlConfig>, VpnError> {
        if let Some(config) = &self.pritunl {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(PritunlConfig::from_json(&self.block(VpnType::Pritunl))?);
        debug!("Pritunl client: {}", config.cli_path);
        self.pritunl = Some(Arc::clone(&config));
        Ok(config)
    }

    fn global_protect(&mut self) -> Result<Arc<GlobalProtectConfig>, VpnError> {
        if let Some(config) = &self.global_protect {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(GlobalProtectConfig::from_json(
            &self.block(VpnType::GlobalProtect),
        )?);
        self.global_protect = Some(Arc::clone(&config));
        Ok(config)
    }
}

/// Builds the model for one entry once its type is known
struct ParsingVisitor<'a, 'c> {
    entry: &'a Value,
    configs: &'a mut ConfigSet<'c>,
}

impl VpnTypeVisitor for ParsingVisitor<'_, '_> {
    type Output = Vpn;

    fn visit_pritunl(&mut self) -> Result<Vpn, VpnError> {
        let config = self.configs.pritunl()?;
        Ok(PritunlVpn::from_json_with_config(self.entry, config)?.into())
    }

    fn visit_global_protect(&mut self) -> Result<Vpn, VpnError> {
        let config = self.configs.global_protect()?;
        Ok(GlobalProtectVpn::from_json_with_config(self.entry, config)?.into())
    }
}

/// Turns VPN data documents into [`Vpn`] handles
#[derive(Debug, Default, Clone, Copy)]
pub struct VpnDataParser;

impl VpnDataParser {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a data file
    pub fn load_file(&self, path: &Path) -> Result<Vec<Vpn>, ParseError> {
        info!("Loading VPN data from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.parse_vpn_data(&content)
    }

    /// Parse a data document, keeping `vpn_list` order
    pub fn parse_vpn_data(&self, vpn_data: &str) -> Result<Vec<Vpn>, ParseError> {
        let document: Value = serde_json::from_str(vpn_data)?;
        let document = document.as_object().ok_or(ParseError::NotAnObject)?;

        let raw_configs = match document.get(CONFIG_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(ParseError::InvalidConfigBlock),
        };

        let entries = document
            .get(VPN_LIST_KEY)
            .ok_or(ParseError::MissingKey(VPN_LIST_KEY))?
            .as_array()
            .ok_or(ParseError::InvalidVpnList)?;

        let mut configs = ConfigSet::new(raw_configs);
        let vpns = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                generate_vpn(&mut configs, entry).map_err(|source| ParseError::Entry { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Parsed {} VPN(s)", vpns.len());
        Ok(vpns)
    }
}

/// Dispatch one entry on its `vpn_type` tag
fn generate_vpn(configs: &mut ConfigSet<'_>, entry: &Value) -> Result<Vpn, VpnError> {
    let vpn_type: VpnType = match entry.get(VPN_TYPE_KEY) {
        Some(Value::String(tag)) => tag.parse()?,
        Some(other) => return Err(VpnError::InvalidType(other.to_string())),
        None => return Err(VpnError::InvalidType(String::new())),
    };

    let mut visitor = ParsingVisitor { entry, configs };
    vpn_type.visit(&mut visitor)
}
