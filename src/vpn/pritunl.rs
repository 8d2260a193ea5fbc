//! Pritunl backend
//!
//! Drives the `pritunl-client` CLI shipped with the Pritunl desktop app:
//!
//! ```text
//! pritunl-client start <vpn_id> -p <pin><totp><token>
//! pritunl-client stop <vpn_id>
//! ```

use super::{check_config_tag, check_model_tag, VpnError, VpnModel, VpnType, VPN_ID_KEY, VPN_TYPE_KEY};
use crate::process::{run_command, ProcessError, ProcessResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::TOTP;
use tracing::info;

pub const DEFAULT_CLI_PATH: &str = "/Applications/Pritunl.app/Contents/Resources/pritunl-client";

fn default_cli_path() -> String {
    DEFAULT_CLI_PATH.to_string()
}

/// Settings shared by every Pritunl VPN
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PritunlConfig {
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
}

impl Default for PritunlConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
        }
    }
}

impl PritunlConfig {
    pub const VPN_TYPE: VpnType = VpnType::Pritunl;

    pub fn vpn_type(&self) -> VpnType {
        Self::VPN_TYPE
    }

    pub fn to_json(&self) -> Value {
        json!({
            VPN_TYPE_KEY: Self::VPN_TYPE.as_str(),
            "cli_path": self.cli_path,
        })
    }

    /// Build from a `config.PRITUNL` block, filling in defaults
    pub fn from_json(json: &Value) -> Result<Self, VpnError> {
        check_config_tag(json, Self::VPN_TYPE)?;
        Ok(Self::deserialize(json)?)
    }
}

/// Uppercase the base32 `secret` parameter, which authenticator exports
/// often write in lowercase
fn normalize_secret(totp_url: &str) -> String {
    let Some((base, query)) = totp_url.split_once('?') else {
        return totp_url.to_string();
    };
    let query = query
        .split('&')
        .map(|param| match param.split_once('=') {
            Some(("secret", value)) => format!("secret={}", value.to_uppercase()),
            _ => param.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", base, query)
}

/// Instance fields of a Pritunl entry
#[derive(Deserialize)]
struct PritunlEntry {
    vpn_id: String,
    #[serde(default)]
    pin: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    totp_url: String,
}

/// One Pritunl profile
#[derive(Debug, Clone)]
pub struct PritunlVpn {
    vpn_id: String,
    config: Arc<PritunlConfig>,
    pin: String,
    token: String,
    totp_url: String,
    totp: Option<TOTP>,
}

impl PritunlVpn {
    /// Profile without credentials
    pub fn new(vpn_id: impl Into<String>, config: Arc<PritunlConfig>) -> Self {
        Self {
            vpn_id: vpn_id.into(),
            config,
            pin: String::new(),
            token: String::new(),
            totp_url: String::new(),
            totp: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = pin.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Attach an `otpauth://totp/...` seed; an empty URL clears it
    pub fn with_totp_url(mut self, totp_url: impl Into<String>) -> Result<Self, VpnError> {
        let totp_url = totp_url.into();
        self.totp = if totp_url.is_empty() {
            None
        } else {
            let totp = TOTP::from_url_unchecked(normalize_secret(&totp_url))
                .map_err(|e| VpnError::InvalidTotpUrl(e.to_string()))?;
            Some(totp)
        };
        self.totp_url = totp_url;
        Ok(self)
    }

    /// Build from one `vpn_list` entry plus the shared config
    pub fn from_json_with_config(json: &Value, config: Arc<PritunlConfig>) -> Result<Self, VpnError> {
        check_model_tag(json, VpnType::Pritunl)?;
        let entry = PritunlEntry::deserialize(json)?;
        if entry.vpn_id.is_empty() {
            return Err(VpnError::EmptyId);
        }

        PritunlVpn::new(entry.vpn_id, config)
            .with_pin(entry.pin)
            .with_token(entry.token)
            .with_totp_url(entry.totp_url)
    }

    pub fn config(&self) -> &Arc<PritunlConfig> {
        &self.config
    }

    pub fn cli_path(&self) -> &str {
        &self.config.cli_path
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn totp_url(&self) -> &str {
        &self.totp_url
    }

    /// Code for the given unix time, empty without a seed
    pub fn totp_at(&self, unix_secs: u64) -> String {
        self.totp
            .as_ref()
            .map(|totp| totp.generate(unix_secs))
            .unwrap_or_default()
    }

    /// Code for the current time, recomputed on every call
    pub fn totp(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.totp_at(now)
    }

    /// Value of the `-p` flag: PIN, TOTP code and static token, unseparated
    pub fn password(&self, totp: &str) -> String {
        format!("{}{}{}", self.pin, totp, self.token)
    }

    pub fn connect_args(&self, totp: &str) -> Vec<String> {
        vec![
            self.config.cli_path.clone(),
            "start".to_string(),
            self.vpn_id.clone(),
            "-p".to_string(),
            self.password(totp),
        ]
    }

    pub fn disconnect_args(&self) -> Vec<String> {
        vec![
            self.config.cli_path.clone(),
            "stop".to_string(),
            self.vpn_id.clone(),
        ]
    }
}

impl VpnModel for PritunlVpn {
    fn id(&self) -> &str {
        &self.vpn_id
    }

    fn vpn_type(&self) -> VpnType {
        VpnType::Pritunl
    }

    fn connect(&self, verbose: bool) -> Result<ProcessResult, ProcessError> {
        if verbose {
            info!("Connecting to {}...", self.global_id());
        }
        let result = run_command(&self.connect_args(&self.totp()))?;
        if verbose {
            info!(
                "Connect process completed for {}: {}; Result: {}; Error: {}",
                self.global_id(),
                result.status,
                result.stdout.trim_end(),
                result.stderr.trim_end()
            );
        }
        Ok(result)
    }

    fn disconnect(&self, verbose: bool) -> Result<ProcessResult, ProcessError> {
        if verbose {
            info!("Disconnecting from {}...", self.global_id());
        }
        let result = run_command(&self.disconnect_args())?;
        if verbose {
            info!(
                "Disconnect process completed for {}: {}; Result: {}; Error: {}",
                self.global_id(),
                result.status,
                result.stdout.trim_end(),
                result.stderr.trim_end()
            );
        }
        Ok(result)
    }

    fn to_json(&self) -> Value {
        json!({
            VPN_ID_KEY: self.vpn_id,
            VPN_TYPE_KEY: VpnType::Pritunl.as_str(),
            "pin": self.pin,
            "totp_url": self.totp_url,
            "token": self.token,
        })
    }
}
