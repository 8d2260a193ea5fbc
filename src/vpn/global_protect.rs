//! GlobalProtect backend
//!
//! The GlobalProtect app has no usable CLI, so the connection is controlled
//! through its launch agent: loading the agent starts the client (which
//! reconnects on its own), unloading it and killing the leftover processes
//! disconnects.

use super::{check_config_tag, check_model_tag, VpnError, VpnModel, VpnType, VPN_ID_KEY, VPN_TYPE_KEY};
use crate::process::{run_command, split_command, ProcessError, ProcessResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_SERVICE_LOAD_COMMAND: &str =
    "launchctl load /Library/LaunchAgents/com.paloaltonetworks.gp.pangpa.plist";
pub const DEFAULT_SERVICE_UNLOAD_COMMAND: &str =
    "launchctl unload /Library/LaunchAgents/com.paloaltonetworks.gp.pangpa.plist";
pub const DEFAULT_PROCESS_KILL_COMMAND: &str = "pkill -9 -f GlobalProtect";

/// Time the agent gets to release resources between unload and kill
const SERVICE_RELEASE_DELAY: Duration = Duration::from_secs(1);

fn default_service_load_command() -> String {
    DEFAULT_SERVICE_LOAD_COMMAND.to_string()
}

fn default_service_unload_command() -> String {
    DEFAULT_SERVICE_UNLOAD_COMMAND.to_string()
}

fn default_process_kill_command() -> String {
    DEFAULT_PROCESS_KILL_COMMAND.to_string()
}

/// Launch agent commands, each split on whitespace before running
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlobalProtectConfig {
    #[serde(default = "default_service_load_command")]
    pub service_load_command: String,
    #[serde(default = "default_service_unload_command")]
    pub service_unload_command: String,
    #[serde(default = "default_process_kill_command")]
    pub process_kill_command: String,
}

impl Default for GlobalProtectConfig {
    fn default() -> Self {
        Self {
            service_load_command: default_service_load_command(),
            service_unload_command: default_service_unload_command(),
            process_kill_command: default_process_kill_command(),
        }
    }
}

impl GlobalProtectConfig {
    pub const VPN_TYPE: VpnType = VpnType::GlobalProtect;

    pub fn vpn_type(&self) -> VpnType {
        Self::VPN_TYPE
    }

    pub fn to_json(&self) -> Value {
        json!({
            VPN_TYPE_KEY: Self::VPN_TYPE.as_str(),
            "service_load_command": self.service_load_command,
            "service_unload_command": self.service_unload_command,
            "process_kill_command": self.process_kill_command,
        })
    }

    /// Build from a `config.GLOBAL_PROTECT` block, filling in defaults
    pub fn from_json(json: &Value) -> Result<Self, VpnError> {
        check_config_tag(json, Self::VPN_TYPE)?;
        Ok(Self::deserialize(json)?)
    }
}

#[derive(Deserialize)]
struct GlobalProtectEntry {
    vpn_id: String,
}

/// One GlobalProtect installation
///
/// The id only labels the entry; the launch agent commands act on the
/// whole app.
#[derive(Debug, Clone)]
pub struct GlobalProtectVpn {
    vpn_id: String,
    config: Arc<GlobalProtectConfig>,
}

impl GlobalProtectVpn {
    pub fn new(vpn_id: impl Into<String>, config: Arc<GlobalProtectConfig>) -> Self {
        Self {
            vpn_id: vpn_id.into(),
            config,
        }
    }

    pub fn from_json_with_config(
        json: &Value,
        config: Arc<GlobalProtectConfig>,
    ) -> Result<Self, VpnError> {
        check_model_tag(json, VpnType::GlobalProtect)?;
        let entry = GlobalProtectEntry::deserialize(json)?;
        if entry.vpn_id.is_empty() {
            return Err(VpnError::EmptyId);
        }
        Ok(Self::new(entry.vpn_id, config))
    }

    pub fn config(&self) -> &Arc<GlobalProtectConfig> {
        &self.config
    }

    pub fn service_load_command(&self) -> &str {
        &self.config.service_load_command
    }

    pub fn service_unload_command(&self) -> &str {
        &self.config.service_unload_command
    }

    pub fn process_kill_command(&self) -> &str {
        &self.config.process_kill_command
    }

    fn log_result(&self, step: &str, result: &ProcessResult) {
        info!(
            "{} completed for {}: {}; Result: {}; Error: {}",
            step,
            self.global_id(),
            result.status,
            result.stdout.trim_end(),
            result.stderr.trim_end()
        );
    }
}

impl VpnModel for GlobalProtectVpn {
    fn id(&self) -> &str {
        &self.vpn_id
    }

    fn vpn_type(&self) -> VpnType {
        VpnType::GlobalProtect
    }

    fn connect(&self, verbose: bool) -> Result<ProcessResult, ProcessError> {
        if verbose {
            info!("Connecting to {}...", self.global_id());
        }
        let result = run_command(&split_command(self.service_load_command()))?;
        if verbose {
            self.log_result("Service load", &result);
        }
        Ok(result)
    }

    /// Unload the agent, give it a second, then kill what is left
    ///
    /// Returns the kill step's result.
    fn disconnect(&self, verbose: bool) -> Result<ProcessResult, ProcessError> {
        if verbose {
            info!("Disconnecting from {}...", self.global_id());
        }
        let unload = run_command(&split_command(self.service_unload_command()))?;
        if verbose {
            self.log_result("Service unload", &unload);
        }

        thread::sleep(SERVICE_RELEASE_DELAY);

        let kill = run_command(&split_command(self.process_kill_command()))?;
        if verbose {
            self.log_result("Process kill", &kill);
        }
        Ok(kill)
    }

    fn to_json(&self) -> Value {
        json!({
            VPN_ID_KEY: self.vpn_id,
            VPN_TYPE_KEY: VpnType::GlobalProtect.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GlobalProtectConfig::from_json(&json!({})).unwrap();
        assert_eq!(config.service_load_command, DEFAULT_SERVICE_LOAD_COMMAND);
        assert_eq!(config.service_unload_command, DEFAULT_SERVICE_UNLOAD_COMMAND);
        assert_eq!(config.process_kill_command, DEFAULT_PROCESS_KILL_COMMAND);
        assert_eq!(config.vpn_type(), VpnType::GlobalProtect);
    }

    #[test]
    fn test_config_partial_override() {
        let config = GlobalProtectConfig::from_json(&json!({
            "process_kill_command": "killall GlobalProtect",
        }))
        .unwrap();
        assert_eq!(config.process_kill_command, "killall GlobalProtect");
        assert_eq!(config.service_load_command, DEFAULT_SERVICE_LOAD_COMMAND);

        let json = config.to_json();
        assert_eq!(json["vpn_type"], "GLOBAL_PROTECT");
        assert_eq!(json["process_kill_command"], "killall GlobalProtect");
    }

    #[test]
    fn test_config_type_mismatch() {
        let result = GlobalProtectConfig::from_json(&json!({"vpn_type": "PRITUNL"}));
        assert!(matches!(
            result,
            Err(VpnError::TypeMismatch {
                expected: VpnType::GlobalProtect,
                found: VpnType::Pritunl
            })
        ));
    }

    #[test]
    fn test_model_from_json() {
        let original = json!({"vpn_id": "corp", "vpn_type": "GLOBAL_PROTECT"});
        let vpn = GlobalProtectVpn::from_json_with_config(
            &original,
            Arc::new(GlobalProtectConfig::default()),
        )
        .unwrap();

        assert_eq!(vpn.id(), "corp");
        assert_eq!(vpn.global_id(), "GLOBAL_PROTECT_corp");
        assert_eq!(vpn.to_json(), original);
    }

    #[test]
    fn test_model_rejects_wrong_tag() {
        let result = GlobalProtectVpn::from_json_with_config(
            &json!({"vpn_id": "corp", "vpn_type": "PRITUNL"}),
            Arc::new(GlobalProtectConfig::default()),
        );
        assert!(matches!(result, Err(VpnError::TypeMismatch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_connect_runs_load_command() {
        let config = Arc::new(GlobalProtectConfig {
            service_load_command: "echo load  the agent".to_string(),
            ..GlobalProtectConfig::default()
        });
        let vpn = GlobalProtectVpn::new("corp", config);

        let result = vpn.connect(true).unwrap();
        assert_eq!(result.program, "echo");
        assert_eq!(result.stdout, "load the agent\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_disconnect_unloads_then_kills() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("steps.log");
        let script = dir.path().join("record.sh");
        std::fs::write(
            &script,
            format!("echo \"$1\" >> {}\necho \"$1 done\"\n", log.display()),
        )
        .unwrap();

        let config = Arc::new(GlobalProtectConfig {
            service_load_command: format!("sh {} load", script.display()),
            service_unload_command: format!("sh {} unload", script.display()),
            process_kill_command: format!("sh {} kill", script.display()),
        });
        let vpn = GlobalProtectVpn::new("corp", config);

        let result = vpn.disconnect(false).unwrap();

        assert_eq!(result.stdout, "kill done\n");
        let steps = std::fs::read_to_string(&log).unwrap();
        assert_eq!(steps, "unload\nkill\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_verbose_runs_same_commands() {
        let config = Arc::new(GlobalProtectConfig {
            service_load_command: "echo load".to_string(),
            service_unload_command: "echo unload".to_string(),
            process_kill_command: "echo kill".to_string(),
        });
        let vpn = GlobalProtectVpn::new("corp", config);

        assert_eq!(
            vpn.connect(false).unwrap().stdout,
            vpn.connect(true).unwrap().stdout
        );
        assert_eq!(
            vpn.disconnect(false).unwrap().stdout,
            vpn.disconnect(true).unwrap().stdout
        );
    }

    #[test]
    fn test_empty_command_is_an_error() {
        let config = Arc::new(GlobalProtectConfig {
            service_load_command: "   ".to_string(),
            ..GlobalProtectConfig::default()
        });
        let vpn = GlobalProtectVpn::new("corp", config);

        assert!(matches!(vpn.connect(false), Err(ProcessError::EmptyCommand)));
    }
}
