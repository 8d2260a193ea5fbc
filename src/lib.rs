//! VPN Keeper - connect, disconnect and keep alive a set of VPNs
//!
//! This crate drives the native command-line tools of VPN clients
//! (Pritunl, GlobalProtect) from a single JSON description of the VPNs to
//! manage. The VPN protocol itself is left entirely to those clients.
//!
//! # Architecture
//!
//! - `vpn`: backend enumeration, visitor dispatch, per-backend configs and models
//! - `parser`: VPN data file (JSON) to `Vpn` handles
//! - `process`: subprocess execution for the wrapped clients
//! - `runner`: concurrent connect/disconnect and watch mode
//! - `config`: application settings file (TOML)
//!
//! # Usage
//!
//! ```bash
//! vpn-keeper connect --file ~/vpn_data.json
//! vpn-keeper watch --interval 120 --verbose
//! ```

pub mod config;
pub mod parser;
pub mod process;
pub mod runner;
pub mod vpn;

pub use config::Config;
pub use parser::{ParseError, VpnDataParser};
pub use process::{ProcessError, ProcessResult};
pub use runner::{Action, BatchReport, Operation};
pub use vpn::{Vpn, VpnModel, VpnType};
