//! Fan-out of connect/disconnect across all VPNs
//!
//! Every VPN gets its own blocking worker; the batch returns once all of
//! them have finished. There is no timeout: a hung client blocks its worker
//! and therefore the batch.

use crate::process::{ProcessError, ProcessResult};
use crate::vpn::{Vpn, VpnModel};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("VPN worker failed: {0}")]
    Worker(#[from] JoinError),
}

#[derive(Error, Debug)]
#[error("Invalid action {0:?}, expected connect (c), disconnect (d) or watch (w)")]
pub struct ActionParseError(String);

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
    /// Connect forever, once per interval
    Watch,
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "connect" => Ok(Action::Connect),
            "d" | "disconnect" => Ok(Action::Disconnect),
            "w" | "watch" => Ok(Action::Watch),
            _ => Err(ActionParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Connect => f.write_str("connect"),
            Action::Disconnect => f.write_str("disconnect"),
            Action::Watch => f.write_str("watch"),
        }
    }
}

/// Single operation applied to every VPN in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Disconnect,
}

impl Operation {
    fn apply(self, vpn: &Vpn, verbose: bool) -> Result<ProcessResult, ProcessError> {
        match self {
            Operation::Connect => vpn.connect(verbose),
            Operation::Disconnect => vpn.disconnect(verbose),
        }
    }
}

#[derive(Debug)]
pub struct VpnOutcome {
    pub global_id: String,
    pub result: Result<ProcessResult, ProcessError>,
}

/// Outcomes of one batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<VpnOutcome>,
}

impl BatchReport {
    /// First VPN whose client could not be run
    pub fn first_error(&self) -> Option<(&str, &ProcessError)> {
        self.outcomes.iter().find_map(|outcome| match &outcome.result {
            Ok(_) => None,
            Err(e) => Some((outcome.global_id.as_str(), e)),
        })
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn is_ok(&self) -> bool {
        self.first_error().is_none()
    }
}

/// Run `operation` on every VPN concurrently and wait for all of them
///
/// A client that cannot be started is logged and recorded in the report
/// without affecting the other workers. A panicking worker is reported as
/// [`RunError::Worker`] once the rest have finished.
pub async fn run_batch(
    vpns: &[Vpn],
    operation: Operation,
    verbose: bool,
) -> Result<BatchReport, RunError> {
    let mut workers = JoinSet::new();
    for (index, vpn) in vpns.iter().cloned().enumerate() {
        workers.spawn_blocking(move || {
            let result = operation.apply(&vpn, verbose);
            (
                index,
                VpnOutcome {
                    global_id: vpn.global_id(),
                    result,
                },
            )
        });
    }

    let mut slots: Vec<Option<VpnOutcome>> = vpns.iter().map(|_| None).collect();
    let mut worker_error = None;

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                match &outcome.result {
                    Ok(result) => debug!(
                        "{:?} {} finished: {}",
                        operation, outcome.global_id, result.status
                    ),
                    Err(e) => error!("{:?} {} failed: {}", operation, outcome.global_id, e),
                }
                slots[index] = Some(outcome);
            }
            Err(e) => {
                error!("VPN worker failed: {}", e);
                worker_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = worker_error {
        return Err(RunError::Worker(e));
    }

    Ok(BatchReport {
        outcomes: slots.into_iter().flatten().collect(),
    })
}

/// Reconnect every VPN once per `interval`, forever
///
/// Connect is re-run regardless of the current connection state. Client
/// failures are logged and the loop keeps going.
pub async fn watch(vpns: &[Vpn], verbose: bool, interval: Duration) -> Result<(), RunError> {
    info!(
        "Watching {} VPN(s), reconnecting every {}s",
        vpns.len(),
        interval.as_secs()
    );
    loop {
        let report = run_batch(vpns, Operation::Connect, verbose).await?;
        if !report.is_ok() {
            warn!(
                "{} of {} VPN(s) could not be started",
                report.failure_count(),
                report.outcomes.len()
            );
        }
        tokio::time::sleep(interval).await;
    }
}
