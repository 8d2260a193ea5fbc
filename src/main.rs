use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vpn_keeper::runner::{self, Action, Operation};
use vpn_keeper::vpn::VpnError;
use vpn_keeper::{Config, VpnDataParser};

#[derive(Parser)]
#[command(name = "vpn-keeper")]
#[command(about = "Connect, disconnect and keep alive a set of VPNs")]
#[command(version)]
struct Cli {
    /// connect (c), disconnect (d) or watch (w); prompted for when omitted
    action: Option<Action>,

    /// Path to the VPN data JSON file [default: ./vpn_data.json]
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Seconds between reconnects in watch mode [default: 60]
    #[arg(short, long)]
    interval: Option<u64>,

    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Ask for the action on stdin
fn prompt_action() -> Result<Action, Box<dyn std::error::Error>> {
    print!("Connect (c), disconnect (d) or watch (w)? ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.parse()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --verbose
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let action = match cli.action {
        Some(action) => action,
        None => prompt_action()?,
    };

    let config = match Config::locate(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };
    let data_path = cli.file.unwrap_or_else(|| config.vpn_data_path.clone());
    let interval = cli
        .interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.watch_interval());

    let vpns = match VpnDataParser::new().load_file(&data_path) {
        Ok(vpns) => vpns,
        Err(e) => {
            error!("Failed to parse {}: {}", data_path.display(), e);
            match e.vpn_error() {
                Some(VpnError::InvalidType(_)) => {
                    error!("Supported vpn_type values: PRITUNL, GLOBAL_PROTECT")
                }
                Some(VpnError::Unimplemented(vpn_type)) => {
                    error!("Remove the {} entries to manage the other VPNs", vpn_type)
                }
                _ => {}
            }
            std::process::exit(1);
        }
    };
    info!("Loaded {} VPN(s), action: {}", vpns.len(), action);

    let operation = match action {
        Action::Connect => Operation::Connect,
        Action::Disconnect => Operation::Disconnect,
        Action::Watch => {
            runner::watch(&vpns, cli.verbose, interval).await?;
            return Ok(());
        }
    };

    let report = runner::run_batch(&vpns, operation, cli.verbose).await?;
    if let Some((global_id, e)) = report.first_error() {
        error!(
            "{} of {} VPN(s) failed, first: {}: {}",
            report.failure_count(),
            report.outcomes.len(),
            global_id,
            e
        );
        std::process::exit(1);
    }

    info!("Done");
    Ok(())
}
