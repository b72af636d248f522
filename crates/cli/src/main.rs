// costrecon CLI - research cost reconciliation and model-metric alerting

mod alert;
mod exit_codes;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "costrecon")]
#[command(about = "Research cost vs commission reconciliation, plus model-metric alerting")]
#[command(version)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "costrecon=debug"
    #[arg(long, global = true, value_name = "FILTER")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile research costs against commissions per broker/team/individual
    #[command(subcommand)]
    Recon(recon::ReconCommands),

    /// Check a model metric against its threshold and notify on breach
    #[command(subcommand)]
    Alert(alert::AlertCommands),
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

/// Logs go to stderr so `--json` stdout stays a single JSON value.
fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "costrecon=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let result = match cli.command {
        Commands::Recon(cmd) => recon::cmd_recon(cmd),
        Commands::Alert(cmd) => alert::cmd_alert(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
