use crate::calculate::{run_academic, run_practical, AcademicArgs, PracticalArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use maxjungsi::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "maxjungsi",
    about = "Serve or run the admission score calculators from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score one student offline from local JSON and CSV files
    Calculate {
        #[command(subcommand)]
        command: CalculateCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CalculateCommand {
    /// Academic (수능) composite for one university config
    Academic(AcademicArgs),
    /// Practical (실기) total against one score table
    Practical(PracticalArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Catalog snapshot to serve (overrides APP_CATALOG_PATH)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Calculate {
            command: CalculateCommand::Academic(args),
        } => run_academic(args),
        Command::Calculate {
            command: CalculateCommand::Practical(args),
        } => run_practical(args),
    }
}
