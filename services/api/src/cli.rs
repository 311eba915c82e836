use crate::demo::{run_demo, DemoArgs};
use crate::server;
use crate::simulate::{run_simulation, SimulateArgs};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use talentflow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "TalentFlow Pipeline",
    about = "Run and demonstrate the application lifecycle and recruiter assignment engine",
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
    /// Walk one application from draft to hire against a seeded in-memory store
    Demo(DemoArgs),
    /// Sample the weighted recruiter draw for a company and print the distribution
    SimulateAssignment(SimulateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Recruiter roster CSV loaded on top of the demo seed data
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::SimulateAssignment(args) => run_simulation(args),
    }
}
