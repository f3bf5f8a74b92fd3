#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::logging::init_tracing;
use crate::run::{PrintConfigArgs, RunArgs, print_config, simulate};

#[derive(Debug, Parser)]
#[command(
    name = "vortex-sim",
    about = "Drive the vortex orchestrator headlessly on a virtual clock",
    version
)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a scripted session and print signals, intents, and frames.
    Run(RunArgs),

    /// Print the effective configuration.
    #[command(name = "print-config")]
    PrintConfig(PrintConfigArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}

pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    match cli.command {
        Commands::Run(args) => simulate(&args, out).map(|_| ()),
        Commands::PrintConfig(args) => print_config(&args, out),
    }
}
