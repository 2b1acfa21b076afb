use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use episim::{Config, SimError, Simulation, logging};

#[derive(Parser, Debug)]
#[command(name = "episim", about = "Household-stratified, agent-based epidemic simulator")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(args: &Args) -> Result<(), SimError> {
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    logging::init(level)?;

    let config = Config::from_file(&args.config)?;
    let mut simulation = Simulation::new(&config)?;
    simulation.run()
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("episim: {err}");
            ExitCode::FAILURE
        }
    }
}
