use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nodefig::{Cli, NodefigError, Settings, ops};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), NodefigError> {
    let mut settings = Settings::load(cli.settings.as_deref())?;
    if let Some(adapter) = cli.adapter {
        settings.adapter = adapter;
    }
    initialize_logging(&settings.log);

    let table = settings.policy_table()?;
    let result = ops::handle(&cli.command.into_action(), &settings, &table)?;
    println!("{result}");
    Ok(())
}

/// Log to stderr. An invalid filter falls back to `warn`.
fn initialize_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
