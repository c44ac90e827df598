use std::env;
use std::process;

use covid_explorer::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so stdout stays clean JSON for the CLI commands.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    process::exit(cli::run_with_args(&args));
}
