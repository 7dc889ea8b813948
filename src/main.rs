use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlcannon::cli::{self, Commands};
use sqlcannon::config;
use sqlcannon::errors::ProbeError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let result = match cli.command {
        Commands::Probe(args) => cli::probe::handle_probe(args, cli.quiet).await,
        Commands::Report(args) => cli::report::handle_report(args).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            ProbeError::Config(_) => 2,
            ProbeError::InvalidInvocation(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), ProbeError> {
    let path = std::path::PathBuf::from(&args.config);
    let config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    println!(
        "  rate_limit={}/s timeout={}s retries={} workers={} extensions={:?}",
        config.policy.rate_limit,
        config.policy.timeout,
        config.policy.retries,
        config.policy.workers,
        config.policy.path_extensions(),
    );
    Ok(())
}
