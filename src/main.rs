use anyhow::Result;
use clap::{Parser, Subcommand};
use spot_optimizer::config::{self, Config};
use spot_optimizer::exit_codes;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use crate::commands::{CacheCommands, CatalogArgs, OptimizeArgs};

/// Environment variable that turns on debug logging, same as `--verbose`
const DEBUG_ENV: &str = "SPOT_OPTIMIZER_DEBUG";

#[derive(Parser)]
#[command(name = "spot-optimizer")]
#[command(
    about = "Pick the EC2 spot instance type and count for a resource request",
    long_about = "spot-optimizer recommends an EC2 spot instance type and node count that covers\na requested number of cores and GiB of memory.\n\nCandidates are ranked by node count according to the selected mode and by\ninterruption frequency from the AWS Spot Advisor feed (cached for an hour).\n\nModes:\n  - latency: fewer, larger nodes\n  - fault_tolerance: more, smaller nodes\n  - balanced: trade node count against wasted capacity"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SPOT_OPTIMIZER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output (also enabled by SPOT_OPTIMIZER_DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    output: String,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend an instance type and node count
    ///
    /// Examples:
    ///   spot-optimizer optimize --cores 8 --memory 32
    ///   spot-optimizer optimize --cores 80 --memory 512 --mode latency --region us-east-1
    ///   spot-optimizer optimize --cores 16 --memory 64 --ssd-only --instance-family m6 --output json
    Optimize(OptimizeArgs),
    /// List instance types passing the given filters
    Catalog(CatalogArgs),
    /// Inspect or clear cached interruption ranks
    Cache {
        #[command(subcommand)]
        subcommand: CacheCommands,
    },
    /// Write a default configuration file
    Init {
        /// Path for the new config file
        #[arg(short, long, default_value = ".spot-optimizer.toml")]
        path: PathBuf,
    },
}

fn debug_requested(verbose: bool) -> bool {
    verbose
        || std::env::var(DEBUG_ENV)
            .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false)
}

fn init_logging(debug: bool, log_format: &str) {
    // Only warnings and errors unless debugging
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Optimize(args) => commands::optimize(args, &config, &cli.output).await,
        Commands::Catalog(args) => commands::list_catalog(args, &config, &cli.output),
        Commands::Cache { subcommand } => {
            commands::handle_cache_command(subcommand, &config, &cli.output)
        }
        Commands::Init { path } => {
            config::init_config(&path)?;
            Ok(exit_codes::codes::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(debug_requested(cli.verbose), &cli.log_format);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_codes::exit_code_for_anyhow(&e)
        }
    };
    std::process::exit(code);
}
