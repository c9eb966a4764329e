use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use serde::Serialize;
use spot_optimizer::catalog::{Architecture, CatalogFilter, EmrVersion, InstanceType, StorageKind};
use spot_optimizer::config::Config;
use spot_optimizer::exit_codes::{self, codes};
use spot_optimizer::optimizer::{self, SpotOptimizer};
use spot_optimizer::request::OptimizationRequest;
use spot_optimizer::result::{ErrorResult, OptimizationOutcome, OptimizationResult};
use spot_optimizer::utils::{format_duration, freshness};
use spot_optimizer::validation;
use spot_optimizer::Catalog;

#[derive(Args, Clone)]
pub struct OptimizeArgs {
    /// Total vCPUs required
    #[arg(long, allow_negative_numbers = true)]
    cores: i64,
    /// Total memory required, in GiB
    #[arg(long, allow_negative_numbers = true)]
    memory: i64,
    /// AWS region (default from config, else us-west-2)
    #[arg(long)]
    region: Option<String>,
    /// Only instance types with local SSD storage
    #[arg(long)]
    ssd_only: bool,
    /// Include ARM (Graviton) instance types
    #[arg(long, overrides_with = "no_arm")]
    arm: bool,
    /// Exclude ARM instance types (default)
    #[arg(long, overrides_with = "arm")]
    no_arm: bool,
    /// Instance family prefix, e.g. m6i; may be repeated or comma separated
    #[arg(long = "instance-family", value_delimiter = ',')]
    instance_family: Vec<String>,
    /// Only instance types supported by this EMR release, e.g. 6.10.0
    #[arg(long)]
    emr_version: Option<String>,
    /// latency, fault_tolerance or balanced (default from config)
    #[arg(long)]
    mode: Option<String>,
}

#[derive(Args, Clone)]
pub struct CatalogArgs {
    /// Only instance types offered in this region
    #[arg(long)]
    region: Option<String>,
    /// Only instance types with local SSD storage
    #[arg(long)]
    ssd_only: bool,
    /// Only ARM (Graviton) instance types
    #[arg(long, conflicts_with = "x86")]
    arm: bool,
    /// Only x86_64 instance types
    #[arg(long)]
    x86: bool,
    /// Instance family prefix; may be repeated or comma separated
    #[arg(long = "instance-family", value_delimiter = ',')]
    instance_family: Vec<String>,
    /// Only instance types supported by this EMR release
    #[arg(long)]
    emr_version: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum CacheCommands {
    /// Delete every cached interruption-rank table
    Clear,
    /// Show the age of the cached table for a region
    Status {
        /// Region to inspect (default from config)
        #[arg(long)]
        region: Option<String>,
    },
}

pub async fn optimize(args: OptimizeArgs, config: &Config, output_format: &str) -> Result<i32> {
    let optimizer =
        SpotOptimizer::from_config(config).context("Failed to initialize the optimizer")?;

    let mut request = OptimizationRequest::builder(args.cores, args.memory)
        .region(args.region.unwrap_or_else(|| config.defaults.region.clone()))
        .ssd_only(args.ssd_only)
        .arm_instances(args.arm && !args.no_arm)
        .instance_families(args.instance_family);
    if let Some(version) = args.emr_version {
        request = request.emr_version(version);
    }
    request = match args.mode {
        Some(mode) => request.mode_name(mode),
        None => request.mode(config.defaults.mode),
    };

    match optimizer.optimize(request).await {
        OptimizationOutcome::Success(result) => {
            print_result(&result, output_format)?;
            Ok(codes::SUCCESS)
        }
        OptimizationOutcome::Error(err) => {
            print_error(&err, output_format)?;
            Ok(exit_codes::exit_code_for_result(&err))
        }
    }
}

fn print_result(result: &OptimizationResult, output_format: &str) -> Result<()> {
    if output_format == "json" {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "{} x {}",
        style(result.instances.count).bold(),
        style(&result.instances.instance_type).bold().cyan()
    );
    println!("  {} {}", style("Mode:").dim(), result.mode);
    println!("  {} {}", style("Total vCPU:").dim(), result.total_cores);
    println!("  {} {} GiB", style("Total memory:").dim(), result.total_ram);
    match &result.reliability {
        Some(reliability) => {
            let label = reliability
                .interruption_label
                .as_deref()
                .map(|l| format!(" ({} interruptions)", l))
                .unwrap_or_default();
            println!(
                "  {} rank {}{}",
                style("Interruption:").dim(),
                reliability.interruption_rank,
                label
            );
            if let Some(savings) = reliability.savings {
                println!(
                    "  {} {}",
                    style("Savings vs on-demand:").dim(),
                    style(format!("{}%", savings)).green()
                );
            }
        }
        None => println!(
            "  {} {}",
            style("Interruption:").dim(),
            style("unknown").yellow()
        ),
    }
    Ok(())
}

fn print_error(err: &ErrorResult, output_format: &str) -> Result<()> {
    if output_format == "json" {
        eprintln!("{}", serde_json::to_string_pretty(err)?);
    } else {
        eprintln!("{}", style(&err.error).red());
    }
    Ok(())
}

#[derive(Serialize)]
struct CatalogListing<'a> {
    generated_at: Option<&'a str>,
    count: usize,
    instance_types: Vec<&'a InstanceType>,
}

fn catalog_filter(args: CatalogArgs) -> spot_optimizer::Result<CatalogFilter> {
    if let Some(region) = &args.region {
        validation::validate_region(region)?;
    }
    for family in &args.instance_family {
        validation::validate_instance_family(family)?;
    }
    let emr_version = args
        .emr_version
        .as_deref()
        .map(str::parse::<EmrVersion>)
        .transpose()?;

    let architecture = if args.arm {
        Some(Architecture::Arm64)
    } else if args.x86 {
        Some(Architecture::X86_64)
    } else {
        None
    };

    Ok(CatalogFilter {
        storage: args.ssd_only.then_some(StorageKind::Ssd),
        architecture,
        families: args.instance_family,
        region: args.region,
        emr_version,
    })
}

pub fn list_catalog(args: CatalogArgs, config: &Config, output_format: &str) -> Result<i32> {
    let catalog = match &config.catalog.path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::bundled()?,
    };
    let filter = catalog_filter(args)?;
    let instances = catalog.query(&filter);

    if output_format == "json" {
        let listing = CatalogListing {
            generated_at: catalog.generated_at(),
            count: instances.len(),
            instance_types: instances,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(codes::SUCCESS);
    }

    if instances.is_empty() {
        println!("No instance types match the given filters.");
        return Ok(codes::SUCCESS);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Type"),
        Cell::new("vCPU"),
        Cell::new("Memory (GiB)"),
        Cell::new("Storage"),
        Cell::new("Arch"),
        Cell::new("Min EMR"),
    ]);
    for instance in &instances {
        table.add_row(vec![
            Cell::new(&instance.name),
            Cell::new(instance.vcpu),
            Cell::new(instance.memory_gib),
            Cell::new(instance.storage),
            Cell::new(instance.architecture),
            Cell::new(
                instance
                    .emr_min_version
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("{table}");
    println!("{} instance types", instances.len());
    Ok(codes::SUCCESS)
}

#[derive(Serialize)]
struct CacheStatus {
    region: String,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetched_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_types: Option<usize>,
}

pub fn handle_cache_command(
    cmd: CacheCommands,
    config: &Config,
    output_format: &str,
) -> Result<i32> {
    let store = optimizer::rank_store(config);
    match cmd {
        CacheCommands::Clear => {
            store.clear().context("Failed to clear the interruption-rank cache")?;
            if output_format == "json" {
                println!("{}", serde_json::json!({ "cleared": true }));
            } else {
                println!("{}", style("Interruption-rank cache cleared").green());
            }
        }
        CacheCommands::Status { region } => {
            let region = region.unwrap_or_else(|| config.defaults.region.clone());
            validation::validate_region(&region)?;
            let ttl = config.advisor.ttl();
            let status = match store.get(&region)? {
                Some((ranks, age)) => CacheStatus {
                    region,
                    cached: true,
                    fetched_at: Some(ranks.fetched_at().to_rfc3339()),
                    age_secs: Some(age.as_secs()),
                    fresh: Some(age < ttl),
                    instance_types: Some(ranks.len()),
                },
                None => CacheStatus {
                    region,
                    cached: false,
                    fetched_at: None,
                    age_secs: None,
                    fresh: None,
                    instance_types: None,
                },
            };

            if output_format == "json" {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else if let (Some(age), Some(count)) = (status.age_secs, status.instance_types) {
                let age = std::time::Duration::from_secs(age);
                println!(
                    "{}: {} instance types, fetched {} ago ({})",
                    style(&status.region).bold(),
                    count,
                    format_duration(age),
                    freshness(age, ttl)
                );
            } else {
                println!("{}: not cached", style(&status.region).bold());
            }
        }
    }
    Ok(codes::SUCCESS)
}
