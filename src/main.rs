use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blockstats::accel::manager::BackendPreference;
use blockstats::config::StatsConfig;
use blockstats::stats::{report, MergeStrategy};

#[derive(Parser)]
#[command(
    name = "blockstats",
    about = "Block-parallel descriptive statistics over large numeric datasets",
    version,
    long_about = None
)]
struct Cli {
    /// TOML config file (default: $BLOCKSTATS_CONFIG, then ./blockstats.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute min, max, mean, std-dev, median and quartiles of a record file
    Run {
        /// Whitespace-separated record file (LOCATION YEAR MONTH DAY TIME VALUE)
        #[arg(long, short)]
        input: PathBuf,

        /// Values per block (default: the backend's preferred size)
        #[arg(long, short)]
        block_size: Option<usize>,

        /// Compute backend
        #[arg(long, value_enum)]
        backend: Option<BackendPreference>,

        /// Device index from `blockstats devices`
        #[arg(long, short, conflicts_with = "backend")]
        device: Option<usize>,

        /// K-way merge strategy
        #[arg(long, value_enum)]
        merge: Option<MergeStrategy>,

        /// Print per-stage timings
        #[arg(long)]
        timings: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// List available compute backends
    Devices {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(config: &StatsConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StatsConfig::load(path)?,
        None => StatsConfig::load_or_default(),
    };
    init_logging(&config);

    match cli.command {
        Commands::Run {
            input,
            block_size,
            backend,
            device,
            merge,
            timings,
            json,
        } => {
            if block_size.is_some() {
                config.compute.block_size = block_size;
            }
            if let Some(backend) = backend {
                config.compute.backend = backend;
            }
            if let Some(merge) = merge {
                config.merge.strategy = merge;
            }

            let manager = blockstats::backend_manager(&config);
            if let Some(index) = device {
                config.compute.backend = manager.device_preference(index)?;
            }

            let records = blockstats::ingest::read_records(&input)?;
            let values = blockstats::ingest::values(&records);
            let stats = blockstats::analyze(values, &config, &manager)
                .with_context(|| format!("statistics failed for {}", input.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!();
                print!("{}", report::format_summary(&stats));
                if timings {
                    println!();
                    print!("{}", report::format_timings(&stats));
                }
            }
        }
        Commands::Devices { json } => {
            let manager = blockstats::backend_manager(&config);
            let devices = manager.devices();
            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else {
                println!("{:<5} | {:<22} | {:<8} | {:<7} | Block", "Index", "Name", "Kind", "Units");
                println!("{:-<5}-|-{:-<22}-|-{:-<8}-|-{:-<7}-|-{:-<5}", "", "", "", "", "");
                for d in devices {
                    println!(
                        "{:<5} | {:<22} | {:<8} | {:<7} | {}",
                        d.index,
                        d.name,
                        d.kind.to_string(),
                        d.compute_units,
                        d.preferred_block_size
                    );
                }
            }
        }
    }

    Ok(())
}
