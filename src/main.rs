use clap::{Parser, Subcommand};
use std::path::PathBuf;

use record_splitter::config::{ModeConfig, RunConfig};
use record_splitter::{logging, runtime, WriteMode};

#[derive(Parser)]
#[command(name = "rsplit")]
#[command(about = "Record splitter - sample, split and partition BSON record streams", long_about = None)]
struct Cli {
    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write a JSON run manifest to this path
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the input into a random sample and the remaining records
    Split {
        /// Input file or glob pattern
        #[arg(short, long)]
        input: String,
        /// Output file for the sampled records
        #[arg(short, long)]
        output: PathBuf,
        /// Output file for the remaining records
        #[arg(short, long)]
        remainder: PathBuf,
        /// Declared number of records in the input
        #[arg(short = 'n', long)]
        total_records: usize,
        /// Number of records to sample
        #[arg(short = 'k', long)]
        sample_size: usize,
        /// Seed for the random selection
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write a random sample of the input to a single file
    Sample {
        /// Input file or glob pattern
        #[arg(short, long)]
        input: String,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Declared number of records in the input
        #[arg(short = 'n', long)]
        total_records: usize,
        /// Number of random records to write
        #[arg(short = 'r', long)]
        random_records: usize,
        /// Seed for the random selection
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Distribute records round-robin over several files
    Partition {
        /// Input file or glob pattern
        #[arg(short, long)]
        input: String,
        /// Directory for the partition files
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Declared number of records in the input
        #[arg(short = 'n', long)]
        total_records: usize,
        /// Number of partitions
        #[arg(short, long)]
        splits: usize,
        /// Partition file name pattern ({part}, {part:04}, {per_part})
        #[arg(long)]
        pattern: Option<String>,
        /// Empty existing partition files instead of appending to them
        #[arg(long)]
        truncate: bool,
    },
    /// Count the records in the input
    Count {
        /// Input file or glob pattern
        #[arg(short, long)]
        input: String,
    },
    /// Run from a YAML configuration
    Run {
        /// Path to run YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a run configuration
    Validate {
        /// Path to run YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn cli_config(
    input: String,
    declared_count: usize,
    seed: Option<u64>,
    mode: ModeConfig,
) -> RunConfig {
    RunConfig {
        name: mode.kind().to_string(),
        input,
        declared_count,
        seed,
        progress: true,
        manifest: None,
        mode,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mut config = match cli.command {
        Commands::Split {
            input,
            output,
            remainder,
            total_records,
            sample_size,
            seed,
        } => cli_config(
            input,
            total_records,
            seed,
            ModeConfig::Split {
                selected: output,
                remainder,
                sample_size,
            },
        ),
        Commands::Sample {
            input,
            output,
            total_records,
            random_records,
            seed,
        } => cli_config(
            input,
            total_records,
            seed,
            ModeConfig::Sample {
                output,
                sample_size: random_records,
            },
        ),
        Commands::Partition {
            input,
            output_dir,
            total_records,
            splits,
            pattern,
            truncate,
        } => cli_config(
            input,
            total_records,
            None,
            ModeConfig::Partition {
                output_dir,
                parts: splits,
                name_pattern: pattern,
                write_mode: if truncate {
                    WriteMode::Truncate
                } else {
                    WriteMode::Append
                },
            },
        ),
        Commands::Count { input } => {
            let count = runtime::count(&input)?;
            println!("{}", count);
            return Ok(());
        }
        Commands::Run { config } => RunConfig::from_yaml_file(&config)?,
        Commands::Validate { config } => {
            let _config = RunConfig::from_yaml_file(&config)?;
            println!("✓ Run configuration is valid");
            return Ok(());
        }
        Commands::Version => {
            println!("rsplit version {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
    };

    if cli.quiet {
        config.progress = false;
    }
    if cli.manifest.is_some() {
        config.manifest = cli.manifest;
    }

    runtime::run(&config)?;
    Ok(())
}
