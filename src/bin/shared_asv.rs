//! shared-asv - find ASVs shared between two samples
//!
//! Command-line interface for the shared-ASV computation.

use clap::{Parser, Subcommand, ValueEnum};
use shared_asv::config::RunConfig;
use shared_asv::demo::write_demo;
use shared_asv::error::Result;
use shared_asv::plugin::PluginRegistry;
use shared_asv::shared::{SharedAsvParams, DEFAULT_THRESHOLD};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Yaml,
    Json,
}

/// Find ASVs shared between two samples of a feature table
#[derive(Parser)]
#[command(name = "shared-asv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the shared ASVs of two samples
    Compute {
        /// Path to feature table TSV
        #[arg(short, long)]
        table: PathBuf,

        /// Path to sample metadata TSV
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// First sample ID
        #[arg(short = 'a', long)]
        sample_a: String,

        /// Second sample ID
        #[arg(short = 'b', long)]
        sample_b: String,

        /// Minimum relative frequency in both samples (0.0 - 1.0)
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Output path for the shared-ASV table TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Format of the run summary printed to stdout
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Run a computation from a YAML configuration file
    Run {
        /// Path to run configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Format of the run summary printed to stdout
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List the registered plugins and method signatures
    Describe {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write the demo feature table and metadata
    Demo {
        /// Output directory
        #[arg(short, long, default_value = "demo")]
        output_dir: PathBuf,
    },

    /// Generate an example run configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "run.yaml")]
        output: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shared_asv={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compute {
            table,
            metadata,
            sample_a,
            sample_b,
            threshold,
            output,
            format,
        } => {
            let config = RunConfig {
                table,
                metadata,
                output,
                params: SharedAsvParams::new(&sample_a, &sample_b).threshold(threshold),
            };
            cmd_run(&config, format)
        }

        Commands::Run { config, format } => {
            RunConfig::from_file(&config).and_then(|config| cmd_run(&config, format))
        }

        Commands::Describe { format } => cmd_describe(format),

        Commands::Demo { output_dir } => cmd_demo(&output_dir),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Compute shared ASVs and print a summary
fn cmd_run(config: &RunConfig, format: Format) -> Result<()> {
    let report = config.run()?;
    match format {
        Format::Text => print!("{}", report),
        Format::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Print the registered plugins
fn cmd_describe(format: Format) -> Result<()> {
    let registry = PluginRegistry::global();
    let plugins: Vec<_> = registry.plugins().iter().map(|p| p.describe()).collect();

    match format {
        Format::Yaml => print!("{}", serde_yaml::to_string(&plugins)?),
        Format::Json => println!("{}", serde_json::to_string_pretty(&plugins)?),
        Format::Text => {
            for plugin in &plugins {
                println!("{} {}", plugin.name, plugin.version);
                println!("  {}", plugin.short_description);
                println!();
                for method in &plugin.methods {
                    print!("{}", method);
                }
            }
        }
    }
    Ok(())
}

/// Write demo data
fn cmd_demo(output_dir: &Path) -> Result<()> {
    let (table, metadata) = write_demo(output_dir)?;
    eprintln!("Wrote {:?}", table);
    eprintln!("Wrote {:?}", metadata);
    Ok(())
}

/// Write an example run configuration
fn cmd_example(output: &Path) -> Result<()> {
    let yaml = RunConfig::example().to_yaml()?;
    std::fs::write(output, yaml)?;
    eprintln!("Example configuration written to {:?}", output);
    Ok(())
}
