//! Thicket CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "thicket")]
#[command(about = "Hierarchical graph store with collapsible clusters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Store configuration file (TOML); missing means defaults
    #[arg(short, long, default_value = "thicket.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a sample clustered graph and save it as a snapshot
    Demo {
        /// Snapshot file to write (.json or .bin)
        output: PathBuf,
    },
    /// Print counts and shape of a snapshot
    Inspect { file: PathBuf },
    /// Print the hierarchy of a snapshot with pre-order coordinates
    Outline { file: PathBuf },
    /// Validate every structural invariant of a snapshot
    Check { file: PathBuf },
    /// Render a snapshot as Graphviz DOT
    Export {
        file: PathBuf,

        /// Export the collapsed view instead of the full graph
        #[arg(long)]
        collapsed: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("thicket={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = thicket_core::StoreConfig::load(&cli.config)?;
    tracing::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Demo { output } => commands::demo(&output, config),
        Commands::Inspect { file } => commands::inspect(&file, config),
        Commands::Outline { file } => commands::outline(&file, config),
        Commands::Check { file } => commands::check(&file, config),
        Commands::Export {
            file,
            collapsed,
            output,
        } => commands::export(&file, config, collapsed, output.as_deref()),
        Commands::Version => {
            println!("Thicket v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
