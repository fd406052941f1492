//! kubemix CLI - Assemble Kubernetes manifests from composable building blocks

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod error;
mod exit_codes;
mod plan;

#[derive(Parser)]
#[command(name = "kubemix")]
#[command(author = "kubemix Contributors")]
#[command(version)]
#[command(about = "Assemble Kubernetes manifests from composable building blocks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the resources of a plan file
    Render {
        /// Plan file
        plan: PathBuf,

        /// Output directory (if not set, outputs a YAML stream to stdout)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override plan values (key=value)
        #[arg(long = "set")]
        set: Vec<String>,
    },

    /// Print a YAML map as command line flags
    Flags {
        /// YAML file holding a flat map
        file: PathBuf,

        /// Flag prefix (default "-")
        #[arg(long, allow_hyphen_values = true)]
        prefix: Option<String>,
    },

    /// Print the content hash of a resource
    Hash {
        /// YAML file holding the resource
        file: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("kubemix=debug,kubemix_engine=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Render {
            plan,
            output_dir,
            set,
        } => commands::render::run(&plan, output_dir.as_deref(), &set),

        Commands::Flags { file, prefix } => commands::flags::run(&file, prefix.as_deref()),

        Commands::Hash { file } => commands::hash::run(&file),
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
