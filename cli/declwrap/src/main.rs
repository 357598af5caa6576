//! declwrap CLI: generate Rust wrappers from native declaration files.

mod commands;
mod manifest;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use manifest::DeclwrapManifest;

#[derive(Parser)]
#[command(name = "declwrap", version, about = "Wrapper generator for native declaration files")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); DECLWRAP_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a template declwrap.toml
    Init {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Generate wrappers for every declaration source
    Generate {
        /// Declaration sources, in pass order (default: [generate] sources)
        sources: Vec<PathBuf>,
        /// Output file (default: [generate] output, or stdout without a manifest)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Fail on unrecognized declaration lines
        #[arg(long)]
        strict: bool,
        /// Rust path of the raw native module (default: [native] module)
        #[arg(long)]
        module: Option<String>,
    },
    /// Print the records parsed from one declaration source
    Parse {
        /// Declaration source
        source: PathBuf,
        /// Output format (dialect, json)
        #[arg(long)]
        format: Option<String>,
        /// Fail on unrecognized declaration lines
        #[arg(long)]
        strict: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("DECLWRAP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { dir, name } => {
            let dir = dir.unwrap_or_else(|| cwd.clone());
            commands::init::run(&dir, name.as_deref())
        }

        Commands::Generate {
            sources,
            output,
            strict,
            module,
        } => {
            let (manifest, project_dir) = match DeclwrapManifest::find_and_load(&cwd)? {
                Some((manifest, dir)) => (Some(manifest), dir),
                None => (None, cwd),
            };
            let args = commands::generate::GenerateArgs {
                sources,
                output,
                strict,
                module,
            };
            commands::generate::run(&project_dir, manifest.as_ref(), args)
        }

        Commands::Parse {
            source,
            format,
            strict,
        } => commands::parse::run(&source, format.as_deref(), strict),
    }
}
