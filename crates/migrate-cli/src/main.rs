mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, run::RunArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "migrate",
    about = "Rewrite a JavaScript/TypeScript project from one test framework to another",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .migrate.yaml or .git/)
    #[arg(long, global = true, env = "MIGRATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate every eligible file under the root
    Run(RunArgs),

    /// Report leftover trigger tokens without changing anything
    Verify {
        /// Exit non-zero when any residual is found
        #[arg(long)]
        strict: bool,
    },

    /// List the files a run would visit
    Files,

    /// List the active rule set in application order
    Rules,

    /// Create, show, or validate .migrate.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(&root, args, cli.json),
        Commands::Verify { strict } => cmd::verify::run(&root, strict, cli.json),
        Commands::Files => cmd::files::run(&root, cli.json),
        Commands::Rules => cmd::rules::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
