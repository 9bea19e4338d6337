//! Kubeseed CLI - starts the bundled cluster add-ons against a Kubernetes API server

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod log;

use log::LogArgs;

#[derive(Parser)]
#[command(name = "kubeseed")]
#[command(version)]
#[command(about = "Render and apply the bundled cluster add-ons", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Install components against the cluster (all by default)
    Start {
        /// Node configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Kubeconfig of the target cluster
        #[arg(long, env = "KUBECONFIG")]
        kubeconfig: PathBuf,

        /// Component to install; repeat to select several
        #[arg(long = "component")]
        components: Vec<String>,

        /// Upper bound in seconds for each component install
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Render a component's manifests in apply order
    Render {
        /// Node configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Component to render
        #[arg(long)]
        component: String,
    },

    /// List bundled components and their steps
    Components,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if let Err(err) = cli.log.try_init() {
        eprintln!("kubeseed: {err}");
        std::process::exit(exit_codes::USAGE_ERROR);
    }

    let result = match cli.command {
        Commands::Start {
            config,
            kubeconfig,
            components,
            timeout,
        } => commands::start::run(&config, &kubeconfig, &components, timeout).await,

        Commands::Render { config, component } => {
            commands::render::run(config.as_deref(), &component, &mut std::io::stdout().lock())
        }

        Commands::Components => commands::components::run(&mut std::io::stdout().lock()),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }

    Ok(())
}
