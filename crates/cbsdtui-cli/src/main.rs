//! cbsd-tui - console for cbsd jails, bhyve and QEMU VMs

mod commands;

use cbsdtui_config::GlobalConfig;
use cbsdtui_core::{ContainerKind, Host};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cbsd-tui")]
#[command(author, version, about = "Console for cbsd jails and virtual machines", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Container kind: jail, bhyve or qemu (defaults to ui.default_kind)
    #[arg(short, long, global = true)]
    kind: Option<ContainerKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List containers of one kind
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Poll whether a container is running (1), stopped (0) or unknown (-1)
    Status {
        /// Container name
        name: String,
    },

    /// List the snapshots of a container
    Snapshots {
        /// Container name
        name: String,
    },

    /// Show every database parameter of a container
    View {
        /// Container name
        name: String,
    },

    /// Start a stopped container
    Start {
        /// Container name
        name: String,
    },

    /// Stop a running container
    Stop {
        /// Container name
        name: String,
    },

    /// Show the global configuration
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = GlobalConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        GlobalConfig::default()
    });

    let Some(command) = cli.command else {
        // The TUI routes logs itself; a stderr subscriber would draw over it
        let mut config = config;
        if let Some(kind) = cli.kind {
            config.ui.default_kind = kind.emulator().to_string();
        }
        let host = Host::from_config(&config)?;
        cbsdtui_tui::run(host, &config).await?;
        return Ok(());
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Commands::Config = command {
        return commands::config();
    }

    let kind = match cli.kind {
        Some(kind) => kind,
        None => config.ui.default_kind.parse()?,
    };
    let host = Host::from_config(&config)?;

    match command {
        Commands::List { json } => commands::list(&host, kind, json).await?,
        Commands::Status { name } => commands::status(&host, kind, &name).await?,
        Commands::Snapshots { name } => commands::snapshots(&host, kind, &name).await?,
        Commands::View { name } => commands::view(&host, kind, &name).await?,
        Commands::Start { name } => commands::start_stop(host, kind, &name, true).await?,
        Commands::Stop { name } => commands::start_stop(host, kind, &name, false).await?,
        Commands::Config => unreachable!(), // Handled above
    }

    Ok(())
}
