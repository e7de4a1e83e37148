use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use fileman_core::config::SessionConfig;
use fileman_core::session::Session;
use fileman_core::{platform, FileManager};
use fileman_platform::{PermissionOutcome, PermissionSpec};

#[derive(Parser, Debug)]
#[command(name = "fileman")]
#[command(about = "Interactive file manager with platform-aware ownership")]
#[command(version)]
struct Cli {
    /// Working directory to start in (default: current directory)
    #[arg(long, env = "FILEMAN_START_DIR", global = true)]
    start_dir: Option<PathBuf>,

    /// Path to config file
    #[arg(long, env = "FILEMAN_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "FILEMAN_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the working directory with owners
    Ls {
        /// Print entries as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the owner of a file
    Owner {
        name: String,
    },
    /// Set a file's permissions from an octal mode (e.g. 644)
    Chmod {
        name: String,
        mode: PermissionSpec,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with menu output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    info!(
        "fileman v{} starting (os={}, arch={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(SessionConfig::default_path);
    let config = SessionConfig::load_or_default(&config_path)?.with_start_dir(cli.start_dir);

    let identity = platform::probe()?;
    let manager = match &config.start_dir {
        Some(dir) => FileManager::new(dir, identity),
        None => FileManager::from_process(identity),
    }
    .context("failed to open start directory")?;

    match cli.command {
        Some(Commands::Ls { json }) => list_once(&manager, json),
        Some(Commands::Owner { name }) => {
            let owner = manager.owner_of(&name)?;
            println!("{}", owner);
            Ok(())
        }
        Some(Commands::Chmod { name, mode }) => chmod_once(&manager, &name, mode),
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut session = Session::new(manager, config, stdin.lock(), stdout.lock());
            session.run().context("terminal I/O failed")
        }
    }
}

fn list_once(manager: &FileManager, json: bool) -> Result<()> {
    let entries = manager.list_directory()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        println!("{}{}\tOwner: {}", entry.name, suffix, entry.owner);
    }
    Ok(())
}

fn chmod_once(manager: &FileManager, name: &str, mode: PermissionSpec) -> Result<()> {
    match manager.set_permissions(name, mode) {
        Ok(PermissionOutcome::Applied(spec)) => {
            println!("Permissions {} set for '{}'.", spec, name);
            Ok(())
        }
        Ok(PermissionOutcome::OwnerReported(owner)) => {
            println!("Owner: {}", owner);
            eprintln!("note: numeric permissions are not applied on this platform");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("chmod {} failed", name))),
    }
}
