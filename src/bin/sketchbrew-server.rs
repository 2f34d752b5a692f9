//! sketchbrew server - Arduino Web IDE backend
//!
//! Binary entry point for the server application.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sketchbrew::config::ServerConfig;
use sketchbrew::serial::list_ports;
use sketchbrew::server::start_server;
use sketchbrew::services::ArduinoCli;
use sketchbrew::utils::logging::{init_server_logging, level_from_flags};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sketchbrew-server")]
#[command(about = "Arduino Web IDE server", version)]
struct ServerCli {
    /// Server configuration file
    #[arg(short, long, default_value = "sketchbrew-server.toml")]
    config: PathBuf,

    /// Bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding sketches/, templates/, uploads/ and static/
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Toolchain executable (defaults to arduino-cli)
    #[arg(long)]
    toolchain: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit one JSON object per log line
    #[arg(long, global = true)]
    json_logs: bool,

    /// Write JSON logs to this file instead of stdout
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Option<ServerCommands>,
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Start the server
    Start,
    /// Generate default configuration
    Config,
    /// List serial ports and exit
    Ports,
    /// Check that the toolchain can be launched
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServerCli::parse();

    let structured = cli.json_logs || cli.log_file.is_some();
    init_server_logging(
        structured,
        cli.log_file.as_deref(),
        Some(level_from_flags(cli.verbose, cli.quiet)),
    )?;

    match cli.command {
        Some(ServerCommands::Start) | None => {
            let config = load_config(&cli)?;
            println!("Starting sketchbrew server on http://{}:{}", config.bind_address, config.port);
            start_server(config).await
        }
        Some(ServerCommands::Config) => generate_config(&cli.config),
        Some(ServerCommands::Ports) => print_ports(),
        Some(ServerCommands::Check) => check_toolchain(&load_config(&cli)?).await,
    }
}

/// Config file values, then command-line overrides
///
/// The per-user config file is used when the given path does not exist.
fn load_config(cli: &ServerCli) -> Result<ServerConfig> {
    let user_config = ServerConfig::user_config_path();
    let config_path = if !cli.config.exists() && user_config.exists() {
        user_config.as_path()
    } else {
        cli.config.as_path()
    };
    let mut config = ServerConfig::load_or_default(config_path)?;

    if let Some(bind) = &cli.bind {
        config.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(toolchain) = &cli.toolchain {
        config.toolchain_program = toolchain.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Generate a default server configuration file
fn generate_config(config_path: &Path) -> Result<()> {
    ServerConfig::default().save(config_path)?;

    println!(
        "Generated default configuration file: {}",
        config_path.display()
    );
    println!(
        "Use --config {} to load this configuration.",
        config_path.display()
    );
    Ok(())
}

fn print_ports() -> Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for port in ports {
        println!("{:<24} {:<32} {}", port.device, port.description, port.hwid);
    }
    Ok(())
}

async fn check_toolchain(config: &ServerConfig) -> Result<()> {
    let toolchain = ArduinoCli::new(config.toolchain_program.clone(), 1);
    let status = toolchain.status().await;

    if status.available {
        println!(
            "{} is available: {}",
            status.program,
            status.version.as_deref().unwrap_or("unknown version")
        );
        if let Some(path) = status.resolved_path {
            println!("Resolved to {}", path);
        }
        Ok(())
    } else {
        anyhow::bail!(
            "{} could not be run; full functionality requires arduino-cli",
            status.program
        )
    }
}
