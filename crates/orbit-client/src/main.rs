//! orbit - Orbit B-hyve command-line client
//!
//! Lists devices and streams live irrigation events as JSON lines.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use orbit_client::output::{write_devices, write_event};
use orbit_client::{Client, ClientConfig, ClientConfigUpdate, StreamEvent};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "orbit")]
#[command(about = "Orbit B-hyve irrigation client")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Account email
    #[arg(long, env = "ORBIT_EMAIL", global = true)]
    email: Option<String>,

    /// Account password
    #[arg(long, env = "ORBIT_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices on the account
    Devices,

    /// Stream live events as JSON lines until interrupted
    Watch,

    /// Write a config file with default settings
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "orbit.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let level = if cli.verbose || config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(format!("orbit={level}").parse()?))
        .init();

    match cli.command {
        Commands::Devices => devices(config).await?,
        Commands::Watch => watch(config).await?,
        Commands::InitConfig { output } => init_config(&output)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let base = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    Ok(base.updated(ClientConfigUpdate {
        email: cli.email.clone(),
        password: cli.password.clone(),
        ..ClientConfigUpdate::default()
    }))
}

async fn devices(config: ClientConfig) -> anyhow::Result<()> {
    let mut client = Client::new(config)?;
    client.authenticate().await.context("login failed")?;
    let devices = client.devices().await?;

    write_devices(&mut io::stdout().lock(), &devices)?;
    Ok(())
}

async fn watch(config: ClientConfig) -> anyhow::Result<()> {
    let mut client = Client::new(config)?;
    client.authenticate().await.context("login failed")?;
    if let Err(e) = client.devices().await {
        warn!(error = %e, "could not list devices");
    }

    let stream = client.connect_stream()?;
    let mut events = stream.subscribe();

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("interrupted, closing stream");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                write_event(&mut io::stdout().lock(), &event)?;
                if event == StreamEvent::MaxReconnectAttemptsReached {
                    stream.shutdown();
                    anyhow::bail!("event stream gave up reconnecting");
                }
            }
        }
    }

    stream.shutdown();
    Ok(())
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("refusing to overwrite {}", output.display());
    }
    let json = ClientConfig::default().to_json()?;
    std::fs::write(output, json + "\n")
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote default config to {}", output.display());
    Ok(())
}
