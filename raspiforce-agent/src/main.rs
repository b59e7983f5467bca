//! Raspiforce Agent entry point
//!
//! Use `--simulation` to run without a Raspberry Pi attached: one case is
//! filed and the program exits. Use `--chat` to mirror status messages to
//! the WebSocket chat server configured under `[chat]`.

use anyhow::{Context, Result};
use clap::Parser;
use raspiforce_agent::chat::{Notifier, WsChat};
use raspiforce_agent::cli::{Cli, RunMode};
use raspiforce_agent::config::AgentConfig;
use raspiforce_agent::crm::{Credentials, SalesforceClient};
use raspiforce_agent::lifecycle::{shutdown_signal, LifecycleState};
use raspiforce_agent::sensor::W1ThermSensor;
use raspiforce_agent::Startup;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("raspiforce_agent=info")),
        )
        .init();

    let mode = RunMode::from(Cli::parse());
    for line in mode.banner() {
        info!("{}", line);
    }
    debug!("Lifecycle: {}", LifecycleState::Idle);

    let config = AgentConfig::load()
        .await
        .context("Failed to load configuration")?;

    // Ecouter les signaux avant d'ouvrir quoi que ce soit
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let (sensor, chat) = tokio::select! {
        opened = open_devices(&config, mode) => opened?,
        _ = &mut shutdown => {
            info!("Exit.");
            return Ok(());
        }
    };
    let mut startup = Startup::new(Notifier::new(chat), sensor);

    let salesforce = &config.salesforce;
    let setup_credentials = Credentials {
        username: salesforce.username.clone(),
        password: salesforce.password.clone().unwrap_or_default(),
        security_token: salesforce.security_token.clone(),
    };
    let hostname = config.host.resolve();

    let started = startup
        .bootstrap_until(
            &hostname,
            || SalesforceClient::login(salesforce, &setup_credentials),
            move |credentials: Credentials| async move {
                SalesforceClient::login(salesforce, &credentials).await
            },
            &mut shutdown,
        )
        .await
        .context("Session bootstrap failed")?;
    let Some((demo_org, session)) = started else {
        return Ok(());
    };

    let mut agent = startup.into_agent(demo_org, session, config.timing.clone(), mode);

    agent
        .run_until(&mut shutdown)
        .await
        .context("Agent execution failed")?;

    Ok(())
}

/// Locate the sensor (unless simulating) and connect the chat channel (if enabled)
async fn open_devices(
    config: &AgentConfig,
    mode: RunMode,
) -> Result<(Option<W1ThermSensor>, Option<WsChat>)> {
    let sensor = if mode.simulation {
        None
    } else {
        Some(
            W1ThermSensor::discover(&config.sensor)
                .await
                .context("Failed to locate temperature sensor")?,
        )
    };

    let chat = if mode.chat {
        let url = config.chat_url()?;
        Some(
            WsChat::connect(url)
                .await
                .with_context(|| format!("Failed to connect to chat at {url}"))?,
        )
    } else {
        None
    };

    Ok((sensor, chat))
}
