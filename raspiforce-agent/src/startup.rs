//! Startup phase: from the opened chat channel to a ready agent
//!
//! The chat channel and the sensor are opened before the CRM logins. If a
//! login or the demo lookup fails, or a shutdown signal arrives first, both
//! are released before returning.

use crate::agent::{bootstrap_session, Agent};
use crate::chat::{ChatSink, Notifier};
use crate::cli::RunMode;
use crate::config::TimingConfig;
use crate::crm::{CrmBackend, Credentials};
use crate::error::{AgentError, CrmError, Result};
use crate::sensor::TemperatureSource;
use crate::session::SessionParams;
use std::future::Future;
use tracing::{info, warn};

pub struct Startup<N, S> {
    notifier: Notifier<N>,
    sensor: Option<S>,
}

impl<N, S> Startup<N, S>
where
    N: ChatSink,
    S: TemperatureSource,
{
    pub fn new(notifier: Notifier<N>, sensor: Option<S>) -> Self {
        Self { notifier, sensor }
    }

    /// Log in to the setup org, load the demo, log in to the demo org.
    ///
    /// Returns `Ok(None)` when `shutdown` resolves first.
    pub async fn bootstrap_until<Setup, Demo, LS, FS, LD, FD, F>(
        &mut self,
        hostname: &str,
        login_setup: LS,
        login_demo: LD,
        shutdown: F,
    ) -> Result<Option<(Demo, SessionParams)>>
    where
        Setup: CrmBackend,
        LS: FnOnce() -> FS,
        FS: Future<Output = Result<Setup, CrmError>>,
        LD: FnOnce(Credentials) -> FD,
        FD: Future<Output = Result<Demo, CrmError>>,
        F: Future<Output = ()>,
    {
        let notifier = &mut self.notifier;
        let steps = async move {
            let setup = login_setup().await?;
            let session = bootstrap_session(&setup, hostname, notifier).await?;
            info!(
                "Demo {} loaded, alarm threshold {} °C",
                session.demo_id, session.alarm_threshold
            );
            let demo = login_demo(session.demo_credentials.clone()).await?;
            Ok::<_, AgentError>((demo, session))
        };

        let outcome = tokio::select! {
            result = steps => result.map(Some),
            _ = shutdown => Ok(None),
        };

        if !matches!(outcome, Ok(Some(_))) {
            self.abort().await;
        }
        outcome
    }

    /// Hand the opened channel and sensor over to the agent
    pub fn into_agent<C: CrmBackend>(
        self,
        crm: C,
        session: SessionParams,
        timing: TimingConfig,
        mode: RunMode,
    ) -> Agent<C, N, S> {
        Agent::new(crm, session, self.notifier, self.sensor, timing, mode)
    }

    async fn abort(&mut self) {
        if let Some(sensor) = self.sensor.as_mut() {
            sensor.release();
        }
        if let Err(e) = self.notifier.close().await {
            warn!("Failed to close chat channel: {}", e);
        }
        info!("Exit.");
    }
}
