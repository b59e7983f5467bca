//! Alarm loop and case filer
//!
//! Normal mode cycles forever: sample every `sample_interval` until a
//! reading is strictly above the threshold, file one case, sleep for
//! `cooldown`, start sampling again. Simulation mode files one case and
//! returns without touching a sensor.

use crate::chat::{ChatSink, Notifier};
use crate::cli::RunMode;
use crate::config::TimingConfig;
use crate::crm::CrmBackend;
use crate::error::{AgentError, Result};
use crate::lifecycle::LifecycleState;
use crate::sensor::TemperatureSource;
use crate::session::{resolve_asset, Asset, AssetOrigin, SessionParams};
use std::future::Future;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{info, warn};

/// Render a reading with at least one fractional digit (`20.0`, `26.1`)
pub fn format_celsius(reading: f64) -> String {
    format!("{reading:?}")
}

/// Look up the demo configuration and announce the connection on chat
pub async fn bootstrap_session<C: CrmBackend, N: ChatSink>(
    crm: &C,
    hostname: &str,
    notifier: &mut Notifier<N>,
) -> Result<SessionParams> {
    let session = SessionParams::bootstrap(crm, hostname).await?;
    notifier.send("Setup", "Connection established.").await?;
    Ok(session)
}

pub struct Agent<C, N, S> {
    crm: C,
    notifier: Notifier<N>,
    sensor: Option<S>,
    session: SessionParams,
    asset: OnceCell<Asset>,
    timing: TimingConfig,
    mode: RunMode,
    state: LifecycleState,
    cases_filed: u64,
}

impl<C, N, S> Agent<C, N, S>
where
    C: CrmBackend,
    N: ChatSink,
    S: TemperatureSource,
{
    pub fn new(
        crm: C,
        session: SessionParams,
        notifier: Notifier<N>,
        sensor: Option<S>,
        timing: TimingConfig,
        mode: RunMode,
    ) -> Self {
        Self {
            crm,
            notifier,
            sensor,
            session,
            asset: OnceCell::new(),
            timing,
            mode,
            state: LifecycleState::Bootstrapped,
            cases_filed: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn session(&self) -> &SessionParams {
        &self.session
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.get()
    }

    pub fn cases_filed(&self) -> u64 {
        self.cases_filed
    }

    /// Resolve the asset once; later calls return the cached value
    pub async fn resolve_asset(&mut self) -> Result<Asset> {
        if let Some(asset) = self.asset.get() {
            return Ok(asset.clone());
        }

        let asset = self
            .asset
            .get_or_try_init(|| resolve_asset(&self.crm, &self.session))
            .await?
            .clone();

        let text = match asset.origin {
            AssetOrigin::Created => "Asset created.",
            AssetOrigin::Found => "Asset found.",
        };
        self.notifier.send(&asset.name, text).await?;
        Ok(asset)
    }

    /// Sample until a reading exceeds the threshold and return that reading
    pub async fn sample_until_alarm(&mut self) -> Result<f64> {
        let handle = self.resolve_asset().await?.name;
        let threshold = self.session.alarm_threshold;

        loop {
            let sensor = self.sensor.as_mut().ok_or(AgentError::SensorMissing)?;
            let reading = sensor.read_celsius().await?;
            let rendered = format_celsius(reading);
            info!("{}", rendered);
            self.notifier
                .send(&handle, &format!("Temperature Celsius: {rendered}"))
                .await?;

            let alarm = reading > threshold;
            if alarm {
                warn!("Temperature Alarm!");
                self.notifier.send(&handle, "Temperature Alarm!").await?;
            }

            sleep(self.timing.sample_interval()).await;

            if alarm {
                return Ok(reading);
            }
        }
    }

    /// Create one case for the resolved asset
    pub async fn file_case(&mut self) -> Result<String> {
        let asset = self.resolve_asset().await?;
        let case_id = self.crm.insert(&self.session.new_case(&asset)).await?;
        self.cases_filed += 1;
        info!("Case {} created for asset {}", case_id, asset.name);
        Ok(case_id)
    }

    /// One alarm → case → cooldown cycle
    pub async fn run_cycle(&mut self) -> Result<String> {
        self.sample_until_alarm().await?;

        let case_id = self.file_case().await?;
        let handle = self.resolve_asset().await?.name;
        self.notifier.send(&handle, "Case created.").await?;

        let cooldown = self.timing.cooldown();
        let message = format!("Sleep for {} seconds...", cooldown.as_secs());
        info!("{}", message);
        self.notifier.send(&handle, &message).await?;
        sleep(cooldown).await;

        Ok(case_id)
    }

    /// File a single case without reading the sensor
    pub async fn simulate(&mut self) -> Result<String> {
        self.state = LifecycleState::SimulatedRun;

        let case_id = self.file_case().await?;
        let handle = self.resolve_asset().await?.name;
        self.notifier.send(&handle, "Case simulated.").await?;
        Ok(case_id)
    }

    /// Run until a fatal error; returns only in simulation mode
    pub async fn run(&mut self) -> Result<()> {
        self.resolve_asset().await?;

        if self.mode.simulation {
            self.simulate().await?;
            return Ok(());
        }

        if self.sensor.is_none() {
            return Err(AgentError::SensorMissing);
        }

        self.state = LifecycleState::Running;
        loop {
            self.run_cycle().await?;
        }
    }

    /// Run until completion, failure, or `shutdown` resolves; always cleans up
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            result = self.run() => result,
            _ = shutdown => Ok(()),
        };

        self.shutdown().await;
        outcome
    }

    /// Release the sensor and close chat; idempotent
    pub async fn shutdown(&mut self) {
        if self.state == LifecycleState::Terminated {
            return;
        }

        if let Some(sensor) = self.sensor.as_mut() {
            sensor.release();
        }
        if let Err(e) = self.notifier.close().await {
            warn!("Failed to close chat channel: {}", e);
        }

        self.state = LifecycleState::Terminated;
        info!("Exit.");
    }
}
