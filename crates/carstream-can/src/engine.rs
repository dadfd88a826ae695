//! Acquisition engine
//!
//! Owns at most one acquisition run at a time. A run either reads a real
//! bus through a [`BusConnector`] or drives the [`Simulator`]. Every run is
//! tagged with a generation number: starting a new run stops the previous
//! one first, and status writes from a stale generation are discarded.
//!
//! ```text
//! Idle ──start──► Starting ──► Running ──stop──► Stopping ──► Idle
//!                    ▲            │
//!                    └───start────┘   (previous run is stopped first)
//! ```

use std::sync::Arc;
use std::time::Duration;

use carstream_core::{AcquisitionStatus, Reading, VehicleProfile};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bus::{BusConnector, BusError, CanBus};
use crate::pipeline::FramePipeline;
use crate::signal::{StopListener, StopSignal};
use crate::sim::Simulator;
use crate::sink::ReadingSink;
use crate::speed::{SpeedEstimator, SpeedFilterConfig};

/// Poll interval while the bus has nothing to read
const IDLE_POLL: Duration = Duration::from_millis(1);
/// Back-off after a bus read error
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How a run selects its data source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    /// Try the bus, fall back to simulation if it cannot be opened
    #[default]
    Auto,
    /// Never touch the bus
    Simulation,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bus interface name (e.g. `can0`)
    pub interface: String,
    pub mode: AcquisitionMode,
    /// Reading queue capacity; readings beyond it are dropped
    pub queue_capacity: usize,
    /// How long a stop waits for the old run before aborting it
    pub stop_grace: Duration,
    pub speed: SpeedFilterConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            interface: "can0".to_string(),
            mode: AcquisitionMode::Auto,
            queue_capacity: 400,
            stop_grace: Duration::from_millis(200),
            speed: SpeedFilterConfig::default(),
        }
    }
}

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Status shared with runs, keyed by generation
#[derive(Debug, Default)]
struct StatusCell {
    inner: RwLock<(u64, AcquisitionStatus)>,
}

impl StatusCell {
    fn get(&self) -> AcquisitionStatus {
        self.inner.read().1.clone()
    }

    /// Make `generation` the only one allowed to write
    fn advance(&self, generation: u64) {
        self.inner.write().0 = generation;
    }

    /// Write a status; ignored unless `generation` is current
    fn set(&self, generation: u64, status: AcquisitionStatus) -> bool {
        let mut guard = self.inner.write();
        if guard.0 != generation {
            return false;
        }
        guard.1 = status;
        true
    }
}

struct ActiveRun {
    signal: StopSignal,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Lifecycle {
    generation: u64,
    active: Option<ActiveRun>,
}

/// Start/stop front end over acquisition runs
pub struct AcquisitionEngine {
    settings: EngineSettings,
    connector: Arc<dyn BusConnector>,
    sink: ReadingSink,
    status: Arc<StatusCell>,
    state: RwLock<EngineState>,
    lifecycle: Mutex<Lifecycle>,
}

impl AcquisitionEngine {
    /// Create an idle engine and the receiving end of its reading queue
    pub fn new(
        settings: EngineSettings,
        connector: Arc<dyn BusConnector>,
    ) -> (Self, mpsc::Receiver<Reading>) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let engine = Self {
            settings,
            connector,
            sink: ReadingSink::new(tx),
            status: Arc::new(StatusCell::default()),
            state: RwLock::new(EngineState::Idle),
            lifecycle: Mutex::new(Lifecycle::default()),
        };
        (engine, rx)
    }

    /// Latest status; never waits on a run
    pub fn status(&self) -> AcquisitionStatus {
        self.status.get()
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Readings dropped because the queue was full
    pub fn dropped_readings(&self) -> u64 {
        self.sink.dropped()
    }

    /// Start a run for `profile`, stopping any current run first.
    ///
    /// Returns the generation of the new run.
    pub async fn start(&self, profile: Arc<VehicleProfile>) -> u64 {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(previous) = lifecycle.active.take() {
            *self.state.write() = EngineState::Stopping;
            self.shutdown_run(previous).await;
        }

        *self.state.write() = EngineState::Starting;
        lifecycle.generation += 1;
        let generation = lifecycle.generation;
        self.status.advance(generation);

        let (signal, listener) = StopSignal::new(generation);
        let run = RunContext {
            generation,
            profile: profile.clone(),
            interface: self.settings.interface.clone(),
            mode: self.settings.mode,
            speed: self.settings.speed.clone(),
            connector: self.connector.clone(),
            sink: self.sink.clone(),
            status: self.status.clone(),
        };
        let handle = tokio::spawn(run.run(listener));
        lifecycle.active = Some(ActiveRun { signal, handle });

        *self.state.write() = EngineState::Running;
        tracing::info!(
            generation,
            profile = profile.display_name(),
            mode = ?self.settings.mode,
            "Acquisition started"
        );
        generation
    }

    /// Stop the active run, if any. Idempotent.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        self.stop_locked(&mut lifecycle).await;
    }

    /// Stop the active run only if it belongs to `generation`.
    ///
    /// Returns true if a run was stopped. Lets a finished session release
    /// the engine without tearing down a run started by a newer session.
    pub async fn stop_generation(&self, generation: u64) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;
        match &lifecycle.active {
            Some(run) if run.signal.generation() == generation => {
                self.stop_locked(&mut lifecycle).await;
                true
            }
            _ => false,
        }
    }

    async fn stop_locked(&self, lifecycle: &mut Lifecycle) {
        let Some(run) = lifecycle.active.take() else {
            return;
        };
        let generation = run.signal.generation();

        *self.state.write() = EngineState::Stopping;
        self.shutdown_run(run).await;
        self.status.set(generation, AcquisitionStatus::stopped());
        *self.state.write() = EngineState::Idle;

        tracing::info!(generation, "Acquisition stopped");
    }

    async fn shutdown_run(&self, run: ActiveRun) {
        let ActiveRun { signal, mut handle } = run;
        signal.trigger();

        match tokio::time::timeout(self.settings.stop_grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(generation = signal.generation(), error = %e, "Acquisition run ended abnormally");
            }
            Err(_) => {
                tracing::warn!(
                    generation = signal.generation(),
                    grace_ms = self.settings.stop_grace.as_millis() as u64,
                    "Acquisition run did not stop in time, aborting"
                );
                handle.abort();
            }
        }
    }
}

/// Everything one run needs, moved into its task
struct RunContext {
    generation: u64,
    profile: Arc<VehicleProfile>,
    interface: String,
    mode: AcquisitionMode,
    speed: SpeedFilterConfig,
    connector: Arc<dyn BusConnector>,
    sink: ReadingSink,
    status: Arc<StatusCell>,
}

impl RunContext {
    async fn run(self, stop: StopListener) {
        if self.mode == AcquisitionMode::Auto {
            tracing::info!(
                interface = %self.interface,
                profile = self.profile.display_name(),
                "Opening CAN bus"
            );

            let connector = self.connector.clone();
            let interface = self.interface.clone();
            let opened = tokio::task::spawn_blocking(move || connector.open(&interface)).await;

            match opened {
                Ok(Ok(bus)) => return self.run_bus(bus, stop).await,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "CAN bus unavailable, falling back to simulation");
                    self.status
                        .set(self.generation, AcquisitionStatus::unavailable(&e));
                }
                Err(e) => {
                    tracing::error!(error = %e, "CAN bus open task failed");
                    self.status
                        .set(self.generation, AcquisitionStatus::unavailable(&e));
                }
            }
        }

        self.run_simulation(stop).await;
    }

    async fn run_bus(self, mut bus: Box<dyn CanBus>, stop: StopListener) {
        let generation = self.generation;
        let status = self.status.clone();
        status.set(generation, AcquisitionStatus::healthy());

        let mut pipeline = FramePipeline::new(
            self.profile.clone(),
            SpeedEstimator::new(self.speed.clone()),
            self.sink.clone(),
        );

        let loop_status = status.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut faulted = false;

            while !stop.is_stopped() {
                match bus.read_frame() {
                    Ok(Some(frame)) => {
                        if faulted {
                            faulted = false;
                            loop_status.set(generation, AcquisitionStatus::healthy());
                        }
                        pipeline.handle_frame(&frame, Instant::now());
                    }
                    Ok(None) => std::thread::sleep(IDLE_POLL),
                    Err(BusError::Closed) => {
                        tracing::warn!(generation, "CAN bus closed");
                        loop_status.set(
                            generation,
                            AcquisitionStatus::unhealthy(BusError::Closed.to_string()),
                        );
                        // Hold the run until stopped so the status stays visible
                        while !stop.is_stopped() {
                            std::thread::sleep(IDLE_POLL * 10);
                        }
                    }
                    Err(e) => {
                        tracing::error!(generation, error = %e, "CAN bus read error");
                        faulted = true;
                        loop_status.set(generation, AcquisitionStatus::unhealthy(e.to_string()));
                        std::thread::sleep(ERROR_BACKOFF);
                    }
                }
            }

            drop(bus);
            tracing::debug!(generation, "CAN bus released");
        })
        .await;

        if let Err(e) = result {
            tracing::error!(generation, error = %e, "CAN bus loop failed");
        }
        status.set(generation, AcquisitionStatus::disconnected());
    }

    async fn run_simulation(self, mut stop: StopListener) {
        let params = self.profile.sim().resolve();
        let period = params.period;
        self.status
            .set(self.generation, AcquisitionStatus::simulated());
        tracing::info!(
            generation = self.generation,
            period_ms = period.as_millis() as u64,
            "Simulation on"
        );

        let mut simulator = Simulator::new(params);
        let started = Instant::now();
        let mut ticker = tokio::time::interval_at(started + period, period);

        loop {
            tokio::select! {
                biased;
                _ = stop.stopped() => break,
                _ = ticker.tick() => {
                    let t = started.elapsed().as_secs_f64();
                    for reading in simulator.step(t).readings() {
                        self.sink.send(reading);
                    }
                }
            }
        }

        tracing::info!(generation = self.generation, "Simulation off");
    }
}
