//! [`SimulationDriver`] – the frame loop that owns a simulation.
//!
//! The driver is the single writer of its [`SimulationContext`]. Each turn
//! of its `select!` loop either advances the engine by one frame or serves
//! one agent request; the two never interleave, so every tick sees a
//! consistent queue and every request sees a settled tick.
//!
//! After every mutation the driver drains the engine's completions, resolves
//! matching agent awaits through [`PendingCompletions`] and rebroadcasts them
//! on the [`SimBus`]. A fresh [`ArmSnapshot`][armsim_engine::ArmSnapshot] is
//! published after every frame.
//!
//! The loop ends when every [`ArmClient`] has been dropped.

use std::time::Duration;

use armsim_engine::SimulationContext;
use armsim_types::{ArmError, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bus::SimBus;
use crate::client::ArmClient;
use crate::clock::{DEFAULT_MAX_DT, FrameClock};
use crate::correlation::{CompletionSlot, PendingCompletions};

/// Tunables for [`SimulationDriver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Frames per second.
    pub frame_rate_hz: f64,
    /// Cap on one frame's `dt`, seconds.
    pub max_frame_dt: f64,
    /// Buffered completions per bus subscriber.
    pub bus_capacity: usize,
    /// Buffered agent requests.
    pub request_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60.0,
            max_frame_dt: DEFAULT_MAX_DT,
            bus_capacity: 256,
            request_capacity: 64,
        }
    }
}

impl DriverConfig {
    /// Interval between frames. Rates that are not positive and finite fall
    /// back to 60 Hz.
    pub fn frame_interval(&self) -> Duration {
        let hz = if self.frame_rate_hz.is_finite() && self.frame_rate_hz > 0.0 {
            self.frame_rate_hz
        } else {
            60.0
        };
        Duration::from_secs_f64(1.0 / hz)
    }
}

/// Requests an [`ArmClient`] sends to its driver.
#[derive(Debug)]
pub(crate) enum Request {
    Submit { cmd: Command, slot: CompletionSlot },
    SetSpeed(f64),
    ResetPath,
    Stop { ack: oneshot::Sender<usize> },
    HardReset { ack: oneshot::Sender<usize> },
}

pub struct SimulationDriver {
    ctx: SimulationContext,
    pending: PendingCompletions,
    bus: SimBus,
    clock: FrameClock,
    frame: Duration,
    requests: mpsc::Receiver<Request>,
}

impl SimulationDriver {
    /// Build a driver around `ctx` and the client that talks to it. Nothing
    /// runs until [`run`][Self::run] is awaited.
    pub fn new(ctx: SimulationContext, config: &DriverConfig) -> (Self, ArmClient) {
        let (tx, rx) = mpsc::channel(config.request_capacity.max(1));
        let bus = SimBus::new(config.bus_capacity, ctx.snapshot());
        let client = ArmClient::new(tx, bus.clone());
        let driver = Self {
            ctx,
            pending: PendingCompletions::new(),
            bus,
            clock: FrameClock::new(config.max_frame_dt),
            frame: config.frame_interval(),
            requests: rx,
        };
        (driver, client)
    }

    /// [`new`][Self::new] and spawn [`run`][Self::run] on the current tokio
    /// runtime.
    pub fn spawn(ctx: SimulationContext, config: &DriverConfig) -> (ArmClient, JoinHandle<()>) {
        let (driver, client) = Self::new(ctx, config);
        let handle = tokio::spawn(driver.run());
        (client, handle)
    }

    /// Drive the simulation until every client is gone.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.frame);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            frame_ms = self.frame.as_secs_f64() * 1e3,
            max_dt = self.clock.max_dt(),
            "simulation driver started"
        );

        loop {
            tokio::select! {
                now = interval.tick() => {
                    let dt = self.clock.dt_at(now.into_std());
                    self.frame_step(dt);
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
            }
        }

        let aborted = self.ctx.stop();
        self.flush();
        self.pending
            .fail_all(ArmError::Channel("simulation driver shut down".into()));
        info!(aborted, "simulation driver stopped");
    }

    // -------------------------------------------------------------------------
    // Frame
    // -------------------------------------------------------------------------

    fn frame_step(&mut self, dt: f64) {
        self.ctx.tick(dt);
        self.flush();
        self.bus.publish_snapshot(self.ctx.snapshot());
    }

    /// Forward every completion the engine emitted since the last flush.
    fn flush(&mut self) {
        for event in self.ctx.drain_completions() {
            self.pending.resolve(&event);
            self.bus.publish_completion(event);
        }
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    fn handle(&mut self, request: Request) {
        match request {
            Request::Submit { cmd, slot } => self.submit(cmd, slot),
            Request::SetSpeed(value) => self.ctx.set_speed(value),
            Request::ResetPath => {
                self.ctx.reset_path();
                self.bus.publish_snapshot(self.ctx.snapshot());
            }
            Request::Stop { ack } => {
                let aborted = self.abort(SimulationContext::stop);
                let _ = ack.send(aborted);
            }
            Request::HardReset { ack } => {
                let aborted = self.abort(SimulationContext::hard_reset);
                self.clock.reset();
                let _ = ack.send(aborted);
            }
        }
    }

    fn submit(&mut self, cmd: Command, slot: CompletionSlot) {
        let id = cmd.id.clone();
        if let Err(e) = self.pending.register(id.clone(), slot) {
            warn!(id = %id, error = %e, "submission rejected");
            return;
        }
        if let Err(e) = self.ctx.enqueue(cmd) {
            warn!(id = %id, error = %e, "submission rejected");
            self.pending.reject(&id, e);
            return;
        }
        // Expansions and early failures complete inside enqueue.
        self.flush();
    }

    /// Run a stop-like operation, then fail any await the engine did not
    /// account for.
    fn abort(&mut self, op: fn(&mut SimulationContext) -> usize) -> usize {
        let aborted = op(&mut self.ctx);
        self.flush();
        let stragglers = self.pending.fail_all(ArmError::Stopped);
        if stragglers > 0 {
            debug!(stragglers, "failed awaits with no engine-side command");
        }
        self.bus.publish_snapshot(self.ctx.snapshot());
        aborted
    }
}
