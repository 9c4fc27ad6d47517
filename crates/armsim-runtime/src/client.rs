//! [`ArmClient`] – the agent's handle on a running simulation.
//!
//! # Example
//!
//! ```rust,no_run
//! use armsim_engine::SimulationContext;
//! use armsim_runtime::{DriverConfig, SimulationDriver};
//! use armsim_types::{ArmModel, CommandKind};
//!
//! # async fn demo() -> Result<(), armsim_types::ArmError> {
//! let ctx = SimulationContext::new(ArmModel::default());
//! let (arm, _driver) = SimulationDriver::spawn(ctx, &DriverConfig::default());
//!
//! arm.execute(CommandKind::SetJoints { deg: [30.0, 30.0] }).await?;
//! let done = arm.execute(CommandKind::MoveTo { x: 1.0, y: 0.5 }).await?;
//! println!("reached target via {:?}", done.ik);
//! # Ok(())
//! # }
//! ```

use armsim_engine::ArmSnapshot;
use armsim_types::{ArmError, Command, CommandId, CommandKind, CommandResult};
use tokio::sync::{mpsc, oneshot, watch};

use crate::bus::{CompletionReceiver, SimBus};
use crate::driver::Request;

fn driver_gone() -> ArmError {
    ArmError::Channel("simulation driver is not running".into())
}

/// Cloneable handle to a [`SimulationDriver`][crate::SimulationDriver].
#[derive(Clone, Debug)]
pub struct ArmClient {
    requests: mpsc::Sender<Request>,
    bus: SimBus,
}

/// A submitted command whose completion has not been awaited yet.
#[derive(Debug)]
pub struct PendingCompletion {
    id: CommandId,
    rx: oneshot::Receiver<CommandResult>,
}

impl PendingCompletion {
    pub fn id(&self) -> &CommandId {
        &self.id
    }

    /// Wait for the command's completion.
    pub async fn wait(self) -> CommandResult {
        self.rx.await.unwrap_or_else(|_| Err(driver_gone()))
    }
}

impl ArmClient {
    pub(crate) fn new(requests: mpsc::Sender<Request>, bus: SimBus) -> Self {
        Self { requests, bus }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Queue `cmd` under its own id.
    ///
    /// Rejections (duplicate in-flight id, non-finite payload) are delivered
    /// through the returned [`PendingCompletion`], like any other failure.
    pub async fn submit_with_id(&self, cmd: Command) -> Result<PendingCompletion, ArmError> {
        let (slot, rx) = oneshot::channel();
        let id = cmd.id.clone();
        self.send(Request::Submit { cmd, slot }).await?;
        Ok(PendingCompletion { id, rx })
    }

    /// Queue `kind` under a freshly generated id.
    pub async fn submit(&self, kind: CommandKind) -> Result<PendingCompletion, ArmError> {
        self.submit_with_id(Command::new(CommandId::generate(), kind)).await
    }

    /// Queue `kind` and wait for its completion.
    pub async fn execute(&self, kind: CommandKind) -> CommandResult {
        self.submit(kind).await?.wait().await
    }

    /// Queue `cmd` and wait for its completion.
    pub async fn execute_command(&self, cmd: Command) -> CommandResult {
        self.submit_with_id(cmd).await?.wait().await
    }

    // -------------------------------------------------------------------------
    // Side channels
    // -------------------------------------------------------------------------

    pub async fn set_speed(&self, value: f64) -> Result<(), ArmError> {
        self.send(Request::SetSpeed(value)).await
    }

    pub async fn reset_path(&self) -> Result<(), ArmError> {
        self.send(Request::ResetPath).await
    }

    /// Abort the running command and drop the queue. Returns how many
    /// commands were aborted.
    pub async fn stop(&self) -> Result<usize, ArmError> {
        let (ack, rx) = oneshot::channel();
        self.send(Request::Stop { ack }).await?;
        rx.await.map_err(|_| driver_gone())
    }

    /// [`stop`][Self::stop] for callers outside the tokio runtime, such as a
    /// signal handler thread. Must not be called from async context.
    pub fn stop_blocking(&self) -> Result<usize, ArmError> {
        let (ack, rx) = oneshot::channel();
        self.requests
            .blocking_send(Request::Stop { ack })
            .map_err(|_| driver_gone())?;
        rx.blocking_recv().map_err(|_| driver_gone())
    }

    /// Stop, then return home with the default speed and an empty toolpath.
    pub async fn hard_reset(&self) -> Result<usize, ArmError> {
        let (ack, rx) = oneshot::channel();
        self.send(Request::HardReset { ack }).await?;
        rx.await.map_err(|_| driver_gone())
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// The snapshot published after the most recent frame.
    pub fn snapshot(&self) -> ArmSnapshot {
        self.bus.latest_snapshot()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<ArmSnapshot> {
        self.bus.watch_snapshots()
    }

    /// Every completion, including expanded sub-commands nobody awaits.
    pub fn subscribe_completions(&self) -> CompletionReceiver {
        self.bus.subscribe_completions()
    }

    async fn send(&self, request: Request) -> Result<(), ArmError> {
        self.requests.send(request).await.map_err(|_| driver_gone())
    }
}
