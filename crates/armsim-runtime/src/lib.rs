//! `armsim-runtime` – the async shell around the execution engine.
//!
//! The engine itself is a synchronous state machine; this crate gives it a
//! clock, a mailbox and a way to answer the script agent.
//!
//! # Modules
//!
//! - [`driver`] – [`SimulationDriver`][driver::SimulationDriver]: owns a
//!   [`SimulationContext`][armsim_engine::SimulationContext] and advances it
//!   once per frame on a tokio interval, serving agent requests between
//!   frames.
//! - [`client`] – [`ArmClient`][client::ArmClient]: the cloneable handle an
//!   agent uses to submit commands and await their completion.
//! - [`correlation`] – [`PendingCompletions`][correlation::PendingCompletions]:
//!   the id → completion-slot table that resolves or fails agent awaits.
//! - [`bus`] – [`SimBus`][bus::SimBus]: completion broadcast plus the latest
//!   frozen snapshot for render consumers.
//! - [`clock`] – [`FrameClock`][clock::FrameClock]: wall-clock frame deltas
//!   with a cap against stalls.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber setup with an optional OTLP exporter.

pub mod bus;
pub mod client;
pub mod clock;
pub mod correlation;
pub mod driver;
pub mod telemetry;

pub use bus::{CompletionReceiver, SimBus};
pub use client::{ArmClient, PendingCompletion};
pub use clock::FrameClock;
pub use correlation::PendingCompletions;
pub use driver::{DriverConfig, SimulationDriver};
pub use telemetry::{TracerProviderGuard, init_tracing};
