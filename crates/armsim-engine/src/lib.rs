//! `armsim-engine` – Command Execution Engine
//!
//! The cooperative scheduler that turns a FIFO of discrete arm commands into
//! joint motion, one simulation tick at a time. Everything here is
//! single-threaded and synchronous; the async shell lives in
//! `armsim-runtime`.
//!
//! # Modules
//!
//! - [`context`] – [`SimulationContext`][context::SimulationContext]: the
//!   explicit owner of one simulation (arm state, queue, completion outbox)
//!   and the public entry points `enqueue`, `tick`, `stop`, `hard_reset`,
//!   `set_speed`, `reset_path`.
//! - [`engine`] – the Idle → Running → Idle state machine: start, per-tick
//!   integration, finish, and the hand-off to the next queued command.
//! - [`queue`] – [`CommandQueue`][queue::CommandQueue]: the pending FIFO.
//! - [`expansion`] – rewriting a `LINE_TO` into `MOVE_TO` waypoints.
//! - [`motion`] – duration planning and eased joint interpolation.
//! - [`state`] – [`ArmState`][state::ArmState], the authoritative pose and
//!   toolpath.
//! - [`toolpath`] – [`Toolpath`][toolpath::Toolpath], the chunked effector
//!   trace that snapshots share instead of copying.
//! - [`snapshot`] – [`ArmSnapshot`][snapshot::ArmSnapshot], the frozen,
//!   read-only view handed to render consumers.

pub mod context;
pub mod engine;
pub mod expansion;
pub mod motion;
pub mod queue;
pub mod snapshot;
pub mod state;
pub mod toolpath;

pub use context::SimulationContext;
pub use motion::{DEFAULT_SPEED_SCALE, MIN_MOTION_DURATION, compute_duration};
pub use queue::CommandQueue;
pub use snapshot::ArmSnapshot;
pub use state::ArmState;
pub use toolpath::Toolpath;
