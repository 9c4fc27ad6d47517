//! [`SimulationContext`] – one independent arm simulation.
//!
//! The context owns everything a simulation mutates: the [`ArmState`], the
//! [`CommandQueue`], and an outbox of [`CompletionEvent`]s waiting to be
//! collected by whoever drives it. There is no process-wide state, so any
//! number of contexts can run side by side and tests can step one
//! deterministically with explicit `dt` values.
//!
//! # Example
//!
//! ```rust
//! use armsim_engine::SimulationContext;
//! use armsim_types::{ArmModel, Command, CommandKind};
//!
//! let mut sim = SimulationContext::new(ArmModel::default());
//! sim.enqueue(Command::new("a", CommandKind::SetJoints { deg: [45.0, 30.0] }))
//!     .unwrap();
//! while sim.is_busy() {
//!     sim.tick(1.0 / 60.0);
//! }
//! let done = sim.drain_completions();
//! assert_eq!(done.len(), 1);
//! assert!(done[0].is_ok());
//! ```

use armsim_kinematics::forward;
use armsim_types::{ArmError, ArmModel, Command, CommandId, CompletionEvent, Point2};
use tracing::{debug, info};

use crate::motion::{DEFAULT_SPEED_SCALE, clamp_speed_scale};
use crate::queue::CommandQueue;
use crate::snapshot::ArmSnapshot;
use crate::state::ArmState;
use crate::toolpath::Toolpath;

/// Owner of a single simulation's mutable state.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    model: ArmModel,
    state: ArmState,
    queue: CommandQueue,
    outbox: Vec<CompletionEvent>,
    default_speed: f64,
}

impl SimulationContext {
    /// An idle simulation at home with the default speed scale.
    pub fn new(model: ArmModel) -> Self {
        Self::with_default_speed(model, DEFAULT_SPEED_SCALE)
    }

    /// Like [`new`][Self::new], with `speed` (clamped to `[0, 1]`) as the
    /// initial speed scale and the value [`hard_reset`][Self::hard_reset]
    /// restores.
    pub fn with_default_speed(model: ArmModel, speed: f64) -> Self {
        let default_speed = clamp_speed_scale(speed);
        Self {
            model,
            state: ArmState::new(default_speed),
            queue: CommandQueue::new(),
            outbox: Vec::new(),
            default_speed,
        }
    }

    // -------------------------------------------------------------------------
    // Inbound commands
    // -------------------------------------------------------------------------

    /// Append `cmd` to the queue and start it if the engine is idle.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] when the payload carries a
    /// non-finite number. Nothing is queued and no completion is emitted.
    pub fn enqueue(&mut self, cmd: Command) -> Result<(), ArmError> {
        cmd.kind.validate()?;
        debug!(id = %cmd.id, kind = cmd.kind.name(), queued = self.queue.len(), "enqueue");
        self.queue.push_back(cmd);
        self.try_start_next();
        Ok(())
    }

    /// Advance the simulation by `dt` seconds. Negative or non-finite `dt`
    /// counts as zero.
    pub fn tick(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.advance(dt);
    }

    // -------------------------------------------------------------------------
    // Side channels
    // -------------------------------------------------------------------------

    /// Set the speed scale (clamped to `[0, 1]`). An in-flight motion keeps
    /// its progress and finishes at the new speed.
    pub fn set_speed(&mut self, value: f64) {
        let speed = clamp_speed_scale(value);
        self.state.speed_scale = speed;
        if let Some(active) = self.state.current.as_mut() {
            active.retime(&self.model, speed);
        }
        debug!(speed, "speed scale set");
    }

    /// Clear the toolpath only.
    pub fn reset_path(&mut self) {
        self.state.toolpath.clear();
    }

    /// Abort the running command and discard the queue. Every aborted command
    /// completes with [`ArmError::Stopped`], running command first, then the
    /// queue in order. Returns the number of aborted commands.
    pub fn stop(&mut self) -> usize {
        let mut aborted = Vec::with_capacity(self.queue.len() + 1);
        if let Some(active) = self.state.current.take() {
            aborted.push(active.id);
        }
        aborted.extend(self.queue.drain().map(|cmd| cmd.id));
        let count = aborted.len();
        for id in aborted {
            self.emit(id, Err(ArmError::Stopped));
        }
        info!(aborted = count, "simulation stopped");
        count
    }

    /// [`stop`][Self::stop], then return the joints to home, restore the
    /// default speed scale and clear the toolpath.
    pub fn hard_reset(&mut self) -> usize {
        let aborted = self.stop();
        self.state = ArmState::new(self.default_speed);
        info!("simulation reset to home");
        aborted
    }

    // -------------------------------------------------------------------------
    // Outbound
    // -------------------------------------------------------------------------

    /// Take every completion emitted since the last call, in emission order.
    pub fn drain_completions(&mut self) -> Vec<CompletionEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// A frozen copy of everything a render consumer may read.
    pub fn snapshot(&self) -> ArmSnapshot {
        let fk = forward(&self.model, self.state.q);
        ArmSnapshot {
            q: self.state.q,
            elbow: fk.elbow,
            effector: fk.effector,
            toolpath: self.state.toolpath.clone(),
            busy: self.state.is_busy(),
            queue_len: self.queue.len(),
            speed_scale: self.state.speed_scale,
            current: self.state.current_id().cloned(),
        }
    }

    // -------------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------------

    pub fn model(&self) -> &ArmModel {
        &self.model
    }

    pub fn state(&self) -> &ArmState {
        &self.state
    }

    pub fn joints(&self) -> [f64; 2] {
        self.state.q
    }

    pub fn effector(&self) -> Point2 {
        forward(&self.model, self.state.q).effector
    }

    pub fn toolpath(&self) -> &Toolpath {
        &self.state.toolpath
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn speed_scale(&self) -> f64 {
        self.state.speed_scale
    }

    pub fn current_id(&self) -> Option<&CommandId> {
        self.state.current_id()
    }

    // -------------------------------------------------------------------------
    // Engine internals
    // -------------------------------------------------------------------------

    pub(crate) fn state_mut(&mut self) -> &mut ArmState {
        &mut self.state
    }

    pub(crate) fn queue_mut(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    pub(crate) fn push_completion(&mut self, event: CompletionEvent) {
        self.outbox.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    use armsim_types::{CommandKind, Completion, IkBranch};

    const DT: f64 = 1.0 / 60.0;

    fn sim() -> SimulationContext {
        SimulationContext::new(ArmModel::default())
    }

    fn cmd(id: &str, kind: CommandKind) -> Command {
        Command::new(id, kind)
    }

    /// Tick until idle, returning every completion in order.
    fn run_to_idle(sim: &mut SimulationContext) -> Vec<CompletionEvent> {
        let mut out = sim.drain_completions();
        for _ in 0..100_000 {
            if !sim.is_busy() {
                break;
            }
            sim.tick(DT);
            out.extend(sim.drain_completions());
        }
        assert!(!sim.is_busy(), "simulation did not settle");
        out
    }

    fn ids(events: &[CompletionEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn enqueue_on_idle_starts_immediately() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::Home)).unwrap();
        assert!(s.is_busy());
        assert_eq!(s.current_id().unwrap().as_str(), "a");
        assert_eq!(s.queue_len(), 0);
    }

    #[test]
    fn enqueue_while_busy_waits_in_queue() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::Sleep { seconds: 1.0 })).unwrap();
        s.enqueue(cmd("b", CommandKind::Home)).unwrap();
        assert_eq!(s.current_id().unwrap().as_str(), "a");
        assert_eq!(s.queue_len(), 1);
    }

    #[test]
    fn invalid_payload_is_rejected_before_queueing() {
        let mut s = sim();
        let err = s
            .enqueue(cmd("bad", CommandKind::MoveTo { x: f64::NAN, y: 0.0 }))
            .unwrap_err();
        assert!(matches!(err, ArmError::InvalidArgument(_)));
        assert!(!s.is_busy());
        assert!(s.drain_completions().is_empty());
    }

    #[test]
    fn set_joints_then_move_to_link1() {
        let mut s = sim();
        s.enqueue(cmd("j", CommandKind::SetJoints { deg: [90.0, 0.0] }))
            .unwrap();
        let first = run_to_idle(&mut s);
        assert_eq!(ids(&first), ["j"]);
        assert!((s.joints()[0] - FRAC_PI_2).abs() < 1e-12);
        assert!(s.joints()[1].abs() < 1e-12);

        let l1 = s.model().link1;
        s.enqueue(cmd("m", CommandKind::MoveTo { x: l1, y: 0.0 }))
            .unwrap();
        let second = run_to_idle(&mut s);
        assert_eq!(ids(&second), ["m"]);
        assert_eq!(
            second[0].result,
            Ok(Completion::with_ik(IkBranch::ElbowDown))
        );
        let p = s.effector();
        assert!((p.x - l1).abs() < 1e-9 && p.y.abs() < 1e-9, "{p:?}");
    }

    #[test]
    fn move_to_the_current_fully_extended_pose_completes() {
        let mut s = sim();
        s.enqueue(cmd("j", CommandKind::SetJoints { deg: [-179.0, 0.0] }))
            .unwrap();
        run_to_idle(&mut s);
        let here = s.effector();
        s.enqueue(cmd("m", CommandKind::MoveTo { x: here.x, y: here.y }))
            .unwrap();
        let events = run_to_idle(&mut s);
        assert_eq!(ids(&events), ["m"]);
        assert!(events[0].is_ok(), "{:?}", events[0].result);
        let p = s.effector();
        assert!((p.x - here.x).abs() < 1e-9 && (p.y - here.y).abs() < 1e-9);
    }

    #[test]
    fn fifo_completion_order_with_expansion() {
        let mut s = sim();
        s.enqueue(cmd("A", CommandKind::SetJoints { deg: [30.0, 40.0] }))
            .unwrap();
        s.enqueue(cmd(
            "B",
            CommandKind::LineTo {
                x: 1.2,
                y: 0.3,
                steps: 5,
            },
        ))
        .unwrap();
        s.enqueue(cmd("C", CommandKind::Sleep { seconds: 0.05 }))
            .unwrap();
        let events = run_to_idle(&mut s);
        assert_eq!(
            ids(&events),
            ["A", "B", "B:1", "B:2", "B:3", "B:4", "B:5", "C"]
        );
        assert_eq!(events[1].result, Ok(Completion::expanded()));
        assert!(events.iter().all(CompletionEvent::is_ok));
    }

    #[test]
    fn line_to_ten_steps_ends_on_target() {
        let mut s = sim();
        s.enqueue(cmd(
            "L",
            CommandKind::LineTo {
                x: 0.9,
                y: 0.9,
                steps: 10,
            },
        ))
        .unwrap();
        // The parent completes during enqueue; the first waypoint is running.
        let early = s.drain_completions();
        assert_eq!(ids(&early), ["L"]);
        assert_eq!(s.current_id().unwrap().as_str(), "L:1");
        assert_eq!(s.queue_len(), 9);

        let rest = run_to_idle(&mut s);
        assert_eq!(rest.len(), 10);
        assert_eq!(rest[9].id.as_str(), "L:10");
        let p = s.effector();
        assert!((p.x - 0.9).abs() < 1e-9 && (p.y - 0.9).abs() < 1e-9);
    }

    #[test]
    fn failed_command_does_not_halt_the_queue() {
        let mut s = sim();
        s.enqueue(cmd("busy", CommandKind::Sleep { seconds: 0.1 }))
            .unwrap();
        s.enqueue(cmd("far", CommandKind::MoveTo { x: 10.0, y: 0.0 }))
            .unwrap();
        s.enqueue(cmd(
            "what",
            CommandKind::Unknown {
                name: "JUMP".into(),
            },
        ))
        .unwrap();
        s.enqueue(cmd("home", CommandKind::Home)).unwrap();
        let events = run_to_idle(&mut s);
        assert_eq!(ids(&events), ["busy", "far", "what", "home"]);
        assert_eq!(events[1].to_wire()["error"], "unreachable");
        assert_eq!(events[2].to_wire()["error"], "unknown-cmd");
        assert!(events[3].is_ok());
    }

    #[test]
    fn no_idle_gap_between_queued_commands() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::Sleep { seconds: 0.02 }))
            .unwrap();
        s.enqueue(cmd("b", CommandKind::Sleep { seconds: 1.0 }))
            .unwrap();
        s.tick(0.05);
        let done = s.drain_completions();
        assert_eq!(ids(&done), ["a"]);
        assert_eq!(s.current_id().unwrap().as_str(), "b");
    }

    #[test]
    fn motion_traces_the_toolpath() {
        let mut s = sim();
        s.enqueue(cmd("j", CommandKind::SetJoints { deg: [60.0, 0.0] }))
            .unwrap();
        run_to_idle(&mut s);
        let path = s.toolpath();
        assert!(path.len() > 2);
        let last = path.last().unwrap();
        assert_eq!(last, s.effector());
        // Effector stays on the full-extension circle throughout.
        for p in path {
            assert!((p.norm() - 1.75).abs() < 1e-9);
        }
    }

    #[test]
    fn stop_mid_motion_aborts_everything() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::SetJoints { deg: [120.0, 0.0] }))
            .unwrap();
        s.enqueue(cmd("b", CommandKind::Home)).unwrap();
        s.enqueue(cmd("c", CommandKind::Sleep { seconds: 1.0 }))
            .unwrap();
        s.tick(DT);
        let q_mid = s.joints();
        assert!(q_mid[0] > 0.0);

        assert_eq!(s.stop(), 3);
        assert!(!s.is_busy());
        assert_eq!(s.queue_len(), 0);
        let events = s.drain_completions();
        assert_eq!(ids(&events), ["a", "b", "c"]);
        assert!(events.iter().all(|e| e.result == Err(ArmError::Stopped)));
        // Stop is not a reset: the arm stays where it was.
        assert_eq!(s.joints(), q_mid);

        // A fresh command runs from the stopped pose with no residue.
        s.enqueue(cmd("d", CommandKind::Sleep { seconds: 0.0 }))
            .unwrap();
        assert_eq!(s.current_id().unwrap().as_str(), "d");
        let after = run_to_idle(&mut s);
        assert_eq!(ids(&after), ["d"]);
        assert_eq!(s.joints(), q_mid);
    }

    #[test]
    fn stop_when_idle_is_harmless() {
        let mut s = sim();
        assert_eq!(s.stop(), 0);
        assert!(s.drain_completions().is_empty());
    }

    #[test]
    fn hard_reset_restores_home_speed_and_path() {
        let mut s = SimulationContext::with_default_speed(ArmModel::default(), 0.8);
        s.set_speed(0.3);
        s.enqueue(cmd("a", CommandKind::SetJoints { deg: [45.0, 45.0] }))
            .unwrap();
        s.tick(0.1);
        assert!(!s.toolpath().is_empty());

        assert_eq!(s.hard_reset(), 1);
        assert_eq!(s.joints(), [0.0, 0.0]);
        assert_eq!(s.speed_scale(), 0.8);
        assert!(s.toolpath().is_empty());
        assert!(!s.is_busy());
        assert_eq!(s.drain_completions()[0].result, Err(ArmError::Stopped));
    }

    #[test]
    fn reset_path_only_touches_the_toolpath() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::SetJoints { deg: [45.0, 0.0] }))
            .unwrap();
        s.enqueue(cmd("b", CommandKind::Home)).unwrap();
        s.tick(DT);
        let q = s.joints();
        s.reset_path();
        assert!(s.toolpath().is_empty());
        assert_eq!(s.joints(), q);
        assert!(s.is_busy());
        assert_eq!(s.queue_len(), 1);
    }

    #[test]
    fn set_speed_is_clamped_and_retimes_in_flight_motion() {
        let mut s = sim();
        s.set_speed(4.0);
        assert_eq!(s.speed_scale(), 1.0);

        // 90° at 2 rad/s: ~0.785 s at full speed.
        s.enqueue(cmd("a", CommandKind::SetJoints { deg: [90.0, 0.0] }))
            .unwrap();
        s.tick(0.2);
        let q_before = s.joints();
        s.set_speed(0.5);
        assert_eq!(s.joints(), q_before, "retiming must not move the arm");
        let duration = s.state().current.as_ref().unwrap().duration();
        assert!((duration - FRAC_PI_2).abs() < 1e-9);

        // 0.6 s more would have finished the original plan; not the slowed one.
        s.tick(0.6);
        assert!(s.is_busy());
        run_to_idle(&mut s);
        assert!((s.joints()[0] - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::Sleep { seconds: 0.01 }))
            .unwrap();
        s.tick(f64::NAN);
        s.tick(-1.0);
        assert!(s.is_busy());
        s.tick(0.02);
        assert!(!s.is_busy());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut s = sim();
        s.enqueue(cmd("a", CommandKind::Sleep { seconds: 1.0 }))
            .unwrap();
        s.enqueue(cmd("b", CommandKind::Home)).unwrap();
        let snap = s.snapshot();
        assert!(snap.busy);
        assert_eq!(snap.queue_len, 1);
        assert_eq!(snap.current.as_ref().unwrap().as_str(), "a");
        assert!((snap.effector.x - 1.75).abs() < 1e-12);
        assert!((snap.elbow.x - 1.0).abs() < 1e-12);
        assert_eq!(snap.speed_scale, DEFAULT_SPEED_SCALE);
    }

    #[test]
    fn independent_contexts_do_not_share_state() {
        let mut a = sim();
        let b = sim();
        a.enqueue(cmd("x", CommandKind::SetJoints { deg: [10.0, 10.0] }))
            .unwrap();
        run_to_idle(&mut a);
        assert_ne!(a.joints(), b.joints());
        assert!(b.toolpath().is_empty());
    }
}
