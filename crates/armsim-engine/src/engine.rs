//! The execution state machine.
//!
//! ```text
//!            start(cmd)                    tick: u >= 1 / elapsed >= duration
//!   Idle ───────────────▶ Running ──────────────────────────────────────▶ Idle
//!     ▲  │                                                                 │
//!     │  └─ expand / fail immediately ─▶ completion emitted ──┐            │
//!     └────────────────────────── try_start_next ◀────────────┴────────────┘
//! ```
//!
//! Starting a command resolves to one of three [`Transition`]s. Execution
//! (`Run`) hands the engine a motion or a sleep. Expansion (`Expand`) pushes
//! the produced sub-commands to the head of the queue and completes the
//! parent at once. `Complete` covers commands that fail before doing
//! anything.
//!
//! Finishing a command and starting the next one happen in the same call, so
//! a non-empty queue never leaves an idle frame between commands.

use armsim_kinematics::{forward, inverse};
use armsim_types::{
    ArmError, Command, CommandId, CommandKind, CommandResult, Completion, CompletionEvent,
    IkBranch, Point2,
};
use tracing::{debug, warn};

use crate::context::SimulationContext;
use crate::expansion::expand_line;
use crate::motion::MotionPlan;
use crate::state::{ActiveCommand, Activity, Step};

/// What starting a command resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Occupy the engine with this activity until it completes.
    Run(Activity),
    /// Produce these commands in place of the parent, then complete it.
    Expand(Vec<Command>),
    /// Complete at once with this result, without touching the arm.
    Complete(CommandResult),
}

impl SimulationContext {
    /// Decide how `cmd` starts from the current arm state. Pure with respect
    /// to the context.
    pub fn plan(&self, cmd: &Command) -> Transition {
        match &cmd.kind {
            CommandKind::Home => self.motion_to([0.0, 0.0], None),
            CommandKind::SetJoints { deg } => {
                let q = self
                    .model()
                    .clamp_joints([deg[0].to_radians(), deg[1].to_radians()]);
                self.motion_to(q, None)
            }
            CommandKind::MoveTo { x, y } => match inverse(self.model(), Point2::new(*x, *y)) {
                Ok(sol) => self.motion_to(sol.q, Some(sol.chosen)),
                Err(e) => Transition::Complete(Err(e)),
            },
            CommandKind::Sleep { seconds } => Transition::Run(Activity::Sleep {
                duration: seconds.max(0.0),
            }),
            CommandKind::LineTo { x, y, steps } => {
                let from = forward(self.model(), self.state().q).effector;
                Transition::Expand(expand_line(&cmd.id, from, Point2::new(*x, *y), *steps))
            }
            CommandKind::Unknown { name } => {
                Transition::Complete(Err(ArmError::UnknownCommand(name.clone())))
            }
        }
    }

    fn motion_to(&self, q_target: [f64; 2], ik: Option<IkBranch>) -> Transition {
        let state = self.state();
        Transition::Run(Activity::Motion(MotionPlan::new(
            self.model(),
            state.q,
            q_target,
            state.speed_scale,
            ik,
        )))
    }

    /// Start `cmd`. Commands that complete immediately emit their completion
    /// here but do not pull the next command; [`try_start_next`] loops.
    ///
    /// [`try_start_next`]: SimulationContext::try_start_next
    pub(crate) fn start(&mut self, cmd: Command) {
        debug!(id = %cmd.id, kind = cmd.kind.name(), "starting command");
        match self.plan(&cmd) {
            Transition::Run(activity) => {
                self.state_mut().current = Some(ActiveCommand::new(cmd.id, activity));
            }
            Transition::Expand(steps) => {
                debug!(id = %cmd.id, steps = steps.len(), "expanded command");
                self.queue_mut().push_front_all(steps);
                self.emit(cmd.id, Ok(Completion::expanded()));
            }
            Transition::Complete(result) => {
                if let Err(e) = &result {
                    warn!(id = %cmd.id, error = %e, "command rejected at start");
                }
                self.emit(cmd.id, result);
            }
        }
    }

    /// Pull commands off the queue until one occupies the engine or the
    /// queue runs dry. No-op while busy.
    pub(crate) fn try_start_next(&mut self) {
        while !self.state().is_busy() {
            let Some(cmd) = self.queue_mut().pop_front() else {
                break;
            };
            self.start(cmd);
        }
    }

    /// Advance the running command by `dt` seconds.
    pub(crate) fn advance(&mut self, dt: f64) {
        let step = match self.state_mut().current.as_mut() {
            Some(active) => active.advance(dt),
            None => {
                self.try_start_next();
                return;
            }
        };
        match step {
            Step::Waiting => {}
            Step::Pose(q) => self.apply_pose(q),
            Step::Arrived(q, done) => {
                self.apply_pose(q);
                self.finish(Ok(done));
            }
            Step::Elapsed => self.finish(Ok(Completion::done())),
        }
    }

    /// Set the joints and record the resulting effector position.
    fn apply_pose(&mut self, q: [f64; 2]) {
        let effector = forward(self.model(), q).effector;
        let state = self.state_mut();
        state.q = q;
        state.toolpath.push(effector);
    }

    /// Complete the running command and immediately start the next one.
    fn finish(&mut self, result: CommandResult) {
        if let Some(active) = self.state_mut().current.take() {
            self.emit(active.id, result);
        }
        self.try_start_next();
    }

    /// Record a completion for the agent.
    pub(crate) fn emit(&mut self, id: CommandId, result: CommandResult) {
        match &result {
            Ok(done) => debug!(id = %id, ik = ?done.ik, note = ?done.note, "command completed"),
            Err(e) => debug!(id = %id, error = %e, "command failed"),
        }
        self.push_completion(CompletionEvent::new(id, result));
    }
}
