//! [`ArmState`] – the authoritative, engine-owned state of one arm.

use armsim_types::{ArmModel, CommandId, Completion};

use crate::motion::{DEFAULT_SPEED_SCALE, MotionPlan};
use crate::toolpath::Toolpath;

/// What a running command is doing while it occupies the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// Interpolating the joints along a [`MotionPlan`].
    Motion(MotionPlan),
    /// Waiting for `duration` seconds.
    Sleep { duration: f64 },
}

/// The command currently owned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCommand {
    pub id: CommandId,
    pub activity: Activity,
    /// Seconds accumulated since the command started.
    pub elapsed: f64,
}

/// Result of advancing the active command by one tick.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// Sleeping, not yet due.
    Waiting,
    /// Moved to an intermediate pose.
    Pose([f64; 2]),
    /// Reached the target pose; the motion is complete.
    Arrived([f64; 2], Completion),
    /// The sleep is over.
    Elapsed,
}

impl ActiveCommand {
    pub fn new(id: CommandId, activity: Activity) -> Self {
        Self {
            id,
            activity,
            elapsed: 0.0,
        }
    }

    /// Total time the command occupies the engine at the current speed.
    pub fn duration(&self) -> f64 {
        match &self.activity {
            Activity::Motion(plan) => plan.duration,
            Activity::Sleep { duration } => *duration,
        }
    }

    /// Accumulate `dt` and report where the command now stands.
    pub(crate) fn advance(&mut self, dt: f64) -> Step {
        self.elapsed += dt;
        match &self.activity {
            Activity::Sleep { duration } if self.elapsed >= *duration => Step::Elapsed,
            Activity::Sleep { .. } => Step::Waiting,
            Activity::Motion(plan) => {
                let u = plan.progress(self.elapsed);
                if u >= 1.0 {
                    let done = match plan.ik {
                        Some(branch) => Completion::with_ik(branch),
                        None => Completion::done(),
                    };
                    Step::Arrived(plan.q_target, done)
                } else {
                    Step::Pose(plan.pose_at(u))
                }
            }
        }
    }

    /// Apply a new speed scale to an in-flight motion without moving the arm.
    pub(crate) fn retime(&mut self, model: &ArmModel, speed_scale: f64) {
        if let Activity::Motion(plan) = &mut self.activity {
            self.elapsed = plan.retime(model, self.elapsed, speed_scale);
        }
    }
}

/// Mutable arm state. The engine is its only writer.
///
/// `busy` is not stored: the arm is busy exactly when `current` is `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmState {
    /// Joint angles `[q1, q2]`, radians.
    pub q: [f64; 2],
    /// Speed scale in `[0, 1]`.
    pub speed_scale: f64,
    /// End-effector trace since the last reset.
    pub toolpath: Toolpath,
    pub current: Option<ActiveCommand>,
}

impl ArmState {
    /// An idle arm at home with the given speed scale and an empty toolpath.
    pub fn new(speed_scale: f64) -> Self {
        Self {
            q: [0.0, 0.0],
            speed_scale,
            toolpath: Toolpath::new(),
            current: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_id(&self) -> Option<&CommandId> {
        self.current.as_ref().map(|c| &c.id)
    }
}

impl Default for ArmState {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_SCALE)
    }
}
