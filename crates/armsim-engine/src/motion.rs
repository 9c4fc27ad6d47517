//! Joint-space motion planning.
//!
//! A motion is a straight line in joint space from `q_start` to `q_target`,
//! timed by the slower of the two joints and eased with a smoothstep so the
//! arm starts and stops without a velocity jump.

use armsim_types::{ArmModel, IkBranch};

/// Shortest time any motion may take, seconds. Keeps zero-length motions from
/// finishing without an interpolation frame.
pub const MIN_MOTION_DURATION: f64 = 0.08;

/// Lower bound applied to the speed scale when timing a motion.
pub const MIN_SPEED_SCALE: f64 = 0.05;

/// Speed scale of a freshly created or hard-reset simulation.
pub const DEFAULT_SPEED_SCALE: f64 = 1.0;

/// Clamp a user-supplied speed scale into `[0, 1]`. `NaN` maps to the
/// default.
pub fn clamp_speed_scale(value: f64) -> f64 {
    if value.is_nan() {
        DEFAULT_SPEED_SCALE
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Time to move from `q_start` to `q_target` at the model's maximum joint
/// speed scaled by `speed_scale`.
pub fn compute_duration(
    model: &ArmModel,
    q_start: [f64; 2],
    q_target: [f64; 2],
    speed_scale: f64,
) -> f64 {
    let max_delta = (q_target[0] - q_start[0])
        .abs()
        .max((q_target[1] - q_start[1]).abs());
    let speed = model.max_joint_speed * speed_scale.clamp(MIN_SPEED_SCALE, 1.0);
    (max_delta / speed).max(MIN_MOTION_DURATION)
}

/// `u²(3 - 2u)` on `u ∈ [0, 1]`.
pub fn smoothstep(u: f64) -> f64 {
    let u = u.clamp(0.0, 1.0);
    u * u * (3.0 - 2.0 * u)
}

/// Component-wise linear interpolation of two joint vectors.
pub fn lerp_joints(a: [f64; 2], b: [f64; 2], s: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * s, a[1] + (b[1] - a[1]) * s]
}

/// The plan a motion command acquires when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlan {
    pub q_start: [f64; 2],
    pub q_target: [f64; 2],
    pub duration: f64,
    /// IK branch that produced `q_target`, for `MOVE_TO`.
    pub ik: Option<IkBranch>,
}

impl MotionPlan {
    pub fn new(
        model: &ArmModel,
        q_start: [f64; 2],
        q_target: [f64; 2],
        speed_scale: f64,
        ik: Option<IkBranch>,
    ) -> Self {
        Self {
            q_start,
            q_target,
            duration: compute_duration(model, q_start, q_target, speed_scale),
            ik,
        }
    }

    /// Normalized progress after `elapsed` seconds, clamped to `[0, 1]`.
    pub fn progress(&self, elapsed: f64) -> f64 {
        (elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Eased pose at normalized progress `u`; exactly `q_target` at `u >= 1`.
    pub fn pose_at(&self, u: f64) -> [f64; 2] {
        if u >= 1.0 {
            return self.q_target;
        }
        lerp_joints(self.q_start, self.q_target, smoothstep(u))
    }

    /// Re-time the motion for a new speed scale, returning the elapsed time
    /// that keeps the current progress unchanged.
    pub fn retime(&mut self, model: &ArmModel, elapsed: f64, speed_scale: f64) -> f64 {
        let u = self.progress(elapsed);
        self.duration = compute_duration(model, self.q_start, self.q_target, speed_scale);
        u * self.duration
    }
}
