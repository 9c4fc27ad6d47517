//! `armsim-kinematics` – closed-form kinematics of a 2-link planar arm.
//!
//! - [`forward`] maps joint angles to the elbow and end-effector positions.
//! - [`inverse`] maps a target position to joint angles, choosing between the
//!   elbow-down and elbow-up branches and checking reachability and limits.
//!
//! Both are pure functions of an [`ArmModel`]; nothing here holds state.
//!
//! # Example
//!
//! ```rust
//! use armsim_kinematics::{forward, inverse};
//! use armsim_types::{ArmModel, Point2};
//!
//! let model = ArmModel::default();
//! let sol = inverse(&model, Point2::new(1.2, 0.4)).unwrap();
//! let fk = forward(&model, sol.q);
//! assert!((fk.effector.x - 1.2).abs() < 1e-9);
//! assert!((fk.effector.y - 0.4).abs() < 1e-9);
//! ```

use std::f64::consts::PI;

use armsim_types::{ArmError, ArmModel, IkBranch, Point2};
use tracing::trace;

/// Distance from ±1 within which the elbow cosine is treated as exactly ±1,
/// so targets on the annulus boundary survive rounding.
const BOUNDARY_EPS: f64 = 1e-9;

/// Positions of the two moving joints of the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FkPoints {
    /// End of link 1.
    pub elbow: Point2,
    /// End of link 2.
    pub effector: Point2,
}

/// A successful inverse-kinematics result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkSolution {
    /// Joint angles of the chosen branch, wrapped to `(-π, π]`.
    pub q: [f64; 2],
    /// Joint angles of the branch that was not taken.
    pub alt: [f64; 2],
    pub chosen: IkBranch,
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle.rem_euclid(2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Forward kinematics: elbow from `q1`, effector from `q1 + q2`.
pub fn forward(model: &ArmModel, q: [f64; 2]) -> FkPoints {
    let (s1, c1) = q[0].sin_cos();
    let (s12, c12) = (q[0] + q[1]).sin_cos();
    let elbow = Point2::new(model.link1 * c1, model.link1 * s1);
    let effector = Point2::new(elbow.x + model.link2 * c12, elbow.y + model.link2 * s12);
    FkPoints { elbow, effector }
}

/// Inverse kinematics for `target`.
///
/// Elbow-down is preferred whenever it satisfies the joint limits; elbow-up
/// is the fallback.
///
/// # Errors
///
/// - [`ArmError::Unreachable`] when `target` lies outside the annulus
///   `[|L1 - L2|, L1 + L2]`.
/// - [`ArmError::JointLimitExceeded`] when neither branch fits the limits.
pub fn inverse(model: &ArmModel, target: Point2) -> Result<IkSolution, ArmError> {
    let (l1, l2) = (model.link1, model.link2);
    let Point2 { x, y } = target;
    let mut c2 = (x * x + y * y - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
    if (c2 - 1.0).abs() < BOUNDARY_EPS {
        c2 = 1.0;
    } else if (c2 + 1.0).abs() < BOUNDARY_EPS {
        c2 = -1.0;
    }
    if !(-1.0..=1.0).contains(&c2) {
        trace!(x, y, c2, "ik target unreachable");
        return Err(ArmError::Unreachable { x, y });
    }

    let s2 = (1.0 - c2 * c2).max(0.0).sqrt();
    let branch = |q2: f64| {
        let q1 = y.atan2(x) - (l2 * q2.sin()).atan2(l1 + l2 * q2.cos());
        [wrap_angle(q1), wrap_angle(q2)]
    };
    let up = branch(s2.atan2(c2));
    let down = branch((-s2).atan2(c2));

    if model.within_limits(down) {
        Ok(IkSolution {
            q: down,
            alt: up,
            chosen: IkBranch::ElbowDown,
        })
    } else if model.within_limits(up) {
        Ok(IkSolution {
            q: up,
            alt: down,
            chosen: IkBranch::ElbowUp,
        })
    } else {
        trace!(x, y, ?up, ?down, "both ik branches violate joint limits");
        Err(ArmError::JointLimitExceeded { x, y })
    }
}
