//! [`ArmSnapshot`] – the read-only view a render consumer polls each frame.

use armsim_types::{CommandId, Point2};
use serde::Serialize;

use crate::toolpath::Toolpath;

/// A frozen copy of the arm state taken at a tick boundary.
///
/// Owning its data means a renderer can hold it across frames while the
/// engine keeps integrating; nothing flows back into scheduling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmSnapshot {
    /// Joint angles, radians.
    pub q: [f64; 2],
    pub elbow: Point2,
    pub effector: Point2,
    /// Shares sealed chunks with the engine's trace.
    pub toolpath: Toolpath,
    pub busy: bool,
    pub queue_len: usize,
    pub speed_scale: f64,
    /// Id of the running command.
    pub current: Option<CommandId>,
}

impl ArmSnapshot {
    /// Joint angles in degrees, for display.
    pub fn joints_deg(&self) -> [f64; 2] {
        [self.q[0].to_degrees(), self.q[1].to_degrees()]
    }
}
