//! `armsim-types` – shared data model for the planar arm simulator.
//!
//! Every other crate in the workspace speaks in these types: the immutable
//! [`ArmModel`], the [`Command`] set issued by a script agent, the
//! [`CompletionEvent`] reported back per command id, and the single domain
//! error [`ArmError`].
//!
//! The inbound/outbound JSON wire forms live in [`wire`].

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod wire;

pub use wire::command_schema;

/// Number of waypoints a `LINE_TO` expands into when the agent gives none.
pub const DEFAULT_LINE_STEPS: u32 = 50;

/// Smallest accepted `LINE_TO` step count.
pub const MIN_LINE_STEPS: u32 = 2;

/// Largest accepted `LINE_TO` step count; larger requests are clamped.
pub const MAX_LINE_STEPS: u32 = 10_000;

/// A point in the arm's base frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance from the base origin.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Linear interpolation towards `other`; `t = 1` yields `other` exactly.
    pub fn lerp(&self, other: Point2, t: f64) -> Point2 {
        if t >= 1.0 {
            return other;
        }
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Arm configuration
// ────────────────────────────────────────────────────────────────────────────

/// Inclusive angular range of a single joint, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min: f64,
    pub max: f64,
}

impl JointLimits {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Build limits from a `[min, max]` pair given in degrees.
    pub fn from_degrees(min_deg: f64, max_deg: f64) -> Self {
        Self::new(min_deg.to_radians(), max_deg.to_radians())
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.min, self.max)
    }
}

/// Immutable description of a 2-link planar arm.
///
/// Construct through [`ArmModel::new`] so the geometric invariants
/// (`link1, link2 > 0`, `min <= max` per joint, positive speed) are checked
/// once; the engine relies on them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmModel {
    /// Shoulder-to-elbow length (L1).
    pub link1: f64,
    /// Elbow-to-effector length (L2).
    pub link2: f64,
    /// Angular limits for the shoulder (index 0) and elbow (index 1).
    pub limits: [JointLimits; 2],
    /// Maximum angular speed of either joint, rad/s.
    pub max_joint_speed: f64,
}

impl ArmModel {
    /// Validate and build a model.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] when a link length or the speed
    /// is not strictly positive and finite, or when a joint range is inverted.
    pub fn new(
        link1: f64,
        link2: f64,
        limits: [JointLimits; 2],
        max_joint_speed: f64,
    ) -> Result<Self, ArmError> {
        if !(link1.is_finite() && link1 > 0.0 && link2.is_finite() && link2 > 0.0) {
            return Err(ArmError::InvalidArgument(format!(
                "link lengths must be positive, got L1={link1} L2={link2}"
            )));
        }
        for (i, lim) in limits.iter().enumerate() {
            if !(lim.min.is_finite() && lim.max.is_finite()) || lim.min > lim.max {
                return Err(ArmError::InvalidArgument(format!(
                    "joint {} limits [{}, {}] are not a valid range",
                    i + 1,
                    lim.min,
                    lim.max
                )));
            }
        }
        if !(max_joint_speed.is_finite() && max_joint_speed > 0.0) {
            return Err(ArmError::InvalidArgument(format!(
                "max joint speed must be positive, got {max_joint_speed}"
            )));
        }
        Ok(Self {
            link1,
            link2,
            limits,
            max_joint_speed,
        })
    }

    /// Outer radius of the reachable annulus.
    pub fn max_reach(&self) -> f64 {
        self.link1 + self.link2
    }

    /// Inner radius of the reachable annulus (the dead zone around the base).
    pub fn min_reach(&self) -> f64 {
        (self.link1 - self.link2).abs()
    }

    /// `true` when both joint angles lie inside their limits.
    pub fn within_limits(&self, q: [f64; 2]) -> bool {
        self.limits[0].contains(q[0]) && self.limits[1].contains(q[1])
    }

    /// Clamp each joint angle into its limits.
    pub fn clamp_joints(&self, q: [f64; 2]) -> [f64; 2] {
        [self.limits[0].clamp(q[0]), self.limits[1].clamp(q[1])]
    }
}

impl Default for ArmModel {
    /// A 1.0 m + 0.75 m arm with a free shoulder, a ±150° elbow and
    /// 2 rad/s joints.
    fn default() -> Self {
        Self {
            link1: 1.0,
            link2: 0.75,
            limits: [
                JointLimits::new(-std::f64::consts::PI, std::f64::consts::PI),
                JointLimits::from_degrees(-150.0, 150.0),
            ],
            max_joint_speed: 2.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Commands
// ────────────────────────────────────────────────────────────────────────────

/// Correlation key of a command. Expanded sub-commands derive theirs from the
/// parent as `"<parent>:<index>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id for agents that do not name their commands.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id of the `index`-th command expanded from this one.
    pub fn sub(&self, index: u32) -> Self {
        Self(format!("{}:{}", self.0, index))
    }

    /// Whether this id has the `"<parent>:<index>"` shape that expansion
    /// produces.
    pub fn is_sub_id(&self) -> bool {
        self.0
            .rsplit_once(':')
            .is_some_and(|(_, index)| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CommandId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The command set understood by the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Drive both joints back to `[0, 0]`.
    Home,
    /// Drive to the given joint angles (degrees); clamped to the limits.
    SetJoints { deg: [f64; 2] },
    /// Drive the end-effector to `(x, y)` through inverse kinematics.
    MoveTo { x: f64, y: f64 },
    /// Occupy the engine for `seconds` without moving.
    Sleep { seconds: f64 },
    /// Straight-line effector motion, expanded into `steps` `MOVE_TO`s.
    LineTo { x: f64, y: f64, steps: u32 },
    /// A kind the engine does not implement; fails with `unknown-cmd` when it
    /// reaches the head of the queue.
    Unknown { name: String },
}

impl CommandKind {
    /// The wire name of this kind (`"MOVE_TO"`, …).
    pub fn name(&self) -> &str {
        match self {
            CommandKind::Home => "HOME",
            CommandKind::SetJoints { .. } => "SET_JOINTS",
            CommandKind::MoveTo { .. } => "MOVE_TO",
            CommandKind::Sleep { .. } => "SLEEP",
            CommandKind::LineTo { .. } => "LINE_TO",
            CommandKind::Unknown { name } => name,
        }
    }

    /// Reject payloads the engine cannot act on (non-finite numbers).
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] naming the offending field.
    pub fn validate(&self) -> Result<(), ArmError> {
        let fields: Vec<(&str, f64)> = match self {
            CommandKind::SetJoints { deg } => vec![("deg[0]", deg[0]), ("deg[1]", deg[1])],
            CommandKind::MoveTo { x, y } | CommandKind::LineTo { x, y, .. } => {
                vec![("x", *x), ("y", *y)]
            }
            CommandKind::Sleep { seconds } => vec![("seconds", *seconds)],
            CommandKind::Home | CommandKind::Unknown { .. } => Vec::new(),
        };
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ArmError::InvalidArgument(format!(
                    "{} field '{field}' must be finite, got {value}",
                    self.name()
                )));
            }
        }
        Ok(())
    }
}

/// A command together with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Command {
    pub id: CommandId,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn new(id: impl Into<CommandId>, kind: CommandKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Coerce a raw `LINE_TO` step count: truncate toward zero, then clamp into
/// `[MIN_LINE_STEPS, MAX_LINE_STEPS]`. `NaN` counts as zero.
pub fn coerce_line_steps(raw: f64) -> u32 {
    let truncated = raw as i64; // saturating, NaN -> 0
    truncated.clamp(MIN_LINE_STEPS as i64, MAX_LINE_STEPS as i64) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Completion
// ────────────────────────────────────────────────────────────────────────────

/// Which of the two inverse-kinematics branches produced a joint solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum IkBranch {
    ElbowUp,
    ElbowDown,
}

impl std::fmt::Display for IkBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IkBranch::ElbowUp => write!(f, "elbow-up"),
            IkBranch::ElbowDown => write!(f, "elbow-down"),
        }
    }
}

/// Annotation attached to a successful completion that did no motion itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionNote {
    /// The command was rewritten into sub-commands.
    Expanded,
}

/// Diagnostic payload of a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Completion {
    /// IK branch the motion used, for `MOVE_TO`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ik: Option<IkBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<CompletionNote>,
}

impl Completion {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn with_ik(branch: IkBranch) -> Self {
        Self {
            ik: Some(branch),
            note: None,
        }
    }

    pub fn expanded() -> Self {
        Self {
            ik: None,
            note: Some(CompletionNote::Expanded),
        }
    }
}

/// Outcome of a single command as reported to the agent.
pub type CommandResult = Result<Completion, ArmError>;

/// Emitted exactly once per command id when the command leaves the engine,
/// whether it finished, failed, or was stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: CommandId,
    pub timestamp: DateTime<Utc>,
    pub result: CommandResult,
}

impl CompletionEvent {
    pub fn new(id: CommandId, result: CommandResult) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            result,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every failure a command or the runtime around it can report.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmError {
    #[error("Unreachable target ({x}, {y})")]
    Unreachable { x: f64, y: f64 },

    #[error("Joint limits exceeded by both IK branches for ({x}, {y})")]
    JointLimitExceeded { x: f64, y: f64 },

    #[error("Unknown command kind '{0}'")]
    UnknownCommand(String),

    #[error("Command stopped")]
    Stopped,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl ArmError {
    /// Stable error string used on the completion wire.
    pub fn code(&self) -> &'static str {
        match self {
            ArmError::Unreachable { .. } => "unreachable",
            ArmError::JointLimitExceeded { .. } => "joint-limits",
            ArmError::UnknownCommand(_) => "unknown-cmd",
            ArmError::Stopped => "stopped",
            ArmError::InvalidArgument(_) => "invalid-argument",
            ArmError::Channel(_) => "channel",
        }
    }
}
