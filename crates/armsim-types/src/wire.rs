//! JSON wire forms of the agent protocol.
//!
//! Inbound, one object per command:
//!
//! | `kind` | Fields | Notes |
//! |---|---|---|
//! | `HOME` | `id` | |
//! | `SET_JOINTS` | `id`, `deg: [a, b, ..]` | at least 2 angles, extra ones ignored |
//! | `MOVE_TO` | `id`, `x`, `y` | |
//! | `SLEEP` | `id`, `seconds` | |
//! | `LINE_TO` | `id`, `x`, `y`, `steps?` | `steps` defaults to 50, truncated, min 2 |
//!
//! Any other `kind` still decodes (as [`CommandKind::Unknown`]) so the engine
//! can fail it in queue order. Outbound, each completion becomes
//! `{"id", "ok": true, "ik"?, "note"?}` or `{"id", "ok": false, "error"}`.
//!
//! ```rust
//! use armsim_types::{Command, CommandKind};
//! use serde_json::json;
//!
//! let cmd = Command::from_wire(&json!({"id": "c1", "kind": "LINE_TO", "x": 1.0, "y": 0.2}))
//!     .unwrap();
//! assert!(matches!(cmd.kind, CommandKind::LineTo { steps: 50, .. }));
//! ```

use schemars::schema::RootSchema;
use serde_json::{Map, Value, json};

use crate::{
    ArmError, Command, CommandId, CommandKind, CompletionEvent, DEFAULT_LINE_STEPS,
    coerce_line_steps,
};

impl Command {
    /// Decode one inbound protocol message.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] when the message is not an
    /// object, lacks `id`/`kind`, or a required payload field is missing or
    /// malformed. Unknown kinds are not an error here.
    pub fn from_wire(value: &Value) -> Result<Self, ArmError> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("command must be a JSON object"))?;

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.is_empty() => CommandId::new(s.clone()),
            Some(Value::Number(n)) => CommandId::new(n.to_string()),
            _ => return Err(invalid("command is missing a string 'id'")),
        };
        let kind = obj
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("command is missing a string 'kind'"))?;

        let kind = match kind {
            "HOME" => CommandKind::Home,
            "SET_JOINTS" => {
                let deg = obj
                    .get("deg")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid("SET_JOINTS requires a 'deg' array"))?;
                if deg.len() < 2 {
                    return Err(invalid(format!(
                        "SET_JOINTS requires at least 2 angles, got {}",
                        deg.len()
                    )));
                }
                let a = deg[0]
                    .as_f64()
                    .ok_or_else(|| invalid("SET_JOINTS deg[0] must be a number"))?;
                let b = deg[1]
                    .as_f64()
                    .ok_or_else(|| invalid("SET_JOINTS deg[1] must be a number"))?;
                CommandKind::SetJoints { deg: [a, b] }
            }
            "MOVE_TO" => CommandKind::MoveTo {
                x: number(obj, kind, "x")?,
                y: number(obj, kind, "y")?,
            },
            "SLEEP" => CommandKind::Sleep {
                seconds: number(obj, kind, "seconds")?,
            },
            "LINE_TO" => {
                let steps = match obj.get("steps") {
                    None | Some(Value::Null) => DEFAULT_LINE_STEPS,
                    Some(_) => coerce_line_steps(number(obj, kind, "steps")?),
                };
                CommandKind::LineTo {
                    x: number(obj, kind, "x")?,
                    y: number(obj, kind, "y")?,
                    steps,
                }
            }
            other => CommandKind::Unknown {
                name: other.to_string(),
            },
        };

        Ok(Command { id, kind })
    }

    /// Parse and decode a raw JSON message.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] for malformed JSON as well as for
    /// everything [`Command::from_wire`] rejects.
    pub fn from_wire_str(raw: &str) -> Result<Self, ArmError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| invalid(format!("malformed command JSON: {e}")))?;
        Self::from_wire(&value)
    }
}

impl CompletionEvent {
    /// Encode this completion for the agent.
    pub fn to_wire(&self) -> Value {
        match &self.result {
            Ok(done) => {
                let mut out = json!({ "id": self.id, "ok": true });
                if let Some(branch) = done.ik {
                    out["ik"] = json!(branch);
                }
                if let Some(note) = done.note {
                    out["note"] = json!(note);
                }
                out
            }
            Err(e) => json!({ "id": self.id, "ok": false, "error": e.code() }),
        }
    }
}

/// JSON Schema of a [`Command`], for agents that validate before sending.
pub fn command_schema() -> RootSchema {
    schemars::schema_for!(Command)
}

fn invalid(msg: impl Into<String>) -> ArmError {
    ArmError::InvalidArgument(msg.into())
}

fn number(obj: &Map<String, Value>, kind: &str, field: &str) -> Result<f64, ArmError> {
    obj.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid(format!("{kind} requires a numeric '{field}'")))
}
