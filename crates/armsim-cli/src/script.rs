//! Line-oriented arm scripts.
//!
//! One statement per line; `#` starts a comment. Keywords are
//! case-insensitive, angles are degrees, lengths metres, times seconds.
//!
//! ```text
//! home
//! set_joints 30 -45
//! move_to 1.2 0.4
//! line_to 0.8 0.8 20     # steps optional
//! sleep 0.5
//! speed 0.25
//! reset_path
//! stop
//! reset
//! status
//! {"id": "a1", "kind": "MOVE_TO", "x": 1.0, "y": 0.5}
//! ```
//!
//! A line starting with `{` is a raw wire command and keeps its own id.

use std::io::Write;

use armsim_runtime::ArmClient;
use armsim_types::{ArmError, Command, CommandKind, CompletionEvent, coerce_line_steps};
use serde_json::{Value, json};

/// One parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A command queued under a generated id.
    Run(CommandKind),
    /// A raw wire command.
    Wire(Command),
    Speed(f64),
    ResetPath,
    Stop,
    Reset,
    Status,
}

/// What a statement produced, printable as one JSON line.
#[derive(Debug, Clone)]
pub enum Outcome {
    Completed(CompletionEvent),
    Ack(Value),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Completed(event) if !event.is_ok())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Outcome::Completed(event) => event.to_wire(),
            Outcome::Ack(value) => value.clone(),
        }
    }
}

fn bad(msg: impl Into<String>) -> ArmError {
    ArmError::InvalidArgument(msg.into())
}

fn arg(words: &[&str], index: usize, what: &str) -> Result<f64, ArmError> {
    let raw = words
        .get(index)
        .ok_or_else(|| bad(format!("{} expects {what}", words[0])))?;
    raw.parse::<f64>()
        .map_err(|_| bad(format!("{}: '{raw}' is not a number", words[0])))
}

fn arity(words: &[&str], max: usize) -> Result<(), ArmError> {
    if words.len() > max + 1 {
        return Err(bad(format!("{} takes at most {max} argument(s)", words[0])));
    }
    Ok(())
}

/// Parse one line. Blank lines and comments yield `None`.
///
/// # Errors
///
/// [`ArmError::InvalidArgument`] for unknown keywords, missing or
/// non-numeric arguments and malformed JSON.
pub fn parse_line(line: &str, line_steps: u32) -> Result<Option<Statement>, ArmError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.starts_with('{') {
        return Command::from_wire_str(line).map(|cmd| Some(Statement::Wire(cmd)));
    }

    let code = line.split('#').next().unwrap_or_default();
    let words: Vec<&str> = code.split_whitespace().collect();
    let Some(keyword) = words.first() else {
        return Ok(None);
    };

    let stmt = match keyword.to_ascii_lowercase().as_str() {
        "home" => {
            arity(&words, 0)?;
            Statement::Run(CommandKind::Home)
        }
        "set_joints" => {
            arity(&words, 2)?;
            let a = arg(&words, 1, "two angles")?;
            let b = arg(&words, 2, "two angles")?;
            Statement::Run(CommandKind::SetJoints { deg: [a, b] })
        }
        "move_to" => {
            arity(&words, 2)?;
            Statement::Run(CommandKind::MoveTo {
                x: arg(&words, 1, "x and y")?,
                y: arg(&words, 2, "x and y")?,
            })
        }
        "sleep" => {
            arity(&words, 1)?;
            Statement::Run(CommandKind::Sleep {
                seconds: arg(&words, 1, "a duration")?,
            })
        }
        "line_to" => {
            arity(&words, 3)?;
            let steps = if words.len() > 3 {
                coerce_line_steps(arg(&words, 3, "a step count")?)
            } else {
                line_steps
            };
            Statement::Run(CommandKind::LineTo {
                x: arg(&words, 1, "x and y")?,
                y: arg(&words, 2, "x and y")?,
                steps,
            })
        }
        "speed" => {
            arity(&words, 1)?;
            Statement::Speed(arg(&words, 1, "a speed scale")?)
        }
        "reset_path" => Statement::ResetPath,
        "stop" => Statement::Stop,
        "reset" => Statement::Reset,
        "status" => Statement::Status,
        other => return Err(bad(format!("unknown statement '{other}'"))),
    };
    Ok(Some(stmt))
}

/// Execute one statement, waiting for the command to complete.
///
/// # Errors
///
/// Only [`ArmError::Channel`] when the simulation driver is gone; command
/// failures come back as [`Outcome::Completed`].
pub async fn execute(arm: &ArmClient, stmt: Statement) -> Result<Outcome, ArmError> {
    let outcome = match stmt {
        Statement::Run(kind) => {
            let pending = arm.submit(kind).await?;
            let id = pending.id().clone();
            Outcome::Completed(CompletionEvent::new(id, pending.wait().await))
        }
        Statement::Wire(cmd) => {
            let id = cmd.id.clone();
            match arm.execute_command(cmd).await {
                Err(e @ ArmError::Channel(_)) => return Err(e),
                result => Outcome::Completed(CompletionEvent::new(id, result)),
            }
        }
        Statement::Speed(value) => {
            arm.set_speed(value).await?;
            Outcome::Ack(json!({ "op": "speed", "value": value }))
        }
        Statement::ResetPath => {
            arm.reset_path().await?;
            Outcome::Ack(json!({ "op": "reset_path" }))
        }
        Statement::Stop => {
            let aborted = arm.stop().await?;
            Outcome::Ack(json!({ "op": "stop", "aborted": aborted }))
        }
        Statement::Reset => {
            let aborted = arm.hard_reset().await?;
            Outcome::Ack(json!({ "op": "reset", "aborted": aborted }))
        }
        Statement::Status => {
            let snap = arm.snapshot();
            let [q1, q2] = snap.joints_deg();
            Outcome::Ack(json!({
                "op": "status",
                "joints_deg": [q1, q2],
                "effector": { "x": snap.effector.x, "y": snap.effector.y },
                "busy": snap.busy,
                "queue_len": snap.queue_len,
                "speed": snap.speed_scale,
                "current": snap.current,
                "toolpath_len": snap.toolpath.len(),
            }))
        }
    };
    Ok(outcome)
}

/// Run a whole script, writing one JSON line per statement to `out`.
/// Stops at the first failed command. Returns the number of statements run.
///
/// # Errors
///
/// A message naming the offending line for parse errors, failed commands and
/// a lost driver.
pub async fn run_script<W: Write>(
    arm: &ArmClient,
    source: &str,
    line_steps: u32,
    out: &mut W,
) -> Result<usize, String> {
    let mut executed = 0;
    for (index, line) in source.lines().enumerate() {
        let lineno = index + 1;
        let stmt = match parse_line(line, line_steps) {
            Ok(Some(stmt)) => stmt,
            Ok(None) => continue,
            Err(e) => return Err(format!("line {lineno}: {e}")),
        };
        let outcome = execute(arm, stmt)
            .await
            .map_err(|e| format!("line {lineno}: {e}"))?;
        writeln!(out, "{}", outcome.to_json())
            .map_err(|e| format!("Failed to write output: {e}"))?;
        executed += 1;
        if outcome.is_failure() {
            return Err(format!("line {lineno}: command failed: {}", line.trim()));
        }
    }
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use armsim_engine::SimulationContext;
    use armsim_runtime::{DriverConfig, SimulationDriver};
    use armsim_types::{ArmModel, JointLimits};

    fn parse(line: &str) -> Option<Statement> {
        parse_line(line, 50).expect("parses")
    }

    #[test]
    fn parses_every_statement() {
        assert_eq!(parse("home"), Some(Statement::Run(CommandKind::Home)));
        assert_eq!(
            parse("SET_JOINTS 30 -45"),
            Some(Statement::Run(CommandKind::SetJoints { deg: [30.0, -45.0] }))
        );
        assert_eq!(
            parse("move_to 1.2 0.4"),
            Some(Statement::Run(CommandKind::MoveTo { x: 1.2, y: 0.4 }))
        );
        assert_eq!(
            parse("sleep 0.5"),
            Some(Statement::Run(CommandKind::Sleep { seconds: 0.5 }))
        );
        assert_eq!(parse("speed 0.25"), Some(Statement::Speed(0.25)));
        assert_eq!(parse("reset_path"), Some(Statement::ResetPath));
        assert_eq!(parse("stop"), Some(Statement::Stop));
        assert_eq!(parse("reset"), Some(Statement::Reset));
        assert_eq!(parse("status"), Some(Statement::Status));
    }

    #[test]
    fn line_to_steps_default_and_coerce() {
        assert_eq!(
            parse_line("line_to 1 1", 12).unwrap(),
            Some(Statement::Run(CommandKind::LineTo { x: 1.0, y: 1.0, steps: 12 }))
        );
        assert_eq!(
            parse("line_to 1 1 7.9"),
            Some(Statement::Run(CommandKind::LineTo { x: 1.0, y: 1.0, steps: 7 }))
        );
        assert_eq!(
            parse("line_to 1 1 0"),
            Some(Statement::Run(CommandKind::LineTo { x: 1.0, y: 1.0, steps: 2 }))
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   # just a note"), None);
        assert_eq!(
            parse("sleep 1  # wait a bit"),
            Some(Statement::Run(CommandKind::Sleep { seconds: 1.0 }))
        );
    }

    #[test]
    fn raw_json_keeps_its_id() {
        let stmt = parse(r#"{"id": "j1", "kind": "MOVE_TO", "x": 1.0, "y": 0.5}"#).unwrap();
        match stmt {
            Statement::Wire(cmd) => {
                assert_eq!(cmd.id.as_str(), "j1");
                assert_eq!(cmd.kind, CommandKind::MoveTo { x: 1.0, y: 0.5 });
            }
            other => panic!("expected wire command, got {other:?}"),
        }
    }

    #[test]
    fn malformed_lines_are_rejected() {
        for line in [
            "move_to 1",
            "move_to one two",
            "set_joints 1 2 3",
            "fly 1 2",
            "{not json",
        ] {
            let err = parse_line(line, 50).unwrap_err();
            assert_eq!(err.code(), "invalid-argument", "line {line:?}");
        }
    }

    fn fast_arm() -> (ArmClient, tokio::task::JoinHandle<()>) {
        let model = ArmModel::new(
            1.0,
            0.75,
            [
                JointLimits::new(-std::f64::consts::PI, std::f64::consts::PI),
                JointLimits::from_degrees(-150.0, 150.0),
            ],
            1000.0,
        )
        .unwrap();
        let config = DriverConfig {
            frame_rate_hz: 250.0,
            ..DriverConfig::default()
        };
        SimulationDriver::spawn(SimulationContext::new(model), &config)
    }

    #[tokio::test]
    async fn script_runs_to_the_end() -> Result<(), Box<dyn std::error::Error>> {
        let (arm, _handle) = fast_arm();
        let script = "# warm-up\nset_joints 30 30\nmove_to 1.0 0.0\nline_to 1.2 0.3 2\nstatus\n";
        let mut out = Vec::new();

        let executed = run_script(&arm, script, 50, &mut out).await?;
        assert_eq!(executed, 4);

        let lines: Vec<Value> = String::from_utf8(out)?
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines[0]["ok"], true);
        assert!(lines[1]["ik"].is_string());
        assert_eq!(lines[2]["note"], "expanded");
        assert_eq!(lines[3]["op"], "status");
        Ok(())
    }

    #[tokio::test]
    async fn script_aborts_on_first_failure() -> Result<(), Box<dyn std::error::Error>> {
        let (arm, _handle) = fast_arm();
        let script = "home\nmove_to 5 0\nhome\n";
        let mut out = Vec::new();

        let err = run_script(&arm, script, 50, &mut out).await.unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");

        let text = String::from_utf8(out)?;
        let last: Value = serde_json::from_str(text.lines().last().ok_or("no output")?)?;
        assert_eq!(last["ok"], false);
        assert_eq!(last["error"], "unreachable");
        assert_eq!(text.lines().count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn wire_commands_report_under_their_own_id() -> Result<(), Box<dyn std::error::Error>> {
        let (arm, _handle) = fast_arm();

        let stmt = parse(r#"{"id": "w1", "kind": "SET_JOINTS", "deg": [20.0, 10.0]}"#)
            .ok_or("no statement")?;
        let Outcome::Completed(event) = execute(&arm, stmt).await? else {
            panic!("expected a completion");
        };
        assert_eq!(event.id.as_str(), "w1");
        assert!(event.is_ok());

        let stmt = parse(r#"{"id": "w1:2", "kind": "HOME"}"#).ok_or("no statement")?;
        let Outcome::Completed(event) = execute(&arm, stmt).await? else {
            panic!("expected a completion");
        };
        assert_eq!(event.id.as_str(), "w1:2");
        assert_eq!(event.to_wire()["error"], "invalid-argument");
        Ok(())
    }

    #[tokio::test]
    async fn parse_errors_name_the_line() {
        let (arm, _handle) = fast_arm();
        let mut out = Vec::new();
        let err = run_script(&arm, "home\n\nwiggle\n", 50, &mut out)
            .await
            .unwrap_err();
        assert!(err.starts_with("line 3"), "{err}");
    }
}
