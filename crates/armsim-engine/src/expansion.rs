//! Expansion of compound commands into primitive ones.
//!
//! A `LINE_TO` never drives the joints itself. When it starts, the straight
//! segment from the current effector position to its target is sampled into
//! `steps` waypoints, each becoming a `MOVE_TO` with id `"<parent>:<i>"`
//! (`i` from 1). The last waypoint is the target itself.

use armsim_types::{Command, CommandId, CommandKind, MIN_LINE_STEPS, Point2};

/// Sample the segment `from → to` into `steps` `MOVE_TO` commands.
///
/// `steps` below [`MIN_LINE_STEPS`] is raised to it.
pub fn expand_line(parent: &CommandId, from: Point2, to: Point2, steps: u32) -> Vec<Command> {
    let steps = steps.max(MIN_LINE_STEPS);
    (1..=steps)
        .map(|i| {
            let p = from.lerp(to, f64::from(i) / f64::from(steps));
            Command::new(parent.sub(i), CommandKind::MoveTo { x: p.x, y: p.y })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(cmd: &Command) -> Point2 {
        match cmd.kind {
            CommandKind::MoveTo { x, y } => Point2::new(x, y),
            ref other => panic!("expected MOVE_TO, got {other:?}"),
        }
    }

    #[test]
    fn ten_steps_are_evenly_spaced_and_end_on_target() {
        let from = Point2::new(1.75, 0.0);
        let to = Point2::new(0.75, 1.0);
        let cmds = expand_line(&"L".into(), from, to, 10);
        assert_eq!(cmds.len(), 10);
        for (i, cmd) in cmds.iter().enumerate() {
            let t = (i + 1) as f64 / 10.0;
            let p = target(cmd);
            assert!((p.x - (from.x + (to.x - from.x) * t)).abs() < 1e-12);
            assert!((p.y - (from.y + (to.y - from.y) * t)).abs() < 1e-12);
            assert_eq!(cmd.id.as_str(), format!("L:{}", i + 1));
        }
        assert_eq!(target(&cmds[9]), to);
    }

    #[test]
    fn step_count_is_floored() {
        let cmds = expand_line(&"L".into(), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0), 0);
        assert_eq!(cmds.len(), MIN_LINE_STEPS as usize);
        assert_eq!(target(&cmds[1]), Point2::new(1.0, 1.0));
    }
}
