//! Breakpoint store and matching.

use crate::context::{DebugContext, DebugRecordKind, DebuggerState};

/// What a breakpoint matches against.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakpointKind {
    /// Numeric source line.
    Line,
    /// Enclosing function name.
    Function,
    /// Boolean condition. Arbitrary expression evaluation is not
    /// implemented; only the literal location `"true"` matches. The
    /// evaluator seam is [`DebugContext::check_breakpoint`].
    Condition,
}

impl BreakpointKind {
    pub fn label(self) -> &'static str {
        match self {
            BreakpointKind::Line => "line",
            BreakpointKind::Function => "function",
            BreakpointKind::Condition => "condition",
        }
    }
}

/// One registered breakpoint.
///
/// Ids increase monotonically and are never reused, even after removal.
#[derive(Clone, Debug)]
pub struct Breakpoint {
    pub id: u32,
    pub kind: BreakpointKind,
    pub location: String,
    pub enabled: bool,
    pub hit_count: u32,
}

impl DebugContext {
    /// Register a breakpoint and return its id.
    ///
    /// Newest breakpoints are stored first.
    pub fn set_breakpoint(&mut self, kind: BreakpointKind, location: &str) -> u32 {
        let id = self.next_breakpoint_id;
        self.next_breakpoint_id += 1;
        self.breakpoints.insert(
            0,
            Breakpoint {
                id,
                kind,
                location: location.to_owned(),
                enabled: true,
                hit_count: 0,
            },
        );
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!("Set breakpoint {id} at {location}"),
        );
        id
    }

    /// Remove a breakpoint. Returns false if the id is unknown.
    pub fn remove_breakpoint(&mut self, id: u32) -> bool {
        let Some(idx) = self.breakpoints.iter().position(|bp| bp.id == id) else {
            return false;
        };
        self.breakpoints.remove(idx);
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!("Removed breakpoint {id}"),
        );
        true
    }

    /// Enable or disable a breakpoint. Returns false if the id is unknown.
    pub fn enable_breakpoint(&mut self, id: u32, enabled: bool) -> bool {
        let Some(bp) = self.breakpoints.iter_mut().find(|bp| bp.id == id) else {
            return false;
        };
        bp.enabled = enabled;
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!(
                "{} breakpoint {id}",
                if enabled { "Enabled" } else { "Disabled" }
            ),
        );
        true
    }

    /// Check breakpoints of one kind against the current position.
    ///
    /// `location` is the current value for that kind: the current line (as
    /// digits) for `Line`, the enclosing function name for `Function`.
    /// Condition breakpoints ignore it and match only the stored literal
    /// `"true"` until an expression evaluator exists.
    ///
    /// On the first match: the hit counter increments, a record is
    /// emitted, the state becomes [`DebuggerState::Break`], and the id is
    /// returned. Returns 0 when nothing matched. A `Finished` debugger
    /// never matches.
    pub fn check_breakpoint(&mut self, kind: BreakpointKind, location: &str) -> u32 {
        if self.state == DebuggerState::Finished {
            return 0;
        }

        let mut hit: Option<(u32, String, u32)> = None;
        for bp in &mut self.breakpoints {
            if !bp.enabled || bp.kind != kind {
                continue;
            }
            let matched = match kind {
                BreakpointKind::Line => match (bp.location.parse::<u32>(), location.parse::<u32>())
                {
                    (Ok(at), Ok(current)) => at == current,
                    _ => false,
                },
                BreakpointKind::Function => bp.location == location,
                BreakpointKind::Condition => bp.location == "true",
            };
            if matched {
                bp.hit_count += 1;
                hit = Some((bp.id, bp.location.clone(), bp.hit_count));
                break;
            }
        }

        let Some((id, location, count)) = hit else {
            return 0;
        };
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!("Breakpoint {id} hit at {location} (hit count: {count})"),
        );
        self.state = DebuggerState::Break;
        id
    }

    /// All registered breakpoints, newest first.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }
}
