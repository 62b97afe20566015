//! The debug context: record stream, location tracking, debugger state.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::time::Instant;

use crate::breakpoint::{Breakpoint, BreakpointKind};

/// Verbosity of the debug record stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum DebugLevel {
    None,
    Basic,
    Detailed,
    Verbose,
}

/// Kind tag on each emitted debug record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DebugRecordKind {
    Variable,
    Call,
    Return,
    LoopStart,
    LoopEnd,
    Condition,
    Memory,
    Performance,
    Breakpoint,
}

impl DebugRecordKind {
    pub fn label(self) -> &'static str {
        match self {
            DebugRecordKind::Variable => "VAR",
            DebugRecordKind::Call => "CALL",
            DebugRecordKind::Return => "RET",
            DebugRecordKind::LoopStart => "LOOP_START",
            DebugRecordKind::LoopEnd => "LOOP_END",
            DebugRecordKind::Condition => "COND",
            DebugRecordKind::Memory => "MEM",
            DebugRecordKind::Performance => "PERF",
            DebugRecordKind::Breakpoint => "BP",
        }
    }
}

/// Debugger state machine.
///
/// `Finished` is terminal: once reached, breakpoint checks are no-ops and
/// the interactive loop is never re-entered. `Stopped` exists for API
/// completeness but is not reachable from hook logic.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DebuggerState {
    Running,
    Stopped,
    Break,
    Step,
    Finished,
}

/// Shared state between the lowering engine and the runtime hook.
///
/// Owns the breakpoint store, the record output sink, and the current
/// execution location. Lives for one compilation+execution run.
pub struct DebugContext {
    level: DebugLevel,
    enabled: bool,
    sink: Box<dyn Write + Send>,
    indent: usize,
    start: Instant,
    perf_enabled: bool,
    perf_started: Option<Instant>,
    pub(crate) breakpoints: Vec<Breakpoint>,
    pub(crate) next_breakpoint_id: u32,
    pub(crate) state: DebuggerState,
    pub(crate) current_line: u32,
    pub(crate) current_function: Option<String>,
}

impl fmt::Debug for DebugContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugContext")
            .field("level", &self.level)
            .field("enabled", &self.enabled)
            .field("state", &self.state)
            .field("breakpoints", &self.breakpoints.len())
            .finish_non_exhaustive()
    }
}

impl DebugContext {
    /// Create a context writing records to stdout.
    pub fn new(level: DebugLevel) -> Self {
        Self::with_sink(level, Box::new(io::stdout()))
    }

    /// Create a context writing records to a file.
    pub fn with_output_file(level: DebugLevel, path: &str) -> io::Result<Self> {
        Ok(Self::with_sink(level, Box::new(File::create(path)?)))
    }

    /// Create a context writing records to an arbitrary sink.
    pub fn with_sink(level: DebugLevel, sink: Box<dyn Write + Send>) -> Self {
        DebugContext {
            level,
            enabled: true,
            sink,
            indent: 0,
            start: Instant::now(),
            perf_enabled: level >= DebugLevel::Detailed,
            perf_started: None,
            breakpoints: Vec::new(),
            next_breakpoint_id: 1,
            state: DebuggerState::Running,
            current_line: 0,
            current_function: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
        self.perf_enabled = level >= DebugLevel::Detailed;
    }

    pub fn level(&self) -> DebugLevel {
        self.level
    }

    pub fn state(&self) -> DebuggerState {
        self.state
    }

    pub fn set_state(&mut self, state: DebuggerState) {
        self.state = state;
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!("Debugger state changed to {state:?}"),
        );
    }

    /// Request a single step: stop at the next hook call.
    pub fn step(&mut self) {
        self.state = DebuggerState::Step;
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!("Stepping to next instruction"),
        );
    }

    /// Resume free-running execution.
    pub fn resume(&mut self) {
        self.state = DebuggerState::Running;
        self.log(
            DebugRecordKind::Breakpoint,
            format_args!("Continuing execution"),
        );
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }

    /// Record the current execution position and re-check line and
    /// function breakpoints against it.
    pub fn set_location(&mut self, line: u32, function: &str) {
        self.current_line = line;
        self.current_function = Some(function.to_owned());

        self.check_breakpoint(BreakpointKind::Line, &line.to_string());
        self.check_breakpoint(BreakpointKind::Function, function);
    }

    // -- Record emission --

    fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Emit one record to the sink, subject to level filtering.
    ///
    /// Memory and performance records require at least `Detailed`.
    pub fn log(&mut self, kind: DebugRecordKind, args: fmt::Arguments<'_>) {
        if !self.enabled || self.level == DebugLevel::None {
            return;
        }
        if matches!(
            kind,
            DebugRecordKind::Memory | DebugRecordKind::Performance
        ) && self.level < DebugLevel::Detailed
        {
            return;
        }

        let ts = self.elapsed_ms();
        let indent = "  ".repeat(self.indent);
        let _ = writeln!(self.sink, "[{ts:.3}] {indent}{}: {args}", kind.label());
        let _ = self.sink.flush();
    }

    pub fn log_variable(&mut self, name: &str, ty: &str, value: &str) {
        self.log(
            DebugRecordKind::Variable,
            format_args!("{name} ({ty}) = {value}"),
        );
    }

    /// Record entry into a call; subsequent records are indented one level
    /// deeper until the matching [`log_return`](Self::log_return).
    pub fn log_call(&mut self, function: &str, args: &[&str]) {
        if !self.enabled || self.level < DebugLevel::Basic {
            return;
        }
        self.log(
            DebugRecordKind::Call,
            format_args!("{function}({})", args.join(", ")),
        );
        self.indent_increase();
    }

    pub fn log_return(&mut self, function: &str, value: Option<&str>) {
        if !self.enabled || self.level < DebugLevel::Basic {
            return;
        }
        self.indent_decrease();
        self.log(
            DebugRecordKind::Return,
            format_args!("{function} -> {}", value.unwrap_or("void")),
        );
    }

    pub fn log_loop_start(&mut self, loop_kind: &str, iteration: u32) {
        self.log(
            DebugRecordKind::LoopStart,
            format_args!("{loop_kind} loop iteration {iteration}"),
        );
        self.indent_increase();
    }

    pub fn log_loop_end(&mut self, loop_kind: &str) {
        self.indent_decrease();
        self.log(
            DebugRecordKind::LoopEnd,
            format_args!("{loop_kind} loop ended"),
        );
    }

    pub fn log_condition(&mut self, condition: &str, result: bool) {
        self.log(
            DebugRecordKind::Condition,
            format_args!("{condition} -> {result}"),
        );
    }

    pub fn log_memory(&mut self, allocated: usize, freed: usize) {
        if allocated > 0 {
            self.log(
                DebugRecordKind::Memory,
                format_args!("allocated {allocated} bytes"),
            );
        }
        if freed > 0 {
            self.log(DebugRecordKind::Memory, format_args!("freed {freed} bytes"));
        }
    }

    pub fn log_performance(&mut self, operation: &str, millis: f64) {
        self.log(
            DebugRecordKind::Performance,
            format_args!("{operation} took {millis:.3} ms"),
        );
    }

    /// Start the performance timer. A single slot: a second start before
    /// the matching end overwrites the first.
    pub fn perf_start(&mut self, operation: &str) {
        if !self.perf_enabled {
            return;
        }
        self.perf_started = Some(Instant::now());
        self.log(
            DebugRecordKind::Performance,
            format_args!("Started: {operation}"),
        );
    }

    pub fn perf_end(&mut self, operation: &str) {
        if !self.perf_enabled {
            return;
        }
        if let Some(started) = self.perf_started.take() {
            let millis = started.elapsed().as_secs_f64() * 1000.0;
            self.log_performance(operation, millis);
        }
    }

    pub fn indent_increase(&mut self) {
        self.indent += 1;
    }

    pub fn indent_decrease(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write directly to the record sink (used by command handlers).
    pub(crate) fn sink_write(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.sink.write_fmt(args);
        let _ = self.sink.flush();
    }
}

impl Default for DebugContext {
    fn default() -> Self {
        Self::new(DebugLevel::Basic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that collects records into a shared buffer.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn capture(level: DebugLevel) -> (DebugContext, SharedBuf) {
        let buf = SharedBuf::default();
        let ctx = DebugContext::with_sink(level, Box::new(buf.clone()));
        (ctx, buf)
    }

    impl SharedBuf {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("sink lock")).into_owned()
        }
    }

    #[test]
    fn variable_record_format() {
        let (mut ctx, buf) = capture(DebugLevel::Basic);
        ctx.log_variable("x", "INT", "5");
        let out = buf.text();
        assert!(out.contains("VAR: x (INT) = 5"), "got: {out}");
    }

    #[test]
    fn call_return_indentation() {
        let (mut ctx, buf) = capture(DebugLevel::Basic);
        ctx.log_call("service", &[]);
        ctx.log_variable("q", "INT", "1");
        ctx.log_return("service", None);
        let out = buf.text();
        assert!(out.contains("CALL: service()"));
        assert!(out.contains("  VAR: q"), "nested record is indented: {out}");
        assert!(out.contains("RET: service -> void"));
    }

    #[test]
    fn performance_records_require_detailed_level() {
        let (mut ctx, buf) = capture(DebugLevel::Basic);
        ctx.log_performance("lower", 1.0);
        assert!(!buf.text().contains("PERF"));

        let (mut ctx, buf) = capture(DebugLevel::Detailed);
        ctx.log_performance("lower", 1.0);
        assert!(buf.text().contains("PERF: lower took"));
    }

    #[test]
    fn disabled_context_emits_nothing() {
        let (mut ctx, buf) = capture(DebugLevel::Verbose);
        ctx.set_enabled(false);
        ctx.log_variable("x", "INT", "1");
        ctx.log_call("f", &[]);
        assert!(buf.text().is_empty());
    }

    #[test]
    fn step_and_resume_transitions() {
        let (mut ctx, _buf) = capture(DebugLevel::None);
        assert_eq!(ctx.state(), DebuggerState::Running);
        ctx.step();
        assert_eq!(ctx.state(), DebuggerState::Step);
        ctx.resume();
        assert_eq!(ctx.state(), DebuggerState::Running);
    }
}
