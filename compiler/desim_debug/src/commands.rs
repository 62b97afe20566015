//! Interactive debugger command protocol.
//!
//! Line-oriented text on stdin while the program is suspended. Command
//! output (breakpoint lists, inspections) goes to the context's record
//! sink; the prompt and banner go to the console.

use std::io::{self, BufRead, Write as _};

use crate::context::{DebugContext, DebuggerState};

const HELP_TEXT: &str = "Available commands:\n\
  continue (c)    - Continue execution\n\
  step (s)        - Step to next instruction\n\
  breakpoints (b) - List breakpoints\n\
  variables (v)   - List local variables\n\
  print <var>     - Print variable value\n\
  memory <addr> <size> - Examine memory\n\
  quit (q)        - Exit debugger";

impl DebugContext {
    /// Dispatch one command line. Returns true if the command was
    /// recognized.
    pub fn process_command(&mut self, command: &str) -> bool {
        let command = command.trim();
        match command {
            "continue" | "c" => {
                self.resume();
                true
            }
            "step" | "s" => {
                self.step();
                true
            }
            "breakpoints" | "b" => {
                self.list_breakpoints();
                true
            }
            "variables" | "v" => {
                self.list_variables();
                true
            }
            "quit" | "q" => {
                self.state = DebuggerState::Finished;
                true
            }
            _ => {
                if let Some(name) = command.strip_prefix("print ") {
                    self.inspect_variable(name.trim());
                    return true;
                }
                if let Some(rest) = command.strip_prefix("memory ") {
                    let mut parts = rest.split_whitespace();
                    let addr = parts.next().and_then(parse_address);
                    let size = parts.next().and_then(|s| s.parse::<usize>().ok());
                    if let Some(addr) = addr {
                        self.inspect_memory(addr, size.unwrap_or(16));
                        return true;
                    }
                }

                self.sink_write(format_args!("Unknown command: {command}\n"));
                self.sink_write(format_args!(
                    "Available commands: continue(c), step(s), breakpoints(b), \
                     variables(v), print <var>, memory <addr> <size>, quit(q)\n"
                ));
                false
            }
        }
    }

    fn list_breakpoints(&mut self) {
        self.sink_write(format_args!("Breakpoints:\n"));
        let lines: Vec<String> = self
            .breakpoints
            .iter()
            .map(|bp| {
                format!(
                    "  {}: {} at {} ({}, hits: {})\n",
                    bp.id,
                    bp.kind.label(),
                    bp.location,
                    if bp.enabled { "enabled" } else { "disabled" },
                    bp.hit_count
                )
            })
            .collect();
        for line in lines {
            self.sink_write(format_args!("{line}"));
        }
    }

    /// Variable inspection needs symbol-table integration that the hook
    /// does not have; report the location instead.
    fn list_variables(&mut self) {
        self.sink_write(format_args!(
            "Local variables: <not available from the hook>\n"
        ));
        let function = self.current_function.as_deref().unwrap_or("<none>").to_owned();
        let line = self.current_line;
        self.sink_write(format_args!("Current function: {function}\n"));
        self.sink_write(format_args!("Current line: {line}\n"));
    }

    fn inspect_variable(&mut self, name: &str) {
        self.sink_write(format_args!(
            "Variable {name}: <inspection not implemented>\n"
        ));
    }

    /// Hex + ASCII dump of raw memory, 16 bytes per row.
    pub fn inspect_memory(&mut self, address: usize, size: usize) {
        if address == 0 {
            return;
        }
        self.sink_write(format_args!("Memory at {address:#x}:\n"));

        // SAFETY: the address comes from the interactive user inspecting a
        // suspended program; reads are byte-sized and unaligned.
        let bytes: Vec<u8> = (0..size)
            .map(|i| unsafe { std::ptr::read_unaligned((address + i) as *const u8) })
            .collect();

        for (row_start, row) in bytes.chunks(16).enumerate().map(|(i, c)| (i * 16, c)) {
            let hex: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = row
                .iter()
                .map(|&b| {
                    if (32..=126).contains(&b) {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            self.sink_write(format_args!(
                "  {:#x}: {} |{ascii}|\n",
                address + row_start,
                hex.join(" ")
            ));
        }
    }

    /// Blocking interactive loop while the program is suspended.
    ///
    /// Reads one command per line until continue, step, quit, or EOF.
    /// Returns with the debugger state already updated; the caller hands
    /// control back to the suspended native code.
    pub fn run_break_loop<R: BufRead>(&mut self, input: R, line: u32, function: &str) {
        println!("\n=== DEBUG BREAKPOINT ===");
        println!("Location: {function}:{line}");
        println!("Type 'help' for commands, 'continue' to resume, 'quit' to exit");

        let mut lines = input.lines();
        loop {
            print!("(debug) ");
            let _ = io::stdout().flush();
            let Some(Ok(command)) = lines.next() else { break };
            let command = command.trim();

            if command == "help" {
                println!("{HELP_TEXT}");
                continue;
            }

            if self.process_command(command) {
                if self.state == DebuggerState::Finished {
                    break;
                }
                if matches!(command, "continue" | "c" | "step" | "s") {
                    break;
                }
            }
        }
    }
}

/// Parse a memory address as hex (with or without `0x`) or decimal.
fn parse_address(text: &str) -> Option<usize> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return usize::from_str_radix(hex, 16).ok();
    }
    text.parse::<usize>()
        .ok()
        .or_else(|| usize::from_str_radix(text, 16).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DebugLevel;
    use crate::BreakpointKind;
    use std::io::Cursor;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("sink lock")).into_owned()
        }
    }

    fn capture() -> (DebugContext, SharedBuf) {
        let buf = SharedBuf::default();
        let ctx = DebugContext::with_sink(DebugLevel::None, Box::new(buf.clone()));
        (ctx, buf)
    }

    #[test]
    fn continue_resumes() {
        let (mut ctx, _) = capture();
        ctx.set_state(DebuggerState::Break);
        assert!(ctx.process_command("continue"));
        assert_eq!(ctx.state(), DebuggerState::Running);
        ctx.set_state(DebuggerState::Break);
        assert!(ctx.process_command("c"));
        assert_eq!(ctx.state(), DebuggerState::Running);
    }

    #[test]
    fn step_and_quit() {
        let (mut ctx, _) = capture();
        assert!(ctx.process_command("s"));
        assert_eq!(ctx.state(), DebuggerState::Step);
        assert!(ctx.process_command("quit"));
        assert_eq!(ctx.state(), DebuggerState::Finished);
    }

    #[test]
    fn unknown_command_prints_help_line() {
        let (mut ctx, buf) = capture();
        assert!(!ctx.process_command("frobnicate"));
        let out = buf.text();
        assert!(out.contains("Unknown command: frobnicate"));
        assert!(out.contains("Available commands:"));
    }

    #[test]
    fn breakpoints_listing_shows_state_and_hits() {
        let (mut ctx, buf) = capture();
        let id = ctx.set_breakpoint(BreakpointKind::Line, "10");
        ctx.enable_breakpoint(id, false);
        assert!(ctx.process_command("b"));
        let out = buf.text();
        assert!(out.contains(&format!("{id}: line at 10 (disabled, hits: 0)")));
    }

    #[test]
    fn memory_dump_is_hex_and_ascii() {
        let (mut ctx, buf) = capture();
        let data = *b"DESIM!";
        ctx.inspect_memory(data.as_ptr() as usize, data.len());
        let out = buf.text();
        assert!(out.contains("44 45 53 49 4d 21"), "hex bytes: {out}");
        assert!(out.contains("|DESIM!|"), "ascii column: {out}");
    }

    #[test]
    fn break_loop_exits_on_continue() {
        let (mut ctx, _) = capture();
        ctx.set_state(DebuggerState::Break);
        ctx.run_break_loop(Cursor::new("breakpoints\ncontinue\n"), 10, "main");
        assert_eq!(ctx.state(), DebuggerState::Running);
    }

    #[test]
    fn break_loop_exits_on_eof() {
        let (mut ctx, _) = capture();
        ctx.set_state(DebuggerState::Break);
        ctx.run_break_loop(Cursor::new(""), 1, "main");
        assert_eq!(ctx.state(), DebuggerState::Break);
    }

    #[test]
    fn quit_in_loop_finishes() {
        let (mut ctx, _) = capture();
        ctx.set_state(DebuggerState::Break);
        ctx.run_break_loop(Cursor::new("q\n"), 3, "main");
        assert_eq!(ctx.state(), DebuggerState::Finished);
    }
}
