use std::io::Write;
use std::sync::{Arc, Mutex as StdMutex};

use inkwell::context::Context;

use desim_debug::{share, DebugContext, DebugLevel, DebuggerState};
use desim_ir::DataType;

use super::helpers::*;
use crate::module::Generator;

// JIT runs with instrumentation share the process-global hook registry;
// keep them serialized.
static JIT_LOCK: StdMutex<()> = StdMutex::new(());

#[derive(Clone, Default)]
struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

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

fn capture(level: DebugLevel) -> (desim_debug::DebugHandle, SharedBuf) {
    let buf = SharedBuf::default();
    let ctx = DebugContext::with_sink(level, Box::new(buf.clone()));
    (share(ctx), buf)
}

/// A program whose main calls a no-op user function at a known line.
fn call_program(line: u32) -> desim_ir::ast::Program {
    program(
        vec![function_decl("tick", DataType::Int, vec![ret(Some(int(1)))])],
        vec![
            assign("x", call_at(line, "tick", vec![])),
            ret(Some(ident("x"))),
        ],
    )
}

#[test]
fn hook_call_is_emitted_only_under_instrumentation() {
    let context = Context::create();
    let (handle, _buf) = capture(DebugLevel::None);
    let mut generator = Generator::with_debug(&context, "test", handle);
    generator.generate(&call_program(10)).expect("generate");
    let ir = generator.ir_to_string();
    assert!(
        ir.contains("call void @desim_debug_hook"),
        "hook call threaded into emitted code:\n{ir}"
    );

    let bare = Context::create();
    let mut plain = Generator::new(&bare, "test");
    plain.generate(&call_program(10)).expect("generate");
    assert!(!plain.ir_to_string().contains("desim_debug_hook"));
}

#[test]
fn call_sites_emit_entry_and_exit_records() {
    let context = Context::create();
    let (handle, buf) = capture(DebugLevel::Basic);
    let mut generator = Generator::with_debug(&context, "test", handle);
    generator.generate(&call_program(4)).expect("generate");

    let records = buf.text();
    assert!(records.contains("CALL: tick()"), "{records}");
    assert!(records.contains("RET: tick -> void"), "{records}");
}

#[test]
fn initializers_emit_variable_records() {
    let context = Context::create();
    let (handle, buf) = capture(DebugLevel::Basic);
    let mut generator = Generator::with_debug(&context, "test", handle);
    generator
        .generate(&main_program(vec![var_decl(
            "x",
            DataType::Int,
            Some(int(5)),
        )]))
        .expect("generate");

    assert!(buf.text().contains("VAR: x (INT) = 5"), "{}", buf.text());
}

#[test]
fn hook_reports_location_from_jit_execution() {
    let _guard = JIT_LOCK.lock().expect("jit lock");

    let context = Context::create();
    let (handle, _buf) = capture(DebugLevel::None);
    let mut generator = Generator::with_debug(&context, "test", handle.clone());
    generator.generate(&call_program(42)).expect("generate");
    generator.init_jit().expect("init_jit");

    // No breakpoints are set, so the hook never suspends; it still runs
    // inside the JIT-compiled code and records the call-site location.
    assert_eq!(generator.execute_jit().expect("execute"), 1);
    generator.destroy_jit();

    let ctx = handle.lock();
    assert_eq!(ctx.current_line(), 42);
    assert_eq!(ctx.current_function(), Some("main"));
    assert_eq!(ctx.state(), DebuggerState::Running);
}

#[test]
fn line_breakpoint_suspension_protocol() {
    // The full interactive run needs a console; the protocol pieces are
    // exercised at the context level: one matching hook check moves
    // Running -> Break and bumps the hit count exactly once, `continue`
    // resumes, and the same breakpoint can fire again later.
    let (handle, _buf) = capture(DebugLevel::None);
    let mut ctx = handle.lock();
    let id = ctx.set_breakpoint(desim_debug::BreakpointKind::Line, "10");

    ctx.set_location(9, "main");
    assert_eq!(ctx.state(), DebuggerState::Running);

    ctx.set_location(10, "main");
    assert_eq!(ctx.state(), DebuggerState::Break);
    assert_eq!(ctx.breakpoints()[0].hit_count, 1);

    assert!(ctx.process_command("continue"));
    assert_eq!(ctx.state(), DebuggerState::Running);

    ctx.set_location(11, "main");
    assert_eq!(ctx.state(), DebuggerState::Running, "no further suspension");
    assert_eq!(ctx.breakpoints()[0].hit_count, 1);

    assert!(ctx.remove_breakpoint(id));
}
