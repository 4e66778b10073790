//! Source-to-JIT integration tests.
//!
//! Each test compiles Opal source through the real parser and code
//! generator, verifies the module, and (for execution tests) runs the entry
//! function under the JIT. Execution tests return early when LLVM has no
//! native target in the test environment.

mod exec_tests;

use inkwell::context::Context;

use opal_diagnostic::{Diagnostic, SourceFile};

use crate::aot::target::initialize_native_target;
use crate::aot::OptLevel;
use crate::context::CGContext;
use crate::jit;
use crate::toplevel::gen_toplevel;

/// Compile a source string and run its entry function; `None` when the
/// native target is unavailable.
pub(crate) fn jit_exit(src: &str) -> Option<i32> {
    if initialize_native_target().is_err() {
        return None;
    }

    let file = SourceFile::new("test.opal", src);
    let program = opal_parse::parse(&file).expect("parse");

    let llcx = Context::create();
    let mut ctx = CGContext::new(&llcx, "test", file);
    for item in &program {
        if let Err(diag) = gen_toplevel(&mut ctx, item) {
            panic!("{}", ctx.file.render(&diag));
        }
    }
    if let Err(msg) = ctx.module.verify() {
        panic!("module verification failed:\n{}", msg.to_string_lossy());
    }

    Some(jit::run_entry(vec![ctx.module], OptLevel::O0).expect("jit"))
}

/// Compile a source string expecting a codegen diagnostic.
pub(crate) fn compile_diag(src: &str) -> Diagnostic {
    let file = SourceFile::new("test.opal", src);
    let program = opal_parse::parse(&file).expect("parse");

    let llcx = Context::create();
    let mut ctx = CGContext::new(&llcx, "test", file);
    for item in &program {
        if let Err(diag) = gen_toplevel(&mut ctx, item) {
            return diag;
        }
    }
    panic!("expected a diagnostic, but the program compiled");
}

/// Compile a source string and return the textual IR.
pub(crate) fn compile_ir(src: &str) -> String {
    let file = SourceFile::new("test.opal", src);
    let program = opal_parse::parse(&file).expect("parse");

    let llcx = Context::create();
    let mut ctx = CGContext::new(&llcx, "test", file);
    for item in &program {
        if let Err(diag) = gen_toplevel(&mut ctx, item) {
            panic!("{}", ctx.file.render(&diag));
        }
    }
    ctx.module.print_to_string().to_string()
}
