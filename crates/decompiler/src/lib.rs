//! NCS to NSS decompilation.
//!
//! A [`Decompiler`] session replays each basic block against a symbolic
//! stack, emits recovered loops and if/else regions as structured NSS, and
//! appends the program's exact bytecode as a fenced base64 comment.
//! [`fallback::compile`] reads that fence back, so text produced here
//! always compiles to the original bytes.
//!
//! # Usage
//!
//! ```
//! use ncs_common::{ByteCode, Instruction, Program};
//! use ncs_decompiler::{compile, decompile, FenceOnly, RoutineTable};
//!
//! let program = Program::new(vec![
//!     Instruction::const_int(2),
//!     Instruction::const_int(3),
//!     Instruction::int_op(ByteCode::Add),
//!     Instruction::retn(),
//! ]);
//!
//! let text = decompile(&program, &RoutineTable::new()).unwrap();
//! assert!(text.contains("return 2 + 3;"));
//! assert_eq!(compile(&text, &FenceOnly).unwrap(), program);
//! ```
//!
//! # Modules
//!
//! 1. **emitter**: the decompilation session
//! 2. **fallback**: the bytecode fence and the compile entry point
//! 3. **routines**: engine routine names for ACTION
//! 4. **options**: indentation and fence settings
//! 5. **error**: failures and lenient diagnostics

pub mod emitter;
pub mod error;
pub mod fallback;
pub mod options;
pub mod routines;

pub use emitter::Decompiler;
pub use error::{
    CompileError, DecompileError, Diagnostic, DiagnosticKind, FenceError, RoutineTableError,
};
pub use fallback::{compile, extract_embedded, FenceOnly, NssFrontEnd};
pub use options::DecompileOptions;
pub use routines::{Routine, RoutineTable};

use ncs_common::Program;

/// Decompile with default options.
pub fn decompile(program: &Program, routines: &RoutineTable) -> Result<String, DecompileError> {
    Decompiler::new(routines).decompile(program)
}

/// Decompile with explicit options.
pub fn decompile_with(
    program: &Program,
    routines: &RoutineTable,
    options: DecompileOptions,
) -> Result<String, DecompileError> {
    Decompiler::new(routines).with_options(options).decompile(program)
}
