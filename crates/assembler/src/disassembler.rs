//! Disassembler: program to canonical listing text.
//!
//! One instruction per line: the mnemonic, the operands in shape order,
//! then `@<index>` for jumps. Floats use the shortest text that reads back
//! to the same value and strings are escaped, so the listing reassembles
//! to an identical program.

use ncs_common::Program;

/// Canonical listing without index prefixes.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    for instr in &program.instructions {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

/// Listing with an `<index>:` prefix on every line, padded to the widest
/// index.
pub fn disassemble_numbered(program: &Program) -> String {
    let width = program.len().saturating_sub(1).to_string().len();
    let mut out = String::new();
    for (idx, instr) in program.instructions.iter().enumerate() {
        out.push_str(&format!("{idx:>width$}: {instr}\n"));
    }
    out
}
