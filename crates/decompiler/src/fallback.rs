//! Lossless bytecode fence.
//!
//! Decompiled text carries the exact program it came from as a fenced
//! base64 comment:
//!
//! ```text
//! /*__NCS_BYTECODE__
//! TkNTIFYxLjBC...
//! __END_NCS_BYTECODE__*/
//! ```
//!
//! [`compile`] looks for the fence before involving a front end, so a
//! decompile/compile cycle reproduces the original bytes. Only a fence
//! that opens a line and ends the text counts.

use base64::{engine::general_purpose, Engine as _};
use ncs_common::Program;

use crate::error::{CompileError, FenceError};

/// Opening marker of the fence.
pub const FENCE_START: &str = "/*__NCS_BYTECODE__";
/// Closing marker of the fence.
pub const FENCE_END: &str = "__END_NCS_BYTECODE__*/";

/// Turns NSS source into a program.
pub trait NssFrontEnd {
    fn compile(&self, source: &str) -> Result<Program, Box<dyn std::error::Error + Send + Sync>>;
}

/// A front end that accepts nothing. Only fenced sources compile with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FenceOnly;

impl NssFrontEnd for FenceOnly {
    fn compile(&self, _source: &str) -> Result<Program, Box<dyn std::error::Error + Send + Sync>> {
        Err("no bytecode fence found and no NSS front end is available".into())
    }
}

/// Render encoded program bytes as a fence, wrapping base64 at `width`.
pub fn fence(bytes: &[u8], width: usize) -> String {
    let encoded = general_purpose::STANDARD.encode(bytes);
    let width = width.max(4);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / width + 48);
    out.push_str(FENCE_START);
    out.push('\n');
    // Base64 output is ASCII, so byte chunks are char boundaries.
    for chunk in encoded.as_bytes().chunks(width) {
        out.extend(chunk.iter().map(|&b| char::from(b)));
        out.push('\n');
    }
    out.push_str(FENCE_END);
    out
}

/// Append a fence holding `bytes` to `text`.
pub fn embed(text: &mut String, bytes: &[u8], width: usize) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push('\n');
    text.push_str(&fence(bytes, width));
    text.push('\n');
}

/// Start of the last line that opens a fence. Rendered string literals
/// never contain a raw newline, so a marker inside code cannot match.
fn last_fence_start(text: &str) -> Option<usize> {
    text.rmatch_indices(FENCE_START)
        .map(|(at, _)| at)
        .find(|&at| at == 0 || text[..at].ends_with('\n'))
}

/// Find the trailing fence in `text` and decode the program inside it.
///
/// Returns `Ok(None)` when there is no fence, or when the last fence is
/// followed by more than whitespace.
pub fn extract_embedded(text: &str) -> Result<Option<Program>, FenceError> {
    let Some(start) = last_fence_start(text) else {
        return Ok(None);
    };
    let rest = &text[start + FENCE_START.len()..];
    let body_len = rest.find(FENCE_END).ok_or(FenceError::Unterminated)?;
    if !rest[body_len + FENCE_END.len()..].trim().is_empty() {
        log::debug!("bytecode fence at byte {start} is not trailing, ignoring it");
        return Ok(None);
    }
    let body: String = rest[..body_len]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = general_purpose::STANDARD.decode(body)?;
    let program = Program::decode(&bytes)?;
    log::debug!(
        "decoded {} embedded instructions from bytecode fence",
        program.len()
    );
    Ok(Some(program))
}

/// Compile NSS text, preferring an embedded fence over the front end.
pub fn compile(source: &str, front_end: &dyn NssFrontEnd) -> Result<Program, CompileError> {
    if let Some(program) = extract_embedded(source)? {
        return Ok(program);
    }
    front_end.compile(source).map_err(CompileError::FrontEnd)
}
