/// Output settings for a decompilation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompileOptions {
    /// One level of indentation.
    pub indent: String,
    /// Append the program's bytecode in a fenced comment.
    pub embed_bytecode: bool,
    /// Column limit for the fenced base64 lines.
    pub wrap_width: usize,
}

impl Default for DecompileOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            embed_bytecode: true,
            wrap_width: 76,
        }
    }
}
