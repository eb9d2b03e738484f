//! Tokenizer for NCS listing lines.

use crate::error::AsmError;

/// A single token from a listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// A mnemonic or a numeric literal, as written.
    Word(String),
    /// A double-quoted string with escapes resolved.
    Str(String),
    /// `@<index>` jump target.
    Target(usize),
    /// `<index>:` line prefix.
    Label(usize),
}

impl Token {
    /// Source-like rendering for error messages.
    pub(crate) fn text(&self) -> String {
        match self {
            Token::Word(w) => w.clone(),
            Token::Str(s) => format!("{s:?}"),
            Token::Target(t) => format!("@{t}"),
            Token::Label(l) => format!("{l}:"),
        }
    }
}

/// Tokenize a single line.
///
/// Returns an empty Vec for blank lines and comment-only lines. Comments
/// start with `;` outside a string and extend to end of line.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == ';' {
            break;
        }
        if c == '"' {
            chars.next();
            tokens.push(Token::Str(read_string(&mut chars, line_num)?));
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == ';' || c == '"' {
                break;
            }
            word.push(c);
            chars.next();
        }

        let invalid = || AsmError::InvalidNumber {
            line: line_num,
            token: word.clone(),
        };
        let token = if let Some(target) = word.strip_prefix('@') {
            Token::Target(target.parse().map_err(|_| invalid())?)
        } else if let (Some(label), true) = (word.strip_suffix(':'), tokens.is_empty()) {
            Token::Label(label.parse().map_err(|_| invalid())?)
        } else {
            Token::Word(word.clone())
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn read_string<I>(chars: &mut std::iter::Peekable<I>, line: usize) -> Result<String, AsmError>
where
    I: Iterator<Item = char>,
{
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(AsmError::UnterminatedString { line }),
            Some('"') => return Ok(out),
            Some('\\') => {
                let escaped = chars.next().ok_or(AsmError::UnterminatedString { line })?;
                let c = match escaped {
                    '"' => '"',
                    '\\' => '\\',
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'x' => {
                        let hex: String = chars.by_ref().take(2).collect();
                        u8::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == 2)
                            .map(char::from)
                            .ok_or_else(|| AsmError::InvalidEscape {
                                line,
                                escape: format!("x{hex}"),
                            })?
                    }
                    other => {
                        return Err(AsmError::InvalidEscape {
                            line,
                            escape: other.to_string(),
                        })
                    }
                };
                out.push(c);
            }
            Some(c) if u32::from(c) > 0xFF => return Err(AsmError::WideChar { line, ch: c }),
            Some(c) => out.push(c),
        }
    }
}
