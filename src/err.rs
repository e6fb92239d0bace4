//! Error interface for this crate.
//!
//! Each stage of the assembler has its own error type:
//! - [`LexErr`]: an unrecognizable token in a line
//! - [`ParseErr`]: a line that is syntactically malformed
//! - [`MacroErr`]: a malformed `macro`/`macroend` line (aborts preprocessing)
//! - [`AsmErr`]: a semantic error found by one of the assembler passes
//!
//! All of these implement [`Error`], which exposes where the error occurred
//! and an optional hint. Any of them can be flattened into a [`Diagnostic`],
//! the `(line, column, message)` record handed to whoever reports errors.

use std::borrow::Cow;

pub use crate::parse::lex::LexErr;
pub use crate::parse::{ParseErr, ParseErrKind};
pub use crate::macros::{MacroErr, MacroErrKind};
pub use crate::asm::{AsmErr, AsmErrKind, SymbolErr};

/// Unified error interface.
pub trait Error: std::error::Error {
    /// The position of the error, as a `(line, column)` pair.
    ///
    /// Lines are 1-indexed and refer to the original source file.
    /// Columns are 1-indexed, or 0 if the error applies to the whole line.
    fn pos(&self) -> Option<(usize, usize)> {
        None
    }

    /// A suggestion on how to fix the error.
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}

/// A single reportable error, detached from its source error type.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Diagnostic {
    /// The 1-indexed source line (0 if the error is not tied to a line).
    pub line: usize,
    /// The 1-indexed column (0 if unknown).
    pub col: usize,
    /// The error message.
    pub message: String,
    /// An optional hint.
    pub help: Option<String>,
}
impl Diagnostic {
    /// Creates a diagnostic from any of this crate's errors.
    pub fn new<E: Error + ?Sized>(err: &E) -> Self {
        let (line, col) = err.pos().unwrap_or((0, 0));
        Diagnostic {
            line,
            col,
            message: err.to_string(),
            help: err.help().map(Cow::into_owned),
        }
    }
}
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.col) {
            (0, _) => write!(f, "error: {}", self.message),
            (l, 0) => write!(f, "{l}: error: {}", self.message),
            (l, c) => write!(f, "{l}:{c}: error: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Diagnostic;
    use crate::asm::{AsmErr, AsmErrKind};

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(&AsmErr::new(AsmErrKind::UndefinedSymbol(String::from("X")), (4, 9)));
        assert_eq!(d.line, 4);
        assert_eq!(d.col, 9);
        assert_eq!(d.to_string(), "4:9: error: undefined symbol 'X'");
        assert!(d.help.is_some());

        let d = Diagnostic::new(&AsmErr::new(AsmErrKind::ProgramTooLarge(5000), (0, 0)));
        assert_eq!(d.to_string(), "error: program does not fit in memory (5000 words)");
    }
}
