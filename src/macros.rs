//! The macro preprocessor.
//!
//! Macros are defined with
//! ```text
//! macro NAME
//!     ...body...
//! macroend
//! ```
//! and invoked by writing `NAME` as a whitespace-delimited word on any later (or earlier) line.
//!
//! [`expand`] runs in two scans. The first collects every macro body and strips
//! the definitions out of the source. The second replaces each invocation with the body
//! of the macro. Since all bodies are known before any substitution happens,
//! a redefined macro expands to its last definition everywhere.
//!
//! A malformed `macro`/`macroend` line makes the macro boundaries untrustworthy,
//! so any such error aborts expansion of the whole file.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::asm::AsmFlags;
use crate::ast::Opcode;
use crate::parse::{column, is_valid_identifier};
use crate::parse::lex::str_literal_len;

const MACRO_START: &str = "macro";
const MACRO_END: &str = "macroend";

/// Kinds of errors that can occur while expanding macros.
///
/// See [`MacroErr`] for this error type with position information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum MacroErrKind {
    /// Something precedes `macro` or `macroend` on its line.
    TokenBeforeKeyword(&'static str),
    /// `macro` without a name.
    MissingName,
    /// Something follows the macro name, or `macroend`.
    UnexpectedToken(String),
    /// The macro name is not an identifier.
    InvalidName(String),
    /// The macro name is an instruction mnemonic.
    MnemonicName(String),
    /// The macro name is `macro` or `macroend`.
    ReservedName(String),
    /// `macroend` outside of a macro definition.
    UnopenedMacro,
    /// `macro` inside of a macro definition.
    NestedMacro,
    /// A macro definition which reaches the end of the file.
    UnclosedMacro(String),
}
impl std::fmt::Display for MacroErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenBeforeKeyword(kw) => write!(f, "unexpected token before '{kw}'"),
            Self::MissingName            => f.write_str("macro definition is missing a name"),
            Self::UnexpectedToken(t)     => write!(f, "unexpected '{t}' in macro definition line"),
            Self::InvalidName(n)         => write!(f, "invalid macro name '{n}'"),
            Self::MnemonicName(n)        => write!(f, "macro name '{n}' conflicts with an instruction name"),
            Self::ReservedName(n)        => write!(f, "macro name '{n}' is a reserved word"),
            Self::UnopenedMacro          => f.write_str("'macroend' without a matching 'macro'"),
            Self::NestedMacro            => f.write_str("macro definitions cannot be nested"),
            Self::UnclosedMacro(n)       => write!(f, "macro '{n}' is never closed"),
        }
    }
}

/// Error from expanding macros.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MacroErr {
    /// The kind of error.
    pub kind: MacroErrKind,
    /// The 1-indexed line number where the error occurred.
    pub line: usize,
    /// The 1-indexed column where the error occurred.
    pub col: usize,
}
impl MacroErr {
    /// Creates an error at byte `offset` of the source line `text`.
    fn new(kind: MacroErrKind, line: usize, text: &str, offset: usize) -> Self {
        MacroErr { kind, line, col: column(text, offset) }
    }
}
impl std::fmt::Display for MacroErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for MacroErr {}
impl crate::err::Error for MacroErr {
    fn pos(&self) -> Option<(usize, usize)> {
        Some((self.line, self.col))
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            MacroErrKind::TokenBeforeKeyword(kw) => Some(format!("'{kw}' must be the first word on its line").into()),
            MacroErrKind::MissingName      => Some("write the name after the keyword, like 'macro NAME'".into()),
            MacroErrKind::UnexpectedToken(_) => Some("a definition line holds only 'macro NAME', and the closing line only 'macroend'".into()),
            MacroErrKind::InvalidName(_)   => Some("names start with a letter and contain only letters and digits".into()),
            MacroErrKind::MnemonicName(_)  => Some("try renaming the macro".into()),
            MacroErrKind::ReservedName(_)  => Some("try renaming the macro".into()),
            MacroErrKind::UnopenedMacro    => Some("try adding a 'macro NAME' line before the body".into()),
            MacroErrKind::NestedMacro      => Some("close the current macro with 'macroend' first".into()),
            MacroErrKind::UnclosedMacro(_) => Some("try adding 'macroend' after the body".into()),
        }
    }
}

/// One line of expanded source.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SourceLine {
    /// The text of the line.
    pub text: String,
    /// The 1-indexed line number in the original source this line came from.
    ///
    /// Lines spliced in from a macro body take the line number of the invocation.
    pub origin: usize,
}

/// Source with all macros expanded, as consumed by both assembler passes.
#[derive(PartialEq, Eq, Hash, Clone, Default)]
pub struct ExpandedSource {
    lines: Vec<SourceLine>,
}
impl ExpandedSource {
    /// The lines of the expanded source.
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }
    /// The number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }
    /// Whether there are no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
impl std::fmt::Debug for ExpandedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.lines.iter().map(|l| (l.origin, &l.text)))
            .finish()
    }
}
impl std::fmt::Display for ExpandedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.text)?;
        }
        Ok(())
    }
}
/// Takes source which has no macros, numbering its lines from 1.
impl From<&'_ str> for ExpandedSource {
    fn from(value: &'_ str) -> Self {
        let lines = value.lines()
            .enumerate()
            .map(|(i, text)| SourceLine { text: text.to_string(), origin: i + 1 })
            .collect();
        ExpandedSource { lines }
    }
}
impl From<String> for ExpandedSource {
    fn from(value: String) -> Self {
        Self::from(&*value)
    }
}

/// Expands all macros in the source.
///
/// Lines longer than [`AsmFlags::max_line_len`] characters are truncated first.
/// If any definition line is malformed, every such error is returned and nothing is expanded.
///
/// # Example
/// ```
/// use asm14::asm::AsmFlags;
/// use asm14::macros::expand;
///
/// let src = "macro GREET\nprn #1\nmacroend\nGREET\nstop";
/// let expanded = expand(src, &AsmFlags::default()).unwrap();
/// assert_eq!(expanded.to_string(), "prn #1\nstop\n");
/// assert_eq!(expanded.lines()[0].origin, 4);
/// ```
pub fn expand(source: &str, flags: &AsmFlags) -> Result<ExpandedSource, Vec<MacroErr>> {
    let lines: Vec<_> = source.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, truncate_line(line, flags.max_line_len, i + 1)))
        .collect();

    let (macros, rest) = collect_macros(&lines)?;
    tracing::debug!("collected {} macro(s)", macros.len());

    let mut out = vec![];
    for (line_no, text) in rest {
        substitute(text, line_no, &macros, &mut out);
    }

    Ok(ExpandedSource { lines: out })
}

fn truncate_line(line: &str, max_len: usize, line_no: usize) -> &str {
    match line.char_indices().nth(max_len) {
        Some((i, _)) => {
            tracing::warn!("line {line_no} is longer than {max_len} characters and was truncated");
            &line[..i]
        },
        None => line,
    }
}

/// The range of a line covered by a string literal, closed the same way the lexer closes it.
fn quoted_range(line: &str) -> Option<std::ops::Range<usize>> {
    let start = line.find('"')?;
    let len = str_literal_len(&line[start + 1..])?;
    Some(start..start + len + 2)
}

/// The words of the line's code part which are not inside a string literal.
fn code_words(line: &str) -> Vec<(usize, &str)> {
    let quoted = quoted_range(line);
    words(code_part(line))
        .into_iter()
        .filter(|(off, _)| !quoted.as_ref().is_some_and(|q| q.contains(off)))
        .collect()
}

/// The part of the line before its comment.
fn code_part(line: &str) -> &str {
    let quoted = quoted_range(line);
    let comment = line.match_indices(';')
        .map(|(i, _)| i)
        .find(|i| !quoted.as_ref().is_some_and(|q| q.contains(i)));

    match comment {
        Some(i) => &line[..i],
        None => line,
    }
}

/// The whitespace-delimited words of some text, with their byte offsets.
fn words(text: &str) -> Vec<(usize, &str)> {
    let mut words = vec![];
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push((s, &text[s..i]));
                start = None;
            },
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

fn check_name(name: &str, line_no: usize, text: &str, offset: usize) -> Result<(), MacroErr> {
    let kind = if name == MACRO_START || name == MACRO_END {
        MacroErrKind::ReservedName(name.to_string())
    } else if Opcode::from_mnemonic(name).is_some() {
        MacroErrKind::MnemonicName(name.to_string())
    } else if !is_valid_identifier(name) {
        MacroErrKind::InvalidName(name.to_string())
    } else {
        return Ok(());
    };

    Err(MacroErr::new(kind, line_no, text, offset))
}

/// A macro definition being collected.
struct OpenMacro<'s> {
    /// None if the name was invalid (the body is still collected and then discarded).
    name: Option<&'s str>,
    line_no: usize,
    col: usize,
    body: Vec<String>,
}

type Collected<'s> = (HashMap<String, Vec<String>>, Vec<(usize, &'s str)>);

/// First scan: splits the source into macro bodies and the lines outside of definitions.
fn collect_macros<'s>(lines: &[(usize, &'s str)]) -> Result<Collected<'s>, Vec<MacroErr>> {
    let mut macros: HashMap<String, Vec<String>> = HashMap::new();
    let mut rest = vec![];
    let mut errors = vec![];
    let mut open: Option<OpenMacro<'s>> = None;

    for &(line_no, line) in lines {
        let words = code_words(line);
        let start = words.iter().position(|&(_, w)| w == MACRO_START);
        let end = words.iter().position(|&(_, w)| w == MACRO_END);

        match (open.is_some(), start, end) {
            // macroend
            (true, _, Some(pos)) => {
                if pos > 0 {
                    errors.push(MacroErr::new(MacroErrKind::TokenBeforeKeyword(MACRO_END), line_no, line, words[0].0));
                }
                if let Some(&(off, w)) = words.get(pos + 1) {
                    errors.push(MacroErr::new(MacroErrKind::UnexpectedToken(w.to_string()), line_no, line, off));
                }

                if let Some(OpenMacro { name: Some(name), body, .. }) = open.take() {
                    tracing::trace!("defined macro {name} ({} lines)", body.len());
                    if macros.insert(name.to_string(), body).is_some() {
                        tracing::warn!("macro {name} redefined on line {line_no}, the last definition is used");
                    }
                }
            },
            (true, Some(pos), None) => {
                errors.push(MacroErr::new(MacroErrKind::NestedMacro, line_no, line, words[pos].0));
            },
            (true, None, None) => if let Some(m) = &mut open {
                m.body.push(line.to_string());
            },

            // macro NAME
            (false, Some(pos), _) => {
                let (kw_off, _) = words[pos];
                if pos > 0 {
                    errors.push(MacroErr::new(MacroErrKind::TokenBeforeKeyword(MACRO_START), line_no, line, words[0].0));
                }

                let name = match words.get(pos + 1) {
                    Some(&(off, name)) => match check_name(name, line_no, line, off) {
                        Ok(()) => Some(name),
                        Err(e) => { errors.push(e); None },
                    },
                    None => {
                        errors.push(MacroErr::new(MacroErrKind::MissingName, line_no, line, kw_off));
                        None
                    },
                };
                if let Some(&(off, w)) = words.get(pos + 2) {
                    errors.push(MacroErr::new(MacroErrKind::UnexpectedToken(w.to_string()), line_no, line, off));
                }

                open = Some(OpenMacro { name, line_no, col: column(line, kw_off), body: vec![] });
            },
            (false, None, Some(pos)) => {
                errors.push(MacroErr::new(MacroErrKind::UnopenedMacro, line_no, line, words[pos].0));
            },
            (false, None, None) => rest.push((line_no, line)),
        }
    }

    if let Some(m) = open {
        let name = m.name.unwrap_or_default().to_string();
        errors.push(MacroErr { kind: MacroErrKind::UnclosedMacro(name), line: m.line_no, col: m.col });
    }

    match errors.is_empty() {
        true  => Ok((macros, rest)),
        false => Err(errors),
    }
}

/// Second scan: replaces every macro invocation on the line with the macro's body.
fn substitute(line: &str, line_no: usize, macros: &HashMap<String, Vec<String>>, out: &mut Vec<SourceLine>) {
    let invocations: Vec<_> = code_words(line)
        .into_iter()
        .filter_map(|(off, w)| Some((off, w, macros.get(w)?)))
        .collect();

    if invocations.is_empty() {
        out.push(SourceLine { text: line.to_string(), origin: line_no });
        return;
    }

    let mut emit = |text: String| {
        if !text.trim().is_empty() {
            out.push(SourceLine { text, origin: line_no });
        }
    };

    let mut current = String::new();
    let mut cursor = 0;
    for (off, name, body) in invocations {
        tracing::trace!("expanding macro {name} on line {line_no}");
        current.push_str(&line[cursor..off]);
        for body_line in body {
            let text = match current.trim().is_empty() {
                true  => body_line.clone(),
                false => format!("{current}{}", body_line.trim()),
            };
            emit(text);
            current.clear();
        }
        cursor = off + name.len();
    }
    current.push_str(&line[cursor..]);
    emit(current);
}
