//! Parsing a single line of assembly into a [`ParsedLine`].
//!
//! The main entry point is [`parse_line`]. Parsing never fails outright:
//! a line which cannot be parsed is returned as [`LineKind::Invalid`],
//! holding a [`ParseErr`] that describes what went wrong, so callers can
//! continue with the remaining lines.
//!
//! The grammar of a line is:
//! ```text
//! [label:] mnemonic [operand[, operand]] [; comment]
//! [label:] .directive args               [; comment]
//! ```
//!
//! This module also provides [`is_valid_identifier`], the shared rule for
//! labels, macro names and symbol operands.

pub mod lex;

use std::borrow::Cow;
use std::ops::Range;

use logos::Logos;

use crate::ast::{Directive, Instr, Label, LineKind, Opcode, Operand, OperandKind, ParsedLine, Reg};
use lex::{LexErr, Token};

/// The maximum length of an identifier.
pub const MAX_IDENT_LEN: usize = 31;

/// Checks whether a name can be used as a label, macro name, or symbol operand.
///
/// Identifiers are at most 31 characters, start with a letter,
/// and otherwise consist of letters and digits.
///
/// # Example
/// ```
/// use asm14::parse::is_valid_identifier;
///
/// assert!(is_valid_identifier("LOOP"));
/// assert!(is_valid_identifier("x1"));
/// assert!(!is_valid_identifier("1x"));
/// assert!(!is_valid_identifier("a_b"));
/// assert!(!is_valid_identifier(&"A".repeat(32)));
/// ```
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    s.len() <= MAX_IDENT_LEN
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// The 1-indexed column (counted in characters) of a byte offset into a line.
pub(crate) fn column(line: &str, offset: usize) -> usize {
    line.get(..offset).map_or(offset, |s| s.chars().count()) + 1
}

/// Kinds of errors that can occur when parsing a line.
///
/// See [`ParseErr`] for this error type with position information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ParseErrKind {
    /// A token could not be lexed.
    Lex(LexErr),
    /// A label definition is not a valid identifier.
    InvalidLabel(String),
    /// A directive other than `.data`, `.string`, `.extern`, `.entry`.
    UnknownDirective(String),
    /// An identifier in instruction position which is not a mnemonic.
    UnknownInstruction(String),
    /// A line which starts with something other than an instruction or directive.
    ExpectedInstruction,
    /// More operands than the instruction takes.
    TooManyOperands {
        /// The instruction.
        opcode: Opcode,
        /// The number of operands found.
        found: usize,
    },
    /// Fewer operands than the instruction takes.
    TooFewOperands {
        /// The instruction.
        opcode: Opcode,
        /// The number of operands found.
        found: usize,
    },
    /// Nothing between two commas.
    EmptyOperand,
    /// A comma with nothing after it.
    TrailingComma,
    /// Two operands (or values) not separated by a comma.
    ExpectedComma,
    /// An operand which matches none of the addressing modes.
    InvalidOperand(String),
    /// A relative operand used on an instruction that is not `jmp`, `bne` or `jsr`.
    RelativeNotAllowed(Opcode),
    /// A `.data` directive without values.
    EmptyData,
    /// A `.data` value which is not a signed decimal integer.
    InvalidDataValue(String),
    /// A `.string` directive without exactly one string literal.
    ExpectedString,
    /// An `.extern`/`.entry` directive without a symbol name.
    ExpectedSymbol(&'static str),
    /// An `.extern`/`.entry` symbol which is not a valid identifier.
    InvalidSymbolName(String),
    /// Extra tokens after a complete directive.
    UnexpectedToken(String),
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(e)                      => e.fmt(f),
            Self::InvalidLabel(l)             => write!(f, "invalid label '{l}'"),
            Self::UnknownDirective(d)         => write!(f, "unknown directive '.{d}'"),
            Self::UnknownInstruction(i)       => write!(f, "unknown instruction '{i}'"),
            Self::ExpectedInstruction         => f.write_str("expected instruction or directive"),
            Self::TooManyOperands { opcode, found } => write!(f, "too many operands: '{opcode}' takes {}, found {found}", opcode.operand_count()),
            Self::TooFewOperands { opcode, found }  => write!(f, "missing operand: '{opcode}' takes {}, found {found}", opcode.operand_count()),
            Self::EmptyOperand                => f.write_str("missing operand between commas"),
            Self::TrailingComma               => f.write_str("trailing comma"),
            Self::ExpectedComma               => f.write_str("expected ',' between operands"),
            Self::InvalidOperand(o)           => write!(f, "invalid operand '{o}'"),
            Self::RelativeNotAllowed(op)      => write!(f, "relative operand not allowed for '{op}'"),
            Self::EmptyData                   => f.write_str(".data requires at least one value"),
            Self::InvalidDataValue(v)         => write!(f, "invalid .data value '{v}'"),
            Self::ExpectedString              => f.write_str(".string requires one quoted string"),
            Self::ExpectedSymbol(d)           => write!(f, ".{d} requires a symbol name"),
            Self::InvalidSymbolName(s)        => write!(f, "invalid symbol name '{s}'"),
            Self::UnexpectedToken(t)          => write!(f, "unexpected '{t}'"),
        }
    }
}
impl ParseErrKind {
    pub(crate) fn help(&self) -> Option<Cow<str>> {
        match self {
            Self::Lex(e) => crate::err::Error::help(e),
            Self::InvalidLabel(_) | Self::InvalidSymbolName(_) => Some(format!("names start with a letter, contain only letters and digits, and are at most {MAX_IDENT_LEN} characters long").into()),
            Self::UnknownDirective(_)   => Some("valid directives are .data, .string, .extern and .entry".into()),
            Self::UnknownInstruction(_) => Some("mnemonics are lowercase; if this is a label, add a ':' after it".into()),
            Self::ExpectedInstruction   => None,
            Self::TooManyOperands { .. } | Self::TooFewOperands { .. } => None,
            Self::EmptyOperand | Self::TrailingComma => Some("remove the extra comma".into()),
            Self::ExpectedComma         => Some("separate operands with a comma".into()),
            Self::InvalidOperand(_)     => Some("operands are #<int>, &<label>, r0-r7, or <label>".into()),
            Self::RelativeNotAllowed(_) => Some("relative operands can only be used with jmp, bne and jsr".into()),
            Self::EmptyData | Self::InvalidDataValue(_) => Some("write .data followed by comma-separated integers, like .data 7, -57, +17".into()),
            Self::ExpectedString        => Some(r#"write .string followed by a quoted string, like .string "abcdef""#.into()),
            Self::ExpectedSymbol(_)     => None,
            Self::UnexpectedToken(_)    => Some("remove this token".into()),
        }
    }
}

/// Error from parsing a line.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ParseErr {
    /// The kind of error.
    pub kind: ParseErrKind,
    /// The 1-indexed line number where the error occurred.
    pub line: usize,
    /// The 1-indexed column where the error occurred.
    pub col: usize,
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for ParseErr {
    fn pos(&self) -> Option<(usize, usize)> {
        Some((self.line, self.col))
    }

    fn help(&self) -> Option<Cow<str>> {
        self.kind.help()
    }
}

/// Parses one line of source text.
///
/// `line_no` is the 1-indexed line number recorded in the result (and any error).
/// This is a pure function of its arguments: parsing the same line twice gives equal results.
///
/// # Example
/// ```
/// use asm14::ast::{LineKind, Opcode};
/// use asm14::parse::parse_line;
///
/// let line = parse_line("LOOP: mov r1, r2 ; copy", 1);
/// assert_eq!(line.label.unwrap().name, "LOOP");
/// let LineKind::Command(instr) = line.kind else { panic!("expected command") };
/// assert_eq!(instr.opcode, Opcode::Mov);
/// assert_eq!(instr.operands.len(), 2);
///
/// let line = parse_line("mov r1, r2, r3", 2);
/// assert!(matches!(line.kind, LineKind::Invalid(_)));
/// ```
pub fn parse_line(text: &str, line_no: usize) -> ParsedLine {
    let trimmed = text.trim();
    let (label, kind) = if trimmed.is_empty() {
        (None, LineKind::Empty)
    } else if trimmed.starts_with(';') {
        (None, LineKind::Comment)
    } else {
        match LineParser::new(text).and_then(|p| p.parse()) {
            Ok((label, kind)) => (label, kind),
            Err((kind, span)) => (None, LineKind::Invalid(ParseErr { kind, line: line_no, col: column(text, span.start) })),
        }
    };

    ParsedLine { line_no, label, kind }
}

type PResult<T> = Result<T, (ParseErrKind, Range<usize>)>;

/// The tokens of one line, with a cursor.
struct LineParser<'s> {
    src: &'s str,
    tokens: Vec<(Token, Range<usize>)>,
    index: usize,
}
impl<'s> LineParser<'s> {
    fn new(src: &'s str) -> PResult<Self> {
        let mut tokens = vec![];
        for (result, span) in Token::lexer(src).spanned() {
            match result {
                // Everything after this is a comment.
                Ok(Token::Comment) => break,
                Ok(t)  => tokens.push((t, span)),
                Err(e) => return Err((ParseErrKind::Lex(e), span)),
            }
        }

        Ok(Self { src, tokens, index: 0 })
    }

    fn peek(&self) -> Option<&(Token, Range<usize>)> {
        self.tokens.get(self.index)
    }
    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let tok = self.tokens.get(self.index).cloned();
        if tok.is_some() { self.index += 1; }
        tok
    }
    /// The text of a given span.
    fn slice(&self, span: &Range<usize>) -> &'s str {
        &self.src[span.clone()]
    }
    /// The span right after the last token (for errors about something missing).
    fn eol_span(&self) -> Range<usize> {
        let end = self.tokens.last().map_or(0, |(_, s)| s.end);
        end..end
    }
    /// Takes the remaining tokens, grouped by commas.
    ///
    /// Each group carries the span of the comma before it
    /// (or the end of the line, for the first group).
    fn comma_groups(&mut self) -> Vec<(Vec<(Token, Range<usize>)>, Range<usize>)> {
        let rest = &self.tokens[self.index..];
        self.index = self.tokens.len();
        if rest.is_empty() { return vec![]; }

        let mut groups = vec![(vec![], rest[0].1.clone())];
        for (tok, span) in rest {
            match tok {
                Token::Comma => groups.push((vec![], span.clone())),
                _ => if let Some((g, _)) = groups.last_mut() { g.push((tok.clone(), span.clone())) },
            }
        }
        groups
    }

    fn parse(mut self) -> PResult<(Option<Label>, LineKind)> {
        let label = self.parse_label()?;

        let Some((tok, span)) = self.advance() else {
            return Ok((label, LineKind::LabelOnly));
        };
        let kind = match tok {
            Token::Directive(d) => LineKind::Directive(self.parse_directive(d, span)?),
            Token::Ident(id) => match Opcode::from_mnemonic(&id) {
                Some(opcode) => LineKind::Command(self.parse_instr(opcode)?),
                None => return Err((ParseErrKind::UnknownInstruction(id), span)),
            },
            _ => return Err((ParseErrKind::ExpectedInstruction, span)),
        };

        Ok((label, kind))
    }

    fn parse_label(&mut self) -> PResult<Option<Label>> {
        let [(first, fspan), (Token::Colon, cspan), ..] = &self.tokens[..] else {
            return Ok(None);
        };

        let label = match first {
            Token::Ident(name) if fspan.end == cspan.start && is_valid_identifier(name) => {
                Label::new(name.clone(), fspan.clone(), self.src)
            },
            _ => return Err((ParseErrKind::InvalidLabel(self.slice(fspan).to_string()), fspan.clone())),
        };
        self.index = 2;

        Ok(Some(label))
    }

    fn parse_directive(&mut self, name: String, dspan: Range<usize>) -> PResult<Directive> {
        match &*name {
            "data"   => self.parse_data(dspan),
            "string" => {
                let directive = match self.advance() {
                    Some((Token::String(s), _)) => Directive::String(s),
                    Some((_, span)) => return Err((ParseErrKind::ExpectedString, span)),
                    None => return Err((ParseErrKind::ExpectedString, self.eol_span())),
                };
                self.expect_end()?;
                Ok(directive)
            },
            "extern" => Ok(Directive::Extern(self.parse_symbol_arg("extern")?)),
            "entry"  => Ok(Directive::Entry(self.parse_symbol_arg("entry")?)),
            _ => Err((ParseErrKind::UnknownDirective(name), dspan)),
        }
    }

    fn parse_data(&mut self, dspan: Range<usize>) -> PResult<Directive> {
        let groups = self.comma_groups();
        if groups.is_empty() {
            return Err((ParseErrKind::EmptyData, dspan));
        }

        let last = groups.len() - 1;
        let mut values = Vec::with_capacity(groups.len());
        for (i, (group, comma)) in groups.into_iter().enumerate() {
            match &group[..] {
                [] if i == last => return Err((ParseErrKind::TrailingComma, comma)),
                [] => return Err((ParseErrKind::EmptyOperand, comma)),
                [(Token::Int(v), _)] => values.push(*v),
                [(_, span)] => return Err((ParseErrKind::InvalidDataValue(self.slice(span).to_string()), span.clone())),
                [_, (_, span), ..] => return Err((ParseErrKind::ExpectedComma, span.clone())),
            }
        }

        Ok(Directive::Data(values))
    }

    fn parse_symbol_arg(&mut self, directive: &'static str) -> PResult<Label> {
        let label = match self.advance() {
            Some((Token::Ident(name), span)) if is_valid_identifier(&name) => Label::new(name, span, self.src),
            Some((_, span)) => return Err((ParseErrKind::InvalidSymbolName(self.slice(&span).to_string()), span)),
            None => return Err((ParseErrKind::ExpectedSymbol(directive), self.eol_span())),
        };
        self.expect_end()?;

        Ok(label)
    }

    fn expect_end(&mut self) -> PResult<()> {
        match self.peek() {
            Some((_, span)) => Err((ParseErrKind::UnexpectedToken(self.slice(span).to_string()), span.clone())),
            None => Ok(()),
        }
    }

    fn parse_instr(&mut self, opcode: Opcode) -> PResult<Instr> {
        let expected = opcode.operand_count();
        let groups = self.comma_groups();

        if groups.len() > expected {
            let (extra, comma) = &groups[expected];
            // `clr r1,` is a stray comma, `clr r1, r2` is an extra operand
            return match (&extra[..], groups.len() == expected + 1) {
                ([], true) if expected > 0 => Err((ParseErrKind::TrailingComma, comma.clone())),
                ([], _) => Err((ParseErrKind::TooManyOperands { opcode, found: groups.len() }, comma.clone())),
                ([(_, span), ..], _) => Err((ParseErrKind::TooManyOperands { opcode, found: groups.len() }, span.clone())),
            };
        }

        let mut operands = Vec::with_capacity(expected);
        for (group, comma) in &groups {
            match &group[..] {
                [] => return Err((ParseErrKind::EmptyOperand, comma.clone())),
                [(tok, span)] => operands.push(self.parse_operand(opcode, tok, span)?),
                [_, (_, span), ..] => return Err((ParseErrKind::ExpectedComma, span.clone())),
            }
        }

        if operands.len() < expected {
            return Err((ParseErrKind::TooFewOperands { opcode, found: operands.len() }, self.eol_span()));
        }

        Ok(Instr { opcode, operands })
    }

    fn parse_operand(&self, opcode: Opcode, tok: &Token, span: &Range<usize>) -> PResult<Operand> {
        let raw = self.slice(span);
        let invalid = || (ParseErrKind::InvalidOperand(raw.to_string()), span.clone());

        let kind = match tok {
            Token::Imm(v) => OperandKind::Immediate(*v),
            Token::Reg(r) => OperandKind::Register(Reg(*r)),
            Token::Relative(name) if !is_valid_identifier(name) => return Err(invalid()),
            Token::Relative(_) if !opcode.is_jump() => return Err((ParseErrKind::RelativeNotAllowed(opcode), span.clone())),
            Token::Relative(name) => OperandKind::Relative(name.clone()),
            Token::Ident(name) if is_valid_identifier(name) => OperandKind::Direct(name.clone()),
            _ => return Err(invalid()),
        };

        Ok(Operand { kind, raw: raw.to_string(), span: span.clone(), col: column(self.src, span.start) })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Directive, LineKind, Opcode, OperandKind, ParsedLine, Reg};
    use super::{parse_line, ParseErrKind};

    fn assert_parse_fail(line: &str, kind: ParseErrKind) {
        match parse_line(line, 1).kind {
            LineKind::Invalid(e) => assert_eq!(e.kind, kind, "line {line:?} failed with the wrong error"),
            k => panic!("line {line:?} was expected to fail, but parsed as {k:?}"),
        }
    }
    fn operands(line: &str) -> Vec<OperandKind> {
        match parse_line(line, 1).kind {
            LineKind::Command(instr) => instr.operands.into_iter().map(|op| op.kind).collect(),
            k => panic!("line {line:?} was expected to be a command, but parsed as {k:?}"),
        }
    }

    #[test]
    fn test_trivial_lines() {
        assert_eq!(parse_line("", 1).kind, LineKind::Empty);
        assert_eq!(parse_line("   \t ", 1).kind, LineKind::Empty);
        assert_eq!(parse_line("; comment", 1).kind, LineKind::Comment);
        assert_eq!(parse_line("    ;; indented", 1).kind, LineKind::Comment);

        let line = parse_line("END:", 7);
        assert_eq!(line.line_no, 7);
        assert_eq!(line.kind, LineKind::LabelOnly);
        assert_eq!(line.label.unwrap().name, "END");

        assert_eq!(parse_line("END: ; nothing here", 1).kind, LineKind::LabelOnly);
    }

    #[test]
    fn test_labels() {
        let line = parse_line("  MAIN: stop", 1);
        let label = line.label.unwrap();
        assert_eq!(label.name, "MAIN");
        assert_eq!(label.span(), 2..6);
        assert_eq!(label.col(), 3);

        assert_parse_fail("1abc: stop", ParseErrKind::Lex(crate::err::LexErr::InvalidNumeric));
        assert_parse_fail("r1: stop", ParseErrKind::InvalidLabel("r1".to_string()));
        assert_parse_fail("a_b: stop", ParseErrKind::InvalidLabel("a_b".to_string()));
        assert_parse_fail("L : stop", ParseErrKind::InvalidLabel("L".to_string()));

        let long = "A".repeat(32);
        assert_parse_fail(&format!("{long}: stop"), ParseErrKind::InvalidLabel(long.clone()));
        let ok = "A".repeat(31);
        assert_eq!(parse_line(&format!("{ok}: stop"), 1).label.unwrap().name, ok);
    }

    #[test]
    fn test_directives() {
        assert_eq!(
            parse_line(".data 5,-2,7", 1).kind,
            LineKind::Directive(Directive::Data(vec![5, -2, 7]))
        );
        assert_eq!(
            parse_line("LIST: .data +7 , -57 ,17 ; list", 1).kind,
            LineKind::Directive(Directive::Data(vec![7, -57, 17]))
        );
        assert_eq!(
            parse_line(r#"STR: .string "ab cd""#, 1).kind,
            LineKind::Directive(Directive::String("ab cd".to_string()))
        );

        let LineKind::Directive(Directive::Extern(label)) = parse_line(".extern W", 1).kind else {
            panic!("expected .extern");
        };
        assert_eq!(label.name, "W");

        let LineKind::Directive(Directive::Entry(label)) = parse_line(".entry MAIN", 1).kind else {
            panic!("expected .entry");
        };
        assert_eq!(label.name, "MAIN");
    }

    #[test]
    fn test_directive_errors() {
        assert_parse_fail(".word 5", ParseErrKind::UnknownDirective("word".to_string()));
        assert_parse_fail(".data", ParseErrKind::EmptyData);
        assert_parse_fail(".data 1,,2", ParseErrKind::EmptyOperand);
        assert_parse_fail(".data 1,2,", ParseErrKind::TrailingComma);
        assert_parse_fail(".data 1 2", ParseErrKind::ExpectedComma);
        assert_parse_fail(".data 1, x", ParseErrKind::InvalidDataValue("x".to_string()));
        assert_parse_fail(".data #1", ParseErrKind::InvalidDataValue("#1".to_string()));
        assert_parse_fail(".string abc", ParseErrKind::ExpectedString);
        assert_parse_fail(".string", ParseErrKind::ExpectedString);
        assert_parse_fail(r#".string "abc"#, ParseErrKind::Lex(crate::err::LexErr::UnclosedStrLit));
        assert_parse_fail(".extern", ParseErrKind::ExpectedSymbol("extern"));
        assert_parse_fail(".entry 5", ParseErrKind::InvalidSymbolName("5".to_string()));
        assert_parse_fail(".extern A B", ParseErrKind::UnexpectedToken("B".to_string()));

        let msg = match parse_line(".bogus", 3).kind {
            LineKind::Invalid(e) => e.to_string(),
            k => panic!("expected error, got {k:?}"),
        };
        assert!(msg.contains("unknown directive"), "{msg}");
    }

    #[test]
    fn test_operands() {
        assert_eq!(operands("mov r1, r2"), [
            OperandKind::Register(Reg(1)),
            OperandKind::Register(Reg(2)),
        ]);
        assert_eq!(operands("cmp #-5,LIST"), [
            OperandKind::Immediate(-5),
            OperandKind::Direct("LIST".to_string()),
        ]);
        assert_eq!(operands("jmp &LOOP"), [OperandKind::Relative("LOOP".to_string())]);
        assert_eq!(operands("prn #+12"), [OperandKind::Immediate(12)]);
        assert_eq!(operands("clr r8"), [OperandKind::Direct("r8".to_string())]);
        assert_eq!(operands("stop"), []);
        assert_eq!(operands("rts ; return"), []);

        // not range-checked yet
        assert_eq!(operands("prn #8192"), [OperandKind::Immediate(8192)]);
    }

    #[test]
    fn test_operand_errors() {
        assert_parse_fail("mov r1, r2, r3", ParseErrKind::TooManyOperands { opcode: Opcode::Mov, found: 3 });
        assert_parse_fail("stop r1", ParseErrKind::TooManyOperands { opcode: Opcode::Stop, found: 1 });
        assert_parse_fail("clr r1,", ParseErrKind::TrailingComma);
        assert_parse_fail("mov r1", ParseErrKind::TooFewOperands { opcode: Opcode::Mov, found: 1 });
        assert_parse_fail("inc", ParseErrKind::TooFewOperands { opcode: Opcode::Inc, found: 0 });
        assert_parse_fail("mov , r2", ParseErrKind::EmptyOperand);
        assert_parse_fail("mov r1 r2", ParseErrKind::ExpectedComma);
        assert_parse_fail("mov &X, r1", ParseErrKind::RelativeNotAllowed(Opcode::Mov));
        assert_parse_fail("jmp &", ParseErrKind::InvalidOperand("&".to_string()));
        assert_parse_fail("inc 5", ParseErrKind::InvalidOperand("5".to_string()));
        assert_parse_fail("inc x_y", ParseErrKind::InvalidOperand("x_y".to_string()));
        assert_parse_fail("MOV r1, r2", ParseErrKind::UnknownInstruction("MOV".to_string()));
        assert_parse_fail("5 r1", ParseErrKind::ExpectedInstruction);

        let msg = match parse_line("mov r1, r2, r3", 1).kind {
            LineKind::Invalid(e) => e.to_string(),
            k => panic!("expected error, got {k:?}"),
        };
        assert!(msg.contains("too many operands"), "{msg}");
    }

    #[test]
    fn test_error_position() {
        let LineKind::Invalid(e) = parse_line("    mov r1, r2, r3", 12).kind else {
            panic!("expected error");
        };
        assert_eq!(e.line, 12);
        assert_eq!(e.col, 17);

        // Columns count characters, not bytes.
        let LineKind::Invalid(e) = parse_line("S: .string \"éé\" x", 1).kind else {
            panic!("expected error");
        };
        assert_eq!(e.kind, ParseErrKind::UnexpectedToken("x".to_string()));
        assert_eq!(e.col, 17);
    }

    #[test]
    fn test_word_len() {
        let len = |line: &str| match parse_line(line, 1).kind {
            LineKind::Command(instr) => instr.word_len(),
            k => panic!("expected command, got {k:?}"),
        };
        assert_eq!(len("mov r1, r2"), 1);
        assert_eq!(len("mov #1, r2"), 2);
        assert_eq!(len("mov X, Y"), 3);
        assert_eq!(len("jmp &L"), 2);
        assert_eq!(len("stop"), 1);
    }

    #[test]
    fn test_idempotent() {
        let lines = [
            "LOOP: mov r1, r2",
            ".data 5,-2,7",
            "mov r1, r2, r3",
            r#"S: .string "hi""#,
            "bne &END ; back",
        ];
        for line in lines {
            let a: ParsedLine = parse_line(line, 4);
            let b: ParsedLine = parse_line(line, 4);
            assert_eq!(a, b);
        }
    }
}
