//! Tokenizing a single line of assembly.
//!
//! This module holds the tokens of the assembly language ([`Token`]).
//! The parser lexes one source line at a time, so there is no newline token.
//!
//! Like most hand-written assemblers, the lexer is deliberately lenient:
//! identifier-like regexes accept underscores and over-long names, and the
//! parser is responsible for validating them (so it can produce a more
//! specific message than "unrecognized symbol").

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

/// A unit of information in a source line.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\f]+", error = LexErr)]
pub enum Token {
    // Note, these regexes span over tokens that are technically invalid
    // (e.g., 23trst matches for an integer even though it shouldn't).
    // This is intended.
    // These regexes collect what would be considered one discernable unit
    // and validates it using the validator function.

    /// An immediate operand (e.g., `#5`, `#-12`, `#+3`).
    #[regex(r"#[+-]?\w*", lex_immediate)]
    Imm(i32),

    /// A bare integer, as used in `.data` (e.g., `5`, `-2`, `+7`).
    #[regex(r"\d\w*", lex_int)]
    #[regex(r"[+-]\w*", lex_int)]
    Int(i32),

    /// A register (`r0`-`r7`).
    ///
    /// Anything else that starts with `r` (like `r8` or `r12`) is an identifier.
    #[regex(r"r[0-7]", lex_reg, priority = 5)]
    Reg(u8),

    /// A relative operand (e.g., `&LOOP`), holding the referenced name.
    #[regex(r"&\w*", |lx| lx.slice()[1..].to_string())]
    Relative(String),

    /// An identifier.
    ///
    /// This can refer to either:
    /// - a label (e.g., `LOOP`, `END`, `STR1`)
    /// - an instruction (e.g. `mov`, `jmp`, `stop`)
    ///
    /// Unlike directives, identifiers are case-sensitive.
    #[regex(r"[A-Za-z_]\w*", |lx| lx.slice().to_string())]
    Ident(String),

    /// A directive (e.g., `.data`, `.extern`), without the leading dot.
    #[regex(r"\.[A-Za-z_]\w*", |lx| lx.slice()[1..].to_string())]
    Directive(String),

    /// A string literal (e.g., `"Hello!"`).
    ///
    /// The literal closes at the first quote followed only by whitespace or a comment
    /// (or else the last quote of the line), so quotes inside the literal are kept.
    #[token(r#"""#, lex_str_literal)]
    String(String),

    /// A colon, which terminates a label definition.
    #[token(":")]
    Colon,

    /// A comma, which delineate operands of an instruction and values of `.data`.
    #[token(",")]
    Comma,

    /// A comment, which starts with a semicolon and spans the remaining part of the line.
    #[regex(r";.*")]
    Comment,
}

/// Any errors raised in attempting to tokenize a line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LexErr {
    /// Numeric literal cannot fit within the range of an i32.
    DoesNotFitI32,
    /// Numeric literal has invalid digits (i.e., not 0-9).
    InvalidNumeric,
    /// Numeric literal has no digits in it (it's just `#`, `-` or `#-`).
    InvalidNumericEmpty,
    /// String literal is missing an end quotation mark.
    UnclosedStrLit,
    /// A symbol was used which is not allowed in assembly files.
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::DoesNotFitI32       => f.write_str("numeric token does not fit 32-bit signed integer"),
            LexErr::InvalidNumeric      => f.write_str("invalid decimal literal"),
            LexErr::InvalidNumericEmpty => f.write_str("invalid decimal literal"),
            LexErr::UnclosedStrLit      => f.write_str("unclosed string literal"),
            LexErr::InvalidSymbol       => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::DoesNotFitI32       => Some(format!("the range for a 32-bit signed integer is [{}, {}]", i32::MIN, i32::MAX).into()),
            LexErr::InvalidNumeric      => Some("a decimal literal only consists of an optional sign and digits 0-9".into()),
            LexErr::InvalidNumericEmpty => Some("there should be digits (0-9) here".into()),
            LexErr::UnclosedStrLit      => Some("add a quote to the end of the string literal".into()),
            LexErr::InvalidSymbol       => Some("this char does not occur in any token of the assembly language".into()),
        }
    }
}

/// Helper that converts an int error kind to its corresponding LexErr.
fn convert_int_error(e: &IntErrorKind, src: &str) -> LexErr {
    match e {
        IntErrorKind::Empty        => LexErr::InvalidNumericEmpty,
        IntErrorKind::InvalidDigit if matches!(src, "-" | "+") => LexErr::InvalidNumericEmpty,
        IntErrorKind::InvalidDigit => LexErr::InvalidNumeric,
        IntErrorKind::PosOverflow  => LexErr::DoesNotFitI32,
        IntErrorKind::NegOverflow  => LexErr::DoesNotFitI32,
        _ => LexErr::InvalidNumeric,
    }
}
fn parse_signed(string: &str) -> Result<i32, LexErr> {
    // i32::from_str accepts a leading `+`, which is what we want.
    string.parse::<i32>()
        .map_err(|e| convert_int_error(e.kind(), string))
}
fn lex_immediate(lx: &Lexer<'_, Token>) -> Result<i32, LexErr> {
    parse_signed(&lx.slice()[1..])
}
fn lex_int(lx: &Lexer<'_, Token>) -> Result<i32, LexErr> {
    parse_signed(lx.slice())
}
fn lex_reg(lx: &Lexer<'_, Token>) -> u8 {
    lx.slice().as_bytes()[1] - b'0'
}
fn lex_str_literal(lx: &mut Lexer<'_, Token>) -> Result<String, LexErr> {
    let rem = lx.remainder()
        .lines()
        .next()
        .unwrap_or("");

    match str_literal_len(rem) {
        Some(len) => {
            lx.bump(len + 1);
            Ok(rem[..len].to_string())
        },
        None => {
            lx.bump(rem.len());
            Err(LexErr::UnclosedStrLit)
        }
    }
}

/// Finds the closing quote of a string literal, given the rest of the line after its opening quote.
///
/// The literal closes at the first quote followed only by whitespace or a comment.
/// If no quote fits, it closes at the last quote of the line.
/// Quotes inside a literal are therefore taken as-is.
pub(crate) fn str_literal_len(rem: &str) -> Option<usize> {
    rem.match_indices('"')
        .map(|(i, _)| i)
        .find(|&i| {
            let after = rem[i + 1..].trim_start();
            after.is_empty() || after.starts_with(';')
        })
        .or_else(|| rem.rfind('"'))
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::err::LexErr;
    use crate::parse::lex::Token;

    fn ident(s: &str) -> Token {
        Token::Ident(s.to_string())
    }
    fn str_literal(s: &str) -> Token {
        Token::String(s.to_string())
    }

    #[test]
    fn test_numeric_success() {
        let mut tokens = Token::lexer("0 123 -456 +789");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(123))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-456))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(789))));
        assert_eq!(tokens.next(), None);

        let mut tokens = Token::lexer("#100 #-200 #+300 #8192");
        assert_eq!(tokens.next(), Some(Ok(Token::Imm(100))));
        assert_eq!(tokens.next(), Some(Ok(Token::Imm(-200))));
        assert_eq!(tokens.next(), Some(Ok(Token::Imm(300))));
        assert_eq!(tokens.next(), Some(Ok(Token::Imm(8192))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_numeric_invalid() {
        assert_eq!(Token::lexer("#Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("#").next(), Some(Err(LexErr::InvalidNumericEmpty)));
        assert_eq!(Token::lexer("#-").next(), Some(Err(LexErr::InvalidNumericEmpty)));
        assert_eq!(Token::lexer("-").next(), Some(Err(LexErr::InvalidNumericEmpty)));
        assert_eq!(Token::lexer("99999999999").next(), Some(Err(LexErr::DoesNotFitI32)));
        assert_eq!(Token::lexer("#-99999999999").next(), Some(Err(LexErr::DoesNotFitI32)));
    }

    #[test]
    fn test_regs() {
        let mut tokens = Token::lexer("r0 r1 r2 r3 r4 r5 r6 r7");
        for i in 0..8 {
            assert_eq!(tokens.next(), Some(Ok(Token::Reg(i))));
        }
        assert_eq!(tokens.next(), None);

        // Not registers:
        let mut tokens = Token::lexer("r8 r12 R1 r");
        assert_eq!(tokens.next(), Some(Ok(ident("r8"))));
        assert_eq!(tokens.next(), Some(Ok(ident("r12"))));
        assert_eq!(tokens.next(), Some(Ok(ident("R1"))));
        assert_eq!(tokens.next(), Some(Ok(ident("r"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_relative() {
        let mut tokens = Token::lexer("&LOOP &");
        assert_eq!(tokens.next(), Some(Ok(Token::Relative("LOOP".to_string()))));
        assert_eq!(tokens.next(), Some(Ok(Token::Relative(String::new()))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_str() {
        let mut tokens = Token::lexer(r#" "abc" "#);
        assert_eq!(tokens.next(), Some(Ok(str_literal("abc"))));
        assert_eq!(tokens.next(), None);

        let mut tokens = Token::lexer(r#""""#);
        assert_eq!(tokens.next(), Some(Ok(str_literal(""))));
        assert_eq!(tokens.next(), None);

        // Quotes inside the literal are kept:
        let mut tokens = Token::lexer(r#""say "hi"" ; done"#);
        assert_eq!(tokens.next(), Some(Ok(str_literal(r#"say "hi""#))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comment)));
        assert_eq!(tokens.next(), None);

        // A quote in a trailing comment is not part of the literal:
        let mut tokens = Token::lexer(r#""ab" ; prints "ab""#);
        assert_eq!(tokens.next(), Some(Ok(str_literal("ab"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comment)));
        assert_eq!(tokens.next(), None);

        // Nothing fits, so the last quote closes it:
        let mut tokens = Token::lexer(r#""a" b""#);
        assert_eq!(tokens.next(), Some(Ok(str_literal(r#"a" b"#))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_str_unclosed() {
        assert_eq!(Token::lexer(r#"""#).next(), Some(Err(LexErr::UnclosedStrLit)));
        assert_eq!(Token::lexer(r#""abc"#).next(), Some(Err(LexErr::UnclosedStrLit)));
    }

    #[test]
    fn test_idents_directives() {
        let mut tokens = Token::lexer("mov LOOP x_1 .data .string .");
        assert_eq!(tokens.next(), Some(Ok(ident("mov"))));
        assert_eq!(tokens.next(), Some(Ok(ident("LOOP"))));
        assert_eq!(tokens.next(), Some(Ok(ident("x_1"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Directive("data".to_string()))));
        assert_eq!(tokens.next(), Some(Ok(Token::Directive("string".to_string()))));
        assert_eq!(tokens.next(), Some(Err(LexErr::InvalidSymbol)));
    }

    #[test]
    fn test_punct() {
        let mut tokens = Token::lexer("L: 1,2 ;; abcdef");
        assert_eq!(tokens.next(), Some(Ok(ident("L"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Colon)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(1))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comma)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(2))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comment)));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_invalid_symbol() {
        for c in ['@', '$', '%', '!', '(', ')', '*', '/', '<', '=', '>', '?', '[', ']', '^', '{', '}', '~', '|', '\\'] {
            let string = c.to_string();
            assert_eq!(
                Token::lexer(&string).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "Expected {string:?} to be an invalid symbol"
            );
        }
    }
}
