//! The first assembler pass.
//!
//! This walks the expanded source once, assigning an address to every label:
//! - Labels of instructions get the current instruction counter (IC), which starts at [`LOAD_ADDRESS`].
//! - Labels of `.data`/`.string` get the current data counter (DC), which starts at 0.
//!
//! Once the whole unit is seen, data symbols are rebased to sit right after the code segment.
//! The values of all `.data`/`.string` directives are queued (in order) for the second pass.

use crate::ast::{Directive, Label, LineKind, Opcode};
use crate::macros::ExpandedSource;
use crate::parse::parse_line;

use super::{AsmErr, AsmErrKind, SymbolErr, SymbolKind, SymbolTable, LOAD_ADDRESS, MEMORY_SIZE};

/// The result of the first pass.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Analysis {
    /// The symbol table, with data symbols already rebased.
    pub symbols: SymbolTable,
    /// The address right after the last code word (the final IC).
    pub code_end: u16,
    /// The queued data values, in order of appearance.
    pub data: Vec<i32>,
}

/// Runs the first pass.
///
/// Every line is examined even after an error, so all errors of the pass are returned together.
///
/// # Example
/// ```
/// use asm14::asm::analyze::analyze;
/// use asm14::macros::ExpandedSource;
///
/// let src = ExpandedSource::from("MAIN: mov #1, r2\nLIST: .data 4, 5\nstop");
/// let analysis = analyze(&src).unwrap();
/// assert_eq!(analysis.code_end, 103);
/// assert_eq!(analysis.data, [4, 5]);
/// assert_eq!(analysis.symbols.find("LIST").unwrap().addr, 103);
/// ```
pub fn analyze(src: &ExpandedSource) -> Result<Analysis, Vec<AsmErr>> {
    let mut symbols = SymbolTable::new();
    let mut ic = LOAD_ADDRESS;
    let mut data: Vec<i32> = vec![];
    let mut errors = vec![];

    for line in src.lines() {
        let parsed = parse_line(&line.text, line.origin);
        let line_no = parsed.line_no;

        let result = match parsed.kind {
            LineKind::Empty | LineKind::Comment => Ok(()),
            LineKind::LabelOnly => {
                let col = parsed.label.as_ref().map_or(0, Label::col);
                Err(AsmErr::new(AsmErrKind::LabelOnly, (line_no, col)))
            },
            LineKind::Invalid(e) => Err(AsmErr::from(e)),
            LineKind::Directive(Directive::Extern(name)) => {
                warn_ignored_label(parsed.label.as_ref(), "extern", line_no);
                symbols.add(&name.name, 0, SymbolKind::Extern)
                    .map_err(|e| symbol_err(e, line_no, &name))
            },
            // .entry is applied in the second pass, once every symbol is known.
            LineKind::Directive(Directive::Entry(_)) => {
                warn_ignored_label(parsed.label.as_ref(), "entry", line_no);
                Ok(())
            },
            LineKind::Directive(directive) => {
                let dc = data.len() as u16;
                let values = directive.data_values();
                for &v in &values {
                    if !(-(1 << 13)..(1 << 14)).contains(&v) {
                        tracing::warn!("line {line_no}: data value {v} does not fit in 14 bits and will be truncated");
                    }
                }
                data.extend(values);

                match &parsed.label {
                    Some(label) => define(&mut symbols, label, dc, SymbolKind::Data, line_no),
                    None => Ok(()),
                }
            },
            LineKind::Command(instr) => {
                let result = match &parsed.label {
                    Some(label) => define(&mut symbols, label, ic, SymbolKind::Code, line_no),
                    None => Ok(()),
                };
                ic = ic.saturating_add(instr.word_len());
                result
            },
        };

        if let Err(e) = result {
            errors.push(e);
        }
    }

    let total = usize::from(ic) + data.len();
    if total > MEMORY_SIZE {
        errors.push(AsmErr::new(AsmErrKind::ProgramTooLarge(total), (0, 0)));
    }

    symbols.rebase_data_symbols(ic);
    tracing::debug!("first pass: IC={ic}, DC={}, {} symbol(s), {} error(s)", data.len(), symbols.len(), errors.len());

    match errors.is_empty() {
        true  => Ok(Analysis { symbols, code_end: ic, data }),
        false => Err(errors),
    }
}

fn define(symbols: &mut SymbolTable, label: &Label, addr: u16, kind: SymbolKind, line_no: usize) -> Result<(), AsmErr> {
    if Opcode::from_mnemonic(&label.name).is_some() {
        return Err(AsmErr::new(AsmErrKind::LabelIsMnemonic(label.name.clone()), (line_no, label.col())));
    }

    symbols.add(&label.name, addr, kind)
        .map_err(|e| symbol_err(e, line_no, label))
}

fn symbol_err(e: SymbolErr, line_no: usize, label: &Label) -> AsmErr {
    let kind = match e {
        SymbolErr::Duplicate(s)      => AsmErrKind::DuplicateSymbol(s),
        SymbolErr::ExternConflict(s) => AsmErrKind::ExternConflict(s),
        SymbolErr::Unknown(s)        => AsmErrKind::UnknownEntry(s),
        SymbolErr::External(s)       => AsmErrKind::EntryExternal(s),
    };
    AsmErr::new(kind, (line_no, label.col()))
}

fn warn_ignored_label(label: Option<&Label>, directive: &str, line_no: usize) {
    if let Some(label) = label {
        tracing::warn!("line {line_no}: label {label} on .{directive} is ignored");
    }
}
