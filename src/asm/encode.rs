//! The second assembler pass.
//!
//! This walks the expanded source again, with the complete symbol table from [`analyze`],
//! and emits the memory words of every instruction. The queued data values are appended after the code.
//!
//! The first word of an instruction is laid out as:
//! ```text
//!  15  12 11 10 9  8 7    4 3   0
//! [ 0000 | dst | src | opc  | 0000 ]
//! ```
//! where `dst`/`src` are [`AddrMode`] numbers. Each operand that is not a register
//! is followed by one extra word (in operand order).
//!
//! [`analyze`]: super::analyze
//! [`AddrMode`]: crate::ast::AddrMode

use crate::ast::{AddrMode, Directive, IOffset, Instr, LineKind, Operand, OperandKind};
use crate::macros::ExpandedSource;
use crate::parse::parse_line;

use super::analyze::Analysis;
use super::{Are, AsmErr, AsmErrKind, ObjectFile, SymbolErr, SymbolKind, SymbolTable, Word, ADDR_MASK, LOAD_ADDRESS};

/// Runs the second pass.
///
/// Errors do not stop the pass. A line with an error emits no words,
/// but the instruction counter still advances past it.
///
/// # Example
/// ```
/// use asm14::asm::analyze::analyze;
/// use asm14::asm::encode::encode;
/// use asm14::macros::ExpandedSource;
///
/// let src = ExpandedSource::from(".extern PUTS\njsr PUTS\nstop");
/// let analysis = analyze(&src).unwrap();
/// let obj = encode(&src, analysis).unwrap();
/// assert_eq!(obj.externs(), [("PUTS".to_string(), 101)]);
/// ```
pub fn encode(src: &ExpandedSource, analysis: Analysis) -> Result<ObjectFile, Vec<AsmErr>> {
    let Analysis { symbols: mut sym, code_end, data } = analysis;

    let mut words = vec![];
    let mut entries: Vec<(String, u16)> = vec![];
    let mut externs = vec![];
    let mut errors = vec![];
    let mut ic = LOAD_ADDRESS;

    for line in src.lines() {
        let parsed = parse_line(&line.text, line.origin);
        let line_no = parsed.line_no;

        match parsed.kind {
            LineKind::Command(instr) => {
                match encode_instr(&instr, ic, &sym, line_no) {
                    Ok((instr_words, instr_externs)) => {
                        tracing::trace!("line {line_no}: {} word(s) at {ic}", instr_words.len());
                        words.extend(instr_words);
                        externs.extend(instr_externs);
                    },
                    Err(e) => errors.push(e),
                }
                ic = ic.saturating_add(instr.word_len());
            },
            LineKind::Directive(Directive::Entry(label)) => {
                match sym.promote_to_entry(&label.name) {
                    Ok(_) if entries.iter().any(|(name, _)| *name == label.name) => {
                        tracing::warn!("line {line_no}: {label} was already declared as an entry");
                    },
                    Ok(addr) => entries.push((label.name, addr)),
                    Err(e) => {
                        let kind = match e {
                            SymbolErr::External(s) => AsmErrKind::EntryExternal(s),
                            _ => AsmErrKind::UnknownEntry(label.name.clone()),
                        };
                        errors.push(AsmErr::new(kind, (line_no, label.col())));
                    },
                }
            },
            LineKind::Invalid(e) => errors.push(AsmErr::from(e)),
            _ => {}
        }
    }
    debug_assert_eq!(ic, code_end, "both passes should agree on the code size");

    let code_len = words.len();
    words.extend({
        data.iter()
            .enumerate()
            .map(|(i, &v)| Word::new(code_end.wrapping_add(i as u16), v as u16, Are::Absolute))
    });
    tracing::debug!("second pass: {code_len} code word(s), {} data word(s), {} error(s)", data.len(), errors.len());

    match errors.is_empty() {
        true => Ok(ObjectFile {
            words,
            code_len,
            data_len: data.len(),
            entries,
            externs,
            sym,
        }),
        false => Err(errors),
    }
}

/// Encodes one instruction at address `ic`,
/// returning its words and the extern records of those words.
fn encode_instr(instr: &Instr, ic: u16, sym: &SymbolTable, line_no: usize) -> Result<(Vec<Word>, Vec<(String, u16)>), AsmErr> {
    let (src_mode, dst_mode) = match &instr.operands[..] {
        [src, dst] => (src.mode() as u16, dst.mode() as u16),
        [dst] => (AddrMode::Immediate as u16, dst.mode() as u16),
        _ => (0, 0),
    };
    let first = dst_mode << 10 | src_mode << 8 | u16::from(instr.opcode.number()) << 4;

    let mut words = vec![Word::new(ic, first, Are::Absolute)];
    let mut externs = vec![];
    let operands = instr.operands.iter()
        .filter(|op| op.mode() != AddrMode::RegisterDirect);

    for (addr, op) in (ic.wrapping_add(1)..).zip(operands) {
        let err = |kind| AsmErr::new(kind, (line_no, op.col));

        let (value, are) = match &op.kind {
            OperandKind::Immediate(v) => {
                let off = IOffset::<14>::new(*v).map_err(|e| err(AsmErrKind::ImmediateRange(e)))?;
                (off.to_bits(), Are::Absolute)
            },
            OperandKind::Relative(name) => {
                let target = lookup(sym, name, op, line_no)?;
                if target.kind == SymbolKind::Extern {
                    return Err(err(AsmErrKind::OffsetExternal));
                }
                let disp = i32::from(target.addr) - i32::from(addr);
                let off = IOffset::<14>::new(disp).map_err(|e| err(AsmErrKind::RelativeRange(e)))?;
                (off.to_bits(), Are::Relative)
            },
            OperandKind::Direct(name) => {
                let target = lookup(sym, name, op, line_no)?;
                match target.kind {
                    SymbolKind::Extern => {
                        externs.push((name.clone(), addr));
                        (target.addr & ADDR_MASK, Are::External)
                    },
                    _ => (target.addr & ADDR_MASK, Are::Relocatable),
                }
            },
            OperandKind::Register(_) => unreachable!("register operands do not have their own word"),
        };

        words.push(Word::new(addr, value, are));
    }

    Ok((words, externs))
}

fn lookup<'a>(sym: &'a SymbolTable, name: &str, op: &Operand, line_no: usize) -> Result<&'a super::Symbol, AsmErr> {
    sym.find(name)
        .ok_or_else(|| AsmErr::new(AsmErrKind::UndefinedSymbol(name.to_string()), (line_no, op.col)))
}
