//! Assembling expanded source into object files.
//!
//! This module is used to convert source (after macro expansion) into an [`ObjectFile`]:
//! a stream of memory words plus the entry and extern records of the unit.
//!
//! The assembler module notably consists of:
//! - [`assemble`] and [`assemble_expanded`]: the main functions, which run the whole pipeline.
//! - [`analyze`]: the first pass, which builds the [`SymbolTable`] and queues data values.
//! - [`encode`]: the second pass, which resolves operands and emits [`Word`]s.
//! - [`encoding`]: text formats for writing the object, entry and extern streams.
//!
//! Both passes collect every error they find instead of stopping at the first.
//! If the first pass reports any error, the second pass is not run.

pub mod analyze;
pub mod encode;
pub mod encoding;

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::ast::OffsetNewErr;
use crate::err::Diagnostic;
use crate::macros::{ExpandedSource, MacroErr};
use crate::parse::{ParseErr, ParseErrKind};

/// The address of the first instruction.
pub const LOAD_ADDRESS: u16 = 100;
/// The number of addressable words.
pub const MEMORY_SIZE: usize = 4096;
/// Mask for the 14-bit payload of a word.
pub const WORD_MASK: u16 = 0x3FFF;
/// Mask for the 12-bit address stored by a direct operand.
pub const ADDR_MASK: u16 = 0x0FFF;

/// Assembles source text into an object file.
///
/// This expands macros, then runs both assembler passes.
///
/// # Example
/// ```
/// use asm14::asm::{assemble, AsmFlags};
///
/// let src = "
///     MAIN: mov r1, r2
///           stop
///     .entry MAIN
/// ";
/// let obj = assemble(src, &AsmFlags::default()).unwrap();
/// assert_eq!(obj.code_len(), 2);
/// assert_eq!(obj.entries(), [("MAIN".to_string(), 100)]);
/// ```
pub fn assemble(src: &str, flags: &AsmFlags) -> Result<ObjectFile, UnitErr> {
    let expanded = crate::macros::expand(src, flags).map_err(UnitErr::Macro)?;
    assemble_expanded(&expanded).map_err(UnitErr::Asm)
}

/// Assembles source whose macros were already expanded.
///
/// # Example
/// ```
/// use asm14::asm::assemble_expanded;
/// use asm14::macros::ExpandedSource;
///
/// let src = ExpandedSource::from("prn #-1\nstop");
/// let obj = assemble_expanded(&src).unwrap();
/// assert_eq!(obj.words()[1].value, 0x3FFF);
/// ```
pub fn assemble_expanded(src: &ExpandedSource) -> Result<ObjectFile, Vec<AsmErr>> {
    let analysis = analyze::analyze(src)?;
    encode::encode(src, analysis)
}

/// Configuration for the assembler.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct AsmFlags {
    /// Source lines are truncated to this many characters before preprocessing.
    pub max_line_len: usize,
}
impl Default for AsmFlags {
    fn default() -> Self {
        Self { max_line_len: 80 }
    }
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with position information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// The line could not be parsed (pass 1).
    Parse(ParseErrKind),
    /// A label with nothing after it (pass 1).
    LabelOnly,
    /// A label named after an instruction (pass 1).
    LabelIsMnemonic(String),
    /// There were multiple labels of the same name (pass 1).
    DuplicateSymbol(String),
    /// A symbol was declared `.extern` and also defined locally (pass 1).
    ExternConflict(String),
    /// The program's code and data exceed memory (pass 1).
    ProgramTooLarge(usize),
    /// An operand referenced a symbol which was never defined (pass 2).
    UndefinedSymbol(String),
    /// `.entry` referenced a symbol which was never defined (pass 2).
    UnknownEntry(String),
    /// `.entry` referenced an external symbol (pass 2).
    EntryExternal(String),
    /// An immediate operand does not fit in 14 bits (pass 2).
    ImmediateRange(OffsetNewErr),
    /// A relative operand's displacement does not fit in 14 bits (pass 2).
    RelativeRange(OffsetNewErr),
    /// A relative operand referenced an external symbol (pass 2).
    OffsetExternal,
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e)              => e.fmt(f),
            Self::LabelOnly             => f.write_str("label must precede a directive or instruction"),
            Self::LabelIsMnemonic(l)    => write!(f, "label '{l}' conflicts with an instruction name"),
            Self::DuplicateSymbol(s)    => write!(f, "symbol '{s}' was defined multiple times"),
            Self::ExternConflict(s)     => write!(f, "symbol '{s}' is declared external and also defined here"),
            Self::ProgramTooLarge(n)    => write!(f, "program does not fit in memory ({n} words)"),
            Self::UndefinedSymbol(s)    => write!(f, "undefined symbol '{s}'"),
            Self::UnknownEntry(s)       => write!(f, "unknown symbol in entry '{s}'"),
            Self::EntryExternal(s)      => write!(f, "external symbol '{s}' cannot be an entry"),
            Self::ImmediateRange(_)     => f.write_str("immediate value out of range"),
            Self::RelativeRange(_)      => f.write_str("relative offset out of range"),
            Self::OffsetExternal        => f.write_str("cannot use external label here"),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct AsmErr {
    /// The kind of error.
    pub kind: AsmErrKind,
    /// The 1-indexed line in the original source (0 if the error is not tied to a line).
    pub line: usize,
    /// The 1-indexed column (0 if the error applies to the whole line).
    pub col: usize,
}
impl AsmErr {
    /// Creates a new [`AsmErr`] at a given `(line, column)`.
    pub fn new(kind: AsmErrKind, (line, col): (usize, usize)) -> Self {
        AsmErr { kind, line, col }
    }
}
impl From<ParseErr> for AsmErr {
    fn from(value: ParseErr) -> Self {
        AsmErr { kind: AsmErrKind::Parse(value.kind), line: value.line, col: value.col }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::ImmediateRange(e) => Some(e),
            AsmErrKind::RelativeRange(e)  => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr {
    fn pos(&self) -> Option<(usize, usize)> {
        Some((self.line, self.col))
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            AsmErrKind::Parse(e)           => e.help(),
            AsmErrKind::LabelOnly          => Some("try putting this label on the same line as the instruction or directive".into()),
            AsmErrKind::LabelIsMnemonic(_) => Some("try renaming the label".into()),
            AsmErrKind::DuplicateSymbol(_) => Some("labels must be unique within a file, try renaming one of the labels".into()),
            AsmErrKind::ExternConflict(_)  => Some("remove the .extern declaration or rename the local label".into()),
            AsmErrKind::ProgramTooLarge(_) => Some(format!("code and data can use at most {MEMORY_SIZE} words").into()),
            AsmErrKind::UndefinedSymbol(_) => Some("try adding this label before an instruction or directive, or declaring it with .extern".into()),
            AsmErrKind::UnknownEntry(_)    => Some("an entry must be defined in this file".into()),
            AsmErrKind::EntryExternal(_)   => Some("a symbol is either defined here (.entry) or in another file (.extern)".into()),
            AsmErrKind::ImmediateRange(e)  => crate::err::Error::help(e),
            AsmErrKind::RelativeRange(e)   => crate::err::Error::help(e),
            AsmErrKind::OffsetExternal     => Some("external labels cannot be relative operands; try a direct operand".into()),
        }
    }
}

/// The error of a whole unit (one source file).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum UnitErr {
    /// Macro expansion failed; neither pass was run.
    Macro(Vec<MacroErr>),
    /// One of the assembler passes failed.
    Asm(Vec<AsmErr>),
}
impl UnitErr {
    /// All of the errors of the unit, in the order they were found.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            UnitErr::Macro(errs) => errs.iter().map(Diagnostic::new).collect(),
            UnitErr::Asm(errs)   => errs.iter().map(Diagnostic::new).collect(),
        }
    }
}
impl std::fmt::Display for UnitErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitErr::Macro(errs) => write!(f, "macro expansion failed with {} error(s)", errs.len()),
            UnitErr::Asm(errs)   => write!(f, "assembly failed with {} error(s)", errs.len()),
        }
    }
}
impl std::error::Error for UnitErr {}

/// The kind of a symbol.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SymbolKind {
    /// Label of an instruction line.
    Code,
    /// Label of a `.data`/`.string` line.
    Data,
    /// Declared by `.extern`; the address is a placeholder.
    Extern,
    /// A `Code` or `Data` symbol named by `.entry`.
    Entry,
}

/// A symbol table entry.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Symbol {
    /// The name of the symbol.
    pub name: String,
    /// The address of the symbol.
    pub addr: u16,
    /// The kind of the symbol.
    pub kind: SymbolKind,
}

/// Errors from symbol table operations.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum SymbolErr {
    /// The name is already defined.
    Duplicate(String),
    /// The name is defined locally and declared external.
    ExternConflict(String),
    /// The name is not in the table.
    Unknown(String),
    /// An external symbol cannot be promoted to an entry.
    External(String),
}
impl std::fmt::Display for SymbolErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolErr::Duplicate(s)      => write!(f, "symbol '{s}' was defined multiple times"),
            SymbolErr::ExternConflict(s) => write!(f, "symbol '{s}' is declared external and also defined here"),
            SymbolErr::Unknown(s)        => write!(f, "unknown symbol '{s}'"),
            SymbolErr::External(s)       => write!(f, "external symbol '{s}' cannot be an entry"),
        }
    }
}
impl std::error::Error for SymbolErr {}

/// The symbol table of one unit.
///
/// This maps names (case-sensitive) to their address and [`SymbolKind`].
/// At most one symbol exists per name. The only permitted change of kind is
/// the promotion of a `Code` or `Data` symbol to `Entry`.
///
/// ## Example
/// ```
/// use asm14::asm::{SymbolKind, SymbolTable};
///
/// let mut sym = SymbolTable::new();
/// sym.add("MAIN", 100, SymbolKind::Code).unwrap();
/// sym.add("LIST", 2, SymbolKind::Data).unwrap();
/// assert!(sym.add("MAIN", 104, SymbolKind::Code).is_err());
///
/// sym.rebase_data_symbols(110);
/// assert_eq!(sym.find("LIST").unwrap().addr, 112);
///
/// sym.promote_to_entry("MAIN").unwrap();
/// assert_eq!(sym.find("MAIN").unwrap().kind, SymbolKind::Entry);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}
impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol.
    ///
    /// Adding a name that already exists is an error,
    /// unless both declarations are `Extern`.
    pub fn add(&mut self, name: &str, addr: u16, kind: SymbolKind) -> Result<(), SymbolErr> {
        match self.symbols.entry(name.to_string()) {
            // Repeated .extern. No conflict.
            Entry::Occupied(e) if e.get().kind == SymbolKind::Extern && kind == SymbolKind::Extern => Ok(()),
            // Local definition and .extern. Conflict.
            Entry::Occupied(e) if e.get().kind == SymbolKind::Extern || kind == SymbolKind::Extern => {
                Err(SymbolErr::ExternConflict(e.key().clone()))
            },
            // Two local definitions. Conflict.
            Entry::Occupied(e) => Err(SymbolErr::Duplicate(e.key().clone())),
            // New symbol.
            Entry::Vacant(e) => {
                tracing::trace!("symbol {name} = {addr} ({kind:?})");
                let name = e.key().clone();
                e.insert(Symbol { name, addr, kind });
                Ok(())
            }
        }
    }

    /// Looks up a symbol by name.
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Marks a symbol as an entry, returning its address.
    pub fn promote_to_entry(&mut self, name: &str) -> Result<u16, SymbolErr> {
        let sym = self.symbols.get_mut(name)
            .ok_or_else(|| SymbolErr::Unknown(name.to_string()))?;

        match sym.kind {
            SymbolKind::Extern => Err(SymbolErr::External(name.to_string())),
            _ => {
                sym.kind = SymbolKind::Entry;
                Ok(sym.addr)
            }
        }
    }

    /// Moves every `Data` symbol past the end of the code segment.
    ///
    /// This should be called exactly once, after the first pass has seen the whole unit.
    pub fn rebase_data_symbols(&mut self, code_end: u16) {
        for sym in self.symbols.values_mut() {
            if sym.kind == SymbolKind::Data {
                sym.addr = sym.addr.saturating_add(code_end);
            }
        }
    }

    /// The number of symbols in the table.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }
    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// The 2-bit tag stored alongside each word's 14-bit payload.
///
/// It records where the payload's value came from.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Are {
    /// A constant (opcode words, immediates, data).
    Absolute = 0b00,
    /// An address of an external symbol (resolved by a linker).
    External = 0b01,
    /// An address of a symbol in this unit.
    Relocatable = 0b10,
    /// A displacement from this word to a symbol in this unit.
    Relative = 0b11,
}
impl Are {
    /// The 2-bit tag.
    pub fn tag(self) -> u16 {
        self as u16
    }
    /// Reads a tag from the low 2 bits of `tag`.
    pub fn from_tag(tag: u16) -> Self {
        match tag & 0b11 {
            0b00 => Are::Absolute,
            0b01 => Are::External,
            0b10 => Are::Relocatable,
            _    => Are::Relative,
        }
    }
}

/// A memory word emitted by the second pass.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Word {
    /// The address of the word.
    pub addr: u16,
    /// The 14-bit payload.
    pub value: u16,
    /// The provenance tag of the payload.
    pub are: Are,
}
impl Word {
    /// Creates a word, masking `value` to 14 bits.
    pub fn new(addr: u16, value: u16, are: Are) -> Self {
        Word { addr, value: value & WORD_MASK, are }
    }

    /// The 16-bit container: the tag in bits 15:14 and the payload in bits 13:0.
    ///
    /// ```
    /// use asm14::asm::{Are, Word};
    ///
    /// assert_eq!(Word::new(101, 0x0065, Are::Relocatable).packed(), 0x8065);
    /// assert_eq!(Word::new(102, 0x3FFE, Are::Absolute).packed(), 0x3FFE);
    /// ```
    pub fn packed(&self) -> u16 {
        self.are.tag() << 14 | self.value
    }

    /// Reads a word from its 16-bit container.
    pub fn unpack(addr: u16, packed: u16) -> Self {
        let are = Are::from_tag(packed >> 14);
        Word::new(addr, packed, are)
    }
}

/// An object file: the result of assembling one unit.
///
/// This holds the code words followed by the data words (contiguous, starting at [`LOAD_ADDRESS`]),
/// the entry records, the extern reference records and the final symbol table.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ObjectFile {
    words: Vec<Word>,
    code_len: usize,
    data_len: usize,
    entries: Vec<(String, u16)>,
    externs: Vec<(String, u16)>,
    sym: SymbolTable,
}
impl ObjectFile {
    /// All memory words, in ascending address order.
    pub fn words(&self) -> &[Word] {
        &self.words
    }
    /// The number of code words.
    pub fn code_len(&self) -> usize {
        self.code_len
    }
    /// The number of data words.
    pub fn data_len(&self) -> usize {
        self.data_len
    }
    /// `(symbol name, address)` for every `.entry` symbol, in order of appearance.
    pub fn entries(&self) -> &[(String, u16)] {
        &self.entries
    }
    /// `(symbol name, referencing word address)` for every word referring to an external symbol.
    pub fn externs(&self) -> &[(String, u16)] {
        &self.externs
    }
    /// The symbol table after both passes.
    ///
    /// This is empty for object files read back from disk.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.sym
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::{assemble, Are, AsmErrKind, AsmFlags, ObjectFile, SymbolKind, UnitErr, Word};
    use crate::ast::OffsetNewErr;
    use crate::parse::ParseErrKind;
    use crate::ast::Opcode;

    fn assemble_src(src: &str) -> Result<ObjectFile, UnitErr> {
        assemble(src, &AsmFlags::default())
    }
    fn assert_asm_fail(src: &str, kind: AsmErrKind) {
        match assemble_src(src) {
            Err(UnitErr::Asm(errs)) => assert!(
                errs.iter().any(|e| e.kind == kind),
                "expected {kind:?} in {errs:?}"
            ),
            r => panic!("expected assembly of {src:?} to fail with {kind:?}, got {r:?}"),
        }
    }
    fn packed(obj: &ObjectFile) -> Vec<(u16, u16)> {
        obj.words().iter().map(|w| (w.addr, w.packed())).collect()
    }

    #[test]
    fn test_registers_and_data() {
        let obj = assemble_src("LOOP: mov r1, r2\n.data 5,-2,7\n.entry LOOP").unwrap();

        let sym = obj.symbol_table().find("LOOP").unwrap();
        assert_eq!((sym.addr, sym.kind), (100, SymbolKind::Entry));
        assert_eq!(obj.entries(), [("LOOP".to_string(), 100)]);
        assert_eq!(obj.code_len(), 1);
        assert_eq!(obj.data_len(), 3);
        assert_eq!(obj.words(), [
            Word::new(100, 0b11_11_0000_0000, Are::Absolute),
            Word::new(101, 5, Are::Absolute),
            Word::new(102, 16382, Are::Absolute),
            Word::new(103, 7, Are::Absolute),
        ]);
    }

    #[test]
    fn test_extern_reference() {
        let obj = assemble_src(".extern EXT\nmov EXT, r1\nstop").unwrap();
        assert_eq!(obj.externs(), [("EXT".to_string(), 101)]);
        assert_eq!(packed(&obj), [
            // dst: register, src: direct, opcode 0
            (100, 0b11_01_0000_0000),
            (101, 0b01 << 14),
            (102, (Opcode::Stop.number() as u16) << 4),
        ]);
    }

    #[test]
    fn test_too_many_operands() {
        let errs = match assemble_src("X: mov r1, r2, r3\nstop") {
            Err(UnitErr::Asm(errs)) => errs,
            r => panic!("expected failure, got {r:?}"),
        };
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0].kind, AsmErrKind::Parse(ParseErrKind::TooManyOperands { .. })));
        assert!(errs[0].to_string().contains("too many operands"));
        assert_eq!(errs[0].line, 1);
    }

    #[test]
    fn test_immediate_bounds() {
        assert!(assemble_src("prn #8191").is_ok());
        assert!(assemble_src("prn #-8192").is_ok());
        assert_asm_fail("prn #8192", AsmErrKind::ImmediateRange(OffsetNewErr::CannotFitSigned(14)));
        assert_asm_fail("prn #-8193", AsmErrKind::ImmediateRange(OffsetNewErr::CannotFitSigned(14)));
        assert_asm_fail("prn #100000", AsmErrKind::ImmediateRange(OffsetNewErr::CannotFitSigned(14)));

        let obj = assemble_src("prn #-8192").unwrap();
        assert_eq!(obj.words()[1], Word::new(101, 0x2000, Are::Absolute));
        let obj = assemble_src("prn #8191").unwrap();
        assert_eq!(obj.words()[1], Word::new(101, 0x1FFF, Are::Absolute));
    }

    #[test]
    fn test_direct_and_relative() {
        let src = "
            MAIN: cmp #3, LIST
            LOOP: inc r1
                  bne &LOOP
                  jmp &END
            END:  stop
            LIST: .data 1, 2
        ";
        let obj = assemble_src(src).unwrap();
        // MAIN@100 (3 words), LOOP@103, bne@104 (2 words), jmp@106 (2 words), END@108
        assert_eq!(obj.code_len(), 9);
        assert_eq!(obj.symbol_table().find("LIST").unwrap().addr, 109);

        let words = obj.words();
        assert_eq!(words[1], Word::new(101, 3, Are::Absolute));
        assert_eq!(words[2], Word::new(102, 109, Are::Relocatable));
        // bne &LOOP: operand word at 105, LOOP at 103
        assert_eq!(words[5], Word::new(105, (-2i16 as u16) & 0x3FFF, Are::Relative));
        // jmp &END: operand word at 107, END at 108
        assert_eq!(words[7], Word::new(107, 1, Are::Relative));
        assert_eq!(words[9], Word::new(109, 1, Are::Absolute));
        assert_eq!(words[10], Word::new(110, 2, Are::Absolute));
    }

    #[test]
    fn test_string_data() {
        let obj = assemble_src("stop\nS: .string \"ab\"\n.entry S").unwrap();
        assert_eq!(obj.data_len(), 3);
        assert_eq!(obj.entries(), [("S".to_string(), 101)]);
        let data: Vec<_> = obj.words()[1..].iter().map(|w| w.value).collect();
        assert_eq!(data, [97, 98, 0]);
    }

    #[test]
    fn test_string_with_trailing_comment() {
        let obj = assemble_src("stop\nS: .string \"ab\" ; prints \"ab\"").unwrap();
        assert_eq!(obj.data_len(), 3);
        let data: Vec<_> = obj.words()[1..].iter().map(|w| w.value).collect();
        assert_eq!(data, [97, 98, 0]);
    }

    #[test]
    fn test_macro_keywords_in_strings() {
        let obj = assemble_src("S: .string \"a macro b\"\nstop").unwrap();
        assert_eq!((obj.code_len(), obj.data_len()), (1, 10));

        let src = "
            macro SAY
                .string \"x macroend y\"
            macroend
            stop
            SAY
        ";
        let obj = assemble_src(src).unwrap();
        assert_eq!((obj.code_len(), obj.data_len()), (1, 13));
    }

    #[test]
    fn test_data_rebase() {
        let obj = assemble_src("A: .data 1, 2\nB: .data 3\nmov A, B\nstop").unwrap();
        let code_end = 100 + obj.code_len() as u16;
        assert_eq!(obj.symbol_table().find("A").unwrap().addr, code_end);
        assert_eq!(obj.symbol_table().find("B").unwrap().addr, code_end + 2);
    }

    #[test]
    fn test_symbol_errors() {
        assert_asm_fail("X: stop\nX: rts", AsmErrKind::DuplicateSymbol("X".to_string()));
        assert_asm_fail(".extern X\nX: stop", AsmErrKind::ExternConflict("X".to_string()));
        assert_asm_fail("X: stop\n.extern X", AsmErrKind::ExternConflict("X".to_string()));
        assert_asm_fail("jmp NOWHERE", AsmErrKind::UndefinedSymbol("NOWHERE".to_string()));
        assert_asm_fail("jmp &NOWHERE", AsmErrKind::UndefinedSymbol("NOWHERE".to_string()));
        assert_asm_fail("stop\n.entry NOWHERE", AsmErrKind::UnknownEntry("NOWHERE".to_string()));
        assert_asm_fail(".extern X\n.entry X", AsmErrKind::EntryExternal("X".to_string()));
        assert_asm_fail(".extern X\njmp &X", AsmErrKind::OffsetExternal);
        assert_asm_fail("mov: stop", AsmErrKind::LabelIsMnemonic("mov".to_string()));
        assert_asm_fail("X:\nstop", AsmErrKind::LabelOnly);

        // repeated .extern is fine
        assert!(assemble_src(".extern X\n.extern X\nprn X").is_ok());
    }

    #[test]
    fn test_entry_dedup() {
        let obj = assemble_src("M: stop\n.entry M\n.entry M").unwrap();
        assert_eq!(obj.entries(), [("M".to_string(), 100)]);
    }

    #[test]
    fn test_collects_all_errors() {
        let src = "mov r1\nX:\n.bogus\nstop";
        let Err(UnitErr::Asm(errs)) = assemble_src(src) else {
            panic!("expected failure");
        };
        let lines: Vec<_> = errs.iter().map(|e| e.line).collect();
        assert_eq!(lines, [1, 2, 3]);
    }

    #[test]
    fn test_error_lines_after_macros() {
        let src = "macro M\ninc r1\ndec r1\nmacroend\nM\nprn #9000";
        let Err(UnitErr::Asm(errs)) = assemble_src(src) else {
            panic!("expected failure");
        };
        assert_eq!(errs.len(), 1);
        assert_eq!((errs[0].line, errs[0].col), (6, 5));
    }

    #[test]
    fn test_macro_failure() {
        assert!(matches!(assemble_src("macro mov\nmacroend"), Err(UnitErr::Macro(_))));
    }

    #[test]
    fn test_program_too_large() {
        let flags = AsmFlags { max_line_len: usize::MAX };
        let data = |n: usize| format!(".data {}", vec!["0"; n].join(","));

        // 100 + 3996 words fills memory exactly
        assert!(assemble(&data(3996), &flags).is_ok());
        match assemble(&data(3997), &flags) {
            Err(UnitErr::Asm(errs)) => assert_eq!(errs[0].kind, AsmErrKind::ProgramTooLarge(4097)),
            r => panic!("expected failure, got {r:?}"),
        }
    }
}
