//! Components relating to the syntax trees used in representing
//! one line of assembly source.
//!
//! The parser ([`crate::parse::parse_line`]) produces one [`ParsedLine`] per source line.
//! A parsed line holds an optional [`Label`] and a [`LineKind`], which is either
//! an instruction ([`Instr`]), a directive ([`Directive`]), or one of the trivial kinds
//! (empty, comment, label only, invalid).

use crate::parse::ParseErr;

/// A register. Must be between 0 and 7.
///
/// ## Examples
///
/// ```text
/// mov r1, r2
///     ~~  ~~
/// clr r7
///     ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A signed value which has to fit in a word's payload.
///
/// `N` indicates the maximum bit size of this value.
/// Immediate operands and relative displacements are both `IOffset<14>`.
///
/// ## Examples
/// ```text
/// prn #-5
///     ~~~
/// jmp &LOOP
///     ~~~~~ (once resolved)
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct IOffset<const N: u32>(i16);

/// The errors that can result from calling [`IOffset::new`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OffsetNewErr {
    /// The provided offset cannot fit a signed integer of the given bitsize.
    CannotFitSigned(u32)
}

impl std::fmt::Display for OffsetNewErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetNewErr::CannotFitSigned(n) => write!(f, "value is too big for signed {n}-bit integer"),
        }
    }
}
impl std::error::Error for OffsetNewErr {}
impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            OffsetNewErr::CannotFitSigned(n) => Some(format!("the range for a signed {n}-bit integer is [{}, {}]", (-1) << (n - 1), (1 << (n - 1)) - 1).into()),
        }
    }
}

impl<const N: u32> IOffset<N> {
    /// Creates a new offset value.
    /// This must fit within `N` bits, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use asm14::ast::IOffset;
    /// #
    /// assert!(IOffset::<14>::new(8191).is_ok());
    /// assert!(IOffset::<14>::new(-8192).is_ok());
    /// assert!(IOffset::<14>::new(8192).is_err());
    /// assert!(IOffset::<14>::new(-8193).is_err());
    /// assert!(IOffset::<14>::new(100_000).is_err());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is 0 or larger than 16.
    pub fn new(n: i32) -> Result<Self, OffsetNewErr> {
        assert!((1..=16).contains(&N), "bit size {N} does not fit a word");
        let shift = i32::BITS - N;
        match i16::try_from(n) {
            Ok(v) if (n << shift) >> shift == n => Ok(IOffset(v)),
            _ => Err(OffsetNewErr::CannotFitSigned(N)),
        }
    }

    /// The `N`-bit two's complement encoding of this offset.
    ///
    /// ```
    /// # use asm14::ast::IOffset;
    /// #
    /// assert_eq!(IOffset::<14>::new(-1).unwrap().to_bits(), 0x3FFF);
    /// ```
    pub fn to_bits(self) -> u16 {
        (self.0 as u16) & (u16::MAX >> (16 - N))
    }
}

/// A label.
///
/// This struct stores the name of the label (accessible by the `name` field)
/// and the column where the label starts in its source line.
///
/// # Examples
/// ```text
/// MAIN: mov r3, LIST
/// ~~~~          ~~~~
///       jmp &MAIN
///            ~~~~
/// .extern W
///         ~
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Label {
    /// The label's identifier
    pub name: String,

    /// The start of the label in its source line (a byte index).
    start: usize,
    /// The 1-indexed column of the label (counted in characters).
    col: usize,
}
impl Label {
    /// Creates a new label, given the byte span of its name in the source line `line`.
    pub fn new(name: String, span: std::ops::Range<usize>, line: &str) -> Self {
        debug_assert_eq!(span.start + name.len(), span.end, "span should have the same length as name");
        let col = crate::parse::column(line, span.start);
        Label { name, start: span.start, col }
    }
    /// Returns the span of the label in its source line.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start .. (self.start + self.name.len())
    }
    /// The 1-indexed column of the label.
    pub fn col(&self) -> usize {
        self.col
    }
}
impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

macro_rules! opcode_enum {
    ($($instr:ident = $mnemonic:literal),+ $(,)?) => {
        /// One of the 16 instructions of the machine.
        ///
        /// The discriminant of each instruction is its opcode number (bits 7:4 of the opcode word),
        /// which is also its position in the mnemonic table.
        /// Mnemonics are case-sensitive and always lowercase.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Opcode {
            $(
                #[allow(missing_docs)]
                $instr
            ),+
        }

        impl Opcode {
            /// All opcodes, in mnemonic table order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$instr),+];

            /// The mnemonic of this instruction.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$instr => $mnemonic),+
                }
            }

            /// Looks up a mnemonic (case-sensitive).
            pub fn from_mnemonic(s: &str) -> Option<Self> {
                match s {
                    $($mnemonic => Some(Self::$instr)),+,
                    _ => None
                }
            }
        }

        impl std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}
opcode_enum! {
    Mov = "mov", Cmp = "cmp", Add = "add", Sub = "sub", Lea = "lea",
    Clr = "clr", Not = "not", Inc = "inc", Dec = "dec",
    Jmp = "jmp", Bne = "bne", Jsr = "jsr",
    Red = "red", Prn = "prn",
    Rts = "rts", Stop = "stop",
}
impl Opcode {
    /// The opcode number (0-15).
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The number of operands this instruction takes.
    ///
    /// This is fixed by the position in the mnemonic table:
    /// the first 5 take 2 operands, the next 9 take 1, the last 2 take none.
    pub fn operand_count(self) -> usize {
        match self.number() {
            0..=4  => 2,
            5..=13 => 1,
            _      => 0,
        }
    }

    /// Whether this is a jump-class instruction (the only ones which accept relative operands).
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Bne | Opcode::Jsr)
    }
}

/// The addressing mode of an operand.
///
/// The discriminant is the 2-bit code stored in the opcode word.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum AddrMode {
    /// `#<int>`
    Immediate = 0,
    /// `<label>`
    Direct = 1,
    /// `&<label>`
    Relative = 2,
    /// `r0`-`r7`
    RegisterDirect = 3,
}

/// The resolved content of an operand.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum OperandKind {
    /// An immediate value (not yet range-checked).
    Immediate(i32),
    /// A reference to a symbol's address.
    Direct(String),
    /// A displacement to a symbol, relative to the operand's own word.
    Relative(String),
    /// A register.
    Register(Reg),
}

/// An instruction operand.
///
/// ## Examples
/// ```text
/// mov #-1, r2
///     ~~~  ~~
/// bne &END
///     ~~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Operand {
    /// The content of the operand.
    pub kind: OperandKind,
    /// The operand exactly as written.
    pub raw: String,
    /// The span of the operand in its source line (byte indices).
    pub span: std::ops::Range<usize>,
    /// The 1-indexed column of the operand (counted in characters).
    pub col: usize,
}
impl Operand {
    /// The addressing mode of this operand.
    pub fn mode(&self) -> AddrMode {
        match self.kind {
            OperandKind::Immediate(_) => AddrMode::Immediate,
            OperandKind::Direct(_)    => AddrMode::Direct,
            OperandKind::Relative(_)  => AddrMode::Relative,
            OperandKind::Register(_)  => AddrMode::RegisterDirect,
        }
    }
}

/// An instruction together with its operands.
///
/// The parser guarantees the operand count matches [`Opcode::operand_count`].
/// For two-operand instructions, the first operand is the source and the second is the destination.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Instr {
    #[allow(missing_docs)]
    pub opcode: Opcode,
    #[allow(missing_docs)]
    pub operands: Vec<Operand>,
}
impl Instr {
    /// How many words this instruction takes up in memory.
    ///
    /// The opcode word always costs 1. Every operand that is not a register costs its own word.
    pub fn word_len(&self) -> u16 {
        let extra = self.operands.iter()
            .filter(|op| op.mode() != AddrMode::RegisterDirect)
            .count();
        1 + extra as u16
    }
}

/// An assembler directive.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Directive {
    /// `.data <int>(,<int>)*`
    Data(Vec<i32>),
    /// `.string "<chars>"`
    String(String),
    /// `.extern <name>`
    Extern(Label),
    /// `.entry <name>`
    Entry(Label),
}
impl Directive {
    /// The values this directive adds to the data segment.
    ///
    /// `.string` yields one value per character plus the terminating zero.
    pub fn data_values(&self) -> Vec<i32> {
        match self {
            Directive::Data(values) => values.clone(),
            Directive::String(s)    => s.chars().map(|c| c as i32).chain([0]).collect(),
            Directive::Extern(_)    => vec![],
            Directive::Entry(_)     => vec![],
        }
    }
}

/// What a source line holds.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum LineKind {
    /// A blank line.
    Empty,
    /// A line consisting only of a comment.
    Comment,
    /// A label definition with nothing after it.
    LabelOnly,
    /// A directive (`.data`, `.string`, `.extern`, `.entry`).
    Directive(Directive),
    /// An instruction.
    Command(Instr),
    /// A line that could not be parsed.
    Invalid(ParseErr),
}

/// The result of parsing one line of source.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ParsedLine {
    /// The 1-indexed line number of this line.
    pub line_no: usize,
    /// The label defined on this line, if any.
    pub label: Option<Label>,
    /// The contents of the line.
    pub kind: LineKind,
}
