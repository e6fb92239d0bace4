//! Formatters which can read and write object files to disk.
//!
//! The [`ObjFileFormat`] trait describes an implementation of reading/writing object files.
//! This module provides an implementation of the trait, [`TextFormat`],
//! as well as [`write_records`] for the entry and extern listings.

use super::{ObjectFile, SymbolTable, Word};

/// A trait defining object file formats.
pub trait ObjFileFormat {
    /// Representation of the serialized format.
    ///
    /// For text-based formats, `str` should be used.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    ///
    /// Only the words are stored in the stream,
    /// so the result has no entries, externs, or symbols.
    fn deserialize(i: &Self::Stream) -> Option<ObjectFile>;
}

/// A text-based format of object file data.
///
/// ```text
/// <code word count> <data word count>
/// <address, 4 decimal digits> <packed word, 4 hex digits>
/// ...
/// ```
///
/// # Example
/// ```
/// use asm14::asm::{assemble, AsmFlags};
/// use asm14::asm::encoding::{ObjFileFormat, TextFormat};
///
/// let obj = assemble("prn #-1\nstop\n.data 7", &AsmFlags::default()).unwrap();
/// let text = TextFormat::serialize(&obj);
/// assert_eq!(text, "3 1\n0100 00D0\n0101 3FFF\n0102 00F0\n0103 0007\n");
///
/// let read = TextFormat::deserialize(&text).unwrap();
/// assert_eq!(read.words(), obj.words());
/// ```
pub struct TextFormat;

impl ObjFileFormat for TextFormat {
    type Stream = str;

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        let header = format!("{} {}\n", o.code_len(), o.data_len());
        let body = o.words().iter()
            .map(|w| format!("{:04} {:04X}\n", w.addr, w.packed()));

        std::iter::once(header).chain(body).collect()
    }

    fn deserialize(string: &Self::Stream) -> Option<ObjectFile> {
        let mut lines = string.lines()
            .filter(|l| !l.trim().is_empty());

        let (code, data) = lines.next()?.split_once(' ')?;
        let code_len: usize = code.trim().parse().ok()?;
        let data_len: usize = data.trim().parse().ok()?;

        let words: Vec<_> = lines
            .map(|line| {
                let (addr, packed) = line.split_once(' ')?;
                let addr = dec2u16(addr)?;
                let packed = hex2u16(packed.trim())?;
                Some(Word::unpack(addr, packed))
            })
            .collect::<Option<_>>()?;

        // Words have to be contiguous.
        if words.len() != code_len + data_len { return None; }
        if words.windows(2).any(|w| w[0].addr.wrapping_add(1) != w[1].addr) { return None; }

        Some(ObjectFile {
            words,
            code_len,
            data_len,
            entries: vec![],
            externs: vec![],
            sym: SymbolTable::new(),
        })
    }
}

/// Writes `(symbol name, address)` records, one `NAME AAAA` line each.
///
/// This is the format of both the entry listing ([`ObjectFile::entries`])
/// and the extern listing ([`ObjectFile::externs`]).
///
/// # Example
/// ```
/// use asm14::asm::encoding::write_records;
///
/// let records = [("MAIN".to_string(), 100), ("LIST".to_string(), 137)];
/// assert_eq!(write_records(&records), "MAIN 0100\nLIST 0137\n");
/// ```
pub fn write_records(records: &[(String, u16)]) -> String {
    records.iter()
        .map(|(name, addr)| format!("{name} {addr:04}\n"))
        .collect()
}

fn dec2u16(s: &str) -> Option<u16> {
    match s.len() >= 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        true => s.parse().ok(),
        false => None
    }
}
fn hex2u16(s: &str) -> Option<u16> {
    match s.len() == 4 {
        true => u16::from_str_radix(s, 16).ok(),
        false => None
    }
}
