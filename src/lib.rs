//! A two-pass assembler for a small 16-opcode machine with 14-bit words.
//!
//! The machine has 8 registers (`r0`-`r7`), 4 addressing modes
//! (immediate `#5`, direct `LABEL`, relative `&LABEL`, register `r3`),
//! and 4 directives (`.data`, `.string`, `.extern`, `.entry`).
//! Source files may also define macros with `macro NAME` ... `macroend`.
//!
//! # Usage
//!
//! Source text goes through three stages:
//! 1. [`macros::expand`] replaces macro invocations with their bodies.
//! 2. [`asm::analyze`] (the first pass) assigns addresses to every symbol.
//! 3. [`asm::encode`] (the second pass) emits the memory words.
//!
//! [`asm::assemble`] runs all three:
//! ```
//! use asm14::asm::{assemble, AsmFlags};
//! use asm14::asm::encoding::{write_records, ObjFileFormat, TextFormat};
//!
//! let code = "
//!     .extern PRINT
//!     .entry MAIN
//!     macro TWICE
//!         jsr PRINT
//!         jsr PRINT
//!     macroend
//!     MAIN: lea STR, r1
//!           TWICE
//!           stop
//!     STR:  .string \"hi\"
//! ";
//! let obj = assemble(code, &AsmFlags::default()).unwrap();
//!
//! assert_eq!(obj.entries(), [("MAIN".to_string(), 100)]);
//! assert_eq!(obj.externs().len(), 2);
//! assert_eq!((obj.code_len(), obj.data_len()), (7, 3));
//!
//! // The object, entry and extern listings:
//! let ob = TextFormat::serialize(&obj);
//! let ent = write_records(obj.entries());
//! let ext = write_records(obj.externs());
//! # assert!(ob.starts_with("7 3\n"));
//! # assert_eq!(ent, "MAIN 0100\n");
//! # assert_eq!(ext, "PRINT 0103\nPRINT 0105\n");
//! ```
//!
//! Errors of every stage implement [`err::Error`] and can be turned into
//! [`err::Diagnostic`]s for reporting.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod macros;
pub mod asm;
pub mod err;
