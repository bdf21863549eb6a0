//! # How script text becomes bytecode
//!
//! User's source code: `int average = (min + max) / 2;`

//! ## Scanning
//!
//! The [`scanner`] cuts the characters into lexemes: identifiers `min`,
//! number literals `2`, string literals `"hi!"` and operators `(`, `+`, `/`.
//! Whitespace and comments are skipped, so the lexemes are
//! `["int", "average", "=", "(", "min", "+", "max", ")", "/", "2", ";"]`.

//! ## Tokenizing
//!
//! The [`tokenizer`] interns every lexeme into the [`symbol_table`] and
//! appends the resulting symbol to a [`token_stream`]. Names declared inside
//! a struct body are interned under their mangled name, `Point::x` rather
//! than `x`, so that the parser never has to guess which struct a member
//! belongs to. Brackets are matched at this point too.
//!
//! The token stream keeps two side tables, the source line and the source
//! section that each symbol came from, so that errors can name both.

//! ## Parsing and code generation
//!
//! There is no syntax tree. The [`parser`] walks the token stream once and
//! writes bytecode for a stack machine as it goes:
//!
//! ``` markdown
//! LITTOREG  MAR, min     ; fixup: global data
//! MEMREAD   AX
//! PUSHREG   AX
//! LITTOREG  MAR, max     ; fixup: global data
//! MEMREAD   AX
//! POPREG    BX
//! ADDREG    BX, AX
//! REGTOREG  BX, AX
//! ...
//! ```
//!
//! Jumps and calls whose targets lie further down are emitted with a
//! placeholder and patched later. Every code cell holding an address that
//! depends on where the script is loaded gets a fixup.

//! ## The result
//!
//! A [`CompiledScript`]: the code, its fixups, the global data with the
//! literal pool, and the tables of functions, imports, exports and sections.
//! Loading and running it is the job of an engine, not of this crate.
pub mod cli;
pub mod compiled_script;
pub mod compiler;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod symbol_table;
pub mod token_stream;
pub mod tokenizer;

pub use compiled_script::CompiledScript;
pub use compiler::{CompileOptions, Compiler, Section};
pub use error::{
	CompileError, Diagnostic,
	scanner::{ScanError, ScanErrorType, ScannerError},
};
