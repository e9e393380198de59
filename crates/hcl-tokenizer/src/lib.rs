//! A byte-level scanner for the HCL native configuration syntax.
//!
//! The scanner turns a source buffer into a flat, lossless sequence of
//! [`Token`]s. Quoted strings, heredocs and template interpolations are
//! tracked with a context stack, so `"${ "${ x }" }"` balances correctly.

mod pos;
pub use pos::{Pos, Range};

mod token;
pub use token::{Token, TokenType};

mod scanner;
pub use scanner::{ScanMode, Scanner, scan_tokens};

mod string_lit;
pub use string_lit::scan_string_literal;
