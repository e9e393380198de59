//! Parser, syntax tree and schema-directed decoding for the HCL native
//! configuration syntax.
//!
//! Parsing never stops at the first error. Every entry point returns a
//! best-effort tree together with the [`Diagnostics`] it found, so editors
//! and linters can keep working on broken input.

pub use hcl_tokenizer::{Pos, Range, ScanMode, Token, TokenType};

mod ast;
pub use ast::{
    Attribute, Attributes, Block, Blocks, Body, ChildScope, Expression, File, ForExpr, Node,
    ObjectItem, StaticCall, Walker, walk,
};

mod diagnostic;
pub use diagnostic::{Diagnostic, Diagnostics, Severity};

mod eval;
pub use eval::{EvalContext, Function};

mod invalid_tokens;
pub use invalid_tokens::check_invalid_tokens;

mod operation;
pub use operation::{BINARY_OPS, EvalError, Operation};

mod options;
pub use options::{ParseOptions, parse_config, parse_expression, parse_template};

mod parser;
pub use parser::Parser;

mod schema;
pub use schema::{AttributeSchema, BlockHeaderSchema, BodyContent, BodySchema};

mod suggest;

mod traversal;
pub use traversal::{Traversal, Traverser};

mod value;
pub use value::Value;
