//! The syntax tree produced by the parser.

mod body;
mod expr;
mod walk;

pub use body::{Attribute, Attributes, Block, Blocks, Body, File};
pub use expr::{ChildScope, Expression, ForExpr, ObjectItem, StaticCall};
pub use walk::{Node, Walker, walk};
