//! Source file splitting: logical lines and the indent-aware element tree.

mod element;
mod parser;

pub use element::{FileElement, FileSection, SimpleElement, VoidElement};
pub use parser::parse_file;
