//! Core types for the patter scripting language.
//!
//! This crate provides the foundations shared by the language engine and
//! the script loader:
//! - Structured parse log and diagnostics
//! - The indent-aware file element tree
//! - String scanning helpers (balanced groups, quoted strings)

pub mod file;
pub mod log;
pub mod strings;

// Re-export commonly used types at crate root
pub use file::{FileElement, FileSection, SimpleElement, VoidElement};
pub use log::{ErrorContext, ErrorKind, LogEntry, LogLevel, ParseLogger};
