//! The patter language engine.
//!
//! This crate turns lines of an English-like scripting DSL into bound
//! syntax elements:
//! - `pattern` - the pattern language, its compiler and matcher
//! - `types` - runtime types, converters, comparators, arithmetic
//! - `syntax` - the capability traits of syntax elements
//! - `base` - built-in expressions and statements the parser produces
//! - `registration` / `registry` - syntax registration and the
//!   priority-ordered catalog with recency acceleration
//! - `parser` - the dispatcher and block-body loader
//! - `event` - the event bus triggers register with
//! - `engine` - the handle threaded through every parse entry point

pub mod base;
pub mod defaults;
pub mod engine;
pub mod event;
pub mod parser;
pub mod pattern;
pub mod registration;
pub mod registry;
pub mod syntax;
pub mod types;

// Re-export commonly used types at crate root
pub use base::{Conditional, ConditionalMode, InlineCondition, Trigger, UnloadedTrigger};
pub use engine::Engine;
pub use event::EventBus;
pub use parser::state::ParserState;
pub use parser::BooleanMode;
pub use pattern::{MatchContext, ParseResult, PatternElement};
pub use registration::{Addon, Registration};
pub use syntax::{
    CodeSection, DummyContext, Effect, Expression, ScriptEvent, Statement, SyntaxElement,
    TriggerContext,
};
pub use types::{PatternType, Type, Value};
