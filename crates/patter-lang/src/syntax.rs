//! The capability traits every syntax element implements.
//!
//! Concrete effects, sections, events and expressions live outside this
//! crate (or in [`crate::base`] for the built-in forms); the parser only
//! ever sees them through these object-safe traits. Factories stored in
//! the registry produce fresh boxed instances per match attempt.

use std::any::Any;
use std::sync::Arc;

use patter_core::file::FileSection;
use patter_core::log::ParseLogger;

use crate::base::Trigger;
use crate::engine::Engine;
use crate::event::EventBus;
use crate::parser::state::ParserState;
use crate::pattern::ParseResult;
use crate::types::{Type, Value};

/// Default loading priority of an event: triggers of higher-priority
/// events have their bodies parsed first within a script.
pub const DEFAULT_LOADING_PRIORITY: i32 = 5;

/// A runtime event occurrence handed to triggers when they fire.
///
/// The parser itself only needs contexts for parse-time evaluation of
/// literals; real contexts come from the host.
pub trait TriggerContext: Any + Send + Sync {
    fn name(&self) -> &str;
}

/// The context used when a value must be computed at parse time (e.g.
/// coercing a constant string among list literals).
pub struct DummyContext;

impl TriggerContext for DummyContext {
    fn name(&self) -> &str {
        "dummy"
    }
}

/// Base capability of every parsed syntax element.
pub trait SyntaxElement: Any + Send + Sync {
    /// Binds the element to one successful pattern match.
    ///
    /// `expressions` are the captured sub-expressions in match order,
    /// `pattern_index` is the index of the matched pattern within the
    /// element's registration. Returning `false` rejects the binding and
    /// the dispatcher tries the next pattern.
    fn init(
        &mut self,
        expressions: Vec<Box<dyn Expression>>,
        pattern_index: usize,
        result: &ParseResult,
    ) -> bool {
        let _ = (expressions, pattern_index, result);
        true
    }

    /// Called when the owning script is unloaded.
    fn on_unload(&self) {}

    /// Human-readable rendition, used in diagnostics.
    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String;
}

/// A value producer.
pub trait Expression: SyntaxElement {
    /// All values this expression produces against `ctx`.
    ///
    /// If [`is_single`](Self::is_single) returns true, the result holds
    /// at most one element.
    fn values(&self, ctx: &dyn TriggerContext) -> Vec<Value>;

    /// Convenience accessor for single expressions.
    fn single_value(&self, ctx: &dyn TriggerContext) -> Option<Value> {
        self.values(ctx).into_iter().next()
    }

    fn is_single(&self) -> bool {
        true
    }

    fn return_type(&self) -> Arc<Type>;

    /// Whether the produced values are fixed at parse time.
    fn is_literal(&self) -> bool {
        false
    }

    /// Whether this expression is a condition (usable after `if`).
    fn is_conditional(&self) -> bool {
        false
    }

    /// Reinterprets this expression as producing `target` values, if the
    /// engine knows a conversion. Implementations usually delegate to
    /// [`crate::base::converted::wrap`].
    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>>;
}

/// A node in a trigger's statement chain.
pub trait Statement: SyntaxElement {
    fn set_next(&mut self, next: Option<Box<dyn Statement>>);

    fn next(&self) -> Option<&dyn Statement>;

    /// Runs this statement and reports which statement to run next;
    /// `None` ends the chain walk.
    fn walk(&self, ctx: &dyn TriggerContext) -> Option<&dyn Statement> {
        self.next()
    }
}

/// A statement with no produced value.
pub trait Effect: Statement {
    /// Runs the effect. Returning `false` stops the chain walk.
    fn execute(&self, ctx: &dyn TriggerContext) -> bool;
}

/// A block statement: a statement owning a body of child statements.
pub trait CodeSection: Statement {
    /// Parses the section's body. Implementations recurse through
    /// [`crate::parser::load_items`] and may push syntax restrictions
    /// onto `state` around the recursion.
    fn load_section(
        &mut self,
        section: &FileSection,
        engine: &Engine,
        state: &mut ParserState,
        logger: &mut ParseLogger,
    ) -> bool;
}

/// An event heading a trigger.
pub trait ScriptEvent: SyntaxElement {
    /// Whether a runtime context is an occurrence of this event.
    fn check(&self, ctx: &dyn TriggerContext) -> bool;

    /// Key this event's triggers are filed under on the event bus.
    fn bus_key(&self) -> &str;

    /// Order in which this event's triggers are finalized within a
    /// script; higher loads first.
    fn loading_priority(&self) -> i32 {
        DEFAULT_LOADING_PRIORITY
    }

    /// Hooks the finished trigger up to the event bus.
    fn register(&self, trigger: &Arc<Trigger>, bus: &EventBus) {
        bus.register_trigger(self.bus_key(), Arc::downgrade(trigger));
    }
}
