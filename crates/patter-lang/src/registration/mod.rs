//! Registration of syntax: the info records the registry stores, the
//! builders an addon uses to create them, and the init-validator hook.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use patter_core::log::{ErrorKind, LogEntry, ParseLogger};
use thiserror::Error;

use crate::base::Trigger;
use crate::engine::Engine;
use crate::pattern::{compile_pattern, PatternElement};
use crate::syntax::{CodeSection, Effect, Expression, ScriptEvent};
use crate::types::{PatternType, Value};

/// A module that hooks into the engine to register syntax.
pub trait Addon: Send + Sync {
    fn name(&self) -> &str;

    /// Broadcast of every successfully finalized trigger.
    ///
    /// Deprecated compatibility hook: new code should react from
    /// `SyntaxElement::init` instead. The default does nothing.
    fn handle_trigger(&self, trigger: &Trigger) {
        let _ = trigger;
    }

    /// Called once a script finishes loading.
    fn finished_loading(&self) {}
}

/// Returned by an init validator to veto the instantiation of a syntax
/// element. The dispatcher logs it and moves on; nothing unwinds.
#[derive(Debug, Error)]
#[error("parsing disallowed: {0}")]
pub struct ParsingDisallowed(pub String);

/// Callback run before every syntax-element instantiation.
pub type InitValidator = Box<dyn Fn(&SyntaxMeta) -> Result<(), ParsingDisallowed> + Send + Sync>;

pub type EffectFactory = Arc<dyn Fn() -> Box<dyn Effect> + Send + Sync>;
pub type SectionFactory = Arc<dyn Fn() -> Box<dyn CodeSection> + Send + Sync>;
pub type EventFactory = Arc<dyn Fn() -> Box<dyn ScriptEvent> + Send + Sync>;
pub type ExpressionFactory = Arc<dyn Fn() -> Box<dyn Expression> + Send + Sync>;

/// The part of a registration shared by every syntax kind.
pub struct SyntaxMeta {
    addon: Arc<dyn Addon>,
    name: &'static str,
    element_type: TypeId,
    priority: i32,
    patterns: Vec<PatternElement>,
    data: HashMap<String, Value>,
}

impl SyntaxMeta {
    pub fn addon(&self) -> &Arc<dyn Addon> {
        &self.addon
    }

    /// Tag of the concrete element type, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `TypeId` of the concrete element type; this is what syntax
    /// restrictions key on.
    pub fn element_type(&self) -> TypeId {
        self.element_type
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn patterns(&self) -> &[PatternElement] {
        &self.patterns
    }

    /// Opaque data attached at registration time.
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Info about a registered effect.
pub struct EffectInfo {
    meta: SyntaxMeta,
    factory: EffectFactory,
}

impl EffectInfo {
    pub fn meta(&self) -> &SyntaxMeta {
        &self.meta
    }

    pub fn create(&self) -> Box<dyn Effect> {
        (self.factory)()
    }
}

/// Info about a registered code section.
pub struct SectionInfo {
    meta: SyntaxMeta,
    factory: SectionFactory,
}

impl SectionInfo {
    pub fn meta(&self) -> &SyntaxMeta {
        &self.meta
    }

    pub fn create(&self) -> Box<dyn CodeSection> {
        (self.factory)()
    }
}

/// Info about a registered event, with the trigger contexts it handles.
pub struct EventInfo {
    meta: SyntaxMeta,
    factory: EventFactory,
    contexts: Vec<String>,
}

impl EventInfo {
    pub fn meta(&self) -> &SyntaxMeta {
        &self.meta
    }

    pub fn create(&self) -> Box<dyn ScriptEvent> {
        (self.factory)()
    }

    /// Names of the trigger contexts this event can handle.
    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }
}

/// Info about a registered expression, with its declared return type.
pub struct ExpressionInfo {
    meta: SyntaxMeta,
    factory: ExpressionFactory,
    return_type: PatternType,
}

impl ExpressionInfo {
    pub fn meta(&self) -> &SyntaxMeta {
        &self.meta
    }

    pub fn create(&self) -> Box<dyn Expression> {
        (self.factory)()
    }

    pub fn return_type(&self) -> &PatternType {
        &self.return_type
    }
}

/// Collects an addon's registrations into the engine.
///
/// Patterns are compiled eagerly; a malformed pattern logs a diagnostic
/// and skips the registration instead of failing the whole batch.
/// Diagnostics are handed back by [`finish`](Registration::finish).
pub struct Registration<'e> {
    engine: &'e mut Engine,
    addon: Arc<dyn Addon>,
    logger: ParseLogger,
}

impl<'e> Registration<'e> {
    pub fn new(engine: &'e mut Engine, addon: impl Addon + 'static) -> Self {
        Self {
            engine,
            addon: Arc::new(addon),
            logger: ParseLogger::new(false),
        }
    }

    /// Compiles the given pattern strings; bad ones are reported and
    /// dropped. `None` when no pattern survived.
    fn compile_patterns(&mut self, name: &str, patterns: &[&str]) -> Option<Vec<PatternElement>> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match compile_pattern(pattern, self.engine.types()) {
                Ok(element) => compiled.push(element),
                Err(error) => self.logger.error(
                    format!("Invalid pattern `{}` for {}: {}", pattern, name, error),
                    ErrorKind::MalformedInput,
                ),
            }
        }
        if compiled.is_empty() {
            None
        } else {
            Some(compiled)
        }
    }

    fn meta<T: 'static>(&self, priority: i32, patterns: Vec<PatternElement>) -> SyntaxMeta {
        SyntaxMeta {
            addon: Arc::clone(&self.addon),
            name: std::any::type_name::<T>(),
            element_type: TypeId::of::<T>(),
            priority,
            patterns,
            data: HashMap::new(),
        }
    }

    /// Starts registering an effect with a `Default` constructor.
    pub fn new_effect<E>(&mut self, patterns: &[&str], priority: i32) -> EffectBuilder<'_, 'e>
    where
        E: Effect + Default,
    {
        self.new_effect_with::<E, _>(patterns, priority, E::default)
    }

    /// Starts registering an effect built by an explicit factory.
    pub fn new_effect_with<E, F>(
        &mut self,
        patterns: &[&str],
        priority: i32,
        factory: F,
    ) -> EffectBuilder<'_, 'e>
    where
        E: Effect,
        F: Fn() -> E + Send + Sync + 'static,
    {
        let draft = self
            .compile_patterns(std::any::type_name::<E>(), patterns)
            .map(|patterns| {
                (
                    self.meta::<E>(priority, patterns),
                    Arc::new(move || Box::new(factory()) as Box<dyn Effect>) as EffectFactory,
                )
            });
        EffectBuilder {
            registration: self,
            draft,
        }
    }

    pub fn new_section<S>(&mut self, patterns: &[&str], priority: i32) -> SectionBuilder<'_, 'e>
    where
        S: CodeSection + Default,
    {
        let draft = self
            .compile_patterns(std::any::type_name::<S>(), patterns)
            .map(|patterns| {
                (
                    self.meta::<S>(priority, patterns),
                    Arc::new(|| Box::new(S::default()) as Box<dyn CodeSection>) as SectionFactory,
                )
            });
        SectionBuilder {
            registration: self,
            draft,
        }
    }

    /// Starts registering an event together with the names of the
    /// trigger contexts it handles.
    pub fn new_event<E>(
        &mut self,
        patterns: &[&str],
        priority: i32,
        contexts: &[&str],
    ) -> EventBuilder<'_, 'e>
    where
        E: ScriptEvent + Default,
    {
        self.new_event_with::<E, _>(patterns, priority, contexts, E::default)
    }

    pub fn new_event_with<E, F>(
        &mut self,
        patterns: &[&str],
        priority: i32,
        contexts: &[&str],
        factory: F,
    ) -> EventBuilder<'_, 'e>
    where
        E: ScriptEvent,
        F: Fn() -> E + Send + Sync + 'static,
    {
        let draft = self
            .compile_patterns(std::any::type_name::<E>(), patterns)
            .map(|patterns| {
                (
                    self.meta::<E>(priority, patterns),
                    Arc::new(move || Box::new(factory()) as Box<dyn ScriptEvent>) as EventFactory,
                )
            });
        EventBuilder {
            registration: self,
            draft,
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Starts registering an expression returning `return_type` values
    /// (a registered type name).
    pub fn new_expression<E>(
        &mut self,
        patterns: &[&str],
        priority: i32,
        return_type: &str,
        single: bool,
    ) -> ExpressionBuilder<'_, 'e>
    where
        E: Expression + Default,
    {
        self.new_expression_with::<E, _>(patterns, priority, return_type, single, E::default)
    }

    pub fn new_expression_with<E, F>(
        &mut self,
        patterns: &[&str],
        priority: i32,
        return_type: &str,
        single: bool,
        factory: F,
    ) -> ExpressionBuilder<'_, 'e>
    where
        E: Expression,
        F: Fn() -> E + Send + Sync + 'static,
    {
        let resolved = match self.engine.types().by_name(return_type) {
            Some(ty) => Some(PatternType::new(Arc::clone(ty), single)),
            None => {
                self.logger.error(
                    format!(
                        "Unknown return type `{}` for {}",
                        return_type,
                        std::any::type_name::<E>()
                    ),
                    ErrorKind::MalformedInput,
                );
                None
            }
        };
        let draft = match (
            resolved,
            self.compile_patterns(std::any::type_name::<E>(), patterns),
        ) {
            (Some(return_type), Some(patterns)) => Some((
                self.meta::<E>(priority, patterns),
                Arc::new(move || Box::new(factory()) as Box<dyn Expression>) as ExpressionFactory,
                return_type,
            )),
            _ => None,
        };
        ExpressionBuilder {
            registration: self,
            draft,
        }
    }

    /// Hands back the diagnostics accumulated while registering.
    pub fn finish(self) -> Vec<LogEntry> {
        self.logger.close()
    }
}

macro_rules! builder_data {
    () => {
        /// Attaches an opaque data entry to the registration.
        pub fn data(mut self, key: &str, value: Value) -> Self {
            if let Some(draft) = self.draft.as_mut() {
                draft.0.data.insert(key.to_string(), value);
            }
            self
        }
    };
}

/// Builder finishing an effect registration.
pub struct EffectBuilder<'r, 'e> {
    registration: &'r mut Registration<'e>,
    draft: Option<(SyntaxMeta, EffectFactory)>,
}

impl EffectBuilder<'_, '_> {
    builder_data!();

    pub fn register(self) {
        if let Some((meta, factory)) = self.draft {
            self.registration
                .engine
                .registry_mut()
                .add_effect(EffectInfo { meta, factory });
        }
    }
}

/// Builder finishing a section registration.
pub struct SectionBuilder<'r, 'e> {
    registration: &'r mut Registration<'e>,
    draft: Option<(SyntaxMeta, SectionFactory)>,
}

impl SectionBuilder<'_, '_> {
    builder_data!();

    pub fn register(self) {
        if let Some((meta, factory)) = self.draft {
            self.registration
                .engine
                .registry_mut()
                .add_section(SectionInfo { meta, factory });
        }
    }
}

/// Builder finishing an event registration.
pub struct EventBuilder<'r, 'e> {
    registration: &'r mut Registration<'e>,
    draft: Option<(SyntaxMeta, EventFactory)>,
    contexts: Vec<String>,
}

impl EventBuilder<'_, '_> {
    builder_data!();

    pub fn register(self) {
        if let Some((meta, factory)) = self.draft {
            self.registration.engine.registry_mut().add_event(EventInfo {
                meta,
                factory,
                contexts: self.contexts,
            });
        }
    }
}

/// Builder finishing an expression registration.
pub struct ExpressionBuilder<'r, 'e> {
    registration: &'r mut Registration<'e>,
    draft: Option<(SyntaxMeta, ExpressionFactory, PatternType)>,
}

impl ExpressionBuilder<'_, '_> {
    builder_data!();

    pub fn register(self) {
        if let Some((meta, factory, return_type)) = self.draft {
            self.registration
                .engine
                .registry_mut()
                .add_expression(ExpressionInfo {
                    meta,
                    factory,
                    return_type,
                });
        }
    }
}
