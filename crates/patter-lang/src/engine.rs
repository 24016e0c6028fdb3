//! The engine handle: every registry the parser consults, configured at
//! startup and then passed (read-only) into the parse entry points.

use std::sync::{Arc, Mutex};

use crate::registration::{EffectInfo, EventInfo, ExpressionInfo, SectionInfo};
use crate::registry::{RecencyList, SyntaxRegistry};
use crate::types::{ComparatorRegistry, ConverterRegistry, TypeRegistry};

#[derive(Default)]
struct RecencyState {
    expressions: RecencyList<ExpressionInfo>,
    conditions: RecencyList<ExpressionInfo>,
    effects: RecencyList<EffectInfo>,
    sections: RecencyList<SectionInfo>,
    events: RecencyList<EventInfo>,
}

/// Owns the syntax registry, the type system and the recency lists.
///
/// Registration happens once at startup (through
/// [`crate::registration::Registration`], which needs `&mut Engine`);
/// parsing only ever takes `&Engine`. The recency lists are the one
/// piece of state mutated while parsing, so they sit behind a mutex —
/// under contention their order is an unspecified optimization hint.
pub struct Engine {
    types: TypeRegistry,
    converters: ConverterRegistry,
    comparators: ComparatorRegistry,
    registry: SyntaxRegistry,
    recency: Mutex<RecencyState>,
}

impl Engine {
    /// Creates an engine with the default types (`object`, `boolean`,
    /// `number`, `string`) already registered.
    pub fn new() -> Self {
        let mut engine = Self {
            types: TypeRegistry::new(),
            converters: ConverterRegistry::new(),
            comparators: ComparatorRegistry::new(),
            registry: SyntaxRegistry::new(),
            recency: Mutex::new(RecencyState::default()),
        };
        crate::defaults::register(&mut engine);
        engine
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn converters_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.converters
    }

    pub fn comparators(&self) -> &ComparatorRegistry {
        &self.comparators
    }

    pub fn comparators_mut(&mut self) -> &mut ComparatorRegistry {
        &mut self.comparators
    }

    pub fn registry(&self) -> &SyntaxRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SyntaxRegistry {
        &mut self.registry
    }

    fn recency(&self) -> std::sync::MutexGuard<'_, RecencyState> {
        self.recency.lock().expect("recency mutex poisoned")
    }

    pub(crate) fn recent_expressions(&self) -> Vec<Arc<ExpressionInfo>> {
        self.recency().expressions.snapshot()
    }

    pub(crate) fn acknowledge_expression(&self, info: &Arc<ExpressionInfo>) {
        self.recency().expressions.acknowledge(info);
    }

    pub(crate) fn acknowledge_condition(&self, info: &Arc<ExpressionInfo>) {
        self.recency().conditions.acknowledge(info);
    }

    pub(crate) fn recent_effects(&self) -> Vec<Arc<EffectInfo>> {
        self.recency().effects.snapshot()
    }

    pub(crate) fn acknowledge_effect(&self, info: &Arc<EffectInfo>) {
        self.recency().effects.acknowledge(info);
    }

    pub(crate) fn recent_sections(&self) -> Vec<Arc<SectionInfo>> {
        self.recency().sections.snapshot()
    }

    pub(crate) fn acknowledge_section(&self, info: &Arc<SectionInfo>) {
        self.recency().sections.acknowledge(info);
    }

    pub(crate) fn recent_events(&self) -> Vec<Arc<EventInfo>> {
        self.recency().events.snapshot()
    }

    pub(crate) fn acknowledge_event(&self, info: &Arc<EventInfo>) {
        self.recency().events.acknowledge(info);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
