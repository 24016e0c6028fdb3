//! The process-wide catalog of registered syntax, ordered by priority.

use std::sync::Arc;

use crate::registration::{
    EffectInfo, EventInfo, ExpressionInfo, InitValidator, ParsingDisallowed, SectionInfo,
    SyntaxMeta,
};

/// All registered syntax kinds. Populated at startup through
/// [`crate::registration::Registration`], then only read while parsing.
#[derive(Default)]
pub struct SyntaxRegistry {
    effects: Vec<Arc<EffectInfo>>,
    sections: Vec<Arc<SectionInfo>>,
    events: Vec<Arc<EventInfo>>,
    expressions: Vec<Arc<ExpressionInfo>>,
    validators: Vec<InitValidator>,
}

/// Inserts behind every entry of strictly higher priority and ahead of
/// those of lower or equal priority.
fn insert_ordered<T>(list: &mut Vec<Arc<T>>, info: Arc<T>, priority_of: impl Fn(&T) -> i32) {
    let priority = priority_of(&info);
    let index = list
        .iter()
        .position(|existing| priority_of(existing) <= priority)
        .unwrap_or(list.len());
    list.insert(index, info);
}

impl SyntaxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_effect(&mut self, info: EffectInfo) {
        insert_ordered(&mut self.effects, Arc::new(info), |i| i.meta().priority());
    }

    pub fn add_section(&mut self, info: SectionInfo) {
        insert_ordered(&mut self.sections, Arc::new(info), |i| i.meta().priority());
    }

    pub fn add_event(&mut self, info: EventInfo) {
        insert_ordered(&mut self.events, Arc::new(info), |i| i.meta().priority());
    }

    pub fn add_expression(&mut self, info: ExpressionInfo) {
        insert_ordered(&mut self.expressions, Arc::new(info), |i| i.meta().priority());
    }

    pub fn effects(&self) -> &[Arc<EffectInfo>] {
        &self.effects
    }

    pub fn sections(&self) -> &[Arc<SectionInfo>] {
        &self.sections
    }

    pub fn events(&self) -> &[Arc<EventInfo>] {
        &self.events
    }

    pub fn expressions(&self) -> &[Arc<ExpressionInfo>] {
        &self.expressions
    }

    /// Adds a callback run before every syntax-element instantiation.
    pub fn add_init_validator(&mut self, validator: InitValidator) {
        self.validators.push(validator);
    }

    /// Runs every init validator; the first veto wins.
    pub fn validate(&self, meta: &SyntaxMeta) -> Result<(), ParsingDisallowed> {
        for validator in &self.validators {
            validator(meta)?;
        }
        Ok(())
    }
}

/// Per-kind list of the most recently matched infos, consulted before
/// the rest of the registry on the next parse attempt.
pub struct RecencyList<T> {
    items: Vec<Arc<T>>,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> RecencyList<T> {
    /// Moves `info` to the front, deduplicating by identity.
    pub fn acknowledge(&mut self, info: &Arc<T>) {
        self.items.retain(|existing| !Arc::ptr_eq(existing, info));
        self.items.insert(0, Arc::clone(info));
    }

    /// The current recency ordering, most recent first.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.items.clone()
    }

    /// `all` minus `recent`, preserving registry order.
    pub fn remainder(recent: &[Arc<T>], all: &[Arc<T>]) -> Vec<Arc<T>> {
        all.iter()
            .filter(|info| !recent.iter().any(|r| Arc::ptr_eq(r, info)))
            .cloned()
            .collect()
    }
}
