use std::sync::Arc;

use patter_core::file::FileSection;
use patter_core::log::ParseLogger;

use crate::engine::Engine;
use crate::parser;
use crate::parser::state::ParserState;
use crate::registration::EventInfo;
use crate::syntax::{ScriptEvent, Statement};

/// A top-level script block bound to an event, owning its statement
/// chain.
pub struct Trigger {
    event: Box<dyn ScriptEvent>,
    first: Option<Box<dyn Statement>>,
}

impl Trigger {
    pub fn new(event: Box<dyn ScriptEvent>) -> Self {
        Self { event, first: None }
    }

    pub fn event(&self) -> &dyn ScriptEvent {
        self.event.as_ref()
    }

    /// Head of the statement chain, once loaded.
    pub fn first(&self) -> Option<&dyn Statement> {
        self.first.as_deref()
    }

    /// Parses the trigger body. Deferred from event matching so triggers
    /// can be finalized in loading-priority order.
    pub fn load_section(
        &mut self,
        section: &FileSection,
        engine: &Engine,
        state: &mut ParserState,
        logger: &mut ParseLogger,
    ) {
        let items = parser::load_items(engine, section, state, logger);
        self.first = parser::link_statements(items);
    }

    /// Invokes the unload hook on the event and every statement.
    pub fn unload(&self) {
        self.event.on_unload();
        let mut current = self.first.as_deref();
        while let Some(statement) = current {
            statement.on_unload();
            current = statement.next();
        }
    }
}

/// A trigger whose event matched but whose body is not yet parsed,
/// staged until the loader's priority-ordered finalize pass.
pub struct UnloadedTrigger<'s> {
    trigger: Trigger,
    section: &'s FileSection,
    line: usize,
    info: Arc<EventInfo>,
    state: ParserState,
}

impl<'s> UnloadedTrigger<'s> {
    pub fn new(
        trigger: Trigger,
        section: &'s FileSection,
        line: usize,
        info: Arc<EventInfo>,
        state: ParserState,
    ) -> Self {
        Self {
            trigger,
            section,
            line,
            info,
            state,
        }
    }

    pub fn loading_priority(&self) -> i32 {
        self.trigger.event().loading_priority()
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn event_info(&self) -> &Arc<EventInfo> {
        &self.info
    }

    /// Decomposes the staging record for the finalize pass.
    pub fn into_parts(self) -> (Trigger, &'s FileSection, usize, Arc<EventInfo>, ParserState) {
        (self.trigger, self.section, self.line, self.info, self.state)
    }
}
