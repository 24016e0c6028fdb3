//! The event bus: name-keyed handlers that run triggers against runtime
//! contexts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use crate::base::Trigger;
use crate::syntax::TriggerContext;

/// Something that reacts to an event occurrence.
pub trait EventHandler: Send + Sync {
    /// Whether the handler applies to this context.
    fn supports(&self, ctx: &dyn TriggerContext) -> bool;

    fn handle(&self, ctx: &dyn TriggerContext);
}

/// Runs a trigger's statement chain when its event fires.
///
/// Holds the trigger weakly: unloading the owning script drops the
/// trigger and the handler goes dead without unregistration.
pub struct TriggerEventHandler {
    trigger: Weak<Trigger>,
}

impl TriggerEventHandler {
    pub fn new(trigger: Weak<Trigger>) -> Self {
        Self { trigger }
    }

    pub fn is_alive(&self) -> bool {
        self.trigger.strong_count() > 0
    }
}

impl EventHandler for TriggerEventHandler {
    fn supports(&self, ctx: &dyn TriggerContext) -> bool {
        match self.trigger.upgrade() {
            Some(trigger) => trigger.event().check(ctx),
            None => false,
        }
    }

    fn handle(&self, ctx: &dyn TriggerContext) {
        if let Some(trigger) = self.trigger.upgrade() {
            let mut current = trigger.first();
            while let Some(statement) = current {
                current = statement.walk(ctx);
            }
        }
    }
}

/// Registry of event handlers keyed by event name. Lookup is concurrent;
/// registration takes a short write lock.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a trigger into a handler and files it under `key`.
    pub fn register_trigger(&self, key: &str, trigger: Weak<Trigger>) {
        self.register_handler(key, Arc::new(TriggerEventHandler::new(trigger)));
    }

    pub fn register_handler(&self, key: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .expect("event bus lock poisoned")
            .entry(key.to_string())
            .or_default()
            .push(handler);
    }

    pub fn remove_handler(&self, key: &str, handler: &Arc<dyn EventHandler>) {
        if let Some(list) = self
            .handlers
            .write()
            .expect("event bus lock poisoned")
            .get_mut(key)
        {
            list.retain(|existing| !Arc::ptr_eq(existing, handler));
        }
    }

    /// Calls every handler registered under `key` that supports `ctx`.
    pub fn call_event(&self, key: &str, ctx: &dyn TriggerContext) {
        let handlers = {
            let map = self.handlers.read().expect("event bus lock poisoned");
            match map.get(key) {
                Some(list) => list.clone(),
                None => return,
            }
        };
        for handler in handlers {
            if handler.supports(ctx) {
                handler.handle(ctx);
            }
        }
    }

    /// Number of handlers currently filed under `key`.
    pub fn handler_count(&self, key: &str) -> usize {
        self.handlers
            .read()
            .expect("event bus lock poisoned")
            .get(key)
            .map_or(0, Vec::len)
    }
}
