//! Orchestrates the script lifecycle: read, split, cold-parse triggers,
//! finalize in loading-priority order, register with the event bus.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use patter_core::file::{parse_file, FileElement};
use patter_core::log::{ErrorKind, ParseLogger};
use patter_core::strings;
use patter_lang::parser;
use patter_lang::registration::Addon;
use patter_lang::{Engine, EventBus, Trigger, UnloadedTrigger};

use crate::options::LoadOptions;
use crate::script::{Script, ScriptLoadResult};

/// Loads, unloads and reloads scripts, and owns the process-wide
/// registry of known scripts keyed by path.
pub struct ScriptLoader {
    engine: Arc<Engine>,
    bus: Arc<EventBus>,
    scripts: RwLock<HashMap<std::path::PathBuf, Arc<Script>>>,
}

impl ScriptLoader {
    pub fn new(engine: Arc<Engine>, bus: Arc<EventBus>) -> Self {
        Self {
            engine,
            bus,
            scripts: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The script registered at `path`, loaded or not.
    pub fn get_script(&self, path: &Path) -> Option<Arc<Script>> {
        self.scripts
            .read()
            .expect("script registry lock poisoned")
            .get(path)
            .cloned()
    }

    /// Drops the script registered at `path` from the registry. A loaded
    /// script is unloaded first.
    pub fn remove_script(&self, path: &Path) -> Option<Arc<Script>> {
        let script = self
            .scripts
            .write()
            .expect("script registry lock poisoned")
            .remove(path)?;
        if script.is_loaded() {
            script.unload();
        }
        Some(script)
    }

    /// Returns the loaded script at `path`, loading it first if needed.
    /// Concurrent calls for the same path load at most once; the loser
    /// of the race observes the winner's script unchanged.
    pub fn get_or_load_script(&self, path: &Path, options: LoadOptions) -> ScriptLoadResult {
        let script = {
            let mut scripts = self.scripts.write().expect("script registry lock poisoned");
            match scripts.get(path) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let script = Arc::new(Script::new(path));
                    scripts.insert(path.to_owned(), Arc::clone(&script));
                    script
                }
            }
        };

        let guard = script.begin_load();
        if script.is_loaded() {
            drop(guard);
            return ScriptLoadResult::already_loaded(script);
        }
        let result = self.load_script_locked(&script, ParseLogger::new(options.is_debug()), options);
        drop(guard);
        result
    }

    /// Loads an unloaded script from its file. Loading a loaded script
    /// is a programmer error.
    pub fn load_script(
        &self,
        script: &Arc<Script>,
        logger: ParseLogger,
        options: LoadOptions,
    ) -> ScriptLoadResult {
        let guard = script.begin_load();
        let result = self.load_script_locked(script, logger, options);
        drop(guard);
        result
    }

    /// Unloads (if needed) and loads the script again from disk,
    /// preserving its identity.
    pub fn reload(&self, script: &Arc<Script>, options: LoadOptions) -> ScriptLoadResult {
        if script.is_loaded() {
            script.unload();
        }
        self.load_script(script, ParseLogger::new(options.is_debug()), options)
    }

    fn load_script_locked(
        &self,
        script: &Arc<Script>,
        mut logger: ParseLogger,
        options: LoadOptions,
    ) -> ScriptLoadResult {
        if script.is_loaded() {
            panic!(
                "tried loading elements into a loaded script: {}",
                script.path().display()
            );
        }
        logger.set_script(script.name());

        let source = match std::fs::read_to_string(script.path()) {
            Ok(source) => source,
            Err(error) => {
                log::warn!("failed to read {}: {}", script.path().display(), error);
                logger.error(
                    format!("Could not read {}: {}", script.path().display(), error),
                    ErrorKind::Exception,
                );
                return ScriptLoadResult::failed(logger.close());
            }
        };

        let elements = parse_file(&source, &mut logger);

        // Cold parse: match section headers against the event registry;
        // bodies wait for the priority pass.
        let mut unloaded: Vec<UnloadedTrigger<'_>> = Vec::new();
        for element in &elements {
            logger.finish_line();
            logger.set_line(element.line());
            match element {
                FileElement::Void(_) => continue,
                FileElement::Simple(_) => {
                    logger.error("Can't have code outside of a trigger", ErrorKind::StructureError);
                }
                FileElement::Section(section) => {
                    let content = section.content();
                    if strings::starts_with_ignore_case(content, "else if ") {
                        logger.error(
                            "An 'else if' must be placed after an 'if'",
                            ErrorKind::StructureError,
                        );
                    } else if content.eq_ignore_ascii_case("else") {
                        logger.error(
                            "An 'else' must be placed after an 'if' or an 'else if'",
                            ErrorKind::StructureError,
                        );
                    } else if let Some(trigger) =
                        parser::parse_trigger(&self.engine, section, &mut logger)
                    {
                        unloaded.push(trigger);
                    }
                }
            }
        }
        logger.finish_line();

        // Higher loading priority parses first; stable within ties.
        unloaded.sort_by(|a, b| b.loading_priority().cmp(&a.loading_priority()));

        let mut addons: Vec<Arc<dyn Addon>> = Vec::new();
        let mut triggers: Vec<Arc<Trigger>> = Vec::with_capacity(unloaded.len());
        for staged in unloaded {
            let (mut trigger, section, line, info, mut state) = staged.into_parts();
            logger.finish_line();
            logger.set_line(line);
            state.set_current_event(trigger.event().describe(None, logger.is_debug()));
            trigger.load_section(section, &self.engine, &mut state, &mut logger);

            let trigger = Arc::new(trigger);
            if !options.is_dry() {
                // Deprecated broadcast, kept for compatibility.
                info.meta().addon().handle_trigger(&trigger);
                trigger.event().register(&trigger, &self.bus);
            }
            if !addons.iter().any(|a| Arc::ptr_eq(a, info.meta().addon())) {
                addons.push(Arc::clone(info.meta().addon()));
            }
            triggers.push(trigger);
        }
        logger.finish_line();

        script.load(triggers);
        if !options.is_dry() {
            for addon in addons {
                addon.finished_loading();
            }
        }
        ScriptLoadResult::new(logger.close(), Arc::clone(script))
    }
}
