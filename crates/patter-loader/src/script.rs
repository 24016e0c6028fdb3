use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use patter_core::log::LogEntry;
use patter_lang::Trigger;

/// A script file known to the loader, identified by its absolute path.
///
/// A script is *loaded* exactly when it holds a trigger set. Loading an
/// already loaded script, or unloading an unloaded one, is a programmer
/// error and panics.
pub struct Script {
    path: PathBuf,
    name: String,
    triggers: Mutex<Option<Vec<Arc<Trigger>>>>,
    /// Serializes concurrent load attempts on the same script.
    loading: Mutex<()>,
}

impl Script {
    pub(crate) fn new(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path: path.to_owned(),
            name,
            triggers: Mutex::new(None),
            loading: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name with one extension stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.triggers().is_some()
    }

    /// The trigger set, present exactly while loaded.
    pub fn triggers(&self) -> Option<Vec<Arc<Trigger>>> {
        self.triggers
            .lock()
            .expect("script trigger lock poisoned")
            .clone()
    }

    pub(crate) fn begin_load(&self) -> MutexGuard<'_, ()> {
        self.loading.lock().expect("script load lock poisoned")
    }

    /// Installs the trigger set, flipping the script to loaded.
    pub(crate) fn load(&self, triggers: Vec<Arc<Trigger>>) {
        let mut slot = self
            .triggers
            .lock()
            .expect("script trigger lock poisoned");
        if slot.is_some() {
            panic!(
                "tried providing an already loaded script with a new set of triggers: {}",
                self.path.display()
            );
        }
        *slot = Some(triggers);
    }

    /// Unloads the script: every trigger's unload hook runs and the
    /// trigger set is dropped. The `Script` itself stays registered.
    pub fn unload(&self) {
        let taken = self
            .triggers
            .lock()
            .expect("script trigger lock poisoned")
            .take();
        match taken {
            Some(triggers) => {
                for trigger in &triggers {
                    trigger.unload();
                }
            }
            None => panic!("tried to unload an unloaded script: {}", self.path.display()),
        }
    }
}

/// Outcome of a script load: the loaded script (absent when the file
/// could not even be read into elements) plus the diagnostics.
pub struct ScriptLoadResult {
    log: Option<Vec<LogEntry>>,
    script: Option<Arc<Script>>,
}

impl ScriptLoadResult {
    pub(crate) fn new(log: Vec<LogEntry>, script: Arc<Script>) -> Self {
        Self {
            log: Some(log),
            script: Some(script),
        }
    }

    /// Result for a script that was already loaded: nothing was parsed,
    /// so there is no log.
    pub(crate) fn already_loaded(script: Arc<Script>) -> Self {
        Self {
            log: None,
            script: Some(script),
        }
    }

    pub(crate) fn failed(log: Vec<LogEntry>) -> Self {
        Self {
            log: Some(log),
            script: None,
        }
    }

    pub fn script(&self) -> Option<&Arc<Script>> {
        self.script.as_ref()
    }

    pub fn log(&self) -> Option<&[LogEntry]> {
        self.log.as_deref()
    }

    pub fn parsed_successfully(&self) -> bool {
        self.script.is_some()
    }

    /// The error entries of the load log.
    pub fn errors(&self) -> Vec<&LogEntry> {
        self.log
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|entry| entry.is_error())
            .collect()
    }
}
