//! Script identity and lifecycle for the patter scripting language.
//!
//! A [`ScriptLoader`] owns the registry of known [`Script`]s and drives
//! the load / unload / reload lifecycle against a shared engine and
//! event bus.

mod loader;
mod options;
mod script;

pub use loader::ScriptLoader;
pub use options::LoadOptions;
pub use script::{Script, ScriptLoadResult};
