use std::sync::Arc;

use patter_core::log::{ErrorKind, ParseLogger};
use patter_core::strings;

use crate::base::converted;
use crate::engine::Engine;
use crate::parser::state::ParserState;
use crate::syntax::{Expression, SyntaxElement, TriggerContext};
use crate::types::{Type, Value};

/// A named runtime slot referenced as `{name}`, or `{name::*}` for a
/// list variable. Resolution of the slot is the host's concern; the
/// parser only binds the reference.
pub struct Variable {
    name: String,
    list: bool,
    object_type: Arc<Type>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_list(&self) -> bool {
        self.list
    }
}

impl SyntaxElement for Variable {
    fn describe(&self, _ctx: Option<&dyn TriggerContext>, _debug: bool) -> String {
        format!("{{{}}}", self.name)
    }
}

impl Expression for Variable {
    fn values(&self, _ctx: &dyn TriggerContext) -> Vec<Value> {
        // Variable storage lives in the host; unresolved here.
        Vec::new()
    }

    fn is_single(&self) -> bool {
        !self.list
    }

    fn return_type(&self) -> Arc<Type> {
        Arc::clone(&self.object_type)
    }

    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>> {
        converted::wrap(self, target, engine)
    }
}

/// Recognizes a brace-wrapped variable reference. Returns `None` when
/// `s` is not one; an empty name is reported and also yields `None`.
pub fn parse_variable(
    s: &str,
    engine: &Engine,
    _state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Variable> {
    let s = s.trim();
    if !s.starts_with('{') || !s.ends_with('}') {
        return None;
    }
    if strings::find_closing_index(s, '{', '}', 0) != Some(s.len() - 1) {
        return None;
    }
    let name = s[1..s.len() - 1].trim();
    if name.is_empty() {
        logger.error("A variable name cannot be empty", ErrorKind::SemanticError);
        return None;
    }
    let list = name.ends_with("::*");
    Some(Variable {
        name: name.to_string(),
        list,
        object_type: Arc::clone(engine.types().object()),
    })
}
