//! Wrapping an expression so it produces values of a converted type.

use std::sync::Arc;

use crate::engine::Engine;
use crate::syntax::{Expression, SyntaxElement, TriggerContext};
use crate::types::{ConverterFn, Type, Value};

/// An expression viewed through a registered converter.
pub struct ConvertedExpression {
    inner: Box<dyn Expression>,
    target: Arc<Type>,
    convert: ConverterFn,
}

impl SyntaxElement for ConvertedExpression {
    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        self.inner.describe(ctx, debug)
    }
}

impl Expression for ConvertedExpression {
    fn values(&self, ctx: &dyn TriggerContext) -> Vec<Value> {
        self.inner
            .values(ctx)
            .iter()
            .filter_map(|value| (self.convert)(value))
            .collect()
    }

    fn is_single(&self) -> bool {
        self.inner.is_single()
    }

    fn return_type(&self) -> Arc<Type> {
        Arc::clone(&self.target)
    }

    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>> {
        wrap(self, target, engine)
    }
}

/// Reinterprets `expr` as producing `target` values: identity when the
/// types already agree, otherwise a [`ConvertedExpression`] around a
/// registered converter. `None` when no converter exists.
pub fn wrap<E>(expr: Box<E>, target: &Arc<Type>, engine: &Engine) -> Option<Box<dyn Expression>>
where
    E: Expression + 'static,
{
    wrap_boxed(expr as Box<dyn Expression>, target, engine)
}

/// As [`wrap`], for an already type-erased expression.
pub fn wrap_boxed(
    expr: Box<dyn Expression>,
    target: &Arc<Type>,
    engine: &Engine,
) -> Option<Box<dyn Expression>> {
    let from = expr.return_type();
    if target.is_any() || from.type_id() == target.type_id() {
        return Some(expr);
    }
    let convert = engine
        .converters()
        .converter(from.type_id(), target.type_id())?;
    Some(Box::new(ConvertedExpression {
        inner: expr,
        target: Arc::clone(target),
        convert,
    }))
}
