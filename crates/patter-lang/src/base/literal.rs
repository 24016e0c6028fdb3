use std::sync::Arc;

use crate::base::converted;
use crate::engine::Engine;
use crate::syntax::{Expression, SyntaxElement, TriggerContext};
use crate::types::{Type, Value};

/// An expression whose single value is fixed at parse time.
pub struct SimpleLiteral {
    ty: Arc<Type>,
    value: Value,
}

impl SimpleLiteral {
    pub fn new(ty: Arc<Type>, value: Value) -> Self {
        Self { ty, value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl SyntaxElement for SimpleLiteral {
    fn describe(&self, _ctx: Option<&dyn TriggerContext>, _debug: bool) -> String {
        self.ty.display(&self.value)
    }
}

impl Expression for SimpleLiteral {
    fn values(&self, _ctx: &dyn TriggerContext) -> Vec<Value> {
        vec![self.value.clone()]
    }

    fn return_type(&self) -> Arc<Type> {
        Arc::clone(&self.ty)
    }

    fn is_literal(&self) -> bool {
        true
    }

    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>> {
        if target.is_any() || target.type_id() == self.ty.type_id() {
            return Some(self);
        }
        // Literals convert eagerly, staying literal.
        let converted = engine.converters().convert(&self.value, target.type_id())?;
        Some(Box::new(SimpleLiteral::new(Arc::clone(target), converted)))
    }
}

/// A list literal whose elements are all literals themselves.
pub struct LiteralList {
    items: Vec<Box<dyn Expression>>,
    ty: Arc<Type>,
    and_list: bool,
}

impl LiteralList {
    /// `ty` is the common type of the items, `and_list` the combining
    /// rule determined from the separators.
    pub fn new(items: Vec<Box<dyn Expression>>, ty: Arc<Type>, and_list: bool) -> Self {
        debug_assert!(items.iter().all(|item| item.is_literal()));
        Self {
            items,
            ty,
            and_list,
        }
    }

    pub fn is_and_list(&self) -> bool {
        self.and_list
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Box<dyn Expression>] {
        &self.items
    }
}

impl SyntaxElement for LiteralList {
    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        describe_list(&self.items, self.and_list, ctx, debug)
    }
}

impl Expression for LiteralList {
    fn values(&self, ctx: &dyn TriggerContext) -> Vec<Value> {
        self.items.iter().flat_map(|item| item.values(ctx)).collect()
    }

    fn is_single(&self) -> bool {
        false
    }

    fn return_type(&self) -> Arc<Type> {
        Arc::clone(&self.ty)
    }

    fn is_literal(&self) -> bool {
        true
    }

    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>> {
        converted::wrap(self, target, engine)
    }
}

/// A list of arbitrary expressions joined by list separators.
pub struct ExpressionList {
    items: Vec<Box<dyn Expression>>,
    ty: Arc<Type>,
    and_list: bool,
}

impl ExpressionList {
    pub fn new(items: Vec<Box<dyn Expression>>, ty: Arc<Type>, and_list: bool) -> Self {
        Self {
            items,
            ty,
            and_list,
        }
    }

    pub fn is_and_list(&self) -> bool {
        self.and_list
    }

    pub fn items(&self) -> &[Box<dyn Expression>] {
        &self.items
    }
}

impl SyntaxElement for ExpressionList {
    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        describe_list(&self.items, self.and_list, ctx, debug)
    }
}

impl Expression for ExpressionList {
    fn values(&self, ctx: &dyn TriggerContext) -> Vec<Value> {
        self.items.iter().flat_map(|item| item.values(ctx)).collect()
    }

    fn is_single(&self) -> bool {
        false
    }

    fn return_type(&self) -> Arc<Type> {
        Arc::clone(&self.ty)
    }

    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>> {
        converted::wrap(self, target, engine)
    }
}

fn describe_list(
    items: &[Box<dyn Expression>],
    and_list: bool,
    ctx: Option<&dyn TriggerContext>,
    debug: bool,
) -> String {
    let rendered: Vec<String> = items.iter().map(|item| item.describe(ctx, debug)).collect();
    match rendered.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!(
            "{} {} {}",
            rest.join(", "),
            if and_list { "and" } else { "or" },
            last
        ),
        Some((only, _)) => only.clone(),
        None => String::new(),
    }
}
