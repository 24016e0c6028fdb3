//! Runtime types: the registry mapping Rust types to script-visible type
//! names, literal parsers, display functions and arithmetic tables.

mod arithmetic;
mod comparisons;
mod conversions;
mod value;

pub use arithmetic::Arithmetic;
pub use comparisons::{ComparatorRegistry, Relation};
pub use conversions::{ConverterFn, ConverterRegistry};
pub use value::Value;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Parses source text into a literal value of one type. `None` means the
/// text is not a literal of that type (not an error).
pub type LiteralParser = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Renders a value of one type back to display text.
pub type DisplayFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A script-visible type: the bridge between a concrete Rust type and
/// the names, literals and operations the language knows it by.
pub struct Type {
    type_id: TypeId,
    base_name: String,
    plural: String,
    any: bool,
    literal_parser: Option<LiteralParser>,
    display: Option<DisplayFn>,
    arithmetic: Option<Arc<dyn Arithmetic>>,
}

impl Type {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Whether this is the any-type every value is assignable to.
    pub fn is_any(&self) -> bool {
        self.any
    }

    pub fn literal_parser(&self) -> Option<&LiteralParser> {
        self.literal_parser.as_ref()
    }

    pub fn arithmetic(&self) -> Option<&Arc<dyn Arithmetic>> {
        self.arithmetic.as_ref()
    }

    /// Renders a value of this type, falling back to the type name.
    pub fn display(&self, value: &Value) -> String {
        match &self.display {
            Some(display) => display(value),
            None => format!("<{}>", self.base_name),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("base_name", &self.base_name)
            .field("any", &self.any)
            .finish()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_name)
    }
}

/// An expression placeholder's expected kind: a type plus whether a
/// single value is required.
#[derive(Clone, Debug)]
pub struct PatternType {
    ty: Arc<Type>,
    single: bool,
}

impl PatternType {
    pub fn new(ty: Arc<Type>, single: bool) -> Self {
        Self { ty, single }
    }

    pub fn ty(&self) -> &Arc<Type> {
        &self.ty
    }

    pub fn is_single(&self) -> bool {
        self.single
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.single {
            f.write_str(self.ty.base_name())
        } else {
            f.write_str(self.ty.plural())
        }
    }
}

/// Builder returned by [`TypeRegistry::new_type`].
pub struct TypeBuilder<'r> {
    registry: &'r mut TypeRegistry,
    ty: Type,
}

impl TypeBuilder<'_> {
    /// Marks this type as the any-type.
    pub fn any(mut self) -> Self {
        self.ty.any = true;
        self
    }

    pub fn literal_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.ty.literal_parser = Some(Arc::new(parser));
        self
    }

    pub fn display<F>(mut self, display: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.ty.display = Some(Arc::new(display));
        self
    }

    pub fn arithmetic(mut self, arithmetic: impl Arithmetic + 'static) -> Self {
        self.ty.arithmetic = Some(Arc::new(arithmetic));
        self
    }

    pub fn register(self) -> Arc<Type> {
        let ty = Arc::new(self.ty);
        self.registry.insert(Arc::clone(&ty));
        ty
    }
}

/// All registered script-visible types.
#[derive(Default)]
pub struct TypeRegistry {
    types: Vec<Arc<Type>>,
    by_id: HashMap<TypeId, Arc<Type>>,
    object: Option<Arc<Type>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts registering a type for the concrete Rust type `T`.
    pub fn new_type<T: Any>(&mut self, base_name: &str, plural: &str) -> TypeBuilder<'_> {
        TypeBuilder {
            registry: self,
            ty: Type {
                type_id: TypeId::of::<T>(),
                base_name: base_name.to_string(),
                plural: plural.to_string(),
                any: false,
                literal_parser: None,
                display: None,
                arithmetic: None,
            },
        }
    }

    fn insert(&mut self, ty: Arc<Type>) {
        if ty.is_any() {
            self.object = Some(Arc::clone(&ty));
        }
        self.by_id.insert(ty.type_id(), Arc::clone(&ty));
        self.types.push(ty);
    }

    pub fn by_type_id(&self, id: TypeId) -> Option<&Arc<Type>> {
        self.by_id.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Type>> {
        self.types
            .iter()
            .find(|t| t.base_name().eq_ignore_ascii_case(name))
    }

    /// The registered any-type.
    ///
    /// Panics if called before the default registration ran; the parser
    /// cannot operate without it.
    pub fn object(&self) -> &Arc<Type> {
        self.object
            .as_ref()
            .expect("no any-type registered; run defaults::register first")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Type>> {
        self.types.iter()
    }

    /// Resolves a pattern type name: a base name means single, a plural
    /// form means multiple values are accepted.
    pub fn pattern_type(&self, name: &str) -> Option<PatternType> {
        for ty in &self.types {
            if ty.base_name().eq_ignore_ascii_case(name) {
                return Some(PatternType::new(Arc::clone(ty), true));
            }
            if ty.plural().eq_ignore_ascii_case(name) {
                return Some(PatternType::new(Arc::clone(ty), false));
            }
        }
        None
    }

    /// Whether a value of type `actual` satisfies `expected` without
    /// conversion. There is no subtyping: only the any-type and exact
    /// matches qualify.
    pub fn is_assignable(&self, expected: &Type, actual: TypeId) -> bool {
        expected.is_any() || expected.type_id() == actual
    }

    /// Renders a value using its registered type, if any.
    pub fn display_value(&self, value: &Value) -> String {
        match self.by_type_id(value.type_id()) {
            Some(ty) => ty.display(value),
            None => "<unknown>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    fn registry_with_number() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.new_type::<Marker>("object", "objects").any().register();
        registry
            .new_type::<i64>("integer", "integers")
            .literal_parser(|s| s.parse::<i64>().ok().map(Value::new))
            .display(|v| v.downcast_ref::<i64>().unwrap().to_string())
            .register();
        registry
    }

    #[test]
    fn lookup_by_name_and_id() {
        let registry = registry_with_number();
        assert!(registry.by_name("integer").is_some());
        assert!(registry.by_name("Integer").is_some());
        assert!(registry.by_type_id(TypeId::of::<i64>()).is_some());
        assert!(registry.by_name("float").is_none());
    }

    #[test]
    fn pattern_type_plurality() {
        let registry = registry_with_number();
        assert!(registry.pattern_type("integer").unwrap().is_single());
        assert!(!registry.pattern_type("integers").unwrap().is_single());
        assert!(registry.pattern_type("widget").is_none());
    }

    #[test]
    fn assignability() {
        let registry = registry_with_number();
        let object = Arc::clone(registry.object());
        let integer = Arc::clone(registry.by_name("integer").unwrap());

        assert!(registry.is_assignable(&object, TypeId::of::<i64>()));
        assert!(registry.is_assignable(&integer, TypeId::of::<i64>()));
        assert!(!registry.is_assignable(&integer, TypeId::of::<String>()));
    }

    #[test]
    fn literal_parser_round_trip() {
        let registry = registry_with_number();
        let integer = registry.by_name("integer").unwrap();
        let parser = integer.literal_parser().unwrap();
        let value = parser("42").unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&42));
        assert_eq!(integer.display(&value), "42");
    }

    #[test]
    fn display_falls_back_to_type_name() {
        let registry = registry_with_number();
        let object = registry.object();
        assert_eq!(object.display(&Value::new(Marker)), "<object>");
    }
}
