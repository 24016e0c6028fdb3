//! The converter graph: registered coercions between value types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::value::Value;

/// A type-erased converter.
pub type ConverterFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Registered converters, keyed by (from, to) type pair.
///
/// Lookup is direct: converters are not chained. Registering a second
/// converter for the same pair replaces the first.
#[derive(Default)]
pub struct ConverterRegistry {
    edges: HashMap<(TypeId, TypeId), ConverterFn>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed converter from `F` to `T`.
    pub fn register<F, T, C>(&mut self, convert: C)
    where
        F: Any + Send + Sync,
        T: Any + Send + Sync,
        C: Fn(&F) -> Option<T> + Send + Sync + 'static,
    {
        let erased: ConverterFn = Arc::new(move |value: &Value| {
            value.downcast_ref::<F>().and_then(&convert).map(Value::new)
        });
        self.edges
            .insert((TypeId::of::<F>(), TypeId::of::<T>()), erased);
    }

    pub fn converter_exists(&self, from: TypeId, to: TypeId) -> bool {
        self.edges.contains_key(&(from, to))
    }

    pub fn converter(&self, from: TypeId, to: TypeId) -> Option<ConverterFn> {
        self.edges.get(&(from, to)).cloned()
    }

    /// Converts `value` to the target type, if a converter is registered.
    pub fn convert(&self, value: &Value, to: TypeId) -> Option<Value> {
        self.edges.get(&(value.type_id(), to))?(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_convert() {
        let mut converters = ConverterRegistry::new();
        converters.register::<i64, String, _>(|n| Some(n.to_string()));

        assert!(converters.converter_exists(TypeId::of::<i64>(), TypeId::of::<String>()));
        assert!(!converters.converter_exists(TypeId::of::<String>(), TypeId::of::<i64>()));

        let converted = converters.convert(&Value::new(5i64), TypeId::of::<String>());
        assert_eq!(
            converted.unwrap().downcast_ref::<String>().map(String::as_str),
            Some("5")
        );
    }

    #[test]
    fn converter_may_refuse() {
        let mut converters = ConverterRegistry::new();
        converters.register::<String, i64, _>(|s| s.parse().ok());

        assert!(converters
            .convert(&Value::new(String::from("12")), TypeId::of::<i64>())
            .is_some());
        assert!(converters
            .convert(&Value::new(String::from("nope")), TypeId::of::<i64>())
            .is_none());
    }
}
