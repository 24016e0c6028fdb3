//! Registered comparators between value types.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::value::Value;

/// Outcome of comparing two values.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Relation {
    Smaller,
    Equal,
    Greater,
    /// The values are comparable but neither ordered nor equal.
    NotEqual,
}

impl Relation {
    pub fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Relation::Smaller,
            Ordering::Equal => Relation::Equal,
            Ordering::Greater => Relation::Greater,
        }
    }

    /// The relation with operands swapped.
    pub fn reverse(self) -> Self {
        match self {
            Relation::Smaller => Relation::Greater,
            Relation::Greater => Relation::Smaller,
            other => other,
        }
    }
}

/// A type-erased comparator. Returns `None` when the operands cannot be
/// compared after all (e.g. a downcast fails).
pub type ComparatorFn = Arc<dyn Fn(&Value, &Value) -> Option<Relation> + Send + Sync>;

/// Registered comparators, keyed by (left, right) type pair. A pair
/// registered one way is found the other way with the relation reversed.
#[derive(Default)]
pub struct ComparatorRegistry {
    map: HashMap<(TypeId, TypeId), ComparatorFn>,
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<L, R, C>(&mut self, compare: C)
    where
        L: Any + Send + Sync,
        R: Any + Send + Sync,
        C: Fn(&L, &R) -> Option<Relation> + Send + Sync + 'static,
    {
        let erased: ComparatorFn = Arc::new(move |left: &Value, right: &Value| {
            let left = left.downcast_ref::<L>()?;
            let right = right.downcast_ref::<R>()?;
            compare(left, right)
        });
        self.map.insert((TypeId::of::<L>(), TypeId::of::<R>()), erased);
    }

    /// Compares two values using the registered comparator for their
    /// types, trying the reversed pair if the direct one is missing.
    pub fn compare(&self, left: &Value, right: &Value) -> Option<Relation> {
        let key = (left.type_id(), right.type_id());
        if let Some(comparator) = self.map.get(&key) {
            return comparator(left, right);
        }
        let reversed = (key.1, key.0);
        self.map
            .get(&reversed)
            .and_then(|comparator| comparator(right, left))
            .map(Relation::reverse)
    }

    pub fn comparator_exists(&self, left: TypeId, right: TypeId) -> bool {
        self.map.contains_key(&(left, right)) || self.map.contains_key(&(right, left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_comparison() {
        let mut comparators = ComparatorRegistry::new();
        comparators.register::<i64, i64, _>(|a, b| Some(Relation::from_ordering(a.cmp(b))));

        let rel = comparators.compare(&Value::new(1i64), &Value::new(2i64));
        assert_eq!(rel, Some(Relation::Smaller));
    }

    #[test]
    fn reversed_lookup() {
        let mut comparators = ComparatorRegistry::new();
        comparators.register::<i64, String, _>(|n, s| {
            s.parse::<i64>()
                .ok()
                .map(|parsed| Relation::from_ordering(n.cmp(&parsed)))
        });

        // String on the left resolves through the reversed pair.
        let rel = comparators.compare(&Value::new(String::from("1")), &Value::new(5i64));
        assert_eq!(rel, Some(Relation::Smaller));
    }

    #[test]
    fn missing_comparator() {
        let comparators = ComparatorRegistry::new();
        assert_eq!(
            comparators.compare(&Value::new(1i64), &Value::new(2i64)),
            None
        );
    }
}
