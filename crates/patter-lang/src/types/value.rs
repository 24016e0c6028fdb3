use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A dynamically typed runtime value.
///
/// Scripts manipulate values whose concrete Rust type is only known to
/// the type registry, so values are stored type-erased and shared.
/// Cloning a `Value` is cheap.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// The `TypeId` of the wrapped concrete type.
    pub fn type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:?})", self.type_id())
    }
}
