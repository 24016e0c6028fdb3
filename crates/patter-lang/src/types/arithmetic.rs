use super::value::Value;

/// Arithmetic table attached to a registered type.
///
/// Syntax elements that change values by an offset (add, remove) consult
/// the table of the value's type instead of hard-coding number math.
pub trait Arithmetic: Send + Sync {
    /// `value + difference`, or `None` if the operands are unusable.
    fn add(&self, value: &Value, difference: &Value) -> Option<Value>;

    /// Absolute difference between two values.
    fn difference(&self, first: &Value, second: &Value) -> Option<Value>;
}
