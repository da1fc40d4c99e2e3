//! Extracting Rust values from evaluated terms.
//!
//! Native bodies receive their arguments as lazy terms. [`FromValue`] plus
//! [`evaluate_as`](crate::evaluate_as) force an argument and pull out the
//! payload in one step:
//!
//! ```
//! use weave_core::{Term, evaluate_as};
//!
//! let n: i64 = evaluate_as(&Term::value(3i64)).unwrap();
//! assert_eq!(n, 3);
//! let err = evaluate_as::<bool>(&Term::value(3i64)).unwrap_err();
//! assert_eq!(err.to_string(), "expected bool, found int");
//! ```

use std::sync::Arc;

use crate::error::EvalError;
use crate::value::{ListCell, Value};

/// Conversion from a value payload.
pub trait FromValue: Sized {
    /// Name of the expected kind, used in the mismatch error.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;

    fn try_from_value(value: &Value) -> Result<Self, EvalError> {
        Self::from_value(value).ok_or_else(|| EvalError::Expected {
            expected: Self::EXPECTED,
            found: value.kind_name().to_string(),
        })
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for () {
    const EXPECTED: &'static str = "unit";

    fn from_value(value: &Value) -> Option<Self> {
        matches!(value, Value::Unit).then_some(())
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for Arc<str> {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for ListCell {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().cloned()
    }
}
