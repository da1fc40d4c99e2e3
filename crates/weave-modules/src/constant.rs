//! Literal nodes.
//!
//! All items are in the `constant` namespace. Each node reads its value from
//! the first literal of the node payload.

use thiserror::Error;
use weave_core::{Exception, FromValue, Term, Type, Value};
use weave_registry::{Declaration, Definition, Module};

/// Payload of the exceptions raised by malformed literal payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstantError {
    #[error("node has no literal")]
    Missing,

    #[error("expected a {expected} literal, found {found}")]
    WrongKind { expected: &'static str, found: String },
}

fn literal<T: FromValue>(literals: &[Value]) -> Result<Term, Exception> {
    match literals.first() {
        Some(value) if T::from_value(value).is_some() => Ok(Term::value(value.clone())),
        Some(value) => Err(Exception::from_error(ConstantError::WrongKind {
            expected: T::EXPECTED,
            found: value.kind_name().to_string(),
        })),
        None => Err(Exception::from_error(ConstantError::Missing)),
    }
}

fn any_literal(literals: &[Value]) -> Result<Term, Exception> {
    literals
        .first()
        .cloned()
        .map(Term::value)
        .ok_or_else(|| Exception::from_error(ConstantError::Missing))
}

fn constant_node(name: &str) -> Declaration {
    Declaration::new(name).output("value")
}

/// Creates the constant module with all its nodes.
pub fn module() -> Module {
    Module::new("constant")
        .declare(constant_node("int"))
        .declare(constant_node("float"))
        .declare(constant_node("string"))
        .declare(constant_node("bool"))
        .declare(constant_node("value"))
        .define(Definition::new("int", 0, Type::int(), literal::<i64>))
        .define(Definition::new("float", 0, Type::float(), literal::<f64>))
        .define(Definition::new("string", 0, Type::string(), literal::<String>))
        .define(Definition::new("bool", 0, Type::bool(), literal::<bool>))
        .define(
            Definition::derived("value", 0, |lits: &[Value]| lits.first().map(Value::ty), any_literal)
                .describe("typed by its literal"),
        )
}
