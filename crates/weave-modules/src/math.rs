//! Arithmetic on numbers.
//!
//! All items are in the `math` namespace. Each operation has one definition
//! per number type; the resolver picks one from the connected inputs.

use thiserror::Error;
use weave_core::{Exception, Term, Type, evaluate_as};
use weave_registry::{Declaration, Definition, Module};

/// Payload of arithmetic exceptions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
}

// =============================================================================
// KERNELS
// =============================================================================

fn add_int(a: i64, b: i64) -> Option<i64> {
    a.checked_add(b)
}

fn mul_int(a: i64, b: i64) -> Option<i64> {
    a.checked_mul(b)
}

fn add_float(a: f64, b: f64) -> f64 {
    a + b
}

fn mul_float(a: f64, b: f64) -> f64 {
    a * b
}

// =============================================================================
// DEFINITIONS
// =============================================================================

fn binary(ty: Type) -> Type {
    Type::function([ty.clone(), ty.clone()], ty)
}

fn int_op(name: &'static str, op: fn(i64, i64) -> Option<i64>) -> Definition {
    Definition::native(name, 0, binary(Type::int()), move |args| {
        let a: i64 = evaluate_as(&args[0])?;
        let b: i64 = evaluate_as(&args[1])?;
        match op(a, b) {
            Some(n) => Ok(Term::value(n)),
            None => Err(Exception::from_error(MathError::Overflow(name)).into()),
        }
    })
    .describe(format!("{name} on int"))
}

fn float_op(name: &'static str, op: fn(f64, f64) -> f64) -> Definition {
    Definition::native(name, 0, binary(Type::float()), move |args| {
        let a: f64 = evaluate_as(&args[0])?;
        let b: f64 = evaluate_as(&args[1])?;
        Ok(Term::value(op(a, b)))
    })
    .describe(format!("{name} on float"))
}

/// Creates the math module with all its nodes.
pub fn module() -> Module {
    Module::new("math")
        .declare(Declaration::new("add").input("a").input("b").output("sum"))
        .declare(Declaration::new("mul").input("a").input("b").output("product"))
        .define(int_op("add", add_int))
        .define(float_op("add", add_float))
        .define(int_op("mul", mul_int))
        .define(float_op("mul", mul_float))
}
