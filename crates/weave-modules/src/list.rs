//! Lazy singly linked lists.
//!
//! All items are in the `list` namespace. Cells are built lazily: `cons`
//! stores its operands unevaluated, so a list may be consumed further than
//! it is ever forced.

use thiserror::Error;
use weave_core::{Exception, Term, Type, Value, split_list};
use weave_registry::{Declaration, Definition, Module};

/// Payload of the exceptions raised by list accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("list is empty")]
    Empty,
}

fn elements() -> Type {
    Type::list(Type::var(0))
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

fn cons(args: &[Term]) -> anyhow::Result<Term> {
    Ok(Term::cons(args[0].clone(), args[1].clone()))
}

// =============================================================================
// ACCESSORS
// =============================================================================

fn split(list: &Term, accessor: &str) -> anyhow::Result<(Term, Term)> {
    match split_list(list)? {
        Some(cell) => Ok(cell),
        None => Err(Exception::with_payload(format!("{accessor} of an empty list"), ListError::Empty).into()),
    }
}

fn head(args: &[Term]) -> anyhow::Result<Term> {
    split(&args[0], "head").map(|(head, _)| head)
}

fn tail(args: &[Term]) -> anyhow::Result<Term> {
    split(&args[0], "tail").map(|(_, tail)| tail)
}

fn is_empty(args: &[Term]) -> anyhow::Result<Term> {
    Ok(Term::value(split_list(&args[0])?.is_none()))
}

/// Creates the list module with all its nodes.
pub fn module() -> Module {
    Module::new("list")
        .declare(Declaration::new("nil").output("list").describe("The empty list"))
        .declare(
            Declaration::new("cons")
                .input("head")
                .input_with_default("tail", Term::nil)
                .output("list")
                .describe("Prepend an element"),
        )
        .declare(Declaration::new("head").input("list").output("head"))
        .declare(Declaration::new("tail").input("list").output("tail"))
        .declare(Declaration::new("is_empty").input("list").output("empty"))
        .define(Definition::constant("nil", 0, Value::nil()))
        .define(Definition::native(
            "cons",
            0,
            Type::function([Type::var(0), elements()], elements()),
            cons,
        ))
        .define(Definition::native(
            "head",
            0,
            Type::arrow(elements(), Type::var(0)),
            head,
        ))
        .define(Definition::native("tail", 0, Type::arrow(elements(), elements()), tail))
        .define(Definition::native(
            "is_empty",
            0,
            Type::arrow(elements(), Type::bool()),
            is_empty,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::{EvalError, evaluate, evaluate_as};

    fn list(items: &[i64]) -> Term {
        items
            .iter()
            .rev()
            .fold(Term::nil(), |tail, &n| Term::cons(Term::value(n), tail))
    }

    #[test]
    fn accessors() {
        let l = list(&[42, 24]);
        assert_eq!(evaluate_as::<i64>(&head(&[l.clone()]).unwrap()).unwrap(), 42);
        let rest = tail(&[l]).unwrap();
        assert_eq!(evaluate_as::<i64>(&head(&[rest.clone()]).unwrap()).unwrap(), 24);
        let empty = tail(&[rest]).unwrap();
        assert!(evaluate(&empty).unwrap().as_value().is_some_and(Value::is_nil));
        assert!(evaluate_as::<bool>(&is_empty(&[empty]).unwrap()).unwrap());
    }

    #[test]
    fn head_of_nil_raises_empty() {
        let err = head(&[Term::nil()]).unwrap_err();
        let exception = err.downcast_ref::<Exception>().unwrap();
        assert_eq!(exception.payload::<ListError>(), Some(&ListError::Empty));
        assert_eq!(exception.message(), "head of an empty list");
    }

    #[test]
    fn tail_of_nil_through_evaluator() {
        let m = module();
        let def = m
            .definitions
            .iter()
            .find(|d| d.name().simple_name() == "tail")
            .unwrap();
        let term = Term::apply(def.instantiate(&[]).unwrap(), Term::nil());
        match evaluate(&term) {
            Err(EvalError::Raised(e)) => assert!(e.is::<ListError>()),
            other => panic!("expected a raised exception, got {other:?}"),
        }
    }

    #[test]
    fn module_is_namespaced() {
        let m = module();
        assert_eq!(m.namespace_string(), "list");
        assert_eq!(m.declarations.len(), 5);
        assert!(m
            .declarations
            .iter()
            .all(|d| d.name.to_string().starts_with("list::")));
    }
}
