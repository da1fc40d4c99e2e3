//! Lazy graph reduction to weak head normal form.

use tracing::trace;

use crate::convert::FromValue;
use crate::error::EvalError;
use crate::term::{Apply, Term, TermNode, TermTag, uncons};
use crate::value::{ListCell, Value};

/// Reduce `term` to weak head normal form.
///
/// Values, closures, free variables and lambdas are returned unchanged and an
/// exception term fails immediately. An application is reduced once: the
/// result, or the exception a code body raised, is written to the node's
/// cache and every later evaluation of the same node reads it back.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn evaluate(term: &Term) -> Result<Term, EvalError> {
    if term.is_exception() {
        return Err(raised(term));
    }
    match term.node() {
        TermNode::Apply(app) => reduce_apply(app),
        TermNode::Fix(function) => reduce_fix(term, function),
        _ => Ok(term.clone()),
    }
}

fn raised(term: &Term) -> EvalError {
    match term.as_exception() {
        Some(e) => EvalError::Raised(e.clone()),
        None => EvalError::BadApplication { found: term.tag() },
    }
}

fn reduce_apply(app: &Apply) -> Result<Term, EvalError> {
    if let Some(done) = app.cached() {
        return settle(done);
    }
    match step(app) {
        Ok(result) => settle(app.store(result)),
        Err(EvalError::Raised(exception)) => {
            app.store(Term::exception(exception.clone()));
            Err(EvalError::Raised(exception))
        }
        Err(fatal) => Err(fatal),
    }
}

fn settle(result: &Term) -> Result<Term, EvalError> {
    if result.is_exception() {
        Err(raised(result))
    } else {
        Ok(result.clone())
    }
}

fn step(app: &Apply) -> Result<Term, EvalError> {
    let function = evaluate(app.function())?;
    let Some(callable) = function.as_callable() else {
        // an application in function position that reduced to a non-function
        // was handed more arguments than its head accepts
        if app.function().tag() == TermTag::Apply {
            return Err(EvalError::TooManyArguments {
                name: spine_head_name(app.function()),
            });
        }
        return Err(EvalError::BadApplication {
            found: function.tag(),
        });
    };
    if callable.arity() == 0 || !callable.signature().is_arrow() {
        return Err(EvalError::BadApplication {
            found: function.tag(),
        });
    }

    let mut next = callable.duplicate();
    next.push_argument(app.argument().clone())?;
    trace!(name = next.name(), remaining = next.arity(), "push argument");

    if next.arity() > 0 {
        return Ok(Term::closure_boxed(next));
    }
    trace!(name = next.name(), "invoke body");
    let body = next.invoke_body()?;
    evaluate(&body)
}

fn spine_head_name(term: &Term) -> String {
    let mut current = term;
    while let Some(app) = current.as_apply() {
        current = app.function();
    }
    match current.as_callable() {
        Some(callable) => callable.name().to_string(),
        None => current.tag().to_string(),
    }
}

fn reduce_fix(term: &Term, function: &Term) -> Result<Term, EvalError> {
    let function = evaluate(function)?;
    if function.as_callable().is_none() {
        return Err(EvalError::BadFix {
            found: function.tag(),
        });
    }
    evaluate(&Term::apply(function, term.clone()))
}

/// Evaluate and return the value payload.
pub fn evaluate_value(term: &Term) -> Result<Value, EvalError> {
    let reduced = evaluate(term)?;
    match reduced.as_value() {
        Some(v) => Ok(v.clone()),
        None => Err(EvalError::Expected {
            expected: "value",
            found: reduced.tag().to_string(),
        }),
    }
}

/// Evaluate and convert the payload to `T`.
pub fn evaluate_as<T: FromValue>(term: &Term) -> Result<T, EvalError> {
    let reduced = evaluate(term)?;
    match reduced.as_value() {
        Some(v) => T::try_from_value(v),
        None => Err(EvalError::Expected {
            expected: T::EXPECTED,
            found: reduced.tag().to_string(),
        }),
    }
}

/// Force a lazy list and return its evaluated elements.
pub fn collect_list(term: &Term) -> Result<Vec<Term>, EvalError> {
    let mut items = Vec::new();
    let mut cell = evaluate(term)?;
    loop {
        match cell.as_value() {
            Some(Value::List(ListCell::Nil)) => return Ok(items),
            Some(Value::List(ListCell::Cons(head, tail))) => {
                items.push(evaluate(head)?);
                let tail = tail.clone();
                cell = evaluate(&tail)?;
            }
            _ => {
                return Err(EvalError::Expected {
                    expected: "list",
                    found: cell.tag().to_string(),
                });
            }
        }
    }
}

/// Evaluate `term` and everything reachable through list cells and tuples.
pub fn evaluate_deep(term: &Term) -> Result<Term, EvalError> {
    let reduced = evaluate(term)?;
    match reduced.as_value() {
        Some(Value::List(ListCell::Cons(..))) => {
            let items = collect_list(&reduced)?
                .iter()
                .map(evaluate_deep)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items
                .into_iter()
                .rev()
                .fold(Term::nil(), |tail, head| Term::cons(head, tail)))
        }
        Some(Value::Tuple(fields)) => {
            let fields = fields
                .iter()
                .map(evaluate_deep)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Term::value(Value::Tuple(fields.into())))
        }
        _ => Ok(reduced),
    }
}

/// Head and tail of an evaluated list, `None` for the empty list.
pub fn split_list(term: &Term) -> Result<Option<(Term, Term)>, EvalError> {
    let reduced = evaluate(term)?;
    if let Some((head, tail)) = uncons(&reduced) {
        return Ok(Some((head.clone(), tail.clone())));
    }
    match reduced.as_value() {
        Some(Value::List(ListCell::Nil)) => Ok(None),
        _ => Err(EvalError::Expected {
            expected: "list",
            found: reduced.tag().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::VarId;
    use crate::term::{Exception, NativeClosure};
    use crate::ty::Type;

    fn int_binop(name: &str, calls: Arc<AtomicUsize>, op: fn(i64, i64) -> i64) -> Term {
        Term::native(
            name,
            Type::function([Type::int(), Type::int()], Type::int()),
            move |args| {
                calls.fetch_add(1, Ordering::SeqCst);
                let a: i64 = evaluate_as(&args[0])?;
                let b: i64 = evaluate_as(&args[1])?;
                Ok(Term::value(op(a, b)))
            },
        )
    }

    fn add(calls: Arc<AtomicUsize>) -> Term {
        int_binop("add", calls, |a, b| a + b)
    }

    #[test]
    fn values_are_already_normal() {
        let t = Term::value(5i64);
        assert!(Term::ptr_eq(&evaluate(&t).unwrap(), &t));
    }

    #[test]
    fn application_runs_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let t = Term::apply_all(add(calls), [Term::value(2i64), Term::value(3i64)]);
        assert_eq!(evaluate_as::<i64>(&t).unwrap(), 5);
    }

    #[test]
    fn shared_application_is_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let t = Term::apply_all(add(calls.clone()), [Term::value(2i64), Term::value(3i64)]);
        let first = evaluate(&t).unwrap();
        let second = evaluate(&t).unwrap();
        assert!(Term::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shared_argument_is_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = Term::apply_all(add(calls.clone()), [Term::value(1i64), Term::value(1i64)]);
        let outer = Term::apply_all(add(calls.clone()), [inner.clone(), inner]);
        assert_eq!(evaluate_as::<i64>(&outer).unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn partial_application_stays_a_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let f = add(calls.clone());
        let partial = evaluate(&Term::apply(f.clone(), Term::value(1i64))).unwrap();
        let callable = partial.as_callable().unwrap();
        assert_eq!(callable.arity(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // the un-applied closure is unaffected
        assert_eq!(f.as_callable().unwrap().arity(), 2);
    }

    #[test]
    fn one_argument_too_many() {
        let calls = Arc::new(AtomicUsize::new(0));
        let t = Term::apply_all(
            add(calls),
            [Term::value(1i64), Term::value(2i64), Term::value(3i64)],
        );
        let err = evaluate(&t).unwrap_err();
        assert!(matches!(err, EvalError::TooManyArguments { ref name } if name == "add"));
    }

    #[test]
    fn applying_a_value_is_bad_application() {
        let t = Term::apply(Term::value(1i64), Term::value(2i64));
        assert!(matches!(
            evaluate(&t),
            Err(EvalError::BadApplication {
                found: TermTag::Value
            })
        ));
    }

    #[test]
    fn exception_propagates_and_is_cached() {
        #[derive(Debug, thiserror::Error)]
        #[error("nope")]
        struct Nope;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let fail = Term::native("fail", Type::arrow(Type::int(), Type::int()), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Nope.into())
        });
        let t = Term::apply(fail, Term::value(0i64));
        for _ in 0..2 {
            let err = evaluate(&t).unwrap_err();
            assert!(err.exception().is_some_and(|e| e.is::<Nope>()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(t.as_apply().unwrap().cached().unwrap().is_exception());
    }

    #[test]
    fn exception_argument_surfaces_from_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let boom = Term::exception(Exception::new("boom"));
        let t = Term::apply_all(add(calls), [boom, Term::value(1i64)]);
        let err = evaluate(&t).unwrap_err();
        assert_eq!(err.exception().map(Exception::message), Some("boom"));
    }

    #[test]
    fn unused_exception_argument_is_harmless() {
        let first = Term::native(
            "first",
            Type::function([Type::var(0), Type::var(1)], Type::var(0)),
            |args| Ok(args[0].clone()),
        );
        let t = Term::apply_all(
            first,
            [Term::value(7i64), Term::exception(Exception::new("ignored"))],
        );
        assert_eq!(evaluate_as::<i64>(&t).unwrap(), 7);
    }

    #[test]
    fn lambda_application_substitutes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let x = VarId::fresh();
        let body = Term::apply_all(
            add(calls),
            [Term::free_var(x, Type::int()), Term::free_var(x, Type::int())],
        );
        let double = Term::lambda(x, Type::int(), body);
        let t = Term::apply(double.clone(), Term::value(21i64));
        assert_eq!(evaluate_as::<i64>(&t).unwrap(), 42);
        let again = Term::apply(double, Term::value(2i64));
        assert_eq!(evaluate_as::<i64>(&again).unwrap(), 4);
    }

    #[test]
    fn fix_computes_recursively() {
        // fix (\self n. if n == 0 then 1 else n * self (n - 1))
        let step = NativeClosure::new(
            "factorial",
            Type::function(
                [Type::arrow(Type::int(), Type::int()), Type::int()],
                Type::int(),
            ),
            |args| {
                let n: i64 = evaluate_as(&args[1])?;
                if n == 0 {
                    return Ok(Term::value(1i64));
                }
                let rest: i64 = evaluate_as(&Term::apply(args[0].clone(), Term::value(n - 1)))?;
                Ok(Term::value(n * rest))
            },
        );
        let factorial = Term::fix(Term::closure(step));
        let t = Term::apply(factorial, Term::value(5i64));
        assert_eq!(evaluate_as::<i64>(&t).unwrap(), 120);
    }

    #[test]
    fn fix_of_value_is_bad_fix() {
        let t = Term::fix(Term::value(1i64));
        assert!(matches!(
            evaluate(&t),
            Err(EvalError::BadFix {
                found: TermTag::Value
            })
        ));
    }

    #[test]
    fn collect_forces_elements() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sum = Term::apply_all(add(calls), [Term::value(1i64), Term::value(2i64)]);
        let list = Term::cons(Term::value(0i64), Term::cons(sum, Term::nil()));
        let items = collect_list(&list).unwrap();
        let ints: Vec<i64> = items
            .iter()
            .map(|t| t.as_value().and_then(Value::as_int).unwrap())
            .collect();
        assert_eq!(ints, vec![0, 3]);
    }

    #[test]
    fn collect_rejects_non_list() {
        let err = collect_list(&Term::value(1i64)).unwrap_err();
        assert!(matches!(err, EvalError::Expected { expected: "list", .. }));
    }

    #[test]
    fn deep_evaluation_leaves_no_applications() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sum = Term::apply_all(add(calls), [Term::value(1i64), Term::value(2i64)]);
        let list = Term::cons(sum, Term::nil());
        let deep = evaluate_deep(&list).unwrap();
        let (head, _) = split_list(&deep).unwrap().unwrap();
        assert!(head.is_value());
        assert!(split_list(&Term::nil()).unwrap().is_none());
    }
}
