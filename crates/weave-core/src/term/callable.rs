//! Partial applications.
//!
//! Every function-like term kind implements [`Callable`]. The evaluator never
//! mutates a callable it reached through a shared term: it calls
//! [`Callable::duplicate`] first and pushes the pending argument into the copy.

use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::term::{AbsentValue, Exception, Term};
use crate::ty::Type;

/// A function term with a fixed declared arity and an argument slot array.
pub trait Callable: Send + Sync {
    /// Name used in traces and error messages.
    fn name(&self) -> &str;

    /// Number of arguments still needed before the body can run.
    fn arity(&self) -> usize;

    /// Type of the callable with the already-pushed arguments removed.
    fn signature(&self) -> &Type;

    /// Arguments pushed so far, in order.
    fn arguments(&self) -> &[Term];

    /// Fill the next free slot.
    ///
    /// Fails with [`EvalError::TooManyArguments`] when every slot is taken.
    fn push_argument(&mut self, argument: Term) -> Result<(), EvalError>;

    /// Run the code body. Only called once [`arity`](Callable::arity) is zero.
    fn invoke_body(&self) -> Result<Term, EvalError>;

    /// Shallow copy sharing the pushed argument terms.
    fn duplicate(&self) -> Box<dyn Callable>;

    /// Shallow copy with the pushed arguments replaced.
    fn with_arguments(&self, arguments: Vec<Term>) -> Box<dyn Callable>;
}

impl fmt::Debug for dyn Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("signature", &self.signature().to_string())
            .finish()
    }
}

pub type NativeBody = Arc<dyn Fn(&[Term]) -> anyhow::Result<Term> + Send + Sync>;
pub type PartialBody = Arc<dyn Fn(&[Term]) -> anyhow::Result<Option<Term>> + Send + Sync>;

#[derive(Clone)]
enum Body {
    Total(NativeBody),
    Partial(PartialBody),
}

/// A [`Callable`] backed by a Rust closure over the argument slice.
///
/// The arity is taken from the signature: `int -> int -> int` is a two-slot
/// closure. Arguments reach the body unevaluated; the body forces what it
/// needs with [`evaluate`](crate::evaluate).
///
/// ```
/// use weave_core::{NativeClosure, Term, Type, Value, evaluate, evaluate_as};
///
/// let negate = NativeClosure::new("negate", Type::function([Type::int()], Type::int()), |args| {
///     let n: i64 = evaluate_as(&args[0])?;
///     Ok(Term::value(-n))
/// });
/// let term = Term::apply(Term::closure(negate), Term::value(5i64));
/// let result = evaluate(&term).unwrap();
/// assert_eq!(result.as_value(), Some(&Value::Int(-5)));
/// ```
#[derive(Clone)]
pub struct NativeClosure {
    name: Arc<str>,
    signature: Type,
    remaining: Type,
    arity: usize,
    slots: Vec<Term>,
    body: Body,
}

impl NativeClosure {
    /// `signature` must take at least one parameter. A body with no inputs
    /// is a plain term; see `Definition::native` in `weave-registry`.
    pub fn new<F>(name: impl Into<Arc<str>>, signature: Type, body: F) -> Self
    where
        F: Fn(&[Term]) -> anyhow::Result<Term> + Send + Sync + 'static,
    {
        Self::with_body(name.into(), signature, Body::Total(Arc::new(body)))
    }

    /// A closure whose body may produce no value. `None` is raised as an
    /// exception carrying [`AbsentValue`].
    pub fn partial<F>(name: impl Into<Arc<str>>, signature: Type, body: F) -> Self
    where
        F: Fn(&[Term]) -> anyhow::Result<Option<Term>> + Send + Sync + 'static,
    {
        Self::with_body(name.into(), signature, Body::Partial(Arc::new(body)))
    }

    fn with_body(name: Arc<str>, signature: Type, body: Body) -> Self {
        let arity = signature.arity();
        debug_assert!(arity > 0, "native closure '{name}' needs at least one parameter");
        Self {
            name,
            remaining: signature.clone(),
            signature,
            arity,
            slots: Vec::with_capacity(arity),
            body,
        }
    }

    /// Declared arity, independent of how many arguments were pushed.
    pub fn declared_arity(&self) -> usize {
        self.arity
    }

    /// Full signature, independent of how many arguments were pushed.
    pub fn full_signature(&self) -> &Type {
        &self.signature
    }
}

impl Callable for NativeClosure {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity - self.slots.len()
    }

    fn signature(&self) -> &Type {
        &self.remaining
    }

    fn arguments(&self) -> &[Term] {
        &self.slots
    }

    fn push_argument(&mut self, argument: Term) -> Result<(), EvalError> {
        let Some((_, returns)) = self.remaining.as_arrow() else {
            return Err(EvalError::TooManyArguments {
                name: self.name.to_string(),
            });
        };
        if self.slots.len() == self.arity {
            return Err(EvalError::TooManyArguments {
                name: self.name.to_string(),
            });
        }
        self.remaining = returns.clone();
        self.slots.push(argument);
        Ok(())
    }

    fn invoke_body(&self) -> Result<Term, EvalError> {
        match &self.body {
            Body::Total(body) => body(&self.slots).map_err(EvalError::from_body),
            Body::Partial(body) => match body(&self.slots) {
                Ok(Some(term)) => Ok(term),
                Ok(None) => Err(EvalError::Raised(Exception::from_error(AbsentValue {
                    name: self.name.to_string(),
                }))),
                Err(e) => Err(EvalError::from_body(e)),
            },
        }
    }

    fn duplicate(&self) -> Box<dyn Callable> {
        Box::new(self.clone())
    }

    fn with_arguments(&self, arguments: Vec<Term>) -> Box<dyn Callable> {
        let remaining = self
            .signature
            .result_after(arguments.len())
            .cloned()
            .unwrap_or_else(|| self.remaining.clone());
        Box::new(Self {
            remaining,
            slots: arguments,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn add() -> NativeClosure {
        NativeClosure::new(
            "add",
            Type::function([Type::int(), Type::int()], Type::int()),
            |args| {
                let a = args[0].as_value().and_then(Value::as_int).unwrap_or(0);
                let b = args[1].as_value().and_then(Value::as_int).unwrap_or(0);
                Ok(Term::value(a + b))
            },
        )
    }

    #[test]
    fn arity_counts_down() {
        let mut c = add();
        assert_eq!(c.arity(), 2);
        c.push_argument(Term::value(1i64)).unwrap();
        assert_eq!(c.arity(), 1);
        assert_eq!(c.signature(), &Type::arrow(Type::int(), Type::int()));
        c.push_argument(Term::value(2i64)).unwrap();
        assert_eq!(c.arity(), 0);
        assert_eq!(c.signature(), &Type::int());
    }

    #[test]
    fn push_past_arity_fails() {
        let mut c = add();
        c.push_argument(Term::value(1i64)).unwrap();
        c.push_argument(Term::value(2i64)).unwrap();
        let err = c.push_argument(Term::value(3i64)).unwrap_err();
        assert!(matches!(err, EvalError::TooManyArguments { ref name } if name == "add"));
    }

    #[test]
    fn duplicate_leaves_original_untouched() {
        let mut original = add();
        original.push_argument(Term::value(1i64)).unwrap();
        let mut copy = original.duplicate();
        copy.push_argument(Term::value(2i64)).unwrap();
        assert_eq!(original.arity(), 1);
        assert_eq!(copy.arity(), 0);
        assert!(Term::ptr_eq(&original.arguments()[0], &copy.arguments()[0]));
    }

    #[test]
    fn body_runs_on_slots() {
        let mut c = add();
        c.push_argument(Term::value(40i64)).unwrap();
        c.push_argument(Term::value(2i64)).unwrap();
        let out = c.invoke_body().unwrap();
        assert_eq!(out.as_value(), Some(&Value::Int(42)));
    }

    #[test]
    fn absent_result_raises() {
        let mut c = NativeClosure::partial("find", Type::function([Type::int()], Type::int()), |_| {
            Ok(None)
        });
        c.push_argument(Term::value(0i64)).unwrap();
        let err = c.invoke_body().unwrap_err();
        let exception = err.exception().unwrap();
        assert_eq!(
            exception.payload::<AbsentValue>().map(|p| p.name.as_str()),
            Some("find")
        );
    }

    #[test]
    fn with_arguments_recomputes_signature() {
        let c = add();
        let filled = c.with_arguments(vec![Term::value(1i64)]);
        assert_eq!(filled.arity(), 1);
        assert_eq!(filled.signature(), &Type::arrow(Type::int(), Type::int()));
    }
}
