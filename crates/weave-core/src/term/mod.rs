//! The term model.
//!
//! A [`Term`] is a reference-counted handle to an immutable heap node. Terms
//! form a DAG: the resolver hands the same sub-term to every consumer of a
//! socket, and an [`Apply`] node that several parents share is reduced at most
//! once thanks to its write-once cache.
//!
//! The kind of a term is stored next to the pointer as a [`TermTag`], so
//! [`Term::is_exception`] is a field comparison and never touches the heap.
//!
//! Cloning a `Term` shares the node. [`Term::duplicate`] is the shallow
//! per-kind copy used when a closure must receive an argument without
//! disturbing other holders of the un-applied closure.

pub mod callable;
mod exception;
mod substitute;

use std::fmt;
use std::sync::{Arc, OnceLock};

pub use callable::{Callable, NativeClosure};
pub use exception::{AbsentValue, Exception};

use crate::VarId;
use crate::error::EvalError;
use crate::ty::Type;
use crate::ty::unify::{instantiate, unify};
use crate::value::{ListCell, Value};

/// Discriminant of a term, kept alongside the node pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermTag {
    Value,
    Apply,
    Closure,
    FreeVar,
    Lambda,
    Fix,
    Exception,
}

impl fmt::Display for TermTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermTag::Value => "value",
            TermTag::Apply => "application",
            TermTag::Closure => "closure",
            TermTag::FreeVar => "free variable",
            TermTag::Lambda => "lambda",
            TermTag::Fix => "fix",
            TermTag::Exception => "exception",
        };
        f.write_str(name)
    }
}

/// The heap node behind a [`Term`].
pub enum TermNode {
    Value(Value),
    Apply(Apply),
    Closure(Box<dyn Callable>),
    FreeVar(FreeVar),
    Lambda(Lambda),
    Fix(Term),
    Exception(Exception),
}

impl TermNode {
    fn tag(&self) -> TermTag {
        match self {
            TermNode::Value(_) => TermTag::Value,
            TermNode::Apply(_) => TermTag::Apply,
            TermNode::Closure(_) => TermTag::Closure,
            TermNode::FreeVar(_) => TermTag::FreeVar,
            TermNode::Lambda(_) => TermTag::Lambda,
            TermNode::Fix(_) => TermTag::Fix,
            TermNode::Exception(_) => TermTag::Exception,
        }
    }
}

/// A pending application of a function term to one argument.
pub struct Apply {
    function: Term,
    argument: Term,
    cache: OnceLock<Term>,
}

impl Apply {
    pub fn function(&self) -> &Term {
        &self.function
    }

    pub fn argument(&self) -> &Term {
        &self.argument
    }

    /// The reduced result, once this node has been evaluated.
    pub fn cached(&self) -> Option<&Term> {
        self.cache.get()
    }

    /// Write the cache. A second write keeps the first result.
    pub(crate) fn store(&self, result: Term) -> &Term {
        self.cache.get_or_init(|| result)
    }
}

/// A placeholder standing for a value supplied later.
#[derive(Debug, Clone)]
pub struct FreeVar {
    pub id: VarId,
    pub ty: Type,
}

/// Binds a free variable over a body term.
#[derive(Clone)]
pub struct Lambda {
    param: VarId,
    param_ty: Type,
    body: Term,
    ty: Type,
    argument: Option<Term>,
}

impl Lambda {
    pub fn new(param: VarId, param_ty: Type, body: Term) -> Self {
        let ty = Type::arrow(param_ty.clone(), type_of(&body));
        Self {
            param,
            param_ty,
            body,
            ty,
            argument: None,
        }
    }

    pub fn param(&self) -> VarId {
        self.param
    }

    pub fn param_ty(&self) -> &Type {
        &self.param_ty
    }

    pub fn body(&self) -> &Term {
        &self.body
    }
}

impl Callable for Lambda {
    fn name(&self) -> &str {
        "lambda"
    }

    fn arity(&self) -> usize {
        usize::from(self.argument.is_none())
    }

    fn signature(&self) -> &Type {
        match (&self.argument, self.ty.as_arrow()) {
            (Some(_), Some((_, returns))) => returns,
            _ => &self.ty,
        }
    }

    fn arguments(&self) -> &[Term] {
        self.argument.as_slice()
    }

    fn push_argument(&mut self, argument: Term) -> Result<(), EvalError> {
        if self.argument.is_some() {
            return Err(EvalError::TooManyArguments {
                name: "lambda".to_string(),
            });
        }
        self.argument = Some(argument);
        Ok(())
    }

    fn invoke_body(&self) -> Result<Term, EvalError> {
        match &self.argument {
            Some(argument) => Ok(substitute::substitute(&self.body, self.param, argument)),
            None => Err(EvalError::BadApplication {
                found: TermTag::Lambda,
            }),
        }
    }

    fn duplicate(&self) -> Box<dyn Callable> {
        Box::new(self.clone())
    }

    fn with_arguments(&self, arguments: Vec<Term>) -> Box<dyn Callable> {
        Box::new(Self {
            argument: arguments.into_iter().next(),
            ..self.clone()
        })
    }
}

/// Shared handle to a term node.
#[derive(Clone)]
pub struct Term {
    tag: TermTag,
    node: Arc<TermNode>,
}

impl Term {
    fn from_node(node: TermNode) -> Self {
        Self {
            tag: node.tag(),
            node: Arc::new(node),
        }
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::from_node(TermNode::Value(value.into()))
    }

    pub fn unit() -> Self {
        Self::value(Value::Unit)
    }

    pub fn nil() -> Self {
        Self::value(Value::nil())
    }

    pub fn cons(head: Term, tail: Term) -> Self {
        Self::value(Value::cons(head, tail))
    }

    pub fn apply(function: Term, argument: Term) -> Self {
        Self::from_node(TermNode::Apply(Apply {
            function,
            argument,
            cache: OnceLock::new(),
        }))
    }

    /// Left-nested application chain `((f a) b) ...`.
    pub fn apply_all(function: Term, arguments: impl IntoIterator<Item = Term>) -> Self {
        arguments.into_iter().fold(function, Term::apply)
    }

    pub fn closure(callable: impl Callable + 'static) -> Self {
        Self::closure_boxed(Box::new(callable))
    }

    pub fn closure_boxed(callable: Box<dyn Callable>) -> Self {
        Self::from_node(TermNode::Closure(callable))
    }

    /// Shorthand for a [`NativeClosure`] term.
    pub fn native<F>(name: &str, signature: Type, body: F) -> Self
    where
        F: Fn(&[Term]) -> anyhow::Result<Term> + Send + Sync + 'static,
    {
        Self::closure(NativeClosure::new(name, signature, body))
    }

    pub fn free_var(id: VarId, ty: Type) -> Self {
        Self::from_node(TermNode::FreeVar(FreeVar { id, ty }))
    }

    pub fn lambda(param: VarId, param_ty: Type, body: Term) -> Self {
        Self::from_node(TermNode::Lambda(Lambda::new(param, param_ty, body)))
    }

    /// Fixed point of `function`: evaluates as `function (fix function)`.
    pub fn fix(function: Term) -> Self {
        Self::from_node(TermNode::Fix(function))
    }

    pub fn exception(exception: Exception) -> Self {
        Self::from_node(TermNode::Exception(exception))
    }

    #[inline]
    pub fn tag(&self) -> TermTag {
        self.tag
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.tag == TermTag::Exception
    }

    #[inline]
    pub fn is_value(&self) -> bool {
        self.tag == TermTag::Value
    }

    pub fn node(&self) -> &TermNode {
        &self.node
    }

    pub fn as_value(&self) -> Option<&Value> {
        match &*self.node {
            TermNode::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_apply(&self) -> Option<&Apply> {
        match &*self.node {
            TermNode::Apply(a) => Some(a),
            _ => None,
        }
    }

    /// The term as a callable, for closures and lambdas.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match &*self.node {
            TermNode::Closure(c) => Some(c.as_ref()),
            TermNode::Lambda(l) => Some(l as &dyn Callable),
            _ => None,
        }
    }

    pub fn as_free_var(&self) -> Option<&FreeVar> {
        match &*self.node {
            TermNode::FreeVar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match &*self.node {
            TermNode::Lambda(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&Exception> {
        if !self.is_exception() {
            return None;
        }
        match &*self.node {
            TermNode::Exception(e) => Some(e),
            _ => None,
        }
    }

    /// `true` when both handles point at the same node.
    pub fn ptr_eq(a: &Term, b: &Term) -> bool {
        Arc::ptr_eq(&a.node, &b.node)
    }

    /// Number of handles sharing this node.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }

    /// Node address, usable as a key while the term is alive.
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.node) as *const () as usize
    }

    /// Shallow per-kind copy into a fresh node.
    ///
    /// Child terms stay shared. A copied application keeps any result already
    /// cached on the original.
    pub fn duplicate(&self) -> Term {
        let node = match &*self.node {
            TermNode::Value(v) => TermNode::Value(v.clone()),
            TermNode::Apply(app) => {
                let cache = OnceLock::new();
                if let Some(done) = app.cached() {
                    let _ = cache.set(done.clone());
                }
                TermNode::Apply(Apply {
                    function: app.function.clone(),
                    argument: app.argument.clone(),
                    cache,
                })
            }
            TermNode::Closure(c) => TermNode::Closure(c.duplicate()),
            TermNode::FreeVar(v) => TermNode::FreeVar(v.clone()),
            TermNode::Lambda(l) => TermNode::Lambda(l.clone()),
            TermNode::Fix(f) => TermNode::Fix(f.clone()),
            TermNode::Exception(e) => TermNode::Exception(e.clone()),
        };
        Term::from_node(node)
    }
}

/// Structural type of a term. Never evaluates anything.
///
/// An application's type is the function's return type specialised by the
/// argument: `([a] -> a) [int]` is `int`. Exceptions have a fresh type so
/// they fit wherever they are raised.
pub fn type_of(term: &Term) -> Type {
    match term.node() {
        TermNode::Value(v) => v.ty(),
        TermNode::Closure(c) => c.signature().clone(),
        TermNode::Lambda(l) => l.signature().clone(),
        TermNode::FreeVar(v) => v.ty.clone(),
        TermNode::Exception(_) => Type::fresh(),
        TermNode::Apply(app) => {
            // a cached result has a more precise type than the spine
            if let Some(done) = app.cached() {
                return type_of(done);
            }
            let function = instantiate(&type_of(&app.function));
            match function.as_arrow() {
                Some((param, returns)) => match unify(param, &type_of(&app.argument)) {
                    Some(subst) => subst.apply(returns),
                    None => returns.clone(),
                },
                None => Type::fresh(),
            }
        }
        TermNode::Fix(f) => match type_of(f).as_arrow() {
            Some((_, returns)) => returns.clone(),
            None => Type::fresh(),
        },
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            TermNode::Value(v) => write!(f, "{v}"),
            TermNode::Apply(app) => write!(f, "({} {})", app.function, app.argument),
            TermNode::Closure(c) if c.arguments().is_empty() => write!(f, "{}", c.name()),
            TermNode::Closure(c) => {
                write!(f, "({}", c.name())?;
                for arg in c.arguments() {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            TermNode::FreeVar(v) => write!(f, "{}", v.id),
            TermNode::Lambda(l) => write!(f, "(\\{}. {})", l.param, l.body),
            TermNode::Fix(func) => write!(f, "(fix {func})"),
            TermNode::Exception(e) => write!(f, "!{{{}}}", e.message()),
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term<{:?}>({self})", self.tag)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::value(value)
    }
}

impl From<Exception> for Term {
    fn from(exception: Exception) -> Self {
        Term::exception(exception)
    }
}

/// Head and tail of a cons cell.
pub(crate) fn uncons(term: &Term) -> Option<(&Term, &Term)> {
    match term.as_value() {
        Some(Value::List(ListCell::Cons(h, t))) => Some((h, t)),
        _ => None,
    }
}
