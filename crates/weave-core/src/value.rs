//! Boxed payloads carried by value terms.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ordered_float::OrderedFloat;

use crate::term::{Term, type_of};
use crate::ty::Type;

/// A primitive or structured payload.
///
/// List cells and tuple fields hold [`Term`]s, so aggregates stay lazy: a
/// `Cons` cell's head is only evaluated when somebody asks for it.
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(Arc<str>),
    Buffer(Arc<[u8]>),
    List(ListCell),
    Tuple(Arc<[Term]>),
    Native(NativeValue),
}

/// One cell of a lazy list.
#[derive(Clone)]
pub enum ListCell {
    Nil,
    Cons(Term, Term),
}

/// An opaque host object together with the name of its value type.
#[derive(Clone)]
pub struct NativeValue {
    type_name: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl NativeValue {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl Value {
    pub fn nil() -> Self {
        Value::List(ListCell::Nil)
    }

    pub fn cons(head: Term, tail: Term) -> Self {
        Value::List(ListCell::Cons(head, tail))
    }

    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// The structural type of this payload.
    ///
    /// The empty list is `[?]` with a fresh element variable; a cons cell takes
    /// its element type from the head term without evaluating it.
    pub fn ty(&self) -> Type {
        match self {
            Value::Unit => Type::unit(),
            Value::Bool(_) => Type::bool(),
            Value::Int(_) => Type::int(),
            Value::Float(_) => Type::float(),
            Value::String(_) => Type::string(),
            Value::Buffer(_) => Type::value(crate::ty::primitives::BUFFER),
            Value::List(ListCell::Nil) => Type::list(Type::fresh()),
            Value::List(ListCell::Cons(head, _)) => Type::list(type_of(head)),
            Value::Tuple(_) => Type::value(crate::ty::primitives::TUPLE),
            Value::Native(native) => Type::value(native.type_name()),
        }
    }

    /// Short kind name used in diagnostics and conversion errors.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Buffer(_) => "buffer",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Native(native) => native.type_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListCell> {
        match self {
            Value::List(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(ListCell::Nil))
    }
}

/// Primitives compare by content. Lists, tuples and native objects compare
/// by identity of the terms or objects they hold.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            (Value::List(ListCell::Nil), Value::List(ListCell::Nil)) => true,
            (Value::List(ListCell::Cons(h1, t1)), Value::List(ListCell::Cons(h2, t2))) => {
                Term::ptr_eq(h1, h2) && Term::ptr_eq(t1, t2)
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| Term::ptr_eq(x, y))
            }
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(&a.value, &b.value),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(v) => write!(f, "Float({})", v.0),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Buffer(b) => write!(f, "Buffer({} bytes)", b.len()),
            Value::List(ListCell::Nil) => write!(f, "Nil"),
            Value::List(ListCell::Cons(h, t)) => write!(f, "Cons({h}, {t})"),
            Value::Tuple(items) => write!(f, "Tuple({} fields)", items.len()),
            Value::Native(n) => write!(f, "Native({})", n.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{}", v.0),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Buffer(b) => write!(f, "<buffer {}>", b.len()),
            Value::List(ListCell::Nil) => write!(f, "[]"),
            Value::List(ListCell::Cons(h, t)) => write!(f, "({h} :: {t})"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Native(n) => write!(f, "<{}>", n.type_name()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}
