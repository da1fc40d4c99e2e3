//! Structural types used to describe and rank node implementations.
//!
//! A [`Type`] is one of four shapes:
//!
//! - **value** - a named atomic type (`int`, `float`, `image`, ...)
//! - **arrow** - `captured -> returns`, curried for multi-argument functions
//! - **variable** - a unification placeholder
//! - **list** - `[element]`
//!
//! Types are immutable, cheap to clone and compared structurally. The
//! algorithms over them live in [`unify`].
//!
//! # Examples
//!
//! ```
//! use weave_core::Type;
//!
//! // a -> [a] -> [a]
//! let a = Type::var(0);
//! let cons = Type::function([a.clone(), Type::list(a.clone())], Type::list(a));
//! assert_eq!(cons.arity(), 2);
//! assert_eq!(cons.to_string(), "a -> [a] -> [a]");
//! ```

pub mod unify;

use std::fmt;
use std::sync::Arc;

use crate::VarId;

/// Well-known value type names.
pub mod primitives {
    pub const UNIT: &str = "unit";
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const STRING: &str = "string";
    pub const BUFFER: &str = "buffer";
    pub const TUPLE: &str = "tuple";
}

/// Name of an atomic value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueType(Arc<str>);

impl ValueType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A type variable.
///
/// `Named` variables are written by module authors (`a`, `b`, ...) and only
/// make sense inside one signature. `Fresh` variables are minted during
/// resolution and are unique for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeVar {
    Named(u32),
    Fresh(VarId),
}

impl TypeVar {
    pub fn fresh() -> Self {
        TypeVar::Fresh(VarId::fresh())
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeVar::Named(n) if *n < 26 => write!(f, "{}", (b'a' + *n as u8) as char),
            TypeVar::Named(n) => write!(f, "t{n}"),
            TypeVar::Fresh(id) => write!(f, "?{}", id.index()),
        }
    }
}

/// A structural type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Value(ValueType),
    Arrow(Arc<Type>, Arc<Type>),
    Variable(TypeVar),
    List(Arc<Type>),
}

impl Type {
    pub fn value(name: impl Into<Arc<str>>) -> Self {
        Type::Value(ValueType::new(name))
    }

    pub fn unit() -> Self {
        Self::value(primitives::UNIT)
    }

    pub fn bool() -> Self {
        Self::value(primitives::BOOL)
    }

    pub fn int() -> Self {
        Self::value(primitives::INT)
    }

    pub fn float() -> Self {
        Self::value(primitives::FLOAT)
    }

    pub fn string() -> Self {
        Self::value(primitives::STRING)
    }

    pub fn arrow(captured: Type, returns: Type) -> Self {
        Type::Arrow(Arc::new(captured), Arc::new(returns))
    }

    /// Curried function type `p0 -> p1 -> ... -> ret`.
    pub fn function(params: impl IntoIterator<Item = Type>, ret: Type) -> Self {
        let params: Vec<Type> = params.into_iter().collect();
        params
            .into_iter()
            .rev()
            .fold(ret, |acc, param| Type::arrow(param, acc))
    }

    pub fn list(element: Type) -> Self {
        Type::List(Arc::new(element))
    }

    /// A signature-local variable, displayed as `a`, `b`, ...
    pub fn var(index: u32) -> Self {
        Type::Variable(TypeVar::Named(index))
    }

    /// A process-unique variable.
    pub fn fresh() -> Self {
        Type::Variable(TypeVar::fresh())
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self, Type::Arrow(..))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Type::Variable(_))
    }

    pub fn as_arrow(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::Arrow(captured, returns) => Some((captured.as_ref(), returns.as_ref())),
            _ => None,
        }
    }

    /// Number of arrows along the return spine.
    pub fn arity(&self) -> usize {
        let mut arity = 0;
        let mut current = self;
        while let Type::Arrow(_, returns) = current {
            arity += 1;
            current = returns.as_ref();
        }
        arity
    }

    /// Split into parameter types and the final result type.
    pub fn uncurry(&self) -> (Vec<&Type>, &Type) {
        let mut params = Vec::new();
        let mut current = self;
        while let Type::Arrow(captured, returns) = current {
            params.push(captured.as_ref());
            current = returns.as_ref();
        }
        (params, current)
    }

    /// The type left after `count` arguments have been supplied.
    pub fn result_after(&self, count: usize) -> Option<&Type> {
        let mut current = self;
        for _ in 0..count {
            current = current.as_arrow()?.1;
        }
        Some(current)
    }

    /// `true` when the type contains no variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Type::Value(_) => true,
            Type::Variable(_) => false,
            Type::Arrow(a, b) => a.is_ground() && b.is_ground(),
            Type::List(e) => e.is_ground(),
        }
    }

    pub fn contains_var(&self, var: TypeVar) -> bool {
        match self {
            Type::Value(_) => false,
            Type::Variable(v) => *v == var,
            Type::Arrow(a, b) => a.contains_var(var) || b.contains_var(var),
            Type::List(e) => e.contains_var(var),
        }
    }

    /// Variables in order of first appearance, without duplicates.
    pub fn free_vars(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<TypeVar>) {
        match self {
            Type::Value(_) => {}
            Type::Variable(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Type::Arrow(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Type::List(e) => e.collect_vars(out),
        }
    }

    /// Rebuild the type, replacing each variable with `f(var)`.
    pub fn map_vars(&self, f: &mut impl FnMut(TypeVar) -> Type) -> Type {
        match self {
            Type::Value(_) => self.clone(),
            Type::Variable(v) => f(*v),
            Type::Arrow(a, b) => {
                let a = a.map_vars(f);
                let b = b.map_vars(f);
                Type::arrow(a, b)
            }
            Type::List(e) => Type::list(e.map_vars(f)),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Value(v) => write!(f, "{}", v.name()),
            Type::Variable(v) => write!(f, "{v}"),
            Type::List(e) => write!(f, "[{e}]"),
            Type::Arrow(a, b) if a.is_arrow() => write!(f, "({a}) -> {b}"),
            Type::Arrow(a, b) => write!(f, "{a} -> {b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_is_curried() {
        let t = Type::function([Type::int(), Type::float()], Type::string());
        assert_eq!(
            t,
            Type::arrow(Type::int(), Type::arrow(Type::float(), Type::string()))
        );
        assert_eq!(t.arity(), 2);
        let (params, ret) = t.uncurry();
        assert_eq!(params, vec![&Type::int(), &Type::float()]);
        assert_eq!(ret, &Type::string());
    }

    #[test]
    fn function_without_params_is_result() {
        assert_eq!(Type::function([], Type::int()), Type::int());
        assert_eq!(Type::int().arity(), 0);
    }

    #[test]
    fn display_parenthesises_arrow_arguments() {
        let map = Type::function(
            [
                Type::arrow(Type::var(0), Type::var(1)),
                Type::list(Type::var(0)),
            ],
            Type::list(Type::var(1)),
        );
        assert_eq!(map.to_string(), "(a -> b) -> [a] -> [b]");
    }

    #[test]
    fn groundness() {
        assert!(Type::list(Type::int()).is_ground());
        assert!(!Type::list(Type::var(0)).is_ground());
        assert!(!Type::arrow(Type::int(), Type::fresh()).is_ground());
    }

    #[test]
    fn free_vars_in_appearance_order() {
        let t = Type::function([Type::var(1), Type::var(0)], Type::var(1));
        assert_eq!(t.free_vars(), vec![TypeVar::Named(1), TypeVar::Named(0)]);
    }

    #[test]
    fn result_after_arguments() {
        let t = Type::function([Type::int(), Type::int()], Type::bool());
        assert_eq!(t.result_after(1), Some(&Type::arrow(Type::int(), Type::bool())));
        assert_eq!(t.result_after(2), Some(&Type::bool()));
        assert_eq!(t.result_after(3), None);
    }
}
