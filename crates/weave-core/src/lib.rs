//! Core types for the weave node compiler.
//!
//! This crate holds everything the resolver and the evaluator share:
//!
//! - [`Term`] and the [`Callable`] interface: reference-counted heap terms
//!   forming a DAG
//! - [`evaluate`]: lazy graph reduction with memoised applications
//! - [`Type`] with [`generalize`], [`specializable`] and [`unify`]
//! - [`Value`] payloads, [`Exception`] faults and [`EvalError`]
//! - [`Diagnostics`] produced by the resolver
//! - Identifiers: [`VarId`], [`TreeId`], [`NodeId`], [`SocketRef`],
//!   [`QualifiedName`], [`DefinitionHash`]
//!
//! # Example
//!
//! ```
//! use weave_core::{Term, Type, evaluate_as};
//!
//! let add = Term::native("add", Type::function([Type::int(), Type::int()], Type::int()), |args| {
//!     let a: i64 = evaluate_as(&args[0])?;
//!     let b: i64 = evaluate_as(&args[1])?;
//!     Ok(Term::value(a + b))
//! });
//! let sum = Term::apply_all(add, [Term::value(40i64), Term::value(2i64)]);
//! assert_eq!(evaluate_as::<i64>(&sum).unwrap(), 42);
//! ```

pub mod convert;
mod def_hash;
pub mod diagnostics;
pub mod error;
mod ids;
mod qualified_name;
pub mod runtime;
pub mod term;
pub mod ty;
pub mod value;

pub use convert::FromValue;
pub use def_hash::DefinitionHash;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{EvalError, RegistrationError, WeaveError};
pub use ids::{NodeId, SocketDirection, SocketRef, TreeId, VarId};
pub use qualified_name::QualifiedName;
pub use runtime::{collect_list, evaluate, evaluate_as, evaluate_deep, evaluate_value, split_list};
pub use term::{
    AbsentValue, Apply, Callable, Exception, FreeVar, Lambda, NativeClosure, Term, TermNode,
    TermTag, type_of,
};
pub use ty::unify::{
    Substitution, generalize, instantiate, matching, more_general, normalize, specializable,
    unify, unify_into,
};
pub use ty::{Type, TypeVar, ValueType};
pub use value::{ListCell, NativeValue, Value};
