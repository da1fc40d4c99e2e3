//! Error types shared by the runtime and registration.

use thiserror::Error;

use crate::QualifiedName;
use crate::def_hash::DefinitionHash;
use crate::term::{Exception, TermTag};

/// Failure of one `evaluate` call.
///
/// `Raised` carries a runtime value fault and is recoverable by inspecting
/// the exception payload. Every other variant means the term graph was not
/// well-typed.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("bad fix: a {found} is not a function")]
    BadFix { found: TermTag },

    #[error("bad application: a {found} cannot be applied to an argument")]
    BadApplication { found: TermTag },

    #[error("too many arguments: '{name}' is already saturated")]
    TooManyArguments { name: String },

    #[error("expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Raised(#[from] Exception),
}

impl EvalError {
    /// Everything except a raised exception.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EvalError::Raised(_))
    }

    pub fn exception(&self) -> Option<&Exception> {
        match self {
            EvalError::Raised(e) => Some(e),
            _ => None,
        }
    }

    /// Convert the error returned by a native code body.
    ///
    /// Evaluation errors from nested `evaluate` calls pass through unchanged so
    /// a payload raised deep inside a body is still visible to the caller.
    pub fn from_body(error: anyhow::Error) -> Self {
        let error = match error.downcast::<EvalError>() {
            Ok(eval) => return eval,
            Err(other) => other,
        };
        match error.downcast::<Exception>() {
            Ok(exception) => EvalError::Raised(exception),
            Err(other) => EvalError::Raised(Exception::from_error(other)),
        }
    }
}

/// Errors raised while registering declarations and definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("declaration '{name}' is already registered")]
    DuplicateDeclaration { name: QualifiedName },

    #[error("definition for '{name}' has no declaration")]
    MissingDeclaration { name: QualifiedName },

    #[error("'{name}' has {outputs} output(s), definition targets output {output}")]
    OutputOutOfRange {
        name: QualifiedName,
        output: usize,
        outputs: usize,
    },

    #[error("definition of '{name}' output {output} takes {found} argument(s), declaration has {expected} input(s)")]
    ArityMismatch {
        name: QualifiedName,
        output: usize,
        expected: usize,
        found: usize,
    },

    #[error("definition {hash} of '{name}' is already registered")]
    DuplicateDefinition {
        name: QualifiedName,
        hash: DefinitionHash,
    },

    #[error("registry is sealed")]
    Sealed,
}

/// Umbrella error for callers that mix evaluation and registration.
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

pub type Result<T, E = WeaveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct Fire;

    #[test]
    fn body_error_becomes_exception() {
        let err = EvalError::from_body(anyhow::Error::new(Fire));
        let e = err.exception().unwrap();
        assert_eq!(e.message(), "disk on fire");
        assert!(e.is::<Fire>());
        assert!(!err.is_fatal());
    }

    #[test]
    fn nested_eval_error_passes_through() {
        let inner = EvalError::BadApplication {
            found: TermTag::Value,
        };
        let err = EvalError::from_body(anyhow::Error::new(inner));
        assert!(matches!(err, EvalError::BadApplication { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn raised_exception_keeps_payload() {
        let original = Exception::from_error(Fire);
        let err = EvalError::from_body(anyhow::Error::new(EvalError::Raised(original)));
        assert!(err.exception().is_some_and(|e| e.is::<Fire>()));
    }

    #[test]
    fn registration_messages() {
        let err = RegistrationError::OutputOutOfRange {
            name: QualifiedName::from("list::head"),
            output: 2,
            outputs: 1,
        };
        assert_eq!(
            err.to_string(),
            "'list::head' has 1 output(s), definition targets output 2"
        );
    }
}
