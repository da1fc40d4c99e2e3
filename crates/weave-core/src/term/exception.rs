use std::fmt;
use std::sync::Arc;

/// A runtime value fault.
///
/// Carries a human-readable message and an optional opaque payload. Code that
/// wants to recover from a specific fault downcasts the payload instead of
/// matching on the message:
///
/// ```
/// use weave_core::Exception;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("division by zero")]
/// struct DivideByZero;
///
/// let e = Exception::from_error(DivideByZero);
/// assert!(e.payload::<DivideByZero>().is_some());
/// assert_eq!(e.message(), "division by zero");
/// ```
#[derive(Clone)]
pub struct Exception {
    message: Arc<str>,
    payload: Option<Arc<anyhow::Error>>,
}

impl Exception {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(message: impl Into<Arc<str>>, payload: impl Into<anyhow::Error>) -> Self {
        Self {
            message: message.into(),
            payload: Some(Arc::new(payload.into())),
        }
    }

    /// Use the error's display text as the message and the error itself as payload.
    pub fn from_error(error: impl Into<anyhow::Error>) -> Self {
        let error = error.into();
        Self {
            message: error.to_string().into(),
            payload: Some(Arc::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Downcast the payload to a concrete error type.
    pub fn payload<T>(&self) -> Option<&T>
    where
        T: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.payload.as_deref()?.downcast_ref::<T>()
    }

    pub fn is<T>(&self) -> bool
    where
        T: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.payload::<T>().is_some()
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Exception");
        s.field("message", &self.message);
        if let Some(payload) = &self.payload {
            s.field("payload", payload);
        }
        s.finish()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Exception {}

/// Payload of the exception raised when a code body yields no value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("'{name}' produced no value")]
pub struct AbsentValue {
    pub name: String,
}
