//! Socket layouts of node kinds.

use std::fmt;
use std::sync::Arc;

use weave_core::{QualifiedName, Term};

/// Produces the term used for an unconnected input.
pub type DefaultSupplier = Arc<dyn Fn() -> Term + Send + Sync>;

/// One named input socket.
#[derive(Clone)]
pub struct InputDecl {
    pub name: String,
    pub default: Option<DefaultSupplier>,
}

impl InputDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default<F>(name: impl Into<String>, supplier: F) -> Self
    where
        F: Fn() -> Term + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            default: Some(Arc::new(supplier)),
        }
    }

    /// A fresh default term, if the input has one.
    pub fn default_term(&self) -> Option<Term> {
        self.default.as_ref().map(|supply| supply())
    }
}

impl fmt::Debug for InputDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputDecl")
            .field("name", &self.name)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// The socket layout shared by every definition of one node name.
///
/// ```
/// use weave_core::Term;
/// use weave_registry::Declaration;
///
/// let clamp = Declaration::new("clamp")
///     .input("value")
///     .input_with_default("max", || Term::value(1.0))
///     .output("result");
/// assert_eq!(clamp.input_count(), 2);
/// assert!(clamp.inputs[1].default.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: QualifiedName,
    pub inputs: Vec<InputDecl>,
    pub outputs: Vec<String>,
    pub description: String,
}

impl Declaration {
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            description: String::new(),
        }
    }

    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(InputDecl::new(name));
        self
    }

    pub fn input_with_default<F>(mut self, name: impl Into<String>, supplier: F) -> Self
    where
        F: Fn() -> Term + Send + Sync + 'static,
    {
        self.inputs.push(InputDecl::with_default(name, supplier));
        self
    }

    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.name.as_str())
    }

    /// Move a global name into `namespace`. Already qualified names are kept.
    pub(crate) fn qualify(mut self, namespace: &[String]) -> Self {
        if self.name.is_global() && !namespace.is_empty() {
            self.name.namespace = namespace.to_vec();
        }
        self
    }
}
