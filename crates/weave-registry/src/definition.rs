//! Candidate implementations of one output socket.

use std::fmt;
use std::sync::Arc;

use weave_core::{DefinitionHash, EvalError, Exception, NativeClosure, QualifiedName, Term, Type, Value};

/// Builds the instance term from the node's literal payload.
pub type InstanceGetter = Arc<dyn Fn(&[Value]) -> Result<Term, Exception> + Send + Sync>;

/// Computes a signature from the node's literal payload.
pub type SignatureFn = Arc<dyn Fn(&[Value]) -> Option<Type> + Send + Sync>;

/// The type of a definition: the curried inputs followed by the output.
#[derive(Clone)]
pub enum Signature {
    Fixed(Type),
    /// Depends on the literals, e.g. a constant node typed by its value.
    Derived(SignatureFn),
}

impl Signature {
    /// The concrete signature for a node with `literals`.
    pub fn resolve(&self, literals: &[Value]) -> Option<Type> {
        match self {
            Signature::Fixed(ty) => Some(ty.clone()),
            Signature::Derived(derive) => derive(literals),
        }
    }

    pub fn as_fixed(&self) -> Option<&Type> {
        match self {
            Signature::Fixed(ty) => Some(ty),
            Signature::Derived(_) => None,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Fixed(ty) => write!(f, "Fixed({ty})"),
            Signature::Derived(_) => write!(f, "Derived"),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Fixed(ty) => write!(f, "{ty}"),
            Signature::Derived(_) => write!(f, "<derived>"),
        }
    }
}

/// One candidate for `(name, output)`.
///
/// Registered once, looked up many times, never mutated afterwards.
#[derive(Clone)]
pub struct Definition {
    name: QualifiedName,
    output: usize,
    signature: Signature,
    instance: InstanceGetter,
    description: String,
    hash: DefinitionHash,
}

impl Definition {
    pub fn new<F>(name: impl Into<QualifiedName>, output: usize, signature: Type, instance: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Term, Exception> + Send + Sync + 'static,
    {
        Self::build(
            name.into(),
            output,
            Signature::Fixed(signature),
            Arc::new(instance),
            String::new(),
        )
    }

    /// A definition typed by its literals.
    pub fn derived<S, F>(name: impl Into<QualifiedName>, output: usize, signature: S, instance: F) -> Self
    where
        S: Fn(&[Value]) -> Option<Type> + Send + Sync + 'static,
        F: Fn(&[Value]) -> Result<Term, Exception> + Send + Sync + 'static,
    {
        Self::build(
            name.into(),
            output,
            Signature::Derived(Arc::new(signature)),
            Arc::new(instance),
            String::new(),
        )
    }

    /// A definition backed by a native closure over the node's inputs.
    ///
    /// The closure term is built once and shared by every node using it. A
    /// signature with no parameters has nothing to close over, so the body
    /// runs with no arguments each time the definition is instantiated.
    pub fn native<F>(name: impl Into<QualifiedName>, output: usize, signature: Type, body: F) -> Self
    where
        F: Fn(&[Term]) -> anyhow::Result<Term> + Send + Sync + 'static,
    {
        let name = name.into();
        if signature.arity() == 0 {
            return Self::new(name, output, signature, move |_| body(&[]).map_err(body_exception));
        }
        let closure = Term::closure(NativeClosure::new(name.to_string(), signature.clone(), body));
        Self::new(name, output, signature, move |_| Ok(closure.clone()))
    }

    /// A definition with no inputs producing `value`.
    pub fn constant(name: impl Into<QualifiedName>, output: usize, value: Value) -> Self {
        let ty = value.ty();
        let term = Term::value(value);
        Self::new(name, output, ty, move |_| Ok(term.clone()))
    }

    fn build(
        name: QualifiedName,
        output: usize,
        signature: Signature,
        instance: InstanceGetter,
        description: String,
    ) -> Self {
        let hash = Self::compute_hash(&name, output, &signature, &description);
        Self {
            name,
            output,
            signature,
            instance,
            description,
            hash,
        }
    }

    fn compute_hash(
        name: &QualifiedName,
        output: usize,
        signature: &Signature,
        description: &str,
    ) -> DefinitionHash {
        match signature {
            Signature::Fixed(ty) => DefinitionHash::new(name, output, &ty.to_string()),
            Signature::Derived(_) => {
                DefinitionHash::new(name, output, &format!("<derived>{description}"))
            }
        }
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        let Definition {
            name,
            output,
            signature,
            instance,
            ..
        } = self;
        Self::build(name, output, signature, instance, description.into())
    }

    pub(crate) fn qualify(self, namespace: &[String]) -> Self {
        if !self.name.is_global() || namespace.is_empty() {
            return self;
        }
        let name = QualifiedName::new(self.name.name.clone(), namespace.to_vec());
        Self::build(name, self.output, self.signature, self.instance, self.description)
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn output(&self) -> usize {
        self.output
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hash(&self) -> DefinitionHash {
        self.hash
    }

    /// Signature for a node carrying `literals`.
    pub fn signature_for(&self, literals: &[Value]) -> Option<Type> {
        self.signature.resolve(literals)
    }

    /// Instance term for a node carrying `literals`.
    pub fn instantiate(&self, literals: &[Value]) -> Result<Term, Exception> {
        (self.instance)(literals)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name.to_string())
            .field("output", &self.output)
            .field("signature", &self.signature)
            .field("hash", &self.hash)
            .finish()
    }
}

fn body_exception(error: anyhow::Error) -> Exception {
    match EvalError::from_body(error) {
        EvalError::Raised(exception) => exception,
        other => Exception::from_error(other),
    }
}
