//! Context - Top-level entry point for compiling node graphs.
//!
//! The Context owns module installation and registry sealing.
//!
//! # Lifecycle
//!
//! 1. Create a context with [`Context::new`] or [`Context::with_default_modules`]
//! 2. Install additional modules with [`Context::install`]
//! 3. Seal the context with [`Context::seal`] to freeze the registry
//! 4. Compile graphs with [`Context::compile`] or hand them to a [`CompileService`]
//!
//! # Example
//!
//! ```
//! use weave::Context;
//! use weave_graph::NodeGraph;
//!
//! let mut ctx = Context::with_default_modules().unwrap();
//! let registry = ctx.seal();
//! assert!(registry.contains_declaration(&"list::cons".into()));
//!
//! // An empty interface compiles to an executable with no outputs.
//! let compilation = ctx.compile(&NodeGraph::new()).unwrap();
//! assert!(compilation.succeeded());
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use weave_compiler::{Compilation, CompileOptions, compile};
use weave_core::RegistrationError;
use weave_graph::NodeGraph;
use weave_registry::{Module, Registry};

use crate::service::{CompileService, ServiceError, ServiceOptions};

/// Errors raised by [`Context`] operations.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Modules cannot be installed after the registry is sealed.
    #[error("context is already sealed")]
    AlreadySealed,

    /// Compilation needs a sealed registry.
    #[error("context is not sealed; call seal() first")]
    NotSealed,

    /// A module failed to register.
    #[error("module registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Owns the registry that every compilation resolves against.
#[derive(Debug)]
pub struct Context {
    /// Namespaces of installed modules, in install order.
    namespaces: Vec<String>,
    /// Registry under construction. `None` once sealed.
    builder: Option<Registry>,
    /// Frozen registry. `Some` once sealed.
    registry: Option<Arc<Registry>>,
    options: CompileOptions,
}

impl Context {
    /// Create a context with an empty registry.
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            builder: Some(Registry::new()),
            registry: None,
            options: CompileOptions::default(),
        }
    }

    /// Create a context with the list, math and constant modules installed.
    ///
    /// The context is NOT sealed; more modules can still be installed.
    ///
    /// # Errors
    ///
    /// Returns an error if a default module fails to register.
    pub fn with_default_modules() -> Result<Self, ContextError> {
        let mut ctx = Self::new();
        for module in weave_modules::default_modules() {
            ctx.install(module)?;
        }
        Ok(ctx)
    }

    /// Use `options` for every later compilation.
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Register a module's declarations and definitions.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::AlreadySealed`] after [`seal`](Self::seal),
    /// or the registration error if the module conflicts with what is
    /// already installed.
    pub fn install(&mut self, module: Module) -> Result<(), ContextError> {
        let builder = self.builder.as_mut().ok_or(ContextError::AlreadySealed)?;
        let namespace = module.namespace_string();
        module.install_into(builder)?;
        debug!(namespace = %namespace, "installed module");
        self.namespaces.push(namespace);
        Ok(())
    }

    /// Freeze the registry and return a shared handle to it.
    ///
    /// Sealing twice returns the same registry.
    pub fn seal(&mut self) -> Arc<Registry> {
        if let Some(registry) = &self.registry {
            return Arc::clone(registry);
        }
        let registry = Arc::new(self.builder.take().unwrap_or_default());
        debug!(
            declarations = registry.declaration_count(),
            definitions = registry.definition_count(),
            "sealed registry"
        );
        self.registry = Some(Arc::clone(&registry));
        registry
    }

    pub fn is_sealed(&self) -> bool {
        self.registry.is_some()
    }

    /// The sealed registry, or `None` before [`seal`](Self::seal).
    pub fn registry(&self) -> Option<&Arc<Registry>> {
        self.registry.as_ref()
    }

    /// Namespaces of installed modules. The root namespace shows as `""`.
    pub fn modules(&self) -> &[String] {
        &self.namespaces
    }

    pub fn module_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Run the standard pipeline over `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotSealed`] before [`seal`](Self::seal).
    /// Resolution problems are not errors; they are reported in the
    /// returned compilation's parse result.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, graph: &NodeGraph) -> Result<Compilation, ContextError> {
        let registry = self.registry.as_ref().ok_or(ContextError::NotSealed)?;
        Ok(compile(graph, registry, &self.options))
    }

    /// Start a compile service that owns `graph` as its live graph.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotSealed`] before [`seal`](Self::seal), or
    /// a service error if the worker thread cannot be spawned.
    pub fn service(&self, graph: NodeGraph) -> Result<CompileService, ContextError> {
        let registry = self.registry.clone().ok_or(ContextError::NotSealed)?;
        let options = ServiceOptions::default().with_compile_options(self.options.clone());
        Ok(CompileService::spawn(registry, graph, options)?)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
