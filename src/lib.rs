//! Weave compiles visual node graphs into lazily evaluated term graphs.
//!
//! A [`Context`] collects modules of node declarations and definitions into
//! a registry. Compiling a [`NodeGraph`](weave_graph::NodeGraph) picks one
//! definition per reachable socket, reports every problem it meets as a
//! diagnostic, and yields an [`Executable`](weave_compiler::Executable)
//! whose outputs evaluate on demand. A [`CompileService`] does the same on a
//! worker thread for an editor that keeps changing its graph.
//!
//! # Crates
//!
//! - [`core`]: terms, types, the evaluator and diagnostics
//! - [`graph`]: the node graph being compiled
//! - [`registry`]: declarations, definitions and modules
//! - [`compiler`]: overload resolution and the compile pipeline
//! - [`modules`]: the list, math and constant vocabularies

pub mod context;
pub mod service;

pub use context::{Context, ContextError};
pub use service::{CompileService, Published, RequestTime, ServiceError, ServiceOptions};

pub use weave_compiler as compiler;
pub use weave_core as core;
pub use weave_graph as graph;
pub use weave_modules as modules;
pub use weave_registry as registry;

pub mod prelude {
    pub use crate::context::{Context, ContextError};
    pub use crate::service::{CompileService, Published, RequestTime, ServiceError, ServiceOptions};
    pub use weave_compiler::{
        Compilation, CompileOptions, Executable, ParseResult, ResolverOptions, RunError,
    };
    pub use weave_core::{
        Diagnostic, DiagnosticKind, EvalError, Exception, NodeId, Severity, SocketRef, Term,
        TreeId, Type, Value, evaluate, evaluate_as,
    };
    pub use weave_graph::{Interface, InterfaceSocket, NodeGraph};
    pub use weave_registry::{Declaration, Definition, Module, Registry};
}
