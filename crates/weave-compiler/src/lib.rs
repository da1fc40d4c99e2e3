//! Overload resolution and compilation of weave node graphs.
//!
//! [`compile`] runs the standard [`Pipeline`]:
//!
//! 1. [`ResolveStage`]: pick one definition per reachable output socket and
//!    build the term graph, collecting diagnostics into a [`ParseResult`]
//! 2. [`InterfaceCheckStage`]: compare the root output types with the
//!    declared interface
//! 3. [`ExecutableStage`]: abstract the outputs over the root inputs
//!
//! Resolution problems never abort the walk. One run reports every
//! reachable problem, and a graph with errors yields no executable.

pub mod error;
pub mod executable;
pub mod options;
pub mod overload;
pub mod parse_result;
pub mod pipeline;
pub mod resolver;
pub mod stages;

pub use error::{RunError, StageError};
pub use executable::{Executable, ExecutableInput, ExecutableOutput};
pub use options::{CompileOptions, ResolverOptions};
pub use parse_result::{ParseResult, Selection};
pub use pipeline::{
    FnStage, Pipeline, PipelineContext, PipelineOutcome, SideChannel, Slot, Stage, stage_fn,
};
pub use resolver::{
    ContextId, Resolution, Resolved, ResolvedOutput, Resolver, RootInput, resolve_graph,
};
pub use stages::{EXECUTABLE, ExecutableStage, InterfaceCheckStage, PARSE_RESULT, RESOLVED, ResolveStage};

use weave_graph::NodeGraph;
use weave_registry::Registry;

/// Everything one compilation produced.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub parse_result: ParseResult,
    /// Present only when every stage succeeded.
    pub executable: Option<Executable>,
    pub stages: Vec<&'static str>,
    pub errors: Vec<StageError>,
}

impl Compilation {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty() && self.executable.is_some()
    }
}

/// The resolve, interface check and executable stages in order.
pub fn standard_pipeline<'a>(
    graph: &'a NodeGraph,
    registry: &'a Registry,
    options: &'a CompileOptions,
) -> Pipeline<'a> {
    Pipeline::new(graph, registry, options)
        .and_then(ResolveStage)
        .and_then(InterfaceCheckStage)
        .and_then(ExecutableStage)
}

/// Compile `graph` with the standard pipeline.
pub fn compile(graph: &NodeGraph, registry: &Registry, options: &CompileOptions) -> Compilation {
    let mut outcome = standard_pipeline(graph, registry, options).finish();
    let executable = if outcome.ok {
        outcome.side.remove(EXECUTABLE)
    } else {
        None
    };
    Compilation {
        parse_result: outcome.side.remove(PARSE_RESULT).unwrap_or_default(),
        executable,
        stages: outcome.executed,
        errors: outcome.errors,
    }
}
