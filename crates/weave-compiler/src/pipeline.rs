//! Ordered compilation stages sharing a success flag and typed side data.
//!
//! ```
//! use weave_compiler::{CompileOptions, Pipeline, Slot, stage_fn};
//! use weave_graph::NodeGraph;
//! use weave_registry::Registry;
//!
//! const COUNT: Slot<usize> = Slot::new("count");
//!
//! let graph = NodeGraph::new();
//! let registry = Registry::new();
//! let options = CompileOptions::default();
//! let outcome = Pipeline::new(&graph, &registry, &options)
//!     .and_then(stage_fn("count", |cx| {
//!         let nodes = cx.graph.nodes(weave_core::TreeId::ROOT).count();
//!         cx.side.insert(COUNT, nodes);
//!         Ok(())
//!     }))
//!     .finish();
//! assert!(outcome.ok);
//! assert_eq!(outcome.side.get(COUNT), Some(&2));
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use tracing::{debug, debug_span};
use weave_graph::NodeGraph;
use weave_registry::Registry;

use crate::error::StageError;
use crate::options::CompileOptions;

/// Typed key into a [`SideChannel`].
pub struct Slot<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Slot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.name)
    }
}

/// One value per slot, last writer wins.
#[derive(Default)]
pub struct SideChannel {
    values: FxHashMap<&'static str, Box<dyn Any + Send>>,
}

impl SideChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the previous value of the slot.
    pub fn insert<T: Any + Send>(&mut self, slot: Slot<T>, value: T) -> Option<T> {
        let previous = self.values.insert(slot.name, Box::new(value))?;
        previous.downcast::<T>().ok().map(|b| *b)
    }

    pub fn get<T: Any>(&self, slot: Slot<T>) -> Option<&T> {
        self.values.get(slot.name)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, slot: Slot<T>) -> Option<&mut T> {
        self.values.get_mut(slot.name)?.downcast_mut()
    }

    pub fn remove<T: Any>(&mut self, slot: Slot<T>) -> Option<T> {
        let value = self.values.remove(slot.name)?;
        value.downcast::<T>().ok().map(|b| *b)
    }

    pub fn contains<T: Any>(&self, slot: Slot<T>) -> bool {
        self.get(slot).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SideChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_set().entries(keys).finish()
    }
}

/// What a stage sees.
pub struct PipelineContext<'a> {
    pub graph: &'a NodeGraph,
    pub registry: &'a Registry,
    pub options: &'a CompileOptions,
    pub side: SideChannel,
}

/// A named compilation step.
pub trait Stage {
    fn name(&self) -> &'static str;

    fn run(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError>;
}

/// A stage built from a closure, see [`stage_fn`].
pub struct FnStage<F> {
    name: &'static str,
    run: F,
}

pub fn stage_fn<F>(name: &'static str, run: F) -> FnStage<F>
where
    F: Fn(&mut PipelineContext<'_>) -> Result<(), StageError>,
{
    FnStage { name, run }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&mut PipelineContext<'_>) -> Result<(), StageError>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        (self.run)(cx)
    }
}

/// Result of running a pipeline to the end.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub ok: bool,
    pub side: SideChannel,
    pub executed: Vec<&'static str>,
    pub errors: Vec<StageError>,
}

/// A sequence of stages over one graph snapshot.
///
/// The flag starts out successful and turns to failure the first time a
/// stage returns an error. It never turns back.
pub struct Pipeline<'a> {
    cx: PipelineContext<'a>,
    ok: bool,
    executed: Vec<&'static str>,
    errors: Vec<StageError>,
}

impl<'a> Pipeline<'a> {
    pub fn new(graph: &'a NodeGraph, registry: &'a Registry, options: &'a CompileOptions) -> Self {
        Self {
            cx: PipelineContext {
                graph,
                registry,
                options,
                side: SideChannel::new(),
            },
            ok: true,
            executed: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Run `stage` if every stage so far succeeded.
    pub fn and_then(mut self, stage: impl Stage) -> Self {
        if self.ok {
            self.run_stage(&stage);
        }
        self
    }

    /// Run `stage` only after a failure.
    pub fn or_else(mut self, stage: impl Stage) -> Self {
        if !self.ok {
            self.run_stage(&stage);
        }
        self
    }

    /// Run `stage` regardless of the flag.
    pub fn apply(mut self, stage: impl Stage) -> Self {
        self.run_stage(&stage);
        self
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run_stage(&mut self, stage: &dyn Stage) {
        let name = stage.name();
        let _span = debug_span!("stage", name).entered();
        self.executed.push(name);
        match stage.run(&mut self.cx) {
            Ok(()) => debug!(stage = name, "stage finished"),
            Err(error) => {
                debug!(stage = name, %error, "stage failed");
                self.ok = false;
                self.errors.push(error);
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn executed(&self) -> &[&'static str] {
        &self.executed
    }

    pub fn errors(&self) -> &[StageError] {
        &self.errors
    }

    pub fn side(&self) -> &SideChannel {
        &self.cx.side
    }

    pub fn side_mut(&mut self) -> &mut SideChannel {
        &mut self.cx.side
    }

    pub fn finish(self) -> PipelineOutcome {
        PipelineOutcome {
            ok: self.ok,
            side: self.cx.side,
            executed: self.executed,
            errors: self.errors,
        }
    }
}
