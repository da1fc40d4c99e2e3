//! Background compilation of a live node graph.
//!
//! The editor thread owns the live graph through a [`CompileService`]. Each
//! [`send`](CompileService::send) edits it, stamps the edit with a
//! [`RequestTime`] and hands a snapshot to one worker thread. The worker
//! compiles snapshots one at a time and publishes each result tagged with the
//! request time it answers. Snapshots that arrive while the worker is busy
//! replace each other, so only the newest is compiled.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, info_span, warn};
use weave_compiler::{Compilation, CompileOptions, Executable, ParseResult, compile};
use weave_graph::NodeGraph;
use weave_registry::Registry;

/// Errors raised by [`CompileService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to spawn compile worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread is gone, so no newer result will be published.
    #[error("compile worker has stopped")]
    WorkerStopped,

    #[error("request {requested} was never sent; latest request is {latest}")]
    NeverRequested {
        requested: RequestTime,
        latest: RequestTime,
    },
}

/// Logical time of a [`send`](CompileService::send). Strictly increasing per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestTime(u64);

impl RequestTime {
    /// Time of the initial, never-compiled state.
    pub const ZERO: RequestTime = RequestTime(0);

    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> RequestTime {
        RequestTime(self.0 + 1)
    }
}

impl fmt::Display for RequestTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Configuration for [`CompileService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Name of the worker thread.
    pub thread_name: String,
    pub options: CompileOptions,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            thread_name: "weave-compiler".to_string(),
            options: CompileOptions::default(),
        }
    }
}

impl ServiceOptions {
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }
}

/// The most recent result the worker published.
#[derive(Debug, Clone)]
pub struct Published {
    /// Request this result answers. [`RequestTime::ZERO`] before the first compile.
    pub request_time: RequestTime,
    /// When the worker finished compiling. `None` before the first compile.
    pub completion_time: Option<Instant>,
    /// Newest executable that compiled successfully, possibly from an
    /// earlier request than `request_time`.
    pub executable: Option<Arc<Executable>>,
    /// Diagnostics of the request at `request_time`.
    pub parse_result: Arc<ParseResult>,
    /// Whether the request at `request_time` compiled.
    pub succeeded: bool,
}

impl Published {
    fn initial() -> Self {
        Self {
            request_time: RequestTime::ZERO,
            completion_time: None,
            executable: None,
            parse_result: Arc::new(ParseResult::default()),
            succeeded: false,
        }
    }
}

// ============================================================================
// Shared state
// ============================================================================

struct State {
    /// Latest time handed out by `send`.
    requested: RequestTime,
    /// Newest snapshot the worker has not picked up yet.
    pending: Option<(RequestTime, NodeGraph)>,
    published: Published,
    shutdown: bool,
    worker_exited: bool,
}

struct Shared {
    state: Mutex<State>,
    /// Signalled when a request is pending or shutdown is requested.
    request_ready: Condvar,
    /// Signalled when a result is published or the worker exits.
    published: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the worker as exited however its loop ends, including by panic.
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.lock().worker_exited = true;
        self.0.published.notify_all();
    }
}

// ============================================================================
// Service
// ============================================================================

/// Owns a live graph and compiles snapshots of it on a worker thread.
///
/// # Example
///
/// ```
/// use weave::Context;
/// use weave_core::{TreeId, Value, evaluate_as};
/// use weave_graph::{Interface, InterfaceSocket, NodeGraph};
///
/// let mut ctx = Context::with_default_modules().unwrap();
/// let registry = ctx.seal();
/// let service = ctx.service(NodeGraph::new()).unwrap();
///
/// let time = service.send(|graph| {
///     graph
///         .set_interface(TreeId::ROOT, Interface::new().output(InterfaceSocket::new("out")))
///         .unwrap();
///     let decl = registry.declaration(&"constant::int".into()).unwrap();
///     let node = graph.add_operation(TreeId::ROOT, decl).unwrap();
///     graph.set_literals(node, vec![Value::Int(5)]).unwrap();
///     let sink = graph.group_output(TreeId::ROOT).unwrap();
///     graph.connect(node.output(0), sink.input(0)).unwrap();
/// });
///
/// let published = service.wait_update(time).unwrap();
/// assert!(published.succeeded);
/// let out = published.executable.unwrap().run_output(0, &[]).unwrap();
/// assert_eq!(evaluate_as::<i64>(&out).unwrap(), 5);
/// ```
pub struct CompileService {
    live: Mutex<NodeGraph>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CompileService {
    /// Start the worker thread. Nothing is compiled until the first `send`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Spawn`] if the thread cannot be created.
    pub fn spawn(
        registry: Arc<Registry>,
        graph: NodeGraph,
        options: ServiceOptions,
    ) -> Result<Self, ServiceError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                requested: RequestTime::ZERO,
                pending: None,
                published: Published::initial(),
                shutdown: false,
                worker_exited: false,
            }),
            request_ready: Condvar::new(),
            published: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let compile_options = options.options;
        let worker = thread::Builder::new()
            .name(options.thread_name.clone())
            .spawn(move || run_worker(worker_shared, registry, compile_options))?;
        debug!(thread = %options.thread_name, "compile service started");

        Ok(Self {
            live: Mutex::new(graph),
            shared,
            worker: Some(worker),
        })
    }

    /// Apply `mutator` to the live graph and queue a snapshot for compilation.
    ///
    /// Returns the request time to pass to [`wait_update`](Self::wait_update).
    pub fn send<F>(&self, mutator: F) -> RequestTime
    where
        F: FnOnce(&mut NodeGraph),
    {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        mutator(&mut live);
        let snapshot = live.snapshot();

        let mut state = self.shared.lock();
        let time = state.requested.next();
        state.requested = time;
        if let Some((replaced, _)) = state.pending.replace((time, snapshot)) {
            debug!(replaced = %replaced, request = %time, "coalesced pending request");
        }
        drop(state);
        drop(live);

        self.shared.request_ready.notify_one();
        time
    }

    /// Run `f` against the live graph without queueing a compile.
    pub fn with_graph<R>(&self, f: impl FnOnce(&NodeGraph) -> R) -> R {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        f(&live)
    }

    /// The latest published result.
    pub fn snapshot(&self) -> Published {
        self.shared.lock().published.clone()
    }

    /// Latest request time handed out by [`send`](Self::send).
    pub fn latest_request(&self) -> RequestTime {
        self.shared.lock().requested
    }

    /// Block until a result answering `min_request_time` or a newer request
    /// is published.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NeverRequested`] for a time no `send` has
    /// returned yet, and [`ServiceError::WorkerStopped`] if the worker exits
    /// before publishing a qualifying result.
    pub fn wait_update(&self, min_request_time: RequestTime) -> Result<Published, ServiceError> {
        let mut state = self.shared.lock();
        if min_request_time > state.requested {
            return Err(ServiceError::NeverRequested {
                requested: min_request_time,
                latest: state.requested,
            });
        }
        while state.published.request_time < min_request_time {
            if state.worker_exited {
                return Err(ServiceError::WorkerStopped);
            }
            state = self
                .shared
                .published
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Ok(state.published.clone())
    }

    /// Like [`wait_update`](Self::wait_update), giving up after `timeout`.
    ///
    /// Returns `Ok(None)` on timeout.
    pub fn wait_update_timeout(
        &self,
        min_request_time: RequestTime,
        timeout: Duration,
    ) -> Result<Option<Published>, ServiceError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        if min_request_time > state.requested {
            return Err(ServiceError::NeverRequested {
                requested: min_request_time,
                latest: state.requested,
            });
        }
        while state.published.request_time < min_request_time {
            if state.worker_exited {
                return Err(ServiceError::WorkerStopped);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            state = self
                .shared
                .published
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Ok(Some(state.published.clone()))
    }
}

impl Drop for CompileService {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.request_ready.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("compile worker panicked");
            }
        }
        debug!("compile service stopped");
    }
}

// ============================================================================
// Worker
// ============================================================================

fn run_worker(shared: Arc<Shared>, registry: Arc<Registry>, options: CompileOptions) {
    let _guard = ExitGuard(Arc::clone(&shared));
    while let Some((request_time, graph)) = next_request(&shared) {
        let span = info_span!("compile", request = %request_time);
        let _enter = span.enter();

        let compilation = compile(&graph, &registry, &options);
        let completion_time = Instant::now();
        publish(&shared, request_time, completion_time, compilation);
    }
}

/// Wait for a pending snapshot. `None` once shutdown is requested.
fn next_request(shared: &Shared) -> Option<(RequestTime, NodeGraph)> {
    let mut state = shared.lock();
    loop {
        if state.shutdown {
            return None;
        }
        if let Some(request) = state.pending.take() {
            return Some(request);
        }
        state = shared
            .request_ready
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

fn publish(
    shared: &Shared,
    request_time: RequestTime,
    completion_time: Instant,
    compilation: Compilation,
) {
    let mut state = shared.lock();
    if request_time <= state.published.request_time {
        debug!(published = %state.published.request_time, "discarding stale result");
        return;
    }

    let succeeded = compilation.succeeded();
    let executable = match compilation.executable {
        Some(executable) if succeeded => Some(Arc::new(executable)),
        _ => {
            warn!(
                errors = compilation.parse_result.errors().count(),
                "compilation failed; keeping previous executable"
            );
            state.published.executable.clone()
        }
    };

    state.published = Published {
        request_time,
        completion_time: Some(completion_time),
        executable,
        parse_result: Arc::new(compilation.parse_result),
        succeeded,
    };
    info!(succeeded, stages = compilation.stages.len(), "published compilation");
    drop(state);
    shared.published.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::{DiagnosticKind, NodeId, TreeId, Value, evaluate_as};
    use weave_graph::{Interface, InterfaceSocket};

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::new();
        for module in weave_modules::default_modules() {
            module.install_into(&mut registry).unwrap();
        }
        Arc::new(registry)
    }

    fn with_output() -> NodeGraph {
        let mut graph = NodeGraph::new();
        graph
            .set_interface(TreeId::ROOT, Interface::new().output(InterfaceSocket::new("out")))
            .unwrap();
        graph
    }

    fn add_op(graph: &mut NodeGraph, registry: &Registry, name: &str) -> NodeId {
        let decl = registry.declaration(&name.into()).unwrap();
        graph.add_operation(TreeId::ROOT, decl).unwrap()
    }

    /// Connect a `constant::int` holding `n` to the root output.
    fn set_constant(graph: &mut NodeGraph, registry: &Registry, n: i64) {
        let node = add_op(graph, registry, "constant::int");
        graph.set_literals(node, vec![Value::Int(n)]).unwrap();
        let sink = graph.group_output(TreeId::ROOT).unwrap();
        graph.connect(node.output(0), sink.input(0)).unwrap();
    }

    fn run(published: &Published) -> i64 {
        let exe = published.executable.as_ref().unwrap();
        evaluate_as::<i64>(&exe.run_output(0, &[]).unwrap()).unwrap()
    }

    #[test]
    fn nothing_published_before_first_send() {
        let service = CompileService::spawn(registry(), with_output(), ServiceOptions::default()).unwrap();
        let published = service.snapshot();
        assert_eq!(published.request_time, RequestTime::ZERO);
        assert!(published.executable.is_none());
        assert!(published.completion_time.is_none());
        assert!(!published.succeeded);
    }

    #[test]
    fn send_then_wait_publishes_result() {
        let registry = registry();
        let service =
            CompileService::spawn(Arc::clone(&registry), with_output(), ServiceOptions::default()).unwrap();
        let time = service.send(|graph| set_constant(graph, &registry, 9));
        assert_eq!(time.get(), 1);

        let published = service.wait_update(time).unwrap();
        assert!(published.request_time >= time);
        assert!(published.succeeded);
        assert!(published.completion_time.is_some());
        assert_eq!(run(&published), 9);
    }

    #[test]
    fn failed_compile_keeps_previous_executable() {
        let registry = registry();
        let service =
            CompileService::spawn(Arc::clone(&registry), with_output(), ServiceOptions::default()).unwrap();
        let good = service.send(|graph| set_constant(graph, &registry, 3));
        assert!(service.wait_update(good).unwrap().succeeded);

        // A head with nothing connected cannot resolve.
        let bad = service.send(|graph| {
            let head = add_op(graph, &registry, "list::head");
            let sink = graph.group_output(TreeId::ROOT).unwrap();
            graph.connect(head.output(0), sink.input(0)).unwrap();
        });
        let published = service.wait_update(bad).unwrap();
        assert_eq!(published.request_time, bad);
        assert!(!published.succeeded);
        assert!(published.parse_result.has_error());
        assert!(
            published
                .parse_result
                .errors()
                .any(|d| d.kind == DiagnosticKind::InsufficientInput)
        );
        assert_eq!(run(&published), 3);
    }

    #[test]
    fn newest_request_wins() {
        let registry = registry();
        let service =
            CompileService::spawn(Arc::clone(&registry), with_output(), ServiceOptions::default()).unwrap();
        let mut last = RequestTime::ZERO;
        for n in 0..10 {
            last = service.send(|graph| set_constant(graph, &registry, n));
        }
        assert_eq!(service.latest_request(), last);

        let published = service.wait_update(last).unwrap();
        assert_eq!(published.request_time, last);
        assert_eq!(run(&published), 9);
    }

    #[test]
    fn edits_reach_the_live_graph() {
        let registry = registry();
        let service =
            CompileService::spawn(Arc::clone(&registry), with_output(), ServiceOptions::default()).unwrap();
        let before = service.with_graph(|graph| graph.nodes(TreeId::ROOT).count());
        service.send(|graph| set_constant(graph, &registry, 1));
        let after = service.with_graph(|graph| graph.nodes(TreeId::ROOT).count());
        assert_eq!(after, before + 1);
    }

    #[test]
    fn waiting_for_unsent_request_fails() {
        let service = CompileService::spawn(registry(), with_output(), ServiceOptions::default()).unwrap();
        let future = RequestTime::ZERO.next();
        assert!(matches!(
            service.wait_update(future),
            Err(ServiceError::NeverRequested { .. })
        ));
        assert!(matches!(
            service.wait_update_timeout(future, Duration::from_millis(1)),
            Err(ServiceError::NeverRequested { .. })
        ));
    }

    #[test]
    fn zero_is_already_published() {
        let service = CompileService::spawn(registry(), with_output(), ServiceOptions::default()).unwrap();
        let published = service
            .wait_update_timeout(RequestTime::ZERO, Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert_eq!(published.request_time, RequestTime::ZERO);
    }

    #[test]
    fn drop_stops_worker_with_pending_request() {
        let registry = registry();
        let options = ServiceOptions::default().with_thread_name("graph-worker");
        assert_eq!(options.thread_name, "graph-worker");
        let service = CompileService::spawn(Arc::clone(&registry), with_output(), options).unwrap();
        service.send(|graph| set_constant(graph, &registry, 2));
        drop(service);
    }
}
