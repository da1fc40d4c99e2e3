//! Type-directed resolution of a node graph into terms.
//!
//! Resolution is demand driven. Starting from each root interface output,
//! the resolver asks for the term behind an output socket together with the
//! type its consumer wants. Operation nodes pick one of their registered
//! definitions (see [`crate::overload`]) and recurse into their inputs with
//! the chosen parameter types. Group nodes are inlined: entering a group
//! follows the inner tree's group output, and a group input inside it leaves
//! back to the group node in the enclosing tree.
//!
//! Every `(context, node, output)` is resolved at most once. The memoised
//! term is handed to every consumer, so a socket read twice becomes a shared
//! subterm. Problems are pushed as diagnostics and the walk carries on with
//! the next branch.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, debug_span, trace, warn};
use weave_core::{
    Diagnostic, DiagnosticKind, Diagnostics, NodeId, SocketRef, Substitution, Term, TreeId, Type,
    TypeVar, VarId, instantiate, normalize, type_of, unify, unify_into,
};
use weave_graph::{Node, NodeGraph, NodeKind};
use weave_registry::{Declaration, Registry};

use crate::options::ResolverOptions;
use crate::overload::{self, Candidate};
use crate::parse_result::{ParseResult, Selection};

/// A chain of group node instances leading from the root tree to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    /// The root tree, outside of any group.
    pub const ROOT: ContextId = ContextId(0);

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// Interned group contexts.
#[derive(Debug)]
struct Contexts {
    parents: Vec<Option<(ContextId, NodeId)>>,
    index: FxHashMap<(ContextId, NodeId), ContextId>,
}

impl Contexts {
    fn new() -> Self {
        Self {
            parents: vec![None],
            index: FxHashMap::default(),
        }
    }

    /// The context inside `group`, a Group node seen from `parent`. `None`
    /// once every `u32` id is taken.
    fn enter(&mut self, parent: ContextId, group: NodeId) -> Option<ContextId> {
        if let Some(&id) = self.index.get(&(parent, group)) {
            return Some(id);
        }
        let id = ContextId(u32::try_from(self.parents.len()).ok()?);
        self.parents.push(Some((parent, group)));
        self.index.insert((parent, group), id);
        Some(id)
    }

    fn parent(&self, context: ContextId) -> Option<(ContextId, NodeId)> {
        self.parents.get(context.0 as usize).copied().flatten()
    }
}

/// A resolved socket: its term and the type it was resolved at.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub term: Term,
    pub ty: Type,
}

/// One root interface input, bound to a free variable.
#[derive(Debug, Clone)]
pub struct RootInput {
    pub name: String,
    pub var: VarId,
    pub ty: Type,
}

/// One root interface output.
#[derive(Debug, Clone)]
pub struct ResolvedOutput {
    pub name: String,
    pub declared: Option<Type>,
    /// `None` when resolution failed; the diagnostics say why.
    pub resolved: Option<Resolved>,
}

/// Terms for the root interface of a graph.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub inputs: Vec<RootInput>,
    pub outputs: Vec<ResolvedOutput>,
}

impl Resolution {
    /// Every root output resolved.
    pub fn is_complete(&self) -> bool {
        self.outputs.iter().all(|o| o.resolved.is_some())
    }

    pub fn output(&self, index: usize) -> Option<&Resolved> {
        self.outputs.get(index)?.resolved.as_ref()
    }
}

type MemoKey = (ContextId, NodeId, usize);

#[derive(Debug, Clone)]
enum Memo {
    InProgress,
    Resolved(Resolved),
    Failed,
}

/// Position to roll a failed probe back to.
struct Mark {
    diagnostics: usize,
    selections: usize,
    memo: usize,
}

/// Resolves the root tree of one graph snapshot.
pub struct Resolver<'a> {
    graph: &'a NodeGraph,
    registry: &'a Registry,
    options: &'a ResolverOptions,
    contexts: Contexts,
    memo: FxHashMap<MemoKey, Memo>,
    memo_log: Vec<MemoKey>,
    diagnostics: Diagnostics,
    selections: Vec<Selection>,
    depth: usize,
    root_inputs: Vec<RootInput>,
    /// Variables of the root input types. They name one unknown shared by all
    /// readers and are never renamed.
    pinned: FxHashSet<TypeVar>,
    /// Sockets that failed a probe, with the demand they failed under.
    probe_failures: FxHashSet<(MemoKey, Type)>,
}

/// Resolve `graph` against `registry`.
pub fn resolve_graph(
    graph: &NodeGraph,
    registry: &Registry,
    options: &ResolverOptions,
) -> (Resolution, ParseResult) {
    Resolver::new(graph, registry, options).resolve()
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a NodeGraph, registry: &'a Registry, options: &'a ResolverOptions) -> Self {
        let root_inputs: Vec<RootInput> = graph
            .interface(TreeId::ROOT)
            .map(|iface| {
                iface
                    .inputs
                    .iter()
                    .map(|socket| RootInput {
                        name: socket.name.clone(),
                        var: VarId::fresh(),
                        ty: socket.ty.clone().unwrap_or_else(Type::fresh),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let pinned = root_inputs.iter().flat_map(|i| i.ty.free_vars()).collect();

        Self {
            graph,
            registry,
            options,
            contexts: Contexts::new(),
            memo: FxHashMap::default(),
            memo_log: Vec::new(),
            diagnostics: Diagnostics::new(),
            selections: Vec::new(),
            depth: 0,
            root_inputs,
            pinned,
            probe_failures: FxHashSet::default(),
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Resolve every root interface output.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(mut self) -> (Resolution, ParseResult) {
        let graph = self.graph;
        let interface_outputs = graph
            .interface(TreeId::ROOT)
            .map(|iface| iface.outputs.as_slice())
            .unwrap_or_default();
        let _span = debug_span!(
            "resolve",
            tree = %TreeId::ROOT,
            outputs = interface_outputs.len()
        )
        .entered();

        let sink = graph.group_output(TreeId::ROOT);
        let mut outputs = Vec::with_capacity(interface_outputs.len());
        for (index, socket) in interface_outputs.iter().enumerate() {
            let demand = socket.ty.clone().unwrap_or_else(Type::fresh);
            let resolved = sink.and_then(|sink| {
                self.resolve_demanded(ContextId::ROOT, sink.input(index), None, &demand)
            });
            outputs.push(ResolvedOutput {
                name: socket.name.clone(),
                declared: socket.ty.clone(),
                resolved,
            });
        }

        if self.options.warn_unconnected_outputs {
            self.report_unconnected();
        }

        debug!(
            errors = self.diagnostics.error_count(),
            warnings = self.diagnostics.warning_count(),
            selections = self.selections.len(),
            "resolved graph"
        );
        let resolution = Resolution {
            inputs: std::mem::take(&mut self.root_inputs),
            outputs,
        };
        (resolution, ParseResult::new(self.diagnostics, self.selections))
    }

    /// Resolve one output socket of the root tree.
    pub fn resolve_socket(&mut self, output: SocketRef, demand: &Type) -> Option<Resolved> {
        self.resolve_output(ContextId::ROOT, output, demand)
    }

    /// Diagnostics and selections gathered so far.
    pub fn into_parse_result(self) -> ParseResult {
        ParseResult::new(self.diagnostics, self.selections)
    }

    // ========================================================================
    // Sockets
    // ========================================================================

    fn resolve_output(&mut self, ctx: ContextId, socket: SocketRef, demand: &Type) -> Option<Resolved> {
        let key = (ctx, socket.node, socket.index);
        match self.memo.get(&key) {
            Some(Memo::InProgress) => {
                self.report(
                    Diagnostic::error(DiagnosticKind::CyclicDependency, "output depends on itself")
                        .at_socket(socket),
                );
                return None;
            }
            Some(Memo::Failed) => return None,
            Some(Memo::Resolved(done)) => {
                trace!(%socket, context = %ctx, "reuse");
                let term = done.term.clone();
                let ty = self.share(&done.ty);
                return Some(Resolved { term, ty });
            }
            None => {}
        }

        if self.depth >= self.options.max_depth {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::DepthLimit,
                    format!("resolution nests deeper than {} sockets", self.options.max_depth),
                )
                .at_socket(socket),
            );
            return None;
        }

        self.memo.insert(key, Memo::InProgress);
        self.memo_log.push(key);
        self.depth += 1;
        trace!(%socket, context = %ctx, %demand, "visit");
        let result = self.visit(ctx, socket, demand);
        self.depth -= 1;

        let entry = match &result {
            Some(done) => {
                debug!(%socket, context = %ctx, ty = %done.ty, "resolved socket");
                Memo::Resolved(done.clone())
            }
            None => Memo::Failed,
        };
        self.memo.insert(key, entry);
        result
    }

    fn visit(&mut self, ctx: ContextId, socket: SocketRef, demand: &Type) -> Option<Resolved> {
        let graph = self.graph;
        let Some(node) = graph.node(socket.node) else {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::UnknownNode,
                    format!("node {} does not exist", socket.node),
                )
                .at_node(socket.node),
            );
            return None;
        };

        if node.muted {
            return match graph.muted_source(socket) {
                Some(input) => self.resolve_input(ctx, input, None, demand),
                None => {
                    self.report(
                        Diagnostic::error(
                            DiagnosticKind::InsufficientInput,
                            format!(
                                "muted {} has no input to pass through to output {}",
                                node.display_name(),
                                socket.index
                            ),
                        )
                        .at_socket(socket),
                    );
                    None
                }
            };
        }

        match &node.kind {
            NodeKind::Operation(name) => {
                let registry = self.registry;
                match registry.declaration(name) {
                    Some(declaration) => self.resolve_operation(ctx, socket, node, declaration, demand),
                    None => {
                        self.report(
                            Diagnostic::error(
                                DiagnosticKind::UnknownNode,
                                format!("`{name}` is not declared"),
                            )
                            .at_node(socket.node),
                        );
                        None
                    }
                }
            }
            NodeKind::GroupInput => self.resolve_group_input(ctx, socket, demand),
            NodeKind::Group(inner) => self.resolve_group(ctx, socket, *inner, demand),
            NodeKind::GroupOutput => {
                self.report(
                    Diagnostic::error(DiagnosticKind::UnknownNode, "group output has no outputs")
                        .at_socket(socket),
                );
                None
            }
        }
    }

    /// Resolve what feeds `input`: its connection, else the declared default.
    fn resolve_input(
        &mut self,
        ctx: ContextId,
        input: SocketRef,
        declaration: Option<&Declaration>,
        want: &Type,
    ) -> Option<Resolved> {
        let graph = self.graph;
        if let Some(source) = graph.input_connection(input) {
            return self.resolve_output(ctx, source, want);
        }

        let default = declaration
            .and_then(|d| d.inputs.get(input.index))
            .and_then(|decl| decl.default_term().map(|term| (decl.name.clone(), term)));
        if let Some((name, term)) = default {
            if self.options.report_default_arguments {
                self.report(
                    Diagnostic::info(
                        DiagnosticKind::DefaultArgument,
                        format!("input `{name}` uses its default value"),
                    )
                    .at_socket(input),
                );
            }
            let ty = self.share(&type_of(&term));
            return Some(Resolved { term, ty });
        }

        let node = graph.node(input.node);
        let name = node
            .and_then(|n| n.inputs.get(input.index))
            .map_or("?", String::as_str);
        let owner = node.map(Node::display_name).unwrap_or_default();
        self.report(
            Diagnostic::error(
                DiagnosticKind::InsufficientInput,
                format!("input `{name}` of {owner} is not connected"),
            )
            .at_socket(input),
        );
        None
    }

    /// [`Self::resolve_input`] followed by a type check against `want`.
    fn resolve_demanded(
        &mut self,
        ctx: ContextId,
        input: SocketRef,
        declaration: Option<&Declaration>,
        want: &Type,
    ) -> Option<Resolved> {
        let arg = self.resolve_input(ctx, input, declaration, want)?;
        match unify(want, &arg.ty) {
            Some(subst) => Some(Resolved {
                ty: subst.apply(&arg.ty),
                term: arg.term,
            }),
            None => {
                self.report(mismatch(input, want, &arg.ty));
                None
            }
        }
    }

    // ========================================================================
    // Groups
    // ========================================================================

    fn resolve_group_input(&mut self, ctx: ContextId, socket: SocketRef, demand: &Type) -> Option<Resolved> {
        let Some((parent, group)) = self.contexts.parent(ctx) else {
            let Some(input) = self.root_inputs.get(socket.index) else {
                self.report(
                    Diagnostic::error(
                        DiagnosticKind::InsufficientInput,
                        format!("the graph has no input {}", socket.index),
                    )
                    .at_socket(socket),
                );
                return None;
            };
            return Some(Resolved {
                term: Term::free_var(input.var, input.ty.clone()),
                ty: input.ty.clone(),
            });
        };

        let graph = self.graph;
        let declared = graph
            .interface(socket.node.tree)
            .and_then(|iface| iface.inputs.get(socket.index))
            .and_then(|s| s.ty.as_ref());
        let want = self.narrow_demand(declared, demand, socket)?;
        self.resolve_demanded(parent, group.input(socket.index), None, &want)
    }

    fn resolve_group(
        &mut self,
        ctx: ContextId,
        socket: SocketRef,
        inner: TreeId,
        demand: &Type,
    ) -> Option<Resolved> {
        let graph = self.graph;
        let Some(sink) = graph.group_output(inner) else {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::UnknownNode,
                    format!("group refers to missing tree {inner}"),
                )
                .at_node(socket.node),
            );
            return None;
        };
        let declared = graph
            .interface(inner)
            .and_then(|iface| iface.outputs.get(socket.index))
            .and_then(|s| s.ty.as_ref());
        let want = self.narrow_demand(declared, demand, socket)?;
        let Some(child) = self.contexts.enter(ctx, socket.node) else {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::DepthLimit,
                    format!("too many group instances to enter {inner}"),
                )
                .at_socket(socket),
            );
            return None;
        };
        self.resolve_demanded(child, sink.input(socket.index), None, &want)
    }

    /// Combine a demand with an interface's declared type.
    fn narrow_demand(&mut self, declared: Option<&Type>, demand: &Type, socket: SocketRef) -> Option<Type> {
        let Some(declared) = declared else {
            return Some(demand.clone());
        };
        let declared = instantiate(declared);
        match unify(&declared, demand) {
            Some(subst) => Some(subst.apply(&declared)),
            None => {
                self.report(
                    Diagnostic::error(
                        DiagnosticKind::TypeMismatch,
                        format!("interface declares {}, {} is demanded", normalize(&declared), demand),
                    )
                    .at_socket(socket),
                );
                None
            }
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn resolve_operation(
        &mut self,
        ctx: ContextId,
        socket: SocketRef,
        node: &'a Node,
        declaration: &'a Declaration,
        demand: &Type,
    ) -> Option<Resolved> {
        let registry = self.registry;
        let name = &declaration.name;
        let output = declaration
            .outputs
            .get(socket.index)
            .map_or("?", String::as_str);

        let definitions = registry.candidates(name, socket.index);
        if definitions.is_empty() {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::NoValidOverloading,
                    format!("no definition of `{name}` for output `{output}`"),
                )
                .at_socket(socket),
            );
            return None;
        }

        let inputs = declaration.input_count();
        let candidates: Vec<Candidate<'a>> = definitions
            .into_iter()
            .filter_map(|d| Candidate::new(d, &node.literals, inputs))
            .collect();
        if candidates.is_empty() {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::NoValidOverloading,
                    format!("no definition of `{name}` accepts the node's literals"),
                )
                .at_socket(socket),
            );
            return None;
        }

        let filtered = overload::filter_by_output(candidates, demand);
        if filtered.survivors.is_empty() {
            self.report(
                Diagnostic::error(
                    DiagnosticKind::TypeMismatch,
                    format!("no definition of `{name}` produces {demand}"),
                )
                .at_socket(socket),
            );
            return None;
        }
        let working = working_demand(&filtered.working, demand);
        trace!(
            %name,
            survivors = filtered.survivors.len(),
            %working,
            "filtered candidates"
        );

        // A generic demand cannot tell a general survivor from a specific
        // one, so the connected arguments decide before specificity does.
        let mut best = if demand.is_ground() {
            overload::minimal(filtered.survivors)
        } else {
            filtered.survivors
        };
        if best.len() > 1 {
            let actual = self.probe_arguments(ctx, socket.node, declaration, &best);
            let narrowed = overload::narrow_by_arguments(best, &working, &actual);
            if narrowed.is_empty() {
                self.report(
                    Diagnostic::error(
                        DiagnosticKind::TypeMismatch,
                        format!("no definition of `{name}` accepts the connected inputs"),
                    )
                    .at_node(socket.node),
                );
                return None;
            }
            best = overload::minimal(narrowed);
        }

        if best.len() > 1 {
            let signatures: Vec<String> = best
                .iter()
                .map(|c| normalize(&c.signature).to_string())
                .collect();
            self.report(
                Diagnostic::error(
                    DiagnosticKind::AmbiguousOverloading,
                    format!("`{name}` is ambiguous between {}", signatures.join(", ")),
                )
                .at_socket(socket),
            );
            return None;
        }

        let chosen = best.pop()?;
        self.apply_candidate(ctx, socket, node, declaration, chosen, demand)
    }

    /// Resolve the inputs of the chosen candidate and build its application.
    fn apply_candidate(
        &mut self,
        ctx: ContextId,
        socket: SocketRef,
        node: &'a Node,
        declaration: &'a Declaration,
        chosen: Candidate<'a>,
        demand: &Type,
    ) -> Option<Resolved> {
        let mut subst = Substitution::new();
        if !unify_into(&chosen.output, demand, &mut subst) {
            self.report(mismatch(socket, demand, &chosen.output));
            return None;
        }

        let mut args = Vec::with_capacity(chosen.params.len());
        let mut complete = true;
        for (index, param) in chosen.params.iter().enumerate() {
            let input = socket.node.input(index);
            let want = subst.apply(param);
            let Some(arg) = self.resolve_input(ctx, input, Some(declaration), &want) else {
                complete = false;
                continue;
            };
            let mut next = subst.clone();
            if unify_into(&want, &arg.ty, &mut next) {
                subst = next;
                args.push(arg.term);
            } else {
                self.report(mismatch(input, &want, &arg.ty));
                complete = false;
            }
        }
        if !complete {
            return None;
        }

        let instance = match chosen.definition.instantiate(&node.literals) {
            Ok(term) => term,
            Err(exception) => {
                warn!(node = %socket.node, error = %exception, "instance getter failed");
                Term::exception(exception)
            }
        };

        self.selections.push(Selection {
            context: ctx,
            socket,
            definition: chosen.definition.hash(),
            signature: subst.apply(&chosen.signature),
        });
        Some(Resolved {
            term: Term::apply_all(instance, args),
            ty: subst.apply(&chosen.output),
        })
    }

    /// Argument types seen by the inputs of `node` when each is asked for the
    /// common shape of the candidates' parameters.
    ///
    /// Inputs that resolve stay memoised for the real pass. A failed input is
    /// rolled back, so the real pass reports it against the chosen candidate's
    /// parameter, and is not probed again for the same demand.
    fn probe_arguments(
        &mut self,
        ctx: ContextId,
        node: NodeId,
        declaration: &Declaration,
        candidates: &[Candidate<'_>],
    ) -> Vec<Option<Type>> {
        let graph = self.graph;
        let mut actual = Vec::with_capacity(declaration.input_count());
        for (index, decl) in declaration.inputs.iter().enumerate() {
            let Some(source) = graph.input_connection(node.input(index)) else {
                actual.push(decl.default_term().map(|term| self.share(&type_of(&term))));
                continue;
            };
            let want = overload::generalized_param(candidates, index);
            let key = ((ctx, source.node, source.index), normalize(&want));
            if self.probe_failures.contains(&key) {
                actual.push(None);
                continue;
            }

            let mark = self.mark();
            let resolved = self.resolve_output(ctx, source, &want);
            if resolved.is_none() {
                self.rollback(mark);
                self.probe_failures.insert(key);
            }
            actual.push(resolved.map(|r| r.ty));
        }
        actual
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn report(&mut self, diagnostic: Diagnostic) {
        trace!(%diagnostic, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    fn mark(&self) -> Mark {
        Mark {
            diagnostics: self.diagnostics.len(),
            selections: self.selections.len(),
            memo: self.memo_log.len(),
        }
    }

    fn rollback(&mut self, mark: Mark) {
        self.diagnostics.truncate(mark.diagnostics);
        self.selections.truncate(mark.selections);
        for key in self.memo_log.drain(mark.memo..) {
            self.memo.remove(&key);
        }
    }

    /// A copy of a memoised type for one more consumer.
    fn share(&self, ty: &Type) -> Type {
        let mut renames: FxHashMap<TypeVar, Type> = FxHashMap::default();
        ty.map_vars(&mut |v| {
            if self.pinned.contains(&v) {
                Type::Variable(v)
            } else {
                renames.entry(v).or_insert_with(Type::fresh).clone()
            }
        })
    }

    fn report_unconnected(&mut self) {
        let graph = self.graph;
        for tree in graph.tree_ids() {
            for (id, node) in graph.nodes(tree) {
                if !matches!(node.kind, NodeKind::Operation(_)) {
                    continue;
                }
                for (index, name) in node.outputs.iter().enumerate() {
                    let output = id.output(index);
                    if graph.output_connections(output).is_empty() {
                        self.report(
                            Diagnostic::warning(
                                DiagnosticKind::UnconnectedOutput,
                                format!("output `{name}` of {} is not connected", node.display_name()),
                            )
                            .at_socket(output),
                        );
                    }
                }
            }
        }
    }
}

/// The demand that argument narrowing checks survivors against.
///
/// A ground demand is used as is. A generic one is refined by the common
/// shape of the survivors' outputs.
fn working_demand(generalized: &Type, demand: &Type) -> Type {
    if demand.is_ground() {
        return demand.clone();
    }
    match unify(generalized, demand) {
        Some(subst) => subst.apply(generalized),
        None => demand.clone(),
    }
}

fn mismatch(socket: SocketRef, expected: &Type, found: &Type) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::TypeMismatch,
        format!("expected {}, found {}", normalize(expected), normalize(found)),
    )
    .at_socket(socket)
}
