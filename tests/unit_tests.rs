//! Integration tests for weave using Context as the entry point.
//!
//! These tests build node graphs against the default modules and run the
//! full pipeline (resolution + executable) through the public facade.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use weave::prelude::*;
use weave_core::{generalize, normalize, specializable, split_list};
use weave_modules::ListError;

/// Helper to create a sealed context with the default modules.
fn sealed_context() -> (Context, Arc<Registry>) {
    let mut ctx = Context::with_default_modules().unwrap();
    let registry = ctx.seal();
    (ctx, registry)
}

/// Helper to build a graph whose root tree has the named untyped outputs.
fn graph_with_outputs(names: &[&str]) -> NodeGraph {
    let mut graph = NodeGraph::new();
    let interface = names
        .iter()
        .fold(Interface::new(), |iface, name| iface.output(InterfaceSocket::new(*name)));
    graph.set_interface(TreeId::ROOT, interface).unwrap();
    graph
}

fn op(graph: &mut NodeGraph, registry: &Registry, name: &str) -> NodeId {
    let decl = registry
        .declaration(&name.into())
        .unwrap_or_else(|| panic!("no declaration named {name}"));
    graph.add_operation(TreeId::ROOT, decl).unwrap()
}

fn int(graph: &mut NodeGraph, registry: &Registry, n: i64) -> NodeId {
    let node = op(graph, registry, "constant::int");
    graph.set_literals(node, vec![Value::Int(n)]).unwrap();
    node
}

fn link(graph: &mut NodeGraph, from: SocketRef, to: SocketRef) {
    graph.connect(from, to).unwrap();
}

fn sink(graph: &NodeGraph, index: usize) -> SocketRef {
    graph.group_output(TreeId::ROOT).unwrap().input(index)
}

// =============================================================================
// Lists
// =============================================================================

/// `cons(42, cons(24, nil))` exposed as `first`, `second` and `rest`.
fn list_graph(registry: &Registry) -> NodeGraph {
    let mut graph = graph_with_outputs(&["first", "second", "rest"]);
    let a = int(&mut graph, registry, 42);
    let b = int(&mut graph, registry, 24);
    let nil = op(&mut graph, registry, "list::nil");
    let inner = op(&mut graph, registry, "list::cons");
    let outer = op(&mut graph, registry, "list::cons");
    link(&mut graph, b.output(0), inner.input(0));
    link(&mut graph, nil.output(0), inner.input(1));
    link(&mut graph, a.output(0), outer.input(0));
    link(&mut graph, inner.output(0), outer.input(1));

    let head = op(&mut graph, registry, "list::head");
    link(&mut graph, outer.output(0), head.input(0));
    let s0 = sink(&graph, 0);
    link(&mut graph, head.output(0), s0);

    let tail = op(&mut graph, registry, "list::tail");
    link(&mut graph, outer.output(0), tail.input(0));
    let second = op(&mut graph, registry, "list::head");
    link(&mut graph, tail.output(0), second.input(0));
    let s1 = sink(&graph, 1);
    link(&mut graph, second.output(0), s1);

    let tail_tail = op(&mut graph, registry, "list::tail");
    link(&mut graph, tail.output(0), tail_tail.input(0));
    let s2 = sink(&graph, 2);
    link(&mut graph, tail_tail.output(0), s2);

    graph
}

#[test]
fn test_list_literal_head_and_tail() {
    let (ctx, registry) = sealed_context();
    let graph = list_graph(&registry);
    let compilation = ctx.compile(&graph).unwrap();
    assert!(
        compilation.succeeded(),
        "diagnostics: {:?}",
        compilation.parse_result.diagnostics()
    );
    assert!(!compilation.parse_result.has_error());

    let exe = compilation.executable.unwrap();
    let first = exe.run_output(exe.output_index("first").unwrap(), &[]).unwrap();
    assert_eq!(evaluate_as::<i64>(&first).unwrap(), 42);

    let second = exe.run_output(exe.output_index("second").unwrap(), &[]).unwrap();
    assert_eq!(evaluate_as::<i64>(&second).unwrap(), 24);

    let rest = exe.run_output(exe.output_index("rest").unwrap(), &[]).unwrap();
    assert!(split_list(&rest).unwrap().is_none());
}

#[test]
fn test_cons_tail_defaults_to_nil() {
    let (ctx, registry) = sealed_context();
    let mut graph = graph_with_outputs(&["rest"]);
    let n = int(&mut graph, &registry, 1);
    let cons = op(&mut graph, &registry, "list::cons");
    link(&mut graph, n.output(0), cons.input(0));
    let tail = op(&mut graph, &registry, "list::tail");
    link(&mut graph, cons.output(0), tail.input(0));
    let s = sink(&graph, 0);
    link(&mut graph, tail.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(compilation.succeeded());
    assert!(
        compilation
            .parse_result
            .infos()
            .any(|d| d.kind == DiagnosticKind::DefaultArgument)
    );
    let rest = compilation.executable.unwrap().run_output(0, &[]).unwrap();
    assert!(split_list(&rest).unwrap().is_none());
}

#[test]
fn test_head_of_nil_raises_list_error() {
    let (ctx, registry) = sealed_context();
    let mut graph = graph_with_outputs(&["first"]);
    let nil = op(&mut graph, &registry, "list::nil");
    let head = op(&mut graph, &registry, "list::head");
    link(&mut graph, nil.output(0), head.input(0));
    let s = sink(&graph, 0);
    link(&mut graph, head.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(compilation.succeeded());
    let exe = compilation.executable.unwrap();

    let err = exe.run_output(0, &[]).unwrap_err();
    let RunError::Eval(EvalError::Raised(exception)) = &err else {
        panic!("expected a raised exception, got {err:?}");
    };
    assert!(exception.is::<ListError>());

    // A failed run leaves the executable usable.
    assert!(exe.run_output(0, &[]).is_err());
    assert!(exe.output(0).is_some());
}

// =============================================================================
// Overloads
// =============================================================================

#[test]
fn test_add_picks_int_overload() {
    let (ctx, registry) = sealed_context();
    let mut graph = graph_with_outputs(&["sum"]);
    let a = int(&mut graph, &registry, 2);
    let b = int(&mut graph, &registry, 3);
    let add = op(&mut graph, &registry, "math::add");
    link(&mut graph, a.output(0), add.input(0));
    link(&mut graph, b.output(0), add.input(1));
    let s = sink(&graph, 0);
    link(&mut graph, add.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(compilation.succeeded());
    assert!(compilation.parse_result.selected(add.output(0)).is_some());
    let sum = compilation.executable.unwrap().run_output(0, &[]).unwrap();
    assert_eq!(evaluate_as::<i64>(&sum).unwrap(), 5);
}

#[test]
fn test_add_picks_float_overload() {
    let (ctx, registry) = sealed_context();
    let mut graph = graph_with_outputs(&["sum"]);
    let a = op(&mut graph, &registry, "constant::float");
    graph.set_literals(a, vec![Value::float(1.5)]).unwrap();
    let b = op(&mut graph, &registry, "constant::float");
    graph.set_literals(b, vec![Value::float(2.0)]).unwrap();
    let add = op(&mut graph, &registry, "math::add");
    link(&mut graph, a.output(0), add.input(0));
    link(&mut graph, b.output(0), add.input(1));
    let s = sink(&graph, 0);
    link(&mut graph, add.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(compilation.succeeded());
    let sum = compilation.executable.unwrap().run_output(0, &[]).unwrap();
    assert_eq!(evaluate_as::<f64>(&sum).unwrap(), 3.5);
}

#[test]
fn test_mixed_arguments_are_a_type_mismatch() {
    let (ctx, registry) = sealed_context();
    let mut graph = graph_with_outputs(&["sum"]);
    let a = int(&mut graph, &registry, 1);
    let b = op(&mut graph, &registry, "constant::float");
    graph.set_literals(b, vec![Value::float(1.0)]).unwrap();
    let add = op(&mut graph, &registry, "math::add");
    link(&mut graph, a.output(0), add.input(0));
    link(&mut graph, b.output(0), add.input(1));
    let s = sink(&graph, 0);
    link(&mut graph, add.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(!compilation.succeeded());
    assert!(
        compilation
            .parse_result
            .errors()
            .any(|d| d.kind == DiagnosticKind::TypeMismatch)
    );
}

#[test]
fn test_missing_definition_fails_pipeline() {
    let mut ctx = Context::new();
    ctx.install(Module::new("fx").declare(Declaration::new("blur").input("image").output("image")))
        .unwrap();
    let registry = ctx.seal();

    let mut graph = graph_with_outputs(&["out"]);
    let blur = op(&mut graph, &registry, "fx::blur");
    let s = sink(&graph, 0);
    link(&mut graph, blur.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(!compilation.succeeded());
    assert!(compilation.executable.is_none());
    assert_eq!(compilation.stages, vec!["resolve"]);

    let errors: Vec<_> = compilation.parse_result.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::NoValidOverloading);
    assert_eq!(errors[0].node, Some(blur));
    assert_eq!(compilation.parse_result.for_node(blur).count(), 1);
}

// =============================================================================
// Inputs
// =============================================================================

#[test]
fn test_root_inputs_become_arguments() {
    let (ctx, registry) = sealed_context();
    let mut graph = NodeGraph::new();
    graph
        .set_interface(
            TreeId::ROOT,
            Interface::new()
                .input(InterfaceSocket::typed("x", Type::int()))
                .output(InterfaceSocket::new("y")),
        )
        .unwrap();
    let source = graph.group_input(TreeId::ROOT).unwrap();
    let one = int(&mut graph, &registry, 1);
    let add = op(&mut graph, &registry, "math::add");
    link(&mut graph, source.output(0), add.input(0));
    link(&mut graph, one.output(0), add.input(1));
    let s = sink(&graph, 0);
    link(&mut graph, add.output(0), s);

    let compilation = ctx.compile(&graph).unwrap();
    assert!(compilation.succeeded());
    let exe = compilation.executable.unwrap();
    assert_eq!(exe.inputs().len(), 1);

    let y = exe.run_output(0, &[Term::value(41i64)]).unwrap();
    assert_eq!(evaluate_as::<i64>(&y).unwrap(), 42);
    let y = exe.run_output(0, &[Term::value(9i64)]).unwrap();
    assert_eq!(evaluate_as::<i64>(&y).unwrap(), 10);

    assert!(matches!(
        exe.run_output(0, &[]),
        Err(RunError::ArgumentCount { expected: 1, found: 0 })
    ));
}

// =============================================================================
// Evaluator
// =============================================================================

fn counted_add(calls: Arc<AtomicUsize>) -> Term {
    Term::native(
        "add",
        Type::function([Type::int(), Type::int()], Type::int()),
        move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            let a: i64 = evaluate_as(&args[0])?;
            let b: i64 = evaluate_as(&args[1])?;
            Ok(Term::value(a + b))
        },
    )
}

#[test]
fn test_application_is_memoised() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sum = Term::apply_all(counted_add(calls.clone()), [Term::value(2i64), Term::value(2i64)]);
    assert_eq!(evaluate_as::<i64>(&sum).unwrap(), 4);
    assert_eq!(evaluate_as::<i64>(&sum).unwrap(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_arity() {
    let calls = Arc::new(AtomicUsize::new(0));
    let add = counted_add(calls.clone());

    let partial = evaluate(&Term::apply(add.clone(), Term::value(1i64))).unwrap();
    assert!(partial.as_callable().is_some());
    assert!(!partial.is_value());

    let over = Term::apply_all(
        add,
        [Term::value(1i64), Term::value(2i64), Term::value(3i64)],
    );
    assert!(matches!(
        evaluate(&over),
        Err(EvalError::TooManyArguments { .. })
    ));
}

// =============================================================================
// Types
// =============================================================================

#[test]
fn test_generalize_properties() {
    let samples = [
        Type::int(),
        Type::list(Type::float()),
        Type::function([Type::int(), Type::list(Type::var(0))], Type::var(0)),
    ];
    for t in &samples {
        assert_eq!(&generalize(std::slice::from_ref(t)), t);
        assert_eq!(&generalize(&[t.clone(), t.clone()]), t);
        assert!(specializable(t, t));
    }

    let a = Type::function([Type::int()], Type::list(Type::int()));
    let b = Type::function([Type::float()], Type::list(Type::float()));
    let ab = generalize(&[a.clone(), b.clone()]);
    let ba = generalize(&[b.clone(), a.clone()]);
    assert_eq!(normalize(&ab), normalize(&ba));
    assert!(specializable(&ab, &a));
    assert!(specializable(&ab, &b));

    assert!(!specializable(&a, &Type::int()));
    assert!(!specializable(&Type::int(), &a));
}

// =============================================================================
// Compile service
// =============================================================================

#[test]
fn test_service_publishes_and_keeps_last_good_executable() {
    let (ctx, registry) = sealed_context();
    let service = ctx.service(graph_with_outputs(&["out"])).unwrap();

    let good = service.send(|graph| {
        let n = int(graph, &registry, 7);
        let s = sink(graph, 0);
        link(graph, n.output(0), s);
    });
    let published = service.wait_update(good).unwrap();
    assert!(published.succeeded);
    let exe = published.executable.clone().unwrap();
    assert_eq!(evaluate_as::<i64>(&exe.run_output(0, &[]).unwrap()).unwrap(), 7);

    let bad = service.send(|graph| {
        // An unconnected tail has nothing to take the tail of.
        let tail = op(graph, &registry, "list::tail");
        let s = sink(graph, 0);
        link(graph, tail.output(0), s);
    });
    let published = service
        .wait_update_timeout(bad, Duration::from_secs(30))
        .unwrap()
        .expect("compile did not finish");
    assert!(!published.succeeded);
    assert!(published.parse_result.has_error());
    let kept = published.executable.unwrap();
    assert!(Arc::ptr_eq(&kept, &exe));
    assert_eq!(service.snapshot().request_time, bad);
}
