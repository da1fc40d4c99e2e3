//! Resolver diagnostics.
//!
//! Diagnostics describe expected, user-facing problems in a node graph
//! (a missing overload, a type mismatch, a cycle). They are collected, never
//! thrown, so one resolver pass reports every reachable problem.

use std::fmt;

use crate::ids::{NodeId, SocketRef};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// No definition is registered for the node's name and output.
    NoValidOverloading,
    /// More than one equally specific definition fits.
    AmbiguousOverloading,
    /// A connection or demanded type does not fit the chosen definition.
    TypeMismatch,
    /// A socket depends on itself.
    CyclicDependency,
    /// An input is unconnected and has no default.
    InsufficientInput,
    /// Nesting exceeded the configured resolution depth.
    DepthLimit,
    /// The node names a declaration that was never registered.
    UnknownNode,
    /// An unconnected input took its declared default.
    DefaultArgument,
    /// An output is connected to nothing.
    UnconnectedOutput,
}

impl DiagnosticKind {
    /// Stable kebab-case code, e.g. `no-valid-overloading`.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::NoValidOverloading => "no-valid-overloading",
            DiagnosticKind::AmbiguousOverloading => "ambiguous-overloading",
            DiagnosticKind::TypeMismatch => "type-mismatch",
            DiagnosticKind::CyclicDependency => "cyclic-dependency",
            DiagnosticKind::InsufficientInput => "insufficient-input",
            DiagnosticKind::DepthLimit => "depth-limit",
            DiagnosticKind::UnknownNode => "unknown-node",
            DiagnosticKind::DefaultArgument => "default-argument",
            DiagnosticKind::UnconnectedOutput => "unconnected-output",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single diagnostic anchored to a node or socket.
///
/// # Examples
///
/// ```
/// use weave_core::{Diagnostic, DiagnosticKind, NodeId, TreeId};
///
/// let node = NodeId::new(TreeId::ROOT, 3);
/// let d = Diagnostic::error(DiagnosticKind::NoValidOverloading, "no definition of 'blur'")
///     .at_node(node);
/// assert_eq!(d.to_string(), "error[no-valid-overloading] at node 0:3: no definition of 'blur'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub node: Option<NodeId>,
    pub socket: Option<SocketRef>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            node: None,
            socket: None,
        }
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, kind, message)
    }

    pub fn at_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Anchor to a socket. Also anchors to the socket's node.
    pub fn at_socket(mut self, socket: SocketRef) -> Self {
        self.node = Some(socket.node);
        self.socket = Some(socket);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.kind)?;
        match (&self.socket, &self.node) {
            (Some(socket), _) => write!(f, " at socket {socket}")?,
            (None, Some(node)) => write!(f, " at node {node}")?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// An ordered collection of diagnostics.
///
/// ```
/// use weave_core::{Diagnostic, DiagnosticKind, Diagnostics};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.push(Diagnostic::warning(DiagnosticKind::UnconnectedOutput, "unused"));
/// assert!(!diagnostics.has_errors());
/// diagnostics.push(Diagnostic::error(DiagnosticKind::TypeMismatch, "int vs float"));
/// assert!(diagnostics.has_errors());
/// assert_eq!(diagnostics.error_count(), 1);
/// assert_eq!(diagnostics.warning_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for d in other {
            self.push(d);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    /// Drop everything pushed after the first `len` diagnostics.
    pub fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
        self.has_errors = self.diagnostics.iter().any(Diagnostic::is_error);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Info)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Diagnostics anchored to `node`, including those on its sockets.
    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.node == Some(node))
    }

    pub fn for_socket(&self, socket: SocketRef) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.socket == Some(socket))
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn info_count(&self) -> usize {
        self.infos().count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.diagnostics {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let mut out = Diagnostics::new();
        out.extend(iter);
        out
    }
}
