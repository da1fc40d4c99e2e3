//! What a resolver run reports back to the editor.

use weave_core::{DefinitionHash, Diagnostic, Diagnostics, NodeId, SocketRef, Type};

use crate::resolver::ContextId;

/// The definition chosen for one output socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub context: ContextId,
    pub socket: SocketRef,
    pub definition: DefinitionHash,
    /// The chosen signature after argument bindings.
    pub signature: Type,
}

/// Diagnostics and overload selections of one compilation.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    diagnostics: Diagnostics,
    selections: Vec<Selection>,
}

impl ParseResult {
    pub fn new(diagnostics: Diagnostics, selections: Vec<Selection>) -> Self {
        Self {
            diagnostics,
            selections,
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.errors()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.warnings()
    }

    pub fn infos(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.infos()
    }

    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.for_node(node)
    }

    pub fn for_socket(&self, socket: SocketRef) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.for_socket(socket)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// The definition chosen for `socket` in its first resolved context.
    pub fn selected(&self, socket: SocketRef) -> Option<DefinitionHash> {
        self.selections
            .iter()
            .find(|s| s.socket == socket)
            .map(|s| s.definition)
    }
}
