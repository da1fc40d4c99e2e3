use weave_core::{QualifiedName, Type, TreeId, Value};
use weave_registry::Declaration;

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An instance of a registered declaration.
    Operation(QualifiedName),
    /// Boundary node exposing the tree's interface inputs as outputs.
    GroupInput,
    /// Boundary node collecting the tree's interface outputs as inputs.
    GroupOutput,
    /// An instance of another tree.
    Group(TreeId),
}

/// A node and its sockets.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// Literal payload read by the definition's instance getter.
    pub literals: Vec<Value>,
    pub muted: bool,
    pub label: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            literals: Vec::new(),
            muted: false,
            label: None,
        }
    }

    /// An operation node with the declaration's sockets.
    pub fn operation(declaration: &Declaration) -> Self {
        Self {
            inputs: declaration.input_names().map(str::to_string).collect(),
            outputs: declaration.outputs.clone(),
            ..Self::new(NodeKind::Operation(declaration.name.clone()))
        }
    }

    pub fn with_inputs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.inputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.outputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_literals(mut self, literals: Vec<Value>) -> Self {
        self.literals = literals;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn operation_name(&self) -> Option<&QualifiedName> {
        match &self.kind {
            NodeKind::Operation(name) => Some(name),
            _ => None,
        }
    }

    /// Name shown in diagnostics: the label, else the operation name.
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.kind {
            NodeKind::Operation(name) => name.to_string(),
            NodeKind::GroupInput => "group input".to_string(),
            NodeKind::GroupOutput => "group output".to_string(),
            NodeKind::Group(tree) => format!("group {tree}"),
        }
    }
}

/// One socket of a tree interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSocket {
    pub name: String,
    /// Declared type, or `None` to accept whatever is connected.
    pub ty: Option<Type>,
}

impl InterfaceSocket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

/// Inputs and outputs a tree exposes to its group nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    pub inputs: Vec<InterfaceSocket>,
    pub outputs: Vec<InterfaceSocket>,
}

impl Interface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, socket: InterfaceSocket) -> Self {
        self.inputs.push(socket);
        self
    }

    pub fn output(mut self, socket: InterfaceSocket) -> Self {
        self.outputs.push(socket);
        self
    }

    pub(crate) fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|s| s.name.clone()).collect()
    }

    pub(crate) fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|s| s.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_copies_sockets() {
        let decl = Declaration::new("list::cons")
            .input("head")
            .input("tail")
            .output("list");
        let node = Node::operation(&decl);
        assert_eq!(node.inputs, vec!["head", "tail"]);
        assert_eq!(node.outputs, vec!["list"]);
        assert_eq!(node.display_name(), "list::cons");
    }

    #[test]
    fn label_overrides_display_name() {
        let node = Node::new(NodeKind::GroupInput).with_label("inputs");
        assert_eq!(node.display_name(), "inputs");
    }
}
