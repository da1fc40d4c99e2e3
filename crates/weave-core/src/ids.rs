//! Identifier types shared across the workspace.
//!
//! Node-graph handles ([`TreeId`], [`NodeId`], [`SocketRef`]) are minted by the
//! graph crate and only ever stored by value, so a resolver never keeps a
//! pointer into a graph that may be edited between runs. [`VarId`] is the
//! process-unique identity of free variables and type variables.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VAR: AtomicU64 = AtomicU64::new(0);

/// Process-unique variable identity.
///
/// # Example
///
/// ```
/// use weave_core::VarId;
///
/// let a = VarId::fresh();
/// let b = VarId::fresh();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u64);

impl VarId {
    /// Mint a new id that has never been returned before in this process.
    #[inline]
    pub fn fresh() -> Self {
        Self(NEXT_VAR.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying counter value.
    #[inline]
    pub const fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifies one node tree inside a node graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u32);

impl TreeId {
    /// The root tree every graph starts with.
    pub const ROOT: TreeId = TreeId(0);

    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a node: the tree it lives in plus its arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub tree: TreeId,
    pub index: u32,
}

impl NodeId {
    #[inline]
    pub const fn new(tree: TreeId, index: u32) -> Self {
        Self { tree, index }
    }

    /// Reference to this node's input socket at `index`.
    #[inline]
    pub const fn input(self, index: usize) -> SocketRef {
        SocketRef::new(self, SocketDirection::Input, index)
    }

    /// Reference to this node's output socket at `index`.
    #[inline]
    pub const fn output(self, index: usize) -> SocketRef {
        SocketRef::new(self, SocketDirection::Output, index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tree, self.index)
    }
}

/// Whether a socket consumes or produces a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SocketDirection {
    Input,
    Output,
}

/// Handle to a single socket on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketRef {
    pub node: NodeId,
    pub direction: SocketDirection,
    pub index: usize,
}

impl SocketRef {
    #[inline]
    pub const fn new(node: NodeId, direction: SocketDirection, index: usize) -> Self {
        Self {
            node,
            direction,
            index,
        }
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        self.direction == SocketDirection::Input
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        self.direction == SocketDirection::Output
    }
}

impl fmt::Display for SocketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SocketDirection::Input => "in",
            SocketDirection::Output => "out",
        };
        write!(f, "{}.{}[{}]", self.node, dir, self.index)
    }
}
