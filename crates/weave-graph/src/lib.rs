//! The editable node graph consumed by the weave resolver.
//!
//! A [`NodeGraph`] owns a set of trees. Every tree has a [`GroupInput`] and a
//! [`GroupOutput`] boundary node mirroring its [`Interface`]; a
//! [`Group`] node in another tree instances it. The root tree's boundary
//! nodes are the inputs and outputs of the compiled program.
//!
//! The resolver only ever receives a [`NodeGraph::snapshot`] and refers to
//! nodes and sockets by handle.
//!
//! [`GroupInput`]: NodeKind::GroupInput
//! [`GroupOutput`]: NodeKind::GroupOutput
//! [`Group`]: NodeKind::Group

mod error;
mod graph;
mod node;

pub use error::GraphError;
pub use graph::{Link, NodeGraph, NodeTree};
pub use node::{Interface, InterfaceSocket, Node, NodeKind};
