use thiserror::Error;
use weave_core::{NodeId, SocketRef, TreeId};

/// Errors raised by graph edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown tree {0}")]
    UnknownTree(TreeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown socket {0}")]
    UnknownSocket(SocketRef),

    #[error("cannot connect {from} to {to}: sockets live in different trees")]
    CrossTree { from: SocketRef, to: SocketRef },

    #[error("socket {0} has the wrong direction for this operation")]
    WrongDirection(SocketRef),

    #[error("group boundary node {0} cannot be removed")]
    ProtectedNode(NodeId),

    #[error("tree {0} cannot contain a group of itself")]
    RecursiveGroup(TreeId),
}
