//! Nodes: named, addressable owners of a parameter group tree.

use crate::id::{GroupId, NodeId, ParamId};

/// A node in the scene. Owns exactly one root parameter group and is the unit
/// of addressability for persisted connection tuples.
///
/// Animation-aware nodes may bind a time parameter and a frame-range pair;
/// [`ParamGraph::set_frame`](crate::graph::ParamGraph::set_frame) drives the
/// time parameter and proactively refreshes the node's self-evaluating
/// parameters, which is how time-driven nodes stay current without polling.
pub struct Node {
    pub(crate) name: String,
    pub(crate) root: GroupId,
    pub(crate) time_param: Option<ParamId>,
    pub(crate) range_params: Option<(ParamId, ParamId)>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_group(&self) -> GroupId {
        self.root
    }

    pub fn time_param(&self) -> Option<ParamId> {
        self.time_param
    }

    /// Start/end frame parameters of an animation-aware node.
    pub fn range_params(&self) -> Option<(ParamId, ParamId)> {
        self.range_params
    }
}

/// Lightweight handle pairing a node id with its name, returned by listing
/// operations so views can address nodes without holding graph borrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub name: String,
}
