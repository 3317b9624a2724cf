//! Ordered, named containers forming each node's interface tree.

use crate::id::{GroupId, NodeId, ParamId};

/// A child slot of a group: either a parameter or a nested group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChild {
    Param(ParamId),
    Group(GroupId),
}

/// One entry in a group's ordered child list. Insertion order is significant:
/// it drives UI layout and serialization order.
#[derive(Debug, Clone, Copy)]
pub struct ChildEntry {
    pub child: GroupChild,
    /// Hidden behind the "advanced" toggle in views.
    pub advanced: bool,
}

/// An ordered, named container of parameters and nested groups.
///
/// Names are unique among a group's direct children; the tree cannot contain
/// cycles because parent links are assigned exactly once at creation and a
/// group is always created inside an existing parent.
pub struct ParameterGroup {
    pub(crate) name: String,
    pub(crate) node: NodeId,
    pub(crate) parent: Option<GroupId>,
    pub(crate) children: Vec<ChildEntry>,
}

impl ParameterGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// `None` only for a node's root group.
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn children(&self) -> &[ChildEntry] {
        &self.children
    }

    /// Direct child parameters, in insertion order.
    pub fn params(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.children.iter().filter_map(|entry| match entry.child {
            GroupChild::Param(id) => Some(id),
            GroupChild::Group(_) => None,
        })
    }

    /// Direct child groups, in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.children.iter().filter_map(|entry| match entry.child {
            GroupChild::Group(id) => Some(id),
            GroupChild::Param(_) => None,
        })
    }

    pub(crate) fn push_param(&mut self, id: ParamId, advanced: bool) {
        self.children.push(ChildEntry {
            child: GroupChild::Param(id),
            advanced,
        });
    }

    pub(crate) fn push_group(&mut self, id: GroupId) {
        self.children.push(ChildEntry {
            child: GroupChild::Group(id),
            advanced: false,
        });
    }

    pub(crate) fn remove_child(&mut self, child: GroupChild) {
        self.children.retain(|entry| entry.child != child);
    }
}
