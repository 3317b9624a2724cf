//! The arena-based parameter dependency graph and its evaluation engine.
//!
//! All parameters, groups, nodes and connections live in id-keyed arenas
//! owned by [`ParamGraph`]. Edges are adjacency lists of ids, so tearing a
//! node down is map surgery and never leaves dangling references. The engine
//! is deliberately single-threaded: graph mutation and evaluation are
//! synchronous, and the only concurrency in the crate sits behind the
//! external graph bridge.

use crate::error::{ConnectError, EvalError, GraphError};
use crate::group::{GroupChild, ParameterGroup};
use crate::id::{ConnectionId, GroupId, IdAllocator, NodeId, ParamId};
use crate::node::{Node, NodeRef};
use crate::param::{
    ChangeFn, CommandFn, LinkFn, Multiplicity, ParamSpec, Parameter, ProcessFn,
};
use crate::value::{ParamType, ParamValue, TypeInfo};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A directed, type-checked edge between two parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) source: ParamId,
    pub(crate) target: ParamId,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn source(&self) -> ParamId {
        self.source
    }

    pub fn target(&self) -> ParamId {
        self.target
    }
}

/// External representation of a connection, as persisted by the scene file:
/// a 4-tuple of node names and dotted parameter paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub source_node: String,
    pub source_param: String,
    pub target_node: String,
    pub target_param: String,
}

/// Outcome of restoring persisted connection tuples. Unresolvable or refused
/// tuples are dropped with a warning, never a hard failure.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<ConnectionId>,
    pub skipped: Vec<(ConnectionSpec, String)>,
}

/// The parameter dependency graph: arenas, edges, and the lazy evaluator.
#[derive(Default)]
pub struct ParamGraph {
    nodes: AHashMap<NodeId, Node>,
    groups: AHashMap<GroupId, ParameterGroup>,
    params: AHashMap<ParamId, Parameter>,
    connections: AHashMap<ConnectionId, Connection>,
    node_names: AHashMap<String, NodeId>,
    node_ids: IdAllocator,
    group_ids: IdAllocator,
    param_ids: IdAllocator,
    connection_ids: IdAllocator,
}

impl ParamGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Nodes ---

    /// Creates a node with the given scene-unique name and an empty root
    /// group of the same name.
    pub fn add_node(&mut self, name: &str) -> Result<NodeId, GraphError> {
        if self.node_names.contains_key(name) {
            return Err(GraphError::DuplicateNodeName(name.to_string()));
        }
        let node_id = NodeId(self.node_ids.next());
        let group_id = GroupId(self.group_ids.next());
        self.groups.insert(
            group_id,
            ParameterGroup {
                name: name.to_string(),
                node: node_id,
                parent: None,
                children: Vec::new(),
            },
        );
        self.nodes.insert(
            node_id,
            Node {
                name: name.to_string(),
                root: group_id,
                time_param: None,
                range_params: None,
            },
        );
        self.node_names.insert(name.to_string(), node_id);
        Ok(node_id)
    }

    /// Deletes a node, first tearing down every connection and affection edge
    /// that touches any parameter in its tree.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        let root = node.root;
        let name = node.name.clone();

        let (group_tree, param_tree) = self.collect_tree(root);
        for pid in param_tree {
            // Params may already be gone if a callback removed them.
            if self.params.contains_key(&pid) {
                self.remove_param(pid)?;
            }
        }
        for gid in group_tree {
            self.groups.remove(&gid);
        }
        self.node_names.remove(&name);
        self.nodes.remove(&id);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    /// All nodes in the scene, in name order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.nodes
            .iter()
            .map(|(id, node)| NodeRef {
                id: *id,
                name: node.name.clone(),
            })
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }

    // --- Groups ---

    /// Creates a nested group under `parent`. Child names must be unique
    /// among the parent's direct children.
    pub fn add_group(&mut self, parent: GroupId, name: &str) -> Result<GroupId, GraphError> {
        let node = {
            let group = self
                .groups
                .get(&parent)
                .ok_or(GraphError::UnknownGroup(parent))?;
            if self.child_name_taken(group, name) {
                return Err(GraphError::DuplicateChildName {
                    group: group.name.clone(),
                    name: name.to_string(),
                });
            }
            group.node
        };
        let id = GroupId(self.group_ids.next());
        self.groups.insert(
            id,
            ParameterGroup {
                name: name.to_string(),
                node,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(group) = self.groups.get_mut(&parent) {
            group.push_group(id);
        }
        Ok(id)
    }

    pub fn group(&self, id: GroupId) -> Option<&ParameterGroup> {
        self.groups.get(&id)
    }

    // --- Parameters ---

    /// Materializes a parameter in `group` from its spec.
    pub fn add_param(&mut self, group: GroupId, spec: ParamSpec) -> Result<ParamId, GraphError> {
        let node = {
            let owner = self
                .groups
                .get(&group)
                .ok_or(GraphError::UnknownGroup(group))?;
            if self.child_name_taken(owner, &spec.name) {
                return Err(GraphError::DuplicateChildName {
                    group: owner.name.clone(),
                    name: spec.name,
                });
            }
            owner.node
        };
        let id = ParamId(self.param_ids.next());
        let value = spec.value.unwrap_or_else(|| spec.ty.default_value());
        self.params.insert(
            id,
            Parameter {
                name: spec.name,
                ty: spec.ty,
                type_info: spec.type_info,
                value,
                dirty: false,
                pin: spec.pin,
                multiplicity: spec.multiplicity,
                self_evaluating: spec.self_evaluating,
                choices: spec.choices,
                node,
                group,
                incoming: Vec::new(),
                outgoing: Vec::new(),
                affects: Vec::new(),
                affected_by: Vec::new(),
                callbacks: Default::default(),
            },
        );
        if let Some(owner) = self.groups.get_mut(&group) {
            owner.push_param(id, spec.advanced);
        }
        Ok(id)
    }

    /// Removes a parameter, severing every connection and affection edge that
    /// references it.
    pub fn remove_param(&mut self, id: ParamId) -> Result<(), GraphError> {
        let (incoming, outgoing, affects, affected_by, group) = {
            let p = self
                .params
                .get(&id)
                .ok_or(GraphError::UnknownParamId(id))?;
            (
                p.incoming.clone(),
                p.outgoing.clone(),
                p.affects.clone(),
                p.affected_by.clone(),
                p.group,
            )
        };
        for cid in incoming.into_iter().chain(outgoing) {
            if self.connections.contains_key(&cid) {
                self.disconnect(cid)?;
            }
        }
        for dst in affects {
            if let Some(peer) = self.params.get_mut(&dst) {
                peer.affected_by.retain(|pid| *pid != id);
            }
        }
        for src in affected_by {
            if let Some(peer) = self.params.get_mut(&src) {
                peer.affects.retain(|pid| *pid != id);
            }
        }
        if let Some(owner) = self.groups.get_mut(&group) {
            owner.remove_child(GroupChild::Param(id));
        }
        self.params.remove(&id);
        Ok(())
    }

    pub fn param(&self, id: ParamId) -> Option<&Parameter> {
        self.params.get(&id)
    }

    /// Resolves a parameter by its dotted path relative to the node's root
    /// group. A direct child whose name contains dots (bridge parameters are
    /// named `<plugin>.<slot>`) is matched before the path is split.
    pub fn find_param(&self, node: NodeId, path: &str) -> Option<ParamId> {
        let root = self.nodes.get(&node)?.root;
        if let Some(id) = self.child_param_by_name(root, path) {
            return Some(id);
        }
        let mut segments = path.split('.').collect::<Vec<_>>();
        let last = segments.pop()?;
        let mut group = root;
        for segment in segments {
            group = self.child_group_by_name(group, segment)?;
        }
        self.child_param_by_name(group, last)
    }

    /// Dotted path of a parameter relative to its node's root group.
    pub fn param_path(&self, id: ParamId) -> Option<String> {
        let param = self.params.get(&id)?;
        let mut segments = vec![param.name.clone()];
        let mut group = param.group;
        while let Some(g) = self.groups.get(&group) {
            match g.parent {
                Some(parent) => {
                    segments.push(g.name.clone());
                    group = parent;
                }
                None => break,
            }
        }
        Some(segments.iter().rev().join("."))
    }

    /// Every parameter of a node's tree, in interface order.
    pub fn params_of(&self, node: NodeId) -> Vec<ParamId> {
        let Some(n) = self.nodes.get(&node) else {
            return Vec::new();
        };
        let (_, params) = self.collect_tree(n.root);
        params
    }

    /// Reassigns the type-info descriptor of a generic parameter. Type tags
    /// of all other kinds are immutable.
    pub fn set_type_info(&mut self, id: ParamId, info: TypeInfo) -> Result<(), GraphError> {
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        if p.ty == ParamType::Generic {
            p.type_info = Some(info);
        }
        Ok(())
    }

    // --- Callback binding ---

    pub fn set_change_fn(&mut self, id: ParamId, f: ChangeFn) -> Result<(), GraphError> {
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        p.callbacks.on_change = Some(f);
        Ok(())
    }

    pub fn set_processing_fn(&mut self, id: ParamId, f: ProcessFn) -> Result<(), GraphError> {
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        p.callbacks.process = Some(f);
        Ok(())
    }

    pub fn set_command_fn(&mut self, id: ParamId, f: CommandFn) -> Result<(), GraphError> {
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        p.callbacks.command = Some(f);
        Ok(())
    }

    pub fn set_on_connect(&mut self, id: ParamId, f: LinkFn) -> Result<(), GraphError> {
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        p.callbacks.on_connect = Some(f);
        Ok(())
    }

    pub fn set_on_disconnect(&mut self, id: ParamId, f: LinkFn) -> Result<(), GraphError> {
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        p.callbacks.on_disconnect = Some(f);
        Ok(())
    }

    // --- Connections ---

    /// Creates a directed connection after validating pin roles, type
    /// compatibility, target multiplicity and acyclicity. On success the
    /// source value is copied into the target, the target is dirtied, and
    /// its on-connect function fires with the new connection id. On failure
    /// the graph is unchanged.
    pub fn connect(
        &mut self,
        source: ParamId,
        target: ParamId,
    ) -> Result<ConnectionId, ConnectError> {
        if let Err(err) = self.validate_connection(source, target) {
            warn!("connection refused: {}", err);
            return Err(err);
        }
        let id = ConnectionId(self.connection_ids.next());
        self.connections.insert(id, Connection { id, source, target });
        if let Some(p) = self.params.get_mut(&source) {
            p.outgoing.push(id);
        }
        if let Some(p) = self.params.get_mut(&target) {
            p.incoming.push(id);
        }
        debug!("connected {} -> {} as {}", source, target, id);

        self.refresh_target_value(target);
        if let Some(p) = self.params.get_mut(&target) {
            p.dirty = true;
        }
        self.propagate_dirty(target);

        let f = self
            .params
            .get_mut(&target)
            .and_then(|p| p.callbacks.on_connect.take());
        if let Some(mut f) = f {
            f(self, id);
            if let Some(p) = self.params.get_mut(&target) {
                if p.callbacks.on_connect.is_none() {
                    p.callbacks.on_connect = Some(f);
                }
            }
        }
        Ok(id)
    }

    fn validate_connection(&self, source: ParamId, target: ParamId) -> Result<(), ConnectError> {
        let src = self
            .params
            .get(&source)
            .ok_or(ConnectError::UnknownParameter(source))?;
        let tgt = self
            .params
            .get(&target)
            .ok_or(ConnectError::UnknownParameter(target))?;

        if !src.pin.can_send() || !tgt.pin.can_receive() || !src.ty.is_connectable() {
            return Err(ConnectError::RoleMismatch {
                source_name: src.name.clone(),
                source_role: src.pin.to_string(),
                target_name: tgt.name.clone(),
                target_role: tgt.pin.to_string(),
            });
        }
        if !Self::types_compatible(src, tgt) {
            return Err(ConnectError::IncompatibleType {
                source_name: src.name.clone(),
                source_type: src.type_label(),
                target_name: tgt.name.clone(),
                target_type: tgt.type_label(),
            });
        }
        if tgt.multiplicity == Multiplicity::ExactlyOne && !tgt.incoming.is_empty() {
            return Err(ConnectError::Multiplicity {
                target_name: tgt.name.clone(),
            });
        }
        // A new source -> target edge closes a cycle iff the source is
        // already reachable from the target.
        if source == target || self.reaches(target, source) {
            return Err(ConnectError::DependencyCycle {
                source_name: src.name.clone(),
                target_name: tgt.name.clone(),
            });
        }
        Ok(())
    }

    /// Generic parameters compare their structural type descriptors; a
    /// generic whose descriptor names a native kind (e.g. `float`) is
    /// compatible with a native parameter of that kind.
    fn types_compatible(src: &Parameter, tgt: &Parameter) -> bool {
        match (src.ty == ParamType::Generic, tgt.ty == ParamType::Generic) {
            (false, false) => src.ty == tgt.ty,
            (true, true) => match (&src.type_info, &tgt.type_info) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            (true, false) => {
                src.type_info.as_ref() == Some(&TypeInfo::parse(&tgt.ty.to_string()))
            }
            (false, true) => {
                tgt.type_info.as_ref() == Some(&TypeInfo::parse(&src.ty.to_string()))
            }
        }
    }

    /// Removes a connection symmetrically from both endpoints, dirties the
    /// former target and fires its on-disconnect function with the id.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        let conn = self
            .connections
            .remove(&id)
            .ok_or(GraphError::UnknownConnection(id))?;
        if let Some(p) = self.params.get_mut(&conn.source) {
            p.outgoing.retain(|cid| *cid != id);
        }
        if let Some(p) = self.params.get_mut(&conn.target) {
            p.incoming.retain(|cid| *cid != id);
        }
        debug!("disconnected {} ({} -> {})", id, conn.source, conn.target);

        self.refresh_target_value(conn.target);
        if let Some(p) = self.params.get_mut(&conn.target) {
            p.dirty = true;
        }
        self.propagate_dirty(conn.target);

        let f = self
            .params
            .get_mut(&conn.target)
            .and_then(|p| p.callbacks.on_disconnect.take());
        if let Some(mut f) = f {
            f(self, id);
            if let Some(p) = self.params.get_mut(&conn.target) {
                if p.callbacks.on_disconnect.is_none() {
                    p.callbacks.on_disconnect = Some(f);
                }
            }
        }
        Ok(())
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // --- Affection edges ---

    /// Declares that `source` affects `dependent` for dirty propagation.
    /// Independent of connections; refused if it would close a cycle.
    pub fn declare_affects(
        &mut self,
        source: ParamId,
        dependent: ParamId,
    ) -> Result<(), ConnectError> {
        let src_name = self
            .params
            .get(&source)
            .ok_or(ConnectError::UnknownParameter(source))?
            .name
            .clone();
        let dst_name = self
            .params
            .get(&dependent)
            .ok_or(ConnectError::UnknownParameter(dependent))?
            .name
            .clone();
        if source == dependent || self.reaches(dependent, source) {
            let err = ConnectError::DependencyCycle {
                source_name: src_name,
                target_name: dst_name,
            };
            warn!("affection edge refused: {}", err);
            return Err(err);
        }
        let src = self
            .params
            .get_mut(&source)
            .ok_or(ConnectError::UnknownParameter(source))?;
        if !src.affects.contains(&dependent) {
            src.affects.push(dependent);
        }
        if let Some(dst) = self.params.get_mut(&dependent) {
            if !dst.affected_by.contains(&source) {
                dst.affected_by.push(source);
            }
        }
        Ok(())
    }

    /// Removes a declared affection edge; a no-op if it does not exist.
    pub fn remove_affects(&mut self, source: ParamId, dependent: ParamId) {
        if let Some(src) = self.params.get_mut(&source) {
            src.affects.retain(|pid| *pid != dependent);
        }
        if let Some(dst) = self.params.get_mut(&dependent) {
            dst.affected_by.retain(|pid| *pid != source);
        }
    }

    /// BFS reachability over the union of connection and affection edges.
    fn reaches(&self, from: ParamId, to: ParamId) -> bool {
        let mut visited = AHashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(pid) = queue.pop_front() {
            if pid == to {
                return true;
            }
            if !visited.insert(pid) {
                continue;
            }
            if let Some(p) = self.params.get(&pid) {
                for cid in &p.outgoing {
                    if let Some(conn) = self.connections.get(cid) {
                        queue.push_back(conn.target);
                    }
                }
                for dep in &p.affects {
                    queue.push_back(*dep);
                }
            }
        }
        false
    }

    // --- Values & evaluation ---

    /// Externally-initiated value write: stores the value, marks the
    /// parameter dirty, fires its change function, propagates dirtiness
    /// along connection and affection edges, then proactively force-reads
    /// any self-evaluating parameters the propagation dirtied.
    pub fn set_value(&mut self, id: ParamId, value: ParamValue) -> Result<(), EvalError> {
        self.write_value(id, value, true)
    }

    /// Propagation-internal value write, used by processing functions and
    /// connection delivery. Identical to [`set_value`](Self::set_value)
    /// except that the change function does not fire and self-evaluating
    /// parameters are not proactively refreshed.
    pub fn set_value_internal(&mut self, id: ParamId, value: ParamValue) -> Result<(), EvalError> {
        self.write_value(id, value, false)
    }

    fn write_value(
        &mut self,
        id: ParamId,
        value: ParamValue,
        external: bool,
    ) -> Result<(), EvalError> {
        {
            let p = self
                .params
                .get_mut(&id)
                .ok_or(GraphError::UnknownParamId(id))?;
            p.value = value;
            p.dirty = true;
        }
        if external {
            let f = self
                .params
                .get_mut(&id)
                .and_then(|p| p.callbacks.on_change.take());
            if let Some(mut f) = f {
                f(self, id);
                if let Some(p) = self.params.get_mut(&id) {
                    if p.callbacks.on_change.is_none() {
                        p.callbacks.on_change = Some(f);
                    }
                }
            }
        }
        let refresh = self.propagate_dirty(id);
        if external {
            for pid in refresh {
                self.get_value(pid, true)?;
            }
        }
        Ok(())
    }

    /// The pull-based lazy read path.
    ///
    /// A non-forcing read never invokes processing. A forced read of a dirty
    /// parameter invokes its processing function exactly once, then clears
    /// the dirty flag. A dirty parameter without a processing function has no
    /// recomputation rule; its stored value is returned as-is.
    pub fn get_value(&mut self, id: ParamId, force: bool) -> Result<ParamValue, EvalError> {
        {
            let p = self
                .params
                .get(&id)
                .ok_or(GraphError::UnknownParamId(id))?;
            if !(force && p.dirty) {
                return Ok(p.value.clone());
            }
        }
        let process = self
            .params
            .get_mut(&id)
            .and_then(|p| p.callbacks.process.take());
        if let Some(mut f) = process {
            let result = f(self, id);
            if let Some(p) = self.params.get_mut(&id) {
                if p.callbacks.process.is_none() {
                    p.callbacks.process = Some(f);
                }
            }
            result?;
        }
        let p = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParamId(id))?;
        p.dirty = false;
        Ok(p.value.clone())
    }

    /// Invokes a command parameter's bound function exactly once. Commands
    /// carry no persistent value and no dirty-propagation semantics; any side
    /// effects must be explicit value writes inside the function.
    pub fn trigger(&mut self, id: ParamId) -> Result<(), GraphError> {
        if !self.params.contains_key(&id) {
            return Err(GraphError::UnknownParamId(id));
        }
        let f = self
            .params
            .get_mut(&id)
            .and_then(|p| p.callbacks.command.take());
        if let Some(mut f) = f {
            f(self, id);
            if let Some(p) = self.params.get_mut(&id) {
                if p.callbacks.command.is_none() {
                    p.callbacks.command = Some(f);
                }
            }
        }
        Ok(())
    }

    /// Bounded propagation: value copies travel along every reachable
    /// connection edge, dirtiness along connection and affection edges.
    /// Each parameter is visited at most once per call, which is the
    /// termination guarantee. Returns the self-evaluating parameters that
    /// were dirtied, in visit order.
    fn propagate_dirty(&mut self, origin: ParamId) -> Vec<ParamId> {
        let mut visited = AHashSet::new();
        visited.insert(origin);
        let mut queue = VecDeque::from([origin]);
        let mut refresh = Vec::new();
        while let Some(pid) = queue.pop_front() {
            let outgoing = self
                .params
                .get(&pid)
                .map(|p| p.outgoing.clone())
                .unwrap_or_default();
            for cid in outgoing {
                let Some(conn) = self.connections.get(&cid) else {
                    continue;
                };
                let target = conn.target;
                self.refresh_target_value(target);
                self.mark_dirty(target, &mut visited, &mut queue, &mut refresh);
            }
            let affects = self
                .params
                .get(&pid)
                .map(|p| p.affects.clone())
                .unwrap_or_default();
            for dep in affects {
                self.mark_dirty(dep, &mut visited, &mut queue, &mut refresh);
            }
        }
        refresh
    }

    fn mark_dirty(
        &mut self,
        id: ParamId,
        visited: &mut AHashSet<ParamId>,
        queue: &mut VecDeque<ParamId>,
        refresh: &mut Vec<ParamId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        if let Some(p) = self.params.get_mut(&id) {
            p.dirty = true;
            if p.self_evaluating {
                refresh.push(id);
            }
            queue.push_back(id);
        }
    }

    /// Recomputes a target's delivered value from its incoming connections:
    /// one connection copies the source value, several build a list in
    /// connection-id order. With no incoming connection the last stored
    /// value is retained.
    fn refresh_target_value(&mut self, target: ParamId) {
        let incoming = match self.params.get(&target) {
            Some(p) => p.incoming.clone(),
            None => return,
        };
        let sources: Vec<ParamValue> = incoming
            .iter()
            .sorted()
            .filter_map(|cid| self.connections.get(cid))
            .filter_map(|conn| self.params.get(&conn.source))
            .map(|src| src.value.clone())
            .collect();
        let new_value = match sources.len() {
            0 => None,
            1 => sources.into_iter().next(),
            _ => Some(ParamValue::List(sources)),
        };
        if let (Some(v), Some(p)) = (new_value, self.params.get_mut(&target)) {
            p.value = v;
        }
    }

    // --- Time & self-evaluation ---

    /// Binds a node's time parameter for frame-driven refresh.
    pub fn bind_time_param(&mut self, node: NodeId, param: ParamId) -> Result<(), GraphError> {
        self.check_owned(node, param)?;
        if let Some(n) = self.nodes.get_mut(&node) {
            n.time_param = Some(param);
        }
        Ok(())
    }

    /// Binds a node's start/end frame-range parameters.
    pub fn bind_range_params(
        &mut self,
        node: NodeId,
        start: ParamId,
        end: ParamId,
    ) -> Result<(), GraphError> {
        self.check_owned(node, start)?;
        self.check_owned(node, end)?;
        if let Some(n) = self.nodes.get_mut(&node) {
            n.range_params = Some((start, end));
        }
        Ok(())
    }

    /// Drives a node's bound time parameter and force-reads every
    /// self-evaluating parameter of its tree, so time-driven nodes stay
    /// current without any consumer polling them.
    pub fn set_frame(&mut self, node: NodeId, frame: f64) -> Result<(), EvalError> {
        let time_param = self
            .nodes
            .get(&node)
            .ok_or(GraphError::UnknownNode(node))?
            .time_param
            .ok_or_else(|| GraphError::UnknownParameter {
                node: self.node_name(node),
                path: "time".to_string(),
            })?;
        self.set_value(time_param, ParamValue::Float(frame))?;
        self.refresh_node(node)
    }

    /// Force-reads every self-evaluating parameter of a node's tree.
    pub fn refresh_node(&mut self, node: NodeId) -> Result<(), EvalError> {
        let to_refresh: Vec<ParamId> = self
            .params_of(node)
            .into_iter()
            .filter(|pid| {
                self.params
                    .get(pid)
                    .map(|p| p.self_evaluating)
                    .unwrap_or(false)
            })
            .collect();
        for pid in to_refresh {
            self.get_value(pid, true)?;
        }
        Ok(())
    }

    fn check_owned(&self, node: NodeId, param: ParamId) -> Result<(), GraphError> {
        let p = self
            .params
            .get(&param)
            .ok_or(GraphError::UnknownParamId(param))?;
        if p.node != node {
            return Err(GraphError::UnknownParameter {
                node: self.node_name(node),
                path: p.name.clone(),
            });
        }
        Ok(())
    }

    // --- Persistence support ---

    /// Walks live connections into their external 4-tuple representation,
    /// in connection-id order.
    pub fn export_connections(&self) -> Vec<ConnectionSpec> {
        self.connections
            .values()
            .sorted_by_key(|conn| conn.id)
            .filter_map(|conn| self.spec_for(conn))
            .collect()
    }

    pub(crate) fn spec_for(&self, conn: &Connection) -> Option<ConnectionSpec> {
        let src = self.params.get(&conn.source)?;
        let tgt = self.params.get(&conn.target)?;
        Some(ConnectionSpec {
            source_node: self.node_name(src.node),
            source_param: self.param_path(conn.source)?,
            target_node: self.node_name(tgt.node),
            target_param: self.param_path(conn.target)?,
        })
    }

    /// Resolves persisted tuples back into live connections. Tuples whose
    /// endpoints no longer exist, or whose connection attempt is refused,
    /// are skipped with a warning and reported, never escalated.
    pub fn restore_connections(&mut self, specs: &[ConnectionSpec]) -> RestoreReport {
        let mut report = RestoreReport::default();
        for spec in specs {
            match self.resolve_spec(spec) {
                Ok((source, target)) => match self.connect(source, target) {
                    Ok(id) => report.restored.push(id),
                    Err(err) => {
                        warn!(
                            "persisted connection {}.{} -> {}.{} dropped: {}",
                            spec.source_node,
                            spec.source_param,
                            spec.target_node,
                            spec.target_param,
                            err
                        );
                        report.skipped.push((spec.clone(), err.to_string()));
                    }
                },
                Err(err) => {
                    warn!(
                        "persisted connection {}.{} -> {}.{} dropped: {}",
                        spec.source_node,
                        spec.source_param,
                        spec.target_node,
                        spec.target_param,
                        err
                    );
                    report.skipped.push((spec.clone(), err.to_string()));
                }
            }
        }
        report
    }

    fn resolve_spec(&self, spec: &ConnectionSpec) -> Result<(ParamId, ParamId), GraphError> {
        let source_node = self
            .node_id(&spec.source_node)
            .ok_or_else(|| GraphError::MissingEndpoint {
                node: spec.source_node.clone(),
                param: spec.source_param.clone(),
            })?;
        let target_node = self
            .node_id(&spec.target_node)
            .ok_or_else(|| GraphError::MissingEndpoint {
                node: spec.target_node.clone(),
                param: spec.target_param.clone(),
            })?;
        let source = self
            .find_param(source_node, &spec.source_param)
            .ok_or_else(|| GraphError::MissingEndpoint {
                node: spec.source_node.clone(),
                param: spec.source_param.clone(),
            })?;
        let target = self
            .find_param(target_node, &spec.target_param)
            .ok_or_else(|| GraphError::MissingEndpoint {
                node: spec.target_node.clone(),
                param: spec.target_param.clone(),
            })?;
        Ok((source, target))
    }

    // --- Internals ---

    fn node_name(&self, id: NodeId) -> String {
        self.nodes
            .get(&id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| format!("{}", id))
    }

    fn child_name_taken(&self, group: &ParameterGroup, name: &str) -> bool {
        group.children.iter().any(|entry| match entry.child {
            GroupChild::Param(id) => self.params.get(&id).is_some_and(|p| p.name == name),
            GroupChild::Group(id) => self.groups.get(&id).is_some_and(|g| g.name == name),
        })
    }

    fn child_param_by_name(&self, group: GroupId, name: &str) -> Option<ParamId> {
        self.groups.get(&group)?.params().find(|id| {
            self.params
                .get(id)
                .is_some_and(|p| p.name == name)
        })
    }

    fn child_group_by_name(&self, group: GroupId, name: &str) -> Option<GroupId> {
        self.groups.get(&group)?.groups().find(|id| {
            self.groups
                .get(id)
                .is_some_and(|g| g.name == name)
        })
    }

    /// Depth-first collection of a group tree's groups and parameters.
    fn collect_tree(&self, root: GroupId) -> (Vec<GroupId>, Vec<ParamId>) {
        let mut groups = Vec::new();
        let mut params = Vec::new();
        let mut stack = vec![root];
        while let Some(gid) = stack.pop() {
            groups.push(gid);
            if let Some(group) = self.groups.get(&gid) {
                for entry in &group.children {
                    match entry.child {
                        GroupChild::Param(pid) => params.push(pid),
                        GroupChild::Group(child) => stack.push(child),
                    }
                }
            }
        }
        (groups, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::PinRole;

    fn graph_with_pair() -> (ParamGraph, ParamId, ParamId) {
        let mut graph = ParamGraph::new();
        let node = graph.add_node("pair").unwrap();
        let root = graph.node(node).unwrap().root_group();
        let a = graph
            .add_param(root, ParamSpec::new("a", ParamType::Float).with_pin(PinRole::Output))
            .unwrap();
        let b = graph
            .add_param(root, ParamSpec::new("b", ParamType::Float).with_pin(PinRole::Input))
            .unwrap();
        (graph, a, b)
    }

    #[test]
    fn cycle_refused_at_connect_time() {
        let mut graph = ParamGraph::new();
        let node = graph.add_node("n").unwrap();
        let root = graph.node(node).unwrap().root_group();
        let a = graph
            .add_param(root, ParamSpec::new("a", ParamType::Float))
            .unwrap();
        let b = graph
            .add_param(root, ParamSpec::new("b", ParamType::Float))
            .unwrap();
        graph.connect(a, b).unwrap();
        let err = graph.connect(b, a).unwrap_err();
        assert!(matches!(err, ConnectError::DependencyCycle { .. }));
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn affection_cycle_refused() {
        let (mut graph, a, b) = graph_with_pair();
        graph.declare_affects(a, b).unwrap();
        let err = graph.declare_affects(b, a).unwrap_err();
        assert!(matches!(err, ConnectError::DependencyCycle { .. }));
    }

    #[test]
    fn dotted_path_resolution() {
        let mut graph = ParamGraph::new();
        let node = graph.add_node("x").unwrap();
        let root = graph.node(node).unwrap().root_group();
        let inner = graph.add_group(root, "transform").unwrap();
        let p = graph
            .add_param(inner, ParamSpec::new("scale", ParamType::Float))
            .unwrap();
        assert_eq!(graph.find_param(node, "transform.scale"), Some(p));
        assert_eq!(graph.param_path(p).as_deref(), Some("transform.scale"));
    }

    #[test]
    fn direct_child_with_dotted_name_wins() {
        let mut graph = ParamGraph::new();
        let node = graph.add_node("bridge").unwrap();
        let root = graph.node(node).unwrap().root_group();
        let p = graph
            .add_param(root, ParamSpec::new("plugin.Images In", ParamType::Generic))
            .unwrap();
        assert_eq!(graph.find_param(node, "plugin.Images In"), Some(p));
    }
}
