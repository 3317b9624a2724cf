//! The parameter cell: a typed, named, dirty-trackable value leaf.

use crate::error::EvalError;
use crate::graph::ParamGraph;
use crate::id::{ConnectionId, GroupId, NodeId, ParamId};
use crate::value::{ParamType, ParamValue, TypeInfo};
use std::fmt;

/// Change function, invoked when a user or the API sets the value directly.
/// Propagation-internal recomputation never fires it.
pub type ChangeFn = Box<dyn FnMut(&mut ParamGraph, ParamId)>;

/// Processing function, invoked lazily on a forced read while dirty. It is
/// expected to write back via [`ParamGraph::set_value_internal`].
pub type ProcessFn = Box<dyn FnMut(&mut ParamGraph, ParamId) -> Result<(), EvalError>>;

/// Command function, invoked exactly once per explicit trigger.
pub type CommandFn = Box<dyn FnMut(&mut ParamGraph, ParamId)>;

/// On-connect / on-disconnect function, invoked on the target parameter with
/// the connection id.
pub type LinkFn = Box<dyn FnMut(&mut ParamGraph, ConnectionId)>;

/// Which direction(s) a parameter can participate in connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    Input,
    Output,
    InputOutput,
}

impl PinRole {
    pub fn can_send(self) -> bool {
        matches!(self, PinRole::Output | PinRole::InputOutput)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, PinRole::Input | PinRole::InputOutput)
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinRole::Input => "input",
            PinRole::Output => "output",
            PinRole::InputOutput => "input-output",
        };
        write!(f, "{}", name)
    }
}

/// How many incoming connections an input tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    #[default]
    ExactlyOne,
    OneOrMore,
}

/// The bound behavior of a parameter, stored as closures instead of the
/// original runtime method-lookup-by-name.
#[derive(Default)]
pub(crate) struct ParamCallbacks {
    pub(crate) on_change: Option<ChangeFn>,
    pub(crate) process: Option<ProcessFn>,
    pub(crate) command: Option<CommandFn>,
    pub(crate) on_connect: Option<LinkFn>,
    pub(crate) on_disconnect: Option<LinkFn>,
}

/// A typed, named value cell; the leaf of the dependency graph.
///
/// Parameters live in the graph arena and are addressed by [`ParamId`].
/// Structural mutation (connections, affection edges, value writes) goes
/// through [`ParamGraph`]; this struct only exposes read accessors.
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) ty: ParamType,
    pub(crate) type_info: Option<TypeInfo>,
    pub(crate) value: ParamValue,
    pub(crate) dirty: bool,
    pub(crate) pin: PinRole,
    pub(crate) multiplicity: Multiplicity,
    pub(crate) self_evaluating: bool,
    pub(crate) choices: Vec<String>,
    pub(crate) node: NodeId,
    pub(crate) group: GroupId,
    pub(crate) incoming: Vec<ConnectionId>,
    pub(crate) outgoing: Vec<ConnectionId>,
    pub(crate) affects: Vec<ParamId>,
    pub(crate) affected_by: Vec<ParamId>,
    pub(crate) callbacks: ParamCallbacks,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.ty
    }

    /// Type descriptor of a generic parameter, if one has been assigned.
    pub fn type_info(&self) -> Option<&TypeInfo> {
        self.type_info.as_ref()
    }

    /// The stored value, without any evaluation. Use
    /// [`ParamGraph::get_value`] for the lazy read path.
    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pin_role(&self) -> PinRole {
        self.pin
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn is_self_evaluating(&self) -> bool {
        self.self_evaluating
    }

    /// Choice labels of an enum parameter; empty for other kinds.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Back-pointer to the owning node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The group this parameter is a direct child of.
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn incoming(&self) -> &[ConnectionId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[ConnectionId] {
        &self.outgoing
    }

    /// Parameters this one declares to affect (dirty-propagation only).
    pub fn affects(&self) -> &[ParamId] {
        &self.affects
    }

    pub fn has_processing_fn(&self) -> bool {
        self.callbacks.process.is_some()
    }

    /// Human-readable type description used in connect diagnostics.
    pub(crate) fn type_label(&self) -> String {
        match (&self.ty, &self.type_info) {
            (ParamType::Generic, Some(info)) => info.to_string(),
            (ParamType::Generic, None) => "generic (untyped)".to_string(),
            (ty, _) => ty.to_string(),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("value", &self.value)
            .field("dirty", &self.dirty)
            .field("pin", &self.pin)
            .finish_non_exhaustive()
    }
}

/// Builder-style description of a parameter about to be added to a group.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub(crate) name: String,
    pub(crate) ty: ParamType,
    pub(crate) type_info: Option<TypeInfo>,
    pub(crate) value: Option<ParamValue>,
    pub(crate) pin: PinRole,
    pub(crate) multiplicity: Multiplicity,
    pub(crate) self_evaluating: bool,
    pub(crate) choices: Vec<String>,
    pub(crate) advanced: bool,
}

impl ParamSpec {
    pub fn new(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            type_info: None,
            value: None,
            pin: PinRole::InputOutput,
            multiplicity: Multiplicity::ExactlyOne,
            self_evaluating: false,
            choices: Vec::new(),
            advanced: false,
        }
    }

    pub fn with_value(mut self, value: ParamValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_pin(mut self, pin: PinRole) -> Self {
        self.pin = pin;
        self
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn with_type_info(mut self, info: TypeInfo) -> Self {
        self.type_info = Some(info);
        self
    }

    pub fn self_evaluating(mut self) -> Self {
        self.self_evaluating = true;
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the parameter as hidden behind the "advanced" toggle in views.
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }
}
