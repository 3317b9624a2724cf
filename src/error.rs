use crate::id::{ConnectionId, GroupId, NodeId, ParamId};
use thiserror::Error;

/// Errors that can occur when creating a connection or affection edge.
///
/// Every variant is recoverable: the attempt is refused and the graph is left
/// exactly as it was. Callers at the GUI boundary are expected to report the
/// message and move on, never to unwind.
#[derive(Error, Debug, Clone)]
pub enum ConnectError {
    #[error(
        "type mismatch: source '{source_name}' carries {source_type}, target '{target_name}' expects {target_type}"
    )]
    IncompatibleType {
        source_name: String,
        source_type: String,
        target_name: String,
        target_type: String,
    },

    #[error("input '{target_name}' accepts exactly one connection and already has one")]
    Multiplicity { target_name: String },

    #[error(
        "pin roles forbid this edge: '{source_name}' ({source_role}) -> '{target_name}' ({target_role})"
    )]
    RoleMismatch {
        source_name: String,
        source_role: String,
        target_name: String,
        target_role: String,
    },

    #[error("connecting '{source_name}' to '{target_name}' would close a dependency cycle")]
    DependencyCycle {
        source_name: String,
        target_name: String,
    },

    #[error("unknown parameter id {0}")]
    UnknownParameter(ParamId),
}

/// Errors raised by graph lookup and structural mutation.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),

    #[error("unknown group id {0}")]
    UnknownGroup(GroupId),

    #[error("node '{node}' has no parameter at path '{path}'")]
    UnknownParameter { node: String, path: String },

    #[error("unknown parameter id {0}")]
    UnknownParamId(ParamId),

    #[error("unknown connection id {0}")]
    UnknownConnection(ConnectionId),

    #[error("a node named '{0}' already exists in the scene")]
    DuplicateNodeName(String),

    #[error("group '{group}' already has a child named '{name}'")]
    DuplicateChildName { group: String, name: String },

    #[error("persisted connection endpoint '{node}.{param}' cannot be resolved")]
    MissingEndpoint { node: String, param: String },
}

/// Errors that can occur during lazy re-evaluation of a parameter.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Reported by processing functions that cannot recompute their
    /// parameter; the dirty flag stays set so the next forced read retries.
    #[error("processing function for parameter '{param}' failed: {message}")]
    ProcessingFailed { param: String, message: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Errors raised by the external graph bridge.
///
/// `Configuration`-class failures leave the bridge `Unloaded`/`Error` with no
/// materialized parameters; execution failures return the bridge to `Loaded`
/// with the requested output values undefined until a successful re-run.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("workflow configuration error: {0}")]
    Configuration(String),

    #[error("failed to read workflow description '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bridge is not loaded")]
    NotLoaded,

    #[error("foreign graph has no slot named '{0}'")]
    SlotNotFound(String),

    #[error("foreign graph execution failed: {message}")]
    Execution { message: String },

    #[error("foreign graph execution was cancelled")]
    Cancelled,
}

/// Errors that can occur when converting a custom user format into a
/// [`WorkflowDefinition`](crate::bridge::WorkflowDefinition).
#[derive(Error, Debug, Clone)]
pub enum WorkflowConversionError {
    #[error("invalid workflow data: {0}")]
    ValidationError(String),
}
