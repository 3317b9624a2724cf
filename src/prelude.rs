//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types and traits of the kairo crate.
//! Import this module to get access to the core functionality without having
//! to import each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use kairo::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let mut graph = ParamGraph::new();
//! let blur = graph.add_node("blur")?;
//! let root = graph.node(blur).ok_or("missing node")?.root_group();
//!
//! let radius = graph.add_param(root, ParamSpec::new("radius", ParamType::Float))?;
//! graph.set_value(radius, ParamValue::Float(4.0))?;
//!
//! println!("radius = {}", graph.get_value(radius, true)?);
//! # Ok(())
//! # }
//! ```

// The graph and its building blocks
pub use crate::graph::{Connection, ConnectionSpec, ParamGraph, RestoreReport};
pub use crate::group::{GroupChild, ParameterGroup};
pub use crate::node::{Node, NodeRef};
pub use crate::param::{Multiplicity, ParamSpec, Parameter, PinRole};

// Values and typing
pub use crate::value::{ParamType, ParamValue, TypeInfo};

// Ids
pub use crate::id::{ConnectionId, GroupId, NodeId, ParamId};

// The external graph bridge
pub use crate::bridge::{
    BridgeState, ExternalGraphBridge, ForeignRuntime, IntoWorkflow, Precision, ProgressEvent,
    SlotDefinition, SlotDirection, SlotRegistry, WaitControl, WorkflowDefinition,
};
pub use crate::scene::SceneContext;

// Error types
pub use crate::error::{BridgeError, ConnectError, EvalError, GraphError};

// Standard library re-exports commonly used with this crate
pub use std::collections::HashMap;
pub use std::path::Path;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
