//! Canonical description of a foreign dataflow graph ("workflow").
//!
//! The bridge is format-agnostic: it operates on this canonical model. A
//! JSON description can be loaded directly with
//! [`WorkflowDefinition::from_file`]; custom formats implement
//! [`IntoWorkflow`] as a translation layer.

use crate::error::{BridgeError, WorkflowConversionError};
use crate::value::TypeInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Direction of a foreign slot, mirrored onto the materialized parameter's
/// pin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotDirection {
    Input,
    Output,
}

/// Numeric-precision template type requested for a templated workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float,
    Double,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Float => "float",
            Precision::Double => "double",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One typed input/output port of the foreign graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: String,
    pub direction: SlotDirection,
    /// Declared foreign type, e.g. `CImgList<float>` or a templated base
    /// name like `CImg` completed by the requested precision.
    pub type_name: String,
    /// The slot's type follows the workflow's template precision.
    #[serde(default)]
    pub templated: bool,
    /// Already wired inside the foreign graph; such slots are not exposed.
    #[serde(default)]
    pub connected: bool,
}

impl SlotDefinition {
    /// Resolves the slot's structural type descriptor under the requested
    /// precision. An explicit template suffix in `type_name` wins.
    pub fn effective_type_info(&self, precision: Precision) -> TypeInfo {
        if self.templated && !self.type_name.contains('<') {
            TypeInfo::with_template(&self.type_name, precision.as_str())
        } else {
            TypeInfo::parse(&self.type_name)
        }
    }
}

/// The complete, canonical definition of a foreign workflow, ready for
/// materialization by the bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Plugin name; materialized parameters are named `<name>.<slot>`.
    pub name: String,
    pub slots: Vec<SlotDefinition>,
}

impl WorkflowDefinition {
    /// Loads a JSON workflow description from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<WorkflowDefinition, BridgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BridgeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let definition: WorkflowDefinition = serde_json::from_str(&text)?;
        definition.validate().map_err(BridgeError::Configuration)?;
        Ok(definition)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("workflow name must not be empty".to_string());
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.name.trim().is_empty() {
                return Err(format!("slot #{} has an empty name", i));
            }
            if self.slots[..i].iter().any(|other| other.name == slot.name) {
                return Err(format!("duplicate slot name '{}'", slot.name));
            }
        }
        Ok(())
    }

    /// Slots the bridge exposes: those not wired inside the foreign graph.
    pub fn exposed_slots(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.slots.iter().filter(|slot| !slot.connected)
    }
}

/// A trait for custom workflow description formats that can be converted
/// into the bridge's canonical [`WorkflowDefinition`].
pub trait IntoWorkflow {
    /// Consumes the object and converts it into a canonical workflow.
    fn into_workflow(self) -> Result<WorkflowDefinition, WorkflowConversionError>;
}
