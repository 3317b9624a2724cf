//! The seam between the bridge and a concrete foreign-graph engine.

use crate::error::BridgeError;
use crate::value::ParamValue;

use super::executor::ExecutionContext;
use super::workflow::{Precision, WorkflowDefinition};

/// A loaded foreign graph the bridge can drive.
///
/// Implementations wrap whatever engine actually evaluates the foreign
/// graph; the bridge only needs typed slot access and a blocking `execute`.
/// The trait is `Send` because execution happens on a worker thread while
/// the host keeps pumping its own loop.
pub trait ForeignRuntime: Send {
    /// The canonical workflow this runtime was loaded from.
    fn definition(&self) -> &WorkflowDefinition;

    /// Switches the numeric precision of templated slots. Rejected by
    /// runtimes whose graph was compiled for a fixed precision.
    fn set_precision(&mut self, precision: Precision) -> Result<(), BridgeError>;

    /// Wires a foreign output slot into an input slot of this graph, so the
    /// engine moves the data itself instead of copying values through the
    /// host. The output may belong to another workflow running on the same
    /// engine.
    fn bind_slots(&mut self, output: &str, input: &str) -> Result<(), BridgeError>;

    fn unbind_slots(&mut self, output: &str, input: &str) -> Result<(), BridgeError>;

    /// Stages a value on an input slot before execution.
    fn write_input(&mut self, slot: &str, value: &ParamValue) -> Result<(), BridgeError>;

    /// Reads an output slot after a completed execution.
    fn read_output(&self, slot: &str) -> Result<ParamValue, BridgeError>;

    /// Runs the foreign graph to completion. Called on a worker thread;
    /// implementations should poll [`ExecutionContext::is_cancelled`]
    /// between work items and report progress through the context.
    fn execute(&mut self, ctx: &ExecutionContext) -> Result<(), BridgeError>;
}
