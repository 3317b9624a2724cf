//! Common test utilities: scene builders and a scripted foreign runtime.
use kairo::bridge::{
    ExecutionContext, ForeignRuntime, Precision, SlotDefinition, SlotDirection, WorkflowDefinition,
};
use kairo::error::BridgeError;
use kairo::graph::ParamGraph;
use kairo::id::{GroupId, NodeId, ParamId};
use kairo::param::{ParamSpec, PinRole};
use kairo::value::{ParamType, ParamValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Routes `log` output to the test harness; safe to call repeatedly.
#[allow(dead_code)]
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a node and returns it together with its root group.
#[allow(dead_code)]
pub fn scene_node(graph: &mut ParamGraph, name: &str) -> (NodeId, GroupId) {
    let node = graph.add_node(name).unwrap();
    let root = graph.node(node).unwrap().root_group();
    (node, root)
}

#[allow(dead_code)]
pub fn float_out(graph: &mut ParamGraph, root: GroupId, name: &str) -> ParamId {
    graph
        .add_param(
            root,
            ParamSpec::new(name, ParamType::Float).with_pin(PinRole::Output),
        )
        .unwrap()
}

#[allow(dead_code)]
pub fn float_in(graph: &mut ParamGraph, root: GroupId, name: &str) -> ParamId {
    graph
        .add_param(
            root,
            ParamSpec::new(name, ParamType::Float).with_pin(PinRole::Input),
        )
        .unwrap()
}

/// A workflow with one templated image-list input and output, as an
/// image-processing plugin would expose.
#[allow(dead_code)]
pub fn image_workflow(plugin: &str) -> WorkflowDefinition {
    WorkflowDefinition {
        name: plugin.to_string(),
        slots: vec![
            SlotDefinition {
                name: "Images In".to_string(),
                direction: SlotDirection::Input,
                type_name: "CImgList".to_string(),
                templated: true,
                connected: false,
            },
            SlotDefinition {
                name: "Images Out".to_string(),
                direction: SlotDirection::Output,
                type_name: "CImgList".to_string(),
                templated: true,
                connected: false,
            },
        ],
    }
}

/// A workflow with two float inputs and two outputs; its slots carry a
/// native kind name, so native float parameters can feed them directly.
#[allow(dead_code)]
pub fn math_workflow(plugin: &str) -> WorkflowDefinition {
    let slot = |name: &str, direction| SlotDefinition {
        name: name.to_string(),
        direction,
        type_name: "float".to_string(),
        templated: false,
        connected: false,
    };
    WorkflowDefinition {
        name: plugin.to_string(),
        slots: vec![
            slot("A", SlotDirection::Input),
            slot("B", SlotDirection::Input),
            slot("Sum", SlotDirection::Output),
            slot("Copy", SlotDirection::Output),
        ],
    }
}

/// A scripted [`ForeignRuntime`]: every execution copies the staged input
/// values onto every output slot and bumps a shared run counter. Can be told
/// to fail or to spin until cancelled.
pub struct MockRuntime {
    definition: WorkflowDefinition,
    inputs: HashMap<String, ParamValue>,
    outputs: HashMap<String, ParamValue>,
    runs: Arc<AtomicUsize>,
    pub fail_with: Option<String>,
    pub hang_until_cancelled: bool,
    bound: Arc<Mutex<Vec<(String, String)>>>,
}

#[allow(dead_code)]
impl MockRuntime {
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self {
            definition,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            runs: Arc::new(AtomicUsize::new(0)),
            fail_with: None,
            hang_until_cancelled: false,
            bound: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared counter of completed executions.
    pub fn run_counter(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }

    /// Shared record of slot pairs currently bound inside the engine.
    pub fn bound_pairs(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        self.bound.clone()
    }

    fn input_slot(&self, name: &str) -> Result<(), BridgeError> {
        let known = self
            .definition
            .slots
            .iter()
            .any(|slot| slot.name == name && slot.direction == SlotDirection::Input);
        if known {
            Ok(())
        } else {
            Err(BridgeError::SlotNotFound(name.to_string()))
        }
    }
}

impl ForeignRuntime for MockRuntime {
    fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    fn set_precision(&mut self, _precision: Precision) -> Result<(), BridgeError> {
        Ok(())
    }

    fn bind_slots(&mut self, output: &str, input: &str) -> Result<(), BridgeError> {
        // Output slots may belong to another workflow on the same engine;
        // only the input side can be validated here.
        self.input_slot(input)?;
        self.bound
            .lock()
            .unwrap()
            .push((output.to_string(), input.to_string()));
        Ok(())
    }

    fn unbind_slots(&mut self, output: &str, input: &str) -> Result<(), BridgeError> {
        self.bound
            .lock()
            .unwrap()
            .retain(|(out, inp)| !(out == output && inp == input));
        Ok(())
    }

    fn write_input(&mut self, slot: &str, value: &ParamValue) -> Result<(), BridgeError> {
        self.input_slot(slot)?;
        self.inputs.insert(slot.to_string(), value.clone());
        Ok(())
    }

    fn read_output(&self, slot: &str) -> Result<ParamValue, BridgeError> {
        self.outputs
            .get(slot)
            .cloned()
            .ok_or_else(|| BridgeError::SlotNotFound(slot.to_string()))
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<(), BridgeError> {
        if self.hang_until_cancelled {
            while !ctx.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            return Err(BridgeError::Cancelled);
        }
        if let Some(message) = &self.fail_with {
            return Err(BridgeError::Execution {
                message: message.clone(),
            });
        }
        let staged: Vec<ParamValue> = self
            .definition
            .slots
            .iter()
            .filter(|slot| slot.direction == SlotDirection::Input)
            .filter_map(|slot| self.inputs.get(&slot.name).cloned())
            .collect();
        let value = match staged.len() {
            0 => ParamValue::Null,
            1 => staged.into_iter().next().unwrap_or(ParamValue::Null),
            _ => ParamValue::List(staged),
        };
        for slot in &self.definition.slots {
            if slot.direction == SlotDirection::Output {
                self.outputs.insert(slot.name.clone(), value.clone());
            }
        }
        ctx.report_progress(1.0);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
