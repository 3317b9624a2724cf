//! Embedding a foreign dataflow graph as parameters of a host node.
//!
//! The bridge materializes the exposed slots of a loaded workflow as generic
//! parameters named `<plugin>.<slot>` on a host node, so the rest of the
//! scene connects to foreign data exactly like to native parameters. Outputs
//! carry a processing function that lazily executes the foreign graph on a
//! worker thread; re-execution happens only when an input changed since the
//! last run.
//!
//! Host-side state lives in a [`ParamGraph`]; bridge-side state lives in a
//! shared core cell the materialized parameters' callbacks hold on to.
//! Callbacks collect what they need under a short borrow of the core and
//! release it before touching the graph, because graph mutation can re-enter
//! other bridge callbacks.

mod executor;
mod runtime;
mod workflow;

pub use executor::{ExecutionContext, ExecutionHandle, ProgressEvent, WaitControl};
pub use runtime::ForeignRuntime;
pub use workflow::{
    IntoWorkflow, Precision, SlotDefinition, SlotDirection, WorkflowDefinition,
};

use crate::error::{BridgeError, EvalError};
use crate::graph::{ConnectionSpec, ParamGraph, RestoreReport};
use crate::id::{ConnectionId, NodeId, ParamId};
use crate::param::{ParamSpec, PinRole};
use crate::scene::SceneContext;
use crate::value::{ParamType, ParamValue, TypeInfo};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use log::{debug, warn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Host-side callback that receives progress events while an execution is
/// awaited; called with `None` on idle ticks so a UI can pump its loop.
pub type ProgressSink = Box<dyn FnMut(Option<&ProgressEvent>) -> WaitControl>;

const MUTEX_POISONED: &str = "foreign runtime mutex poisoned";

/// Lifecycle of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unloaded,
    Initializing,
    Loaded,
    Executing,
    Error,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BridgeState::Unloaded => "unloaded",
            BridgeState::Initializing => "initializing",
            BridgeState::Loaded => "loaded",
            BridgeState::Executing => "executing",
            BridgeState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// How a materialized parameter maps back onto its foreign slot.
#[derive(Debug, Clone)]
struct SlotBinding {
    slot: String,
    direction: SlotDirection,
    type_info: TypeInfo,
}

#[derive(Debug, Clone)]
struct RegisteredSlot {
    slot: String,
    direction: SlotDirection,
}

/// Scene-wide index of which parameters wrap foreign slots.
///
/// Bridges sharing a registry (and a common foreign engine underneath) can
/// recognize each other's slot parameters: a connection between two such
/// parameters is forwarded inside the foreign engine instead of copying
/// values through the host graph. Cloning yields another handle to the same
/// registry.
#[derive(Clone, Default)]
pub struct SlotRegistry {
    inner: Rc<RefCell<AHashMap<ParamId, RegisteredSlot>>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, param: ParamId, slot: &str, direction: SlotDirection) {
        self.inner.borrow_mut().insert(
            param,
            RegisteredSlot {
                slot: slot.to_string(),
                direction,
            },
        );
    }

    fn unregister(&self, param: ParamId) {
        self.inner.borrow_mut().remove(&param);
    }

    fn lookup(&self, param: ParamId) -> Option<RegisteredSlot> {
        self.inner.borrow().get(&param).cloned()
    }
}

/// Shared bridge state. Parameters' callbacks hold an `Rc` to this cell;
/// the runtime sits behind an `Arc<Mutex>` so the execution worker and the
/// host never touch it concurrently.
struct BridgeCore {
    ctx: SceneContext,
    registry: SlotRegistry,
    state: BridgeState,
    plugin: Option<String>,
    precision: Precision,
    runtime: Option<Arc<Mutex<Box<dyn ForeignRuntime>>>>,
    node: Option<NodeId>,
    params_by_slot: AHashMap<String, ParamId>,
    slots_by_param: AHashMap<ParamId, SlotBinding>,
    /// Forwarding edges between two slots of this bridge, by connection id.
    bindings: AHashMap<ConnectionId, (String, String)>,
    /// The last run completed; cleared by anything that could invalidate it.
    executed: bool,
    /// Input values staged for the last completed run, in slot-name order.
    /// A forced output read re-executes when the current values differ.
    last_inputs: Vec<(String, ParamValue)>,
    progress_sink: Option<ProgressSink>,
}

/// A bridge between the parameter graph and one loaded foreign workflow.
///
/// Cloning yields another handle to the same bridge.
#[derive(Clone)]
pub struct ExternalGraphBridge {
    core: Rc<RefCell<BridgeCore>>,
}

impl ExternalGraphBridge {
    pub fn new(ctx: SceneContext) -> Self {
        Self::with_registry(ctx, SlotRegistry::new())
    }

    /// Creates a bridge participating in a shared slot registry, so
    /// connections between slot parameters of different bridges are
    /// forwarded inside the common foreign engine.
    pub fn with_registry(ctx: SceneContext, registry: SlotRegistry) -> Self {
        Self {
            core: Rc::new(RefCell::new(BridgeCore {
                ctx,
                registry,
                state: BridgeState::Unloaded,
                plugin: None,
                precision: Precision::Float,
                runtime: None,
                node: None,
                params_by_slot: AHashMap::new(),
                slots_by_param: AHashMap::new(),
                bindings: AHashMap::new(),
                executed: false,
                last_inputs: Vec::new(),
                progress_sink: None,
            })),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.core.borrow().state
    }

    pub fn plugin_name(&self) -> Option<String> {
        self.core.borrow().plugin.clone()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.core.borrow().node
    }

    pub fn scene_context(&self) -> SceneContext {
        self.core.borrow().ctx.clone()
    }

    /// The slot registry this bridge publishes its parameters into.
    pub fn registry(&self) -> SlotRegistry {
        self.core.borrow().registry.clone()
    }

    /// Whether the last execution is still valid for the current inputs.
    pub fn is_executed(&self) -> bool {
        self.core.borrow().executed
    }

    /// Installs the host callback that pumps progress events during a run.
    pub fn set_progress_sink(&self, sink: ProgressSink) {
        self.core.borrow_mut().progress_sink = Some(sink);
    }

    pub fn precision(&self) -> Precision {
        self.core.borrow().precision
    }

    /// Chooses the precision used to type templated slots of the next load.
    /// Once a workflow is loaded, use [`set_precision`](Self::set_precision).
    pub fn set_default_precision(&self, precision: Precision) -> Result<(), BridgeError> {
        let mut core = self.core.borrow_mut();
        if core.runtime.is_some() {
            return Err(BridgeError::Configuration(
                "a workflow is loaded; switch precision through set_precision".to_string(),
            ));
        }
        core.precision = precision;
        Ok(())
    }

    /// The materialized parameter of a foreign slot.
    pub fn slot_param(&self, slot: &str) -> Option<ParamId> {
        self.core.borrow().params_by_slot.get(slot).copied()
    }

    /// All materialized slots and their parameters, in slot-name order.
    pub fn slot_params(&self) -> Vec<(String, ParamId)> {
        self.core
            .borrow()
            .params_by_slot
            .iter()
            .map(|(slot, id)| (slot.clone(), *id))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .collect()
    }

    /// Loads a foreign workflow onto `node`: every exposed slot becomes a
    /// generic parameter named `<plugin>.<slot>`, typed from the slot's
    /// declaration, with every input declared to affect every output. On
    /// failure nothing is materialized and the bridge moves to
    /// [`BridgeState::Error`].
    pub fn load(
        &self,
        graph: &mut ParamGraph,
        node: NodeId,
        runtime: Box<dyn ForeignRuntime>,
    ) -> Result<(), BridgeError> {
        let precision = {
            let mut core = self.core.borrow_mut();
            if core.runtime.is_some() {
                return Err(BridgeError::Configuration(
                    "a workflow is already loaded; unload or reload it first".to_string(),
                ));
            }
            core.state = BridgeState::Initializing;
            core.precision
        };
        let definition = runtime.definition().clone();
        match materialize(&self.core, graph, node, &definition, precision) {
            Ok((params_by_slot, slots_by_param)) => {
                debug!(
                    "loaded workflow '{}' onto node {} ({} slots)",
                    definition.name,
                    node,
                    params_by_slot.len()
                );
                let mut core = self.core.borrow_mut();
                for (pid, binding) in &slots_by_param {
                    core.registry.register(*pid, &binding.slot, binding.direction);
                }
                core.runtime = Some(Arc::new(Mutex::new(runtime)));
                core.plugin = Some(definition.name);
                core.node = Some(node);
                core.params_by_slot = params_by_slot;
                core.slots_by_param = slots_by_param;
                core.bindings.clear();
                core.executed = false;
                core.last_inputs.clear();
                core.state = BridgeState::Loaded;
                Ok(())
            }
            Err(err) => {
                self.core.borrow_mut().state = BridgeState::Error;
                Err(err)
            }
        }
    }

    /// Tears the bridge down: severs every connection touching a
    /// materialized parameter, removes the parameters, and returns the
    /// external connections as persistable tuples so a reload can restore
    /// them. Forwarding edges between two slots of this bridge are not
    /// returned; they die with the workflow.
    pub fn unload(&self, graph: &mut ParamGraph) -> Result<Vec<ConnectionSpec>, BridgeError> {
        let params: Vec<ParamId> = {
            let core = self.core.borrow();
            if core.runtime.is_none() {
                return Err(BridgeError::NotLoaded);
            }
            core.slots_by_param.keys().copied().collect()
        };

        let mut external = Vec::new();
        let mut seen = AHashSet::new();
        for &pid in &params {
            let Some(param) = graph.param(pid) else {
                continue;
            };
            for &cid in param.incoming().iter().chain(param.outgoing()) {
                if !seen.insert(cid) {
                    continue;
                }
                let Some(conn) = graph.connection(cid) else {
                    continue;
                };
                let internal = {
                    let core = self.core.borrow();
                    core.slots_by_param.contains_key(&conn.source())
                        && core.slots_by_param.contains_key(&conn.target())
                };
                if internal {
                    continue;
                }
                if let Some(spec) = graph.spec_for(conn) {
                    external.push(spec);
                }
            }
        }

        for pid in params {
            // Callbacks fired along the way may already have removed peers.
            if graph.param(pid).is_some() {
                if let Err(err) = graph.remove_param(pid) {
                    warn!("bridge teardown could not remove {}: {}", pid, err);
                }
            }
        }

        let mut core = self.core.borrow_mut();
        for pid in core.slots_by_param.keys() {
            core.registry.unregister(*pid);
        }
        core.runtime = None;
        core.plugin = None;
        core.node = None;
        core.params_by_slot.clear();
        core.slots_by_param.clear();
        core.bindings.clear();
        core.executed = false;
        core.last_inputs.clear();
        core.state = BridgeState::Unloaded;
        debug!("bridge unloaded ({} external connections preserved)", external.len());
        Ok(external)
    }

    /// Replaces the loaded workflow, re-materializing slots on the same node
    /// and restoring external connections whose endpoints still resolve and
    /// type-check. Dropped connections are reported, not escalated.
    pub fn reload(
        &self,
        graph: &mut ParamGraph,
        runtime: Box<dyn ForeignRuntime>,
    ) -> Result<RestoreReport, BridgeError> {
        let node = self.core.borrow().node.ok_or(BridgeError::NotLoaded)?;
        let specs = self.unload(graph)?;
        self.load(graph, node, runtime)?;
        Ok(graph.restore_connections(&specs))
    }

    /// Switches the numeric precision of templated slots. Materialized
    /// parameters are re-typed in place; connections whose endpoint types no
    /// longer agree are severed with a warning instead of silently carrying
    /// mistyped data.
    pub fn set_precision(
        &self,
        graph: &mut ParamGraph,
        precision: Precision,
    ) -> Result<(), BridgeError> {
        let runtime = self
            .core
            .borrow()
            .runtime
            .clone()
            .ok_or(BridgeError::NotLoaded)?;

        let retyped: Vec<(ParamId, TypeInfo)> = {
            let mut rt = runtime.lock().map_err(|_| BridgeError::Execution {
                message: MUTEX_POISONED.to_string(),
            })?;
            rt.set_precision(precision)?;
            let definition = rt.definition().clone();
            drop(rt);
            let core = self.core.borrow();
            definition
                .slots
                .iter()
                .filter(|slot| slot.templated && !slot.connected)
                .filter_map(|slot| {
                    core.params_by_slot
                        .get(&slot.name)
                        .map(|pid| (*pid, slot.effective_type_info(precision)))
                })
                .collect()
        };

        {
            let mut core = self.core.borrow_mut();
            core.precision = precision;
            core.executed = false;
            for (pid, info) in &retyped {
                if let Some(binding) = core.slots_by_param.get_mut(pid) {
                    binding.type_info = info.clone();
                }
            }
        }
        for (pid, info) in &retyped {
            graph
                .set_type_info(*pid, info.clone())
                .map_err(|err| BridgeError::Configuration(err.to_string()))?;
        }
        sever_type_conflicts(graph, &retyped);
        Ok(())
    }
}

/// Creates the `<plugin>.<slot>` parameters for every exposed slot, wires
/// the input-affects-output edges and the bridge callbacks. Rolls back all
/// created parameters on any failure.
fn materialize(
    core: &Rc<RefCell<BridgeCore>>,
    graph: &mut ParamGraph,
    node: NodeId,
    definition: &WorkflowDefinition,
    precision: Precision,
) -> Result<(AHashMap<String, ParamId>, AHashMap<ParamId, SlotBinding>), BridgeError> {
    let mut created = Vec::new();
    match materialize_inner(core, graph, node, definition, precision, &mut created) {
        Ok(maps) => Ok(maps),
        Err(err) => {
            for pid in created {
                if graph.param(pid).is_some() {
                    let _ = graph.remove_param(pid);
                }
            }
            Err(err)
        }
    }
}

fn materialize_inner(
    core: &Rc<RefCell<BridgeCore>>,
    graph: &mut ParamGraph,
    node: NodeId,
    definition: &WorkflowDefinition,
    precision: Precision,
    created: &mut Vec<ParamId>,
) -> Result<(AHashMap<String, ParamId>, AHashMap<ParamId, SlotBinding>), BridgeError> {
    let root = graph
        .node(node)
        .ok_or_else(|| BridgeError::Configuration(format!("unknown host node {}", node)))?
        .root_group();

    let mut params_by_slot = AHashMap::new();
    let mut slots_by_param = AHashMap::new();
    for slot in definition.exposed_slots() {
        let name = format!("{}.{}", definition.name, slot.name);
        let info = slot.effective_type_info(precision);
        let pin = match slot.direction {
            SlotDirection::Input => PinRole::Input,
            SlotDirection::Output => PinRole::Output,
        };
        let spec = ParamSpec::new(&name, ParamType::Generic)
            .with_type_info(info.clone())
            .with_pin(pin);
        let pid = graph
            .add_param(root, spec)
            .map_err(|err| BridgeError::Configuration(err.to_string()))?;
        created.push(pid);
        params_by_slot.insert(slot.name.clone(), pid);
        slots_by_param.insert(
            pid,
            SlotBinding {
                slot: slot.name.clone(),
                direction: slot.direction,
                type_info: info,
            },
        );
    }

    // Any input change must dirty every output, independent of the foreign
    // graph's internal topology.
    let inputs: Vec<ParamId> = slots_by_param
        .iter()
        .filter(|(_, b)| b.direction == SlotDirection::Input)
        .map(|(pid, _)| *pid)
        .collect();
    let outputs: Vec<ParamId> = slots_by_param
        .iter()
        .filter(|(_, b)| b.direction == SlotDirection::Output)
        .map(|(pid, _)| *pid)
        .collect();
    for &input in &inputs {
        for &output in &outputs {
            graph
                .declare_affects(input, output)
                .map_err(|err| BridgeError::Configuration(err.to_string()))?;
        }
    }

    for (&pid, binding) in &slots_by_param {
        let c = core.clone();
        graph
            .set_on_connect(pid, Box::new(move |g, cid| bridge_on_connect(&c, g, cid)))
            .map_err(|err| BridgeError::Configuration(err.to_string()))?;
        let c = core.clone();
        graph
            .set_on_disconnect(pid, Box::new(move |g, cid| bridge_on_disconnect(&c, g, cid)))
            .map_err(|err| BridgeError::Configuration(err.to_string()))?;
        match binding.direction {
            SlotDirection::Input => {
                let c = core.clone();
                graph
                    .set_change_fn(
                        pid,
                        Box::new(move |_, _| {
                            c.borrow_mut().executed = false;
                        }),
                    )
                    .map_err(|err| BridgeError::Configuration(err.to_string()))?;
            }
            SlotDirection::Output => {
                let c = core.clone();
                graph
                    .set_processing_fn(pid, Box::new(move |g, p| process_output(&c, g, p)))
                    .map_err(|err| BridgeError::Configuration(err.to_string()))?;
            }
        }
    }

    // Outputs are stale until the first execution.
    for &output in &outputs {
        graph
            .set_value_internal(output, ParamValue::Null)
            .map_err(|err| BridgeError::Configuration(err.to_string()))?;
    }

    Ok((params_by_slot, slots_by_param))
}

/// On-connect hook of every materialized parameter. When the source also
/// wraps a foreign slot (of this bridge or of another bridge sharing the
/// registry), the edge is forwarded inside the foreign engine; a refused
/// forward severs the just-made connection rather than leaving an edge the
/// engine cannot honor. Any other feed into an input invalidates the last
/// run. Endpoint type agreement was already enforced structurally by the
/// connection layer.
fn bridge_on_connect(core: &Rc<RefCell<BridgeCore>>, graph: &mut ParamGraph, id: ConnectionId) {
    let Some(conn) = graph.connection(id) else {
        return;
    };
    let (source, target) = (conn.source(), conn.target());

    enum Action {
        Forward { output: String, input: String },
        ExternalFeed,
        Ignore,
    }
    let (action, runtime) = {
        let core = core.borrow();
        let action = match core.slots_by_param.get(&target) {
            Some(inp) if inp.direction == SlotDirection::Input => {
                match core.registry.lookup(source) {
                    Some(src) if src.direction == SlotDirection::Output => Action::Forward {
                        output: src.slot,
                        input: inp.slot.clone(),
                    },
                    _ => Action::ExternalFeed,
                }
            }
            _ => Action::Ignore,
        };
        (action, core.runtime.clone())
    };

    match action {
        Action::Forward { output, input } => {
            let Some(runtime) = runtime else {
                return;
            };
            let bound = match runtime.lock() {
                Ok(mut rt) => rt.bind_slots(&output, &input),
                Err(_) => Err(BridgeError::Execution {
                    message: MUTEX_POISONED.to_string(),
                }),
            };
            match bound {
                Ok(()) => {
                    let mut core = core.borrow_mut();
                    core.bindings.insert(id, (output, input));
                    core.executed = false;
                }
                Err(err) => {
                    warn!(
                        "cannot forward '{}' -> '{}' inside the foreign graph, severing {}: {}",
                        output, input, id, err
                    );
                    let _ = graph.disconnect(id);
                }
            }
        }
        Action::ExternalFeed => {
            core.borrow_mut().executed = false;
        }
        Action::Ignore => {}
    }
}

/// On-disconnect hook: releases a forwarding edge inside the foreign graph
/// and invalidates the last run.
fn bridge_on_disconnect(core: &Rc<RefCell<BridgeCore>>, _graph: &mut ParamGraph, id: ConnectionId) {
    let unbind = {
        let mut core = core.borrow_mut();
        core.executed = false;
        match core.bindings.remove(&id) {
            Some(pair) => core.runtime.clone().map(|rt| (rt, pair)),
            None => None,
        }
    };
    if let Some((runtime, (output, input))) = unbind {
        if let Ok(mut rt) = runtime.lock() {
            if let Err(err) = rt.unbind_slots(&output, &input) {
                warn!("failed to release forwarded '{}' -> '{}': {}", output, input, err);
            }
        }
    }
}

/// Processing function of every output parameter. Pulls the inputs through
/// the lazy read path, runs the foreign graph if the last run is stale, and
/// writes every output slot's value back, so reading one output satisfies
/// them all with a single execution.
fn process_output(
    core: &Rc<RefCell<BridgeCore>>,
    graph: &mut ParamGraph,
    _param: ParamId,
) -> Result<(), EvalError> {
    let inputs: Vec<(String, ParamId)> = {
        let core = core.borrow();
        if core.runtime.is_none() {
            return Err(EvalError::Bridge(BridgeError::NotLoaded));
        }
        core.slots_by_param
            .iter()
            .filter(|(_, b)| b.direction == SlotDirection::Input)
            .map(|(pid, b)| (b.slot.clone(), *pid))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .collect()
    };

    let mut staged = Vec::with_capacity(inputs.len());
    for (slot, pid) in &inputs {
        let value = graph.get_value(*pid, true)?;
        staged.push((slot.clone(), value));
    }
    // Staleness is decided by value comparison, not by input dirty flags:
    // any consumer's forced read of an input clears its flag without
    // recomputing anything.
    let stale = {
        let core = core.borrow();
        !core.executed || staged != core.last_inputs
    };
    if stale {
        run(core, staged)?;
    }

    let (runtime, outputs) = {
        let core = core.borrow();
        let runtime = core.runtime.clone().ok_or(BridgeError::NotLoaded)?;
        let outputs: Vec<(String, ParamId)> = core
            .slots_by_param
            .iter()
            .filter(|(_, b)| b.direction == SlotDirection::Output)
            .map(|(pid, b)| (b.slot.clone(), *pid))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .collect();
        (runtime, outputs)
    };
    let mut values = Vec::with_capacity(outputs.len());
    {
        let rt = runtime.lock().map_err(|_| BridgeError::Execution {
            message: MUTEX_POISONED.to_string(),
        })?;
        for (slot, pid) in &outputs {
            values.push((*pid, rt.read_output(slot)?));
        }
    }
    for (pid, value) in values {
        // Unchanged outputs are left clean; rewriting them would dirty
        // every sibling output on each read.
        let unchanged = graph
            .param(pid)
            .is_some_and(|p| p.value() == &value);
        if !unchanged {
            graph.set_value_internal(pid, value)?;
        }
    }
    Ok(())
}

/// Stages the inputs, runs the foreign graph to completion on a worker
/// thread, and pumps progress through the installed sink while waiting.
fn run(
    core: &Rc<RefCell<BridgeCore>>,
    inputs: Vec<(String, ParamValue)>,
) -> Result<(), BridgeError> {
    let (runtime, working_dir, mut sink) = {
        let mut core = core.borrow_mut();
        let runtime = core.runtime.clone().ok_or(BridgeError::NotLoaded)?;
        core.state = BridgeState::Executing;
        core.executed = false;
        (
            runtime,
            core.ctx.working_dir().to_path_buf(),
            core.progress_sink.take(),
        )
    };
    let result = execute_blocking(&runtime, working_dir, &inputs, &mut sink);
    let mut core = core.borrow_mut();
    core.progress_sink = sink;
    core.state = BridgeState::Loaded;
    core.executed = result.is_ok();
    if result.is_ok() {
        core.last_inputs = inputs;
    }
    if let Err(err) = &result {
        warn!("foreign graph run failed: {}", err);
    }
    result
}

fn execute_blocking(
    runtime: &Arc<Mutex<Box<dyn ForeignRuntime>>>,
    working_dir: PathBuf,
    inputs: &[(String, ParamValue)],
    sink: &mut Option<ProgressSink>,
) -> Result<(), BridgeError> {
    {
        let mut rt = runtime.lock().map_err(|_| BridgeError::Execution {
            message: MUTEX_POISONED.to_string(),
        })?;
        for (slot, value) in inputs {
            rt.write_input(slot, value)?;
        }
    }
    let handle = executor::dispatch(runtime.clone(), working_dir);
    match sink {
        Some(f) => handle.wait_with(|event| f(event)),
        None => handle.wait_with(|_| WaitControl::Continue),
    }
}

/// Disconnects edges at re-typed parameters whose endpoints no longer carry
/// the same type descriptor.
fn sever_type_conflicts(graph: &mut ParamGraph, retyped: &[(ParamId, TypeInfo)]) {
    let mut candidates = Vec::new();
    for (pid, _) in retyped {
        if let Some(param) = graph.param(*pid) {
            candidates.extend(param.incoming().iter().chain(param.outgoing()).copied());
        }
    }
    candidates.sort();
    candidates.dedup();
    for cid in candidates {
        let Some(conn) = graph.connection(cid) else {
            continue;
        };
        let mismatch = match (graph.param(conn.source()), graph.param(conn.target())) {
            (Some(src), Some(tgt)) => src.type_info() != tgt.type_info(),
            _ => false,
        };
        if mismatch {
            warn!("severing {}: endpoint types diverged after precision change", cid);
            let _ = graph.disconnect(cid);
        }
    }
}
