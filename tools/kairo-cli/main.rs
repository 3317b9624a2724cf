use clap::{Parser, ValueEnum};
use kairo::bridge::{ExecutionContext, ForeignRuntime};
use kairo::error::{BridgeError, WorkflowConversionError};
use kairo::prelude::*;
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};

// --- JSON Deserialization Structs (Input Format Specific) ---
// These structs match the exported workflow format of the foreign editor and
// are only used here for conversion.

#[derive(Deserialize)]
struct RawWorkflow {
    #[serde(alias = "pluginName")]
    plugin_name: String,
    ports: Vec<RawPort>,
}

#[derive(Deserialize)]
struct RawPort {
    name: String,
    #[serde(alias = "portKind")]
    kind: String,
    #[serde(alias = "typeName")]
    type_name: String,
    #[serde(default)]
    templated: bool,
    #[serde(default, alias = "internallyConnected")]
    connected: bool,
}

/// Define a CLI-specific enum for clap to parse.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PrecisionCli {
    Float,
    Double,
}

// --- Converter Implementation ---
// Converts the raw editor export into kairo's canonical WorkflowDefinition.

impl IntoWorkflow for RawWorkflow {
    fn into_workflow(self) -> std::result::Result<WorkflowDefinition, WorkflowConversionError> {
        let slots = self
            .ports
            .into_iter()
            .map(|port| {
                let direction = match port.kind.to_lowercase().as_str() {
                    "in" | "input" => Ok(SlotDirection::Input),
                    "out" | "output" => Ok(SlotDirection::Output),
                    other => Err(WorkflowConversionError::ValidationError(format!(
                        "port '{}' has unknown kind '{}'",
                        port.name, other
                    ))),
                }?;
                Ok(SlotDefinition {
                    name: port.name,
                    direction,
                    type_name: port.type_name,
                    templated: port.templated,
                    connected: port.connected,
                })
            })
            .collect::<std::result::Result<Vec<_>, WorkflowConversionError>>()?;
        Ok(WorkflowDefinition {
            name: self.plugin_name,
            slots,
        })
    }
}

/// A runtime stand-in that only carries the workflow description, so the
/// bridge can materialize and type the parameters without a live engine.
struct InspectionRuntime {
    definition: WorkflowDefinition,
}

impl ForeignRuntime for InspectionRuntime {
    fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    fn set_precision(&mut self, _precision: Precision) -> std::result::Result<(), BridgeError> {
        Ok(())
    }

    fn bind_slots(&mut self, _output: &str, _input: &str) -> std::result::Result<(), BridgeError> {
        Ok(())
    }

    fn unbind_slots(&mut self, _output: &str, _input: &str) -> std::result::Result<(), BridgeError> {
        Ok(())
    }

    fn write_input(&mut self, _slot: &str, _value: &ParamValue) -> std::result::Result<(), BridgeError> {
        Ok(())
    }

    fn read_output(&self, slot: &str) -> std::result::Result<ParamValue, BridgeError> {
        Err(BridgeError::SlotNotFound(slot.to_string()))
    }

    fn execute(&mut self, _ctx: &ExecutionContext) -> std::result::Result<(), BridgeError> {
        Err(BridgeError::Execution {
            message: "inspection runtime cannot execute".to_string(),
        })
    }
}

/// Inspects a foreign workflow export and the parameters it would expose
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the exported workflow JSON file
    workflow_path: Option<String>,

    /// Numeric precision for templated slot types
    #[arg(short, long, value_enum)]
    precision: Option<PrecisionCli>,

    /// Run in interactive mode to be prompted for inputs
    #[arg(short = 'i', long, help = "Run in interactive 'human' mode")]
    human: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.human {
        run_interactive();
    } else {
        run_non_interactive(cli);
    }
}

fn run_inspection(workflow_path: String, precision: Precision) {
    // --- 1. File loading and conversion ---
    let workflow_json = fs::read_to_string(&workflow_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read workflow file '{}': {}",
            &workflow_path, e
        ))
    });
    let raw: RawWorkflow = serde_json::from_str(&workflow_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse workflow JSON: {}", e)));
    let workflow = raw
        .into_workflow()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert workflow: {}", e)));

    println!("\nWorkflow: {}", workflow.name);
    println!(
        "Slots: {} declared, {} exposed",
        workflow.slots.len(),
        workflow.exposed_slots().count()
    );

    // --- 2. Materialization ---
    let mut graph = ParamGraph::new();
    let host = graph
        .add_node("host")
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to create host node: {}", e)));
    let ctx = SceneContext::new(std::env::current_dir().unwrap_or_default());
    let bridge = ExternalGraphBridge::new(ctx);
    let runtime = InspectionRuntime {
        definition: workflow,
    };
    if let Err(e) = bridge.set_default_precision(precision) {
        exit_with_error(&format!("Failed to apply precision: {}", e));
    }
    bridge
        .load(&mut graph, host, Box::new(runtime))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to materialize workflow: {}", e)));

    // --- 3. Parameter table ---
    println!("\n--- Materialized Parameters ---");
    println!("{:<32} {:<10} {:<14} TYPE", "PARAMETER", "PIN", "KIND");
    for pid in graph.params_of(host) {
        let Some(param) = graph.param(pid) else {
            continue;
        };
        let type_info = param
            .type_info()
            .map(|info| info.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<32} {:<10} {:<14} {}",
            param.name(),
            param.pin_role().to_string(),
            param.param_type().to_string(),
            type_info
        );
    }
    println!();
}

/// Runs the CLI in non-interactive mode, taking all arguments from the command line.
fn run_non_interactive(cli: Cli) {
    let workflow_path = cli.workflow_path.unwrap_or_else(|| {
        exit_with_error("Workflow path is required in non-interactive mode.");
    });
    let precision = match cli.precision.unwrap_or(PrecisionCli::Float) {
        PrecisionCli::Float => Precision::Float,
        PrecisionCli::Double => Precision::Double,
    };
    run_inspection(workflow_path, precision);
}

/// Runs the CLI in an interactive, human-friendly mode with prompts.
fn run_interactive() {
    println!("--- Kairo Interactive Mode ---");

    let workflow_path = prompt_for_input("Enter workflow export path", Some("data/workflow.json"));

    let precision = loop {
        println!("\nPlease select a template precision:");
        println!("  1: float  (single precision)");
        println!("  2: double (double precision)");
        let choice_str = prompt_for_input("Enter choice", Some("1"));

        match choice_str.trim() {
            "1" => break Precision::Float,
            "2" => break Precision::Double,
            _ => println!("Invalid choice. Please enter 1 or 2."),
        }
    };

    run_inspection(workflow_path, precision);
}

/// A helper function to prompt the user and read a line of input.
fn prompt_for_input(prompt_text: &str, default: Option<&str>) -> String {
    let mut line = String::new();
    let default_prompt = default.map_or("".to_string(), |d| format!(" [default: {}]", d));

    print!("> {}{}: ", prompt_text, default_prompt);
    io::stdout().flush().unwrap();

    io::stdin()
        .read_line(&mut line)
        .expect("Failed to read line");
    let trimmed = line.trim().to_string();

    if trimmed.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        trimmed
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
