//! # Kairo - Parameter Dependency Graph and Lazy Evaluation Engine
//!
//! **Kairo** is the parameter engine of a node-based authoring tool: every
//! node exposes a tree of typed parameters, parameters are wired into a
//! directed dependency graph, and values are recomputed lazily, on demand,
//! only where an upstream change actually landed.
//!
//! ## Core Workflow
//!
//! 1.  **Build the scene**: create nodes with [`ParamGraph::add_node`](graph::ParamGraph::add_node)
//!     and populate their parameter group trees from [`ParamSpec`](param::ParamSpec)s.
//! 2.  **Wire dependencies**: [`connect`](graph::ParamGraph::connect) parameters (type-checked,
//!     cycle-refusing, value-carrying edges) and [`declare_affects`](graph::ParamGraph::declare_affects)
//!     hidden dependencies that carry dirtiness only.
//! 3.  **Bind behavior**: attach change, processing and command functions to
//!     individual parameters; processing functions run at most once per
//!     forced read of a dirty parameter.
//! 4.  **Evaluate**: [`set_value`](graph::ParamGraph::set_value) marks and propagates,
//!     [`get_value`](graph::ParamGraph::get_value) pulls. Nothing recomputes until something
//!     downstream asks.
//!
//! Foreign dataflow graphs (image-processing workflows evaluated by an
//! external engine) can be mounted as ordinary parameters through the
//! [`bridge`] module.
//!
//! ## Quick Start
//!
//! ```rust
//! use kairo::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut graph = ParamGraph::new();
//!
//!     let noise = graph.add_node("noise")?;
//!     let noise_root = graph.node(noise).ok_or("missing node")?.root_group();
//!     let amplitude = graph.add_param(
//!         noise_root,
//!         ParamSpec::new("amplitude", ParamType::Float).with_pin(PinRole::Output),
//!     )?;
//!
//!     let blur = graph.add_node("blur")?;
//!     let blur_root = graph.node(blur).ok_or("missing node")?.root_group();
//!     let radius = graph.add_param(
//!         blur_root,
//!         ParamSpec::new("radius", ParamType::Float).with_pin(PinRole::Input),
//!     )?;
//!
//!     graph.connect(amplitude, radius)?;
//!     graph.set_value(amplitude, ParamValue::Float(2.5))?;
//!
//!     // The write traveled along the connection; the read stays lazy.
//!     assert_eq!(graph.get_value(radius, true)?.as_f64(), Some(2.5));
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod graph;
pub mod group;
pub mod id;
pub mod node;
pub mod param;
pub mod prelude;
pub mod scene;
pub mod value;
