//! Tests for connection validation, multiplicity and persistence.
mod common;
use common::{float_in, float_out, scene_node};
use kairo::error::ConnectError;
use kairo::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_type_mismatch_refused() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let number = float_out(&mut graph, root, "number");
    let label = graph
        .add_param(
            root,
            ParamSpec::new("label", ParamType::Str).with_pin(PinRole::Input),
        )
        .unwrap();

    let err = graph.connect(number, label).unwrap_err();
    assert!(matches!(err, ConnectError::IncompatibleType { .. }));
    assert_eq!(graph.connection_count(), 0);
    assert!(graph.param(label).unwrap().incoming().is_empty());
}

#[test]
fn test_generic_params_compare_type_descriptors() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let images = graph
        .add_param(
            root,
            ParamSpec::new("images", ParamType::Generic)
                .with_pin(PinRole::Output)
                .with_type_info(TypeInfo::parse("CImgList<float>")),
        )
        .unwrap();
    let sink_float = graph
        .add_param(
            root,
            ParamSpec::new("sinkFloat", ParamType::Generic)
                .with_pin(PinRole::Input)
                .with_type_info(TypeInfo::parse("cimglist<FLOAT>")),
        )
        .unwrap();
    let sink_double = graph
        .add_param(
            root,
            ParamSpec::new("sinkDouble", ParamType::Generic)
                .with_pin(PinRole::Input)
                .with_type_info(TypeInfo::parse("CImgList<double>")),
        )
        .unwrap();
    let untyped = graph
        .add_param(
            root,
            ParamSpec::new("untyped", ParamType::Generic).with_pin(PinRole::Input),
        )
        .unwrap();

    // Case differences in the foreign names are structural noise.
    graph.connect(images, sink_float).unwrap();

    let err = graph.connect(images, sink_double).unwrap_err();
    assert!(matches!(err, ConnectError::IncompatibleType { .. }));
    let err = graph.connect(images, untyped).unwrap_err();
    assert!(matches!(err, ConnectError::IncompatibleType { .. }));
}

#[test]
fn test_exactly_one_multiplicity() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let a = float_out(&mut graph, root, "a");
    let b = float_out(&mut graph, root, "b");
    let sink = float_in(&mut graph, root, "sink");

    graph.connect(a, sink).unwrap();
    let err = graph.connect(b, sink).unwrap_err();
    assert!(matches!(err, ConnectError::Multiplicity { .. }));
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn test_one_or_more_builds_list_in_connection_order() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let a = float_out(&mut graph, root, "a");
    let b = float_out(&mut graph, root, "b");
    let sink = graph
        .add_param(
            root,
            ParamSpec::new("sink", ParamType::Float)
                .with_pin(PinRole::Input)
                .with_multiplicity(Multiplicity::OneOrMore),
        )
        .unwrap();

    graph.connect(a, sink).unwrap();
    graph.connect(b, sink).unwrap();
    graph.set_value(a, ParamValue::Float(1.0)).unwrap();
    graph.set_value(b, ParamValue::Float(2.0)).unwrap();

    assert_eq!(
        graph.param(sink).unwrap().value(),
        &ParamValue::List(vec![ParamValue::Float(1.0), ParamValue::Float(2.0)])
    );
}

#[test]
fn test_connect_delivers_current_value() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let src = float_out(&mut graph, root, "src");
    let dst = float_in(&mut graph, root, "dst");
    graph.set_value(src, ParamValue::Float(9.0)).unwrap();

    graph.connect(src, dst).unwrap();
    let p = graph.param(dst).unwrap();
    assert_eq!(p.value().as_f64(), Some(9.0));
    assert!(p.is_dirty());
}

#[test]
fn test_disconnect_retains_last_value() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let src = float_out(&mut graph, root, "src");
    let dst = float_in(&mut graph, root, "dst");
    let id = graph.connect(src, dst).unwrap();
    graph.set_value(src, ParamValue::Float(4.0)).unwrap();

    graph.disconnect(id).unwrap();
    assert_eq!(graph.connection_count(), 0);
    assert_eq!(graph.param(dst).unwrap().value().as_f64(), Some(4.0));
    assert!(graph.param(dst).unwrap().outgoing().is_empty());
}

#[test]
fn test_pin_roles_enforced() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let input = float_in(&mut graph, root, "input");
    let output = float_out(&mut graph, root, "output");
    let other = float_in(&mut graph, root, "other");
    let command = graph
        .add_param(root, ParamSpec::new("bake", ParamType::Command))
        .unwrap();
    let sink = graph
        .add_param(root, ParamSpec::new("sink", ParamType::Command))
        .unwrap();

    // Inputs cannot send, outputs cannot receive.
    assert!(matches!(
        graph.connect(input, other).unwrap_err(),
        ConnectError::RoleMismatch { .. }
    ));
    assert!(matches!(
        graph.connect(output, output).unwrap_err(),
        ConnectError::RoleMismatch { .. }
    ));
    // Commands carry no connectable value at all.
    assert!(matches!(
        graph.connect(command, sink).unwrap_err(),
        ConnectError::RoleMismatch { .. }
    ));
}

#[test]
fn test_output_fan_out_is_unrestricted() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let src = float_out(&mut graph, root, "src");
    for i in 0..8 {
        let sink = float_in(&mut graph, root, &format!("sink{}", i));
        graph.connect(src, sink).unwrap();
    }
    assert_eq!(graph.connection_count(), 8);
}

#[test]
fn test_link_callbacks_receive_connection_id() {
    let mut graph = ParamGraph::new();
    let (_, root) = scene_node(&mut graph, "n");
    let src = float_out(&mut graph, root, "src");
    let dst = float_in(&mut graph, root, "dst");

    let connected = Rc::new(Cell::new(None));
    let disconnected = Rc::new(Cell::new(None));
    let seen = connected.clone();
    graph
        .set_on_connect(dst, Box::new(move |_, id| seen.set(Some(id))))
        .unwrap();
    let seen = disconnected.clone();
    graph
        .set_on_disconnect(dst, Box::new(move |_, id| seen.set(Some(id))))
        .unwrap();

    let id = graph.connect(src, dst).unwrap();
    assert_eq!(connected.get(), Some(id));
    graph.disconnect(id).unwrap();
    assert_eq!(disconnected.get(), Some(id));
}

fn build_scene(graph: &mut ParamGraph) -> (ParamId, ParamId) {
    let (_, root_a) = scene_node(graph, "noise");
    let amplitude = float_out(graph, root_a, "amplitude");
    let (_, root_b) = scene_node(graph, "blur");
    let transform = graph.add_group(root_b, "transform").unwrap();
    let scale = float_in(graph, transform, "scale");
    (amplitude, scale)
}

#[test]
fn test_export_restore_round_trip() {
    let mut graph = ParamGraph::new();
    let (amplitude, scale) = build_scene(&mut graph);
    graph.connect(amplitude, scale).unwrap();

    let specs = graph.export_connections();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].source_param, "amplitude");
    assert_eq!(specs[0].target_param, "transform.scale");

    // A freshly built scene accepts the persisted tuples.
    let mut rebuilt = ParamGraph::new();
    build_scene(&mut rebuilt);
    let report = rebuilt.restore_connections(&specs);
    assert_eq!(report.restored.len(), 1);
    assert!(report.skipped.is_empty());
    assert_eq!(rebuilt.connection_count(), 1);
}

#[test]
fn test_restore_skips_missing_endpoints() {
    let mut graph = ParamGraph::new();
    build_scene(&mut graph);

    let specs = vec![
        ConnectionSpec {
            source_node: "noise".to_string(),
            source_param: "amplitude".to_string(),
            target_node: "blur".to_string(),
            target_param: "transform.scale".to_string(),
        },
        ConnectionSpec {
            source_node: "ghost".to_string(),
            source_param: "out".to_string(),
            target_node: "blur".to_string(),
            target_param: "transform.scale".to_string(),
        },
    ];
    let report = graph.restore_connections(&specs);
    assert_eq!(report.restored.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0.source_node, "ghost");
    assert!(report.skipped[0].1.contains("cannot be resolved"));
    assert_eq!(graph.connection_count(), 1);
}
