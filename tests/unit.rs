//! Unit tests for values, type descriptors and error formatting.
mod common;
use kairo::error::{BridgeError, ConnectError, GraphError};
use kairo::prelude::*;

#[test]
fn test_param_value_display() {
    assert_eq!(format!("{}", ParamValue::Float(42.0)), "42");
    assert_eq!(format!("{}", ParamValue::Float(2.5)), "2.5");
    assert_eq!(format!("{}", ParamValue::Bool(true)), "true");
    assert_eq!(format!("{}", ParamValue::Null), "null");
    assert_eq!(
        format!(
            "{}",
            ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(2)])
        ),
        "[1, 2]"
    );
}

#[test]
fn test_type_info_from_foreign_name() {
    let info = TypeInfo::parse("CImgList<float>");
    assert_eq!(info.base(), "cimglist");
    assert_eq!(info.template(), Some("float"));
    assert_eq!(info, TypeInfo::with_template("CIMGLIST", "Float"));
    assert_eq!(format!("{}", info), "cimglist<float>");
}

#[test]
fn test_param_type_connectability() {
    assert!(ParamType::Float.is_connectable());
    assert!(ParamType::Generic.is_connectable());
    assert!(!ParamType::Command.is_connectable());
    assert!(!ParamType::TextInfo.is_connectable());
    assert!(!ParamType::Group.is_connectable());
}

#[test]
fn test_param_type_default_values() {
    assert_eq!(ParamType::Float.default_value(), ParamValue::Float(0.0));
    assert_eq!(ParamType::Bool.default_value(), ParamValue::Bool(false));
    assert_eq!(ParamType::Str.default_value(), ParamValue::Str(String::new()));
    assert_eq!(ParamType::Generic.default_value(), ParamValue::Null);
}

#[test]
fn test_pin_role_direction() {
    assert!(PinRole::Output.can_send());
    assert!(!PinRole::Output.can_receive());
    assert!(PinRole::Input.can_receive());
    assert!(!PinRole::Input.can_send());
    assert!(PinRole::InputOutput.can_send() && PinRole::InputOutput.can_receive());
}

#[test]
fn test_value_adapters() {
    assert_eq!(ParamValue::Float(1.5).as_f64(), Some(1.5));
    assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
    assert_eq!(ParamValue::Bool(true).as_f64(), None);
    assert_eq!(
        ParamValue::List(vec![ParamValue::Int(7)]).into_scalar(),
        ParamValue::Int(7)
    );
    assert_eq!(ParamValue::Null.into_list(), Vec::<ParamValue>::new());
    assert_eq!(
        ParamValue::Str("x".to_string()).into_list(),
        vec![ParamValue::Str("x".to_string())]
    );
}

#[test]
fn test_connect_error_display() {
    let err = ConnectError::IncompatibleType {
        source_name: "amplitude".to_string(),
        source_type: "float".to_string(),
        target_name: "label".to_string(),
        target_type: "string".to_string(),
    };
    assert!(err.to_string().contains("amplitude"));
    assert!(err.to_string().contains("label"));

    let err = ConnectError::DependencyCycle {
        source_name: "a".to_string(),
        target_name: "b".to_string(),
    };
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn test_graph_error_display() {
    let err = GraphError::DuplicateNodeName("blur".to_string());
    assert!(err.to_string().contains("blur"));

    let err = GraphError::MissingEndpoint {
        node: "noise".to_string(),
        param: "transform.scale".to_string(),
    };
    assert!(err.to_string().contains("noise.transform.scale"));
}

#[test]
fn test_bridge_error_display() {
    let err = BridgeError::SlotNotFound("Images In".to_string());
    assert!(err.to_string().contains("Images In"));

    let err = BridgeError::Execution {
        message: "out of memory".to_string(),
    };
    assert!(err.to_string().contains("out of memory"));
}

#[test]
fn test_workflow_from_file() {
    let dir = std::env::temp_dir();
    let path = dir.join("kairo_workflow_test.json");
    std::fs::write(
        &path,
        r#"{
            "name": "filter",
            "slots": [
                { "name": "Images In", "direction": "input", "type_name": "CImgList", "templated": true },
                { "name": "Images Out", "direction": "output", "type_name": "CImgList", "templated": true }
            ]
        }"#,
    )
    .unwrap();
    let workflow = WorkflowDefinition::from_file(&path).unwrap();
    assert_eq!(workflow.name, "filter");
    assert_eq!(workflow.exposed_slots().count(), 2);
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_workflow_rejects_duplicate_slots() {
    let dir = std::env::temp_dir();
    let path = dir.join("kairo_workflow_dup_test.json");
    std::fs::write(
        &path,
        r#"{
            "name": "filter",
            "slots": [
                { "name": "In", "direction": "input", "type_name": "Number" },
                { "name": "In", "direction": "input", "type_name": "Number" }
            ]
        }"#,
    )
    .unwrap();
    let err = WorkflowDefinition::from_file(&path).unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
    assert!(err.to_string().contains("In"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_templated_slot_type_resolution() {
    let workflow = common::image_workflow("filter");
    let slot = &workflow.slots[0];
    assert_eq!(
        slot.effective_type_info(Precision::Float),
        TypeInfo::with_template("cimglist", "float")
    );
    assert_eq!(
        slot.effective_type_info(Precision::Double),
        TypeInfo::with_template("cimglist", "double")
    );
}
