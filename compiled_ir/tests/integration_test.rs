use compiled_ir::builder::ClassBuilder;
use compiled_ir::{
    CompiledClass, IrError, NodeId, NodeKind, PinCategory, PinType, PropertyOwner, Statement,
    StatementId, StatementKind,
};
use std::fs;

fn load(path: &str) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_load_door_fixture() {
    let class = CompiledClass::from_json(&load("tests/fixtures/door.json")).unwrap();

    assert_eq!(class.name, "BP_Door_C");
    assert_eq!(class.super_class(), Some("Actor"));
    assert_eq!(class.functions.len(), 1);
    assert!(class.ubergraph().is_none());

    let context = &class.functions[0];
    assert_eq!(context.linear_execution_list, vec![NodeId(0), NodeId(1), NodeId(2)]);
    let all: Vec<_> = context.all_statements().collect();
    assert_eq!(all, vec![StatementId(0), StatementId(1), StatementId(2)]);
    assert_eq!(context.node_of(StatementId(2)), Some(NodeId(2)));
    assert!(context.statements(NodeId(0)).is_empty());

    let call = class.statement(StatementId(1)).unwrap();
    assert_eq!(call.kind, StatementKind::Call);
    let callee = class.reflection.function(call.function_to_call.unwrap()).unwrap();
    assert_eq!(callee.name, "SetLifeSpan");
    assert!(callee.flags.native);

    let self_term = class.terminal(call.function_context.unwrap()).unwrap();
    assert!(self_term.is_self());
    assert!(self_term.pin_type.is_self());
}

#[test]
fn test_reflection_defaults() {
    let class = CompiledClass::from_json(&load("tests/fixtures/door.json")).unwrap();
    let object = class.reflection.class("Object").unwrap();
    assert_eq!(object.cpp_prefix, "U");
    assert!(object.is_converted);

    let door = class.class_desc().unwrap();
    assert!(!door.is_native);
    assert_eq!(door.path_postfix, "_C__pf2132744816");
    assert_eq!(class.reflection.inheritance_level("BP_Door_C"), 0);

    let is_open = &class.reflection.properties[0];
    assert_eq!(is_open.owner, PropertyOwner::Class("BP_Door_C".into()));
    assert_eq!(is_open.pin_type.category, PinCategory::Boolean);
    assert!(!is_open.flags.bitfield);

    let nodes: Vec<_> = class.nodes.iter().map(|n| &n.kind).collect();
    assert_eq!(nodes[0], &NodeKind::FunctionEntry);
    assert_eq!(
        nodes[2],
        &NodeKind::CallFunction {
            is_latent: false,
            then_links: vec![]
        }
    );
}

#[test]
fn test_reject_dangling_statement() {
    let json = load("tests/fixtures/door.json").replace(
        r#"{ "node": 2, "statements": [1, 2] }"#,
        r#"{ "node": 2, "statements": [1, 7] }"#,
    );
    let err = CompiledClass::from_json(&json).unwrap_err();
    assert!(matches!(err, IrError::Dangling { .. }), "{err}");
    assert_eq!(
        err.to_string(),
        "function context #0 refers to missing statement #7"
    );
}

#[test]
fn test_reject_malformed_json() {
    let err = CompiledClass::from_json("{ \"name\": 3 }").unwrap_err();
    assert!(matches!(err, IrError::Json(_)));
    assert!(err.to_string().starts_with("failed to parse compiled IR"));
}

#[test]
fn test_json_roundtrip_preserves_order() {
    let class = CompiledClass::from_json(&load("tests/fixtures/door.json")).unwrap();
    let json = serde_json::to_string(&class).unwrap();
    let again = CompiledClass::from_json(&json).unwrap();
    assert_eq!(class, again);
    let names: Vec<_> = again.reflection.classes.keys().cloned().collect();
    assert_eq!(names, vec!["Object", "Actor", "BP_Door_C"]);
}

#[test]
fn test_jump_targets_recomputed_on_load() {
    let mut builder = ClassBuilder::new("Test_C", "Actor");
    let open = builder.member("bOpen", PinType::new(PinCategory::Boolean));
    let open = builder.property_term(open);
    let ret = builder.statement(Statement::new(StatementKind::GotoReturn));
    let branch = builder.statement(
        Statement::new(StatementKind::GotoIfNot)
            .with_lhs(open)
            .with_target(ret),
    );
    let function = builder.function("Toggle");
    let entry = builder.node("Entry", NodeKind::FunctionEntry);
    builder.function_context(function, vec![(entry, vec![branch, ret])], false);
    let mut class = builder.build();
    class.statements[ret.0].is_jump_target = false;
    class.statements[branch.0].is_jump_target = true;

    let json = serde_json::to_string(&class).unwrap();
    let loaded = CompiledClass::from_json(&json).unwrap();
    assert!(loaded.statements[ret.0].is_jump_target);
    assert!(!loaded.statements[branch.0].is_jump_target);
}

#[test]
fn test_reject_unpaired_switch_value() {
    let mut builder = ClassBuilder::new("Test_C", "Actor");
    let operands: Vec<_> = ["0", "0", "10", "1", "7"]
        .iter()
        .map(|v| builder.literal(PinType::new(PinCategory::Int), v))
        .collect();
    builder.statement(Statement::new(StatementKind::SwitchValue).with_rhs(operands));
    let json = serde_json::to_string(&builder.build()).unwrap();

    let err = CompiledClass::from_json(&json).unwrap_err();
    assert!(matches!(err, IrError::UnpairedSwitchCase(StatementId(0), 5)), "{err}");
}
