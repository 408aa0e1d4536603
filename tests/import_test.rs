use procflow::actions::builtin::AssignAction;
use procflow::definition::import::{DefinitionDocument, load_document_from_yaml};
use procflow::error::EngineError;
use procflow::runtime::engine::ProcessEngine;
use procflow::runtime::instance::Status;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

const ORDER_FLOW_YAML: &str = r#"
name: "order-flow"
category: "Demo"
tasks:
  begin:
    type: start-task
  charge:
    type: service-task
    action: assign
    params:
      assignments:
        - key: charged
          value: true
  check:
    type: decision
  shipped:
    type: end-task
  refused:
    type: end-task
flows:
  - from: begin
    to: charge
  - from: charge
    to: check
  - from: check
    to: shipped
    condition: "amount > 0"
  - from: check
    to: refused
    condition: "amount <= 0"
variables:
  amount: 5
"#;

fn parse_document(yaml: &str) -> DefinitionDocument {
    serde_yaml::from_str(yaml).expect("document must parse")
}

#[tokio::test]
async fn test_import_and_run_from_yaml_file() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let file_path = temp_dir.path().join("order_flow.yaml");
    fs::write(&file_path, ORDER_FLOW_YAML).expect("write temp file");

    let doc = load_document_from_yaml(&file_path).expect("load document");

    let engine = ProcessEngine::new();
    engine.register_action(Arc::new(AssignAction));
    let def = engine.import_definition(&doc).expect("import");

    assert_eq!(def.name, "order-flow");
    assert_eq!(def.category, "Demo");
    assert_eq!(def.tasks.len(), 5);
    assert_eq!(def.flows.len(), 4);
    // The start task lands at id 0 no matter where it sits in the document.
    assert_eq!(def.start_task().expect("start").id, 0);
    assert_eq!(
        def.task_by_name("begin").map(|t| t.id),
        Some(0),
        "start entry must be seated first"
    );
    assert_eq!(def.variables.get("amount"), Some(&json!(5)));

    // Default variables flow into the instance, so the decision sees
    // amount = 5 and takes the shipped branch.
    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;
    instance.start(HashMap::new()).await.expect("start");
    assert_eq!(instance.status(), Status::Completed);
    assert_eq!(instance.variables().get("charged"), Some(&json!(true)));

    temp_dir.close().expect("close temp dir");
}

#[test]
fn test_import_rejects_unresolved_flow_endpoint() {
    let mut doc = parse_document(ORDER_FLOW_YAML);
    doc.flows[0].from = "missing".to_string();

    let engine = ProcessEngine::new();
    let err = engine.import_definition(&doc).expect_err("must reject");
    match err {
        EngineError::Validation(message) => {
            assert!(message.contains("missing"), "message was: {}", message)
        }
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[test]
fn test_import_rejects_unknown_task_type() {
    let mut doc = parse_document(ORDER_FLOW_YAML);
    doc.tasks.get_mut("charge").expect("charge entry").task_type = "teleport-task".to_string();

    let engine = ProcessEngine::new();
    let err = engine.import_definition(&doc).expect_err("must reject");
    assert!(matches!(err, EngineError::Validation(_)), "got {:?}", err);
}

#[test]
fn test_import_accepts_registered_extension_type() {
    use procflow::definition::Task;
    use procflow::runtime::node::{ExecutionScope, NodeBehavior, Outcome};

    #[derive(Debug)]
    struct AuditBehavior;

    #[async_trait::async_trait]
    impl NodeBehavior for AuditBehavior {
        async fn run(
            &self,
            _task: &Task,
            _scope: &mut ExecutionScope<'_>,
        ) -> anyhow::Result<Outcome> {
            Ok(Outcome::Completed)
        }
    }

    let mut doc = parse_document(ORDER_FLOW_YAML);
    doc.tasks.get_mut("charge").expect("charge entry").task_type = "audit-task".to_string();

    let engine = ProcessEngine::new();
    engine
        .register_task_type("audit-task", Arc::new(AuditBehavior))
        .expect("register");
    let def = engine.import_definition(&doc).expect("import");
    assert_eq!(
        def.task_by_name("charge")
            .map(|t| t.kind.type_name().to_string()),
        Some("audit-task".to_string())
    );

    // Type names are unique; a second registration is rejected.
    let err = engine
        .register_task_type("audit-task", Arc::new(AuditBehavior))
        .expect_err("duplicate type name");
    assert!(matches!(err, EngineError::Validation(_)), "got {:?}", err);
}

#[test]
fn test_import_requires_action_on_service_tasks() {
    let mut doc = parse_document(ORDER_FLOW_YAML);
    doc.tasks.get_mut("charge").expect("charge entry").action = None;

    let engine = ProcessEngine::new();
    let err = engine.import_definition(&doc).expect_err("must reject");
    assert!(matches!(err, EngineError::Validation(_)), "got {:?}", err);
}

#[test]
fn test_import_requires_exactly_one_start_task() {
    let mut doc = parse_document(ORDER_FLOW_YAML);
    doc.tasks.get_mut("begin").expect("begin entry").task_type = "end-task".to_string();

    let engine = ProcessEngine::new();
    let err = engine.import_definition(&doc).expect_err("must reject");
    assert!(matches!(err, EngineError::Validation(_)), "got {:?}", err);
}

#[test]
fn test_import_rejects_bad_condition_text() {
    let mut doc = parse_document(ORDER_FLOW_YAML);
    doc.flows[2].condition = Some("amount >".to_string());

    let engine = ProcessEngine::new();
    let err = engine.import_definition(&doc).expect_err("must reject");
    assert!(matches!(err, EngineError::Validation(_)), "got {:?}", err);
}
