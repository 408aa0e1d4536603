use procflow::actions::builtin::AssignAction;
use procflow::definition::Task;
use procflow::definition::builder::DefinitionBuilder;
use procflow::error::EngineError;
use procflow::runtime::engine::ProcessEngine;
use procflow::runtime::instance::Status;
use procflow::runtime::observer::ProcessObserver;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Records lifecycle events as readable strings.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().expect("recorder lock").clone()
    }
}

impl ProcessObserver for Recorder {
    fn before_task(&self, task: &Task) {
        self.events
            .lock()
            .expect("recorder lock")
            .push(format!("before:{}", task.label()));
    }

    fn after_task(&self, task: &Task) {
        self.events
            .lock()
            .expect("recorder lock")
            .push(format!("after:{}", task.label()));
    }

    fn ended(&self) {
        self.events.lock().expect("recorder lock").push("end".to_string());
    }
}

fn engine_with_builtins() -> ProcessEngine {
    let engine = ProcessEngine::new();
    engine.register_action(Arc::new(AssignAction));
    engine
}

#[tokio::test]
async fn test_linear_execution() {
    let engine = engine_with_builtins();

    let mut builder = DefinitionBuilder::new("linear");
    let start = builder.start_task();
    let step = builder.service_task_with(
        "assign",
        json!({ "assignments": [{ "key": "result", "value": "success_value" }] }),
    );
    let end = builder.end_task();
    builder.flow(start, step).expect("flow");
    builder.flow(step, end).expect("flow");
    let def = builder.build().expect("build");

    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;
    instance.start(HashMap::new()).await.expect("start");

    assert_eq!(instance.status(), Status::Completed);
    assert_eq!(
        instance.variables().get("result"),
        Some(&json!("success_value"))
    );
    assert!(
        instance.node_pool().is_empty(),
        "pool must be empty once the walk completes"
    );
}

#[tokio::test]
async fn test_start_may_only_be_called_once() {
    let engine = engine_with_builtins();

    let mut builder = DefinitionBuilder::new("single-start");
    let start = builder.start_task();
    let end = builder.end_task();
    builder.flow(start, end).expect("flow");
    let def = builder.build().expect("build");

    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;
    instance.start(HashMap::new()).await.expect("first start");

    let err = instance
        .start(HashMap::new())
        .await
        .expect_err("second start must fail");
    assert!(matches!(err, EngineError::AlreadyStarted(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_decision_takes_the_satisfied_branch() {
    // start -> work -> decision -> { accepted | rejected }
    async fn run_with(x: i64) -> (Status, Vec<String>) {
        let engine = engine_with_builtins();

        let mut builder = DefinitionBuilder::new("decision-flow");
        let start = builder.start_task();
        let work = builder.service_task_with(
            "assign",
            json!({ "assignments": [{ "key": "worked", "value": true }] }),
        );
        let decision = builder.decision();
        let accepted = builder.end_task();
        let rejected = builder.end_task();
        builder.task_name(work, "work").expect("name");
        builder.task_name(accepted, "accepted").expect("name");
        builder.task_name(rejected, "rejected").expect("name");
        builder.flow(start, work).expect("flow");
        builder.flow(work, decision).expect("flow");
        builder.flow_if(decision, accepted, "x > 0").expect("flow");
        builder.flow_if(decision, rejected, "x <= 0").expect("flow");
        let def = builder.build().expect("build");

        let handle = engine.create_process_instance(def).expect("create");
        let mut instance = handle.lock().await;
        let recorder = Arc::new(Recorder::default());
        instance.subscribe(recorder.clone());

        let mut vars = HashMap::new();
        vars.insert("x".to_string(), json!(x));
        instance.start(vars).await.expect("start");
        assert_eq!(instance.variables().get("worked"), Some(&json!(true)));
        (instance.status(), recorder.events())
    }

    let (status, events) = run_with(5).await;
    assert_eq!(status, Status::Completed);
    assert!(events.contains(&"after:accepted".to_string()), "{:?}", events);
    assert!(!events.contains(&"before:rejected".to_string()), "{:?}", events);

    let (status, events) = run_with(-1).await;
    assert_eq!(status, Status::Completed);
    assert!(events.contains(&"after:rejected".to_string()), "{:?}", events);
    assert!(!events.contains(&"before:accepted".to_string()), "{:?}", events);
}

#[tokio::test]
async fn test_decision_with_no_satisfied_condition_dead_ends() {
    let engine = engine_with_builtins();

    let mut builder = DefinitionBuilder::new("dead-end");
    let start = builder.start_task();
    let decision = builder.decision();
    let end_a = builder.end_task();
    let end_b = builder.end_task();
    builder.flow(start, decision).expect("flow");
    builder.flow_if(decision, end_a, "x > 10").expect("flow");
    builder.flow_if(decision, end_b, "x > 100").expect("flow");
    let def = builder.build().expect("build");

    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;
    let recorder = Arc::new(Recorder::default());
    instance.subscribe(recorder.clone());

    let mut vars = HashMap::new();
    vars.insert("x".to_string(), json!(1));
    instance.start(vars).await.expect("start must not error");

    // The branch dies silently: no end task ran, the instance never
    // completed, and nothing is left pending.
    assert_eq!(instance.status(), Status::Running);
    assert!(instance.node_pool().is_empty());
    assert!(!recorder.events().contains(&"end".to_string()));
}

#[tokio::test]
async fn test_decision_with_single_flow_needs_no_condition() {
    let engine = engine_with_builtins();

    let mut builder = DefinitionBuilder::new("single-branch-decision");
    let start = builder.start_task();
    let decision = builder.decision();
    let end = builder.end_task();
    builder.flow(start, decision).expect("flow");
    builder.flow(decision, end).expect("flow");
    let def = builder.build().expect("build");

    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;
    instance.start(HashMap::new()).await.expect("start");
    assert_eq!(instance.status(), Status::Completed);
}

#[tokio::test]
async fn test_unregistered_action_fails_the_instance() {
    let engine = ProcessEngine::new();

    let mut builder = DefinitionBuilder::new("missing-action");
    let start = builder.start_task();
    let step = builder.service_task("no-such-action");
    let end = builder.end_task();
    builder.flow(start, step).expect("flow");
    builder.flow(step, end).expect("flow");
    let def = builder.build().expect("build");

    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;

    let err = instance
        .start(HashMap::new())
        .await
        .expect_err("unregistered action must fail");
    assert!(matches!(err, EngineError::Execution { .. }), "got {:?}", err);
    assert_eq!(instance.status(), Status::Failed);
}

#[tokio::test]
async fn test_events_are_delivered_in_walk_order() {
    let engine = engine_with_builtins();

    let mut builder = DefinitionBuilder::new("event-order");
    let start = builder.start_task();
    let end = builder.end_task();
    builder.task_name(start, "begin").expect("name");
    builder.task_name(end, "finish").expect("name");
    builder.flow(start, end).expect("flow");
    let def = builder.build().expect("build");

    let handle = engine.create_process_instance(def).expect("create");
    let mut instance = handle.lock().await;
    let recorder = Arc::new(Recorder::default());
    instance.subscribe(recorder.clone());
    instance.start(HashMap::new()).await.expect("start");

    assert_eq!(
        recorder.events(),
        vec![
            "before:begin".to_string(),
            "after:begin".to_string(),
            "before:finish".to_string(),
            "after:finish".to_string(),
            "end".to_string(),
        ]
    );
}
