//! End-to-end scheduling scenarios.

use std::sync::Arc;
use std::time::Duration;

use nebula_action::{ExecutionSnapshot, NodeRegistry, PortMap};
use nebula_core::{NodeId, WorkflowId};
use nebula_engine::{Engine, ExecuteOptions, EngineError};
use nebula_eventbus::EventBus;
use nebula_execution::ExecutionStatus;
use nebula_workflow::{Connection, Node, Port, Workflow};
use serde_json::json;

fn engine() -> (Arc<Engine>, EventBus, Arc<NodeRegistry>) {
    let bus = EventBus::new();
    let registry = Arc::new(NodeRegistry::new(bus.clone()));
    let engine = Arc::new(Engine::new(bus.clone(), Arc::clone(&registry)));
    (engine, bus, registry)
}

fn register_const(registry: &NodeRegistry, output: serde_json::Value) {
    registry.register_executor(
        "const",
        Arc::new(move |_node_id: NodeId, _inputs: PortMap, _ctx: ExecutionSnapshot| {
            let output = output.clone();
            Box::pin(async move {
                let Some(obj) = output.as_object() else {
                    return Ok(PortMap::new());
                };
                Ok(obj.clone().into_iter().collect())
            })
        }),
    );
}

#[tokio::test]
async fn s1_linear_sum() {
    let (engine, _bus, registry) = engine();

    registry.register_executor(
        "const",
        Arc::new(|_node_id, _inputs, _ctx| Box::pin(async move { Ok(PortMap::from([("v".to_string(), json!(7))])) })),
    );
    registry.register_executor(
        "double",
        Arc::new(|_node_id, inputs: PortMap, _ctx| {
            Box::pin(async move {
                let v = inputs.get("v").and_then(serde_json::Value::as_i64).unwrap_or(0);
                Ok(PortMap::from([("v".to_string(), json!(v * 2))]))
            })
        }),
    );
    registry.register_executor(
        "sink",
        Arc::new(|_node_id, inputs: PortMap, _ctx| Box::pin(async move { Ok(inputs) })),
    );

    let mut wf = Workflow::new(WorkflowId::v4(), "s1");
    let a = Node::new(NodeId::v4(), "const", "A").with_output(Port::output("v", "V", "number"));
    let b = Node::new(NodeId::v4(), "double", "B")
        .with_input(Port::input("v", "V", "number"))
        .with_output(Port::output("v", "V", "number"));
    let c = Node::new(NodeId::v4(), "sink", "C")
        .with_input(Port::input("v", "V", "number"))
        .with_output(Port::output("v", "V", "number"));
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);
    wf.add_node(a);
    wf.add_node(b);
    wf.add_node(c);
    wf.add_connection(Connection::new(a_id, "v", b_id, "v"));
    wf.add_connection(Connection::new(b_id, "v", c_id, "v"));
    wf.add_entry_point(a_id);
    wf.add_exit_point(c_id);

    let result = engine.execute_workflow(&wf, ExecuteOptions::default()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.stats.nodes_executed, 3);
    assert_eq!(result.outputs.get(&c_id).unwrap().get("v"), Some(&json!(14)));
}

#[tokio::test]
async fn s2_diamond_under_parallel_mode() {
    let (engine, _bus, registry) = engine();

    registry.register_executor(
        "s",
        Arc::new(|_node_id, _inputs, _ctx| Box::pin(async move { Ok(PortMap::from([("x".to_string(), json!(1))])) })),
    );
    registry.register_executor(
        "l",
        Arc::new(|_node_id, inputs: PortMap, _ctx| {
            Box::pin(async move {
                let x = inputs.get("x").and_then(serde_json::Value::as_i64).unwrap_or(0);
                Ok(PortMap::from([("y".to_string(), json!(x + 1))]))
            })
        }),
    );
    registry.register_executor(
        "r",
        Arc::new(|_node_id, inputs: PortMap, _ctx| {
            Box::pin(async move {
                let x = inputs.get("x").and_then(serde_json::Value::as_i64).unwrap_or(0);
                Ok(PortMap::from([("z".to_string(), json!(x + 2))]))
            })
        }),
    );
    registry.register_executor(
        "j",
        Arc::new(|_node_id, inputs: PortMap, _ctx| {
            Box::pin(async move {
                let y = inputs.get("y").and_then(serde_json::Value::as_i64).unwrap_or(0);
                let z = inputs.get("z").and_then(serde_json::Value::as_i64).unwrap_or(0);
                Ok(PortMap::from([("out".to_string(), json!(y + z))]))
            })
        }),
    );

    let mut wf = Workflow::new(WorkflowId::v4(), "s2");
    let s = Node::new(NodeId::v4(), "s", "S").with_output(Port::output("x", "X", "number"));
    let l = Node::new(NodeId::v4(), "l", "L")
        .with_input(Port::input("x", "X", "number"))
        .with_output(Port::output("y", "Y", "number"));
    let r = Node::new(NodeId::v4(), "r", "R")
        .with_input(Port::input("x", "X", "number"))
        .with_output(Port::output("z", "Z", "number"));
    let j = Node::new(NodeId::v4(), "j", "J")
        .with_input(Port::input("y", "Y", "number"))
        .with_input(Port::input("z", "Z", "number"))
        .with_output(Port::output("out", "Out", "number"));
    let (s_id, l_id, r_id, j_id) = (s.id, l.id, r.id, j.id);
    wf.add_node(s);
    wf.add_node(l);
    wf.add_node(r);
    wf.add_node(j);
    wf.add_connection(Connection::new(s_id, "x", l_id, "x"));
    wf.add_connection(Connection::new(s_id, "x", r_id, "x"));
    wf.add_connection(Connection::new(l_id, "y", j_id, "y"));
    wf.add_connection(Connection::new(r_id, "z", j_id, "z"));
    wf.add_entry_point(s_id);
    wf.add_exit_point(j_id);

    let result = engine
        .execute_workflow(&wf, ExecuteOptions { parallel: true, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.outputs.get(&j_id).unwrap().get("out"), Some(&json!(5)));
}

#[tokio::test]
async fn s3_cycle_rejected_with_no_node_start_events() {
    let (engine, bus, _registry) = engine();

    let start_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&start_count);
    bus.subscribe(
        "node:execution:started",
        Arc::new(move |_payload| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
        }),
        Default::default(),
    );

    let mut wf = Workflow::new(WorkflowId::v4(), "s3");
    let a = Node::new(NodeId::v4(), "t", "A");
    let b = Node::new(NodeId::v4(), "t", "B");
    let (a_id, b_id) = (a.id, b.id);
    wf.add_node(a);
    wf.add_node(b);
    wf.add_connection(Connection::new(a_id, "out", b_id, "in"));
    wf.add_connection(Connection::new(b_id, "out", a_id, "in"));

    let err = engine.execute_workflow(&wf, ExecuteOptions::default()).await.unwrap_err();
    match err {
        EngineError::Workflow(nebula_workflow::WorkflowError::CycleDetected(node)) => {
            assert!(node == a_id || node == b_id);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert_eq!(start_count.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn s4_mid_run_cancel() {
    let (engine, bus, registry) = engine();
    register_const(&registry, json!({"v": 1}));

    let a_done = Arc::new(tokio::sync::Notify::new());
    let a_done_tx = Arc::clone(&a_done);
    registry.register_executor(
        "signal",
        Arc::new(move |_node_id, inputs: PortMap, _ctx| {
            let a_done_tx = Arc::clone(&a_done_tx);
            Box::pin(async move {
                a_done_tx.notify_waiters();
                Ok(inputs)
            })
        }),
    );
    registry.register_executor(
        "slow",
        Arc::new(|_node_id, inputs: PortMap, _ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(inputs)
            })
        }),
    );

    let mut wf = Workflow::new(WorkflowId::v4(), "s4");
    let a = Node::new(NodeId::v4(), "signal", "A")
        .with_output(Port::output("v", "V", "number"));
    let b = Node::new(NodeId::v4(), "slow", "B")
        .with_input(Port::input("v", "V", "number"))
        .with_output(Port::output("v", "V", "number"));
    let c = Node::new(NodeId::v4(), "signal", "C").with_input(Port::input("v", "V", "number"));
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);
    wf.add_node(a);
    wf.add_node(b);
    wf.add_node(c);
    wf.add_connection(Connection::new(a_id, "v", b_id, "v"));
    wf.add_connection(Connection::new(b_id, "v", c_id, "v"));
    wf.add_entry_point(a_id);
    wf.add_exit_point(c_id);
    let workflow_id = wf.id;

    let failed_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&failed_count);
    bus.subscribe(
        "workflow:failed",
        Arc::new(move |_payload| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
        }),
        Default::default(),
    );

    let run_engine = Arc::clone(&engine);
    let run = tokio::spawn(async move { run_engine.execute_workflow(&wf, ExecuteOptions::default()).await });

    a_done.notified().await;
    // Give the scheduler a moment to actually enter node B before stopping.
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.stop_workflow(workflow_id).await.unwrap();

    let result = run.await.unwrap();
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(failed_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(engine.get_workflow_status(workflow_id), ExecutionStatus::Completed);
}

#[tokio::test]
async fn empty_workflow_completes_immediately() {
    let (engine, _bus, _registry) = engine();
    let wf = Workflow::new(WorkflowId::v4(), "empty");

    let result = engine.execute_workflow(&wf, ExecuteOptions::default()).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.stats.nodes_executed, 0);
    assert!(result.outputs.is_empty());
}

#[tokio::test]
async fn entry_node_that_is_also_exit_node_returns_its_outputs() {
    let (engine, _bus, registry) = engine();
    register_const(&registry, json!({"v": 9}));

    let mut wf = Workflow::new(WorkflowId::v4(), "single");
    let node = Node::new(NodeId::v4(), "const", "A").with_output(Port::output("v", "V", "number"));
    let node_id = node.id;
    wf.add_node(node);
    wf.add_entry_point(node_id);
    wf.add_exit_point(node_id);

    let result = engine.execute_workflow(&wf, ExecuteOptions::default()).await.unwrap();
    assert_eq!(result.outputs.get(&node_id).unwrap().get("v"), Some(&json!(9)));
}

#[tokio::test]
async fn zero_timeout_means_no_timeout() {
    let (engine, _bus, registry) = engine();
    register_const(&registry, json!({"v": 1}));

    let mut wf = Workflow::new(WorkflowId::v4(), "zero_timeout");
    let node = Node::new(NodeId::v4(), "const", "A").with_output(Port::output("v", "V", "number"));
    let node_id = node.id;
    wf.add_node(node);
    wf.add_entry_point(node_id);
    wf.add_exit_point(node_id);

    let result = engine
        .execute_workflow(&wf, ExecuteOptions { timeout: Some(Duration::ZERO), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn pause_gates_the_scheduler_until_resumed() {
    let (engine, _bus, registry) = engine();

    let a_started = Arc::new(tokio::sync::Notify::new());
    let a_started_tx = Arc::clone(&a_started);
    registry.register_executor(
        "slow_signal",
        Arc::new(move |_node_id, inputs: PortMap, _ctx| {
            let a_started_tx = Arc::clone(&a_started_tx);
            Box::pin(async move {
                a_started_tx.notify_waiters();
                // Held open long enough that the test is guaranteed to call
                // `pause_workflow` before the scheduler reaches node B.
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(inputs)
            })
        }),
    );
    register_const(&registry, json!({}));

    let mut wf = Workflow::new(WorkflowId::v4(), "pause");
    let a = Node::new(NodeId::v4(), "slow_signal", "A").with_output(Port::output("v", "V", "number"));
    let b = Node::new(NodeId::v4(), "const", "B").with_input(Port::input("v", "V", "number"));
    let (a_id, b_id) = (a.id, b.id);
    wf.add_node(a);
    wf.add_node(b);
    wf.add_connection(Connection::new(a_id, "v", b_id, "v"));
    wf.add_entry_point(a_id);
    wf.add_exit_point(b_id);
    let workflow_id = wf.id;

    let run_engine = Arc::clone(&engine);
    let run = tokio::spawn(async move { run_engine.execute_workflow(&wf, ExecuteOptions::default()).await });

    a_started.notified().await;
    engine.pause_workflow(workflow_id).unwrap();
    assert_eq!(engine.get_workflow_status(workflow_id), ExecutionStatus::Paused);

    // Node A keeps running to completion (already started); node B must not
    // start until resumed, well past when A would have finished unpaused.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!run.is_finished());

    engine.resume_workflow(workflow_id).unwrap();
    let result = run.await.unwrap().unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
}
