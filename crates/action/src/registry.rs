//! The per-node-type executor registry and interceptor chain.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use nebula_core::NodeId;
use nebula_eventbus::EventBus;
use nebula_workflow::Node;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::ActionError;
use crate::snapshot::ExecutionSnapshot;

/// A node's inputs or outputs: a mapping from port id to value.
pub type PortMap = HashMap<String, Value>;

/// `(nodeId, inputs, context) -> outputs`, possibly asynchronous.
pub type ExecutorFn =
    Arc<dyn Fn(NodeId, PortMap, ExecutionSnapshot) -> BoxFuture<'static, Result<PortMap, ActionError>> + Send + Sync>;

/// An input or output transform: `(value, node, context) -> value`.
pub type TransformFn =
    Arc<dyn Fn(PortMap, &Node, &ExecutionSnapshot) -> Result<PortMap, ActionError> + Send + Sync>;

/// An input or output validator: `(value, node, context) -> bool`.
pub type ValidatorFn =
    Arc<dyn Fn(&PortMap, &Node, &ExecutionSnapshot) -> Result<bool, ActionError> + Send + Sync>;

#[derive(Default)]
struct TypeEntry {
    executor: Option<ExecutorFn>,
    input_transforms: Vec<TransformFn>,
    input_validators: Vec<ValidatorFn>,
    output_validators: Vec<ValidatorFn>,
    output_transforms: Vec<TransformFn>,
}

/// A registry of per-node-type executors and their interceptor chains.
///
/// Registration is last-wins: registering an executor for a type that
/// already has one replaces it (spec §8, "round-trip / idempotence").
pub struct NodeRegistry {
    bus: EventBus,
    entries: RwLock<HashMap<String, TypeEntry>>,
}

impl NodeRegistry {
    /// Build a registry that emits lifecycle events on `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the executor for `node_type`.
    pub fn register_executor(&self, node_type: impl Into<String>, executor: ExecutorFn) {
        self.entries.write().entry(node_type.into()).or_default().executor = Some(executor);
    }

    /// Append an input transform for `node_type`, run left-to-right before validation.
    pub fn register_input_transform(&self, node_type: impl Into<String>, transform: TransformFn) {
        self.entries
            .write()
            .entry(node_type.into())
            .or_default()
            .input_transforms
            .push(transform);
    }

    /// Append an output transform for `node_type`, run left-to-right after validation.
    pub fn register_output_transform(&self, node_type: impl Into<String>, transform: TransformFn) {
        self.entries
            .write()
            .entry(node_type.into())
            .or_default()
            .output_transforms
            .push(transform);
    }

    /// Append an input validator for `node_type`.
    pub fn register_input_validator(&self, node_type: impl Into<String>, validator: ValidatorFn) {
        self.entries
            .write()
            .entry(node_type.into())
            .or_default()
            .input_validators
            .push(validator);
    }

    /// Append an output validator for `node_type`.
    pub fn register_output_validator(&self, node_type: impl Into<String>, validator: ValidatorFn) {
        self.entries
            .write()
            .entry(node_type.into())
            .or_default()
            .output_validators
            .push(validator);
    }

    /// Whether an executor is registered for `node_type`.
    #[must_use]
    pub fn contains(&self, node_type: &str) -> bool {
        self.entries
            .read()
            .get(node_type)
            .is_some_and(|e| e.executor.is_some())
    }

    /// Run a node end-to-end: resolve its executor, run input transforms and
    /// validators, invoke the executor, run output validators and
    /// transforms, emitting `node:execution:{started,completed,failed}` on
    /// the bus at the boundaries spec §4.3 names.
    #[instrument(skip(self, inputs, context), fields(node_id = %node.id, node_type = %node.node_type))]
    pub async fn execute_node(
        &self,
        node: &Node,
        inputs: PortMap,
        context: ExecutionSnapshot,
    ) -> Result<PortMap, ActionError> {
        let node_type = node.node_type.clone();

        let (executor, input_transforms, input_validators, output_validators, output_transforms) = {
            let entries = self.entries.read();
            let Some(entry) = entries.get(&node_type) else {
                return Err(ActionError::NoExecutor { node_type });
            };
            let Some(executor) = entry.executor.clone() else {
                return Err(ActionError::NoExecutor { node_type });
            };
            (
                executor,
                entry.input_transforms.clone(),
                entry.input_validators.clone(),
                entry.output_validators.clone(),
                entry.output_transforms.clone(),
            )
        };

        self.bus
            .publish(
                "node:execution:started",
                json!({"nodeId": node.id, "nodeType": node_type, "inputs": inputs}),
            )
            .await;

        let result = self
            .run_chain(
                node,
                inputs,
                &context,
                &executor,
                &input_transforms,
                &input_validators,
                &output_validators,
                &output_transforms,
            )
            .await;

        match &result {
            Ok(outputs) => {
                self.bus
                    .publish(
                        "node:execution:completed",
                        json!({"nodeId": node.id, "nodeType": node_type, "outputs": outputs}),
                    )
                    .await;
            }
            Err(err) => {
                self.bus
                    .publish(
                        "node:execution:failed",
                        json!({"nodeId": node.id, "nodeType": node_type, "error": err.to_string()}),
                    )
                    .await;
            }
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_chain(
        &self,
        node: &Node,
        inputs: PortMap,
        context: &ExecutionSnapshot,
        executor: &ExecutorFn,
        input_transforms: &[TransformFn],
        input_validators: &[ValidatorFn],
        output_validators: &[ValidatorFn],
        output_transforms: &[TransformFn],
    ) -> Result<PortMap, ActionError> {
        let mut inputs = inputs;
        for transform in input_transforms {
            inputs = transform(inputs, node, context)?;
        }

        for validator in input_validators {
            if !validator(&inputs, node, context)? {
                return Err(ActionError::InputValidation {
                    node_type: node.node_type.clone(),
                    message: "input validator rejected inputs".into(),
                });
            }
        }

        let mut outputs = executor(node.id, inputs, context.clone()).await?;

        for validator in output_validators {
            if !validator(&outputs, node, context)? {
                return Err(ActionError::OutputValidation {
                    node_type: node.node_type.clone(),
                    message: "output validator rejected outputs".into(),
                });
            }
        }

        for transform in output_transforms {
            outputs = transform(outputs, node, context)?;
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use nebula_core::NodeId;

    use super::*;

    fn const_executor(value: i64) -> ExecutorFn {
        Arc::new(move |_id, _inputs, _ctx| Box::pin(async move { Ok(PortMap::from([("v".to_string(), json!(value))])) }))
    }

    #[tokio::test]
    async fn missing_executor_fails_fast() {
        let registry = NodeRegistry::new(EventBus::new());
        let node = Node::new(NodeId::v4(), "missing", "Missing");
        let err = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NoExecutor { .. }));
    }

    #[tokio::test]
    async fn registering_twice_is_last_wins() {
        let registry = NodeRegistry::new(EventBus::new());
        registry.register_executor("const", const_executor(1));
        registry.register_executor("const", const_executor(2));
        let node = Node::new(NodeId::v4(), "const", "Const");
        let outputs = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap();
        assert_eq!(outputs.get("v"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn input_transform_runs_before_executor() {
        let registry = NodeRegistry::new(EventBus::new());
        registry.register_executor(
            "double",
            Arc::new(|_id, inputs, _ctx| {
                Box::pin(async move {
                    let v = inputs.get("v").and_then(Value::as_i64).unwrap_or(0);
                    Ok(PortMap::from([("v".to_string(), json!(v * 2))]))
                })
            }),
        );
        registry.register_input_transform(
            "double",
            Arc::new(|mut inputs, _node, _ctx| {
                inputs.insert("v".to_string(), json!(10));
                Ok(inputs)
            }),
        );
        let node = Node::new(NodeId::v4(), "double", "Double");
        let outputs = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap();
        assert_eq!(outputs.get("v"), Some(&json!(20)));
    }

    #[tokio::test]
    async fn failing_input_validator_rejects_before_executor_runs() {
        let registry = NodeRegistry::new(EventBus::new());
        registry.register_executor("const", const_executor(1));
        registry.register_input_validator("const", Arc::new(|_inputs, _node, _ctx| Ok(false)));
        let node = Node::new(NodeId::v4(), "const", "Const");
        let err = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InputValidation { .. }));
    }

    #[tokio::test]
    async fn failing_output_validator_is_surfaced() {
        let registry = NodeRegistry::new(EventBus::new());
        registry.register_executor("const", const_executor(1));
        registry.register_output_validator("const", Arc::new(|_outputs, _node, _ctx| Ok(false)));
        let node = Node::new(NodeId::v4(), "const", "Const");
        let err = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::OutputValidation { .. }));
    }

    #[tokio::test]
    async fn output_transform_runs_after_validation() {
        let registry = NodeRegistry::new(EventBus::new());
        registry.register_executor("const", const_executor(1));
        registry.register_output_transform(
            "const",
            Arc::new(|mut outputs, _node, _ctx| {
                outputs.insert("doubled".to_string(), json!(2));
                Ok(outputs)
            }),
        );
        let node = Node::new(NodeId::v4(), "const", "Const");
        let outputs = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap();
        assert_eq!(outputs.get("doubled"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn executor_error_propagates_as_user_code_error() {
        let registry = NodeRegistry::new(EventBus::new());
        registry.register_executor(
            "boom",
            Arc::new(|_id, _inputs, _ctx| {
                Box::pin(async move {
                    Err(ActionError::UserCode {
                        node_type: "boom".into(),
                        message: "kaboom".into(),
                    })
                })
            }),
        );
        let node = Node::new(NodeId::v4(), "boom", "Boom");
        let err = registry
            .execute_node(&node, PortMap::new(), ExecutionSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UserCode { .. }));
    }
}
