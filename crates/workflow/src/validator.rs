//! Structural validation of nodes, connections, and whole workflows.

use std::collections::{HashMap, HashSet};

use nebula_core::{ConnectionId, NodeId};

use crate::connection::Connection;
use crate::node::Node;
use crate::workflow::Workflow;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The id of the rule that failed.
    pub rule_id: String,
    /// Human-readable failure message.
    pub message: String,
}

/// A named, user-extensible validation rule over a [`Node`].
pub struct Rule {
    /// Unique rule identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The predicate; `true` means the node passes.
    pub predicate: Box<dyn Fn(&Node) -> bool + Send + Sync>,
    /// Message attached to the resulting error when the predicate fails.
    pub message: String,
}

impl Rule {
    /// Construct a new rule.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&Node) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            predicate: Box::new(predicate),
            message: message.into(),
        }
    }
}

/// Result of validating a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeValidation {
    /// Whether every applicable rule passed.
    pub ok: bool,
    /// Failures, one per rule that did not pass.
    pub errors: Vec<ValidationError>,
}

/// Result of validating a whole workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowValidation {
    /// Whether every node and every connection passed validation.
    pub ok: bool,
    /// Per-node validation errors, keyed by node id.
    pub node_errors: HashMap<NodeId, Vec<ValidationError>>,
    /// Connection validation errors, keyed by connection id.
    pub connection_errors: HashMap<ConnectionId, ValidationError>,
}

/// A registry of node-validation rules, including the built-in ones.
pub struct Validator {
    rules: Vec<Rule>,
}

impl Validator {
    /// Construct a validator carrying the built-in rules: non-empty id,
    /// non-empty name, unique port ids (per direction).
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: vec![
                Rule::new(
                    "non_empty_id",
                    "Non-empty id",
                    "node id must not be nil",
                    |node| !node.id.is_nil(),
                ),
                Rule::new(
                    "non_empty_name",
                    "Non-empty name",
                    "node name must not be empty",
                    |node| !node.name.trim().is_empty(),
                ),
                Rule::new(
                    "unique_port_ids",
                    "Unique port ids",
                    "input and output port ids must each be unique on a node",
                    |node| !node.has_duplicate_port_ids(),
                ),
            ],
        }
    }

    /// Register an additional rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Remove a rule by id; returns `true` if a rule was removed.
    pub fn remove_rule(&mut self, rule_id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != rule_id);
        self.rules.len() != before
    }

    /// Look up a rule by id.
    #[must_use]
    pub fn get_rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// Validate a node against every rule, or a named subset if `rule_ids`
    /// is `Some`.
    #[must_use]
    pub fn validate_node(&self, node: &Node, rule_ids: Option<&[&str]>) -> NodeValidation {
        let mut errors = Vec::new();
        for rule in &self.rules {
            if let Some(ids) = rule_ids {
                if !ids.contains(&rule.id.as_str()) {
                    continue;
                }
            }
            if !(rule.predicate)(node) {
                errors.push(ValidationError {
                    rule_id: rule.id.clone(),
                    message: rule.message.clone(),
                });
            }
        }
        NodeValidation {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// Validate a connection: source/target ports must exist on their
    /// nodes with the right directions, and data types must match exactly.
    pub fn validate_connection(
        &self,
        connection: &Connection,
        source_node: &Node,
        target_node: &Node,
    ) -> Option<ValidationError> {
        let Some(source_port) = source_node.output_port(&connection.source_port_id) else {
            return Some(ValidationError {
                rule_id: "port_exists".into(),
                message: format!(
                    "source port {} not found on node {}",
                    connection.source_port_id, source_node.id
                ),
            });
        };
        let Some(target_port) = target_node.input_port(&connection.target_port_id) else {
            return Some(ValidationError {
                rule_id: "port_exists".into(),
                message: format!(
                    "target port {} not found on node {}",
                    connection.target_port_id, target_node.id
                ),
            });
        };
        if source_port.data_type != target_port.data_type {
            return Some(ValidationError {
                rule_id: "type_match".into(),
                message: format!(
                    "type mismatch: {} != {}",
                    source_port.data_type, target_port.data_type
                ),
            });
        }
        None
    }

    /// Validate every node and connection of a workflow. `ok` is `true`
    /// only if every node and every connection passed.
    #[must_use]
    pub fn validate_workflow(&self, workflow: &Workflow) -> WorkflowValidation {
        let mut node_errors = HashMap::new();
        for node in workflow.nodes.values() {
            let result = self.validate_node(node, None);
            if !result.ok {
                node_errors.insert(node.id, result.errors);
            }
        }

        let mut connection_errors = HashMap::new();
        let mut seen_targets: HashSet<(NodeId, &str)> = HashSet::new();
        let mut seen_edges: HashSet<(NodeId, &str, NodeId, &str)> = HashSet::new();

        for connection in workflow.connections.values() {
            let Some(source_node) = workflow.nodes.get(&connection.source_node_id) else {
                connection_errors.insert(
                    connection.id,
                    ValidationError {
                        rule_id: "node_exists".into(),
                        message: format!("source node {} not found", connection.source_node_id),
                    },
                );
                continue;
            };
            let Some(target_node) = workflow.nodes.get(&connection.target_node_id) else {
                connection_errors.insert(
                    connection.id,
                    ValidationError {
                        rule_id: "node_exists".into(),
                        message: format!("target node {} not found", connection.target_node_id),
                    },
                );
                continue;
            };

            if let Some(err) = self.validate_connection(connection, source_node, target_node) {
                connection_errors.insert(connection.id, err);
                continue;
            }

            let target_key = (connection.target_node_id, connection.target_port_id.as_str());
            if !seen_targets.insert(target_key) {
                connection_errors.insert(
                    connection.id,
                    ValidationError {
                        rule_id: "fan_in".into(),
                        message: format!(
                            "node {} port {} already has an incoming connection",
                            connection.target_node_id, connection.target_port_id
                        ),
                    },
                );
                continue;
            }

            let edge_key = connection.endpoints();
            if !seen_edges.insert(edge_key) {
                connection_errors.insert(
                    connection.id,
                    ValidationError {
                        rule_id: "duplicate_connection".into(),
                        message: "duplicate connection".into(),
                    },
                );
            }
        }

        let ok = node_errors.is_empty() && connection_errors.is_empty();
        WorkflowValidation {
            ok,
            node_errors,
            connection_errors,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Port;

    #[test]
    fn builtin_rules_reject_empty_name() {
        let validator = Validator::new();
        let node = Node::new(NodeId::v4(), "t", "");
        let result = validator.validate_node(&node, None);
        assert!(!result.ok);
        assert_eq!(result.errors[0].rule_id, "non_empty_name");
    }

    #[test]
    fn valid_node_passes() {
        let validator = Validator::new();
        let node = Node::new(NodeId::v4(), "t", "Valid");
        assert!(validator.validate_node(&node, None).ok);
    }

    #[test]
    fn custom_rule_can_be_added_and_removed() {
        let mut validator = Validator::new();
        validator.add_rule(Rule::new("even_name_len", "Even name length", "name must have even length", |n| {
            n.name.len() % 2 == 0
        }));
        let node = Node::new(NodeId::v4(), "t", "odd");
        assert!(!validator.validate_node(&node, None).ok);

        assert!(validator.remove_rule("even_name_len"));
        assert!(validator.validate_node(&node, None).ok);
        assert!(!validator.remove_rule("even_name_len"));
    }

    #[test]
    fn rule_subset_only_runs_named_rules() {
        let validator = Validator::new();
        let node = Node::new(NodeId::v4(), "t", "");
        let result = validator.validate_node(&node, Some(&["non_empty_id"]));
        assert!(result.ok);
    }

    #[test]
    fn builtin_rules_reject_duplicate_port_ids() {
        let validator = Validator::new();
        let node = Node::new(NodeId::v4(), "t", "Dup")
            .with_input(Port::input("v", "V", "number"))
            .with_input(Port::input("v", "V", "number"));
        let result = validator.validate_node(&node, None);
        assert!(!result.ok);
        assert!(result.errors.iter().any(|e| e.rule_id == "unique_port_ids"));
    }

    #[test]
    fn get_rule_by_id() {
        let validator = Validator::new();
        assert!(validator.get_rule("non_empty_id").is_some());
        assert!(validator.get_rule("missing").is_none());
    }

    #[test]
    fn validate_connection_rejects_missing_port() {
        let validator = Validator::new();
        let a = Node::new(NodeId::v4(), "t", "A").with_output(Port::output("out", "Out", "number"));
        let b = Node::new(NodeId::v4(), "t", "B");
        let conn = Connection::new(a.id, "out", b.id, "missing");
        assert!(validator.validate_connection(&conn, &a, &b).is_some());
    }

    #[test]
    fn validate_connection_rejects_type_mismatch() {
        let validator = Validator::new();
        let a = Node::new(NodeId::v4(), "t", "A").with_output(Port::output("out", "Out", "number"));
        let b = Node::new(NodeId::v4(), "t", "B").with_input(Port::input("in", "In", "string"));
        let conn = Connection::new(a.id, "out", b.id, "in");
        let err = validator.validate_connection(&conn, &a, &b).unwrap();
        assert_eq!(err.rule_id, "type_match");
    }

    #[test]
    fn validate_connection_accepts_matching_types() {
        let validator = Validator::new();
        let a = Node::new(NodeId::v4(), "t", "A").with_output(Port::output("out", "Out", "number"));
        let b = Node::new(NodeId::v4(), "t", "B").with_input(Port::input("in", "In", "number"));
        let conn = Connection::new(a.id, "out", b.id, "in");
        assert!(validator.validate_connection(&conn, &a, &b).is_none());
    }

    #[test]
    fn validate_workflow_detects_fan_in_violation() {
        let validator = Validator::new();
        let mut wf = Workflow::new(nebula_core::WorkflowId::v4(), "wf");
        let a = Node::new(NodeId::v4(), "t", "A").with_output(Port::output("out", "Out", "number"));
        let b = Node::new(NodeId::v4(), "t", "B").with_input(Port::input("in", "In", "number"));
        let a_id = a.id;
        let b_id = b.id;
        wf.add_node(a);
        wf.add_node(b);
        wf.add_connection(Connection::new(a_id, "out", b_id, "in"));
        wf.add_connection(Connection::new(a_id, "out", b_id, "in"));

        let result = validator.validate_workflow(&wf);
        assert!(!result.ok);
        assert_eq!(result.connection_errors.len(), 1);
    }

    #[test]
    fn validate_workflow_passes_for_clean_graph() {
        let validator = Validator::new();
        let mut wf = Workflow::new(nebula_core::WorkflowId::v4(), "wf");
        let a = Node::new(NodeId::v4(), "t", "A").with_output(Port::output("out", "Out", "number"));
        let b = Node::new(NodeId::v4(), "t", "B").with_input(Port::input("in", "In", "number"));
        let a_id = a.id;
        let b_id = b.id;
        wf.add_node(a);
        wf.add_node(b);
        wf.add_connection(Connection::new(a_id, "out", b_id, "in"));

        let result = validator.validate_workflow(&wf);
        assert!(result.ok, "{result:?}");
    }

    #[test]
    fn validate_workflow_detects_dangling_node_reference() {
        let validator = Validator::new();
        let mut wf = Workflow::new(nebula_core::WorkflowId::v4(), "wf");
        let a = Node::new(NodeId::v4(), "t", "A").with_output(Port::output("out", "Out", "number"));
        let a_id = a.id;
        wf.add_node(a);
        wf.add_connection(Connection::new(a_id, "out", NodeId::v4(), "in"));

        let result = validator.validate_workflow(&wf);
        assert!(!result.ok);
    }
}
