// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::graph::Graph;
use crate::port::{Port, PortDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Default node size in canvas units
pub const DEFAULT_NODE_SIZE: [f32; 2] = [180.0, 60.0];

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants, parameters)
    Input,
    /// Output nodes (result, preview)
    Output,
    /// Math operations
    Math,
    /// Texture operations
    Texture,
    /// Logic/flow control
    Logic,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// Extra veto a node type applies to connections touching it.
///
/// Called with `(source_port, target_port, source_node, target_node)` after
/// every built-in rule has passed.
#[derive(Clone)]
pub struct ConnectionRule(Arc<dyn Fn(&Port, &Port, &Node, &Node) -> bool + Send + Sync>);

impl ConnectionRule {
    /// Wrap a predicate
    pub fn new(rule: impl Fn(&Port, &Port, &Node, &Node) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(rule))
    }

    /// Evaluate the predicate
    pub fn allows(&self, source: &Port, target: &Port, source_node: &Node, target_node: &Node) -> bool {
        (self.0)(source, target, source_node, target_node)
    }
}

impl fmt::Debug for ConnectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionRule(..)")
    }
}

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeDefinition {
    /// Unique type identifier
    pub node_type: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Declared ports, in display order
    pub ports: Vec<PortDefinition>,
    /// Custom connection veto
    pub validate_connection: Option<ConnectionRule>,
    /// Maximum number of nodes of this type in one graph
    pub max_instances: Option<usize>,
}

impl NodeDefinition {
    /// Create a definition without ports
    pub fn new(node_type: impl Into<String>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            node_type: node_type.into(),
            name: name.into(),
            category,
            description: String::new(),
            ports: Vec::new(),
            validate_connection: None,
            max_instances: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a port
    pub fn with_port(mut self, port: PortDefinition) -> Self {
        self.ports.push(port);
        self
    }

    /// Install a custom connection veto
    pub fn with_rule(
        mut self,
        rule: impl Fn(&Port, &Port, &Node, &Node) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validate_connection = Some(ConnectionRule::new(rule));
        self
    }

    /// Cap the number of instances per graph
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }

    /// Derive the concrete ports of a node of this type
    pub fn derive_ports(&self, node: &Node) -> Vec<Port> {
        self.ports.iter().flat_map(|port| port.instantiate(node)).collect()
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Display name (can be customized)
    pub name: String,
    /// Position of the top-left corner on the canvas
    pub position: [f32; 2],
    /// Width and height on the canvas
    pub size: [f32; 2],
    /// Opaque per-node payload; also drives repeated ports
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Group this node belongs to
    pub parent_id: Option<NodeId>,
    /// Locked nodes cannot be moved
    pub locked: bool,
}

impl Node {
    /// Create a new node of a type
    pub fn new(node_type: impl Into<String>) -> Self {
        let node_type = node_type.into();
        Self {
            id: NodeId::new(),
            name: node_type.clone(),
            node_type,
            position: [0.0, 0.0],
            size: DEFAULT_NODE_SIZE,
            data: serde_json::Map::new(),
            parent_id: None,
            locked: false,
        }
    }

    /// Create a new node from a type definition
    pub fn from_definition(definition: &NodeDefinition) -> Self {
        let mut node = Self::new(definition.node_type.clone());
        node.name = definition.name.clone();
        node
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set the size
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = [width, height];
        self
    }

    /// Set a data entry
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Put the node in a group
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

/// Registry of available node types
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: indexmap::IndexMap<String, NodeDefinition>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Register a node type, replacing any previous one with the same ID
    pub fn register(&mut self, definition: NodeDefinition) {
        self.types.insert(definition.node_type.clone(), definition);
    }

    /// Get a node type by ID
    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.types.get(node_type)
    }

    /// Get all registered types, in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeDefinition> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// No types registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether one more node of this type fits in the graph
    pub fn can_instantiate(&self, graph: &Graph, node_type: &str) -> bool {
        match self.get(node_type) {
            Some(definition) => definition
                .max_instances
                .map_or(true, |max| graph.nodes_of_type(node_type).count() < max),
            None => false,
        }
    }

    /// Create a node from a type ID
    pub fn create_node(&self, node_type: &str) -> Option<Node> {
        self.get(node_type).map(Node::from_definition)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
