// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is the authoritative node/connection store and the mutation
//! sink the engine writes to. Both maps keep insertion order, which the
//! connectable-set planner and candidate resolver rely on for deterministic
//! iteration.

use crate::connection::{Connection, ConnectionId};
use crate::node::{Node, NodeId};
use crate::port::PortKey;
use crate::provider::{resolve_port, DefinitionProvider, PortProvider};
use crate::switch::{apply_switch_plan, plan_switch};
use crate::validate::Rejection;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections.retain(|_, c| !c.involves_node(node_id));
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Nodes of a given type
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.node_type == node_type)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Store a connection record.
    ///
    /// This is the raw mutation sink: it only guards structural integrity
    /// (both nodes exist, no self-loop, no id reuse). Compatibility is
    /// decided beforehand by the validator and switch planner.
    pub fn insert_connection(&mut self, connection: Connection) -> Result<ConnectionId, GraphError> {
        self.check_insert(&connection)?;
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Whether [`Graph::insert_connection`] would accept a record
    pub fn check_insert(&self, connection: &Connection) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&connection.from_node) {
            return Err(GraphError::NodeNotFound(connection.from_node));
        }
        if !self.nodes.contains_key(&connection.to_node) {
            return Err(GraphError::NodeNotFound(connection.to_node));
        }
        if connection.from_node == connection.to_node {
            return Err(GraphError::SelfLoop);
        }
        if self.connections.contains_key(&connection.id) {
            return Err(GraphError::DuplicateConnection(connection.id));
        }
        Ok(())
    }

    /// Remove a connection
    pub fn delete_connection(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&connection_id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections touching a port, at either end
    pub fn connections_at<'a>(&'a self, port: &'a PortKey) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.involves_port(port))
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connect two ports programmatically, in either order.
    ///
    /// Runs the same decision as a completed drag: an occupied
    /// single-connection target is replaced, anything the switch planner
    /// ignores is reported as an error.
    pub fn connect<P>(&mut self, provider: &P, a: &PortKey, b: &PortKey) -> Result<ConnectionId, GraphError>
    where
        P: DefinitionProvider + PortProvider,
    {
        let port_a = resolve_port(self, provider, a).ok_or_else(|| GraphError::PortNotFound(a.clone()))?;
        let port_b = resolve_port(self, provider, b).ok_or_else(|| GraphError::PortNotFound(b.clone()))?;

        let plan = plan_switch(&port_a, &port_b, self, provider);
        if let Some(rejection) = plan.rejection {
            return Err(GraphError::Rejected(rejection));
        }
        apply_switch_plan(self, &plan)?.ok_or(GraphError::EmptyPlan)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when mutating the graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortKey),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// A connection with this ID is already stored
    #[error("Connection already exists: {0}")]
    DuplicateConnection(ConnectionId),

    /// The ports may not be connected
    #[error("Connection rejected: {0}")]
    Rejected(Rejection),

    /// A plan without a rejection carried no connection to add
    #[error("Switch plan has no connection to add")]
    EmptyPlan,
}
