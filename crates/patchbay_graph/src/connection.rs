// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.
//!
//! A connection always runs from an output port to an input port, whichever
//! end the user started dragging from.

use crate::node::NodeId;
use crate::port::{PortId, PortKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two ends of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEnd {
    /// The output side
    From,
    /// The input side
    To,
}

impl ConnectionEnd {
    /// The other end
    pub fn opposite(self) -> Self {
        match self {
            Self::From => Self::To,
            Self::To => Self::From,
        }
    }
}

/// A connection between two ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source (output) port ID
    pub from_port: PortId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target (input) port ID
    pub to_port: PortId,
    /// Opaque payload
    pub data: Option<serde_json::Value>,
}

impl Connection {
    /// Create a new connection from an output to an input
    pub fn new(from: PortKey, to: PortKey) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node: from.node_id,
            from_port: from.port_id,
            to_node: to.node_id,
            to_port: to.port_id,
            data: None,
        }
    }

    /// Address of the output end
    pub fn source(&self) -> PortKey {
        PortKey::new(self.from_node, self.from_port.clone())
    }

    /// Address of the input end
    pub fn target(&self) -> PortKey {
        PortKey::new(self.to_node, self.to_port.clone())
    }

    /// Address of one end
    pub fn end(&self, end: ConnectionEnd) -> PortKey {
        match end {
            ConnectionEnd::From => self.source(),
            ConnectionEnd::To => self.target(),
        }
    }

    /// Which end sits on `port`, if any
    pub fn end_at(&self, port: &PortKey) -> Option<ConnectionEnd> {
        if self.from_node == port.node_id && self.from_port == port.port_id {
            Some(ConnectionEnd::From)
        } else if self.to_node == port.node_id && self.to_port == port.port_id {
            Some(ConnectionEnd::To)
        } else {
            None
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this connection touches a specific port
    pub fn involves_port(&self, port: &PortKey) -> bool {
        self.end_at(port).is_some()
    }

    /// Both connections join the same pair of ports
    pub fn same_endpoints(&self, other: &Connection) -> bool {
        self.from_node == other.from_node
            && self.from_port == other.from_port
            && self.to_node == other.to_node
            && self.to_port == other.to_port
    }
}
