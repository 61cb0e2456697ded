// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collaborator interfaces the engine reads from.
//!
//! Node type lookup, port derivation and port geometry all live outside the
//! engine. The engine only sees them through these traits, so an editor can
//! back them with whatever caches it already keeps.

use crate::graph::Graph;
use crate::node::{Node, NodeDefinition, NodeRegistry};
use crate::port::{Port, PortKey};
use egui::Pos2;

/// Lookup of node type definitions
pub trait DefinitionProvider {
    /// Definition for a node type
    fn definition(&self, node_type: &str) -> Option<&NodeDefinition>;

    /// All known node types, in a stable order
    fn node_types(&self) -> Vec<String>;
}

/// Derivation of a node's current ports
pub trait PortProvider {
    /// Ports of a node, in display order
    fn ports_of(&self, node: &Node) -> Vec<Port>;
}

/// Live on-canvas anchor points of ports
pub trait GeometryProvider {
    /// Canvas position a wire attaches to, if layout has computed one
    fn connection_point(&self, port: &PortKey) -> Option<Pos2>;

    /// Port whose connection point lies within `radius` of `pos`
    fn port_at(&self, _pos: Pos2, _radius: f32) -> Option<PortKey> {
        None
    }
}

impl DefinitionProvider for NodeRegistry {
    fn definition(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.get(node_type)
    }

    fn node_types(&self) -> Vec<String> {
        self.definitions().map(|d| d.node_type.clone()).collect()
    }
}

impl PortProvider for NodeRegistry {
    fn ports_of(&self, node: &Node) -> Vec<Port> {
        self.get(&node.node_type)
            .map(|definition| definition.derive_ports(node))
            .unwrap_or_default()
    }
}

/// Resolve a port key to the port's current derived form
pub fn resolve_port<P: PortProvider + ?Sized>(graph: &Graph, ports: &P, key: &PortKey) -> Option<Port> {
    let node = graph.node(key.node_id)?;
    ports.ports_of(node).into_iter().find(|p| p.id == key.port_id)
}
