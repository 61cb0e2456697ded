// SPDX-License-Identifier: MIT OR Apache-2.0
//! Every port an anchor may legally be wired to.
//!
//! Computed once when a gesture starts (and on hover outside a gesture),
//! never per pointer-move. Each entry carries the switch behavior that
//! completing onto it would have, so the renderer can tell "will add" from
//! "will replace" without planning again.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::{PortDirection, PortId, PortKey};
use crate::provider::{resolve_port, DefinitionProvider, PortProvider};
use crate::switch::{plan_endpoints, SwitchBehavior};
use crate::validate::{Endpoint, ValidationContext};
use indexmap::{IndexMap, IndexSet};

/// The anchor a connectable set was computed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Anchor node
    pub node_id: NodeId,
    /// Anchor port
    pub port_id: PortId,
    /// Anchor direction
    pub direction: PortDirection,
}

/// Per-target metadata of a connectable port
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescriptor {
    /// Target node
    pub node_id: NodeId,
    /// Target port
    pub port_id: PortId,
    /// Target direction
    pub direction: PortDirection,
    /// Index among the node's ports of the same direction
    pub port_index: usize,
    /// The anchor
    pub source: SourceInfo,
    /// What dropping onto this port would do
    pub behavior: SwitchBehavior,
    /// Connections a drop would displace
    pub replaces: Vec<ConnectionId>,
}

/// Result of [`compute_connectable_set`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectablePorts {
    /// Connectable port keys, in graph order
    pub ids: IndexSet<PortKey>,
    /// Metadata per connectable port
    pub descriptors: IndexMap<PortKey, PortDescriptor>,
    /// The resolved anchor, `None` when nothing could be resolved
    pub source: Option<SourceInfo>,
}

impl ConnectablePorts {
    /// An empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Is this port connectable
    pub fn contains(&self, key: &PortKey) -> bool {
        self.ids.contains(key)
    }

    /// Metadata of a connectable port
    pub fn descriptor(&self, key: &PortKey) -> Option<&PortDescriptor> {
        self.descriptors.get(key)
    }

    /// Number of connectable ports
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// No connectable ports
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        self.ids.clear();
        self.descriptors.clear();
        self.source = None;
    }

    /// Keep only ports whose descriptor passes `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&PortDescriptor) -> bool) {
        self.descriptors.retain(|_, descriptor| keep(descriptor));
        let descriptors = &self.descriptors;
        self.ids.retain(|key| descriptors.contains_key(key));
    }

    fn insert(&mut self, key: PortKey, descriptor: PortDescriptor) {
        self.ids.insert(key.clone());
        self.descriptors.insert(key, descriptor);
    }
}

/// Pick the anchor: drag port, else disconnect fixed port, else fallback
pub fn resolve_anchor<'a>(
    drag_port: Option<&'a PortKey>,
    disconnect_fixed_port: Option<&'a PortKey>,
    fallback: Option<&'a PortKey>,
) -> Option<&'a PortKey> {
    drag_port.or(disconnect_fixed_port).or(fallback)
}

/// Compute every port `anchor` may connect to.
///
/// A missing anchor yields an empty set. Ports that fail validation are
/// left out, never reported.
pub fn compute_connectable_set<D, P>(
    anchor: Option<&PortKey>,
    graph: &Graph,
    ports: &P,
    definitions: &D,
    context: ValidationContext,
) -> ConnectablePorts
where
    D: DefinitionProvider + ?Sized,
    P: PortProvider + ?Sized,
{
    let mut result = ConnectablePorts::empty();

    let Some(anchor_key) = anchor else {
        return result;
    };
    let Some(anchor_port) = resolve_port(graph, ports, anchor_key) else {
        tracing::debug!("Anchor {anchor_key} not found, connectable set is empty");
        return result;
    };
    let Some(anchor) = Endpoint::resolve(graph, definitions, &anchor_port) else {
        return result;
    };

    let source = SourceInfo {
        node_id: anchor_port.node_id,
        port_id: anchor_port.id.clone(),
        direction: anchor_port.direction,
    };

    for node in graph.nodes() {
        if node.id == anchor_port.node_id {
            continue;
        }
        let definition = definitions.definition(&node.node_type);
        let mut inputs = 0;
        let mut outputs = 0;

        for port in ports.ports_of(node) {
            let counter = match port.direction {
                PortDirection::Input => &mut inputs,
                PortDirection::Output => &mut outputs,
            };
            let port_index = *counter;
            *counter += 1;

            let target = Endpoint::new(&port, node, definition);
            let plan = plan_endpoints(anchor, target, graph, context);
            if plan.is_ignore() {
                continue;
            }

            result.insert(
                port.key(),
                PortDescriptor {
                    node_id: node.id,
                    port_id: port.id.clone(),
                    direction: port.direction,
                    port_index,
                    source: source.clone(),
                    behavior: plan.behavior,
                    replaces: plan.connection_ids_to_replace,
                },
            );
        }
    }

    tracing::debug!("Anchor {anchor_key} can connect to {} port(s)", result.len());
    result.source = Some(source);
    result
}
