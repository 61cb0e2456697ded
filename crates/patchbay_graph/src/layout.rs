// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port anchor positions on the canvas.
//!
//! The cache is what the candidate resolver measures against. Layout owns
//! it: call [`PortPositionCache::invalidate_node`] when a node moves or
//! resizes and rebuild before the next frame.

use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::port::{Port, PortDirection, PortKey, PortSide};
use crate::provider::{GeometryProvider, PortProvider};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Node visual dimensions
pub const NODE_HEADER_HEIGHT: f32 = 24.0;
/// Height of one port row
pub const PORT_HEIGHT: f32 = 22.0;

/// Cached connection points, keyed by port in layout order
#[derive(Debug, Clone, Default)]
pub struct PortPositionCache {
    points: IndexMap<PortKey, Pos2>,
}

impl PortPositionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a connection point
    pub fn set(&mut self, key: PortKey, point: Pos2) {
        self.points.insert(key, point);
    }

    /// Drop every point of a node
    pub fn invalidate_node(&mut self, node_id: NodeId) {
        self.points.retain(|key, _| key.node_id != node_id);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Number of cached points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Nothing cached
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Lay out one node's ports
    pub fn update_node<P: PortProvider + ?Sized>(&mut self, node: &Node, ports: &P) {
        self.invalidate_node(node.id);
        let ports = ports.ports_of(node);
        for (key, point) in port_points(node, &ports) {
            self.points.insert(key, point);
        }
    }

    /// Lay out every node of the graph from scratch
    pub fn rebuild<P: PortProvider + ?Sized>(&mut self, graph: &Graph, ports: &P) {
        self.points.clear();
        for node in graph.nodes() {
            self.update_node(node, ports);
        }
    }

    /// The port whose point is nearest to `pos`, within `radius`.
    ///
    /// Equal distances keep the port laid out first.
    pub fn hit_test(&self, pos: Pos2, radius: f32) -> Option<&PortKey> {
        self.points
            .iter()
            .map(|(key, point)| (key, point.distance(pos)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| key)
    }
}

impl GeometryProvider for PortPositionCache {
    fn connection_point(&self, port: &PortKey) -> Option<Pos2> {
        self.points.get(port).copied()
    }

    fn port_at(&self, pos: Pos2, radius: f32) -> Option<PortKey> {
        self.hit_test(pos, radius).cloned()
    }
}

/// Canvas rectangle of a node
pub fn node_rect(node: &Node) -> Rect {
    Rect::from_min_size(
        Pos2::new(node.position[0], node.position[1]),
        Vec2::new(node.size[0], node.size[1]),
    )
}

/// Connection points of a node's ports.
///
/// Side ports stack in rows below the header, inputs and outputs counted
/// separately; top and bottom ports spread evenly across the width.
fn port_points(node: &Node, ports: &[Port]) -> Vec<(PortKey, Pos2)> {
    let rect = node_rect(node);
    let count_on = |side: fn(&PortSide) -> bool| ports.iter().filter(|p| side(&p.side)).count();
    let top_total = count_on(|s| matches!(s, PortSide::Top));
    let bottom_total = count_on(|s| matches!(s, PortSide::Bottom));

    let mut rows = HashMap::<PortDirection, usize>::new();
    let mut top = 0;
    let mut bottom = 0;

    ports
        .iter()
        .map(|port| {
            let row_y = |row: usize| rect.top() + NODE_HEADER_HEIGHT + row as f32 * PORT_HEIGHT + PORT_HEIGHT / 2.0;
            let spread = |i: usize, total: usize| rect.left() + rect.width() * (i + 1) as f32 / (total + 1) as f32;

            let point = match port.side {
                PortSide::Left | PortSide::Right => {
                    let row = rows.entry(port.direction).or_insert(0);
                    let y = row_y(*row);
                    *row += 1;
                    let x = if port.side == PortSide::Left { rect.left() } else { rect.right() };
                    Pos2::new(x, y)
                }
                PortSide::Top => {
                    top += 1;
                    Pos2::new(spread(top - 1, top_total), rect.top())
                }
                PortSide::Bottom => {
                    bottom += 1;
                    Pos2::new(spread(bottom - 1, bottom_total), rect.bottom())
                }
                PortSide::Absolute { x, y } => rect.min + Vec2::new(x, y),
            };
            (port.key(), point)
        })
        .collect()
}
