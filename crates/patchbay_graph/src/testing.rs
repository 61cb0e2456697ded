// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared test graph.
//!
//! ```text
//!  A emitter (0,0)        B receiver (300,0)
//!    out ───────────────▶   in  (Float, 1)      out
//!                           many (Float, 2)
//!                           text (String)
//!                           any  (untyped)
//!  D emitter (0,200)      C receiver (300,200)
//! ```

use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionId};
use crate::drag::EngineContext;
use crate::graph::Graph;
use crate::layout::PortPositionCache;
use crate::node::{NodeCategory, NodeDefinition, NodeRegistry};
use crate::port::{MaxConnections, PortDefinition, PortKey, PortType};

pub(crate) struct Fixture {
    pub graph: Graph,
    pub registry: NodeRegistry,
    pub geometry: PortPositionCache,
    pub config: ConnectionConfig,
    pub out_a: PortKey,
    pub out_b: PortKey,
    pub out_c: PortKey,
    pub out_d: PortKey,
    pub in_b: PortKey,
    pub in_c: PortKey,
    pub many_b: PortKey,
    pub text_b: PortKey,
    pub any_b: PortKey,
}

pub(crate) fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(
        NodeDefinition::new("emitter", "Emitter", NodeCategory::Input)
            .with_port(PortDefinition::output("out", "Out").with_type(PortType::Float)),
    );
    registry.register(
        NodeDefinition::new("receiver", "Receiver", NodeCategory::Math)
            .with_port(PortDefinition::input("in", "In").with_type(PortType::Float))
            .with_port(
                PortDefinition::input("many", "Many")
                    .with_type(PortType::Float)
                    .with_max_connections(MaxConnections::Limited(2)),
            )
            .with_port(PortDefinition::input("text", "Text").with_type(PortType::String))
            .with_port(PortDefinition::input("any", "Any"))
            .with_port(PortDefinition::output("out", "Out").with_type(PortType::Float)),
    );
    registry
}

impl Fixture {
    pub fn new() -> Self {
        let registry = registry();
        let mut graph = Graph::new("fixture");

        let mut add = |node_type: &str, x: f32, y: f32| {
            let node = registry
                .create_node(node_type)
                .unwrap()
                .with_position(x, y);
            graph.add_node(node)
        };
        let a = add("emitter", 0.0, 0.0);
        let b = add("receiver", 300.0, 0.0);
        let c = add("receiver", 300.0, 200.0);
        let d = add("emitter", 0.0, 200.0);

        let mut geometry = PortPositionCache::new();
        geometry.rebuild(&graph, &registry);

        Self {
            graph,
            registry,
            geometry,
            config: ConnectionConfig::default(),
            out_a: PortKey::new(a, "out"),
            out_b: PortKey::new(b, "out"),
            out_c: PortKey::new(c, "out"),
            out_d: PortKey::new(d, "out"),
            in_b: PortKey::new(b, "in"),
            in_c: PortKey::new(c, "in"),
            many_b: PortKey::new(b, "many"),
            text_b: PortKey::new(b, "text"),
            any_b: PortKey::new(b, "any"),
        }
    }

    /// Store a connection directly, bypassing validation
    pub fn link(&mut self, from: PortKey, to: PortKey) -> ConnectionId {
        self.graph.insert_connection(Connection::new(from, to)).unwrap()
    }

    /// The graph and the collaborators, borrowed apart
    pub fn split(&mut self) -> (&mut Graph, EngineContext<'_>) {
        let ctx = EngineContext::new(&self.registry, &self.registry, &self.geometry, &self.config);
        (&mut self.graph, ctx)
    }
}
