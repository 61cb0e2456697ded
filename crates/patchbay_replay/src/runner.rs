// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drives the drag machine from a script.

use crate::script::{ReplayError, ReplayScript, ScriptPort, Step};
use patchbay_graph::catalog::create_gameplay_registry;
use patchbay_graph::drag::wire_created_node;
use patchbay_graph::layout::PortPositionCache;
use patchbay_graph::{
    ConnectionConfig, DragMachine, DragOutcome, EngineContext, GeometryProvider, Graph, NodeId, NodeRegistry,
    NodeSearchRequest, PortKey, Pos2,
};
use std::collections::BTreeMap;

/// A graph plus the gesture state a script acts on
pub struct Replay {
    graph: Graph,
    registry: NodeRegistry,
    geometry: PortPositionCache,
    config: ConnectionConfig,
    machine: DragMachine,
    names: BTreeMap<String, NodeId>,
    pending: Option<NodeSearchRequest>,
    outcomes: Vec<DragOutcome>,
}

impl Replay {
    /// Build the initial graph of a script
    pub fn new(script: &ReplayScript) -> Result<Self, ReplayError> {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("replay");
        let mut names = BTreeMap::new();

        for spec in &script.nodes {
            if !registry.can_instantiate(&graph, &spec.node_type) {
                return Err(match registry.get(&spec.node_type) {
                    Some(_) => ReplayError::InstanceCap(spec.node_type.clone()),
                    None => ReplayError::UnknownNodeType(spec.node_type.clone()),
                });
            }
            let mut node = registry
                .create_node(&spec.node_type)
                .ok_or_else(|| ReplayError::UnknownNodeType(spec.node_type.clone()))?
                .with_position(spec.position.0, spec.position.1);
            node.name = spec.name.clone();
            node.data = spec.data.clone();
            names.insert(spec.name.clone(), graph.add_node(node));
        }

        let mut geometry = PortPositionCache::new();
        geometry.rebuild(&graph, &registry);

        let mut replay = Self {
            graph,
            registry,
            geometry,
            config: script.config.clone(),
            machine: DragMachine::new(),
            names,
            pending: None,
            outcomes: Vec::new(),
        };

        for connection in &script.connections {
            let from = replay.key(&connection.from)?;
            let to = replay.key(&connection.to)?;
            replay.graph.connect(&replay.registry, &from, &to)?;
        }

        Ok(replay)
    }

    /// The graph in its current state
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Every gesture outcome so far
    pub fn outcomes(&self) -> &[DragOutcome] {
        &self.outcomes
    }

    /// Run steps in order, stopping at the first error
    pub fn run(&mut self, steps: &[Step]) -> Result<(), ReplayError> {
        for (index, step) in steps.iter().enumerate() {
            tracing::debug!("Step {index}: {step:?}");
            if let Some(outcome) = self.step(step)? {
                tracing::info!("Step {index}: {outcome:?}");
                if let DragOutcome::SearchFallback(request) = &outcome {
                    self.pending = Some(request.clone());
                }
                self.outcomes.push(outcome);
            }
        }
        Ok(())
    }

    fn step(&mut self, step: &Step) -> Result<Option<DragOutcome>, ReplayError> {
        let ctx = EngineContext::new(&self.registry, &self.registry, &self.geometry, &self.config);

        match step {
            Step::Press { node, port } => {
                let key = key_of(&self.names, node, port)?;
                let at = point_of(&self.geometry, &key, node, port)?;
                if !self.machine.pointer_down(&key, at, &self.graph, &ctx) {
                    tracing::warn!("Press on {node}.{port} started no gesture");
                }
                Ok(None)
            }
            Step::MoveTo { node, port } => {
                let key = key_of(&self.names, node, port)?;
                let at = point_of(&self.geometry, &key, node, port)?;
                self.machine.pointer_move(at, &mut self.graph, &ctx);
                Ok(None)
            }
            Step::Move { x, y } => {
                self.machine.pointer_move(Pos2::new(*x, *y), &mut self.graph, &ctx);
                Ok(None)
            }
            Step::Release => Ok(self.machine.pointer_up(&mut self.graph, &ctx)),
            Step::Cancel => Ok(self.machine.cancel()),
            Step::Create { name, node_type } => {
                let request = self.pending.take().ok_or(ReplayError::NoSearchPending)?;
                if !request.compatible_types.contains(node_type) {
                    return Err(ReplayError::NotOffered(node_type.clone()));
                }
                let mut node = self
                    .registry
                    .create_node(node_type)
                    .ok_or_else(|| ReplayError::UnknownNodeType(node_type.clone()))?
                    .with_position(request.position.x, request.position.y);
                node.name = name.clone();
                let node_id = self.graph.add_node(node);
                self.names.insert(name.clone(), node_id);
                if let Some(node) = self.graph.node(node_id) {
                    self.geometry.update_node(node, &self.registry);
                }

                let ctx = EngineContext::new(&self.registry, &self.registry, &self.geometry, &self.config);
                match wire_created_node(&mut self.graph, &request.anchor, node_id, &ctx)? {
                    Some(id) => tracing::info!("Created {name} ({node_type}) wired by {id}"),
                    None => tracing::warn!("Created {name} ({node_type}) but could not wire it"),
                }
                Ok(None)
            }
        }
    }

    fn key(&self, port: &ScriptPort) -> Result<PortKey, ReplayError> {
        key_of(&self.names, &port.node, &port.port)
    }

    /// One line per connection, `from.port -> to.port`, in insertion order
    pub fn describe(&self) -> Vec<String> {
        let name = |id: NodeId| {
            self.graph
                .node(id)
                .map_or_else(|| id.to_string(), |node| node.name.clone())
        };
        self.graph
            .connections()
            .map(|c| format!("{}.{} -> {}.{}", name(c.from_node), c.from_port, name(c.to_node), c.to_port))
            .collect()
    }
}

fn key_of(names: &BTreeMap<String, NodeId>, node: &str, port: &str) -> Result<PortKey, ReplayError> {
    let node_id = names
        .get(node)
        .copied()
        .ok_or_else(|| ReplayError::UnknownNode(node.to_string()))?;
    Ok(PortKey::new(node_id, port))
}

fn point_of(
    geometry: &PortPositionCache,
    key: &PortKey,
    node: &str,
    port: &str,
) -> Result<Pos2, ReplayError> {
    geometry
        .connection_point(key)
        .ok_or_else(|| ReplayError::UnknownPort(node.to_string(), port.to_string()))
}
