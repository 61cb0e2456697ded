// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-driven wiring gestures as an explicit state machine.
//!
//! Two gestures share the machine:
//!
//! - **Connect**: press on a port with room (or any output), drag, release.
//!   Releasing over a candidate runs the switch planner; releasing over
//!   nothing asks the editor to offer compatible node types instead.
//! - **Disconnect**: press on a wired single-connection port. Nothing
//!   happens until the pointer travels past the disconnect threshold; then
//!   the wire is removed from the graph and follows the pointer from its
//!   fixed end. Releasing over a valid port re-wires it, releasing anywhere
//!   else leaves it deleted.
//!
//! The machine holds only gesture state. The graph and every collaborator
//! are passed into each transition.

use crate::candidate::find_nearest_connectable_port;
use crate::config::ConnectionConfig;
use crate::connectable::{compute_connectable_set, resolve_anchor, ConnectablePorts};
use crate::connection::{Connection, ConnectionEnd, ConnectionId};
use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId};
use crate::port::{Port, PortKey};
use crate::provider::{resolve_port, DefinitionProvider, GeometryProvider, PortProvider};
use crate::normalize::normalize;
use crate::switch::{apply_switch_plan, plan_switch, SwitchBehavior};
use crate::validate::{check_connection, check_ports, Endpoint, ValidationContext};
use egui::Pos2;

/// Collaborators every transition reads from
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    /// Node type lookup
    pub definitions: &'a dyn DefinitionProvider,
    /// Port derivation
    pub ports: &'a dyn PortProvider,
    /// Port connection points
    pub geometry: &'a dyn GeometryProvider,
    /// Gesture tunables
    pub config: &'a ConnectionConfig,
}

impl<'a> EngineContext<'a> {
    /// Bundle the collaborators
    pub fn new(
        definitions: &'a dyn DefinitionProvider,
        ports: &'a dyn PortProvider,
        geometry: &'a dyn GeometryProvider,
        config: &'a ConnectionConfig,
    ) -> Self {
        Self {
            definitions,
            ports,
            geometry,
            config,
        }
    }
}

/// An in-flight connect gesture
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDragState {
    /// The anchor
    pub from_port: PortKey,
    /// Live pointer position
    pub to_position: Pos2,
    /// Nearest connectable port
    pub candidate_port: Option<Port>,
}

/// Whether a disconnect has passed its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectPhase {
    /// Pressed, connection still in the graph
    Pending,
    /// Connection removed, following the pointer
    Dragging,
}

/// An in-flight disconnect gesture
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDisconnectState {
    /// The connection being re-routed
    pub connection_id: ConnectionId,
    /// The end that stays put
    pub fixed_port: PortKey,
    /// The end being dragged
    pub disconnected_end: ConnectionEnd,
    /// Where the press happened
    pub press_position: Pos2,
    /// Live pointer position
    pub dragging_position: Pos2,
    /// Snapshot of the connection as it was
    pub original_connection: Connection,
    /// Nearest connectable port
    pub candidate_port: Option<Port>,
    /// Threshold progress
    pub phase: DisconnectPhase,
}

/// Gesture state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    /// No gesture
    #[default]
    Idle,
    /// Creating a connection
    Connecting(ConnectionDragState),
    /// Re-routing an existing connection
    Disconnecting(ConnectionDisconnectState),
}

/// Coarse view of [`DragState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    /// No gesture
    Idle,
    /// Connect gesture in flight
    ConnectDragging,
    /// Wired port pressed, threshold not reached
    DisconnectPending,
    /// Detached wire following the pointer
    DisconnectDragging,
}

/// Request for the node-creation UI after a drop on empty canvas
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSearchRequest {
    /// Drop position on the canvas
    pub position: Pos2,
    /// The port the new node should be wired to
    pub anchor: PortKey,
    /// Node types with at least one port that accepts the anchor
    pub compatible_types: Vec<String>,
}

/// How a gesture ended
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// A connection was added
    Completed {
        /// Replace or Append
        behavior: SwitchBehavior,
        /// The new connection
        connection_id: ConnectionId,
        /// Connections removed to make room
        replaced: Vec<ConnectionId>,
    },
    /// Dropped on empty canvas
    SearchFallback(NodeSearchRequest),
    /// Connect gesture ended without a mutation
    Cancelled,
    /// Released before the disconnect threshold; the connection is untouched
    Untouched {
        /// The connection that was pressed
        connection_id: ConnectionId,
    },
    /// A detached connection was dropped on a free, valid port
    Reconnected {
        /// The removed connection
        original: Connection,
        /// Its replacement
        connection_id: ConnectionId,
    },
    /// A detached connection was dropped elsewhere and stays deleted
    Lost {
        /// The removed connection
        original: Connection,
    },
}

/// The wiring gesture state machine
#[derive(Debug, Clone, Default)]
pub struct DragMachine {
    state: DragState,
    connectable: ConnectablePorts,
}

impl DragMachine {
    /// Create an idle machine
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> DragPhase {
        match &self.state {
            DragState::Idle => DragPhase::Idle,
            DragState::Connecting(_) => DragPhase::ConnectDragging,
            DragState::Disconnecting(s) if s.phase == DisconnectPhase::Pending => DragPhase::DisconnectPending,
            DragState::Disconnecting(_) => DragPhase::DisconnectDragging,
        }
    }

    /// No gesture in flight
    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    /// Ports the current anchor may connect to
    pub fn connectable(&self) -> &ConnectablePorts {
        &self.connectable
    }

    /// The port that would be connected on release
    pub fn candidate(&self) -> Option<&Port> {
        match &self.state {
            DragState::Idle => None,
            DragState::Connecting(drag) => drag.candidate_port.as_ref(),
            DragState::Disconnecting(state) => state.candidate_port.as_ref(),
        }
    }

    /// Connect gesture state, if one is in flight
    pub fn drag_state(&self) -> Option<&ConnectionDragState> {
        match &self.state {
            DragState::Connecting(drag) => Some(drag),
            _ => None,
        }
    }

    /// Disconnect gesture state, if one is in flight
    pub fn disconnect_state(&self) -> Option<&ConnectionDisconnectState> {
        match &self.state {
            DragState::Disconnecting(state) => Some(state),
            _ => None,
        }
    }

    /// Highlight what a hovered port could connect to, outside a gesture
    pub fn preview_hover(&mut self, hovered: Option<&PortKey>, graph: &Graph, ctx: &EngineContext<'_>) {
        if !self.is_idle() {
            return;
        }
        let anchor = resolve_anchor(None, None, hovered);
        self.connectable =
            compute_connectable_set(anchor, graph, ctx.ports, ctx.definitions, ValidationContext::default());
    }

    /// Pointer pressed on a port. Returns whether a gesture started.
    pub fn pointer_down(&mut self, port: &PortKey, position: Pos2, graph: &Graph, ctx: &EngineContext<'_>) -> bool {
        if !self.is_idle() {
            tracing::debug!("Pointer down on {port} ignored, gesture already active");
            return false;
        }
        let Some(pressed) = resolve_port(graph, ctx.ports, port) else {
            return false;
        };

        let occupied: Vec<&Connection> = graph.connections_at(port).collect();
        if pressed.max_connections.is_single() {
            let grabbed = occupied
                .last()
                .and_then(|c| c.end_at(port).map(|end| (*c, end)));
            if let Some((connection, end)) = grabbed {
                tracing::debug!("Grabbed connection {} at {port}", connection.id);
                self.state = DragState::Disconnecting(ConnectionDisconnectState {
                    connection_id: connection.id,
                    fixed_port: connection.end(end.opposite()),
                    disconnected_end: end,
                    press_position: position,
                    dragging_position: position,
                    original_connection: connection.clone(),
                    candidate_port: None,
                    phase: DisconnectPhase::Pending,
                });
                return true;
            }
        }

        if pressed.is_output() || pressed.max_connections.has_room(occupied.len()) {
            self.connectable =
                compute_connectable_set(Some(port), graph, ctx.ports, ctx.definitions, ValidationContext::default());
            self.state = DragState::Connecting(ConnectionDragState {
                from_port: port.clone(),
                to_position: position,
                candidate_port: None,
            });
            tracing::debug!("Connect drag from {port}, {} candidate(s)", self.connectable.len());
            return true;
        }

        tracing::debug!("Port {port} is full, nothing to drag");
        false
    }

    /// Pointer moved. May commit a pending disconnect.
    pub fn pointer_move(&mut self, position: Pos2, graph: &mut Graph, ctx: &EngineContext<'_>) {
        let snap = ctx.config.snap_radius;
        let mut abandoned = false;

        match &mut self.state {
            DragState::Idle => {}
            DragState::Connecting(drag) => {
                drag.to_position = position;
                drag.candidate_port = find_nearest_connectable_port(
                    position,
                    &self.connectable,
                    graph,
                    ctx.ports,
                    ctx.geometry,
                    Some(&drag.from_port),
                    snap,
                );
                tracing::trace!("Candidate {:?}", drag.candidate_port.as_ref().map(Port::key));
            }
            DragState::Disconnecting(state) => {
                state.dragging_position = position;

                if state.phase == DisconnectPhase::Pending {
                    if state.press_position.distance(position) <= ctx.config.disconnect_threshold {
                        return;
                    }
                    if graph.delete_connection(state.connection_id).is_some() {
                        tracing::info!("Connection {} detached", state.connection_id);
                        state.phase = DisconnectPhase::Dragging;
                        let anchor = resolve_anchor(None, Some(&state.fixed_port), None);
                        self.connectable = compute_connectable_set(
                            anchor,
                            graph,
                            ctx.ports,
                            ctx.definitions,
                            ValidationContext::ignoring(state.connection_id),
                        );
                        // A re-routed wire never displaces another one
                        self.connectable
                            .retain(|descriptor| descriptor.behavior == SwitchBehavior::Append);
                    } else {
                        tracing::warn!("Connection {} vanished before detaching", state.connection_id);
                        abandoned = true;
                    }
                }

                if !abandoned {
                    state.candidate_port = find_nearest_connectable_port(
                        position,
                        &self.connectable,
                        graph,
                        ctx.ports,
                        ctx.geometry,
                        Some(&state.fixed_port),
                        snap,
                    );
                }
            }
        }

        if abandoned {
            self.reset();
        }
    }

    /// Pointer released. Returns the outcome, `None` when idle.
    pub fn pointer_up(&mut self, graph: &mut Graph, ctx: &EngineContext<'_>) -> Option<DragOutcome> {
        let state = std::mem::take(&mut self.state);
        self.connectable.clear();

        let outcome = match state {
            DragState::Idle => return None,
            DragState::Connecting(drag) => finish_connect(drag, graph, ctx),
            DragState::Disconnecting(state) => finish_disconnect(state, graph, ctx),
        };
        tracing::debug!("Gesture ended: {outcome:?}");
        Some(outcome)
    }

    /// Abort the gesture. A committed disconnect stays deleted.
    pub fn cancel(&mut self) -> Option<DragOutcome> {
        let state = std::mem::take(&mut self.state);
        self.connectable.clear();

        match state {
            DragState::Idle => None,
            DragState::Connecting(_) => Some(DragOutcome::Cancelled),
            DragState::Disconnecting(state) => Some(match state.phase {
                DisconnectPhase::Pending => DragOutcome::Untouched {
                    connection_id: state.connection_id,
                },
                DisconnectPhase::Dragging => DragOutcome::Lost {
                    original: state.original_connection,
                },
            }),
        }
    }

    fn reset(&mut self) {
        self.state = DragState::Idle;
        self.connectable.clear();
    }
}

fn finish_connect(drag: ConnectionDragState, graph: &mut Graph, ctx: &EngineContext<'_>) -> DragOutcome {
    let Some(anchor) = resolve_port(graph, ctx.ports, &drag.from_port) else {
        return DragOutcome::Cancelled;
    };

    let Some(candidate) = drag.candidate_port else {
        let compatible_types = compatible_node_types(&anchor, graph, ctx);
        return DragOutcome::SearchFallback(NodeSearchRequest {
            position: drag.to_position,
            anchor: drag.from_port,
            compatible_types,
        });
    };

    let plan = plan_switch(&anchor, &candidate, graph, ctx.definitions);
    match apply_switch_plan(graph, &plan) {
        Ok(Some(connection_id)) => DragOutcome::Completed {
            behavior: plan.behavior,
            connection_id,
            replaced: plan.connection_ids_to_replace,
        },
        Ok(None) => {
            tracing::debug!("Drop on {} ignored: {:?}", candidate.key(), plan.rejection);
            DragOutcome::Cancelled
        }
        Err(e) => {
            tracing::warn!("Failed to apply connection: {e}");
            DragOutcome::Cancelled
        }
    }
}

fn finish_disconnect(state: ConnectionDisconnectState, graph: &mut Graph, ctx: &EngineContext<'_>) -> DragOutcome {
    if state.phase == DisconnectPhase::Pending {
        return DragOutcome::Untouched {
            connection_id: state.connection_id,
        };
    }

    let reconnection = state.candidate_port.as_ref().and_then(|candidate| {
        let fixed = resolve_port(graph, ctx.ports, &state.fixed_port)?;
        let context = ValidationContext::ignoring(state.connection_id);
        if let Err(rejection) = check_ports(&fixed, candidate, graph, ctx.definitions, context) {
            tracing::debug!("Reconnection onto {} refused: {rejection}", candidate.key());
            return None;
        }
        let connection = normalize(&fixed, candidate)?.connection();
        match graph.insert_connection(connection) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to reconnect: {e}");
                None
            }
        }
    });

    match reconnection {
        Some(connection_id) => {
            tracing::info!("Connection {} re-routed as {connection_id}", state.connection_id);
            DragOutcome::Reconnected {
                original: state.original_connection,
                connection_id,
            }
        }
        None => {
            tracing::info!("Connection {} removed", state.connection_id);
            DragOutcome::Lost {
                original: state.original_connection,
            }
        }
    }
}

/// Node types that could be created and wired to `anchor`.
///
/// Each registered type is instantiated as a template (not added to the
/// graph) and its ports are tested against the anchor. Types at their
/// instance cap are left out.
pub fn compatible_node_types(anchor: &Port, graph: &Graph, ctx: &EngineContext<'_>) -> Vec<String> {
    let Some(anchor) = Endpoint::resolve(graph, ctx.definitions, anchor) else {
        return Vec::new();
    };

    ctx.definitions
        .node_types()
        .into_iter()
        .filter(|node_type| {
            let Some(definition) = ctx.definitions.definition(node_type) else {
                return false;
            };
            if definition
                .max_instances
                .is_some_and(|max| graph.nodes_of_type(node_type).count() >= max)
            {
                return false;
            }
            let template = Node::from_definition(definition);
            ctx.ports.ports_of(&template).iter().any(|port| {
                let candidate = Endpoint::new(port, &template, Some(definition));
                check_connection(anchor, candidate, graph, ValidationContext::default()).is_ok()
            })
        })
        .collect()
}

/// Wire a node created from a [`NodeSearchRequest`] to its anchor.
///
/// Uses the first port of the new node the switch planner accepts.
pub fn wire_created_node(
    graph: &mut Graph,
    anchor: &PortKey,
    node_id: NodeId,
    ctx: &EngineContext<'_>,
) -> Result<Option<ConnectionId>, GraphError> {
    let anchor_port =
        resolve_port(graph, ctx.ports, anchor).ok_or_else(|| GraphError::PortNotFound(anchor.clone()))?;
    let node = graph.node(node_id).ok_or(GraphError::NodeNotFound(node_id))?;

    let plan = ctx
        .ports
        .ports_of(node)
        .iter()
        .map(|port| plan_switch(&anchor_port, port, graph, ctx.definitions))
        .find(|plan| !plan.is_ignore());

    match plan {
        Some(plan) => apply_switch_plan(graph, &plan),
        None => {
            tracing::debug!("New node {node_id} has no port accepting {anchor}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PortPositionCache;
    use crate::node::{NodeCategory, NodeDefinition, NodeRegistry};
    use crate::port::{PortDefinition, PortType};
    use crate::testing::Fixture;

    fn point(fx: &Fixture, key: &PortKey) -> Pos2 {
        fx.geometry.connection_point(key).unwrap()
    }

    #[test]
    fn test_connect_append() {
        let mut fx = Fixture::new();
        let (from, to) = (point(&fx, &fx.out_a), point(&fx, &fx.in_b));
        let (out_a, in_b) = (fx.out_a.clone(), fx.in_b.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        assert!(machine.pointer_down(&out_a, from, graph, &ctx));
        assert_eq!(machine.phase(), DragPhase::ConnectDragging);
        assert!(machine.connectable().contains(&in_b));

        machine.pointer_move(to + egui::vec2(1.0, 1.0), graph, &ctx);
        assert_eq!(machine.candidate().map(Port::key), Some(in_b.clone()));
        assert_eq!(graph.connection_count(), 0);

        let outcome = machine.pointer_up(graph, &ctx).unwrap();
        let DragOutcome::Completed { behavior, connection_id, replaced } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(behavior, SwitchBehavior::Append);
        assert!(replaced.is_empty());
        assert_eq!(graph.connection(connection_id).unwrap().target(), in_b);
        assert!(machine.is_idle());
        assert!(machine.connectable().is_empty());
    }

    #[test]
    fn test_connect_replace_occupied_input() {
        let mut fx = Fixture::new();
        let existing = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let (from, to) = (point(&fx, &fx.out_a), point(&fx, &fx.in_b));
        let (out_a, in_b) = (fx.out_a.clone(), fx.in_b.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&out_a, from, graph, &ctx);
        machine.pointer_move(to, graph, &ctx);
        let outcome = machine.pointer_up(graph, &ctx).unwrap();

        let DragOutcome::Completed { behavior, replaced, connection_id } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(behavior, SwitchBehavior::Replace);
        assert_eq!(replaced, vec![existing]);
        assert!(graph.connection(existing).is_none());
        assert_eq!(graph.connections_at(&in_b).count(), 1);
        assert_eq!(graph.connection(connection_id).unwrap().source(), out_a);
    }

    #[test]
    fn test_connect_from_input_end() {
        let mut fx = Fixture::new();
        let (from, to) = (point(&fx, &fx.in_c), point(&fx, &fx.out_a));
        let (in_c, out_a) = (fx.in_c.clone(), fx.out_a.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        assert!(machine.pointer_down(&in_c, from, graph, &ctx));
        machine.pointer_move(to, graph, &ctx);
        let Some(DragOutcome::Completed { connection_id, .. }) = machine.pointer_up(graph, &ctx) else {
            panic!("expected completion");
        };
        let connection = graph.connection(connection_id).unwrap();
        assert_eq!(connection.source(), out_a);
        assert_eq!(connection.target(), in_c);
    }

    #[test]
    fn test_drop_on_empty_canvas_offers_node_types() {
        let mut fx = Fixture::new();
        let from = point(&fx, &fx.out_a);
        let out_a = fx.out_a.clone();
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&out_a, from, graph, &ctx);
        let drop = Pos2::new(-2000.0, -2000.0);
        let mut config = ctx.config.clone();
        config.snap_radius = Some(30.0);
        let snapped = EngineContext { config: &config, ..ctx };
        machine.pointer_move(drop, graph, &snapped);
        assert!(machine.candidate().is_none());

        let Some(DragOutcome::SearchFallback(request)) = machine.pointer_up(graph, &ctx) else {
            panic!("expected search fallback");
        };
        assert_eq!(request.position, drop);
        assert_eq!(request.anchor, out_a);
        assert_eq!(request.compatible_types, vec!["receiver".to_string()]);
    }

    #[test]
    fn test_search_fallback_without_compatible_types() {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeDefinition::new("emitter", "Emitter", NodeCategory::Input)
                .with_port(PortDefinition::output("out", "Out").with_type(PortType::Float)),
        );
        let mut graph = Graph::new("lonely");
        let node = graph.add_node(registry.create_node("emitter").unwrap());
        let mut geometry = PortPositionCache::new();
        geometry.rebuild(&graph, &registry);
        let config = ConnectionConfig::default();
        let ctx = EngineContext::new(&registry, &registry, &geometry, &config);

        let anchor = PortKey::new(node, "out");
        let mut machine = DragMachine::new();
        machine.pointer_down(&anchor, geometry.connection_point(&anchor).unwrap(), &graph, &ctx);
        machine.pointer_move(Pos2::new(500.0, 500.0), &mut graph, &ctx);

        let Some(DragOutcome::SearchFallback(request)) = machine.pointer_up(&mut graph, &ctx) else {
            panic!("expected search fallback");
        };
        assert!(request.compatible_types.is_empty());
    }

    #[test]
    fn test_disconnect_below_threshold_is_untouched() {
        let mut fx = Fixture::new();
        let existing = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let at = point(&fx, &fx.in_b);
        let in_b = fx.in_b.clone();
        let (graph, ctx) = fx.split();
        let threshold = ctx.config.disconnect_threshold;
        let mut machine = DragMachine::new();

        assert!(machine.pointer_down(&in_b, at, graph, &ctx));
        assert_eq!(machine.phase(), DragPhase::DisconnectPending);
        machine.pointer_move(at + egui::vec2(threshold / 2.0, 0.0), graph, &ctx);
        assert_eq!(machine.phase(), DragPhase::DisconnectPending);
        assert!(graph.connection(existing).is_some());

        let outcome = machine.pointer_up(graph, &ctx).unwrap();
        assert_eq!(outcome, DragOutcome::Untouched { connection_id: existing });
        let connection = graph.connection(existing).unwrap();
        assert_eq!(connection.target(), in_b);
    }

    #[test]
    fn test_disconnect_dropped_on_nothing_is_lost() {
        let mut fx = Fixture::new();
        fx.config.snap_radius = Some(20.0);
        let existing = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let at = point(&fx, &fx.in_b);
        let in_b = fx.in_b.clone();
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&in_b, at, graph, &ctx);
        machine.pointer_move(at + egui::vec2(0.0, 3000.0), graph, &ctx);
        assert_eq!(machine.phase(), DragPhase::DisconnectDragging);
        assert!(graph.connection(existing).is_none());
        assert!(machine.candidate().is_none());

        let Some(DragOutcome::Lost { original }) = machine.pointer_up(graph, &ctx) else {
            panic!("expected lost connection");
        };
        assert_eq!(original.id, existing);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_reconnects_elsewhere() {
        let mut fx = Fixture::new();
        let existing = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let (at, target) = (point(&fx, &fx.in_b), point(&fx, &fx.in_c));
        let (in_b, in_c, out_d) = (fx.in_b.clone(), fx.in_c.clone(), fx.out_d.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&in_b, at, graph, &ctx);
        let state = machine.disconnect_state().unwrap();
        assert_eq!(state.fixed_port, out_d);
        assert_eq!(state.disconnected_end, ConnectionEnd::To);

        machine.pointer_move(target, graph, &ctx);
        assert_eq!(machine.candidate().map(Port::key), Some(in_c.clone()));

        let Some(DragOutcome::Reconnected { original, connection_id, .. }) = machine.pointer_up(graph, &ctx) else {
            panic!("expected reconnection");
        };
        assert_eq!(original.id, existing);
        let connection = graph.connection(connection_id).unwrap();
        assert_eq!(connection.source(), out_d);
        assert_eq!(connection.target(), in_c);
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_detached_wire_skips_occupied_inputs() {
        let mut fx = Fixture::new();
        fx.config.snap_radius = Some(5.0);
        let grabbed = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let bystander = fx.link(fx.out_a.clone(), fx.in_c.clone());
        let (at, target) = (point(&fx, &fx.in_b), point(&fx, &fx.in_c));
        let (in_b, in_c) = (fx.in_b.clone(), fx.in_c.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&in_b, at, graph, &ctx);
        machine.pointer_move(target, graph, &ctx);
        assert!(!machine.connectable().contains(&in_c));
        assert!(machine.candidate().is_none());

        assert!(matches!(machine.pointer_up(graph, &ctx), Some(DragOutcome::Lost { .. })));
        assert!(graph.connection(grabbed).is_none());
        assert!(graph.connection(bystander).is_some());
    }

    #[test]
    fn test_reconnect_refused_when_candidate_filled_meanwhile() {
        let mut fx = Fixture::new();
        let grabbed = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let (at, target) = (point(&fx, &fx.in_b), point(&fx, &fx.in_c));
        let (in_b, in_c, out_a) = (fx.in_b.clone(), fx.in_c.clone(), fx.out_a.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&in_b, at, graph, &ctx);
        machine.pointer_move(target, graph, &ctx);
        assert_eq!(machine.candidate().map(Port::key), Some(in_c.clone()));

        let bystander = graph.insert_connection(Connection::new(out_a, in_c.clone())).unwrap();
        assert!(matches!(machine.pointer_up(graph, &ctx), Some(DragOutcome::Lost { .. })));
        assert!(graph.connection(grabbed).is_none());
        assert!(graph.connection(bystander).is_some());
        assert_eq!(graph.connections_at(&in_c).count(), 1);
    }

    #[test]
    fn test_disconnect_can_drop_back_in_place() {
        let mut fx = Fixture::new();
        fx.link(fx.out_d.clone(), fx.in_b.clone());
        let at = point(&fx, &fx.in_b);
        let in_b = fx.in_b.clone();
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.pointer_down(&in_b, at, graph, &ctx);
        machine.pointer_move(at + egui::vec2(40.0, 0.0), graph, &ctx);
        assert!(machine.connectable().contains(&in_b));
        machine.pointer_move(at, graph, &ctx);

        assert!(matches!(machine.pointer_up(graph, &ctx), Some(DragOutcome::Reconnected { .. })));
        assert_eq!(graph.connections_at(&in_b).count(), 1);
    }

    #[test]
    fn test_multi_input_with_room_starts_connect() {
        let mut fx = Fixture::new();
        fx.link(fx.out_a.clone(), fx.many_b.clone());
        let at = point(&fx, &fx.many_b);
        let many_b = fx.many_b.clone();
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        assert!(machine.pointer_down(&many_b, at, graph, &ctx));
        assert_eq!(machine.phase(), DragPhase::ConnectDragging);
    }

    #[test]
    fn test_full_multi_input_starts_nothing() {
        let mut fx = Fixture::new();
        fx.link(fx.out_a.clone(), fx.many_b.clone());
        fx.link(fx.out_d.clone(), fx.many_b.clone());
        let at = point(&fx, &fx.many_b);
        let many_b = fx.many_b.clone();
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        assert!(!machine.pointer_down(&many_b, at, graph, &ctx));
        assert!(machine.is_idle());
    }

    #[test]
    fn test_second_press_ignored_during_gesture() {
        let mut fx = Fixture::new();
        let at = point(&fx, &fx.out_a);
        let (out_a, out_d) = (fx.out_a.clone(), fx.out_d.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        assert!(machine.pointer_down(&out_a, at, graph, &ctx));
        assert!(!machine.pointer_down(&out_d, at, graph, &ctx));
        assert_eq!(machine.drag_state().unwrap().from_port, out_a);
    }

    #[test]
    fn test_cancel() {
        let mut fx = Fixture::new();
        let existing = fx.link(fx.out_d.clone(), fx.in_b.clone());
        let (a, b) = (point(&fx, &fx.out_a), point(&fx, &fx.in_b));
        let (out_a, in_b) = (fx.out_a.clone(), fx.in_b.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        assert_eq!(machine.cancel(), None);

        machine.pointer_down(&out_a, a, graph, &ctx);
        assert_eq!(machine.cancel(), Some(DragOutcome::Cancelled));
        assert!(machine.connectable().is_empty());

        machine.pointer_down(&in_b, b, graph, &ctx);
        assert_eq!(machine.cancel(), Some(DragOutcome::Untouched { connection_id: existing }));
        assert!(graph.connection(existing).is_some());

        machine.pointer_down(&in_b, b, graph, &ctx);
        machine.pointer_move(b + egui::vec2(100.0, 0.0), graph, &ctx);
        assert!(matches!(machine.cancel(), Some(DragOutcome::Lost { .. })));
        assert!(graph.connection(existing).is_none());
    }

    #[test]
    fn test_preview_hover() {
        let mut fx = Fixture::new();
        let (out_a, in_b) = (fx.out_a.clone(), fx.in_b.clone());
        let (graph, ctx) = fx.split();
        let mut machine = DragMachine::new();

        machine.preview_hover(Some(&out_a), graph, &ctx);
        assert!(machine.connectable().contains(&in_b));

        machine.preview_hover(None, graph, &ctx);
        assert!(machine.connectable().is_empty());
    }

    #[test]
    fn test_wire_created_node() {
        let mut fx = Fixture::new();
        let out_a = fx.out_a.clone();
        let node = fx.registry.create_node("receiver").unwrap();
        let node_id = fx.graph.add_node(node);
        let (graph, ctx) = fx.split();

        let id = wire_created_node(graph, &out_a, node_id, &ctx).unwrap().unwrap();
        let connection = graph.connection(id).unwrap();
        assert_eq!(connection.source(), out_a);
        assert_eq!(connection.to_node, node_id);
        assert_eq!(connection.to_port.as_str(), "in");
    }

    #[test]
    fn test_capped_types_not_offered() {
        let mut fx = Fixture::new();
        let mut capped = fx.registry.get("receiver").unwrap().clone();
        capped.max_instances = Some(2);
        fx.registry.register(capped);

        let out_a = fx.out_a.clone();
        let (graph, ctx) = fx.split();
        let anchor = resolve_port(graph, ctx.ports, &out_a).unwrap();
        assert!(compatible_node_types(&anchor, graph, &ctx).is_empty());
    }
}
