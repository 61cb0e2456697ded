// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pairwise connectability rules.
//!
//! Rules run in a fixed order and stop at the first failure:
//! direction, locality, data type, allow-lists, duplicate edge, capacity,
//! then the node definitions' own veto. Nothing here mutates anything.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::node::{Node, NodeDefinition};
use crate::port::Port;
use crate::provider::DefinitionProvider;

/// Why a pair of ports may not be connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Rejection {
    /// Both ports are inputs, or both are outputs
    #[error("ports have the same direction")]
    SameDirection,
    /// Both ports belong to the same node
    #[error("ports belong to the same node")]
    SameNode,
    /// Declared data types share no tag
    #[error("data types do not overlap")]
    DataTypeMismatch,
    /// A node-type allow-list excludes the other node
    #[error("node type not allowed")]
    NodeTypeNotAllowed,
    /// A port-type allow-list excludes the other port
    #[error("port type not allowed")]
    PortTypeNotAllowed,
    /// The same two ports are already connected
    #[error("ports are already connected")]
    Duplicate,
    /// The input port has no free slot
    #[error("target port is at capacity")]
    TargetAtCapacity,
    /// The output port has no free slot
    #[error("source port is at capacity")]
    SourceAtCapacity,
    /// A node definition vetoed the pair
    #[error("rejected by node rule")]
    CustomRule,
    /// A port's node is not in the graph
    #[error("node missing from graph")]
    MissingNode,
}

/// Knobs that change how the capacity rule counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// The input's occupants are about to be replaced
    pub replacing: bool,
    /// Connection to leave out of duplicate and capacity counting
    pub ignored_connection: Option<ConnectionId>,
}

impl ValidationContext {
    /// Context for a replace scenario
    pub fn replacing() -> Self {
        Self {
            replacing: true,
            ignored_connection: None,
        }
    }

    /// Context that does not count one connection
    pub fn ignoring(connection: ConnectionId) -> Self {
        Self {
            replacing: false,
            ignored_connection: Some(connection),
        }
    }

    /// Same context, in replace mode
    pub fn as_replacing(self) -> Self {
        Self {
            replacing: true,
            ..self
        }
    }
}

/// A port together with the node and definition it belongs to
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    /// The port
    pub port: &'a Port,
    /// Its node
    pub node: &'a Node,
    /// The node's definition, when registered
    pub definition: Option<&'a NodeDefinition>,
}

impl<'a> Endpoint<'a> {
    /// Bundle a port with its node and definition
    pub fn new(port: &'a Port, node: &'a Node, definition: Option<&'a NodeDefinition>) -> Self {
        Self { port, node, definition }
    }

    /// Look up the node and definition of a port in the graph
    pub fn resolve<D: DefinitionProvider + ?Sized>(
        graph: &'a Graph,
        definitions: &'a D,
        port: &'a Port,
    ) -> Option<Self> {
        let node = graph.node(port.node_id)?;
        Some(Self::new(port, node, definitions.definition(&node.node_type)))
    }
}

/// Check a pair of endpoints, given in either order.
///
/// Capacity is judged on the pair in output-to-input order: the input's
/// capacity is waived in a replace scenario, the output's never is.
pub fn check_connection(
    source: Endpoint<'_>,
    target: Endpoint<'_>,
    graph: &Graph,
    context: ValidationContext,
) -> Result<(), Rejection> {
    if source.port.direction == target.port.direction {
        return Err(Rejection::SameDirection);
    }
    if source.port.node_id == target.port.node_id {
        return Err(Rejection::SameNode);
    }

    if let (Some(a), Some(b)) = (&source.port.data_types, &target.port.data_types) {
        if !a.overlaps(b) {
            return Err(Rejection::DataTypeMismatch);
        }
    }

    check_allow_lists(source, target)?;
    check_allow_lists(target, source)?;

    let (output, input) = if source.port.is_output() {
        (source, target)
    } else {
        (target, source)
    };

    let output_key = output.port.key();
    let input_key = input.port.key();
    let duplicate = graph.connections_at(&output_key).any(|c| {
        Some(c.id) != context.ignored_connection && c.source() == output_key && c.target() == input_key
    });
    if duplicate {
        return Err(Rejection::Duplicate);
    }

    let input_load = occupancy(graph, input.port, context.ignored_connection);
    if !context.replacing && !input.port.max_connections.has_room(input_load) {
        return Err(Rejection::TargetAtCapacity);
    }
    let output_load = occupancy(graph, output.port, context.ignored_connection);
    if !output.port.max_connections.has_room(output_load) {
        return Err(Rejection::SourceAtCapacity);
    }

    for definition in [output.definition, input.definition].into_iter().flatten() {
        if let Some(rule) = &definition.validate_connection {
            if !rule.allows(output.port, input.port, output.node, input.node) {
                return Err(Rejection::CustomRule);
            }
        }
    }

    Ok(())
}

/// Live connections at a port, minus the ignored one
pub fn occupancy(graph: &Graph, port: &Port, ignored: Option<ConnectionId>) -> usize {
    let key = port.key();
    graph
        .connections_at(&key)
        .filter(|c| Some(c.id) != ignored)
        .count()
}

/// `restricting`'s allow-lists against `other`
fn check_allow_lists(restricting: Endpoint<'_>, other: Endpoint<'_>) -> Result<(), Rejection> {
    if let Some(allowed) = &restricting.port.allowed_node_types {
        if !allowed.iter().any(|t| *t == other.node.node_type) {
            return Err(Rejection::NodeTypeNotAllowed);
        }
    }
    if let Some(allowed) = &restricting.port.allowed_port_types {
        if !allowed.iter().any(|k| k == other.port.kind_id()) {
            return Err(Rejection::PortTypeNotAllowed);
        }
    }
    Ok(())
}

/// Check two ports of graph nodes, resolving their nodes and definitions
pub fn check_ports<D: DefinitionProvider + ?Sized>(
    source: &Port,
    target: &Port,
    graph: &Graph,
    definitions: &D,
    context: ValidationContext,
) -> Result<(), Rejection> {
    // Direction and locality need no lookups and must fail the same way
    // whichever way round the pair is passed.
    if source.direction == target.direction {
        return Err(Rejection::SameDirection);
    }
    if source.node_id == target.node_id {
        return Err(Rejection::SameNode);
    }

    let source = Endpoint::resolve(graph, definitions, source).ok_or(Rejection::MissingNode)?;
    let target = Endpoint::resolve(graph, definitions, target).ok_or(Rejection::MissingNode)?;
    check_connection(source, target, graph, context)
}

/// Boolean view of [`check_ports`]
pub fn can_connect<D: DefinitionProvider + ?Sized>(
    source: &Port,
    target: &Port,
    graph: &Graph,
    definitions: &D,
    context: ValidationContext,
) -> bool {
    check_ports(source, target, graph, definitions, context).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCategory, NodeRegistry};
    use crate::port::{MaxConnections, PortDefinition, PortKey, PortType};
    use crate::provider::resolve_port;
    use crate::testing::Fixture;

    fn port(fx: &Fixture, key: &PortKey) -> Port {
        resolve_port(&fx.graph, &fx.registry, key).unwrap()
    }

    fn check(fx: &Fixture, a: &PortKey, b: &PortKey) -> Result<(), Rejection> {
        check_ports(&port(fx, a), &port(fx, b), &fx.graph, &fx.registry, ValidationContext::default())
    }

    #[test]
    fn test_output_to_free_input() {
        let fx = Fixture::new();
        assert_eq!(check(&fx, &fx.out_a, &fx.in_b), Ok(()));
        assert_eq!(check(&fx, &fx.in_b, &fx.out_a), Ok(()));
    }

    #[test]
    fn test_same_direction_rejected_both_ways() {
        let fx = Fixture::new();
        assert_eq!(check(&fx, &fx.in_b, &fx.in_c), Err(Rejection::SameDirection));
        assert_eq!(check(&fx, &fx.in_c, &fx.in_b), Err(Rejection::SameDirection));
        assert_eq!(check(&fx, &fx.out_a, &fx.out_d), Err(Rejection::SameDirection));
    }

    #[test]
    fn test_same_node_rejected_both_ways() {
        let fx = Fixture::new();
        assert_eq!(check(&fx, &fx.out_b, &fx.in_b), Err(Rejection::SameNode));
        assert_eq!(check(&fx, &fx.in_b, &fx.out_b), Err(Rejection::SameNode));
    }

    #[test]
    fn test_data_type_mismatch() {
        let fx = Fixture::new();
        assert_eq!(check(&fx, &fx.out_a, &fx.text_b), Err(Rejection::DataTypeMismatch));
    }

    #[test]
    fn test_untyped_port_accepts_anything() {
        let fx = Fixture::new();
        assert_eq!(check(&fx, &fx.out_a, &fx.any_b), Ok(()));
    }

    #[test]
    fn test_target_capacity() {
        let mut fx = Fixture::new();
        fx.link(fx.out_d.clone(), fx.in_b.clone());

        assert_eq!(check(&fx, &fx.out_a, &fx.in_b), Err(Rejection::TargetAtCapacity));
        assert_eq!(check(&fx, &fx.in_b, &fx.out_a), Err(Rejection::TargetAtCapacity));
        let replacing = check_ports(
            &port(&fx, &fx.out_a),
            &port(&fx, &fx.in_b),
            &fx.graph,
            &fx.registry,
            ValidationContext::replacing(),
        );
        assert_eq!(replacing, Ok(()));
    }

    #[test]
    fn test_ignored_connection_frees_capacity() {
        let mut fx = Fixture::new();
        let existing = fx.link(fx.out_d.clone(), fx.in_b.clone());

        let result = check_ports(
            &port(&fx, &fx.out_a),
            &port(&fx, &fx.in_b),
            &fx.graph,
            &fx.registry,
            ValidationContext::ignoring(existing),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_duplicate_rejected_before_capacity() {
        let mut fx = Fixture::new();
        fx.link(fx.out_a.clone(), fx.many_b.clone());
        assert_eq!(check(&fx, &fx.out_a, &fx.many_b), Err(Rejection::Duplicate));
    }

    #[test]
    fn test_multi_input_capacity() {
        let mut fx = Fixture::new();
        fx.link(fx.out_a.clone(), fx.many_b.clone());
        assert_eq!(check(&fx, &fx.out_d, &fx.many_b), Ok(()));

        fx.link(fx.out_d.clone(), fx.many_b.clone());
        assert_eq!(check(&fx, &fx.out_c, &fx.many_b), Err(Rejection::TargetAtCapacity));
    }

    fn restricted_registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeDefinition::new("player", "Player", NodeCategory::Input)
                .with_port(PortDefinition::output("self", "Self").with_type(PortType::Entity)),
        );
        registry.register(
            NodeDefinition::new("camera", "Camera", NodeCategory::Input)
                .with_port(PortDefinition::output("self", "Self").with_type(PortType::Entity))
                .with_port(
                    PortDefinition::output("limited", "Limited")
                        .with_type(PortType::Entity)
                        .with_max_connections(MaxConnections::Limited(1)),
                ),
        );
        registry.register(
            NodeDefinition::new("possess", "Possess", NodeCategory::Logic)
                .with_port(
                    PortDefinition::input("pawn", "Pawn")
                        .with_type(PortType::Entity)
                        .allow_node_types(["player"]),
                )
                .with_port(
                    PortDefinition::input("target", "Target")
                        .with_type(PortType::Entity)
                        .with_max_connections(MaxConnections::Unlimited)
                        .allow_port_types(["limited"]),
                ),
        );
        registry.register(
            NodeDefinition::new("picky", "Picky", NodeCategory::Custom)
                .with_port(PortDefinition::input("in", "In"))
                .with_rule(|_, _, source_node, _| source_node.node_type != "camera"),
        );
        registry
    }

    fn node_port(graph: &Graph, registry: &NodeRegistry, node_type: &str, port: &str) -> Port {
        let node = graph.nodes_of_type(node_type).next().unwrap();
        resolve_port(graph, registry, &PortKey::new(node.id, port)).unwrap()
    }

    fn restricted_graph(registry: &NodeRegistry) -> Graph {
        let mut graph = Graph::new("restricted");
        for node_type in ["player", "camera", "possess", "picky"] {
            graph.add_node(registry.create_node(node_type).unwrap());
        }
        graph
    }

    #[test]
    fn test_node_type_allow_list() {
        let registry = restricted_registry();
        let graph = restricted_graph(&registry);
        let pawn = node_port(&graph, &registry, "possess", "pawn");
        let player = node_port(&graph, &registry, "player", "self");
        let camera = node_port(&graph, &registry, "camera", "self");

        let ctx = ValidationContext::default();
        assert!(can_connect(&player, &pawn, &graph, &registry, ctx));
        assert_eq!(
            check_ports(&camera, &pawn, &graph, &registry, ctx),
            Err(Rejection::NodeTypeNotAllowed)
        );
    }

    #[test]
    fn test_port_type_allow_list() {
        let registry = restricted_registry();
        let graph = restricted_graph(&registry);
        let target = node_port(&graph, &registry, "possess", "target");
        let limited = node_port(&graph, &registry, "camera", "limited");
        let camera = node_port(&graph, &registry, "camera", "self");

        let ctx = ValidationContext::default();
        assert!(can_connect(&limited, &target, &graph, &registry, ctx));
        assert_eq!(
            check_ports(&target, &camera, &graph, &registry, ctx),
            Err(Rejection::PortTypeNotAllowed)
        );
    }

    #[test]
    fn test_source_capacity_never_waived() {
        let registry = restricted_registry();
        let mut graph = restricted_graph(&registry);
        let limited = node_port(&graph, &registry, "camera", "limited");
        let target = node_port(&graph, &registry, "possess", "target");
        graph.connect(&registry, &limited.key(), &target.key()).unwrap();

        let pawn_target = node_port(&graph, &registry, "possess", "target");
        let result = check_ports(&limited, &pawn_target, &graph, &registry, ValidationContext::replacing());
        assert_eq!(result, Err(Rejection::Duplicate));

        let mut second = registry.create_node("possess").unwrap();
        second.position = [400.0, 0.0];
        let second_id = graph.add_node(second);
        let other = resolve_port(&graph, &registry, &PortKey::new(second_id, "target")).unwrap();
        let result = check_ports(&limited, &other, &graph, &registry, ValidationContext::replacing());
        assert_eq!(result, Err(Rejection::SourceAtCapacity));
    }

    #[test]
    fn test_custom_rule_vetoes_last() {
        let registry = restricted_registry();
        let graph = restricted_graph(&registry);
        let picky = node_port(&graph, &registry, "picky", "in");
        let camera = node_port(&graph, &registry, "camera", "self");
        let player = node_port(&graph, &registry, "player", "self");

        let ctx = ValidationContext::default();
        assert_eq!(check_ports(&camera, &picky, &graph, &registry, ctx), Err(Rejection::CustomRule));
        assert!(can_connect(&player, &picky, &graph, &registry, ctx));
        // Rule order: the veto never runs for a pair that already failed.
        assert_eq!(check_ports(&picky, &picky, &graph, &registry, ctx), Err(Rejection::SameDirection));
    }
}
