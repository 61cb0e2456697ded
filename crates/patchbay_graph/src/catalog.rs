// SPDX-License-Identifier: MIT OR Apache-2.0
//! Gameplay node catalog (Blueprint-like visual scripting).
//!
//! Execution pins follow the usual visual-scripting convention: an exec
//! output drives exactly one successor, an exec input may be reached from
//! any number of predecessors.

use crate::node::{NodeCategory, NodeDefinition, NodeRegistry};
use crate::port::{MaxConnections, PortDefinition, PortRepeat, PortType};

fn exec_in(id: &str) -> PortDefinition {
    PortDefinition::input(id, "Exec")
        .with_type(PortType::Exec)
        .with_max_connections(MaxConnections::Unlimited)
}

fn exec_out(id: &str, label: &str) -> PortDefinition {
    PortDefinition::output(id, label)
        .with_type(PortType::Exec)
        .with_max_connections(MaxConnections::Limited(1))
}

/// Create the gameplay node registry
pub fn create_gameplay_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Events
    registry.register(
        NodeDefinition::new("event_begin_play", "Event Begin Play", NodeCategory::Input)
            .with_description("Triggered when gameplay starts")
            .with_port(exec_out("exec", "Exec")),
    );
    registry.register(
        NodeDefinition::new("event_tick", "Event Tick", NodeCategory::Input)
            .with_description("Triggered every frame")
            .with_port(exec_out("exec", "Exec"))
            .with_port(PortDefinition::output("delta_time", "Delta Time").with_type(PortType::Float)),
    );

    // Flow control
    registry.register(
        NodeDefinition::new("branch", "Branch", NodeCategory::Logic)
            .with_description("If/else branching")
            .with_port(exec_in("exec"))
            .with_port(PortDefinition::input("condition", "Condition").with_type(PortType::Bool))
            .with_port(exec_out("true", "True"))
            .with_port(exec_out("false", "False")),
    );
    registry.register(
        NodeDefinition::new("sequence", "Sequence", NodeCategory::Logic)
            .with_description("Fire each output in order")
            .with_port(exec_in("exec"))
            .with_port(exec_out("then", "Then").repeated(PortRepeat::new("outputs", 2).clamped(1, 8))),
    );
    registry.register(
        NodeDefinition::new("delay", "Delay", NodeCategory::Logic)
            .with_description("Resume after a duration; cannot be driven by the tick event")
            .with_port(exec_in("exec"))
            .with_port(PortDefinition::input("duration", "Duration").with_type(PortType::Float))
            .with_port(exec_out("completed", "Completed"))
            .with_rule(|_, _, source_node, _| source_node.node_type != "event_tick"),
    );

    // Data
    registry.register(
        NodeDefinition::new("add", "Add", NodeCategory::Math)
            .with_description("Sum two numbers")
            .with_port(PortDefinition::input("a", "A").with_types([PortType::Float, PortType::Int]))
            .with_port(PortDefinition::input("b", "B").with_types([PortType::Float, PortType::Int]))
            .with_port(PortDefinition::output("result", "Result").with_type(PortType::Float)),
    );
    registry.register(
        NodeDefinition::new("make_array", "Make Array", NodeCategory::Utility)
            .with_description("Collect values into an array")
            .with_port(
                PortDefinition::input("item", "Item")
                    .with_types([PortType::Float, PortType::Int, PortType::String])
                    .repeated(PortRepeat::new("items", 2).clamped(1, 16)),
            )
            .with_port(PortDefinition::output("array", "Array").with_type(PortType::Custom("Array".to_string()))),
    );
    registry.register(
        NodeDefinition::new("print_string", "Print String", NodeCategory::Utility)
            .with_description("Print a string to the console")
            .with_port(exec_in("exec"))
            .with_port(PortDefinition::input("string", "String").with_type(PortType::String))
            .with_port(exec_out("then", "Exec")),
    );

    // World
    registry.register(
        NodeDefinition::new("get_player_pawn", "Get Player Pawn", NodeCategory::Input)
            .with_description("The pawn controlled by the local player")
            .with_port(PortDefinition::output("pawn", "Pawn").with_type(PortType::Entity)),
    );
    registry.register(
        NodeDefinition::new("spawn_actor", "Spawn Actor", NodeCategory::Utility)
            .with_description("Spawn an actor into the world")
            .with_port(exec_in("exec"))
            .with_port(exec_out("then", "Exec"))
            .with_port(PortDefinition::output("actor", "Actor").with_type(PortType::Entity)),
    );
    registry.register(
        NodeDefinition::new("possess", "Possess", NodeCategory::Logic)
            .with_description("Give the player control of a pawn")
            .with_port(exec_in("exec"))
            .with_port(
                PortDefinition::input("pawn", "Pawn")
                    .with_type(PortType::Entity)
                    .allow_node_types(["get_player_pawn"]),
            )
            .with_port(exec_out("then", "Exec")),
    );
    registry.register(
        NodeDefinition::new("game_mode", "Game Mode", NodeCategory::Output)
            .with_description("Rules of the current level; one per graph")
            .with_port(exec_in("exec"))
            .with_port(PortDefinition::input("default_pawn", "Default Pawn").with_type(PortType::Entity))
            .with_max_instances(1),
    );

    registry
}
