// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection graph engine for node editors.
//!
//! This crate decides which ports may be wired together and drives the
//! pointer gestures that create, replace and re-route wires:
//! - Typed ports with capacity, allow-lists and repetition
//! - Connection validation and source/target normalization
//! - Replace/append/ignore switch planning
//! - Connectable-set computation and nearest-candidate resolution
//! - A connect/disconnect drag state machine with an egui front end
//!
//! ## Architecture
//!
//! The engine owns no node types, layout or rendering. It reads them
//! through the collaborator traits in [`provider`] and mutates only the
//! [`Graph`] it is handed.

pub mod candidate;
pub mod catalog;
pub mod config;
pub mod connectable;
pub mod connection;
pub mod drag;
pub mod graph;
pub mod layout;
pub mod node;
pub mod normalize;
pub mod port;
pub mod provider;
pub mod shared;
pub mod switch;
pub mod ui;
pub mod validate;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, ConnectionConfig};
pub use connectable::{compute_connectable_set, ConnectablePorts};
pub use connection::{Connection, ConnectionId};
pub use drag::{DragMachine, DragOutcome, EngineContext, NodeSearchRequest};
pub use graph::{Graph, GraphError};
pub use node::{Node, NodeDefinition, NodeId, NodeRegistry};
pub use port::{Port, PortDefinition, PortDirection, PortId, PortKey, PortType};
pub use provider::{DefinitionProvider, GeometryProvider, PortProvider};
pub use shared::SharedGraph;
pub use switch::{apply_switch_plan, plan_switch, SwitchBehavior, SwitchPlan};
pub use validate::{can_connect, Rejection, ValidationContext};

/// Canvas coordinates
pub use egui::Pos2;
