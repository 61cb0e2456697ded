// SPDX-License-Identifier: MIT OR Apache-2.0
//! Replace / Append / Ignore decision for completing a connection.
//!
//! The pair is put in output-to-input order first, so the decision does
//! not depend on which end the drag started from. A free input slot
//! appends. An occupied single-connection input swaps its occupant out.
//! Everything else, a full output or a full multi-connection input, is
//! ignored so no existing data is lost silently.

use crate::connection::{Connection, ConnectionId};
use crate::graph::{Graph, GraphError};
use crate::normalize::normalize_endpoints;
use crate::port::Port;
use crate::provider::DefinitionProvider;
use crate::validate::{check_connection, Endpoint, Rejection, ValidationContext};
use serde::{Deserialize, Serialize};

/// What completing a connection onto a port will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchBehavior {
    /// Remove the occupant(s) first, then add
    Replace,
    /// Add alongside existing connections
    Append,
    /// Do nothing
    Ignore,
}

/// Outcome of [`plan_switch`]
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchPlan {
    /// Decision
    pub behavior: SwitchBehavior,
    /// Connection to add, for Replace and Append
    pub connection: Option<Connection>,
    /// Connections to delete before adding, for Replace
    pub connection_ids_to_replace: Vec<ConnectionId>,
    /// Why the pair was ignored
    pub rejection: Option<Rejection>,
}

impl SwitchPlan {
    fn append(connection: Connection) -> Self {
        Self {
            behavior: SwitchBehavior::Append,
            connection: Some(connection),
            connection_ids_to_replace: Vec::new(),
            rejection: None,
        }
    }

    fn replace(connection: Connection, replaced: Vec<ConnectionId>) -> Self {
        Self {
            behavior: SwitchBehavior::Replace,
            connection: Some(connection),
            connection_ids_to_replace: replaced,
            rejection: None,
        }
    }

    fn ignore(rejection: Rejection) -> Self {
        Self {
            behavior: SwitchBehavior::Ignore,
            connection: None,
            connection_ids_to_replace: Vec::new(),
            rejection: Some(rejection),
        }
    }

    /// The plan produces no mutation
    pub fn is_ignore(&self) -> bool {
        self.behavior == SwitchBehavior::Ignore
    }
}

/// Plan completing a connection between `source` (the anchor) and `target`.
///
/// The ports may be passed in either order; the result is the same.
pub fn plan_switch<D: DefinitionProvider + ?Sized>(
    source: &Port,
    target: &Port,
    graph: &Graph,
    definitions: &D,
) -> SwitchPlan {
    plan_switch_with(source, target, graph, definitions, ValidationContext::default())
}

/// [`plan_switch`] with an explicit validation context
pub fn plan_switch_with<D: DefinitionProvider + ?Sized>(
    source: &Port,
    target: &Port,
    graph: &Graph,
    definitions: &D,
    context: ValidationContext,
) -> SwitchPlan {
    let (Some(source), Some(target)) = (
        Endpoint::resolve(graph, definitions, source),
        Endpoint::resolve(graph, definitions, target),
    ) else {
        return SwitchPlan::ignore(Rejection::MissingNode);
    };
    plan_endpoints(source, target, graph, context)
}

/// Plan over already-resolved endpoints
pub fn plan_endpoints(
    source: Endpoint<'_>,
    target: Endpoint<'_>,
    graph: &Graph,
    context: ValidationContext,
) -> SwitchPlan {
    let Some(pair) = normalize_endpoints(source, target) else {
        let rejection = if source.port.direction == target.port.direction {
            Rejection::SameDirection
        } else {
            Rejection::SameNode
        };
        return SwitchPlan::ignore(rejection);
    };

    match check_connection(pair.source, pair.target, graph, context) {
        Ok(()) => SwitchPlan::append(pair.connection()),
        Err(Rejection::TargetAtCapacity) if pair.target.port.max_connections.is_single() => {
            match check_connection(pair.source, pair.target, graph, context.as_replacing()) {
                Ok(()) => {
                    let key = pair.target.port.key();
                    let replaced = graph
                        .connections_at(&key)
                        .filter(|c| Some(c.id) != context.ignored_connection)
                        .map(|c| c.id)
                        .collect();
                    SwitchPlan::replace(pair.connection(), replaced)
                }
                Err(rejection) => SwitchPlan::ignore(rejection),
            }
        }
        Err(rejection) => SwitchPlan::ignore(rejection),
    }
}

/// Apply a plan to the graph: delete replaced connections, then add.
///
/// The new record is checked against the graph before anything is deleted,
/// so a failing insert leaves the graph untouched.
pub fn apply_switch_plan(graph: &mut Graph, plan: &SwitchPlan) -> Result<Option<ConnectionId>, GraphError> {
    let Some(connection) = plan.connection.clone() else {
        return Ok(None);
    };
    graph.check_insert(&connection)?;

    for id in &plan.connection_ids_to_replace {
        if graph.delete_connection(*id).is_none() {
            tracing::warn!("Replaced connection {id} was already gone");
        }
    }

    let id = graph.insert_connection(connection)?;
    tracing::info!(
        "Connection {id} added ({:?}, {} replaced)",
        plan.behavior,
        plan.connection_ids_to_replace.len()
    );
    Ok(Some(id))
}
