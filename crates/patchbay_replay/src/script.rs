// SPDX-License-Identifier: MIT OR Apache-2.0
//! Replay script format.
//!
//! ```ron
//! ReplayScript(
//!     config: (disconnect_threshold: 8.0),
//!     nodes: [
//!         (name: "start", node_type: "event_begin_play", position: (0.0, 0.0)),
//!         (name: "print", node_type: "print_string", position: (300.0, 0.0)),
//!     ],
//!     steps: [
//!         Press(node: "start", port: "exec"),
//!         MoveTo(node: "print", port: "exec"),
//!         Release,
//!     ],
//! )
//! ```

use patchbay_graph::{ConfigError, ConnectionConfig, GraphError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors while loading or replaying a script
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading the script failed
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    /// The script was malformed
    #[error("Failed to parse script: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The embedded config is out of range
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The node type is not in the catalog
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// The node type is at its instance cap
    #[error("Node type {0} cannot be instantiated again")]
    InstanceCap(String),

    /// No node has this script name
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// The node has no such port, or it has no position yet
    #[error("Unknown port: {0}.{1}")]
    UnknownPort(String, String),

    /// A `Create` step without a preceding drop on empty canvas
    #[error("No node search is pending")]
    NoSearchPending,

    /// The node type was not offered for the pending drop
    #[error("Node type {0} is not compatible with the dragged port")]
    NotOffered(String),

    /// The graph refused a mutation
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A node placed before the steps run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptNode {
    /// Name steps refer to
    pub name: String,
    /// Catalog type
    pub node_type: String,
    /// Canvas position
    pub position: (f32, f32),
    /// Node data, e.g. repeated port counts
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A port addressed by node name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPort {
    /// Node name
    pub node: String,
    /// Port ID
    pub port: String,
}

/// A connection present before the steps run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConnection {
    /// One end
    pub from: ScriptPort,
    /// Other end
    pub to: ScriptPort,
}

/// One pointer action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Press on a port
    Press {
        /// Node name
        node: String,
        /// Port ID
        port: String,
    },
    /// Move to a port's connection point
    MoveTo {
        /// Node name
        node: String,
        /// Port ID
        port: String,
    },
    /// Move to a canvas position
    Move {
        /// Horizontal position
        x: f32,
        /// Vertical position
        y: f32,
    },
    /// Release the button
    Release,
    /// Abort the gesture
    Cancel,
    /// Create a node for the last drop on empty canvas and wire it
    Create {
        /// Name later steps refer to
        name: String,
        /// Catalog type
        node_type: String,
    },
}

/// A full replay script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    /// Gesture tunables
    pub config: ConnectionConfig,
    /// Initial nodes
    pub nodes: Vec<ScriptNode>,
    /// Initial connections
    pub connections: Vec<ScriptConnection>,
    /// Pointer actions, in order
    pub steps: Vec<Step>,
}

impl ReplayScript {
    /// Parse from a RON string
    pub fn from_ron(text: &str) -> Result<Self, ReplayError> {
        let script: Self = ron::from_str(text)?;
        script.config.validate()?;
        Ok(script)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)?;
        let script = Self::from_ron(&text)?;
        tracing::info!(
            "Loaded {} with {} node(s) and {} step(s)",
            path.display(),
            script.nodes.len(),
            script.steps.len()
        );
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = ReplayScript::from_ron(
            r#"(
                config: (snap_radius: Some(30.0)),
                nodes: [
                    (name: "seq", node_type: "sequence", position: (0.0, 0.0), data: {"outputs": 3}),
                ],
                steps: [Press(node: "seq", port: "then_2"), Move(x: 10.0, y: 20.0), Release],
            )"#,
        )
        .unwrap();

        assert_eq!(script.config.snap_radius, Some(30.0));
        assert_eq!(script.nodes[0].data["outputs"], serde_json::json!(3));
        assert_eq!(script.steps.len(), 3);
        assert_eq!(script.steps[2], Step::Release);
        assert!(script.connections.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ReplayScript::from_ron("(config: (port_hit_radius: 0.0))");
        assert!(matches!(result, Err(ReplayError::Config(_))));
    }
}
