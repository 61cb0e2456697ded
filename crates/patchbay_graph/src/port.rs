// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.
//!
//! Ports are never stored on a node. They are derived from the node's
//! [`NodeDefinition`](crate::node::NodeDefinition) and its current data, so a
//! port id has to stay stable across re-derivation: it is a plain string,
//! unique within its node.

use crate::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a port, unique within its node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub String);

impl PortId {
    /// Create a port ID from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PortId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Graph-wide address of a port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortKey {
    /// Owning node
    pub node_id: NodeId,
    /// Port within the node
    pub port_id: PortId,
}

impl PortKey {
    /// Create a new port key
    pub fn new(node_id: NodeId, port_id: impl Into<PortId>) -> Self {
        Self {
            node_id,
            port_id: port_id.into(),
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.port_id)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortDirection {
    /// The other direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }

    /// Capacity a port of this direction gets when its definition is silent
    pub fn default_max_connections(self) -> MaxConnections {
        match self {
            Self::Input => MaxConnections::Limited(1),
            Self::Output => MaxConnections::Unlimited,
        }
    }

    /// Side a port of this direction is placed on by default
    pub fn default_side(self) -> PortSide {
        match self {
            Self::Input => PortSide::Left,
            Self::Output => PortSide::Right,
        }
    }
}

/// Data type tag that can flow through ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Execution flow (for gameplay graphs)
    Exec,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// Matrix 4x4
    Mat4,
    /// Texture sampler
    Texture,
    /// Material reference
    Material,
    /// Entity reference
    Entity,
    /// String value
    String,
    /// Wildcard, shares a tag with every other type
    Any,
    /// Custom type
    Custom(String),
}

impl PortType {
    /// Check if this tag matches another tag
    pub fn shares_tag(&self, other: &PortType) -> bool {
        matches!(self, Self::Any) || matches!(other, Self::Any) || self == other
    }

    /// Wire and pin color
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Exec => [200, 200, 200],
            Self::Bool => [200, 80, 80],
            Self::Int => [80, 200, 200],
            Self::Float => [80, 200, 80],
            Self::Vector2 | Self::Vector3 | Self::Vector4 => [200, 180, 80],
            Self::Color => [255, 200, 100],
            Self::Mat4 => [150, 100, 200],
            Self::Texture | Self::Material => [100, 150, 200],
            Self::Entity => [150, 200, 150],
            Self::String => [200, 180, 150],
            Self::Any | Self::Custom(_) => [140, 140, 140],
        }
    }
}

/// The tag(s) a port produces or accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTypes {
    /// Exactly one tag
    One(PortType),
    /// Any of several tags
    AnyOf(Vec<PortType>),
}

impl DataTypes {
    /// All declared tags
    pub fn tags(&self) -> &[PortType] {
        match self {
            Self::One(tag) => std::slice::from_ref(tag),
            Self::AnyOf(tags) => tags,
        }
    }

    /// At least one tag is shared between both declarations
    pub fn overlaps(&self, other: &DataTypes) -> bool {
        self.tags()
            .iter()
            .any(|a| other.tags().iter().any(|b| a.shares_tag(b)))
    }
}

impl From<PortType> for DataTypes {
    fn from(tag: PortType) -> Self {
        Self::One(tag)
    }
}

/// How many connections a port accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaxConnections {
    /// At most this many connections (always at least one)
    Limited(u32),
    /// No limit
    Unlimited,
}

impl MaxConnections {
    /// A finite capacity; zero is raised to one
    pub fn limited(count: u32) -> Self {
        Self::Limited(count.max(1))
    }

    /// Whether one more connection fits next to `existing` ones
    pub fn has_room(self, existing: usize) -> bool {
        match self {
            Self::Limited(max) => existing < max as usize,
            Self::Unlimited => true,
        }
    }

    /// Exactly one connection allowed
    pub fn is_single(self) -> bool {
        self == Self::Limited(1)
    }
}

/// Logical placement of a port on its node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PortSide {
    /// Left edge
    Left,
    /// Right edge
    Right,
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
    /// Fixed offset from the node origin
    Absolute {
        /// Horizontal offset
        x: f32,
        /// Vertical offset
        y: f32,
    },
}

/// A port on a node, as derived from its definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port ID, unique within the node
    pub id: PortId,
    /// Declaring definition, for repeated ports
    pub definition_id: Option<PortId>,
    /// Owning node
    pub node_id: NodeId,
    /// Port direction
    pub direction: PortDirection,
    /// Display label
    pub label: String,
    /// Placement on the node
    pub side: PortSide,
    /// Declared data types, `None` accepts anything
    pub data_types: Option<DataTypes>,
    /// Connection capacity
    pub max_connections: MaxConnections,
    /// Node types the other end may belong to
    pub allowed_node_types: Option<Vec<String>>,
    /// Port kinds the other end may be
    pub allowed_port_types: Option<Vec<String>>,
    /// Index among the repeated instances
    pub instance_index: Option<u32>,
    /// Number of repeated instances
    pub instance_total: Option<u32>,
}

impl Port {
    /// Address of this port in the graph
    pub fn key(&self) -> PortKey {
        PortKey::new(self.node_id, self.id.clone())
    }

    /// Is this an input port
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Is this an output port
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// The id allow-lists match against: the definition id for repeated
    /// ports, the port id otherwise
    pub fn kind_id(&self) -> &str {
        self.definition_id.as_ref().unwrap_or(&self.id).as_str()
    }

    /// Color of the first declared tag
    pub fn color(&self) -> [u8; 3] {
        self.data_types
            .as_ref()
            .and_then(|types| types.tags().first())
            .unwrap_or(&PortType::Any)
            .color()
    }
}

/// Upper bound on repeated instances unless [`PortRepeat::clamped`] says otherwise
pub const DEFAULT_MAX_REPEAT: u32 = 64;

/// Repetition of a port definition driven by node data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRepeat {
    /// Numeric key in the node data holding the instance count
    pub count_key: String,
    /// Count used when the key is missing or not a number
    pub default: u32,
    /// Lower bound for the count
    pub min: u32,
    /// Upper bound for the count
    pub max: u32,
}

impl PortRepeat {
    /// Repeat by `count_key`, starting from `default` instances
    pub fn new(count_key: impl Into<String>, default: u32) -> Self {
        Self {
            count_key: count_key.into(),
            default,
            min: 0,
            max: DEFAULT_MAX_REPEAT,
        }
    }

    /// Clamp the instance count
    pub fn clamped(mut self, min: u32, max: u32) -> Self {
        self.min = min;
        self.max = max.max(min);
        self
    }

    /// Instance count for a node
    pub fn count_for(&self, node: &Node) -> u32 {
        let raw = node
            .data
            .get(&self.count_key)
            .and_then(serde_json::Value::as_u64)
            .map_or(self.default, |n| u32::try_from(n).unwrap_or(u32::MAX));
        raw.clamp(self.min, self.max)
    }
}

/// Declaration of a port (or a family of repeated ports) on a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDefinition {
    /// Port ID; repeated instances get `<id>_<index>`
    pub id: PortId,
    /// Port direction
    pub direction: PortDirection,
    /// Display label
    pub label: String,
    /// Placement, defaults by direction
    pub side: Option<PortSide>,
    /// Declared data types
    pub data_types: Option<DataTypes>,
    /// Capacity, defaults by direction
    pub max_connections: Option<MaxConnections>,
    /// Node types the other end may belong to
    pub allowed_node_types: Option<Vec<String>>,
    /// Port kinds the other end may be
    pub allowed_port_types: Option<Vec<String>>,
    /// Repetition rule for dynamic ports
    pub repeat: Option<PortRepeat>,
}

impl PortDefinition {
    /// Create a new port definition
    pub fn new(id: impl Into<PortId>, label: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            id: id.into(),
            direction,
            label: label.into(),
            side: None,
            data_types: None,
            max_connections: None,
            allowed_node_types: None,
            allowed_port_types: None,
            repeat: None,
        }
    }

    /// Create a new input port definition
    pub fn input(id: impl Into<PortId>, label: impl Into<String>) -> Self {
        Self::new(id, label, PortDirection::Input)
    }

    /// Create a new output port definition
    pub fn output(id: impl Into<PortId>, label: impl Into<String>) -> Self {
        Self::new(id, label, PortDirection::Output)
    }

    /// Declare a single data type
    pub fn with_type(mut self, tag: PortType) -> Self {
        self.data_types = Some(DataTypes::One(tag));
        self
    }

    /// Declare a set of acceptable data types
    pub fn with_types(mut self, tags: impl IntoIterator<Item = PortType>) -> Self {
        self.data_types = Some(DataTypes::AnyOf(tags.into_iter().collect()));
        self
    }

    /// Set the capacity
    pub fn with_max_connections(mut self, max: MaxConnections) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Place the port on a side
    pub fn on_side(mut self, side: PortSide) -> Self {
        self.side = Some(side);
        self
    }

    /// Restrict the node types on the other end
    pub fn allow_node_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.allowed_node_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict the port kinds on the other end
    pub fn allow_port_types<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.allowed_port_types = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Repeat this port according to node data
    pub fn repeated(mut self, repeat: PortRepeat) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Derive the concrete port(s) this definition yields on a node
    pub fn instantiate(&self, node: &Node) -> Vec<Port> {
        let Some(repeat) = &self.repeat else {
            return vec![self.port(node.id, self.id.clone(), self.label.clone(), None)];
        };

        let total = repeat.count_for(node);
        (0..total)
            .map(|index| {
                let mut port = self.port(
                    node.id,
                    PortId(format!("{}_{}", self.id, index)),
                    format!("{} {}", self.label, index + 1),
                    Some(self.id.clone()),
                );
                port.instance_index = Some(index);
                port.instance_total = Some(total);
                port
            })
            .collect()
    }

    fn port(&self, node_id: NodeId, id: PortId, label: String, definition_id: Option<PortId>) -> Port {
        Port {
            id,
            definition_id,
            node_id,
            direction: self.direction,
            label,
            side: self.side.unwrap_or_else(|| self.direction.default_side()),
            data_types: self.data_types.clone(),
            max_connections: self
                .max_connections
                .unwrap_or_else(|| self.direction.default_max_connections()),
            allowed_node_types: self.allowed_node_types.clone(),
            allowed_port_types: self.allowed_port_types.clone(),
            instance_index: None,
            instance_total: None,
        }
    }
}
