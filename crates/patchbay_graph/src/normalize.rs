// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical direction for an unordered port pair.
//!
//! A drag may start at either end of the wire it creates. Everything that
//! builds a [`Connection`] goes through here, so `from_*` is always the
//! output and `to_*` always the input.

use crate::connection::Connection;
use crate::port::Port;
use crate::validate::Endpoint;

/// A port pair in output-to-input order
#[derive(Debug, Clone, Copy)]
pub struct NormalizedPair<'a> {
    /// The output port
    pub source: &'a Port,
    /// The input port
    pub target: &'a Port,
}

impl NormalizedPair<'_> {
    /// A fresh connection record for this pair
    pub fn connection(&self) -> Connection {
        Connection::new(self.source.key(), self.target.key())
    }
}

/// Order two ports output-first; `None` for same-direction or same-node pairs
pub fn normalize<'a>(a: &'a Port, b: &'a Port) -> Option<NormalizedPair<'a>> {
    if a.direction == b.direction || a.node_id == b.node_id {
        return None;
    }
    let (source, target) = if a.is_output() { (a, b) } else { (b, a) };
    Some(NormalizedPair { source, target })
}

/// Endpoints in output-to-input order, definitions swapped along with ports
#[derive(Debug, Clone, Copy)]
pub struct NormalizedEndpoints<'a> {
    /// The output side
    pub source: Endpoint<'a>,
    /// The input side
    pub target: Endpoint<'a>,
}

impl NormalizedEndpoints<'_> {
    /// A fresh connection record for this pair
    pub fn connection(&self) -> Connection {
        Connection::new(self.source.port.key(), self.target.port.key())
    }
}

/// Definition-aware [`normalize`]
pub fn normalize_endpoints<'a>(a: Endpoint<'a>, b: Endpoint<'a>) -> Option<NormalizedEndpoints<'a>> {
    normalize(a.port, b.port)?;
    let (source, target) = if a.port.is_output() { (a, b) } else { (b, a) };
    Some(NormalizedEndpoints { source, target })
}
