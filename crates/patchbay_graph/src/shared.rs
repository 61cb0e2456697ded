// SPDX-License-Identifier: MIT OR Apache-2.0
//! A graph shared between the UI thread and background workers.
//!
//! Planning and applying a switch must happen under one lock, otherwise a
//! plan can go stale between the two and over-fill a port.

use crate::connection::{Connection, ConnectionId};
use crate::graph::{Graph, GraphError};
use crate::port::PortKey;
use crate::provider::{DefinitionProvider, PortProvider};
use crate::switch::{apply_switch_plan, SwitchPlan};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Reference-counted, mutex-guarded graph
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<Graph>>,
}

impl SharedGraph {
    /// Share a graph
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock for a whole gesture transition
    pub fn lock(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Clone the current graph
    pub fn snapshot(&self) -> Graph {
        self.inner.lock().clone()
    }

    /// Plan and apply a connection atomically
    pub fn connect<P>(&self, provider: &P, a: &PortKey, b: &PortKey) -> Result<ConnectionId, GraphError>
    where
        P: DefinitionProvider + PortProvider,
    {
        self.inner.lock().connect(provider, a, b)
    }

    /// Apply a plan's deletions and insertion as one step
    pub fn apply(&self, plan: &SwitchPlan) -> Result<Option<ConnectionId>, GraphError> {
        apply_switch_plan(&mut self.inner.lock(), plan)
    }

    /// Remove a connection for a committed disconnect
    pub fn commit_disconnect(&self, connection_id: ConnectionId) -> Option<Connection> {
        let removed = self.inner.lock().delete_connection(connection_id);
        if removed.is_some() {
            tracing::info!("Connection {connection_id} detached");
        }
        removed
    }
}
