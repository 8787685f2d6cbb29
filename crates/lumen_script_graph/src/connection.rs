// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connections: directed edges from an output pin to an input pin.

use crate::node::NodeId;
use crate::pin::PinId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed edge carrying the source pin's value to the target pin once
/// per pass. The source is always an output pin and the target an input pin;
/// the owning script validates this when the edge is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Node owning the source (output) pin
    pub source_node: NodeId,
    /// Source (output) pin
    pub source_pin: PinId,
    /// Node owning the target (input) pin
    pub target_node: NodeId,
    /// Target (input) pin
    pub target_pin: PinId,
}

impl Connection {
    pub(crate) fn new(
        source_node: NodeId,
        source_pin: PinId,
        target_node: NodeId,
        target_pin: PinId,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            source_node,
            source_pin,
            target_node,
            target_pin,
        }
    }

    /// Whether either endpoint lives on the given node
    pub fn involves_node(&self, node: NodeId) -> bool {
        self.source_node == node || self.target_node == node
    }

    /// Whether either endpoint is the given pin
    pub fn involves_pin(&self, pin: PinId) -> bool {
        self.source_pin == pin || self.target_pin == pin
    }
}
