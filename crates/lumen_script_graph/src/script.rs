// SPDX-License-Identifier: MIT OR Apache-2.0
//! Script container: owns the node and connection sets, enforces the
//! structural invariants and runs evaluation passes.

use crate::collection::PinCollectionId;
use crate::connection::{Connection, ConnectionId};
use crate::eval::EvalTime;
use crate::node::{Node, NodeId};
use crate::pin::{Pin, PinId};
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Structural rejection of a script mutation. The graph is left unchanged.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found
    #[error("pin not found: {0}")]
    PinNotFound(PinId),

    /// Connection source must be an output pin
    #[error("connection source {0} is not an output pin")]
    SourceNotOutput(PinId),

    /// Connection target must be an input pin
    #[error("connection target {0} is not an input pin")]
    TargetNotInput(PinId),

    /// Pin types cannot be coerced into each other
    #[error("incompatible pin types: {output:?} -> {input:?}")]
    IncompatibleTypes {
        /// Declared type of the output pin
        output: ValueType,
        /// Declared type of the input pin
        input: ValueType,
    },

    /// A node cannot feed itself
    #[error("connection would form a self-loop")]
    SelfLoop,

    /// The edge would close a cycle
    #[error("connection would create a cycle")]
    WouldCreateCycle,

    /// Default nodes are permanent fixtures of their script
    #[error("node {0} is a default node and cannot be removed")]
    DefaultNodeRemoval(NodeId),

    /// The exit node is permanent
    #[error("node {0} is the exit node and cannot be removed")]
    ExitNodeRemoval(NodeId),

    /// A script holds exactly one exit node
    #[error("script already has an exit node")]
    DuplicateExitNode,

    /// Scripts must be built around an exit node
    #[error("the provided node is not an exit node")]
    NotAnExitNode,

    /// Pin collection not found on the addressed node
    #[error("pin collection not found on the addressed node")]
    CollectionNotFound,

    /// The pin collection is at its minimum arity
    #[error("pin collection is at its minimum of {min} pins")]
    CollectionAtMinimum {
        /// The collection's minimum arity
        min: usize,
    },
}

/// Notification emitted by script mutations, drained by the editor to keep
/// its visual state in sync. Mutations never trigger evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// A node joined the script
    NodeAdded(NodeId),
    /// A node left the script
    NodeRemoved(NodeId),
    /// A connection was created
    Connected(ConnectionId),
    /// A connection was removed
    Disconnected(ConnectionId),
    /// A pin appeared on a node
    PinAdded {
        /// The owning node
        node: NodeId,
        /// The new pin
        pin: PinId,
    },
    /// A pin left a node
    PinRemoved {
        /// The owning node
        node: NodeId,
        /// The removed pin
        pin: PinId,
    },
}

/// Result of a successful [`NodeScript::connect`], carrying what an undo
/// needs: the new edge's id and the edge it implicitly replaced, if any.
#[derive(Debug, Clone, Copy)]
pub struct Connected {
    /// The created connection
    pub id: ConnectionId,
    /// The previous connection into the same input pin, now removed
    pub replaced: Option<Connection>,
}

/// Result of a successful [`NodeScript::remove_node`]: everything needed to
/// reinsert the node and its edges.
#[derive(Debug)]
pub struct RemovedNode {
    /// The removed node, pins intact
    pub node: Node,
    /// Every connection that touched the node, in removal order
    pub connections: Vec<Connection>,
}

/// Result of a successful [`NodeScript::remove_collection_pin`].
#[derive(Debug)]
pub struct RemovedPin {
    /// The removed pin
    pub pin: Pin,
    /// Every connection that touched the pin
    pub connections: Vec<Connection>,
}

/// One node's slot in the cached evaluation plan: the connections routing
/// values into it and the output pins that feed someone downstream.
#[derive(Debug, Default)]
struct EvalStep {
    node: NodeId,
    inputs: Vec<Connection>,
    live_outputs: Vec<PinId>,
}

/// A running node graph.
///
/// The script owns the nodes and the connections between their pins,
/// enforces acyclicity and type compatibility at mutation time, and walks
/// the nodes in dependency order once per [`NodeScript::evaluate`] call.
///
/// Mutations come from the editor, passes from the render loop; the two must
/// be serialized on the instance - see [`SharedNodeScript`]. A pass allocates
/// nothing once the evaluation plan is cached: editing invalidates the plan,
/// the next pass rebuilds it.
pub struct NodeScript {
    name: String,
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    exit_node: NodeId,
    plan: Option<Vec<EvalStep>>,
    events: VecDeque<GraphEvent>,
    started: Instant,
    last_pass: Option<Duration>,
}

/// The concurrency discipline for a script instance: the editor's mutations
/// and the render loop's passes both lock the same mutex, so no pass ever
/// observes a half-updated connection set. Distinct scripts are fully
/// independent and may live on different worker threads.
pub type SharedNodeScript = Arc<Mutex<NodeScript>>;

impl NodeScript {
    /// Create a script around its permanent exit node.
    ///
    /// Fails with [`GraphError::NotAnExitNode`] if the node is not flagged as
    /// an exit node.
    pub fn new(name: impl Into<String>, exit: Node) -> Result<Self, GraphError> {
        if !exit.is_exit_node() {
            return Err(GraphError::NotAnExitNode);
        }
        let exit_node = exit.id();
        let mut nodes = IndexMap::new();
        nodes.insert(exit_node, exit);
        Ok(Self {
            name: name.into(),
            nodes,
            connections: IndexMap::new(),
            exit_node,
            plan: None,
            events: VecDeque::new(),
            started: Instant::now(),
            last_pass: None,
        })
    }

    /// Wrap the script for sharing between an editor and a render loop
    pub fn into_shared(self) -> SharedNodeScript {
        Arc::new(Mutex::new(self))
    }

    /// The script's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id of the script's unique exit node
    pub fn exit_node_id(&self) -> NodeId {
        self.exit_node
    }

    /// Add a node to the script.
    ///
    /// Rejects a second exit node; the exit node is fixed at construction.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if node.is_exit_node() {
            return Err(GraphError::DuplicateExitNode);
        }
        let id = node.id();
        self.nodes.insert(id, node);
        self.events.push_back(GraphEvent::NodeAdded(id));
        self.invalidate();
        Ok(id)
    }

    /// Remove a node and every connection touching it.
    ///
    /// Default and exit nodes are rejected. The returned [`RemovedNode`]
    /// carries everything an undo needs.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemovedNode, GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        if node.is_exit_node() {
            return Err(GraphError::ExitNodeRemoval(id));
        }
        if node.is_default_node() {
            return Err(GraphError::DefaultNodeRemoval(id));
        }

        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(id))
            .map(|c| c.id)
            .collect();
        let mut connections = Vec::with_capacity(touching.len());
        for connection_id in touching {
            if let Some(connection) = self.connections.shift_remove(&connection_id) {
                if connection.target_node != id {
                    self.reset_input(connection.target_node, connection.target_pin);
                }
                self.events.push_back(GraphEvent::Disconnected(connection_id));
                connections.push(connection);
            }
        }

        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.events.push_back(GraphEvent::NodeRemoved(id));
        self.invalidate();
        Ok(RemovedNode { node, connections })
    }

    /// Get a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by id.
    ///
    /// This is for host-side concerns - canvas positions, behavior
    /// configuration, pushing event arguments. Structural edits go through
    /// the command methods so invariants and undo information stay intact.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes in the script
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a connection by id
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All connections, in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections with an endpoint on the given node
    pub fn connections_touching(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node))
    }

    /// Number of connections in the script
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connect an output pin to an input pin.
    ///
    /// Validates that both pins exist, that directions and types line up and
    /// that the edge closes no cycle. An input pin holds at most one inbound
    /// edge: connecting over an existing one replaces it, and the replaced
    /// edge is handed back for undo. On any rejection the graph is unchanged,
    /// including a previously present edge into the same input.
    pub fn connect(
        &mut self,
        source_node: NodeId,
        source_pin: PinId,
        target_node: NodeId,
        target_pin: PinId,
    ) -> Result<Connected, GraphError> {
        let source = self
            .nodes
            .get(&source_node)
            .ok_or(GraphError::NodeNotFound(source_node))?
            .pins()
            .pin(source_pin)
            .ok_or(GraphError::PinNotFound(source_pin))?;
        if !source.is_output() {
            return Err(GraphError::SourceNotOutput(source_pin));
        }
        let output_type = source.value_type();

        let target = self
            .nodes
            .get(&target_node)
            .ok_or(GraphError::NodeNotFound(target_node))?
            .pins()
            .pin(target_pin)
            .ok_or(GraphError::PinNotFound(target_pin))?;
        if !target.is_input() {
            return Err(GraphError::TargetNotInput(target_pin));
        }
        let input_type = target.value_type();

        if !ValueType::are_compatible(output_type, input_type) {
            return Err(GraphError::IncompatibleTypes {
                output: output_type,
                input: input_type,
            });
        }
        if source_node == target_node {
            return Err(GraphError::SelfLoop);
        }

        // An input holds one edge; lift the old one out before the cycle
        // check so replacing A->x with B->x cannot be rejected because of A.
        let replaced_id = self
            .connections
            .values()
            .find(|c| c.target_pin == target_pin)
            .map(|c| c.id);
        let replaced = replaced_id.and_then(|id| self.connections.shift_remove(&id));

        if self.reaches(target_node, source_node) {
            if let Some(previous) = replaced {
                self.connections.insert(previous.id, previous);
            }
            return Err(GraphError::WouldCreateCycle);
        }

        let connection = Connection::new(source_node, source_pin, target_node, target_pin);
        let id = connection.id;
        self.connections.insert(id, connection);
        if let Some(previous) = &replaced {
            self.events.push_back(GraphEvent::Disconnected(previous.id));
        }
        self.events.push_back(GraphEvent::Connected(id));
        self.invalidate();
        Ok(Connected { id, replaced })
    }

    /// Remove a connection, resetting the orphaned input pin to its default.
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&id)?;
        self.reset_input(connection.target_node, connection.target_pin);
        self.events.push_back(GraphEvent::Disconnected(id));
        self.invalidate();
        Some(connection)
    }

    /// Remove every connection touching a pin. Idempotent: a pin with no
    /// connections is left as-is, in its unconnected default state.
    pub fn disconnect_pin(&mut self, pin: PinId) -> Vec<Connection> {
        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_pin(pin))
            .map(|c| c.id)
            .collect();
        let mut removed = Vec::with_capacity(touching.len());
        for id in touching {
            if let Some(connection) = self.connections.shift_remove(&id) {
                self.reset_input(connection.target_node, connection.target_pin);
                self.events.push_back(GraphEvent::Disconnected(id));
                removed.push(connection);
            }
        }
        if !removed.is_empty() {
            self.invalidate();
        }
        removed
    }

    /// Append a pin to one of a node's pin collections.
    pub fn add_collection_pin(
        &mut self,
        node: NodeId,
        collection: PinCollectionId,
    ) -> Result<PinId, GraphError> {
        let owner = self
            .nodes
            .get_mut(&node)
            .ok_or(GraphError::NodeNotFound(node))?;
        let collection = owner
            .pins_mut()
            .collection_mut(collection)
            .ok_or(GraphError::CollectionNotFound)?;
        let pin = collection.add();
        self.events.push_back(GraphEvent::PinAdded { node, pin });
        self.invalidate();
        Ok(pin)
    }

    /// Remove a pin from one of a node's pin collections, disconnecting
    /// anything attached to it first. Rejected when the collection is at its
    /// minimum arity.
    pub fn remove_collection_pin(
        &mut self,
        node: NodeId,
        pin: PinId,
    ) -> Result<RemovedPin, GraphError> {
        let owner = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        let collection = owner
            .pins()
            .collections()
            .iter()
            .find(|c| c.contains(pin))
            .ok_or(GraphError::PinNotFound(pin))?;
        if collection.len() <= collection.min_count() {
            return Err(GraphError::CollectionAtMinimum {
                min: collection.min_count(),
            });
        }
        let collection_id = collection.id();

        let connections = self.disconnect_pin(pin);
        let owner = self.nodes.get_mut(&node).ok_or(GraphError::NodeNotFound(node))?;
        let pin_struct = owner
            .pins_mut()
            .collection_mut(collection_id)
            .and_then(|c| c.remove(pin))
            .ok_or(GraphError::PinNotFound(pin))?;
        self.events.push_back(GraphEvent::PinRemoved { node, pin });
        self.invalidate();
        Ok(RemovedPin {
            pin: pin_struct,
            connections,
        })
    }

    /// Rebuild a node's dynamically generated pins through its behavior,
    /// then drop any connection the rebuild invalidated (vanished pin or
    /// retyped pin that no longer matches the far side).
    pub fn refresh_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        let report = node.refresh();
        for pin in &report.released {
            self.events.push_back(GraphEvent::PinRemoved { node: id, pin: *pin });
        }
        for pin in &report.acquired {
            self.events.push_back(GraphEvent::PinAdded { node: id, pin: *pin });
        }

        let stale: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(id) && !self.connection_is_valid(c))
            .map(|c| c.id)
            .collect();
        for connection_id in stale {
            if let Some(connection) = self.connections.shift_remove(&connection_id) {
                self.reset_input(connection.target_node, connection.target_pin);
                self.events.push_back(GraphEvent::Disconnected(connection_id));
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Drain the notifications queued by mutations since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = GraphEvent> + '_ {
        self.events.drain(..)
    }

    /// Run one evaluation pass using the script's own monotonic clock.
    pub fn evaluate(&mut self) {
        self.evaluate_at(self.started.elapsed());
    }

    /// Run one evaluation pass at an externally supplied timestamp.
    ///
    /// Drivers that own a frame clock pass it in here; feeding the same
    /// timestamps to the same graph replays identical outputs, which is also
    /// how the time-based nodes are tested.
    pub fn evaluate_at(&mut self, now: Duration) {
        if self.plan.is_none() {
            self.plan = Some(self.build_plan());
        }
        let delta = self
            .last_pass
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_pass = Some(now);

        let plan = self.plan.take().unwrap_or_default();
        for step in &plan {
            for connection in &step.inputs {
                let value = match self
                    .nodes
                    .get(&connection.source_node)
                    .and_then(|n| n.pins().pin(connection.source_pin))
                {
                    Some(pin) => pin.value().clone(),
                    None => continue,
                };
                if let Some(target) = self.nodes.get_mut(&connection.target_node) {
                    if let Some(pin) = target.pins_mut().pin_mut(connection.target_pin) {
                        pin.receive(value);
                    }
                }
            }
            if let Some(node) = self.nodes.get_mut(&step.node) {
                node.evaluate(EvalTime { now, delta }, &step.live_outputs);
            }
        }
        self.plan = Some(plan);
    }

    /// The exit node's captured value: its first input pin as of the last
    /// pass.
    pub fn exit_value(&self) -> Option<Value> {
        let exit = self.nodes.get(&self.exit_node)?;
        let pin = exit.pins().pins().find(|p| p.is_input())?;
        Some(pin.value().clone())
    }

    fn invalidate(&mut self) {
        self.plan = None;
    }

    fn reset_input(&mut self, node: NodeId, pin: PinId) {
        if let Some(owner) = self.nodes.get_mut(&node) {
            if let Some(pin) = owner.pins_mut().pin_mut(pin) {
                pin.reset();
            }
        }
    }

    fn connection_is_valid(&self, connection: &Connection) -> bool {
        let source = self
            .nodes
            .get(&connection.source_node)
            .and_then(|n| n.pins().pin(connection.source_pin));
        let target = self
            .nodes
            .get(&connection.target_node)
            .and_then(|n| n.pins().pin(connection.target_pin));
        match (source, target) {
            (Some(source), Some(target)) => {
                ValueType::are_compatible(source.value_type(), target.value_type())
            }
            _ => false,
        }
    }

    /// Whether `target` is reachable from `from` along existing connections.
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        if from == target {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            for connection in self.connections.values() {
                if connection.source_node != current {
                    continue;
                }
                if connection.target_node == target {
                    return true;
                }
                if visited.insert(connection.target_node) {
                    stack.push(connection.target_node);
                }
            }
        }
        false
    }

    /// Depth-first dependency ordering: every node appears after everything
    /// feeding its inputs. Nodes with no path between them fall back to
    /// insertion order, so the ordering is deterministic for a given graph
    /// shape. Acyclicity is guaranteed at connect time, so no cycle check is
    /// needed here.
    fn evaluation_order(&self) -> Vec<NodeId> {
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());
        for id in self.nodes.keys() {
            self.visit(*id, &mut visited, &mut order);
        }
        order
    }

    fn visit(&self, id: NodeId, visited: &mut HashSet<NodeId>, order: &mut Vec<NodeId>) {
        if !visited.insert(id) {
            return;
        }
        for connection in self.connections.values() {
            if connection.target_node == id {
                self.visit(connection.source_node, visited, order);
            }
        }
        order.push(id);
    }

    fn build_plan(&self) -> Vec<EvalStep> {
        self.evaluation_order()
            .into_iter()
            .map(|id| {
                let inputs = self
                    .connections
                    .values()
                    .filter(|c| c.target_node == id)
                    .copied()
                    .collect();
                let mut live_outputs = Vec::new();
                for connection in self.connections.values() {
                    if connection.source_node == id && !live_outputs.contains(&connection.source_pin)
                    {
                        live_outputs.push(connection.source_pin);
                    }
                }
                EvalStep {
                    node: id,
                    inputs,
                    live_outputs,
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for NodeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScript")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("exit_node", &self.exit_node)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalIo, NodeError};
    use crate::node::NodeBehavior;
    use crate::numeric::Numeric;
    use std::any::Any;

    struct Emit {
        output: PinId,
        value: Value,
    }

    impl NodeBehavior for Emit {
        fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
            io.write(self.output, self.value.clone())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct AddTwo {
        a: PinId,
        b: PinId,
        output: PinId,
    }

    impl NodeBehavior for AddTwo {
        fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
            let sum = io.numeric(self.a)? + io.numeric(self.b)?;
            io.write(self.output, Value::Numeric(sum))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct AlwaysFails;

    impl NodeBehavior for AlwaysFails {
        fn evaluate(&mut self, _io: &mut EvalIo<'_>) -> Result<(), NodeError> {
            Err(NodeError::failed("synthetic failure"))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn emit_node(value: Value) -> (Node, PinId) {
        let value_type = value.value_type();
        let mut node = Node::new("test_emit", "Emit", "");
        let output = node.add_output("Value", value_type);
        let node = node.with_behavior(Emit { output, value });
        (node, output)
    }

    fn add_node() -> (Node, PinId, PinId, PinId) {
        let mut node = Node::new("test_add", "Add", "");
        let a = node.add_input("A", ValueType::Numeric);
        let b = node.add_input("B", ValueType::Numeric);
        let output = node.add_output("Sum", ValueType::Numeric);
        let node = node.with_behavior(AddTwo { a, b, output });
        (node, a, b, output)
    }

    fn exit_node(value_type: ValueType) -> (Node, PinId) {
        let mut node = Node::new("test_exit", "Exit", "");
        let input = node.add_input("Value", value_type);
        let node = node.as_exit_node().as_default_node();
        (node, input)
    }

    fn numeric_script() -> (NodeScript, NodeId, PinId) {
        let (exit, exit_in) = exit_node(ValueType::Numeric);
        let exit_id = exit.id();
        let script = NodeScript::new("test", exit).unwrap();
        (script, exit_id, exit_in)
    }

    fn exit_numeric(script: &NodeScript) -> f64 {
        script
            .exit_value()
            .and_then(|v| v.as_numeric())
            .map(|n| n.to_f64())
            .unwrap()
    }

    #[test]
    fn test_chain_evaluates_in_dependency_order() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (two, two_out) = emit_node(Value::Integer(2));
        let (three, three_out) = emit_node(Value::Integer(3));
        let (adder, a, b, sum) = add_node();
        let two_id = script.add_node(two).unwrap();
        let three_id = script.add_node(three).unwrap();
        let adder_id = script.add_node(adder).unwrap();

        script.connect(two_id, two_out, adder_id, a).unwrap();
        script.connect(three_id, three_out, adder_id, b).unwrap();
        script.connect(adder_id, sum, exit_id, exit_in).unwrap();

        script.evaluate_at(Duration::ZERO);
        assert_eq!(exit_numeric(&script), 5.0);
    }

    #[test]
    fn test_repeated_passes_are_deterministic() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (source, source_out) = emit_node(Value::Double(1.25));
        let source_id = script.add_node(source).unwrap();
        script.connect(source_id, source_out, exit_id, exit_in).unwrap();

        let mut results = Vec::new();
        for frame in 0..5 {
            script.evaluate_at(Duration::from_millis(frame * 33));
            results.push(exit_numeric(&script));
        }
        assert!(results.iter().all(|&v| v == results[0]));
    }

    #[test]
    fn test_connect_rejects_incompatible_types() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (text, text_out) = emit_node(Value::Text("nope".into()));
        let text_id = script.add_node(text).unwrap();

        let result = script.connect(text_id, text_out, exit_id, exit_in);
        assert!(matches!(result, Err(GraphError::IncompatibleTypes { .. })));
        assert_eq!(script.connection_count(), 0);
    }

    #[test]
    fn test_connect_coerces_integer_into_numeric() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (source, source_out) = emit_node(Value::Integer(7));
        let source_id = script.add_node(source).unwrap();
        script.connect(source_id, source_out, exit_id, exit_in).unwrap();

        script.evaluate_at(Duration::ZERO);
        assert!((exit_numeric(&script) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_connect_rejects_cycles_and_keeps_prior_edges() {
        let (mut script, _, _) = numeric_script();
        let (first, _, first_b, first_sum) = add_node();
        let (second, second_a, _, second_sum) = add_node();
        let first_id = script.add_node(first).unwrap();
        let second_id = script.add_node(second).unwrap();

        script.connect(first_id, first_sum, second_id, second_a).unwrap();
        let result = script.connect(second_id, second_sum, first_id, first_b);
        assert!(matches!(result, Err(GraphError::WouldCreateCycle)));
        assert_eq!(script.connection_count(), 1);
    }

    #[test]
    fn test_connect_rejects_self_loop() {
        let (mut script, _, _) = numeric_script();
        let (adder, a, _, sum) = add_node();
        let adder_id = script.add_node(adder).unwrap();
        let result = script.connect(adder_id, sum, adder_id, a);
        assert!(matches!(result, Err(GraphError::SelfLoop)));
    }

    #[test]
    fn test_second_connect_replaces_first() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (first, first_out) = emit_node(Value::Integer(1));
        let (second, second_out) = emit_node(Value::Integer(2));
        let first_id = script.add_node(first).unwrap();
        let second_id = script.add_node(second).unwrap();

        let original = script.connect(first_id, first_out, exit_id, exit_in).unwrap();
        let replacement = script.connect(second_id, second_out, exit_id, exit_in).unwrap();

        assert_eq!(replacement.replaced.map(|c| c.id), Some(original.id));
        assert_eq!(script.connection_count(), 1);
        script.evaluate_at(Duration::ZERO);
        assert_eq!(exit_numeric(&script), 2.0);
    }

    #[test]
    fn test_default_and_exit_nodes_cannot_be_removed() {
        let (mut script, exit_id, _) = numeric_script();
        let (fixture, _) = emit_node(Value::Integer(0));
        let fixture = fixture.as_default_node();
        let fixture_id = script.add_node(fixture).unwrap();
        let count = script.node_count();

        assert!(matches!(
            script.remove_node(exit_id),
            Err(GraphError::ExitNodeRemoval(_))
        ));
        assert!(matches!(
            script.remove_node(fixture_id),
            Err(GraphError::DefaultNodeRemoval(_))
        ));
        assert_eq!(script.node_count(), count);
    }

    #[test]
    fn test_remove_node_takes_its_connections() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (source, source_out) = emit_node(Value::Integer(9));
        let source_id = script.add_node(source).unwrap();
        script.connect(source_id, source_out, exit_id, exit_in).unwrap();

        let removed = script.remove_node(source_id).unwrap();
        assert_eq!(removed.connections.len(), 1);
        assert_eq!(script.connection_count(), 0);
        // The orphaned exit input is back at its default
        script.evaluate_at(Duration::ZERO);
        assert_eq!(exit_numeric(&script), 0.0);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (source, source_out) = emit_node(Value::Integer(4));
        let source_id = script.add_node(source).unwrap();
        script.connect(source_id, source_out, exit_id, exit_in).unwrap();
        script.evaluate_at(Duration::ZERO);
        assert_eq!(exit_numeric(&script), 4.0);

        assert_eq!(script.disconnect_pin(exit_in).len(), 1);
        assert_eq!(exit_numeric(&script), 0.0);
        assert!(script.disconnect_pin(exit_in).is_empty());
        assert_eq!(exit_numeric(&script), 0.0);
    }

    #[test]
    fn test_faulting_node_does_not_abort_the_pass() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let mut broken = Node::new("test_broken", "Broken", "");
        broken.add_output("Value", ValueType::Numeric);
        let broken_id = script.add_node(broken.with_behavior(AlwaysFails)).unwrap();
        let (source, source_out) = emit_node(Value::Integer(5));
        let source_id = script.add_node(source).unwrap();
        script.connect(source_id, source_out, exit_id, exit_in).unwrap();

        script.evaluate_at(Duration::ZERO);
        assert_eq!(exit_numeric(&script), 5.0);
        assert!(script.node(broken_id).and_then(|n| n.fault()).is_some());
    }

    #[test]
    fn test_collection_pin_commands_enforce_min_arity() {
        let (mut script, _, _) = numeric_script();
        let mut node = Node::new("test_variadic", "Variadic", "");
        let collection =
            node.add_input_collection("Value", ValueType::Numeric, 2, Value::Integer(0));
        let node_id = script.add_node(node).unwrap();

        let added = script.add_collection_pin(node_id, collection).unwrap();
        assert!(script.remove_collection_pin(node_id, added).is_ok());

        let remaining: Vec<PinId> = script
            .node(node_id)
            .and_then(|n| n.pins().collection(collection))
            .map(|c| c.pins().iter().map(|p| p.id()).collect())
            .unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(matches!(
            script.remove_collection_pin(node_id, remaining[0]),
            Err(GraphError::CollectionAtMinimum { min: 2 })
        ));
    }

    #[test]
    fn test_mutations_queue_editor_events() {
        let (mut script, exit_id, exit_in) = numeric_script();
        let (source, source_out) = emit_node(Value::Integer(1));
        let source_id = script.add_node(source).unwrap();
        let connected = script.connect(source_id, source_out, exit_id, exit_in).unwrap();
        script.disconnect(connected.id);
        script.remove_node(source_id).unwrap();

        let events: Vec<GraphEvent> = script.drain_events().collect();
        assert_eq!(
            events,
            vec![
                GraphEvent::NodeAdded(source_id),
                GraphEvent::Connected(connected.id),
                GraphEvent::Disconnected(connected.id),
                GraphEvent::NodeRemoved(source_id),
            ]
        );
        assert_eq!(script.drain_events().count(), 0);
    }
}
