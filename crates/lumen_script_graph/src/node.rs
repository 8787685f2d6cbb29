// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions: the unit of computation in a script.

use crate::collection::{PinBucket, PinCollection, PinCollectionId};
use crate::eval::{EvalIo, EvalTime, NodeError, RefreshIo, RefreshReport};
use crate::pin::{Pin, PinDirection, PinId};
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything a node exposes for connection: fixed pins, pin collections and
/// the two slot buckets for dynamically generated pins.
#[derive(Debug)]
pub struct PinStore {
    pins: Vec<Pin>,
    collections: Vec<PinCollection>,
    input_bucket: PinBucket,
    output_bucket: PinBucket,
}

impl PinStore {
    fn new() -> Self {
        Self {
            pins: Vec::new(),
            collections: Vec::new(),
            input_bucket: PinBucket::new(PinDirection::Input),
            output_bucket: PinBucket::new(PinDirection::Output),
        }
    }

    /// Every currently visible pin: fixed pins in declaration order, then
    /// collection pins, then bucket pins.
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins
            .iter()
            .chain(self.collections.iter().flat_map(|c| c.pins().iter()))
            .chain(self.input_bucket.pins())
            .chain(self.output_bucket.pins())
    }

    /// Look up a visible pin by id
    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins
            .iter()
            .find(|p| p.id() == id)
            .or_else(|| self.collections.iter().find_map(|c| c.pin(id)))
            .or_else(|| self.input_bucket.pin(id))
            .or_else(|| self.output_bucket.pin(id))
    }

    pub(crate) fn pin_mut(&mut self, id: PinId) -> Option<&mut Pin> {
        if let Some(index) = self.pins.iter().position(|p| p.id() == id) {
            return self.pins.get_mut(index);
        }
        if let Some(pin) = self.collections.iter_mut().find_map(|c| c.pin_mut(id)) {
            return Some(pin);
        }
        if let Some(pin) = self.input_bucket.pin_mut(id) {
            return Some(pin);
        }
        self.output_bucket.pin_mut(id)
    }

    /// The node's pin collections
    pub fn collections(&self) -> &[PinCollection] {
        &self.collections
    }

    /// Look up a pin collection by id
    pub fn collection(&self, id: PinCollectionId) -> Option<&PinCollection> {
        self.collections.iter().find(|c| c.id() == id)
    }

    pub(crate) fn collection_mut(&mut self, id: PinCollectionId) -> Option<&mut PinCollection> {
        self.collections.iter_mut().find(|c| c.id() == id)
    }

    pub(crate) fn input_bucket_mut(&mut self) -> &mut PinBucket {
        &mut self.input_bucket
    }

    pub(crate) fn output_bucket_mut(&mut self) -> &mut PinBucket {
        &mut self.output_bucket
    }
}

/// The computation carried by a node.
///
/// A behavior reads its input pins and writes its output pins through the
/// [`EvalIo`] it is handed once per pass. It may keep private state between
/// passes (easing progress, trigger bookkeeping); that state is only ever
/// touched from `evaluate` and is not shared across threads.
///
/// `evaluate` must tolerate any combination of unconnected, default-valued
/// inputs. Returning an error is reserved for genuinely exceptional internal
/// state; the script logs it and keeps the pass going.
pub trait NodeBehavior: Any + Send {
    /// Compute this node's output pin values for the current pass.
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError>;

    /// Rebuild dynamically generated pins. Called off the evaluation cadence
    /// through [`crate::script::NodeScript::refresh_node`]; the default does
    /// nothing.
    fn refresh(&mut self, io: &mut RefreshIo<'_>) {
        let _ = io;
    }

    /// Serialize the node's configuration blob, if it has one.
    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(None)
    }

    /// Restore the node's configuration blob.
    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        let _ = raw;
        Ok(())
    }

    /// The behavior as [`Any`], for host downcasts
    fn as_any(&self) -> &dyn Any;

    /// The behavior as mutable [`Any`], for host downcasts
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Placeholder behavior for nodes that have not been given one; evaluates to
/// nothing.
struct Inert;

impl NodeBehavior for Inert {
    fn evaluate(&mut self, _io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node instance inside a script.
///
/// Nodes own their pins for the pins' whole lifetime. The script owns the
/// nodes and the connections between their pins.
pub struct Node {
    id: NodeId,
    type_id: String,
    name: String,
    description: String,
    position: [f32; 2],
    is_default: bool,
    is_exit: bool,
    fault: Option<String>,
    pins: PinStore,
    behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Create a new node with an inert behavior. Node constructors add pins
    /// and attach the real behavior through the builder methods.
    pub fn new(
        type_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            type_id: type_id.into(),
            name: name.into(),
            description: description.into(),
            position: [0.0, 0.0],
            is_default: false,
            is_exit: false,
            fault: None,
            pins: PinStore::new(),
            behavior: Box::new(Inert),
        }
    }

    /// Set the editor position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Attach the node's behavior
    pub fn with_behavior(mut self, behavior: impl NodeBehavior) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    /// Mark the node as a permanent fixture of its script; user-initiated
    /// removal is rejected.
    pub fn as_default_node(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Mark the node as its script's unique terminal.
    pub fn as_exit_node(mut self) -> Self {
        self.is_exit = true;
        self
    }

    /// Add a fixed input pin and return its id
    pub fn add_input(&mut self, name: impl Into<String>, value_type: ValueType) -> PinId {
        let pin = Pin::input(name, value_type);
        let id = pin.id();
        self.pins.pins.push(pin);
        id
    }

    /// Add a fixed input pin with a non-zero unconnected default
    pub fn add_input_with_default(
        &mut self,
        name: impl Into<String>,
        value_type: ValueType,
        default: Value,
    ) -> PinId {
        let pin = Pin::input(name, value_type).with_default(default);
        let id = pin.id();
        self.pins.pins.push(pin);
        id
    }

    /// Add a fixed output pin and return its id
    pub fn add_output(&mut self, name: impl Into<String>, value_type: ValueType) -> PinId {
        let pin = Pin::output(name, value_type);
        let id = pin.id();
        self.pins.pins.push(pin);
        id
    }

    /// Add an input pin collection and return its id
    pub fn add_input_collection(
        &mut self,
        label: impl Into<String>,
        value_type: ValueType,
        min_count: usize,
        default: Value,
    ) -> PinCollectionId {
        let collection =
            PinCollection::new(label, PinDirection::Input, value_type, min_count, default);
        let id = collection.id();
        self.pins.collections.push(collection);
        id
    }

    /// The node's stable identifier
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node type this instance was created from
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Editor position (not semantically relevant to evaluation)
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Move the node on the editor canvas
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = [x, y];
    }

    /// Whether the node is excluded from user-initiated removal
    pub fn is_default_node(&self) -> bool {
        self.is_default
    }

    /// Whether the node is its script's unique terminal
    pub fn is_exit_node(&self) -> bool {
        self.is_exit
    }

    /// The message of the node's last evaluation fault, if it is currently
    /// failing.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// The node's pins
    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    pub(crate) fn pins_mut(&mut self) -> &mut PinStore {
        &mut self.pins
    }

    /// Downcast the node's behavior to a concrete type
    pub fn behavior<T: NodeBehavior>(&self) -> Option<&T> {
        self.behavior.as_any().downcast_ref::<T>()
    }

    /// Downcast the node's behavior to a concrete mutable type
    pub fn behavior_mut<T: NodeBehavior>(&mut self) -> Option<&mut T> {
        self.behavior.as_any_mut().downcast_mut::<T>()
    }

    /// Serialize the node's configuration blob for persistence
    pub fn storage(&self) -> Result<Option<String>, NodeError> {
        self.behavior.serialize_storage()
    }

    /// Restore the node's configuration blob from persistence
    pub fn set_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.behavior.deserialize_storage(raw)
    }

    /// Run one evaluation of this node with fault containment: an erroring
    /// behavior is logged once per fault transition and the node keeps its
    /// last-written outputs until it recovers.
    pub(crate) fn evaluate(&mut self, time: EvalTime, live_outputs: &[PinId]) {
        let Self {
            behavior,
            pins,
            fault,
            id,
            name,
            ..
        } = self;
        let mut io = EvalIo::new(pins, time, live_outputs);
        match behavior.evaluate(&mut io) {
            Ok(()) => {
                if fault.take().is_some() {
                    debug!(node = %name, id = %id, "node recovered");
                }
            }
            Err(error) => {
                if fault.is_none() {
                    warn!(
                        node = %name,
                        id = %id,
                        %error,
                        "node evaluation failed, keeping last output"
                    );
                }
                *fault = Some(error.to_string());
            }
        }
    }

    /// Rebuild the node's dynamically generated pins through its behavior.
    /// Scripts call this via [`crate::script::NodeScript::refresh_node`],
    /// which also drops connections the rebuild invalidated; calling it on a
    /// detached node (during construction) is fine.
    pub fn refresh(&mut self) -> RefreshReport {
        let Self {
            behavior, pins, ..
        } = self;
        let mut io = RefreshIo::new(pins);
        behavior.refresh(&mut io);
        io.into_report()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .field("is_default", &self.is_default)
            .field("is_exit", &self.is_exit)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

/// Node type category, used by the editor's node picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Value sources (constants, event starts)
    Input,
    /// Terminals (exit nodes)
    Output,
    /// Math operations
    Math,
    /// Time-based interpolation
    Easing,
    /// Color operations
    Color,
    /// Event handling
    Event,
}

/// Static descriptor for an available node type.
#[derive(Clone)]
pub struct NodeTemplate {
    /// Unique type identifier
    pub type_id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Display description
    pub description: &'static str,
    /// Category for the node picker
    pub category: NodeCategory,
    /// Constructor producing a fresh instance
    pub build: fn() -> Node,
}

impl fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("type_id", &self.type_id)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Registry of the node types available to scripts.
///
/// The registry is built once at startup and shared read-only between every
/// script instance; it is the only state distinct scripts have in common.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    templates: IndexMap<&'static str, NodeTemplate>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates.insert(template.type_id, template);
    }

    /// Get a node type by id
    pub fn get(&self, type_id: &str) -> Option<&NodeTemplate> {
        self.templates.get(type_id)
    }

    /// All registered types, in registration order
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values()
    }

    /// Registered types in the given category
    pub fn templates_in_category(
        &self,
        category: NodeCategory,
    ) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values().filter(move |t| t.category == category)
    }

    /// Instantiate a node from a type id
    pub fn create(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(|t| (t.build)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_lookup_spans_fixed_and_collection_pins() {
        let mut node = Node::new("test", "Test", "");
        let fixed = node.add_output("Out", ValueType::Numeric);
        let collection = node.add_input_collection("Value", ValueType::Numeric, 2, Value::Integer(0));
        let collection_pin = node.pins().collection(collection).map(|c| c.pins()[0].id());

        assert!(node.pins().pin(fixed).is_some());
        assert!(collection_pin.and_then(|id| node.pins().pin(id)).is_some());
        assert_eq!(node.pins().pins().count(), 3);
    }

    #[test]
    fn test_registry_create() {
        fn build() -> Node {
            Node::new("test_constant", "Constant", "")
        }
        let mut registry = NodeRegistry::new();
        registry.register(NodeTemplate {
            type_id: "test_constant",
            name: "Constant",
            description: "",
            category: NodeCategory::Input,
            build,
        });
        let node = registry.create("test_constant");
        assert_eq!(node.map(|n| n.type_id().to_string()).as_deref(), Some("test_constant"));
        assert_eq!(registry.templates_in_category(NodeCategory::Math).count(), 0);
    }
}
