// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exit nodes: the terminals whose captured input values are a script's
//! externally visible result.

use lumen_script_graph::{
    EvalIo, Node, NodeBehavior, NodeError, PinId, Value, ValueType,
};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// An externally owned property an exit node can commit values onto.
pub trait PropertyTarget: Send {
    /// Display name, used for the bound input pin
    fn name(&self) -> &str;

    /// Declared type of the property
    fn value_type(&self) -> ValueType;

    /// Commit a value onto the property
    fn apply(&mut self, value: &Value);
}

/// Exit node with a single typed input.
///
/// Each pass captures the pending input value; the animation driver reads it
/// back through [`ValueExitBehavior::value`] after the pass.
pub struct ValueExitBehavior {
    input: PinId,
    captured: Value,
}

impl ValueExitBehavior {
    /// The value captured by the last pass
    pub fn value(&self) -> &Value {
        &self.captured
    }
}

impl NodeBehavior for ValueExitBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        self.captured = io.value(self.input)?.clone();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build the single-value exit node a script is constructed around.
pub fn value_exit_node(value_type: ValueType) -> Node {
    let mut node = Node::new("exit_value", "Exit", "The script's resulting value");
    let input = node.add_input("Value", value_type);
    node.with_behavior(ValueExitBehavior {
        input,
        captured: value_type.default_value(),
    })
    .as_exit_node()
    .as_default_node()
}

struct Binding {
    pin: PinId,
    captured: Value,
    target: Box<dyn PropertyTarget>,
}

/// Exit node with one input pin per externally bound property.
///
/// Each pass captures every pending input value; the consumer commits them
/// all at once with [`DataBindingExitBehavior::apply`]. Keeping capture and
/// commit separate lets several properties land atomically even though the
/// graph computed them one pin at a time.
pub struct DataBindingExitBehavior {
    bindings: Vec<Binding>,
}

impl DataBindingExitBehavior {
    /// The input pin bound to the property at `index`
    pub fn binding_pin(&self, index: usize) -> Option<PinId> {
        self.bindings.get(index).map(|b| b.pin)
    }

    /// The value captured for the property at `index` by the last pass
    pub fn captured(&self, index: usize) -> Option<&Value> {
        self.bindings.get(index).map(|b| &b.captured)
    }

    /// Commit every captured value onto its bound property.
    pub fn apply(&mut self) {
        for binding in &mut self.bindings {
            binding.target.apply(&binding.captured);
        }
    }
}

impl NodeBehavior for DataBindingExitBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        for binding in &mut self.bindings {
            binding.captured = io.value(binding.pin)?.clone();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a data-binding exit node with one input pin per bound property.
pub fn data_binding_exit_node(targets: Vec<Box<dyn PropertyTarget>>) -> Node {
    let mut node = Node::new(
        "exit_data_binding",
        "Exit",
        "Applies the script's resulting values to the bound properties",
    );
    let bindings = targets
        .into_iter()
        .map(|target| {
            let value_type = target.value_type();
            let pin = node.add_input(target.name().to_string(), value_type);
            Binding {
                pin,
                captured: value_type.default_value(),
                target,
            }
        })
        .collect();
    node.with_behavior(DataBindingExitBehavior { bindings })
        .as_exit_node()
        .as_default_node()
}

/// A [`PropertyTarget`] backed by a shared value slot.
///
/// The host hands the slot to whatever owns the real property and reads it
/// after each `apply`.
pub struct SharedProperty {
    name: String,
    value_type: ValueType,
    slot: Arc<Mutex<Value>>,
}

impl SharedProperty {
    /// Create a property slot holding the type's default value
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            slot: Arc::new(Mutex::new(value_type.default_value())),
        }
    }

    /// A handle to the shared slot
    pub fn slot(&self) -> Arc<Mutex<Value>> {
        Arc::clone(&self.slot)
    }
}

impl PropertyTarget for SharedProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn apply(&mut self, value: &Value) {
        *self.slot.lock() = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::static_value_node;
    use lumen_script_graph::NodeScript;
    use std::time::Duration;

    #[test]
    fn test_value_exit_captures_each_pass() {
        let mut script = NodeScript::new("exit", value_exit_node(ValueType::Numeric)).unwrap();
        let exit_id = script.exit_node_id();
        let exit_in = script
            .node(exit_id)
            .and_then(|n| n.pins().pins().find(|p| p.is_input()).map(|p| p.id()))
            .unwrap();
        let source = static_value_node("static_numeric", "Numeric", "", Value::Integer(11));
        let source_out = source.pins().pins().find(|p| p.is_output()).map(|p| p.id()).unwrap();
        let source_id = script.add_node(source).unwrap();
        script.connect(source_id, source_out, exit_id, exit_in).unwrap();

        script.evaluate_at(Duration::ZERO);
        let captured = script
            .node(exit_id)
            .and_then(|n| n.behavior::<ValueExitBehavior>())
            .map(|b| b.value().clone());
        assert_eq!(
            captured.and_then(|v| v.as_numeric()).map(|n| n.to_i32()),
            Some(11)
        );
    }

    #[test]
    fn test_data_binding_commits_only_on_apply() {
        let brightness = SharedProperty::new("Brightness", ValueType::Numeric);
        let color = SharedProperty::new("Color", ValueType::Color);
        let brightness_slot = brightness.slot();
        let color_slot = color.slot();

        let exit = data_binding_exit_node(vec![Box::new(brightness), Box::new(color)]);
        let mut script = NodeScript::new("bindings", exit).unwrap();
        let exit_id = script.exit_node_id();
        let pins: Vec<PinId> = script
            .node(exit_id)
            .map(|n| n.pins().pins().map(|p| p.id()).collect())
            .unwrap();

        let level = static_value_node("static_numeric", "Numeric", "", Value::Float(0.8));
        let level_out = level.pins().pins().find(|p| p.is_output()).map(|p| p.id()).unwrap();
        let level_id = script.add_node(level).unwrap();
        script.connect(level_id, level_out, exit_id, pins[0]).unwrap();

        let red = static_value_node("static_color", "Color", "", Value::Color([1.0, 0.0, 0.0, 1.0]));
        let red_out = red.pins().pins().find(|p| p.is_output()).map(|p| p.id()).unwrap();
        let red_id = script.add_node(red).unwrap();
        script.connect(red_id, red_out, exit_id, pins[1]).unwrap();

        script.evaluate_at(Duration::ZERO);
        // Computed but not yet committed
        assert_eq!(brightness_slot.lock().as_numeric().map(|n| n.to_f32()), Some(0.0));

        script
            .node_mut(exit_id)
            .and_then(|n| n.behavior_mut::<DataBindingExitBehavior>())
            .unwrap()
            .apply();
        assert_eq!(brightness_slot.lock().as_numeric().map(|n| n.to_f32()), Some(0.8));
        assert_eq!(color_slot.lock().as_color(), Some([1.0, 0.0, 0.0, 1.0]));
    }
}
