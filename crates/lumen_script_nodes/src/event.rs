// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event-driven start nodes: reflect an external event's latest arguments
//! onto output pins.

use lumen_script_graph::{
    EvalIo, EventArguments, EventSchema, Node, NodeBehavior, NodeError, Numeric, PinId, RefreshIo,
    Value, ValueType,
};
use std::any::Any;
use std::time::Duration;
use tracing::debug;

/// Start node fed by an external event.
///
/// The host owns the event subscription and pushes each occurrence into the
/// node through [`EventStartBehavior::update_event_arguments`]; the next
/// pass reflects it. One output pin is generated per schema field, through
/// the node's pin bucket, so replacing the schema and restoring it hands
/// back pins with their original identity. Field values are only written to
/// outputs that currently feed a connection.
pub struct EventStartBehavior {
    schema: EventSchema,
    field_pins: Vec<PinId>,
    time_since: PinId,
    trigger_count_pin: PinId,
    latest: Option<EventArguments>,
    trigger_count: u64,
    pending_trigger: bool,
    last_trigger: Option<Duration>,
}

impl EventStartBehavior {
    /// The schema the output pins currently reflect
    pub fn schema(&self) -> &EventSchema {
        &self.schema
    }

    /// Replace the event-argument schema. The pins are rebuilt on the next
    /// [`lumen_script_graph::NodeScript::refresh_node`]; stored arguments
    /// from the old shape are dropped.
    pub fn set_schema(&mut self, schema: EventSchema) {
        debug!(event = %schema.name(), fields = schema.fields().len(), "event schema replaced");
        self.schema = schema;
        self.latest = None;
    }

    /// Store the latest event occurrence, to be reflected on the next pass.
    pub fn update_event_arguments(&mut self, arguments: EventArguments) {
        self.latest = Some(arguments);
        self.trigger_count += 1;
        self.pending_trigger = true;
    }

    /// How often the event has fired since the node was created
    pub fn trigger_count(&self) -> u64 {
        self.trigger_count
    }

    /// The output pin generated for the schema field at `index`
    pub fn field_pin(&self, index: usize) -> Option<PinId> {
        self.field_pins.get(index).copied()
    }
}

impl NodeBehavior for EventStartBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        if self.pending_trigger {
            self.last_trigger = Some(io.now());
            self.pending_trigger = false;
        }
        let since_ms = self
            .last_trigger
            .map_or(0.0, |at| io.now().saturating_sub(at).as_secs_f64() * 1000.0);
        io.write(self.time_since, Value::Numeric(Numeric::from(since_ms)))?;
        io.write(
            self.trigger_count_pin,
            Value::Numeric(Numeric::from(self.trigger_count as f64)),
        )?;

        if let Some(arguments) = &self.latest {
            for (index, pin) in self.field_pins.iter().enumerate() {
                if !io.is_connected(*pin) {
                    continue;
                }
                if let Some(value) = arguments.get(index) {
                    io.write(*pin, value.clone())?;
                }
            }
        }
        Ok(())
    }

    fn refresh(&mut self, io: &mut RefreshIo<'_>) {
        io.release_outputs();
        self.field_pins = self
            .schema
            .fields()
            .iter()
            .map(|field| io.acquire_output(field.value_type, field.name.clone()))
            .collect();
    }

    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(Some(serde_json::to_string(&self.schema)?))
    }

    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.set_schema(serde_json::from_str(raw)?);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build an event start node for the given argument schema.
pub fn event_start_node(schema: EventSchema) -> Node {
    let mut node = Node::new(
        "event_start",
        "Event",
        "Outputs the latest values of an external event",
    );
    let time_since = node.add_output("Time since trigger", ValueType::Numeric);
    let trigger_count_pin = node.add_output("Trigger count", ValueType::Numeric);
    let mut node = node.with_behavior(EventStartBehavior {
        schema,
        field_pins: Vec::new(),
        time_since,
        trigger_count_pin,
        latest: None,
        trigger_count: 0,
        pending_trigger: false,
        last_trigger: None,
    });
    node.refresh();
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::value_exit_node;
    use lumen_script_graph::{NodeId, NodeScript};

    fn key_press_schema() -> EventSchema {
        EventSchema::new("Key press")
            .field("Key code", ValueType::Integer)
            .field("Pressure", ValueType::Float)
    }

    fn field_pins(script: &NodeScript, node: NodeId) -> Vec<PinId> {
        let behavior = script
            .node(node)
            .and_then(|n| n.behavior::<EventStartBehavior>())
            .unwrap();
        (0..behavior.schema().fields().len())
            .map(|i| behavior.field_pin(i).unwrap())
            .collect()
    }

    #[test]
    fn test_arguments_reach_connected_pins_on_the_next_pass() {
        let mut script = NodeScript::new("event", value_exit_node(ValueType::Numeric)).unwrap();
        let exit_id = script.exit_node_id();
        let exit_in = script
            .node(exit_id)
            .and_then(|n| n.pins().pins().find(|p| p.is_input()).map(|p| p.id()))
            .unwrap();
        let start_id = script.add_node(event_start_node(key_press_schema())).unwrap();
        let key_code = field_pins(&script, start_id)[0];
        script.connect(start_id, key_code, exit_id, exit_in).unwrap();

        script.evaluate_at(Duration::ZERO);
        assert_eq!(
            script.exit_value().and_then(|v| v.as_numeric()).map(|n| n.to_i32()),
            Some(0)
        );

        script
            .node_mut(start_id)
            .and_then(|n| n.behavior_mut::<EventStartBehavior>())
            .unwrap()
            .update_event_arguments(EventArguments::new(vec![
                Value::Integer(32),
                Value::Float(0.75),
            ]));
        script.evaluate_at(Duration::from_millis(16));
        assert_eq!(
            script.exit_value().and_then(|v| v.as_numeric()).map(|n| n.to_i32()),
            Some(32)
        );
    }

    #[test]
    fn test_unconnected_fields_are_skipped() {
        let mut script = NodeScript::new("event", value_exit_node(ValueType::Numeric)).unwrap();
        let start_id = script.add_node(event_start_node(key_press_schema())).unwrap();
        let pins = field_pins(&script, start_id);

        script
            .node_mut(start_id)
            .and_then(|n| n.behavior_mut::<EventStartBehavior>())
            .unwrap()
            .update_event_arguments(EventArguments::new(vec![
                Value::Integer(64),
                Value::Float(1.0),
            ]));
        script.evaluate_at(Duration::ZERO);

        // Nothing feeds downstream, so the field pins keep their defaults
        let pressure = script
            .node(start_id)
            .and_then(|n| n.pins().pin(pins[1]))
            .map(|p| p.value().clone())
            .unwrap();
        assert_eq!(pressure.as_numeric().map(|n| n.to_f32()), Some(0.0));
    }

    #[test]
    fn test_trigger_bookkeeping() {
        let mut script = NodeScript::new("event", value_exit_node(ValueType::Numeric)).unwrap();
        let start_id = script.add_node(event_start_node(key_press_schema())).unwrap();

        script
            .node_mut(start_id)
            .and_then(|n| n.behavior_mut::<EventStartBehavior>())
            .unwrap()
            .update_event_arguments(EventArguments::new(vec![
                Value::Integer(1),
                Value::Float(0.0),
            ]));
        script.evaluate_at(Duration::from_millis(100));
        script.evaluate_at(Duration::from_millis(350));

        let node = script.node(start_id).unwrap();
        let count_pin = node.pins().pins().find(|p| p.name() == "Trigger count").unwrap();
        let since_pin = node
            .pins()
            .pins()
            .find(|p| p.name() == "Time since trigger")
            .unwrap();
        assert_eq!(count_pin.value().as_numeric().map(|n| n.to_i32()), Some(1));
        assert_eq!(since_pin.value().as_numeric().map(|n| n.to_i32()), Some(250));
    }

    #[test]
    fn test_schema_round_trip_restores_pin_identity() {
        let mut script = NodeScript::new("event", value_exit_node(ValueType::Numeric)).unwrap();
        let start_id = script.add_node(event_start_node(key_press_schema())).unwrap();
        let original = field_pins(&script, start_id);

        let replace = |script: &mut NodeScript, schema: EventSchema| {
            script
                .node_mut(start_id)
                .and_then(|n| n.behavior_mut::<EventStartBehavior>())
                .unwrap()
                .set_schema(schema);
            script.refresh_node(start_id).unwrap();
        };

        replace(
            &mut script,
            EventSchema::new("Layer visibility").field("Visible", ValueType::Bool),
        );
        let replaced = field_pins(&script, start_id);
        assert_eq!(replaced[0], original[0]);
        assert_eq!(replaced.len(), 1);

        replace(&mut script, key_press_schema());
        assert_eq!(field_pins(&script, start_id), original);
    }

    #[test]
    fn test_schema_change_drops_incompatible_connections() {
        let mut script = NodeScript::new("event", value_exit_node(ValueType::Numeric)).unwrap();
        let exit_id = script.exit_node_id();
        let exit_in = script
            .node(exit_id)
            .and_then(|n| n.pins().pins().find(|p| p.is_input()).map(|p| p.id()))
            .unwrap();
        let start_id = script.add_node(event_start_node(key_press_schema())).unwrap();
        let key_code = field_pins(&script, start_id)[0];
        script.connect(start_id, key_code, exit_id, exit_in).unwrap();

        script
            .node_mut(start_id)
            .and_then(|n| n.behavior_mut::<EventStartBehavior>())
            .unwrap()
            .set_schema(EventSchema::new("Layer visibility").field("Visible", ValueType::Bool));
        script.refresh_node(start_id).unwrap();

        // The reused slot is now Bool; its cable into a Numeric input is gone
        assert_eq!(script.connection_count(), 0);
    }
}
