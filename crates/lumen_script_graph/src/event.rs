// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event-argument shapes for event-driven start nodes.
//!
//! An external event's arguments are described by a statically declared
//! field list rather than discovered through runtime reflection; the host
//! registers the schema once and pushes concrete argument values whenever
//! the event fires.

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

/// One readable field of an event-argument shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventField {
    /// Display name of the field
    pub name: String,
    /// Declared type of the field
    pub value_type: ValueType,
}

/// The declared shape of an external event's arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSchema {
    name: String,
    fields: Vec<EventField>,
}

impl EventSchema {
    /// Create an empty schema with a display name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field to the schema
    pub fn field(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.fields.push(EventField {
            name: name.into(),
            value_type,
        });
        self
    }

    /// The schema's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared fields, in declaration order
    pub fn fields(&self) -> &[EventField] {
        &self.fields
    }
}

/// The field values of one event occurrence, parallel to the schema's field
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventArguments {
    values: Vec<Value>,
}

impl EventArguments {
    /// Create arguments from field values in schema order
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// The field values in schema order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The value of the field at `index`, if present
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}
