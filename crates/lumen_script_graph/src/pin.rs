// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions: the typed evaluation slots on a node.

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin, reads a value and may follow one connection to an output
    Input,
    /// Output pin, produces a value and may feed any number of inputs
    Output,
}

/// A named, typed evaluation slot on a node.
///
/// A pin keeps its identifier for its whole lifetime; the owning node creates
/// it and destroys it when the node leaves the script. Connections between
/// pins are owned by the script, not by the pins themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    id: PinId,
    name: String,
    direction: PinDirection,
    value_type: ValueType,
    default: Value,
    value: Value,
}

impl Pin {
    /// Create a new input pin
    pub fn input(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, PinDirection::Input, value_type)
    }

    /// Create a new output pin
    pub fn output(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, PinDirection::Output, value_type)
    }

    fn new(name: impl Into<String>, direction: PinDirection, value_type: ValueType) -> Self {
        let default = value_type.default_value();
        Self {
            id: PinId::new(),
            name: name.into(),
            direction,
            value_type,
            value: default.clone(),
            default,
        }
    }

    /// Set the value an unconnected pin reads as (e.g. a neutral element for
    /// variadic math inputs). The value is coerced to the pin's type.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = value.convert(self.value_type);
        self.value = self.default.clone();
        self
    }

    /// The pin's stable identifier
    pub fn id(&self) -> PinId {
        self.id
    }

    /// The pin's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pin's direction
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Whether this pin is an input
    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    /// Whether this pin is an output
    pub fn is_output(&self) -> bool {
        self.direction == PinDirection::Output
    }

    /// The pin's declared value type
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The pin's current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether an edge from this pin to `other` would be legal: opposite
    /// directions and compatible types. Used by editors to highlight valid
    /// drop targets while a cable is dragged.
    pub fn can_connect(&self, other: &Pin) -> bool {
        self.direction != other.direction
            && ValueType::are_compatible(self.value_type, other.value_type)
    }

    /// Store a value on this pin, coercing it to the declared type.
    pub(crate) fn receive(&mut self, value: Value) {
        self.value = value.convert(self.value_type);
    }

    /// Restore the pin to its unconnected default value.
    pub(crate) fn reset(&mut self) {
        self.value = self.default.clone();
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Change the pin's declared type, resetting value and default. Used by
    /// the bucket when a retained pin is reused for a new schema field.
    pub(crate) fn retype(&mut self, value_type: ValueType) {
        if self.value_type != value_type {
            self.value_type = value_type;
            self.default = value_type.default_value();
            self.value = self.default.clone();
        }
    }
}
