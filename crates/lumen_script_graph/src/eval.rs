// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluation and refresh contexts handed to node behaviors.

use crate::collection::{PinCollection, PinCollectionId};
use crate::node::PinStore;
use crate::numeric::Numeric;
use crate::pin::PinId;
use crate::value::{Value, ValueType};
use std::time::Duration;
use thiserror::Error;

/// Timestamps for one evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct EvalTime {
    /// Monotonic time of this pass, as supplied by the driver
    pub now: Duration,
    /// Time elapsed since the previous pass (zero on the first)
    pub delta: Duration,
}

/// Error raised by a node behavior during evaluation.
///
/// These are internal faults, not structural problems: the script catches
/// them per node, logs the node's identity and finishes the pass with the
/// node's last-written outputs.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The behavior addressed a pin its node does not have
    #[error("no pin {0} on this node")]
    PinNotFound(PinId),

    /// The behavior addressed a pin collection its node does not have
    #[error("no pin collection on this node")]
    CollectionNotFound,

    /// The behavior wrote to a pin that is not an output
    #[error("pin {0} is not an output pin")]
    NotAnOutput(PinId),

    /// A pin held a value the behavior cannot work with
    #[error("pin {pin} does not hold a {expected:?} value")]
    TypeMismatch {
        /// The offending pin
        pin: PinId,
        /// The type the behavior expected
        expected: ValueType,
    },

    /// The node's configuration blob failed to round-trip
    #[error("invalid node storage: {0}")]
    Storage(#[from] serde_json::Error),

    /// Any other internal failure
    #[error("{0}")]
    Failed(String),
}

impl NodeError {
    /// Create a free-form internal failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Pin access for one node during one evaluation pass.
///
/// Reads see input pin values already routed from their connected outputs
/// (or the pin's default when unconnected); writes land on the node's own
/// output pins, coerced to the pin's declared type.
pub struct EvalIo<'a> {
    pins: &'a mut PinStore,
    time: EvalTime,
    live_outputs: &'a [PinId],
}

impl<'a> EvalIo<'a> {
    pub(crate) fn new(pins: &'a mut PinStore, time: EvalTime, live_outputs: &'a [PinId]) -> Self {
        Self {
            pins,
            time,
            live_outputs,
        }
    }

    /// Monotonic time of this pass
    pub fn now(&self) -> Duration {
        self.time.now
    }

    /// Time elapsed since the previous pass (zero on the first)
    pub fn delta(&self) -> Duration {
        self.time.delta
    }

    /// Read a pin's current value
    pub fn value(&self, pin: PinId) -> Result<&Value, NodeError> {
        self.pins
            .pin(pin)
            .map(|p| p.value())
            .ok_or(NodeError::PinNotFound(pin))
    }

    /// Read a pin's current value as a [`Numeric`]
    pub fn numeric(&self, pin: PinId) -> Result<Numeric, NodeError> {
        self.value(pin)?
            .as_numeric()
            .ok_or(NodeError::TypeMismatch {
                pin,
                expected: ValueType::Numeric,
            })
    }

    /// Read a pin's current value as an RGBA color
    pub fn color(&self, pin: PinId) -> Result<[f32; 4], NodeError> {
        self.value(pin)?.as_color().ok_or(NodeError::TypeMismatch {
            pin,
            expected: ValueType::Color,
        })
    }

    /// Write a value to one of the node's output pins, coercing it to the
    /// pin's declared type.
    pub fn write(&mut self, pin: PinId, value: Value) -> Result<(), NodeError> {
        let target = self
            .pins
            .pin_mut(pin)
            .ok_or(NodeError::PinNotFound(pin))?;
        if !target.is_output() {
            return Err(NodeError::NotAnOutput(pin));
        }
        target.receive(value);
        Ok(())
    }

    /// Access a pin collection, e.g. to fold a variadic node's operands
    pub fn collection(&self, id: PinCollectionId) -> Result<&PinCollection, NodeError> {
        self.pins
            .collection(id)
            .ok_or(NodeError::CollectionNotFound)
    }

    /// Whether an output pin currently feeds at least one connection.
    /// Reflective nodes use this to skip coercion work for dead outputs.
    pub fn is_connected(&self, pin: PinId) -> bool {
        self.live_outputs.contains(&pin)
    }
}

/// Bucket access for one node during a dynamic-pin rebuild.
///
/// Release the direction being rebuilt, then acquire one pin per field of
/// the new shape; slots are reused in place so pin identity survives the
/// rebuild.
pub struct RefreshIo<'a> {
    pins: &'a mut PinStore,
    released: Vec<PinId>,
    acquired: Vec<PinId>,
}

impl<'a> RefreshIo<'a> {
    pub(crate) fn new(pins: &'a mut PinStore) -> Self {
        Self {
            pins,
            released: Vec::new(),
            acquired: Vec::new(),
        }
    }

    /// Detach every dynamically generated output pin
    pub fn release_outputs(&mut self) {
        self.released
            .extend(self.pins.output_bucket_mut().release_all());
    }

    /// Detach every dynamically generated input pin
    pub fn release_inputs(&mut self) {
        self.released
            .extend(self.pins.input_bucket_mut().release_all());
    }

    /// Acquire an output pin for a field of the new shape
    pub fn acquire_output(&mut self, value_type: ValueType, name: impl Into<String>) -> PinId {
        let id = self.pins.output_bucket_mut().acquire(value_type, name);
        self.acquired.push(id);
        id
    }

    /// Acquire an input pin for a field of the new shape
    pub fn acquire_input(&mut self, value_type: ValueType, name: impl Into<String>) -> PinId {
        let id = self.pins.input_bucket_mut().acquire(value_type, name);
        self.acquired.push(id);
        id
    }

    pub(crate) fn into_report(self) -> RefreshReport {
        RefreshReport {
            released: self.released,
            acquired: self.acquired,
        }
    }
}

/// The pins a dynamic rebuild detached and attached, in order.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Pins detached by the rebuild (slots stay allocated)
    pub released: Vec<PinId>,
    /// Pins attached by the rebuild (possibly reused slots)
    pub acquired: Vec<PinId>,
}
