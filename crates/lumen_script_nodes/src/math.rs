// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variadic math nodes and static value sources.

use lumen_script_graph::{
    EvalIo, Node, NodeBehavior, NodeError, Numeric, PinCollectionId, PinId, Value, ValueType,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Fold applied by a variadic math node to its operand collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathOperation {
    /// Sum of all operands
    Sum,
    /// First operand minus every following operand
    Subtract,
    /// Product of all operands
    Multiply,
    /// First operand divided by every following operand
    Divide,
    /// Smallest operand
    Min,
    /// Largest operand
    Max,
}

impl MathOperation {
    /// The neutral value new operand pins read as while unconnected.
    ///
    /// Multiplicative operations default to 1 so an untouched pin does not
    /// zero the result (or divide by zero); everything else defaults to 0.
    pub fn neutral(self) -> Value {
        match self {
            Self::Multiply | Self::Divide => Value::Integer(1),
            Self::Sum | Self::Subtract | Self::Min | Self::Max => Value::Integer(0),
        }
    }

    fn apply(self, accumulator: Numeric, operand: Numeric) -> Result<Numeric, NodeError> {
        match self {
            Self::Sum => Ok(accumulator + operand),
            Self::Subtract => Ok(accumulator - operand),
            Self::Multiply => Ok(accumulator * operand),
            Self::Divide => accumulator
                .checked_div(operand)
                .ok_or_else(|| NodeError::failed("division by zero")),
            Self::Min => Ok(accumulator.min(operand)),
            Self::Max => Ok(accumulator.max(operand)),
        }
    }
}

/// Folds a numeric operand collection left to right into one output.
pub struct MathBehavior {
    operation: MathOperation,
    values: PinCollectionId,
    output: PinId,
}

impl NodeBehavior for MathBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        let collection = io.collection(self.values)?;
        let mut operands = collection.values().map(|v| v.as_numeric().unwrap_or_default());
        let mut accumulator = operands.next().unwrap_or_default();
        for operand in operands {
            accumulator = self.operation.apply(accumulator, operand)?;
        }
        io.write(self.output, Value::Numeric(accumulator))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a variadic math node for the given operation.
pub fn math_node(operation: MathOperation) -> Node {
    let (type_id, name, description) = match operation {
        MathOperation::Sum => ("math_sum", "Sum", "Outputs the sum of the values"),
        MathOperation::Subtract => (
            "math_subtract",
            "Subtract",
            "Outputs the first value minus the following values",
        ),
        MathOperation::Multiply => (
            "math_multiply",
            "Multiply",
            "Outputs the product of the values",
        ),
        MathOperation::Divide => (
            "math_divide",
            "Divide",
            "Outputs the first value divided by the following values",
        ),
        MathOperation::Min => ("math_min", "Min", "Outputs the smallest of the values"),
        MathOperation::Max => ("math_max", "Max", "Outputs the largest of the values"),
    };
    let mut node = Node::new(type_id, name, description);
    let values = node.add_input_collection("Value", ValueType::Numeric, 2, operation.neutral());
    let output = node.add_output("Result", ValueType::Numeric);
    node.with_behavior(MathBehavior {
        operation,
        values,
        output,
    })
}

/// Writes a stored constant to its output every pass. The host reconfigures
/// the constant through [`StaticValueBehavior::set_value`] or the storage
/// blob.
pub struct StaticValueBehavior {
    output: PinId,
    value: Value,
}

impl StaticValueBehavior {
    /// The stored constant
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the stored constant. It is coerced to the output pin's type
    /// when written.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

impl NodeBehavior for StaticValueBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        io.write(self.output, self.value.clone())
    }

    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(Some(serde_json::to_string(&self.value)?))
    }

    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.value = serde_json::from_str(raw)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a static value node of the given value's type.
pub fn static_value_node(
    type_id: &'static str,
    name: &'static str,
    description: &'static str,
    value: Value,
) -> Node {
    let mut node = Node::new(type_id, name, description);
    let output = node.add_output("Value", value.value_type());
    node.with_behavior(StaticValueBehavior { output, value })
}
