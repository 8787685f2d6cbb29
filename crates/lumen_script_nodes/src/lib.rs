// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard node library for Lumen scripting.
//!
//! Provides the node set scripts are composed from:
//! - Static value sources and variadic math
//! - Numeric and color easing
//! - Color blending and gradient sampling
//! - Event-driven start nodes
//! - Exit nodes (single value and data binding)
//!
//! [`standard_registry`] assembles everything except the exit nodes into a
//! [`NodeRegistry`] for the editor's node picker; exit nodes are permanent
//! fixtures created together with their script, not picked by the user.

pub mod color;
pub mod easing;
pub mod event;
pub mod exit;
pub mod math;

pub use color::{
    color_blend_node, gradient_sample_node, BlendMode, ColorBlendBehavior, GradientSampleBehavior,
};
pub use easing::{
    color_easing_node, easing_node, ColorEasingBehavior, EasingBehavior, EasingFunction,
};
pub use event::{event_start_node, EventStartBehavior};
pub use exit::{
    data_binding_exit_node, value_exit_node, DataBindingExitBehavior, PropertyTarget,
    SharedProperty, ValueExitBehavior,
};
pub use math::{math_node, static_value_node, MathBehavior, MathOperation, StaticValueBehavior};

use lumen_script_graph::{EventSchema, NodeCategory, NodeRegistry, NodeTemplate, Value};

/// Build the registry of every user-addable node type.
pub fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Value sources
    registry.register(NodeTemplate {
        type_id: "static_numeric",
        name: "Numeric",
        description: "A constant numeric value",
        category: NodeCategory::Input,
        build: || static_value_node("static_numeric", "Numeric", "A constant numeric value", Value::Integer(0)),
    });
    registry.register(NodeTemplate {
        type_id: "static_color",
        name: "Color",
        description: "A constant color value",
        category: NodeCategory::Input,
        build: || {
            static_value_node(
                "static_color",
                "Color",
                "A constant color value",
                Value::Color([0.0, 0.0, 0.0, 1.0]),
            )
        },
    });
    registry.register(NodeTemplate {
        type_id: "static_text",
        name: "Text",
        description: "A constant text value",
        category: NodeCategory::Input,
        build: || static_value_node("static_text", "Text", "A constant text value", Value::Text(String::new())),
    });
    registry.register(NodeTemplate {
        type_id: "static_bool",
        name: "Boolean",
        description: "A constant boolean value",
        category: NodeCategory::Input,
        build: || static_value_node("static_bool", "Boolean", "A constant boolean value", Value::Bool(false)),
    });

    // Math
    registry.register(NodeTemplate {
        type_id: "math_sum",
        name: "Sum",
        description: "Outputs the sum of the values",
        category: NodeCategory::Math,
        build: || math_node(MathOperation::Sum),
    });
    registry.register(NodeTemplate {
        type_id: "math_subtract",
        name: "Subtract",
        description: "Outputs the first value minus the following values",
        category: NodeCategory::Math,
        build: || math_node(MathOperation::Subtract),
    });
    registry.register(NodeTemplate {
        type_id: "math_multiply",
        name: "Multiply",
        description: "Outputs the product of the values",
        category: NodeCategory::Math,
        build: || math_node(MathOperation::Multiply),
    });
    registry.register(NodeTemplate {
        type_id: "math_divide",
        name: "Divide",
        description: "Outputs the first value divided by the following values",
        category: NodeCategory::Math,
        build: || math_node(MathOperation::Divide),
    });
    registry.register(NodeTemplate {
        type_id: "math_min",
        name: "Min",
        description: "Outputs the smallest of the values",
        category: NodeCategory::Math,
        build: || math_node(MathOperation::Min),
    });
    registry.register(NodeTemplate {
        type_id: "math_max",
        name: "Max",
        description: "Outputs the largest of the values",
        category: NodeCategory::Math,
        build: || math_node(MathOperation::Max),
    });

    // Easing
    registry.register(NodeTemplate {
        type_id: "easing_numeric",
        name: "Numeric Easing",
        description: "Outputs the input value, easing towards it over the easing time",
        category: NodeCategory::Easing,
        build: easing_node,
    });
    registry.register(NodeTemplate {
        type_id: "easing_color",
        name: "Color Easing",
        description: "Outputs the input color, easing towards it over the easing time",
        category: NodeCategory::Easing,
        build: color_easing_node,
    });

    // Color
    registry.register(NodeTemplate {
        type_id: "color_blend",
        name: "Color Blend",
        description: "Blends two colors by the given amount",
        category: NodeCategory::Color,
        build: color_blend_node,
    });
    registry.register(NodeTemplate {
        type_id: "color_gradient",
        name: "Gradient",
        description: "Outputs the color of the gradient at the given position",
        category: NodeCategory::Color,
        build: gradient_sample_node,
    });

    // Events. Fresh instances start with an empty schema; the host assigns
    // the event source's schema and refreshes the node.
    registry.register(NodeTemplate {
        type_id: "event_start",
        name: "Event",
        description: "Outputs the latest values of an external event",
        category: NodeCategory::Event,
        build: || event_start_node(EventSchema::default()),
    });

    registry
}
