// SPDX-License-Identifier: MIT OR Apache-2.0
//! Color blending and gradient sampling nodes.

use lumen_script_graph::{
    lerp_color, ColorGradient, EvalIo, Node, NodeBehavior, NodeError, PinId, Value, ValueType,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// How two colors are combined before the blend amount is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    /// Plain crossfade towards the second color
    #[default]
    Mix,
    /// Channel-wise sum, clamped
    Add,
    /// Channel-wise product
    Multiply,
    /// Inverted product of the inversions
    Screen,
    /// Channel-wise absolute difference
    Difference,
}

impl BlendMode {
    fn combine(self, a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
        let mut result = [0.0; 4];
        for channel in 0..4 {
            let (x, y) = (a[channel], b[channel]);
            result[channel] = match self {
                Self::Mix => y,
                Self::Add => (x + y).min(1.0),
                Self::Multiply => x * y,
                Self::Screen => 1.0 - (1.0 - x) * (1.0 - y),
                Self::Difference => (x - y).abs(),
            };
        }
        result
    }
}

/// Blends two colors by an amount, through a configurable blend mode.
pub struct ColorBlendBehavior {
    a: PinId,
    b: PinId,
    amount: PinId,
    output: PinId,
    mode: BlendMode,
}

impl ColorBlendBehavior {
    /// The configured blend mode
    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    /// Select the blend mode for subsequent passes
    pub fn set_mode(&mut self, mode: BlendMode) {
        self.mode = mode;
    }
}

impl NodeBehavior for ColorBlendBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        let a = io.color(self.a)?;
        let b = io.color(self.b)?;
        let amount = io.numeric(self.amount)?.to_f32().clamp(0.0, 1.0);
        let blended = lerp_color(a, self.mode.combine(a, b), amount);
        io.write(self.output, Value::Color(blended))
    }

    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(Some(serde_json::to_string(&self.mode)?))
    }

    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.mode = serde_json::from_str(raw)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a "Color Blend" node
pub fn color_blend_node() -> Node {
    let mut node = Node::new(
        "color_blend",
        "Color Blend",
        "Blends two colors by the given amount",
    );
    let a = node.add_input("A", ValueType::Color);
    let b = node.add_input("B", ValueType::Color);
    let amount = node.add_input_with_default("Amount", ValueType::Numeric, Value::Float(1.0));
    let output = node.add_output("Color", ValueType::Color);
    node.with_behavior(ColorBlendBehavior {
        a,
        b,
        amount,
        output,
        mode: BlendMode::default(),
    })
}

/// Samples a configured gradient at the input position.
pub struct GradientSampleBehavior {
    position: PinId,
    output: PinId,
    gradient: ColorGradient,
}

impl GradientSampleBehavior {
    /// The configured gradient
    pub fn gradient(&self) -> &ColorGradient {
        &self.gradient
    }

    /// Replace the configured gradient
    pub fn set_gradient(&mut self, gradient: ColorGradient) {
        self.gradient = gradient;
    }
}

impl NodeBehavior for GradientSampleBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        let position = io.numeric(self.position)?.to_f32();
        io.write(self.output, Value::Color(self.gradient.sample(position)))
    }

    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(Some(serde_json::to_string(&self.gradient)?))
    }

    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.gradient = serde_json::from_str(raw)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a "Gradient" node
pub fn gradient_sample_node() -> Node {
    let mut node = Node::new(
        "color_gradient",
        "Gradient",
        "Outputs the color of the gradient at the given position",
    );
    let position = node.add_input("Position", ValueType::Numeric);
    let output = node.add_output("Color", ValueType::Color);
    node.with_behavior(GradientSampleBehavior {
        position,
        output,
        gradient: ColorGradient::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::value_exit_node;
    use crate::math::static_value_node;
    use lumen_script_graph::{GradientStop, NodeScript};
    use std::time::Duration;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    #[test]
    fn test_blend_modes() {
        let a = [0.5, 0.5, 0.5, 1.0];
        let b = [0.75, 0.5, 0.0, 1.0];
        assert_eq!(BlendMode::Mix.combine(a, b), b);
        assert_eq!(BlendMode::Add.combine(a, b), [1.0, 1.0, 0.5, 1.0]);
        assert_eq!(BlendMode::Multiply.combine(a, b), [0.375, 0.25, 0.0, 1.0]);
        let screen = BlendMode::Screen.combine(a, b);
        assert!((screen[0] - 0.875).abs() < 1e-6);
        assert_eq!(BlendMode::Difference.combine(a, b), [0.25, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_blend_node_crossfades_by_amount() {
        let mut script = NodeScript::new("color", value_exit_node(ValueType::Color)).unwrap();
        let exit_id = script.exit_node_id();
        let exit_in = script
            .node(exit_id)
            .and_then(|n| n.pins().pins().find(|p| p.is_input()).map(|p| p.id()))
            .unwrap();

        let blend = color_blend_node();
        let pins: Vec<PinId> = blend.pins().pins().map(|p| p.id()).collect();
        let (a_in, b_in, amount_in, out) = (pins[0], pins[1], pins[2], pins[3]);
        let blend_id = script.add_node(blend).unwrap();

        for (value, pin) in [(RED, a_in), (BLUE, b_in)] {
            let source = static_value_node("static_color", "Color", "", Value::Color(value));
            let source_out = source.pins().pins().find(|p| p.is_output()).map(|p| p.id()).unwrap();
            let source_id = script.add_node(source).unwrap();
            script.connect(source_id, source_out, blend_id, pin).unwrap();
        }
        let half = static_value_node("static_numeric", "Numeric", "", Value::Float(0.5));
        let half_out = half.pins().pins().find(|p| p.is_output()).map(|p| p.id()).unwrap();
        let half_id = script.add_node(half).unwrap();
        script.connect(half_id, half_out, blend_id, amount_in).unwrap();
        script.connect(blend_id, out, exit_id, exit_in).unwrap();

        script.evaluate_at(Duration::ZERO);
        let color = script.exit_value().and_then(|v| v.as_color()).unwrap();
        assert!((color[0] - 0.5).abs() < 1e-6);
        assert!((color[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_node_samples_configured_gradient() {
        let mut node = gradient_sample_node();
        node.behavior_mut::<GradientSampleBehavior>()
            .unwrap()
            .set_gradient(ColorGradient::new(vec![
                GradientStop { position: 0.0, color: RED },
                GradientStop { position: 1.0, color: BLUE },
            ]));
        let raw = node.storage().unwrap().unwrap();

        // The gradient travels through storage intact
        let mut restored = gradient_sample_node();
        restored.set_storage(&raw).unwrap();
        let sampled = restored
            .behavior::<GradientSampleBehavior>()
            .map(|b| b.gradient().sample(0.5))
            .unwrap();
        assert!((sampled[0] - 0.5).abs() < 1e-6);
        assert!((sampled[2] - 0.5).abs() < 1e-6);
    }
}
