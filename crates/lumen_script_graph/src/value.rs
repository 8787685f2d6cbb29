// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value model: the closed set of types that can flow through pins, and the
//! coercion rules between the numeric members of that set.

use crate::numeric::Numeric;
use serde::{Deserialize, Serialize};

/// Data type a pin is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean value
    Bool,
    /// 32-bit signed integer
    Integer,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Unified numeric, accepts any of the numeric types above
    Numeric,
    /// Color (RGBA, linear 0..1 channels)
    Color,
    /// Color gradient
    Gradient,
    /// Text value
    Text,
}

impl ValueType {
    /// Whether this type is a member of the numeric-coercible set.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::Double | Self::Numeric
        )
    }

    /// Whether a connection between pins of these two types is legal.
    ///
    /// Identical types always connect; distinct types connect only when both
    /// are numeric-coercible.
    pub fn are_compatible(a: ValueType, b: ValueType) -> bool {
        a == b || (a.is_numeric() && b.is_numeric())
    }

    /// The default value an unconnected pin of this type reads as.
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Integer => Value::Integer(0),
            Self::Float => Value::Float(0.0),
            Self::Double => Value::Double(0.0),
            Self::Numeric => Value::Numeric(Numeric::default()),
            Self::Color => Value::Color([0.0, 0.0, 0.0, 0.0]),
            Self::Gradient => Value::Gradient(ColorGradient::default()),
            Self::Text => Value::Text(String::new()),
        }
    }
}

/// A value held by a pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    Integer(i32),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Unified numeric
    Numeric(Numeric),
    /// Color (RGBA)
    Color([f32; 4]),
    /// Color gradient
    Gradient(ColorGradient),
    /// Text
    Text(String),
}

impl Value {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Float,
            Self::Double(_) => ValueType::Double,
            Self::Numeric(_) => ValueType::Numeric,
            Self::Color(_) => ValueType::Color,
            Self::Gradient(_) => ValueType::Gradient,
            Self::Text(_) => ValueType::Text,
        }
    }

    /// Convert this value to the target type.
    ///
    /// Converting to the value's own type is the identity. Conversions inside
    /// the numeric set route through [`Numeric`], so integer -> double ->
    /// integer round-trips losslessly across the range layer properties use.
    /// Converting to an incompatible type indicates a mis-constructed pin: it
    /// asserts in debug builds and yields the target's default in release.
    pub fn convert(&self, target: ValueType) -> Value {
        let source = self.value_type();
        if source == target {
            return self.clone();
        }
        if let Some(n) = self.as_numeric() {
            match target {
                ValueType::Integer => return Value::Integer(n.to_i32()),
                ValueType::Float => return Value::Float(n.to_f32()),
                ValueType::Double => return Value::Double(n.to_f64()),
                ValueType::Numeric => return Value::Numeric(n),
                _ => {}
            }
        }
        debug_assert!(
            false,
            "conversion between incompatible value types: {source:?} -> {target:?}"
        );
        target.default_value()
    }

    /// The value as a [`Numeric`], if it is one of the numeric variants.
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Self::Integer(v) => Some(Numeric::from(*v)),
            Self::Float(v) => Some(Numeric::from(*v)),
            Self::Double(v) => Some(Numeric::from(*v)),
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an RGBA color, if it is one.
    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Self::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a gradient, if it is one.
    pub fn as_gradient(&self) -> Option<&ColorGradient> {
        match self {
            Self::Gradient(v) => Some(v),
            _ => None,
        }
    }

    /// The value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A color stop inside a [`ColorGradient`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position of the stop along the gradient, 0..1
    pub position: f32,
    /// Color at this stop (RGBA)
    pub color: [f32; 4],
}

/// An ordered sequence of color stops sampled by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorGradient {
    stops: Vec<GradientStop>,
}

impl ColorGradient {
    /// Create a gradient from a list of stops. Stops are kept sorted by
    /// position.
    pub fn new(mut stops: Vec<GradientStop>) -> Self {
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { stops }
    }

    /// The stops of this gradient in position order.
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Sample the gradient at the given position, clamped to 0..1.
    ///
    /// An empty gradient samples as transparent black.
    pub fn sample(&self, position: f32) -> [f32; 4] {
        let position = position.clamp(0.0, 1.0);
        let Some(first) = self.stops.first() else {
            return [0.0, 0.0, 0.0, 0.0];
        };
        if position <= first.position {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if position <= b.position {
                let span = b.position - a.position;
                if span <= f32::EPSILON {
                    return b.color;
                }
                let t = (position - a.position) / span;
                return lerp_color(a.color, b.color, t);
            }
        }
        // Past the last stop
        self.stops[self.stops.len() - 1].color
    }
}

/// Linear interpolation between two RGBA colors, channel by channel.
pub fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        assert!(ValueType::are_compatible(ValueType::Double, ValueType::Double));
        assert!(ValueType::are_compatible(ValueType::Integer, ValueType::Numeric));
        assert!(ValueType::are_compatible(ValueType::Float, ValueType::Double));
        assert!(!ValueType::are_compatible(ValueType::Double, ValueType::Text));
        assert!(!ValueType::are_compatible(ValueType::Color, ValueType::Gradient));
    }

    #[test]
    fn test_convert_identity() {
        let value = Value::Text("breathing".into());
        assert_eq!(value.convert(ValueType::Text), value);
    }

    #[test]
    fn test_convert_integer_double_round_trip() {
        for source in [-4_200_000, -1, 0, 7, 1_000_000] {
            let double = Value::Integer(source).convert(ValueType::Double);
            assert_eq!(double.convert(ValueType::Integer), Value::Integer(source));
        }
    }

    #[test]
    fn test_convert_numeric_unification() {
        let n = Value::Double(2.75).convert(ValueType::Numeric);
        assert_eq!(n, Value::Numeric(Numeric::new(2.75)));
        assert_eq!(n.convert(ValueType::Integer), Value::Integer(3));
    }

    #[test]
    fn test_gradient_sample() {
        let gradient = ColorGradient::new(vec![
            GradientStop { position: 1.0, color: [1.0, 1.0, 1.0, 1.0] },
            GradientStop { position: 0.0, color: [0.0, 0.0, 0.0, 1.0] },
        ]);
        assert_eq!(gradient.sample(0.0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(gradient.sample(2.0), [1.0, 1.0, 1.0, 1.0]);
        let mid = gradient.sample(0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_empty() {
        assert_eq!(ColorGradient::default().sample(0.5), [0.0, 0.0, 0.0, 0.0]);
    }
}
