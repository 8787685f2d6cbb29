// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing functions and the nodes that ramp value changes over time.

use lumen_script_graph::{
    lerp_color, EvalIo, Node, NodeBehavior, NodeError, Numeric, PinId, Value, ValueType,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::f64::consts::{FRAC_PI_2, PI};

/// Easing curves, Robert Penner style. Every function maps 0 to 0 and 1
/// to 1; what happens in between is the character of the curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EasingFunction {
    /// Snaps to the target once progress completes
    Step,
    /// Straight line
    #[default]
    Linear,
    /// Modeled after the parabola y = x^2
    QuadraticEaseIn,
    /// Modeled after the parabola y = -x^2 + 2x
    QuadraticEaseOut,
    /// Piecewise quadratic, accelerating then decelerating
    QuadraticEaseInOut,
    /// Modeled after the cubic y = x^3
    CubicEaseIn,
    /// Modeled after the cubic y = (x - 1)^3 + 1
    CubicEaseOut,
    /// Piecewise cubic
    CubicEaseInOut,
    /// Modeled after the quartic y = x^4
    QuarticEaseIn,
    /// Modeled after the inverted quartic
    QuarticEaseOut,
    /// Piecewise quartic
    QuarticEaseInOut,
    /// Modeled after the quintic y = x^5
    QuinticEaseIn,
    /// Modeled after the inverted quintic
    QuinticEaseOut,
    /// Piecewise quintic
    QuinticEaseInOut,
    /// Quarter-cycle sine
    SineEaseIn,
    /// Quarter-cycle sine
    SineEaseOut,
    /// Half-cycle sine
    SineEaseInOut,
    /// Shifted quadrant of the unit circle
    CircularEaseIn,
    /// Shifted quadrant of the unit circle
    CircularEaseOut,
    /// Piecewise circular
    CircularEaseInOut,
    /// Exponential, accelerating from zero
    ExponentialEaseIn,
    /// Exponential, decelerating to one
    ExponentialEaseOut,
    /// Piecewise exponential
    ExponentialEaseInOut,
    /// Damped sine wave, accelerating
    ElasticEaseIn,
    /// Damped sine wave, decelerating
    ElasticEaseOut,
    /// Piecewise damped sine wave
    ElasticEaseInOut,
    /// Overshooting cubic, accelerating
    BackEaseIn,
    /// Overshooting cubic, decelerating
    BackEaseOut,
    /// Piecewise overshooting cubic
    BackEaseInOut,
    /// Bouncing, accelerating
    BounceEaseIn,
    /// Bouncing, decelerating
    BounceEaseOut,
    /// Piecewise bouncing
    BounceEaseInOut,
}

impl EasingFunction {
    /// Interpolate progress `p` (0..1) through this curve.
    pub fn ease(self, p: f64) -> f64 {
        match self {
            Self::Step => p.floor(),
            Self::Linear => p,
            Self::QuadraticEaseIn => p * p,
            Self::QuadraticEaseOut => -(p * (p - 2.0)),
            Self::QuadraticEaseInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    -2.0 * p * p + 4.0 * p - 1.0
                }
            }
            Self::CubicEaseIn => p * p * p,
            Self::CubicEaseOut => {
                let f = p - 1.0;
                f * f * f + 1.0
            }
            Self::CubicEaseInOut => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    let f = 2.0 * p - 2.0;
                    0.5 * f * f * f + 1.0
                }
            }
            Self::QuarticEaseIn => p * p * p * p,
            Self::QuarticEaseOut => {
                let f = p - 1.0;
                f * f * f * (1.0 - p) + 1.0
            }
            Self::QuarticEaseInOut => {
                if p < 0.5 {
                    8.0 * p * p * p * p
                } else {
                    let f = p - 1.0;
                    -8.0 * f * f * f * f + 1.0
                }
            }
            Self::QuinticEaseIn => p * p * p * p * p,
            Self::QuinticEaseOut => {
                let f = p - 1.0;
                f * f * f * f * f + 1.0
            }
            Self::QuinticEaseInOut => {
                if p < 0.5 {
                    16.0 * p * p * p * p * p
                } else {
                    let f = 2.0 * p - 2.0;
                    0.5 * f * f * f * f * f + 1.0
                }
            }
            Self::SineEaseIn => ((p - 1.0) * FRAC_PI_2).sin() + 1.0,
            Self::SineEaseOut => (p * FRAC_PI_2).sin(),
            Self::SineEaseInOut => 0.5 * (1.0 - (p * PI).cos()),
            Self::CircularEaseIn => 1.0 - (1.0 - p * p).sqrt(),
            Self::CircularEaseOut => ((2.0 - p) * p).sqrt(),
            Self::CircularEaseInOut => {
                if p < 0.5 {
                    0.5 * (1.0 - (1.0 - 4.0 * p * p).sqrt())
                } else {
                    0.5 * ((-(2.0 * p - 3.0) * (2.0 * p - 1.0)).sqrt() + 1.0)
                }
            }
            Self::ExponentialEaseIn => {
                if p == 0.0 {
                    p
                } else {
                    2.0_f64.powf(10.0 * (p - 1.0))
                }
            }
            Self::ExponentialEaseOut => {
                if p == 1.0 {
                    p
                } else {
                    1.0 - 2.0_f64.powf(-10.0 * p)
                }
            }
            Self::ExponentialEaseInOut => {
                if p == 0.0 || p == 1.0 {
                    p
                } else if p < 0.5 {
                    0.5 * 2.0_f64.powf(20.0 * p - 10.0)
                } else {
                    -0.5 * 2.0_f64.powf(-20.0 * p + 10.0) + 1.0
                }
            }
            Self::ElasticEaseIn => {
                (13.0 * FRAC_PI_2 * p).sin() * 2.0_f64.powf(10.0 * (p - 1.0))
            }
            Self::ElasticEaseOut => {
                (-13.0 * FRAC_PI_2 * (p + 1.0)).sin() * 2.0_f64.powf(-10.0 * p) + 1.0
            }
            Self::ElasticEaseInOut => {
                if p < 0.5 {
                    0.5 * (13.0 * FRAC_PI_2 * 2.0 * p).sin()
                        * 2.0_f64.powf(10.0 * (2.0 * p - 1.0))
                } else {
                    0.5 * ((-13.0 * FRAC_PI_2 * (2.0 * p)).sin()
                        * 2.0_f64.powf(-10.0 * (2.0 * p - 1.0))
                        + 2.0)
                }
            }
            Self::BackEaseIn => p * p * p - p * (p * PI).sin(),
            Self::BackEaseOut => {
                let f = 1.0 - p;
                1.0 - (f * f * f - f * (f * PI).sin())
            }
            Self::BackEaseInOut => {
                if p < 0.5 {
                    let f = 2.0 * p;
                    0.5 * (f * f * f - f * (f * PI).sin())
                } else {
                    let f = 1.0 - (2.0 * p - 1.0);
                    0.5 * (1.0 - (f * f * f - f * (f * PI).sin())) + 0.5
                }
            }
            Self::BounceEaseIn => 1.0 - bounce_out(1.0 - p),
            Self::BounceEaseOut => bounce_out(p),
            Self::BounceEaseInOut => {
                if p < 0.5 {
                    0.5 * (1.0 - bounce_out(1.0 - 2.0 * p))
                } else {
                    0.5 * bounce_out(2.0 * p - 1.0) + 0.5
                }
            }
        }
    }
}

fn bounce_out(p: f64) -> f64 {
    if p < 4.0 / 11.0 {
        121.0 * p * p / 16.0
    } else if p < 8.0 / 11.0 {
        363.0 / 40.0 * p * p - 99.0 / 10.0 * p + 17.0 / 5.0
    } else if p < 9.0 / 10.0 {
        4356.0 / 361.0 * p * p - 35442.0 / 1805.0 * p + 16061.0 / 1805.0
    } else {
        54.0 / 5.0 * p * p - 513.0 / 25.0 * p + 268.0 / 25.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    source: f64,
    target: f64,
    progress: f64,
    current: f64,
}

/// Eases changes of a numeric input over a configurable time.
///
/// When the input jumps to a new value the node ramps from its current
/// output to the new target, advancing by the pass delta each frame. The
/// ramp state lives in the node and is only touched during evaluation.
/// A non-positive easing time completes the ramp on the next pass instead
/// of dividing by it.
pub struct EasingBehavior {
    input: PinId,
    easing_time: PinId,
    output: PinId,
    function: EasingFunction,
    ramp: Option<Ramp>,
}

impl EasingBehavior {
    /// The currently selected easing curve
    pub fn function(&self) -> EasingFunction {
        self.function
    }

    /// Select the easing curve applied to subsequent ramps
    pub fn set_function(&mut self, function: EasingFunction) {
        self.function = function;
    }
}

impl NodeBehavior for EasingBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        let input = io.numeric(self.input)?.to_f64();
        let easing_ms = io.numeric(self.easing_time)?.to_f64();

        let ramp = self.ramp.get_or_insert(Ramp {
            source: input,
            target: input,
            progress: 1.0,
            current: input,
        });
        if input != ramp.target {
            ramp.source = ramp.current;
            ramp.target = input;
            ramp.progress = 0.0;
        }
        if ramp.progress < 1.0 {
            if easing_ms <= 0.0 {
                ramp.progress = 1.0;
            } else {
                let delta_ms = io.delta().as_secs_f64() * 1000.0;
                ramp.progress = (ramp.progress + delta_ms / easing_ms).min(1.0);
            }
            ramp.current =
                ramp.source + (ramp.target - ramp.source) * self.function.ease(ramp.progress);
        }
        io.write(self.output, Value::Numeric(Numeric::from(ramp.current)))
    }

    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(Some(serde_json::to_string(&self.function)?))
    }

    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.function = serde_json::from_str(raw)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a "Numeric Easing" node
pub fn easing_node() -> Node {
    let mut node = Node::new(
        "easing_numeric",
        "Numeric Easing",
        "Outputs the input value, easing towards it over the easing time",
    );
    let input = node.add_input("Value", ValueType::Numeric);
    let easing_time =
        node.add_input_with_default("Easing time", ValueType::Numeric, Value::Integer(500));
    let output = node.add_output("Value", ValueType::Numeric);
    node.with_behavior(EasingBehavior {
        input,
        easing_time,
        output,
        function: EasingFunction::default(),
        ramp: None,
    })
}

#[derive(Debug, Clone, Copy)]
struct ColorRamp {
    source: [f32; 4],
    target: [f32; 4],
    progress: f64,
    current: [f32; 4],
}

/// Eases changes of a color input over a configurable time, channel by
/// channel.
pub struct ColorEasingBehavior {
    input: PinId,
    easing_time: PinId,
    output: PinId,
    function: EasingFunction,
    ramp: Option<ColorRamp>,
}

impl ColorEasingBehavior {
    /// Select the easing curve applied to subsequent ramps
    pub fn set_function(&mut self, function: EasingFunction) {
        self.function = function;
    }
}

impl NodeBehavior for ColorEasingBehavior {
    fn evaluate(&mut self, io: &mut EvalIo<'_>) -> Result<(), NodeError> {
        let input = io.color(self.input)?;
        let easing_ms = io.numeric(self.easing_time)?.to_f64();

        let ramp = self.ramp.get_or_insert(ColorRamp {
            source: input,
            target: input,
            progress: 1.0,
            current: input,
        });
        if input != ramp.target {
            ramp.source = ramp.current;
            ramp.target = input;
            ramp.progress = 0.0;
        }
        if ramp.progress < 1.0 {
            if easing_ms <= 0.0 {
                ramp.progress = 1.0;
            } else {
                let delta_ms = io.delta().as_secs_f64() * 1000.0;
                ramp.progress = (ramp.progress + delta_ms / easing_ms).min(1.0);
            }
            let eased = self.function.ease(ramp.progress) as f32;
            ramp.current = lerp_color(ramp.source, ramp.target, eased);
        }
        io.write(self.output, Value::Color(ramp.current))
    }

    fn serialize_storage(&self) -> Result<Option<String>, NodeError> {
        Ok(Some(serde_json::to_string(&self.function)?))
    }

    fn deserialize_storage(&mut self, raw: &str) -> Result<(), NodeError> {
        self.function = serde_json::from_str(raw)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a "Color Easing" node
pub fn color_easing_node() -> Node {
    let mut node = Node::new(
        "easing_color",
        "Color Easing",
        "Outputs the input color, easing towards it over the easing time",
    );
    let input = node.add_input("Color", ValueType::Color);
    let easing_time =
        node.add_input_with_default("Easing time", ValueType::Numeric, Value::Integer(500));
    let output = node.add_output("Color", ValueType::Color);
    node.with_behavior(ColorEasingBehavior {
        input,
        easing_time,
        output,
        function: EasingFunction::default(),
        ramp: None,
    })
}
