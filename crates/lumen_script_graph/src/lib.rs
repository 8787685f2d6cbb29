// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-graph visual scripting runtime for Lumen.
//!
//! A small, embeddable dataflow engine: users compose typed computation
//! graphs whose output drives animated layer properties once per render
//! frame. The graph keeps running while it is edited - nodes and cables can
//! come and go between passes - and a steady-state pass allocates nothing.
//!
//! ## Architecture
//!
//! - Typed pins with numeric coercion between compatible types
//! - Dynamic-arity pin collections and identity-stable pin buckets
//! - Structural validation (acyclicity, type checks) at mutation time
//! - Cached dependency-ordered evaluation with per-node fault containment
//!
//! The standard node library lives in `lumen_script_nodes`; this crate only
//! knows about pins, nodes, connections and scripts.

pub mod collection;
pub mod connection;
pub mod eval;
pub mod event;
pub mod node;
pub mod numeric;
pub mod pin;
pub mod script;
pub mod value;

pub use collection::{PinBucket, PinCollection, PinCollectionId};
pub use connection::{Connection, ConnectionId};
pub use eval::{EvalIo, EvalTime, NodeError, RefreshIo, RefreshReport};
pub use event::{EventArguments, EventField, EventSchema};
pub use node::{Node, NodeBehavior, NodeCategory, NodeId, NodeRegistry, NodeTemplate, PinStore};
pub use numeric::Numeric;
pub use pin::{Pin, PinDirection, PinId};
pub use script::{
    Connected, GraphError, GraphEvent, NodeScript, RemovedNode, RemovedPin, SharedNodeScript,
};
pub use value::{lerp_color, ColorGradient, GradientStop, Value, ValueType};
