// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin collections: ordered, dynamically sized groups of homogeneously typed
//! pins, plus the slot bucket that keeps pin identity stable across dynamic
//! schema refreshes.

use crate::pin::{Pin, PinDirection, PinId};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pin collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinCollectionId(pub Uuid);

impl PinCollectionId {
    /// Create a new random collection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinCollectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered, resizable group of pins sharing one declared type.
///
/// Variadic nodes (sum, min, max, ...) expose their operands through a
/// collection. Removing a pin preserves the order and identity of the
/// remaining pins; after every add or remove the pins are relabeled
/// `"{label} {n}"` so the editor shows a contiguous numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinCollection {
    id: PinCollectionId,
    label: String,
    direction: PinDirection,
    value_type: ValueType,
    min_count: usize,
    default: Value,
    pins: Vec<Pin>,
}

impl PinCollection {
    pub(crate) fn new(
        label: impl Into<String>,
        direction: PinDirection,
        value_type: ValueType,
        min_count: usize,
        default: Value,
    ) -> Self {
        let mut collection = Self {
            id: PinCollectionId::new(),
            label: label.into(),
            direction,
            value_type,
            min_count,
            default: default.convert(value_type),
            pins: Vec::new(),
        };
        for _ in 0..min_count {
            collection.add();
        }
        collection
    }

    /// The collection's stable identifier
    pub fn id(&self) -> PinCollectionId {
        self.id
    }

    /// The base label pins are numbered from
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The direction shared by every pin in the collection
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// The value type shared by every pin in the collection
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The smallest number of pins the collection may shrink to
    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// Number of pins currently in the collection
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether the collection holds no pins
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// The pins in collection order
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// The current values of the pins, in collection order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.pins.iter().map(Pin::value)
    }

    /// Whether the given pin belongs to this collection
    pub fn contains(&self, pin: PinId) -> bool {
        self.pins.iter().any(|p| p.id() == pin)
    }

    /// Append a new pin of the collection's declared type and return its id.
    pub(crate) fn add(&mut self) -> PinId {
        let pin = match self.direction {
            PinDirection::Input => Pin::input("", self.value_type),
            PinDirection::Output => Pin::output("", self.value_type),
        }
        .with_default(self.default.clone());
        let id = pin.id();
        self.pins.push(pin);
        self.relabel();
        id
    }

    /// Remove a specific pin, keeping the relative order of the rest.
    pub(crate) fn remove(&mut self, pin: PinId) -> Option<Pin> {
        let index = self.pins.iter().position(|p| p.id() == pin)?;
        let removed = self.pins.remove(index);
        self.relabel();
        Some(removed)
    }

    pub(crate) fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id() == id)
    }

    pub(crate) fn pin_mut(&mut self, id: PinId) -> Option<&mut Pin> {
        self.pins.iter_mut().find(|p| p.id() == id)
    }

    fn relabel(&mut self) {
        let label = self.label.clone();
        for (index, pin) in self.pins.iter_mut().enumerate() {
            pin.rename(format!("{} {}", label, index + 1));
        }
    }
}

/// An arena of reusable pin slots.
///
/// Nodes whose pins reflect an external shape (event arguments, bound
/// properties) rebuild those pins whenever the shape changes. Destroying and
/// recreating them would dangle every externally held reference - editor
/// selection, in-flight cable drags, undo entries. The bucket instead retains
/// every slot it ever created: the visible pins are an index view over the
/// slots, and a refresh releases and re-acquires slots in place, so a shape
/// round trip hands back pins with their original identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinBucket {
    direction: PinDirection,
    slots: Vec<Pin>,
    visible: Vec<usize>,
}

impl PinBucket {
    pub(crate) fn new(direction: PinDirection) -> Self {
        Self {
            direction,
            slots: Vec::new(),
            visible: Vec::new(),
        }
    }

    /// Reuse the first detached slot (retyped and relabeled) or grow the
    /// arena by one, and make the pin visible. Numeric-compatible types are
    /// unified to [`ValueType::Numeric`] so differently typed fields of the
    /// same shape stay connectable.
    pub(crate) fn acquire(&mut self, value_type: ValueType, name: impl Into<String>) -> PinId {
        let value_type = if value_type.is_numeric() {
            ValueType::Numeric
        } else {
            value_type
        };
        let index = match (0..self.slots.len()).find(|i| !self.visible.contains(i)) {
            Some(index) => {
                let pin = &mut self.slots[index];
                pin.retype(value_type);
                pin.rename(name);
                index
            }
            None => {
                let pin = match self.direction {
                    PinDirection::Input => Pin::input(name, value_type),
                    PinDirection::Output => Pin::output(name, value_type),
                };
                self.slots.push(pin);
                self.slots.len() - 1
            }
        };
        self.visible.push(index);
        self.slots[index].id()
    }

    /// Detach every visible pin, returning their ids. The slots stay
    /// allocated for reuse.
    pub(crate) fn release_all(&mut self) -> Vec<PinId> {
        let released = self
            .visible
            .iter()
            .map(|&index| self.slots[index].id())
            .collect();
        self.visible.clear();
        released
    }

    /// The currently visible pins, in acquisition order
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.visible.iter().map(|&index| &self.slots[index])
    }

    pub(crate) fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins().find(|p| p.id() == id)
    }

    pub(crate) fn pin_mut(&mut self, id: PinId) -> Option<&mut Pin> {
        let index = self
            .visible
            .iter()
            .copied()
            .find(|&index| self.slots[index].id() == id)?;
        Some(&mut self.slots[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_collection() -> PinCollection {
        PinCollection::new(
            "Value",
            PinDirection::Input,
            ValueType::Numeric,
            2,
            Value::Integer(0),
        )
    }

    #[test]
    fn test_collection_starts_at_min_count() {
        let collection = numeric_collection();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.pins()[0].name(), "Value 1");
        assert_eq!(collection.pins()[1].name(), "Value 2");
    }

    #[test]
    fn test_remove_preserves_order_and_identity() {
        let mut collection = numeric_collection();
        let third = collection.add();
        let first = collection.pins()[0].id();
        collection.remove(collection.pins()[1].id());
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.pins()[0].id(), first);
        assert_eq!(collection.pins()[1].id(), third);
        // Relabeled contiguously after the removal
        assert_eq!(collection.pins()[1].name(), "Value 2");
    }

    #[test]
    fn test_bucket_reuses_slots_across_round_trip() {
        let mut bucket = PinBucket::new(PinDirection::Output);
        let x = bucket.acquire(ValueType::Float, "X");
        let y = bucket.acquire(ValueType::Integer, "Y");

        bucket.release_all();
        let pressed = bucket.acquire(ValueType::Bool, "Pressed");
        assert_eq!(pressed, x);
        assert_eq!(bucket.pins().count(), 1);

        bucket.release_all();
        assert_eq!(bucket.acquire(ValueType::Float, "X"), x);
        assert_eq!(bucket.acquire(ValueType::Integer, "Y"), y);
        // Numeric-compatible fields unify to Numeric
        assert!(bucket.pins().all(|p| p.value_type() == ValueType::Numeric));
    }
}
