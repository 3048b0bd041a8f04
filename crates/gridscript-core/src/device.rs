//! Device capability interfaces
//!
//! The engine never implements device-specific logic; it manipulates
//! external devices through two consumed capabilities: [`DeviceBus`]
//! resolves entity queries and hands out per-type handlers, and
//! [`DeviceHandler`] reads/writes logical properties and invokes verbs on
//! a single entity. The concrete device catalog lives in the host.

use crate::error::{RuntimeError, RuntimeResult};
use crate::primitive::{Primitive, PrimitiveKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an external controllable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

/// Tag for a category of controllable device (open set, host-defined)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceType(String);

impl DeviceType {
    pub fn new(name: impl Into<String>) -> Self {
        DeviceType(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a logical device property (open set, host-defined)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(String);

impl PropertyId {
    pub fn new(name: impl Into<String>) -> Self {
        PropertyId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directional variant for numeric properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
    Clockwise,
    CounterClockwise,
}

/// Hint used to ask a handler for its default property
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyHint {
    /// The property a direction naturally moves (e.g. up -> height)
    Direction(Direction),
    /// The property naturally set by a value of this kind
    Kind(PrimitiveKind),
    /// The handler's primary property
    Primary,
}

/// A property reference as written in a script: either named outright or
/// deferred to the handler's defaults until the action runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySpec {
    Named(PropertyId),
    ForDirection(Direction),
    ForValue,
    ForBoolean,
    Primary,
}

impl PropertySpec {
    /// Resolve against a handler, given the kind of the value being applied
    /// (if any).
    pub fn resolve(
        &self,
        handler: &dyn DeviceHandler,
        value_kind: Option<PrimitiveKind>,
    ) -> PropertyId {
        match self {
            PropertySpec::Named(id) => id.clone(),
            PropertySpec::ForDirection(dir) => {
                handler.default_property(PropertyHint::Direction(*dir))
            }
            PropertySpec::ForValue => handler.default_property(
                value_kind
                    .map(PropertyHint::Kind)
                    .unwrap_or(PropertyHint::Primary),
            ),
            PropertySpec::ForBoolean => {
                handler.default_property(PropertyHint::Kind(PrimitiveKind::Boolean))
            }
            PropertySpec::Primary => {
                handler.default_property(PropertyHint::Direction(handler.default_direction()))
            }
        }
    }
}

/// Per-device-type capability: property access and verbs on one entity.
///
/// Implementations may use interior mutability; all methods take `&self`
/// because the engine is single-threaded and steps exactly one command at
/// a time.
pub trait DeviceHandler {
    fn get(&self, entity: &EntityHandle, property: &PropertyId) -> RuntimeResult<Primitive>;

    fn set(
        &self,
        entity: &EntityHandle,
        property: &PropertyId,
        value: Primitive,
    ) -> RuntimeResult<()>;

    /// Directional read of a numeric property; defaults to the plain read.
    fn get_directional(
        &self,
        entity: &EntityHandle,
        property: &PropertyId,
        _direction: Direction,
    ) -> RuntimeResult<Primitive> {
        self.get(entity, property)
    }

    /// Directional write of a numeric property; defaults to the plain write.
    fn set_directional(
        &self,
        entity: &EntityHandle,
        property: &PropertyId,
        _direction: Direction,
        value: Primitive,
    ) -> RuntimeResult<()> {
        self.set(entity, property, value)
    }

    /// Raise or lower a numeric property by an amount.
    fn increment(
        &self,
        entity: &EntityHandle,
        property: &PropertyId,
        amount: Primitive,
    ) -> RuntimeResult<()> {
        let current = self.get(entity, property)?.cast_number()?;
        let delta = amount.cast_number()?;
        self.set(entity, property, Primitive::Number(current + delta))
    }

    /// Directional increment; the direction decides the sign by default.
    fn increment_directional(
        &self,
        entity: &EntityHandle,
        property: &PropertyId,
        direction: Direction,
        amount: Primitive,
    ) -> RuntimeResult<()> {
        let sign = match direction {
            Direction::Down | Direction::Backward | Direction::Left => -1.0,
            _ => 1.0,
        };
        let delta = amount.cast_number()? * sign;
        self.increment(entity, property, Primitive::Number(delta))
    }

    /// Negate a numeric property (the "reverse" verb).
    fn reverse(&self, entity: &EntityHandle, property: &PropertyId) -> RuntimeResult<()> {
        let current = self.get(entity, property)?.cast_number()?;
        self.set(entity, property, Primitive::Number(-current))
    }

    /// Move a numeric property in a direction (the "move" verb). The default
    /// doubles or halves toward the direction, matching increment semantics
    /// with the property's own magnitude.
    fn move_value(
        &self,
        entity: &EntityHandle,
        property: &PropertyId,
        direction: Direction,
    ) -> RuntimeResult<()> {
        let current = self.get(entity, property)?.cast_number()?;
        self.increment_directional(entity, property, direction, Primitive::Number(current.abs()))
    }

    /// The property a given hint resolves to for this device type.
    fn default_property(&self, hint: PropertyHint) -> PropertyId;

    /// The direction this device naturally moves.
    fn default_direction(&self) -> Direction {
        Direction::Up
    }
}

/// Entity resolution and handler lookup, plus the item-transfer primitive.
///
/// Must be safe to call repeatedly and reflect live state.
pub trait DeviceBus {
    /// Entities matching a device-type tag and optional group/name query.
    fn query(
        &self,
        device_type: Option<&DeviceType>,
        group: bool,
        name: Option<&str>,
    ) -> Vec<EntityHandle>;

    /// The entity hosting the running program.
    fn self_entity(&self) -> EntityHandle;

    /// The device type of a resolved entity.
    fn device_type_of(&self, entity: &EntityHandle) -> RuntimeResult<DeviceType>;

    /// The handler for a device type.
    fn handler(&self, device_type: &DeviceType) -> RuntimeResult<&dyn DeviceHandler>;

    /// Perform one item-transfer operation between two entities, moving items
    /// matching `filter` up to `amount` (unbounded when `None`). Returns the
    /// amount actually moved; zero means nothing matched or the destination
    /// is full.
    fn transfer(
        &self,
        from: &EntityHandle,
        to: &EntityHandle,
        filter: &str,
        amount: Option<f64>,
    ) -> RuntimeResult<f64>;
}

impl RuntimeError {
    pub fn unknown_device_type(device_type: &DeviceType) -> Self {
        RuntimeError::UnknownDeviceType(device_type.to_string())
    }
}
