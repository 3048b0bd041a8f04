//! Entity selectors
//!
//! A selector describes which entities a command targets. Like variables,
//! selectors re-resolve against the device bus on every use, so a script
//! written against a group keeps working as entities come and go.

use crate::condition::DeviceCondition;
use crate::context::EvalCx;
use crate::device::{DeviceType, EntityHandle};
use crate::error::{RuntimeError, RuntimeResult};
use crate::variable::Variable;

/// Deferred entity query
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Entities matched by name (the name itself is a variable, so it can
    /// be computed at resolve time)
    Named {
        device_type: Option<DeviceType>,
        group: bool,
        name: Box<Variable>,
    },
    /// Every entity of a device type
    All(DeviceType),
    /// The entity hosting the running program
    SelfRef(Option<DeviceType>),
    /// A positional subset of another selector's entities
    Indexed {
        inner: Box<Selector>,
        index: Box<Variable>,
    },
    /// Entities of another selector passing a per-entity condition
    Filtered {
        inner: Box<Selector>,
        condition: DeviceCondition,
    },
}

/// The outcome of resolving a selector: the entities matched plus the
/// device type they were matched under, when the selector names one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelector {
    pub device_type: Option<DeviceType>,
    pub entities: Vec<EntityHandle>,
}

impl Selector {
    pub fn named(device_type: Option<DeviceType>, group: bool, name: Variable) -> Self {
        Selector::Named {
            device_type,
            group,
            name: Box::new(name),
        }
    }

    pub fn indexed(inner: Selector, index: Variable) -> Self {
        Selector::Indexed {
            inner: Box::new(inner),
            index: Box::new(index),
        }
    }

    pub fn filtered(inner: Selector, condition: DeviceCondition) -> Self {
        Selector::Filtered {
            inner: Box::new(inner),
            condition,
        }
    }

    /// Resolve against the device bus. A selector matching nothing is not
    /// an error; commands over an empty set are no-ops.
    pub fn resolve(&self, cx: &EvalCx<'_>) -> RuntimeResult<ResolvedSelector> {
        match self {
            Selector::Named {
                device_type,
                group,
                name,
            } => {
                let name = name.eval(cx)?.cast_string()?;
                let entities = cx.devices.query(device_type.as_ref(), *group, Some(&name));
                Ok(ResolvedSelector {
                    device_type: device_type.clone(),
                    entities,
                })
            }
            Selector::All(device_type) => {
                let entities = cx.devices.query(Some(device_type), false, None);
                Ok(ResolvedSelector {
                    device_type: Some(device_type.clone()),
                    entities,
                })
            }
            Selector::SelfRef(device_type) => Ok(ResolvedSelector {
                device_type: device_type.clone(),
                entities: vec![cx.devices.self_entity()],
            }),
            Selector::Indexed { inner, index } => {
                let resolved = inner.resolve(cx)?;
                let indexes = index.eval(cx)?.cast_list()?;
                let mut picked = Vec::with_capacity(indexes.len());
                for idx in &indexes {
                    let idx = idx.cast_number()?.round() as i64;
                    if idx < 0 || idx as usize >= resolved.entities.len() {
                        return Err(RuntimeError::IndexOutOfBounds {
                            index: idx,
                            len: resolved.entities.len(),
                        });
                    }
                    picked.push(resolved.entities[idx as usize]);
                }
                Ok(ResolvedSelector {
                    device_type: resolved.device_type,
                    entities: picked,
                })
            }
            Selector::Filtered { inner, condition } => {
                let resolved = inner.resolve(cx)?;
                let mut kept = Vec::new();
                for entity in &resolved.entities {
                    let device_type = match &resolved.device_type {
                        Some(t) => t.clone(),
                        None => cx.devices.device_type_of(entity)?,
                    };
                    let handler = cx.devices.handler(&device_type)?;
                    if condition.evaluate(cx, handler, entity)? {
                        kept.push(*entity);
                    }
                }
                Ok(ResolvedSelector {
                    device_type: resolved.device_type,
                    entities: kept,
                })
            }
        }
    }
}
