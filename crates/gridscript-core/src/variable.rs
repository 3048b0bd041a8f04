//! Variable expression tree
//!
//! A [`Variable`] is a deferred expression re-evaluated against live state
//! every time it is read. Scripts never hold snapshots unless a value was
//! explicitly captured as a [`Variable::Static`].

use crate::condition::{Comparison, DeviceCondition, Quantifier};
use crate::context::EvalCx;
use crate::device::{Direction, PropertyHint, PropertyId};
use crate::error::{RuntimeError, RuntimeResult};
use crate::primitive::{BinaryOp, Primitive, UnaryOp};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};

/// How a property is folded over a set of entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAggregate {
    /// The single entity's value, or the list of values when the selector
    /// resolves to more than one entity.
    Value,
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

/// Deferred expression
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// A fixed value
    Static(Primitive),
    /// A named binding; unknown names are a runtime error
    Named(String),
    /// A word that is a binding if one exists, else its own text as a string
    Ambiguous(String),
    Unary {
        op: UnaryOp,
        operand: Box<Variable>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Variable>,
        rhs: Box<Variable>,
    },
    Comparison {
        comparison: Comparison,
        lhs: Box<Variable>,
        rhs: Box<Variable>,
    },
    /// A list literal whose elements are themselves deferred expressions
    ListOf(Vec<Variable>),
    /// Index into a list value; an empty index keeps the whole list, one
    /// index picks an element, several build a sublist.
    ListIndex {
        list: Box<Variable>,
        index: Box<Variable>,
    },
    /// A fold over a list value's elements
    ListAggregate {
        aggregate: PropertyAggregate,
        list: Box<Variable>,
    },
    /// A per-element comparison lifted over a list value
    ListAggregateCondition {
        quantifier: Quantifier,
        list: Box<Variable>,
        comparison: Comparison,
        value: Box<Variable>,
    },
    /// A device property folded over a selector's entities
    AggregateProperty {
        aggregate: PropertyAggregate,
        selector: Box<Selector>,
        property: Option<PropertyId>,
        direction: Option<Direction>,
    },
    /// A per-entity condition lifted over a selector's entities
    AggregateCondition {
        quantifier: Quantifier,
        condition: Box<DeviceCondition>,
        selector: Box<Selector>,
    },
}

impl Variable {
    pub fn constant(value: Primitive) -> Self {
        Variable::Static(value)
    }

    pub fn number(value: f64) -> Self {
        Variable::Static(Primitive::Number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Variable::Static(Primitive::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Variable::Static(Primitive::String(value.into()))
    }

    pub fn not(operand: Variable) -> Self {
        Variable::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Variable, rhs: Variable) -> Self {
        Variable::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn comparison(comparison: Comparison, lhs: Variable, rhs: Variable) -> Self {
        Variable::Comparison {
            comparison,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate to a concrete value against live state.
    pub fn eval(&self, cx: &EvalCx<'_>) -> RuntimeResult<Primitive> {
        match self {
            Variable::Static(value) => Ok(value.clone()),
            Variable::Named(name) => match cx.lookup(name) {
                Some(bound) => bound.eval(cx),
                None => Err(RuntimeError::UnknownVariable(name.clone())),
            },
            Variable::Ambiguous(word) => match cx.lookup(word) {
                Some(bound) => bound.eval(cx),
                None => Ok(Primitive::String(word.clone())),
            },
            Variable::Unary { op, operand } => op.apply(&operand.eval(cx)?),
            Variable::Binary { op, lhs, rhs } => op.apply(&lhs.eval(cx)?, &rhs.eval(cx)?),
            Variable::Comparison {
                comparison,
                lhs,
                rhs,
            } => {
                let result = comparison.compare(&lhs.eval(cx)?, &rhs.eval(cx)?)?;
                Ok(Primitive::Boolean(result))
            }
            Variable::ListOf(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(element.eval(cx)?);
                }
                Ok(Primitive::List(values))
            }
            Variable::ListIndex { list, index } => {
                let values = list.eval(cx)?.cast_list()?;
                let indexes = index.eval(cx)?.cast_list()?;
                match indexes.len() {
                    0 => Ok(Primitive::List(values)),
                    1 => Ok(list_element(&values, &indexes[0])?.clone()),
                    _ => {
                        let mut picked = Vec::with_capacity(indexes.len());
                        for idx in &indexes {
                            picked.push(list_element(&values, idx)?.clone());
                        }
                        Ok(Primitive::List(picked))
                    }
                }
            }
            Variable::ListAggregate { aggregate, list } => {
                let values = list.eval(cx)?.cast_list()?;
                aggregate.fold(values)
            }
            Variable::ListAggregateCondition {
                quantifier,
                list,
                comparison,
                value,
            } => {
                let values = list.eval(cx)?.cast_list()?;
                let expected = value.eval(cx)?;
                let total = values.len();
                let mut matches = 0;
                for element in &values {
                    if comparison.compare(element, &expected)? {
                        matches += 1;
                    }
                }
                Ok(Primitive::Boolean(quantifier.apply(matches, total)))
            }
            Variable::AggregateProperty {
                aggregate,
                selector,
                property,
                direction,
            } => {
                let resolved = selector.resolve(cx)?;
                if *aggregate == PropertyAggregate::Count {
                    return Ok(Primitive::Number(resolved.entities.len() as f64));
                }
                let mut values = Vec::with_capacity(resolved.entities.len());
                for entity in &resolved.entities {
                    let device_type = match &resolved.device_type {
                        Some(t) => t.clone(),
                        None => cx.devices.device_type_of(entity)?,
                    };
                    let handler = cx.devices.handler(&device_type)?;
                    let id = property.clone().unwrap_or_else(|| {
                        let hint = direction
                            .map(PropertyHint::Direction)
                            .unwrap_or(PropertyHint::Primary);
                        handler.default_property(hint)
                    });
                    let value = match direction {
                        Some(dir) => handler.get_directional(entity, &id, *dir)?,
                        None => handler.get(entity, &id)?,
                    };
                    values.push(value);
                }
                aggregate.fold(values)
            }
            Variable::AggregateCondition {
                quantifier,
                condition,
                selector,
            } => {
                let resolved = selector.resolve(cx)?;
                let total = resolved.entities.len();
                let mut matches = 0;
                for entity in &resolved.entities {
                    let device_type = match &resolved.device_type {
                        Some(t) => t.clone(),
                        None => cx.devices.device_type_of(entity)?,
                    };
                    let handler = cx.devices.handler(&device_type)?;
                    if condition.evaluate(cx, handler, entity)? {
                        matches += 1;
                    }
                }
                Ok(Primitive::Boolean(quantifier.apply(matches, total)))
            }
        }
    }
}

impl PropertyAggregate {
    fn fold(&self, values: Vec<Primitive>) -> RuntimeResult<Primitive> {
        match self {
            PropertyAggregate::Value => match values.len() {
                1 => Ok(values.into_iter().next().unwrap_or(Primitive::Number(0.0))),
                _ => Ok(Primitive::List(values)),
            },
            PropertyAggregate::Count => Ok(Primitive::Number(values.len() as f64)),
            _ => {
                let mut numbers = Vec::with_capacity(values.len());
                for value in &values {
                    numbers.push(value.cast_number()?);
                }
                let folded = match self {
                    PropertyAggregate::Sum => numbers.iter().sum(),
                    PropertyAggregate::Avg => {
                        if numbers.is_empty() {
                            0.0
                        } else {
                            numbers.iter().sum::<f64>() / numbers.len() as f64
                        }
                    }
                    PropertyAggregate::Min => numbers.iter().cloned().fold(f64::INFINITY, f64::min),
                    PropertyAggregate::Max => {
                        numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                    }
                    _ => unreachable!(),
                };
                if numbers.is_empty() {
                    Ok(Primitive::Number(0.0))
                } else {
                    Ok(Primitive::Number(folded))
                }
            }
        }
    }
}

fn list_element<'a>(values: &'a [Primitive], index: &Primitive) -> RuntimeResult<&'a Primitive> {
    let idx = index.cast_number()?.round() as i64;
    if idx < 0 || idx as usize >= values.len() {
        return Err(RuntimeError::IndexOutOfBounds {
            index: idx,
            len: values.len(),
        });
    }
    Ok(&values[idx as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VarStore;
    use crate::device::{DeviceBus, DeviceHandler, DeviceType, EntityHandle};

    struct NoBus;

    impl DeviceBus for NoBus {
        fn query(&self, _: Option<&DeviceType>, _: bool, _: Option<&str>) -> Vec<EntityHandle> {
            Vec::new()
        }

        fn self_entity(&self) -> EntityHandle {
            EntityHandle(0)
        }

        fn device_type_of(&self, _: &EntityHandle) -> RuntimeResult<DeviceType> {
            Err(RuntimeError::UnknownEntity)
        }

        fn handler(&self, device_type: &DeviceType) -> RuntimeResult<&dyn DeviceHandler> {
            Err(RuntimeError::unknown_device_type(device_type))
        }

        fn transfer(
            &self,
            _: &EntityHandle,
            _: &EntityHandle,
            _: &str,
            _: Option<f64>,
        ) -> RuntimeResult<f64> {
            Ok(0.0)
        }
    }

    fn eval(var: &Variable, globals: &VarStore) -> RuntimeResult<Primitive> {
        let locals = VarStore::new();
        var.eval(&EvalCx::new(globals, &locals, &NoBus))
    }

    #[test]
    fn test_named_lookup() {
        let mut globals = VarStore::new();
        globals.insert("speed".to_string(), Variable::number(4.0));
        let var = Variable::Named("speed".to_string());
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Number(4.0));
    }

    #[test]
    fn test_named_unknown_errors() {
        let globals = VarStore::new();
        let var = Variable::Named("missing".to_string());
        assert!(matches!(
            eval(&var, &globals),
            Err(RuntimeError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_ambiguous_falls_back_to_text() {
        let globals = VarStore::new();
        let var = Variable::Ambiguous("hangar".to_string());
        assert_eq!(
            eval(&var, &globals).unwrap(),
            Primitive::String("hangar".to_string())
        );
    }

    #[test]
    fn test_ambiguous_prefers_binding() {
        let mut globals = VarStore::new();
        globals.insert("hangar".to_string(), Variable::number(7.0));
        let var = Variable::Ambiguous("hangar".to_string());
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Number(7.0));
    }

    #[test]
    fn test_binding_is_reevaluated() {
        let mut globals = VarStore::new();
        globals.insert("base".to_string(), Variable::number(1.0));
        globals.insert(
            "derived".to_string(),
            Variable::binary(
                BinaryOp::Add,
                Variable::Named("base".to_string()),
                Variable::number(1.0),
            ),
        );
        let var = Variable::Named("derived".to_string());
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Number(2.0));
        globals.insert("base".to_string(), Variable::number(10.0));
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Number(11.0));
    }

    #[test]
    fn test_comparison_variable() {
        let globals = VarStore::new();
        let var = Variable::comparison(
            Comparison::Less,
            Variable::number(2.0),
            Variable::number(3.0),
        );
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Boolean(true));
    }

    #[test]
    fn test_list_index_single() {
        let globals = VarStore::new();
        let list = Variable::constant(Primitive::List(vec![
            Primitive::Number(10.0),
            Primitive::Number(20.0),
        ]));
        let var = Variable::ListIndex {
            list: Box::new(list),
            index: Box::new(Variable::number(1.0)),
        };
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Number(20.0));
    }

    #[test]
    fn test_list_index_out_of_bounds() {
        let globals = VarStore::new();
        let list = Variable::constant(Primitive::List(vec![Primitive::Number(10.0)]));
        let var = Variable::ListIndex {
            list: Box::new(list),
            index: Box::new(Variable::number(3.0)),
        };
        assert!(matches!(
            eval(&var, &globals),
            Err(RuntimeError::IndexOutOfBounds { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_list_of_defers_elements() {
        let mut globals = VarStore::new();
        globals.insert("n".to_string(), Variable::number(5.0));
        let var = Variable::ListOf(vec![Variable::Named("n".to_string()), Variable::number(1.0)]);
        assert_eq!(
            eval(&var, &globals).unwrap(),
            Primitive::List(vec![Primitive::Number(5.0), Primitive::Number(1.0)])
        );
    }

    #[test]
    fn test_list_aggregate_condition() {
        let globals = VarStore::new();
        let list = Variable::constant(Primitive::List(vec![
            Primitive::Number(1.0),
            Primitive::Number(3.0),
        ]));
        let var = Variable::ListAggregateCondition {
            quantifier: Quantifier::Any,
            list: Box::new(list),
            comparison: Comparison::Greater,
            value: Box::new(Variable::number(2.0)),
        };
        assert_eq!(eval(&var, &globals).unwrap(), Primitive::Boolean(true));
    }

    #[test]
    fn test_aggregate_condition_over_no_entities_is_false() {
        // NoBus resolves every selector to an empty entity set
        let globals = VarStore::new();
        for quantifier in [Quantifier::All, Quantifier::Any, Quantifier::None] {
            let var = Variable::AggregateCondition {
                quantifier,
                condition: Box::new(DeviceCondition::Compare {
                    property: None,
                    direction: None,
                    comparison: Comparison::Equal,
                    value: Variable::number(1.0),
                }),
                selector: Box::new(Selector::All(DeviceType::new("piston"))),
            };
            assert_eq!(eval(&var, &globals).unwrap(), Primitive::Boolean(false));
        }
    }

    #[test]
    fn test_list_index_multi_builds_sublist() {
        let globals = VarStore::new();
        let list = Variable::constant(Primitive::List(vec![
            Primitive::Number(10.0),
            Primitive::Number(20.0),
            Primitive::Number(30.0),
        ]));
        let var = Variable::ListIndex {
            list: Box::new(list),
            index: Box::new(Variable::constant(Primitive::List(vec![
                Primitive::Number(2.0),
                Primitive::Number(0.0),
            ]))),
        };
        assert_eq!(
            eval(&var, &globals).unwrap(),
            Primitive::List(vec![Primitive::Number(30.0), Primitive::Number(10.0)])
        );
    }
}
