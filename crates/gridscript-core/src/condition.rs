//! Condition and comparator model
//!
//! Per-entity conditions compare one resolved device property against a
//! comparison value through a typed comparator; aggregate conditions lift a
//! per-entity condition over an entity set with an All/Any/None quantifier.

use crate::context::EvalCx;
use crate::device::{Direction, EntityHandle, DeviceHandler, PropertyHint, PropertyId};
use crate::error::{RuntimeError, RuntimeResult};
use crate::primitive::{Primitive, PrimitiveKind};
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed comparator.
///
/// Numbers support the full ordering set. Booleans, strings, and lists
/// support equality (and its negation) only; requesting an ordering on them
/// is a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    LessOrEqual,
    Less,
}

impl Comparison {
    /// The comparator meaning "is not `self`".
    pub fn inverse(&self) -> Comparison {
        match self {
            Comparison::Greater => Comparison::LessOrEqual,
            Comparison::GreaterOrEqual => Comparison::Less,
            Comparison::Equal => Comparison::NotEqual,
            Comparison::NotEqual => Comparison::Equal,
            Comparison::LessOrEqual => Comparison::Greater,
            Comparison::Less => Comparison::GreaterOrEqual,
        }
    }

    fn is_equality(&self) -> bool {
        matches!(self, Comparison::Equal | Comparison::NotEqual)
    }

    /// Compare two primitives, dispatching on the left operand's kind.
    pub fn compare(&self, lhs: &Primitive, rhs: &Primitive) -> RuntimeResult<bool> {
        match lhs.kind() {
            PrimitiveKind::Number => {
                let a = lhs.cast_number()?;
                let b = rhs.cast_number()?;
                Ok(match self {
                    Comparison::Greater => a > b,
                    Comparison::GreaterOrEqual => a >= b,
                    Comparison::Equal => a == b,
                    Comparison::NotEqual => a != b,
                    Comparison::LessOrEqual => a <= b,
                    Comparison::Less => a < b,
                })
            }
            PrimitiveKind::Boolean => {
                if !self.is_equality() {
                    return Err(RuntimeError::UnsupportedComparison(PrimitiveKind::Boolean));
                }
                let equal = lhs.cast_boolean()? == rhs.cast_boolean()?;
                Ok(equal == (*self == Comparison::Equal))
            }
            PrimitiveKind::String => {
                if !self.is_equality() {
                    return Err(RuntimeError::UnsupportedComparison(PrimitiveKind::String));
                }
                let equal = lhs.cast_string()? == rhs.cast_string()?;
                Ok(equal == (*self == Comparison::Equal))
            }
            PrimitiveKind::Vector => {
                let a = lhs.cast_vector()?;
                match self {
                    // equality is componentwise
                    Comparison::Equal | Comparison::NotEqual => {
                        let b = rhs.cast_vector()?;
                        Ok((a == b) == (*self == Comparison::Equal))
                    }
                    // ordering compares magnitudes
                    _ => {
                        let mag = |v: [f64; 3]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
                        self.compare(
                            &Primitive::Number(mag(a)),
                            &Primitive::Number(mag(rhs.cast_vector()?)),
                        )
                    }
                }
            }
            PrimitiveKind::List => {
                if !self.is_equality() {
                    return Err(RuntimeError::UnsupportedComparison(PrimitiveKind::List));
                }
                let equal = lhs.cast_list()? == rhs.cast_list()?;
                Ok(equal == (*self == Comparison::Equal))
            }
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Equal => "=",
            Comparison::NotEqual => "!=",
            Comparison::LessOrEqual => "<=",
            Comparison::Less => "<",
        };
        f.write_str(symbol)
    }
}

/// Quantifier for lifting a per-entity condition over an entity set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    All,
    Any,
    None,
}

impl Quantifier {
    /// Apply to match counts. An empty set is false for every quantifier;
    /// there is no vacuous truth.
    pub fn apply(&self, matches: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        match self {
            Quantifier::All => matches == total,
            Quantifier::Any => matches > 0,
            Quantifier::None => matches == 0,
        }
    }
}

/// A condition evaluated against a single entity
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCondition {
    /// Compare a property value (or the handler's default property) against
    /// a comparison value.
    Compare {
        property: Option<PropertyId>,
        direction: Option<Direction>,
        comparison: Comparison,
        value: Variable,
    },
    Not(Box<DeviceCondition>),
    And(Box<DeviceCondition>, Box<DeviceCondition>),
    Or(Box<DeviceCondition>, Box<DeviceCondition>),
}

impl DeviceCondition {
    pub fn not(condition: DeviceCondition) -> Self {
        DeviceCondition::Not(Box::new(condition))
    }

    pub fn and(a: DeviceCondition, b: DeviceCondition) -> Self {
        DeviceCondition::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: DeviceCondition, b: DeviceCondition) -> Self {
        DeviceCondition::Or(Box::new(a), Box::new(b))
    }

    /// Evaluate against one entity through its handler.
    pub fn evaluate(
        &self,
        cx: &EvalCx<'_>,
        handler: &dyn DeviceHandler,
        entity: &EntityHandle,
    ) -> RuntimeResult<bool> {
        match self {
            DeviceCondition::Compare {
                property,
                direction,
                comparison,
                value,
            } => {
                let expected = value.eval(cx)?;
                let property = property.clone().unwrap_or_else(|| {
                    let hint = direction
                        .map(PropertyHint::Direction)
                        .unwrap_or(PropertyHint::Kind(expected.kind()));
                    handler.default_property(hint)
                });
                let actual = match direction {
                    Some(dir) => handler.get_directional(entity, &property, *dir)?,
                    None => handler.get(entity, &property)?,
                };
                comparison.compare(&actual, &expected)
            }
            DeviceCondition::Not(inner) => Ok(!inner.evaluate(cx, handler, entity)?),
            DeviceCondition::And(a, b) => {
                Ok(a.evaluate(cx, handler, entity)? && b.evaluate(cx, handler, entity)?)
            }
            DeviceCondition::Or(a, b) => {
                Ok(a.evaluate(cx, handler, entity)? || b.evaluate(cx, handler, entity)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering() {
        let a = Primitive::Number(2.0);
        let b = Primitive::Number(3.0);
        assert!(Comparison::Less.compare(&a, &b).unwrap());
        assert!(!Comparison::Greater.compare(&a, &b).unwrap());
        assert!(Comparison::GreaterOrEqual.compare(&b, &b).unwrap());
    }

    #[test]
    fn test_boolean_equality_only() {
        let t = Primitive::Boolean(true);
        assert!(Comparison::Equal.compare(&t, &t).unwrap());
        assert!(!Comparison::NotEqual.compare(&t, &t).unwrap());
        assert!(matches!(
            Comparison::Greater.compare(&t, &t),
            Err(RuntimeError::UnsupportedComparison(PrimitiveKind::Boolean))
        ));
    }

    #[test]
    fn test_string_equality_only() {
        let s = Primitive::String("open".to_string());
        assert!(Comparison::Equal.compare(&s, &s).unwrap());
        assert!(Comparison::Less.compare(&s, &s).is_err());
    }

    #[test]
    fn test_inverse() {
        assert_eq!(Comparison::Greater.inverse(), Comparison::LessOrEqual);
        assert_eq!(Comparison::Equal.inverse(), Comparison::NotEqual);
        assert_eq!(Comparison::NotEqual.inverse(), Comparison::Equal);
    }

    #[test]
    fn test_quantifier_empty_set_is_false() {
        for q in [Quantifier::All, Quantifier::Any, Quantifier::None] {
            assert!(!q.apply(0, 0));
        }
    }

    #[test]
    fn test_quantifier() {
        assert!(Quantifier::All.apply(3, 3));
        assert!(!Quantifier::All.apply(2, 3));
        assert!(Quantifier::Any.apply(1, 3));
        assert!(!Quantifier::Any.apply(0, 3));
        assert!(Quantifier::None.apply(0, 3));
        assert!(!Quantifier::None.apply(1, 3));
    }
}
