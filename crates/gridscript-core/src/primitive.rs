//! Primitive values
//!
//! Every variable evaluation produces a [`Primitive`]: a tagged scalar,
//! vector, or list value. Casts are explicit and fail when the source kind
//! cannot represent the requested kind.

use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tagged runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Primitive {
    Number(f64),
    Boolean(bool),
    String(String),
    Vector([f64; 3]),
    List(Vec<Primitive>),
}

/// Discriminant of a [`Primitive`], used in diagnostics and dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Number,
    Boolean,
    String,
    Vector,
    List,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::String => "string",
            PrimitiveKind::Vector => "vector",
            PrimitiveKind::List => "list",
        };
        f.write_str(name)
    }
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Number(_) => PrimitiveKind::Number,
            Primitive::Boolean(_) => PrimitiveKind::Boolean,
            Primitive::String(_) => PrimitiveKind::String,
            Primitive::Vector(_) => PrimitiveKind::Vector,
            Primitive::List(_) => PrimitiveKind::List,
        }
    }

    fn cast_err(&self, to: PrimitiveKind) -> RuntimeError {
        RuntimeError::InvalidCast {
            from: self.kind(),
            to,
        }
    }

    /// Cast to a number. Strings are parsed; any other kind fails.
    pub fn cast_number(&self) -> RuntimeResult<f64> {
        match self {
            Primitive::Number(n) => Ok(*n),
            Primitive::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.cast_err(PrimitiveKind::Number)),
            _ => Err(self.cast_err(PrimitiveKind::Number)),
        }
    }

    /// Cast to a boolean. Strings parse "true"/"false" (case-insensitive).
    pub fn cast_boolean(&self) -> RuntimeResult<bool> {
        match self {
            Primitive::Boolean(b) => Ok(*b),
            Primitive::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.cast_err(PrimitiveKind::Boolean)),
            },
            _ => Err(self.cast_err(PrimitiveKind::Boolean)),
        }
    }

    /// Cast to a string. Every kind renders.
    pub fn cast_string(&self) -> RuntimeResult<String> {
        Ok(self.to_string())
    }

    /// Cast to a vector. Strings parse the `x:y:z` form.
    pub fn cast_vector(&self) -> RuntimeResult<[f64; 3]> {
        match self {
            Primitive::Vector(v) => Ok(*v),
            Primitive::String(s) => {
                let parts: Vec<&str> = s.trim().split(':').collect();
                if parts.len() != 3 {
                    return Err(self.cast_err(PrimitiveKind::Vector));
                }
                let mut v = [0.0; 3];
                for (slot, part) in v.iter_mut().zip(parts) {
                    *slot = part
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| self.cast_err(PrimitiveKind::Vector))?;
                }
                Ok(v)
            }
            _ => Err(self.cast_err(PrimitiveKind::Vector)),
        }
    }

    /// Cast to a list. Scalars wrap themselves in a one-element list.
    pub fn cast_list(&self) -> RuntimeResult<Vec<Primitive>> {
        match self {
            Primitive::List(items) => Ok(items.clone()),
            other => Ok(vec![other.clone()]),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Number(n) => write!(f, "{}", format_number(*n)),
            Primitive::Boolean(b) => write!(f, "{}", b),
            Primitive::String(s) => f.write_str(s),
            Primitive::Vector([x, y, z]) => write!(
                f,
                "{}:{}:{}",
                format_number(*x),
                format_number(*y),
                format_number(*z)
            ),
            Primitive::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Unary operator over primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Negate,
    Abs,
    Round,
}

impl UnaryOp {
    pub fn apply(&self, value: &Primitive) -> RuntimeResult<Primitive> {
        let invalid = || RuntimeError::InvalidOperation {
            op: self.name(),
            lhs: value.kind(),
            rhs: value.kind(),
        };
        match self {
            UnaryOp::Not => match value {
                Primitive::Boolean(b) => Ok(Primitive::Boolean(!b)),
                // "not" over a list reverses it
                Primitive::List(items) => {
                    Ok(Primitive::List(items.iter().rev().cloned().collect()))
                }
                _ => Ok(Primitive::Boolean(!value.cast_boolean().map_err(|_| invalid())?)),
            },
            UnaryOp::Negate => match value {
                Primitive::Number(n) => Ok(Primitive::Number(-n)),
                Primitive::Vector([x, y, z]) => Ok(Primitive::Vector([-x, -y, -z])),
                _ => Err(invalid()),
            },
            UnaryOp::Abs => Ok(Primitive::Number(value.cast_number()?.abs())),
            UnaryOp::Round => Ok(Primitive::Number(value.cast_number()?.round())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Negate => "negate",
            UnaryOp::Abs => "abs",
            UnaryOp::Round => "round",
        }
    }
}

/// Binary operator over primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
}

impl BinaryOp {
    pub fn apply(&self, lhs: &Primitive, rhs: &Primitive) -> RuntimeResult<Primitive> {
        use Primitive::*;
        let invalid = || RuntimeError::InvalidOperation {
            op: self.name(),
            lhs: lhs.kind(),
            rhs: rhs.kind(),
        };
        match self {
            BinaryOp::And => Ok(Boolean(lhs.cast_boolean()? && rhs.cast_boolean()?)),
            BinaryOp::Or => Ok(Boolean(lhs.cast_boolean()? || rhs.cast_boolean()?)),
            BinaryOp::Add => match (lhs, rhs) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (Vector(a), Vector(b)) => {
                    Ok(Vector([a[0] + b[0], a[1] + b[1], a[2] + b[2]]))
                }
                (List(a), List(b)) => {
                    Ok(List(a.iter().chain(b.iter()).cloned().collect()))
                }
                // string on either side concatenates
                (String(_), _) | (_, String(_)) => {
                    Ok(String(format!("{}{}", lhs, rhs)))
                }
                _ => Err(invalid()),
            },
            BinaryOp::Subtract => match (lhs, rhs) {
                (Number(a), Number(b)) => Ok(Number(a - b)),
                (Vector(a), Vector(b)) => {
                    Ok(Vector([a[0] - b[0], a[1] - b[1], a[2] - b[2]]))
                }
                _ => Err(invalid()),
            },
            BinaryOp::Multiply => match (lhs, rhs) {
                (Number(a), Number(b)) => Ok(Number(a * b)),
                (Vector(v), Number(n)) | (Number(n), Vector(v)) => {
                    Ok(Vector([v[0] * n, v[1] * n, v[2] * n]))
                }
                _ => Err(invalid()),
            },
            BinaryOp::Divide => match (lhs, rhs) {
                (Number(a), Number(b)) => Ok(Number(a / b)),
                (Vector(v), Number(n)) => Ok(Vector([v[0] / n, v[1] / n, v[2] / n])),
                _ => Err(invalid()),
            },
            BinaryOp::Modulo => match (lhs, rhs) {
                (Number(a), Number(b)) => Ok(Number(a % b)),
                _ => Err(invalid()),
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Modulo => "modulo",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_number() {
        assert_eq!(Primitive::Number(2.5).cast_number().unwrap(), 2.5);
        assert_eq!(
            Primitive::String("42".to_string()).cast_number().unwrap(),
            42.0
        );
        assert!(Primitive::Boolean(true).cast_number().is_err());
        assert!(Primitive::String("abc".to_string()).cast_number().is_err());
    }

    #[test]
    fn test_cast_boolean() {
        assert!(Primitive::Boolean(true).cast_boolean().unwrap());
        assert!(Primitive::String("True".to_string()).cast_boolean().unwrap());
        assert!(Primitive::Number(1.0).cast_boolean().is_err());
    }

    #[test]
    fn test_cast_vector() {
        assert_eq!(
            Primitive::String("1:2:3".to_string()).cast_vector().unwrap(),
            [1.0, 2.0, 3.0]
        );
        assert!(Primitive::String("1:2".to_string()).cast_vector().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Primitive::Number(3.0).to_string(), "3");
        assert_eq!(Primitive::Number(3.5).to_string(), "3.5");
        assert_eq!(Primitive::Vector([1.0, 2.0, 3.0]).to_string(), "1:2:3");
        assert_eq!(
            Primitive::List(vec![Primitive::Number(1.0), Primitive::Number(2.0)]).to_string(),
            "[1,2]"
        );
    }

    #[test]
    fn test_add() {
        assert_eq!(
            BinaryOp::Add
                .apply(&Primitive::Number(1.0), &Primitive::Number(2.0))
                .unwrap(),
            Primitive::Number(3.0)
        );
        assert_eq!(
            BinaryOp::Add
                .apply(
                    &Primitive::String("a".to_string()),
                    &Primitive::Number(1.0)
                )
                .unwrap(),
            Primitive::String("a1".to_string())
        );
        assert!(BinaryOp::Add
            .apply(&Primitive::Boolean(true), &Primitive::Number(1.0))
            .is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            UnaryOp::Not.apply(&Primitive::Boolean(false)).unwrap(),
            Primitive::Boolean(true)
        );
        assert_eq!(
            UnaryOp::Negate.apply(&Primitive::Number(2.0)).unwrap(),
            Primitive::Number(-2.0)
        );
        assert!(UnaryOp::Negate.apply(&Primitive::Boolean(true)).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let v = Primitive::Vector([1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Primitive = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
