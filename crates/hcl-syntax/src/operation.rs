//! Unary and binary operators, their precedence, and their evaluation.

use std::fmt;

use hcl_tokenizer::TokenType;

use crate::Value;

/// An operator usable in a unary or binary operation expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LogicalOr,
    LogicalAnd,
    LogicalNot,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Negate,
}

/// Binary operators grouped by precedence level, lowest first.
///
/// Operators within one level are left-associative.
pub const BINARY_OPS: &[&[(TokenType, Operation)]] = &[
    &[(TokenType::Or, Operation::LogicalOr)],
    &[(TokenType::And, Operation::LogicalAnd)],
    &[
        (TokenType::EqualOp, Operation::Equal),
        (TokenType::NotEqual, Operation::NotEqual),
    ],
    &[
        (TokenType::GreaterThan, Operation::GreaterThan),
        (TokenType::GreaterThanEq, Operation::GreaterThanOrEqual),
        (TokenType::LessThan, Operation::LessThan),
        (TokenType::LessThanEq, Operation::LessThanOrEqual),
    ],
    &[
        (TokenType::Plus, Operation::Add),
        (TokenType::Minus, Operation::Subtract),
    ],
    &[
        (TokenType::Star, Operation::Multiply),
        (TokenType::Slash, Operation::Divide),
        (TokenType::Percent, Operation::Modulo),
    ],
];

/// Why an operator could not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An operand had a type the operator does not accept.
    InvalidOperand {
        op: Operation,
        expected: &'static str,
        found: &'static str,
    },
    /// The right-hand side of `/` or `%` was zero.
    DivisionByZero { op: Operation },
    /// The operator has no evaluation in this position, e.g. `!` used as a binary operator.
    NotImplemented { op: Operation },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::InvalidOperand {
                op,
                expected,
                found,
            } => write!(
                f,
                "Unsuitable value for {} operand: {} required, but have {}.",
                op, expected, found
            ),
            EvalError::DivisionByZero { op } => {
                write!(f, "Can't compute {} with a divisor of zero.", op)
            }
            EvalError::NotImplemented { op } => {
                write!(f, "The {} operator is not implemented here.", op)
            }
        }
    }
}

impl std::error::Error for EvalError {}

impl Operation {
    /// The operator's source symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::LogicalOr => "||",
            Operation::LogicalAnd => "&&",
            Operation::LogicalNot => "!",
            Operation::Equal => "==",
            Operation::NotEqual => "!=",
            Operation::GreaterThan => ">",
            Operation::GreaterThanOrEqual => ">=",
            Operation::LessThan => "<",
            Operation::LessThanOrEqual => "<=",
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
            Operation::Modulo => "%",
            Operation::Negate => "-",
        }
    }

    /// Find the binary operator at precedence `level` that `kind` spells.
    pub fn binary_at_level(level: usize, kind: TokenType) -> Option<Operation> {
        BINARY_OPS
            .get(level)?
            .iter()
            .find(|(tok, _)| *tok == kind)
            .map(|(_, op)| *op)
    }

    /// Apply this operator to two operands.
    ///
    /// Unknown operands produce an unknown result.
    pub fn eval_binary(self, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        if matches!(self, Operation::Equal | Operation::NotEqual) {
            if !lhs.is_known() || !rhs.is_known() {
                return Ok(Value::Unknown);
            }
            let equal = values_equal(lhs, rhs);
            return Ok(Value::Bool(if self == Operation::Equal { equal } else { !equal }));
        }

        match self {
            Operation::LogicalOr | Operation::LogicalAnd => {
                let l = self.bool_operand(lhs)?;
                let r = self.bool_operand(rhs)?;
                Ok(match (l, r) {
                    (Some(l), Some(r)) => Value::Bool(if self == Operation::LogicalOr {
                        l || r
                    } else {
                        l && r
                    }),
                    _ => Value::Unknown,
                })
            }
            Operation::GreaterThan
            | Operation::GreaterThanOrEqual
            | Operation::LessThan
            | Operation::LessThanOrEqual => {
                let (Some(l), Some(r)) = (self.number_operand(lhs)?, self.number_operand(rhs)?)
                else {
                    return Ok(Value::Unknown);
                };
                Ok(Value::Bool(match self {
                    Operation::GreaterThan => l > r,
                    Operation::GreaterThanOrEqual => l >= r,
                    Operation::LessThan => l < r,
                    _ => l <= r,
                }))
            }
            Operation::Add
            | Operation::Subtract
            | Operation::Multiply
            | Operation::Divide
            | Operation::Modulo => {
                let (Some(l), Some(r)) = (self.number_operand(lhs)?, self.number_operand(rhs)?)
                else {
                    return Ok(Value::Unknown);
                };
                let n = match self {
                    Operation::Add => l + r,
                    Operation::Subtract => l - r,
                    Operation::Multiply => l * r,
                    Operation::Divide if r == 0.0 => {
                        return Err(EvalError::DivisionByZero { op: self });
                    }
                    Operation::Divide => l / r,
                    Operation::Modulo if r == 0.0 => {
                        return Err(EvalError::DivisionByZero { op: self });
                    }
                    _ => l % r,
                };
                Ok(Value::Number(n))
            }
            _ => Err(EvalError::NotImplemented { op: self }),
        }
    }

    /// Apply this operator to a single operand.
    pub fn eval_unary(self, operand: &Value) -> Result<Value, EvalError> {
        match self {
            Operation::LogicalNot => Ok(match self.bool_operand(operand)? {
                Some(b) => Value::Bool(!b),
                None => Value::Unknown,
            }),
            Operation::Negate => Ok(match self.number_operand(operand)? {
                Some(n) => Value::Number(-n),
                None => Value::Unknown,
            }),
            _ => Err(EvalError::NotImplemented { op: self }),
        }
    }

    fn bool_operand(self, value: &Value) -> Result<Option<bool>, EvalError> {
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Unknown => Ok(None),
            other => Err(EvalError::InvalidOperand {
                op: self,
                expected: "bool",
                found: other.type_name(),
            }),
        }
    }

    fn number_operand(self, value: &Value) -> Result<Option<f64>, EvalError> {
        match value {
            Value::Number(n) => Ok(Some(*n)),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(EvalError::InvalidOperand {
                    op: self,
                    expected: "number",
                    found: "string",
                }),
            },
            Value::Unknown => Ok(None),
            other => Err(EvalError::InvalidOperand {
                op: self,
                expected: "number",
                found: other.type_name(),
            }),
        }
    }
}

/// Equality with the same automatic number/string conversion the arithmetic operators use.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().is_ok_and(|parsed| parsed == *n)
        }
        _ => lhs == rhs,
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_table_order() {
        assert_eq!(Operation::binary_at_level(0, TokenType::Or), Some(Operation::LogicalOr));
        assert_eq!(Operation::binary_at_level(4, TokenType::Minus), Some(Operation::Subtract));
        assert_eq!(Operation::binary_at_level(5, TokenType::Minus), None);
        assert_eq!(Operation::binary_at_level(6, TokenType::Star), None);
    }

    #[test]
    fn test_arithmetic() {
        let r = Operation::Subtract.eval_binary(&Value::from(5i64), &Value::from(3i64));
        assert_eq!(r, Ok(Value::Number(2.0)));
        let r = Operation::Add.eval_binary(&Value::from("2"), &Value::from(3i64));
        assert_eq!(r, Ok(Value::Number(5.0)));
        let r = Operation::Divide.eval_binary(&Value::from(1i64), &Value::from(0i64));
        assert_eq!(r, Err(EvalError::DivisionByZero { op: Operation::Divide }));
    }

    #[test]
    fn test_unknown_propagates() {
        let r = Operation::Multiply.eval_binary(&Value::Unknown, &Value::from(3i64));
        assert_eq!(r, Ok(Value::Unknown));
        assert_eq!(Operation::LogicalNot.eval_unary(&Value::Unknown), Ok(Value::Unknown));
    }

    #[test]
    fn test_invalid_operand() {
        let err = Operation::LogicalAnd
            .eval_binary(&Value::Bool(true), &Value::from(1i64))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsuitable value for && operand: bool required, but have number."
        );
    }

    #[test]
    fn test_not_implemented_is_typed() {
        assert_eq!(
            Operation::LogicalNot.eval_binary(&Value::Bool(true), &Value::Bool(false)),
            Err(EvalError::NotImplemented { op: Operation::LogicalNot })
        );
        assert_eq!(
            Operation::Add.eval_unary(&Value::from(1i64)),
            Err(EvalError::NotImplemented { op: Operation::Add })
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            Operation::Equal.eval_binary(&Value::from("a"), &Value::from("a")),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            Operation::NotEqual.eval_binary(&Value::from(1i64), &Value::Null),
            Ok(Value::Bool(true))
        );
    }
}
