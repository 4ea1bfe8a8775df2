//! Integer expressions as they appear in operands and directives.

use super::ErrorKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    /// A label, equate or predefined constant
    Symbol(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "||" => Self::Or,
            "&&" => Self::And,
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::Less,
            ">" => Self::Greater,
            "<=" => Self::LessEqual,
            ">=" => Self::GreaterEqual,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            _ => return None,
        })
    }
}

/// Supplies values for symbols during evaluation.
pub trait Scope {
    fn resolve(&mut self, name: &str) -> Result<i64, ErrorKind>;
}

impl Expr {
    pub fn symbol(name: &str) -> Self {
        Self::Symbol(name.to_owned())
    }

    pub fn evaluate(&self, scope: &mut dyn Scope) -> Result<i64, ErrorKind> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Symbol(name) => scope.resolve(name),
            Self::Unary(op, operand) => {
                let value = operand.evaluate(scope)?;
                Ok(match op {
                    UnaryOp::Negate => value.wrapping_neg(),
                    UnaryOp::Plus => value,
                    UnaryOp::Not => i64::from(value == 0),
                })
            }
            Self::Binary(op, lhs, rhs) => {
                let lhs = lhs.evaluate(scope)?;
                let rhs = rhs.evaluate(scope)?;
                Ok(match op {
                    BinaryOp::Or => i64::from(lhs != 0 || rhs != 0),
                    BinaryOp::And => i64::from(lhs != 0 && rhs != 0),
                    BinaryOp::Equal => i64::from(lhs == rhs),
                    BinaryOp::NotEqual => i64::from(lhs != rhs),
                    BinaryOp::Less => i64::from(lhs < rhs),
                    BinaryOp::Greater => i64::from(lhs > rhs),
                    BinaryOp::LessEqual => i64::from(lhs <= rhs),
                    BinaryOp::GreaterEqual => i64::from(lhs >= rhs),
                    BinaryOp::Add => lhs.wrapping_add(rhs),
                    BinaryOp::Sub => lhs.wrapping_sub(rhs),
                    BinaryOp::Mul => lhs.wrapping_mul(rhs),
                    BinaryOp::Div if rhs == 0 => return Err(ErrorKind::DivideByZero),
                    BinaryOp::Div => lhs.wrapping_div(rhs),
                    BinaryOp::Rem if rhs == 0 => return Err(ErrorKind::DivideByZero),
                    BinaryOp::Rem => lhs.wrapping_rem(rhs),
                })
            }
        }
    }
}
