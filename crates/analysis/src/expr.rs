//! Expression trees rebuilt from the operand stack.
//!
//! Rendering follows source-language precedence: a binary child is
//! parenthesised when it is itself binary with equal or lower precedence
//! than its parent, and a unary operand when it is binary.

use std::fmt;

use ncs_common::instruction::escape_string;
use ncs_common::ByteCode;

/// A constant pushed by CONSTI/CONSTF/CONSTS/CONSTO.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Float(f32),
    String(String),
    Object(i32),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Literal::Object(0) => f.write_str("OBJECT_SELF"),
            Literal::Object(1) => f.write_str("OBJECT_INVALID"),
            Literal::Object(v) => write!(f, "{v}"),
        }
    }
}

/// Two-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    /// Operator for a binary byte code.
    pub fn from_byte_code(code: ByteCode) -> Option<Self> {
        Some(match code {
            ByteCode::Mul => BinaryOp::Mul,
            ByteCode::Div => BinaryOp::Div,
            ByteCode::Mod => BinaryOp::Mod,
            ByteCode::Add => BinaryOp::Add,
            ByteCode::Sub => BinaryOp::Sub,
            ByteCode::ShLeft => BinaryOp::Shl,
            ByteCode::ShRight => BinaryOp::Shr,
            ByteCode::UShRight => BinaryOp::UShr,
            ByteCode::Lt => BinaryOp::Lt,
            ByteCode::Leq => BinaryOp::Le,
            ByteCode::Gt => BinaryOp::Gt,
            ByteCode::Geq => BinaryOp::Ge,
            ByteCode::Equal => BinaryOp::Eq,
            ByteCode::NEqual => BinaryOp::Ne,
            ByteCode::BoolAnd => BinaryOp::BitAnd,
            ByteCode::ExcOr => BinaryOp::BitXor,
            ByteCode::IncOr => BinaryOp::BitOr,
            ByteCode::LogAnd => BinaryOp::LogAnd,
            ByteCode::LogOr => BinaryOp::LogOr,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 10,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 8,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
            BinaryOp::Eq | BinaryOp::Ne => 6,
            BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => 5,
            BinaryOp::LogAnd | BinaryOp::LogOr => 4,
        }
    }
}

/// One-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Comp,
}

impl UnaryOp {
    pub fn from_byte_code(code: ByteCode) -> Option<Self> {
        match code {
            ByteCode::Neg => Some(UnaryOp::Neg),
            ByteCode::Not => Some(UnaryOp::Not),
            ByteCode::Comp => Some(UnaryOp::Comp),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Comp => "~",
        }
    }
}

/// A source-level expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Variable(String),
    FieldAccess {
        base: Box<Expression>,
        field: String,
    },
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            name: name.into(),
            args,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn field(base: Expression, field: impl Into<String>) -> Self {
        Expression::FieldAccess {
            base: Box::new(base),
            field: field.into(),
        }
    }

    pub fn int(value: i32) -> Self {
        Expression::Literal(Literal::Int(value))
    }

    /// Whether evaluating this expression may have side effects worth
    /// keeping as a statement when its value is discarded.
    pub fn has_call(&self) -> bool {
        match self {
            Expression::Call { .. } => true,
            Expression::Binary { left, right, .. } => left.has_call() || right.has_call(),
            Expression::Unary { operand, .. } => operand.has_call(),
            Expression::FieldAccess { base, .. } => base.has_call(),
            Expression::Literal(_) | Expression::Variable(_) => false,
        }
    }

    /// Logical negation, folding a leading `!`.
    pub fn negated(self) -> Self {
        match self {
            Expression::Unary {
                op: UnaryOp::Not,
                operand,
            } => *operand,
            other => Expression::unary(UnaryOp::Not, other),
        }
    }

    /// Whether the rendered text begins with `-`. Another `-` in front of
    /// it would read as a decrement.
    fn renders_with_minus(&self) -> bool {
        match self {
            Expression::Literal(Literal::Int(v)) => *v < 0,
            Expression::Literal(Literal::Float(v)) => v.is_sign_negative(),
            Expression::Literal(Literal::Object(v)) => *v < 0,
            Expression::Unary {
                op: UnaryOp::Neg, ..
            } => true,
            _ => false,
        }
    }

    fn precedence(&self) -> Option<u8> {
        match self {
            Expression::Binary { op, .. } => Some(op.precedence()),
            _ => None,
        }
    }
}

struct Child<'a> {
    expr: &'a Expression,
    parens: bool,
}

impl fmt::Display for Child<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parens {
            write!(f, "({})", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{lit}"),
            Expression::Binary { op, left, right } => {
                let (left, right): (&Expression, &Expression) = (left, right);
                let wrap = |child: &Expression| {
                    child
                        .precedence()
                        .is_some_and(|p| p <= op.precedence())
                };
                let left = Child {
                    expr: left,
                    parens: wrap(left),
                };
                let right = Child {
                    expr: right,
                    parens: wrap(right),
                };
                write!(f, "{left} {} {right}", op.symbol())
            }
            Expression::Unary { op, operand } => {
                let operand: &Expression = operand;
                let operand = Child {
                    expr: operand,
                    parens: operand.precedence().is_some()
                        || (*op == UnaryOp::Neg && operand.renders_with_minus()),
                };
                write!(f, "{}{operand}", op.symbol())
            }
            Expression::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expression::Variable(name) => f.write_str(name),
            Expression::FieldAccess { base, field } => write!(f, "{base}.{field}"),
        }
    }
}
