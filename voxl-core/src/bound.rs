//! Typed bound tree.
//!
//! The bound tree is the semantically-checked form the lowerer and emitter
//! consume: every expression carries its [`Type`] and resolved symbols.
//! Control flow exists in two shapes here: structured (`If`, `While`)
//! straight out of the binder, and flat (`Label`, `Goto`,
//! `ConditionalGoto`) after lowering.

use std::rc::Rc;

use crate::builtins::BuiltinDef;
use crate::span::TextSpan;
use crate::symbol::{LabelSymbol, VariableSymbol};
use crate::types::{ConstantValue, Type};

#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub kind: BoundStatementKind,
    pub span: TextSpan,
}

impl BoundStatement {
    pub fn new(kind: BoundStatementKind, span: TextSpan) -> BoundStatement {
        BoundStatement { kind, span }
    }

    pub fn nop(span: TextSpan) -> BoundStatement {
        BoundStatement::new(BoundStatementKind::Nop, span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundStatementKind {
    Block(Vec<BoundStatement>),
    VariableDeclaration {
        symbol: Rc<VariableSymbol>,
        initializer: Option<BoundExpression>,
        /// Span of the declared name, for unreachable-code reporting.
        name_span: TextSpan,
    },
    Assignment {
        target: Rc<VariableSymbol>,
        value: BoundExpression,
    },
    CompoundAssignment {
        target: Rc<VariableSymbol>,
        operator: BinaryOperator,
        value: BoundExpression,
    },
    If {
        condition: BoundExpression,
        then_branch: Box<BoundStatement>,
        else_branch: Option<Box<BoundStatement>>,
        keyword_span: TextSpan,
    },
    While {
        condition: BoundExpression,
        body: Box<BoundStatement>,
        break_label: LabelSymbol,
        continue_label: LabelSymbol,
        keyword_span: TextSpan,
    },
    Label(LabelSymbol),
    Goto(LabelSymbol),
    /// Jump to `label` when the condition matches `jump_if`.
    ConditionalGoto {
        label: LabelSymbol,
        condition: BoundExpression,
        jump_if: bool,
    },
    Return,
    Expression(BoundExpression),
    Nop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundBlockStatement {
    pub statements: Vec<BoundStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpression {
    pub kind: BoundExpressionKind,
    pub ty: Type,
    pub span: TextSpan,
}

impl BoundExpression {
    pub fn new(kind: BoundExpressionKind, ty: Type, span: TextSpan) -> BoundExpression {
        BoundExpression { kind, ty, span }
    }

    pub fn error(span: TextSpan) -> BoundExpression {
        BoundExpression::new(BoundExpressionKind::Error, Type::Error, span)
    }

    /// Compile-time value, when the expression folds to one.
    pub fn constant_value(&self) -> Option<ConstantValue> {
        match &self.kind {
            BoundExpressionKind::Literal(value) => Some(*value),
            BoundExpressionKind::Variable(symbol) => symbol.constant_value(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpressionKind {
    Literal(ConstantValue),
    Variable(Rc<VariableSymbol>),
    Unary {
        operator: UnaryOperator,
        operand: Box<BoundExpression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<BoundExpression>,
        right: Box<BoundExpression>,
    },
    Call {
        builtin: &'static BuiltinDef,
        arguments: Vec<BoundExpression>,
    },
    /// `.x` / `.y` / `.z` on a vector or rotation.
    ComponentAccess {
        base: Box<BoundExpression>,
        axis: Axis,
    },
    Error,
}

/// Component axis of a vector or rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl UnaryOperator {
    /// Result type for an operand type, or `None` when the operator does
    /// not apply.
    pub fn result_type(self, operand: Type) -> Option<Type> {
        match (self, operand) {
            (UnaryOperator::Negate, Type::Number) => Some(Type::Number),
            (UnaryOperator::Negate, Type::Vector) => Some(Type::Vector),
            (UnaryOperator::Not, Type::Bool) => Some(Type::Bool),
            _ => None,
        }
    }

    pub fn token_text(self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    Less,
    LessOrEquals,
    Greater,
    GreaterOrEquals,
    And,
    Or,
}

impl BinaryOperator {
    /// Result type for an operand pair, or `None` when the operator does
    /// not apply to these types.
    pub fn result_type(self, left: Type, right: Type) -> Option<Type> {
        use BinaryOperator::*;
        match self {
            Add | Subtract => match (left, right) {
                (Type::Number, Type::Number) => Some(Type::Number),
                (Type::Vector, Type::Vector) => Some(Type::Vector),
                _ => None,
            },
            Multiply => match (left, right) {
                (Type::Number, Type::Number) => Some(Type::Number),
                (Type::Vector, Type::Number) => Some(Type::Vector),
                _ => None,
            },
            Divide | Modulo => match (left, right) {
                (Type::Number, Type::Number) => Some(Type::Number),
                _ => None,
            },
            Less | LessOrEquals | Greater | GreaterOrEquals => match (left, right) {
                (Type::Number, Type::Number) => Some(Type::Bool),
                _ => None,
            },
            Equals | NotEquals => match (left, right) {
                (Type::Number, Type::Number) | (Type::Bool, Type::Bool) => Some(Type::Bool),
                (Type::Vector, Type::Vector) => Some(Type::Bool),
                _ => None,
            },
            And | Or => match (left, right) {
                (Type::Bool, Type::Bool) => Some(Type::Bool),
                _ => None,
            },
        }
    }

    pub fn token_text(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            Equals => "==",
            NotEquals => "!=",
            Less => "<",
            LessOrEquals => "<=",
            Greater => ">",
            GreaterOrEquals => ">=",
            And => "&&",
            Or => "||",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_operator_type_rules() {
        assert_eq!(
            BinaryOperator::Add.result_type(Type::Number, Type::Number),
            Some(Type::Number)
        );
        assert_eq!(
            BinaryOperator::Add.result_type(Type::Vector, Type::Vector),
            Some(Type::Vector)
        );
        assert_eq!(
            BinaryOperator::Less.result_type(Type::Number, Type::Number),
            Some(Type::Bool)
        );
        assert_eq!(BinaryOperator::And.result_type(Type::Number, Type::Bool), None);
        assert_eq!(
            BinaryOperator::Multiply.result_type(Type::Vector, Type::Number),
            Some(Type::Vector)
        );
    }

    #[test]
    fn unary_operator_type_rules() {
        assert_eq!(UnaryOperator::Negate.result_type(Type::Number), Some(Type::Number));
        assert_eq!(UnaryOperator::Not.result_type(Type::Bool), Some(Type::Bool));
        assert_eq!(UnaryOperator::Not.result_type(Type::Number), None);
    }

    #[test]
    fn literal_expressions_fold() {
        let lit = BoundExpression::new(
            BoundExpressionKind::Literal(ConstantValue::Number(2.0)),
            Type::Number,
            TextSpan::from_bounds(0, 1),
        );
        assert_eq!(lit.constant_value(), Some(ConstantValue::Number(2.0)));
    }
}
