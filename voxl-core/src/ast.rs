//! Surface syntax tree.
//!
//! Untyped output of the parser. Operator enums are shared with the bound
//! tree — the parser already knows which operator a token stands for, and
//! the binder only adds types.

use crate::bound::{BinaryOperator, UnaryOperator};
use crate::span::TextSpan;
use crate::types::Type;

/// A whole script: the body of the implicit void `main`.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Identifier with its span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: TextSpan,
}

/// Declared type keyword with its span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeName {
    pub ty: Type,
    pub span: TextSpan,
}

/// Declaration modifier keyword with its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKeyword {
    Global,
    Saved,
    Const,
    Readonly,
    Inline,
}

impl ModifierKeyword {
    pub fn name(self) -> &'static str {
        match self {
            ModifierKeyword::Global => "global",
            ModifierKeyword::Saved => "saved",
            ModifierKeyword::Const => "const",
            ModifierKeyword::Readonly => "readonly",
            ModifierKeyword::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Block(Vec<Statement>),
    VariableDeclaration {
        modifiers: Vec<(ModifierKeyword, TextSpan)>,
        type_name: TypeName,
        name: Ident,
        initializer: Option<Expression>,
    },
    Assignment {
        name: Ident,
        value: Expression,
    },
    CompoundAssignment {
        name: Ident,
        operator: BinaryOperator,
        value: Expression,
    },
    If {
        keyword_span: TextSpan,
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        keyword_span: TextSpan,
        condition: Expression,
        body: Box<Statement>,
    },
    Break,
    Continue,
    Return,
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    NumberLiteral(f32),
    BoolLiteral(bool),
    Name(String),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Call {
        callee: Ident,
        arguments: Vec<Expression>,
    },
    ComponentAccess {
        base: Box<Expression>,
        component: Ident,
    },
    Parenthesized(Box<Expression>),
    /// Placeholder produced on parse errors so later phases see a node.
    Error,
}
