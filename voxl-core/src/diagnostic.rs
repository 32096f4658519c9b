//! Compiler diagnostics.
//!
//! User and source problems are reported, never thrown: every phase keeps
//! running and appends to the [`DiagnosticBag`], so one compile surfaces
//! many independent problems. The bag is insertion-ordered and never
//! deduplicated — test expectations rely on that order.
//!
//! Each reportable condition has exactly one `report_*` factory so the
//! message template lives in one place and tests can assert on a
//! diagnostic kind by going through the same factory.

use core::fmt;
use std::rc::Rc;

use crate::bound::{BoundExpression, BoundStatement, BoundStatementKind};
use crate::source::{SourceText, TextLocation};
use crate::span::TextSpan;
use crate::types::{Type, WireType};

/// One error or warning, keyed by source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub is_error: bool,
    pub location: TextLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        !self.is_error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.is_error { "error" } else { "warning" };
        write!(f, "{severity} {}: {}", self.location, self.message)
    }
}

/// Append-only ordered collection of diagnostics for one compilation.
#[derive(Debug)]
pub struct DiagnosticBag {
    source: Rc<SourceText>,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new(source: Rc<SourceText>) -> DiagnosticBag {
        DiagnosticBag {
            source,
            diagnostics: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Append another bag's diagnostics, preserving their order.
    pub fn extend(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    fn location(&self, span: TextSpan) -> TextLocation {
        TextLocation::new(Rc::clone(&self.source), span)
    }

    fn report_error(&mut self, span: TextSpan, message: String) {
        self.diagnostics.push(Diagnostic {
            is_error: true,
            location: self.location(span),
            message,
        });
    }

    fn report_warning(&mut self, span: TextSpan, message: String) {
        self.diagnostics.push(Diagnostic {
            is_error: false,
            location: self.location(span),
            message,
        });
    }

    // --- lexical -----------------------------------------------------

    pub fn report_bad_character(&mut self, span: TextSpan, character: char) {
        self.report_error(span, format!("bad character '{character}' in input"));
    }

    pub fn report_invalid_number(&mut self, span: TextSpan, text: &str) {
        self.report_error(span, format!("'{text}' is not a valid number"));
    }

    pub fn report_unterminated_string(&mut self, span: TextSpan) {
        self.report_error(span, "unterminated string literal".to_string());
    }

    pub fn report_invalid_escape(&mut self, span: TextSpan, character: char) {
        self.report_error(span, format!("invalid escape sequence '\\{character}'"));
    }

    pub fn report_unterminated_comment(&mut self, span: TextSpan) {
        self.report_error(span, "unterminated block comment".to_string());
    }

    // --- syntax ------------------------------------------------------

    pub fn report_unexpected_token(&mut self, span: TextSpan, found: &str, expected: &str) {
        self.report_error(span, format!("unexpected {found}, expected {expected}"));
    }

    // --- binding -----------------------------------------------------

    pub fn report_undefined_variable(&mut self, span: TextSpan, name: &str) {
        self.report_error(span, format!("variable '{name}' is not defined"));
    }

    pub fn report_variable_already_declared(&mut self, span: TextSpan, name: &str) {
        self.report_error(span, format!("variable '{name}' is already declared"));
    }

    pub fn report_cannot_assign_read_only(&mut self, span: TextSpan, name: &str) {
        self.report_error(span, format!("variable '{name}' is read-only and cannot be assigned"));
    }

    pub fn report_type_mismatch(&mut self, span: TextSpan, expected: Type, found: Type) {
        self.report_error(span, format!("cannot convert type '{found}' to '{expected}'"));
    }

    pub fn report_undefined_unary_operator(&mut self, span: TextSpan, operator: &str, operand: Type) {
        self.report_error(
            span,
            format!("unary operator '{operator}' is not defined for type '{operand}'"),
        );
    }

    pub fn report_undefined_binary_operator(
        &mut self,
        span: TextSpan,
        operator: &str,
        left: Type,
        right: Type,
    ) {
        self.report_error(
            span,
            format!("binary operator '{operator}' is not defined for types '{left}' and '{right}'"),
        );
    }

    pub fn report_undefined_builtin(&mut self, span: TextSpan, name: &str) {
        self.report_error(span, format!("'{name}' is not a builtin function"));
    }

    pub fn report_wrong_argument_count(&mut self, span: TextSpan, name: &str, expected: usize, given: usize) {
        self.report_error(
            span,
            format!("builtin '{name}' expects {expected} arguments but received {given}"),
        );
    }

    pub fn report_name_too_long(&mut self, span: TextSpan, name: &str, max: usize) {
        self.report_error(
            span,
            format!("variable name '{name}' is longer than the limit of {max} characters"),
        );
    }

    pub fn report_conflicting_modifiers(&mut self, span: TextSpan, first: &str, second: &str) {
        self.report_error(
            span,
            format!("modifier '{first}' cannot be combined with '{second}'"),
        );
    }

    pub fn report_missing_initializer(&mut self, span: TextSpan, modifier: &str, name: &str) {
        self.report_error(
            span,
            format!("'{modifier}' variable '{name}' must be declared with an initializer"),
        );
    }

    pub fn report_nonconstant_initializer(&mut self, span: TextSpan, name: &str) {
        self.report_error(
            span,
            format!("'const' variable '{name}' requires a compile-time constant initializer"),
        );
    }

    pub fn report_invalid_expression_statement(&mut self, span: TextSpan) {
        self.report_error(
            span,
            "only builtin calls can be used as expression statements".to_string(),
        );
    }

    pub fn report_unknown_component(&mut self, span: TextSpan, name: &str) {
        self.report_error(
            span,
            format!("unknown component '{name}', expected 'x', 'y' or 'z'"),
        );
    }

    pub fn report_jump_outside_loop(&mut self, span: TextSpan, keyword: &str) {
        self.report_error(span, format!("'{keyword}' can only be used inside a loop"));
    }

    pub fn report_component_on_non_vector(&mut self, span: TextSpan, found: Type) {
        self.report_error(
            span,
            format!("component access requires a 'vec' or 'rot' value, found '{found}'"),
        );
    }

    // --- emission ----------------------------------------------------

    pub fn report_wire_split_limit(&mut self, span: TextSpan, name: &str, wire: WireType, limit: usize) {
        self.report_error(
            span,
            format!(
                "value '{name}' is read more than {limit} times and no '{wire}' passthrough block exists"
            ),
        );
    }

    // --- flow analysis -----------------------------------------------

    /// Unreachable-code warning pointed at the most meaningful part of the
    /// statement — the `if` keyword for an if, the declared name for a
    /// declaration, and so on. The match is deliberately exhaustive: a new
    /// statement shape must be added here or compilation of the compiler
    /// itself fails.
    pub fn report_unreachable_code(&mut self, statement: &BoundStatement) {
        let span = unreachable_span(statement);
        self.report_warning(span, "unreachable code detected".to_string());
    }
}

fn unreachable_span(statement: &BoundStatement) -> TextSpan {
    match &statement.kind {
        BoundStatementKind::Block(statements) => match statements.first() {
            Some(first) => unreachable_span(first),
            None => statement.span,
        },
        BoundStatementKind::VariableDeclaration { name_span, .. } => *name_span,
        BoundStatementKind::Assignment { value, .. } => {
            TextSpan::union(statement.span, expression_span(value))
        }
        BoundStatementKind::CompoundAssignment { value, .. } => {
            TextSpan::union(statement.span, expression_span(value))
        }
        BoundStatementKind::If { keyword_span, .. } => *keyword_span,
        BoundStatementKind::While { keyword_span, .. } => *keyword_span,
        BoundStatementKind::Label(_) => statement.span,
        BoundStatementKind::Goto(_) => statement.span,
        BoundStatementKind::ConditionalGoto { condition, .. } => expression_span(condition),
        BoundStatementKind::Return => statement.span,
        BoundStatementKind::Expression(expression) => expression_span(expression),
        BoundStatementKind::Nop => statement.span,
    }
}

fn expression_span(expression: &BoundExpression) -> TextSpan {
    expression.span
}
