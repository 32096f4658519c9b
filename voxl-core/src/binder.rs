//! Binder: surface syntax to typed bound tree.
//!
//! Resolves names against a scope stack, assigns types, folds constants
//! for `const` declarations, and rewrites `break`/`continue` into gotos
//! targeting labels created on the enclosing loop. All problems become
//! diagnostics; the binder always produces a tree, with [`Type::Error`]
//! nodes suppressing cascades.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{
    Expression, ExpressionKind, Ident, ModifierKeyword, Program, Statement, StatementKind,
};
use crate::bound::{
    Axis, BinaryOperator, BoundExpression, BoundExpressionKind, BoundStatement,
    BoundStatementKind, UnaryOperator,
};
use crate::builtins::{BuiltinKind, find_builtin};
use crate::diagnostic::DiagnosticBag;
use crate::source::SourceText;
use crate::span::TextSpan;
use crate::symbol::{
    FunctionSymbol, LabelSymbol, MAX_RESULT_NAME_LEN, Modifiers, VariableKind, VariableSymbol,
};
use crate::types::{ConstantValue, Type};

/// Result of binding one script.
#[derive(Debug)]
pub struct BindResult {
    pub function: FunctionSymbol,
    /// A block statement covering the whole script body.
    pub body: BoundStatement,
    pub diagnostics: DiagnosticBag,
}

pub fn bind(program: &Program, source: Rc<SourceText>) -> BindResult {
    let span = program
        .statements
        .first()
        .map(|first| {
            let last = program.statements.last().expect("nonempty");
            TextSpan::union(first.span, last.span)
        })
        .unwrap_or(TextSpan::from_bounds(0, 0));

    let mut binder = Binder {
        scopes: vec![HashMap::new()],
        loop_labels: Vec::new(),
        label_counter: 0,
        diagnostics: DiagnosticBag::new(source),
    };
    let statements = program
        .statements
        .iter()
        .map(|s| binder.bind_statement(s))
        .collect();
    BindResult {
        function: FunctionSymbol::script_main(),
        body: BoundStatement::new(BoundStatementKind::Block(statements), span),
        diagnostics: binder.diagnostics,
    }
}

struct Binder {
    scopes: Vec<HashMap<String, Rc<VariableSymbol>>>,
    /// `(break_label, continue_label)` per enclosing loop.
    loop_labels: Vec<(LabelSymbol, LabelSymbol)>,
    label_counter: u32,
    diagnostics: DiagnosticBag,
}

impl Binder {
    fn bind_statement(&mut self, statement: &Statement) -> BoundStatement {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Block(statements) => {
                self.scopes.push(HashMap::new());
                let bound = statements.iter().map(|s| self.bind_statement(s)).collect();
                self.scopes.pop();
                BoundStatement::new(BoundStatementKind::Block(bound), span)
            }
            StatementKind::VariableDeclaration {
                modifiers,
                type_name,
                name,
                initializer,
            } => self.bind_variable_declaration(span, modifiers, type_name.ty, name, initializer),
            StatementKind::Assignment { name, value } => self.bind_assignment(span, name, value),
            StatementKind::CompoundAssignment {
                name,
                operator,
                value,
            } => self.bind_compound_assignment(span, name, *operator, value),
            StatementKind::If {
                keyword_span,
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.bind_condition(condition);
                let then_branch = Box::new(self.bind_statement(then_branch));
                let else_branch = else_branch
                    .as_ref()
                    .map(|branch| Box::new(self.bind_statement(branch)));
                BoundStatement::new(
                    BoundStatementKind::If {
                        condition,
                        then_branch,
                        else_branch,
                        keyword_span: *keyword_span,
                    },
                    span,
                )
            }
            StatementKind::While {
                keyword_span,
                condition,
                body,
            } => {
                let condition = self.bind_condition(condition);
                let break_label = self.next_label("break");
                let continue_label = self.next_label("continue");
                self.loop_labels
                    .push((break_label.clone(), continue_label.clone()));
                let body = Box::new(self.bind_statement(body));
                self.loop_labels.pop();
                BoundStatement::new(
                    BoundStatementKind::While {
                        condition,
                        body,
                        break_label,
                        continue_label,
                        keyword_span: *keyword_span,
                    },
                    span,
                )
            }
            StatementKind::Break => match self.loop_labels.last() {
                Some((break_label, _)) => {
                    BoundStatement::new(BoundStatementKind::Goto(break_label.clone()), span)
                }
                None => {
                    self.diagnostics.report_jump_outside_loop(span, "break");
                    BoundStatement::nop(span)
                }
            },
            StatementKind::Continue => match self.loop_labels.last() {
                Some((_, continue_label)) => {
                    BoundStatement::new(BoundStatementKind::Goto(continue_label.clone()), span)
                }
                None => {
                    self.diagnostics.report_jump_outside_loop(span, "continue");
                    BoundStatement::nop(span)
                }
            },
            StatementKind::Return => BoundStatement::new(BoundStatementKind::Return, span),
            StatementKind::Expression(expression) => {
                let bound = self.bind_expression(expression);
                let valid = matches!(bound.kind, BoundExpressionKind::Call { .. })
                    || bound.ty.is_error();
                if !valid {
                    self.diagnostics.report_invalid_expression_statement(span);
                }
                BoundStatement::new(BoundStatementKind::Expression(bound), span)
            }
        }
    }

    fn bind_variable_declaration(
        &mut self,
        span: TextSpan,
        modifiers: &[(ModifierKeyword, TextSpan)],
        ty: Type,
        name: &Ident,
        initializer: &Option<Expression>,
    ) -> BoundStatement {
        let modifier_set = self.bind_modifiers(modifiers);
        if name.name.len() > MAX_RESULT_NAME_LEN {
            self.diagnostics
                .report_name_too_long(name.span, &name.name, MAX_RESULT_NAME_LEN);
        }

        let kind = if name.name == "_" {
            VariableKind::Null
        } else {
            VariableKind::User
        };
        let symbol = Rc::new(VariableSymbol::new(name.name.clone(), kind, modifier_set, ty));

        let bound_initializer = initializer.as_ref().map(|init| {
            let bound = self.bind_converted(init, ty);
            symbol.mark_initialized();
            bound
        });

        if symbol.is_constant() || symbol.is_inline() {
            if bound_initializer.is_none() {
                let modifier = if symbol.is_constant() { "const" } else { "inline" };
                self.diagnostics
                    .report_missing_initializer(name.span, modifier, &name.name);
            }
        }
        if symbol.is_constant() {
            if let Some(init) = &bound_initializer {
                match fold_constant(init) {
                    Some(value) => symbol.set_constant_value(value),
                    None => {
                        self.diagnostics
                            .report_nonconstant_initializer(init.span, &name.name);
                    }
                }
            }
        }

        let scope = self.scopes.last_mut().expect("at least one scope");
        if kind != VariableKind::Null && scope.contains_key(&name.name) {
            self.diagnostics
                .report_variable_already_declared(name.span, &name.name);
        } else if kind != VariableKind::Null {
            scope.insert(name.name.clone(), Rc::clone(&symbol));
        }

        BoundStatement::new(
            BoundStatementKind::VariableDeclaration {
                symbol,
                initializer: bound_initializer,
                name_span: name.span,
            },
            span,
        )
    }

    fn bind_modifiers(&mut self, modifiers: &[(ModifierKeyword, TextSpan)]) -> Modifiers {
        let mut set = Modifiers::empty();
        for (keyword, span) in modifiers {
            let bit = match keyword {
                ModifierKeyword::Global => Modifiers::GLOBAL,
                ModifierKeyword::Saved => Modifiers::SAVED,
                ModifierKeyword::Const => Modifiers::CONSTANT,
                ModifierKeyword::Readonly => Modifiers::READONLY,
                ModifierKeyword::Inline => Modifiers::INLINE,
            };
            match set.with(bit).validate() {
                Ok(validated) => set = validated,
                Err(conflict) => {
                    self.diagnostics
                        .report_conflicting_modifiers(*span, conflict.first, conflict.second);
                }
            }
        }
        set
    }

    fn bind_assignment(&mut self, span: TextSpan, name: &Ident, value: &Expression) -> BoundStatement {
        let Some(target) = self.resolve(name) else {
            // Still bind the value so its own errors surface.
            let _ = self.bind_expression(value);
            return BoundStatement::nop(span);
        };
        if target.is_read_only() && target.is_initialized() {
            self.diagnostics
                .report_cannot_assign_read_only(name.span, &name.name);
        }
        let value = self.bind_converted(value, target.ty);
        target.mark_initialized();
        BoundStatement::new(BoundStatementKind::Assignment { target, value }, span)
    }

    fn bind_compound_assignment(
        &mut self,
        span: TextSpan,
        name: &Ident,
        operator: BinaryOperator,
        value: &Expression,
    ) -> BoundStatement {
        let Some(target) = self.resolve(name) else {
            let _ = self.bind_expression(value);
            return BoundStatement::nop(span);
        };
        if target.is_read_only() && target.is_initialized() {
            self.diagnostics
                .report_cannot_assign_read_only(name.span, &name.name);
        }
        let value = self.bind_expression(value);
        if !target.ty.is_error() && !value.ty.is_error() {
            match operator.result_type(target.ty, value.ty) {
                Some(result) if result == target.ty => {}
                _ => self.diagnostics.report_undefined_binary_operator(
                    span,
                    operator.token_text(),
                    target.ty,
                    value.ty,
                ),
            }
        }
        BoundStatement::new(
            BoundStatementKind::CompoundAssignment {
                target,
                operator,
                value,
            },
            span,
        )
    }

    fn bind_condition(&mut self, expression: &Expression) -> BoundExpression {
        self.bind_converted(expression, Type::Bool)
    }

    /// Bind and require a target type, reporting a mismatch otherwise.
    fn bind_converted(&mut self, expression: &Expression, target: Type) -> BoundExpression {
        let bound = self.bind_expression(expression);
        if !bound.ty.is_error() && !target.is_error() && bound.ty != target {
            self.diagnostics
                .report_type_mismatch(bound.span, target, bound.ty);
        }
        bound
    }

    fn bind_expression(&mut self, expression: &Expression) -> BoundExpression {
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::NumberLiteral(value) => BoundExpression::new(
                BoundExpressionKind::Literal(ConstantValue::Number(*value)),
                Type::Number,
                span,
            ),
            ExpressionKind::BoolLiteral(value) => BoundExpression::new(
                BoundExpressionKind::Literal(ConstantValue::Bool(*value)),
                Type::Bool,
                span,
            ),
            ExpressionKind::Name(name) => {
                let ident = Ident {
                    name: name.clone(),
                    span,
                };
                match self.resolve(&ident) {
                    Some(symbol) => {
                        let ty = symbol.ty;
                        BoundExpression::new(BoundExpressionKind::Variable(symbol), ty, span)
                    }
                    None => BoundExpression::error(span),
                }
            }
            ExpressionKind::Unary { operator, operand } => {
                let operand = self.bind_expression(operand);
                if operand.ty.is_error() {
                    return BoundExpression::error(span);
                }
                match operator.result_type(operand.ty) {
                    Some(ty) => BoundExpression::new(
                        BoundExpressionKind::Unary {
                            operator: *operator,
                            operand: Box::new(operand),
                        },
                        ty,
                        span,
                    ),
                    None => {
                        self.diagnostics.report_undefined_unary_operator(
                            span,
                            operator.token_text(),
                            operand.ty,
                        );
                        BoundExpression::error(span)
                    }
                }
            }
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.bind_expression(left);
                let right = self.bind_expression(right);
                if left.ty.is_error() || right.ty.is_error() {
                    return BoundExpression::error(span);
                }
                match operator.result_type(left.ty, right.ty) {
                    Some(ty) => BoundExpression::new(
                        BoundExpressionKind::Binary {
                            operator: *operator,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        ty,
                        span,
                    ),
                    None => {
                        self.diagnostics.report_undefined_binary_operator(
                            span,
                            operator.token_text(),
                            left.ty,
                            right.ty,
                        );
                        BoundExpression::error(span)
                    }
                }
            }
            ExpressionKind::Call { callee, arguments } => self.bind_call(span, callee, arguments),
            ExpressionKind::ComponentAccess { base, component } => {
                let base = self.bind_expression(base);
                if base.ty.is_error() {
                    return BoundExpression::error(span);
                }
                if !matches!(base.ty, Type::Vector | Type::Rotation) {
                    self.diagnostics
                        .report_component_on_non_vector(base.span, base.ty);
                    return BoundExpression::error(span);
                }
                let axis = match component.name.as_str() {
                    "x" => Axis::X,
                    "y" => Axis::Y,
                    "z" => Axis::Z,
                    other => {
                        self.diagnostics
                            .report_unknown_component(component.span, other);
                        return BoundExpression::error(span);
                    }
                };
                BoundExpression::new(
                    BoundExpressionKind::ComponentAccess {
                        base: Box::new(base),
                        axis,
                    },
                    Type::Number,
                    span,
                )
            }
            ExpressionKind::Parenthesized(inner) => {
                let mut bound = self.bind_expression(inner);
                bound.span = span;
                bound
            }
            ExpressionKind::Error => BoundExpression::error(span),
        }
    }

    fn bind_call(
        &mut self,
        span: TextSpan,
        callee: &Ident,
        arguments: &[Expression],
    ) -> BoundExpression {
        let Some(builtin) = find_builtin(&callee.name) else {
            self.diagnostics
                .report_undefined_builtin(callee.span, &callee.name);
            for argument in arguments {
                let _ = self.bind_expression(argument);
            }
            return BoundExpression::error(span);
        };

        if arguments.len() != builtin.params.len() {
            self.diagnostics.report_wrong_argument_count(
                span,
                builtin.name,
                builtin.params.len(),
                arguments.len(),
            );
            for argument in arguments {
                let _ = self.bind_expression(argument);
            }
            return BoundExpression::error(span);
        }

        let bound_arguments: Vec<BoundExpression> = if builtin.kind == BuiltinKind::Inspect {
            // Generic over its single operand: any wire-typed value works.
            let argument = self.bind_expression(&arguments[0]);
            if !argument.ty.is_error() && argument.ty.wire_type().is_none() {
                self.diagnostics
                    .report_type_mismatch(argument.span, Type::Number, argument.ty);
            }
            vec![argument]
        } else {
            arguments
                .iter()
                .zip(builtin.params)
                .map(|(argument, &param)| self.bind_converted(argument, param))
                .collect()
        };

        BoundExpression::new(
            BoundExpressionKind::Call {
                builtin,
                arguments: bound_arguments,
            },
            builtin.return_type,
            span,
        )
    }

    fn resolve(&mut self, name: &Ident) -> Option<Rc<VariableSymbol>> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.get(&name.name) {
                return Some(Rc::clone(symbol));
            }
        }
        self.diagnostics
            .report_undefined_variable(name.span, &name.name);
        None
    }

    fn next_label(&mut self, prefix: &str) -> LabelSymbol {
        let label = LabelSymbol::new(format!("{prefix}{}", self.label_counter));
        self.label_counter += 1;
        label
    }
}

/// Fold a bound expression to a compile-time constant, when possible.
/// Used for `const` declarations; non-foldable shapes return `None`.
pub fn fold_constant(expression: &BoundExpression) -> Option<ConstantValue> {
    match &expression.kind {
        BoundExpressionKind::Literal(value) => Some(*value),
        BoundExpressionKind::Variable(symbol) => symbol.constant_value(),
        BoundExpressionKind::Unary { operator, operand } => {
            let operand = fold_constant(operand)?;
            match (operator, operand) {
                (UnaryOperator::Negate, ConstantValue::Number(n)) => {
                    Some(ConstantValue::Number(-n))
                }
                (UnaryOperator::Negate, ConstantValue::Vector([x, y, z])) => {
                    Some(ConstantValue::Vector([-x, -y, -z]))
                }
                (UnaryOperator::Not, ConstantValue::Bool(b)) => Some(ConstantValue::Bool(!b)),
                _ => None,
            }
        }
        BoundExpressionKind::Binary {
            operator,
            left,
            right,
        } => {
            let left = fold_constant(left)?;
            let right = fold_constant(right)?;
            fold_binary(*operator, left, right)
        }
        BoundExpressionKind::Call { builtin, arguments } => {
            if builtin.kind != BuiltinKind::MakeVector && builtin.kind != BuiltinKind::MakeRotation
            {
                return None;
            }
            let mut components = [0.0f32; 3];
            for (slot, argument) in components.iter_mut().zip(arguments) {
                match fold_constant(argument)? {
                    ConstantValue::Number(n) => *slot = n,
                    _ => return None,
                }
            }
            if builtin.kind == BuiltinKind::MakeVector {
                Some(ConstantValue::Vector(components))
            } else {
                Some(ConstantValue::Rotation(components))
            }
        }
        BoundExpressionKind::ComponentAccess { base, axis } => match fold_constant(base)? {
            ConstantValue::Vector(components) | ConstantValue::Rotation(components) => {
                Some(ConstantValue::Number(components[axis.index()]))
            }
            _ => None,
        },
        BoundExpressionKind::Error => None,
    }
}

fn fold_binary(
    operator: BinaryOperator,
    left: ConstantValue,
    right: ConstantValue,
) -> Option<ConstantValue> {
    use BinaryOperator::*;
    use ConstantValue::*;
    match (left, right) {
        (Number(l), Number(r)) => match operator {
            Add => Some(Number(l + r)),
            Subtract => Some(Number(l - r)),
            Multiply => Some(Number(l * r)),
            Divide => Some(Number(l / r)),
            Modulo => Some(Number(l % r)),
            Equals => Some(Bool(l == r)),
            NotEquals => Some(Bool(l != r)),
            Less => Some(Bool(l < r)),
            LessOrEquals => Some(Bool(l <= r)),
            Greater => Some(Bool(l > r)),
            GreaterOrEquals => Some(Bool(l >= r)),
            And | Or => None,
        },
        (Bool(l), Bool(r)) => match operator {
            And => Some(Bool(l && r)),
            Or => Some(Bool(l || r)),
            Equals => Some(Bool(l == r)),
            NotEquals => Some(Bool(l != r)),
            _ => None,
        },
        (Vector(l), Vector(r)) => match operator {
            Add => Some(Vector([l[0] + r[0], l[1] + r[1], l[2] + r[2]])),
            Subtract => Some(Vector([l[0] - r[0], l[1] - r[1], l[2] - r[2]])),
            Equals => Some(Bool(l == r)),
            NotEquals => Some(Bool(l != r)),
            _ => None,
        },
        (Vector(l), Number(r)) => match operator {
            Multiply => Some(Vector([l[0] * r, l[1] * r, l[2] * r])),
            _ => None,
        },
        _ => None,
    }
}
