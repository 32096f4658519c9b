//! Lowering: structured bound tree to a flat statement list.
//!
//! The lowerer rewrites compound assignments into plain assignments,
//! desugars `if` and `while` into labels and gotos, appends the implicit
//! `return` a script body ends with, and drops statements the
//! [`ControlFlowGraph`] proves unreachable.

use crate::bound::{
    BoundBlockStatement, BoundExpression, BoundExpressionKind, BoundStatement,
    BoundStatementKind,
};
use crate::control_flow::ControlFlowGraph;
use crate::span::TextSpan;
use crate::symbol::LabelSymbol;

/// Lowers a bound body. Never reports diagnostics; binding has already
/// validated the tree.
pub fn lower(body: &BoundStatement) -> BoundBlockStatement {
    lower_analyzed(body).0
}

/// Like [`lower`], additionally returning the statements dead-code
/// removal dropped, so the caller can warn about unreachable user code.
pub fn lower_analyzed(body: &BoundStatement) -> (BoundBlockStatement, Vec<BoundStatement>) {
    let mut lowerer = Lowerer {
        statements: Vec::new(),
        label_counter: 0,
    };
    lowerer.lower_statement(body);

    let end_span = TextSpan::from_bounds(body.span.end, body.span.end);
    let needs_return = !matches!(
        lowerer.statements.last().map(|s| &s.kind),
        Some(BoundStatementKind::Return)
    );
    if needs_return {
        lowerer
            .statements
            .push(BoundStatement::new(BoundStatementKind::Return, end_span));
    }

    let graph = ControlFlowGraph::build(&lowerer.statements);
    let reachable = graph.reachable(lowerer.statements.len());
    let mut kept = Vec::with_capacity(lowerer.statements.len());
    let mut removed = Vec::new();
    for (statement, is_reachable) in lowerer.statements.into_iter().zip(reachable) {
        if is_reachable {
            kept.push(statement);
        } else if matters_to_user(&statement) {
            removed.push(statement);
        }
    }
    (BoundBlockStatement { statements: kept }, removed)
}

/// Removed labels, nops and desugaring gotos are compiler artifacts and
/// not worth a warning. The implicit trailing return is zero-width and
/// filtered by the same rule as other synthetic statements.
fn matters_to_user(statement: &BoundStatement) -> bool {
    match &statement.kind {
        BoundStatementKind::Label(_) | BoundStatementKind::Nop => false,
        BoundStatementKind::Return => !statement.span.is_empty(),
        _ => true,
    }
}

struct Lowerer {
    statements: Vec<BoundStatement>,
    label_counter: u32,
}

impl Lowerer {
    fn next_label(&mut self) -> LabelSymbol {
        let label = LabelSymbol::new(format!("Label{}", self.label_counter));
        self.label_counter += 1;
        label
    }

    fn emit(&mut self, kind: BoundStatementKind, span: TextSpan) {
        self.statements.push(BoundStatement::new(kind, span));
    }

    fn lower_statement(&mut self, statement: &BoundStatement) {
        let span = statement.span;
        match &statement.kind {
            BoundStatementKind::Block(statements) => {
                for statement in statements {
                    self.lower_statement(statement);
                }
            }
            BoundStatementKind::CompoundAssignment {
                target,
                operator,
                value,
            } => {
                // `x op= v` becomes `x = x op v`.
                let target_ty = target.ty;
                let variable = BoundExpression::new(
                    BoundExpressionKind::Variable(target.clone()),
                    target_ty,
                    span,
                );
                let combined = BoundExpression::new(
                    BoundExpressionKind::Binary {
                        operator: *operator,
                        left: Box::new(variable),
                        right: Box::new(value.clone()),
                    },
                    operator
                        .result_type(target_ty, value.ty)
                        .unwrap_or(target_ty),
                    value.span,
                );
                self.emit(
                    BoundStatementKind::Assignment {
                        target: target.clone(),
                        value: combined,
                    },
                    span,
                );
            }
            BoundStatementKind::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => match else_branch {
                None => {
                    // jump-unless condition to end
                    let end_label = self.next_label();
                    self.emit(
                        BoundStatementKind::ConditionalGoto {
                            label: end_label.clone(),
                            condition: condition.clone(),
                            jump_if: false,
                        },
                        condition.span,
                    );
                    self.lower_statement(then_branch);
                    self.emit(BoundStatementKind::Label(end_label), span);
                }
                Some(else_branch) => {
                    let else_label = self.next_label();
                    let end_label = self.next_label();
                    self.emit(
                        BoundStatementKind::ConditionalGoto {
                            label: else_label.clone(),
                            condition: condition.clone(),
                            jump_if: false,
                        },
                        condition.span,
                    );
                    self.lower_statement(then_branch);
                    self.emit(BoundStatementKind::Goto(end_label.clone()), span);
                    self.emit(BoundStatementKind::Label(else_label), span);
                    self.lower_statement(else_branch);
                    self.emit(BoundStatementKind::Label(end_label), span);
                }
            },
            BoundStatementKind::While {
                condition,
                body,
                break_label,
                continue_label,
                ..
            } => {
                // Check-first shape: jump to the condition, loop back from
                // it while true.
                //
                //   goto continue
                //   body:
                //     <body>
                //   continue:
                //     jump-if condition to body
                //   break:
                let body_label = self.next_label();
                self.emit(BoundStatementKind::Goto(continue_label.clone()), span);
                self.emit(BoundStatementKind::Label(body_label.clone()), span);
                self.lower_statement(body);
                self.emit(BoundStatementKind::Label(continue_label.clone()), span);
                self.emit(
                    BoundStatementKind::ConditionalGoto {
                        label: body_label,
                        condition: condition.clone(),
                        jump_if: true,
                    },
                    condition.span,
                );
                self.emit(BoundStatementKind::Label(break_label.clone()), span);
            }
            BoundStatementKind::VariableDeclaration { .. }
            | BoundStatementKind::Assignment { .. }
            | BoundStatementKind::Label(_)
            | BoundStatementKind::Goto(_)
            | BoundStatementKind::ConditionalGoto { .. }
            | BoundStatementKind::Return
            | BoundStatementKind::Expression(_)
            | BoundStatementKind::Nop => {
                self.statements.push(statement.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::parser::parse;
    use crate::source::SourceText;

    fn lower_source(text: &str) -> BoundBlockStatement {
        let source = SourceText::new(text);
        let (program, parse_diagnostics) = parse(std::rc::Rc::clone(&source));
        assert!(parse_diagnostics.is_empty());
        let result = bind(&program, source);
        assert!(
            !result.diagnostics.has_errors(),
            "bind diagnostics: {:?}",
            result
                .diagnostics
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        lower(&result.body)
    }

    fn kinds(block: &BoundBlockStatement) -> Vec<&'static str> {
        block
            .statements
            .iter()
            .map(|s| match &s.kind {
                BoundStatementKind::VariableDeclaration { .. } => "decl",
                BoundStatementKind::Assignment { .. } => "assign",
                BoundStatementKind::Label(_) => "label",
                BoundStatementKind::Goto(_) => "goto",
                BoundStatementKind::ConditionalGoto { .. } => "cgoto",
                BoundStatementKind::Return => "return",
                BoundStatementKind::Expression(_) => "expr",
                BoundStatementKind::Nop => "nop",
                other => panic!("structured statement survived lowering: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn flat_body_gains_an_implicit_return() {
        let block = lower_source("number x = 1");
        assert_eq!(kinds(&block), vec!["decl", "return"]);
    }

    #[test]
    fn explicit_trailing_return_is_not_duplicated() {
        let block = lower_source("number x = 1\nreturn");
        assert_eq!(kinds(&block), vec!["decl", "return"]);
    }

    #[test]
    fn compound_assignment_becomes_plain_assignment() {
        let block = lower_source("number x = 1\nx += 2");
        let BoundStatementKind::Assignment { value, .. } = &block.statements[1].kind else {
            panic!("expected assignment, got {:?}", block.statements[1].kind);
        };
        assert!(matches!(value.kind, BoundExpressionKind::Binary { .. }));
    }

    #[test]
    fn if_without_else_lowers_to_conditional_goto() {
        let block = lower_source("number x = 1\nif x > 0 { x = 2 }");
        assert_eq!(
            kinds(&block),
            vec!["decl", "cgoto", "assign", "label", "return"]
        );
        let BoundStatementKind::ConditionalGoto { jump_if, .. } = &block.statements[1].kind
        else {
            panic!("expected conditional goto");
        };
        assert!(!jump_if);
    }

    #[test]
    fn if_else_lowers_to_two_labels() {
        let block = lower_source("number x = 1\nif x > 0 { x = 2 } else { x = 3 }");
        assert_eq!(
            kinds(&block),
            vec![
                "decl", "cgoto", "assign", "goto", "label", "assign", "label", "return"
            ]
        );
    }

    #[test]
    fn while_lowers_to_check_first_loop() {
        let block = lower_source("number x = 0\nwhile x < 3 { x += 1 }");
        assert_eq!(
            kinds(&block),
            vec![
                "decl", "goto", "label", "assign", "label", "cgoto", "label", "return"
            ]
        );
        let BoundStatementKind::ConditionalGoto { jump_if, .. } = &block.statements[5].kind
        else {
            panic!("expected conditional goto");
        };
        assert!(jump_if);
    }

    #[test]
    fn break_becomes_goto_past_the_loop() {
        let block = lower_source("number x = 0\nwhile x < 3 { break\nx = 9 }");
        let removed_assignment = block.statements.iter().any(|s| {
            matches!(&s.kind, BoundStatementKind::Assignment { value, .. }
                if value.constant_value() == Some(crate::types::ConstantValue::Number(9.0)))
        });
        assert!(!removed_assignment, "statement after break should be dead");
    }

    #[test]
    fn unreachable_statements_are_reported_back() {
        let source = SourceText::new("return\nnumber x = 1");
        let (program, _) = parse(std::rc::Rc::clone(&source));
        let result = bind(&program, source);
        let (block, removed) = lower_analyzed(&result.body);
        assert_eq!(removed.len(), 1);
        assert!(matches!(
            removed[0].kind,
            BoundStatementKind::VariableDeclaration { .. }
        ));
        assert_eq!(kinds(&block), vec!["return"]);
    }

    #[test]
    fn implicit_return_never_counts_as_removed() {
        let source = SourceText::new("while true { }");
        let (program, _) = parse(std::rc::Rc::clone(&source));
        let result = bind(&program, source);
        let (_, removed) = lower_analyzed(&result.body);
        // The loop never exits, so only synthetic statements die.
        assert!(removed.is_empty(), "removed: {removed:?}");
    }

    #[test]
    fn lowering_an_already_lowered_body_changes_nothing() {
        let lowered = lower_source(
            "number x = 0\n\
             while x < 3 {\n\
                 x += 1\n\
                 if x == 2 { inspect(x) } else { x += 2 }\n\
             }\n\
             inspect(x)",
        );
        let wrapped = BoundStatement::new(
            BoundStatementKind::Block(lowered.statements.clone()),
            TextSpan::new(0, 0),
        );
        assert_eq!(lower(&wrapped), lowered);
    }
}
