//! Recursive-descent parser.
//!
//! Consumes the full token stream up front (trivia and all) and builds a
//! [`Program`]. Parse errors report `unexpected token` diagnostics and
//! recover at statement boundaries; the parser always produces a tree,
//! erroneous or not.

use std::rc::Rc;

use crate::ast::{
    Expression, ExpressionKind, Ident, ModifierKeyword, Program, Statement, StatementKind, TypeName,
};
use crate::bound::{BinaryOperator, UnaryOperator};
use crate::diagnostic::DiagnosticBag;
use crate::lexer::{Token, TokenKind, TokenValue, lex_all};
use crate::source::SourceText;
use crate::span::TextSpan;
use crate::types::Type;

/// Parse a whole source text. The returned bag carries lexer diagnostics
/// first, then parser diagnostics, in discovery order.
pub fn parse(source: Rc<SourceText>) -> (Program, DiagnosticBag) {
    let (tokens, mut diagnostics) = lex_all(Rc::clone(&source));
    let mut parser = Parser {
        tokens,
        position: 0,
        diagnostics: DiagnosticBag::new(source),
    };
    let program = parser.parse_program();
    diagnostics.extend(parser.diagnostics);
    (program, diagnostics)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    diagnostics: DiagnosticBag,
}

impl Parser {
    fn current(&self) -> &Token {
        // lex_all always ends with an EndOfFile token.
        self.tokens.get(self.position).unwrap_or_else(|| {
            self.tokens.last().expect("token stream is never empty")
        })
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.position + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EndOfFile)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    /// Consume the expected kind, or report and fabricate a missing token
    /// without advancing so the caller can keep going.
    fn match_token(&mut self, kind: TokenKind) -> Token {
        if self.current().kind == kind {
            return self.advance();
        }
        let current = self.current().clone();
        self.diagnostics.report_unexpected_token(
            current.span,
            current.kind.description(),
            kind.description(),
        );
        Token {
            kind,
            span: TextSpan::from_bounds(current.span.start, current.span.start),
            text: String::new(),
            value: None,
            leading_trivia: Vec::new(),
            trailing_trivia: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while self.current().kind != TokenKind::EndOfFile {
            let before = self.position;
            statements.push(self.parse_statement());
            if self.position == before {
                // No progress: skip the offending token to guarantee
                // termination.
                self.advance();
            }
        }
        Program { statements }
    }

    fn parse_statement(&mut self) -> Statement {
        match self.current().kind {
            TokenKind::OpenBrace => self.parse_block_statement(),
            TokenKind::IfKeyword => self.parse_if_statement(),
            TokenKind::WhileKeyword => self.parse_while_statement(),
            TokenKind::BreakKeyword => {
                let token = self.advance();
                Statement {
                    kind: StatementKind::Break,
                    span: token.span,
                }
            }
            TokenKind::ContinueKeyword => {
                let token = self.advance();
                Statement {
                    kind: StatementKind::Continue,
                    span: token.span,
                }
            }
            TokenKind::ReturnKeyword => {
                let token = self.advance();
                Statement {
                    kind: StatementKind::Return,
                    span: token.span,
                }
            }
            kind if is_modifier(kind) || is_type_keyword(kind) => self.parse_variable_declaration(),
            TokenKind::Identifier => match self.peek_kind(1) {
                TokenKind::Equals => self.parse_assignment(),
                TokenKind::PlusEquals
                | TokenKind::MinusEquals
                | TokenKind::StarEquals
                | TokenKind::SlashEquals
                | TokenKind::PercentEquals => self.parse_compound_assignment(),
                _ => self.parse_expression_statement(),
            },
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block_statement(&mut self) -> Statement {
        let open = self.match_token(TokenKind::OpenBrace);
        let mut statements = Vec::new();
        while !matches!(
            self.current().kind,
            TokenKind::CloseBrace | TokenKind::EndOfFile
        ) {
            let before = self.position;
            statements.push(self.parse_statement());
            if self.position == before {
                self.advance();
            }
        }
        let close = self.match_token(TokenKind::CloseBrace);
        Statement {
            kind: StatementKind::Block(statements),
            span: TextSpan::union(open.span, close.span),
        }
    }

    fn parse_variable_declaration(&mut self) -> Statement {
        let start = self.current().span;
        let mut modifiers = Vec::new();
        while let Some(modifier) = modifier_keyword(self.current().kind) {
            let token = self.advance();
            modifiers.push((modifier, token.span));
        }
        let type_token = if is_type_keyword(self.current().kind) {
            self.advance()
        } else {
            self.match_token(TokenKind::NumberKeyword)
        };
        let type_name = TypeName {
            ty: keyword_type(type_token.kind),
            span: type_token.span,
        };
        let name_token = self.match_token(TokenKind::Identifier);
        let name = Ident {
            name: name_token.text.clone(),
            span: name_token.span,
        };
        let initializer = if self.current().kind == TokenKind::Equals {
            self.advance();
            Some(self.parse_expression())
        } else {
            None
        };
        let end = initializer
            .as_ref()
            .map(|e| e.span)
            .unwrap_or(name_token.span);
        Statement {
            kind: StatementKind::VariableDeclaration {
                modifiers,
                type_name,
                name,
                initializer,
            },
            span: TextSpan::union(start, end),
        }
    }

    fn parse_assignment(&mut self) -> Statement {
        let name_token = self.advance();
        let name = Ident {
            name: name_token.text.clone(),
            span: name_token.span,
        };
        self.match_token(TokenKind::Equals);
        let value = self.parse_expression();
        let span = TextSpan::union(name_token.span, value.span);
        Statement {
            kind: StatementKind::Assignment { name, value },
            span,
        }
    }

    fn parse_compound_assignment(&mut self) -> Statement {
        let name_token = self.advance();
        let name = Ident {
            name: name_token.text.clone(),
            span: name_token.span,
        };
        let operator_token = self.advance();
        let operator = match operator_token.kind {
            TokenKind::PlusEquals => BinaryOperator::Add,
            TokenKind::MinusEquals => BinaryOperator::Subtract,
            TokenKind::StarEquals => BinaryOperator::Multiply,
            TokenKind::SlashEquals => BinaryOperator::Divide,
            TokenKind::PercentEquals => BinaryOperator::Modulo,
            kind => unreachable!("compound assignment on non-compound token {kind:?}"),
        };
        let value = self.parse_expression();
        let span = TextSpan::union(name_token.span, value.span);
        Statement {
            kind: StatementKind::CompoundAssignment {
                name,
                operator,
                value,
            },
            span,
        }
    }

    fn parse_if_statement(&mut self) -> Statement {
        let keyword = self.match_token(TokenKind::IfKeyword);
        let condition = self.parse_expression();
        let then_branch = Box::new(self.parse_block_statement());
        let else_branch = if self.current().kind == TokenKind::ElseKeyword {
            self.advance();
            let branch = if self.current().kind == TokenKind::IfKeyword {
                self.parse_if_statement()
            } else {
                self.parse_block_statement()
            };
            Some(Box::new(branch))
        } else {
            None
        };
        let end = else_branch
            .as_ref()
            .map(|s| s.span)
            .unwrap_or(then_branch.span);
        Statement {
            kind: StatementKind::If {
                keyword_span: keyword.span,
                condition,
                then_branch,
                else_branch,
            },
            span: TextSpan::union(keyword.span, end),
        }
    }

    fn parse_while_statement(&mut self) -> Statement {
        let keyword = self.match_token(TokenKind::WhileKeyword);
        let condition = self.parse_expression();
        let body = Box::new(self.parse_block_statement());
        let span = TextSpan::union(keyword.span, body.span);
        Statement {
            kind: StatementKind::While {
                keyword_span: keyword.span,
                condition,
                body,
            },
            span,
        }
    }

    fn parse_expression_statement(&mut self) -> Statement {
        let expression = self.parse_expression();
        let span = expression.span;
        Statement {
            kind: StatementKind::Expression(expression),
            span,
        }
    }

    fn parse_expression(&mut self) -> Expression {
        self.parse_binary_expression(0)
    }

    fn parse_binary_expression(&mut self, parent_precedence: u8) -> Expression {
        let mut left = if let Some(operator) = unary_operator(self.current().kind) {
            let operator_token = self.advance();
            let operand = self.parse_binary_expression(UNARY_PRECEDENCE);
            let span = TextSpan::union(operator_token.span, operand.span);
            Expression {
                kind: ExpressionKind::Unary {
                    operator,
                    operand: Box::new(operand),
                },
                span,
            }
        } else {
            self.parse_postfix_expression()
        };

        loop {
            let Some((operator, precedence)) = binary_operator(self.current().kind) else {
                break;
            };
            if precedence <= parent_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary_expression(precedence);
            let span = TextSpan::union(left.span, right.span);
            left = Expression {
                kind: ExpressionKind::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        left
    }

    fn parse_postfix_expression(&mut self) -> Expression {
        let mut expression = self.parse_primary_expression();
        while self.current().kind == TokenKind::Dot {
            self.advance();
            let component_token = self.match_token(TokenKind::Identifier);
            let span = TextSpan::union(expression.span, component_token.span);
            expression = Expression {
                kind: ExpressionKind::ComponentAccess {
                    base: Box::new(expression),
                    component: Ident {
                        name: component_token.text.clone(),
                        span: component_token.span,
                    },
                },
                span,
            };
        }
        expression
    }

    fn parse_primary_expression(&mut self) -> Expression {
        match self.current().kind {
            TokenKind::OpenParen => {
                let open = self.advance();
                let inner = self.parse_expression();
                let close = self.match_token(TokenKind::CloseParen);
                Expression {
                    span: TextSpan::union(open.span, close.span),
                    kind: ExpressionKind::Parenthesized(Box::new(inner)),
                }
            }
            TokenKind::Number => {
                let token = self.advance();
                let value = match token.value {
                    Some(TokenValue::Number(value)) => value,
                    _ => 0.0,
                };
                Expression {
                    kind: ExpressionKind::NumberLiteral(value),
                    span: token.span,
                }
            }
            TokenKind::TrueKeyword | TokenKind::FalseKeyword => {
                let token = self.advance();
                let value = token.kind == TokenKind::TrueKeyword;
                Expression {
                    kind: ExpressionKind::BoolLiteral(value),
                    span: token.span,
                }
            }
            // `vec(...)` / `rot(...)` read as calls even though the names
            // are type keywords.
            TokenKind::Identifier | TokenKind::VecKeyword | TokenKind::RotKeyword => {
                let token = self.advance();
                if self.current().kind == TokenKind::OpenParen {
                    self.parse_call(token)
                } else {
                    Expression {
                        kind: ExpressionKind::Name(token.text.clone()),
                        span: token.span,
                    }
                }
            }
            _ => {
                let current = self.current().clone();
                self.diagnostics.report_unexpected_token(
                    current.span,
                    current.kind.description(),
                    "expression",
                );
                Expression {
                    kind: ExpressionKind::Error,
                    span: current.span,
                }
            }
        }
    }

    fn parse_call(&mut self, callee_token: Token) -> Expression {
        self.match_token(TokenKind::OpenParen);
        let mut arguments = Vec::new();
        if !matches!(
            self.current().kind,
            TokenKind::CloseParen | TokenKind::EndOfFile
        ) {
            arguments.push(self.parse_expression());
            while self.current().kind == TokenKind::Comma {
                self.advance();
                arguments.push(self.parse_expression());
            }
        }
        let close = self.match_token(TokenKind::CloseParen);
        Expression {
            span: TextSpan::union(callee_token.span, close.span),
            kind: ExpressionKind::Call {
                callee: Ident {
                    name: callee_token.text.clone(),
                    span: callee_token.span,
                },
                arguments,
            },
        }
    }
}

const UNARY_PRECEDENCE: u8 = 6;

fn unary_operator(kind: TokenKind) -> Option<UnaryOperator> {
    match kind {
        TokenKind::Minus => Some(UnaryOperator::Negate),
        TokenKind::Bang => Some(UnaryOperator::Not),
        _ => None,
    }
}

fn binary_operator(kind: TokenKind) -> Option<(BinaryOperator, u8)> {
    use BinaryOperator::*;
    match kind {
        TokenKind::Star => Some((Multiply, 5)),
        TokenKind::Slash => Some((Divide, 5)),
        TokenKind::Percent => Some((Modulo, 5)),
        TokenKind::Plus => Some((Add, 4)),
        TokenKind::Minus => Some((Subtract, 4)),
        TokenKind::Less => Some((Less, 3)),
        TokenKind::LessOrEquals => Some((LessOrEquals, 3)),
        TokenKind::Greater => Some((Greater, 3)),
        TokenKind::GreaterOrEquals => Some((GreaterOrEquals, 3)),
        TokenKind::EqualsEquals => Some((Equals, 2)),
        TokenKind::BangEquals => Some((NotEquals, 2)),
        TokenKind::AmpersandAmpersand => Some((And, 1)),
        TokenKind::PipePipe => Some((Or, 1)),
        _ => None,
    }
}

fn is_modifier(kind: TokenKind) -> bool {
    modifier_keyword(kind).is_some()
}

fn modifier_keyword(kind: TokenKind) -> Option<ModifierKeyword> {
    match kind {
        TokenKind::GlobalKeyword => Some(ModifierKeyword::Global),
        TokenKind::SavedKeyword => Some(ModifierKeyword::Saved),
        TokenKind::ConstKeyword => Some(ModifierKeyword::Const),
        TokenKind::ReadonlyKeyword => Some(ModifierKeyword::Readonly),
        TokenKind::InlineKeyword => Some(ModifierKeyword::Inline),
        _ => None,
    }
}

fn is_type_keyword(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::NumberKeyword
            | TokenKind::VecKeyword
            | TokenKind::RotKeyword
            | TokenKind::BoolKeyword
            | TokenKind::ObjKeyword
    )
}

fn keyword_type(kind: TokenKind) -> Type {
    match kind {
        TokenKind::NumberKeyword => Type::Number,
        TokenKind::VecKeyword => Type::Vector,
        TokenKind::RotKeyword => Type::Rotation,
        TokenKind::BoolKeyword => Type::Bool,
        TokenKind::ObjKeyword => Type::Object,
        _ => Type::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Program {
        let (program, diagnostics) = parse(SourceText::new(text));
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            diagnostics.iter().map(|d| d.message.clone()).collect::<Vec<_>>()
        );
        program
    }

    #[test]
    fn parses_declaration_with_modifiers() {
        let program = parse_ok("global number score = 1");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StatementKind::VariableDeclaration {
                modifiers,
                type_name,
                name,
                initializer,
            } => {
                assert_eq!(modifiers.len(), 1);
                assert_eq!(modifiers[0].0, ModifierKeyword::Global);
                assert_eq!(type_name.ty, Type::Number);
                assert_eq!(name.name, "score");
                assert!(initializer.is_some());
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_else_chain() {
        let program = parse_ok("if a < 1 { b = 1 } else if a < 2 { b = 2 } else { b = 3 }");
        match &program.statements[0].kind {
            StatementKind::If { else_branch, .. } => {
                let else_branch = else_branch.as_ref().expect("else branch");
                assert!(matches!(else_branch.kind, StatementKind::If { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn respects_operator_precedence() {
        let program = parse_ok("x = 1 + 2 * 3");
        match &program.statements[0].kind {
            StatementKind::Assignment { value, .. } => match &value.kind {
                ExpressionKind::Binary { operator, right, .. } => {
                    assert_eq!(*operator, BinaryOperator::Add);
                    assert!(matches!(
                        right.kind,
                        ExpressionKind::Binary {
                            operator: BinaryOperator::Multiply,
                            ..
                        }
                    ));
                }
                other => panic!("expected binary, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parses_compound_assignment() {
        let program = parse_ok("score += 2");
        assert!(matches!(
            program.statements[0].kind,
            StatementKind::CompoundAssignment {
                operator: BinaryOperator::Add,
                ..
            }
        ));
    }

    #[test]
    fn parses_vec_call_and_component_access() {
        let program = parse_ok("pos = vec(1, 2, 3)\nx = pos.x");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StatementKind::Assignment { value, .. } => match &value.kind {
                ExpressionKind::Call { callee, arguments } => {
                    assert_eq!(callee.name, "vec");
                    assert_eq!(arguments.len(), 3);
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
        match &program.statements[1].kind {
            StatementKind::Assignment { value, .. } => {
                assert!(matches!(value.kind, ExpressionKind::ComponentAccess { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn reports_unexpected_token_and_recovers() {
        let (program, diagnostics) = parse(SourceText::new("x = )\ny = 2"));
        assert!(!diagnostics.is_empty());
        // The second statement still parses.
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(&s.kind, StatementKind::Assignment { name, .. } if name.name == "y")));
    }

    #[test]
    fn parser_terminates_on_garbage() {
        let (_, diagnostics) = parse(SourceText::new(") } else ("));
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn parses_while_with_break_and_continue() {
        let program = parse_ok("while x < 3 { x += 1\ncontinue\nbreak }");
        match &program.statements[0].kind {
            StatementKind::While { body, .. } => match &body.kind {
                StatementKind::Block(statements) => {
                    assert_eq!(statements.len(), 3);
                    assert!(matches!(statements[1].kind, StatementKind::Continue));
                    assert!(matches!(statements[2].kind, StatementKind::Break));
                }
                other => panic!("expected block body, got {other:?}"),
            },
            other => panic!("expected while, got {other:?}"),
        }
    }
}
