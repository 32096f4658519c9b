//! Code emission: lowered bound tree to placed, wired blocks.
//!
//! The emitter walks the flat statement list, placing blocks through a
//! [`CodeBuilder`] and wiring them through terminal stores. Statements
//! chain on the exec wire via an [`EmitConnector`]; labels resolve to
//! the input of the next emitted statement, and jump wires to them are
//! connected in a second pass once every label is known.

use std::collections::HashMap;

use crate::blocks::{
    self, BlockDef, IF, MAKE_ROTATION, MAKE_VECTOR, NEGATE_NUMBER, NEGATE_VECTOR, NOT,
    PLAY_SENSOR, RANDOM, Vector3I,
};
use crate::bound::{
    Axis, BinaryOperator, BoundBlockStatement, BoundExpression, BoundExpressionKind,
    BoundStatement, BoundStatementKind, UnaryOperator,
};
use crate::builder::{CodeBuilder, SettingValue};
use crate::builtins::BuiltinKind;
use crate::diagnostic::DiagnosticBag;
use crate::placer::PlacerKind;
use crate::symbol::{VariableKind, VariableSymbol};
use crate::terminal::{TerminalStore, WireEnd};
use crate::types::{ConstantValue, Type};
use crate::wiring::{BreakBlockCache, EmitConnector, InlineVarManager};

/// Emits a lowered body. The caller must not emit while the bag holds
/// errors; the emitter itself may add new ones (wire-split limits).
pub fn emit(
    body: &BoundBlockStatement,
    diagnostics: &mut DiagnosticBag,
    placer: PlacerKind,
    origin: Vector3I,
) -> CodeBuilder {
    debug_assert!(
        !diagnostics.has_errors(),
        "emission started with error diagnostics"
    );
    let mut emitter = Emitter {
        builder: CodeBuilder::new(placer, origin),
        diagnostics,
        connector: EmitConnector::new(),
        inline: InlineVarManager::new(),
        resolved_labels: HashMap::new(),
        open_labels: Vec::new(),
        pending_jumps: Vec::new(),
        break_caches: HashMap::new(),
    };
    emitter.emit_body(body);
    emitter.builder
}

struct Emitter<'a> {
    builder: CodeBuilder,
    diagnostics: &'a mut DiagnosticBag,
    connector: EmitConnector,
    inline: InlineVarManager,
    /// Label name to the exec input of the statement that follows it.
    resolved_labels: HashMap<String, WireEnd>,
    /// Labels waiting for the next statement with an input.
    open_labels: Vec<String>,
    /// `(jump sources, label)` wired once all labels are resolved.
    pending_jumps: Vec<(Vec<WireEnd>, String)>,
    /// Decompose-block reuse, keyed by variable identity.
    break_caches: HashMap<String, BreakBlockCache>,
}

impl Emitter<'_> {
    fn emit_body(&mut self, body: &BoundBlockStatement) {
        self.builder.enter_statement_block();

        let play = self.builder.place_block(&PLAY_SENSOR);
        self.push_store(TerminalStore::block(
            None,
            vec![WireEnd::new(play, PLAY_SENSOR.terminal("after"))],
        ));

        for statement in &body.statements {
            self.emit_statement(statement);
        }

        self.builder.exit_statement_block();

        for (sources, label) in std::mem::take(&mut self.pending_jumps) {
            // A label with nothing after it resolves to no target; jumps
            // to it simply end the flow.
            if let Some(&target) = self.resolved_labels.get(&label) {
                for source in sources {
                    self.builder.connect(source, target);
                }
            }
        }
    }

    /// Pushes a store onto the exec chain, resolving any labels waiting
    /// for the next reachable input.
    fn push_store(&mut self, store: TerminalStore) {
        if let Some(input) = store.input() {
            for label in self.open_labels.drain(..) {
                self.resolved_labels.insert(label, input);
            }
        }
        self.connector.push(&mut self.builder, store);
    }

    fn emit_statement(&mut self, statement: &BoundStatement) {
        match &statement.kind {
            BoundStatementKind::Nop => {}
            BoundStatementKind::Label(label) => {
                self.open_labels.push(label.name.clone());
            }
            BoundStatementKind::Goto(label) => {
                let sources = self.connector.current_outputs();
                self.pending_jumps.push((sources, label.name.clone()));
                self.push_store(TerminalStore::Rollback { input: None });
            }
            BoundStatementKind::Return => {
                self.push_store(TerminalStore::Rollback { input: None });
            }
            BoundStatementKind::ConditionalGoto {
                label,
                condition,
                jump_if,
            } => {
                let condition_end = self.emit_value(condition);
                let block = self.builder.place_block(&IF);
                if let Some(end) = condition_end {
                    self.builder
                        .connect(end, WireEnd::new(block, IF.terminal("condition")));
                }
                let on_true = WireEnd::new(block, IF.terminal("on_true"));
                let on_false = WireEnd::new(block, IF.terminal("on_false"));
                let (jump, continuation) = if *jump_if {
                    (on_true, on_false)
                } else {
                    (on_false, on_true)
                };
                self.pending_jumps.push((vec![jump], label.name.clone()));
                self.push_store(TerminalStore::Conditional {
                    input: WireEnd::new(block, IF.terminal("before")),
                    after: continuation,
                    on_true: jump,
                });
            }
            BoundStatementKind::VariableDeclaration {
                symbol, initializer, ..
            } => {
                let Some(initializer) = initializer else {
                    return;
                };
                self.emit_write(symbol, initializer);
            }
            BoundStatementKind::Assignment { target, value } => {
                self.emit_write(target, value);
            }
            BoundStatementKind::Expression(expression) => {
                self.emit_expression_statement(expression);
            }
            BoundStatementKind::Block(_)
            | BoundStatementKind::If { .. }
            | BoundStatementKind::While { .. }
            | BoundStatementKind::CompoundAssignment { .. } => {
                unreachable!("structured statement reached emission")
            }
        }
    }

    /// Writing a variable: inline targets re-register their source,
    /// constants fold at every read site, null targets evaluate and
    /// discard, everything else goes through a set-variable block.
    fn emit_write(&mut self, symbol: &VariableSymbol, value: &BoundExpression) {
        // The old decomposed components no longer describe the value.
        self.break_caches.remove(&symbol.result_name());

        if symbol.kind == VariableKind::Null {
            self.emit_value(value);
            return;
        }
        if symbol.is_constant() {
            // Every read folds to the constant; no storage exists.
            return;
        }
        let wire = symbol
            .ty
            .wire_type()
            .unwrap_or_else(|| panic!("variable '{}' has no wire type", symbol.name));
        if symbol.is_inline() {
            match self.emit_value(value) {
                Some(end) => self.inline.define(&symbol.result_name(), wire, end),
                // The failed initializer already put an error in the bag;
                // later reads of the name must still resolve.
                None => self.inline.poison(&symbol.result_name(), wire),
            }
            return;
        }

        let value_end = self.emit_value(value);
        let def = blocks::set_variable_for(wire);
        let block = self.builder.place_block(def);
        self.builder
            .set_setting(block, SettingValue::Name(symbol.result_name()));
        if let Some(end) = value_end {
            self.builder
                .connect(end, WireEnd::new(block, def.terminal("value")));
        }
        self.push_store(TerminalStore::block(
            Some(WireEnd::new(block, def.terminal("before"))),
            vec![WireEnd::new(block, def.terminal("after"))],
        ));
    }

    fn emit_expression_statement(&mut self, expression: &BoundExpression) {
        let BoundExpressionKind::Call { builtin, arguments } = &expression.kind else {
            unreachable!("non-call expression statement reached emission")
        };
        match builtin.kind {
            BuiltinKind::Win | BuiltinKind::Lose => {
                let def = if builtin.kind == BuiltinKind::Win {
                    &blocks::WIN
                } else {
                    &blocks::LOSE
                };
                let block = self.builder.place_block(def);
                self.push_store(TerminalStore::block(
                    Some(WireEnd::new(block, def.terminal("before"))),
                    vec![WireEnd::new(block, def.terminal("after"))],
                ));
            }
            BuiltinKind::Inspect => {
                let argument = &arguments[0];
                let wire = argument
                    .ty
                    .wire_type()
                    .unwrap_or_else(|| panic!("inspect argument has no wire type"));
                let value_end = self.emit_value(argument);
                let def = blocks::inspect_for(wire);
                let block = self.builder.place_block(def);
                if let Some(end) = value_end {
                    self.builder
                        .connect(end, WireEnd::new(block, def.terminal("value")));
                }
                self.push_store(TerminalStore::block(
                    Some(WireEnd::new(block, def.terminal("before"))),
                    vec![WireEnd::new(block, def.terminal("after"))],
                ));
            }
            // A value-producing call used as a statement: evaluate and
            // discard.
            BuiltinKind::MakeVector | BuiltinKind::MakeRotation | BuiltinKind::Random => {
                self.emit_value(expression);
            }
        }
    }

    /// Emits a value expression in its own expression scope and returns
    /// the terminal carrying the result. `None` means an emission-time
    /// error was reported (wire-split exhaustion with no passthrough).
    fn emit_value(&mut self, expression: &BoundExpression) -> Option<WireEnd> {
        self.builder.enter_expression_block();
        let result = self.emit_value_inner(expression);
        self.builder.exit_expression_block();
        result
    }

    fn emit_value_inner(&mut self, expression: &BoundExpression) -> Option<WireEnd> {
        match &expression.kind {
            BoundExpressionKind::Literal(value) => Some(self.emit_literal(*value)),
            BoundExpressionKind::Variable(symbol) => {
                if let Some(constant) = symbol.constant_value() {
                    return Some(self.emit_literal(constant));
                }
                if symbol.is_inline() {
                    return self.inline.read(
                        &mut self.builder,
                        &mut *self.diagnostics,
                        &symbol.result_name(),
                        expression.span,
                    );
                }
                let wire = symbol
                    .ty
                    .wire_type()
                    .unwrap_or_else(|| panic!("variable '{}' has no wire type", symbol.name));
                let def = blocks::get_variable_for(wire);
                let block = self.builder.place_block(def);
                self.builder
                    .set_setting(block, SettingValue::Name(symbol.result_name()));
                Some(WireEnd::new(block, def.terminal("value")))
            }
            BoundExpressionKind::Unary { operator, operand } => {
                let def = unary_block(*operator, operand.ty);
                let operand_end = self.emit_value(operand);
                let block = self.builder.place_block(def);
                if let Some(end) = operand_end {
                    self.builder
                        .connect(end, WireEnd::new(block, def.terminal("value")));
                }
                Some(WireEnd::new(block, def.terminal("result")))
            }
            BoundExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let def = binary_block(*operator, left.ty);
                let left_end = self.emit_value(left);
                let right_end = self.emit_value(right);
                let block = self.builder.place_block(def);
                if let Some(end) = left_end {
                    self.builder
                        .connect(end, WireEnd::new(block, def.terminal("a")));
                }
                if let Some(end) = right_end {
                    self.builder
                        .connect(end, WireEnd::new(block, def.terminal("b")));
                }
                Some(WireEnd::new(block, def.terminal("value")))
            }
            BoundExpressionKind::Call { builtin, arguments } => {
                let def = match builtin.kind {
                    BuiltinKind::MakeVector => &MAKE_VECTOR,
                    BuiltinKind::MakeRotation => &MAKE_ROTATION,
                    BuiltinKind::Random => &RANDOM,
                    BuiltinKind::Inspect | BuiltinKind::Win | BuiltinKind::Lose => {
                        unreachable!("void builtin used as a value")
                    }
                };
                let terminals: &[&str] = match builtin.kind {
                    BuiltinKind::Random => &["a", "b"],
                    _ => &["x", "y", "z"],
                };
                let ends: Vec<Option<WireEnd>> =
                    arguments.iter().map(|a| self.emit_value(a)).collect();
                let block = self.builder.place_block(def);
                for (end, terminal) in ends.into_iter().zip(terminals) {
                    if let Some(end) = end {
                        self.builder
                            .connect(end, WireEnd::new(block, def.terminal(terminal)));
                    }
                }
                Some(WireEnd::new(block, def.terminal("value")))
            }
            BoundExpressionKind::ComponentAccess { base, axis } => {
                self.emit_component(base, *axis)
            }
            BoundExpressionKind::Error => {
                unreachable!("error expression reached emission")
            }
        }
    }

    fn emit_literal(&mut self, value: ConstantValue) -> WireEnd {
        let wire = value.ty().wire_type().expect("constants carry value wires");
        let def = blocks::value_for(wire);
        let block = self.builder.place_block(def);
        let setting = match value {
            ConstantValue::Number(n) => SettingValue::Number(n),
            ConstantValue::Bool(b) => SettingValue::Bool(b),
            ConstantValue::Vector(v) => SettingValue::Vector(v),
            ConstantValue::Rotation(r) => SettingValue::Rotation(r),
        };
        self.builder.set_setting(block, setting);
        WireEnd::new(block, def.terminal("value"))
    }

    /// Component reads share one decompose block per variable until its
    /// axis budgets run out; non-variable bases get a fresh one each
    /// time.
    fn emit_component(&mut self, base: &BoundExpression, axis: Axis) -> Option<WireEnd> {
        let wire = base.ty.wire_type().expect("component base carries a wire");
        let key = match &base.kind {
            BoundExpressionKind::Variable(symbol) if symbol.constant_value().is_none() => {
                Some(symbol.result_name())
            }
            _ => None,
        };

        if let Some(key) = &key {
            let cache = self
                .break_caches
                .entry(key.clone())
                .or_insert_with(|| BreakBlockCache::new(wire));
            if let Some(end) = cache.read(axis) {
                return Some(end);
            }
        }

        let def = blocks::break_block_for(wire)
            .unwrap_or_else(|| panic!("no decompose block for {wire} wires"));
        let base_end = self.emit_value(base);
        let block = self.builder.place_block(def);
        if let Some(end) = base_end {
            self.builder
                .connect(end, WireEnd::new(block, def.terminal("value")));
        }

        match key {
            Some(key) => {
                let cache = self
                    .break_caches
                    .get_mut(&key)
                    .expect("cache created above");
                cache.supply(block);
                Some(cache.read(axis).expect("fresh cache serves the first read"))
            }
            None => {
                let mut cache = BreakBlockCache::new(wire);
                cache.supply(block);
                Some(cache.read(axis).expect("fresh cache serves the first read"))
            }
        }
    }
}

fn unary_block(operator: UnaryOperator, operand: Type) -> &'static BlockDef {
    match (operator, operand) {
        (UnaryOperator::Negate, Type::Number) => &NEGATE_NUMBER,
        (UnaryOperator::Negate, Type::Vector) => &NEGATE_VECTOR,
        (UnaryOperator::Not, Type::Bool) => &NOT,
        other => unreachable!("no block for unary operator {other:?}"),
    }
}

fn binary_block(operator: BinaryOperator, left: Type) -> &'static BlockDef {
    use BinaryOperator::*;
    match (operator, left) {
        (Add, Type::Number) => &blocks::ADD_NUMBERS,
        (Add, Type::Vector) => &blocks::ADD_VECTORS,
        (Subtract, Type::Number) => &blocks::SUBTRACT_NUMBERS,
        (Subtract, Type::Vector) => &blocks::SUBTRACT_VECTORS,
        (Multiply, Type::Number) => &blocks::MULTIPLY_NUMBERS,
        (Multiply, Type::Vector) => &blocks::SCALE_VECTOR,
        (Divide, Type::Number) => &blocks::DIVIDE_NUMBERS,
        (Modulo, Type::Number) => &blocks::MODULO_NUMBERS,
        (Less, Type::Number) => &blocks::LESS_THAN,
        (LessOrEquals, Type::Number) => &blocks::LESS_OR_EQUAL,
        (Greater, Type::Number) => &blocks::GREATER_THAN,
        (GreaterOrEquals, Type::Number) => &blocks::GREATER_OR_EQUAL,
        (Equals, Type::Number) => &blocks::EQUAL_NUMBERS,
        (Equals, Type::Bool) => &blocks::EQUAL_BOOLS,
        (Equals, Type::Vector) => &blocks::EQUAL_VECTORS,
        (NotEquals, Type::Number) => &blocks::NOT_EQUAL_NUMBERS,
        (NotEquals, Type::Bool) => &blocks::NOT_EQUAL_BOOLS,
        (NotEquals, Type::Vector) => &blocks::NOT_EQUAL_VECTORS,
        (And, Type::Bool) => &blocks::AND,
        (Or, Type::Bool) => &blocks::OR,
        other => unreachable!("no block for binary operator {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::blocks::Block;
    use crate::builder::Command;
    use crate::lower::lower;
    use crate::parser::parse;
    use crate::source::SourceText;
    use std::rc::Rc;

    fn emit_source(text: &str) -> (Vec<Block>, Vec<Command>, DiagnosticBag) {
        let source = SourceText::new(text);
        let (program, parse_diagnostics) = parse(Rc::clone(&source));
        assert!(parse_diagnostics.is_empty());
        let result = bind(&program, Rc::clone(&source));
        assert!(
            !result.diagnostics.has_errors(),
            "bind diagnostics: {:?}",
            result
                .diagnostics
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        let lowered = lower(&result.body);
        let mut diagnostics = DiagnosticBag::new(source);
        let builder = emit(&lowered, &mut diagnostics, PlacerKind::Ground, Vector3I::ZERO);
        let (blocks, commands) = builder.into_parts();
        (blocks, commands, diagnostics)
    }

    fn blocks_named<'a>(blocks: &'a [Block], name: &str) -> Vec<&'a Block> {
        blocks.iter().filter(|b| b.def.name == name).collect()
    }

    fn connections(commands: &[Command]) -> Vec<(WireEnd, WireEnd)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Connect { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_program_emits_only_the_entry_block() {
        let (blocks, _, diagnostics) = emit_source("");
        assert!(diagnostics.is_empty());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].def.name, "play_sensor");
    }

    #[test]
    fn win_call_chains_after_the_entry_block() {
        let (blocks, commands, _) = emit_source("win()");
        let play = &blocks_named(&blocks, "play_sensor")[0];
        let win = &blocks_named(&blocks, "win")[0];
        let expected = (
            WireEnd::new(play.id, PLAY_SENSOR.terminal("after")),
            WireEnd::new(win.id, blocks::WIN.terminal("before")),
        );
        assert!(connections(&commands).contains(&expected));
    }

    #[test]
    fn declaration_emits_value_into_set_variable() {
        let (blocks, commands, _) = emit_source("global number score = 3");
        let value = &blocks_named(&blocks, "number_value")[0];
        let set = &blocks_named(&blocks, "set_number_variable")[0];
        let wired = connections(&commands).contains(&(
            WireEnd::new(value.id, blocks::NUMBER_VALUE.terminal("value")),
            WireEnd::new(set.id, blocks::SET_NUMBER_VARIABLE.terminal("value")),
        ));
        assert!(wired);
        // The sigil carries into the stored name.
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetSetting { value: SettingValue::Name(n), .. } if n == "$score"
        )));
    }

    #[test]
    fn variable_read_uses_a_get_block_with_the_result_name() {
        let (blocks, commands, _) = emit_source("number x = 1\ninspect(x)");
        assert_eq!(blocks_named(&blocks, "get_number_variable").len(), 1);
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetSetting { value: SettingValue::Name(n), .. } if n == "x"
        )));
        assert_eq!(blocks_named(&blocks, "inspect_number").len(), 1);
    }

    #[test]
    fn const_reads_fold_to_literal_blocks() {
        let (blocks, _, _) = emit_source("const number c = 2 + 3\ninspect(c)");
        // No storage for the constant, just a literal at the read site.
        assert!(blocks_named(&blocks, "set_number_variable").is_empty());
        assert!(blocks_named(&blocks, "get_number_variable").is_empty());
        let values = blocks_named(&blocks, "number_value");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn if_statement_places_a_conditional_block() {
        let (blocks, commands, _) = emit_source("number x = 1\nif x > 0 { win() }");
        let ifs = blocks_named(&blocks, "if");
        assert_eq!(ifs.len(), 1);
        let win = &blocks_named(&blocks, "win")[0];
        // Lowered as jump-unless: the false edge skips the body, so the
        // body chains from the true edge's complement.
        let continues_into_body = connections(&commands).contains(&(
            WireEnd::new(ifs[0].id, IF.terminal("on_true")),
            WireEnd::new(win.id, blocks::WIN.terminal("before")),
        ));
        assert!(continues_into_body);
    }

    #[test]
    fn while_loop_wires_a_back_edge() {
        let (blocks, commands, _) = emit_source("number x = 0\nwhile x < 3 { x = x + 1 }");
        let ifs = blocks_named(&blocks, "if");
        assert_eq!(ifs.len(), 1);
        let sets = blocks_named(&blocks, "set_number_variable");
        // Declaration set plus body set.
        assert_eq!(sets.len(), 2);
        let body_set = sets[1];
        let back_edge = connections(&commands).contains(&(
            WireEnd::new(ifs[0].id, IF.terminal("on_true")),
            WireEnd::new(
                body_set.id,
                blocks::SET_NUMBER_VARIABLE.terminal("before"),
            ),
        ));
        assert!(back_edge, "loop condition must jump back into the body");
    }

    #[test]
    fn inline_variable_reads_come_from_its_producer() {
        let (blocks, commands, diagnostics) =
            emit_source("inline number n = 5\nnumber a = n + n");
        assert!(diagnostics.is_empty());
        // No set/get blocks for the inline variable itself; its literal
        // feeds the adder directly.
        assert_eq!(blocks_named(&blocks, "get_number_variable").len(), 0);
        let value = &blocks_named(&blocks, "number_value")[0];
        let add = &blocks_named(&blocks, "add_numbers")[0];
        let wires = connections(&commands);
        assert!(wires.contains(&(
            WireEnd::new(value.id, blocks::NUMBER_VALUE.terminal("value")),
            WireEnd::new(add.id, blocks::ADD_NUMBERS.terminal("a")),
        )));
        assert!(wires.contains(&(
            WireEnd::new(value.id, blocks::NUMBER_VALUE.terminal("value")),
            WireEnd::new(add.id, blocks::ADD_NUMBERS.terminal("b")),
        )));
    }

    #[test]
    fn overread_inline_variable_gets_a_passthrough() {
        let (blocks, _, diagnostics) = emit_source(
            "inline number n = 5\n\
             number a = n + n\n\
             number b = n + n\n\
             number c = n + n",
        );
        assert!(diagnostics.is_empty());
        assert_eq!(blocks_named(&blocks, "pass_number").len(), 1);
    }

    #[test]
    fn component_reads_share_one_break_block() {
        let (blocks, _, _) = emit_source(
            "vec v = vec(1, 2, 3)\nnumber a = v.x\nnumber b = v.y\nnumber c = v.z",
        );
        assert_eq!(blocks_named(&blocks, "break_vector").len(), 1);
        // One get-variable feeds the shared decompose block.
        assert_eq!(blocks_named(&blocks, "get_vector_variable").len(), 1);
    }

    #[test]
    fn assignment_invalidates_the_break_cache() {
        let (blocks, _, _) = emit_source(
            "vec v = vec(1, 2, 3)\n\
             number a = v.x\n\
             v = vec(4, 5, 6)\n\
             number b = v.x",
        );
        assert_eq!(blocks_named(&blocks, "break_vector").len(), 2);
    }

    #[test]
    fn make_vector_call_wires_three_components() {
        let (blocks, commands, _) = emit_source("vec v = vec(1, 2, 3)");
        let make = &blocks_named(&blocks, "make_vector")[0];
        let wires = connections(&commands);
        for terminal in ["x", "y", "z"] {
            assert!(
                wires
                    .iter()
                    .any(|(_, to)| *to == WireEnd::new(make.id, MAKE_VECTOR.terminal(terminal))),
                "missing component wire into '{terminal}'"
            );
        }
    }

    #[test]
    fn statements_after_return_are_never_emitted() {
        let (blocks, _, _) = emit_source("win()\nreturn\nlose()");
        assert_eq!(blocks_named(&blocks, "win").len(), 1);
        assert!(blocks_named(&blocks, "lose").is_empty());
    }
}
