//! Trivia-preserving lexer.
//!
//! Pull-based: [`Lexer::lex`] returns exactly one token per call and
//! terminates with an [`TokenKind::EndOfFile`] token. The lexer never
//! loses input — every character lands in some token's text or in a
//! leading/trailing trivia item, so the original source can be rebuilt
//! from the token stream.
//!
//! Malformed input (bad characters, broken numbers, unterminated strings
//! or comments) is reported to the diagnostics bag and lexing continues;
//! the stream is always well-formed even when erroneous.

use std::rc::Rc;

use crate::diagnostic::DiagnosticBag;
use crate::source::SourceText;
use crate::span::TextSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EndOfFile,
    Bad,

    Identifier,
    Number,
    String,

    // Punctuation and operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    PercentEquals,
    Equals,
    EqualsEquals,
    Bang,
    BangEquals,
    Less,
    LessOrEquals,
    Greater,
    GreaterOrEquals,
    AmpersandAmpersand,
    PipePipe,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Comma,
    Dot,

    // Keywords
    NumberKeyword,
    VecKeyword,
    RotKeyword,
    BoolKeyword,
    ObjKeyword,
    GlobalKeyword,
    SavedKeyword,
    ConstKeyword,
    ReadonlyKeyword,
    InlineKeyword,
    IfKeyword,
    ElseKeyword,
    WhileKeyword,
    BreakKeyword,
    ContinueKeyword,
    ReturnKeyword,
    TrueKeyword,
    FalseKeyword,
}

impl TokenKind {
    /// Short description used in parse diagnostics.
    pub fn description(self) -> &'static str {
        use TokenKind::*;
        match self {
            EndOfFile => "end of file",
            Bad => "bad token",
            Identifier => "identifier",
            Number => "number literal",
            String => "string literal",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            PlusEquals => "'+='",
            MinusEquals => "'-='",
            StarEquals => "'*='",
            SlashEquals => "'/='",
            PercentEquals => "'%='",
            Equals => "'='",
            EqualsEquals => "'=='",
            Bang => "'!'",
            BangEquals => "'!='",
            Less => "'<'",
            LessOrEquals => "'<='",
            Greater => "'>'",
            GreaterOrEquals => "'>='",
            AmpersandAmpersand => "'&&'",
            PipePipe => "'||'",
            OpenParen => "'('",
            CloseParen => "')'",
            OpenBrace => "'{'",
            CloseBrace => "'}'",
            Comma => "','",
            Dot => "'.'",
            NumberKeyword => "'number'",
            VecKeyword => "'vec'",
            RotKeyword => "'rot'",
            BoolKeyword => "'bool'",
            ObjKeyword => "'obj'",
            GlobalKeyword => "'global'",
            SavedKeyword => "'saved'",
            ConstKeyword => "'const'",
            ReadonlyKeyword => "'readonly'",
            InlineKeyword => "'inline'",
            IfKeyword => "'if'",
            ElseKeyword => "'else'",
            WhileKeyword => "'while'",
            BreakKeyword => "'break'",
            ContinueKeyword => "'continue'",
            ReturnKeyword => "'return'",
            TrueKeyword => "'true'",
            FalseKeyword => "'false'",
        }
    }
}

/// Literal value attached to a token, when it has one.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Number(f32),
    String(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    Whitespace,
    LineBreak,
    SingleLineComment,
    MultiLineComment,
}

/// Whitespace or comment text attached to a token for full-fidelity
/// round-tripping.
#[derive(Debug, Clone, PartialEq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: TextSpan,
    pub text: String,
}

/// One lexed token. Created once by the lexer, immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: TextSpan,
    pub text: String,
    pub value: Option<TokenValue>,
    pub leading_trivia: Vec<Trivia>,
    pub trailing_trivia: Vec<Trivia>,
}

/// Lex the whole input at once. Convenience over the pull-based
/// [`Lexer::lex`].
pub fn lex_all(source: Rc<SourceText>) -> (Vec<Token>, DiagnosticBag) {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.lex();
        let done = token.kind == TokenKind::EndOfFile;
        tokens.push(token);
        if done {
            break;
        }
    }
    (tokens, lexer.into_diagnostics())
}

pub struct Lexer {
    source: Rc<SourceText>,
    index: usize,
    diagnostics: DiagnosticBag,
}

impl Lexer {
    pub fn new(source: Rc<SourceText>) -> Lexer {
        let diagnostics = DiagnosticBag::new(Rc::clone(&source));
        Lexer {
            source,
            index: 0,
            diagnostics,
        }
    }

    pub fn into_diagnostics(self) -> DiagnosticBag {
        self.diagnostics
    }

    /// Produce the next token. After the end of input this keeps
    /// returning `EndOfFile` tokens with empty trivia.
    pub fn lex(&mut self) -> Token {
        let leading_trivia = self.read_trivia(true);
        let start = self.index;
        let (kind, value) = self.read_token_kind();
        let span = TextSpan::from_bounds(start, self.index);
        let text = self.source.slice(span).to_string();
        let trailing_trivia = if kind == TokenKind::EndOfFile {
            Vec::new()
        } else {
            self.read_trivia(false)
        };
        Token {
            kind,
            span,
            text,
            value,
            leading_trivia,
            trailing_trivia,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.text().as_bytes().get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.text().as_bytes().get(self.index + offset).copied()
    }

    fn bump(&mut self) {
        if self.index < self.source.len() {
            self.index += 1;
        }
    }

    /// Collects whitespace, line breaks and comments. Leading trivia takes
    /// everything before the next token; trailing trivia stops after the
    /// first line break so trivia never crosses a line boundary.
    fn read_trivia(&mut self, leading: bool) -> Vec<Trivia> {
        let mut trivia = Vec::new();
        loop {
            let start = self.index;
            let kind = match self.peek() {
                Some(b'\r') | Some(b'\n') => {
                    if self.peek() == Some(b'\r') && self.peek_at(1) == Some(b'\n') {
                        self.bump();
                    }
                    self.bump();
                    TriviaKind::LineBreak
                }
                Some(b' ') | Some(b'\t') => {
                    while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
                        self.bump();
                    }
                    TriviaKind::Whitespace
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n' && c != b'\r') {
                        self.bump();
                    }
                    TriviaKind::SingleLineComment
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.read_multi_line_comment();
                    TriviaKind::MultiLineComment
                }
                _ => break,
            };
            let span = TextSpan::from_bounds(start, self.index);
            trivia.push(Trivia {
                kind,
                span,
                text: self.source.slice(span).to_string(),
            });
            if !leading && kind == TriviaKind::LineBreak {
                break;
            }
        }
        trivia
    }

    fn read_multi_line_comment(&mut self) {
        let start = self.index;
        self.bump(); // '/'
        self.bump(); // '*'
        loop {
            match self.peek() {
                None => {
                    self.diagnostics
                        .report_unterminated_comment(TextSpan::from_bounds(start, self.index));
                    break;
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                _ => self.bump(),
            }
        }
    }

    fn read_token_kind(&mut self) -> (TokenKind, Option<TokenValue>) {
        use TokenKind::*;
        let Some(ch) = self.peek() else {
            return (EndOfFile, None);
        };
        match ch {
            b'+' => (self.one_or_two(Plus, b'=', PlusEquals), None),
            b'-' => (self.one_or_two(Minus, b'=', MinusEquals), None),
            b'*' => (self.one_or_two(Star, b'=', StarEquals), None),
            b'/' => (self.one_or_two(Slash, b'=', SlashEquals), None),
            b'%' => (self.one_or_two(Percent, b'=', PercentEquals), None),
            b'=' => (self.one_or_two(Equals, b'=', EqualsEquals), None),
            b'!' => (self.one_or_two(Bang, b'=', BangEquals), None),
            b'<' => (self.one_or_two(Less, b'=', LessOrEquals), None),
            b'>' => (self.one_or_two(Greater, b'=', GreaterOrEquals), None),
            b'&' => {
                if self.peek_at(1) == Some(b'&') {
                    self.bump();
                    self.bump();
                    (AmpersandAmpersand, None)
                } else {
                    self.bad_character()
                }
            }
            b'|' => {
                if self.peek_at(1) == Some(b'|') {
                    self.bump();
                    self.bump();
                    (PipePipe, None)
                } else {
                    self.bad_character()
                }
            }
            b'(' => {
                self.bump();
                (OpenParen, None)
            }
            b')' => {
                self.bump();
                (CloseParen, None)
            }
            b'{' => {
                self.bump();
                (OpenBrace, None)
            }
            b'}' => {
                self.bump();
                (CloseBrace, None)
            }
            b',' => {
                self.bump();
                (Comma, None)
            }
            b'.' => {
                self.bump();
                (Dot, None)
            }
            b'"' => self.read_string(),
            b'0'..=b'9' => self.read_number(),
            _ => {
                if is_identifier_start(ch) {
                    self.read_identifier_or_keyword()
                } else {
                    self.bad_character()
                }
            }
        }
    }

    fn one_or_two(&mut self, single: TokenKind, second: u8, double: TokenKind) -> TokenKind {
        self.bump();
        if self.peek() == Some(second) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn bad_character(&mut self) -> (TokenKind, Option<TokenValue>) {
        let start = self.index;
        // Consume a whole UTF-8 scalar so the bad token stays valid text.
        self.bump();
        while self
            .peek()
            .is_some_and(|b| b & 0b1100_0000 == 0b1000_0000)
        {
            self.bump();
        }
        let span = TextSpan::from_bounds(start, self.index);
        let character = self.source.slice(span).chars().next().unwrap_or('\u{FFFD}');
        self.diagnostics.report_bad_character(span, character);
        (TokenKind::Bad, None)
    }

    /// Numeric literals: decimal with optional fraction, `0x` hex, `0b`
    /// binary; `_` digit separators in all three. Malformed numbers
    /// report one diagnostic and carry a `0` fallback value.
    fn read_number(&mut self) -> (TokenKind, Option<TokenValue>) {
        let start = self.index;
        if self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X') | Some(b'b') | Some(b'B'))
        {
            self.bump();
            self.bump();
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
            {
                self.bump();
            }
        } else {
            let mut seen_dot = false;
            loop {
                match self.peek() {
                    Some(c) if c.is_ascii_digit() || c == b'_' => self.bump(),
                    Some(b'.') if !seen_dot && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                        seen_dot = true;
                        self.bump();
                    }
                    _ => break,
                }
            }
        }
        let span = TextSpan::from_bounds(start, self.index);
        let text = self.source.slice(span);
        let value = match parse_number(text) {
            Some(value) => value,
            None => {
                self.diagnostics.report_invalid_number(span, text);
                0.0
            }
        };
        (TokenKind::Number, Some(TokenValue::Number(value)))
    }

    fn read_string(&mut self) -> (TokenKind, Option<TokenValue>) {
        let start = self.index;
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') | Some(b'\r') => {
                    self.diagnostics
                        .report_unterminated_string(TextSpan::from_bounds(start, self.index));
                    break;
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    let escape_start = self.index;
                    self.bump();
                    match self.peek() {
                        Some(b'n') => {
                            value.push('\n');
                            self.bump();
                        }
                        Some(b't') => {
                            value.push('\t');
                            self.bump();
                        }
                        Some(b'\\') => {
                            value.push('\\');
                            self.bump();
                        }
                        Some(b'"') => {
                            value.push('"');
                            self.bump();
                        }
                        other => {
                            let bad = other.map(|c| c as char).unwrap_or('\u{FFFD}');
                            if other.is_some() {
                                self.bump();
                            }
                            self.diagnostics.report_invalid_escape(
                                TextSpan::from_bounds(escape_start, self.index),
                                bad,
                            );
                        }
                    }
                }
                Some(_) => {
                    // Copy a whole run of plain bytes as a str slice so
                    // multi-byte characters survive intact.
                    let run_start = self.index;
                    while !matches!(
                        self.peek(),
                        None | Some(b'"') | Some(b'\\') | Some(b'\n') | Some(b'\r')
                    ) {
                        self.bump();
                    }
                    value.push_str(
                        self.source
                            .slice(TextSpan::from_bounds(run_start, self.index)),
                    );
                }
            }
        }
        (TokenKind::String, Some(TokenValue::String(value)))
    }

    fn read_identifier_or_keyword(&mut self) -> (TokenKind, Option<TokenValue>) {
        let start = self.index;
        while self.peek().is_some_and(is_identifier_continue) {
            self.bump();
        }
        let text = self.source.slice(TextSpan::from_bounds(start, self.index));
        let kind = keyword_kind(text);
        let value = match kind {
            TokenKind::TrueKeyword => Some(TokenValue::Bool(true)),
            TokenKind::FalseKeyword => Some(TokenValue::Bool(false)),
            _ => None,
        };
        (kind, value)
    }
}

fn is_identifier_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_identifier_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn keyword_kind(text: &str) -> TokenKind {
    use TokenKind::*;
    match text {
        "number" => NumberKeyword,
        "vec" => VecKeyword,
        "rot" => RotKeyword,
        "bool" => BoolKeyword,
        "obj" => ObjKeyword,
        "global" => GlobalKeyword,
        "saved" => SavedKeyword,
        "const" => ConstKeyword,
        "readonly" => ReadonlyKeyword,
        "inline" => InlineKeyword,
        "if" => IfKeyword,
        "else" => ElseKeyword,
        "while" => WhileKeyword,
        "break" => BreakKeyword,
        "continue" => ContinueKeyword,
        "return" => ReturnKeyword,
        "true" => TrueKeyword,
        "false" => FalseKeyword,
        _ => Identifier,
    }
}

/// Parse a numeric literal's text, honoring `0x`/`0b` prefixes and `_`
/// separators. Returns `None` on malformed input (doubled, leading or
/// trailing underscores, empty digit runs).
fn parse_number(text: &str) -> Option<f32> {
    if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let digits = strip_separators(rest)?;
        return u64::from_str_radix(&digits, 16).ok().map(|v| v as f32);
    }
    if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        let digits = strip_separators(rest)?;
        return u64::from_str_radix(&digits, 2).ok().map(|v| v as f32);
    }
    let mut cleaned = String::with_capacity(text.len());
    for part in text.split('.') {
        if !cleaned.is_empty() {
            cleaned.push('.');
        }
        cleaned.push_str(&strip_separators(part)?);
    }
    cleaned.parse::<f32>().ok()
}

/// Remove `_` separators, requiring each to sit between two digits.
fn strip_separators(digits: &str) -> Option<String> {
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    Some(digits.replace('_', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_source(text: &str) -> (Vec<Token>, DiagnosticBag) {
        lex_all(SourceText::new(text))
    }

    fn single_token(text: &str) -> Token {
        let (tokens, diagnostics) = lex_source(text);
        assert!(diagnostics.is_empty(), "unexpected diagnostics for {text:?}");
        assert_eq!(tokens.len(), 2, "expected one token plus EOF for {text:?}");
        tokens.into_iter().next().expect("token")
    }

    fn number_value(text: &str) -> f32 {
        match single_token(text).value {
            Some(TokenValue::Number(value)) => value,
            other => panic!("expected number value for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn lexes_hex_binary_and_separated_numbers() {
        assert_eq!(number_value("0x1A"), 26.0);
        assert_eq!(number_value("0b101"), 5.0);
        assert_eq!(number_value("1_000.5"), 1000.5);
    }

    #[test]
    fn malformed_numbers_report_once_and_fall_back_to_zero() {
        for text in ["1__0", "10_"] {
            let (tokens, diagnostics) = lex_source(text);
            assert_eq!(diagnostics.len(), 1, "expected one diagnostic for {text:?}");
            assert_eq!(
                tokens[0].value,
                Some(TokenValue::Number(0.0)),
                "expected zero fallback for {text:?}"
            );
        }
    }

    #[test]
    fn every_character_lands_in_text_or_trivia() {
        let input = "global number x = 0x1F // set up\nif x > 2 { x += 1 } /* done */\n";
        let (tokens, diagnostics) = lex_source(input);
        assert!(diagnostics.is_empty());

        let mut rebuilt = String::new();
        for token in &tokens {
            for trivia in &token.leading_trivia {
                rebuilt.push_str(&trivia.text);
            }
            rebuilt.push_str(&token.text);
            for trivia in &token.trailing_trivia {
                rebuilt.push_str(&trivia.text);
            }
        }
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn token_spans_are_contiguous_and_non_overlapping() {
        let input = "x = 1 + 2\ny = x * 3";
        let (tokens, _) = lex_source(input);
        let mut cursor = 0;
        for token in &tokens {
            for trivia in &token.leading_trivia {
                assert_eq!(trivia.span.start, cursor);
                cursor = trivia.span.end;
            }
            assert_eq!(token.span.start, cursor);
            cursor = token.span.end;
            for trivia in &token.trailing_trivia {
                assert_eq!(trivia.span.start, cursor);
                cursor = trivia.span.end;
            }
        }
        assert_eq!(cursor, input.len());
    }

    #[test]
    fn line_break_terminates_trailing_trivia() {
        let (tokens, _) = lex_source("a  \n  b");
        let a = &tokens[0];
        assert_eq!(a.trailing_trivia.len(), 2);
        assert_eq!(a.trailing_trivia[0].kind, TriviaKind::Whitespace);
        assert_eq!(a.trailing_trivia[1].kind, TriviaKind::LineBreak);
        // The second line's indentation belongs to `b` as leading trivia.
        let b = &tokens[1];
        assert_eq!(b.leading_trivia.len(), 1);
        assert_eq!(b.leading_trivia[0].kind, TriviaKind::Whitespace);
    }

    #[test]
    fn comments_attach_as_trivia() {
        let (tokens, diagnostics) = lex_source("x // same line\n/* next */ y");
        assert!(diagnostics.is_empty());
        assert!(tokens[0]
            .trailing_trivia
            .iter()
            .any(|t| t.kind == TriviaKind::SingleLineComment));
        assert!(tokens[1]
            .leading_trivia
            .iter()
            .any(|t| t.kind == TriviaKind::MultiLineComment));
    }

    #[test]
    fn unterminated_string_reports_but_lexing_continues() {
        let (tokens, diagnostics) = lex_source("\"open\nx");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn invalid_escape_reports_at_offending_location() {
        let (tokens, diagnostics) = lex_source("\"a\\qb\"");
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().expect("diagnostic");
        assert_eq!(diagnostic.location.text(), "\\q");
        assert_eq!(tokens[0].kind, TokenKind::String);
    }

    #[test]
    fn unterminated_block_comment_reports() {
        let (_, diagnostics) = lex_source("x /* never closed");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics
            .iter()
            .next()
            .is_some_and(|d| d.message.contains("unterminated block comment")));
    }

    #[test]
    fn bad_characters_become_bad_tokens() {
        let (tokens, diagnostics) = lex_source("x @ y");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tokens[1].kind, TokenKind::Bad);
        assert_eq!(tokens[1].text, "@");
    }

    #[test]
    fn compound_operators_lex_as_one_token() {
        let (tokens, _) = lex_source("a += b == c && d");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::PlusEquals,
                TokenKind::Identifier,
                TokenKind::EqualsEquals,
                TokenKind::Identifier,
                TokenKind::AmpersandAmpersand,
                TokenKind::Identifier,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn lexer_repeats_eof_after_end() {
        let mut lexer = Lexer::new(SourceText::new("x"));
        assert_eq!(lexer.lex().kind, TokenKind::Identifier);
        assert_eq!(lexer.lex().kind, TokenKind::EndOfFile);
        assert_eq!(lexer.lex().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn string_escapes_decode_into_value() {
        let token = single_token("\"a\\n\\\"b\\\"\"");
        assert_eq!(token.value, Some(TokenValue::String("a\n\"b\"".to_string())));
    }

    #[test]
    fn multibyte_characters_decode_into_value_unmangled() {
        let token = single_token("\"héllo → 日本\\n語\"");
        assert_eq!(
            token.value,
            Some(TokenValue::String("héllo → 日本\n語".to_string()))
        );
    }
}
