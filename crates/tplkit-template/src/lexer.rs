/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokenizer for template source.
//!
//! Text outside `{{ }}` becomes a single [`TokenKind::Text`] token. Inside an
//! action the lexer emits expression tokens until the closing delimiter, so a
//! `}}` inside a string literal does not end the action.

use crate::ast::{Number, NumberNode};
use crate::error::{TemplateError, TemplateResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    /// Whitespace separated this token from the previous one in the action.
    pub space_before: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Text(String),
    LeftDelim,
    RightDelim,
    Comment(String),
    Keyword(Keyword),
    Identifier(String),
    Dot,
    Field(Vec<String>),
    Variable(Vec<String>),
    String { quoted: String, text: String },
    Number(NumberNode),
    Bool(bool),
    Nil,
    LeftParen,
    RightParen,
    Pipe,
    Declare,
    Assign,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Else,
    End,
    Range,
    With,
    Template,
    Define,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "if" => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            "end" => Some(Keyword::End),
            "range" => Some(Keyword::Range),
            "with" => Some(Keyword::With),
            "template" => Some(Keyword::Template),
            "define" => Some(Keyword::Define),
            _ => None,
        }
    }
}

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

pub(crate) fn lex(template: &str, source: &str) -> TemplateResult<Vec<Token>> {
    Lexer {
        template,
        source,
        bytes: source.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    template: &'a str,
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> TemplateResult<Vec<Token>> {
        let mut trim_next_text = false;
        while self.pos < self.bytes.len() {
            let rest = &self.source[self.pos..];
            let open = rest.find(LEFT_DELIM).map(|i| self.pos + i);
            let text_end = open.unwrap_or(self.source.len());
            let trim_left = open.is_some_and(|o| self.has_trim_marker_after(o + LEFT_DELIM.len()));

            let mut text = &self.source[self.pos..text_end];
            if trim_next_text {
                text = text.trim_start();
            }
            if trim_left {
                text = text.trim_end();
            }
            if !text.is_empty() {
                self.push(TokenKind::Text(text.to_string()), self.pos, false);
            }

            let Some(open) = open else {
                self.pos = self.source.len();
                break;
            };

            self.push(TokenKind::LeftDelim, open, false);
            self.pos = open + LEFT_DELIM.len();
            if trim_left {
                // Skip the '-' marker; the following whitespace is skipped below.
                self.pos += 1;
            }
            trim_next_text = self.lex_action()?;
        }
        Ok(self.tokens)
    }

    /// `{{- ` trims preceding text: a '-' followed by whitespace.
    fn has_trim_marker_after(&self, at: usize) -> bool {
        self.bytes.get(at) == Some(&b'-')
            && self
                .bytes
                .get(at + 1)
                .is_some_and(|b| b.is_ascii_whitespace())
    }

    fn push(&mut self, kind: TokenKind, offset: usize, space_before: bool) {
        self.tokens.push(Token {
            kind,
            offset,
            space_before,
        });
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::ParseError {
            template: self.template.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    /// Lex one action. Returns whether the right delimiter requested trimming.
    fn lex_action(&mut self) -> TemplateResult<bool> {
        let start = self.pos;
        let had_space = self.skip_whitespace();
        if self.source[self.pos..].starts_with("/*") {
            return self.lex_comment(start);
        }
        let mut space_before = had_space;

        loop {
            if space_before && self.source[self.pos..].starts_with("-}}") {
                let at = self.pos;
                self.pos += 1 + RIGHT_DELIM.len();
                self.push(TokenKind::RightDelim, at, true);
                return Ok(true);
            }
            if self.source[self.pos..].starts_with(RIGHT_DELIM) {
                let at = self.pos;
                self.pos += RIGHT_DELIM.len();
                self.push(TokenKind::RightDelim, at, space_before);
                return Ok(false);
            }

            let Some(c) = self.peek() else {
                return Err(self.error(start, "unclosed action"));
            };
            let at = self.pos;

            match c {
                b'(' => {
                    self.pos += 1;
                    self.push(TokenKind::LeftParen, at, space_before);
                }
                b')' => {
                    self.pos += 1;
                    self.push(TokenKind::RightParen, at, space_before);
                }
                b'|' => {
                    self.pos += 1;
                    self.push(TokenKind::Pipe, at, space_before);
                }
                b',' => {
                    self.pos += 1;
                    self.push(TokenKind::Comma, at, space_before);
                }
                b':' if self.peek_at(1) == Some(b'=') => {
                    self.pos += 2;
                    self.push(TokenKind::Declare, at, space_before);
                }
                b'=' => {
                    self.pos += 1;
                    self.push(TokenKind::Assign, at, space_before);
                }
                b'"' => {
                    let (quoted, text) = self.lex_quoted()?;
                    self.push(TokenKind::String { quoted, text }, at, space_before);
                }
                b'`' => {
                    let (quoted, text) = self.lex_raw()?;
                    self.push(TokenKind::String { quoted, text }, at, space_before);
                }
                b'.' if self.peek_at(1).is_some_and(is_ident_start) => {
                    let fields = self.lex_field_path();
                    self.push(TokenKind::Field(fields), at, space_before);
                }
                b'.' if self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) => {
                    let number = self.lex_number()?;
                    self.push(TokenKind::Number(number), at, space_before);
                }
                b'.' => {
                    self.pos += 1;
                    self.push(TokenKind::Dot, at, space_before);
                }
                b'$' => {
                    self.pos += 1;
                    let name_start = self.pos;
                    while self.peek().is_some_and(is_ident_char) {
                        self.pos += 1;
                    }
                    let mut ident = vec![format!("${}", &self.source[name_start..self.pos])];
                    ident.extend(self.lex_field_path());
                    self.push(TokenKind::Variable(ident), at, space_before);
                }
                b'-' | b'+' if self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) => {
                    let number = self.lex_number()?;
                    self.push(TokenKind::Number(number), at, space_before);
                }
                c if c.is_ascii_digit() => {
                    let number = self.lex_number()?;
                    self.push(TokenKind::Number(number), at, space_before);
                }
                c if is_ident_start(c) => {
                    while self.peek().is_some_and(is_ident_char) {
                        self.pos += 1;
                    }
                    let word = &self.source[at..self.pos];
                    let kind = match word {
                        "true" => TokenKind::Bool(true),
                        "false" => TokenKind::Bool(false),
                        "nil" => TokenKind::Nil,
                        _ => match Keyword::from_ident(word) {
                            Some(keyword) => TokenKind::Keyword(keyword),
                            None => TokenKind::Identifier(word.to_string()),
                        },
                    };
                    self.push(kind, at, space_before);
                }
                other => {
                    return Err(self.error(
                        at,
                        format!("unexpected character {:?} in action", other as char),
                    ));
                }
            }

            space_before = self.skip_whitespace();
        }
    }

    fn lex_comment(&mut self, start: usize) -> TemplateResult<bool> {
        let body_start = self.pos + 2;
        let Some(len) = self.source[body_start..].find("*/") else {
            return Err(self.error(start, "unclosed comment"));
        };
        let text = self.source[body_start..body_start + len].to_string();
        self.pos = body_start + len + 2;
        let had_space = self.skip_whitespace();
        let trim_right = had_space && self.source[self.pos..].starts_with("-}}");
        if trim_right {
            self.pos += 1;
        }
        if !self.source[self.pos..].starts_with(RIGHT_DELIM) {
            return Err(self.error(start, "comment ends before closing delimiter"));
        }
        self.pos += RIGHT_DELIM.len();
        self.push(TokenKind::Comment(text), start, false);
        Ok(trim_right)
    }

    /// Consume `.ident` segments directly following the current position.
    fn lex_field_path(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        while self.peek() == Some(b'.') && self.peek_at(1).is_some_and(is_ident_start) {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(is_ident_char) {
                self.pos += 1;
            }
            fields.push(self.source[start..self.pos].to_string());
        }
        fields
    }

    fn lex_quoted(&mut self) -> TemplateResult<(String, String)> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            let Some(c) = self.source[self.pos..].chars().next() else {
                return Err(self.error(start, "unterminated quoted string"));
            };
            self.pos += c.len_utf8();
            match c {
                '"' => break,
                '\n' => return Err(self.error(start, "unterminated quoted string")),
                '\\' => {
                    let Some(escaped) = self.source[self.pos..].chars().next() else {
                        return Err(self.error(start, "unterminated quoted string"));
                    };
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '"' => text.push('"'),
                        '\'' => text.push('\''),
                        '\\' => text.push('\\'),
                        other => {
                            return Err(self.error(
                                self.pos - other.len_utf8() - 1,
                                format!("unknown escape sequence \\{}", other),
                            ));
                        }
                    }
                }
                c => text.push(c),
            }
        }
        Ok((self.source[start..self.pos].to_string(), text))
    }

    fn lex_raw(&mut self) -> TemplateResult<(String, String)> {
        let start = self.pos;
        let Some(len) = self.source[start + 1..].find('`') else {
            return Err(self.error(start, "unterminated raw quoted string"));
        };
        let text = self.source[start + 1..start + 1 + len].to_string();
        self.pos = start + len + 2;
        Ok((self.source[start..self.pos].to_string(), text))
    }

    fn lex_number(&mut self) -> TemplateResult<NumberNode> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'_' {
                self.pos += 1;
            } else if c == b'.' && !is_float && self.peek_at(1).is_some_and(|b| b.is_ascii_digit())
            {
                is_float = true;
                self.pos += 1;
            } else if matches!(c, b'e' | b'E') {
                is_float = true;
                self.pos += 1;
                if matches!(self.peek(), Some(b'-' | b'+')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        let clean = text.replace('_', "");
        let value = if is_float {
            clean.parse::<f64>().map(Number::Float).ok()
        } else {
            clean.parse::<i64>().map(Number::Int).ok()
        };
        match value {
            Some(value) => Ok(NumberNode {
                text: text.to_string(),
                value,
            }),
            None => Err(self.error(start, format!("bad number syntax: {:?}", text))),
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex("test", source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_text_only() {
        assert_eq!(kinds("hello"), vec![TokenKind::Text("hello".to_string())]);
    }

    #[test]
    fn test_action_with_field_and_variable() {
        assert_eq!(
            kinds("{{ $x.A .B.C }}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Variable(vec!["$x".to_string(), "A".to_string()]),
                TokenKind::Field(vec!["B".to_string(), "C".to_string()]),
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn test_braces_inside_string_do_not_close_action() {
        let tokens = kinds(r#"{{ $c := "{\"a\": {\"b\": 1}}" }}"#);
        assert_eq!(
            tokens[3],
            TokenKind::String {
                quoted: r#""{\"a\": {\"b\": 1}}""#.to_string(),
                text: r#"{"a": {"b": 1}}"#.to_string(),
            }
        );
        assert_eq!(tokens.last(), Some(&TokenKind::RightDelim));
    }

    #[test]
    fn test_adjacent_field_has_no_space_before() {
        let tokens = lex("test", "{{ partials.Include }}").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Identifier("partials".to_string()));
        assert_eq!(tokens[2].kind, TokenKind::Field(vec!["Include".to_string()]));
        assert!(!tokens[2].space_before);
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(
            kinds("a  {{- . -}}  b"),
            vec![
                TokenKind::Text("a".to_string()),
                TokenKind::LeftDelim,
                TokenKind::Dot,
                TokenKind::RightDelim,
                TokenKind::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_number_is_not_trim_marker() {
        let tokens = kinds("{{-1}}");
        assert!(matches!(tokens[1], TokenKind::Number(NumberNode { value: Number::Int(-1), .. })));
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            kinds("{{/* note */}}"),
            vec![TokenKind::LeftDelim, TokenKind::Comment(" note ".to_string())]
        );
    }

    #[test]
    fn test_unclosed_action_is_error() {
        let err = lex("t", "{{ .Title ").unwrap_err();
        assert!(err.to_string().contains("unclosed action"));
    }

    #[test]
    fn test_declare_and_keywords() {
        assert_eq!(
            kinds("{{ range $i, $e := . }}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Keyword(Keyword::Range),
                TokenKind::Variable(vec!["$i".to_string()]),
                TokenKind::Comma,
                TokenKind::Variable(vec!["$e".to_string()]),
                TokenKind::Declare,
                TokenKind::Dot,
                TokenKind::RightDelim,
            ]
        );
    }
}
