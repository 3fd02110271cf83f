/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Recursive-descent parser producing the template syntax tree.
//!
//! `define` blocks are collected separately from the main body so the
//! registry can register them as templates of their own.

use crate::ast::{
    ActionNode, Arg, BranchNode, ChainNode, CommandNode, CommentNode, FieldNode, ListNode, Node,
    PipeNode, StringNode, TemplateNode, TextNode, VariableNode,
};
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Keyword, Token, TokenKind, lex};

/// Result of parsing one template source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTemplate {
    /// The main body.
    pub root: ListNode,
    /// `{{ define "name" }}` blocks in source order.
    pub defines: Vec<(String, ListNode)>,
}

/// Parse template source into a syntax tree.
///
/// `name` is only used in error messages.
pub fn parse(name: &str, source: &str) -> TemplateResult<ParsedTemplate> {
    let tokens = lex(name, source)?;
    let mut parser = Parser {
        name,
        tokens,
        pos: 0,
        defines: Vec::new(),
        depth: 0,
    };
    let (root, end) = parser.parse_list()?;
    match end {
        ListEnd::Eof => Ok(ParsedTemplate {
            root,
            defines: parser.defines,
        }),
        ListEnd::End(offset) => Err(parser.error_at(offset, "unexpected {{end}}")),
        ListEnd::Else(offset) | ListEnd::ElseIf(offset, _) | ListEnd::ElseWith(offset, _) => {
            Err(parser.error_at(offset, "unexpected {{else}}"))
        }
    }
}

/// How a list ended.
enum ListEnd {
    Eof,
    End(usize),
    Else(usize),
    ElseIf(usize, PipeNode),
    ElseWith(usize, PipeNode),
}

#[derive(Clone, Copy, PartialEq)]
enum BranchKind {
    If,
    With,
    Range,
}

struct Parser<'a> {
    name: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    defines: Vec<(String, ListNode)>,
    /// Nesting depth of control structures; `define` is only legal at zero.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error_at(&self, offset: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::ParseError {
            template: self.name.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> TemplateError {
        let offset = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.offset);
        self.error_at(offset, message)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> TemplateResult<Token> {
        match self.next() {
            Some(token) if &token.kind == expected => Ok(token),
            Some(token) => Err(self.error_at(token.offset, format!("expected {}", what))),
            None => Err(self.error_here(format!("expected {}, found end of input", what))),
        }
    }

    fn parse_list(&mut self) -> TemplateResult<(ListNode, ListEnd)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Text(text) => nodes.push(Node::Text(TextNode { text })),
                TokenKind::LeftDelim => {
                    if let Some(end) = self.parse_action(token.offset, &mut nodes)? {
                        return Ok((ListNode::new(nodes), end));
                    }
                }
                _ => return Err(self.error_at(token.offset, "unexpected token outside action")),
            }
        }
        Ok((ListNode::new(nodes), ListEnd::Eof))
    }

    /// Parse the action after `{{`. Returns `Some` when the action closes the
    /// enclosing list (`end` or an `else` form).
    fn parse_action(
        &mut self,
        offset: usize,
        nodes: &mut Vec<Node>,
    ) -> TemplateResult<Option<ListEnd>> {
        match self.peek().cloned() {
            Some(TokenKind::Comment(text)) => {
                self.pos += 1;
                nodes.push(Node::Comment(CommentNode { text }));
            }
            Some(TokenKind::Keyword(Keyword::End)) => {
                self.pos += 1;
                self.expect(&TokenKind::RightDelim, "}} after end")?;
                return Ok(Some(ListEnd::End(offset)));
            }
            Some(TokenKind::Keyword(Keyword::Else)) => {
                self.pos += 1;
                return match self.peek() {
                    Some(TokenKind::Keyword(Keyword::If)) => {
                        self.pos += 1;
                        let pipe = self.parse_pipeline(true)?;
                        self.expect(&TokenKind::RightDelim, "}} after else if")?;
                        Ok(Some(ListEnd::ElseIf(offset, pipe)))
                    }
                    Some(TokenKind::Keyword(Keyword::With)) => {
                        self.pos += 1;
                        let pipe = self.parse_pipeline(true)?;
                        self.expect(&TokenKind::RightDelim, "}} after else with")?;
                        Ok(Some(ListEnd::ElseWith(offset, pipe)))
                    }
                    _ => {
                        self.expect(&TokenKind::RightDelim, "}} after else")?;
                        Ok(Some(ListEnd::Else(offset)))
                    }
                };
            }
            Some(TokenKind::Keyword(keyword @ (Keyword::If | Keyword::With | Keyword::Range))) => {
                self.pos += 1;
                let kind = match keyword {
                    Keyword::If => BranchKind::If,
                    Keyword::With => BranchKind::With,
                    _ => BranchKind::Range,
                };
                let pipe = self.parse_pipeline(true)?;
                self.expect(&TokenKind::RightDelim, "}} after control pipeline")?;
                nodes.push(self.parse_branch(kind, pipe, offset)?);
            }
            Some(TokenKind::Keyword(Keyword::Template)) => {
                self.pos += 1;
                let name = self.parse_template_name("template")?;
                let pipe = if self.peek() == Some(&TokenKind::RightDelim) {
                    None
                } else {
                    Some(self.parse_pipeline(false)?)
                };
                self.expect(&TokenKind::RightDelim, "}} after template invocation")?;
                nodes.push(Node::Template(TemplateNode { name, pipe }));
            }
            Some(TokenKind::Keyword(Keyword::Define)) => {
                self.pos += 1;
                if self.depth > 0 {
                    return Err(self.error_at(offset, "define is only allowed at top level"));
                }
                let name = self.parse_template_name("define")?;
                self.expect(&TokenKind::RightDelim, "}} after define")?;
                self.depth += 1;
                let (body, end) = self.parse_list()?;
                self.depth -= 1;
                match end {
                    ListEnd::End(_) => self.defines.push((name, body)),
                    _ => return Err(self.error_at(offset, "unterminated define")),
                }
            }
            _ => {
                let pipe = self.parse_pipeline(true)?;
                self.expect(&TokenKind::RightDelim, "}}")?;
                nodes.push(Node::Action(ActionNode { pipe }));
            }
        }
        Ok(None)
    }

    fn parse_template_name(&mut self, keyword: &str) -> TemplateResult<String> {
        match self.next() {
            Some(Token {
                kind: TokenKind::String { text, .. },
                ..
            }) => Ok(text),
            Some(token) => Err(self.error_at(
                token.offset,
                format!("expected template name string after {}", keyword),
            )),
            None => Err(self.error_here(format!("expected template name after {}", keyword))),
        }
    }

    fn parse_branch(
        &mut self,
        kind: BranchKind,
        pipe: PipeNode,
        offset: usize,
    ) -> TemplateResult<Node> {
        self.depth += 1;
        let result = self.parse_branch_body(kind, pipe, offset);
        self.depth -= 1;
        let branch = result?;
        Ok(match kind {
            BranchKind::If => Node::If(branch),
            BranchKind::With => Node::With(branch),
            BranchKind::Range => Node::Range(branch),
        })
    }

    fn parse_branch_body(
        &mut self,
        kind: BranchKind,
        pipe: PipeNode,
        offset: usize,
    ) -> TemplateResult<BranchNode> {
        let (list, end) = self.parse_list()?;
        let else_list = match end {
            ListEnd::End(_) => None,
            ListEnd::Else(_) => {
                let (else_list, end) = self.parse_list()?;
                match end {
                    ListEnd::End(_) => Some(else_list),
                    ListEnd::Eof => return Err(self.error_at(offset, "unexpected EOF")),
                    _ => return Err(self.error_here("expected {{end}} after {{else}} body")),
                }
            }
            // `{{ else if }}` shares the outer `{{ end }}`.
            ListEnd::ElseIf(else_offset, else_pipe) if kind == BranchKind::If => {
                let nested = self.parse_branch_body(kind, else_pipe, else_offset)?;
                Some(ListNode::new(vec![Node::If(nested)]))
            }
            ListEnd::ElseWith(else_offset, else_pipe) if kind == BranchKind::With => {
                let nested = self.parse_branch_body(kind, else_pipe, else_offset)?;
                Some(ListNode::new(vec![Node::With(nested)]))
            }
            ListEnd::ElseIf(else_offset, _) | ListEnd::ElseWith(else_offset, _) => {
                return Err(self.error_at(else_offset, "else clause does not match block"));
            }
            ListEnd::Eof => return Err(self.error_at(offset, "unexpected EOF")),
        };
        Ok(BranchNode {
            pipe,
            list,
            else_list,
        })
    }

    /// Parse a pipeline up to (not including) `}}` or `)`.
    fn parse_pipeline(&mut self, allow_decl: bool) -> TemplateResult<PipeNode> {
        let mut pipe = PipeNode::default();
        if allow_decl {
            self.parse_declarations(&mut pipe)?;
        }
        loop {
            pipe.cmds.push(self.parse_command()?);
            if self.peek() == Some(&TokenKind::Pipe) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(pipe)
    }

    fn parse_declarations(&mut self, pipe: &mut PipeNode) -> TemplateResult<()> {
        let single = matches!(
            (self.peek(), self.peek_at(1)),
            (
                Some(TokenKind::Variable(v)),
                Some(TokenKind::Declare | TokenKind::Assign)
            ) if v.len() == 1
        );
        let pair = matches!(
            (self.peek(), self.peek_at(1), self.peek_at(2), self.peek_at(3)),
            (
                Some(TokenKind::Variable(a)),
                Some(TokenKind::Comma),
                Some(TokenKind::Variable(b)),
                Some(TokenKind::Declare | TokenKind::Assign)
            ) if a.len() == 1 && b.len() == 1
        );
        if !single && !pair {
            return Ok(());
        }
        loop {
            match self.next().map(|t| t.kind) {
                Some(TokenKind::Variable(ident)) => pipe.decl.push(VariableNode { ident }),
                Some(TokenKind::Comma) => {}
                Some(TokenKind::Declare) => break,
                Some(TokenKind::Assign) => {
                    pipe.is_assign = true;
                    break;
                }
                _ => return Err(self.error_here("malformed variable declaration")),
            }
        }
        Ok(())
    }

    fn parse_command(&mut self) -> TemplateResult<CommandNode> {
        let mut args = Vec::new();
        while !matches!(
            self.peek(),
            None | Some(TokenKind::RightDelim | TokenKind::RightParen | TokenKind::Pipe)
        ) {
            args.push(self.parse_operand()?);
        }
        if args.is_empty() {
            return Err(self.error_here("missing value for command"));
        }
        Ok(CommandNode::new(args))
    }

    fn parse_operand(&mut self) -> TemplateResult<Arg> {
        let mut term = self.parse_term()?;
        while let Some(Token {
            kind: TokenKind::Field(fields),
            space_before: false,
            ..
        }) = self.tokens.get(self.pos).cloned()
        {
            self.pos += 1;
            term = match term {
                Arg::Field(mut field) => {
                    field.ident.extend(fields);
                    Arg::Field(field)
                }
                Arg::Variable(mut var) => {
                    var.ident.extend(fields);
                    Arg::Variable(var)
                }
                Arg::Chain(mut chain) => {
                    chain.field.extend(fields);
                    Arg::Chain(chain)
                }
                other => Arg::Chain(ChainNode {
                    node: Box::new(other),
                    field: fields,
                }),
            };
        }
        Ok(term)
    }

    fn parse_term(&mut self) -> TemplateResult<Arg> {
        let Some(token) = self.next() else {
            return Err(self.error_here("unexpected end of input in operand"));
        };
        let arg = match token.kind {
            TokenKind::Identifier(name) => Arg::Identifier(name),
            TokenKind::Dot => Arg::Dot,
            TokenKind::Field(ident) => Arg::Field(FieldNode { ident }),
            TokenKind::Variable(ident) => Arg::Variable(VariableNode { ident }),
            TokenKind::String { quoted, text } => Arg::String(StringNode { quoted, text }),
            TokenKind::Number(number) => Arg::Number(number),
            TokenKind::Bool(b) => Arg::Bool(b),
            TokenKind::Nil => Arg::Nil,
            TokenKind::LeftParen => {
                let pipe = self.parse_pipeline(true)?;
                self.expect(&TokenKind::RightParen, "closing parenthesis")?;
                Arg::Pipe(pipe)
            }
            TokenKind::Keyword(keyword) => {
                return Err(self.error_at(
                    token.offset,
                    format!("unexpected keyword {:?} in operand", keyword),
                ));
            }
            _ => return Err(self.error_at(token.offset, "unexpected token in operand")),
        };
        Ok(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Number, NumberNode};
    use pretty_assertions::assert_eq;

    fn root(source: &str) -> ListNode {
        parse("test", source).unwrap().root
    }

    fn first_cmd(source: &str) -> CommandNode {
        match &root(source).nodes[0] {
            Node::Action(a) => a.pipe.cmds[0].clone(),
            other => panic!("expected action, got {:?}", other),
        }
    }

    // ========================================================================
    // Actions and commands
    // ========================================================================

    #[test]
    fn test_partial_call() {
        let cmd = first_cmd(r#"{{ partial "header" . }}"#);
        assert_eq!(
            cmd.args,
            vec![
                Arg::Identifier("partial".to_string()),
                Arg::String(StringNode::new("header")),
                Arg::Dot,
            ]
        );
    }

    #[test]
    fn test_namespaced_call_is_chain() {
        let cmd = first_cmd(r#"{{ partials.IncludeCached "x" . }}"#);
        assert_eq!(cmd.args[0].to_string(), "partials.IncludeCached");
        assert!(matches!(cmd.args[0], Arg::Chain(_)));
    }

    #[test]
    fn test_config_declaration() {
        let parsed = root(r#"{{ $_hugo_config := `{ "version": 1 }` }}"#);
        let Node::Action(action) = &parsed.nodes[0] else {
            panic!("expected action");
        };
        assert_eq!(action.pipe.decl, vec![VariableNode::new("$_hugo_config")]);
        assert!(!action.pipe.is_assign);
        assert_eq!(
            action.pipe.cmds[0].args,
            vec![Arg::String(StringNode {
                quoted: r#"`{ "version": 1 }`"#.to_string(),
                text: r#"{ "version": 1 }"#.to_string(),
            })]
        );
    }

    #[test]
    fn test_pipeline_and_nested_pipe() {
        let parsed = root("{{ $x = (slice .Arg) | len }}");
        let Node::Action(action) = &parsed.nodes[0] else {
            panic!("expected action");
        };
        assert!(action.pipe.is_assign);
        assert_eq!(action.pipe.cmds.len(), 2);
        assert_eq!(action.pipe.to_string(), "$x = (slice .Arg) | len");
    }

    #[test]
    fn test_method_call_on_variable() {
        let cmd = first_cmd(r#"{{ $_hugo_dot.Set ("PLACEHOLDER") }}"#);
        assert_eq!(
            cmd.args[0],
            Arg::Variable(VariableNode {
                ident: vec!["$_hugo_dot".to_string(), "Set".to_string()],
            })
        );
        assert!(matches!(cmd.args[1], Arg::Pipe(_)));
    }

    #[test]
    fn test_numbers() {
        let cmd = first_cmd("{{ add 1 2.5 }}");
        assert_eq!(
            cmd.args[1],
            Arg::Number(NumberNode {
                text: "1".to_string(),
                value: Number::Int(1),
            })
        );
        assert_eq!(
            cmd.args[2],
            Arg::Number(NumberNode {
                text: "2.5".to_string(),
                value: Number::Float(2.5),
            })
        );
    }

    // ========================================================================
    // Control structures
    // ========================================================================

    #[test]
    fn test_if_else_if_chain() {
        let parsed = root("{{ if .A }}a{{ else if .B }}b{{ else }}c{{ end }}");
        assert_eq!(
            parsed.to_string(),
            "{{if .A}}a{{else}}{{if .B}}b{{else}}c{{end}}{{end}}"
        );
    }

    #[test]
    fn test_range_with_declarations() {
        let parsed = root("{{ range $i, $e := .Items }}{{ $e }}{{ end }}");
        let Node::Range(range) = &parsed.nodes[0] else {
            panic!("expected range");
        };
        assert_eq!(range.pipe.decl.len(), 2);
        assert_eq!(range.list.nodes.len(), 1);
        assert!(range.else_list.is_none());
    }

    #[test]
    fn test_template_invocation() {
        let parsed = root(r#"{{ template "inner" .Page }}"#);
        assert_eq!(
            parsed.nodes[0],
            Node::Template(TemplateNode {
                name: "inner".to_string(),
                pipe: Some(PipeNode::from_command(CommandNode::new(vec![Arg::Field(
                    FieldNode {
                        ident: vec!["Page".to_string()],
                    }
                )]))),
            })
        );
    }

    #[test]
    fn test_define_blocks_are_collected() {
        let parsed = parse("t", r#"main{{ define "a" }}A{{ end }}{{ template "a" }}"#).unwrap();
        assert_eq!(parsed.defines.len(), 1);
        assert_eq!(parsed.defines[0].0, "a");
        assert_eq!(parsed.defines[0].1.to_string(), "A");
        assert_eq!(parsed.root.to_string(), "main{{template \"a\"}}");
    }

    #[test]
    fn test_wrapper_shape_round_trips() {
        let source = r#"{{ $_hugo_dot := $ }}{{ $ := .Arg }}{{ range (slice .Arg) }}{{ $_hugo_dot.Set ("PLACEHOLDER") }}{{ end }}"#;
        assert_eq!(
            root(source).to_string(),
            r#"{{$_hugo_dot := $}}{{$ := .Arg}}{{range (slice .Arg)}}{{$_hugo_dot.Set ("PLACEHOLDER")}}{{end}}"#
        );
    }

    // ========================================================================
    // Errors
    // ========================================================================

    #[test]
    fn test_unterminated_if() {
        let err = parse("t", "{{ if . }}x").unwrap_err();
        assert!(err.to_string().contains("unexpected EOF"));
    }

    #[test]
    fn test_stray_end() {
        let err = parse("t", "x{{ end }}").unwrap_err();
        assert!(err.to_string().contains("unexpected {{end}}"));
    }

    #[test]
    fn test_empty_action() {
        assert!(parse("t", "{{ }}").is_err());
    }

    #[test]
    fn test_nested_define_rejected() {
        let err = parse("t", r#"{{ if . }}{{ define "x" }}{{ end }}{{ end }}"#).unwrap_err();
        assert!(err.to_string().contains("top level"));
    }
}
