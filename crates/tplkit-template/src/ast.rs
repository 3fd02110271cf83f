/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template syntax tree.
//!
//! The node grammar is closed: every construct the parser can produce is a
//! variant of [`Node`] or [`Arg`], and every pass over the tree matches on
//! them exhaustively.
//!
//! Each type implements [`std::fmt::Display`], printing the node back in
//! template syntax. The printed form is what analysis passes compare against
//! when they need the "rendered name" of an expression (for example
//! `partials.Include` for a chain node).

use std::fmt;

/// A node in the template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text emitted as-is.
    Text(TextNode),

    /// `{{ pipeline }}`
    Action(ActionNode),

    /// `{{ if pipeline }}...{{ else }}...{{ end }}`
    If(BranchNode),

    /// `{{ with pipeline }}...{{ else }}...{{ end }}`
    With(BranchNode),

    /// `{{ range pipeline }}...{{ else }}...{{ end }}`
    Range(BranchNode),

    /// `{{ template "name" pipeline }}`
    Template(TemplateNode),

    /// `{{/* comment */}}`
    Comment(CommentNode),
}

/// An ordered sequence of nodes. The root of every template is a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListNode {
    pub nodes: Vec<Node>,
}

impl ListNode {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Literal text node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
}

/// Comment node. Produces no output.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub text: String,
}

/// An action: a pipeline whose value is printed unless it declares variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub pipe: PipeNode,
}

/// Shared shape of `if`, `with` and `range`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    /// Condition (or range source).
    pub pipe: PipeNode,
    /// Body executed when the condition holds.
    pub list: ListNode,
    /// Optional `{{ else }}` body.
    pub else_list: Option<ListNode>,
}

/// Sub-template invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    /// Name of the invoked template.
    pub name: String,
    /// Optional argument, becomes dot inside the invoked template.
    pub pipe: Option<PipeNode>,
}

/// A pipeline: optional variable declarations followed by `|`-separated commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipeNode {
    /// `true` for `$x = ...` (assignment), `false` for `$x := ...` (declaration).
    pub is_assign: bool,
    /// Declared or assigned variables.
    pub decl: Vec<VariableNode>,
    /// Commands in pipeline order.
    pub cmds: Vec<CommandNode>,
}

impl PipeNode {
    /// A pipeline holding a single command and no declarations.
    pub fn from_command(cmd: CommandNode) -> Self {
        Self {
            is_assign: false,
            decl: Vec::new(),
            cmds: vec![cmd],
        }
    }
}

/// A command: a function or method call, or a single operand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandNode {
    pub args: Vec<Arg>,
}

impl CommandNode {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }
}

/// A command argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Bare identifier, usually a function name: `partial`
    Identifier(String),
    /// `.`
    Dot,
    /// Field path on dot: `.Params.title`
    Field(FieldNode),
    /// Variable with optional field path: `$page.Title`, `$`
    Variable(VariableNode),
    /// Field access on a non-dot operand: `partials.Include`, `(pipe).Field`
    Chain(ChainNode),
    /// String literal.
    String(StringNode),
    /// Numeric literal.
    Number(NumberNode),
    /// `true` / `false`
    Bool(bool),
    /// `nil`
    Nil,
    /// Parenthesised pipeline.
    Pipe(PipeNode),
}

/// `.A.B` is `ident = ["A", "B"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub ident: Vec<String>,
}

/// `$x.A` is `ident = ["$x", "A"]`; the first element always starts with `$`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableNode {
    pub ident: Vec<String>,
}

impl VariableNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ident: vec![name.into()],
        }
    }

    /// The variable name without any field path.
    pub fn name(&self) -> &str {
        self.ident.first().map_or("$", String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
    pub node: Box<Arg>,
    pub field: Vec<String>,
}

/// String literal. `quoted` keeps the source form, `text` the unescaped value.
#[derive(Debug, Clone, PartialEq)]
pub struct StringNode {
    pub quoted: String,
    pub text: String,
}

impl StringNode {
    /// Build a string node from its unescaped value.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            quoted: quote(&text),
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    pub text: String,
    pub value: Number,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ============================================================================
// Printing
// ============================================================================

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(t) => f.write_str(&t.text),
            Node::Action(a) => write!(f, "{{{{{}}}}}", a.pipe),
            Node::If(b) => write_branch(f, "if", b),
            Node::With(b) => write_branch(f, "with", b),
            Node::Range(b) => write_branch(f, "range", b),
            Node::Template(t) => match &t.pipe {
                Some(pipe) => write!(f, "{{{{template {} {}}}}}", quote(&t.name), pipe),
                None => write!(f, "{{{{template {}}}}}", quote(&t.name)),
            },
            Node::Comment(c) => write!(f, "{{{{/*{}*/}}}}", c.text),
        }
    }
}

fn write_branch(f: &mut fmt::Formatter<'_>, keyword: &str, b: &BranchNode) -> fmt::Result {
    write!(f, "{{{{{} {}}}}}{}", keyword, b.pipe, b.list)?;
    if let Some(else_list) = &b.else_list {
        write!(f, "{{{{else}}}}{}", else_list)?;
    }
    f.write_str("{{end}}")
}

impl fmt::Display for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl fmt::Display for PipeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            for (i, v) in self.decl.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", v)?;
            }
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Identifier(name) => f.write_str(name),
            Arg::Dot => f.write_str("."),
            Arg::Field(field) => write!(f, "{}", field),
            Arg::Variable(var) => write!(f, "{}", var),
            Arg::Chain(chain) => {
                match chain.node.as_ref() {
                    Arg::Pipe(pipe) => write!(f, "({})", pipe)?,
                    other => write!(f, "{}", other)?,
                }
                for field in &chain.field {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
            Arg::String(s) => f.write_str(&s.quoted),
            Arg::Number(n) => f.write_str(&n.text),
            Arg::Bool(b) => write!(f, "{}", b),
            Arg::Nil => f.write_str("nil"),
            Arg::Pipe(pipe) => write!(f, "({})", pipe),
        }
    }
}

impl fmt::Display for FieldNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ident in &self.ident {
            write!(f, ".{}", ident)?;
        }
        Ok(())
    }
}

impl fmt::Display for VariableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident.join("."))
    }
}
