/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template execution.
//!
//! A small tree-walking executor over a [`TemplateSet`]. It implements enough
//! of the language to observe what a rewritten tree does: text emission,
//! variables, `if`/`with`/`range`, sub-template invocation, and partials
//! called as functions through a [`Carrier`].

use crate::ast::{Arg, BranchNode, CommandNode, ListNode, Node, Number, PipeNode, TemplateNode};
use crate::context::{Carrier, TemplateValue};
use crate::error::{TemplateError, TemplateResult};
use crate::template::{
    DEFAULT_PARTIAL_EXTENSION, DEFAULT_PARTIAL_NAMESPACE, TemplateSet, qualify_partial_name,
};

/// Maximum nesting of template and partial invocations.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Executes templates registered in a [`TemplateSet`].
pub struct Executor<'a> {
    templates: &'a TemplateSet,
    max_depth: usize,
}

impl<'a> Executor<'a> {
    pub fn new(templates: &'a TemplateSet) -> Self {
        Self {
            templates,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Render the named template with `data` as dot.
    pub fn execute(&self, name: &str, data: &TemplateValue) -> TemplateResult<String> {
        self.run(name, data.clone(), 0)
    }

    /// Invoke a registered partial as a function.
    ///
    /// A partial with a return value receives a [`Carrier`] wrapping `arg` as
    /// dot; its text output is discarded and the value stored in the carrier
    /// is returned (null if the return expression was never reached). Any
    /// other partial returns its rendered text.
    pub fn execute_partial(&self, name: &str, arg: TemplateValue) -> TemplateResult<TemplateValue> {
        self.call_partial(name, arg, 0)
    }

    fn call_partial(
        &self,
        name: &str,
        arg: TemplateValue,
        depth: usize,
    ) -> TemplateResult<TemplateValue> {
        let Some(template) = self.templates.by_name(name) else {
            return Err(TemplateError::TemplateNotFound {
                name: name.to_string(),
            });
        };
        if template.parse_info.has_return {
            let carrier = Carrier::new(arg);
            self.run(name, TemplateValue::Carrier(carrier.clone()), depth)?;
            Ok(carrier.result().unwrap_or_default())
        } else {
            self.run(name, arg, depth).map(TemplateValue::String)
        }
    }

    fn run(&self, name: &str, dot: TemplateValue, depth: usize) -> TemplateResult<String> {
        if depth > self.max_depth {
            return Err(TemplateError::RecursionLimit {
                name: name.to_string(),
                max_depth: self.max_depth,
            });
        }
        let Some(template) = self.templates.by_name(name) else {
            return Err(TemplateError::TemplateNotFound {
                name: name.to_string(),
            });
        };
        let mut state = State {
            executor: self,
            template: name,
            vars: vec![("$".to_string(), dot.clone())],
            depth,
            out: String::new(),
        };
        state.walk_list(&dot, template.root())?;
        Ok(state.out)
    }
}

/// Per-invocation execution state.
struct State<'e, 'a> {
    executor: &'e Executor<'a>,
    template: &'e str,
    /// Variable stack; lookups search from the end so inner declarations shadow.
    vars: Vec<(String, TemplateValue)>,
    depth: usize,
    out: String,
}

impl State<'_, '_> {
    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::ExecError {
            template: self.template.to_string(),
            message: message.into(),
        }
    }

    fn walk_list(&mut self, dot: &TemplateValue, list: &ListNode) -> TemplateResult<()> {
        for node in &list.nodes {
            self.walk(dot, node)?;
        }
        Ok(())
    }

    fn walk(&mut self, dot: &TemplateValue, node: &Node) -> TemplateResult<()> {
        match node {
            Node::Text(text) => self.out.push_str(&text.text),
            Node::Comment(_) => {}
            Node::Action(action) => {
                let value = self.eval_pipeline(dot, &action.pipe, true)?;
                if action.pipe.decl.is_empty() {
                    self.out.push_str(&value.render());
                }
            }
            Node::If(branch) => {
                let mark = self.vars.len();
                let value = self.eval_pipeline(dot, &branch.pipe, true)?;
                let result = self.walk_branch(dot, branch, value.is_truthy(), None);
                self.vars.truncate(mark);
                result?;
            }
            Node::With(branch) => {
                let mark = self.vars.len();
                let value = self.eval_pipeline(dot, &branch.pipe, true)?;
                let truthy = value.is_truthy();
                let result = self.walk_branch(dot, branch, truthy, Some(&value));
                self.vars.truncate(mark);
                result?;
            }
            Node::Range(branch) => self.walk_range(dot, branch)?,
            Node::Template(invocation) => self.walk_template(dot, invocation)?,
        }
        Ok(())
    }

    fn walk_branch(
        &mut self,
        dot: &TemplateValue,
        branch: &BranchNode,
        taken: bool,
        new_dot: Option<&TemplateValue>,
    ) -> TemplateResult<()> {
        if taken {
            self.walk_list(new_dot.unwrap_or(dot), &branch.list)
        } else if let Some(else_list) = &branch.else_list {
            self.walk_list(dot, else_list)
        } else {
            Ok(())
        }
    }

    fn walk_range(&mut self, dot: &TemplateValue, branch: &BranchNode) -> TemplateResult<()> {
        let value = self.eval_pipeline(dot, &branch.pipe, false)?;
        let items: Vec<(TemplateValue, TemplateValue)> = match value {
            TemplateValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (TemplateValue::Int(i as i64), v))
                .collect(),
            TemplateValue::Map(map) => map
                .into_iter()
                .map(|(k, v)| (TemplateValue::String(k), v))
                .collect(),
            TemplateValue::Int(n) => (0..n.max(0))
                .map(|i| (TemplateValue::Int(i), TemplateValue::Int(i)))
                .collect(),
            TemplateValue::Null => Vec::new(),
            other => return Err(self.error(format!("range can't iterate over {}", other))),
        };

        if items.is_empty() {
            if let Some(else_list) = &branch.else_list {
                self.walk_list(dot, else_list)?;
            }
            return Ok(());
        }

        for (key, elem) in items {
            let mark = self.vars.len();
            match branch.pipe.decl.as_slice() {
                [] => {}
                [elem_var] => self.vars.push((elem_var.name().to_string(), elem.clone())),
                [key_var, elem_var, ..] => {
                    self.vars.push((key_var.name().to_string(), key));
                    self.vars.push((elem_var.name().to_string(), elem.clone()));
                }
            }
            let result = self.walk_list(&elem, &branch.list);
            self.vars.truncate(mark);
            result?;
        }
        Ok(())
    }

    fn walk_template(&mut self, dot: &TemplateValue, invocation: &TemplateNode) -> TemplateResult<()> {
        let new_dot = match &invocation.pipe {
            Some(pipe) => self.eval_pipeline(dot, pipe, true)?,
            None => TemplateValue::Null,
        };
        let rendered = self
            .executor
            .run(&invocation.name, new_dot, self.depth + 1)?;
        self.out.push_str(&rendered);
        Ok(())
    }

    /// Evaluate a pipeline. Each command receives the previous command's
    /// result as its final argument. With `bind_decls` the result is bound to
    /// the declared (or assigned) variables.
    fn eval_pipeline(
        &mut self,
        dot: &TemplateValue,
        pipe: &PipeNode,
        bind_decls: bool,
    ) -> TemplateResult<TemplateValue> {
        let mut value = None;
        for cmd in &pipe.cmds {
            value = Some(self.eval_command(dot, cmd, value.take())?);
        }
        let value = value.unwrap_or_default();

        if bind_decls {
            for var in &pipe.decl {
                if pipe.is_assign {
                    self.assign(var.name(), value.clone())?;
                } else {
                    self.vars.push((var.name().to_string(), value.clone()));
                }
            }
        }
        Ok(value)
    }

    fn eval_command(
        &mut self,
        dot: &TemplateValue,
        cmd: &CommandNode,
        final_arg: Option<TemplateValue>,
    ) -> TemplateResult<TemplateValue> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Err(self.error("empty command"));
        };
        match first {
            Arg::Identifier(name) => {
                let args = self.eval_args(dot, rest, final_arg)?;
                self.call_function(name, args)
            }
            Arg::Chain(chain) if matches!(chain.node.as_ref(), Arg::Identifier(_)) => {
                let name = first.to_string();
                let args = self.eval_args(dot, rest, final_arg)?;
                self.call_function(&name, args)
            }
            Arg::Field(field) => {
                self.eval_field_chain(dot, dot.clone(), &field.ident, rest, final_arg)
            }
            Arg::Variable(var) => {
                let receiver = self.lookup(var.name())?;
                self.eval_field_chain(dot, receiver, &var.ident[1..], rest, final_arg)
            }
            Arg::Chain(chain) => {
                let receiver = self.eval_arg(dot, &chain.node)?;
                self.eval_field_chain(dot, receiver, &chain.field, rest, final_arg)
            }
            operand => {
                if !rest.is_empty() || final_arg.is_some() {
                    return Err(self.error(format!("can't give argument to non-function {}", operand)));
                }
                self.eval_arg(dot, operand)
            }
        }
    }

    fn eval_args(
        &mut self,
        dot: &TemplateValue,
        args: &[Arg],
        final_arg: Option<TemplateValue>,
    ) -> TemplateResult<Vec<TemplateValue>> {
        let mut values = Vec::with_capacity(args.len() + 1);
        for arg in args {
            values.push(self.eval_arg(dot, arg)?);
        }
        values.extend(final_arg);
        Ok(values)
    }

    /// Walk a field path from `receiver`. The last field may be a method
    /// call when arguments are present; `Set` on a carrier is the only method.
    fn eval_field_chain(
        &mut self,
        dot: &TemplateValue,
        receiver: TemplateValue,
        fields: &[String],
        args: &[Arg],
        final_arg: Option<TemplateValue>,
    ) -> TemplateResult<TemplateValue> {
        let Some((last, path)) = fields.split_last() else {
            if !args.is_empty() || final_arg.is_some() {
                return Err(self.error("can't give argument to non-function"));
            }
            return Ok(receiver);
        };
        let mut receiver = receiver;
        for field in path {
            receiver = receiver.field(field).unwrap_or_default();
        }

        if let TemplateValue::Carrier(carrier) = &receiver {
            if last == "Set" {
                let mut values = self.eval_args(dot, args, final_arg)?;
                if values.len() != 1 {
                    return Err(self.error(format!(
                        "wrong number of args for Set: want 1 got {}",
                        values.len()
                    )));
                }
                carrier.set(values.remove(0));
                return Ok(TemplateValue::Null);
            }
        }

        if !args.is_empty() || final_arg.is_some() {
            return Err(self.error(format!("{} is not a method but has arguments", last)));
        }
        Ok(receiver.field(last).unwrap_or_default())
    }

    fn eval_arg(&mut self, dot: &TemplateValue, arg: &Arg) -> TemplateResult<TemplateValue> {
        Ok(match arg {
            Arg::Identifier(name) => self.call_function(name, Vec::new())?,
            Arg::Dot => dot.clone(),
            Arg::Field(field) => {
                let path: Vec<&str> = field.ident.iter().map(String::as_str).collect();
                dot.get_path(&path).unwrap_or_default()
            }
            Arg::Variable(var) => {
                let value = self.lookup(var.name())?;
                let path: Vec<&str> = var.ident[1..].iter().map(String::as_str).collect();
                value.get_path(&path).unwrap_or_default()
            }
            Arg::Chain(chain) => {
                let value = self.eval_arg(dot, &chain.node)?;
                let path: Vec<&str> = chain.field.iter().map(String::as_str).collect();
                value.get_path(&path).unwrap_or_default()
            }
            Arg::String(s) => TemplateValue::String(s.text.clone()),
            Arg::Number(n) => match n.value {
                Number::Int(i) => TemplateValue::Int(i),
                Number::Float(f) => TemplateValue::Float(f),
            },
            Arg::Bool(b) => TemplateValue::Bool(*b),
            Arg::Nil => TemplateValue::Null,
            Arg::Pipe(pipe) => {
                let mark = self.vars.len();
                let value = self.eval_pipeline(dot, pipe, true);
                self.vars.truncate(mark);
                value?
            }
        })
    }

    fn lookup(&self, name: &str) -> TemplateResult<TemplateValue> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| self.error(format!("undefined variable: {}", name)))
    }

    fn assign(&mut self, name: &str, value: TemplateValue) -> TemplateResult<()> {
        match self.vars.iter_mut().rev().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = value;
                Ok(())
            }
            None => Err(self.error(format!("undefined variable: {}", name))),
        }
    }

    fn call_function(
        &mut self,
        name: &str,
        mut args: Vec<TemplateValue>,
    ) -> TemplateResult<TemplateValue> {
        match name {
            "partial" | "partialCached" | "partials.Include" | "partials.IncludeCached" => {
                let partial = match args.first() {
                    Some(TemplateValue::String(s)) => s.clone(),
                    _ => return Err(self.error(format!("{}: expected a partial name", name))),
                };
                let context = if args.len() > 1 {
                    args.swap_remove(1)
                } else {
                    TemplateValue::Null
                };
                let qualified = qualify_partial_name(
                    &partial,
                    DEFAULT_PARTIAL_NAMESPACE,
                    DEFAULT_PARTIAL_EXTENSION,
                );
                self.executor
                    .call_partial(&qualified, context, self.depth + 1)
            }
            "slice" => Ok(TemplateValue::List(args)),
            "print" => Ok(TemplateValue::String(sprint(&args))),
            "eq" => match args.split_first() {
                Some((first, rest)) if !rest.is_empty() => {
                    Ok(TemplateValue::Bool(rest.iter().any(|v| v == first)))
                }
                _ => Err(self.error("eq: missing argument for comparison")),
            },
            "not" => match args.as_slice() {
                [value] => Ok(TemplateValue::Bool(!value.is_truthy())),
                _ => Err(self.error(format!("not: want 1 argument got {}", args.len()))),
            },
            "len" => match args.as_slice() {
                [TemplateValue::String(s)] => Ok(TemplateValue::Int(s.chars().count() as i64)),
                [TemplateValue::List(items)] => Ok(TemplateValue::Int(items.len() as i64)),
                [TemplateValue::Map(map)] => Ok(TemplateValue::Int(map.len() as i64)),
                _ => Err(self.error("len of unsupported value")),
            },
            "add" => match args.as_slice() {
                [TemplateValue::Int(a), TemplateValue::Int(b)] => a
                    .checked_add(*b)
                    .map(TemplateValue::Int)
                    .ok_or_else(|| self.error("add: integer overflow")),
                [TemplateValue::Int(a), TemplateValue::Float(b)] => {
                    Ok(TemplateValue::Float(*a as f64 + b))
                }
                [TemplateValue::Float(a), TemplateValue::Int(b)] => {
                    Ok(TemplateValue::Float(a + *b as f64))
                }
                [TemplateValue::Float(a), TemplateValue::Float(b)] => {
                    Ok(TemplateValue::Float(a + b))
                }
                [TemplateValue::String(a), TemplateValue::String(b)] => {
                    Ok(TemplateValue::String(format!("{}{}", a, b)))
                }
                _ => Err(self.error("add: unsupported operands")),
            },
            _ => Err(TemplateError::UnknownFunction {
                name: name.to_string(),
            }),
        }
    }
}

/// Concatenate operands, adding a space between two operands when neither is
/// a string.
fn sprint(args: &[TemplateValue]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            let prev_is_string = matches!(args[i - 1], TemplateValue::String(_));
            let is_string = matches!(arg, TemplateValue::String(_));
            if !prev_is_string && !is_string {
                out.push(' ');
            }
        }
        out.push_str(&arg.render());
    }
    out
}
