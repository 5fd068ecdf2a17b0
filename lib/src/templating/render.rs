use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::content::RenderContext;
use crate::templating::ast::{Expr, Node};
use crate::value::Value;

/// Renders `nodes` with the variables of `context` in scope.
pub fn render(nodes: &[Node], context: &RenderContext, path: &Path) -> Result<String> {
    let mut scope = Scope { context, locals: vec![], path };
    let mut output = String::new();
    scope.nodes(nodes, &mut output)?;
    Ok(output)
}

struct Scope<'a> {
    context: &'a RenderContext,
    locals: Vec<(Arc<str>, Value)>,
    path: &'a Path,
}

impl Scope<'_> {
    fn nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<()> {
        for node in nodes {
            self.node(node, out)?;
        }

        Ok(())
    }

    fn node(&mut self, node: &Node, out: &mut String) -> Result<()> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output { expr, line } => {
                let value = self.eval(expr, *line)?;
                if !value.is_scalar() {
                    let msg = format!("cannot output {} `{expr}`", value.kind());
                    return Err(self.error(msg, *line));
                }

                let _ = write!(out, "{value}");
            }
            Node::For { var, iter, body, line } => {
                let items: Vec<Value> = match self.eval(iter, *line)? {
                    Value::Array(items) => items.to_vec(),
                    Value::Dict(dict) => dict.iter()
                        .map(|(k, v)| Value::from(crate::dict! { "key" => k.clone(), "value" => v.clone() }))
                        .collect(),
                    value => {
                        let msg = format!("cannot iterate over {} `{iter}`", value.kind());
                        return Err(self.error(msg, *line));
                    }
                };

                for item in items {
                    self.locals.push((var.clone(), item));
                    let result = self.nodes(body, out);
                    self.locals.pop();
                    result?;
                }
            }
            Node::If { cond, then, otherwise, line } => {
                match self.eval(cond, *line)?.is_truthy() {
                    true => self.nodes(then, out)?,
                    false => self.nodes(otherwise, out)?,
                }
            }
        }

        Ok(())
    }

    fn eval(&self, expr: &Expr, line: usize) -> Result<Value> {
        match expr {
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Int(n) => Ok(Value::Num(*n)),
            Expr::Var(path) => self.lookup(path, line).cloned(),
            Expr::Concat(lhs, rhs) => {
                let (lhs, rhs) = (self.eval(lhs, line)?, self.eval(rhs, line)?);
                match (lhs.is_scalar(), rhs.is_scalar()) {
                    (true, true) => Ok(Value::from(format!("{lhs}{rhs}"))),
                    _ => Err(self.error(format!("cannot concatenate non-scalar in `{expr}`"), line)),
                }
            }
            Expr::Call { name, .. } => {
                Err(self.error(format!("call to undefined function `{name}`"), line))
            }
        }
    }

    fn lookup(&self, path: &[Arc<str>], line: usize) -> Result<&Value> {
        let undefined = || {
            let msg = format!("undefined variable `{}`", path.join("."));
            self.error(msg, line)
        };

        let (first, fields) = path.split_first().ok_or_else(undefined)?;
        let mut value = self.locals.iter()
            .rev()
            .find(|(name, _)| name == first)
            .map(|(_, value)| value)
            .or_else(|| self.context.get(first))
            .ok_or_else(undefined)?;

        for field in fields {
            value = value.get(field).ok_or_else(undefined)?;
        }

        Ok(value)
    }

    fn error(&self, message: String, line: usize) -> Error {
        Error::template(message, self.path, line)
    }
}
