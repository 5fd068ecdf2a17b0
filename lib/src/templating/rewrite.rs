use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::templating::ast::{Expr, Helper, Node};

/// Resolves every link helper call in `nodes` against `base_url`.
///
/// The tree is rewritten bottom-up, so a helper's arguments are resolved
/// before the helper itself: `page(asset("x"))` is a constant. Calls to
/// anything other than a helper are left alone.
pub fn resolve_helpers(nodes: Vec<Node>, base_url: &str, path: &Path) -> Result<Vec<Node>> {
    Rewriter { base_url, path }.nodes(nodes)
}

struct Rewriter<'a> {
    base_url: &'a str,
    path: &'a Path,
}

impl Rewriter<'_> {
    fn nodes(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        nodes.into_iter().map(|node| self.node(node)).collect()
    }

    fn node(&self, node: Node) -> Result<Node> {
        Ok(match node {
            Node::Text(text) => Node::Text(text),
            Node::Output { expr, line } => Node::Output { expr: self.expr(expr, line)?, line },
            Node::For { var, iter, body, line } => Node::For {
                var,
                iter: self.expr(iter, line)?,
                body: self.nodes(body)?,
                line,
            },
            Node::If { cond, then, otherwise, line } => Node::If {
                cond: self.expr(cond, line)?,
                then: self.nodes(then)?,
                otherwise: self.nodes(otherwise)?,
                line,
            },
        })
    }

    fn expr(&self, expr: Expr, line: usize) -> Result<Expr> {
        match expr {
            Expr::Concat(lhs, rhs) => {
                let lhs = self.expr(*lhs, line)?;
                let rhs = self.expr(*rhs, line)?;
                Ok(Expr::Concat(Box::new(lhs), Box::new(rhs)))
            }
            Expr::Call { name, args } => {
                let args = args.into_iter()
                    .map(|arg| self.expr(arg, line))
                    .collect::<Result<Vec<_>>>()?;

                match Helper::from_name(&name) {
                    Some(helper) => self.helper(helper, args, line),
                    None => Ok(Expr::Call { name, args }),
                }
            }
            expr => Ok(expr),
        }
    }

    fn helper(&self, helper: Helper, args: Vec<Expr>, line: usize) -> Result<Expr> {
        let name = helper.name();
        match (helper, args.as_slice()) {
            (Helper::Base, []) => Ok(Expr::Var(vec![Arc::from("base_url")])),
            (_, []) => Err(self.error(format!("`{name}` requires a path argument"), line)),
            (_, [arg]) => match constant(arg) {
                Some(value) => Ok(Expr::Str(helper.url(self.base_url, &value).into())),
                None => {
                    let msg = format!("argument to `{name}` must be a string constant, found `{arg}`");
                    Err(self.error(msg, line))
                }
            },
            (_, args) => {
                let msg = format!("`{name}` takes one argument but {} were given", args.len());
                Err(self.error(msg, line))
            }
        }
    }

    fn error(&self, message: String, line: usize) -> Error {
        Error::template(message, self.path, line)
    }
}

/// Evaluates `expr` if it is built only of string literals and `<>`.
fn constant(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Str(s) => Some(s.to_string()),
        Expr::Concat(lhs, rhs) => {
            let mut value = constant(lhs)?;
            value.push_str(&constant(rhs)?);
            Some(value)
        }
        _ => None,
    }
}
