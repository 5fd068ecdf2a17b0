use std::path::Path;
use std::sync::Arc;

use memchr::memmem;

use crate::error::{Error, Result};
use crate::templating::ast::{Expr, Node};

/// Parses template `source` into a syntax tree. `path` is used only to
/// attribute errors.
pub fn parse(source: &str, path: &Path) -> Result<Vec<Node>> {
    let tokens = tokenize(source, path)?;
    let mut parser = Parser { tokens: tokens.into_iter(), path };
    match parser.block()? {
        (nodes, None) => Ok(nodes),
        (_, Some(Terminator::Else(line))) => {
            Err(Error::template("`else` without a matching `if`", path, line))
        }
        (_, Some(Terminator::End(line))) => {
            Err(Error::template("`end` without an open block", path, line))
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(String),
    Output(&'a str, usize),
    Code(&'a str, usize),
}

fn count_lines(string: &str) -> usize {
    memchr::memchr_iter(b'\n', string.as_bytes()).count()
}

fn tokenize<'a>(source: &'a str, path: &Path) -> Result<Vec<Token<'a>>> {
    let opener = memmem::Finder::new("<%");
    let closer = memmem::Finder::new("%>");

    let mut tokens = vec![];
    let mut text = String::new();
    let (mut pos, mut line) = (0, 1);
    while let Some(i) = opener.find(&source.as_bytes()[pos..]) {
        let start = pos + i;
        text.push_str(&source[pos..start]);
        line += count_lines(&source[pos..start]);

        // `<%%` is an escaped, literal `<%`.
        let rest = &source[start + 2..];
        if rest.starts_with('%') {
            text.push_str("<%");
            pos = start + 3;
            continue;
        }

        let end = closer.find(rest.as_bytes())
            .ok_or_else(|| Error::template("unterminated tag: expected `%>`", path, line))?;

        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }

        let body = &rest[..end];
        match body.as_bytes().first() {
            Some(b'=') => tokens.push(Token::Output(&body[1..], line)),
            Some(b'#') => { /* comment */ }
            _ => tokens.push(Token::Code(body, line)),
        }

        line += count_lines(body);
        pos = start + 2 + end + 2;
    }

    text.push_str(&source[pos..]);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }

    Ok(tokens)
}

enum Terminator {
    Else(usize),
    End(usize),
}

enum Stmt {
    For { var: Arc<str>, iter: Expr },
    If(Expr),
    Else,
    End,
}

struct Parser<'a, 'p> {
    tokens: std::vec::IntoIter<Token<'a>>,
    path: &'p Path,
}

impl Parser<'_, '_> {
    /// Parses nodes until the input ends or an `else`/`end` is found.
    fn block(&mut self) -> Result<(Vec<Node>, Option<Terminator>)> {
        let mut nodes = vec![];
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text.into())),
                Token::Output(src, line) => {
                    let expr = ExprParser::new(src, self.path, line)?.expr_only()?;
                    nodes.push(Node::Output { expr, line });
                }
                Token::Code(src, line) => match ExprParser::new(src, self.path, line)?.stmt()? {
                    Stmt::For { var, iter } => {
                        let body = match self.block()? {
                            (body, Some(Terminator::End(_))) => body,
                            (_, Some(Terminator::Else(line))) => {
                                return Err(self.error("`else` is not allowed in a `for` block", line));
                            }
                            (_, None) => return Err(self.error("unclosed `for` block", line)),
                        };

                        nodes.push(Node::For { var, iter, body, line });
                    }
                    Stmt::If(cond) => {
                        let (then, otherwise) = match self.block()? {
                            (then, Some(Terminator::End(_))) => (then, vec![]),
                            (then, Some(Terminator::Else(_))) => match self.block()? {
                                (otherwise, Some(Terminator::End(_))) => (then, otherwise),
                                (_, Some(Terminator::Else(line))) => {
                                    return Err(self.error("duplicate `else` in `if` block", line));
                                }
                                (_, None) => return Err(self.error("unclosed `if` block", line)),
                            },
                            (_, None) => return Err(self.error("unclosed `if` block", line)),
                        };

                        nodes.push(Node::If { cond, then, otherwise, line });
                    }
                    Stmt::Else => return Ok((nodes, Some(Terminator::Else(line)))),
                    Stmt::End => return Ok((nodes, Some(Terminator::End(line)))),
                }
            }
        }

        Ok((nodes, None))
    }

    fn error(&self, message: &str, line: usize) -> Error {
        Error::template(message, self.path, line)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Str(String),
    Int(i64),
    Ident { name: String, assign: bool },
    Dot,
    Comma,
    LParen,
    RParen,
    Concat,
}

fn lex(src: &str, path: &Path, line: usize) -> Result<Vec<Tok>> {
    let error = |message: String| Error::template(message, path, line);
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '?' || c == '!';

    let mut toks = vec![];
    let mut chars = src.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => continue,
            '.' => toks.push(Tok::Dot),
            ',' => toks.push(Tok::Comma),
            '(' => toks.push(Tok::LParen),
            ')' => toks.push(Tok::RParen),
            '<' if matches!(chars.peek(), Some((_, '>'))) => {
                chars.next();
                toks.push(Tok::Concat);
            }
            '"' => {
                let mut string = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => string.push('\n'),
                            Some((_, 't')) => string.push('\t'),
                            Some((_, c @ ('"' | '\\'))) => string.push(c),
                            Some((_, c)) => return Err(error(format!("unknown escape `\\{c}`"))),
                            None => return Err(error("unterminated string literal".into())),
                        },
                        Some((_, c)) => string.push(c),
                        None => return Err(error("unterminated string literal".into())),
                    }
                }

                toks.push(Tok::Str(string));
            }
            c if c.is_ascii_digit() || (c == '-' && matches!(chars.peek(), Some((_, d)) if d.is_ascii_digit())) => {
                let mut end = i + c.len_utf8();
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_ascii_digit() { break; }
                    end = j + d.len_utf8();
                    chars.next();
                }

                let digits = &src[i..end];
                let n = digits.parse::<i64>()
                    .map_err(|e| error(format!("invalid integer `{digits}`: {e}")))?;

                toks.push(Tok::Int(n));
            }
            c if c == '@' || c.is_ascii_alphabetic() || c == '_' => {
                let assign = c == '@';
                let start = if assign { i + 1 } else { i };
                let mut end = i + c.len_utf8();
                while let Some(&(j, d)) = chars.peek() {
                    if !is_ident(d) { break; }
                    end = j + d.len_utf8();
                    chars.next();
                }

                let name = &src[start..end];
                if name.is_empty() {
                    return Err(error("expected a name after `@`".into()));
                }

                toks.push(Tok::Ident { name: name.into(), assign });
            }
            c => return Err(error(format!("unexpected character `{c}`"))),
        }
    }

    Ok(toks)
}

struct ExprParser<'p> {
    toks: Vec<Tok>,
    pos: usize,
    path: &'p Path,
    line: usize,
}

impl<'p> ExprParser<'p> {
    fn new(src: &str, path: &'p Path, line: usize) -> Result<Self> {
        Ok(ExprParser { toks: lex(src, path, line)?, pos: 0, path, line })
    }

    fn error(&self, message: impl std::fmt::Display) -> Error {
        Error::template(message, self.path, self.line)
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Tok, what: &str) -> Result<()> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(self.error(format!("expected {what}, found {}", describe(&tok)))),
            None => Err(self.error(format!("expected {what}, found end of tag"))),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.peek() {
            Some(tok) => Err(self.error(format!("unexpected {} after expression", describe(tok)))),
            None => Ok(()),
        }
    }

    /// Parses the contents of an output tag.
    fn expr_only(mut self) -> Result<Expr> {
        if self.toks.is_empty() {
            return Err(self.error("empty output tag"));
        }

        let expr = self.expr()?;
        self.finish()?;
        Ok(expr)
    }

    /// Parses the contents of a code tag.
    fn stmt(mut self) -> Result<Stmt> {
        let keyword = match self.next() {
            Some(Tok::Ident { name, assign: false }) => name,
            Some(tok) => return Err(self.error(format!("expected a statement, found {}", describe(&tok)))),
            None => return Err(self.error("empty code tag")),
        };

        let stmt = match &*keyword {
            "for" => {
                let var = match self.next() {
                    Some(Tok::Ident { name, assign: false }) => Arc::from(name),
                    _ => return Err(self.error("expected a loop variable after `for`")),
                };

                match self.next() {
                    Some(Tok::Ident { name, assign: false }) if name == "in" => {}
                    _ => return Err(self.error("expected `in` after the loop variable")),
                }

                Stmt::For { var, iter: self.expr()? }
            }
            "if" => Stmt::If(self.expr()?),
            "else" => Stmt::Else,
            "end" => Stmt::End,
            other => return Err(self.error(format!("unknown statement `{other}`"))),
        };

        self.finish()?;
        Ok(stmt)
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.primary()?;
        while self.peek() == Some(&Tok::Concat) {
            self.next();
            let rhs = self.primary()?;
            lhs = Expr::Concat(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Tok::Str(s)) => Ok(Expr::Str(s.into())),
            Some(Tok::Int(n)) => Ok(Expr::Int(n)),
            Some(Tok::LParen) => {
                let expr = self.expr()?;
                self.expect(Tok::RParen, "`)`")?;
                Ok(expr)
            }
            Some(Tok::Ident { name, assign: false }) if self.peek() == Some(&Tok::LParen) => {
                self.next();
                let mut args = vec![];
                if self.peek() == Some(&Tok::RParen) {
                    self.next();
                } else {
                    loop {
                        args.push(self.expr()?);
                        match self.next() {
                            Some(Tok::Comma) => continue,
                            Some(Tok::RParen) => break,
                            Some(tok) => {
                                let found = describe(&tok);
                                return Err(self.error(format!("expected `,` or `)`, found {found}")));
                            }
                            None => return Err(self.error(format!("unclosed call to `{name}`"))),
                        }
                    }
                }

                Ok(Expr::Call { name: name.into(), args })
            }
            Some(Tok::Ident { name, .. }) => {
                let mut path: Vec<Arc<str>> = vec![name.into()];
                while self.peek() == Some(&Tok::Dot) {
                    self.next();
                    match self.next() {
                        Some(Tok::Ident { name, assign: false }) => path.push(name.into()),
                        _ => return Err(self.error("expected a field name after `.`")),
                    }
                }

                Ok(Expr::Var(path))
            }
            Some(tok) => Err(self.error(format!("expected an expression, found {}", describe(&tok)))),
            None => Err(self.error("expected an expression, found end of tag")),
        }
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Str(s) => format!("string {s:?}"),
        Tok::Int(n) => format!("integer `{n}`"),
        Tok::Ident { name, assign: true } => format!("`@{name}`"),
        Tok::Ident { name, assign: false } => format!("`{name}`"),
        Tok::Dot => "`.`".into(),
        Tok::Comma => "`,`".into(),
        Tok::LParen => "`(`".into(),
        Tok::RParen => "`)`".into(),
        Tok::Concat => "`<>`".into(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::parse;
    use crate::error::{Error, Kind};
    use crate::templating::ast::{Expr, Node};

    fn parse_ok(source: &str) -> Vec<Node> {
        parse(source, Path::new("t.html.eex")).unwrap()
    }

    fn parse_err(source: &str) -> Error {
        let error = parse(source, Path::new("t.html.eex")).unwrap_err();
        assert_eq!(error.kind(), Kind::InvalidTemplate);
        assert_eq!(error.param("path").as_deref(), Some("t.html.eex"));
        error
    }

    fn line(error: &Error) -> usize {
        error.param("line").unwrap().parse().unwrap()
    }

    fn var(path: &[&str]) -> Expr {
        Expr::Var(path.iter().map(|s| Arc::from(*s)).collect())
    }

    #[test]
    fn text_and_output() {
        let nodes = parse_ok("<h1><%= @site_name %></h1>");
        assert_eq!(nodes, [
            Node::Text("<h1>".into()),
            Node::Output { expr: var(&["site_name"]), line: 1 },
            Node::Text("</h1>".into()),
        ]);
    }

    #[test]
    fn calls_concat_and_fields() {
        let nodes = parse_ok("<%= page(\"a\" <> \"b\") %><%= post.title %><%= base() %>");
        assert_eq!(nodes, [
            Node::Output {
                expr: Expr::Call {
                    name: "page".into(),
                    args: vec![Expr::Concat(
                        Box::new(Expr::Str("a".into())),
                        Box::new(Expr::Str("b".into())),
                    )],
                },
                line: 1,
            },
            Node::Output { expr: var(&["post", "title"]), line: 1 },
            Node::Output { expr: Expr::Call { name: "base".into(), args: vec![] }, line: 1 },
        ]);
    }

    #[test]
    fn blocks_nest() {
        let source = "<% for p in pages %>\n<% if p.menu %><%= p.title %><% else %>-<% end %>\n<% end %>";
        let nodes = parse_ok(source);
        let Node::For { var: v, iter, body, line } = &nodes[0] else { panic!("{nodes:?}") };
        assert_eq!((&**v, iter, *line), ("p", &var(&["pages"]), 1));
        assert_eq!(body.len(), 3);

        let Node::If { cond, then, otherwise, line } = &body[1] else { panic!("{body:?}") };
        assert_eq!(cond, &var(&["p", "menu"]));
        assert_eq!(then.len(), 1);
        assert_eq!(otherwise, &[Node::Text("-".into())]);
        assert_eq!(*line, 2);
    }

    #[test]
    fn comments_and_escapes() {
        let nodes = parse_ok("a<%# ignored\n %>b <%% c");
        assert_eq!(nodes, [Node::Text("ab <% c".into())]);
    }

    #[test]
    fn string_escapes_and_integers() {
        let nodes = parse_ok(r#"<%= "q\"\\\n" <> -42 %>"#);
        assert_eq!(nodes, [Node::Output {
            expr: Expr::Concat(Box::new(Expr::Str("q\"\\\n".into())), Box::new(Expr::Int(-42))),
            line: 1,
        }]);
    }

    #[test]
    fn errors_carry_lines() {
        assert_eq!(line(&parse_err("a\nb\n<%= x")), 3);
        assert_eq!(line(&parse_err("\n\n\n<% for x in xs %>")), 4);
        assert_eq!(line(&parse_err("<% if x %>\n<% else %>\n<% else %><% end %>")), 3);
        assert_eq!(line(&parse_err("ok\n<% end %>")), 2);
        assert_eq!(line(&parse_err("ok\n\n<% else %>")), 3);
        assert_eq!(line(&parse_err("<%#\n\n%>\n<%= 1 + 2 %>")), 4);
        assert_eq!(line(&parse_err("\n<%\n%>")), 2);
        assert_eq!(line(&parse_err("<%= \"open %>")), 1);
        assert_eq!(line(&parse_err("<%= %>")), 1);
        assert_eq!(line(&parse_err("<% for x in xs %><% else %><% end %>")), 1);
        assert_eq!(line(&parse_err("<% while x %>")), 1);
        assert_eq!(line(&parse_err("<%= f(a b) %>")), 1);
    }
}
