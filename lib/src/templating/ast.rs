use std::fmt;
use std::sync::Arc;

/// A node of a template's syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, written as-is.
    Text(Arc<str>),
    /// `<%= expr %>`
    Output { expr: Expr, line: usize },
    /// `<% for var in iter %> body <% end %>`
    For { var: Arc<str>, iter: Expr, body: Vec<Node>, line: usize },
    /// `<% if cond %> then <% else %> otherwise <% end %>`
    If { cond: Expr, then: Vec<Node>, otherwise: Vec<Node>, line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(Arc<str>),
    Int(i64),
    /// A variable, possibly followed by field accesses: `a.b.c`.
    Var(Vec<Arc<str>>),
    /// `lhs <> rhs`
    Concat(Box<Expr>, Box<Expr>),
    Call { name: Arc<str>, args: Vec<Expr> },
}

/// The link helpers resolved while compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Base,
    Page,
    Post,
    Asset,
}

impl Helper {
    pub fn from_name(name: &str) -> Option<Helper> {
        match name {
            "base" => Some(Helper::Base),
            "page" => Some(Helper::Page),
            "post" => Some(Helper::Post),
            "asset" => Some(Helper::Asset),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Helper::Base => "base",
            Helper::Page => "page",
            Helper::Post => "post",
            Helper::Asset => "asset",
        }
    }

    /// The URL `self` links to for the path `arg` under `base_url`.
    ///
    /// ```rust
    /// use quire::templating::Helper;
    ///
    /// assert_eq!(Helper::Base.url("/", "feed.xml"), "/feed.xml");
    /// assert_eq!(Helper::Page.url("/", "pages/about"), "/pages/about.html");
    /// assert_eq!(Helper::Post.url("/blog/", "hello"), "/blog/posts/hello.html");
    /// assert_eq!(Helper::Asset.url("/", "css/site.css"), "/assets/css/site.css");
    /// ```
    pub fn url(&self, base_url: &str, arg: &str) -> String {
        match self {
            Helper::Base => format!("{base_url}{arg}"),
            Helper::Page => format!("{base_url}{arg}.html"),
            Helper::Post => format!("{base_url}posts/{arg}.html"),
            Helper::Asset => format!("{base_url}assets/{arg}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Var(path) => write!(f, "{}", path.join(".")),
            Expr::Concat(lhs, rhs) => write!(f, "{lhs} <> {rhs}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{arg}")?;
                }

                write!(f, ")")
            }
        }
    }
}
