//! Compiling and rendering `.html.eex` templates.
//!
//! A template is compiled once per build. Compilation parses the source and
//! then rewrites every link helper call into the URL it produces for the
//! project's base URL, so rendering never sees a helper:
//!
//! | call        | compiles to                          |
//! |-------------|--------------------------------------|
//! | `base()`    | the `base_url` variable              |
//! | `base(p)`   | `base_url + p`                       |
//! | `page(p)`   | `base_url + p + ".html"`             |
//! | `post(p)`   | `base_url + "posts/" + p + ".html"`  |
//! | `asset(p)`  | `base_url + "assets/" + p`           |
//!
//! Helper arguments must be string constants, optionally joined with `<>`.
//! Any other call is kept as-is and fails if it's ever rendered.

mod ast;
mod parse;
mod rewrite;
mod render;

pub use ast::{Node, Expr, Helper};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::content::RenderContext;
use crate::error::{Error, Result};

/// The templates every site must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateName {
    Base,
    List,
    Page,
    Post,
    Nav,
}

pub type Templates = FxHashMap<TemplateName, Arc<Template>>;

impl TemplateName {
    pub const ALL: [TemplateName; 5] = [
        TemplateName::Base,
        TemplateName::List,
        TemplateName::Page,
        TemplateName::Post,
        TemplateName::Nav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Base => "base",
            TemplateName::List => "list",
            TemplateName::Page => "page",
            TemplateName::Post => "post",
            TemplateName::Nav => "nav",
        }
    }

    /// `base.html.eex`, `list.html.eex`, and so on.
    pub fn file_name(&self) -> String {
        format!("{}.html.eex", self.as_str())
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled template. Contains no helper calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub path: PathBuf,
    pub nodes: Vec<Node>,
}

impl Template {
    /// Compiles `source`, resolving link helpers against `base_url`. `path`
    /// is used only to attribute errors.
    ///
    /// ```rust
    /// use quire::templating::Template;
    /// use quire::content::RenderContext;
    ///
    /// let source = r#"<a href="<%= post("hello") %>"><%= title %></a>"#;
    /// let template = Template::compile(source, "post.html.eex", "/blog/").unwrap();
    ///
    /// let context = RenderContext::new().with("title", "Hello");
    /// let html = template.render(&context).unwrap();
    /// assert_eq!(html, r#"<a href="/blog/posts/hello.html">Hello</a>"#);
    /// ```
    pub fn compile<P: AsRef<Path>>(source: &str, path: P, base_url: &str) -> Result<Template> {
        let path = path.as_ref();
        let nodes = parse::parse(source, path)?;
        let nodes = rewrite::resolve_helpers(nodes, base_url, path)?;
        Ok(Template { path: path.to_path_buf(), nodes })
    }

    /// Reads and compiles the template at `path`.
    pub fn load<P: AsRef<Path>>(path: P, base_url: &str) -> Result<Template> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::file(e, path))?;
        Template::compile(&source, path, base_url)
    }

    pub fn render(&self, context: &RenderContext) -> Result<String> {
        render::render(&self.nodes, context, &self.path)
    }
}

/// Compiles every template in [`TemplateName::ALL`] from `templates_dir`.
///
/// Templates are compiled concurrently and independently. If any fail,
/// the returned error chains every failure, in [`TemplateName::ALL`] order.
pub fn compile_templates(templates_dir: &Path, base_url: &str) -> Result<Templates> {
    let results: Vec<_> = TemplateName::ALL.par_iter()
        .map(|&name| {
            let path = templates_dir.join(name.file_name());
            let template = Template::load(&path, base_url);
            match &template {
                Ok(_) => tracing::debug!(template = %name, path = %path.display(), "compiled"),
                Err(e) => tracing::warn!(template = %name, "failed to compile: {}", e.message()),
            }

            (name, template)
        })
        .collect();

    let mut templates = Templates::default();
    let mut errors = vec![];
    for (name, result) in results {
        match result {
            Ok(template) => { templates.insert(name, Arc::new(template)); }
            Err(e) => errors.push(e),
        }
    }

    match Error::collect(errors) {
        Some(error) => Err(error),
        None => Ok(templates),
    }
}
