use std::path::PathBuf;

use crate::dict;
use crate::value::Value;

/// The markup a page was written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SourceKind {
    #[default]
    Markdown,
    Html,
}

impl SourceKind {
    /// Classifies a file by its extension: `md` or `html`.
    pub fn from_ext(ext: &str) -> Option<SourceKind> {
        match ext {
            "md" => Some(SourceKind::Markdown),
            "html" => Some(SourceKind::Html),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Markdown => "md",
            SourceKind::Html => "html",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Path of the page relative to the pages root, without extension.
    pub name: String,
    pub kind: SourceKind,
    pub title: String,
    /// Position in menus and page lists; lower comes first.
    pub order: i64,
    pub menu: bool,
    pub menu_text: String,
    pub menu_icon: String,
    pub source: PathBuf,
    pub output: PathBuf,
    pub url: String,
    pub html: String,
}

impl From<&Page> for Value {
    fn from(page: &Page) -> Self {
        Value::from(dict! {
            "name" => &page.name,
            "type" => page.kind.as_str(),
            "title" => &page.title,
            "order" => page.order,
            "menu" => page.menu,
            "menu_text" => &page.menu_text,
            "menu_icon" => &page.menu_icon,
            "url" => &page.url,
            "output" => page.output.to_string_lossy(),
        })
    }
}
