mod page;
mod post;
mod tags;
mod context;

pub use page::*;
pub use post::*;
pub use tags::*;
pub use context::*;

use std::path::Path;
use std::sync::Arc;

use derive_more::From;

/// A record extracted from one content file.
#[derive(Debug, Clone, From)]
pub enum Content {
    Page(Arc<Page>),
    Post(Arc<Post>),
}

impl Content {
    pub fn title(&self) -> &str {
        match self {
            Content::Page(page) => &page.title,
            Content::Post(post) => &post.title,
        }
    }

    /// Where the rendered record will be written.
    pub fn output(&self) -> &Path {
        match self {
            Content::Page(page) => &page.output,
            Content::Post(post) => &post.output,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Content::Page(page) => &page.url,
            Content::Post(post) => &post.url,
        }
    }
}
