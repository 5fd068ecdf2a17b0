use std::path::PathBuf;
use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::dict;
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub title: String,
    /// The publish date and time as written by the author. Posts are ordered
    /// by this value, newest first.
    pub date: NaiveDateTime,
    pub tags: BTreeSet<String>,
    pub slug: String,
    pub url: String,
    pub source: PathBuf,
    pub output: PathBuf,
    pub html: String,
    pub preview: String,
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl From<&Post> for Value {
    fn from(post: &Post) -> Self {
        let tags = post.tags.iter()
            .map(Value::from)
            .collect::<Value>();

        Value::from(dict! {
            "title" => &post.title,
            "date" => post.date.format("%Y-%m-%d %H:%M").to_string(),
            "tags" => tags,
            "slug" => &post.slug,
            "url" => &post.url,
            "preview" => &post.preview,
            "output" => post.output.to_string_lossy(),
        })
    }
}
