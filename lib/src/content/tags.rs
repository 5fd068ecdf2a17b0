use std::sync::Arc;
use std::collections::{BTreeMap, BTreeSet};

use derive_more::Deref;

use crate::content::Post;

/// Maps each tag to the posts carrying it.
///
/// Every list preserves the relative order of the post list the index was
/// built from; lists are never sorted independently.
#[derive(Debug, Clone, Default, Deref)]
pub struct TagIndex(BTreeMap<Arc<str>, Vec<Arc<Post>>>);

impl TagIndex {
    /// Builds the index from the already sorted `posts`.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use quire::content::{Post, TagIndex};
    ///
    /// let post = |title: &str, tags: &[&str]| Arc::new(Post {
    ///     title: title.into(),
    ///     tags: tags.iter().map(|t| t.to_string()).collect(),
    ///     ..Default::default()
    /// });
    ///
    /// let posts = [post("newer", &["b"]), post("older", &["a", "b"])];
    /// let index = TagIndex::build(&posts);
    ///
    /// let titles = |tag| index.posts(tag).iter().map(|p| &*p.title).collect::<Vec<_>>();
    /// assert_eq!(titles("a"), ["older"]);
    /// assert_eq!(titles("b"), ["newer", "older"]);
    /// assert!(index.posts("c").is_empty());
    /// ```
    pub fn build(posts: &[Arc<Post>]) -> TagIndex {
        let tags: BTreeSet<&str> = posts.iter()
            .flat_map(|post| post.tags.iter())
            .map(|tag| tag.as_str())
            .collect();

        let index = tags.into_iter()
            .map(|tag| {
                let tagged = posts.iter()
                    .filter(|post| post.has_tag(tag))
                    .cloned()
                    .collect();

                (Arc::from(tag), tagged)
            })
            .collect();

        TagIndex(index)
    }

    /// The posts tagged `tag`, in post list order. Empty if no post has it.
    pub fn posts(&self, tag: &str) -> &[Arc<Post>] {
        self.0.get(tag).map(|posts| posts.as_slice()).unwrap_or(&[])
    }

    /// Each tag with the number of posts carrying it, in tag order.
    pub fn counts(&self) -> impl Iterator<Item = (&Arc<str>, usize)> + '_ {
        self.0.iter().map(|(tag, posts)| (tag, posts.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use crate::content::{Post, TagIndex};

    fn post(title: &str, day: u32, tags: &[&str]) -> Arc<Post> {
        Arc::new(Post {
            title: title.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn keys_are_the_union_of_tags() {
        let posts = vec![post("x", 3, &["rust", "web"]), post("y", 2, &[]), post("z", 1, &["cli"])];
        let index = TagIndex::build(&posts);
        let keys: Vec<_> = index.keys().map(|k| &**k).collect();
        assert_eq!(keys, ["cli", "rust", "web"]);
    }

    #[test]
    fn lists_are_subsequences_of_the_input() {
        let posts = vec![
            post("a", 5, &["t"]),
            post("b", 4, &["u"]),
            post("c", 3, &["t", "u"]),
            post("d", 2, &["t"]),
            post("e", 1, &["u", "t"]),
        ];

        let index = TagIndex::build(&posts);
        for (tag, tagged) in index.iter() {
            let mut cursor = posts.iter();
            for post in tagged {
                assert!(post.has_tag(tag));
                assert!(cursor.any(|p| Arc::ptr_eq(p, post)), "{tag}: out of order");
            }

            let expected = posts.iter().filter(|p| p.has_tag(tag)).count();
            assert_eq!(tagged.len(), expected);
        }

        let counts: Vec<_> = index.counts().map(|(t, n)| (t.to_string(), n)).collect();
        assert_eq!(counts, [("t".to_string(), 4), ("u".to_string(), 3)]);
    }

    #[test]
    fn empty_posts_give_an_empty_index() {
        let index = TagIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.counts().count(), 0);
    }
}
