use std::sync::Arc;

use crate::content::{Page, Post, RenderContext, TagIndex};
use crate::project::Project;
use crate::value::{Dict, Value};

/// The result of the first pass, ready to be merged into a
/// [`BuildState`](crate::BuildState).
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Ascending by `order`.
    pub pages: Vec<Arc<Page>>,
    /// Newest first.
    pub posts: Vec<Arc<Post>>,
    pub tags: TagIndex,
    pub context: RenderContext,
}

/// Orders the extracted records, indexes tags, and assembles the render
/// context. Both sorts are stable, so records that compare equal keep the
/// order the extractors produced them in.
///
/// The context holds the project metadata followed by:
///
///   * `pages`: every page, as a dictionary
///   * `posts`: every post, as a dictionary
///   * `tags`: each tag mapped to the number of posts carrying it
pub fn aggregate(mut pages: Vec<Page>, mut posts: Vec<Post>, project: &Project) -> Aggregate {
    pages.sort_by_key(|page| page.order);
    posts.sort_by(|a, b| b.date.cmp(&a.date));

    let pages: Vec<Arc<Page>> = pages.into_iter().map(Arc::new).collect();
    let posts: Vec<Arc<Post>> = posts.into_iter().map(Arc::new).collect();
    let tags = TagIndex::build(&posts);

    let mut context = RenderContext::new();
    project.fill(&mut context);
    context.insert("pages", pages.iter().map(|page| Value::from(&**page)).collect::<Value>());
    context.insert("posts", posts.iter().map(|post| Value::from(&**post)).collect::<Value>());
    context.insert("tags", tags.counts()
        .map(|(tag, count)| (tag.clone(), Value::from(count)))
        .collect::<Dict>());

    tracing::debug!(pages = pages.len(), posts = posts.len(), tags = tags.len(), "aggregated");
    Aggregate { pages, posts, tags, context }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::aggregate;
    use crate::content::{Page, Post};
    use crate::project::Project;
    use crate::value::Value;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn post(title: &str, date: NaiveDateTime, tags: &[&str]) -> Post {
        Post {
            title: title.into(),
            date,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn page(title: &str, order: i64) -> Page {
        Page { title: title.into(), order, ..Default::default() }
    }

    fn titles<T: std::ops::Deref>(items: &[T]) -> Vec<String>
        where T::Target: HasTitle
    {
        items.iter().map(|i| i.title().to_string()).collect()
    }

    trait HasTitle { fn title(&self) -> &str; }
    impl HasTitle for Page { fn title(&self) -> &str { &self.title } }
    impl HasTitle for Post { fn title(&self) -> &str { &self.title } }

    #[test]
    fn two_posts_sharing_a_tag() {
        let p1 = post("P1", date(2024, 1, 1), &["a", "b"]);
        let p2 = post("P2", date(2024, 2, 1), &["b"]);
        let result = aggregate(vec![], vec![p1, p2], &Project::default());

        assert_eq!(titles(&result.posts), ["P2", "P1"]);
        assert_eq!(titles(result.tags.posts("a")), ["P1"]);
        assert_eq!(titles(result.tags.posts("b")), ["P2", "P1"]);
        assert!(Arc::ptr_eq(&result.tags.posts("b")[0], &result.posts[0]));

        let tags = result.context.get("tags").unwrap();
        assert_eq!(tags.get("a"), Some(&Value::from(1)));
        assert_eq!(tags.get("b"), Some(&Value::from(2)));
        assert_eq!(tags.as_dict().unwrap().len(), 2);
    }

    #[test]
    fn sorts_are_stable() {
        let pages = vec![page("c", 2), page("a", 1), page("d", 2), page("b", 1), page("z", -1)];
        let posts = vec![
            post("x", date(2023, 5, 1), &[]),
            post("y", date(2024, 5, 1), &[]),
            post("w", date(2023, 5, 1), &[]),
        ];

        let result = aggregate(pages, posts, &Project::default());
        assert_eq!(titles(&result.pages), ["z", "a", "b", "c", "d"]);
        assert_eq!(titles(&result.posts), ["y", "x", "w"]);
    }

    #[test]
    fn context_holds_project_and_content() {
        let project = Project {
            site_name: "Site".into(),
            author: "Ann".into(),
            ..Default::default()
        }.normalized();

        let result = aggregate(vec![page("home", 0)], vec![], &project);
        let keys: Vec<_> = result.context.keys().collect();
        assert_eq!(keys, [
            "site_name", "site_description", "author", "author_email", "base_url",
            "pages", "posts", "tags",
        ]);

        let pages = result.context.get("pages").and_then(|v| v.as_slice()).unwrap();
        assert_eq!(pages[0].get("title"), Some(&Value::from("home")));
        assert_eq!(result.context.get("base_url"), Some(&Value::from("/")));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let result = aggregate(vec![], vec![], &Project::default());
        assert!(result.pages.is_empty() && result.posts.is_empty() && result.tags.is_empty());
        assert!(!result.context.get("posts").unwrap().is_truthy());
        assert!(!result.context.get("tags").unwrap().is_truthy());
    }
}
