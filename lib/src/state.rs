use std::sync::Arc;
use std::path::{Path, PathBuf};

use derive_more::Debug;

use crate::aggregate::Aggregate;
use crate::content::{Content, Page, Post, RenderContext, TagIndex};
use crate::error::{Error, Result};
use crate::project::Project;
use crate::templating::{Template, TemplateName, Templates};

pub const TEMPLATES_DIR: &str = "templates";
pub const PAGES_DIR: &str = "pages";
pub const POSTS_DIR: &str = "posts";
pub const PROJECT_FILE: &str = "quire.toml";

/// Everything one build run knows.
///
/// A build state is never mutated in place: each stage consumes the state
/// and returns a new one with its results merged in.
#[derive(Debug, Clone)]
pub struct BuildState {
    pub src: PathBuf,
    pub dest: PathBuf,
    pub project: Project,
    #[debug(ignore)]
    pub templates: Templates,
    pub pages: Vec<Arc<Page>>,
    pub posts: Vec<Arc<Post>>,
    pub tags: TagIndex,
    pub context: RenderContext,
}

impl BuildState {
    pub fn new<S, D>(src: S, dest: D, project: Project) -> BuildState
        where S: AsRef<Path>, D: AsRef<Path>
    {
        BuildState {
            src: src.as_ref().to_path_buf(),
            dest: dest.as_ref().to_path_buf(),
            project: project.normalized(),
            templates: Templates::default(),
            pages: vec![],
            posts: vec![],
            tags: TagIndex::default(),
            context: RenderContext::new(),
        }
    }

    pub fn with_templates(self, templates: Templates) -> BuildState {
        BuildState { templates, ..self }
    }

    /// Replaces the content of `self` with the result of aggregation.
    pub fn merge(self, aggregate: Aggregate) -> BuildState {
        let Aggregate { pages, posts, tags, context } = aggregate;
        BuildState { pages, posts, tags, context, ..self }
    }

    /// The compiled template `name`. Fails if templates haven't been
    /// compiled into `self` yet.
    pub fn template(&self, name: TemplateName) -> Result<&Arc<Template>> {
        self.templates.get(&name).ok_or_else(|| error! {
            "template is not compiled",
            "template" => name,
            "expected path" => self.templates_dir().join(name.file_name()).display(),
        })
    }

    /// Every page, then every post, in sorted order.
    pub fn contents(&self) -> impl Iterator<Item = Content> + '_ {
        let pages = self.pages.iter().cloned().map(Content::from);
        let posts = self.posts.iter().cloned().map(Content::from);
        pages.chain(posts)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.src.join(TEMPLATES_DIR)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.src.join(PAGES_DIR)
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.src.join(POSTS_DIR)
    }

    /// Where scanned page directories are mirrored to.
    pub fn pages_dest(&self) -> PathBuf {
        self.dest.join(PAGES_DIR)
    }

    pub fn posts_dest(&self) -> PathBuf {
        self.dest.join(POSTS_DIR)
    }
}

static_assertions::assert_impl_all!(BuildState: Send, Sync);
static_assertions::assert_impl_all!(Error: Send, Sync);

#[cfg(test)]
mod tests {
    use crate::aggregate::aggregate;
    use crate::content::{Page, Post};
    use crate::templating::TemplateName;
    use crate::{BuildState, Project};

    #[test]
    fn merge_replaces_content_only() {
        let project = Project { site_name: "S".into(), base_url: "/b".into(), ..Default::default() };
        let state = BuildState::new("src", "out", project.clone());
        assert_eq!(state.project.base_url, "/b/");
        assert_eq!(state.pages_dir(), std::path::Path::new("src/pages"));

        let pages = vec![Page { title: "p".into(), ..Default::default() }];
        let posts = vec![Post { title: "q".into(), ..Default::default() }];
        let state = state.merge(aggregate(pages, posts, &project.normalized()));

        assert_eq!(state.pages.len(), 1);
        assert_eq!(state.posts.len(), 1);
        assert_eq!(state.dest, std::path::Path::new("out"));
        assert_eq!(state.context.get("site_name").and_then(|v| v.as_str()), Some("S"));

        let titles: Vec<_> = state.contents().map(|c| c.title().to_string()).collect();
        assert_eq!(titles, ["p", "q"]);
        assert!(state.tags.is_empty());
    }

    #[test]
    fn missing_templates_are_reported() {
        let state = BuildState::new("src", "out", Project::default());
        let error = state.template(TemplateName::Nav).unwrap_err();
        assert_eq!(error.param("template").as_deref(), Some("nav"));
    }
}
