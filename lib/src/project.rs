use serde::{Deserialize, Serialize};

use crate::content::RenderContext;

/// Project metadata, threaded explicitly through every build stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "/".into()
}

impl Default for Project {
    fn default() -> Self {
        Project {
            site_name: String::new(),
            site_description: String::new(),
            author: String::new(),
            author_email: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl Project {
    /// Ensures `base_url` is non-empty and ends in `/` so that link helpers
    /// can append paths directly.
    ///
    /// ```rust
    /// use quire::Project;
    ///
    /// let project = Project { base_url: "/blog".into(), ..Default::default() };
    /// assert_eq!(project.normalized().base_url, "/blog/");
    ///
    /// let project = Project::default();
    /// assert_eq!(project.normalized().base_url, "/");
    /// ```
    pub fn normalized(mut self) -> Self {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }

        self
    }

    /// Writes the metadata variables into `context`.
    pub fn fill(&self, context: &mut RenderContext) {
        context.insert("site_name", &self.site_name);
        context.insert("site_description", &self.site_description);
        context.insert("author", &self.author);
        context.insert("author_email", &self.author_email);
        context.insert("base_url", &self.base_url);
    }
}
