use std::path::Path;

use serde::{Deserialize, Serialize};

use quire::Project;
use quire::error::Result;
use quire::state::PROJECT_FILE;
use quire::value::{Format, Toml};

/// The contents of `quire.toml`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(flatten)]
    pub project: Project,
    /// Size of the worker pool. `--jobs` takes precedence.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Characters of post text kept as a preview.
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

fn default_preview_length() -> usize {
    200
}

impl Settings {
    /// Reads `quire.toml` from `src`. A site without one gets the defaults.
    pub fn discover(src: &Path) -> Result<Self> {
        let path = src.join(PROJECT_FILE);
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "no project file; using defaults");
            return Ok(Settings { preview_length: default_preview_length(), ..Default::default() });
        }

        let settings: Settings = Toml::read(&path)?;
        tracing::debug!(?settings, "loaded project settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::Settings;

    #[test]
    fn reads_flattened_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quire.toml"), r#"
            site_name = "Notes"
            author = "Sam"
            base_url = "https://example.com/notes"
            jobs = 2
        "#).unwrap();

        let settings = Settings::discover(dir.path()).unwrap();
        assert_eq!(settings.project.site_name, "Notes");
        assert_eq!(settings.project.author, "Sam");
        assert_eq!(settings.project.base_url, "https://example.com/notes");
        assert_eq!(settings.jobs, Some(2));
        assert_eq!(settings.preview_length, 200);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::discover(dir.path()).unwrap();
        assert_eq!(settings.project.base_url, "/");
        assert_eq!(settings.jobs, None);
        assert_eq!(settings.preview_length, 200);
    }

    #[test]
    fn bad_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quire.toml"), "site_name = ").unwrap();

        let error = Settings::discover(dir.path()).unwrap_err();
        assert!(error.param("path").unwrap().ends_with("quire.toml"));
    }
}
