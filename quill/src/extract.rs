use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use quire::{err, error, BuildState};
use quire::content::{Page, Post, RenderContext, SourceKind};
use quire::error::{Chainable, Error, Result};
use quire::extract::{map_files, Extractor, Mode};
use quire::fstree::FsTree;
use quire::templating::Template;
use quire::util::{is_template, slugify};
use quire::value::{Format, Toml};

use crate::markdown;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PageMeta {
    title: Option<String>,
    order: i64,
    menu: bool,
    menu_text: Option<String>,
    menu_icon: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PostMeta {
    title: String,
    date: toml::Value,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    slug: Option<String>,
}

/// Extracts every `.md` and `.html` file found under `pages/`.
#[derive(Debug, Default)]
pub struct PageExtractor;

/// Extracts every `.md` file directly inside `posts/`.
#[derive(Debug)]
pub struct PostExtractor {
    pub preview_length: usize,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::file(e, path))
}

impl PageExtractor {
    fn page(&self, state: &BuildState, path: &Path) -> Result<Page> {
        let kind = path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(SourceKind::from_ext)
            .ok_or_else(|| error!("unsupported page type", "path" => path.display()))?;

        let source = read(path)?;
        let (front_matter, body) = markdown::split_front_matter(&source);
        let meta: PageMeta = match front_matter {
            Some(front_matter) => Toml::parse(front_matter, path)?,
            None => PageMeta::default(),
        };

        let relative = path.strip_prefix(state.pages_dir())
            .map_err(|_| error! {
                "page is outside of the pages directory",
                "path" => path.display(),
                "pages directory" => state.pages_dir().display(),
            })?
            .with_extension("");

        let name = relative.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let html = match kind {
            SourceKind::Markdown => markdown::to_html(body),
            SourceKind::Html if is_template(body) => {
                let mut context = RenderContext::new();
                state.project.fill(&mut context);
                Template::compile(body, path, &state.project.base_url)
                    .and_then(|template| template.render(&context))?
            }
            SourceKind::Html => body.to_string(),
        };

        let title = meta.title.unwrap_or_else(|| {
            relative.file_name().map_or(name.clone(), |n| n.to_string_lossy().into_owned())
        });

        Ok(Page {
            kind,
            order: meta.order,
            menu: meta.menu,
            menu_text: meta.menu_text.unwrap_or_else(|| title.clone()),
            menu_icon: meta.menu_icon,
            url: format!("{}pages/{name}.html", state.project.base_url),
            output: state.pages_dest().join(&relative).with_extension("html"),
            source: path.to_path_buf(),
            title,
            name,
            html,
        })
    }
}

impl Extractor for PageExtractor {
    type Record = Page;

    fn run(&self, mode: Mode, state: &BuildState, files: &[PathBuf]) -> Result<Vec<Page>> {
        map_files(mode, files, |path| {
            let page = self.page(state, path)?;
            tracing::debug!(name = %page.name, order = page.order, "extracted page");
            Ok(page)
        })
    }
}

impl PostExtractor {
    fn post(&self, state: &BuildState, path: &Path) -> Result<Post> {
        let source = read(path)?;
        let (front_matter, body) = markdown::split_front_matter(&source);
        let Some(front_matter) = front_matter else {
            return err!("post is missing `+++` front matter", "path" => path.display());
        };

        let meta: PostMeta = Toml::parse(front_matter, path)?;
        let date = parse_date(&meta.date).chain_with(|| error! {
            "invalid post date",
            "path" => path.display(),
            "date" => &meta.date,
        })?;

        let slug = match meta.slug {
            Some(slug) => slug,
            None => match path.file_stem() {
                Some(stem) => slugify(&stem.to_string_lossy()),
                None => slugify(&meta.title),
            },
        };

        if slug.is_empty() {
            return err!("post slug is empty", "path" => path.display());
        }

        Ok(Post {
            date,
            url: format!("{}posts/{slug}.html", state.project.base_url),
            output: state.posts_dest().join(&slug).with_extension("html"),
            source: path.to_path_buf(),
            html: markdown::to_html(body),
            preview: markdown::preview(body, self.preview_length),
            tags: meta.tags.into_iter().collect(),
            title: meta.title,
            slug,
        })
    }
}

impl Extractor for PostExtractor {
    type Record = Post;

    fn run(&self, mode: Mode, state: &BuildState, _: &[PathBuf]) -> Result<Vec<Post>> {
        let dir = state.posts_dir();
        if !dir.is_dir() {
            tracing::info!(dir = %dir.display(), "no posts directory");
            return Ok(vec![]);
        }

        let files: Vec<PathBuf> = FsTree::build(&dir)?
            .iter()
            .filter(|entry| entry.depth == 1 && entry.metadata.is_file())
            .filter(|entry| entry.path.extension().map_or(false, |ext| ext == "md"))
            .map(|entry| entry.path.to_path_buf())
            .collect();

        map_files(mode, &files, |path| {
            let post = self.post(state, path)?;
            tracing::debug!(slug = %post.slug, date = %post.date, "extracted post");
            Ok(post)
        })
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Accepts a TOML date or datetime, or a string in one of a few common
/// layouts. Offsets are dropped: the local date and time are kept as written.
fn parse_date(value: &toml::Value) -> Result<NaiveDateTime> {
    let string = match value {
        toml::Value::Datetime(datetime) => datetime.to_string(),
        toml::Value::String(string) => string.trim().to_string(),
        other => return err!("expected a date", "found" => other.type_str()),
    };

    if let Ok(datetime) = DateTime::parse_from_rfc3339(&string) {
        return Ok(datetime.naive_local());
    }

    for format in DATE_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&string, format) {
            return Ok(datetime);
        }
    }

    let date = NaiveDate::parse_from_str(&string, "%Y-%m-%d")?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use chrono::NaiveDate;

    use quire::content::SourceKind;
    use quire::extract::{Extractor, Mode};
    use quire::{BuildState, Project};

    use super::{parse_date, PageExtractor, PostExtractor};

    fn write(root: &Path, path: &str, contents: &str) -> PathBuf {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn state(root: &Path) -> BuildState {
        let project = Project { site_name: "Site".into(), base_url: "/b".into(), ..Default::default() };
        BuildState::new(root.join("src"), root.join("out"), project)
    }

    #[test]
    fn pages_read_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let files = vec![
            write(dir.path(), "src/pages/docs/setup.md", "+++\ntitle = \"Setup\"\norder = 3\nmenu = true\n+++\n# Setup\n"),
            write(dir.path(), "src/pages/about.html", "<p><%= site_name %> at <%= page(\"pages/about\") %></p>"),
        ];

        let pages = PageExtractor.run(Mode::Sequential, &state, &files).unwrap();
        assert_eq!(pages[0].name, "docs/setup");
        assert_eq!(pages[0].title, "Setup");
        assert_eq!(pages[0].menu_text, "Setup");
        assert_eq!((pages[0].order, pages[0].menu, pages[0].kind), (3, true, SourceKind::Markdown));
        assert_eq!(pages[0].url, "/b/pages/docs/setup.html");
        assert_eq!(pages[0].output, dir.path().join("out/pages/docs/setup.html"));
        assert_eq!(pages[0].html, "<h1>Setup</h1>\n");

        assert_eq!(pages[1].title, "about");
        assert_eq!(pages[1].kind, SourceKind::Html);
        assert_eq!(pages[1].html, format!("<p>Site at {}</p>", pages[1].url));
        assert_eq!(pages[1].url, "/b/pages/about.html");
    }

    #[test]
    fn bad_page_front_matter_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let files = vec![write(dir.path(), "src/pages/x.md", "+++\norder = \"first\"\n+++\n")];

        let error = PageExtractor.run(Mode::Parallel, &state, &files).unwrap_err();
        assert!(error.param("path").unwrap().ends_with("x.md"));
    }

    #[test]
    fn posts_are_read_from_the_posts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        write(dir.path(), "src/posts/hello-world.md",
            "+++\ntitle = \"Hello\"\ndate = 2024-01-02T03:04:05\ntags = [\"a\", \"b\"]\n+++\nFirst words.");
        write(dir.path(), "src/posts/custom.md",
            "+++\ntitle = \"Other\"\ndate = \"2024-03-01\"\nslug = \"another\"\n+++\nMore.");
        write(dir.path(), "src/posts/notes.txt", "ignored");

        let posts = PostExtractor { preview_length: 100 }.run(Mode::Parallel, &state, &[]).unwrap();
        assert_eq!(posts.len(), 2);

        let (other, hello) = (&posts[0], &posts[1]);
        assert_eq!(other.slug, "another");
        assert_eq!(other.url, "/b/posts/another.html");
        assert_eq!(hello.slug, "hello-world");
        assert_eq!(hello.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap());
        assert!(hello.has_tag("a") && hello.has_tag("b"));
        assert_eq!(hello.preview, "First words.");
    }

    #[test]
    fn only_top_level_markdown_is_a_post() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let post = "+++\ntitle = \"T\"\ndate = \"2024-01-01\"\n+++\n";
        write(dir.path(), "src/posts/b.md", post);
        write(dir.path(), "src/posts/.a.md", post);
        write(dir.path(), "src/posts/drafts/c.md", post);
        write(dir.path(), "src/posts/old.md/readme.txt", "a directory, not a post");

        let posts = PostExtractor { preview_length: 10 }.run(Mode::Sequential, &state, &[]).unwrap();
        let sources: Vec<_> = posts.iter().map(|p| p.source.clone()).collect();
        assert_eq!(sources, [dir.path().join("src/posts/.a.md"), dir.path().join("src/posts/b.md")]);
    }

    #[test]
    fn missing_posts_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let posts = PostExtractor { preview_length: 10 }.run(Mode::Parallel, &state(dir.path()), &[]).unwrap();
        assert!(posts.is_empty());
    }

    #[test]
    fn posts_need_front_matter_and_dates() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        write(dir.path(), "src/posts/a.md", "no front matter");
        let error = PostExtractor { preview_length: 10 }.run(Mode::Sequential, &state, &[]).unwrap_err();
        assert!(error.param("path").unwrap().ends_with("a.md"));

        write(dir.path(), "src/posts/a.md", "+++\ntitle = \"A\"\ndate = \"yesterday\"\n+++\n");
        let error = PostExtractor { preview_length: 10 }.run(Mode::Sequential, &state, &[]).unwrap_err();
        assert_eq!(error.message(), "invalid post date");
    }

    #[test]
    fn date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(7, 8, 0).unwrap();
        for input in ["2024-05-06T07:08:00", "2024-05-06 07:08", "2024-05-06T07:08:00+02:00"] {
            let value = toml::Value::String(input.into());
            assert_eq!(parse_date(&value).unwrap(), expected, "{input}");
        }

        let midnight = parse_date(&toml::Value::String("2024-05-06".into())).unwrap();
        assert_eq!(midnight, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert!(parse_date(&toml::Value::Integer(3)).is_err());
    }
}
