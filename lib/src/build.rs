//! The two build stages, strung together.
//!
//! ```rust,no_run
//! use quire::{build, BuildState, Project};
//! use quire::extract::Mode;
//! # use quire::extract::Extractor;
//! # use quire::content::{Page, Post};
//! # struct Pages; struct Posts;
//! # impl Extractor for Pages {
//! #     type Record = Page;
//! #     fn run(&self, _: Mode, _: &BuildState, _: &[std::path::PathBuf]) -> quire::Result<Vec<Page>> { Ok(vec![]) }
//! # }
//! # impl Extractor for Posts {
//! #     type Record = Post;
//! #     fn run(&self, _: Mode, _: &BuildState, _: &[std::path::PathBuf]) -> quire::Result<Vec<Post>> { Ok(vec![]) }
//! # }
//!
//! let state = BuildState::new("site", "public", Project::default());
//! let state = build::run(state, &Pages, &Posts, Mode::Parallel)?;
//! println!("{} posts under {} tags", state.posts.len(), state.tags.len());
//! # Ok::<(), quire::Error>(())
//! ```

use std::path::PathBuf;
use std::time::Instant;

use crate::aggregate::aggregate;
use crate::content::{Page, Post};
use crate::error::Result;
use crate::extract::{extract, Extractor, Mode};
use crate::scan::scan;
use crate::state::BuildState;
use crate::templating::compile_templates;

/// Compiles the templates and scans the pages of `state`, concurrently.
///
/// Returns the state with templates compiled in along with every page
/// source found. If both halves fail, template errors come first.
pub fn prepare(state: BuildState) -> Result<(BuildState, Vec<PathBuf>)> {
    let _span = tracing::info_span!("prepare", src = %state.src.display()).entered();
    let start = Instant::now();

    let (templates, files) = rayon::join(
        || compile_templates(&state.templates_dir(), &state.project.base_url),
        || scan(&state.pages_dir(), &state.pages_dest()),
    );

    let (templates, files) = match (templates, files) {
        (Ok(templates), Ok(files)) => (templates, files),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
        (Err(template_error), Err(scan_error)) => return Err(scan_error.chain(template_error)),
    };

    tracing::info!(
        templates = templates.len(),
        files = files.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "prepared"
    );

    Ok((state.with_templates(templates), files))
}

/// Extracts pages and posts from `files` and merges the aggregate into
/// `state`.
pub fn first_pass<P, S>(
    state: BuildState,
    files: &[PathBuf],
    pages: &P,
    posts: &S,
    mode: Mode,
) -> Result<BuildState>
    where P: Extractor<Record = Page>, S: Extractor<Record = Post>
{
    let _span = tracing::info_span!("first_pass").entered();
    let start = Instant::now();

    let (pages, posts) = extract(pages, posts, files, &state, mode)?;
    let aggregate = aggregate(pages, posts, &state.project);
    let state = state.merge(aggregate);

    tracing::info!(
        pages = state.pages.len(),
        posts = state.posts.len(),
        tags = state.tags.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "first pass complete"
    );

    Ok(state)
}

/// [`prepare()`] followed by [`first_pass()`].
pub fn run<P, S>(state: BuildState, pages: &P, posts: &S, mode: Mode) -> Result<BuildState>
    where P: Extractor<Record = Page>, S: Extractor<Record = Post>
{
    let (state, files) = prepare(state)?;
    first_pass(state, &files, pages, posts, mode)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::prepare;
    use crate::error::Kind;
    use crate::templating::TemplateName;
    use crate::{BuildState, Project};

    #[test]
    fn prepare_compiles_and_scans() {
        let dir = tempfile::tempdir().unwrap();
        let (src, dest) = (dir.path().join("src"), dir.path().join("out"));
        fs::create_dir_all(src.join("templates")).unwrap();
        fs::create_dir_all(src.join("pages/docs")).unwrap();
        fs::write(src.join("pages/docs/intro.md"), "# Intro").unwrap();
        for name in TemplateName::ALL {
            fs::write(src.join("templates").join(name.file_name()), "<%= base() %>").unwrap();
        }

        let (state, files) = prepare(BuildState::new(&src, &dest, Project::default())).unwrap();
        assert_eq!(state.templates.len(), 5);
        assert_eq!(files, [src.join("pages/docs/intro.md")]);
        assert!(dest.join("pages/docs").is_dir());
    }

    #[test]
    fn prepare_reports_both_failures() {
        let dir = tempfile::tempdir().unwrap();
        let state = BuildState::new(dir.path(), dir.path().join("out"), Project::default());

        let error = prepare(state).unwrap_err();
        assert_eq!(error.iter().count(), 6);
        assert!(error.iter().all(|e| e.kind() == Kind::File));

        let last = error.iter().last().unwrap();
        assert!(last.param("path").unwrap().ends_with("pages"));
    }
}
