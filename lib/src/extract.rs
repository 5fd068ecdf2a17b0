use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::content::{Page, Post};
use crate::error::Result;
use crate::state::BuildState;

/// How the extraction stage schedules work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Page and post extraction run concurrently, as does per-file work
    /// done through [`map_files()`].
    #[default]
    Parallel,
    /// Everything runs on the calling thread, pages before posts.
    Sequential,
}

/// Turns content files into records.
///
/// Implementations receive the build state read-only and return fresh
/// records; they never share mutable state with each other. An error is
/// returned unchanged by [`extract()`].
pub trait Extractor: Sync {
    type Record: Send;

    fn run(&self, mode: Mode, state: &BuildState, files: &[PathBuf]) -> Result<Vec<Self::Record>>;
}

/// Runs the page and post extractors over `files`.
///
/// In [`Mode::Parallel`], both extractors run to completion as the two
/// halves of a [`rayon::join()`]. A page error takes precedence over a post
/// error; the other half's result is discarded either way.
///
/// In [`Mode::Sequential`], posts are extracted only once pages succeed.
pub fn extract<P, S>(
    pages: &P,
    posts: &S,
    files: &[PathBuf],
    state: &BuildState,
    mode: Mode,
) -> Result<(Vec<Page>, Vec<Post>)>
    where P: Extractor<Record = Page>, S: Extractor<Record = Post>
{
    let _span = tracing::info_span!("extract", ?mode, files = files.len()).entered();
    let (pages, posts) = match mode {
        Mode::Parallel => {
            let (pages, posts) = rayon::join(
                || pages.run(mode, state, files),
                || posts.run(mode, state, files),
            );

            (pages?, posts?)
        }
        Mode::Sequential => {
            let pages = pages.run(mode, state, files)?;
            let posts = posts.run(mode, state, files)?;
            (pages, posts)
        }
    };

    tracing::info!(pages = pages.len(), posts = posts.len(), "extracted");
    Ok((pages, posts))
}

/// Applies `f` to every path in `files`, keeping input order. The first
/// error is returned.
///
/// Work is spread over the rayon pool in [`Mode::Parallel`] and done on the
/// calling thread in [`Mode::Sequential`].
pub fn map_files<T, F>(mode: Mode, files: &[PathBuf], f: F) -> Result<Vec<T>>
    where T: Send, F: Fn(&Path) -> Result<T> + Send + Sync
{
    match mode {
        Mode::Parallel => files.par_iter().map(|path| f(path)).collect(),
        Mode::Sequential => files.iter().map(|path| f(path)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::{self, ThreadId};

    use super::{extract, map_files, Extractor, Mode};
    use crate::content::{Page, Post};
    use crate::error::{Error, Result};
    use crate::{BuildState, Project};

    struct Pages {
        fail: bool,
        ran: AtomicBool,
        thread: Mutex<Option<ThreadId>>,
    }

    struct Posts {
        fail: bool,
        ran: AtomicBool,
    }

    impl Pages {
        fn new(fail: bool) -> Self {
            Pages { fail, ran: AtomicBool::new(false), thread: Mutex::new(None) }
        }
    }

    impl Posts {
        fn new(fail: bool) -> Self {
            Posts { fail, ran: AtomicBool::new(false) }
        }
    }

    impl Extractor for Pages {
        type Record = Page;

        fn run(&self, _: Mode, _: &BuildState, files: &[PathBuf]) -> Result<Vec<Page>> {
            self.ran.store(true, Ordering::SeqCst);
            *self.thread.lock().unwrap() = Some(thread::current().id());
            match self.fail {
                true => Err(Error::from("page failure")),
                false => Ok(files.iter().map(|f| Page {
                    name: f.display().to_string(),
                    ..Default::default()
                }).collect()),
            }
        }
    }

    impl Extractor for Posts {
        type Record = Post;

        fn run(&self, _: Mode, _: &BuildState, _: &[PathBuf]) -> Result<Vec<Post>> {
            self.ran.store(true, Ordering::SeqCst);
            match self.fail {
                true => Err(Error::from("post failure")),
                false => Ok(vec![Post::default(), Post::default()]),
            }
        }
    }

    fn state() -> BuildState {
        BuildState::new("src", "out", Project::default())
    }

    fn files() -> Vec<PathBuf> {
        vec!["a.md".into(), "b.html".into()]
    }

    #[test]
    fn both_succeed() {
        for mode in [Mode::Parallel, Mode::Sequential] {
            let (pages, posts) = extract(&Pages::new(false), &Posts::new(false), &files(), &state(), mode).unwrap();
            assert_eq!(pages.len(), 2);
            assert_eq!(pages[0].name, "a.md");
            assert_eq!(posts.len(), 2);
        }
    }

    #[test]
    fn page_errors_win_in_parallel() {
        let (pages, posts) = (Pages::new(true), Posts::new(true));
        let error = extract(&pages, &posts, &files(), &state(), Mode::Parallel).unwrap_err();
        assert_eq!(error.message(), "page failure");
        assert!(pages.ran.load(Ordering::SeqCst) && posts.ran.load(Ordering::SeqCst));

        let error = extract(&Pages::new(false), &Posts::new(true), &files(), &state(), Mode::Parallel).unwrap_err();
        assert_eq!(error.message(), "post failure");

        let (pages, posts) = (Pages::new(true), Posts::new(false));
        let error = extract(&pages, &posts, &files(), &state(), Mode::Parallel).unwrap_err();
        assert_eq!(error.message(), "page failure");
        assert!(posts.ran.load(Ordering::SeqCst));
    }

    #[test]
    fn sequential_stops_at_the_first_error() {
        let (pages, posts) = (Pages::new(true), Posts::new(false));
        let error = extract(&pages, &posts, &files(), &state(), Mode::Sequential).unwrap_err();
        assert_eq!(error.message(), "page failure");
        assert!(!posts.ran.load(Ordering::SeqCst));
    }

    #[test]
    fn sequential_stays_on_the_calling_thread() {
        let pages = Pages::new(false);
        extract(&pages, &Posts::new(false), &files(), &state(), Mode::Sequential).unwrap();
        assert_eq!(*pages.thread.lock().unwrap(), Some(thread::current().id()));

        let caller = thread::current().id();
        let threads = map_files(Mode::Sequential, &files(), |_| Ok(thread::current().id())).unwrap();
        assert!(threads.iter().all(|id| *id == caller));
    }

    #[test]
    fn map_files_keeps_order_and_fails_fast() {
        let files: Vec<PathBuf> = (0..64).map(|i| format!("{i}.md").into()).collect();
        for mode in [Mode::Parallel, Mode::Sequential] {
            let names = map_files(mode, &files, |p| Ok(p.display().to_string())).unwrap();
            assert_eq!(names, files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>());

            let result = map_files(mode, &files, |p| match p.to_str() {
                Some("13.md") => Err(Error::from("bad file")),
                _ => Ok(()),
            });

            assert_eq!(result.unwrap_err().message(), "bad file");
        }
    }
}
