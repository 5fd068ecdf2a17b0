use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use quire::{build, BuildState, Error, Result};
use quire::extract::Mode;

use crate::config::Settings;
use crate::extract::{PageExtractor, PostExtractor};

mod config;
mod extract;
mod markdown;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Prepare a site and run the first build pass.
        cmd quill {
            /// The site's source directory.
            required src: PathBuf
            /// Where output directories are created.
            required dest: PathBuf
            /// Extract pages, then posts, on the calling thread.
            optional --sequential
            /// Number of worker threads.
            optional -j, --jobs jobs: usize
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("QUIRE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn check_source(src: &Path) -> Result<()> {
    match src.is_dir() {
        true => Ok(()),
        false => Err(Error::system(format!("source `{}` is not a directory", src.display()))),
    }
}

fn configure_pool(jobs: Option<usize>) -> Result<()> {
    let Some(jobs) = jobs else {
        return Ok(());
    };

    if jobs == 0 {
        return Err(Error::system("`jobs` must be at least 1"));
    }

    quire::rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .map_err(|e| Error::system(format!("failed to start {jobs} worker threads: {e}")))
}

fn run(flags: flags::Quill) -> Result<BuildState> {
    check_source(&flags.src)?;
    let settings = Settings::discover(&flags.src)?;
    configure_pool(flags.jobs.or(settings.jobs))?;

    let mode = match flags.sequential {
        true => Mode::Sequential,
        false => Mode::Parallel,
    };

    let posts = PostExtractor { preview_length: settings.preview_length };
    let state = BuildState::new(&flags.src, &flags.dest, settings.project);
    build::run(state, &PageExtractor, &posts, mode)
}

fn report(state: &BuildState) {
    let menu = state.pages.iter().filter(|page| page.menu).count();
    println!("pages: {} ({menu} in menu)", state.pages.len());
    println!("posts: {}", state.posts.len());
    for (tag, count) in state.tags.counts() {
        println!("  #{tag}: {count}");
    }

    for content in state.contents() {
        tracing::debug!(url = content.url(), output = %content.output().display(), "{}", content.title());
    }
}

pub fn main() -> ExitCode {
    let flags = flags::Quill::from_env_or_exit();
    init_tracing();

    let start = Instant::now();
    match run(flags) {
        Ok(state) => {
            report(&state);
            println!("total time: {}ms", start.elapsed().as_millis());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let count = e.iter().count();
            eprintln!("error: build failed with {count} error(s) [{}]", e.kind());
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
