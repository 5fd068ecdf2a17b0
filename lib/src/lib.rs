#![doc = svgbobdoc::transform!(
//! The preparation stage and first build pass of a static site generator.
//!
//! # Overview
//!
//! Quire turns a source tree into the state a renderer needs to emit a fully
//! linked site: compiled templates, the sorted pages and posts of the site, a
//! tag index, and a render context. It does not render or write pages itself.
//!
//! A source tree is laid out as follows:
//!
//! ```text
//! src/
//!   quire.toml                project metadata
//!   templates/                base, list, page, post, and nav `.html.eex`
//!   pages/**                  `.md` and `.html` pages, arbitrarily nested
//!   posts/*.md                blog posts
//! ```
//!
//! A build proceeds in two stages:
//!
//! ```svgbob
//!  +-----------------------------------------------------------+
//!  | prepare                                                   |
//!  |   +-------------------+          +-------------------+    |
//!  |   | compile templates |          | scan pages/**     |    |
//!  |   +---------+---------+          +---------+---------+    |
//!  +-------------|------------------------------|--------------+
//!                |                              |
//!                |   +--------------------------+--------------+
//!                |   | first pass                              |
//!                |   |   +---------------+  +---------------+  |
//!                |   |   | extract pages |  | extract posts |  |
//!                |   |   +-------+-------+  +-------+-------+  |
//!                |   |           +------+-----------+          |
//!                |   |                  |                      |
//!                |   |          +-------+-------+              |
//!                |   |          |   aggregate   |              |
//!                |   |          +-------+-------+              |
//!                |   +------------------|----------------------+
//!                |                      |
//!            +---+----------------------+---+
//!            |          BuildState          |
//!            +------------------------------+
//! ```
//!
//! 1. [`templating::compile_templates()`] compiles the five required
//!    templates, resolving the `base`, `page`, `post`, and `asset` link
//!    helpers against the project's base URL. Every template is attempted;
//!    all failures are reported together.
//! 2. [`scan::scan()`] walks `pages/`, mirroring its directories into the
//!    destination and returning every page source.
//! 3. [`extract::extract()`] runs a page [`Extractor`](extract::Extractor)
//!    and a post extractor, concurrently or one after the other. The first
//!    failure wins.
//! 4. [`aggregate::aggregate()`] sorts, indexes tags, and assembles the
//!    [`RenderContext`](content::RenderContext).
//!
//! [`build`] strings these together over an explicit [`BuildState`].
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fstree;
pub mod value;
pub mod project;
pub mod content;
pub mod templating;
pub mod scan;
pub mod extract;
pub mod aggregate;
pub mod state;
pub mod build;

pub use project::Project;
pub use state::BuildState;
pub use error::{Error, Result};

pub use rayon;
