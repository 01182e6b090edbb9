//! The library code for the `connect-blog` middleware, which serves a blog
//! straight out of a directory of content files. The architecture breaks down
//! into two halves:
//!
//! 1. Ingestion: building an immutable [`Snapshot`] of the content directory
//!    ([`crate::build`])
//! 2. Serving: routing request paths against the current snapshot and handing
//!    the result to the host framework ([`crate::blog`])
//!
//! Ingestion is itself composed of three sub-steps:
//!
//! 1. Loading the raw files and grouping them by slug ([`crate::loader`])
//! 2. Decoding and merging metadata and rendering bodies into posts
//!    ([`crate::metadata`], [`crate::render`], [`crate::post`])
//! 3. Indexing the posts into pages, archive buckets, tags, categories, and
//!    feeds ([`crate::index`], [`crate::feed`])
//!
//! Serving never touches the filesystem. A request loads the current snapshot,
//! [`route`]s its path to a [`ViewResult`], and answers through a
//! [`Responder`]: raw bytes for the feeds, a template plus context
//! ([`crate::value`]) for every other view, or a fall-through to the next
//! handler. [`Blog::reload`] swaps in a freshly built snapshot atomically.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod blog;
pub mod build;
pub mod config;
pub mod feed;
pub mod index;
pub mod loader;
pub mod markdown;
pub mod metadata;
pub mod post;
pub mod render;
pub mod router;
pub mod tag;
pub mod template;
pub mod textile;
pub mod value;

pub use blog::{Blog, Responder};
pub use build::{build_snapshot, Error as IngestError};
pub use config::Config;
pub use index::Snapshot;
pub use router::{route, ViewResult};
pub use template::{Response, TemplateResponder, Templates};
