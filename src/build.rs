//! Exports [`build_snapshot`], which stitches together the steps of one
//! ingestion pass: loading the content directory ([`crate::loader`]), turning
//! each slug's files into a post ([`crate::post`]), and indexing the posts
//! ([`crate::index`]). Any failure aborts the whole pass; there is no partial
//! snapshot.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::feed::Error as FeedError;
use crate::index::Snapshot;
use crate::loader::{self, Error as LoadError};
use crate::post::{Error as PostError, Post};

/// Builds a snapshot of `config.content_dir` as of the current time.
pub fn build_snapshot(config: &Config) -> Result<Snapshot> {
    build_snapshot_at(config, Utc::now())
}

/// Builds a snapshot of `config.content_dir`, treating `now` as the current
/// time: posts without a date get `now`, and posts dated after it are left
/// out.
pub fn build_snapshot_at(config: &Config, now: DateTime<Utc>) -> Result<Snapshot> {
    let raw_posts = loader::load(&config.content_dir)?;
    let posts = raw_posts
        .into_iter()
        .map(|raw| Post::from_raw(raw, config, now))
        .collect::<std::result::Result<Vec<Post>, PostError>>()?;
    let snapshot = Snapshot::build(posts, config, now)?;

    tracing::info!(
        dir = %config.content_dir.display(),
        posts = snapshot.posts().len(),
        pages = snapshot.page_count(),
        tags = snapshot.tags().len(),
        categories = snapshot.categories().len(),
        "built blog snapshot"
    );
    Ok(snapshot)
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for an ingestion pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the content directory or one of its files can't be read.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Returned when a post's metadata or body can't be processed.
    #[error(transparent)]
    Post(#[from] PostError),

    /// Returned when the feeds can't be serialized.
    #[error(transparent)]
    Feed(#[from] FeedError),
}
