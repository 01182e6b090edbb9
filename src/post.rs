//! Defines the [`Post`] type and the step that turns a [`RawPost`] (the files
//! found for one slug) into a post: metadata is merged and normalized, the
//! body is rendered, and the canonical URL is assigned.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use url::Url;

use crate::config::Config;
use crate::loader::RawPost;
use crate::metadata::{self, RawMetadata};
use crate::render::{self, BodyFormat};
use crate::tag::Tag;

/// One published blog post.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub year: String,
    pub month: String,
    pub day: String,
    pub month_name: String,
    pub tags: Vec<Tag>,
    pub category: Option<Tag>,

    /// Metadata keys with no special meaning, passed through to templates.
    pub meta: RawMetadata,

    /// The body source, empty when the post has no body file.
    pub body: String,

    /// The rendered body, empty when the post has no body file.
    pub html: String,

    pub format: Option<BodyFormat>,

    /// `{scheme}://{domain}{base_path}{slug}`.
    pub url: Url,

    /// The position of the chronologically previous (older) post.
    pub prev: Option<usize>,

    /// The position of the chronologically next (newer) post.
    pub next: Option<usize>,
}

impl Post {
    /// Builds a post from the files found for one slug. Metadata files are
    /// merged key by key in discovery order (later files win) before
    /// normalization; `now` is the date given to posts without one.
    pub fn from_raw(raw: RawPost, config: &Config, now: DateTime<Utc>) -> Result<Post> {
        let mut merged = RawMetadata::new();
        let mut origins: HashMap<String, String> = HashMap::new();
        for source in &raw.metadata {
            let decoded = metadata::decode(&source.text, source.format).map_err(|err| {
                Error::MetadataParse {
                    file: source.file_name.clone(),
                    err,
                }
            })?;
            for (key, value) in decoded {
                origins.insert(key.clone(), source.file_name.clone());
                merged.insert(key, value);
            }
        }

        let meta = metadata::normalize(merged, &raw.slug, now).map_err(|err| {
            let file = blame(&err, &origins).unwrap_or(&raw.slug).to_owned();
            Error::MetadataParse { file, err }
        })?;

        let (body, html, format) = match raw.body {
            Some(source) => {
                let html = render::render(&source.text, source.format).map_err(|err| {
                    Error::Render {
                        file: source.file_name.clone(),
                        err,
                    }
                })?;
                (source.text, html, Some(source.format))
            }
            None => (String::new(), String::new(), None),
        };

        Ok(Post {
            url: config.post_url(&raw.slug)?,
            slug: raw.slug,
            title: meta.title,
            date: meta.date,
            year: meta.year,
            month: meta.month,
            day: meta.day,
            month_name: meta.month_name,
            tags: meta.tags,
            category: meta.category,
            meta: meta.extra,
            body,
            html,
            format,
            prev: None,
            next: None,
        })
    }

    /// Returns the rendered body up to the fold marker (`<!-- more -->`) and
    /// whether the body was actually folded.
    pub fn summary(&self) -> (&str, bool) {
        const FOLD_TAG: &str = "<!-- more -->";
        match self.html.find(FOLD_TAG) {
            Some(i) => (&self.html[..i], true),
            None => (&self.html, false),
        }
    }
}

// Finds the metadata file that supplied the field a normalization error is
// about.
fn blame<'a>(err: &metadata::Error, origins: &'a HashMap<String, String>) -> Option<&'a str> {
    let keys: &[&str] = match err {
        metadata::Error::Date { .. } => &["datetime", "date"],
        metadata::Error::InvalidField { field: "date", .. } => &["datetime", "date"],
        metadata::Error::InvalidField { field, .. } => std::slice::from_ref(field),
        _ => &[],
    };
    keys.iter()
        .find_map(|key| origins.get(*key))
        .map(String::as_str)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to turn a [`RawPost`] into a [`Post`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a metadata file can't be decoded or normalized. `file`
    /// names the offending source file.
    #[error("parsing metadata in `{file}`: {err}")]
    MetadataParse {
        file: String,
        #[source]
        err: metadata::Error,
    },

    /// Returned when a body file can't be converted to HTML.
    #[error("rendering `{file}`: {err}")]
    Render {
        file: String,
        #[source]
        err: render::Error,
    },

    /// Returned when the post URL can't be built from the slug.
    #[error("building post url: {0}")]
    Url(#[from] url::ParseError),
}
