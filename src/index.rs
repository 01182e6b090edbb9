//! Defines the [`Snapshot`]: the complete, immutable index built from one
//! pass over the content directory.
//!
//! Every table in the snapshot refers to posts by their position in
//! [`Snapshot::posts`], which is in chronological order (oldest first). That
//! keeps the tables cheap to build and makes the prev/next links plain
//! positions rather than references.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::config::Config;
use crate::feed;
use crate::post::Post;
use crate::tag::Taxon;
use crate::value::SharedContext;

/// Year (`%Y`) to month (`%m`) to post positions, each bucket in
/// chronological order.
pub type Archive = BTreeMap<String, BTreeMap<String, Vec<usize>>>;

/// Tag or category slug to its [`Taxon`].
pub type Taxonomy = BTreeMap<String, Taxon>;

/// The derived blog index. Never mutated once built; a reload builds a new
/// one.
#[derive(Clone, Debug)]
pub struct Snapshot {
    posts: Vec<Post>,
    by_slug: HashMap<String, usize>,
    pages: Vec<Vec<usize>>,
    latest: Vec<usize>,
    archive: Archive,
    tags: Taxonomy,
    categories: Taxonomy,
    rss: String,
    atom: String,
    built_at: DateTime<Utc>,
    shared: SharedContext,
}

impl Snapshot {
    /// Indexes `posts`, which must be in discovery order. Posts dated after
    /// `now` are left out. The rest are sorted by date (stable, so ties keep
    /// discovery order), linked to their neighbours, paginated newest first,
    /// grouped into the archive and the tag and category tables, and
    /// serialized into the feeds.
    pub fn build(posts: Vec<Post>, config: &Config, now: DateTime<Utc>) -> feed::Result<Snapshot> {
        let mut posts: Vec<Post> = posts
            .into_iter()
            .filter(|post| {
                let published = post.date <= now;
                if !published {
                    tracing::debug!(slug = %post.slug, date = %post.date, "skipping future post");
                }
                published
            })
            .collect();
        posts.sort_by(|a, b| a.date.cmp(&b.date));

        let count = posts.len();
        for (i, post) in posts.iter_mut().enumerate() {
            post.prev = i.checked_sub(1);
            post.next = if i + 1 < count { Some(i + 1) } else { None };
        }

        let by_slug = posts
            .iter()
            .enumerate()
            .map(|(i, post)| (post.slug.clone(), i))
            .collect();

        let newest_first: Vec<usize> = (0..count).rev().collect();
        let pages = newest_first
            .chunks(config.index_count)
            .map(<[usize]>::to_vec)
            .collect();
        let latest = newest_first.iter().copied().take(config.latest_count).collect();

        let mut archive = Archive::new();
        let mut tags = Taxonomy::new();
        let mut categories = Taxonomy::new();
        for (i, post) in posts.iter().enumerate() {
            archive
                .entry(post.year.clone())
                .or_default()
                .entry(post.month.clone())
                .or_default()
                .push(i);
            for tag in &post.tags {
                tags.entry(tag.slug.clone())
                    .or_insert_with(|| Taxon::new(tag))
                    .posts
                    .push(i);
            }
            if let Some(category) = &post.category {
                categories
                    .entry(category.slug.clone())
                    .or_insert_with(|| Taxon::new(category))
                    .posts
                    .push(i);
            }
        }

        let feed_config = feed::FeedConfig::from(config);
        let rss = feed::rss(&feed_config, &posts)?;
        let atom = feed::atom(&feed_config, &posts)?;

        Ok(Snapshot {
            posts,
            by_slug,
            pages,
            latest,
            archive,
            tags,
            categories,
            rss,
            atom,
            built_at: now,
            shared: SharedContext::default(),
        })
    }

    /// All published posts, oldest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.by_slug.get(slug).map(|&i| &self.posts[i])
    }

    /// The posts at the given positions, in the given order.
    pub fn resolve<'a>(&'a self, positions: &'a [usize]) -> impl Iterator<Item = &'a Post> + 'a {
        positions.iter().map(move |&i| &self.posts[i])
    }

    /// The index pages, newest posts first.
    pub fn pages(&self) -> &[Vec<usize>] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The 1-based index page `number`.
    pub fn page(&self, number: usize) -> Option<&[usize]> {
        number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(Vec::as_slice)
    }

    /// The newest posts, newest first.
    pub fn latest(&self) -> &[usize] {
        &self.latest
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn archive_year(&self, year: &str) -> Option<&BTreeMap<String, Vec<usize>>> {
        self.archive.get(year)
    }

    pub fn archive_month(&self, year: &str, month: &str) -> Option<&[usize]> {
        self.archive
            .get(year)
            .and_then(|months| months.get(month))
            .map(Vec::as_slice)
    }

    pub fn tags(&self) -> &Taxonomy {
        &self.tags
    }

    pub fn tag(&self, slug: &str) -> Option<&Taxon> {
        self.tags.get(slug)
    }

    pub fn categories(&self) -> &Taxonomy {
        &self.categories
    }

    pub fn category(&self, slug: &str) -> Option<&Taxon> {
        self.categories.get(slug)
    }

    /// The RSS 2.0 document.
    pub fn rss(&self) -> &str {
        &self.rss
    }

    /// The Atom 1.0 document.
    pub fn atom(&self) -> &str {
        &self.atom
    }

    /// The time used as "now" when the snapshot was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// The cached site-wide template fields.
    pub(crate) fn shared_context(&self) -> &SharedContext {
        &self.shared
    }
}
