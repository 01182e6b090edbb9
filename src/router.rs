//! Maps a request path token onto a view of a [`Snapshot`].
//!
//! Routing happens in two steps. [`Request::parse`] classifies the token
//! without looking at any content, and [`route`] resolves the classified
//! request against a snapshot, turning references to pages, archive buckets,
//! tags, categories, or posts that don't exist into [`ViewResult::NotFound`].
//! The patterns are tried in this order, first match wins:
//!
//! | token | view |
//! |---|---|
//! | (empty) | index page 1 |
//! | `rss20.xml`, `atom.xml` | feeds |
//! | `page:<n>`, `page-<n>` | index page `n` |
//! | `archive` | whole archive |
//! | `archive:<yyyy>`, `archive-<yyyy>` | one year |
//! | `archive:<yyyy-mm>`, `archive-<yyyy>-<mm>` | one month |
//! | `tag`, `tag:<name>`, `tag-<name>` | tag cloud, one tag |
//! | `category`, `category:<name>`, `category-<name>` | category cloud, one category |
//! | `<slug>` | one post |

use crate::index::Snapshot;

/// The content type of both feeds.
pub const FEED_CONTENT_TYPE: &str = "application/xml";

/// A classified request token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request<'a> {
    Home,
    Rss,
    Atom,
    Page(usize),
    ArchiveAll,
    ArchiveYear(String),
    ArchiveMonth(String, String),
    TagCloud,
    Tag(&'a str),
    CategoryCloud,
    Category(&'a str),
    Post(&'a str),

    /// A recognized prefix with an argument that can't name anything, e.g.
    /// `page:1asd` or `archive:20x0`.
    Invalid,
}

impl<'a> Request<'a> {
    pub fn parse(path: &'a str) -> Request<'a> {
        match path {
            "" => return Request::Home,
            "rss20.xml" => return Request::Rss,
            "atom.xml" => return Request::Atom,
            "archive" => return Request::ArchiveAll,
            "tag" => return Request::TagCloud,
            "category" => return Request::CategoryCloud,
            _ => {}
        }

        if let Some(arg) = argument(path, "page") {
            match parse_number(arg) {
                Some(n) => Request::Page(n),
                None => Request::Invalid,
            }
        } else if let Some(arg) = argument(path, "archive") {
            parse_archive(arg)
        } else if let Some(arg) = argument(path, "tag") {
            match arg.is_empty() {
                true => Request::Invalid,
                false => Request::Tag(arg),
            }
        } else if let Some(arg) = argument(path, "category") {
            match arg.is_empty() {
                true => Request::Invalid,
                false => Request::Category(arg),
            }
        } else {
            Request::Post(path)
        }
    }
}

// Both `name:arg` and `name-arg` are accepted.
fn argument<'a>(path: &'a str, name: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(name)?;
    rest.strip_prefix(':').or_else(|| rest.strip_prefix('-'))
}

/// Parses a non-empty run of ASCII digits. Anything else, including a sign
/// or trailing characters (`1asd`), is rejected.
fn parse_number(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_archive(arg: &str) -> Request<'_> {
    let mut parts = arg.splitn(2, '-');
    let year = parts.next().and_then(parse_number);
    let month = parts.next().map(parse_number);
    match (year, month) {
        (Some(year), None) => Request::ArchiveYear(format!("{:04}", year)),
        (Some(year), Some(Some(month))) if (1..=12).contains(&month) => {
            Request::ArchiveMonth(format!("{:04}", year), format!("{:02}", month))
        }
        _ => Request::Invalid,
    }
}

/// The view a request resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewResult<'a> {
    /// A 1-based index page.
    IndexPage { page: usize },

    /// A pre-rendered feed document.
    Feed {
        content: &'a str,
        content_type: &'static str,
    },

    ArchiveAll,
    ArchiveYear { year: String },
    ArchiveMonth { year: String, month: String },
    TagCloud,

    /// The posts of one tag; `name` is the tag slug.
    TagPosts { name: String },

    CategoryCloud,

    /// The posts of one category; `name` is the category slug.
    CategoryPosts { name: String },

    SinglePost { slug: String },

    /// Nothing matched. The caller should hand the request to its next
    /// handler.
    NotFound,
}

/// Resolves `path` against `snapshot`. This is a pure function: the same
/// path and snapshot always give the same result.
pub fn route<'a>(snapshot: &'a Snapshot, path: &str) -> ViewResult<'a> {
    match Request::parse(path) {
        Request::Home => ViewResult::IndexPage { page: 1 },
        Request::Rss => ViewResult::Feed {
            content: snapshot.rss(),
            content_type: FEED_CONTENT_TYPE,
        },
        Request::Atom => ViewResult::Feed {
            content: snapshot.atom(),
            content_type: FEED_CONTENT_TYPE,
        },
        Request::Page(page) => match snapshot.page(page) {
            Some(_) => ViewResult::IndexPage { page },
            None => ViewResult::NotFound,
        },
        Request::ArchiveAll => ViewResult::ArchiveAll,
        Request::ArchiveYear(year) => match snapshot.archive_year(&year) {
            Some(_) => ViewResult::ArchiveYear { year },
            None => ViewResult::NotFound,
        },
        Request::ArchiveMonth(year, month) => match snapshot.archive_month(&year, &month) {
            Some(_) => ViewResult::ArchiveMonth { year, month },
            None => ViewResult::NotFound,
        },
        Request::TagCloud => ViewResult::TagCloud,
        Request::Tag(name) => match snapshot.tag(&slug::slugify(name)) {
            Some(tag) => ViewResult::TagPosts {
                name: tag.slug.clone(),
            },
            None => ViewResult::NotFound,
        },
        Request::CategoryCloud => ViewResult::CategoryCloud,
        Request::Category(name) => match snapshot.category(&slug::slugify(name)) {
            Some(category) => ViewResult::CategoryPosts {
                name: category.slug.clone(),
            },
            None => ViewResult::NotFound,
        },
        Request::Post(slug) => match snapshot.post(slug) {
            Some(post) => ViewResult::SinglePost {
                slug: post.slug.clone(),
            },
            None => ViewResult::NotFound,
        },
        Request::Invalid => ViewResult::NotFound,
    }
}
