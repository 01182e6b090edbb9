//! Defines the [`Tag`] type, used for both post tags and post categories, and
//! the [`Taxon`] type, which groups the posts carrying one tag or category.

use std::hash::{Hash, Hasher};

/// A post tag or category. Identity is the slugified name, so `macOS` and
/// `MacOS` resolve to the same tag, and the slug can be dropped into a URL.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The name as first written in metadata.
    pub name: String,

    /// The slugified name. This is the lookup key for tag and category
    /// tables and the `<name>` part of `tag:<name>` requests.
    pub slug: String,
}

impl Tag {
    /// Returns `None` when `name` has nothing to slugify (empty, whitespace,
    /// or punctuation only).
    pub fn new(name: &str) -> Option<Tag> {
        let name = name.trim();
        let slug = slug::slugify(name);
        if slug.is_empty() {
            None
        } else {
            Some(Tag {
                name: name.to_owned(),
                slug,
            })
        }
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `slug`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Tag {}

/// One tag or category and the posts filed under it, as positions into the
/// snapshot's chronological post list (oldest first).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Taxon {
    pub name: String,
    pub slug: String,
    pub posts: Vec<usize>,
}

impl Taxon {
    pub fn new(tag: &Tag) -> Taxon {
        Taxon {
            name: tag.name.clone(),
            slug: tag.slug.clone(),
            posts: Vec::new(),
        }
    }
}
