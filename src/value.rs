//! Converts snapshot data into [`Value`]s for templating. [`ViewContext`]
//! assembles the full context handed to a view template: the site-wide
//! fields every view gets plus the fields specific to the resolved view.

use gtmpl_value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::config::Config;
use crate::index::Snapshot;
use crate::post::Post;
use crate::router::ViewResult;
use crate::tag::{Tag, Taxon};

impl From<&Tag> for Value {
    fn from(t: &Tag) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(t.name.clone()));
        m.insert("slug".to_owned(), Value::String(t.slug.clone()));
        Value::Object(m)
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::from(i),
            (None, Some(f)) => Value::from(f),
            (None, None) => Value::String(n.to_string()),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn option<T>(opt: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    match opt {
        Some(x) => f(x),
        None => Value::Nil,
    }
}

/// Builds template values for posts, with links resolved against the
/// configuration and the snapshot.
struct Values<'a> {
    config: &'a Config,
    snapshot: &'a Snapshot,
}

impl<'a> Values<'a> {
    /// The short form of a post used for prev/next links.
    fn link(&self, post: &Post) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("slug".to_owned(), string(&post.slug));
        m.insert("title".to_owned(), string(&post.title));
        m.insert("url".to_owned(), string(post.url.as_str()));
        m.insert("path".to_owned(), string(post.url.path()));
        Value::Object(m)
    }

    fn tag(&self, tag: &Tag, view: &str) -> Value {
        let mut value = Value::from(tag);
        if let Value::Object(m) = &mut value {
            m.insert(
                "path".to_owned(),
                Value::String(self.config.link(&format!("{}-{}", view, tag.slug))),
            );
        }
        value
    }

    fn post(&self, post: &Post) -> Value {
        let (summary, summarized) = post.summary();
        let posts = self.snapshot.posts();

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("slug".to_owned(), string(&post.slug));
        m.insert("title".to_owned(), string(&post.title));
        m.insert("url".to_owned(), string(post.url.as_str()));
        m.insert("path".to_owned(), string(post.url.path()));
        m.insert("date".to_owned(), Value::String(post.date.to_rfc3339()));
        m.insert("year".to_owned(), string(&post.year));
        m.insert("month".to_owned(), string(&post.month));
        m.insert("day".to_owned(), string(&post.day));
        m.insert("monthname".to_owned(), string(&post.month_name));
        m.insert(
            "tags".to_owned(),
            Value::Array(post.tags.iter().map(|t| self.tag(t, "tag")).collect()),
        );
        m.insert(
            "category".to_owned(),
            option(post.category.as_ref(), |c| self.tag(c, "category")),
        );
        m.insert("content".to_owned(), string(&post.body));
        m.insert("html".to_owned(), string(&post.html));
        m.insert("summary".to_owned(), string(summary));
        m.insert("summarized".to_owned(), Value::Bool(summarized));
        m.insert(
            "meta".to_owned(),
            Value::Object(
                post.meta
                    .iter()
                    .map(|(k, v)| (k.clone(), json_to_value(v)))
                    .collect(),
            ),
        );
        m.insert("prev".to_owned(), option(post.prev, |i| self.link(&posts[i])));
        m.insert("next".to_owned(), option(post.next, |i| self.link(&posts[i])));
        Value::Object(m)
    }

    fn posts(&self, positions: &[usize]) -> Value {
        Value::Array(
            self.snapshot
                .resolve(positions)
                .map(|post| self.post(post))
                .collect(),
        )
    }

    fn months(&self, months: &std::collections::BTreeMap<String, Vec<usize>>) -> Value {
        Value::Object(
            months
                .iter()
                .map(|(month, positions)| (month.clone(), self.posts(positions)))
                .collect(),
        )
    }

    fn archive(&self) -> Value {
        Value::Object(
            self.snapshot
                .archive()
                .iter()
                .map(|(year, months)| (year.clone(), self.months(months)))
                .collect(),
        )
    }

    fn taxon(&self, taxon: &Taxon, view: &str) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), string(&taxon.name));
        m.insert("slug".to_owned(), string(&taxon.slug));
        m.insert(
            "path".to_owned(),
            Value::String(self.config.link(&format!("{}-{}", view, taxon.slug))),
        );
        m.insert("count".to_owned(), Value::from(taxon.posts.len() as i64));
        m.insert("posts".to_owned(), self.posts(&taxon.posts));
        Value::Object(m)
    }

    fn taxonomy<'t>(&self, taxa: impl Iterator<Item = &'t Taxon>, view: &str) -> Value {
        Value::Object(
            taxa.map(|taxon| (taxon.slug.clone(), self.taxon(taxon, view)))
                .collect(),
        )
    }
}

/// The site-wide part of every view context, filled in on first use and
/// kept with the snapshot it was built from.
#[derive(Clone, Default)]
pub struct SharedContext(OnceLock<HashMap<String, Value>>);

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("built", &self.0.get().is_some())
            .finish()
    }
}

/// The context handed to a view template.
pub struct ViewContext<'a> {
    pub config: &'a Config,
    pub snapshot: &'a Snapshot,
    pub view: &'a ViewResult<'a>,
}

impl<'a> ViewContext<'a> {
    pub fn new(config: &'a Config, snapshot: &'a Snapshot, view: &'a ViewResult<'a>) -> Self {
        ViewContext {
            config,
            snapshot,
            view,
        }
    }

    /// Converts the context into a [`Value::Object`]. Every view gets `title`,
    /// `description`, `domain`, `base`, `url`, `posts` (oldest first),
    /// `latest`, `pages` (the page count), `archive`, `tags`, and
    /// `categories`; the resolved view adds its own fields (`thisPost`,
    /// `thisPageNum`, `thesePosts`, `prevUrl`, `nextUrl`,
    /// `thisArchiveYear`, `thisArchiveMonth`, `tagName`, `catName`).
    pub fn to_value(&self) -> Value {
        let values = Values {
            config: self.config,
            snapshot: self.snapshot,
        };
        let mut m = self
            .snapshot
            .shared_context()
            .0
            .get_or_init(|| self.common(&values))
            .clone();

        match self.view {
            ViewResult::IndexPage { page } => {
                let page = *page;
                let positions = self.snapshot.page(page).unwrap_or(&[]);
                m.insert("thisPageNum".to_owned(), Value::from(page as i64));
                m.insert("thesePosts".to_owned(), values.posts(positions));
                m.insert(
                    "prevUrl".to_owned(),
                    match page > 1 {
                        true => Value::String(self.page_link(page - 1)),
                        false => Value::Nil,
                    },
                );
                m.insert(
                    "nextUrl".to_owned(),
                    match page < self.snapshot.page_count() {
                        true => Value::String(self.page_link(page + 1)),
                        false => Value::Nil,
                    },
                );
            }
            ViewResult::SinglePost { slug } => {
                m.insert(
                    "thisPost".to_owned(),
                    option(self.snapshot.post(slug), |post| values.post(post)),
                );
            }
            ViewResult::ArchiveYear { year } => {
                m.insert("thisArchiveYear".to_owned(), string(year));
                m.insert(
                    "thisArchive".to_owned(),
                    option(self.snapshot.archive_year(year), |months| {
                        values.months(months)
                    }),
                );
            }
            ViewResult::ArchiveMonth { year, month } => {
                m.insert("thisArchiveYear".to_owned(), string(year));
                m.insert("thisArchiveMonth".to_owned(), string(month));
                m.insert(
                    "thesePosts".to_owned(),
                    values.posts(self.snapshot.archive_month(year, month).unwrap_or(&[])),
                );
            }
            ViewResult::TagPosts { name } => {
                let tag = self.snapshot.tag(name);
                m.insert("tagName".to_owned(), string(name));
                m.insert(
                    "tagTitle".to_owned(),
                    option(tag, |tag| string(&tag.name)),
                );
                m.insert(
                    "thesePosts".to_owned(),
                    values.posts(tag.map(|tag| tag.posts.as_slice()).unwrap_or(&[])),
                );
            }
            ViewResult::CategoryPosts { name } => {
                let category = self.snapshot.category(name);
                m.insert("catName".to_owned(), string(name));
                m.insert(
                    "catTitle".to_owned(),
                    option(category, |category| string(&category.name)),
                );
                m.insert(
                    "thesePosts".to_owned(),
                    values.posts(category.map(|c| c.posts.as_slice()).unwrap_or(&[])),
                );
            }
            ViewResult::ArchiveAll
            | ViewResult::TagCloud
            | ViewResult::CategoryCloud
            | ViewResult::Feed { .. }
            | ViewResult::NotFound => {}
        }

        Value::Object(m)
    }

    /// The fields every view gets. They only depend on the configuration and
    /// the snapshot, so they are built once per snapshot.
    fn common(&self, values: &Values) -> HashMap<String, Value> {
        let all: Vec<usize> = (0..self.snapshot.posts().len()).collect();

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), string(&self.config.title));
        m.insert("description".to_owned(), string(&self.config.description));
        m.insert("domain".to_owned(), string(&self.config.domain));
        m.insert("base".to_owned(), string(&self.config.base_path));
        m.insert("url".to_owned(), string(self.config.site_url.as_str()));
        m.insert("posts".to_owned(), values.posts(&all));
        m.insert("latest".to_owned(), values.posts(self.snapshot.latest()));
        m.insert(
            "pages".to_owned(),
            Value::from(self.snapshot.page_count() as i64),
        );
        m.insert("archive".to_owned(), values.archive());
        m.insert(
            "tags".to_owned(),
            values.taxonomy(self.snapshot.tags().values(), "tag"),
        );
        m.insert(
            "categories".to_owned(),
            values.taxonomy(self.snapshot.categories().values(), "category"),
        );
        m
    }

    fn page_link(&self, page: usize) -> String {
        match page {
            1 => self.config.base_path.clone(),
            _ => self.config.link(&format!("page-{}", page)),
        }
    }
}

impl From<&ViewContext<'_>> for Value {
    fn from(context: &ViewContext<'_>) -> Value {
        context.to_value()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::build::build_snapshot_at;
    use crate::router::route;
    use chrono::{TimeZone, Utc};
    use std::fs;

    fn fixture() -> (Config, Snapshot) {
        let dir = tempfile::tempdir().unwrap();
        for n in 1..=3 {
            fs::write(dir.path().join(format!("p{}.md", n)), format!("post *{}*", n)).unwrap();
            fs::write(
                dir.path().join(format!("p{}.json", n)),
                format!(
                    r#"{{"title":"Post {}","date":"2020-0{}-10","tags":["Go"],"category":"Dev","mood":"happy"}}"#,
                    n, n
                ),
            )
            .unwrap();
        }
        let mut config = Config::from_yaml(
            "domain: example.org\ntitle: Blog\nbase_path: /blog",
            dir.path(),
        )
        .unwrap();
        config.content_dir = dir.path().to_owned();
        config.index_count = 2;
        let snapshot =
            build_snapshot_at(&config, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();
        (config, snapshot)
    }

    fn object(value: &Value) -> &HashMap<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("wanted object"),
        }
    }

    fn array(value: &Value) -> &Vec<Value> {
        match value {
            Value::Array(items) => items,
            _ => panic!("wanted array"),
        }
    }

    fn text(value: &Value) -> &str {
        match value {
            Value::String(s) => s,
            _ => panic!("wanted string"),
        }
    }

    #[test]
    fn test_common_fields() {
        let (config, snapshot) = fixture();
        let view = route(&snapshot, "archive");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        let m = object(&value);
        assert_eq!(text(&m["title"]), "Blog");
        assert_eq!(text(&m["domain"]), "example.org");
        assert_eq!(text(&m["base"]), "/blog/");
        assert_eq!(array(&m["posts"]).len(), 3);
        assert_eq!(object(&object(&m["archive"])["2020"]).len(), 3);
        assert!(object(&m["tags"]).contains_key("go"));
        assert!(object(&m["categories"]).contains_key("dev"));
    }

    #[test]
    fn test_common_fields_are_built_once_per_snapshot() {
        let (config, snapshot) = fixture();
        assert!(snapshot.shared_context().0.get().is_none());

        let view = route(&snapshot, "p2");
        let post = ViewContext::new(&config, &snapshot, &view).to_value();
        assert!(snapshot.shared_context().0.get().is_some());

        let view = route(&snapshot, "tag");
        let cloud = ViewContext::new(&config, &snapshot, &view).to_value();
        assert_eq!(array(&object(&post)["posts"]).len(), 3);
        assert_eq!(array(&object(&cloud)["posts"]).len(), 3);
        assert!(object(&post).contains_key("thisPost"));
        assert!(!object(&cloud).contains_key("thisPost"));
        assert!(!snapshot
            .shared_context()
            .0
            .get()
            .unwrap()
            .contains_key("thisPost"));
    }

    #[test]
    fn test_index_page_fields() {
        let (config, snapshot) = fixture();
        let view = route(&snapshot, "page:2");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        let m = object(&value);
        let these = array(&m["thesePosts"]);
        assert_eq!(these.len(), 1);
        assert_eq!(text(&object(&these[0])["slug"]), "p1");
        assert_eq!(text(&m["prevUrl"]), "/blog/");
        assert!(matches!(m["nextUrl"], Value::Nil));

        let view = route(&snapshot, "");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        let m = object(&value);
        assert!(matches!(m["prevUrl"], Value::Nil));
        assert_eq!(text(&m["nextUrl"]), "/blog/page-2");
    }

    #[test]
    fn test_single_post_fields() {
        let (config, snapshot) = fixture();
        let view = route(&snapshot, "p2");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        let post = object(&object(&value)["thisPost"]);
        assert_eq!(text(&post["title"]), "Post 2");
        assert_eq!(text(&post["url"]), "http://example.org/blog/p2");
        assert_eq!(text(&post["html"]), "<p>post <em>2</em></p>\n");
        assert_eq!(text(&object(&post["prev"])["slug"]), "p1");
        assert_eq!(text(&object(&post["next"])["slug"]), "p3");
        assert_eq!(text(&object(&post["meta"])["mood"]), "happy");
        let tags = array(&post["tags"]);
        assert_eq!(text(&object(&tags[0])["path"]), "/blog/tag-go");
    }

    #[test]
    fn test_taxonomy_fields() {
        let (config, snapshot) = fixture();
        let view = route(&snapshot, "tag:go");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        let m = object(&value);
        assert_eq!(text(&m["tagName"]), "go");
        assert_eq!(text(&m["tagTitle"]), "Go");
        assert_eq!(array(&m["thesePosts"]).len(), 3);

        let view = route(&snapshot, "category-dev");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        assert_eq!(text(&object(&value)["catName"]), "dev");
    }

    #[test]
    fn test_archive_month_fields() {
        let (config, snapshot) = fixture();
        let view = route(&snapshot, "archive:2020-02");
        let value = ViewContext::new(&config, &snapshot, &view).to_value();
        let m = object(&value);
        assert_eq!(text(&m["thisArchiveYear"]), "2020");
        assert_eq!(text(&m["thisArchiveMonth"]), "02");
        assert_eq!(array(&m["thesePosts"]).len(), 1);
    }
}
