//! Support for serializing posts into RSS 2.0 and Atom 1.0 documents.
//!
//! Both feeds use the same field mapping: the post title, the rendered body
//! as the description/content, the canonical post URL as the link and the
//! id/guid, the post date, and the tags and category as feed categories.
//! Items are listed newest first. Nothing in the output depends on the time
//! the feed was built, so identical content always yields identical bytes.

use atom_syndication::{Category as AtomCategory, Content, Entry, Feed, Link};
use chrono::{DateTime, FixedOffset, Utc};
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder};
use url::Url;

use crate::config::Config;
use crate::post::Post;
use crate::tag::Tag;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub description: String,
    pub site_url: Url,
}

impl From<&Config> for FeedConfig {
    fn from(config: &Config) -> FeedConfig {
        FeedConfig {
            title: config.title.clone(),
            description: config.description.clone(),
            site_url: config.site_url.clone(),
        }
    }
}

impl FeedConfig {
    fn feed_url(&self, name: &str) -> String {
        format!("{}{}", self.site_url, name)
    }
}

// The newest post's date, or the Unix epoch for an empty blog.
fn updated(posts: &[Post]) -> DateTime<Utc> {
    posts.last().map(|post| post.date).unwrap_or_default()
}

fn post_tags(post: &Post) -> impl Iterator<Item = &Tag> {
    post.tags.iter().chain(post.category.iter())
}

/// Serializes `posts` (chronological order) into an RSS 2.0 document.
pub fn rss(config: &FeedConfig, posts: &[Post]) -> Result<String> {
    let items: Vec<rss::Item> = posts
        .iter()
        .rev()
        .map(|post| {
            ItemBuilder::default()
                .title(post.title.clone())
                .link(post.url.to_string())
                .guid(
                    GuidBuilder::default()
                        .permalink(true)
                        .value(post.url.to_string())
                        .build(),
                )
                .description(post.html.clone())
                .pub_date(post.date.to_rfc2822())
                .categories(
                    post_tags(post)
                        .map(|tag| CategoryBuilder::default().name(tag.name.clone()).build())
                        .collect::<Vec<_>>(),
                )
                .build()
        })
        .collect();

    let mut channel = ChannelBuilder::default();
    channel
        .title(config.title.clone())
        .link(config.site_url.to_string())
        .description(config.description.clone())
        .generator("connect-blog".to_owned())
        .items(items);
    if !posts.is_empty() {
        channel.last_build_date(updated(posts).to_rfc2822());
    }
    Ok(channel.build().to_string())
}

/// Serializes `posts` (chronological order) into an Atom 1.0 document.
pub fn atom(config: &FeedConfig, posts: &[Post]) -> Result<String> {
    let feed = Feed {
        title: config.title.clone().into(),
        id: config.site_url.to_string(),
        updated: updated(posts).into(),
        subtitle: match config.description.is_empty() {
            true => None,
            false => Some(config.description.clone().into()),
        },
        links: vec![
            Link {
                href: config.site_url.to_string(),
                rel: "alternate".to_owned(),
                ..Link::default()
            },
            Link {
                href: config.feed_url("atom.xml"),
                rel: "self".to_owned(),
                ..Link::default()
            },
        ],
        entries: posts.iter().rev().map(entry).collect(),
        ..Feed::default()
    };

    let bytes = feed.write_to(Vec::new())?;
    Ok(String::from_utf8(bytes)?)
}

fn entry(post: &Post) -> Entry {
    let date: DateTime<FixedOffset> = post.date.into();
    Entry {
        id: post.url.to_string(),
        title: post.title.clone().into(),
        updated: date,
        published: Some(date),
        links: vec![Link {
            href: post.url.to_string(),
            rel: "alternate".to_owned(),
            ..Link::default()
        }],
        categories: post_tags(post)
            .map(|tag| AtomCategory {
                term: tag.slug.clone(),
                label: Some(tag.name.clone()),
                ..AtomCategory::default()
            })
            .collect(),
        content: Some(Content {
            value: Some(post.html.clone()),
            content_type: Some("html".to_owned()),
            ..Content::default()
        }),
        ..Entry::default()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem serializing a feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the Atom writer fails.
    #[error("writing atom feed: {0}")]
    Atom(#[from] atom_syndication::Error),

    /// Returned when the serialized feed isn't valid UTF-8.
    #[error("feed is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use std::path::Path;

    fn posts() -> Vec<Post> {
        let config = Config::new("example.org", Path::new("content")).unwrap();
        ["older", "newer"]
            .iter()
            .enumerate()
            .map(|(i, slug)| {
                let date = Utc.with_ymd_and_hms(2020, 1, i as u32 + 1, 8, 0, 0).unwrap();
                Post {
                    slug: slug.to_string(),
                    title: format!("The {} post", slug),
                    date,
                    year: "2020".to_owned(),
                    month: "01".to_owned(),
                    day: format!("{:02}", i + 1),
                    month_name: "January".to_owned(),
                    tags: vec![Tag::new("Rust").unwrap()],
                    category: None,
                    meta: Default::default(),
                    body: String::new(),
                    html: format!("<p>{}</p>", slug),
                    format: None,
                    url: config.post_url(slug).unwrap(),
                    prev: None,
                    next: None,
                }
            })
            .collect()
    }

    fn feed_config() -> FeedConfig {
        FeedConfig {
            title: "My Blog".to_owned(),
            description: "Words".to_owned(),
            site_url: Url::parse("https://example.org/blog/").unwrap(),
        }
    }

    #[test]
    fn test_rss() -> Result<()> {
        let xml = rss(&feed_config(), &posts())?;
        assert!(xml.contains("<title>My Blog</title>"), "{}", xml);
        assert!(xml.contains("<link>http://example.org/newer</link>"), "{}", xml);
        assert!(xml.contains("Jan 2020 08:00:00 +0000"), "{}", xml);
        assert!(xml.contains("<category>Rust</category>"), "{}", xml);
        let newer = xml.find("The newer post").unwrap();
        let older = xml.find("The older post").unwrap();
        assert!(newer < older);
        Ok(())
    }

    #[test]
    fn test_atom() -> Result<()> {
        let xml = atom(&feed_config(), &posts())?;
        assert!(xml.contains("<id>https://example.org/blog/</id>"), "{}", xml);
        assert!(xml.contains("https://example.org/blog/atom.xml"), "{}", xml);
        assert!(xml.contains("<updated>2020-01-02T08:00:00+00:00</updated>"), "{}", xml);
        assert!(xml.contains("<id>http://example.org/older</id>"), "{}", xml);
        Ok(())
    }

    #[test]
    fn test_feeds_are_stable() -> Result<()> {
        assert_eq!(atom(&feed_config(), &posts())?, atom(&feed_config(), &posts())?);
        assert_eq!(rss(&feed_config(), &posts())?, rss(&feed_config(), &posts())?);
        Ok(())
    }
}
