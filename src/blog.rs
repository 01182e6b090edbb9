//! The request-facing half of the crate: [`Blog`] owns the configuration and
//! the published [`Snapshot`], and answers requests through a [`Responder`]
//! supplied by the host framework.
//!
//! The snapshot is held in an [`ArcSwap`]. Each request loads the current
//! snapshot once and works with it until the response is produced, so a
//! request always sees one complete snapshot even when a reload lands in the
//! middle of it. A reload builds the new snapshot off to the side and
//! publishes it with a single atomic store, or not at all.

use arc_swap::ArcSwap;
use gtmpl_value::Value;
use std::sync::Arc;

use crate::build::{self, build_snapshot};
use crate::config::Config;
use crate::index::Snapshot;
use crate::router::{route, ViewResult};
use crate::value::ViewContext;

/// The output side of a request, implemented by the host framework.
pub trait Responder {
    type Error;

    /// Sends a raw body with the given content type.
    fn send(&mut self, body: &[u8], content_type: &str) -> Result<(), Self::Error>;

    /// Renders the template named `template` with `context`.
    fn render(&mut self, template: &str, context: Value) -> Result<(), Self::Error>;

    /// Hands the request on to the next handler; nothing here matched it.
    fn next(&mut self) -> Result<(), Self::Error>;
}

/// The blog middleware.
pub struct Blog {
    config: Config,
    snapshot: ArcSwap<Snapshot>,
}

impl Blog {
    /// Builds the first snapshot. Fails if the content can't be ingested; a
    /// blog is never constructed without a complete index.
    pub fn new(config: Config) -> build::Result<Blog> {
        let snapshot = build_snapshot(&config)?;
        Ok(Blog::with_snapshot(config, snapshot))
    }

    /// Wraps an already-built snapshot.
    pub fn with_snapshot(config: Config, snapshot: Snapshot) -> Blog {
        Blog {
            config,
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The currently published snapshot. The returned `Arc` stays valid
    /// across reloads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Rebuilds the snapshot from the content directory and publishes it. On
    /// error the previously published snapshot stays in place.
    pub fn reload(&self) -> build::Result<()> {
        match build_snapshot(&self.config) {
            Ok(snapshot) => {
                self.snapshot.store(Arc::new(snapshot));
                tracing::info!("reloaded blog snapshot");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "reload failed; keeping previous snapshot");
                Err(err)
            }
        }
    }

    /// The template identifier for a view, or `None` for views that aren't
    /// rendered through a template.
    pub fn template_for(&self, view: &ViewResult) -> Option<&str> {
        let templates = &self.config.templates;
        Some(match view {
            ViewResult::IndexPage { .. } => templates.index.as_str(),
            ViewResult::SinglePost { .. } => templates.post.as_str(),
            ViewResult::ArchiveAll => templates.archive_all.as_str(),
            ViewResult::ArchiveYear { .. } => templates.archive_year.as_str(),
            ViewResult::ArchiveMonth { .. } => templates.archive_month.as_str(),
            ViewResult::TagCloud => templates.tag_cloud.as_str(),
            ViewResult::TagPosts { .. } => templates.tag.as_str(),
            ViewResult::CategoryCloud => templates.category_cloud.as_str(),
            ViewResult::CategoryPosts { .. } => templates.category.as_str(),
            ViewResult::Feed { .. } | ViewResult::NotFound => return None,
        })
    }

    /// Answers the request for `path` (already stripped of the blog's base
    /// path) through `responder`. Exactly one of the responder's methods is
    /// called.
    pub fn handle<R: Responder>(&self, path: &str, responder: &mut R) -> Result<(), R::Error> {
        let snapshot = self.snapshot.load();
        let view = route(&snapshot, path);
        tracing::debug!(path = %path, view = ?view, "routed blog request");

        if let ViewResult::Feed {
            content,
            content_type,
        } = view
        {
            return responder.send(content.as_bytes(), content_type);
        }
        match self.template_for(&view) {
            Some(template) => {
                let context = ViewContext::new(&self.config, &snapshot, &view).to_value();
                responder.render(template, context)
            }
            None => responder.next(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    /// Records what the blog asked for.
    #[derive(Debug, PartialEq)]
    enum Call {
        Send(String, String),
        Render(String),
        Next,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        contexts: Vec<Value>,
    }

    impl Responder for Recorder {
        type Error = std::convert::Infallible;

        fn send(&mut self, body: &[u8], content_type: &str) -> Result<(), Self::Error> {
            self.calls.push(Call::Send(
                String::from_utf8_lossy(body).into_owned(),
                content_type.to_owned(),
            ));
            Ok(())
        }

        fn render(&mut self, template: &str, context: Value) -> Result<(), Self::Error> {
            self.calls.push(Call::Render(template.to_owned()));
            self.contexts.push(context);
            Ok(())
        }

        fn next(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::Next);
            Ok(())
        }
    }

    fn blog(dir: &std::path::Path) -> Blog {
        fs::write(dir.join("hello.md"), "# Hi").unwrap();
        fs::write(dir.join("hello.json"), r#"{"date":"2020-01-01"}"#).unwrap();
        Blog::new(Config::new("example.org", dir).unwrap()).unwrap()
    }

    #[test]
    fn test_handle_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());
        let mut recorder = Recorder::default();

        for path in ["", "hello", "rss20.xml", "nope", "tag"] {
            let _ = blog.handle(path, &mut recorder);
        }

        assert_eq!(recorder.calls[0], Call::Render("blog-index".to_owned()));
        assert_eq!(recorder.calls[1], Call::Render("blog-post".to_owned()));
        match &recorder.calls[2] {
            Call::Send(body, content_type) => {
                assert!(body.contains("<rss"));
                assert_eq!(content_type, "application/xml");
            }
            other => panic!("wanted Send; found {:?}", other),
        }
        assert_eq!(recorder.calls[3], Call::Next);
        assert_eq!(recorder.calls[4], Call::Render("blog-tag-all".to_owned()));
        assert_eq!(recorder.contexts.len(), 3);
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());
        let before = blog.snapshot();
        assert_eq!(before.posts().len(), 1);

        fs::write(dir.path().join("second.md"), "again").unwrap();
        fs::write(dir.path().join("second.yaml"), "date: 2021-01-01").unwrap();
        blog.reload().unwrap();

        assert_eq!(blog.snapshot().posts().len(), 2);
        assert_eq!(before.posts().len(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());

        fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(blog.reload().is_err());
        assert_eq!(blog.snapshot().posts().len(), 1);

        fs::remove_file(dir.path().join("broken.json")).unwrap();
        fs::remove_file(dir.path().join("hello.md")).unwrap();
        fs::remove_file(dir.path().join("hello.json")).unwrap();
        fs::remove_dir(dir.path()).unwrap();
        assert!(matches!(
            blog.reload(),
            Err(build::Error::Load(crate::loader::Error::DirectoryUnreadable { .. }))
        ));
        assert_eq!(blog.snapshot().posts().len(), 1);
    }
}
