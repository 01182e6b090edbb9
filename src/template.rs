//! A [`Responder`] backed by `gtmpl` templates loaded from a theme directory.
//! Hosts that don't bring their own template engine can answer requests with
//! a [`TemplateResponder`] and turn the resulting [`Response`] into whatever
//! their framework expects.

use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::blog::Responder;

/// The content type of every rendered template.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Parsed templates, keyed by template id.
pub struct Templates {
    templates: HashMap<String, Template>,
}

impl Templates {
    /// Loads `<dir>/<id>.html` for every id in `ids`.
    pub fn load<'a>(dir: &Path, ids: impl IntoIterator<Item = &'a str>) -> Result<Templates> {
        let mut templates = HashMap::new();
        for id in ids {
            let path = dir.join(format!("{}.html", id));
            let contents = fs::read_to_string(&path).map_err(|err| Error::Io {
                path: path.clone(),
                err,
            })?;
            templates.insert(id.to_owned(), parse(&contents)?);
            tracing::debug!(template = %id, path = %path.display(), "loaded template");
        }
        Ok(Templates { templates })
    }

    /// Parses templates from in-memory sources.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Templates> {
        let mut templates = HashMap::new();
        for (id, contents) in sources {
            templates.insert(id.to_owned(), parse(contents)?);
        }
        Ok(Templates { templates })
    }

    /// Executes the template `id` against `context`.
    pub fn render(&self, id: &str, context: Value) -> Result<String> {
        let template = self
            .templates
            .get(id)
            .ok_or_else(|| Error::Missing(id.to_owned()))?;
        let context = Context::from(context).map_err(Error::Execute)?;
        let mut out: Vec<u8> = Vec::new();
        template
            .execute(&mut out, &context)
            .map_err(Error::Execute)?;
        String::from_utf8(out).map_err(|err| Error::Execute(err.to_string()))
    }
}

fn parse(contents: &str) -> Result<Template> {
    let mut template = Template::default();
    template.parse(contents).map_err(Error::Parse)?;
    Ok(template)
}

/// What a request produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Body { content_type: String, body: Vec<u8> },

    /// The blog didn't handle the request.
    Fallthrough,
}

/// Collects the blog's answer to one request into a [`Response`].
pub struct TemplateResponder<'t> {
    templates: &'t Templates,
    response: Option<Response>,
}

impl<'t> TemplateResponder<'t> {
    pub fn new(templates: &'t Templates) -> Self {
        TemplateResponder {
            templates,
            response: None,
        }
    }

    /// The response, or [`Response::Fallthrough`] if nothing was produced.
    pub fn into_response(self) -> Response {
        self.response.unwrap_or(Response::Fallthrough)
    }
}

impl Responder for TemplateResponder<'_> {
    type Error = Error;

    fn send(&mut self, body: &[u8], content_type: &str) -> Result<()> {
        self.response = Some(Response::Body {
            content_type: content_type.to_owned(),
            body: body.to_vec(),
        });
        Ok(())
    }

    fn render(&mut self, template: &str, context: Value) -> Result<()> {
        let body = self.templates.render(template, context)?;
        self.response = Some(Response::Body {
            content_type: HTML_CONTENT_TYPE.to_owned(),
            body: body.into_bytes(),
        });
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        self.response = Some(Response::Fallthrough);
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Problems loading or executing templates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a template file can't be read.
    #[error("reading template `{}`: {err}", .path.display())]
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when a template doesn't parse.
    #[error("parsing template: {0}")]
    Parse(String),

    /// Returned when executing a template fails.
    #[error("executing template: {0}")]
    Execute(String),

    /// Returned when a view asks for a template that was never loaded.
    #[error("no template named `{0}`")]
    Missing(String),
}
