//! Converts post bodies into HTML according to their declared format.

use pulldown_cmark::escape::escape_html;
use std::io;

use crate::{markdown, textile};

/// A body file format, selected by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyFormat {
    Markdown,
    Textile,
    Html,
    Text,
}

impl BodyFormat {
    pub fn from_extension(ext: &str) -> Option<BodyFormat> {
        match ext {
            "md" => Some(BodyFormat::Markdown),
            "textile" => Some(BodyFormat::Textile),
            "html" => Some(BodyFormat::Html),
            "text" => Some(BodyFormat::Text),
            _ => None,
        }
    }
}

/// Renders `text` to HTML. HTML bodies are trusted and passed through
/// verbatim; plain text is escaped and wrapped in a `<pre>` block.
pub fn render(text: &str, format: BodyFormat) -> Result<String> {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    match format {
        BodyFormat::Html => out.push_str(text),
        BodyFormat::Markdown => markdown::to_html(&mut out, text),
        BodyFormat::Textile => textile::to_html(&mut out, text)?,
        BodyFormat::Text => {
            out.push_str("<pre>");
            escape_html(&mut out, text)?;
            out.push_str("</pre>");
        }
    }
    Ok(out)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting a body to HTML.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when writing the converted output fails.
    #[error("writing rendered html: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_formats() -> Result<()> {
        assert_eq!(render("# Hi", BodyFormat::Markdown)?, "<h1>Hi</h1>\n");
        assert_eq!(render("h2. Hi", BodyFormat::Textile)?, "<h2>Hi</h2>\n");
        assert_eq!(
            render("<b>raw</b>", BodyFormat::Html)?,
            "<b>raw</b>"
        );
        assert_eq!(
            render("a < b & c", BodyFormat::Text)?,
            "<pre>a &lt; b &amp; c</pre>"
        );
        Ok(())
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(BodyFormat::from_extension("md"), Some(BodyFormat::Markdown));
        assert_eq!(BodyFormat::from_extension("markdown"), None);
        assert_eq!(BodyFormat::from_extension("json"), None);
    }
}
