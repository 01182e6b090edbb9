//! A converter for the commonly used subset of Textile.
//!
//! Blocks are separated by blank lines. A block may start with a signature:
//! `h1.` to `h6.`, `p.`, `bq.` (blockquote), or `bc.` (code block). Blocks
//! whose lines all start with `* ` or `# ` become lists. Inline markup:
//! `*strong*`, `_emphasis_`, `-deleted-`, `@code@`, and `"text":url` links.
//! All text is HTML-escaped before markup is applied.

use pulldown_cmark::escape::escape_html;
use regex::Regex;
use std::io;
use std::sync::LazyLock;

static SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(h[1-6]|p|bq|bc)\.\s+").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"&quot;([^&]+?)&quot;:([^\s<]*[^\s<.,;:!?)])"#).unwrap()
});
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@([^@\n]+)@").unwrap());
static STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(^|[\s(>])\*([^*\s](?:[^*\n]*[^*\s])?)\*").unwrap()
});
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(^|[\s(>])_([^_\s](?:[^_\n]*[^_\s])?)_").unwrap()
});
static DELETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(^|[\s(>])-([^-\s](?:[^-\n]*[^-\s])?)-").unwrap()
});

/// Converts Textile to HTML, appending the result to `out`.
pub fn to_html(out: &mut String, textile: &str) -> io::Result<()> {
    for block in blocks(textile) {
        if let Some(caps) = SIGNATURE.captures(block) {
            let body = &block[caps[0].len()..];
            match &caps[1] {
                "p" => paragraph(out, body)?,
                "bq" => {
                    out.push_str("<blockquote>");
                    paragraph(out, body)?;
                    out.push_str("</blockquote>");
                }
                "bc" => {
                    out.push_str("<pre><code>");
                    escape_html(&mut *out, body)?;
                    out.push_str("</code></pre>");
                }
                heading => {
                    out.push_str(&format!("<{}>", heading));
                    out.push_str(&inline(body)?);
                    out.push_str(&format!("</{}>", heading));
                }
            }
        } else if let Some(items) = list_items(block, "* ") {
            list(out, "ul", &items)?;
        } else if let Some(items) = list_items(block, "# ") {
            list(out, "ol", &items)?;
        } else {
            paragraph(out, block)?;
        }
        out.push('\n');
    }
    Ok(())
}

fn blocks(textile: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;
    for line in textile.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                blocks.push(textile[s..end].trim_end());
            }
        } else {
            if start.is_none() {
                start = Some(offset);
            }
            end = offset + line.len();
        }
        offset += line.len();
    }
    if let Some(s) = start {
        blocks.push(textile[s..end].trim_end());
    }
    blocks
}

fn list_items<'a>(block: &'a str, marker: &str) -> Option<Vec<&'a str>> {
    block
        .lines()
        .map(|line| line.strip_prefix(marker))
        .collect()
}

fn list(out: &mut String, tag: &str, items: &[&str]) -> io::Result<()> {
    out.push_str(&format!("<{}>", tag));
    for item in items {
        out.push_str("<li>");
        out.push_str(&inline(item.trim())?);
        out.push_str("</li>");
    }
    out.push_str(&format!("</{}>", tag));
    Ok(())
}

fn paragraph(out: &mut String, text: &str) -> io::Result<()> {
    out.push_str("<p>");
    let lines: Vec<String> = text
        .lines()
        .map(|line| inline(line.trim_end()))
        .collect::<io::Result<_>>()?;
    out.push_str(&lines.join("<br />\n"));
    out.push_str("</p>");
    Ok(())
}

fn inline(text: &str) -> io::Result<String> {
    let mut escaped = String::with_capacity(text.len());
    escape_html(&mut escaped, text)?;
    let html = LINK.replace_all(&escaped, r#"<a href="$2">$1</a>"#);
    let html = CODE.replace_all(&html, "<code>$1</code>");
    let html = STRONG.replace_all(&html, "$1<strong>$2</strong>");
    let html = EMPHASIS.replace_all(&html, "$1<em>$2</em>");
    let html = DELETED.replace_all(&html, "$1<del>$2</del>");
    Ok(html.into_owned())
}
