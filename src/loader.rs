//! Reads a content directory and groups its files into [`RawPost`] records,
//! one per slug. Nothing is parsed here beyond the file names; metadata
//! decoding and body rendering happen when the snapshot is built.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::metadata::MetadataFormat;
use crate::render::BodyFormat;

/// A metadata file's raw text and declared format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataSource {
    pub file_name: String,
    pub format: MetadataFormat,
    pub text: String,
}

/// A body file's raw text and declared format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodySource {
    pub file_name: String,
    pub format: BodyFormat,
    pub text: String,
}

/// Everything found on disk for one slug, in discovery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPost {
    pub slug: String,
    pub metadata: Vec<MetadataSource>,
    pub body: Option<BodySource>,
}

impl RawPost {
    fn new(slug: &str) -> RawPost {
        RawPost {
            slug: slug.to_owned(),
            metadata: Vec::new(),
            body: None,
        }
    }

    /// Whether any file with a known extension contributed to this record.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.body.is_none()
    }
}

/// The role a file plays, decided by its extension.
enum Kind {
    Metadata(MetadataFormat),
    Body(BodyFormat),
    Unknown,
}

impl Kind {
    fn from_extension(ext: &str) -> Kind {
        if let Some(format) = MetadataFormat::from_extension(ext) {
            Kind::Metadata(format)
        } else if let Some(format) = BodyFormat::from_extension(ext) {
            Kind::Body(format)
        } else {
            Kind::Unknown
        }
    }
}

/// Splits a file name on its last period and strips a leading
/// `<digits>-` prefix from the stem. Returns `(slug, extension)`; the
/// extension is empty when there is no period.
///
/// ```
/// use connect_blog::loader::split_file_name;
/// assert_eq!(split_file_name("03-hello.md"), ("hello", "md"));
/// assert_eq!(split_file_name("hello.world.json"), ("hello.world", "json"));
/// ```
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let (stem, ext) = match file_name.rfind('.') {
        Some(i) => (&file_name[..i], &file_name[i + 1..]),
        None => (file_name, ""),
    };
    (strip_numeric_prefix(stem), ext)
}

fn strip_numeric_prefix(stem: &str) -> &str {
    let digits = stem.len() - stem.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    match stem[digits..].strip_prefix('-') {
        Some(rest) if digits > 0 && !rest.is_empty() => rest,
        _ => stem,
    }
}

/// Lists `dir` and returns one [`RawPost`] per slug in the order the slugs
/// were first seen. Files are visited in file-name order so the result is
/// the same on every run. Subdirectories and hidden files are skipped.
pub fn load(dir: &Path) -> Result<Vec<RawPost>> {
    let mut posts: Vec<RawPost> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    // Symlinked files count as content; symlinked directories are skipped
    // like any other directory.
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for result in walker {
        let entry = result.map_err(|err| match err.depth() {
            0 => Error::DirectoryUnreadable {
                path: dir.to_owned(),
                err: err.into(),
            },
            _ => Error::FileUnreadable {
                path: err.path().unwrap_or(dir).to_owned(),
                err: err.into(),
            },
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        let (slug, ext) = split_file_name(&file_name);
        let i = *positions.entry(slug.to_owned()).or_insert_with(|| {
            posts.push(RawPost::new(slug));
            posts.len() - 1
        });

        let kind = Kind::from_extension(ext);
        if let Kind::Unknown = kind {
            tracing::debug!(file = %file_name, "ignoring file with unknown extension");
            continue;
        }

        let text = std::fs::read_to_string(entry.path()).map_err(|err| Error::FileUnreadable {
            path: entry.path().to_owned(),
            err,
        })?;
        tracing::debug!(file = %file_name, slug = %slug, "loaded content file");

        let post = &mut posts[i];
        match kind {
            Kind::Metadata(format) => post.metadata.push(MetadataSource {
                file_name,
                format,
                text,
            }),
            Kind::Body(format) => {
                if let Some(previous) = &post.body {
                    tracing::warn!(
                        slug = %post.slug,
                        replaced = %previous.file_name,
                        file = %file_name,
                        "more than one body file for post"
                    );
                }
                post.body = Some(BodySource {
                    file_name,
                    format,
                    text,
                });
            }
            Kind::Unknown => {}
        }
    }

    posts.retain(|post| !post.is_empty());
    Ok(posts)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to read the content directory.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the directory itself cannot be listed.
    #[error("reading content directory `{}`: {err}", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a content file cannot be read (including files that
    /// aren't valid UTF-8).
    #[error("reading content file `{}`: {err}", .path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("hello.md"), ("hello", "md"));
        assert_eq!(split_file_name("03-hello.md"), ("hello", "md"));
        assert_eq!(split_file_name("2020-01-01-hello.md"), ("01-01-hello", "md"));
        assert_eq!(split_file_name("404.html"), ("404", "html"));
        assert_eq!(split_file_name("12-.md"), ("12-", "md"));
        assert_eq!(split_file_name("README"), ("README", ""));
    }

    #[test]
    fn test_load_groups_by_slug() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("01-hello.md"), "# Hi").unwrap();
        fs::write(dir.path().join("01-hello.json"), r#"{"title":"Hi"}"#).unwrap();
        fs::write(dir.path().join("02-world.yaml"), "title: World").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join(".hidden.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("drafts.md")).unwrap();

        let posts = load(dir.path())?;
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["hello", "world"]);

        let hello = &posts[0];
        assert_eq!(hello.metadata.len(), 1);
        assert_eq!(hello.metadata[0].format, MetadataFormat::Json);
        let body = hello.body.as_ref().unwrap();
        assert_eq!(body.format, BodyFormat::Markdown);
        assert_eq!(body.text, "# Hi");

        assert!(posts[1].body.is_none());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_load_follows_symlinked_files() -> Result<()> {
        use std::os::unix::fs::symlink;

        let sources = tempfile::tempdir().unwrap();
        fs::write(sources.path().join("hello.md"), "# Hi").unwrap();
        fs::create_dir(sources.path().join("drafts")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        symlink(sources.path().join("hello.md"), dir.path().join("hello.md")).unwrap();
        symlink(sources.path().join("drafts"), dir.path().join("drafts.md")).unwrap();

        let posts = load(dir.path())?;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "hello");
        assert_eq!(posts[0].body.as_ref().map(|b| b.text.as_str()), Some("# Hi"));
        Ok(())
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        match load(&dir.path().join("nope")) {
            Err(Error::DirectoryUnreadable { .. }) => {}
            other => panic!("wanted DirectoryUnreadable; found {:?}", other),
        }
    }

    #[test]
    fn test_load_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        match load(dir.path()) {
            Err(Error::FileUnreadable { path, .. }) => {
                assert_eq!(path, dir.path().join("bad.md"))
            }
            other => panic!("wanted FileUnreadable; found {:?}", other),
        }
    }
}
