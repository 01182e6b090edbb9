//! Loads the blog configuration from a `blog.yaml` project file. The file is
//! searched for from a starting directory upward through its parents, and
//! relative paths inside it are resolved against the directory that holds it.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "blog.yaml";

#[derive(Deserialize)]
struct IndexCount(usize);
impl Default for IndexCount {
    fn default() -> Self {
        IndexCount(10)
    }
}

#[derive(Deserialize)]
struct LatestCount(usize);
impl Default for LatestCount {
    fn default() -> Self {
        LatestCount(5)
    }
}

// Options are snake_case; the camelCase spellings are accepted too.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default)]
    title: String,

    #[serde(default)]
    description: String,

    domain: Option<String>,
    scheme: Option<String>,

    #[serde(alias = "basePath")]
    base_path: Option<String>,

    #[serde(alias = "contentDir")]
    content_dir: Option<PathBuf>,

    #[serde(alias = "themeDir")]
    theme_dir: Option<PathBuf>,

    #[serde(default, alias = "indexCount")]
    index_count: IndexCount,

    #[serde(default, alias = "latestCount")]
    latest_count: LatestCount,

    #[serde(default)]
    templates: Templates,
}

/// The template identifier used for each kind of view.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Templates {
    pub index: String,
    pub post: String,
    #[serde(alias = "archiveAll")]
    pub archive_all: String,
    #[serde(alias = "archiveYear")]
    pub archive_year: String,
    #[serde(alias = "archiveMonth")]
    pub archive_month: String,
    #[serde(alias = "tagCloud")]
    pub tag_cloud: String,
    pub tag: String,
    #[serde(alias = "categoryCloud")]
    pub category_cloud: String,
    pub category: String,
}

impl Default for Templates {
    fn default() -> Self {
        Templates {
            index: "blog-index".to_owned(),
            post: "blog-post".to_owned(),
            archive_all: "blog-archive-all".to_owned(),
            archive_year: "blog-archive-year".to_owned(),
            archive_month: "blog-archive-month".to_owned(),
            tag_cloud: "blog-tag-all".to_owned(),
            tag: "blog-tag".to_owned(),
            category_cloud: "blog-category-all".to_owned(),
            category: "blog-category".to_owned(),
        }
    }
}

impl Templates {
    /// All configured identifiers, in a fixed order.
    pub fn ids(&self) -> [&str; 9] {
        [
            &self.index,
            &self.post,
            &self.archive_all,
            &self.archive_year,
            &self.archive_month,
            &self.tag_cloud,
            &self.tag,
            &self.category_cloud,
            &self.category,
        ]
    }
}

/// The validated blog configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The blog title, used for the feeds and exposed to templates.
    pub title: String,

    /// The blog description, used for the feeds and exposed to templates.
    pub description: String,

    /// The host name the blog is served from, e.g. `example.org`.
    pub domain: String,

    /// The mount point of the blog below the domain, always with leading and
    /// trailing slashes (`/` or `/blog/`).
    pub base_path: String,

    /// The site root, `{scheme}://{domain}{base_path}`. Post URLs are joined
    /// onto it.
    pub site_url: Url,

    /// The directory holding the post sources.
    pub content_dir: PathBuf,

    /// The directory holding the view templates.
    pub theme_dir: PathBuf,

    /// The number of posts per index page.
    pub index_count: usize,

    /// The number of posts in the "latest" list.
    pub latest_count: usize,

    pub templates: Templates,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for [`PROJECT_FILE`] and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.is_file() {
            Config::from_project_file(&path)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(Error::NotFound),
            }
        }
    }

    /// Loads a project file. Relative directories are resolved against the
    /// file's parent directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_str(&contents)?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Config::from_project(project, root)
    }

    /// Builds a configuration from YAML text, resolving relative directories
    /// against `root`.
    pub fn from_yaml(yaml: &str, root: &Path) -> Result<Config> {
        Config::from_project(serde_yaml::from_str(yaml)?, root)
    }

    fn from_project(project: Project, root: &Path) -> Result<Config> {
        let domain = match project.domain {
            Some(domain) if !domain.trim().is_empty() => domain.trim().to_owned(),
            _ => return Err(Error::MissingOption("domain")),
        };
        if project.index_count.0 == 0 {
            return Err(Error::Invalid {
                option: "index_count",
                reason: "must be at least 1".to_owned(),
            });
        }
        let scheme = project.scheme.unwrap_or_else(|| "http".to_owned());
        let base_path = normalize_base_path(project.base_path.as_deref().unwrap_or("/"));
        let site_url = Url::parse(&format!("{}://{}{}", scheme, domain, base_path))?;

        Ok(Config {
            title: project.title,
            description: project.description,
            domain,
            base_path,
            site_url,
            content_dir: root.join(project.content_dir.unwrap_or_else(|| "content".into())),
            theme_dir: root.join(project.theme_dir.unwrap_or_else(|| "theme".into())),
            index_count: project.index_count.0,
            latest_count: project.latest_count.0,
            templates: project.templates,
        })
    }

    /// Returns a configuration with default values for everything except the
    /// domain and the content directory.
    pub fn new(domain: &str, content_dir: &Path) -> Result<Config> {
        let mut config = Config::from_project(
            Project {
                domain: Some(domain.to_owned()),
                ..Project::default()
            },
            Path::new("."),
        )?;
        config.content_dir = content_dir.to_owned();
        Ok(config)
    }

    /// The canonical URL for the post identified by `slug`. The slug is
    /// percent-encoded as a single path segment, so `?`, `#` and `/` in a
    /// file name stay part of the path.
    pub fn post_url(&self, slug: &str) -> std::result::Result<Url, url::ParseError> {
        let mut url = self.site_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(slug);
        Ok(url)
    }

    /// The site-relative link for a view, e.g. `/blog/page-2`.
    pub fn link(&self, view: &str) -> String {
        format!("{}{}", self.base_path, view)
    }
}

fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", trimmed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A configuration problem. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when no project file exists in the directory or any parent.
    #[error("could not find `{}` in any parent directory", PROJECT_FILE)]
    NotFound,

    /// Returned when the project file cannot be read.
    #[error("reading project file `{}`: {err}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the project file isn't valid YAML.
    #[error("parsing project file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Returned when a mandatory option is absent.
    #[error("missing mandatory option `{0}`")]
    MissingOption(&'static str),

    /// Returned when an option has an unusable value.
    #[error("invalid option `{option}`: {reason}")]
    Invalid {
        option: &'static str,
        reason: String,
    },

    /// Returned when the scheme, domain and base path don't form a URL.
    #[error("invalid site url: {0}")]
    Url(#[from] url::ParseError),
}
