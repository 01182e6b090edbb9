//! Decodes post metadata from JSON, YAML, or INI into one intermediate
//! mapping, then normalizes that mapping into a typed [`Metadata`] record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::tag::Tag;

/// The intermediate representation every metadata format decodes into.
pub type RawMetadata = Map<String, Value>;

/// A metadata file format, selected by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataFormat {
    Json,
    Yaml,
    Ini,
}

impl MetadataFormat {
    pub fn from_extension(ext: &str) -> Option<MetadataFormat> {
        match ext {
            "json" => Some(MetadataFormat::Json),
            "yaml" | "yml" => Some(MetadataFormat::Yaml),
            "ini" => Some(MetadataFormat::Ini),
            _ => None,
        }
    }
}

/// Decodes `text` in the given format into a mapping. An empty document
/// yields an empty mapping; any other non-mapping document is an error.
pub fn decode(text: &str, format: MetadataFormat) -> Result<RawMetadata> {
    if text.trim().is_empty() {
        return Ok(RawMetadata::new());
    }
    let value = match format {
        MetadataFormat::Json => serde_json::from_str::<Value>(text)?,
        MetadataFormat::Yaml => serde_yaml::from_str::<Value>(text)?,
        MetadataFormat::Ini => return decode_ini(text),
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(RawMetadata::new()),
        _ => Err(Error::NotAMapping),
    }
}

// Keys of the general section land at the top level; each named section
// becomes a nested object.
fn decode_ini(text: &str) -> Result<RawMetadata> {
    let ini = ini::Ini::load_from_str(text)?;
    let mut map = RawMetadata::new();
    for (section, properties) in ini.iter() {
        let mut fields = RawMetadata::new();
        for (key, value) in properties.iter() {
            fields.insert(key.to_owned(), Value::String(value.to_owned()));
        }
        match section {
            None => map.extend(fields),
            Some(name) => {
                map.insert(name.to_owned(), Value::Object(fields));
            }
        }
    }
    Ok(map)
}

/// Normalized post metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub date: DateTime<Utc>,
    pub year: String,
    pub month: String,
    pub day: String,
    pub month_name: String,
    pub tags: Vec<Tag>,
    pub category: Option<Tag>,

    /// Every key the normalization step doesn't recognize, unchanged.
    pub extra: RawMetadata,
}

/// Applies defaults to a decoded mapping: `title` defaults to `slug`, the
/// date (`datetime`, falling back to `date`) to `now`, and `tags` to none.
pub fn normalize(mut raw: RawMetadata, slug: &str, now: DateTime<Utc>) -> Result<Metadata> {
    let title = match raw.remove("title") {
        None | Some(Value::Null) => slug.to_owned(),
        Some(Value::String(title)) => title,
        Some(other) => other.to_string(),
    };

    let datetime = raw.remove("datetime").filter(|v| !v.is_null());
    let date = raw.remove("date");
    let date = match datetime.or(date) {
        None | Some(Value::Null) => now,
        Some(Value::String(s)) => parse_date(&s)?,
        Some(_) => {
            return Err(Error::InvalidField {
                field: "date",
                reason: "expected a date string".to_owned(),
            })
        }
    };

    let tags = match raw.remove("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => collect_tags(s.split(',')),
        Some(Value::Array(items)) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => names.push(s),
                    _ => {
                        return Err(Error::InvalidField {
                            field: "tags",
                            reason: "expected a list of strings".to_owned(),
                        })
                    }
                }
            }
            collect_tags(names.iter().map(String::as_str))
        }
        Some(_) => {
            return Err(Error::InvalidField {
                field: "tags",
                reason: "expected a list or a comma-separated string".to_owned(),
            })
        }
    };

    let category = match raw.remove("category") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Tag::new(&s),
        Some(_) => {
            return Err(Error::InvalidField {
                field: "category",
                reason: "expected a string".to_owned(),
            })
        }
    };

    Ok(Metadata {
        title,
        year: date.format("%Y").to_string(),
        month: date.format("%m").to_string(),
        day: date.format("%d").to_string(),
        month_name: date.format("%B").to_string(),
        date,
        tags,
        category,
        extra: raw,
    })
}

// Tags form a set keyed by slug; the first spelling seen is kept.
fn collect_tags<'a>(names: impl Iterator<Item = &'a str>) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for tag in names.filter_map(Tag::new) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Parses a metadata date. Accepts RFC 3339, RFC 2822,
/// `YYYY-MM-DD[ T]HH:MM[:SS]`, and `YYYY-MM-DD`; values without an offset
/// are taken as UTC.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(s) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))),
        Err(err) => Err(Error::Date {
            value: s.to_owned(),
            err,
        }),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to decode or normalize metadata.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a `.json` file isn't valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when a `.yaml`/`.yml` file isn't valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Returned when an `.ini` file isn't valid INI.
    #[error("invalid INI: {0}")]
    Ini(#[from] ini::ParseError),

    /// Returned when a document decodes to something other than a mapping.
    #[error("metadata must be a mapping of keys to values")]
    NotAMapping,

    /// Returned when the date can't be parsed.
    #[error("invalid date `{value}`: {err}")]
    Date {
        value: String,
        #[source]
        err: chrono::ParseError,
    },

    /// Returned when a recognized field has the wrong shape.
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[cfg(test)]
mod test {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_json() -> Result<()> {
        let map = decode(r#"{"title":"Hi","extra":1}"#, MetadataFormat::Json)?;
        assert_eq!(map["title"], Value::String("Hi".to_owned()));
        assert_eq!(map["extra"], Value::from(1));
        Ok(())
    }

    #[test]
    fn test_decode_yaml() -> Result<()> {
        let map = decode("title: Hi\ntags: [a, b]\n", MetadataFormat::Yaml)?;
        assert_eq!(map["tags"], serde_json::json!(["a", "b"]));
        Ok(())
    }

    #[test]
    fn test_decode_ini() -> Result<()> {
        let map = decode(
            "title = Hi\ntags = a, b\n\n[author]\nname = Jo\n",
            MetadataFormat::Ini,
        )?;
        assert_eq!(map["title"], Value::String("Hi".to_owned()));
        assert_eq!(map["author"], serde_json::json!({ "name": "Jo" }));
        Ok(())
    }

    #[test]
    fn test_decode_empty_and_invalid() {
        assert!(decode("  \n", MetadataFormat::Json).unwrap().is_empty());
        assert!(matches!(
            decode("{not json", MetadataFormat::Json),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            decode("[1, 2]", MetadataFormat::Json),
            Err(Error::NotAMapping)
        ));
    }

    #[test]
    fn test_normalize_defaults() -> Result<()> {
        let meta = normalize(RawMetadata::new(), "hello", now())?;
        assert_eq!(meta.title, "hello");
        assert_eq!(meta.date, now());
        assert!(meta.tags.is_empty());
        assert!(meta.category.is_none());
        assert_eq!(
            (meta.year.as_str(), meta.month.as_str(), meta.day.as_str()),
            ("2024", "06", "01")
        );
        assert_eq!(meta.month_name, "June");
        Ok(())
    }

    #[test]
    fn test_normalize_fields() -> Result<()> {
        let raw = decode(
            r#"{"title":"Hi","date":"2020-01-02","tags":["Rust","rust","web"],"category":"Code","mood":"ok"}"#,
            MetadataFormat::Json,
        )?;
        let meta = normalize(raw, "hello", now())?;
        assert_eq!(meta.title, "Hi");
        assert_eq!(meta.date, Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap());
        let tags: Vec<&str> = meta.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(tags, vec!["rust", "web"]);
        assert_eq!(meta.tags[0].name, "Rust");
        assert_eq!(meta.category.map(|c| c.slug), Some("code".to_owned()));
        assert_eq!(meta.extra["mood"], Value::String("ok".to_owned()));
        assert!(!meta.extra.contains_key("title"));
        Ok(())
    }

    #[test]
    fn test_normalize_prefers_datetime() -> Result<()> {
        let raw = decode(
            "datetime: 2021-03-04T05:06:07Z\ndate: 1999-01-01\n",
            MetadataFormat::Yaml,
        )?;
        let meta = normalize(raw, "x", now())?;
        assert_eq!(meta.date, Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap());
        Ok(())
    }

    #[test]
    fn test_empty_datetime_falls_back_to_date() -> Result<()> {
        let raw = decode("datetime:\ndate: 2020-01-01\n", MetadataFormat::Yaml)?;
        let meta = normalize(raw, "x", now())?;
        assert_eq!(meta.date, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        Ok(())
    }

    #[test]
    fn test_comma_separated_tags() -> Result<()> {
        let raw = decode("tags = a, b ,, c", MetadataFormat::Ini)?;
        let meta = normalize(raw, "x", now())?;
        let tags: Vec<&str> = meta.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_bad_date_is_an_error() {
        let mut raw = RawMetadata::new();
        raw.insert("date".to_owned(), Value::String("yesterday".to_owned()));
        assert!(matches!(normalize(raw, "x", now()), Err(Error::Date { .. })));
    }

    #[test]
    fn test_parse_date_formats() -> Result<()> {
        let wanted = Utc.with_ymd_and_hms(2020, 1, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2020-01-01T10:30:00Z")?, wanted);
        assert_eq!(parse_date("2020-01-01T12:30:00+02:00")?, wanted);
        assert_eq!(parse_date("Wed, 01 Jan 2020 10:30:00 +0000")?, wanted);
        assert_eq!(parse_date("2020-01-01 10:30:00")?, wanted);
        assert_eq!(parse_date("2020-01-01 10:30")?, wanted);
        Ok(())
    }
}
