//! Article metadata: the `<slug>-metadata.toml` file next to each article.
//!
//! ```toml
//! publish_date = "2026-10-19T09:30:00Z"
//! slug = "004-the-basics"
//! permalink = "https://robbycowell.com/dispatches/004-the-basics"
//! ```
//!
//! ## The permalink is derived, not stored
//!
//! The file carries a `permalink` key because the client bundle imports the
//! metadata module as-is. In memory, [`ArticleMetadata`] keeps only the date,
//! the slug and the [`SiteSettings`] and computes the permalink on access, so
//! it always equals `<root_url>/<articles_segment>/<slug>`. A stored value
//! that disagrees (the site moved, or someone edited the file) is reported
//! with a warning and ignored.
//!
//! The `slug` key must match the directory the file lives in.
//!
//! ## Titles
//!
//! Articles have no title field. [`resolve`] picks the first non-empty
//! candidate, in order: the markdown's first `# heading`, then the slug's
//! display title.

use crate::config::SiteSettings;
use crate::slug::Slug;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("metadata slug '{found}' does not match its directory '{expected}'")]
    SlugMismatch { expected: Slug, found: Slug },
}

/// On-disk shape of the metadata file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetadataFile {
    publish_date: DateTime<Utc>,
    slug: Slug,
    #[serde(default)]
    permalink: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleMetadata {
    publish_date: DateTime<Utc>,
    slug: Slug,
    site: SiteSettings,
}

impl ArticleMetadata {
    pub fn new(publish_date: DateTime<Utc>, slug: Slug, site: &SiteSettings) -> Self {
        Self {
            publish_date,
            slug,
            site: site.clone(),
        }
    }

    /// Parse a metadata file belonging to the article directory `expected`.
    pub fn parse(
        content: &str,
        expected: &Slug,
        site: &SiteSettings,
    ) -> Result<Self, MetadataError> {
        let file: MetadataFile = toml::from_str(content)?;
        if &file.slug != expected {
            return Err(MetadataError::SlugMismatch {
                expected: expected.clone(),
                found: file.slug,
            });
        }
        let metadata = Self::new(file.publish_date, file.slug, site);
        if let Some(stored) = file.permalink
            && stored != metadata.permalink()
        {
            log::warn!(
                "{}: stored permalink {} differs from derived {}; using derived",
                metadata.slug,
                stored,
                metadata.permalink()
            );
        }
        Ok(metadata)
    }

    pub fn publish_date(&self) -> DateTime<Utc> {
        self.publish_date
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn permalink(&self) -> String {
        self.site.permalink(&self.slug)
    }
}

/// Timestamp format used in metadata files: RFC 3339, UTC, whole seconds.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// First non-empty (after trimming) candidate, in priority order.
///
/// ```text
/// title: resolve(&[first_heading, slug_display_title])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Text of the first `# ` heading in a markdown document.
pub fn first_heading(markdown: &str) -> Option<&str> {
    markdown
        .lines()
        .find(|line| line.starts_with("# "))
        .map(|line| line.trim_start_matches("# ").trim())
}
