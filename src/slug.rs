//! Article slugs: validation and the `NNN-name` convention.
//!
//! A slug names an article everywhere at once: its directory under the
//! content root, its two files, its manifest key and the last segment of its
//! permalink. Because it ends up in both paths and URLs, a [`Slug`] can only
//! be built through [`Slug::parse`], which accepts:
//!
//! - lowercase ASCII letters, digits and `-`
//! - a letter or digit as the first character
//! - no trailing `-` and no `--`
//! - at most [`MAX_SLUG_LEN`] characters
//!
//! ## Display Titles
//!
//! Slugs usually carry a numeric prefix that orders the articles. The part
//! after the prefix, with dashes turned into spaces, is the fallback title
//! when the markdown has no `# heading`:
//! - `004-the-basics` → "the basics"
//! - `001` → "" (number-only)
//! - `colophon` → "colophon"

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest accepted slug, in bytes.
pub const MAX_SLUG_LEN: usize = 96;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug is empty")]
    Empty,
    #[error("slug '{0}' is longer than {max} characters", max = MAX_SLUG_LEN)]
    TooLong(String),
    #[error("slug '{slug}' contains '{ch}'; only a-z, 0-9 and '-' are allowed")]
    InvalidChar { slug: String, ch: char },
    #[error("slug '{0}' must start with a letter or digit")]
    LeadingDash(String),
    #[error("slug '{0}' must not end with '-'")]
    TrailingDash(String),
    #[error("slug '{0}' contains '--'")]
    DoubleDash(String),
}

/// A validated, path- and URL-safe article identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn parse(raw: &str) -> Result<Self, SlugError> {
        if raw.is_empty() {
            return Err(SlugError::Empty);
        }
        if raw.len() > MAX_SLUG_LEN {
            return Err(SlugError::TooLong(raw.to_string()));
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SlugError::InvalidChar {
                slug: raw.to_string(),
                ch,
            });
        }
        if raw.starts_with('-') {
            return Err(SlugError::LeadingDash(raw.to_string()));
        }
        if raw.ends_with('-') {
            return Err(SlugError::TrailingDash(raw.to_string()));
        }
        if raw.contains("--") {
            return Err(SlugError::DoubleDash(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Markdown file name inside the article directory.
    pub fn markdown_file(&self) -> String {
        format!("{}.md", self.0)
    }

    /// Metadata file name inside the article directory.
    pub fn metadata_file(&self) -> String {
        format!("{}-metadata.toml", self.0)
    }

    /// Fallback title: the part after an `NNN-` prefix, dashes as spaces.
    pub fn display_title(&self) -> String {
        display_title(&self.0)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Slug::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slug::parse(s)
    }
}

/// `004-the-basics` → "the basics", `001` → "", `colophon` → "colophon".
fn display_title(name: &str) -> String {
    let rest = match name.split_once('-') {
        Some((prefix, rest)) if prefix.parse::<u32>().is_ok() => rest,
        _ if name.parse::<u32>().is_ok() => "",
        _ => name,
    };
    rest.replace('-', " ")
}
