//! Article registry: every article under the content root, loaded from disk.
//!
//! The server reloads the registry on each request, so a freshly scaffolded
//! article is served without a restart.

use crate::config::{ContentLayout, SiteSettings};
use crate::fs::FileSystem;
use crate::manifest::{self, ManifestError};
use crate::metadata::{self, ArticleMetadata, MetadataError};
use crate::slug::Slug;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArticleError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: MetadataError,
    },
}

#[derive(Debug, Clone)]
pub struct Article {
    pub slug: Slug,
    pub title: String,
    pub metadata: ArticleMetadata,
    /// Raw markdown.
    pub body: String,
}

impl Article {
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            publish_date: metadata::format_timestamp(self.metadata.publish_date()),
            permalink: self.metadata.permalink(),
        }
    }
}

/// Serializable view of an article, used by `list --json`.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub slug: Slug,
    pub title: String,
    pub publish_date: String,
    pub permalink: String,
}

/// Load one article from its directory.
pub fn load_article(
    fs: &dyn FileSystem,
    layout: &ContentLayout,
    site: &SiteSettings,
    slug: &Slug,
) -> Result<Article, ArticleError> {
    let read = |path: PathBuf| {
        fs.read_to_string(&path)
            .map_err(|source| ArticleError::Read { path, source })
    };

    let metadata_path = layout.metadata_path(slug);
    let metadata = ArticleMetadata::parse(&read(metadata_path.clone())?, slug, site).map_err(
        |source| ArticleError::Metadata {
            path: metadata_path,
            source,
        },
    )?;
    let body = read(layout.markdown_path(slug))?;

    let display_title = slug.display_title();
    let title = metadata::resolve(&[metadata::first_heading(&body), Some(display_title.as_str())])
        .unwrap_or_else(|| slug.to_string());

    Ok(Article {
        slug: slug.clone(),
        title,
        metadata,
        body,
    })
}

/// Load every article under the content root, sorted by slug.
pub fn load_articles(
    fs: &dyn FileSystem,
    layout: &ContentLayout,
    site: &SiteSettings,
) -> Result<Vec<Article>, ArticleError> {
    manifest::discover_articles(fs, layout)?
        .iter()
        .map(|slug| load_article(fs, layout, site, slug))
        .collect()
}

/// Articles for a page centred on `focus`.
///
/// `focus` is loaded strictly: if its directory exists but does not load,
/// the error is returned. Every other article is best-effort and skipped
/// with a warning, so one broken draft only breaks its own page. A `focus`
/// with no directory is simply absent from the result.
pub fn load_articles_for(
    fs: &dyn FileSystem,
    layout: &ContentLayout,
    site: &SiteSettings,
    focus: &Slug,
) -> Result<Vec<Article>, ArticleError> {
    let mut articles = Vec::new();
    for slug in manifest::discover_articles(fs, layout)? {
        match load_article(fs, layout, site, &slug) {
            Ok(article) => articles.push(article),
            Err(e) if &slug == focus => return Err(e),
            Err(e) => log::warn!("leaving {slug} out of the index: {e}"),
        }
    }
    Ok(articles)
}
