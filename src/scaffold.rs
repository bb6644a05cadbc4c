//! Article scaffolding: `dispatches new <slug>`.
//!
//! Creates `<content_root>/<slug>/` with a metadata file and a markdown file
//! instantiated from templates, then regenerates the manifest.
//!
//! ## Ordering
//!
//! Everything that can fail without touching the disk happens first:
//!
//! 1. validate the slug
//! 2. refuse an existing article directory ([`ScaffoldError::DirectoryExists`])
//! 3. render both templates in memory
//! 4. parse the rendered metadata back, so an override that drops or
//!    misnames the slug is rejected ([`ScaffoldError::InvalidMetadata`])
//!
//! Only then is the directory created and the two files written. If either
//! write fails the directory is removed again, so a failed scaffold leaves no
//! half-made article behind. The manifest is regenerated last; it is derived
//! data, so a failure there keeps the article and asks for
//! `dispatches manifest` instead of rolling back.
//!
//! ## Templates
//!
//! | File | Placeholders |
//! |------|--------------|
//! | `article-metadata-template.toml` | `$date`, `$slug`, `$permalink` |
//! | `article-markdown-template.md` | `$slug`, `$articleName`, `$title` |
//!
//! Stock copies are compiled into the binary; a `templates_dir` may override
//! either one.

use crate::config::{ContentLayout, SiteSettings};
use crate::fs::FileSystem;
use crate::manifest::{self, ManifestError};
use crate::metadata::{ArticleMetadata, MetadataError, format_timestamp};
use crate::slug::{Slug, SlugError};
use crate::template::{self, TemplateError, Values};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const METADATA_TEMPLATE_FILE: &str = "article-metadata-template.toml";
pub const MARKDOWN_TEMPLATE_FILE: &str = "article-markdown-template.md";

const STOCK_METADATA_TEMPLATE: &str = include_str!("../templates/article-metadata-template.toml");
const STOCK_MARKDOWN_TEMPLATE: &str = include_str!("../templates/article-markdown-template.md");

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("invalid slug: {0}")]
    InvalidSlug(#[from] SlugError),
    #[error("article directory already exists: {0}")]
    DirectoryExists(PathBuf),
    #[error("template {file}: {source}")]
    Template {
        file: &'static str,
        source: TemplateError,
    },
    #[error("template {file} does not produce valid metadata: {source}")]
    InvalidMetadata {
        file: &'static str,
        source: MetadataError,
    },
    #[error("cannot read template {path}: {source}")]
    TemplateRead { path: PathBuf, source: io::Error },
    #[error("IO error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("article {slug} was created but the manifest was not updated ({source}); run `dispatches manifest`")]
    Manifest { slug: Slug, source: ManifestError },
}

/// The two scaffolding templates.
#[derive(Debug, Clone)]
pub struct Templates {
    pub metadata: String,
    pub markdown: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            metadata: STOCK_METADATA_TEMPLATE.to_string(),
            markdown: STOCK_MARKDOWN_TEMPLATE.to_string(),
        }
    }
}

impl Templates {
    /// Stock templates, overridden by any template file present in `dir`.
    pub fn load(fs: &dyn FileSystem, dir: Option<&Path>) -> Result<Self, ScaffoldError> {
        let mut templates = Self::default();
        let Some(dir) = dir else {
            return Ok(templates);
        };
        let read_override = |name: &str| -> Result<Option<String>, ScaffoldError> {
            let path = dir.join(name);
            if !fs.is_file(&path) {
                return Ok(None);
            }
            log::debug!("using template override {}", path.display());
            fs.read_to_string(&path)
                .map(Some)
                .map_err(|source| ScaffoldError::TemplateRead { path, source })
        };
        if let Some(metadata) = read_override(METADATA_TEMPLATE_FILE)? {
            templates.metadata = metadata;
        }
        if let Some(markdown) = read_override(MARKDOWN_TEMPLATE_FILE)? {
            templates.markdown = markdown;
        }
        Ok(templates)
    }

    fn render_metadata(
        &self,
        slug: &Slug,
        site: &SiteSettings,
        now: DateTime<Utc>,
    ) -> Result<String, ScaffoldError> {
        let values: Values = [
            ("date", format_timestamp(now)),
            ("slug", slug.to_string()),
            ("permalink", site.permalink(slug)),
        ]
        .into_iter()
        .collect();
        template::substitute(&self.metadata, &values).map_err(|source| ScaffoldError::Template {
            file: METADATA_TEMPLATE_FILE,
            source,
        })
    }

    fn render_markdown(&self, slug: &Slug) -> Result<String, ScaffoldError> {
        let values: Values = [
            ("slug", slug.to_string()),
            ("articleName", slug.to_string()),
            ("title", slug.display_title()),
        ]
        .into_iter()
        .collect();
        template::substitute(&self.markdown, &values).map_err(|source| ScaffoldError::Template {
            file: MARKDOWN_TEMPLATE_FILE,
            source,
        })
    }
}

/// What a successful scaffold wrote.
#[derive(Debug, Clone)]
pub struct ScaffoldReport {
    pub slug: Slug,
    pub directory: PathBuf,
    pub metadata_path: PathBuf,
    pub markdown_path: PathBuf,
    pub permalink: String,
    pub manifest_path: PathBuf,
    /// Number of articles in the regenerated manifest.
    pub article_count: usize,
}

/// Create a new article named `raw_slug`, then regenerate the manifest.
pub fn scaffold_article(
    fs: &dyn FileSystem,
    layout: &ContentLayout,
    site: &SiteSettings,
    templates: &Templates,
    raw_slug: &str,
    now: DateTime<Utc>,
) -> Result<ScaffoldReport, ScaffoldError> {
    let slug = Slug::parse(raw_slug)?;
    let directory = layout.article_dir(&slug);
    if fs.exists(&directory) {
        return Err(ScaffoldError::DirectoryExists(directory));
    }

    let metadata = templates.render_metadata(&slug, site, now)?;
    ArticleMetadata::parse(&metadata, &slug, site).map_err(|source| {
        ScaffoldError::InvalidMetadata {
            file: METADATA_TEMPLATE_FILE,
            source,
        }
    })?;
    let markdown = templates.render_markdown(&slug)?;

    fs.create_dir(&directory).map_err(|source| {
        if source.kind() == io::ErrorKind::AlreadyExists {
            ScaffoldError::DirectoryExists(directory.clone())
        } else {
            ScaffoldError::Io {
                path: directory.clone(),
                source,
            }
        }
    })?;

    let metadata_path = layout.metadata_path(&slug);
    let markdown_path = layout.markdown_path(&slug);
    let written = write_file(fs, &metadata_path, &metadata)
        .and_then(|()| write_file(fs, &markdown_path, &markdown));
    if let Err(e) = written {
        if let Err(cleanup) = fs.remove_dir_all(&directory) {
            log::warn!(
                "could not remove {} after failed scaffold: {}",
                directory.display(),
                cleanup
            );
        }
        return Err(e);
    }
    log::info!("created article {} in {}", slug, directory.display());

    let slugs = manifest::regenerate(fs, layout).map_err(|source| ScaffoldError::Manifest {
        slug: slug.clone(),
        source,
    })?;

    Ok(ScaffoldReport {
        permalink: site.permalink(&slug),
        slug,
        directory,
        metadata_path,
        markdown_path,
        manifest_path: layout.manifest_path(),
        article_count: slugs.len(),
    })
}

fn write_file(fs: &dyn FileSystem, path: &Path, contents: &str) -> Result<(), ScaffoldError> {
    fs.write(path, contents).map_err(|source| ScaffoldError::Io {
        path: path.to_path_buf(),
        source,
    })
}
