//! Article manifest generation.
//!
//! The manifest is an ES module the client bundle imports to find every
//! article. It is derived entirely from the directory names under the
//! content root and is overwritten on every scaffold:
//!
//! ```text
//! import Article0Content from './001-the-brief/001-the-brief.md';
//! import Article0Data from './001-the-brief/001-the-brief-metadata.toml';
//! import Article1Content from './004-the-basics/004-the-basics.md';
//! import Article1Data from './004-the-basics/004-the-basics-metadata.toml';
//!
//! const articles = {
//!   '001-the-brief': { content: Article0Content, data: Article0Data },
//!   '004-the-basics': { content: Article1Content, data: Article1Data },
//! };
//!
//! export default articles;
//! ```
//!
//! Slugs are sorted before rendering so the file only changes when the set
//! of articles changes. Directories whose names are not valid slugs are
//! skipped with a warning.

use crate::config::ContentLayout;
use crate::fs::FileSystem;
use crate::slug::Slug;
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Header written at the top of every generated manifest.
pub const GENERATED_HEADER: &str =
    "// Generated by `dispatches`. Do not edit; run `dispatches manifest` instead.\n";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read content root {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of comparing the on-disk manifest with a fresh render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Missing,
}

/// Article slugs under the content root, sorted.
pub fn discover_articles(
    fs: &dyn FileSystem,
    layout: &ContentLayout,
) -> Result<Vec<Slug>, ManifestError> {
    let names = fs
        .list_dirs(&layout.root)
        .map_err(|source| ManifestError::Scan {
            path: layout.root.clone(),
            source,
        })?;

    let mut slugs: Vec<Slug> = names
        .into_iter()
        .filter_map(|name| match Slug::parse(&name) {
            Ok(slug) => Some(slug),
            Err(e) => {
                log::warn!("skipping {}: {}", layout.root.join(&name).display(), e);
                None
            }
        })
        .collect();
    slugs.sort();
    Ok(slugs)
}

/// Render manifest source for `slugs`, in the order given.
pub fn render_manifest(slugs: &[Slug]) -> String {
    let mut out = String::from(GENERATED_HEADER);

    for (index, slug) in slugs.iter().enumerate() {
        let _ = writeln!(
            out,
            "import Article{index}Content from './{slug}/{}';",
            slug.markdown_file()
        );
        let _ = writeln!(
            out,
            "import Article{index}Data from './{slug}/{}';",
            slug.metadata_file()
        );
    }

    out.push_str("\nconst articles = {\n");
    for (index, slug) in slugs.iter().enumerate() {
        let _ = writeln!(
            out,
            "  '{slug}': {{ content: Article{index}Content, data: Article{index}Data }},"
        );
    }
    out.push_str("};\n\nexport default articles;\n");
    out
}

/// Re-scan the content root and overwrite the manifest. Returns the slugs written.
pub fn regenerate(fs: &dyn FileSystem, layout: &ContentLayout) -> Result<Vec<Slug>, ManifestError> {
    let slugs = discover_articles(fs, layout)?;
    let path = layout.manifest_path();
    fs.write(&path, &render_manifest(&slugs))
        .map_err(|source| ManifestError::Write {
            path: path.clone(),
            source,
        })?;
    log::info!("wrote {} ({} articles)", path.display(), slugs.len());
    Ok(slugs)
}

/// Compare the manifest on disk with what [`regenerate`] would write.
pub fn check(fs: &dyn FileSystem, layout: &ContentLayout) -> Result<Freshness, ManifestError> {
    let expected = render_manifest(&discover_articles(fs, layout)?);
    let path = layout.manifest_path();
    if !fs.is_file(&path) {
        return Ok(Freshness::Missing);
    }
    let actual = fs
        .read_to_string(&path)
        .map_err(|source| ManifestError::Scan { path, source })?;
    Ok(if actual == expected {
        Freshness::Fresh
    } else {
        Freshness::Stale
    })
}
