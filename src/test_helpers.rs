//! Shared test utilities.
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let articles = load_articles(&RealFs, &ContentLayout::new(tmp.path()), &site).unwrap();
//! assert_eq!(find_article(&articles, "001-the-brief").title, "The Brief");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::articles::Article;

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Find an article by slug. Panics if not found.
pub fn find_article<'a>(articles: &'a [Article], slug: &str) -> &'a Article {
    articles
        .iter()
        .find(|a| a.slug.as_str() == slug)
        .unwrap_or_else(|| panic!("article '{slug}' not found. Available: {:?}", article_slugs(articles)))
}

/// All article slugs in registry order.
pub fn article_slugs(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.slug.as_str()).collect()
}
