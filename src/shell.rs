//! First-load HTML: rendered app markup spliced into the static shell.
//!
//! The shell is an ordinary HTML document with two markers:
//!
//! - `<!--$target-->` where the rendered markup goes (usually the whole body)
//! - `$articleToShow` inside the inline script that seeds the client props,
//!   so hydration picks up the same article the server rendered
//!
//! A request that names no article gets the configured default slug.

use crate::fs::FileSystem;
use crate::render::{MarkupRenderer, RenderError};
use crate::slug::Slug;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TARGET_MARKER: &str = "<!--$target-->";
pub const HYDRATION_TOKEN: &str = "$articleToShow";

const STOCK_SHELL: &str = include_str!("../static/shell.html");

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("shell template has no {marker} marker", marker = TARGET_MARKER)]
    MissingMarker,
    #[error("cannot read shell template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Read the shell at `path`, or the stock shell when no path is configured.
pub fn load_template(fs: &dyn FileSystem, path: Option<&Path>) -> Result<String, ShellError> {
    match path {
        Some(path) => fs.read_to_string(path).map_err(|source| ShellError::Read {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(STOCK_SHELL.to_string()),
    }
}

/// Put `markup` at every marker and the slug at every hydration token.
///
/// Both replacements scan the template only, never the inserted markup, so
/// article text that happens to contain a marker is left alone.
pub fn splice(template: &str, markup: &str, slug: &Slug) -> Result<String, ShellError> {
    if !template.contains(TARGET_MARKER) {
        return Err(ShellError::MissingMarker);
    }
    // Bundler-rendered asset URLs come out as absolute file:// paths.
    let markup = markup.replace("file://", "");

    let mut out = String::with_capacity(template.len() + markup.len());
    for (i, part) in template.split(TARGET_MARKER).enumerate() {
        if i > 0 {
            out.push_str(&markup);
        }
        out.push_str(&part.replace(HYDRATION_TOKEN, slug.as_str()));
    }
    Ok(out)
}

/// Render `requested` (or `default_slug`) and splice it into `template`.
pub fn render_shell(
    renderer: &dyn MarkupRenderer,
    template: &str,
    requested: Option<&Slug>,
    default_slug: &Slug,
) -> Result<String, ShellError> {
    let slug = requested.unwrap_or(default_slug);
    let markup = renderer.render(slug)?;
    splice(template, &markup, slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::tests::MemoryFs;

    /// Renders a fixed fragment naming the slug.
    struct EchoRenderer;

    impl MarkupRenderer for EchoRenderer {
        fn render(&self, slug: &Slug) -> Result<String, RenderError> {
            Ok(format!("<main>{slug}</main>"))
        }
    }

    /// Knows no articles at all.
    struct EmptyRenderer;

    impl MarkupRenderer for EmptyRenderer {
        fn render(&self, slug: &Slug) -> Result<String, RenderError> {
            Err(RenderError::UnknownArticle(slug.clone()))
        }
    }

    fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap()
    }

    const TEMPLATE: &str =
        "<html><script>app = '$articleToShow';</script><body><!--$target--></body></html>";

    #[test]
    fn markup_lands_at_marker() {
        let basics = slug("004-the-basics");
        let doc = render_shell(&EchoRenderer, TEMPLATE, Some(&basics), &slug("001-the-brief"))
            .unwrap();
        assert_eq!(
            doc,
            "<html><script>app = '004-the-basics';</script><body><main>004-the-basics</main></body></html>"
        );
        assert!(!doc.contains(TARGET_MARKER));
        assert!(!doc.contains(HYDRATION_TOKEN));
    }

    #[test]
    fn no_slug_falls_back_to_default() {
        let doc = render_shell(&EchoRenderer, TEMPLATE, None, &slug("001-the-brief")).unwrap();
        assert!(doc.contains("<main>001-the-brief</main>"));
        assert!(doc.contains("app = '001-the-brief'"));
    }

    #[test]
    fn missing_marker_is_error() {
        let err = splice("<body></body>", "<p>x</p>", &slug("x")).unwrap_err();
        assert!(matches!(err, ShellError::MissingMarker));
    }

    #[test]
    fn inserted_markup_is_not_rescanned() {
        let doc = splice(TEMPLATE, "<p>$articleToShow <!--$target--></p>", &slug("x")).unwrap();
        assert!(doc.contains("<p>$articleToShow <!--$target--></p>"));
    }

    #[test]
    fn every_marker_is_replaced() {
        let doc = splice("<!--$target-->|<!--$target-->", "m", &slug("x")).unwrap();
        assert_eq!(doc, "m|m");
    }

    #[test]
    fn file_urls_are_stripped_from_markup() {
        let doc = splice(TEMPLATE, r#"<img src="file:///build/images/a.png">"#, &slug("x")).unwrap();
        assert!(doc.contains(r#"<img src="/build/images/a.png">"#));
    }

    #[test]
    fn render_errors_propagate() {
        let err = render_shell(&EmptyRenderer, TEMPLATE, None, &slug("x")).unwrap_err();
        assert!(matches!(
            err,
            ShellError::Render(RenderError::UnknownArticle(ref s)) if s.as_str() == "x"
        ));
    }

    #[test]
    fn stock_shell_has_both_markers() {
        let template = load_template(&MemoryFs::default(), None).unwrap();
        assert!(template.contains(TARGET_MARKER));
        assert!(template.contains(HYDRATION_TOKEN));
    }

    #[test]
    fn configured_shell_is_read_from_fs() {
        let fs = MemoryFs::with_root(Path::new("/public"));
        fs.add_file(Path::new("/public/tmp.html"), TEMPLATE);
        assert_eq!(
            load_template(&fs, Some(Path::new("/public/tmp.html"))).unwrap(),
            TEMPLATE
        );
        let err = load_template(&fs, Some(Path::new("/public/missing.html"))).unwrap_err();
        assert!(matches!(err, ShellError::Read { .. }));
    }
}
