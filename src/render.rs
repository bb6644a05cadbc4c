//! Server-side markup for the app tree.
//!
//! The client bundle owns the real component tree; the server only needs the
//! markup of its first render so the page is readable before hydration.
//! [`MarkupRenderer`] is that seam. [`ArticleRenderer`] is the built-in
//! implementation: an article index plus the selected article, rendered with
//! maud and pulldown-cmark to the same structure the client components
//! produce.

use crate::articles::Article;
use crate::config::SiteSettings;
use crate::metadata::format_timestamp;
use crate::slug::Slug;
use maud::{Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no article named '{0}'")]
    UnknownArticle(Slug),
}

/// Renders the app tree for one article to an HTML fragment.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, slug: &Slug) -> Result<String, RenderError>;
}

pub struct ArticleRenderer {
    articles: Vec<Article>,
    site: SiteSettings,
}

impl ArticleRenderer {
    pub fn new(articles: Vec<Article>, site: SiteSettings) -> Self {
        Self { articles, site }
    }

    fn find(&self, slug: &Slug) -> Option<&Article> {
        self.articles.iter().find(|a| &a.slug == slug)
    }
}

impl MarkupRenderer for ArticleRenderer {
    fn render(&self, slug: &Slug) -> Result<String, RenderError> {
        let article = self
            .find(slug)
            .ok_or_else(|| RenderError::UnknownArticle(slug.clone()))?;
        Ok(render_app(&self.articles, article, &self.site).into_string())
    }
}

/// Convert markdown to HTML with the extensions the client loader enables.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

fn render_app(articles: &[Article], current: &Article, site: &SiteSettings) -> Markup {
    html! {
        div.app data-article=(current.slug.as_str()) {
            (render_index(articles, &current.slug, site))
            (render_article(current))
        }
    }
}

/// Article list, newest slug last, current article marked.
fn render_index(articles: &[Article], current: &Slug, site: &SiteSettings) -> Markup {
    html! {
        nav.article-index {
            ul {
                @for article in articles {
                    @let is_current = &article.slug == current;
                    li class=[is_current.then_some("current")] {
                        a href=(site.article_path(&article.slug)) { (article.title) }
                    }
                }
            }
        }
    }
}

fn render_article(article: &Article) -> Markup {
    let published = article.metadata.publish_date();
    html! {
        article.dispatch {
            header {
                time datetime=(format_timestamp(published)) {
                    (published.format("%B %-d, %Y").to_string())
                }
            }
            div.dispatch-body {
                (PreEscaped(markdown_to_html(&article.body)))
            }
            footer {
                a.permalink href=(article.metadata.permalink()) { "Permalink" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ArticleMetadata;
    use chrono::{TimeZone, Utc};

    fn article(slug: &str, title: &str, body: &str) -> Article {
        let slug = Slug::parse(slug).unwrap();
        Article {
            metadata: ArticleMetadata::new(
                Utc.with_ymd_and_hms(2021, 3, 14, 10, 0, 0).unwrap(),
                slug.clone(),
                &SiteSettings::default(),
            ),
            slug,
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    fn renderer() -> ArticleRenderer {
        ArticleRenderer::new(
            vec![
                article("001-the-brief", "The Brief", "# The Brief\n\nHello *there*."),
                article("004-the-basics", "The Basics", "# The Basics\n\n- one\n- two"),
            ],
            SiteSettings::default(),
        )
    }

    #[test]
    fn renders_selected_article_body() {
        let html = renderer().render(&Slug::parse("004-the-basics").unwrap()).unwrap();
        assert!(html.contains(r#"data-article="004-the-basics""#));
        assert!(html.contains("<li>one</li>"));
        assert!(!html.contains("Hello"));
    }

    #[test]
    fn index_lists_all_and_marks_current() {
        let html = renderer().render(&Slug::parse("001-the-brief").unwrap()).unwrap();
        assert!(html.contains(r#"href="/dispatches/001-the-brief""#));
        assert!(html.contains(r#"href="/dispatches/004-the-basics""#));
        assert_eq!(html.matches(r#"class="current""#).count(), 1);
        assert!(html.contains(r#"<li class="current"><a href="/dispatches/001-the-brief">"#));
    }

    #[test]
    fn renders_permalink_and_date() {
        let html = renderer().render(&Slug::parse("001-the-brief").unwrap()).unwrap();
        assert!(html.contains("https://robbycowell.com/dispatches/001-the-brief"));
        assert!(html.contains(r#"datetime="2021-03-14T10:00:00Z""#));
        assert!(html.contains("March 14, 2021"));
    }

    #[test]
    fn unknown_slug_is_error() {
        let err = renderer().render(&Slug::parse("999-missing").unwrap()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownArticle(_)));
    }

    #[test]
    fn titles_are_escaped() {
        let r = ArticleRenderer::new(
            vec![article("x", "<script>alert(1)</script>", "body")],
            SiteSettings::default(),
        );
        let html = r.render(&Slug::parse("x").unwrap()).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn markdown_tables_enabled() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }
}
