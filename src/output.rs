//! CLI output formatting.
//!
//! Every entity leads with its positional index and title; file paths follow
//! as indented context lines, relative to the content root:
//!
//! ```text
//! Articles
//! 001 The Brief
//!     Source: 001-the-brief/
//!     Published: 2021-03-01T08:00:00Z
//!     Permalink: https://robbycowell.com/dispatches/001-the-brief
//! ```
//!
//! Each command has a `format_*` function (pure, returns `Vec<String>`) and
//! a `print_*` wrapper that writes to stdout.

use crate::articles::Article;
use crate::manifest::Freshness;
use crate::metadata::format_timestamp;
use crate::scaffold::ScaffoldReport;
use crate::slug::Slug;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` when possible, for shorter context lines.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// new
// ============================================================================

pub fn format_scaffold_output(report: &ScaffoldReport, root: &Path) -> Vec<String> {
    vec![
        format!("Created {}", report.slug),
        format!("{}Metadata: {}", indent(1), relative(&report.metadata_path, root)),
        format!("{}Content: {}", indent(1), relative(&report.markdown_path, root)),
        format!("{}Permalink: {}", indent(1), report.permalink),
        format!(
            "Manifest: {} ({} article{})",
            relative(&report.manifest_path, root),
            report.article_count,
            plural(report.article_count)
        ),
    ]
}

pub fn print_scaffold_output(report: &ScaffoldReport, root: &Path) {
    print_lines(format_scaffold_output(report, root));
}

// ============================================================================
// manifest
// ============================================================================

pub fn format_manifest_output(slugs: &[Slug], manifest_path: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Wrote {} ({} article{})",
        manifest_path.display(),
        slugs.len(),
        plural(slugs.len())
    )];
    for (i, slug) in slugs.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), slug));
    }
    lines
}

pub fn print_manifest_output(slugs: &[Slug], manifest_path: &Path) {
    print_lines(format_manifest_output(slugs, manifest_path));
}

pub fn format_freshness(freshness: &Freshness, manifest_path: &Path) -> String {
    let path = manifest_path.display();
    match freshness {
        Freshness::Fresh => format!("{path} is up to date"),
        Freshness::Stale => format!("{path} is stale; run `dispatches manifest`"),
        Freshness::Missing => format!("{path} is missing; run `dispatches manifest`"),
    }
}

// ============================================================================
// list
// ============================================================================

pub fn format_articles_output(articles: &[Article]) -> Vec<String> {
    let mut lines = vec!["Articles".to_string()];
    if articles.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
        return lines;
    }
    for (i, article) in articles.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), article.title));
        lines.push(format!("{}Source: {}/", indent(1), article.slug));
        lines.push(format!(
            "{}Published: {}",
            indent(1),
            format_timestamp(article.metadata.publish_date())
        ));
        lines.push(format!(
            "{}Permalink: {}",
            indent(1),
            article.metadata.permalink()
        ));
    }
    lines
}

pub fn print_articles_output(articles: &[Article]) {
    print_lines(format_articles_output(articles));
}
