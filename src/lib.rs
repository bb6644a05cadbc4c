//! # Dispatches
//!
//! Tooling for a blog whose articles live in plain directories and whose
//! pages are rendered once on the server and hydrated in the browser.
//!
//! ```text
//! src/articles/                          # content root
//! ├── articles.js                        # generated manifest (ES module)
//! ├── 001-the-brief/
//! │   ├── 001-the-brief.md               # article body
//! │   └── 001-the-brief-metadata.toml    # publish date, slug, permalink
//! └── 004-the-basics/
//!     └── ...
//! ```
//!
//! # Two flows
//!
//! **Scaffolding** (`dispatches new 004-the-basics`): validate the slug,
//! create the article directory from templates, regenerate the manifest so
//! the bundle imports the new article.
//!
//! **First-load rendering** (`dispatches serve`): render the requested
//! article to markup, splice it into the HTML shell, serve the document. The
//! browser bundle then hydrates the same article.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`slug`] | Slug validation and the `NNN-name` convention |
//! | [`template`] | `$name` placeholder substitution, unknown names rejected |
//! | [`fs`] | File-system capability trait and its real implementation |
//! | [`config`] | `dispatches.toml` loading, merging and validation; content layout |
//! | [`metadata`] | Article metadata files; permalinks derived from site settings |
//! | [`manifest`] | Article discovery and manifest generation |
//! | [`articles`] | Loading articles (metadata + markdown) from disk |
//! | [`scaffold`] | Transactional creation of new articles |
//! | [`render`] | The app-tree renderer seam and its maud implementation |
//! | [`shell`] | Splicing rendered markup into the HTML shell |
//! | [`server`] | Minimal HTTP server for first-load delivery and static files |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit file-system capability
//!
//! Scaffolding, manifest generation and the server take a
//! [`fs::FileSystem`] instead of calling `std::fs`, so every failure path
//! (a write that fails halfway through a scaffold, a missing content root)
//! is testable in memory.
//!
//! ## Sorted manifest
//!
//! Directory listing order differs between platforms. Slugs are sorted
//! before the manifest is written, so regenerating an unchanged content root
//! produces a byte-identical file and diffs only show real changes.
//!
//! ## Duplicate slugs are an error
//!
//! Scaffolding an existing slug fails before touching the disk. Overwriting
//! would destroy a draft; versioning would invent slugs nobody asked for.

pub mod articles;
pub mod config;
pub mod fs;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod render;
pub mod scaffold;
pub mod server;
pub mod shell;
pub mod slug;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
