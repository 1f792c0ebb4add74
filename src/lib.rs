//! htmldir - E-book to HTML Directory Export Library
//!
//! This crate exports an in-memory e-book (manifest, reading order, table of
//! contents and metadata) as a plain directory of browsable HTML pages: one page
//! per reading-order document with previous/next navigation, an `index.html`
//! holding the full table of contents, a shared stylesheet, a `metadata.json`
//! sidecar and verbatim copies of every other resource (images, fonts...).
//!
//! # Getting Started
//!
//! Build a [`Book`] from your content documents and assets, configure an
//! [`HtmldirConfig`] via its builder, then call
//! [`convert`](HtmldirConfig::convert) with a destination ending in `.htmldir`.
//!
//! ```rust,no_run
//! use htmldir::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> htmldir::error::Result<()> {
//!     // 1. Describe the book
//!     let mut metadata = EbookMetadata::default_with_title("My Novel");
//!     metadata.push("creator", "Jane Doe");
//!
//!     let mut book = Book::new(metadata);
//!     book.add_spine_document("text/ch1.xhtml", &std::fs::read("./ch1.xhtml")?)?;
//!     book.add_spine_document("text/ch2.xhtml", &std::fs::read("./ch2.xhtml")?)?;
//!     book.add_asset("img/cover.jpg", "image/jpeg", std::fs::read("./cover.jpg")?)?;
//!     book.set_toc(
//!         TocNode::root()
//!             .with_child(TocNode::new("text/ch1.xhtml", "Chapter 1"))
//!             .with_child(TocNode::new("text/ch2.xhtml", "Chapter 2")),
//!     );
//!
//!     // 2. Configure the export
//!     let config = HtmldirConfig::builder()
//!         .css_filename("novel.css")
//!         .build()?;
//!
//!     // Optional: validate before doing any work
//!     config.preflight_check(Path::new("./out/My Novel.htmldir"))?;
//!
//!     // 3. Export; pages land in ./out/My Novel/
//!     let output = config
//!         .convert(&mut book, Path::new("./out/My Novel.htmldir"))
//!         .await?;
//!     println!("Export written to {:?}", output);
//!
//!     Ok(())
//! }
//! ```
//!
//! The lower-level building blocks ([`toc::build`], [`fragment`], [`PageAssembler`],
//! [`OutputWriter`]) are public for callers that need custom pipelines.

pub mod assembler;
pub mod error;
pub mod fragment;
pub mod htmldir;
pub mod links;
pub mod markup;
pub mod path_utils;
pub mod template;
pub mod toc;
pub mod types;
pub mod writer;

// Publicly expose the main `HtmldirConfig` struct and its builder
pub use htmldir::HtmldirConfig;
pub use htmldir::HtmldirConfigBuilder;

pub use assembler::PageAssembler;
pub use markup::{Document, Element, Node};
pub use template::TemplateSet;
pub use types::{Book, ContentItem, EbookMetadata, ItemPayload, TocNode};
pub use writer::OutputWriter;

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types so that `use htmldir::prelude::*;`
/// is enough for a typical export.
pub mod prelude {
    pub use super::{
        Book, ContentItem, Document, EbookMetadata, HtmldirConfig, HtmldirConfigBuilder,
        ItemPayload, TemplateSet, TocNode, error, types,
    };
    pub use std::path::{Path, PathBuf};
}
