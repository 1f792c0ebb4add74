//! Common test utilities and constants for the htmldir crate.
//!
//! Provides scratch directory setup, sample XHTML documents and small book
//! builders shared by the unit and integration tests.

use htmldir::error::Result;
use htmldir::prelude::*;
use rand::{Rng, distributions::Alphanumeric};
use std::time::Duration;
use tokio::fs;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fake JPEG payload; the exporter copies assets byte for byte.
#[allow(dead_code)]
pub const COVER_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9];

/// Scratch directories for one test.
#[allow(dead_code)]
pub struct TestDirs {
    pub base_dir: PathBuf,
    pub target_dir: PathBuf,
}

/// Creates a clean, uniquely named scratch directory with a `target` subdirectory.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let base_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir).await.unwrap();
    }
    let target_dir = base_dir.join("target");
    fs::create_dir_all(&target_dir).await.unwrap();

    TestDirs {
        base_dir,
        target_dir,
    }
}

/// Wraps head and body markup into an XHTML document.
#[allow(dead_code)]
pub fn xhtml(head: &str, body: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>{head}</head>
<body>{body}</body>
</html>"#
    )
    .into_bytes()
}

/// A book with spine `[idx0.xhtml, idx1.xhtml]`, a cover image and a flat TOC.
#[allow(dead_code)]
pub fn sample_book() -> Result<Book> {
    let mut metadata = EbookMetadata::default_with_title("Sample Book");
    metadata.push("creator", "Jane Doe");

    let mut book = Book::new(metadata);
    book.add_spine_document(
        "idx0.xhtml",
        &xhtml(
            "<title>Part 0</title><style>p { color: red; }</style>",
            r#"<h1>Part 0</h1><img src="img/cover.jpg" alt="cover"/><p><a href="idx1.xhtml#start">next</a></p><div/>"#,
        ),
    )?;
    book.add_spine_document(
        "idx1.xhtml",
        &xhtml(
            "<title>Part 1</title>",
            r#"<h1 id="start">Part 1</h1><p>The end.</p>"#,
        ),
    )?;
    book.add_asset("img/cover.jpg", "image/jpeg", COVER_BYTES)?;
    book.set_toc(
        TocNode::root()
            .with_child(TocNode::new("idx0.xhtml", "Part 0"))
            .with_child(TocNode::new("idx1.xhtml#start", "Part 1")),
    );
    Ok(book)
}

/// A book whose spine items are `text/a.xhtml`, `text/b.xhtml`, `text/c.xhtml`.
#[allow(dead_code)]
pub fn three_chapter_book() -> Result<Book> {
    let mut book = Book::new(EbookMetadata::default_with_title("Three Chapters"));
    for name in ["a", "b", "c"] {
        book.add_spine_document(
            format!("text/{}.xhtml", name),
            &xhtml(&format!("<title>{name}</title>"), &format!("<p>{name}</p>")),
        )?;
    }
    book.set_toc(
        TocNode::root().with_child(
            TocNode::new("text/a.xhtml", "A")
                .with_child(TocNode::new("text/b.xhtml", "B"))
                .with_child(TocNode::new("text/c.xhtml", "C")),
        ),
    );
    Ok(book)
}

/// Reads a file of an export as UTF-8 text.
#[allow(dead_code)]
pub async fn read_output(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name))
        .await
        .unwrap_or_else(|e| panic!("missing output file {}: {}", name, e))
}
