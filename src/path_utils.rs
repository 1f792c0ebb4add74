//! Path utilities for output locations and link targets.
//!
//! Every location inside the export is handled as a root-relative, `/`-separated
//! href string (e.g. `text/chapter1.xhtml`), never through the process working
//! directory. This module computes relative links between such locations,
//! normalizes XHTML extensions to `.html`, and maps hrefs onto real paths below
//! an output root.

use crate::error::{Error, Result};

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

lazy_static! {
    /// Trailing `.xhtml`/`.xml` extension, optionally followed by a `#fragment`.
    static ref XML_EXTENSION_REGEX: Regex = Regex::new(r"\.x(?:ht)?ml(#.*)?$").unwrap();
    static ref WHITESPACE_RUN_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Splits a location into its normalized segments, resolving `.` and `..` lexically.
///
/// Backslashes count as separators. A `..` that would climb above the root is kept,
/// so callers can detect locations escaping the root.
fn segments(location: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in location.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(last) if *last != "..") {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }
    out
}

/// Returns the directory part of a root-relative location (`""` for the root).
///
/// # Examples
///
/// ```
/// use htmldir::path_utils::parent_dir;
/// assert_eq!(parent_dir("text/ch1.xhtml"), "text");
/// assert_eq!(parent_dir("index.html"), "");
/// ```
pub fn parent_dir(location: &str) -> String {
    let mut parts = segments(location);
    parts.pop();
    parts.join("/")
}

/// Computes the relative path from directory `base_dir` to `target`.
///
/// Both arguments are root-relative locations; the result always uses `/`
/// separators. Identical locations yield `"."`.
///
/// # Examples
///
/// ```
/// use htmldir::path_utils::relativize;
/// assert_eq!(relativize("text/ch2.html", "text"), "ch2.html");
/// assert_eq!(relativize("stylesheet.css", "text/part1"), "../../stylesheet.css");
/// assert_eq!(relativize("images/a.png", ""), "images/a.png");
/// ```
pub fn relativize(target: &str, base_dir: &str) -> String {
    let target = segments(target);
    let base = segments(base_dir);

    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(base.len() - common + target.len() - common);
    parts.extend(std::iter::repeat_n("..", base.len() - common));
    parts.extend(&target[common..]);

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Rewrites a trailing `.xhtml` or `.xml` extension to `.html`, keeping any fragment.
///
/// Absolute `http://` and `https://` URLs are returned unchanged. The rewrite is
/// idempotent.
///
/// # Examples
///
/// ```
/// use htmldir::path_utils::normalize_extension;
/// assert_eq!(normalize_extension("chapter1.xhtml#sec2"), "chapter1.html#sec2");
/// assert_eq!(
///     normalize_extension("https://example.com/a.xhtml"),
///     "https://example.com/a.xhtml"
/// );
/// ```
pub fn normalize_extension(href: &str) -> String {
    if href.starts_with("https://") || href.starts_with("http://") {
        return href.to_string();
    }
    XML_EXTENSION_REGEX
        .replace(href, ".html${1}")
        .into_owned()
}

/// Percent-decodes an href (invalid UTF-8 sequences are replaced).
pub fn unquote(href: &str) -> Cow<'_, str> {
    percent_decode_str(href).decode_utf8_lossy()
}

/// Removes characters that are not allowed in XML 1.0 documents.
pub fn clean_xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}')
        })
        .collect()
}

/// Collapses every run of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    WHITESPACE_RUN_REGEX.replace_all(text, " ")
}

/// Maps a manifest href onto a filesystem path below `root`.
///
/// The href is percent-decoded and normalized lexically; hrefs that would
/// resolve outside of `root` (or to `root` itself) are rejected.
pub fn join_href(root: &Path, href: &str) -> Result<PathBuf> {
    let decoded = unquote(href);
    let parts = segments(&decoded);

    if parts.is_empty() || parts.first() == Some(&"..") {
        return Err(Error::InvalidPath(
            PathBuf::from(href),
            "href does not resolve to a location inside the output directory".to_string(),
        ));
    }

    let mut path = root.to_path_buf();
    path.extend(parts);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relativize_sibling_and_nested() {
        assert_eq!(relativize("a.html", ""), "a.html");
        assert_eq!(relativize("text/b.html", "text"), "b.html");
        assert_eq!(relativize("text/b.html", "other"), "../text/b.html");
        assert_eq!(relativize("index.html", "a/b/c"), "../../../index.html");
    }

    #[test]
    fn test_relativize_normalizes_separators_and_dots() {
        assert_eq!(relativize("text\\sub\\c.html", "text"), "sub/c.html");
        assert_eq!(relativize("./text/../img/x.png", "text"), "../img/x.png");
        assert_eq!(relativize("text", "text"), ".");
    }

    #[test]
    fn test_relativize_keeps_fragment() {
        assert_eq!(relativize("text/ch1.xhtml#s2", "text"), "ch1.xhtml#s2");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("a/b/c.html"), "a/b");
        assert_eq!(parent_dir("c.html"), "");
        assert_eq!(parent_dir(""), "");
    }

    #[test]
    fn test_normalize_extension_variants() {
        assert_eq!(normalize_extension("a.xhtml"), "a.html");
        assert_eq!(normalize_extension("a.xml"), "a.html");
        assert_eq!(normalize_extension("a.xml#top"), "a.html#top");
        assert_eq!(normalize_extension("a.html"), "a.html");
        assert_eq!(normalize_extension("a.xhtml.bak"), "a.xhtml.bak");
        assert_eq!(normalize_extension("http://x.org/a.xml"), "http://x.org/a.xml");
        assert_eq!(normalize_extension("#note-1"), "#note-1");
    }

    #[test]
    fn test_normalize_extension_idempotent() {
        for href in ["a.xhtml", "b.xml#f", "c.html", "https://e.com/d.xhtml", "e", ""] {
            let once = normalize_extension(href);
            assert_eq!(normalize_extension(&once), once);
        }
    }

    #[test]
    fn test_clean_xml_chars() {
        assert_eq!(clean_xml_chars("a\u{0}b\u{1b}c\td\ne"), "abc\td\ne");
        assert_eq!(clean_xml_chars("x\u{FFFE}y"), "xy");
        assert_eq!(clean_xml_chars("日本語"), "日本語");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("A \n\t  title"), "A title");
        assert_eq!(collapse_whitespace("plain"), "plain");
    }

    #[test]
    fn test_join_href() {
        let root = Path::new("/out");
        assert_eq!(
            join_href(root, "img/my%20cover.jpg").unwrap(),
            PathBuf::from("/out/img/my cover.jpg")
        );
        assert!(join_href(root, "../escape.txt").is_err());
        assert!(join_href(root, "a/../../escape.txt").is_err());
        assert!(join_href(root, "").is_err());
    }
}
