//! Extraction of the `<head>` and `<body>` fragments of a content document.
//!
//! Both fragments are cut from an owned copy of the element subtree, so the
//! source document is never modified. The wrapping tag is removed and markup that
//! HTML parsers would misread is normalized:
//! - `<style>` blocks are dropped from the head, the shared stylesheet replaces them
//! - `<title/>` becomes `<title></title>`
//! - `<div/>`, `<a/>` and `<span/>` in the body become explicit empty pairs

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;
use crate::links::rewrite_links;
use crate::markup::Document;

lazy_static! {
    static ref HEAD_TAG_REGEX: Regex = Regex::new(r"</?head(?:\s[^>]*?)?/?>").unwrap();
    static ref BODY_TAG_REGEX: Regex = Regex::new(r"</?body(?:\s[^>]*?)?/?>").unwrap();
    static ref STYLE_BLOCK_REGEX: Regex =
        Regex::new(r"(?s)<style(?:\s[^>]*?)?(?:/>|>.*?</style>)").unwrap();
    static ref EMPTY_TITLE_REGEX: Regex = Regex::new(r"<title(\s[^>]*)?/>").unwrap();
    static ref EMPTY_NON_VOID_REGEX: Regex = Regex::new(r"<(div|a|span)(\s[^>]*)?/>").unwrap();
}

/// Returns the inner markup of the document's XHTML `<head>`, without stylesheets.
///
/// Fails with [`Error::Structure`](crate::error::Error::Structure) if the document has
/// no `<head>` or more than one.
pub fn extract_head(document: &Document) -> Result<String> {
    let head = document.root.find_unique("head")?.clone();
    let markup = head.to_markup();

    let markup = HEAD_TAG_REGEX.replace_all(&markup, "");
    let markup = STYLE_BLOCK_REGEX.replace_all(&markup, "");
    let markup = EMPTY_TITLE_REGEX.replace_all(&markup, "<title${1}></title>");
    Ok(markup.into_owned())
}

/// Returns the inner markup of the document's XHTML `<body>`, with internal links
/// rewritten to `.html` targets.
///
/// Fails with [`Error::Structure`](crate::error::Error::Structure) if the document has
/// no `<body>` or more than one.
pub fn extract_body(document: &Document) -> Result<String> {
    let mut body = document.root.find_unique("body")?.clone();
    let rewritten = rewrite_links(&mut body);
    log::trace!("Rewrote {} anchor(s) in body", rewritten);
    let markup = body.to_markup();

    let markup = BODY_TAG_REGEX.replace_all(&markup, "");
    let markup = EMPTY_NON_VOID_REGEX.replace_all(&markup, "<${1}${2}></${1}>");
    Ok(markup.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn doc(head: &str, body: &str) -> Document {
        let source = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head>{head}</head><body class="main">{body}</body></html>"#
        );
        Document::parse(source.as_bytes()).unwrap()
    }

    #[test]
    fn test_body_self_closed_elements_become_pairs() {
        let content = extract_body(&doc("", "<div/>")).unwrap();
        assert_eq!(content, "<div></div>");
        assert!(!content.contains("<div/>"));
    }

    #[test]
    fn test_body_pairs_keep_attributes_and_leave_void_elements() {
        let content = extract_body(&doc(
            "",
            r#"<p>a<br/><span class="x"/><a id="n1"/><abbr/><img src="i.png"/></p>"#,
        ))
        .unwrap();
        assert_eq!(
            content,
            r#"<p>a<br/><span class="x"></span><a id="n1"></a><abbr/><img src="i.png"/></p>"#
        );
    }

    #[test]
    fn test_body_links_rewritten_on_a_copy() {
        let document = doc("", r#"<p><a href="next.xhtml#top">next</a></p>"#);
        let content = extract_body(&document).unwrap();
        assert_eq!(content, r##"<p><a href="next.html#top">next</a></p>"##);

        let original = document.root.find_unique("a").unwrap();
        assert_eq!(original.attribute("href"), Some("next.xhtml#top"));
    }

    #[test]
    fn test_head_strips_styles_and_fixes_title() {
        assert_eq!(extract_head(&doc("", "")).unwrap(), "");

        let content = extract_head(&doc(
            r#"<title/><meta name="a" content="b"/><style type="text/css">p { color: red; }
</style><link rel="stylesheet" href="s.css"/><style/>"#,
            "",
        ))
        .unwrap();
        assert_eq!(
            content,
            r#"<title></title><meta name="a" content="b"/><link rel="stylesheet" href="s.css"/>"#
        );
    }

    #[test]
    fn test_missing_or_duplicate_sections() {
        let no_body = Document::parse(
            br#"<html xmlns="http://www.w3.org/1999/xhtml"><head/></html>"#,
        )
        .unwrap();
        assert!(matches!(extract_body(&no_body), Err(Error::Structure(_))));
        assert!(extract_head(&no_body).is_ok());

        let two_heads = Document::parse(
            br#"<html xmlns="http://www.w3.org/1999/xhtml"><head/><head/><body/></html>"#,
        )
        .unwrap();
        assert!(matches!(extract_head(&two_heads), Err(Error::Structure(_))));
        assert_eq!(extract_body(&two_heads).unwrap(), "");
    }
}
