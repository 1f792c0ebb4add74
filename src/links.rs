//! Rewrites internal anchor targets so they point at the exported `.html` pages.

use crate::markup::{Element, Node};
use crate::path_utils::normalize_extension;

/// Normalizes the `href` of every XHTML `<a>` in the subtree and returns how many
/// anchors carried an `href`.
///
/// Anchors without `href` are left alone; external http(s) URLs pass through
/// unchanged. Applying it twice changes nothing.
pub fn rewrite_links(root: &mut Element) -> usize {
    let mut rewritten = 0;
    let mut stack: Vec<&mut Element> = vec![root];

    while let Some(element) = stack.pop() {
        if element.is_xhtml("a") && element.update_attribute("href", normalize_extension) {
            rewritten += 1;
        }
        for child in element.children.iter_mut() {
            if let Node::Element(child) = child {
                stack.push(child);
            }
        }
    }

    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Document;

    #[test]
    fn test_rewrites_nested_anchors_only() {
        let mut doc = Document::parse(
            br##"<html xmlns="http://www.w3.org/1999/xhtml"><body>
<p><a href="ch2.xhtml#n1">n</a> <a name="here">x</a></p>
<div><div><a href="https://example.com/x.xhtml">e</a><a href="../img/a.png">i</a></div></div>
<svg xmlns="http://www.w3.org/2000/svg"><a href="map.xml">m</a></svg>
</body></html>"##,
        )
        .unwrap();

        assert_eq!(rewrite_links(&mut doc.root), 3);

        let markup = doc.to_markup();
        assert!(markup.contains(r##"<a href="ch2.html#n1">"##));
        assert!(markup.contains(r#"<a name="here">"#));
        assert!(markup.contains(r#"href="https://example.com/x.xhtml""#));
        assert!(markup.contains(r#"href="../img/a.png""#));
        // Not an XHTML anchor.
        assert!(markup.contains(r#"href="map.xml""#));

        let once = markup.clone();
        rewrite_links(&mut doc.root);
        assert_eq!(doc.to_markup(), once);
    }
}
