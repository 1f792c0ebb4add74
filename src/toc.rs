//! Table of contents rendering.
//!
//! Flattens a [`TocNode`] tree into nested `<ul>`/`<li>`/`<a>` markup whose links
//! are relative to the page the TOC is shown on. The walk uses an explicit work
//! stack, so very deep TOCs cannot overflow the call stack.

use quick_xml::escape::escape;

use crate::path_utils::{
    clean_xml_chars, collapse_whitespace, normalize_extension, parent_dir, relativize, unquote,
};
use crate::types::TocNode;

const INDENT: &str = "  ";

enum Step<'a> {
    Entry(&'a TocNode, usize),
    Close(&'static str, usize),
}

/// Renders the TOC below `root` as pretty-printed markup, with links relative to
/// the root-relative `reference_location`.
///
/// Every descendant of `root` becomes one `<li>`; every node with children gets
/// one nested `<ul>`. The result is wrapped in a `<div>`.
///
/// # Examples
///
/// ```
/// use htmldir::toc::build;
/// use htmldir::types::TocNode;
///
/// let toc = TocNode::root().with_child(TocNode::new("text/ch1.xhtml", "One"));
/// let markup = build(&toc, "index.html");
/// assert!(markup.contains(r#"<a href="text/ch1.html">One</a>"#));
/// ```
pub fn build(root: &TocNode, reference_location: &str) -> String {
    let base_dir = parent_dir(reference_location);
    let mut out = String::from("<div>\n");

    if root.children.is_empty() {
        push_line(&mut out, 1, "<ul></ul>");
        out.push_str("</div>\n");
        return out;
    }

    push_line(&mut out, 1, "<ul>");
    let mut stack: Vec<Step<'_>> = vec![Step::Close("</ul>", 1)];
    stack.extend(root.children.iter().rev().map(|child| Step::Entry(child, 2)));

    while let Some(step) = stack.pop() {
        match step {
            Step::Entry(node, depth) => {
                push_line(&mut out, depth, "<li>");
                push_line(&mut out, depth + 1, &link(node, &base_dir));
                if node.children.is_empty() {
                    push_line(&mut out, depth, "</li>");
                    continue;
                }
                push_line(&mut out, depth + 1, "<ul>");
                stack.push(Step::Close("</li>", depth));
                stack.push(Step::Close("</ul>", depth + 1));
                stack.extend(
                    node.children
                        .iter()
                        .rev()
                        .map(|child| Step::Entry(child, depth + 2)),
                );
            }
            Step::Close(tag, depth) => push_line(&mut out, depth, tag),
        }
    }

    out.push_str("</div>\n");
    out
}

fn link(node: &TocNode, base_dir: &str) -> String {
    let href = normalize_extension(&relativize(&unquote(&node.href), base_dir));
    let title = collapse_whitespace(&node.title);
    format!(
        r#"<a href="{}">{}</a>"#,
        escape(clean_xml_chars(&href).as_str()),
        escape(clean_xml_chars(&title).as_str())
    )
}

fn push_line(out: &mut String, depth: usize, content: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(content);
    out.push('\n');
}
