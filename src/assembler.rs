//! Page assembly: turns the book model into rendered index and content pages.
//!
//! Assembly is read-only over the [`Book`]. Every page works on owned copies of
//! its head and body, and navigation links are derived from spine positions
//! alone, so pages can be assembled in any order or in parallel.

use std::sync::Arc;

use minijinja::{Value, context};
use quick_xml::escape::escape;

use crate::error::{Error, Result};
use crate::fragment::{extract_body, extract_head};
use crate::path_utils::{normalize_extension, parent_dir, relativize, unquote};
use crate::template::{TemplateSet, deferred_markup};
use crate::toc;
use crate::types::{Book, ContentItem};

/// Renders the index page and the content pages of one export.
///
/// `css_location` and `index_location` are root-relative locations inside the
/// output directory (e.g. `stylesheet.css`, `index.html`).
pub struct PageAssembler<'a> {
    book: &'a Book,
    templates: &'a TemplateSet,
    css_location: &'a str,
    index_location: &'a str,
}

impl<'a> PageAssembler<'a> {
    pub fn new(
        book: &'a Book,
        templates: &'a TemplateSet,
        css_location: &'a str,
        index_location: &'a str,
    ) -> Self {
        Self {
            book,
            templates,
            css_location,
            index_location,
        }
    }

    /// Link from directory `base_dir` to the page written for spine `position`.
    fn spine_link(&self, position: usize, base_dir: &str) -> Option<String> {
        self.book
            .spine_item(position)
            .map(|item| relativize(&normalize_extension(&item.href), base_dir))
    }

    fn meta(&self) -> Value {
        Value::from_serialize(&self.book.metadata.template_view())
    }

    /// Renders the index page: the expanded TOC plus a link to the first page.
    pub fn assemble_index(&self) -> Result<String> {
        let base_dir = parent_dir(self.index_location);
        let next_link = self.spine_link(0, &base_dir).ok_or(Error::EmptySpine)?;
        let toc_markup = toc::build(self.book.toc(), self.index_location);

        self.templates.render_index(context! {
            has_toc => self.book.toc().count() > 0,
            toc => Value::from_safe_string(toc_markup),
            meta => self.meta(),
            nextLink => link_value(Some(next_link.clone())),
            tocUrl => link_value(Some(relativize(self.index_location, &base_dir))),
            cssLink => link_value(Some(relativize(self.css_location, &base_dir))),
            firstContentPageLink => link_value(Some(next_link)),
        })
    }

    /// Renders the content page for the spine item at `position`.
    pub fn assemble_page(&self, position: usize) -> Result<String> {
        let item = self.book.spine_item(position).ok_or_else(|| {
            Error::NotFound(format!("no spine item at position {}", position))
        })?;
        self.render_item(item, position)
    }

    fn render_item(&self, item: &ContentItem, position: usize) -> Result<String> {
        let document = item.data().ok_or_else(|| {
            Error::Structure(format!("{} has no parsed markup in memory", item.href))
        })?;
        let base_dir = parent_dir(&item.href);

        let head_content = extract_head(document).map_err(|e| in_item(item, e))?;
        let ebook_content = extract_body(document).map_err(|e| in_item(item, e))?;

        let next_link = self.spine_link(position + 1, &base_dir);
        let prev_link = position
            .checked_sub(1)
            .and_then(|previous| self.spine_link(previous, &base_dir));
        let first_content_page_link = self
            .book
            .spine_item(0)
            .map(|first| normalize_extension(&first.href));

        let toc_root = Arc::clone(self.book.toc());
        // TOC targets are compared decoded, so the page location must be too.
        let page_location = unquote(&item.href).into_owned();
        let toc = deferred_markup(move || toc::build(&toc_root, &page_location));

        self.templates.render_page(context! {
            ebookContent => Value::from_safe_string(ebook_content),
            prevLink => link_value(prev_link),
            nextLink => link_value(next_link),
            has_toc => false,
            toc => toc,
            tocUrl => link_value(Some(relativize(self.index_location, &base_dir))),
            head_content => Value::from_safe_string(head_content),
            meta => self.meta(),
            cssLink => link_value(Some(relativize(self.css_location, &base_dir))),
            firstContentPageLink => link_value(first_content_page_link),
        })
    }
}

/// Link for an attribute value, XML-escaped once so the template leaves `/` alone.
/// `None` becomes the template's `none`.
fn link_value(link: Option<String>) -> Value {
    match link {
        Some(link) => Value::from_safe_string(escape(link.as_str()).into_owned()),
        None => Value::from(()),
    }
}

/// Prefixes structure errors with the href of the offending item.
fn in_item(item: &ContentItem, error: Error) -> Error {
    match error {
        Error::Structure(message) => Error::Structure(format!("{}: {}", item.href, message)),
        other => other,
    }
}
