//! Core data types for the htmldir export library.
//!
//! This module defines the in-memory ebook model consumed by the exporter:
//! - The hierarchical table of contents (`TocNode`)
//! - Manifest entries and their payloads (`ContentItem`, `ItemPayload`)
//! - The reading order and manifest container (`Book`)
//! - Ordered key/value metadata (`EbookMetadata`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::markup::Document;

/// A node of the table of contents.
///
/// The book-level TOC is a root node whose own `href` and `title` are ignored;
/// its descendants are the navigable entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocNode {
    /// Percent-encoded, root-relative location (may carry a `#fragment`).
    pub href: String,
    pub title: String,
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Creates an empty root node.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: title.into(),
            children: Vec::new(),
        }
    }

    /// Appends a child and returns `self`, for building trees inline.
    pub fn with_child(mut self, child: TocNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of descendant nodes (the node itself is not counted).
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack: Vec<&TocNode> = vec![self];
        while let Some(node) = stack.pop() {
            total += node.children.len();
            stack.extend(node.children.iter());
        }
        total
    }
}

/// Where the bytes of a manifest item currently live.
#[derive(Debug, Clone)]
pub enum ItemPayload {
    /// A parsed content document (spine items).
    Markup(Document),
    /// Opaque bytes copied through unchanged (stylesheets, images, fonts...).
    Bytes(Vec<u8>),
    /// The payload was released after being written to this path.
    OnDisk(PathBuf),
}

/// An entry of the book manifest.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Percent-encoded, root-relative location of the item. Unique within the manifest.
    pub href: String,
    pub media_type: String,
    /// Zero-based reading order position, `None` for static assets.
    pub spine_position: Option<usize>,
    payload: ItemPayload,
}

impl ContentItem {
    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    /// The parsed markup of a content document, if it is still in memory.
    pub fn data(&self) -> Option<&Document> {
        match &self.payload {
            ItemPayload::Markup(document) => Some(document),
            _ => None,
        }
    }

    /// Raw bytes of the item.
    ///
    /// Markup is serialized on demand; released items are read back from disk.
    pub fn bytes_representation(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            ItemPayload::Markup(document) => Ok(Cow::Owned(document.to_markup().into_bytes())),
            ItemPayload::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            ItemPayload::OnDisk(path) => Ok(Cow::Owned(std::fs::read(path)?)),
        }
    }

    /// Drops the in-memory payload; from now on the bytes live only at `path`.
    pub fn unload_data_from_memory(&mut self, path: &Path) {
        self.payload = ItemPayload::OnDisk(path.to_path_buf());
    }
}

/// Ordered key/value metadata describing the book (title, creators, language...).
///
/// Entries keep their insertion order and repeated keys are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EbookMetadata {
    entries: Vec<(String, String)>,
}

impl EbookMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata with a title and the default language "en".
    pub fn default_with_title(title: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.push("title", title);
        metadata.push("language", "en");
        metadata
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Stores a timestamp as an RFC 3339 string.
    pub fn push_date(&mut self, key: impl Into<String>, date: DateTime<Utc>) -> &mut Self {
        self.push(key, date.to_rfc3339())
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Key → values view handed to templates; repeated keys are joined with ", ".
    pub fn template_view(&self) -> BTreeMap<&str, String> {
        let mut view: BTreeMap<&str, String> = BTreeMap::new();
        for (key, value) in self.iter() {
            view.entry(key)
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        view
    }
}

/// The in-memory ebook: manifest, spine (reading order), table of contents and metadata.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: EbookMetadata,
    toc: Arc<TocNode>,
    manifest: Vec<ContentItem>,
    /// Manifest indices in reading order.
    spine: Vec<usize>,
    by_href: HashMap<String, usize>,
}

impl Book {
    pub fn new(metadata: EbookMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    pub fn toc(&self) -> &Arc<TocNode> {
        &self.toc
    }

    pub fn set_toc(&mut self, toc: TocNode) -> &mut Self {
        self.toc = Arc::new(toc);
        self
    }

    /// Parses an XHTML document and appends it to the spine.
    pub fn add_spine_document(&mut self, href: impl Into<String>, xhtml: &[u8]) -> Result<&mut Self> {
        let document = Document::parse(xhtml)?;
        let position = self.spine.len();
        let index = self.insert(ContentItem {
            href: href.into(),
            media_type: "application/xhtml+xml".to_string(),
            spine_position: Some(position),
            payload: ItemPayload::Markup(document),
        })?;
        self.spine.push(index);
        Ok(self)
    }

    /// Adds a static asset that is copied through unchanged.
    pub fn add_asset(
        &mut self,
        href: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<&mut Self> {
        self.insert(ContentItem {
            href: href.into(),
            media_type: media_type.into(),
            spine_position: None,
            payload: ItemPayload::Bytes(bytes.into()),
        })?;
        Ok(self)
    }

    fn insert(&mut self, item: ContentItem) -> Result<usize> {
        if self.by_href.contains_key(&item.href) {
            return Err(Error::DuplicateHref(item.href));
        }
        let index = self.manifest.len();
        self.by_href.insert(item.href.clone(), index);
        self.manifest.push(item);
        Ok(index)
    }

    pub fn manifest(&self) -> &[ContentItem] {
        &self.manifest
    }

    pub(crate) fn manifest_mut(&mut self) -> &mut [ContentItem] {
        &mut self.manifest
    }

    pub fn item(&self, href: &str) -> Option<&ContentItem> {
        self.by_href.get(href).map(|&index| &self.manifest[index])
    }

    pub fn spine_len(&self) -> usize {
        self.spine.len()
    }

    /// The spine item at `position`.
    pub fn spine_item(&self, position: usize) -> Option<&ContentItem> {
        self.spine.get(position).map(|&index| &self.manifest[index])
    }

    pub(crate) fn spine_item_mut(&mut self, position: usize) -> Option<&mut ContentItem> {
        let index = *self.spine.get(position)?;
        self.manifest.get_mut(index)
    }
}
