use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Error, Result};
use crate::template::{DEFAULT_CSS, DEFAULT_INDEX_TEMPLATE, DEFAULT_PAGE_TEMPLATE, TemplateSet};
use crate::types::Book;
use crate::writer::{DEFAULT_CSS_FILENAME, OutputWriter, strip_file_type};

/// The HTML-directory export configuration, built declaratively using the builder pattern.
///
/// The configuration only describes *how* to export: which templates to use, where the
/// stylesheet goes and whether pages are assembled in parallel. The book itself is passed
/// to [`convert`](HtmldirConfig::convert).
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use htmldir::prelude::*;
/// let config = HtmldirConfig::builder()
///     .page_template_path(PathBuf::from("./theme/page.html"))
///     .css_filename("book.css")
///     .build()
///     .expect("Invalid configuration");
/// ```
#[derive(Debug, Clone, serde::Serialize, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct HtmldirConfig {
    /// Template source for `index.html`. Uses the bundled template when unset.
    #[builder(default)]
    pub index_template_path: Option<PathBuf>,

    /// Template source for every content page. Uses the bundled template when unset.
    #[builder(default)]
    pub page_template_path: Option<PathBuf>,

    /// Stylesheet copied into the output root. Uses the bundled stylesheet when unset.
    #[builder(default)]
    pub css_template_path: Option<PathBuf>,

    /// Write into this directory instead of the one derived from the destination.
    ///
    /// The destination must still end with `.htmldir`.
    #[builder(default)]
    pub extract_to: Option<PathBuf>,

    /// File name of the shared stylesheet in the output root.
    #[builder(default = "DEFAULT_CSS_FILENAME.to_string()")]
    pub css_filename: String,

    /// Assemble content pages on the rayon thread pool.
    ///
    /// Output is identical either way; files are always written in spine order.
    #[builder(default = "true")]
    pub parallel_assembly: bool,
}

impl HtmldirConfig {
    /// Creates a new builder for configuring `HtmldirConfig`.
    pub fn builder() -> HtmldirConfigBuilder {
        HtmldirConfigBuilder::default()
    }

    /// Validates the configuration against a destination without writing anything.
    ///
    /// Checks that `destination` ends with `.htmldir` and that every template override
    /// exists. [`convert`](HtmldirConfig::convert) calls this first.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use htmldir::prelude::*;
    /// # fn main() -> htmldir::error::Result<()> {
    /// let config = HtmldirConfig::builder().build()?;
    /// config.preflight_check(Path::new("./out/My Book.htmldir"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn preflight_check(&self, destination: &Path) -> Result<&Self> {
        strip_file_type(destination)?;

        for path in self.template_overrides() {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "Template file does not exist: {:?}",
                    path
                )));
            }
            if !path.is_file() {
                return Err(Error::InvalidPath(
                    path.to_path_buf(),
                    "Template path is not a file.".to_string(),
                ));
            }
        }

        if let Some(directory) = &self.extract_to {
            if directory.exists() && !directory.is_dir() {
                return Err(Error::InvalidPath(
                    directory.clone(),
                    "extract_to is not a directory.".to_string(),
                ));
            }
        }

        Ok(self)
    }

    fn template_overrides(&self) -> impl Iterator<Item = &Path> {
        [
            &self.index_template_path,
            &self.page_template_path,
            &self.css_template_path,
        ]
        .into_iter()
        .flatten()
        .map(PathBuf::as_path)
    }

    /// Reads the configured overrides and compiles the template set.
    pub async fn load_templates(&self) -> Result<TemplateSet> {
        let index = read_source(self.index_template_path.as_deref(), DEFAULT_INDEX_TEMPLATE).await?;
        let page = read_source(self.page_template_path.as_deref(), DEFAULT_PAGE_TEMPLATE).await?;
        let css = read_source(self.css_template_path.as_deref(), DEFAULT_CSS).await?;
        TemplateSet::new(index, page, css)
    }

    /// Exports `book` as a directory of HTML pages.
    ///
    /// `destination` must end with `.htmldir`; output goes to the same path without the
    /// suffix (or to [`extract_to`](HtmldirConfig::extract_to) when set). Returns the
    /// directory that now holds the export. On failure the destination is left untouched.
    ///
    /// Spine items are released from memory as they are written, so a book can only be
    /// exported once.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use htmldir::prelude::*;
    /// # #[tokio::main]
    /// # async fn main() -> htmldir::error::Result<()> {
    /// let mut book = Book::new(EbookMetadata::default_with_title("Example"));
    /// book.add_spine_document(
    ///     "text/ch1.xhtml",
    ///     br#"<html xmlns="http://www.w3.org/1999/xhtml"><head/><body><p>Hi</p></body></html>"#,
    /// )?;
    ///
    /// let config = HtmldirConfig::builder().build()?;
    /// let output = config.convert(&mut book, Path::new("./out/example.htmldir")).await?;
    /// println!("Written to {:?}", output);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn convert(&self, book: &mut Book, destination: &Path) -> Result<PathBuf> {
        self.preflight_check(destination)?;
        if book.spine_len() == 0 {
            return Err(Error::EmptySpine);
        }

        let templates = self.load_templates().await?;
        info!(
            "Exporting '{}' ({} spine item(s), {} manifest item(s))",
            book.metadata.title().unwrap_or("Untitled"),
            book.spine_len(),
            book.manifest().len()
        );

        OutputWriter::new(&templates, &self.css_filename)
            .extract_to(self.extract_to.as_deref())
            .parallel_assembly(self.parallel_assembly)
            .run(book, destination)
            .await
    }
}

async fn read_source(path: Option<&Path>, fallback: &str) -> Result<String> {
    match path {
        Some(path) => {
            debug!("Loading template override {:?}", path);
            Ok(fs::read_to_string(path).await?)
        }
        None => Ok(fallback.to_string()),
    }
}

impl HtmldirConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(name) = &self.css_filename {
            if !name.ends_with(".css") || name.len() <= ".css".len() {
                return Err(format!("Stylesheet name must end with '.css': {}", name));
            }
            if name.contains(['/', '\\']) {
                return Err(format!(
                    "Stylesheet name must not contain a path separator: {}",
                    name
                ));
            }
        }
        Ok(())
    }
}
