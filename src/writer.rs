//! Materializes an export on disk.
//!
//! The whole tree is built inside a private working directory first. Only when
//! every page and asset has been written are the entries moved into the target
//! directory, so a failed run never leaves a half-overwritten destination.

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::assembler::PageAssembler;
use crate::error::{Error, Result};
use crate::path_utils::{join_href, normalize_extension, path_to_string_lossy};
use crate::template::TemplateSet;
use crate::types::{Book, ItemPayload};

/// Suffix a destination path must carry; it is stripped to get the output directory.
pub const FILE_TYPE: &str = "htmldir";
/// Name of the generated navigation entry point.
pub const INDEX_FILENAME: &str = "index.html";
/// Name of the JSON metadata sidecar.
pub const METADATA_FILENAME: &str = "metadata.json";
/// Default name of the shared stylesheet, chosen not to clash with book resources.
pub const DEFAULT_CSS_FILENAME: &str = "htmldirBasicCss.css";

/// Writes a [`Book`] as a directory of HTML pages.
pub struct OutputWriter<'a> {
    templates: &'a TemplateSet,
    css_filename: &'a str,
    extract_to: Option<&'a Path>,
    parallel_assembly: bool,
}

impl<'a> OutputWriter<'a> {
    pub fn new(templates: &'a TemplateSet, css_filename: &'a str) -> Self {
        Self {
            templates,
            css_filename,
            extract_to: None,
            parallel_assembly: true,
        }
    }

    /// Writes into `directory` instead of the directory derived from the destination.
    pub fn extract_to(mut self, directory: Option<&'a Path>) -> Self {
        self.extract_to = directory;
        self
    }

    /// Whether content pages are assembled on the rayon thread pool.
    pub fn parallel_assembly(mut self, parallel: bool) -> Self {
        self.parallel_assembly = parallel;
        self
    }

    /// Runs the full export and returns the directory the output was moved into.
    ///
    /// `destination` must end with `.htmldir`; the suffix is stripped to obtain the
    /// output directory. Existing entries there that share a name with generated
    /// ones are replaced.
    pub async fn run(&self, book: &mut Book, destination: &Path) -> Result<PathBuf> {
        self.check_output_paths(book)?;

        let work_dir = tempfile::Builder::new().prefix("htmldir-").tempdir()?;
        let root = work_dir.path();
        info!(
            "Building {} page(s) in working directory {}",
            book.spine_len(),
            path_to_string_lossy(root)
        );

        self.build_tree(book, root).await?;

        let target = self.target_directory(destination)?;
        fs::create_dir_all(&target).await?;
        promote(root, &target).await?;
        relocate_payloads(book, root, &target);

        work_dir.close()?;
        info!("Export written to {}", path_to_string_lossy(&target));
        Ok(target)
    }

    /// Resolves the real output directory for `destination`.
    pub fn target_directory(&self, destination: &Path) -> Result<PathBuf> {
        let stripped = strip_file_type(destination)?;
        Ok(match self.extract_to {
            Some(directory) => directory.to_path_buf(),
            None => stripped,
        })
    }

    /// Fails if two outputs would land on the same file.
    ///
    /// Every asset and every (renamed) page must map to its own path, and none may
    /// take the place of the stylesheet, `index.html` or `metadata.json`.
    pub fn check_output_paths(&self, book: &Book) -> Result<()> {
        let root = Path::new("");
        let mut taken: HashSet<PathBuf> = [self.css_filename, INDEX_FILENAME, METADATA_FILENAME]
            .into_iter()
            .map(|name| root.join(name))
            .collect();

        for item in book.manifest() {
            let output = match item.spine_position {
                Some(_) => normalize_extension(&item.href),
                None => item.href.clone(),
            };
            if !taken.insert(join_href(root, &output)?) {
                return Err(Error::DuplicateHref(format!(
                    "{} would overwrite another output file",
                    item.href
                )));
            }
        }
        Ok(())
    }

    async fn build_tree(&self, book: &mut Book, root: &Path) -> Result<()> {
        fs::write(root.join(self.css_filename), self.templates.css()).await?;

        let index = PageAssembler::new(book, self.templates, self.css_filename, INDEX_FILENAME)
            .assemble_index()?;
        fs::write(root.join(INDEX_FILENAME), index).await?;

        let metadata = serde_json::to_vec(&book.metadata)?;
        fs::write(root.join(METADATA_FILENAME), metadata).await?;

        self.write_assets(book, root).await?;

        let pages = self.assemble_pages(book)?;
        self.write_pages(book, root, pages).await
    }

    async fn write_assets(&self, book: &mut Book, root: &Path) -> Result<()> {
        for item in book
            .manifest_mut()
            .iter_mut()
            .filter(|item| item.spine_position.is_none())
        {
            let path = join_href(root, &item.href)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            {
                let bytes = item.bytes_representation()?;
                fs::write(&path, &bytes).await?;
            }
            item.unload_data_from_memory(&path);
            debug!("Copied asset {} ({})", item.href, item.media_type);
        }
        Ok(())
    }

    fn assemble_pages(&self, book: &Book) -> Result<Vec<String>> {
        let assembler = PageAssembler::new(book, self.templates, self.css_filename, INDEX_FILENAME);
        let positions = 0..book.spine_len();
        if self.parallel_assembly {
            positions
                .into_par_iter()
                .map(|position| assembler.assemble_page(position))
                .collect()
        } else {
            positions
                .map(|position| assembler.assemble_page(position))
                .collect()
        }
    }

    async fn write_pages(&self, book: &mut Book, root: &Path, pages: Vec<String>) -> Result<()> {
        for (position, page) in pages.into_iter().enumerate() {
            let item = book.spine_item_mut(position).ok_or_else(|| {
                Error::NotFound(format!("no spine item at position {}", position))
            })?;
            let original = join_href(root, &item.href)?;
            let path = join_href(root, &normalize_extension(&item.href))?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, page).await?;
            item.unload_data_from_memory(&path);
            debug!("Wrote page {} ({})", position, item.href);

            if original != path && fs::try_exists(&original).await? {
                fs::remove_file(&original).await?;
                debug!("Removed pre-rename file {}", path_to_string_lossy(&original));
            }
        }
        Ok(())
    }
}

/// Strips the `.htmldir` suffix from a destination path.
pub fn strip_file_type(destination: &Path) -> Result<PathBuf> {
    let suffix = format!(".{}", FILE_TYPE);
    let stem = destination
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(suffix.as_str()))
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            Error::InvalidPath(
                destination.to_path_buf(),
                format!("Destination must end with '{}'", suffix),
            )
        })?;
    Ok(destination.with_file_name(stem))
}

/// Moves every top-level entry of `work_dir` into `target`, replacing same-named entries.
async fn promote(work_dir: &Path, target: &Path) -> Result<()> {
    let mut entries = fs::read_dir(work_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let from = entry.path();
        let to = target.join(entry.file_name());
        remove_existing(&to).await?;

        if let Err(e) = fs::rename(&from, &to).await {
            warn!(
                "Rename of {} failed ({}), copying instead",
                path_to_string_lossy(&from),
                e
            );
            copy_recursively(&from, &to).await?;
            remove_existing(&from).await?;
        }
        debug!("Promoted {}", path_to_string_lossy(&to));
    }
    Ok(())
}

async fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(fs::remove_dir_all(path).await?),
        Ok(_) => Ok(fs::remove_file(path).await?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn copy_recursively(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source, destination)) = pending.pop() {
        if fs::metadata(&source).await?.is_dir() {
            fs::create_dir_all(&destination).await?;
            let mut entries = fs::read_dir(&source).await?;
            while let Some(entry) = entries.next_entry().await? {
                pending.push((entry.path(), destination.join(entry.file_name())));
            }
        } else {
            fs::copy(&source, &destination).await?;
        }
    }
    Ok(())
}

/// Points released payloads at their promoted location.
fn relocate_payloads(book: &mut Book, work_dir: &Path, target: &Path) {
    for item in book.manifest_mut() {
        let relocated = match item.payload() {
            ItemPayload::OnDisk(path) => path.strip_prefix(work_dir).ok().map(|rel| target.join(rel)),
            _ => None,
        };
        if let Some(path) = relocated {
            item.unload_data_from_memory(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EbookMetadata;

    const PAGE: &[u8] =
        br#"<html xmlns="http://www.w3.org/1999/xhtml"><head/><body><p>x</p></body></html>"#;

    fn book_with_asset(href: &str) -> Book {
        let mut book = Book::new(EbookMetadata::default_with_title("Paths"));
        book.add_spine_document("text/ch1.xhtml", PAGE).unwrap();
        book.add_asset(href, "text/css", b"p {}".to_vec()).unwrap();
        book
    }

    #[test]
    fn test_generated_files_cannot_be_overwritten() {
        let templates = TemplateSet::builtin().unwrap();
        let writer = OutputWriter::new(&templates, DEFAULT_CSS_FILENAME);

        assert!(writer.check_output_paths(&book_with_asset("stylesheet.css")).is_ok());
        for href in [DEFAULT_CSS_FILENAME, "index.html", "metadata.json", "./index.html"] {
            let result = writer.check_output_paths(&book_with_asset(href));
            assert!(matches!(result, Err(Error::DuplicateHref(_))), "{}", href);
        }

        let writer = OutputWriter::new(&templates, "stylesheet.css");
        assert!(matches!(
            writer.check_output_paths(&book_with_asset("stylesheet.css")),
            Err(Error::DuplicateHref(_))
        ));
    }

    #[test]
    fn test_renamed_pages_cannot_collide() {
        let templates = TemplateSet::builtin().unwrap();
        let writer = OutputWriter::new(&templates, DEFAULT_CSS_FILENAME);

        let mut book = book_with_asset("text/ch1.html");
        assert!(matches!(
            writer.check_output_paths(&book),
            Err(Error::DuplicateHref(_))
        ));

        book = Book::new(EbookMetadata::default_with_title("Index page"));
        book.add_spine_document("index.xhtml", PAGE).unwrap();
        assert!(writer.check_output_paths(&book).is_err());
    }

    #[test]
    fn test_strip_file_type() {
        assert_eq!(
            strip_file_type(Path::new("/out/My Book.htmldir")).unwrap(),
            PathBuf::from("/out/My Book")
        );
        assert_eq!(
            strip_file_type(Path::new("book.htmldir")).unwrap(),
            PathBuf::from("book")
        );
        assert!(strip_file_type(Path::new("/out/book.zip")).is_err());
        assert!(strip_file_type(Path::new("/out/.htmldir")).is_err());
    }
}
