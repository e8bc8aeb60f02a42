//! The folder of uploaded PDF study materials and their extracted text.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Number of distinct document selections whose text is kept in memory.
const TEXT_CACHE_ENTRIES: usize = 3;

/// Represents possible errors that can occur during document operations.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Filesystem access failed.
    #[error("Document file error for {}: {source}", .path.display())]
    Io {
        /// File or folder involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// Only PDF files can be added to the library.
    #[error("Not a PDF file: {}", .0.display())]
    NotPdf(PathBuf),
    /// The path has no usable file name.
    #[error("Invalid file name: {}", .0.display())]
    InvalidName(PathBuf),
}

/// The PDFs available for study, stored by original file name.
#[derive(Debug)]
pub struct DocumentLibrary {
    dir: PathBuf,
    cache: Mutex<VecDeque<(Vec<String>, String)>>,
}

impl DocumentLibrary {
    /// Opens the library, creating the folder if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| DocumentError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            cache: Mutex::new(VecDeque::with_capacity(TEXT_CACHE_ENTRIES)),
        })
    }

    /// The folder holding the PDFs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies a PDF into the library, replacing any file with the same name.
    ///
    /// Returns the stored file name.
    pub fn save_upload(&self, source: &Path) -> Result<String, DocumentError> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DocumentError::InvalidName(source.to_path_buf()))?
            .to_string();

        let is_pdf = mime_guess::from_path(source)
            .first()
            .is_some_and(|mime| mime.essence_str() == "application/pdf");
        if !is_pdf {
            return Err(DocumentError::NotPdf(source.to_path_buf()));
        }

        let target = self.dir.join(&name);
        fs::copy(source, &target).map_err(|source| DocumentError::Io {
            path: target.clone(),
            source,
        })?;
        tracing::info!(%name, "stored document");
        Ok(name)
    }

    /// File names of the stored PDFs, sorted.
    pub fn list(&self) -> Result<Vec<String>, DocumentError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| DocumentError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".pdf"))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Concatenated text of the selected PDFs, each followed by a newline.
    ///
    /// Files that cannot be read are skipped. The last few selections are
    /// served from memory.
    pub fn extract_text(&self, selection: &[String]) -> String {
        if let Some(text) = self.cached(selection) {
            return text;
        }

        let mut text = String::new();
        for name in selection {
            let Some(path) = self.document_path(name) else {
                tracing::warn!(%name, "skipping document outside the library");
                continue;
            };
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(%name, error = %e, "skipping missing document");
                    continue;
                }
            };
            match pdf_extract::extract_text_from_mem(&bytes) {
                Ok(content) => {
                    text.push_str(&content);
                    text.push('\n');
                }
                Err(e) => {
                    tracing::warn!(%name, error = %e, "skipping unreadable document");
                }
            }
        }

        self.remember(selection, &text);
        text
    }

    /// Path of a stored document; `None` unless `name` is a bare file name.
    fn document_path(&self, name: &str) -> Option<PathBuf> {
        Path::new(name)
            .file_name()
            .filter(|file_name| *file_name == name)
            .map(|file_name| self.dir.join(file_name))
    }

    fn cached(&self, selection: &[String]) -> Option<String> {
        let cache = self.cache.lock().ok()?;
        cache
            .iter()
            .find(|(key, _)| key.as_slice() == selection)
            .map(|(_, text)| text.clone())
    }

    pub(crate) fn remember(&self, selection: &[String], text: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() == TEXT_CACHE_ENTRIES {
                cache.pop_front();
            }
            cache.push_back((selection.to_vec(), text.to_string()));
        }
    }
}

/// Cuts `text` to at most `budget` characters.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_below_budget_is_identity() {
        assert_eq!(truncate_chars("", 10), "");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 800_000), "abc");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn rejects_non_pdf_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let library = DocumentLibrary::open(dir.path().join("docs")).unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "hola").unwrap();
        assert!(matches!(
            library.save_upload(&notes),
            Err(DocumentError::NotPdf(_))
        ));
    }

    #[test]
    fn unreadable_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let library = DocumentLibrary::open(dir.path()).unwrap();
        fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();
        let text = library.extract_text(&["broken.pdf".to_string(), "missing.pdf".to_string()]);
        assert_eq!(text, "");
    }

    #[test]
    fn only_bare_names_resolve_inside_the_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = DocumentLibrary::open(dir.path().join("docs")).unwrap();
        assert_eq!(
            library.document_path("tema1.pdf"),
            Some(dir.path().join("docs").join("tema1.pdf"))
        );
        assert_eq!(library.document_path("../outside.pdf"), None);
        assert_eq!(library.document_path("sub/inner.pdf"), None);
        assert_eq!(library.document_path(".."), None);
    }

    #[test]
    fn cache_keeps_last_three_selections() {
        let dir = tempfile::tempdir().unwrap();
        let library = DocumentLibrary::open(dir.path()).unwrap();
        for i in 0..4 {
            library.remember(&[format!("{i}.pdf")], &format!("text {i}"));
        }
        assert_eq!(library.cached(&["0.pdf".to_string()]), None);
        assert_eq!(
            library.cached(&["3.pdf".to_string()]),
            Some("text 3".to_string())
        );
    }
}
