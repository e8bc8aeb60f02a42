//! Writing answers out of the chat.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use docx_rs::{Docx, Paragraph, Run, RunFonts, Style, StyleType};
use thiserror::Error;

use crate::prompt::StudyMode;

/// File name used for table exports.
pub const CSV_FILE_NAME: &str = "datos.csv";

const REPORT_TITLE: &str = "Study report";
const HEADING_1: &str = "Heading1";
const HEADING_2: &str = "Heading2";
const TITLE: &str = "Title";
const LIST_BULLET: &str = "ListBullet";

/// Represents possible errors when exporting an answer.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Filesystem access failed.
    #[error("Export file error for {}: {source}", .path.display())]
    Io {
        /// File or folder involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// The Word document could not be packed.
    #[error("Failed to write Word document {}: {source}", .path.display())]
    Docx {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Whether an answer should be offered as a table export.
pub fn is_tabular(mode: StudyMode, answer: &str) -> bool {
    mode == StudyMode::Table || answer.contains('|')
}

/// Writes the answer verbatim to `datos.csv` in `dir`.
pub fn export_csv(dir: &Path, answer: &str) -> Result<PathBuf, ExportError> {
    create_dir(dir)?;
    let path = dir.join(CSV_FILE_NAME);
    fs::write(&path, answer).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// One paragraph of a Word export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `## ` is level 1, `### ` is level 2
    Heading {
        /// Outline level
        level: u8,
        /// Heading text
        text: String,
    },
    /// A line wrapped in `**`
    Bold(String),
    /// A line starting with `- ` or `* `, marker kept
    Bullet(String),
    /// Any other line, emphasis markers removed
    Paragraph(String),
}

/// Maps a markdown answer to Word paragraphs, one per non-blank line.
pub fn document_blocks(answer: &str) -> Vec<Block> {
    answer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if let Some(text) = line.strip_prefix("### ") {
                Block::Heading {
                    level: 2,
                    text: text.to_string(),
                }
            } else if let Some(text) = line.strip_prefix("## ") {
                Block::Heading {
                    level: 1,
                    text: text.to_string(),
                }
            } else if line.starts_with("**") && line.ends_with("**") {
                Block::Bold(line.replace("**", ""))
            } else {
                let clean = line.replace("**", "").replace("__", "");
                if clean.starts_with("- ") || clean.starts_with("* ") {
                    Block::Bullet(clean)
                } else {
                    Block::Paragraph(clean)
                }
            }
        })
        .collect()
}

/// File name for a Word export made at `at`.
pub fn docx_file_name(at: DateTime<Local>) -> String {
    format!("Report_{}.docx", at.format("%H%M"))
}

/// Writes the answer as a Word document in `dir`, stamped with the current time.
pub fn export_docx(dir: &Path, answer: &str) -> Result<PathBuf, ExportError> {
    export_docx_at(dir, answer, Local::now())
}

/// Like [`export_docx`] with an explicit timestamp.
pub fn export_docx_at(
    dir: &Path,
    answer: &str,
    at: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    create_dir(dir)?;
    let path = dir.join(docx_file_name(at));

    let mut docx = Docx::new()
        .default_fonts(RunFonts::new().ascii("Segoe UI").hi_ansi("Segoe UI"))
        .default_size(22)
        .add_style(Style::new(TITLE, StyleType::Paragraph).name("Title").size(52))
        .add_style(
            Style::new(HEADING_1, StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new(HEADING_2, StyleType::Paragraph)
                .name("Heading 2")
                .size(26)
                .bold(),
        )
        .add_style(Style::new(LIST_BULLET, StyleType::Paragraph).name("List Bullet"))
        .add_paragraph(text_paragraph(REPORT_TITLE).style(TITLE))
        .add_paragraph(text_paragraph(&format!(
            "Generated on: {}",
            at.format("%d/%m/%Y at %H:%M")
        )))
        .add_paragraph(text_paragraph(&"_".repeat(50)));

    for block in document_blocks(answer) {
        let paragraph = match block {
            Block::Heading { level: 1, text } => text_paragraph(&text).style(HEADING_1),
            Block::Heading { text, .. } => text_paragraph(&text).style(HEADING_2),
            Block::Bold(text) => Paragraph::new().add_run(Run::new().add_text(text).bold()),
            Block::Bullet(text) => text_paragraph(&text).style(LIST_BULLET),
            Block::Paragraph(text) => text_paragraph(&text),
        };
        docx = docx.add_paragraph(paragraph);
    }

    let file = File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    docx.build().pack(file).map_err(|e| ExportError::Docx {
        path: path.clone(),
        source: e.into(),
    })?;
    tracing::info!(path = %path.display(), "exported Word document");
    Ok(path)
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
