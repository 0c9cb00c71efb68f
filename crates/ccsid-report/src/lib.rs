//! ccsid-report - text and HTML renderings of codepage tables
//!
//! Every table gets an `IBM-<ccsid>.txt` listing; single-byte tables also get
//! an `IBM-<ccsid>.html` grid. Entries that do not decode as exactly one
//! UTF-16 character are marked in place rather than failing the report.

pub mod chars;
pub mod html;
pub mod text;

use ccsid_bridge::{CodepageTable, EncodingScheme};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use chars::{CharDatabase, UnicodeDatabase};
pub use html::render_html;
pub use text::render_text;

/// Report errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Which reports to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Write the HTML grid for single-byte tables
    pub html: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { html: true }
    }
}

/// Files produced for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReports {
    pub text: PathBuf,
    pub html: Option<PathBuf>,
}

/// `IBM-037.txt` style file name
pub fn report_file_name(ccsid: u32, extension: &str) -> String {
    format!("IBM-{:03}.{}", ccsid, extension)
}

/// Write the reports of `table` into `directory`, creating it if needed
pub fn write_reports<D: CharDatabase>(
    table: &CodepageTable,
    directory: &Path,
    db: &D,
    options: ReportOptions,
) -> ReportResult<WrittenReports> {
    fs::create_dir_all(directory).map_err(|error| ReportError::Io {
        path: directory.to_path_buf(),
        error,
    })?;

    let text = directory.join(report_file_name(table.ccsid(), "txt"));
    write_file(&text, &render_text(table, db))?;

    let html = if options.html && table.scheme() == EncodingScheme::SingleByte {
        match render_html(table, db) {
            Some(content) => {
                let path = directory.join(report_file_name(table.ccsid(), "html"));
                write_file(&path, &content)?;
                Some(path)
            }
            None => None,
        }
    } else {
        None
    };

    Ok(WrittenReports { text, html })
}

fn write_file(path: &Path, content: &str) -> ReportResult<()> {
    fs::write(path, content).map_err(|error| ReportError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "wrote report");
    Ok(())
}
