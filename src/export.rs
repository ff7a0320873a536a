//! Spreadsheet export of analysed comments.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::youtube::Comment;

pub const SHARED_EXPORT_FILE: &str = "youtube_comments.xlsx";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADERS: [&str; 5] = ["author", "text", "likes", "published_at", "sentiment"];

/// Builds the workbook bytes: a header row, then one row per comment.
pub fn build_workbook(comments: &[Comment]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, comment) in comments.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string(row, 0, comment.author.as_str())?;
        worksheet.write_string(row, 1, comment.text.as_str())?;
        worksheet.write_number(row, 2, comment.like_count as f64)?;
        worksheet.write_string(
            row,
            3,
            &comment.published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        let sentiment = comment.sentiment.map(|s| s.as_str()).unwrap_or("");
        worksheet.write_string(row, 4, sentiment)?;
    }
    worksheet.set_column_width(1, 80.0)?;
    worksheet.set_column_width(3, 22.0)?;

    workbook.save_to_buffer().context("Failed to build spreadsheet")
}

/// Writes exports into one directory, either per run or to one shared file.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
    per_run: bool,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, per_run: bool) -> Self {
        Self { dir: dir.into(), per_run }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_file_name(&self) -> String {
        if self.per_run {
            format!("youtube_comments_{}.xlsx", uuid::Uuid::new_v4().simple())
        } else {
            SHARED_EXPORT_FILE.to_string()
        }
    }

    /// Writes the spreadsheet and returns its file name inside the export directory.
    pub async fn export(&self, comments: &[Comment]) -> Result<String> {
        let bytes = build_workbook(comments)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create export directory {}", self.dir.display()))?;

        let file_name = self.next_file_name();
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("💾 Exported {} comments to {}", comments.len(), path.display());
        Ok(file_name)
    }

    /// Resolves a download name to a path, or `None` if it is not a plain `.xlsx` name.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        is_safe_file_name(file_name).then(|| self.dir.join(file_name))
    }
}

/// Plain `.xlsx` names only: no separators, no parent references, no hidden files.
pub fn is_safe_file_name(file_name: &str) -> bool {
    !file_name.is_empty()
        && !file_name.starts_with('.')
        && !file_name.contains("..")
        && file_name.ends_with(".xlsx")
        && file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
