//! CSV export of annotation results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::ExportError;
use crate::models::AnnotationResult;

/// UTF-8 byte-order mark, so spreadsheet tools pick the right encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Row terminator, as spreadsheet tools expect.
const ROW_END: &str = "\r\n";

/// Column header, fixed for every export.
pub const CSV_HEADER: [&str; 4] = ["file_path", "description", "tags", "analyzed_at"];

/// Append-only CSV writer for one run.
///
/// Opening truncates the target. Rows are flushed as they are written, and
/// the file is flushed and synced again when the writer is finished or
/// dropped.
pub struct CsvExporter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows: usize,
}

impl CsvExporter {
    /// Create (or truncate) `path` and write the BOM and header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::Open(path.clone(), e))?;
        }

        let file = File::create(&path).map_err(|e| ExportError::Open(path.clone(), e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(UTF8_BOM)?;
        write!(writer, "{}{}", CSV_HEADER.join(","), ROW_END)?;
        writer.flush()?;

        debug!("Opened export file {}", path.display());
        Ok(Self {
            path,
            writer: Some(writer),
            rows: 0,
        })
    }

    /// Number of data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write one row for `result`.
    pub fn append(&mut self, result: &AnnotationResult) -> Result<(), ExportError> {
        let writer = self.writer.as_mut().ok_or(ExportError::Closed)?;

        write!(
            writer,
            "{},{},{},{}{}",
            escape_csv(&result.file_path),
            escape_csv(&result.description),
            escape_csv(&result.tags_joined()),
            escape_csv(&result.analyzed_at_iso()),
            ROW_END,
        )?;
        writer.flush()?;

        self.rows += 1;
        Ok(())
    }

    /// Flush and sync to disk, closing the file.
    pub fn finish(mut self) -> Result<usize, ExportError> {
        self.close()?;
        Ok(self.rows)
    }

    fn close(&mut self) -> Result<(), ExportError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

impl Drop for CsvExporter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close export file {}: {}", self.path.display(), e);
        }
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageAnnotation;
    use chrono::Local;
    use tempfile::tempdir;

    fn result(path: &str, description: &str, tags: &[&str]) -> AnnotationResult {
        AnnotationResult::with_timestamp(
            path,
            ImageAnnotation {
                description: description.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            Local::now(),
        )
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a, b"), "\"a, b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("line1\nline2"), "\"line1\nline2\"");
        assert_eq!(escape_csv("cr\rhere"), "\"cr\rhere\"");
        assert_eq!(escape_csv(""), "");
    }

    #[test]
    fn test_header_and_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let exporter = CsvExporter::create(&path).unwrap();
        assert_eq!(exporter.finish().unwrap(), 0);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "file_path,description,tags,analyzed_at\r\n");
    }

    #[test]
    fn test_rows_end_with_crlf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut exporter = CsvExporter::create(&path).unwrap();
        let row = result("a.jpg", "two\nlines", &["x"]);
        exporter.append(&row).unwrap();
        exporter.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_start_matches('\u{feff}'),
            format!(
                "file_path,description,tags,analyzed_at\r\na.jpg,\"two\nlines\",x,{}\r\n",
                row.analyzed_at_iso()
            )
        );
    }

    #[test]
    fn test_rows_are_escaped_and_counted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut exporter = CsvExporter::create(&path).unwrap();

        let first = result("img/a.jpg", "A dog, running", &["a", "b", "c", "d", "e"]);
        let second = result("img/b.png", "夕焼けのビーチ", &[]);
        exporter.append(&first).unwrap();
        exporter.append(&second).unwrap();
        assert_eq!(exporter.finish().unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            format!(
                "img/a.jpg,\"A dog, running\",\"a, b, c, d, e\",{}",
                first.analyzed_at_iso()
            )
        );
        assert_eq!(
            lines[2],
            format!("img/b.png,夕焼けのビーチ,,{}", second.analyzed_at_iso())
        );
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut exporter = CsvExporter::create(&path).unwrap();
        exporter.append(&result("a.jpg", "one", &[])).unwrap();
        exporter.append(&result("b.jpg", "two", &[])).unwrap();
        exporter.finish().unwrap();

        // Same path again in a new run: one row, not three.
        let mut exporter = CsvExporter::create(&path).unwrap();
        exporter.append(&result("a.jpg", "again", &[])).unwrap();
        exporter.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("again"));
        assert!(!text.contains("two"));
    }

    #[test]
    fn test_rows_visible_before_finish() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut exporter = CsvExporter::create(&path).unwrap();
        exporter.append(&result("a.jpg", "one", &[])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        drop(exporter);
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        {
            let mut exporter = CsvExporter::create(&path).unwrap();
            exporter.append(&result("a.jpg", "one", &[])).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports/2026/out.csv");
        CsvExporter::create(&path).unwrap().finish().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unopenable_target_is_error() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as the export file.
        let err = CsvExporter::create(dir.path()).err().unwrap();
        assert!(matches!(err, ExportError::Open(..)));
    }
}
