//! Output packaging
//!
//! Generated documents are kept in memory as `(file name, bytes)` pairs,
//! optionally persisted under a per-run directory, and bundled into a single
//! zip archive for download.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::Result;

/// File name of the downloadable archive
pub const ARCHIVE_NAME: &str = "Filled_Forms.zip";

/// One generated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl GeneratedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Bundle `files` into a deflate-compressed zip archive, in order
pub fn package_archive(files: &[GeneratedFile]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        writer.start_file(file.file_name.as_str(), options)?;
        writer.write_all(&file.bytes)?;
    }

    let archive = writer.finish()?.into_inner();
    tracing::debug!(files = files.len(), bytes = archive.len(), "Archive packaged");
    Ok(archive)
}

/// Create a fresh run directory under `output_dir`
///
/// Each run gets its own directory so concurrent runs never overwrite each
/// other's files.
pub fn create_run_dir(output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&run_dir)?;
    Ok(run_dir)
}

/// Persist `files` into `dir`, returning the written paths
pub fn write_outputs(dir: &Path, files: &[GeneratedFile]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    files
        .iter()
        .map(|file| {
            let path = dir.join(&file.file_name);
            std::fs::write(&path, &file.bytes)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn files() -> Vec<GeneratedFile> {
        vec![
            GeneratedFile::new("EFA_Batch_1.pdf", b"%PDF-first".to_vec()),
            GeneratedFile::new("EFA_Batch_2.pdf", b"%PDF-second".to_vec()),
        ]
    }

    #[test]
    fn test_archive_contains_files_in_order() {
        let archive = package_archive(&files()).unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), "EFA_Batch_1.pdf");
        let mut contents = Vec::new();
        first.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"%PDF-first");
        drop(first);

        assert_eq!(zip.by_index(1).unwrap().name(), "EFA_Batch_2.pdf");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let archive = package_archive(&[]).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_write_outputs_into_distinct_run_dirs() {
        let temp = TempDir::new().unwrap();
        let run_a = create_run_dir(temp.path()).unwrap();
        let run_b = create_run_dir(temp.path()).unwrap();
        assert_ne!(run_a, run_b);

        let written = write_outputs(&run_a, &files()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read(&written[1]).unwrap(), b"%PDF-second");
        assert!(std::fs::read_dir(&run_b).unwrap().next().is_none());
    }
}
