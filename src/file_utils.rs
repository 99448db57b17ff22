use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::SubtitleError;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

// @module: File and directory utilities

/// Prefix of the directory translated files are written to
pub const OUTPUT_DIR_PREFIX: &str = "Subtitles_";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory, sorted by path.
    /// Output directories written by earlier runs are skipped.
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let mut result = Vec::new();

        let walker = WalkDir::new(dir.as_ref()).follow_links(true).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with(OUTPUT_DIR_PREFIX))
        });

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
            {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }
}

/// Writes translated entries next to their source file.
///
/// The output lives at `<input dir>/Subtitles_<lang>/<stem>_<lang>.<ext>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputWriter;

impl OutputWriter {
    // @generates: Output path for translated subtitle
    pub fn output_path<P: AsRef<Path>>(input_file: P, target_language: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let parent = input_file.parent().unwrap_or_else(|| Path::new(""));
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let extension = input_file
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "srt".to_string());

        parent
            .join(format!("{}{}", OUTPUT_DIR_PREFIX, target_language))
            .join(format!("{}_{}.{}", stem, target_language, extension))
    }

    /// Serialize entries to the output path for `input_file`
    pub fn write<P: AsRef<Path>>(
        &self,
        input_file: P,
        entries: &[SubtitleEntry],
        target_language: &str,
    ) -> Result<PathBuf, SubtitleError> {
        let output_path = Self::output_path(input_file, target_language);
        SubtitleCollection::save_entries(entries, &output_path)?;
        info!("Wrote {} entries to {}", entries.len(), output_path.display());
        Ok(output_path)
    }
}
