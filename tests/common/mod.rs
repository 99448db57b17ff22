/*!
 * Common test utilities for the subtrad test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use subtrad::subtitle_processor::SubtitleEntry;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = "1
00:00:01,000 --> 00:00:02,000
Hello

2
00:00:03,000 --> 00:00:04,000
Hello

3
00:00:05,000 --> 00:00:06,000
World
";
    create_test_file(dir, filename, content)
}

/// Build `count` entries, one second apart, cycling through `texts`
pub fn entries_from(texts: &[&str], count: usize) -> Vec<SubtitleEntry> {
    (0..count)
        .map(|i| {
            let start = i as u64 * 1000;
            SubtitleEntry::new(i + 1, start, start + 900, texts[i % texts.len()].to_string())
        })
        .collect()
}

/// Owned lines from string slices
pub fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Route library logs through env_logger; safe to call from every test
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
