/*!
 * Tests for SRT parsing, decoding and serialization
 */

use anyhow::Result;

use subtrad::errors::SubtitleError;
use subtrad::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use crate::common;

#[test]
fn test_parse_with_crlf_and_missing_separators_should_keep_all_blocks() {
    let content = "1\r\n00:00:01,000 --> 00:00:02,500\r\nFirst\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nSecond\r\nline\r\n\r\n\r\n3\r\n00:00:05,000 --> 00:00:06,000\r\n\r\n";
    let entries = SubtitleCollection::parse_srt_string(content);

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].original, "First");
    assert_eq!(entries[0].end_time_ms, 2500);
    assert_eq!(entries[1].original, "Second\nline");
    assert_eq!(entries[2].original, "");
}

#[test]
fn test_parse_with_bare_timing_line_should_number_sequentially() {
    let content = "00:00:01,000 --> 00:00:02,000\nOne\n\n00:00:03,000 --> 00:00:04,000\nTwo\n";
    let entries = SubtitleCollection::parse_srt_string(content);

    let seqs: Vec<usize> = entries.iter().map(|e| e.seq_num).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(entries[1].start_seconds(), 3.0);
}

#[test]
fn test_load_entries_with_utf16_bom_should_decode() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let text = "1\n00:00:01,000 --> 00:00:02,000\nCañón\n";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let path = temp_dir.path().join("utf16.srt");
    std::fs::write(&path, bytes)?;

    let entries = SubtitleCollection::load_entries(&path)?;
    assert_eq!(entries[0].original, "Cañón");
    Ok(())
}

#[test]
fn test_load_entries_with_windows_1252_should_decode() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut bytes = b"1\n00:00:01,000 --> 00:00:02,000\nCaf".to_vec();
    bytes.push(0xE9);
    bytes.push(b'\n');
    let path = temp_dir.path().join("latin.srt");
    std::fs::write(&path, bytes)?;

    let entries = SubtitleCollection::load_entries(&path)?;
    assert_eq!(entries[0].original, "Café");
    Ok(())
}

#[test]
fn test_load_entries_without_blocks_should_fail_with_empty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "empty.srt", "just some text\n")?;

    let result = SubtitleCollection::load_entries(&path);
    assert!(matches!(result, Err(SubtitleError::Empty(_))));
    Ok(())
}

#[test]
fn test_save_entries_should_prefer_translation_and_keep_timing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut first = SubtitleEntry::new(1, 1000, 2000, "Hello".to_string());
    first.translated = "Hola".to_string();
    let second = SubtitleEntry::new(2, 3000, 4000, "Untouched".to_string());

    let path = temp_dir.path().join("nested").join("out.srt");
    SubtitleCollection::save_entries(&[first, second], &path)?;

    let written = std::fs::read_to_string(&path)?;
    assert_eq!(
        written,
        "1\n00:00:01,000 --> 00:00:02,000\nHola\n\n2\n00:00:03,000 --> 00:00:04,000\nUntouched\n\n"
    );
    Ok(())
}
