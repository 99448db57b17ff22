/*!
 * Tests for repairing the timing of translated files
 */

use anyhow::Result;

use subtrad::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use subtrad::timefix;

use crate::common;

#[test]
fn test_fix_file_with_missing_translated_block_should_write_shorter_file() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let original_path = temp_dir.path().join("original.srt");
    let translated_path = temp_dir.path().join("translated.srt");
    let out_path = temp_dir.path().join("fixed.srt");

    let original = common::entries_from(&["one", "two", "three", "four", "five"], 5);
    let translated: Vec<SubtitleEntry> = ["uno", "dos", "tres", "cuatro"]
        .iter()
        .enumerate()
        .map(|(i, text)| SubtitleEntry::new(i + 1, i as u64 * 1000 + 250, i as u64 * 1000 + 800, text.to_string()))
        .collect();
    SubtitleCollection::save_entries(&original, &original_path)?;
    SubtitleCollection::save_entries(&translated, &translated_path)?;

    let report = timefix::fix_file(&original_path, &translated_path, &out_path)?;

    assert_eq!(report.aligned, 4);
    assert_eq!(report.missing_translated, 1);
    assert_eq!(report.extra_translated, 0);
    assert_eq!(report.timing_mismatches, 4);

    let fixed = SubtitleCollection::load_entries(&out_path)?;
    assert_eq!(fixed.len(), 4);
    for (i, entry) in fixed.iter().enumerate() {
        assert!(entry.same_timing(&original[i]));
        assert_eq!(entry.seq_num, original[i].seq_num);
        assert_eq!(entry.original, translated[i].original);
    }
    Ok(())
}
