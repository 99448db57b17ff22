/*!
 * Timing repair for translated subtitle files.
 *
 * Takes the timing and numbering of an original file and the text of a
 * translated one, pairing blocks by position. Surplus blocks on either side
 * are reported and left out.
 */

use std::path::Path;

use log::{info, warn};

use crate::errors::SubtitleError;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

/// What `align_blocks` had to correct or drop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFixReport {
    /// Blocks written
    pub aligned: usize,
    /// Translated blocks beyond the original's count, dropped
    pub extra_translated: usize,
    /// Original blocks without a translated counterpart
    pub missing_translated: usize,
    /// Pairs whose timing differed and was replaced
    pub timing_mismatches: usize,
}

/// Pair blocks by position: original seq and timing, translated text
pub fn align_blocks(original: &[SubtitleEntry], translated: &[SubtitleEntry]) -> (Vec<SubtitleEntry>, TimeFixReport) {
    let count = original.len().min(translated.len());
    let mut report = TimeFixReport {
        aligned: count,
        extra_translated: translated.len().saturating_sub(count),
        missing_translated: original.len().saturating_sub(count),
        timing_mismatches: 0,
    };

    if original.len() != translated.len() {
        warn!(
            "Block count differs: original={} translated={}",
            original.len(),
            translated.len()
        );
    }

    let fixed = original
        .iter()
        .zip(translated)
        .map(|(o, t)| {
            if !o.same_timing(t) {
                report.timing_mismatches += 1;
            }
            SubtitleEntry {
                seq_num: o.seq_num,
                start_time_ms: o.start_time_ms,
                end_time_ms: o.end_time_ms,
                original: o.original.clone(),
                translated: t.display_text().to_string(),
            }
        })
        .collect();

    if report.extra_translated > 0 {
        warn!("{} extra translated blocks will be ignored", report.extra_translated);
    }
    if report.missing_translated > 0 {
        warn!(
            "{} translated blocks are missing; their original timing is not written",
            report.missing_translated
        );
    }
    if report.timing_mismatches > 0 {
        warn!("{} of {} blocks had mismatched timing", report.timing_mismatches, count);
    }

    (fixed, report)
}

/// Read both files, align them and write the result to `out_path`
pub fn fix_file<P1, P2, P3>(original_path: P1, translated_path: P2, out_path: P3) -> Result<TimeFixReport, SubtitleError>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    P3: AsRef<Path>,
{
    let original = SubtitleCollection::load_entries(original_path)?;
    let translated = SubtitleCollection::load_entries(translated_path)?;

    let (fixed, report) = align_blocks(&original, &translated);
    SubtitleCollection::save_entries(&fixed, out_path.as_ref())?;

    info!(
        "Saved corrected file to {} ({} timing fixes in {} blocks)",
        out_path.as_ref().display(),
        report.timing_mismatches,
        report.aligned
    );
    Ok(report)
}
