/*!
 * Batch planning for translation requests.
 *
 * Texts are partitioned into contiguous batches bounded by a line count and
 * a character count. An item that alone exceeds the character bound gets a
 * batch of its own. Concatenating the batches' indices reproduces `0..N`.
 */

use log::debug;

/// A contiguous slice of the list being translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkBatch {
    /// Texts in this batch
    pub texts: Vec<String>,

    /// Absolute positions of the texts in the batched list
    pub indices: Vec<usize>,
}

impl WorkBatch {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Total size in Unicode scalar values
    pub fn char_count(&self) -> usize {
        self.texts.iter().map(|t| t.chars().count()).sum()
    }
}

/// Partition `texts` into batches of at most `max_lines` items and
/// `max_chars` characters.
pub fn plan_batches<S: AsRef<str>>(texts: &[S], max_lines: usize, max_chars: usize) -> Vec<WorkBatch> {
    let max_lines = max_lines.max(1);
    let mut batches = Vec::new();
    let mut current = WorkBatch {
        texts: Vec::new(),
        indices: Vec::new(),
    };
    let mut current_chars = 0;

    for (index, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        let len = text.chars().count();

        if !current.is_empty() && (current.len() >= max_lines || current_chars + len > max_chars) {
            batches.push(std::mem::replace(
                &mut current,
                WorkBatch {
                    texts: Vec::new(),
                    indices: Vec::new(),
                },
            ));
            current_chars = 0;
        }

        current.texts.push(text.to_string());
        current.indices.push(index);
        current_chars += len;
    }

    if !current.is_empty() {
        batches.push(current);
    }

    debug!(
        "Planned {} batches for {} texts (max {} lines / {} chars)",
        batches.len(),
        texts.len(),
        max_lines,
        max_chars
    );
    batches
}
