/*!
 * Deduplication of subtitle text before translation.
 *
 * Repeated lines are translated once. The plan records, for each original
 * line, which unique key it maps to so results can be fanned back out in
 * original order and cardinality.
 */

use std::collections::HashMap;

use crate::errors::TranslationError;

/// Mapping from original lines to unique trimmed keys
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DedupPlan {
    /// Unique trimmed texts in first-occurrence order
    pub unique: Vec<String>,

    /// For each original line, its position in `unique`; None for blank lines
    pub mapping: Vec<Option<usize>>,
}

impl DedupPlan {
    /// Number of original lines
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// All original indices whose line maps to unique key `k`
    pub fn positions_of(&self, k: usize) -> Vec<usize> {
        self.mapping
            .iter()
            .enumerate()
            .filter_map(|(i, m)| (*m == Some(k)).then_some(i))
            .collect()
    }

    /// Inverted mapping: for every unique key, the original indices using it
    pub fn positions(&self) -> Vec<Vec<usize>> {
        let mut positions = vec![Vec::new(); self.unique.len()];
        for (i, m) in self.mapping.iter().enumerate() {
            if let Some(k) = m {
                positions[*k].push(i);
            }
        }
        positions
    }
}

/// Build the dedup plan for a list of lines
pub fn deduplicate<S: AsRef<str>>(lines: &[S]) -> DedupPlan {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut plan = DedupPlan {
        unique: Vec::new(),
        mapping: Vec::with_capacity(lines.len()),
    };

    for line in lines {
        let key = line.as_ref().trim();
        if key.is_empty() {
            plan.mapping.push(None);
            continue;
        }

        let k = *seen.entry(key).or_insert_with(|| {
            plan.unique.push(key.to_string());
            plan.unique.len() - 1
        });
        plan.mapping.push(Some(k));
    }

    plan
}

/// Expand per-key translations back to one output per original line
pub fn recompose(plan: &DedupPlan, translations: &[String]) -> Result<Vec<String>, TranslationError> {
    if translations.len() != plan.unique.len() {
        return Err(TranslationError::CardinalityMismatch {
            expected: plan.unique.len(),
            actual: translations.len(),
        });
    }

    Ok(plan
        .mapping
        .iter()
        .map(|m| m.map(|k| translations[k].clone()).unwrap_or_default())
        .collect())
}
