use anyhow::{Result, anyhow};
use isolang::Language;
use log::debug;

/// Language utilities for ISO language code handling
///
/// Codes are validated and normalized with `isolang`; source detection for
/// backends that refuse "auto" goes through the `LanguageDetector` trait.

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Maximum number of non-empty lines sampled for detection
pub const DETECTION_SAMPLE_LINES: usize = 5;

/// Maximum number of characters sampled for detection
pub const DETECTION_SAMPLE_CHARS: usize = 500;

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let terminology = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| *t)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(terminology)
        }
        _ => None,
    }
}

/// Normalize a language code to ISO 639-1 when one exists, else ISO 639-3
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Detects the language of a text sample
pub trait LanguageDetector: Send + Sync + std::fmt::Debug {
    /// Returns an ISO 639-1 code (or 639-3 when no 639-1 exists), None if unsure
    fn detect(&self, sample: &str) -> Option<String>;
}

/// Trigram-based detector backed by `whatlang`; deterministic for a given input
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, sample: &str) -> Option<String> {
        let info = whatlang::detect(sample)?;
        let code = info.lang().code();
        debug!(
            "Detected language '{}' (confidence {:.2}, reliable: {})",
            code,
            info.confidence(),
            info.is_reliable()
        );
        normalize_to_part1_or_part2t(code).ok()
    }
}

/// Build the detection sample from the first non-empty lines
pub fn detection_sample(lines: &[String]) -> String {
    let joined = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .take(DETECTION_SAMPLE_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(DETECTION_SAMPLE_CHARS).collect()
}

/// Resolve the effective source language for a backend.
///
/// Explicit sources and backends that accept "auto" are returned unchanged.
/// Otherwise the sample is detected and accepted only when listed in
/// `allowed`; anything else yields `fallback`.
pub fn resolve_source_language(
    source: &str,
    accepts_auto: bool,
    lines: &[String],
    detector: &dyn LanguageDetector,
    allowed: &[String],
    fallback: &str,
) -> String {
    if !crate::app_config::is_auto(source) {
        return source.trim().to_string();
    }
    if accepts_auto {
        return "auto".to_string();
    }

    let sample = detection_sample(lines);
    if sample.is_empty() {
        return fallback.to_string();
    }

    match detector.detect(&sample) {
        Some(code) if allowed.iter().any(|a| language_codes_match(a, &code)) => code,
        Some(code) => {
            debug!("Detected '{}' is not an allowed source language, using '{}'", code, fallback);
            fallback.to_string()
        }
        None => fallback.to_string(),
    }
}
