/*!
 * Cleanup applied to every translated line before it is written.
 *
 * The pipeline is idempotent: running it on its own output changes nothing.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static MULTI_SPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

static SPACE_BEFORE_PUNCT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+([.,;:!?])").unwrap());

static SPACED_ELLIPSIS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[ \t]*\.[ \t]*\.").unwrap());

static EMPHASIS_OPEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([ibu])>[ \t]+").unwrap());

static EMPHASIS_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+</([ibu])>").unwrap());

/// Literal phrase corrections for recurring machine-translation slips
const PHRASE_CORRECTIONS: &[(&str, &str)] = &[
    ("senor", "señor"),
    ("pateticos", "patéticos"),
    ("Llevan temprano", "Han llegado temprano"),
    ("código de liquidación", "código de acceso"),
    ("Luchador TIE", "TIE Fighter"),
    // space before the ellipsis is already gone by the time corrections run
    ("Capitán...", "capitán..."),
    ("¿ ", "¿"),
    ("¡ ", "¡"),
];

/// Whole-word, case-sensitive corrections
static WORD_CORRECTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\bSenor\b").unwrap(), "Señor"),
        (Regex::new(r"\bPateticos\b").unwrap(), "Patéticos"),
    ]
});

/// Apply the full cleanup pipeline to one translated line
pub fn postprocess(text: &str) -> String {
    let text = normalize_lines(text.trim());
    let text = MULTI_SPACE_REGEX.replace_all(&text, " ");
    let text: String = text.nfc().collect();
    let text = SPACED_ELLIPSIS_REGEX.replace_all(&text, "...");
    let text = SPACE_BEFORE_PUNCT_REGEX.replace_all(&text, "$1");
    let text = EMPHASIS_OPEN_REGEX.replace_all(&text, "<$1>");
    let text = EMPHASIS_CLOSE_REGEX.replace_all(&text, "</$1>");
    apply_corrections(&text)
}

/// Normalize line endings, trim every line and drop blank ones
fn normalize_lines(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn apply_corrections(text: &str) -> String {
    let mut result = text.to_string();
    for (wrong, right) in PHRASE_CORRECTIONS {
        if result.contains(wrong) {
            result = result.replace(wrong, right);
        }
    }
    for (pattern, replacement) in WORD_CORRECTIONS.iter() {
        result = pattern.replace_all(&result, *replacement).into_owned();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_before_punctuation_and_runs_collapse() {
        assert_eq!(postprocess("Hola ,  mundo"), "Hola, mundo");
        assert_eq!(postprocess("  Qué\t\tpasa ?  "), "Qué pasa?");
    }

    #[test]
    fn test_postprocess_is_idempotent() {
        let samples = [
            "Hola ,  mundo",
            ". . . .",
            "<i> Hola </i> . . .",
            "senor\r\n\r\n  Capitán ...  ",
            "¿ Qué ?\n¡ Vamos !",
            "Senor Pateticos",
        ];
        for sample in samples {
            let once = postprocess(sample);
            assert_eq!(postprocess(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_ellipsis_and_emphasis_spacing() {
        assert_eq!(postprocess("Espera . . . ahora"), "Espera... ahora");
        assert_eq!(postprocess("Bueno ..."), "Bueno...");
        assert_eq!(postprocess("<i> Hola </i>"), "<i>Hola</i>");
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        assert_eq!(postprocess("uno\r\n\r\n  dos  \n"), "uno\ndos");
    }

    #[test]
    fn test_nfc_composes_accents() {
        let decomposed = "Jose\u{301}";
        assert_eq!(postprocess(decomposed), "José");
    }

    #[test]
    fn test_dictionary_and_word_corrections() {
        assert_eq!(postprocess("Buenos días, senor"), "Buenos días, señor");
        assert_eq!(postprocess("Llevan temprano"), "Han llegado temprano");
        assert_eq!(postprocess("Capitán ..."), "capitán...");
        assert_eq!(postprocess("¿ Dónde?"), "¿Dónde?");
        assert_eq!(postprocess("Senor"), "Señor");
        assert_eq!(postprocess("Senores"), "Senores");
        assert_eq!(postprocess("Luchador TIE"), "TIE Fighter");
    }
}
