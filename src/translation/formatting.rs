/*!
 * Format preservation for translated text.
 *
 * Subtitle lines often carry inline markup around the whole line
 * (`<i>...</i>`, `{\an8}`). Backends mangle tags, so a balanced outer wrap is
 * removed before translation and put back around the result. Tags inside the
 * line travel with the text; if the translation comes back with unbalanced
 * tags they are dropped so the written line stays well formed.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Opening markup at the start of a line
static LEADING_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\{\\an\d\}|<[ibu]>|<font[^>]*>)").unwrap()
});

/// Closing markup at the end of a line
static TRAILING_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(</(?:[ibu]|font)>)\s*$").unwrap()
});

/// Any supported tag, wherever it appears; group 1 is `/` on closers, group 2 the tag name
static ANY_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\\an\d\}|<(/?)([ibu]|font)(?:\s[^>]*)?>").unwrap()
});

/// Doubled emphasis left over when a backend keeps a tag we re-add
static DOUBLED_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([ibu])><([ibu])>([^<]*)</([ibu])></([ibu])>").unwrap()
});

/// Markup removed from around a line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupWrap {
    /// Opening tags, in original order
    pub prefix: String,
    /// Closing tags, in original order
    pub suffix: String,
}

impl MarkupWrap {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }
}

/// Name of an emphasis or font tag (`i`, `b`, `u`, `font`); None for `{\anN}`
fn tag_name(tag: &str) -> Option<String> {
    ANY_TAG_REGEX
        .captures(tag)
        .and_then(|caps| caps.get(2).map(|m| m.as_str().to_string()))
}

/// Format preserver for maintaining text formatting during translation
pub struct FormatPreserver;

impl FormatPreserver {
    /// Whether a line contains any supported markup
    pub fn has_markup(text: &str) -> bool {
        ANY_TAG_REGEX.is_match(text)
    }

    /// Whether every opener in `text` is closed by a matching closer, properly nested
    pub fn is_balanced(text: &str) -> bool {
        let mut open: Vec<&str> = Vec::new();
        for caps in ANY_TAG_REGEX.captures_iter(text) {
            let Some(name) = caps.get(2).map(|m| m.as_str()) else {
                continue;
            };
            if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
                if open.pop() != Some(name) {
                    return false;
                }
            } else {
                open.push(name);
            }
        }
        open.is_empty()
    }

    /// Remove every supported tag
    pub fn remove_tags(text: &str) -> String {
        ANY_TAG_REGEX.replace_all(text, "").trim().to_string()
    }

    /// Split a line into its wrapping markup and the text to translate.
    ///
    /// Leading openers and trailing closers form the wrap only when they pair
    /// up by name from the outside in and leave a balanced body. Position tags
    /// (`{\anN}`) at the start always go to the prefix.
    pub fn strip_markup(text: &str) -> (MarkupWrap, String) {
        if !Self::has_markup(text) {
            return (MarkupWrap::default(), text.to_string());
        }

        let line = text.trim();
        let mut anchors = String::new();
        let mut openers: Vec<&str> = Vec::new();
        let mut body_start = 0;
        while let Some(m) = LEADING_TAG_REGEX.find(&line[body_start..]) {
            let tag = m.as_str().trim();
            if tag_name(tag).is_some() {
                openers.push(tag);
            } else {
                anchors.push_str(tag);
            }
            body_start += m.end();
        }

        // outermost first
        let mut closers: Vec<&str> = Vec::new();
        let mut body_end = line.len();
        while body_end > body_start {
            let Some(caps) = TRAILING_TAG_REGEX.captures(&line[body_start..body_end]) else {
                break;
            };
            let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            closers.push(&line[body_start + tag.start()..body_start + tag.end()]);
            body_end = body_start + whole.start();
        }
        let body = &line[body_start..body_end];

        let max_pairs = openers
            .iter()
            .zip(&closers)
            .take_while(|(open, close)| tag_name(open) == tag_name(close))
            .count();

        let remainder = |pairs: usize| -> String {
            let mut rest: String = openers[pairs..].concat();
            rest.push_str(body);
            for closer in closers[pairs..].iter().rev() {
                rest.push_str(closer);
            }
            rest.trim().to_string()
        };

        let pairs = (0..=max_pairs)
            .rev()
            .find(|&pairs| Self::is_balanced(&remainder(pairs)))
            .unwrap_or(0);

        let mut wrap = MarkupWrap {
            prefix: anchors,
            suffix: String::new(),
        };
        wrap.prefix.push_str(&openers[..pairs].concat());
        for closer in closers[..pairs].iter().rev() {
            wrap.suffix.push_str(closer);
        }
        (wrap, remainder(pairs))
    }

    /// Put wrapping markup back around a translated line.
    /// Inner tags that the backend left unbalanced are removed.
    pub fn rewrap(wrap: &MarkupWrap, translated: &str) -> String {
        let translated = translated.trim();
        let translated = if Self::is_balanced(translated) {
            translated.to_string()
        } else {
            Self::remove_tags(translated)
        };
        if wrap.is_empty() || translated.is_empty() {
            return translated;
        }
        let joined = format!("{}{}{}", wrap.prefix, translated, wrap.suffix);
        Self::fix_doubled_formatting_tags(&joined)
    }

    /// Fix doubled formatting tags like <i><i>...</i></i>
    pub fn fix_doubled_formatting_tags(text: &str) -> String {
        DOUBLED_TAG_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                if caps[1] == caps[2] && caps[2] == caps[4] && caps[4] == caps[5] {
                    format!("<{0}>{1}</{0}>", &caps[1], &caps[3])
                } else {
                    caps[0].to_string()
                }
            })
            .to_string()
    }
}
