//! Vehicle-plate extraction from the free-text invoice field.
//!
//! Fuel invoices carry the vehicle plate somewhere inside an unstructured
//! `OtroTexto` field, usually after a `placa:`/`pl:` label and often next to
//! a kilometre reading that looks just like a plate. Extraction tries a
//! labeled window first, then the whole text, with km readings filtered out.

use super::patterns::{
    KM_CODE, KM_MARKER, KM_PREFIX, MULTI_SPACE, NON_PLACA_CHARS, PLACA_CL, PLACA_GENERIC,
    PLACA_LABEL, PLACA_M, PUNCTUATION,
};

/// Sentinel emitted when the text is clearly fuel-related (a km reading and
/// nothing else) but no plate can be read.
pub const PLACA_UNKNOWN: &str = "Combustible / Placa: ?";

/// How many characters after a plate label are searched for a code.
const LABEL_WINDOW: usize = 50;

/// Plate-code extractor over free invoice text.
#[derive(Debug, Default)]
pub struct PlacaExtractor;

impl PlacaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract and format a plate code.
    ///
    /// Returns the formatted `"Combustible / Placa: CODE"` line, the
    /// [`PLACA_UNKNOWN`] sentinel for km-only text, or `None` when the text
    /// is not plate-related at all (caller falls back to the detail lines).
    pub fn process(&self, free_text: &str) -> Option<String> {
        if let Some(code) = self.extract_code(free_text) {
            return Some(format!("Combustible / Placa: {code}"));
        }

        if self.is_only_km_info(free_text) {
            return Some(PLACA_UNKNOWN.to_string());
        }

        None
    }

    /// Extract the cleaned plate code without formatting.
    pub fn extract_code(&self, free_text: &str) -> Option<String> {
        let text = free_text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(code) = self.find_after_labels(text) {
            if !is_km_code(&code) {
                return Some(clean_code(&code));
            }
        }

        if let Some(code) = find_pattern(text) {
            if !is_km_code(&code) {
                return Some(clean_code(&code));
            }
        }

        None
    }

    /// Search the window following each plate label.
    fn find_after_labels(&self, text: &str) -> Option<String> {
        for label in PLACA_LABEL.find_iter(text) {
            let rest = &text[label.end()..];
            let window_end = rest
                .char_indices()
                .nth(LABEL_WINDOW)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());

            if let Some(code) = find_pattern(&rest[..window_end]) {
                return Some(code);
            }
        }
        None
    }

    /// True when the text only carries kilometre information: a km marker,
    /// no plate label, and fewer than 5 meaningful characters once the
    /// marker and punctuation are stripped.
    fn is_only_km_info(&self, free_text: &str) -> bool {
        let text = free_text.trim();
        if text.is_empty() || !KM_MARKER.is_match(text) || PLACA_LABEL.is_match(text) {
            return false;
        }

        let without_km = KM_MARKER.replace_all(text, "");
        let meaningful = PUNCTUATION.replace_all(&without_km, "");
        meaningful.chars().count() < 5
    }
}

/// Try the ordered plate patterns and return the first raw match.
fn find_pattern(text: &str) -> Option<String> {
    if let Some(m) = PLACA_M.find(text) {
        return Some(m.as_str().to_string());
    }
    if let Some(m) = PLACA_CL.find(text) {
        return Some(m.as_str().to_string());
    }
    for m in PLACA_GENERIC.find_iter(text) {
        // Stand-in for the km lookahead: skip "km 1234"-shaped candidates.
        if KM_PREFIX.is_match(m.as_str()) {
            continue;
        }
        return Some(m.as_str().to_string());
    }
    None
}

/// True when a candidate is really a kilometre reading.
fn is_km_code(code: &str) -> bool {
    KM_CODE.is_match(code.trim())
}

/// Normalize a raw plate match: collapse whitespace, drop stray symbols,
/// uppercase.
fn clean_code(raw: &str) -> String {
    let cleaned = MULTI_SPACE.replace_all(raw.trim(), " ");
    let cleaned = NON_PLACA_CHARS.replace_all(&cleaned, "");
    cleaned.to_uppercase()
}
