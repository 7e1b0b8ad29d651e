//! Common regex patterns for plate and invoice-PDF field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Plate patterns, tried in order. The M format goes first so the leading
    // M/m is not swallowed by the generic six-character pattern.
    pub static ref PLACA_M: Regex = Regex::new(
        r"(?i)(m\s?\d{6})"
    ).unwrap();

    pub static ref PLACA_CL: Regex = Regex::new(
        r"(?i)(CL\d{6})"
    ).unwrap();

    // Generic plate: 2-3 letters + 3-4 digits, six bare digits, or 3+3.
    // The regex crate has no lookahead, so km-prefixed candidates are
    // filtered after matching instead.
    pub static ref PLACA_GENERIC: Regex = Regex::new(
        r"(?i)([A-Z]{2,3}[\s-]?\d{3,4}|\d{6}|[A-Z]{3}\d{3})"
    ).unwrap();

    // Labels announcing that a plate code follows.
    pub static ref PLACA_LABEL: Regex = Regex::new(
        r"(?i)(?:placa\s*[:=]|pl\s*:)"
    ).unwrap();

    // Kilometre markers ("km 40800", "KM: 8765").
    pub static ref KM_MARKER: Regex = Regex::new(
        r"(?i)km[\s:]*\d+"
    ).unwrap();

    pub static ref KM_CODE: Regex = Regex::new(
        r"(?i)^km\s?\d+$"
    ).unwrap();

    pub static ref KM_PREFIX: Regex = Regex::new(
        r"(?i)^km[\s-]"
    ).unwrap();

    // Cleanup helpers.
    pub static ref MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();
    pub static ref NON_PLACA_CHARS: Regex = Regex::new(r"[^\w\s-]").unwrap();
    pub static ref PUNCTUATION: Regex = Regex::new(r"[:\s\-_.,;]+").unwrap();

    // Invoice number label variants on Correos PDFs, tried in order.
    pub static ref FACTURA_PATTERNS: Vec<Regex> = [
        r"(?i)N°\s*Factura:\s*(\d{4,8})",
        r"(?i)No\.\s*Factura:\s*(\d{4,8})",
        r"(?i)Número\s*Factura:\s*(\d{4,8})",
        r"(?i)Núm\.\s*Factura:\s*(\d{4,8})",
        r"(?i)FACTURA\s*N°?\s*:?\s*(\d{4,8})",
        r"(?i)Factura\s*No\.\s*(\d{4,8})",
        r"(?i)Factura\s*#\s*(\d{4,8})",
        r"(?i)N°\s*(\d{4,8})",
        r"(?i)No\.\s*(\d{4,8})",
        r"(?i)Documento\s*N°\s*(\d{4,8})",
        r"(?i)(?:N°|No\.|Núm\.|#)\s*(\d{4,8})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    // Fallbacks when no labeled pattern hits.
    pub static ref FACTURA_DIGITS: Regex = Regex::new(r"\b(\d{4,8})\b").unwrap();

    pub static ref FACTURA_CONTEXT: Regex = Regex::new(
        r"(?is)(?:factura|invoice|doc|documento).{0,50}?(\d{4,8})"
    ).unwrap();

    // Tracking/guide codes: 2 uppercase letters + 9 digits + 0-2 letters.
    pub static ref GUIA_CODE: Regex = Regex::new(
        r"([A-Z]{2}\d{9}[A-Z]{0,2})"
    ).unwrap();

    pub static ref GUIA_SHAPE: Regex = Regex::new(
        r"^[A-Z]{2}\d{9}[A-Z]{0,2}$"
    ).unwrap();
}
