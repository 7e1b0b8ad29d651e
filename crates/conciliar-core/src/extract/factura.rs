//! Invoice-number and guide-code extraction from Correos PDF text.
//!
//! Correos invoices are laid out inconsistently, so the invoice number is
//! hunted with an ordered list of label variants, then a loose scan of
//! "factura" lines, then a context window search. Guide codes have a single
//! fixed shape and are collected from the whole document.

use crate::error::PdfError;

use super::patterns::{
    FACTURA_CONTEXT, FACTURA_DIGITS, FACTURA_PATTERNS, GUIA_CODE, GUIA_SHAPE, MULTI_SPACE,
};

/// Fields extracted from one Correos invoice PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorreosExtraction {
    pub invoice_number: String,
    pub guide_codes: Vec<String>,
}

impl CorreosExtraction {
    /// Render the detail line written into the company index.
    pub fn formatted(&self) -> String {
        format!(
            "({}) SERVICIO EMS (ENVIO DE PAQUETES)/GUIA {}",
            self.invoice_number,
            self.guide_codes.join(" - ")
        )
    }
}

/// Extractor for Correos invoice PDFs.
#[derive(Debug, Default)]
pub struct FacturaExtractor;

impl FacturaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract invoice number and guide codes from the full PDF text.
    pub fn extract(&self, pdf_text: &str) -> Result<CorreosExtraction, PdfError> {
        let invoice_number = self
            .extract_invoice_number(pdf_text)
            .ok_or(PdfError::NoInvoiceNumber)?;

        let guide_codes = self.extract_guide_codes(pdf_text);
        if guide_codes.is_empty() {
            return Err(PdfError::NoGuideCodes);
        }

        Ok(CorreosExtraction {
            invoice_number,
            guide_codes,
        })
    }

    /// Extract the invoice number, trying each labeled pattern in order and
    /// falling back to looser searches.
    pub fn extract_invoice_number(&self, pdf_text: &str) -> Option<String> {
        let cleaned = normalize_text(pdf_text);

        for pattern in FACTURA_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(&cleaned) {
                let number = &caps[1];
                if is_valid_invoice_number(number) {
                    tracing::debug!("invoice number {number} matched {}", pattern.as_str());
                    return Some(number.to_string());
                }
            }
        }

        fallback_invoice_search(&cleaned)
    }

    /// Collect guide codes from the whole text, deduplicated in first-seen
    /// order.
    pub fn extract_guide_codes(&self, pdf_text: &str) -> Vec<String> {
        let mut codes = Vec::new();

        for m in GUIA_CODE.find_iter(pdf_text) {
            let code = m.as_str();
            if is_valid_guide_code(code) && !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }

        codes
    }
}

/// Normalize PDF text before pattern matching: NBSP to space, whitespace
/// collapse, degree-sign variants unified.
fn normalize_text(text: &str) -> String {
    let unified = text.replace('\u{a0}', " ");
    let collapsed = MULTI_SPACE.replace_all(&unified, " ");
    collapsed
        .replace('º', "°")
        .replace("Nº", "N°")
        .replace("n°", "N°")
        .trim()
        .to_string()
}

/// Looser searches when no labeled pattern hits: digit runs on "factura"
/// lines, then digits within a short window of an invoice-ish word.
fn fallback_invoice_search(cleaned: &str) -> Option<String> {
    for line in cleaned.lines() {
        if !line.to_lowercase().contains("factura") {
            continue;
        }
        for caps in FACTURA_DIGITS.captures_iter(line) {
            let number = &caps[1];
            if is_valid_invoice_number(number) {
                return Some(number.to_string());
            }
        }
    }

    for caps in FACTURA_CONTEXT.captures_iter(cleaned) {
        let number = &caps[1];
        if is_valid_invoice_number(number) {
            return Some(number.to_string());
        }
    }

    None
}

/// Sanity check: 4-8 digits, between 1000 and 99,999,999.
fn is_valid_invoice_number(number: &str) -> bool {
    if !(4..=8).contains(&number.len()) {
        return false;
    }
    match number.parse::<u64>() {
        Ok(n) => (1000..=99_999_999).contains(&n),
        Err(_) => false,
    }
}

fn is_valid_guide_code(code: &str) -> bool {
    GUIA_SHAPE.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labeled_invoice_number() {
        let extractor = FacturaExtractor::new();
        assert_eq!(
            extractor.extract_invoice_number("N° Factura: 345520"),
            Some("345520".to_string())
        );
        assert_eq!(
            extractor.extract_invoice_number("No. Factura: 345520"),
            Some("345520".to_string())
        );
        assert_eq!(
            extractor.extract_invoice_number("Factura # 345520"),
            Some("345520".to_string())
        );
    }

    #[test]
    fn degree_sign_variants_are_normalized() {
        let extractor = FacturaExtractor::new();
        assert_eq!(
            extractor.extract_invoice_number("Nº Factura: 345520"),
            Some("345520".to_string())
        );
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let extractor = FacturaExtractor::new();
        // 999 is below the plausible range, 123 too short.
        assert_eq!(extractor.extract_invoice_number("N° Factura: 0999"), None);
        assert!(!is_valid_invoice_number("123"));
        assert!(!is_valid_invoice_number("999999999"));
        assert!(is_valid_invoice_number("1000"));
        assert!(is_valid_invoice_number("99999999"));
    }

    #[test]
    fn fallback_finds_number_near_factura_word() {
        let extractor = FacturaExtractor::new();
        assert_eq!(
            extractor.extract_invoice_number("detalle factura contado 345520 total"),
            Some("345520".to_string())
        );
    }

    #[test]
    fn guide_codes_deduplicated_in_order() {
        let extractor = FacturaExtractor::new();
        let text = "Guías\nNE084204615CR\nNE116467408CR\nNE084204615CR\n";
        assert_eq!(
            extractor.extract_guide_codes(text),
            vec!["NE084204615CR".to_string(), "NE116467408CR".to_string()]
        );
    }

    #[test]
    fn guide_code_without_suffix_letters() {
        let extractor = FacturaExtractor::new();
        assert_eq!(
            extractor.extract_guide_codes("envio NE123456789 listo"),
            vec!["NE123456789".to_string()]
        );
    }

    #[test]
    fn formatted_output() {
        let extraction = CorreosExtraction {
            invoice_number: "345520".to_string(),
            guide_codes: vec!["NE084204615CR".to_string(), "NE116467408CR".to_string()],
        };
        assert_eq!(
            extraction.formatted(),
            "(345520) SERVICIO EMS (ENVIO DE PAQUETES)/GUIA NE084204615CR - NE116467408CR"
        );
    }

    #[test]
    fn extract_requires_both_fields() {
        let extractor = FacturaExtractor::new();

        let ok = extractor.extract("N° Factura: 345520\nGuías\nNE084204615CR");
        assert!(ok.is_ok());

        assert!(matches!(
            extractor.extract("Guías\nNE084204615CR"),
            Err(PdfError::NoInvoiceNumber)
        ));
        assert!(matches!(
            extractor.extract("N° Factura: 345520"),
            Err(PdfError::NoGuideCodes)
        ));
    }
}
