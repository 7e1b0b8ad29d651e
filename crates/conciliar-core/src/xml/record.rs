//! Invoice XML parsing.
//!
//! Electronic invoices come in several namespaced dialects, so fields are
//! located by substring match on the local tag name rather than by schema:
//! a consecutive-number field, an issue-date field, an emitter name, the
//! free-text `OtroTexto` field, and zero or more `Detalle` lines.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::XmlError;

/// One parsed invoice XML, before classification.
#[derive(Debug, Clone, Default)]
pub struct XmlRecord {
    pub invoice_number: Option<String>,
    pub issue_date_raw: Option<String>,
    pub emitter_name: Option<String>,
    pub free_text: Option<String>,
    pub detail_lines: Vec<String>,
    pub is_special_vendor: bool,
}

/// Parse one invoice XML file.
///
/// `special_vendor` is compared exactly against every `Nombre`-like tag to
/// flag records that must be resolved through their associated PDF.
pub fn parse_invoice_xml(path: &Path, special_vendor: &str) -> Result<XmlRecord, XmlError> {
    let mut reader = Reader::from_file(path).map_err(|e| XmlError::Read(e.to_string()))?;
    reader.config_mut().trim_text(true);

    let mut record = XmlRecord::default();
    let mut stack: Vec<String> = Vec::new();
    let mut emisor_child_name: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| XmlError::Parse(e.to_string()))?
        {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| XmlError::Parse(e.to_string()))?
                    .trim()
                    .to_string();
                record_text(&mut record, &mut emisor_child_name, &stack, &value, special_vendor);
            }
            Event::CData(cdata) => {
                let value = String::from_utf8_lossy(&cdata.into_inner())
                    .trim()
                    .to_string();
                record_text(&mut record, &mut emisor_child_name, &stack, &value, special_vendor);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // NombreEmisor anywhere in the document wins; a Nombre nested under
    // Emisor is the fallback.
    if record.emitter_name.is_none() {
        record.emitter_name = emisor_child_name;
    }

    Ok(record)
}

fn record_text(
    record: &mut XmlRecord,
    emisor_child_name: &mut Option<String>,
    stack: &[String],
    value: &str,
    special_vendor: &str,
) {
    if value.is_empty() {
        return;
    }
    let Some(tag) = stack.last() else {
        return;
    };

    if tag.contains("NumeroConsecutivo") {
        record.invoice_number = Some(value.to_string());
    } else if tag.contains("FechaEmision") {
        record.issue_date_raw = Some(value.to_string());
    }

    if tag == "NombreEmisor" && record.emitter_name.is_none() {
        record.emitter_name = Some(value.to_string());
    } else if (tag == "Nombre" || tag == "NombreEmisor")
        && emisor_child_name.is_none()
        && stack.iter().any(|t| t == "Emisor")
    {
        *emisor_child_name = Some(value.to_string());
    }

    if tag.contains("Nombre") && value == special_vendor {
        record.is_special_vendor = true;
    }

    if tag.contains("OtroTexto") && record.free_text.is_none() {
        record.free_text = Some(value.to_string());
    }

    if tag.contains("Detalle") {
        record.detail_lines.push(value.to_string());
    }
}

/// Normalize an emitter name for exclusion matching: strip diacritics,
/// collapse case, trim.
pub fn normalize_emitter_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(fold_diacritic)
        .collect::<String>()
        .to_lowercase()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_SPECIAL_VENDOR;
    use pretty_assertions::assert_eq;

    fn write_xml(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FacturaElectronica xmlns="https://example.test/facturaElectronica">
  <NumeroConsecutivo>00100001010000012345</NumeroConsecutivo>
  <FechaEmision>2025-07-01T10:19:14-06:00</FechaEmision>
  <Emisor>
    <Nombre>Estación La Guaria S.A.</Nombre>
  </Emisor>
  <DetalleServicio>
    <LineaDetalle>
      <Detalle>GASOLINA SUPER</Detalle>
    </LineaDetalle>
  </DetalleServicio>
  <OtroTexto>Placa:BJX 894 KM 9509</OtroTexto>
</FacturaElectronica>"#;

    #[test]
    fn parses_namespaced_invoice() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_xml(tmp.path(), "factura.xml", SAMPLE);

        let record = parse_invoice_xml(&path, DEFAULT_SPECIAL_VENDOR).unwrap();
        assert_eq!(
            record.invoice_number.as_deref(),
            Some("00100001010000012345")
        );
        assert_eq!(
            record.issue_date_raw.as_deref(),
            Some("2025-07-01T10:19:14-06:00")
        );
        assert_eq!(
            record.emitter_name.as_deref(),
            Some("Estación La Guaria S.A.")
        );
        assert_eq!(record.free_text.as_deref(), Some("Placa:BJX 894 KM 9509"));
        assert_eq!(record.detail_lines, vec!["GASOLINA SUPER".to_string()]);
        assert!(!record.is_special_vendor);
    }

    #[test]
    fn nombre_emisor_takes_precedence_over_nested_nombre() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_xml(
            tmp.path(),
            "factura.xml",
            r#"<Factura>
  <NumeroConsecutivo>99</NumeroConsecutivo>
  <NombreEmisor>Proveedor Directo</NombreEmisor>
  <Emisor><Nombre>Otro Nombre</Nombre></Emisor>
</Factura>"#,
        );

        let record = parse_invoice_xml(&path, DEFAULT_SPECIAL_VENDOR).unwrap();
        assert_eq!(record.emitter_name.as_deref(), Some("Proveedor Directo"));
    }

    #[test]
    fn detects_special_vendor_by_exact_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_xml(
            tmp.path(),
            "correos.xml",
            r#"<Factura>
  <NumeroConsecutivo>12345</NumeroConsecutivo>
  <Emisor><Nombre>Correos de Costa Rica SA</Nombre></Emisor>
</Factura>"#,
        );

        let record = parse_invoice_xml(&path, DEFAULT_SPECIAL_VENDOR).unwrap();
        assert!(record.is_special_vendor);
        assert_eq!(
            record.emitter_name.as_deref(),
            Some("Correos de Costa Rica SA")
        );
    }

    #[test]
    fn near_miss_vendor_name_is_not_special() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_xml(
            tmp.path(),
            "casi.xml",
            r#"<Factura>
  <NumeroConsecutivo>12345</NumeroConsecutivo>
  <Emisor><Nombre>Correos de Costa Rica S.A.</Nombre></Emisor>
</Factura>"#,
        );

        let record = parse_invoice_xml(&path, DEFAULT_SPECIAL_VENDOR).unwrap();
        assert!(!record.is_special_vendor);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_xml(
            tmp.path(),
            "roto.xml",
            "<Factura><Numero>12</Otro></Factura>",
        );

        assert!(parse_invoice_xml(&path, DEFAULT_SPECIAL_VENDOR).is_err());
    }

    #[test]
    fn normalizes_emitter_names() {
        assert_eq!(
            normalize_emitter_name("  Estación Río Ñame  "),
            "estacion rio name"
        );
        assert_eq!(normalize_emitter_name("GASOLINERA"), "gasolinera");
    }
}
