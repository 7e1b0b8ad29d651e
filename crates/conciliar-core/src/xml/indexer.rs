//! Per-company XML index construction.
//!
//! Walks a company's current-period folder, parses every XML, filters by
//! issue date, resolves each record's detail lines through the classification
//! chain, and produces the invoice-number index the Excel matcher consumes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dates::{parse_xml_date, Period};
use crate::engine::CancelToken;
use crate::extract::PlacaExtractor;
use crate::log::{LogLevel, LogSink};
use crate::models::{ExcludedXml, ProcessingStats};
use crate::pdf::CorreosPdfProcessor;

use super::record::{normalize_emitter_name, parse_invoice_xml, XmlRecord};

/// Index from invoice number to resolved detail lines.
pub type CompanyIndex = HashMap<String, Vec<String>>;

/// Shared pieces the indexer borrows from the engine for one run.
pub struct IndexerContext<'a> {
    pub period: Period,
    pub exclusion_emitters: &'a HashSet<String>,
    pub special_vendor: &'a str,
    pub placa: &'a PlacaExtractor,
    pub correos: &'a CorreosPdfProcessor,
    pub sink: &'a dyn LogSink,
    pub cancel: &'a CancelToken,
}

/// Parse errors narrated per company before going quiet.
const MAX_LOGGED_ERRORS: usize = 3;

/// Build the invoice index for one company folder.
pub fn build_index(
    folder: &Path,
    company_key: &str,
    company_name: &str,
    ctx: &IndexerContext<'_>,
    stats: &mut ProcessingStats,
) -> CompanyIndex {
    let files = collect_xml_files(folder, ctx.cancel);

    stats.total_xml_count += files.len();
    stats.company_mut(company_key).xml_count = files.len();

    let mut index = CompanyIndex::new();

    for (i, xml_file) in files.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            break;
        }
        debug!("[{}/{}] {}", i + 1, files.len(), xml_file.display());

        let record = match parse_invoice_xml(xml_file, ctx.special_vendor) {
            Ok(record) => record,
            Err(e) => {
                let company = stats.company_mut(company_key);
                company.xml_errors += 1;
                if company.xml_errors <= MAX_LOGGED_ERRORS {
                    ctx.sink.log(
                        LogLevel::Warning,
                        &format!("XML error in {}: {e}", xml_file.display()),
                    );
                }
                continue;
            }
        };

        // Records without an invoice number cannot be matched at all.
        let Some(invoice_number) = record.invoice_number.clone() else {
            continue;
        };

        match &record.issue_date_raw {
            Some(raw) => match parse_xml_date(raw) {
                None => {
                    // Present but malformed: refuse to guess.
                    stats.company_mut(company_key).xml_errors += 1;
                    continue;
                }
                Some(date) if !ctx.period.contains(date) => {
                    stats.total_xml_excluded_by_date += 1;
                    stats.company_mut(company_key).xml_excluded_by_date += 1;
                    stats.excluded_by_date.push(ExcludedXml {
                        company: company_name.to_string(),
                        invoice_number,
                        raw_date: raw.clone(),
                        parsed_date: date.format("%Y-%m-%d").to_string(),
                    });
                    continue;
                }
                Some(_) => {}
            },
            None => {
                // Structurally absent: tolerated (legacy records without a
                // timestamp), but visibly so.
                ctx.sink.log(
                    LogLevel::Warning,
                    &format!(
                        "{}: no issue date in {}, included anyway",
                        company_name,
                        xml_file.display()
                    ),
                );
            }
        }

        let lines = resolve_detail_lines(&record, xml_file, company_key, ctx, stats);

        if index.contains_key(&invoice_number) {
            ctx.sink.log(
                LogLevel::Warning,
                &format!(
                    "{company_name}: duplicate invoice number {invoice_number}, keeping the latest"
                ),
            );
        }
        index.insert(invoice_number, lines);

        let company = stats.company_mut(company_key);
        company.xml_valid += 1;
        company.xml_current_month += 1;
        stats.total_xml_valid += 1;
        stats.total_xml_current_month += 1;
    }

    index
}

/// Resolve a record's detail lines through the classification chain.
///
/// The precedence is a business rule and reads top to bottom: combustible
/// exclusion, then the special vendor's PDF path, then plate extraction,
/// then the raw detail lines.
fn resolve_detail_lines(
    record: &XmlRecord,
    xml_file: &Path,
    company_key: &str,
    ctx: &IndexerContext<'_>,
    stats: &mut ProcessingStats,
) -> Vec<String> {
    if let Some(emitter) = &record.emitter_name {
        if ctx
            .exclusion_emitters
            .contains(&normalize_emitter_name(emitter))
        {
            stats.combustible_exclusions_applied += 1;
            stats.company_mut(company_key).combustible_exclusions += 1;
            ctx.sink.log(
                LogLevel::Info,
                &format!("emitter excluded from plate extraction: {emitter}"),
            );
            return record.detail_lines.clone();
        }
    }

    if record.is_special_vendor {
        return match ctx.correos.process(xml_file) {
            Ok(formatted) => {
                stats.correos_pdfs_processed += 1;
                stats.correos_matches += 1;
                stats.company_mut(company_key).correos_processed += 1;
                ctx.sink
                    .log(LogLevel::Success, &format!("Correos PDF processed: {formatted}"));
                vec![formatted]
            }
            Err(e) => {
                stats.correos_pdfs_failed += 1;
                ctx.sink.log(
                    LogLevel::Error,
                    &format!("Correos PDF failed for {}: {e}", xml_file.display()),
                );
                record.detail_lines.clone()
            }
        };
    }

    if let Some(free_text) = &record.free_text {
        stats.otro_texto_processed += 1;
        if let Some(placa) = ctx.placa.process(free_text) {
            stats.placas_extracted += 1;
            stats.company_mut(company_key).placas_extracted += 1;
            ctx.sink
                .log(LogLevel::Info, &format!("plate extracted: {placa}"));
            return vec![placa];
        }
        stats.placas_failed += 1;
    }

    stats.fallback_to_detalle += 1;
    record.detail_lines.clone()
}

/// Collect `.xml` files recursively, in sorted walk order.
fn collect_xml_files(folder: &Path, cancel: &CancelToken) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk(folder, cancel, &mut files);
    files
}

fn walk(dir: &Path, cancel: &CancelToken, files: &mut Vec<PathBuf>) {
    if cancel.is_cancelled() {
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("cannot read {}: {e}", dir.display());
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk(&path, cancel, files);
        } else if path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case("xml"))
            .unwrap_or(false)
        {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;
    use crate::models::DEFAULT_SPECIAL_VENDOR;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    struct Fixture {
        _tmp: tempfile::TempDir,
        folder: PathBuf,
        sink: MemorySink,
        cancel: CancelToken,
        placa: PlacaExtractor,
        correos: CorreosPdfProcessor,
        exclusions: HashSet<String>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let folder = tmp.path().join("2025").join("7");
            std::fs::create_dir_all(&folder).unwrap();
            Self {
                _tmp: tmp,
                folder,
                sink: MemorySink::new(),
                cancel: CancelToken::new(),
                placa: PlacaExtractor::new(),
                correos: CorreosPdfProcessor::new(),
                exclusions: HashSet::new(),
            }
        }

        fn write_xml(&self, name: &str, body: &str) {
            std::fs::write(self.folder.join(name), body).unwrap();
        }

        fn build(&self, stats: &mut ProcessingStats) -> CompanyIndex {
            let ctx = IndexerContext {
                period: Period::of(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()),
                exclusion_emitters: &self.exclusions,
                special_vendor: DEFAULT_SPECIAL_VENDOR,
                placa: &self.placa,
                correos: &self.correos,
                sink: &self.sink,
                cancel: &self.cancel,
            };
            build_index(&self.folder, "acme", "Acme S.A.", &ctx, stats)
        }
    }

    fn invoice_xml(numero: &str, fecha: Option<&str>, emisor: &str, extra: &str) -> String {
        let fecha = fecha
            .map(|f| format!("<FechaEmision>{f}</FechaEmision>"))
            .unwrap_or_default();
        format!(
            "<Factura>\
             <NumeroConsecutivo>{numero}</NumeroConsecutivo>\
             {fecha}\
             <Emisor><Nombre>{emisor}</Nombre></Emisor>\
             {extra}\
             </Factura>"
        )
    }

    #[test]
    fn plate_extraction_produces_single_line() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "a.xml",
            &invoice_xml(
                "12345",
                Some("2025-07-01T10:19:14-06:00"),
                "Gasolinera Uno",
                "<OtroTexto>Placa:BJX 894 KM 9509</OtroTexto><Detalle>GASOLINA</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert_eq!(
            index.get("12345"),
            Some(&vec!["Combustible / Placa: BJX 894".to_string()])
        );
        assert_eq!(stats.placas_extracted, 1);
        assert_eq!(stats.fallback_to_detalle, 0);
    }

    #[test]
    fn exclusion_beats_plate_extraction() {
        let mut fixture = Fixture::new();
        fixture
            .exclusions
            .insert(normalize_emitter_name("Gasolinera Río Azúl"));
        fixture.write_xml(
            "a.xml",
            &invoice_xml(
                "12345",
                Some("2025-07-01T10:19:14-06:00"),
                "Gasolinera Rio Azul",
                "<OtroTexto>Placa:BJX 894</OtroTexto><Detalle>DIESEL</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert_eq!(index.get("12345"), Some(&vec!["DIESEL".to_string()]));
        assert_eq!(stats.combustible_exclusions_applied, 1);
        assert_eq!(stats.placas_extracted, 0);
    }

    #[test]
    fn out_of_period_record_is_excluded_and_reported() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "old.xml",
            &invoice_xml(
                "11111",
                Some("2025-06-30T08:00:00-06:00"),
                "Gasolinera Uno",
                "<Detalle>VIEJA</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert!(index.is_empty());
        assert_eq!(stats.total_xml_excluded_by_date, 1);
        assert_eq!(stats.excluded_by_date.len(), 1);
        assert_eq!(stats.excluded_by_date[0].invoice_number, "11111");
        assert_eq!(stats.excluded_by_date[0].parsed_date, "2025-06-30");
    }

    #[test]
    fn absent_date_is_tolerated_with_warning() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "nodate.xml",
            &invoice_xml("22222", None, "Gasolinera Uno", "<Detalle>SIN FECHA</Detalle>"),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert_eq!(index.get("22222"), Some(&vec!["SIN FECHA".to_string()]));
        let warned = fixture
            .sink
            .take()
            .iter()
            .any(|(level, msg)| *level == LogLevel::Warning && msg.contains("no issue date"));
        assert!(warned);
    }

    #[test]
    fn malformed_date_is_an_error_skip() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "bad.xml",
            &invoice_xml(
                "33333",
                Some("julio primero"),
                "Gasolinera Uno",
                "<Detalle>X</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert!(index.is_empty());
        assert_eq!(stats.company_details["acme"].xml_errors, 1);
    }

    #[test]
    fn no_plate_falls_back_to_detail_lines() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "a.xml",
            &invoice_xml(
                "44444",
                Some("2025-07-02T12:00:00-06:00"),
                "Ferretería Central",
                "<Detalle>TORNILLOS</Detalle><Detalle>CLAVOS</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert_eq!(
            index.get("44444"),
            Some(&vec!["TORNILLOS".to_string(), "CLAVOS".to_string()])
        );
        assert_eq!(stats.fallback_to_detalle, 1);
        assert_eq!(stats.otro_texto_processed, 0);
    }

    #[test]
    fn duplicate_invoice_number_keeps_last_and_warns() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "a.xml",
            &invoice_xml(
                "55555",
                Some("2025-07-01T00:00:00-06:00"),
                "Gasolinera Uno",
                "<Detalle>PRIMERO</Detalle>",
            ),
        );
        fixture.write_xml(
            "b.xml",
            &invoice_xml(
                "55555",
                Some("2025-07-02T00:00:00-06:00"),
                "Gasolinera Uno",
                "<Detalle>SEGUNDO</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        // Files walk in sorted order, so b.xml wins.
        assert_eq!(index.get("55555"), Some(&vec!["SEGUNDO".to_string()]));
        let warned = fixture
            .sink
            .take()
            .iter()
            .any(|(level, msg)| *level == LogLevel::Warning && msg.contains("duplicate"));
        assert!(warned);
    }

    #[test]
    fn indexing_is_idempotent() {
        let fixture = Fixture::new();
        fixture.write_xml(
            "a.xml",
            &invoice_xml(
                "12345",
                Some("2025-07-01T10:19:14-06:00"),
                "Gasolinera Uno",
                "<OtroTexto>pl:m833753</OtroTexto><Detalle>GASOLINA</Detalle>",
            ),
        );

        let mut first_stats = ProcessingStats::default();
        let first = fixture.build(&mut first_stats);
        let mut second_stats = ProcessingStats::default();
        let second = fixture.build(&mut second_stats);

        assert_eq!(first, second);
        assert_eq!(
            first.get("12345"),
            Some(&vec!["Combustible / Placa: M833753".to_string()])
        );
    }

    #[test]
    fn failed_correos_pdf_falls_back_to_detail_lines() {
        let fixture = Fixture::new();
        // Special vendor but no PDF next to the XML.
        fixture.write_xml(
            "correos.xml",
            &invoice_xml(
                "66666",
                Some("2025-07-03T09:00:00-06:00"),
                DEFAULT_SPECIAL_VENDOR,
                "<Detalle>SERVICIO POSTAL</Detalle>",
            ),
        );

        let mut stats = ProcessingStats::default();
        let index = fixture.build(&mut stats);

        assert_eq!(
            index.get("66666"),
            Some(&vec!["SERVICIO POSTAL".to_string()])
        );
        assert_eq!(stats.correos_pdfs_failed, 1);
        assert_eq!(stats.correos_pdfs_processed, 0);
        // The PDF failure path does not count as a plate fallback.
        assert_eq!(stats.fallback_to_detalle, 0);
    }
}
