//! Reconciliation run orchestration.
//!
//! One run walks Validating → Indexing → Matching → Finalizing on a single
//! thread. Expected failures never surface as `Err`: the caller always gets
//! a [`RunOutcome`] with the stats collected so far, and an external stop
//! request lands as `stopped_by_user` rather than an error.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::Period;
use crate::excel::{filter_rows_by_date, match_rows, read_rows, OutputWorkbook};
use crate::extract::PlacaExtractor;
use crate::log::{LogLevel, LogSink};
use crate::models::{CompanyConfig, ProcessingStats, ReconcileConfig};
use crate::paths;
use crate::pdf::CorreosPdfProcessor;
use crate::xml::{build_index, normalize_emitter_name, CompanyIndex, IndexerContext};

/// Cooperative stop flag, polled between files and companies.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop at the next poll point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One generated output workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub source: String,
    pub output: PathBuf,
    pub company_key: String,
    pub company_name: String,
    pub matches: usize,
    pub manual_reviews: usize,
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub output_files: Vec<OutputFile>,
    pub stats: ProcessingStats,
    pub stopped_by_user: bool,
    pub error: Option<String>,
}

/// Drives indexing and matching across all configured companies and all
/// discovered Excel inputs.
pub struct ReconciliationEngine {
    config: ReconcileConfig,
    sink: Arc<dyn LogSink>,
    cancel: CancelToken,
}

impl ReconciliationEngine {
    pub fn new(config: ReconcileConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            sink,
            cancel: CancelToken::new(),
        }
    }

    /// Token the caller can use to stop a run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run against today's period.
    pub fn run(&self) -> RunOutcome {
        self.run_at(Local::now().date_naive())
    }

    /// Run against an explicit reference date. The period is captured here
    /// once and used for every filter decision in the run.
    pub fn run_at(&self, reference: NaiveDate) -> RunOutcome {
        let started = Instant::now();
        let mut stats = ProcessingStats::default();
        let period = Period::of(reference);

        self.log(
            LogLevel::Info,
            &format!("starting reconciliation for period {period}"),
        );

        if let Err(reason) = self.validate() {
            self.log(LogLevel::Error, &reason);
            return Self::failure(reason, stats, started);
        }

        let excel_files = self.find_excel_files();
        if excel_files.is_empty() {
            let reason = format!(
                "no Excel files matching '{}*.xlsx' in {}",
                self.config.excel_prefix,
                self.config.input_folder.display()
            );
            self.log(LogLevel::Warning, &reason);
            return Self::failure(reason, stats, started);
        }
        self.log(
            LogLevel::Success,
            &format!("{} Excel file(s) to process", excel_files.len()),
        );

        let exclusions: HashSet<String> = self
            .config
            .combustible_exclusions
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| normalize_emitter_name(name))
            .collect();
        if !exclusions.is_empty() {
            self.log(
                LogLevel::Info,
                &format!(
                    "{} emitter(s) excluded from plate extraction",
                    exclusions.len()
                ),
            );
        }

        let indices = self.build_indices(period, &exclusions, &mut stats);

        if indices.is_empty() {
            if self.cancel.is_cancelled() {
                return self.finish(Vec::new(), stats, started);
            }
            let reason = "no valid XML records in any company".to_string();
            self.log(LogLevel::Error, &reason);
            return Self::failure(reason, stats, started);
        }

        let output_files = self.match_all(&excel_files, &indices, period, &mut stats);

        self.finish(output_files, stats, started)
    }

    /// Fail-fast checks before anything is processed. Only the company
    /// *base* folders are required; the per-period subfolders are resolved
    /// later and may legitimately be missing.
    fn validate(&self) -> Result<(), String> {
        if self.config.companies.is_empty() {
            return Err("no company folders configured".to_string());
        }

        if !self.config.input_folder.is_dir() {
            return Err(format!(
                "input folder does not exist: {}",
                self.config.input_folder.display()
            ));
        }

        for company in &self.config.companies {
            if !company.base_folder.is_dir() {
                return Err(format!(
                    "base folder for {} does not exist: {}",
                    company.key,
                    company.base_folder.display()
                ));
            }
            fs::read_dir(&company.base_folder).map_err(|e| {
                format!("base folder for {} is not readable: {e}", company.key)
            })?;
        }

        fs::create_dir_all(&self.config.output_folder)
            .map_err(|e| format!("cannot create output folder: {e}"))?;

        Ok(())
    }

    fn find_excel_files(&self) -> Vec<PathBuf> {
        let pattern = self
            .config
            .input_folder
            .join(format!("{}*.xlsx", self.config.excel_prefix));

        match glob::glob(&pattern.to_string_lossy()) {
            Ok(paths) => paths
                .filter_map(|entry| entry.ok())
                .filter(|path| path.is_file())
                .collect(),
            Err(e) => {
                debug!("bad glob pattern {}: {e}", pattern.display());
                Vec::new()
            }
        }
    }

    /// Resolve each company's dynamic folder and index what exists.
    fn build_indices(
        &self,
        period: Period,
        exclusions: &HashSet<String>,
        stats: &mut ProcessingStats,
    ) -> HashMap<String, CompanyIndex> {
        let placa = PlacaExtractor::new();
        let correos = CorreosPdfProcessor::new();
        let mut indices = HashMap::new();

        stats.companies_processed = self.config.companies.len();

        for company in &self.config.companies {
            if self.cancel.is_cancelled() {
                break;
            }

            let resolved = paths::resolve(&company.base_folder, period);
            {
                let detail = stats.company_mut(&company.key);
                detail.name = company.display_name.clone();
                detail.folder_exists = resolved.exists;
                detail.dynamic_path = resolved.dynamic_path.display().to_string();
            }

            if !resolved.exists {
                stats.companies_folders_missing += 1;
                stats
                    .companies_folders_skipped
                    .push(company.display_name.clone());
                self.log(
                    LogLevel::Info,
                    &format!(
                        "{}: no {period} folder, skipped this run",
                        company.display_name
                    ),
                );
                continue;
            }

            stats.companies_folders_found += 1;
            self.log(
                LogLevel::Info,
                &format!(
                    "indexing {} ({})",
                    company.display_name,
                    resolved.dynamic_path.display()
                ),
            );

            let ctx = IndexerContext {
                period,
                exclusion_emitters: exclusions,
                special_vendor: &self.config.special_vendor,
                placa: &placa,
                correos: &correos,
                sink: self.sink.as_ref(),
                cancel: &self.cancel,
            };
            let index = build_index(
                &resolved.dynamic_path,
                &company.key,
                &company.display_name,
                &ctx,
                stats,
            );

            if index.is_empty() {
                stats.companies_without_matches += 1;
                stats.companies_no_matches.push(company.display_name.clone());
                self.log(
                    LogLevel::Warning,
                    &format!("{}: no usable XML records this period", company.display_name),
                );
            } else {
                stats.companies_with_matches += 1;
                self.log(
                    LogLevel::Success,
                    &format!(
                        "{}: {} invoice number(s) indexed",
                        company.display_name,
                        index.len()
                    ),
                );
                indices.insert(company.key.clone(), index);
            }
        }

        indices
    }

    /// Match every Excel input against every indexed company.
    fn match_all(
        &self,
        excel_files: &[PathBuf],
        indices: &HashMap<String, CompanyIndex>,
        period: Period,
        stats: &mut ProcessingStats,
    ) -> Vec<OutputFile> {
        let mut output_files = Vec::new();

        for excel_file in excel_files {
            if self.cancel.is_cancelled() {
                break;
            }

            let filename = excel_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.log(LogLevel::Info, &format!("processing {filename}"));

            let rows = match read_rows(excel_file) {
                Ok(rows) => rows,
                Err(e) => {
                    self.log(LogLevel::Error, &format!("cannot read {filename}: {e}"));
                    continue;
                }
            };
            let rows = filter_rows_by_date(rows, period, &filename, stats, self.sink.as_ref());

            let before = output_files.len();
            for company in &self.config.companies {
                if self.cancel.is_cancelled() {
                    break;
                }
                let Some(index) = indices.get(&company.key) else {
                    continue;
                };

                match self.match_one(excel_file, &filename, &rows, index, company, stats) {
                    Some(output) => output_files.push(output),
                    None => {
                        if !stats.companies_no_matches.contains(&company.display_name) {
                            stats.companies_no_matches.push(company.display_name.clone());
                        }
                    }
                }
            }

            if output_files.len() > before {
                stats.excel_processed += 1;
                if self.config.delete_originals && !self.cancel.is_cancelled() {
                    match fs::remove_file(excel_file) {
                        Ok(()) => {
                            self.log(LogLevel::Info, &format!("source deleted: {filename}"))
                        }
                        Err(e) => self.log(
                            LogLevel::Warning,
                            &format!("could not delete {filename}: {e}"),
                        ),
                    }
                }
            }
        }

        output_files
    }

    /// Match one file against one company; `None` when nothing matched.
    fn match_one(
        &self,
        excel_file: &Path,
        filename: &str,
        rows: &[crate::excel::ExcelRow],
        index: &CompanyIndex,
        company: &CompanyConfig,
        stats: &mut ProcessingStats,
    ) -> Option<OutputFile> {
        let mut out = match OutputWorkbook::new() {
            Ok(out) => out,
            Err(e) => {
                self.log(LogLevel::Error, &format!("workbook error: {e}"));
                return None;
            }
        };

        let summary = match match_rows(
            rows,
            index,
            self.config.manual_review_limit,
            &company.commercial_activity,
            &mut out,
        ) {
            Ok(summary) => summary,
            Err(e) => {
                self.log(
                    LogLevel::Error,
                    &format!("{}: match failed for {filename}: {e}", company.display_name),
                );
                return None;
            }
        };

        if summary.matches == 0 {
            self.log(
                LogLevel::Warning,
                &format!("{}: no matches in {filename}", company.display_name),
            );
            return None;
        }

        let output_path = self.output_path(excel_file, company);
        if let Err(e) = out.save(&output_path) {
            self.log(
                LogLevel::Error,
                &format!("cannot save {}: {e}", output_path.display()),
            );
            return None;
        }

        {
            let detail = stats.company_mut(&company.key);
            detail.matches += summary.matches;
            detail.manual_reviews += summary.manual_reviews;
            detail.excel_rows_processed += rows.len();
        }
        stats.total_matches += summary.matches;
        stats.total_manual_reviews += summary.manual_reviews;

        self.log(
            LogLevel::Success,
            &format!(
                "{}: {} match(es) -> {}",
                company.display_name,
                summary.matches,
                output_path.display()
            ),
        );

        Some(OutputFile {
            source: filename.to_string(),
            output: output_path,
            company_key: company.key.clone(),
            company_name: company.display_name.clone(),
            matches: summary.matches,
            manual_reviews: summary.manual_reviews,
        })
    }

    fn output_path(&self, source: &Path, company: &CompanyConfig) -> PathBuf {
        let base = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "salida".to_string());
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");

        self.config.output_folder.join(format!(
            "{base}_procesado_{}_{timestamp}.xlsx",
            company.short_name
        ))
    }

    fn finish(
        &self,
        output_files: Vec<OutputFile>,
        mut stats: ProcessingStats,
        started: Instant,
    ) -> RunOutcome {
        stats.files_created = output_files.len();
        stats.processing_time_secs = started.elapsed().as_secs_f64();
        stats.finalize();

        let stopped_by_user = self.cancel.is_cancelled();
        if stopped_by_user {
            self.log(LogLevel::Warning, "processing stopped by user");
        } else {
            self.log_summary(&stats);
        }

        RunOutcome {
            success: !output_files.is_empty(),
            output_files,
            stats,
            stopped_by_user,
            error: None,
        }
    }

    fn failure(reason: String, mut stats: ProcessingStats, started: Instant) -> RunOutcome {
        stats.processing_time_secs = started.elapsed().as_secs_f64();
        stats.finalize();

        RunOutcome {
            success: false,
            output_files: Vec::new(),
            stats,
            stopped_by_user: false,
            error: Some(reason),
        }
    }

    fn log_summary(&self, stats: &ProcessingStats) {
        self.log(
            LogLevel::Info,
            &format!(
                "XML: {} found, {} in period, {} excluded by date",
                stats.total_xml_count, stats.total_xml_current_month, stats.total_xml_excluded_by_date
            ),
        );
        self.log(
            LogLevel::Info,
            &format!(
                "Excel rows: {} found, {} in period, {} excluded by date",
                stats.excel_rows_total, stats.excel_rows_current_month, stats.excel_rows_excluded_by_date
            ),
        );
        self.log(
            LogLevel::Info,
            &format!(
                "plates: {} extracted of {} free-text fields ({:.1}%), {} detail fallbacks",
                stats.placas_extracted,
                stats.otro_texto_processed,
                stats.placa_extraction_rate,
                stats.fallback_to_detalle
            ),
        );
        self.log(
            LogLevel::Success,
            &format!(
                "{} match(es), {} manual review(s), {} file(s) created in {:.1}s",
                stats.total_matches,
                stats.total_manual_reviews,
                stats.files_created,
                stats.processing_time_secs
            ),
        );
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.sink.log(level, message);
    }
}
