//! Configuration structures for a reconciliation run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Emitter name whose invoices are resolved through the associated PDF
/// instead of the normal detail/plate path.
pub const DEFAULT_SPECIAL_VENDOR: &str = "Correos de Costa Rica SA";

/// Main configuration for a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Folder scanned for incoming Excel files.
    pub input_folder: PathBuf,

    /// Folder where per-company output workbooks are written.
    pub output_folder: PathBuf,

    /// Companies, processed in this order.
    pub companies: Vec<CompanyConfig>,

    /// Detail lines above this count flag the row for manual review.
    pub manual_review_limit: usize,

    /// Delete a source Excel file once it produced at least one output.
    pub delete_originals: bool,

    /// Input Excel files must start with this prefix.
    pub excel_prefix: String,

    /// Emitter processed through its associated PDF.
    pub special_vendor: String,

    /// Emitter names whose fuel invoices skip plate extraction and keep
    /// their raw detail lines. Matched after diacritic/case normalization.
    pub combustible_exclusions: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::new(),
            output_folder: PathBuf::new(),
            companies: Vec::new(),
            manual_review_limit: 3,
            delete_originals: true,
            excel_prefix: "cargador".to_string(),
            special_vendor: DEFAULT_SPECIAL_VENDOR.to_string(),
            combustible_exclusions: Vec::new(),
        }
    }
}

/// One configured company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// Stable key used in stats and logs.
    pub key: String,

    /// Human-readable name used in reports.
    pub display_name: String,

    /// Compact name embedded in output filenames.
    pub short_name: String,

    /// Base XML folder; the current `year/month` is appended per run.
    pub base_folder: PathBuf,

    /// Static commercial-activity string appended to every output row.
    #[serde(default)]
    pub commercial_activity: String,
}

impl ReconcileConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// A filled-in template for `config init`.
    pub fn example() -> Self {
        Self {
            input_folder: PathBuf::from("entrada"),
            output_folder: PathBuf::from("procesados"),
            companies: vec![
                CompanyConfig {
                    key: "nargallo".to_string(),
                    display_name: "Nargallo del Este S.A.".to_string(),
                    short_name: "NargalloDelEste".to_string(),
                    base_folder: PathBuf::from("xml/nargallo"),
                    commercial_activity: String::new(),
                },
                CompanyConfig {
                    key: "ventas_fruno".to_string(),
                    display_name: "Ventas Fruno, S.A.".to_string(),
                    short_name: "VentasFruno".to_string(),
                    base_folder: PathBuf::from("xml/ventas_fruno"),
                    commercial_activity: String::new(),
                },
            ],
            ..Self::default()
        }
    }

    /// Look up a company by key.
    pub fn company(&self, key: &str) -> Option<&CompanyConfig> {
        self.companies.iter().find(|c| c.key == key)
    }
}
