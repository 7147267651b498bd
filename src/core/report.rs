use crate::domain::model::{DataCollection, DownloadOutcome};
use crate::domain::ports::Storage;
use crate::utils::error::{ProbeError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const JSON_REPORT: &str = "probe_report.json";
pub const CSV_REPORT: &str = "probe_report.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// Every sampled granule has at least one file on disk.
    Downloaded,
    /// Data links point somewhere the downloader cannot reach.
    Unsupported,
    /// No granule under the size limit was drawn.
    Oversized,
    Incomplete,
    NoGranules,
    Failed,
}

impl CollectionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CollectionStatus::Incomplete | CollectionStatus::NoGranules | CollectionStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Downloaded => "downloaded",
            CollectionStatus::Unsupported => "unsupported",
            CollectionStatus::Oversized => "oversized",
            CollectionStatus::Incomplete => "incomplete",
            CollectionStatus::NoGranules => "no_granules",
            CollectionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub concept_id: String,
    pub short_name: String,
    pub granule_hits: Option<u64>,
    pub granules_fetched: usize,
    pub granules_sampled: usize,
    pub sample_attempts: usize,
    pub reported_mb: f64,
    pub downloaded_mb: Option<f64>,
    pub files: Vec<DownloadOutcome>,
    pub status: CollectionStatus,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl CollectionReport {
    pub fn new(collection: &DataCollection) -> Self {
        Self {
            concept_id: collection.concept_id.clone(),
            short_name: collection.short_name.clone(),
            granule_hits: None,
            granules_fetched: 0,
            granules_sampled: 0,
            sample_attempts: 0,
            reported_mb: 0.0,
            downloaded_mb: None,
            files: Vec::new(),
            status: CollectionStatus::Failed,
            warnings: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DaacReport {
    pub short_name: String,
    pub collection_hits: Option<u64>,
    pub collections_fetched: usize,
    pub collections: Vec<CollectionReport>,
    pub error: Option<String>,
}

impl DaacReport {
    pub fn new(short_name: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            collection_hits: None,
            collections_fetched: 0,
            collections: Vec::new(),
            error: None,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.error.is_some() || self.collections.iter().any(|c| c.status.is_failure())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub seed: Option<u64>,
    pub daacs: Vec<DaacReport>,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    daac: &'a str,
    concept_id: &'a str,
    short_name: &'a str,
    status: &'a str,
    granule_hits: Option<u64>,
    granules_fetched: usize,
    granules_sampled: usize,
    reported_mb: f64,
    downloaded_mb: Option<f64>,
    warnings: String,
    error: &'a str,
}

impl ProbeReport {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            seed,
            daacs: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn has_failures(&self) -> bool {
        self.daacs.iter().any(|d| d.has_failures())
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionReport> {
        self.daacs.iter().flat_map(|d| d.collections.iter())
    }

    pub fn warning_count(&self) -> usize {
        self.collections().map(|c| c.warnings.len()).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One row per probed collection; a DAAC that failed before sampling gets a single row.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        for daac in &self.daacs {
            if let Some(error) = &daac.error {
                writer.serialize(CsvRow {
                    daac: &daac.short_name,
                    concept_id: "",
                    short_name: "",
                    status: "daac_failed",
                    granule_hits: None,
                    granules_fetched: 0,
                    granules_sampled: 0,
                    reported_mb: 0.0,
                    downloaded_mb: None,
                    warnings: String::new(),
                    error,
                })?;
            }
            for c in &daac.collections {
                writer.serialize(CsvRow {
                    daac: &daac.short_name,
                    concept_id: &c.concept_id,
                    short_name: &c.short_name,
                    status: c.status.as_str(),
                    granule_hits: c.granule_hits,
                    granules_fetched: c.granules_fetched,
                    granules_sampled: c.granules_sampled,
                    reported_mb: c.reported_mb,
                    downloaded_mb: c.downloaded_mb,
                    warnings: c.warnings.join("; "),
                    error: c.error.as_deref().unwrap_or(""),
                })?;
            }
        }

        let data = writer.into_inner().map_err(|e| ProbeError::ProcessingError {
            message: format!("failed to flush CSV report: {}", e),
        })?;
        String::from_utf8(data).map_err(|e| ProbeError::ProcessingError {
            message: format!("CSV report is not UTF-8: {}", e),
        })
    }
}

/// Renders a report into the requested formats through a [`Storage`].
pub struct ReportWriter<S: Storage> {
    storage: S,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the names of the files written.
    pub async fn write(&self, report: &ProbeReport, formats: &[String]) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for format in formats {
            let (name, body) = match format.as_str() {
                "json" => (JSON_REPORT, report.to_json()?),
                "csv" => (CSV_REPORT, report.to_csv()?),
                other => {
                    return Err(ProbeError::InvalidConfigValueError {
                        field: "report.output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported report format".to_string(),
                    })
                }
            };
            tracing::debug!("Writing {} ({} bytes)", name, body.len());
            self.storage.write_file(name, body.as_bytes()).await?;
            written.push(name.to_string());
        }
        Ok(written)
    }
}
