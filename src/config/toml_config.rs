use crate::utils::error::{ProbeError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CMR_ENDPOINT: &str = "https://cmr.earthdata.nasa.gov/search";
pub const REPORT_FORMATS: &[&str] = &["json", "csv"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub search: SearchConfig,
    pub auth: AuthConfig,
    pub download: DownloadConfig,
    pub sampling: SamplingConfig,
    pub report: ReportConfig,
    pub monitoring: MonitoringConfig,
    pub daacs: Vec<DaacProfile>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            auth: AuthConfig::default(),
            download: DownloadConfig::default(),
            sampling: SamplingConfig::default(),
            report: ReportConfig::default(),
            monitoring: MonitoringConfig::default(),
            daacs: default_daacs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub collections_page_size: usize,
    pub granules_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CMR_ENDPOINT.to_string(),
            timeout_seconds: 60,
            collections_page_size: 200,
            granules_page_size: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Earthdata Login token, usually `"${EARTHDATA_TOKEN}"`.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub output_path: String,
    pub concurrent_requests: usize,
    pub timeout_seconds: u64,
    pub keep_files: bool,
    pub unsupported_link_patterns: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_path: "./probe-data".to_string(),
            concurrent_requests: 4,
            timeout_seconds: 600,
            keep_files: false,
            unsupported_link_patterns: crate::domain::daac::UNSUPPORTED_LINK_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Fixed seed for reproducible runs; random when absent.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: "./probe-output".to_string(),
            output_formats: vec!["json".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

/// Sampling budget for one data archive center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaacProfile {
    pub short_name: String,
    pub collections_count: usize,
    pub collections_sample_size: usize,
    pub granules_count: usize,
    pub granules_sample_size: usize,
    pub granules_max_size_mb: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl DaacProfile {
    pub fn new(short_name: &str, collections_count: usize, collections_sample_size: usize, granules_max_size_mb: f64) -> Self {
        Self {
            short_name: short_name.to_string(),
            collections_count,
            collections_sample_size,
            granules_count: 100,
            granules_sample_size: 2,
            granules_max_size_mb,
            enabled: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

// ORNLDAAC 已沒有 on-prem collection，不列入預設
fn default_daacs() -> Vec<DaacProfile> {
    vec![
        DaacProfile::new("NSIDC", 50, 3, 100.0),
        DaacProfile::new("GES_DISC", 100, 2, 130.0),
        DaacProfile::new("LPDAAC", 100, 2, 100.0),
    ]
}

impl ProbeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProbeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProbeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EARTHDATA_TOKEN})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProbeError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("search.endpoint", &self.search.endpoint)?;
        validation::validate_positive_number("search.timeout_seconds", self.search.timeout_seconds as usize, 1)?;
        validation::validate_range("search.collections_page_size", self.search.collections_page_size, 1, 2000)?;
        validation::validate_range("search.granules_page_size", self.search.granules_page_size, 1, 2000)?;

        validation::validate_path("download.output_path", &self.download.output_path)?;
        validation::validate_positive_number("download.concurrent_requests", self.download.concurrent_requests, 1)?;

        validation::validate_path("report.output_path", &self.report.output_path)?;
        validation::validate_allowed_values("report.output_formats", &self.report.output_formats, REPORT_FORMATS)?;

        if self.daacs.is_empty() {
            return Err(ProbeError::MissingConfigError {
                field: "daacs".to_string(),
            });
        }
        for daac in &self.daacs {
            validation::validate_non_empty_string("daacs.short_name", &daac.short_name)?;
            validation::validate_positive_number("daacs.collections_sample_size", daac.collections_sample_size, 1)?;
            validation::validate_positive_number("daacs.granules_count", daac.granules_count, 1)?;
            validation::validate_positive_number("daacs.granules_sample_size", daac.granules_sample_size, 1)?;
            validation::validate_range("daacs.granules_max_size_mb", daac.granules_max_size_mb, 0.01, 1_000_000.0)?;
            if daac.collections_count <= daac.collections_sample_size {
                return Err(ProbeError::InvalidConfigValueError {
                    field: "daacs.collections_count".to_string(),
                    value: daac.collections_count.to_string(),
                    reason: format!(
                        "{} must fetch more collections than it samples ({})",
                        daac.short_name, daac.collections_sample_size
                    ),
                });
            }
        }

        Ok(())
    }

    /// Enabled DAAC profiles, optionally restricted to `only` (case-insensitive short names).
    pub fn enabled_daacs(&self, only: &[String]) -> Vec<DaacProfile> {
        self.daacs
            .iter()
            .filter(|d| d.enabled)
            .filter(|d| only.is_empty() || only.iter().any(|n| n.eq_ignore_ascii_case(&d.short_name)))
            .cloned()
            .collect()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for ProbeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
