pub mod toml_config;

pub use toml_config::{DaacProfile, ProbeConfig};

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "granule-probe")]
#[command(about = "Samples on-prem CMR collections and checks that their granules download over HTTPS")]
pub struct CliConfig {
    /// Path to a TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Only probe these DAACs (repeatable or comma separated)
    #[arg(long, value_delimiter = ',')]
    pub daac: Vec<String>,

    /// Seed for the random sampler, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory granules are downloaded into
    #[arg(long)]
    pub download_path: Option<String>,

    /// Directory the probe report is written to
    #[arg(long)]
    pub output_path: Option<String>,

    /// Keep downloaded files instead of removing them after measuring
    #[arg(long)]
    pub keep_files: bool,

    #[arg(long, help = "Log CPU and memory usage per DAAC")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Show what would be probed without contacting the catalog
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 命令列參數覆蓋檔案設定
    pub fn apply_to(&self, config: &mut ProbeConfig) {
        if let Some(seed) = self.seed {
            config.sampling.seed = Some(seed);
        }
        if let Some(path) = &self.download_path {
            config.download.output_path = path.clone();
        }
        if let Some(path) = &self.output_path {
            config.report.output_path = path.clone();
        }
        if self.keep_files {
            config.download.keep_files = true;
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.json_logs {
            config.monitoring.json_logs = true;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file_settings() {
        let cli = CliConfig::parse_from([
            "granule-probe",
            "--seed",
            "99",
            "--daac",
            "NSIDC,LPDAAC",
            "--download-path",
            "/scratch/granules",
            "--keep-files",
        ]);
        let mut config = ProbeConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.sampling.seed, Some(99));
        assert_eq!(config.download.output_path, "/scratch/granules");
        assert!(config.download.keep_files);
        assert_eq!(cli.daac, vec!["NSIDC", "LPDAAC"]);
        assert_eq!(config.enabled_daacs(&cli.daac).len(), 2);
    }
}
