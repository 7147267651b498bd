//! On-prem download probe.
//!
//! For each DAAC: sample on-prem collections, bounded-sample small granules
//! from each, download them over HTTPS and compare the bytes on disk with the
//! size the catalog reported. Size discrepancies and empty downloads are
//! warnings; they depend on the live catalog and must not abort a run.

use crate::config::toml_config::{DaacProfile, ProbeConfig};
use crate::core::report::{CollectionReport, CollectionStatus, DaacReport};
use crate::core::sampler::{sample_distinct, BoundedSampler};
use crate::domain::daac::supported_collection;
use crate::domain::model::{
    round_mb, CollectionFilter, DataCollection, DataGranule, DownloadOutcome, GranuleFilter,
};
use crate::domain::ports::{Catalog, Downloader};
use crate::utils::error::{ProbeError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Values are rounded to 2 decimals, so any real difference is at least 0.01.
const SIZE_TOLERANCE_MB: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub download_root: PathBuf,
    pub keep_files: bool,
    pub unsupported_link_patterns: Vec<String>,
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            download_root: PathBuf::from(&config.download.output_path),
            keep_files: config.download.keep_files,
            unsupported_link_patterns: config.download.unsupported_link_patterns.clone(),
        }
    }
}

pub struct OnPremProbe<C, D, R = ChaCha8Rng> {
    catalog: C,
    downloader: D,
    rng: R,
    seed: Option<u64>,
    settings: ProbeSettings,
}

impl<C: Catalog, D: Downloader> OnPremProbe<C, D, ChaCha8Rng> {
    /// A fixed `seed` makes collection and granule selection reproducible.
    pub fn new(catalog: C, downloader: D, settings: ProbeSettings, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self {
            catalog,
            downloader,
            rng,
            seed,
            settings,
        }
    }
}

impl<C: Catalog, D: Downloader, R: Rng> OnPremProbe<C, D, R> {
    pub fn with_rng(catalog: C, downloader: D, settings: ProbeSettings, rng: R) -> Self {
        Self {
            catalog,
            downloader,
            rng,
            seed: None,
            settings,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub async fn probe_daac(&mut self, daac: &DaacProfile) -> DaacReport {
        let mut report = DaacReport::new(&daac.short_name);
        if let Err(e) = self.probe_collections(daac, &mut report).await {
            tracing::error!("❌ {}: {}", daac.short_name, e);
            report.error = Some(e.to_string());
        }
        report
    }

    async fn probe_collections(&mut self, daac: &DaacProfile, report: &mut DaacReport) -> Result<()> {
        let filter = CollectionFilter::new()
            .data_center(daac.short_name.as_str())
            .cloud_hosted(false);

        let hits = self.catalog.collection_hits(&filter).await?;
        tracing::info!("On-prem collections for {}: {}", daac.short_name, hits);
        report.collection_hits = Some(hits);

        let collections = self.catalog.collections(&filter, daac.collections_count).await?;
        report.collections_fetched = collections.len();
        if collections.len() <= daac.collections_sample_size {
            return Err(ProbeError::ProcessingError {
                message: format!(
                    "{} returned {} on-prem collection(s), need more than {}",
                    daac.short_name,
                    collections.len(),
                    daac.collections_sample_size
                ),
            });
        }

        let sampled = sample_distinct(&collections, daac.collections_sample_size, &mut self.rng);
        tracing::info!("Sampled {} collections", sampled.len());

        for collection in sampled {
            let collection_report = self.probe_collection(daac, collection).await;
            report.collections.push(collection_report);
        }
        Ok(())
    }

    pub async fn probe_collection(&mut self, daac: &DaacProfile, collection: &DataCollection) -> CollectionReport {
        let mut report = CollectionReport::new(collection);
        if let Err(e) = self.check_collection(daac, collection, &mut report).await {
            tracing::error!("❌ {}: {}", collection.concept_id(), e);
            report.status = CollectionStatus::Failed;
            report.error = Some(e.to_string());
        }
        report
    }

    async fn check_collection(
        &mut self,
        daac: &DaacProfile,
        collection: &DataCollection,
        report: &mut CollectionReport,
    ) -> Result<()> {
        let concept_id = collection.concept_id();
        let filter = GranuleFilter::new().concept_id(concept_id);

        let total_granules = self.catalog.granule_hits(&filter).await?;
        report.granule_hits = Some(total_granules);

        let granules = self.catalog.granules(&filter, daac.granules_count).await?;
        report.granules_fetched = granules.len();
        let Some(first) = granules.first() else {
            report.status = CollectionStatus::NoGranules;
            report.error = Some("Could not fetch granules".to_string());
            return Ok(());
        };

        let data_links = first.data_links();
        if !supported_collection(&data_links, &self.settings.unsupported_link_patterns) {
            tracing::warn!("PODAAC DRIVE is not supported at the moment: {:?}", data_links);
            report.status = CollectionStatus::Unsupported;
            report
                .warnings
                .push(format!("unsupported data links: {}", data_links.join(", ")));
            return Ok(());
        }

        let sample = BoundedSampler::new(daac.granules_sample_size, daac.granules_max_size_mb)
            .sample_with(&granules, &mut self.rng);
        report.granules_sampled = sample.len();
        report.sample_attempts = sample.attempts;
        report.reported_mb = sample.total_size;

        if sample.is_empty() {
            tracing::debug!("Skipping {}, granule size exceeds configured max size", concept_id);
            report.status = CollectionStatus::Oversized;
            return Ok(());
        }

        tracing::info!(
            "Testing {}, granules in collection: {}, download size(MB): {}",
            concept_id,
            total_granules,
            sample.total_size
        );

        let path = self.settings.download_root.join(concept_id.replace(['/', '\\'], "_"));
        let outcomes = self.downloader.download(&sample.items, &path).await;
        let measured = match &outcomes {
            Ok(_) => directory_size_mb(&path),
            Err(_) => Ok(0.0),
        };
        if !self.settings.keep_files {
            remove_download_dir(&path).await;
        }
        let outcomes = outcomes?;
        let downloaded_mb = measured?;

        let missing = missing_granules(&sample.items, &outcomes);
        let distinct_granules = sample
            .items
            .iter()
            .map(|g| g.concept_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        report.files = outcomes;
        report.downloaded_mb = Some(downloaded_mb);
        if missing.is_empty() {
            report.status = CollectionStatus::Downloaded;
        } else {
            report.status = CollectionStatus::Incomplete;
            report.error = Some(format!(
                "{} of {} granule(s) have no file on disk: {}",
                missing.len(),
                distinct_granules,
                missing.join(", ")
            ));
        }

        if downloaded_mb <= 0.0 {
            tracing::warn!("Could not download {}", concept_id);
            report.warnings.push("nothing was downloaded".to_string());
        }
        if (downloaded_mb - sample.total_size).abs() > SIZE_TOLERANCE_MB {
            let warning = format!(
                "downloaded size {}MB is different from the size reported by CMR: {}MB",
                downloaded_mb, sample.total_size
            );
            tracing::warn!("Warning: {} {}", concept_id, warning);
            report.warnings.push(warning);
        }

        Ok(())
    }
}

/// Concept ids of sampled granules none of whose data links downloaded successfully.
fn missing_granules(granules: &[&DataGranule], outcomes: &[DownloadOutcome]) -> Vec<String> {
    let fetched: HashSet<&str> = outcomes
        .iter()
        .filter(|o| o.is_success())
        .map(|o| o.url())
        .collect();

    let mut seen = HashSet::new();
    granules
        .iter()
        .filter(|g| seen.insert(g.concept_id.as_str()))
        .filter(|g| !g.data_links().iter().any(|url| fetched.contains(url)))
        .map(|g| g.concept_id.clone())
        .collect()
}

/// Total size of the regular files below `path`, in MB rounded to 2 decimals.
pub fn directory_size_mb(path: &Path) -> Result<f64> {
    let mut total: u64 = 0;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(std::io::Error::from)?.len();
        }
    }
    Ok(round_mb(total as f64 / (1024.0 * 1024.0)))
}

async fn remove_download_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not clean {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RelatedUrl;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeCatalog {
        collections: Vec<DataCollection>,
        granules: Vec<DataGranule>,
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn collection_hits(&self, _filter: &CollectionFilter) -> Result<u64> {
            Ok(self.collections.len() as u64)
        }

        async fn collections(&self, _filter: &CollectionFilter, limit: usize) -> Result<Vec<DataCollection>> {
            Ok(self.collections.iter().take(limit).cloned().collect())
        }

        async fn granule_hits(&self, _filter: &GranuleFilter) -> Result<u64> {
            Ok(self.granules.len() as u64)
        }

        async fn granules(&self, _filter: &GranuleFilter, limit: usize) -> Result<Vec<DataGranule>> {
            Ok(self.granules.iter().take(limit).cloned().collect())
        }
    }

    /// Writes `bytes_per_file` bytes per link and remembers what it was asked for.
    /// Links containing one of `failing` are reported as failed.
    #[derive(Default)]
    struct FakeDownloader {
        bytes_per_file: usize,
        failing: Vec<String>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, granules: &[&DataGranule], local_path: &Path) -> Result<Vec<DownloadOutcome>> {
            std::fs::create_dir_all(local_path)?;
            let mut outcomes = Vec::new();
            for granule in granules {
                for url in granule.data_links() {
                    if self.failing.iter().any(|f| url.contains(f.as_str())) {
                        outcomes.push(DownloadOutcome::Failed {
                            url: url.to_string(),
                            reason: "HTTP 404 Not Found".to_string(),
                        });
                        continue;
                    }
                    let path = local_path.join(url.rsplit('/').next().unwrap_or("file"));
                    std::fs::write(&path, vec![0u8; self.bytes_per_file])?;
                    self.requested.lock().unwrap().push(url.to_string());
                    outcomes.push(DownloadOutcome::Downloaded {
                        url: url.to_string(),
                        path,
                        bytes: self.bytes_per_file as u64,
                    });
                }
            }
            Ok(outcomes)
        }
    }

    fn collection(id: &str) -> DataCollection {
        DataCollection {
            concept_id: id.to_string(),
            provider_id: "LPDAAC_ECS".to_string(),
            short_name: "MOD09GA".to_string(),
            version: "061".to_string(),
            entry_title: "MODIS/Terra Surface Reflectance".to_string(),
            granule_count: Some(1),
        }
    }

    fn granule(id: &str, size_mb: f64, url: &str) -> DataGranule {
        DataGranule {
            concept_id: id.to_string(),
            provider_id: "LPDAAC_ECS".to_string(),
            granule_ur: id.to_string(),
            size_mb,
            related_urls: vec![RelatedUrl {
                url: url.to_string(),
                kind: "GET DATA".to_string(),
            }],
            cloud_hosted: false,
        }
    }

    fn settings(root: &Path) -> ProbeSettings {
        ProbeSettings {
            download_root: root.to_path_buf(),
            keep_files: false,
            unsupported_link_patterns: vec!["podaac-tools.jpl.nasa.gov/drive".to_string()],
        }
    }

    fn profile() -> DaacProfile {
        DaacProfile::new("LPDAAC", 100, 1, 100.0)
    }

    #[tokio::test]
    async fn test_repeated_draw_downloads_once_and_warns_on_size() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FakeCatalog {
            collections: vec![collection("C1-LPDAAC_ECS"), collection("C2-LPDAAC_ECS")],
            granules: vec![granule("G1", 1.0, "https://e4ftl01.cr.usgs.gov/MOLT/g1.hdf")],
        };
        let downloader = FakeDownloader {
            bytes_per_file: 1024 * 1024,
            ..Default::default()
        };
        let mut probe = OnPremProbe::new(catalog, downloader, settings(temp_dir.path()), Some(1));

        let report = probe.probe_daac(&profile()).await;

        assert!(report.error.is_none());
        assert_eq!(report.collections.len(), 1);
        let collection = &report.collections[0];
        assert_eq!(collection.status, CollectionStatus::Downloaded);
        // 單一 granule 被抽兩次，回報大小加倍
        assert_eq!(collection.granules_sampled, 2);
        assert_eq!(collection.reported_mb, 2.0);
        assert_eq!(collection.downloaded_mb, Some(1.0));
        assert_eq!(collection.warnings.len(), 1);
        // 下載目錄在量測後清除
        assert!(!temp_dir.path().join(&collection.concept_id).exists());
    }

    #[tokio::test]
    async fn test_unsupported_links_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FakeCatalog {
            collections: vec![collection("C1-PODAAC"), collection("C2-PODAAC")],
            granules: vec![granule(
                "G1",
                1.0,
                "https://podaac-tools.jpl.nasa.gov/drive/files/allData/g1.nc",
            )],
        };
        let mut probe = OnPremProbe::new(catalog, FakeDownloader::default(), settings(temp_dir.path()), Some(5));

        let report = probe.probe_daac(&profile()).await;

        assert_eq!(report.collections[0].status, CollectionStatus::Unsupported);
        assert!(!report.has_failures());
        assert!(probe.downloader.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_granules_are_not_downloaded() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FakeCatalog {
            collections: vec![collection("C1-GES_DISC"), collection("C2-GES_DISC")],
            granules: vec![granule("G1", 5000.0, "https://data.gesdisc.earthdata.nasa.gov/big.nc4")],
        };
        let mut probe = OnPremProbe::new(catalog, FakeDownloader::default(), settings(temp_dir.path()), Some(9));

        let report = probe.probe_daac(&profile()).await;
        let collection = &report.collections[0];

        assert_eq!(collection.status, CollectionStatus::Oversized);
        assert_eq!(collection.sample_attempts, 5);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_too_few_collections_fails_the_daac() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FakeCatalog {
            collections: vec![collection("C1-ORNL_DAAC")],
            granules: Vec::new(),
        };
        let mut probe = OnPremProbe::new(catalog, FakeDownloader::default(), settings(temp_dir.path()), None);

        let report = probe.probe_daac(&profile()).await;

        assert!(report.error.as_deref().unwrap().contains("need more than 1"));
        assert!(report.collections.is_empty());
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_collection_without_granules_fails() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FakeCatalog {
            collections: vec![collection("C1-NSIDC_ECS"), collection("C2-NSIDC_ECS")],
            granules: Vec::new(),
        };
        let mut probe = OnPremProbe::new(catalog, FakeDownloader::default(), settings(temp_dir.path()), Some(2));

        let report = probe.probe_daac(&profile()).await;

        assert_eq!(report.collections[0].status, CollectionStatus::NoGranules);
        assert!(report.has_failures());
    }

    fn granule_with_links(id: &str, urls: &[&str]) -> DataGranule {
        DataGranule {
            related_urls: urls
                .iter()
                .map(|url| RelatedUrl {
                    url: url.to_string(),
                    kind: "GET DATA".to_string(),
                })
                .collect(),
            ..granule(id, 1.0, "")
        }
    }

    #[test]
    fn test_missing_granules_counts_granules_not_files() {
        let two_links = granule_with_links(
            "G1",
            &["https://e4ftl01.cr.usgs.gov/g1/a.h5", "https://e4ftl01.cr.usgs.gov/g1/b.h5"],
        );
        let one_link = granule_with_links("G2", &["https://e4ftl01.cr.usgs.gov/g2/c.h5"]);
        let outcomes = vec![
            DownloadOutcome::Downloaded {
                url: "https://e4ftl01.cr.usgs.gov/g1/a.h5".to_string(),
                path: PathBuf::from("a.h5"),
                bytes: 10,
            },
            DownloadOutcome::AlreadyPresent {
                url: "https://e4ftl01.cr.usgs.gov/g1/b.h5".to_string(),
                path: PathBuf::from("b.h5"),
            },
            DownloadOutcome::Failed {
                url: "https://e4ftl01.cr.usgs.gov/g2/c.h5".to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            },
        ];

        let missing = missing_granules(&[&two_links, &one_link, &one_link], &outcomes);

        assert_eq!(missing, vec!["G2".to_string()]);
        assert!(missing_granules(&[&two_links, &two_links], &outcomes).is_empty());
    }

    #[tokio::test]
    async fn test_failed_granule_makes_collection_incomplete() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FakeCatalog {
            collections: vec![collection("C1-LPDAAC_ECS")],
            granules: vec![
                granule_with_links(
                    "G1",
                    &["https://e4ftl01.cr.usgs.gov/g1/a.h5", "https://e4ftl01.cr.usgs.gov/g1/b.h5"],
                ),
                granule_with_links("G2", &["https://e4ftl01.cr.usgs.gov/g2/c.h5"]),
            ],
        };
        let downloader = FakeDownloader {
            bytes_per_file: 1024,
            failing: vec!["c.h5".to_string()],
            ..Default::default()
        };
        let mut probe = OnPremProbe::new(catalog, downloader, settings(temp_dir.path()), Some(1));
        let mut daac = profile();
        daac.granules_sample_size = 4;

        let report = probe.probe_collection(&daac, &collection("C1-LPDAAC_ECS")).await;

        // 兩個 granule 的檔案數相同，但只要 G2 被抽中就必須是 Incomplete
        let drew_g2 = report.files.iter().any(|f| f.url().ends_with("c.h5"));
        if drew_g2 {
            assert_eq!(report.status, CollectionStatus::Incomplete);
            assert!(report.error.as_deref().unwrap().contains("G2"));
        } else {
            assert_eq!(report.status, CollectionStatus::Downloaded);
        }
        assert!(report.status.is_failure() == drew_g2);
    }

    #[test]
    fn test_directory_size_mb_counts_nested_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        std::fs::write(temp_dir.path().join("one.bin"), vec![0u8; 512 * 1024]).unwrap();
        std::fs::write(temp_dir.path().join("a/b/two.bin"), vec![0u8; 1024 * 1024]).unwrap();

        assert_eq!(directory_size_mb(temp_dir.path()).unwrap(), 1.5);
    }
}
