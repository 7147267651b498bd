use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Anything the bounded sampler can pick: it only needs a size in megabytes.
pub trait SizedItem {
    fn size(&self) -> f64;
}

impl SizedItem for f64 {
    fn size(&self) -> f64 {
        *self
    }
}

impl<T: SizedItem + ?Sized> SizedItem for &T {
    fn size(&self) -> f64 {
        (**self).size()
    }
}

/// Rounds to two decimal places, the precision sizes are reported with.
pub fn round_mb(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedUrl {
    pub url: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCollection {
    pub concept_id: String,
    pub provider_id: String,
    pub short_name: String,
    pub version: String,
    pub entry_title: String,
    pub granule_count: Option<u64>,
}

impl DataCollection {
    pub fn concept_id(&self) -> &str {
        &self.concept_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGranule {
    pub concept_id: String,
    pub provider_id: String,
    pub granule_ur: String,
    pub size_mb: f64,
    pub related_urls: Vec<RelatedUrl>,
    pub cloud_hosted: bool,
}

impl DataGranule {
    /// External (HTTP/HTTPS) links pointing at the granule's data files.
    pub fn data_links(&self) -> Vec<&str> {
        self.related_urls
            .iter()
            .filter(|u| u.kind == "GET DATA")
            .filter(|u| u.url.starts_with("https://") || u.url.starts_with("http://"))
            .map(|u| u.url.as_str())
            .collect()
    }
}

impl SizedItem for DataGranule {
    fn size(&self) -> f64 {
        self.size_mb
    }
}

/// Converts a `Size`/`SizeUnit` pair from UMM-G to megabytes.
pub fn size_to_mb(size: f64, unit: Option<&str>) -> f64 {
    match unit.map(|u| u.to_ascii_uppercase()).as_deref() {
        Some("B") => size / (1024.0 * 1024.0),
        Some("KB") => size / 1024.0,
        Some("GB") => size * 1024.0,
        Some("TB") => size * 1024.0 * 1024.0,
        Some("PB") => size * 1024.0 * 1024.0 * 1024.0,
        // MB 或未標示單位
        _ => size,
    }
}

/// Items drawn by the bounded sampler, borrowed from the candidate pool.
#[derive(Debug, Clone)]
pub struct Sample<'a, T> {
    pub items: Vec<&'a T>,
    /// Sum of item sizes, rounded to 2 decimals.
    pub total_size: f64,
    /// Number of draws spent, accepted or not.
    pub attempts: usize,
}

impl<'a, T> Sample<'a, T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_size: 0.0,
            attempts: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionFilter {
    pub data_center: Option<String>,
    pub provider: Option<String>,
    pub short_name: Option<String>,
    pub cloud_hosted: Option<bool>,
}

impl CollectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_center(mut self, data_center: impl Into<String>) -> Self {
        self.data_center = Some(data_center.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn cloud_hosted(mut self, cloud_hosted: bool) -> Self {
        self.cloud_hosted = Some(cloud_hosted);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GranuleFilter {
    pub concept_id: Option<String>,
    pub short_name: Option<String>,
    pub version: Option<String>,
    pub provider: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    pub point: Option<(f64, f64)>,
    pub temporal: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl GranuleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn concept_id(mut self, concept_id: impl Into<String>) -> Self {
        self.concept_id = Some(concept_id.into());
        self
    }

    pub fn short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn bounding_box(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bounding_box = Some(BoundingBox {
            west,
            south,
            east,
            north,
        });
        self
    }

    pub fn point(mut self, lon: f64, lat: f64) -> Self {
        self.point = Some((lon, lat));
        self
    }

    pub fn temporal(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.temporal = Some((start, end));
        self
    }

    /// Spatial constraints must be paired with a collection-limiting parameter.
    pub fn is_valid(&self) -> bool {
        let spatial = self.bounding_box.is_some() || self.point.is_some();
        let limited = self.concept_id.is_some() || self.short_name.is_some();
        !spatial || limited
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Downloaded { url: String, path: PathBuf, bytes: u64 },
    AlreadyPresent { url: String, path: PathBuf },
    Failed { url: String, reason: String },
}

impl DownloadOutcome {
    pub fn url(&self) -> &str {
        match self {
            DownloadOutcome::Downloaded { url, .. }
            | DownloadOutcome::AlreadyPresent { url, .. }
            | DownloadOutcome::Failed { url, .. } => url,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::Downloaded { path, .. } | DownloadOutcome::AlreadyPresent { path, .. } => {
                Some(path)
            }
            DownloadOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, DownloadOutcome::Failed { .. })
    }
}
