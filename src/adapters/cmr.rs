//! NASA CMR search client speaking the `umm_json` format.
//!
//! API: https://cmr.earthdata.nasa.gov/search/site/docs/search/api.html

use crate::adapters::auth::Credentials;
use crate::config::toml_config::SearchConfig;
use crate::domain::daac::is_cloud_provider;
use crate::domain::model::{
    size_to_mb, CollectionFilter, DataCollection, DataGranule, GranuleFilter, RelatedUrl,
};
use crate::domain::ports::Catalog;
use crate::utils::error::{ProbeError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const HITS_HEADER: &str = "CMR-Hits";
const TEMPORAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

type QueryParams = Vec<(&'static str, String)>;

#[derive(Debug, Deserialize)]
struct UmmResponse<U> {
    #[serde(default)]
    hits: Option<u64>,
    #[serde(default)]
    items: Vec<UmmItem<U>>,
}

#[derive(Debug, Deserialize)]
struct UmmItem<U> {
    meta: UmmMeta,
    umm: U,
}

#[derive(Debug, Deserialize)]
struct UmmMeta {
    #[serde(rename = "concept-id")]
    concept_id: String,
    #[serde(rename = "provider-id", default)]
    provider_id: String,
    #[serde(rename = "granule-count", default)]
    granule_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CollectionUmm {
    short_name: String,
    version: String,
    entry_title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GranuleUmm {
    #[serde(rename = "GranuleUR")]
    granule_ur: String,
    data_granule: Option<UmmDataGranule>,
    related_urls: Vec<UmmRelatedUrl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct UmmDataGranule {
    archive_and_distribution_information: Vec<ArchiveInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ArchiveInfo {
    size: Option<f64>,
    size_unit: Option<String>,
    size_in_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UmmRelatedUrl {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Type", default)]
    kind: String,
}

impl From<UmmItem<CollectionUmm>> for DataCollection {
    fn from(item: UmmItem<CollectionUmm>) -> Self {
        DataCollection {
            concept_id: item.meta.concept_id,
            provider_id: item.meta.provider_id,
            short_name: item.umm.short_name,
            version: item.umm.version,
            entry_title: item.umm.entry_title,
            granule_count: item.meta.granule_count,
        }
    }
}

impl UmmItem<GranuleUmm> {
    fn size_mb(&self) -> f64 {
        self.umm
            .data_granule
            .as_ref()
            .map(|dg| {
                dg.archive_and_distribution_information
                    .iter()
                    .map(|info| match info.size_in_bytes {
                        Some(bytes) => bytes as f64 / (1024.0 * 1024.0),
                        None => size_to_mb(info.size.unwrap_or(0.0), info.size_unit.as_deref()),
                    })
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Cloud holdings come from a cloud provider and are served from a cumulus bucket.
    fn looks_cloud_hosted(&self) -> bool {
        is_cloud_provider(&self.meta.provider_id)
            && self
                .umm
                .related_urls
                .first()
                .map(|u| u.url.contains("cumulus"))
                .unwrap_or(false)
    }

    fn into_granule(self, cloud_hosted: bool) -> DataGranule {
        let size_mb = self.size_mb();
        DataGranule {
            concept_id: self.meta.concept_id,
            provider_id: self.meta.provider_id,
            granule_ur: self.umm.granule_ur,
            size_mb,
            related_urls: self
                .umm
                .related_urls
                .into_iter()
                .map(|u| RelatedUrl {
                    url: u.url,
                    kind: u.kind,
                })
                .collect(),
            cloud_hosted,
        }
    }
}

fn collection_params(filter: &CollectionFilter) -> QueryParams {
    let mut params: QueryParams = vec![
        ("has_granules", "true".to_string()),
        ("include_granule_counts", "true".to_string()),
    ];
    if let Some(data_center) = &filter.data_center {
        params.push(("data_center", data_center.clone()));
    }
    if let Some(provider) = &filter.provider {
        params.push(("provider", provider.clone()));
    }
    if let Some(short_name) = &filter.short_name {
        params.push(("short_name", short_name.clone()));
    }
    if let Some(cloud_hosted) = filter.cloud_hosted {
        params.push(("cloud_hosted", cloud_hosted.to_string()));
    }
    params
}

fn granule_params(filter: &GranuleFilter) -> Result<QueryParams> {
    if !filter.is_valid() {
        return Err(ProbeError::ValidationError {
            message: "spatial granule queries need a concept_id or short_name".to_string(),
        });
    }

    let mut params: QueryParams = Vec::new();
    if let Some(concept_id) = &filter.concept_id {
        params.push(("concept_id", concept_id.clone()));
    }
    if let Some(short_name) = &filter.short_name {
        params.push(("short_name", short_name.clone()));
    }
    if let Some(version) = &filter.version {
        params.push(("version", version.clone()));
    }
    if let Some(provider) = &filter.provider {
        params.push(("provider", provider.clone()));
    }
    if let Some(bbox) = &filter.bounding_box {
        params.push((
            "bounding_box",
            format!("{},{},{},{}", bbox.west, bbox.south, bbox.east, bbox.north),
        ));
    }
    if let Some((lon, lat)) = filter.point {
        params.push(("point", format!("{},{}", lon, lat)));
    }
    if let Some((start, end)) = &filter.temporal {
        params.push((
            "temporal",
            format!("{},{}", start.format(TEMPORAL_FORMAT), end.format(TEMPORAL_FORMAT)),
        ));
    }
    Ok(params)
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProbeError::CatalogError {
        status: status.as_u16(),
        message,
    })
}

pub struct CmrClient {
    client: Client,
    endpoint: String,
    credentials: Credentials,
    collections_page_size: usize,
    granules_page_size: usize,
}

impl CmrClient {
    pub fn new(config: &SearchConfig, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("granule-probe/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            credentials,
            collections_page_size: config.collections_page_size,
            granules_page_size: config.granules_page_size,
        })
    }

    fn search_url(&self, concept: &str) -> String {
        format!("{}/{}.umm_json", self.endpoint, concept)
    }

    async fn hits(&self, concept: &str, params: &QueryParams) -> Result<u64> {
        let url = self.search_url(concept);
        tracing::debug!("Counting {} hits at {}", concept, url);

        let request = self
            .client
            .get(&url)
            .query(params)
            .query(&[("page_size", "0")]);
        let response = check_status(self.credentials.apply(request).send().await?).await?;

        let header_hits = response
            .headers()
            .get(HITS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(hits) = header_hits {
            return Ok(hits);
        }

        let body: UmmResponse<serde_json::Value> = response.json().await?;
        body.hits.ok_or_else(|| ProbeError::ProcessingError {
            message: format!("CMR response for {} carried no hits count", concept),
        })
    }

    /// Pages through results until `limit` items are collected or a page comes back empty.
    async fn pages<U: DeserializeOwned + Default>(
        &self,
        concept: &str,
        params: &QueryParams,
        limit: usize,
        page_cap: usize,
    ) -> Result<Vec<Vec<UmmItem<U>>>> {
        let url = self.search_url(concept);
        let page_size = limit.min(page_cap).max(1);

        let mut pages = Vec::new();
        let mut collected = 0;
        let mut page_num = 1;
        while collected < limit {
            tracing::debug!("Fetching {} page {} (page_size={})", concept, page_num, page_size);
            let request = self.client.get(&url).query(params).query(&[
                ("page_size", page_size.to_string()),
                ("page_num", page_num.to_string()),
            ]);
            let response = check_status(self.credentials.apply(request).send().await?).await?;
            let body: UmmResponse<U> = response.json().await?;

            if body.items.is_empty() {
                break;
            }
            collected += body.items.len();
            pages.push(body.items);
            page_num += 1;
        }
        Ok(pages)
    }
}

#[async_trait]
impl Catalog for CmrClient {
    async fn collection_hits(&self, filter: &CollectionFilter) -> Result<u64> {
        self.hits("collections", &collection_params(filter)).await
    }

    async fn collections(&self, filter: &CollectionFilter, limit: usize) -> Result<Vec<DataCollection>> {
        let pages = self
            .pages::<CollectionUmm>(
                "collections",
                &collection_params(filter),
                limit,
                self.collections_page_size,
            )
            .await?;

        Ok(pages
            .into_iter()
            .flatten()
            .take(limit)
            .map(DataCollection::from)
            .collect())
    }

    async fn granule_hits(&self, filter: &GranuleFilter) -> Result<u64> {
        self.hits("granules", &granule_params(filter)?).await
    }

    async fn granules(&self, filter: &GranuleFilter, limit: usize) -> Result<Vec<DataGranule>> {
        let params = granule_params(filter)?;
        let pages = self
            .pages::<GranuleUmm>("granules", &params, limit, self.granules_page_size)
            .await?;

        let mut granules = Vec::new();
        for page in pages {
            // 以每頁第一筆判斷整頁是否位於雲端
            let cloud_hosted = page.first().map(|g| g.looks_cloud_hosted()).unwrap_or(false);
            granules.extend(page.into_iter().map(|g| g.into_granule(cloud_hosted)));
        }
        granules.truncate(limit);
        Ok(granules)
    }
}
