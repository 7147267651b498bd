use crate::domain::model::{
    CollectionFilter, DataCollection, DataGranule, DownloadOutcome, GranuleFilter,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Metadata catalog the probe searches for collections and granules.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn collection_hits(&self, filter: &CollectionFilter) -> Result<u64>;
    async fn collections(&self, filter: &CollectionFilter, limit: usize) -> Result<Vec<DataCollection>>;
    async fn granule_hits(&self, filter: &GranuleFilter) -> Result<u64>;
    async fn granules(&self, filter: &GranuleFilter, limit: usize) -> Result<Vec<DataGranule>>;
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetches the data links of `granules` into `local_path`, one outcome per distinct link.
    async fn download(
        &self,
        granules: &[&DataGranule],
        local_path: &Path,
    ) -> Result<Vec<DownloadOutcome>>;
}
