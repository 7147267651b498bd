// Adapters layer: concrete implementations of the domain ports (catalog, downloads, storage).

pub mod auth;
pub mod cmr;
pub mod https;
pub mod storage;

pub use auth::Credentials;
pub use cmr::CmrClient;
pub use https::HttpsDownloader;
pub use storage::LocalStorage;
