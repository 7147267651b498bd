pub mod engine;
pub mod probe;
pub mod report;
pub mod sampler;

pub use crate::domain::model::{DataCollection, DataGranule, Sample, SizedItem};
pub use crate::domain::ports::{Catalog, Downloader, Storage};
pub use crate::utils::error::Result;
