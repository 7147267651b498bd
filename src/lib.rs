pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CmrClient, Credentials, HttpsDownloader, LocalStorage};
pub use config::{DaacProfile, ProbeConfig};
pub use core::engine::ProbeEngine;
pub use core::probe::{OnPremProbe, ProbeSettings};
pub use core::report::{ProbeReport, ReportWriter};
pub use core::sampler::{BoundedSampler, IndexSource};
pub use utils::error::{ProbeError, Result};
