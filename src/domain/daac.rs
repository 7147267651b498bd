/// CMR providers whose holdings live in the cloud tier.
pub const CLOUD_PROVIDERS: &[&str] = &[
    "GES_DISC",
    "LPCLOUD",
    "NSIDC_CPRD",
    "POCLOUD",
    "ASF",
    "GHRC_DAAC",
    "ORNL_CLOUD",
];

/// Link patterns the downloader cannot fetch over plain HTTPS.
pub const UNSUPPORTED_LINK_PATTERNS: &[&str] = &["podaac-tools.jpl.nasa.gov/drive"];

pub fn is_cloud_provider(provider_id: &str) -> bool {
    CLOUD_PROVIDERS.contains(&provider_id)
}

/// True when none of `data_links` matches an unsupported pattern.
pub fn supported_collection<S: AsRef<str>>(data_links: &[S], unsupported_patterns: &[String]) -> bool {
    data_links.iter().all(|url| {
        unsupported_patterns
            .iter()
            .all(|pattern| !url.as_ref().contains(pattern.as_str()))
    })
}
