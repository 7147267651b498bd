use anyhow::Result;
use granule_probe::core::report::{CollectionStatus, JSON_REPORT};
use granule_probe::{
    CmrClient, Credentials, DaacProfile, HttpsDownloader, LocalStorage, OnPremProbe, ProbeConfig,
    ProbeEngine, ProbeSettings, ReportWriter,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const ONE_MIB: usize = 1024 * 1024;

fn collection_item(concept_id: &str) -> Value {
    json!({
        "meta": {"concept-id": concept_id, "provider-id": "LPDAAC_ECS", "granule-count": 1},
        "umm": {"ShortName": "MOD09GA", "Version": "061", "EntryTitle": "MODIS/Terra Surface Reflectance"}
    })
}

fn granule_item(concept_id: &str, size_mb: f64, url: &str) -> Value {
    json!({
        "meta": {"concept-id": concept_id, "provider-id": "LPDAAC_ECS"},
        "umm": {
            "GranuleUR": concept_id,
            "DataGranule": {"ArchiveAndDistributionInformation": [
                {"Name": "granule.hdf", "Size": size_mb, "SizeUnit": "MB"}
            ]},
            "RelatedUrls": [
                {"URL": url, "Type": "GET DATA"},
                {"URL": "https://e4ftl01.cr.usgs.gov/MOLT/browse.jpg", "Type": "GET RELATED VISUALIZATION"}
            ]
        }
    })
}

/// Serves a CMR search for one DAAC: hits counts, a single results page and an empty second page.
fn mock_cmr(server: &MockServer, collections: Vec<Value>, granules: Vec<Value>) {
    for (concept, items) in [("collections", collections), ("granules", granules)] {
        let path = format!("/search/{}.umm_json", concept);
        let hits = items.len();

        server.mock(|when, then| {
            when.method(GET).path(path.as_str()).query_param("page_size", "0");
            then.status(200)
                .header("CMR-Hits", hits.to_string())
                .json_body(json!({"hits": hits, "items": []}));
        });
        server.mock(|when, then| {
            when.method(GET).path(path.as_str()).query_param("page_num", "1");
            then.status(200).json_body(json!({"hits": hits, "items": items}));
        });
        server.mock(|when, then| {
            when.method(GET).path(path.as_str()).query_param("page_num", "2");
            then.status(200).json_body(json!({"hits": hits, "items": []}));
        });
    }
}

fn probe_config(server: &MockServer, temp_dir: &TempDir) -> ProbeConfig {
    let mut config = ProbeConfig::default();
    config.search.endpoint = server.url("/search");
    config.download.output_path = temp_dir.path().join("downloads").to_string_lossy().into_owned();
    config.report.output_path = temp_dir.path().join("report").to_string_lossy().into_owned();
    config.sampling.seed = Some(7);
    config
}

fn profile() -> DaacProfile {
    let mut daac = DaacProfile::new("LPDAAC", 10, 1, 100.0);
    daac.granules_count = 10;
    daac.granules_sample_size = 1;
    daac
}

fn build_probe(config: &ProbeConfig) -> Result<OnPremProbe<CmrClient, HttpsDownloader>> {
    let credentials = Credentials::bearer("test-token");
    let catalog = CmrClient::new(&config.search, credentials.clone())?;
    let downloader = HttpsDownloader::new(&config.download, credentials)?;
    Ok(OnPremProbe::new(
        catalog,
        downloader,
        ProbeSettings::from(config),
        config.sampling.seed,
    ))
}

#[tokio::test]
async fn test_probe_downloads_sampled_granule_and_writes_report() -> Result<()> {
    let server = MockServer::start();
    let data_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/data/MOD09GA.A2024001.hdf")
            .header("Authorization", "Bearer test-token");
        then.status(200).body(vec![1u8; ONE_MIB]);
    });
    let data_url = server.url("/data/MOD09GA.A2024001.hdf");
    mock_cmr(
        &server,
        vec![collection_item("C1-LPDAAC_ECS"), collection_item("C2-LPDAAC_ECS")],
        vec![granule_item("G1-LPDAAC_ECS", 1.0, &data_url)],
    );

    let temp_dir = TempDir::new()?;
    let config = probe_config(&server, &temp_dir);
    let mut engine = ProbeEngine::new(build_probe(&config)?);

    let report = engine.run(&[profile()]).await;

    data_mock.assert();
    assert!(!report.has_failures());
    let daac = &report.daacs[0];
    assert_eq!(daac.collection_hits, Some(2));
    assert_eq!(daac.collections_fetched, 2);
    assert_eq!(daac.collections.len(), 1);

    let collection = &daac.collections[0];
    assert_eq!(collection.status, CollectionStatus::Downloaded);
    assert_eq!(collection.granule_hits, Some(1));
    assert_eq!(collection.reported_mb, 1.0);
    assert_eq!(collection.downloaded_mb, Some(1.0));
    assert!(collection.warnings.is_empty());
    assert_eq!(collection.files.len(), 1);
    assert!(!temp_dir.path().join("downloads").join(&collection.concept_id).exists());

    let storage = LocalStorage::new(config.report.output_path.clone());
    let written = ReportWriter::new(storage)
        .write(&report, &config.report.output_formats)
        .await?;
    assert_eq!(written, vec![JSON_REPORT]);
    let body = std::fs::read_to_string(temp_dir.path().join("report").join(JSON_REPORT))?;
    let parsed: Value = serde_json::from_str(&body)?;
    assert_eq!(parsed["seed"], 7);
    assert_eq!(parsed["daacs"][0]["collections"][0]["status"], "downloaded");

    Ok(())
}

#[tokio::test]
async fn test_probe_keeps_files_when_asked() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data/kept.hdf");
        then.status(200).body(vec![1u8; ONE_MIB]);
    });
    let data_url = server.url("/data/kept.hdf");
    mock_cmr(
        &server,
        vec![collection_item("C1-LPDAAC_ECS"), collection_item("C2-LPDAAC_ECS")],
        vec![granule_item("G1-LPDAAC_ECS", 1.0, &data_url)],
    );

    let temp_dir = TempDir::new()?;
    let mut config = probe_config(&server, &temp_dir);
    config.download.keep_files = true;
    let mut probe = build_probe(&config)?;

    let report = probe.probe_daac(&profile()).await;

    let collection = &report.collections[0];
    let kept = temp_dir
        .path()
        .join("downloads")
        .join(&collection.concept_id)
        .join("kept.hdf");
    assert_eq!(std::fs::metadata(kept)?.len(), ONE_MIB as u64);

    Ok(())
}

#[tokio::test]
async fn test_drive_links_are_reported_as_unsupported() -> Result<()> {
    let server = MockServer::start();
    mock_cmr(
        &server,
        vec![collection_item("C1-LPDAAC_ECS"), collection_item("C2-LPDAAC_ECS")],
        vec![granule_item(
            "G1-LPDAAC_ECS",
            1.0,
            "https://podaac-tools.jpl.nasa.gov/drive/files/allData/granule.nc",
        )],
    );

    let temp_dir = TempDir::new()?;
    let config = probe_config(&server, &temp_dir);
    let mut probe = build_probe(&config)?;

    let report = probe.probe_daac(&profile()).await;

    assert_eq!(report.collections[0].status, CollectionStatus::Unsupported);
    assert_eq!(report.collections[0].warnings.len(), 1);
    assert!(!report.has_failures());

    Ok(())
}

#[tokio::test]
async fn test_oversized_granules_are_skipped() -> Result<()> {
    let server = MockServer::start();
    let data_mock = server.mock(|when, then| {
        when.method(GET).path("/data/huge.hdf");
        then.status(200).body("never requested");
    });
    let data_url = server.url("/data/huge.hdf");
    mock_cmr(
        &server,
        vec![collection_item("C1-LPDAAC_ECS"), collection_item("C2-LPDAAC_ECS")],
        vec![granule_item("G1-LPDAAC_ECS", 500.0, &data_url)],
    );

    let temp_dir = TempDir::new()?;
    let config = probe_config(&server, &temp_dir);
    let mut probe = build_probe(&config)?;

    let report = probe.probe_daac(&profile()).await;

    let collection = &report.collections[0];
    assert_eq!(collection.status, CollectionStatus::Oversized);
    assert_eq!(collection.sample_attempts, 3);
    assert!(collection.downloaded_mb.is_none());
    data_mock.assert_hits(0);

    Ok(())
}

#[tokio::test]
async fn test_too_few_collections_fails_the_daac() -> Result<()> {
    let server = MockServer::start();
    mock_cmr(&server, vec![collection_item("C1-LPDAAC_ECS")], Vec::new());

    let temp_dir = TempDir::new()?;
    let config = probe_config(&server, &temp_dir);
    let mut engine = ProbeEngine::new(build_probe(&config)?);

    let report = engine.run(&[profile()]).await;

    assert!(report.has_failures());
    assert!(report.daacs[0].error.is_some());
    assert!(report.daacs[0].collections.is_empty());

    Ok(())
}
