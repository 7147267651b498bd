use anyhow::Context;
use clap::Parser;
use granule_probe::core::probe::{OnPremProbe, ProbeSettings};
use granule_probe::utils::{logger, validation::Validate};
use granule_probe::{
    CliConfig, CmrClient, Credentials, HttpsDownloader, LocalStorage, ProbeConfig, ProbeEngine,
    ReportWriter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = match &cli.config {
        Some(path) => ProbeConfig::from_file(path).with_context(|| format!("failed to load {}", path))?,
        None => ProbeConfig::default(),
    };
    cli.apply_to(&mut config);

    // 初始化日誌
    if config.monitoring.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting granule-probe");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let daacs = config.enabled_daacs(&cli.daac);
    if daacs.is_empty() {
        eprintln!("❌ No enabled DAAC matches {:?}", cli.daac);
        std::process::exit(1);
    }

    if cli.dry_run {
        println!("🔍 Dry run against {}", config.search.endpoint);
        for daac in &daacs {
            println!(
                "  {}: sample {} of {} collections, {} of {} granules up to {}MB",
                daac.short_name,
                daac.collections_sample_size,
                daac.collections_count,
                daac.granules_sample_size,
                daac.granules_count,
                daac.granules_max_size_mb
            );
        }
        println!("📁 Downloads: {}", config.download.output_path);
        println!("📁 Report: {}", config.report.output_path);
        return Ok(());
    }

    let credentials = Credentials::resolve(config.auth.token.as_deref());
    if credentials.is_anonymous() {
        tracing::warn!("No Earthdata token configured, protected data links will fail");
    }

    let catalog = CmrClient::new(&config.search, credentials.clone()).context("failed to build CMR client")?;
    let downloader =
        HttpsDownloader::new(&config.download, credentials).context("failed to build HTTPS downloader")?;
    let probe = OnPremProbe::new(
        catalog,
        downloader,
        ProbeSettings::from(&config),
        config.sampling.seed,
    );

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }
    let mut engine = ProbeEngine::new_with_monitoring(probe, monitor_enabled);
    let report = engine.run(&daacs).await;

    let writer = ReportWriter::new(LocalStorage::new(config.report.output_path.clone()));
    let written = writer
        .write(&report, &config.report.output_formats)
        .await
        .context("failed to write probe report")?;
    for name in &written {
        println!("📁 Report saved to: {}/{}", config.report.output_path, name);
    }

    let probed = report.collections().count();
    let warnings = report.warning_count();
    if report.has_failures() {
        eprintln!("❌ Probe finished with failures ({} collection(s), {} warning(s))", probed, warnings);
        std::process::exit(1);
    }

    println!("✅ Probe completed: {} collection(s), {} warning(s)", probed, warnings);
    Ok(())
}
