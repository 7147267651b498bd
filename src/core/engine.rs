use crate::config::toml_config::DaacProfile;
use crate::core::probe::OnPremProbe;
use crate::core::report::ProbeReport;
use crate::domain::ports::{Catalog, Downloader};
use crate::utils::monitor::SystemMonitor;
use rand::Rng;

/// Runs the on-prem probe over a list of DAACs and collects one report.
pub struct ProbeEngine<C, D, R> {
    probe: OnPremProbe<C, D, R>,
    monitor: SystemMonitor,
}

impl<C: Catalog, D: Downloader, R: Rng> ProbeEngine<C, D, R> {
    pub fn new(probe: OnPremProbe<C, D, R>) -> Self {
        Self::new_with_monitoring(probe, false)
    }

    pub fn new_with_monitoring(probe: OnPremProbe<C, D, R>, monitor_enabled: bool) -> Self {
        Self {
            probe,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// DAACs are probed one after another; a failing DAAC never stops the next.
    pub async fn run(&mut self, daacs: &[DaacProfile]) -> ProbeReport {
        let mut report = ProbeReport::new(self.probe.seed());
        tracing::info!("Starting on-prem probe for {} DAAC(s)", daacs.len());
        if let Some(seed) = self.probe.seed() {
            tracing::info!("Sampling seed: {}", seed);
        }
        self.monitor.log_stats("Start");

        for daac in daacs {
            tracing::info!("🔍 Probing {}", daac.short_name);
            let daac_report = self.probe.probe_daac(daac).await;

            let failed = daac_report.has_failures();
            tracing::info!(
                "{} {}: {} collection(s) probed",
                if failed { "❌" } else { "✅" },
                daac.short_name,
                daac_report.collections.len()
            );
            report.daacs.push(daac_report);
            self.monitor.log_stats(&daac.short_name);
        }

        report.finish();
        self.monitor.log_final_stats();
        report
    }
}
