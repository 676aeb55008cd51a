//! Scheduler module: one monitoring cycle from config load to HTML.

mod state;

pub use state::*;

use crate::config::RunConfig;
use crate::db::{ConfigStore, RrdFile};
use crate::probe::run_probes;
use crate::report::Reporter;

use chrono::Utc;

/// Run one complete cycle.
///
/// Only configuration load/save failures are returned. Tool failures are
/// logged and the cycle carries on.
pub async fn run_cycle(cfg: &RunConfig) -> Result<TargetStates, Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now();

    let store = ConfigStore::new(&cfg.config_path);
    let mut config = store.load(now)?;

    if config.targets.is_empty() {
        tracing::warn!("No targets in {}, nothing to do", store.path().display());
        return Ok(TargetStates::default());
    }

    let rrd = RrdFile::new(&cfg.rrdtool_bin, &cfg.rrd_path);
    match rrd.ensure(&config.targets, &config.graphs).await {
        Ok(true) => tracing::info!("Created {}", rrd.path().display()),
        Ok(false) => {}
        Err(e) => tracing::debug!("Failed to create {}: {}", rrd.path().display(), e),
    }

    tracing::info!("Probing {} targets", config.targets.len());
    let outputs = run_probes(&cfg.ping_bin, &config.targets).await;

    let mut states = TargetStates::new(&config.targets);
    states.apply_probes(outputs, now);
    states.refresh_uptime(now);

    config.targets = states.targets();
    store.save(&config)?;

    if let Err(e) = rrd.update(&states.samples(), now).await {
        tracing::debug!("Failed to update {}: {}", rrd.path().display(), e);
    }

    let reporter = Reporter::new(cfg);
    let rendered = reporter.render_graphs(&states, &config.graphs, now).await;
    tracing::debug!("Rendered {} graphs", rendered);

    if let Err(e) = reporter.write_pages(&states, &config.graphs, now) {
        tracing::error!("Failed to write HTML pages: {}", e);
    }

    Ok(states)
}
