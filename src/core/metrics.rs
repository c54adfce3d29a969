use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Counts one enrollment or grade action by name and outcome (`ok` or an error kind).
pub(crate) fn record_enrollment_action(action: &'static str, outcome: &'static str) {
    metrics::counter!("enrollment_actions_total", "action" => action, "outcome" => outcome)
        .increment(1);
}

pub(crate) fn record_subjects_assigned(created: u64) {
    metrics::counter!("enrollment_grades_assigned_total").increment(created);
}
