use lead_pipeline::pipeline::{
    InMemoryLeadRepository, InMemorySettingsRepository, LeadPipelineService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryPipeline =
    LeadPipelineService<InMemoryLeadRepository, InMemorySettingsRepository>;

/// Pipeline service over process-local storage. Data does not survive a restart.
pub(crate) fn build_pipeline_service() -> MemoryPipeline {
    LeadPipelineService::new(
        Arc::new(InMemoryLeadRepository::default()),
        Arc::new(InMemorySettingsRepository::default()),
    )
}
