use std::sync::Arc;

use {chorus_config::PipelineConfig, chorus_pipeline::ContentPipeline, chorus_store::Store};

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub pipeline: Arc<ContentPipeline>,
    pub config: PipelineConfig,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        pipeline: Arc<ContentPipeline>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            pipeline,
            config,
        }
    }
}
