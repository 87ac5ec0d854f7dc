use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::export::pdf::PdfConverter;
use crate::imagery::ImageSource;
use crate::llm_client::LlmClient;
use crate::store::PresentationStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Config,
    pub store: PresentationStore,
    /// Pluggable picture source. Default: GeminiImageSource.
    pub images: Arc<dyn ImageSource>,
    pub pdf: PdfConverter,
}

impl AppState {
    pub fn new(config: Config, llm: LlmClient, images: Arc<dyn ImageSource>) -> Self {
        Self {
            store: PresentationStore::new(&config.work_dir),
            pdf: PdfConverter::new(
                config.soffice_path.clone(),
                Duration::from_secs(config.pdf_timeout_secs),
            ),
            llm,
            config,
            images,
        }
    }
}
