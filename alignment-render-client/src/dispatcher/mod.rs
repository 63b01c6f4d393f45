pub mod http;

use crate::{RenderRequest, RenderedImage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for calls to the rendering service
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Base URL of the rendering service
    pub base_url: String,
    /// Route of the alignment figure endpoint, relative to `base_url`
    pub alignment_path: String,
    /// Upper bound for a single render call
    pub timeout: Duration,
    /// How many renders may run at the same time
    pub max_concurrent: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            alignment_path: "generate_fig".to_string(),
            timeout: Duration::from_secs(120),
            max_concurrent: 4,
        }
    }
}

/// Why a render produced no image. Never retried by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to renderer failed: {0}")]
    Transport(String),
    #[error("renderer responded with status {0}")]
    Status(u16),
    #[error("renderer rejected the alignment: {0}")]
    Rejected(String),
    #[error("renderer response could not be decoded: {0}")]
    Malformed(String),
    #[error("renderer returned an empty image")]
    EmptyImage,
    #[error("renderer did not answer within {0:?}")]
    Timeout(Duration),
}

/// Something that turns a request into a rendered image.
#[async_trait]
pub trait RenderDispatcher: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage, UpstreamError>;
}

pub type SharedRenderDispatcher = Arc<dyn RenderDispatcher>;
