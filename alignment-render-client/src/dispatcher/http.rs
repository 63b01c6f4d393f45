use super::{DispatcherConfig, RenderDispatcher, UpstreamError};
use crate::{RenderRequest, RenderedImage};
use async_trait::async_trait;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use surf::Client;
use url::Url;
use utils::endpoint::endpoint_url;
use utils::surf_logging::SurfLogging;

/// Body expected by the rendering service. The alignment text travels
/// base64 encoded.
#[derive(Debug, Serialize)]
struct RenderPayload<'a> {
    alignment: String,
    alignment_format: &'a str,
    alignment_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_symbols: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_pos: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<bool>,
}

impl<'a> From<&'a RenderRequest> for RenderPayload<'a> {
    fn from(request: &'a RenderRequest) -> Self {
        let options = request.options();
        Self {
            alignment: BASE64_STANDARD.encode(request.alignment()),
            alignment_format: request.format(),
            alignment_type: request.alignment_type().as_str(),
            color_symbols: options.color_symbols,
            line_pos: options.line_pos,
            similarity: options.similarity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    image: String,
    #[serde(default, alias = "error")]
    error_code: String,
}

impl RenderResponse {
    fn into_image(self) -> Result<RenderedImage, UpstreamError> {
        if !self.error_code.is_empty() {
            return Err(UpstreamError::Rejected(self.error_code));
        }
        let image = RenderedImage::new(self.image);
        if image.is_empty() {
            return Err(UpstreamError::EmptyImage);
        }
        Ok(image)
    }
}

/// Calls the rendering service over HTTP.
pub struct HttpDispatcher {
    http: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(config: &DispatcherConfig) -> Result<Self, url::ParseError> {
        let endpoint = endpoint_url(&config.base_url, &config.alignment_path)?;
        log::info!("Rendering requests go to {}", endpoint);

        Ok(Self {
            http: Client::new().with(SurfLogging),
            endpoint,
            timeout: config.timeout,
        })
    }

    async fn post(&self, request: &RenderRequest) -> Result<RenderedImage, UpstreamError> {
        let payload = RenderPayload::from(request);
        let builder = self
            .http
            .post(self.endpoint.as_str())
            .body_json(&payload)
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let mut response = builder
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(u16::from(status)));
        }

        let body: RenderResponse = response
            .body_json()
            .await
            .map_err(|err| UpstreamError::Malformed(err.to_string()))?;
        body.into_image()
    }
}

#[async_trait]
impl RenderDispatcher for HttpDispatcher {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage, UpstreamError> {
        match tokio::time::timeout(self.timeout, self.post(request)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlignmentType, RenderOptions};

    #[test]
    fn test_payload_shape() {
        let request = RenderRequest::new(">s1\nACGT", "FASTA", AlignmentType::Nucleotide)
            .unwrap()
            .with_options(RenderOptions {
                color_symbols: Some(true),
                ..Default::default()
            })
            .with_source_name("upload.fa");

        let json = serde_json::to_value(RenderPayload::from(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "alignment": BASE64_STANDARD.encode(">s1\nACGT"),
                "alignment_format": "fasta",
                "alignment_type": "nucleotide",
                "color_symbols": true,
            })
        );
    }

    #[test]
    fn test_response_with_image() {
        let response: RenderResponse = serde_json::from_str(r#"{"image":"SU1HMQ=="}"#).unwrap();
        assert_eq!(response.into_image().unwrap(), RenderedImage::new("SU1HMQ=="));
    }

    #[test]
    fn test_response_with_error() {
        let response: RenderResponse =
            serde_json::from_str(r#"{"image":"","error":"Not valid alignment type"}"#).unwrap();
        assert_eq!(
            response.into_image(),
            Err(UpstreamError::Rejected("Not valid alignment type".to_string()))
        );
    }

    #[test]
    fn test_response_without_image() {
        let response: RenderResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_image(), Err(UpstreamError::EmptyImage));
    }

    #[tokio::test]
    async fn test_unresponsive_renderer_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let timeout = Duration::from_millis(300);
        let dispatcher = HttpDispatcher::new(&DispatcherConfig {
            base_url: format!("http://{}", address),
            timeout,
            ..Default::default()
        })
        .unwrap();

        let request = RenderRequest::new("ACGT", "fasta", AlignmentType::Nucleotide).unwrap();
        assert_eq!(
            dispatcher.render(&request).await,
            Err(UpstreamError::Timeout(timeout))
        );
    }

    #[tokio::test]
    async fn test_unreachable_renderer_is_transport_error() {
        let dispatcher = HttpDispatcher::new(&DispatcherConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap();

        let request = RenderRequest::new("ACGT", "fasta", AlignmentType::Nucleotide).unwrap();
        let result = dispatcher.render(&request).await;
        assert!(
            matches!(result, Err(UpstreamError::Transport(_))),
            "unexpected result: {:?}",
            result
        );
    }

    #[test]
    fn test_endpoint_from_config() {
        let dispatcher = HttpDispatcher::new(&DispatcherConfig {
            base_url: "http://renderer:5000/api".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(dispatcher.endpoint.as_str(), "http://renderer:5000/api/generate_fig");

        let invalid = HttpDispatcher::new(&DispatcherConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(invalid.is_err());
    }
}
