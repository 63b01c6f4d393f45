use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// Rendered figure as returned by the renderer: a base64 encoded PNG.
///
/// The coordinator and the stores never look inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedImage(String);

impl RenderedImage {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Decode into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(self.0.trim())
    }
}

impl From<String> for RenderedImage {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payload() {
        let image = RenderedImage::new("iVBORw0KGgo=\n");
        assert_eq!(image.decode().unwrap(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn rejects_garbage() {
        assert!(RenderedImage::new("not base64!").decode().is_err());
    }
}
