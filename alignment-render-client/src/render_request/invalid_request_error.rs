use strum_macros::AsRefStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RequestField {
    Alignment,
    Format,
    AlignmentType,
    ImageKey,
}

/// A request that cannot be fingerprinted or sent to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}: {}", .field.as_ref(), quoted(.value), .reason)]
pub struct InvalidRequestError {
    field: RequestField,
    value: String,
    reason: &'static str,
}

fn quoted(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!(" '{}'", value)
    }
}

impl InvalidRequestError {
    pub fn new(field: RequestField, value: impl Into<String>, reason: &'static str) -> Self {
        Self {
            field,
            value: value.into(),
            reason,
        }
    }

    pub fn field(&self) -> RequestField {
        self.field
    }
}
