pub mod alignment_type;
pub mod invalid_request_error;
pub mod render_options;

use alignment_type::AlignmentType;
use getset::Getters;
use invalid_request_error::{InvalidRequestError, RequestField};
use render_options::RenderOptions;
use std::str::FromStr;

/// A normalized alignment rendering request.
///
/// Construction normalizes every field that affects the rendered figure, so
/// two requests built from the same effective input compare equal and
/// fingerprint identically.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RenderRequest {
    alignment: String,
    format: String,
    alignment_type: AlignmentType,
    options: RenderOptions,
    /// Label of the uploaded file, if any. Not part of the fingerprint.
    source_name: Option<String>,
}

impl RenderRequest {
    pub fn new(
        alignment: impl AsRef<str>,
        format: impl AsRef<str>,
        alignment_type: AlignmentType,
    ) -> Result<Self, InvalidRequestError> {
        let alignment = normalize_alignment(alignment.as_ref());
        if alignment.is_empty() {
            return Err(InvalidRequestError::new(
                RequestField::Alignment,
                "",
                "no alignment provided",
            ));
        }

        let format = normalize_format(format.as_ref());
        if format.is_empty() {
            return Err(InvalidRequestError::new(
                RequestField::Format,
                "",
                "no alignment format provided",
            ));
        }

        Ok(Self {
            alignment,
            format,
            alignment_type,
            options: RenderOptions::default(),
            source_name: None,
        })
    }

    /// Build a request from untyped input, e.g. form or GraphQL fields.
    pub fn parse(
        alignment: impl AsRef<str>,
        format: impl AsRef<str>,
        alignment_type: &str,
    ) -> Result<Self, InvalidRequestError> {
        let parsed = AlignmentType::from_str(alignment_type.trim()).map_err(|_| {
            InvalidRequestError::new(
                RequestField::AlignmentType,
                alignment_type,
                "expected one of: nucleotide, dna, rna, protein, aa",
            )
        })?;
        Self::new(alignment, format, parsed)
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        let source_name = source_name.into();
        self.source_name = (!source_name.trim().is_empty()).then_some(source_name);
        self
    }
}

fn normalize_alignment(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

fn normalize_format(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '\'' && *c != '"')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_fields() {
        let request = RenderRequest::new(">a\r\nACGT\r\n\n", " 'FASTA' ", AlignmentType::Nucleotide)
            .unwrap();

        assert_eq!(request.alignment(), ">a\nACGT");
        assert_eq!(request.format(), "fasta");
    }

    #[test]
    fn test_rejects_empty_alignment() {
        let err = RenderRequest::new("  \r\n ", "fasta", AlignmentType::Protein).unwrap_err();
        assert_eq!(err.field(), RequestField::Alignment);
    }

    #[test]
    fn test_rejects_empty_format() {
        let err = RenderRequest::new("ACGT", "''", AlignmentType::Protein).unwrap_err();
        assert_eq!(err.field(), RequestField::Format);
    }

    #[test]
    fn test_parse_alignment_type() {
        let request = RenderRequest::parse("ACGT", "fasta", " DNA ").unwrap();
        assert_eq!(*request.alignment_type(), AlignmentType::Nucleotide);

        let err = RenderRequest::parse("ACGT", "fasta", "genome").unwrap_err();
        assert_eq!(err.field(), RequestField::AlignmentType);
        assert!(err.to_string().contains("genome"));
    }

    #[test]
    fn test_blank_source_name_is_dropped() {
        let request = RenderRequest::new("ACGT", "fasta", AlignmentType::Nucleotide)
            .unwrap()
            .with_source_name("  ");
        assert!(request.source_name().is_none());
    }
}
