use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Kind of residues in the alignment. Decides which alphabet the renderer
/// colours the columns with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentType {
    #[strum(to_string = "nucleotide", serialize = "dna", serialize = "rna")]
    Nucleotide,
    #[strum(to_string = "protein", serialize = "aa")]
    Protein,
}

impl AlignmentType {
    /// Name sent to the renderer and fed into the fingerprint.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentType::Nucleotide => "nucleotide",
            AlignmentType::Protein => "protein",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_aliases() {
        assert_eq!(AlignmentType::from_str("dna").unwrap(), AlignmentType::Nucleotide);
        assert_eq!(AlignmentType::from_str("RNA").unwrap(), AlignmentType::Nucleotide);
        assert_eq!(AlignmentType::from_str("Nucleotide").unwrap(), AlignmentType::Nucleotide);
        assert_eq!(AlignmentType::from_str("aa").unwrap(), AlignmentType::Protein);
        assert!(AlignmentType::from_str("codon").is_err());
    }

    #[test]
    fn display_matches_wire_name() {
        for alignment_type in AlignmentType::iter() {
            assert_eq!(alignment_type.to_string(), alignment_type.as_str());
        }
    }
}
