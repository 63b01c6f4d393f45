use serde::{Deserialize, Serialize};

#[cfg(feature = "graphql")]
use async_graphql::InputObject;

/// Optional switches understood by the renderer.
///
/// Every flag is tri-state: `None` leaves the decision to the renderer and is
/// a different request than an explicit `Some(false)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(InputObject))]
pub struct RenderOptions {
    /// Colour residues by symbol instead of plain text.
    pub color_symbols: Option<bool>,
    /// Print sequence positions at the start of each line.
    pub line_pos: Option<bool>,
    /// Shade columns by similarity to the consensus.
    pub similarity: Option<bool>,
}

impl RenderOptions {
    /// Option flags in the fixed order used for fingerprinting.
    pub(crate) fn fields(&self) -> [(&'static str, Option<bool>); 3] {
        [
            ("color_symbols", self.color_symbols),
            ("line_pos", self.line_pos),
            ("similarity", self.similarity),
        ]
    }
}
