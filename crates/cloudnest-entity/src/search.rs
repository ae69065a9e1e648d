//! Search result model.

use serde::{Deserialize, Serialize};

use crate::item::Item;

/// One hit from the client-side search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching item.
    pub item: Item,
    /// Synthesized display path, e.g. `/Projects/2024/report.pdf`.
    pub path: String,
    /// Whether the name equals the query (case-insensitive).
    pub exact: bool,
}
