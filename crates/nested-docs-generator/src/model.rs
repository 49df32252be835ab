//! Documents as they are stored in MongoDB.
//!
//! Field names are kept short (`e`, `da`) so the wire payload is dominated by
//! the number of elements rather than by key names.

use serde::{Deserialize, Serialize};

/// BSON field holding the nested element array.
pub const ELEMENTS_FIELD: &str = "e";

/// BSON field holding the soft-delete timestamp of an element.
pub const DELETED_AT_FIELD: &str = "da";

/// Top-level document owning an ordered array of elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuterDocument {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "e", default)]
    pub elements: Vec<InnerElement>,
}

/// A nested element. `deleted_at` marks it as logically removed.
///
/// `None` is written as an explicit BSON `null` rather than omitted:
/// aggregation `$eq` does not consider a missing field equal to `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerElement {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "da")]
    pub deleted_at: Option<bson::DateTime>,
}

impl InnerElement {
    /// Whether the element carries a deletion timestamp.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl OuterDocument {
    /// Elements without a deletion timestamp, in stored order.
    pub fn active_elements(&self) -> impl Iterator<Item = &InnerElement> {
        self.elements.iter().filter(|element| !element.is_deleted())
    }

    /// Number of elements carrying a deletion timestamp.
    pub fn deleted_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_deleted()).count()
    }

    /// Drop every deleted element in place.
    ///
    /// This is the in-process twin of the `$filter` stage used on the server,
    /// so both strategies apply the same predicate.
    pub fn retain_active(&mut self) {
        self.elements.retain(|element| !element.is_deleted());
    }
}
