//! Dataset shape: one cell of the benchmark grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for generator operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorError {
    /// Deletion ratio is not a probability
    #[error("Deletion ratio must be within [0, 1], got {0}")]
    InvalidDeletionRatio(f64),
}

/// Number of outer documents, elements per document and the probability that
/// an element is soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedShape")]
pub struct DatasetShape {
    outer_count: usize,
    element_count: usize,
    deletion_ratio: f64,
}

/// Wire form of a shape before the ratio has been checked.
#[derive(Deserialize)]
struct UncheckedShape {
    outer_count: usize,
    element_count: usize,
    deletion_ratio: f64,
}

impl TryFrom<UncheckedShape> for DatasetShape {
    type Error = GeneratorError;

    fn try_from(raw: UncheckedShape) -> Result<Self, Self::Error> {
        DatasetShape::new(raw.outer_count, raw.element_count, raw.deletion_ratio)
    }
}

impl DatasetShape {
    /// Create a shape, rejecting deletion ratios outside `[0, 1]`.
    pub fn new(
        outer_count: usize,
        element_count: usize,
        deletion_ratio: f64,
    ) -> Result<Self, GeneratorError> {
        if !deletion_ratio.is_finite() || !(0.0..=1.0).contains(&deletion_ratio) {
            return Err(GeneratorError::InvalidDeletionRatio(deletion_ratio));
        }

        Ok(Self {
            outer_count,
            element_count,
            deletion_ratio,
        })
    }

    pub fn outer_count(&self) -> usize {
        self.outer_count
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn deletion_ratio(&self) -> f64 {
        self.deletion_ratio
    }

    /// Total number of elements across all outer documents.
    pub fn total_elements(&self) -> usize {
        self.outer_count.saturating_mul(self.element_count)
    }
}

impl fmt::Display for DatasetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Outer: {}\tElements: {}\tPercentage: {}",
            self.outer_count, self.element_count, self.deletion_ratio
        )
    }
}
