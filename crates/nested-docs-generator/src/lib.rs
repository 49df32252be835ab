//! Data generator for the mongo-filtering benchmark.
//!
//! This crate provides the document model stored in MongoDB and the
//! `DocumentGenerator` which produces deterministic nested documents for a
//! given `DatasetShape`. The generator uses a seeded RNG so that the two query
//! strategies are always measured against the same dataset.
//!
//! # Architecture
//!
//! ```text
//! DatasetShape { outer, elements, ratio }
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │  DocumentGenerator  │
//! │                     │
//! │  - rng (StdRng)     │
//! │  - deleted_at       │
//! └──────────┬──────────┘
//!            │
//!            ▼
//!    OuterDocument { _id, e: [InnerElement { _id, da }] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use nested_docs_generator::{DatasetShape, DocumentGenerator};
//!
//! let shape = DatasetShape::new(2, 3, 1.0).unwrap();
//! let documents = DocumentGenerator::new(32).generate(&shape);
//!
//! assert_eq!(documents.len(), 2);
//! assert!(documents.iter().all(|d| d.active_elements().count() == 0));
//! ```

pub mod generator;
pub mod model;
pub mod shape;

// Re-exports for convenience
pub use generator::{DocumentGenerator, DocumentIterator};
pub use model::{InnerElement, OuterDocument, DELETED_AT_FIELD, ELEMENTS_FIELD};
pub use shape::{DatasetShape, GeneratorError};
