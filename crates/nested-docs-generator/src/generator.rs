//! Seeded generator producing nested documents for a dataset shape.

use crate::model::{InnerElement, OuterDocument};
use crate::shape::DatasetShape;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Data generator that produces deterministic nested documents.
///
/// Identifiers and deletion flags are both drawn from one seeded stream, so
/// two generators built with the same seed (and the same `deleted_at` clock)
/// produce identical datasets.
pub struct DocumentGenerator {
    /// Seeded random number generator for reproducibility
    rng: StdRng,
    /// Timestamp written on every deleted element
    deleted_at: bson::DateTime,
}

impl DocumentGenerator {
    /// Create a generator with the given seed. Deleted elements are stamped
    /// with the construction time.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            deleted_at: bson::DateTime::now(),
        }
    }

    /// Pin the timestamp written on deleted elements.
    pub fn with_deleted_at(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deleted_at = bson::DateTime::from_chrono(deleted_at);
        self
    }

    /// Generate one outer document with exactly `shape.element_count()` elements.
    pub fn next_document(&mut self, shape: &DatasetShape) -> OuterDocument {
        let id = self.next_id();
        let elements = (0..shape.element_count())
            .map(|_| self.next_element(shape.deletion_ratio()))
            .collect();

        OuterDocument { id, elements }
    }

    /// Lazily generate `shape.outer_count()` documents.
    pub fn documents<'a>(&'a mut self, shape: &DatasetShape) -> DocumentIterator<'a> {
        DocumentIterator {
            generator: self,
            shape: *shape,
            remaining: shape.outer_count(),
        }
    }

    /// Generate the full dataset for a shape.
    pub fn generate(&mut self, shape: &DatasetShape) -> Vec<OuterDocument> {
        self.documents(shape).collect()
    }

    fn next_element(&mut self, deletion_ratio: f64) -> InnerElement {
        let id = self.next_id();
        // gen_bool(0.0) never fires and gen_bool(1.0) always does
        let deleted = self.rng.gen_bool(deletion_ratio);

        InnerElement {
            id,
            deleted_at: deleted.then_some(self.deleted_at),
        }
    }

    fn next_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill(&mut bytes);

        // Set version (4) and variant (RFC 4122) bits
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;

        Uuid::from_bytes(bytes).to_string()
    }
}

/// Iterator that lazily generates outer documents.
pub struct DocumentIterator<'a> {
    generator: &'a mut DocumentGenerator,
    shape: DatasetShape,
    remaining: usize,
}

impl Iterator for DocumentIterator<'_> {
    type Item = OuterDocument;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        Some(self.generator.next_document(&self.shape))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for DocumentIterator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn shape(outer: usize, elements: usize, ratio: f64) -> DatasetShape {
        DatasetShape::new(outer, elements, ratio).unwrap()
    }

    #[test]
    fn test_exact_counts() {
        for (outer, elements, ratio) in [(0, 0, 0.0), (0, 10, 0.5), (3, 0, 1.0), (7, 13, 0.25)] {
            let shape = shape(outer, elements, ratio);
            let documents = DocumentGenerator::new(32).generate(&shape);

            assert_eq!(documents.len(), outer);
            assert!(documents.iter().all(|d| d.elements.len() == elements));
        }
    }

    #[test]
    fn test_deterministic_generation() {
        let shape = shape(5, 20, 0.5);

        let first = DocumentGenerator::new(32)
            .with_deleted_at(clock())
            .generate(&shape);
        let second = DocumentGenerator::new(32)
            .with_deleted_at(clock())
            .generate(&shape);

        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        let shape = shape(2, 10, 0.5);

        let first = DocumentGenerator::new(1).generate(&shape);
        let second = DocumentGenerator::new(2).generate(&shape);

        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn test_all_deleted_scenario() {
        let documents = DocumentGenerator::new(32).generate(&shape(2, 3, 1.0));

        assert_eq!(documents.len(), 2);
        for document in &documents {
            assert_eq!(document.elements.len(), 3);
            assert_eq!(document.deleted_count(), 3);
            assert_eq!(document.active_elements().count(), 0);
        }
    }

    #[test]
    fn test_none_deleted_scenario() {
        let documents = DocumentGenerator::new(32).generate(&shape(1, 5, 0.0));

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].elements.len(), 5);
        assert_eq!(documents[0].deleted_count(), 0);
    }

    #[test]
    fn test_deleted_elements_carry_pinned_clock() {
        let documents = DocumentGenerator::new(32)
            .with_deleted_at(clock())
            .generate(&shape(1, 4, 1.0));

        let expected = bson::DateTime::from_chrono(clock());
        assert!(documents[0]
            .elements
            .iter()
            .all(|e| e.deleted_at == Some(expected)));
    }

    #[test]
    fn test_deletion_ratio_converges() {
        let elements = 100_000;
        let ratio = 0.3;
        let documents = DocumentGenerator::new(32).generate(&shape(1, elements, ratio));

        let observed = documents[0].deleted_count() as f64 / elements as f64;
        assert!(
            (observed - ratio).abs() < 0.01,
            "observed ratio {observed} too far from {ratio}"
        );
    }

    #[test]
    fn test_ids_are_unique_uuids() {
        let documents = DocumentGenerator::new(32).generate(&shape(10, 10, 0.5));

        let mut seen = HashSet::new();
        for document in &documents {
            assert!(seen.insert(document.id.clone()));
            for element in &document.elements {
                let parsed = Uuid::parse_str(&element.id).unwrap();
                assert_eq!(parsed.get_version_num(), 4);
                assert!(seen.insert(element.id.clone()));
            }
        }
    }

    #[test]
    fn test_iterator_size_hint() {
        let shape = shape(4, 2, 0.5);
        let mut generator = DocumentGenerator::new(32);
        let mut documents = generator.documents(&shape);

        assert_eq!(documents.len(), 4);
        documents.next();
        assert_eq!(documents.len(), 3);
    }
}
