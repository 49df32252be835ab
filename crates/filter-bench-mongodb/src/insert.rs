//! Batched INSERT logic for loading generated documents.

use crate::error::BenchError;
use bson::doc;
use mongodb::Collection;
use nested_docs_generator::OuterDocument;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default batch size for INSERT operations.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Metrics from loading one dataset.
#[derive(Debug, Clone, Default)]
pub struct InsertMetrics {
    /// Number of documents inserted.
    pub documents_inserted: usize,
    /// Number of `insert_many` calls.
    pub batch_count: u64,
    /// Total time taken.
    pub duration: Duration,
}

impl InsertMetrics {
    /// Calculate documents per second.
    pub fn documents_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.documents_inserted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Insert all documents, `batch_size` at a time.
///
/// Fails if the server acknowledges fewer documents than were sent.
pub async fn insert_documents(
    collection: &Collection<OuterDocument>,
    documents: &[OuterDocument],
    batch_size: usize,
) -> Result<InsertMetrics, BenchError> {
    if batch_size == 0 {
        return Err(BenchError::Config("batch size must be at least 1".into()));
    }

    let start = Instant::now();
    let mut metrics = InsertMetrics::default();

    for batch in documents.chunks(batch_size) {
        let result = collection.insert_many(batch).await?;
        metrics.documents_inserted += result.inserted_ids.len();
        metrics.batch_count += 1;

        debug!(
            "Batch {} complete: {} documents inserted into '{}'",
            metrics.batch_count,
            result.inserted_ids.len(),
            collection.name()
        );
    }

    metrics.duration = start.elapsed();

    if metrics.documents_inserted != documents.len() {
        return Err(BenchError::Insert {
            expected: documents.len(),
            inserted: metrics.documents_inserted,
        });
    }

    Ok(metrics)
}

/// Get the document count for a collection.
pub async fn count_documents(collection: &Collection<OuterDocument>) -> Result<u64, BenchError> {
    let count = collection.count_documents(doc! {}).await?;
    Ok(count)
}
