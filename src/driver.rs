//! Benchmark driver: walks the grid and times each strategy in isolation.
//!
//! Every measured call gets its own instance and its own freshly generated
//! dataset, so nothing the first strategy did (warm caches, resident pages)
//! can leak into the second.

use crate::config::BenchmarkGrid;
use anyhow::Context;
use filter_bench_mongodb::{
    insert_documents, strategy_for, BenchError, EphemeralInstance, FilterStrategy, Provisioner,
    StrategyKind, DEFAULT_BATCH_SIZE,
};
use nested_docs_generator::{DatasetShape, DocumentGenerator, OuterDocument};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything one measured call needs to know.
#[derive(Debug, Clone)]
pub struct IterationContext {
    pub shape: DatasetShape,
    pub seed: u64,
    pub iteration: usize,
    pub collection_name: String,
}

impl IterationContext {
    pub fn new(shape: DatasetShape, seed: u64, iteration: usize) -> Self {
        Self {
            shape,
            seed,
            iteration,
            collection_name: Uuid::new_v4().to_string(),
        }
    }

    /// Generate this iteration's dataset.
    pub fn generate(&self) -> Vec<OuterDocument> {
        DocumentGenerator::new(self.seed).generate(&self.shape)
    }
}

/// Outcome of one timed strategy call.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub kind: StrategyKind,
    pub elapsed: Duration,
    pub documents: usize,
    pub surviving_elements: usize,
}

/// Latencies collected for one strategy on one grid cell.
#[derive(Debug, Clone, Default)]
pub struct LatencySamples {
    samples: Vec<Duration>,
}

impl LatencySamples {
    pub fn push(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples_ms(&self) -> Vec<f64> {
        self.samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect()
    }

    /// Mean latency in milliseconds, 0 when nothing was recorded.
    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: Duration = self.samples.iter().sum();
        total.as_secs_f64() * 1000.0 / self.samples.len() as f64
    }
}

/// Averages for one grid cell.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub shape: DatasetShape,
    pub conditions: String,
    pub server_ms: f64,
    pub client_ms: f64,
    pub server_samples_ms: Vec<f64>,
    pub client_samples_ms: Vec<f64>,
}

impl RunResult {
    pub fn new(shape: DatasetShape, server: &LatencySamples, client: &LatencySamples) -> Self {
        Self {
            shape,
            conditions: shape.to_string(),
            server_ms: server.average_ms(),
            client_ms: client.average_ms(),
            server_samples_ms: server.samples_ms(),
            client_samples_ms: client.samples_ms(),
        }
    }
}

/// Check a strategy's output against its contract and return the number of
/// surviving elements.
pub fn verify_result(
    kind: StrategyKind,
    expected_documents: usize,
    documents: &[OuterDocument],
) -> Result<usize, BenchError> {
    if documents.len() != expected_documents {
        return Err(BenchError::Verification {
            strategy: kind.to_string(),
            message: format!(
                "expected {expected_documents} documents, got {}",
                documents.len()
            ),
        });
    }

    if let Some(document) = documents.iter().find(|d| d.deleted_count() > 0) {
        return Err(BenchError::Verification {
            strategy: kind.to_string(),
            message: format!(
                "document {} still holds {} deleted elements",
                document.id,
                document.deleted_count()
            ),
        });
    }

    Ok(documents.iter().map(|d| d.elements.len()).sum())
}

/// Both strategies of one iteration read the same seeded dataset, so they
/// must agree on what survives the filter.
pub fn check_equivalent(server: &Measurement, client: &Measurement) -> Result<(), BenchError> {
    if server.documents != client.documents
        || server.surviving_elements != client.surviving_elements
    {
        return Err(BenchError::Verification {
            strategy: format!("{} vs {}", server.kind, client.kind),
            message: format!(
                "{} returned {} documents with {} elements, {} returned {} documents with {} elements",
                server.kind,
                server.documents,
                server.surviving_elements,
                client.kind,
                client.documents,
                client.surviving_elements
            ),
        });
    }
    Ok(())
}

/// Runs the grid against a provisioner.
pub struct Benchmark {
    grid: BenchmarkGrid,
    provisioner: Box<dyn Provisioner>,
    batch_size: usize,
}

impl Benchmark {
    pub fn new(grid: BenchmarkGrid, provisioner: Box<dyn Provisioner>) -> Self {
        Self {
            grid,
            provisioner,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn grid(&self) -> &BenchmarkGrid {
        &self.grid
    }

    /// Measure every grid cell in order, handing each result to `on_result`
    /// as soon as it is available.
    pub async fn run<F>(&self, mut on_result: F) -> anyhow::Result<Vec<RunResult>>
    where
        F: FnMut(&RunResult),
    {
        let shapes = self.grid.shapes()?;
        info!(
            "Running {} grid cells x {} iterations using {}",
            shapes.len(),
            self.grid.iterations,
            self.provisioner.describe()
        );

        let mut results = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let result = self.run_shape(shape).await?;
            on_result(&result);
            results.push(result);
        }

        Ok(results)
    }

    /// Measure both strategies on one grid cell.
    pub async fn run_shape(&self, shape: DatasetShape) -> anyhow::Result<RunResult> {
        let server = strategy_for(StrategyKind::Server);
        let client = strategy_for(StrategyKind::Client);

        let mut server_samples = LatencySamples::default();
        let mut client_samples = LatencySamples::default();

        info!("Measuring {}", shape);

        for iteration in 0..self.grid.iterations {
            let context = IterationContext::new(shape, self.grid.seed, iteration);
            let server_run = self.measure(server.as_ref(), &context).await?;
            server_samples.push(server_run.elapsed);

            let context = IterationContext::new(shape, self.grid.seed, iteration);
            let client_run = self.measure(client.as_ref(), &context).await?;
            client_samples.push(client_run.elapsed);

            check_equivalent(&server_run, &client_run)?;
        }

        Ok(RunResult::new(shape, &server_samples, &client_samples))
    }

    /// Provision, load, time one strategy call, verify and tear down.
    pub async fn measure(
        &self,
        strategy: &dyn FilterStrategy,
        context: &IterationContext,
    ) -> anyhow::Result<Measurement> {
        let instance = self
            .provisioner
            .provision()
            .await
            .context("Failed to provision MongoDB instance")?;

        let outcome = self.load_and_query(&instance, strategy, context).await;
        match outcome {
            Ok(measurement) => {
                instance
                    .teardown()
                    .await
                    .context("Failed to tear down MongoDB instance")?;
                Ok(measurement)
            }
            Err(e) => {
                if let Err(cleanup) = instance.teardown().await {
                    warn!("Teardown after failed iteration also failed: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    async fn load_and_query(
        &self,
        instance: &EphemeralInstance,
        strategy: &dyn FilterStrategy,
        context: &IterationContext,
    ) -> anyhow::Result<Measurement> {
        let kind = strategy.kind();
        let collection = instance.collection(&context.collection_name);

        let documents = context.generate();
        let insert = insert_documents(&collection, &documents, self.batch_size)
            .await
            .with_context(|| format!("Failed to insert documents for {}", context.shape))?;
        debug!(
            "Inserted {} documents in {} batches ({:.2} docs/sec)",
            insert.documents_inserted,
            insert.batch_count,
            insert.documents_per_second()
        );
        drop(documents);

        let start = Instant::now();
        let fetched = strategy
            .fetch_active(&collection)
            .await
            .with_context(|| format!("{} query failed for {}", kind.label(), context.shape))?;
        let elapsed = start.elapsed();

        let surviving_elements = verify_result(kind, context.shape.outer_count(), &fetched)?;
        debug!(
            "Iteration {} {}: {} documents, {} surviving elements in {:?}",
            context.iteration,
            kind,
            fetched.len(),
            surviving_elements,
            elapsed
        );

        Ok(Measurement {
            kind,
            elapsed,
            documents: fetched.len(),
            surviving_elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nested_docs_generator::InnerElement;

    fn shape(outer: usize, elements: usize, ratio: f64) -> DatasetShape {
        DatasetShape::new(outer, elements, ratio).unwrap()
    }

    #[test]
    fn test_latency_average() {
        let mut samples = LatencySamples::default();
        assert!(samples.is_empty());
        assert_eq!(samples.average_ms(), 0.0);

        samples.push(Duration::from_millis(10));
        samples.push(Duration::from_millis(20));
        samples.push(Duration::from_millis(30));

        assert_eq!(samples.len(), 3);
        assert!((samples.average_ms() - 20.0).abs() < 1e-9);
        assert_eq!(samples.samples_ms(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_run_result_from_samples() {
        let mut server = LatencySamples::default();
        server.push(Duration::from_millis(4));
        let mut client = LatencySamples::default();
        client.push(Duration::from_millis(8));
        client.push(Duration::from_millis(12));

        let result = RunResult::new(shape(2, 3, 1.0), &server, &client);
        assert_eq!(result.conditions, "Outer: 2\tElements: 3\tPercentage: 1");
        assert!((result.server_ms - 4.0).abs() < 1e-9);
        assert!((result.client_ms - 10.0).abs() < 1e-9);
        assert_eq!(result.client_samples_ms.len(), 2);
    }

    #[test]
    fn test_iteration_contexts_are_disjoint() {
        let first = IterationContext::new(shape(1, 1, 0.0), 32, 0);
        let second = IterationContext::new(shape(1, 1, 0.0), 32, 0);
        assert_ne!(first.collection_name, second.collection_name);
    }

    #[test]
    fn test_iteration_context_generates_shape() {
        let context = IterationContext::new(shape(3, 4, 0.5), 32, 0);
        let documents = context.generate();
        assert_eq!(documents.len(), 3);
        assert!(documents.iter().all(|d| d.elements.len() == 4));
    }

    #[test]
    fn test_verify_accepts_filtered_output() {
        let mut documents = IterationContext::new(shape(2, 10, 0.5), 32, 0).generate();
        let expected_surviving: usize = documents.iter().map(|d| d.active_elements().count()).sum();
        for document in &mut documents {
            document.retain_active();
        }

        let surviving = verify_result(StrategyKind::Client, 2, &documents).unwrap();
        assert_eq!(surviving, expected_surviving);
    }

    #[test]
    fn test_verify_rejects_wrong_count() {
        let documents = IterationContext::new(shape(1, 0, 0.0), 32, 0).generate();
        let err = verify_result(StrategyKind::Server, 2, &documents).unwrap_err();
        assert!(matches!(err, BenchError::Verification { .. }));
    }

    fn measurement(kind: StrategyKind, documents: usize, surviving: usize) -> Measurement {
        Measurement {
            kind,
            elapsed: Duration::from_millis(1),
            documents,
            surviving_elements: surviving,
        }
    }

    #[test]
    fn test_equivalent_measurements_accepted() {
        let server = measurement(StrategyKind::Server, 2, 7);
        let client = measurement(StrategyKind::Client, 2, 7);
        assert!(check_equivalent(&server, &client).is_ok());
    }

    #[test]
    fn test_diverging_measurements_rejected() {
        let server = measurement(StrategyKind::Server, 2, 7);

        let fewer_elements = measurement(StrategyKind::Client, 2, 6);
        let err = check_equivalent(&server, &fewer_elements).unwrap_err();
        assert!(matches!(err, BenchError::Verification { .. }));
        assert!(err.to_string().contains("server vs client"));

        let fewer_documents = measurement(StrategyKind::Client, 1, 7);
        assert!(check_equivalent(&server, &fewer_documents).is_err());
    }

    #[test]
    fn test_same_seed_gives_equivalent_measurements() {
        let shape = shape(4, 25, 0.5);
        let count = |mut documents: Vec<OuterDocument>, kind| {
            for document in &mut documents {
                document.retain_active();
            }
            let surviving = verify_result(kind, shape.outer_count(), &documents).unwrap();
            measurement(kind, documents.len(), surviving)
        };

        let server = count(IterationContext::new(shape, 32, 0).generate(), StrategyKind::Server);
        let client = count(IterationContext::new(shape, 32, 0).generate(), StrategyKind::Client);
        assert!(check_equivalent(&server, &client).is_ok());
    }

    #[test]
    fn test_verify_rejects_deleted_elements() {
        let documents = vec![OuterDocument {
            id: "outer".to_string(),
            elements: vec![InnerElement {
                id: "inner".to_string(),
                deleted_at: Some(bson::DateTime::now()),
            }],
        }];

        let err = verify_result(StrategyKind::Server, 1, &documents).unwrap_err();
        assert!(err.to_string().contains("deleted elements"));
    }
}
