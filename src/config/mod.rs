//! Benchmark configuration: the parameter grid and its CLI surface.

pub mod args;
pub mod duration;

use anyhow::Context;
use nested_docs_generator::DatasetShape;

/// Default outer document counts swept by the benchmark.
pub const DEFAULT_OUTER_COUNTS: [usize; 2] = [1000, 100];

/// Default elements per outer document.
pub const DEFAULT_ELEMENT_COUNTS: [usize; 2] = [100, 10000];

/// Default fractions of elements carrying a deletion timestamp.
pub const DEFAULT_DELETION_RATIOS: [f64; 2] = [0.5, 1.0];

/// Default repetitions per grid cell and strategy.
pub const DEFAULT_ITERATIONS: usize = 20;

/// Default seed of the data generator.
pub const DEFAULT_SEED: u64 = 32;

/// The full set of dataset shapes to measure, and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkGrid {
    pub outer_counts: Vec<usize>,
    pub element_counts: Vec<usize>,
    pub deletion_ratios: Vec<f64>,
    pub iterations: usize,
    pub seed: u64,
}

impl Default for BenchmarkGrid {
    fn default() -> Self {
        Self {
            outer_counts: DEFAULT_OUTER_COUNTS.to_vec(),
            element_counts: DEFAULT_ELEMENT_COUNTS.to_vec(),
            deletion_ratios: DEFAULT_DELETION_RATIOS.to_vec(),
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

impl BenchmarkGrid {
    /// Check that every axis is usable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.outer_counts.is_empty() {
            anyhow::bail!("At least one outer count is required");
        }
        if self.element_counts.is_empty() {
            anyhow::bail!("At least one element count is required");
        }
        if self.deletion_ratios.is_empty() {
            anyhow::bail!("At least one deletion ratio is required");
        }
        if self.iterations == 0 {
            anyhow::bail!("Iterations must be at least 1");
        }
        Ok(())
    }

    /// Expand the grid in measurement order: outer counts, then element
    /// counts, then deletion ratios.
    pub fn shapes(&self) -> anyhow::Result<Vec<DatasetShape>> {
        self.validate()?;

        let mut shapes = Vec::with_capacity(
            self.outer_counts.len() * self.element_counts.len() * self.deletion_ratios.len(),
        );
        for &outer in &self.outer_counts {
            for &elements in &self.element_counts {
                for &ratio in &self.deletion_ratios {
                    let shape = DatasetShape::new(outer, elements, ratio)
                        .with_context(|| format!("Invalid grid cell {outer}x{elements}"))?;
                    shapes.push(shape);
                }
            }
        }

        Ok(shapes)
    }
}
