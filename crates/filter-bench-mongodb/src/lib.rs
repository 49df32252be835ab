//! MongoDB side of the mongo-filtering benchmark.
//!
//! - [`provision`]: disposable MongoDB instances (Docker container or a fresh
//!   database on an existing server)
//! - [`insert`]: batched `insert_many` of generated documents
//! - [`strategy`]: the two ways of dropping soft-deleted elements, on the
//!   server with an aggregation stage or in process after a plain `find`

pub mod error;
pub mod insert;
pub mod provision;
pub mod strategy;

pub use error::BenchError;
pub use insert::{count_documents, insert_documents, InsertMetrics, DEFAULT_BATCH_SIZE};
pub use provision::{
    ClientTimeouts, DockerProvisioner, EphemeralInstance, ExistingServerProvisioner,
    MongoContainer, Provisioner,
};
pub use strategy::{
    active_elements_pipeline, strategy_for, ClientSideFilter, FilterStrategy, ServerSideFilter,
    StrategyKind,
};
