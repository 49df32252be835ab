//! The two ways of reading documents without their soft-deleted elements.

use crate::error::BenchError;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::Collection;
use nested_docs_generator::{OuterDocument, DELETED_AT_FIELD, ELEMENTS_FIELD};
use std::fmt;

/// Which side of the wire drops deleted elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// `$addFields` + `$filter` inside MongoDB.
    Server,
    /// Plain `find`, then filtering in process.
    Client,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Server, StrategyKind::Client];

    /// Human-readable label for console output.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Server => "Server-side filter",
            StrategyKind::Client => "Client-side filter",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Server => write!(f, "server"),
            StrategyKind::Client => write!(f, "client"),
        }
    }
}

/// Reads every document of a collection with deleted elements removed.
///
/// Implementations make exactly one attempt; retrying inside a timed call
/// would distort the measurement.
#[async_trait]
pub trait FilterStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn fetch_active(
        &self,
        collection: &Collection<OuterDocument>,
    ) -> Result<Vec<OuterDocument>, BenchError>;
}

/// Pipeline overwriting the element array with its non-deleted members.
///
/// ```text
/// { $addFields: { e: { $filter: { input: "$e", cond: { $eq: ["$$this.da", null] } } } } }
/// ```
pub fn active_elements_pipeline() -> Vec<Document> {
    let input = format!("${ELEMENTS_FIELD}");
    let deleted_at = format!("$$this.{DELETED_AT_FIELD}");

    let filter = doc! {
        "$filter": {
            "input": input,
            "cond": { "$eq": [deleted_at, Bson::Null] },
        }
    };

    let mut overwrite = Document::new();
    overwrite.insert(ELEMENTS_FIELD, filter);

    vec![doc! { "$addFields": overwrite }]
}

/// Filtering performed by the database engine before data leaves it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerSideFilter;

#[async_trait]
impl FilterStrategy for ServerSideFilter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Server
    }

    async fn fetch_active(
        &self,
        collection: &Collection<OuterDocument>,
    ) -> Result<Vec<OuterDocument>, BenchError> {
        let cursor = collection
            .aggregate(active_elements_pipeline())
            .with_type::<OuterDocument>()
            .await?;
        let documents = cursor.try_collect().await?;
        Ok(documents)
    }
}

/// Filtering performed in this process after the full payload is transferred.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientSideFilter;

#[async_trait]
impl FilterStrategy for ClientSideFilter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Client
    }

    async fn fetch_active(
        &self,
        collection: &Collection<OuterDocument>,
    ) -> Result<Vec<OuterDocument>, BenchError> {
        let cursor = collection.find(doc! {}).await?;
        let mut documents: Vec<OuterDocument> = cursor.try_collect().await?;
        for document in &mut documents {
            document.retain_active();
        }
        Ok(documents)
    }
}

/// Build the strategy for a kind.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn FilterStrategy> {
    match kind {
        StrategyKind::Server => Box::new(ServerSideFilter),
        StrategyKind::Client => Box::new(ClientSideFilter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_shape() {
        let pipeline = active_elements_pipeline();
        assert_eq!(pipeline.len(), 1);

        let expected = doc! {
            "$addFields": {
                "e": {
                    "$filter": {
                        "input": "$e",
                        "cond": { "$eq": ["$$this.da", Bson::Null] },
                    }
                }
            }
        };
        assert_eq!(pipeline[0], expected);
    }

    #[test]
    fn test_strategy_for_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(strategy_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_kind_display_and_label() {
        assert_eq!(StrategyKind::Server.to_string(), "server");
        assert_eq!(StrategyKind::Client.to_string(), "client");
        assert_eq!(StrategyKind::Server.label(), "Server-side filter");
        assert_eq!(StrategyKind::Client.label(), "Client-side filter");
    }
}
