//! Filtered-collection query engine.
//!
//! Every collection is joined with the sum of its contributions, then filtered
//! on that aggregate: "still under target" and/or a comparison against the
//! remaining amount (`target_amount - total_contributed`).
//!
//! Pieces, leaves first:
//! - [`builder`]: the aggregation query and its predicates, rendered to SQL.
//! - [`operator`]: the closed comparison-operator set and its validating parse.
//! - [`composer`]: turns a [`CollectionFilter`] into an [`AggregationQuery`].
//! - [`service`]: [`CollectionQueryService::get_filtered`], the entry point.
//! - [`store`]: the storage seam the service executes queries against.

pub mod builder;
pub mod composer;
pub mod operator;
pub mod service;
pub mod store;

pub use builder::{AggregationQuery, Predicate};
pub use composer::CollectionFilter;
pub use operator::{CentsCheck, FilterOperator, RemainingAmountFilter, Threshold};
pub use service::CollectionQueryService;
pub use store::{CollectionStore, SqliteCollectionStore};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Caller input that cannot be turned into a filter. Raised before any query runs.
    #[error("invalid filter input: {0}")]
    InvalidFilterInput(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl QueryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        QueryError::InvalidFilterInput(reason.into())
    }
}

impl From<crate::db::DbError> for QueryError {
    fn from(err: crate::db::DbError) -> Self {
        QueryError::StorageUnavailable(err.to_string())
    }
}
