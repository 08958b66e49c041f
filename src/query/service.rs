use std::sync::Arc;

use super::composer::{compose, CollectionFilter};
use super::store::CollectionStore;
use super::QueryError;
use crate::db::models::CollectionSummary;

/// Entry point for filtered collection listings. Stateless and read-only.
#[derive(Clone)]
pub struct CollectionQueryService {
    store: Arc<dyn CollectionStore>,
}

impl CollectionQueryService {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    /// Collections matching `filter`, each carrying its contribution total.
    pub async fn get_filtered(
        &self,
        filter: &CollectionFilter,
    ) -> Result<Vec<CollectionSummary>, QueryError> {
        let query = compose(filter);
        tracing::debug!(predicates = ?query.predicates(), "running collection aggregation");
        self.store.fetch_aggregated(&query).await
    }
}
