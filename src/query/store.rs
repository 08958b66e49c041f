use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection};

use super::builder::AggregationQuery;
use super::QueryError;
use crate::db::collections::row_to_collection;
use crate::db::models::CollectionSummary;
use crate::db::{self, DbPool};

/// Read side of storage the query service runs against.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn fetch_aggregated(
        &self,
        query: &AggregationQuery,
    ) -> Result<Vec<CollectionSummary>, QueryError>;
}

#[derive(Clone)]
pub struct SqliteCollectionStore {
    pool: DbPool,
}

impl SqliteCollectionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Executes an aggregation query on a single connection.
pub fn run_aggregation(
    conn: &Connection,
    query: &AggregationQuery,
) -> rusqlite::Result<Vec<CollectionSummary>> {
    let (sql, params) = query.to_sql();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        Ok(CollectionSummary {
            collection: row_to_collection(row)?,
            raised: row.get(5)?,
        })
    })?;
    rows.collect()
}

#[async_trait]
impl CollectionStore for SqliteCollectionStore {
    async fn fetch_aggregated(
        &self,
        query: &AggregationQuery,
    ) -> Result<Vec<CollectionSummary>, QueryError> {
        let query = query.clone();
        let summaries =
            db::with_conn(&self.pool, move |conn| Ok(run_aggregation(conn, &query)?)).await?;
        Ok(summaries)
    }
}
