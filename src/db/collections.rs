use rusqlite::{params, Connection, OptionalExtension, Row};

use super::contributors::list_for_collection;
use super::models::{Collection, CollectionChanges, Contributor, NewCollection};
use super::{with_conn, DbError, DbPool};

const COLLECTION_COLUMNS: &str = "id, title, description, target_amount, link";

pub(crate) fn row_to_collection(row: &Row) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        target_amount: row.get(3)?,
        link: row.get(4)?,
    })
}

pub(crate) fn find_collection(
    conn: &Connection,
    id: i64,
) -> rusqlite::Result<Option<Collection>> {
    conn.query_row(
        &format!("SELECT {} FROM collections WHERE id = ?1", COLLECTION_COLUMNS),
        params![id],
        row_to_collection,
    )
    .optional()
}

pub(crate) fn insert_collection(
    conn: &Connection,
    new: &NewCollection,
) -> rusqlite::Result<Collection> {
    conn.execute(
        "INSERT INTO collections (title, description, target_amount, link) VALUES (?1, ?2, ?3, ?4)",
        params![new.title, new.description, new.target_amount, new.link],
    )?;
    Ok(Collection {
        id: conn.last_insert_rowid(),
        title: new.title.clone(),
        description: new.description.clone(),
        target_amount: new.target_amount,
        link: new.link.clone(),
    })
}

pub async fn create_collection(pool: &DbPool, new: NewCollection) -> Result<Collection, DbError> {
    with_conn(pool, move |conn| Ok(insert_collection(conn, &new)?)).await
}

/// Collection plus its contributors, read in one transaction.
pub async fn get_collection_with_contributors(
    pool: &DbPool,
    id: i64,
) -> Result<Option<(Collection, Vec<Contributor>)>, DbError> {
    with_conn(pool, move |conn| {
        let tx = conn.transaction()?;
        let Some(collection) = find_collection(&tx, id)? else {
            return Ok(None);
        };
        let contributors = list_for_collection(&tx, id)?;
        tx.commit()?;
        Ok(Some((collection, contributors)))
    })
    .await
}

/// Returns `false` when no collection has this id.
pub async fn update_collection(
    pool: &DbPool,
    id: i64,
    changes: CollectionChanges,
) -> Result<bool, DbError> {
    with_conn(pool, move |conn| {
        let updated = conn.execute(
            "UPDATE collections SET
                title = COALESCE(?1, title),
                description = COALESCE(?2, description),
                target_amount = COALESCE(?3, target_amount),
                link = COALESCE(?4, link)
             WHERE id = ?5",
            params![changes.title, changes.description, changes.target_amount, changes.link, id],
        )?;
        Ok(updated > 0)
    })
    .await
}

/// Deletes the collection; its contributors go with it through the cascade.
pub async fn delete_collection(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    with_conn(pool, move |conn| {
        let deleted = conn.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
    .await
}
