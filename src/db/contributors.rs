use rusqlite::{params, Connection, OptionalExtension, Row};

use super::collections::find_collection;
use super::models::{Contributor, ContributorChanges, NewContributor};
use super::{with_conn, DbError, DbPool};

const CONTRIBUTOR_COLUMNS: &str = "id, collection_id, user_name, amount";

fn row_to_contributor(row: &Row) -> rusqlite::Result<Contributor> {
    Ok(Contributor {
        id: row.get(0)?,
        collection_id: row.get(1)?,
        user_name: row.get(2)?,
        amount: row.get(3)?,
    })
}

pub(crate) fn list_for_collection(
    conn: &Connection,
    collection_id: i64,
) -> rusqlite::Result<Vec<Contributor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM contributors WHERE collection_id = ?1 ORDER BY id",
        CONTRIBUTOR_COLUMNS
    ))?;
    let rows = stmt.query_map(params![collection_id], row_to_contributor)?;
    rows.collect()
}

pub(crate) fn insert_contributor(
    conn: &Connection,
    collection_id: i64,
    new: &NewContributor,
) -> rusqlite::Result<Contributor> {
    conn.execute(
        "INSERT INTO contributors (collection_id, user_name, amount) VALUES (?1, ?2, ?3)",
        params![collection_id, new.user_name, new.amount],
    )?;
    Ok(Contributor {
        id: conn.last_insert_rowid(),
        collection_id,
        user_name: new.user_name.clone(),
        amount: new.amount,
    })
}

/// Adds a contributor to a collection. Returns `None` if the collection does not exist.
pub async fn create_contributor(
    pool: &DbPool,
    collection_id: i64,
    new: NewContributor,
) -> Result<Option<Contributor>, DbError> {
    with_conn(pool, move |conn| {
        let tx = conn.transaction()?;
        if find_collection(&tx, collection_id)?.is_none() {
            return Ok(None);
        }
        let contributor = insert_contributor(&tx, collection_id, &new)?;
        tx.commit()?;
        Ok(Some(contributor))
    })
    .await
}

pub async fn list_contributors(pool: &DbPool) -> Result<Vec<Contributor>, DbError> {
    with_conn(pool, |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM contributors ORDER BY id",
            CONTRIBUTOR_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_contributor)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
    .await
}

pub async fn get_contributor(pool: &DbPool, id: i64) -> Result<Option<Contributor>, DbError> {
    with_conn(pool, move |conn| {
        let contributor = conn
            .query_row(
                &format!("SELECT {} FROM contributors WHERE id = ?1", CONTRIBUTOR_COLUMNS),
                params![id],
                row_to_contributor,
            )
            .optional()?;
        Ok(contributor)
    })
    .await
}

/// `collection_id` is fixed at creation and never part of an update.
pub async fn update_contributor(
    pool: &DbPool,
    id: i64,
    changes: ContributorChanges,
) -> Result<bool, DbError> {
    with_conn(pool, move |conn| {
        let updated = conn.execute(
            "UPDATE contributors SET
                user_name = COALESCE(?1, user_name),
                amount = COALESCE(?2, amount)
             WHERE id = ?3",
            params![changes.user_name, changes.amount, id],
        )?;
        Ok(updated > 0)
    })
    .await
}

pub async fn delete_contributor(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    with_conn(pool, move |conn| {
        let deleted = conn.execute("DELETE FROM contributors WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
    .await
}
