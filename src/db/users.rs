use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};

use super::models::User;
use super::{with_conn, DbError, DbPool};

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Inserts a user. Returns `None` when the email is already registered.
pub async fn create_user(
    pool: &DbPool,
    name: String,
    email: String,
    password_hash: String,
    now: DateTime<Utc>,
) -> Result<Option<User>, DbError> {
    with_conn(pool, move |conn| {
        let inserted = conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, password_hash, now],
        );
        match inserted {
            Ok(_) => Ok(Some(User {
                id: conn.last_insert_rowid(),
                name,
                email,
                password_hash,
                created_at: now,
            })),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    })
    .await
}

pub async fn find_user_by_email(pool: &DbPool, email: String) -> Result<Option<User>, DbError> {
    with_conn(pool, move |conn| {
        let user = conn
            .query_row(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    })
    .await
}
