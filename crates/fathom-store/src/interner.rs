//! `id_for_string(table, s)` (spec §4.5): returns the existing id if
//! present, else inserts and returns the new id — atomically with
//! respect to concurrent inserts via a unique constraint plus
//! conflict-tolerant read-back.

use sqlx::{Sqlite, Transaction};

use crate::error::Result;

/// `table` must be one of the fixed interning table names in
/// [`crate::schema::MIGRATIONS`] — never user input, so string
/// interpolation into the query here carries no injection risk.
pub async fn id_for_string(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    value: &str,
) -> Result<i64> {
    let insert = format!(
        "INSERT INTO {table} (value) VALUES (?) ON CONFLICT(value) DO NOTHING"
    );
    sqlx::query(&insert).bind(value).execute(&mut *tx).await?;

    let select = format!("SELECT id FROM {table} WHERE value = ?");
    let row: (i64,) = sqlx::query_as(&select).bind(value).fetch_one(&mut *tx).await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MIGRATIONS;
    use sqlx::SqlitePool;

    async fn fresh_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        for stmt in MIGRATIONS {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn repeated_insert_is_idempotent() {
        let pool = fresh_pool().await;
        let mut tx = pool.begin().await.unwrap();
        let a = id_for_string(&mut tx, "descs", "oom").await.unwrap();
        let b = id_for_string(&mut tx, "descs", "oom").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn distinct_values_get_distinct_ids() {
        let pool = fresh_pool().await;
        let mut tx = pool.begin().await.unwrap();
        let a = id_for_string(&mut tx, "descs", "oom").await.unwrap();
        let b = id_for_string(&mut tx, "descs", "segv").await.unwrap();
        tx.commit().await.unwrap();
        assert_ne!(a, b);
    }
}
