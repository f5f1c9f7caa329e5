//! Catalog operations: paged backlog queries and completion markers.
//!
//! The backlog query is ordered by id so pagination is stable and a resume
//! cursor can constrain it to rows strictly after a known key. Marker
//! updates are idempotent; repeating one is harmless.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// One catalog row lacking a completion marker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub doi: Option<String>,
}

impl super::Db {
    /// Fetch one page of unprocessed rows, ordered by id, optionally
    /// constrained to ids strictly after `after`.
    pub async fn fetch_unprocessed(
        &self,
        after: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<DocumentRow>> {
        let rows = match after {
            Some(cursor) => {
                sqlx::query_as::<_, DocumentRow>(
                    "SELECT id, doi FROM documents
                     WHERE processed_at IS NULL AND id > $1
                     ORDER BY id LIMIT $2",
                )
                .bind(cursor)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, DocumentRow>(
                    "SELECT id, doi FROM documents
                     WHERE processed_at IS NULL
                     ORDER BY id LIMIT $1",
                )
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
        };

        debug!(count = rows.len(), after = ?after, "fetched catalog page");
        Ok(rows)
    }

    /// Set the completion marker for one document. Idempotent; returns
    /// whether a row was affected (false means the id is unknown, which is
    /// a data-integrity signal, not a failure).
    pub async fn mark_processed(&self, id: Uuid) -> Result<bool> {
        let rows_affected = sqlx::query("UPDATE documents SET processed_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Mark every given id that is still unmarked. Used by the repair pass
    /// to reconcile persisted payloads whose marker write failed. Returns
    /// the number of rows updated.
    pub async fn mark_processed_many(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let rows_affected = sqlx::query(
            "UPDATE documents SET processed_at = $1
             WHERE id = ANY($2) AND processed_at IS NULL",
        )
        .bind(Utc::now())
        .bind(ids)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(rows_affected)
    }

    /// Count rows still lacking a completion marker.
    pub async fn count_unprocessed(&self) -> Result<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM documents WHERE processed_at IS NULL")
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }
}
