//! # Master Data Repository
//!
//! Pick-list entries (shippers, consignees, product types, destinations).

use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::rows::{convert_all, MasterRow, MASTER_COLUMNS};
use shipdesk_core::{MasterKind, MasterRecord};

#[derive(Debug, Clone)]
pub struct MasterDataRepository {
    pool: SqlitePool,
}

impl MasterDataRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MasterDataRepository { pool }
    }

    /// Lists entries, optionally restricted to one kind, ordered by code.
    pub async fn list(&self, kind: Option<MasterKind>) -> DbResult<Vec<MasterRecord>> {
        let rows = match kind {
            Some(kind) => {
                let sql = format!(
                    "SELECT {} FROM master_records WHERE kind = ?1 ORDER BY code, id",
                    MASTER_COLUMNS
                );
                sqlx::query_as::<_, MasterRow>(&sql)
                    .bind(kind.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM master_records ORDER BY kind, code, id",
                    MASTER_COLUMNS
                );
                sqlx::query_as::<_, MasterRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(convert_all(rows)?)
    }

    pub async fn upsert(&self, record: &MasterRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO master_records (id, kind, code, name, details, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                code = excluded.code,
                name = excluded.name,
                details = excluded.details,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(record.kind.as_str())
        .bind(&record.code)
        .bind(&record.name)
        .bind(&record.details)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
