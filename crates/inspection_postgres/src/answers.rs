//! Postgres-backed answer row store.
//!
//! Section writes go through `write_section`, which runs the whole
//! read-plan-apply sequence in one transaction: the inspection row is
//! locked first so concurrent writers to one inspection serialize, the
//! answer rows are read under `FOR UPDATE`, the pure planner runs on that
//! snapshot, and the row write plus the inspection status/progress
//! roll-forward commit together.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use inspection_core::engine::{WritePlan, WriteTarget};
use inspection_core::error::InspectionError;
use inspection_core::ports::{AnswerStore, AppliedWrite, Result, SectionPlanner};
use inspection_core::types::{AnswerRow, InspectionStatus};

use crate::rows::PgAnswerRow;

const ANSWER_COLUMNS: &str =
    "id, inspection_id, answers, answered_by, answered_at, created_at, updated_at";

pub struct PgAnswerStore {
    pool: PgPool,
}

impl PgAnswerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnswerStore for PgAnswerStore {
    async fn get(&self, answer_id: Uuid) -> Result<AnswerRow> {
        let row = sqlx::query_as::<_, PgAnswerRow>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM inspection_answers WHERE id = $1"
        ))
        .bind(answer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(AnswerRow::from)
            .ok_or_else(|| InspectionError::NotFound(format!("answer {answer_id}")))
    }

    async fn list_for_inspection(&self, inspection_id: Uuid) -> Result<Vec<AnswerRow>> {
        let rows = sqlx::query_as::<_, PgAnswerRow>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM inspection_answers
             WHERE inspection_id = $1
             ORDER BY answered_at ASC"
        ))
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(AnswerRow::from).collect())
    }

    async fn write_section(
        &self,
        inspection_id: Uuid,
        answered_by: Uuid,
        plan: &SectionPlanner<'_>,
    ) -> Result<AppliedWrite> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        // the inspection row is the write lock for the whole aggregate
        let locked: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM inspections WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(inspection_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;
        if locked.is_none() {
            return Err(InspectionError::NotFound(format!("inspection {inspection_id}")));
        }

        let rows = sqlx::query_as::<_, PgAnswerRow>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM inspection_answers
             WHERE inspection_id = $1
             ORDER BY answered_at ASC
             FOR UPDATE"
        ))
        .bind(inspection_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;
        let rows: Vec<AnswerRow> = rows.into_iter().map(AnswerRow::from).collect();

        let applied = match plan(&rows)? {
            WritePlan::Merge {
                target,
                answers,
                status,
                progress,
            } => {
                let row = match target {
                    WriteTarget::Existing(id) => sqlx::query_as::<_, PgAnswerRow>(&format!(
                        "UPDATE inspection_answers
                         SET answers = $2, answered_by = $3,
                             answered_at = now(), updated_at = now()
                         WHERE id = $1
                         RETURNING {ANSWER_COLUMNS}"
                    ))
                    .bind(id)
                    .bind(&answers)
                    .bind(answered_by)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| anyhow!(e))?,
                    WriteTarget::CreateNew => sqlx::query_as::<_, PgAnswerRow>(&format!(
                        "INSERT INTO inspection_answers (inspection_id, answers, answered_by)
                         VALUES ($1, $2, $3)
                         RETURNING {ANSWER_COLUMNS}"
                    ))
                    .bind(inspection_id)
                    .bind(&answers)
                    .bind(answered_by)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| anyhow!(e))?,
                };

                let (new_status, new_progress): (String, i16) = sqlx::query_as(
                    "UPDATE inspections
                     SET status = CASE
                             WHEN $2::text IS NOT NULL THEN $2
                             WHEN status = 'DRAFT' THEN 'IN_PROGRESS'
                             ELSE status
                         END,
                         progress = LEAST(GREATEST(progress, $3), 100),
                         updated_by = $4, updated_at = now()
                     WHERE id = $1
                     RETURNING status, progress",
                )
                .bind(inspection_id)
                .bind(status.map(|s| s.as_str()))
                .bind(progress)
                .bind(answered_by)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;

                let status = InspectionStatus::from_str(&new_status).ok_or_else(|| {
                    InspectionError::Internal(anyhow!("unknown status: {new_status}"))
                })?;
                AppliedWrite {
                    row: row.into(),
                    collapsed: false,
                    status,
                    progress: new_progress,
                }
            }
            WritePlan::Collapse { answers } => {
                sqlx::query("DELETE FROM inspection_answers WHERE inspection_id = $1")
                    .bind(inspection_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| anyhow!(e))?;

                let row = sqlx::query_as::<_, PgAnswerRow>(&format!(
                    "INSERT INTO inspection_answers (inspection_id, answers, answered_by)
                     VALUES ($1, $2, $3)
                     RETURNING {ANSWER_COLUMNS}"
                ))
                .bind(inspection_id)
                .bind(&answers)
                .bind(answered_by)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;

                sqlx::query(
                    "UPDATE inspections
                     SET status = 'SUBMITTED', progress = 100, completed_at = now(),
                         updated_by = $2, updated_at = now()
                     WHERE id = $1",
                )
                .bind(inspection_id)
                .bind(answered_by)
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;

                AppliedWrite {
                    row: row.into(),
                    collapsed: true,
                    status: InspectionStatus::Submitted,
                    progress: 100,
                }
            }
        };

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(applied)
    }

    async fn delete_for_inspection(&self, inspection_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM inspection_answers WHERE inspection_id = $1")
            .bind(inspection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }
}
