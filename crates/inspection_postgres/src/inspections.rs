//! Postgres-backed inspection store.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use inspection_core::error::InspectionError;
use inspection_core::ports::{InspectionStore, Result};
use inspection_core::types::{Inspection, ScheduleType};

use crate::rows::PgInspectionRow;

const INSPECTION_COLUMNS: &str = "id, organization_id, device_id, site_id, contract_id, \
     template_id, kind, schedule_type, status, progress, title, assigned_to, created_by, \
     updated_by, completed_at, deleted_at, created_at, updated_at";

pub struct PgInspectionStore {
    pool: PgPool,
}

impl PgInspectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_domain(row: PgInspectionRow) -> Result<Inspection> {
    row.try_into()
        .map_err(|e: String| InspectionError::Internal(anyhow!(e)))
}

#[async_trait]
impl InspectionStore for PgInspectionStore {
    async fn get(&self, id: Uuid) -> Result<Inspection> {
        let row = sqlx::query_as::<_, PgInspectionRow>(&format!(
            "SELECT {INSPECTION_COLUMNS} FROM inspections
             WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        match row {
            Some(r) => into_domain(r),
            None => Err(InspectionError::NotFound(format!("inspection {id}"))),
        }
    }

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Inspection>> {
        let rows = sqlx::query_as::<_, PgInspectionRow>(&format!(
            "SELECT {INSPECTION_COLUMNS} FROM inspections
             WHERE organization_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(organization_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        rows.into_iter().map(into_domain).collect()
    }

    async fn list_by_schedule_type(
        &self,
        assignee: Uuid,
        schedule_type: ScheduleType,
    ) -> Result<Vec<Inspection>> {
        let rows = sqlx::query_as::<_, PgInspectionRow>(&format!(
            "SELECT {INSPECTION_COLUMNS} FROM inspections
             WHERE assigned_to = $1
               AND schedule_type = $2
               AND status IN ('DRAFT', 'IN_PROGRESS', 'SUBMITTED')
               AND deleted_at IS NULL
             ORDER BY created_at DESC"
        ))
        .bind(assignee)
        .bind(schedule_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        rows.into_iter().map(into_domain).collect()
    }

    async fn assign(&self, id: Uuid, user_id: Uuid, updated_by: Uuid) -> Result<Inspection> {
        let row = sqlx::query_as::<_, PgInspectionRow>(&format!(
            "UPDATE inspections
             SET assigned_to = $2, updated_by = $3, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {INSPECTION_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        match row {
            Some(r) => into_domain(r),
            None => Err(InspectionError::NotFound(format!("inspection {id}"))),
        }
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE inspections SET deleted_at = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn template_questions(&self, template_id: Uuid) -> Result<Option<Value>> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT questions FROM inspection_templates WHERE id = $1")
                .bind(template_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| anyhow!(e))?;
        Ok(row.map(|(q,)| q))
    }
}
