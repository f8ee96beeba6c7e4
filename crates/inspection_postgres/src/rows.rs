//! Row structs bridging Postgres rows to the pure domain types.
//! Enums travel as text; conversion failures surface as Internal errors.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use inspection_core::types::*;

#[derive(Debug, FromRow)]
pub struct PgInspectionRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub device_id: Uuid,
    pub site_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub kind: String,
    pub schedule_type: String,
    pub status: String,
    pub progress: i16,
    pub title: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgInspectionRow> for Inspection {
    type Error = String;

    fn try_from(r: PgInspectionRow) -> Result<Self, Self::Error> {
        Ok(Inspection {
            id: r.id,
            organization_id: r.organization_id,
            device_id: r.device_id,
            site_id: r.site_id,
            contract_id: r.contract_id,
            template_id: r.template_id,
            kind: InspectionKind::from_str(&r.kind)
                .ok_or_else(|| format!("unknown inspection kind: {}", r.kind))?,
            schedule_type: ScheduleType::from_str(&r.schedule_type)
                .ok_or_else(|| format!("unknown schedule type: {}", r.schedule_type))?,
            status: InspectionStatus::from_str(&r.status)
                .ok_or_else(|| format!("unknown status: {}", r.status))?,
            progress: r.progress,
            title: r.title,
            assigned_to: r.assigned_to,
            created_by: r.created_by,
            updated_by: r.updated_by,
            completed_at: r.completed_at,
            deleted_at: r.deleted_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PgAnswerRow {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub answers: Value,
    pub answered_by: Uuid,
    pub answered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgAnswerRow> for AnswerRow {
    fn from(r: PgAnswerRow) -> Self {
        AnswerRow {
            id: r.id,
            inspection_id: r.inspection_id,
            answers: r.answers,
            answered_by: r.answered_by,
            answered_at: r.answered_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PgImageRow {
    pub id: Uuid,
    pub answer_id: Uuid,
    pub field_id: String,
    pub section: String,
    pub image_order: i32,
    pub image_url: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<PgImageRow> for QuestionImage {
    fn from(r: PgImageRow) -> Self {
        QuestionImage {
            id: r.id,
            answer_id: r.answer_id,
            field_id: r.field_id,
            section: r.section,
            image_order: r.image_order,
            image_url: r.image_url,
            uploaded_by: r.uploaded_by,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PgOrganizationRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgOrganizationRow> for Organization {
    fn from(r: PgOrganizationRow) -> Self {
        Organization {
            id: r.id,
            name: r.name,
            code: r.code,
            contact_name: r.contact_name,
            contact_phone: r.contact_phone,
            contact_email: r.contact_email,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
