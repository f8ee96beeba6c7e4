//! Storage port traits — implemented by inspection_postgres.
//! Core logic depends only on these traits, never on sqlx directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::WritePlan;
use crate::error::InspectionError;
use crate::types::*;

pub type Result<T> = std::result::Result<T, InspectionError>;

/// Outcome of a transactional section write: the touched row plus the
/// inspection's status/progress as committed.
#[derive(Debug, Clone)]
pub struct AppliedWrite {
    pub row: AnswerRow,
    /// True when the plan collapsed the inspection to its final aggregate.
    pub collapsed: bool,
    pub status: InspectionStatus,
    pub progress: i16,
}

/// Pure planning callback the store invokes on the locked row snapshot
/// (ordered `answered_at` ascending).
pub type SectionPlanner<'a> = dyn Fn(&[AnswerRow]) -> Result<WritePlan> + Send + Sync + 'a;

#[async_trait]
pub trait AnswerStore: Send + Sync {
    async fn get(&self, answer_id: Uuid) -> Result<AnswerRow>;

    /// All rows for an inspection, `answered_at` ascending.
    async fn list_for_inspection(&self, inspection_id: Uuid) -> Result<Vec<AnswerRow>>;

    /// Apply one section write in a single transaction: lock the inspection
    /// and its answer rows, hand the ordered snapshot to `plan`, then apply
    /// the returned plan — either one row update/insert plus the inspection
    /// status/progress roll-forward (status explicit, else DRAFT →
    /// IN_PROGRESS; progress never decreases), or the completion collapse
    /// (delete every row, insert the collapsed aggregate, mark the
    /// inspection SUBMITTED with progress 100 and completed_at now).
    /// Concurrent writes to one inspection serialize on this lock.
    async fn write_section(
        &self,
        inspection_id: Uuid,
        answered_by: Uuid,
        plan: &SectionPlanner<'_>,
    ) -> Result<AppliedWrite>;

    async fn delete_for_inspection(&self, inspection_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait InspectionStore: Send + Sync {
    /// Load a live (non-tombstoned) inspection.
    async fn get(&self, id: Uuid) -> Result<Inspection>;

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Inspection>>;

    /// Inspector-client listing: keyed on assignee only (cross-organization
    /// assignment is deliberate), status ∈ {DRAFT, IN_PROGRESS, SUBMITTED}.
    async fn list_by_schedule_type(
        &self,
        assignee: Uuid,
        schedule_type: ScheduleType,
    ) -> Result<Vec<Inspection>>;

    async fn assign(&self, id: Uuid, user_id: Uuid, updated_by: Uuid) -> Result<Inspection>;

    /// Tombstone the inspection. Answer rows and image rows are removed by
    /// the caller through the other stores.
    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<()>;

    /// The `questions` document of the inspection's template, if any.
    async fn template_questions(&self, template_id: Uuid) -> Result<Option<Value>>;
}

#[async_trait]
pub trait ImageIndex: Send + Sync {
    /// Insert one image placement. `(answer_id, field_id, image_order)` is
    /// unique; on conflict the adapter returns
    /// [`InspectionError::ImageSlotTaken`] carrying the existing row.
    async fn insert_image(&self, image: NewQuestionImage) -> Result<QuestionImage>;

    /// Ordered by (section, field_id, image_order).
    async fn list_by_answer(&self, answer_id: Uuid) -> Result<Vec<QuestionImage>>;

    /// Resolves via the owning answer rows; same ordering.
    async fn list_by_inspection(&self, inspection_id: Uuid) -> Result<Vec<QuestionImage>>;

    async fn delete_by_inspection(&self, inspection_id: Uuid) -> Result<Vec<QuestionImage>>;

    /// Remove one placement, returning the deleted row so the caller can
    /// clean up the stored file.
    async fn delete_image(&self, image_id: Uuid) -> Result<QuestionImage>;
}

#[derive(Debug, Clone)]
pub struct NewQuestionImage {
    pub answer_id: Uuid,
    pub field_id: String,
    pub section: String,
    pub image_order: i32,
    pub image_url: String,
    pub uploaded_by: Uuid,
}

/// Read-only lookups into the administrative entities the core consumes.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn organization(&self, id: Uuid) -> Result<Organization>;
    async fn user(&self, id: Uuid) -> Result<User>;
    async fn device(&self, id: Uuid) -> Result<Device>;
    async fn site(&self, id: Uuid) -> Result<Option<Site>>;
    async fn contract(&self, id: Uuid) -> Result<Option<Contract>>;
}
