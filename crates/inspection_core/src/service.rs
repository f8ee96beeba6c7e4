//! InspectionService — the orchestration layer the HTTP handlers call.
//!
//! Takes port traits via `Arc<dyn PortTrait>` so the same logic runs against
//! Postgres or test doubles. All methods take `&Principal` explicitly; there
//! is no implicit identity anywhere.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::engine::{AggregationEngine, Navigation, SectionWrite};
use crate::error::InspectionError;
use crate::ports::{
    AnswerStore, DirectoryStore, ImageIndex, InspectionStore, NewQuestionImage, Result,
};
use crate::principal::Principal;
use crate::template::TemplateCatalogue;
use crate::types::*;

/// Result of one section write, echoed to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionWriteOutcome {
    pub answer_id: Uuid,
    pub inspection_id: Uuid,
    pub status: InspectionStatus,
    pub progress: i16,
    #[serde(flatten)]
    pub navigation: Navigation,
}

/// Everything the report composer needs, loaded in one pass.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub inspection: Inspection,
    pub organization: Organization,
    pub device: Device,
    pub site: Option<Site>,
    pub contract: Option<Contract>,
    pub answers: Value,
    pub answer_id: Uuid,
    pub images: Vec<QuestionImage>,
    pub catalogue: TemplateCatalogue,
}

pub struct InspectionService {
    inspections: Arc<dyn InspectionStore>,
    answers: Arc<dyn AnswerStore>,
    images: Arc<dyn ImageIndex>,
    directory: Arc<dyn DirectoryStore>,
}

impl InspectionService {
    pub fn new(
        inspections: Arc<dyn InspectionStore>,
        answers: Arc<dyn AnswerStore>,
        images: Arc<dyn ImageIndex>,
        directory: Arc<dyn DirectoryStore>,
    ) -> Self {
        Self {
            inspections,
            answers,
            images,
            directory,
        }
    }

    async fn engine_for(&self, inspection: &Inspection) -> Result<AggregationEngine> {
        let catalogue = match inspection.template_id {
            Some(template_id) => match self.inspections.template_questions(template_id).await? {
                Some(questions) => TemplateCatalogue::from_questions(&questions)?,
                None => TemplateCatalogue::default_catalogue(),
            },
            None => TemplateCatalogue::default_catalogue(),
        };
        Ok(AggregationEngine::new(catalogue))
    }

    // ── Section writes (C3 entry point) ──────────────────────

    pub async fn write_section(
        &self,
        principal: &Principal,
        write: SectionWrite,
    ) -> Result<SectionWriteOutcome> {
        let inspection = self.inspections.get(write.inspection_id).await?;
        principal.require_access(&inspection)?;

        let engine = self.engine_for(&inspection).await?;
        let target_status = engine.validate(&write)?;

        let now = Utc::now();
        let writer = principal.user_id;

        // The store locks the inspection's rows and runs the planner on the
        // locked snapshot; probe, merge and the completion decision all
        // happen inside that one transaction.
        let applied = self
            .answers
            .write_section(write.inspection_id, writer, &|rows| {
                engine.plan_write(rows, &write, target_status, writer, now)
            })
            .await?;

        let navigation = engine.navigation(&write, applied.collapsed);
        if applied.collapsed {
            tracing::info!(
                inspection_id = %write.inspection_id,
                answer_id = %applied.row.id,
                section = %write.section,
                "inspection completed; aggregate collapsed"
            );
        }

        Ok(SectionWriteOutcome {
            answer_id: applied.row.id,
            inspection_id: write.inspection_id,
            status: applied.status,
            progress: applied.progress,
            navigation,
        })
    }

    /// Persist a signature into the aggregate (`signatures.<role>`).
    pub async fn record_signature(
        &self,
        principal: &Principal,
        inspection_id: Uuid,
        signature_type: &str,
        signature_image: &str,
        answer_id: Option<Uuid>,
    ) -> Result<SectionWriteOutcome> {
        if signature_type.trim().is_empty() {
            return Err(InspectionError::InvalidInput("signatureType is required".into()));
        }
        if !signature_image.starts_with("data:image/") {
            return Err(InspectionError::InvalidInput(
                "signatureImage must be a data-url".into(),
            ));
        }
        let write = SectionWrite {
            inspection_id,
            section: crate::engine::SIGNATURES_SECTION.into(),
            answers: serde_json::json!({ signature_type: signature_image }),
            data: None,
            answer_id,
            section_index: None,
            is_first_section: false,
            status: None,
            section_status: None,
            progress: None,
        };
        self.write_section(principal, write).await
    }

    // ── Images (C2 orchestration) ────────────────────────────

    pub async fn register_image(
        &self,
        principal: &Principal,
        inspection_id: Uuid,
        image: NewQuestionImage,
    ) -> Result<QuestionImage> {
        let inspection = self.inspections.get(inspection_id).await?;
        principal.require_access(&inspection)?;

        if image.image_order < 1 {
            return Err(InspectionError::InvalidInput(
                "image order must be 1 or greater".into(),
            ));
        }
        let answer = self.answers.get(image.answer_id).await?;
        if answer.inspection_id != inspection_id {
            return Err(InspectionError::InvalidInput(format!(
                "answer {} does not belong to inspection {inspection_id}",
                image.answer_id
            )));
        }

        self.images.insert_image(image).await
    }

    pub async fn question_images(
        &self,
        principal: &Principal,
        inspection_id: Uuid,
        field_id: Option<&str>,
        section: Option<&str>,
    ) -> Result<Vec<QuestionImage>> {
        let inspection = self.inspections.get(inspection_id).await?;
        principal.require_access(&inspection)?;

        let mut images = self.images.list_by_inspection(inspection_id).await?;
        if let Some(f) = field_id {
            images.retain(|i| i.field_id == f);
        }
        if let Some(s) = section {
            images.retain(|i| i.section == s);
        }
        Ok(images)
    }

    pub async fn delete_image(
        &self,
        principal: &Principal,
        inspection_id: Uuid,
        image_id: Uuid,
    ) -> Result<QuestionImage> {
        let inspection = self.inspections.get(inspection_id).await?;
        principal.require_access(&inspection)?;
        self.images.delete_image(image_id).await
    }

    // ── Inspection surface ───────────────────────────────────

    pub async fn get_inspection(&self, principal: &Principal, id: Uuid) -> Result<Inspection> {
        let inspection = self.inspections.get(id).await?;
        principal.require_access(&inspection)?;
        Ok(inspection)
    }

    pub async fn list_inspections(
        &self,
        principal: &Principal,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Inspection>> {
        self.inspections
            .list_for_organization(principal.organization_id, limit, offset)
            .await
    }

    /// Inspector-client listing. Deliberately keyed on the assignee alone so
    /// cross-organization assignments remain visible.
    pub async fn list_by_schedule_type(
        &self,
        principal: &Principal,
        schedule_type: ScheduleType,
    ) -> Result<Vec<Inspection>> {
        self.inspections
            .list_by_schedule_type(principal.user_id, schedule_type)
            .await
    }

    /// Reassign an inspection. Returns the inspection and the new assignee
    /// so the caller can send the assignment notice.
    pub async fn assign(
        &self,
        principal: &Principal,
        inspection_id: Uuid,
        user_id: Uuid,
    ) -> Result<(Inspection, User)> {
        let inspection = self.inspections.get(inspection_id).await?;
        principal.require_access(&inspection)?;

        let user = self.directory.user(user_id).await?;
        let updated = self
            .inspections
            .assign(inspection_id, user_id, principal.user_id)
            .await?;
        Ok((updated, user))
    }

    /// Cascade delete: image rows, answer rows, then the tombstone. Returns
    /// the deleted image rows so the caller can remove the stored files.
    pub async fn delete_inspection(
        &self,
        principal: &Principal,
        inspection_id: Uuid,
    ) -> Result<Vec<QuestionImage>> {
        let inspection = self.inspections.get(inspection_id).await?;
        principal.require_access(&inspection)?;

        let removed = self.images.delete_by_inspection(inspection_id).await?;
        self.answers.delete_for_inspection(inspection_id).await?;
        self.inspections.soft_delete(inspection_id, Utc::now()).await?;

        tracing::info!(
            inspection_id = %inspection_id,
            images = removed.len(),
            "inspection deleted with cascade"
        );
        Ok(removed)
    }

    /// Resolve the inspection owning an answer row, enforcing the caller's
    /// access before any expensive work happens against that answer.
    pub async fn inspection_for_answer(
        &self,
        principal: &Principal,
        answer_id: Uuid,
    ) -> Result<Inspection> {
        let answer = self.answers.get(answer_id).await?;
        let inspection = self.inspections.get(answer.inspection_id).await?;
        principal.require_access(&inspection)?;
        Ok(inspection)
    }

    // ── Report hydration (feeds C5) ──────────────────────────

    /// Load the aggregate and every referenced entity for report rendering.
    /// No access check: callers are either authenticated handlers that
    /// checked the inspection, or the background notifier.
    pub async fn report_bundle(&self, answer_id: Uuid) -> Result<ReportBundle> {
        let answer = self.answers.get(answer_id).await?;
        let inspection = self.inspections.get(answer.inspection_id).await?;
        let organization = self.directory.organization(inspection.organization_id).await?;
        let device = self.directory.device(inspection.device_id).await?;
        let site = match inspection.site_id {
            Some(id) => self.directory.site(id).await?,
            None => None,
        };
        let contract = match inspection.contract_id {
            Some(id) => self.directory.contract(id).await?,
            None => None,
        };
        let images = self.images.list_by_answer(answer_id).await?;
        let catalogue = self.engine_for(&inspection).await?.catalogue().clone();

        Ok(ReportBundle {
            inspection,
            organization,
            device,
            site,
            contract,
            answers: answer.answers,
            answer_id,
            images,
            catalogue,
        })
    }

    /// The contact address completion mail goes to, if the organization has
    /// one configured.
    pub async fn completion_contact(&self, inspection_id: Uuid) -> Result<Option<String>> {
        let inspection = self.inspections.get(inspection_id).await?;
        let organization = self.directory.organization(inspection.organization_id).await?;
        Ok(organization.contact_email)
    }

    /// Entities named in the assignment notice.
    pub async fn assignment_context(
        &self,
        inspection: &Inspection,
    ) -> Result<(Organization, Option<Site>, Device)> {
        let organization = self.directory.organization(inspection.organization_id).await?;
        let site = match inspection.site_id {
            Some(id) => self.directory.site(id).await?,
            None => None,
        };
        let device = self.directory.device(inspection.device_id).await?;
        Ok((organization, site, device))
    }
}

#[cfg(test)]
mod tests;
