//! Service-level tests against in-memory port doubles.
//!
//! These exercise the full write → probe → merge → collapse path without a
//! database, including the sequential six-section scenario.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::*;
use crate::engine::{SectionWrite, WritePlan, WriteTarget};
use crate::error::InspectionError;
use crate::ports::*;

// ── In-memory doubles ────────────────────────────────────────

#[derive(Default)]
struct MemAnswers {
    rows: Mutex<Vec<AnswerRow>>,
    inspections: Arc<MemInspections>,
}

#[async_trait]
impl AnswerStore for MemAnswers {
    async fn get(&self, answer_id: Uuid) -> Result<AnswerRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == answer_id)
            .cloned()
            .ok_or_else(|| InspectionError::NotFound(format!("answer {answer_id}")))
    }

    async fn list_for_inspection(&self, inspection_id: Uuid) -> Result<Vec<AnswerRow>> {
        let mut rows: Vec<AnswerRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.inspection_id == inspection_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.answered_at);
        Ok(rows)
    }

    async fn write_section(
        &self,
        inspection_id: Uuid,
        answered_by: Uuid,
        plan: &SectionPlanner<'_>,
    ) -> Result<AppliedWrite> {
        // the rows mutex stands in for the adapter's transaction lock
        let mut rows = self.rows.lock().unwrap();
        let mut snapshot: Vec<AnswerRow> = rows
            .iter()
            .filter(|r| r.inspection_id == inspection_id)
            .cloned()
            .collect();
        snapshot.sort_by_key(|r| r.answered_at);

        let now = Utc::now();
        match plan(&snapshot)? {
            WritePlan::Merge {
                target,
                answers,
                status,
                progress,
            } => {
                let row = match target {
                    WriteTarget::Existing(id) => {
                        let row = rows
                            .iter_mut()
                            .find(|r| r.id == id)
                            .ok_or_else(|| InspectionError::NotFound(format!("answer {id}")))?;
                        row.answers = answers;
                        row.answered_by = answered_by;
                        row.answered_at = now;
                        row.updated_at = now;
                        row.clone()
                    }
                    WriteTarget::CreateNew => {
                        let row = AnswerRow {
                            id: Uuid::new_v4(),
                            inspection_id,
                            answers,
                            answered_by,
                            answered_at: now,
                            created_at: now,
                            updated_at: now,
                        };
                        rows.push(row.clone());
                        row
                    }
                };

                let mut inspections = self.inspections.rows.lock().unwrap();
                let inspection = inspections
                    .iter_mut()
                    .find(|i| i.id == inspection_id && i.deleted_at.is_none())
                    .ok_or_else(|| {
                        InspectionError::NotFound(format!("inspection {inspection_id}"))
                    })?;
                inspection.status = match status {
                    Some(explicit) => explicit,
                    None if inspection.status == InspectionStatus::Draft => {
                        InspectionStatus::InProgress
                    }
                    None => inspection.status,
                };
                inspection.progress = inspection.progress.max(progress).min(100);
                inspection.updated_by = Some(answered_by);
                Ok(AppliedWrite {
                    row,
                    collapsed: false,
                    status: inspection.status,
                    progress: inspection.progress,
                })
            }
            WritePlan::Collapse { answers } => {
                rows.retain(|r| r.inspection_id != inspection_id);
                let row = AnswerRow {
                    id: Uuid::new_v4(),
                    inspection_id,
                    answers,
                    answered_by,
                    answered_at: now,
                    created_at: now,
                    updated_at: now,
                };
                rows.push(row.clone());

                let mut inspections = self.inspections.rows.lock().unwrap();
                if let Some(i) = inspections.iter_mut().find(|i| i.id == inspection_id) {
                    i.status = InspectionStatus::Submitted;
                    i.progress = 100;
                    i.completed_at = Some(now);
                    i.updated_by = Some(answered_by);
                }
                Ok(AppliedWrite {
                    row,
                    collapsed: true,
                    status: InspectionStatus::Submitted,
                    progress: 100,
                })
            }
        }
    }

    async fn delete_for_inspection(&self, inspection_id: Uuid) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.inspection_id != inspection_id);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
struct MemInspections {
    rows: Mutex<Vec<Inspection>>,
    templates: Mutex<HashMap<Uuid, Value>>,
}

#[async_trait]
impl InspectionStore for MemInspections {
    async fn get(&self, id: Uuid) -> Result<Inspection> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id && i.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| InspectionError::NotFound(format!("inspection {id}")))
    }

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<Inspection>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.organization_id == organization_id && i.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_by_schedule_type(
        &self,
        assignee: Uuid,
        schedule_type: ScheduleType,
    ) -> Result<Vec<Inspection>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| {
                i.assigned_to == Some(assignee)
                    && i.schedule_type == schedule_type
                    && i.deleted_at.is_none()
                    && matches!(
                        i.status,
                        InspectionStatus::Draft
                            | InspectionStatus::InProgress
                            | InspectionStatus::Submitted
                    )
            })
            .cloned()
            .collect())
    }

    async fn assign(&self, id: Uuid, user_id: Uuid, updated_by: Uuid) -> Result<Inspection> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| InspectionError::NotFound(format!("inspection {id}")))?;
        row.assigned_to = Some(user_id);
        row.updated_by = Some(updated_by);
        Ok(row.clone())
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(i) = rows.iter_mut().find(|i| i.id == id) {
            i.deleted_at = Some(deleted_at);
        }
        Ok(())
    }

    async fn template_questions(&self, template_id: Uuid) -> Result<Option<Value>> {
        Ok(self.templates.lock().unwrap().get(&template_id).cloned())
    }
}

#[derive(Default)]
struct MemImages {
    rows: Mutex<Vec<QuestionImage>>,
    answers: Arc<MemAnswers>,
}

#[async_trait]
impl ImageIndex for MemImages {
    async fn insert_image(&self, image: NewQuestionImage) -> Result<QuestionImage> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter().find(|r| {
            r.answer_id == image.answer_id
                && r.field_id == image.field_id
                && r.image_order == image.image_order
        }) {
            return Err(InspectionError::ImageSlotTaken {
                field_id: image.field_id,
                image_order: image.image_order,
                existing: serde_json::to_value(existing).unwrap(),
            });
        }
        let row = QuestionImage {
            id: Uuid::new_v4(),
            answer_id: image.answer_id,
            field_id: image.field_id,
            section: image.section,
            image_order: image.image_order,
            image_url: image.image_url,
            uploaded_by: image.uploaded_by,
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn list_by_answer(&self, answer_id: Uuid) -> Result<Vec<QuestionImage>> {
        let mut rows: Vec<QuestionImage> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.answer_id == answer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.section, &a.field_id, a.image_order).cmp(&(&b.section, &b.field_id, b.image_order))
        });
        Ok(rows)
    }

    async fn list_by_inspection(&self, inspection_id: Uuid) -> Result<Vec<QuestionImage>> {
        let answer_ids: Vec<Uuid> = self
            .answers
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.inspection_id == inspection_id)
            .map(|r| r.id)
            .collect();
        let mut rows: Vec<QuestionImage> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| answer_ids.contains(&r.answer_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.section, &a.field_id, a.image_order).cmp(&(&b.section, &b.field_id, b.image_order))
        });
        Ok(rows)
    }

    async fn delete_by_inspection(&self, inspection_id: Uuid) -> Result<Vec<QuestionImage>> {
        let answer_ids: Vec<Uuid> = self
            .answers
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.inspection_id == inspection_id)
            .map(|r| r.id)
            .collect();
        let mut rows = self.rows.lock().unwrap();
        let (removed, kept): (Vec<QuestionImage>, Vec<QuestionImage>) = rows
            .drain(..)
            .partition(|r| answer_ids.contains(&r.answer_id));
        *rows = kept;
        Ok(removed)
    }

    async fn delete_image(&self, image_id: Uuid) -> Result<QuestionImage> {
        let mut rows = self.rows.lock().unwrap();
        let pos = rows
            .iter()
            .position(|r| r.id == image_id)
            .ok_or_else(|| InspectionError::NotFound(format!("image {image_id}")))?;
        Ok(rows.remove(pos))
    }
}

struct MemDirectory {
    organization: Organization,
    users: Vec<User>,
}

#[async_trait]
impl DirectoryStore for MemDirectory {
    async fn organization(&self, _id: Uuid) -> Result<Organization> {
        Ok(self.organization.clone())
    }

    async fn user(&self, id: Uuid) -> Result<User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| InspectionError::NotFound(format!("user {id}")))
    }

    async fn device(&self, id: Uuid) -> Result<Device> {
        Ok(Device {
            id,
            organization_id: self.organization.id,
            model_name: Some("SCS-60".into()),
            serial_no: "SN-0042".into(),
            location: Some("Салбар 1".into()),
        })
    }

    async fn site(&self, _id: Uuid) -> Result<Option<Site>> {
        Ok(None)
    }

    async fn contract(&self, _id: Uuid) -> Result<Option<Contract>> {
        Ok(None)
    }
}

// ── Fixture ──────────────────────────────────────────────────

struct Fixture {
    service: InspectionService,
    principal: Principal,
    inspection_id: Uuid,
    inspections: Arc<MemInspections>,
    answers: Arc<MemAnswers>,
    images: Arc<MemImages>,
}

fn fixture() -> Fixture {
    let org_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let inspection_id = Uuid::new_v4();

    let inspections = Arc::new(MemInspections::default());
    let answers = Arc::new(MemAnswers {
        rows: Mutex::new(Vec::new()),
        inspections: Arc::clone(&inspections),
    });
    let images = Arc::new(MemImages {
        rows: Mutex::new(Vec::new()),
        answers: Arc::clone(&answers),
    });
    let directory = Arc::new(MemDirectory {
        organization: Organization {
            id: org_id,
            name: "Жин хэмжүүр ХХК".into(),
            code: "JH-01".into(),
            contact_name: None,
            contact_phone: None,
            contact_email: Some("contact@example.mn".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        users: vec![User {
            id: user_id,
            organization_id: org_id,
            full_name: "A. Batbold".into(),
            email: Some("batbold@example.mn".into()),
            role: "inspector".into(),
        }],
    });

    let now = Utc::now();
    inspections.rows.lock().unwrap().push(Inspection {
        id: inspection_id,
        organization_id: org_id,
        device_id: Uuid::new_v4(),
        site_id: None,
        contract_id: None,
        template_id: None,
        kind: InspectionKind::Inspection,
        schedule_type: ScheduleType::Daily,
        status: InspectionStatus::Draft,
        progress: 0,
        title: Some("Өдөр тутмын үзлэг".into()),
        assigned_to: Some(user_id),
        created_by: user_id,
        updated_by: None,
        completed_at: None,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    });

    let service = InspectionService::new(
        Arc::clone(&inspections) as Arc<dyn InspectionStore>,
        Arc::clone(&answers) as Arc<dyn AnswerStore>,
        Arc::clone(&images) as Arc<dyn ImageIndex>,
        directory,
    );

    Fixture {
        service,
        principal: Principal {
            user_id,
            organization_id: org_id,
            full_name: "A. Batbold".into(),
            role: "inspector".into(),
        },
        inspection_id,
        inspections,
        answers,
        images,
    }
}

fn section_write(fx: &Fixture, section: &str, answers: Value) -> SectionWrite {
    SectionWrite {
        inspection_id: fx.inspection_id,
        section: section.into(),
        answers,
        data: None,
        answer_id: None,
        section_index: None,
        is_first_section: false,
        status: None,
        section_status: None,
        progress: None,
    }
}

// ── Scenarios ────────────────────────────────────────────────

#[tokio::test]
async fn sequential_six_section_inspection() {
    let fx = fixture();
    let sections = ["exterior", "indicator", "jbox", "sensor", "foundation", "cleanliness"];

    let mut last_progress = 0;
    for (i, section) in sections.iter().enumerate() {
        let mut w = section_write(
            &fx,
            section,
            json!({ "some_field": { "status": "ok", "comment": "" } }),
        );
        if i == 0 {
            w.is_first_section = true;
            w.answers = json!({
                "date": "2024-06-01",
                "inspector": "A. Batbold",
                "some_field": { "status": "ok", "comment": "" }
            });
        }
        if i + 1 == sections.len() {
            w.section_status = Some(SectionStatus::Completed);
        }
        let outcome = fx.service.write_section(&fx.principal, w).await.unwrap();

        // progress monotonicity
        assert!(outcome.progress >= last_progress);
        last_progress = outcome.progress;
    }

    // exactly one row, with metadata from the first write
    let rows = fx
        .answers
        .list_for_inspection(fx.inspection_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let agg = &rows[0].answers;
    assert_eq!(agg["metadata"]["date"], json!("2024-06-01"));
    for section in sections {
        assert!(agg.get(section).is_some(), "missing section {section}");
    }

    let inspection = fx.inspections.get(fx.inspection_id).await.unwrap();
    assert_eq!(inspection.status, InspectionStatus::Submitted);
    assert_eq!(inspection.progress, 100);
    assert!(inspection.completed_at.is_some());
    assert_eq!(last_progress, 100);
}

#[tokio::test]
async fn first_content_write_moves_draft_to_in_progress() {
    let fx = fixture();
    let mut w = section_write(&fx, "exterior", json!({"beam": {"status": "ok"}}));
    w.is_first_section = true;
    fx.service.write_section(&fx.principal, w).await.unwrap();

    let inspection = fx.inspections.get(fx.inspection_id).await.unwrap();
    assert_eq!(inspection.status, InspectionStatus::InProgress);
}

#[tokio::test]
async fn remarks_without_existing_row_is_rejected() {
    let fx = fixture();
    let w = section_write(&fx, "remarks", json!({"x": {"comment": "hi"}}));
    let err = fx.service.write_section(&fx.principal, w).await.unwrap_err();
    assert!(matches!(err, InspectionError::NoInspectionRecord(_)));
}

#[tokio::test]
async fn remarks_string_overwrite_scenario() {
    let fx = fixture();
    let mut w = section_write(&fx, "exterior", json!({"beam": {"status": "ok"}}));
    w.is_first_section = true;
    fx.service.write_section(&fx.principal, w).await.unwrap();

    let w = section_write(
        &fx,
        "remarks",
        json!({"remarks_field": {"comment": "Нэмэлт тэмдэглэл"}}),
    );
    fx.service.write_section(&fx.principal, w).await.unwrap();

    let rows = fx
        .answers
        .list_for_inspection(fx.inspection_id)
        .await
        .unwrap();
    let agg = &rows[0].answers;
    assert_eq!(agg["remarks"], json!("Нэмэлт тэмдэглэл"));
    assert!(agg["exterior"].get("remarks_field").is_none());
}

#[tokio::test]
async fn image_slot_conflict_returns_existing_row() {
    let fx = fixture();
    let mut w = section_write(&fx, "exterior", json!({"beam": {"status": "ok"}}));
    w.is_first_section = true;
    let outcome = fx.service.write_section(&fx.principal, w).await.unwrap();

    let new_image = |url: &str| NewQuestionImage {
        answer_id: outcome.answer_id,
        field_id: "beam".into(),
        section: "exterior".into(),
        image_order: 1,
        image_url: url.into(),
        uploaded_by: fx.principal.user_id,
    };

    let first = fx
        .service
        .register_image(&fx.principal, fx.inspection_id, new_image("http://x/1.jpg"))
        .await
        .unwrap();

    let err = fx
        .service
        .register_image(&fx.principal, fx.inspection_id, new_image("http://x/2.jpg"))
        .await
        .unwrap_err();
    match err {
        InspectionError::ImageSlotTaken { field_id, image_order, existing } => {
            assert_eq!(field_id, "beam");
            assert_eq!(image_order, 1);
            assert_eq!(existing["id"], json!(first.id.to_string()));
        }
        other => panic!("expected ImageSlotTaken, got {other:?}"),
    }
}

#[tokio::test]
async fn image_for_foreign_answer_is_integrity_error() {
    let fx = fixture();
    let mut w = section_write(&fx, "exterior", json!({"beam": {"status": "ok"}}));
    w.is_first_section = true;
    fx.service.write_section(&fx.principal, w).await.unwrap();

    let err = fx
        .service
        .register_image(
            &fx.principal,
            fx.inspection_id,
            NewQuestionImage {
                answer_id: Uuid::new_v4(),
                field_id: "beam".into(),
                section: "exterior".into(),
                image_order: 1,
                image_url: "http://x/1.jpg".into(),
                uploaded_by: fx.principal.user_id,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InspectionError::NotFound(_)));
}

#[tokio::test]
async fn cascade_delete_clears_answers_and_images() {
    let fx = fixture();
    let mut w = section_write(&fx, "exterior", json!({"beam": {"status": "ok"}}));
    w.is_first_section = true;
    let outcome = fx.service.write_section(&fx.principal, w).await.unwrap();

    fx.service
        .register_image(
            &fx.principal,
            fx.inspection_id,
            NewQuestionImage {
                answer_id: outcome.answer_id,
                field_id: "beam".into(),
                section: "exterior".into(),
                image_order: 1,
                image_url: "http://x/1.jpg".into(),
                uploaded_by: fx.principal.user_id,
            },
        )
        .await
        .unwrap();

    let removed = fx
        .service
        .delete_inspection(&fx.principal, fx.inspection_id)
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);

    assert!(matches!(
        fx.service.get_inspection(&fx.principal, fx.inspection_id).await,
        Err(InspectionError::NotFound(_))
    ));
    assert!(fx.images.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn foreign_inspector_is_forbidden() {
    let fx = fixture();
    let stranger = Principal {
        user_id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        full_name: "X".into(),
        role: "inspector".into(),
    };
    let w = SectionWrite {
        inspection_id: fx.inspection_id,
        section: "exterior".into(),
        answers: json!({}),
        data: None,
        answer_id: None,
        section_index: None,
        is_first_section: false,
        status: None,
        section_status: None,
        progress: None,
    };
    let err = fx.service.write_section(&stranger, w).await.unwrap_err();
    assert!(matches!(err, InspectionError::Forbidden(_)));
}

#[tokio::test]
async fn signature_write_requires_data_url() {
    let fx = fixture();
    let err = fx
        .service
        .record_signature(&fx.principal, fx.inspection_id, "inspector", "not-a-data-url", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InspectionError::InvalidInput(_)));
}
