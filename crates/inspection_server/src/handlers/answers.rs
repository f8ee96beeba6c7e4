//! Section-answer handlers — the aggregation write path.
//!
//! POST /inspections/section-answers       — merge one section write
//! POST /inspections/:id/signature-image   — persist a signature into the aggregate

use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use inspection_core::engine::SectionWrite;
use inspection_core::principal::Principal;
use inspection_core::types::SectionStatus;

use crate::error::AppError;
use crate::handlers::success;
use crate::notifier;
use crate::state::SharedState;

/// Request body for `POST /inspections/section-answers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAnswersRequest {
    pub inspection_id: Uuid,
    pub section: String,
    #[serde(default)]
    pub answers: Value,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub answer_id: Option<Uuid>,
    #[serde(default)]
    pub section_index: Option<usize>,
    #[serde(default)]
    pub is_first_section: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub section_status: Option<String>,
    #[serde(default)]
    pub progress: Option<i16>,
}

pub async fn write_section(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Json(body): Json<SectionAnswersRequest>,
) -> Result<Json<Value>, AppError> {
    let section_status = match body.section_status.as_deref() {
        None => None,
        Some(raw) => Some(SectionStatus::from_str(raw).ok_or_else(|| {
            inspection_core::error::InspectionError::InvalidInput(format!(
                "unknown sectionStatus: {raw}"
            ))
        })?),
    };

    let write = SectionWrite {
        inspection_id: body.inspection_id,
        section: body.section,
        answers: body.answers,
        data: body.data,
        answer_id: body.answer_id,
        section_index: body.section_index,
        is_first_section: body.is_first_section,
        status: body.status,
        section_status,
        progress: body.progress,
    };

    let outcome = state.service.write_section(&principal, write).await?;

    if outcome.navigation.is_completion {
        notifier::spawn_completion_notification(
            state.clone(),
            outcome.inspection_id,
            outcome.answer_id,
        );
    }

    Ok(Json(success(
        "Амжилттай хадгаллаа",
        serde_json::to_value(&outcome)
            .map_err(|e| inspection_core::error::InspectionError::Internal(e.into()))?,
    )))
}

/// Request body for `POST /inspections/:id/signature-image`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub signature_image: String,
    pub signature_type: String,
    #[serde(default)]
    pub answer_id: Option<Uuid>,
}

pub async fn signature_image(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(inspection_id): Path<Uuid>,
    Json(body): Json<SignatureRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .service
        .record_signature(
            &principal,
            inspection_id,
            &body.signature_type,
            &body.signature_image,
            body.answer_id,
        )
        .await?;

    if outcome.navigation.is_completion {
        notifier::spawn_completion_notification(
            state.clone(),
            outcome.inspection_id,
            outcome.answer_id,
        );
    }

    Ok(Json(success(
        "Гарын үсэг хадгалагдлаа",
        serde_json::to_value(&outcome)
            .map_err(|e| inspection_core::error::InspectionError::Internal(e.into()))?,
    )))
}
