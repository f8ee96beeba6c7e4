//! Inspection surface handlers.
//!
//! GET    /inspections                           — org-scoped list
//! GET    /inspections/:id                       — single read
//! GET    /inspections/by-schedule-type/:type    — inspector-client list
//! PUT    /inspections/:id/assign                — reassign + notice
//! DELETE /inspections/:id                       — cascade delete

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use inspection_core::error::InspectionError;
use inspection_core::principal::Principal;
use inspection_core::types::ScheduleType;

use crate::error::AppError;
use crate::handlers::{success, success_paginated};
use crate::notifier;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.clamp(1, 100);
    let page = query.page.max(1);
    let inspections = state
        .service
        .list_inspections(&principal, limit, (page - 1) * limit)
        .await?;
    Ok(Json(success_paginated(
        "OK",
        serde_json::to_value(inspections).map_err(|e| InspectionError::Internal(e.into()))?,
        page,
        limit,
    )))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let inspection = state.service.get_inspection(&principal, id).await?;
    Ok(Json(success(
        "OK",
        serde_json::to_value(inspection).map_err(|e| InspectionError::Internal(e.into()))?,
    )))
}

pub async fn by_schedule_type(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(schedule_type): Path<String>,
) -> Result<Json<Value>, AppError> {
    let schedule_type = ScheduleType::from_str(&schedule_type).ok_or_else(|| {
        InspectionError::InvalidInput(format!("unknown schedule type: {schedule_type}"))
    })?;
    let inspections = state
        .service
        .list_by_schedule_type(&principal, schedule_type)
        .await?;
    Ok(Json(success(
        "OK",
        serde_json::to_value(inspections).map_err(|e| InspectionError::Internal(e.into()))?,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub user_id: Uuid,
}

pub async fn assign(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Value>, AppError> {
    let (inspection, assignee) = state.service.assign(&principal, id, body.user_id).await?;

    notifier::spawn_assignment_notification(state.clone(), inspection.clone(), assignee);

    Ok(Json(success(
        "Үзлэг оноогдлоо",
        serde_json::to_value(inspection).map_err(|e| InspectionError::Internal(e.into()))?,
    )))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let removed_images = state.service.delete_inspection(&principal, id).await?;
    for image in &removed_images {
        state.storage.delete_by_url(&image.image_url).await;
    }
    Ok(Json(success(
        "Үзлэг устгагдлаа",
        json!({ "deletedImages": removed_images.len() }),
    )))
}
