//! Question-image handlers — both upload transports plus the read surface.
//!
//! POST   /inspections/:id/question-images          — base64 payloads
//! POST   /inspections/:id/upload-images            — multipart parts
//! GET    /inspections/:id/question-images          — list with data
//! GET    /inspections/:id/image-gallery            — grouped by section
//! DELETE /inspections/:id/question-images/:imageId — free a slot
//!
//! Both transports normalize to raw bytes + mime + order before hitting the
//! store, so the one-image-per-slot contract is transport-independent. The
//! index row is written before the file: a slot conflict never leaves bytes
//! on disk.

use axum::extract::{Multipart, Path, Query};
use axum::{Extension, Json};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use inspection_core::error::InspectionError;
use inspection_core::ports::NewQuestionImage;
use inspection_core::principal::Principal;
use inspection_core::types::QuestionImage;

use crate::error::AppError;
use crate::handlers::success;
use crate::state::SharedState;
use crate::storage::{FileStore, MAX_PARTS_PER_REQUEST};

// ── Upload (base64 transport) ────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionImagesRequest {
    pub field_id: String,
    pub section: String,
    pub answer_id: Uuid,
    pub images: Vec<IncomingImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingImage {
    pub base64: String,
    pub mime_type: String,
    pub order: i32,
}

pub async fn upload_base64(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(inspection_id): Path<Uuid>,
    Json(body): Json<QuestionImagesRequest>,
) -> Result<Json<Value>, AppError> {
    if body.images.is_empty() {
        return Err(InspectionError::InvalidInput("images is empty".into()).into());
    }
    if body.images.len() > MAX_PARTS_PER_REQUEST {
        return Err(InspectionError::PayloadTooLarge(format!(
            "at most {MAX_PARTS_PER_REQUEST} images per request"
        ))
        .into());
    }

    let mut staged = Vec::with_capacity(body.images.len());
    for image in &body.images {
        let bytes = decode_base64_payload(&image.base64)?;
        staged.push((image.mime_type.clone(), image.order, bytes));
    }

    respond_per_image(
        store_all(
            &state,
            &principal,
            inspection_id,
            body.answer_id,
            &body.field_id,
            &body.section,
            staged,
        )
        .await,
    )
}

/// Accepts both bare base64 and full data-urls.
fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, InspectionError> {
    let encoded = match payload.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => payload,
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| InspectionError::InvalidInput(format!("bad base64 payload: {e}")))
}

// ── Upload (multipart transport) ─────────────────────────────

pub async fn upload_multipart(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(inspection_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut answer_id: Option<Uuid> = None;
    let mut field_id: Option<String> = None;
    let mut section: Option<String> = None;
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InspectionError::InvalidInput(format!("bad multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "answerId" => {
                let text = field.text().await.map_err(bad_part)?;
                answer_id = Some(
                    Uuid::parse_str(&text)
                        .map_err(|_| InspectionError::InvalidInput("bad answerId".into()))?,
                );
            }
            "fieldId" => field_id = Some(field.text().await.map_err(bad_part)?),
            "section" => section = Some(field.text().await.map_err(bad_part)?),
            "images" | "images[]" => {
                if parts.len() >= MAX_PARTS_PER_REQUEST {
                    return Err(InspectionError::PayloadTooLarge(format!(
                        "at most {MAX_PARTS_PER_REQUEST} images per request"
                    ))
                    .into());
                }
                let mime = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_part)?;
                parts.push((mime, bytes.to_vec()));
            }
            other => {
                tracing::debug!(part = other, "ignoring unknown multipart field");
            }
        }
    }

    let answer_id =
        answer_id.ok_or_else(|| InspectionError::InvalidInput("answerId is required".into()))?;
    let field_id =
        field_id.ok_or_else(|| InspectionError::InvalidInput("fieldId is required".into()))?;
    let section =
        section.ok_or_else(|| InspectionError::InvalidInput("section is required".into()))?;
    if parts.is_empty() {
        return Err(InspectionError::InvalidInput("no image parts".into()).into());
    }

    // multipart carries no explicit slot numbers: parts take 1-based order
    let staged = parts
        .into_iter()
        .enumerate()
        .map(|(i, (mime, bytes))| (mime, (i + 1) as i32, bytes))
        .collect();

    respond_per_image(
        store_all(
            &state,
            &principal,
            inspection_id,
            answer_id,
            &field_id,
            &section,
            staged,
        )
        .await,
    )
}

fn bad_part(e: axum::extract::multipart::MultipartError) -> InspectionError {
    InspectionError::InvalidInput(format!("bad multipart part: {e}"))
}

// ── Shared storage path ──────────────────────────────────────

type PerImageOutcome = Result<QuestionImage, (i32, InspectionError)>;

async fn store_all(
    state: &SharedState,
    principal: &Principal,
    inspection_id: Uuid,
    answer_id: Uuid,
    field_id: &str,
    section: &str,
    staged: Vec<(String, i32, Vec<u8>)>,
) -> Vec<PerImageOutcome> {
    let mut outcomes = Vec::with_capacity(staged.len());
    for (mime, order, bytes) in staged {
        let outcome = store_one(
            state,
            principal,
            inspection_id,
            answer_id,
            field_id,
            section,
            order,
            &mime,
            &bytes,
        )
        .await
        .map_err(|e| (order, e));
        outcomes.push(outcome);
    }
    outcomes
}

#[allow(clippy::too_many_arguments)]
async fn store_one(
    state: &SharedState,
    principal: &Principal,
    inspection_id: Uuid,
    answer_id: Uuid,
    field_id: &str,
    section: &str,
    order: i32,
    mime: &str,
    bytes: &[u8],
) -> Result<QuestionImage, InspectionError> {
    let ext = FileStore::extension_for_mime(mime)?;
    FileStore::check_size(bytes)?;

    let file_name = FileStore::image_file_name(inspection_id, answer_id, field_id, order, ext);
    let record = state
        .service
        .register_image(
            principal,
            inspection_id,
            NewQuestionImage {
                answer_id,
                field_id: field_id.to_string(),
                section: section.to_string(),
                image_order: order,
                image_url: state.storage.public_url(&file_name),
                uploaded_by: principal.user_id,
            },
        )
        .await?;

    if let Err(e) = state.storage.save(&file_name, bytes).await {
        // index row without bytes is worse than a clean failure
        if let Err(cleanup) = state
            .service
            .delete_image(principal, inspection_id, record.id)
            .await
        {
            tracing::error!(image_id = %record.id, error = %cleanup, "orphan image row left behind");
        }
        return Err(e);
    }
    Ok(record)
}

fn respond_per_image(outcomes: Vec<PerImageOutcome>) -> Result<Json<Value>, AppError> {
    // a lone failure keeps its native status code (S2: second upload → 409)
    if outcomes.len() == 1 {
        return match outcomes.into_iter().next().expect("one outcome") {
            Ok(record) => Ok(Json(success(
                "Зураг хадгалагдлаа",
                json!({ "uploaded": [record], "failed": [] }),
            ))),
            Err((_, e)) => Err(e.into()),
        };
    }

    let mut uploaded = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(record) => uploaded.push(serde_json::to_value(record).unwrap_or_default()),
            Err((order, e)) => {
                let mut entry = json!({ "order": order, "error": e.code() });
                if let InspectionError::ImageSlotTaken { existing, .. } = &e {
                    entry["existingImage"] = existing.clone();
                }
                failed.push(entry);
            }
        }
    }

    if uploaded.is_empty() {
        return Err(InspectionError::InvalidInput(format!(
            "all {} uploads failed",
            failed.len()
        ))
        .into());
    }
    Ok(Json(success(
        "Зураг хадгалагдлаа",
        json!({ "uploaded": uploaded, "failed": failed }),
    )))
}

// ── Read surface ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListQuery {
    pub field_id: Option<String>,
    pub section: Option<String>,
}

pub async fn list_question_images(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(inspection_id): Path<Uuid>,
    Query(query): Query<ImageListQuery>,
) -> Result<Json<Value>, AppError> {
    let images = state
        .service
        .question_images(
            &principal,
            inspection_id,
            query.field_id.as_deref(),
            query.section.as_deref(),
        )
        .await?;

    let mut rows = Vec::with_capacity(images.len());
    for image in images {
        rows.push(decorate_with_data(&state, image).await);
    }
    Ok(Json(success("OK", Value::Array(rows))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQuery {
    #[serde(default)]
    pub include_data: bool,
}

pub async fn image_gallery(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(inspection_id): Path<Uuid>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<Value>, AppError> {
    let images = state
        .service
        .question_images(&principal, inspection_id, None, None)
        .await?;

    let mut grouped: Map<String, Value> = Map::new();
    for image in images {
        let section = image.section.clone();
        let row = if query.include_data {
            decorate_with_data(&state, image).await
        } else {
            serde_json::to_value(image).unwrap_or_default()
        };
        grouped
            .entry(section)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .expect("gallery groups are arrays")
            .push(row);
    }
    Ok(Json(success("OK", Value::Object(grouped))))
}

async fn decorate_with_data(state: &SharedState, image: QuestionImage) -> Value {
    let data = state
        .storage
        .load_by_url(&image.image_url)
        .await
        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes));
    let mut row = serde_json::to_value(&image).unwrap_or_default();
    row["imageData"] = match data {
        Some(encoded) => Value::String(encoded),
        None => Value::Null,
    };
    row
}

pub async fn delete_question_image(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path((inspection_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let removed = state
        .service
        .delete_image(&principal, inspection_id, image_id)
        .await?;
    state.storage.delete_by_url(&removed.image_url).await;
    Ok(Json(success(
        "Зураг устгагдлаа",
        serde_json::to_value(removed)
            .map_err(|e| InspectionError::Internal(e.into()))?,
    )))
}
