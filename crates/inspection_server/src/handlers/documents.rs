//! Document handlers.
//!
//! GET /documents/answers/:answerId/docx — render and stream the report.

use axum::extract::Path;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use uuid::Uuid;

use inspection_core::principal::Principal;

use crate::error::AppError;
use crate::notifier;
use crate::state::SharedState;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub async fn answer_docx(
    Extension(principal): Extension<Principal>,
    Extension(state): Extension<SharedState>,
    Path(answer_id): Path<Uuid>,
) -> Result<Response, AppError> {
    // access is checked before any report work: composing reads every
    // image off disk and must not be forceable by foreign callers
    state
        .service
        .inspection_for_answer(&principal, answer_id)
        .await?;

    let (buffer, bundle) = notifier::render_report(&state, answer_id).await?;

    let file_name = format!("inspection_{}.docx", bundle.inspection.id);
    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        buffer,
    )
        .into_response())
}
