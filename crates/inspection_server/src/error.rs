//! Error handling for the axum server.
//!
//! Maps `InspectionError` to HTTP status codes and the JSON failure
//! envelope `{ error, message, details? }`. The `error` code stays English
//! for programmatic handling; `message` is the localized text shown to the
//! inspector.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inspection_core::error::InspectionError;
use serde_json::json;

/// Wrapper to convert `InspectionError` into an axum response.
pub struct AppError(pub InspectionError);

impl From<InspectionError> for AppError {
    fn from(e: InspectionError) -> Self {
        Self(e)
    }
}

impl From<inspection_report::ReportError> for AppError {
    fn from(e: inspection_report::ReportError) -> Self {
        Self(e.into())
    }
}

fn user_message(e: &InspectionError) -> &'static str {
    match e {
        InspectionError::NotFound(_) => "Бичлэг олдсонгүй",
        InspectionError::InvalidInput(_) => "Хүсэлтийн өгөгдөл буруу байна",
        InspectionError::Unauthenticated(_) => "Нэвтрэх шаардлагатай",
        InspectionError::Forbidden(_) => "Хандах эрх байхгүй",
        InspectionError::ImageSlotTaken { .. } => "Энэ байрлалд зураг аль хэдийн байна",
        InspectionError::NoInspectionRecord(_) => "Үзлэгийн бичлэг олдсонгүй",
        InspectionError::InvalidMedia(_) => "Зургийн төрөл дэмжигдэхгүй",
        InspectionError::PayloadTooLarge(_) => "Файлын хэмжээ хэтэрсэн байна",
        InspectionError::TemplateMissing(_) => "Тайлангийн загвар олдсонгүй",
        InspectionError::StorageUnavailable(_) => "Файлын сан ашиглах боломжгүй байна",
        InspectionError::Internal(_) => "Системийн алдаа гарлаа",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = json!({
            "error": self.0.code(),
            "message": user_message(&self.0),
        });
        if let InspectionError::ImageSlotTaken {
            field_id,
            image_order,
            existing,
        } = &self.0
        {
            body["details"] = json!({
                "fieldId": field_id,
                "order": image_order,
                "existingImage": existing,
            });
        }
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(body)).into_response()
    }
}
