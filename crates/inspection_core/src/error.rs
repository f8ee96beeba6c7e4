use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("image slot taken: field {field_id} order {image_order}")]
    ImageSlotTaken {
        field_id: String,
        image_order: i32,
        /// The row already occupying the slot, serialized for the 409 payload.
        existing: Value,
    },

    #[error("no answer record exists for inspection {0}")]
    NoInspectionRecord(String),

    #[error("unsupported media type: {0}")]
    InvalidMedia(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("report template missing: {0}")]
    TemplateMissing(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl InspectionError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
            Self::ImageSlotTaken { .. } => 409,
            Self::NoInspectionRecord(_) => 404,
            Self::InvalidMedia(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::TemplateMissing(_) => 404,
            Self::StorageUnavailable(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for the failure envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidInput(_) => "VALIDATION_ERROR",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ImageSlotTaken { .. } => "IMAGE_ALREADY_EXISTS",
            Self::NoInspectionRecord(_) => "NO_INSPECTION_RECORD",
            Self::InvalidMedia(_) => "INVALID_MEDIA",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::TemplateMissing(_) => "TEMPLATE_MISSING",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
