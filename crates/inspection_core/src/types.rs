//! Domain value types — pure, no DB dependencies.

// Several enums use `from_str() -> Option<Self>` instead of `FromStr`
// because they return None for unknown values rather than an error.
#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── Enums ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Draft,
    InProgress,
    Submitted,
    Approved,
    Rejected,
    Canceled,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InProgress => "IN_PROGRESS",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Parse a writer-supplied status. Case-insensitive; the mobile client
    /// sends lower-case values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "IN_PROGRESS" => Some(Self::InProgress),
            "SUBMITTED" => Some(Self::Submitted),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Daily,
    Scheduled,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Scheduled => "SCHEDULED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Some(Self::Daily),
            "SCHEDULED" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionKind {
    Inspection,
    Installation,
    Maintenance,
    Verification,
}

impl InspectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inspection => "INSPECTION",
            Self::Installation => "INSTALLATION",
            Self::Maintenance => "MAINTENANCE",
            Self::Verification => "VERIFICATION",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INSPECTION" => Some(Self::Inspection),
            "INSTALLATION" => Some(Self::Installation),
            "MAINTENANCE" => Some(Self::Maintenance),
            "VERIFICATION" => Some(Self::Verification),
            _ => None,
        }
    }
}

/// Per-section completion state reported by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    InProgress,
    Completed,
    Skipped,
}

impl SectionStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }
}

// ── Entities ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimum site shape the core consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub contract_no: String,
    pub site_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub model_name: Option<String>,
    pub serial_no: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub device_id: Uuid,
    pub site_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub kind: InspectionKind,
    pub schedule_type: ScheduleType,
    pub status: InspectionStatus,
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

/// One persisted answer row. The `answers` document is the aggregate; during
/// intermediate writes an inspection may own several rows, collapsed to one
/// at completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub answers: Value,
    pub answered_by: Uuid,
    pub answered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One uploaded question image. `(answer_id, field_id, image_order)` is
/// unique — one image per slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionImage {
    pub id: Uuid,
    pub answer_id: Uuid,
    pub field_id: String,
    pub section: String,
    pub image_order: i32,
    pub image_url: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(
            InspectionStatus::from_str("submitted"),
            Some(InspectionStatus::Submitted)
        );
        assert_eq!(
            InspectionStatus::from_str("In_Progress"),
            Some(InspectionStatus::InProgress)
        );
        assert_eq!(InspectionStatus::from_str("bogus"), None);
    }

    #[test]
    fn status_serde_uses_screaming_snake() {
        let j = serde_json::to_string(&InspectionStatus::InProgress).unwrap();
        assert_eq!(j, "\"IN_PROGRESS\"");
    }
}
