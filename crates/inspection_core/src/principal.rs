use uuid::Uuid;

use crate::error::InspectionError;
use crate::types::Inspection;

/// Authenticated caller identity, built from validated JWT claims at the
/// server boundary. Core logic never reads raw tokens.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub role: String,
}

impl Principal {
    pub fn from_jwt_claims(claims: &JwtClaims) -> Result<Self, InspectionError> {
        let user_id = claims
            .sub
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| InspectionError::Unauthenticated("missing or malformed sub claim".into()))?;
        let organization_id = claims
            .org
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| InspectionError::Unauthenticated("missing or malformed org claim".into()))?;
        Ok(Self {
            user_id,
            organization_id,
            full_name: claims.name.clone().unwrap_or_default(),
            role: claims.role.clone().unwrap_or_else(|| "inspector".into()),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// A non-admin caller may touch an inspection iff it belongs to their
    /// organization, is assigned to them, or was created by them.
    pub fn can_access(&self, inspection: &Inspection) -> bool {
        self.is_admin()
            || inspection.organization_id == self.organization_id
            || inspection.assigned_to == Some(self.user_id)
            || inspection.created_by == self.user_id
    }

    pub fn require_access(&self, inspection: &Inspection) -> Result<(), InspectionError> {
        if self.can_access(inspection) {
            Ok(())
        } else {
            Err(InspectionError::Forbidden(format!(
                "user {} may not access inspection {}",
                self.user_id, inspection.id
            )))
        }
    }
}

/// JWT claims shape expected from the identity provider.
/// Deserialised by the server JWT middleware.
#[derive(Debug, serde::Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub org: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}
