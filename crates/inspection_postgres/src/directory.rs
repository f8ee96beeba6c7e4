//! Read-only lookups into the administrative tables the core consumes.
//! CRUD for these entities lives in the admin surface, outside this service.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use inspection_core::error::InspectionError;
use inspection_core::ports::{DirectoryStore, Result};
use inspection_core::types::{Contract, Device, Organization, Site, User};

use crate::rows::PgOrganizationRow;

pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn organization(&self, id: Uuid) -> Result<Organization> {
        let row = sqlx::query_as::<_, PgOrganizationRow>(
            "SELECT id, name, code, contact_name, contact_phone, contact_email,
                    created_at, updated_at
             FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(Organization::from)
            .ok_or_else(|| InspectionError::NotFound(format!("organization {id}")))
    }

    async fn user(&self, id: Uuid) -> Result<User> {
        let row: Option<(Uuid, Uuid, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, organization_id, full_name, email, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(|(id, organization_id, full_name, email, role)| User {
            id,
            organization_id,
            full_name,
            email,
            role,
        })
        .ok_or_else(|| InspectionError::NotFound(format!("user {id}")))
    }

    async fn device(&self, id: Uuid) -> Result<Device> {
        let row: Option<(Uuid, Uuid, Option<String>, String, Option<String>)> = sqlx::query_as(
            "SELECT d.id, d.organization_id, m.name, d.serial_no, d.location
             FROM devices d
             LEFT JOIN device_models m ON m.id = d.model_id
             WHERE d.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(|(id, organization_id, model_name, serial_no, location)| Device {
            id,
            organization_id,
            model_name,
            serial_no,
            location,
        })
        .ok_or_else(|| InspectionError::NotFound(format!("device {id}")))
    }

    async fn site(&self, id: Uuid) -> Result<Option<Site>> {
        let row: Option<(Uuid, Uuid, String, Option<String>)> = sqlx::query_as(
            "SELECT id, organization_id, name, address FROM sites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|(id, organization_id, name, address)| Site {
            id,
            organization_id,
            name,
            address,
        }))
    }

    async fn contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let row: Option<(Uuid, Uuid, String, Option<Uuid>)> = sqlx::query_as(
            "SELECT id, organization_id, contract_no, site_id FROM contracts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|(id, organization_id, contract_no, site_id)| Contract {
            id,
            organization_id,
            contract_no,
            site_id,
        }))
    }
}
