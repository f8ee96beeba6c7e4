//! Postgres-backed image metadata index.
//!
//! The `(answer_id, field_id, image_order)` unique constraint is the sole
//! enforcer of slot uniqueness; no in-process lock. A violation at commit is
//! translated to `ImageSlotTaken` carrying the occupying row.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use inspection_core::error::InspectionError;
use inspection_core::ports::{ImageIndex, NewQuestionImage, Result};
use inspection_core::types::QuestionImage;

use crate::rows::PgImageRow;

const IMAGE_COLUMNS: &str =
    "id, answer_id, field_id, section, image_order, image_url, uploaded_by, created_at";

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgImageIndex {
    pool: PgPool,
}

impl PgImageIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_slot(
        &self,
        answer_id: Uuid,
        field_id: &str,
        image_order: i32,
    ) -> Result<Option<QuestionImage>> {
        let row = sqlx::query_as::<_, PgImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM inspection_question_images
             WHERE answer_id = $1 AND field_id = $2 AND image_order = $3"
        ))
        .bind(answer_id)
        .bind(field_id)
        .bind(image_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(QuestionImage::from))
    }
}

#[async_trait]
impl ImageIndex for PgImageIndex {
    async fn insert_image(&self, image: NewQuestionImage) -> Result<QuestionImage> {
        let inserted = sqlx::query_as::<_, PgImageRow>(&format!(
            "INSERT INTO inspection_question_images
                 (answer_id, field_id, section, image_order, image_url, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(image.answer_id)
        .bind(&image.field_id)
        .bind(&image.section)
        .bind(image.image_order)
        .bind(&image.image_url)
        .bind(image.uploaded_by)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                let existing = self
                    .find_slot(image.answer_id, &image.field_id, image.image_order)
                    .await?
                    .map(|r| serde_json::to_value(&r).unwrap_or_default())
                    .unwrap_or_default();
                Err(InspectionError::ImageSlotTaken {
                    field_id: image.field_id,
                    image_order: image.image_order,
                    existing,
                })
            }
            Err(e) => Err(InspectionError::Internal(anyhow!(e))),
        }
    }

    async fn list_by_answer(&self, answer_id: Uuid) -> Result<Vec<QuestionImage>> {
        let rows = sqlx::query_as::<_, PgImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM inspection_question_images
             WHERE answer_id = $1
             ORDER BY section, field_id, image_order"
        ))
        .bind(answer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(QuestionImage::from).collect())
    }

    async fn list_by_inspection(&self, inspection_id: Uuid) -> Result<Vec<QuestionImage>> {
        let rows = sqlx::query_as::<_, PgImageRow>(&format!(
            "SELECT i.{} FROM inspection_question_images i
             JOIN inspection_answers a ON a.id = i.answer_id
             WHERE a.inspection_id = $1
             ORDER BY i.section, i.field_id, i.image_order",
            IMAGE_COLUMNS.replace(", ", ", i.")
        ))
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(QuestionImage::from).collect())
    }

    async fn delete_by_inspection(&self, inspection_id: Uuid) -> Result<Vec<QuestionImage>> {
        let rows = sqlx::query_as::<_, PgImageRow>(&format!(
            "DELETE FROM inspection_question_images i
             USING inspection_answers a
             WHERE a.id = i.answer_id AND a.inspection_id = $1
             RETURNING i.{}",
            IMAGE_COLUMNS.replace(", ", ", i.")
        ))
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(QuestionImage::from).collect())
    }

    async fn delete_image(&self, image_id: Uuid) -> Result<QuestionImage> {
        let row = sqlx::query_as::<_, PgImageRow>(&format!(
            "DELETE FROM inspection_question_images WHERE id = $1 RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(QuestionImage::from)
            .ok_or_else(|| InspectionError::NotFound(format!("image {image_id}")))
    }
}
