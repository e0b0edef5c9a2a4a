//! Item image repository implementation.
//!
//! Gallery invariants live here: display orders stay dense and zero-based,
//! and the image at index 0 is always the primary.

use async_trait::async_trait;
use futures::future::try_join_all;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kiez_core::{
    CreateImageRequest, Error, ImageProcessingUpdate, ImageRepository, ItemImage, Result,
};

/// PostgreSQL implementation of ImageRepository.
pub struct PgImageRepository {
    pool: Pool<Postgres>,
}

const IMAGE_COLUMNS: &str = "id, item_id, image_url, thumbnail_url, display_order, is_primary, \
     is_processed, processing_metadata, created_at";

impl PgImageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_image_row(row: sqlx::postgres::PgRow) -> ItemImage {
        ItemImage {
            id: row.get("id"),
            item_id: row.get("item_id"),
            image_url: row.get("image_url"),
            thumbnail_url: row.get("thumbnail_url"),
            display_order: row.get("display_order"),
            is_primary: row.get("is_primary"),
            is_processed: row.get("is_processed"),
            processing_metadata: row.get("processing_metadata"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn insert(&self, req: CreateImageRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO item_images (id, item_id, image_url, display_order, is_primary)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(req.item_id)
        .bind(&req.image_url)
        .bind(req.display_order)
        .bind(req.is_primary)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn list_for_item(&self, item_id: Uuid) -> Result<Vec<ItemImage>> {
        let rows = sqlx::query(&format!(
            "SELECT {IMAGE_COLUMNS} FROM item_images
             WHERE item_id = $1
             ORDER BY display_order ASC"
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_image_row).collect())
    }

    async fn delete_and_renumber(&self, image_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let item_id: Option<Uuid> =
            sqlx::query("DELETE FROM item_images WHERE id = $1 RETURNING item_id")
                .bind(image_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?
                .map(|row| row.get("item_id"));

        let item_id = item_id.ok_or_else(|| Error::NotFound(format!("image {}", image_id)))?;

        // Close the gap and repaint the primary flag in one statement:
        // survivors are renumbered by their current order, and whoever
        // lands on 0 becomes primary.
        sqlx::query(
            "WITH renumbered AS (
                 SELECT id, ROW_NUMBER() OVER (ORDER BY display_order ASC) - 1 AS new_order
                 FROM item_images
                 WHERE item_id = $1
             )
             UPDATE item_images i
             SET display_order = r.new_order,
                 is_primary = (r.new_order = 0)
             FROM renumbered r
             WHERE i.id = r.id",
        )
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "db",
            component = "images",
            op = "delete_and_renumber",
            image_id = %image_id,
            item_id = %item_id,
            "Image deleted, gallery renumbered"
        );
        Ok(())
    }

    async fn reorder(&self, item_id: Uuid, ordered_ids: &[Uuid]) -> Result<()> {
        let current = self.list_for_item(item_id).await?;
        let current_ids: Vec<Uuid> = current.iter().map(|i| i.id).collect();
        kiez_core::validate_reorder(&current_ids, ordered_ids)?;

        // Per-image updates issued concurrently; display_order carries no
        // uniqueness constraint, so intermediate states are harmless and
        // the final state is the full permutation.
        let updates = ordered_ids.iter().enumerate().map(|(index, id)| {
            sqlx::query(
                "UPDATE item_images SET display_order = $2, is_primary = $3
                 WHERE id = $1 AND item_id = $4",
            )
            .bind(*id)
            .bind(index as i32)
            .bind(index == 0)
            .bind(item_id)
            .execute(&self.pool)
        });
        try_join_all(updates).await.map_err(Error::Database)?;

        Ok(())
    }

    async fn mark_processed(&self, image_id: Uuid, update: ImageProcessingUpdate) -> Result<()> {
        let result = sqlx::query(
            "UPDATE item_images
             SET is_processed = TRUE, thumbnail_url = $2, processing_metadata = $3
             WHERE id = $1",
        )
        .bind(image_id)
        .bind(&update.thumbnail_url)
        .bind(&update.processing_metadata)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("image {}", image_id)));
        }
        Ok(())
    }

    async fn repoint(&self, from_item: Uuid, to_item: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE item_images SET item_id = $2 WHERE item_id = $1")
            .bind(from_item)
            .bind(to_item)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}
