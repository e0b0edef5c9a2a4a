//! Item repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kiez_core::defaults::DRAFT_TITLE;
use kiez_core::{
    CreateItemRequest, Error, Item, ItemCategory, ItemCondition, ItemFilter, ItemRepository,
    ItemStatus, ListingType, RentalPeriod, Result, UpdateItemRequest,
};

/// PostgreSQL implementation of ItemRepository.
pub struct PgItemRepository {
    pool: Pool<Postgres>,
}

const ITEM_COLUMNS: &str = "id, user_id, title, description, category::text, condition::text, \
     listing_type::text, sale_price, rental_price, rental_period::text, status::text, \
     created_at, updated_at";

impl PgItemRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse an item row into an Item struct. Enum labels fall back to
    /// their defaults when the database holds a label this build does not
    /// know.
    fn parse_item_row(row: sqlx::postgres::PgRow) -> Item {
        let category: String = row.get("category");
        let condition: String = row.get("condition");
        let listing_type: String = row.get("listing_type");
        let status: String = row.get("status");
        let rental_period: Option<String> = row.get("rental_period");

        Item {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            description: row.get("description"),
            category: category.parse().unwrap_or(ItemCategory::Other),
            condition: condition.parse().unwrap_or_default(),
            listing_type: listing_type.parse().unwrap_or_default(),
            sale_price: row.get("sale_price"),
            rental_price: row.get("rental_price"),
            rental_period: rental_period.and_then(|p| p.parse::<RentalPeriod>().ok()),
            status: status.parse().unwrap_or_default(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn insert(&self, req: CreateItemRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO items (id, user_id, title, description, category, condition,
                                listing_type, sale_price, rental_price, rental_period, status)
             VALUES ($1, $2, $3, $4, $5::item_category, $6::item_condition,
                     $7::listing_type, $8, $9, $10::rental_period, $11::item_status)",
        )
        .bind(id)
        .bind(req.user_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.category.as_str())
        .bind(req.condition.as_str())
        .bind(req.listing_type.as_str())
        .bind(req.sale_price)
        .bind(req.rental_price)
        .bind(req.rental_period.map(|p| p.as_str()))
        .bind(req.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        tracing::info!(
            subsystem = "db",
            component = "items",
            op = "insert",
            item_id = %id,
            user_id = %req.user_id,
            "Item created"
        );
        Ok(id)
    }

    async fn insert_draft(&self, user_id: Uuid) -> Result<Uuid> {
        self.insert(CreateItemRequest {
            user_id,
            title: DRAFT_TITLE.to_string(),
            description: String::new(),
            category: ItemCategory::Other,
            condition: ItemCondition::Used,
            listing_type: ListingType::Sell,
            sale_price: None,
            rental_price: None,
            rental_period: None,
            status: ItemStatus::Draft,
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Item> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_item_row).ok_or(Error::ItemNotFound(id))
    }

    async fn list(&self, filter: ItemFilter) -> Result<Vec<Item>> {
        let limit = filter.limit.unwrap_or(100).clamp(1, 500);
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE ($1::text IS NULL OR category::text = $1)
               AND ($2::text IS NULL OR status::text = $2)
               AND ($3::uuid IS NULL OR user_id = $3)
             ORDER BY created_at DESC
             LIMIT $4"
        ))
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_item_row).collect())
    }

    async fn update(&self, id: Uuid, req: UpdateItemRequest) -> Result<()> {
        let result = sqlx::query(
            "UPDATE items SET
                 title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 category = COALESCE($4::item_category, category),
                 condition = COALESCE($5::item_condition, condition),
                 listing_type = COALESCE($6::listing_type, listing_type),
                 sale_price = CASE WHEN $7 THEN $8 ELSE sale_price END,
                 rental_price = CASE WHEN $9 THEN $10 ELSE rental_price END,
                 rental_period = CASE WHEN $11 THEN $12::rental_period ELSE rental_period END,
                 status = COALESCE($13::item_status, status),
                 updated_at = $14
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.category.map(|c| c.as_str()))
        .bind(req.condition.map(|c| c.as_str()))
        .bind(req.listing_type.map(|t| t.as_str()))
        .bind(req.sale_price.is_some())
        .bind(req.sale_price.flatten())
        .bind(req.rental_price.is_some())
        .bind(req.rental_price.flatten())
        .bind(req.rental_period.is_some())
        .bind(req.rental_period.flatten().map(|p| p.as_str()))
        .bind(req.status.map(|s| s.as_str()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id));
        }
        tracing::info!(
            subsystem = "db",
            component = "items",
            op = "delete",
            item_id = %id,
            "Item deleted"
        );
        Ok(())
    }

    async fn category_values(&self) -> Result<Vec<String>> {
        // Read the live enum so suggestion clamping tracks migrations
        // instead of a compiled-in list.
        let rows = sqlx::query(
            "SELECT unnest(enum_range(NULL::item_category))::text AS category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("category")).collect())
    }
}
