//! Buy/rent request repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kiez_core::{Error, ItemRequest, RequestRepository, RequestStatus, Result};

/// PostgreSQL implementation of RequestRepository.
pub struct PgRequestRepository {
    pool: Pool<Postgres>,
}

const REQUEST_COLUMNS: &str =
    "id, item_id, requester_id, owner_id, message, status::text, created_at, updated_at";

impl PgRequestRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_request_row(row: sqlx::postgres::PgRow) -> ItemRequest {
        let status: String = row.get("status");
        ItemRequest {
            id: row.get("id"),
            item_id: row.get("item_id"),
            requester_id: row.get("requester_id"),
            owner_id: row.get("owner_id"),
            message: row.get("message"),
            status: status.parse().unwrap_or(RequestStatus::Pending),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl RequestRepository for PgRequestRepository {
    async fn create(
        &self,
        item_id: Uuid,
        requester_id: Uuid,
        message: Option<String>,
    ) -> Result<Uuid> {
        // The addressee is the item's primary owner.
        let owner_id: Option<Uuid> = sqlx::query(
            "SELECT user_id FROM item_owners WHERE item_id = $1 AND role = 'owner' LIMIT 1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .map(|row| row.get("user_id"));

        let owner_id = owner_id.ok_or(Error::ItemNotFound(item_id))?;
        if owner_id == requester_id {
            return Err(Error::Validation("cannot request your own item".into()));
        }

        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO item_requests (id, item_id, requester_id, owner_id, message)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(item_id)
        .bind(requester_id)
        .bind(owner_id)
        .bind(&message)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<ItemRequest> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM item_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_request_row)
            .ok_or_else(|| Error::NotFound(format!("request {}", id)))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ItemRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM item_requests
             WHERE requester_id = $1 OR owner_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_request_row).collect())
    }

    async fn set_status(&self, id: Uuid, actor: Uuid, status: RequestStatus) -> Result<()> {
        let request = self.get(id).await?;

        let allowed = match status {
            RequestStatus::Accepted | RequestStatus::Declined => actor == request.owner_id,
            RequestStatus::Cancelled => actor == request.requester_id,
            RequestStatus::Pending => false,
        };
        if !allowed {
            return Err(Error::Forbidden(format!(
                "user {} may not set request {} to {}",
                actor, id, status
            )));
        }
        if request.status != RequestStatus::Pending {
            return Err(Error::Validation(format!(
                "request {} is already {}",
                id, request.status
            )));
        }

        sqlx::query(
            "UPDATE item_requests SET status = $2::request_status, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
