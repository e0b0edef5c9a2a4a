//! Item ownership repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kiez_core::{Error, ItemOwner, OwnerRepository, OwnerRole, Profile, Result};

/// PostgreSQL implementation of OwnerRepository.
pub struct PgOwnerRepository {
    pool: Pool<Postgres>,
}

impl PgOwnerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_owner_row(row: sqlx::postgres::PgRow) -> ItemOwner {
        let role: String = row.get("role");
        let display_name: Option<String> = row.get("display_name");
        ItemOwner {
            id: row.get("id"),
            item_id: row.get("item_id"),
            user_id: row.get("user_id"),
            role: role.parse().unwrap_or(OwnerRole::CoOwner),
            added_by: row.get("added_by"),
            created_at: row.get("created_at"),
            profile: display_name.map(|display_name| Profile {
                user_id: row.get("user_id"),
                display_name,
                avatar_url: row.get("avatar_url"),
            }),
        }
    }
}

#[async_trait]
impl OwnerRepository for PgOwnerRepository {
    async fn add(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        role: OwnerRole,
        added_by: Option<Uuid>,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let result = sqlx::query(
            "INSERT INTO item_owners (id, item_id, user_id, role, added_by)
             VALUES ($1, $2, $3, $4::owner_role, $5)
             ON CONFLICT (item_id, user_id) DO NOTHING",
        )
        .bind(id)
        .bind(item_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(added_by)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Validation(format!(
                "user {} already owns item {}",
                user_id, item_id
            )));
        }
        Ok(id)
    }

    async fn list_for_item(&self, item_id: Uuid) -> Result<Vec<ItemOwner>> {
        let rows = sqlx::query(
            "SELECT o.id, o.item_id, o.user_id, o.role::text, o.added_by, o.created_at,
                    p.display_name, p.avatar_url
             FROM item_owners o
             LEFT JOIN profiles p ON p.user_id = o.user_id
             WHERE o.item_id = $1
             ORDER BY (o.role = 'owner') DESC, o.created_at ASC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_owner_row).collect())
    }

    async fn remove(&self, item_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Lock the owner rows so two concurrent removals cannot both see
        // "two owners left" and strand the item ownerless.
        let locked = sqlx::query("SELECT id FROM item_owners WHERE item_id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if locked.len() <= 1 {
            return Err(Error::Forbidden(
                "cannot remove the last owner of an item".into(),
            ));
        }

        let result = sqlx::query(
            "DELETE FROM item_owners WHERE item_id = $1 AND user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "user {} does not own item {}",
                user_id, item_id
            )));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn is_owner(&self, item_id: Uuid, user_id: Uuid) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM item_owners WHERE item_id = $1 AND user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.is_some())
    }
}
