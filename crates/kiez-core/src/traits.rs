//! Repository traits for the record store.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ITEM REPOSITORY
// =============================================================================

/// Partial update for an item row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    pub condition: Option<ItemCondition>,
    pub listing_type: Option<ListingType>,
    pub sale_price: Option<Option<f64>>,
    pub rental_price: Option<Option<f64>>,
    pub rental_period: Option<Option<RentalPeriod>>,
    pub status: Option<ItemStatus>,
}

/// Repository for item CRUD operations.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert an item row and return its id.
    async fn insert(&self, req: CreateItemRequest) -> Result<Uuid>;

    /// Insert the throwaway draft that anchors image uploads.
    async fn insert_draft(&self, user_id: Uuid) -> Result<Uuid>;

    async fn get(&self, id: Uuid) -> Result<Item>;

    async fn list(&self, filter: ItemFilter) -> Result<Vec<Item>>;

    async fn update(&self, id: Uuid, req: UpdateItemRequest) -> Result<()>;

    /// Delete an item and its dependent rows.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// The category labels the database currently accepts, used to clamp
    /// AI suggestions against the live enum rather than a compiled list.
    async fn category_values(&self) -> Result<Vec<String>>;
}

// =============================================================================
// IMAGE REPOSITORY
// =============================================================================

/// Fields for inserting one image row.
#[derive(Debug, Clone)]
pub struct CreateImageRequest {
    pub item_id: Uuid,
    pub image_url: String,
    pub display_order: i32,
    pub is_primary: bool,
}

/// Processing results written back to an image row.
#[derive(Debug, Clone)]
pub struct ImageProcessingUpdate {
    pub thumbnail_url: Option<String>,
    pub processing_metadata: serde_json::Value,
}

/// Repository for item image rows.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn insert(&self, req: CreateImageRequest) -> Result<Uuid>;

    /// Images for an item, ordered by display order.
    async fn list_for_item(&self, item_id: Uuid) -> Result<Vec<ItemImage>>;

    /// Delete one image, renumber the survivors densely, and make the new
    /// index 0 the primary.
    async fn delete_and_renumber(&self, image_id: Uuid) -> Result<()>;

    /// Apply a full reorder of an item's gallery. `ordered_ids` is a
    /// permutation of the item's image ids; index 0 becomes primary.
    async fn reorder(&self, item_id: Uuid, ordered_ids: &[Uuid]) -> Result<()>;

    /// Mark an image processed and attach its thumbnail data.
    async fn mark_processed(&self, image_id: Uuid, update: ImageProcessingUpdate) -> Result<()>;

    /// Move all images from one item to another (draft → final item).
    async fn repoint(&self, from_item: Uuid, to_item: Uuid) -> Result<u64>;
}

// =============================================================================
// OWNER REPOSITORY
// =============================================================================

/// Repository for item ownership rows.
#[async_trait]
pub trait OwnerRepository: Send + Sync {
    /// Add an owner. Fails on duplicates.
    async fn add(&self, item_id: Uuid, user_id: Uuid, role: OwnerRole, added_by: Option<Uuid>)
        -> Result<Uuid>;

    /// Owners of an item with their profiles, creators first.
    async fn list_for_item(&self, item_id: Uuid) -> Result<Vec<ItemOwner>>;

    /// Remove an owner. Refuses to remove the last remaining owner.
    async fn remove(&self, item_id: Uuid, user_id: Uuid) -> Result<()>;

    async fn is_owner(&self, item_id: Uuid, user_id: Uuid) -> Result<bool>;
}

// =============================================================================
// PROCESSING JOB REPOSITORY
// =============================================================================

/// Terminal results for a completed processing job.
#[derive(Debug, Clone, Default)]
pub struct JobCompletion {
    pub thumbnail_images: Vec<String>,
    pub ai_generated_title: Option<String>,
    pub ai_generated_description: Option<String>,
}

/// Repository for the append-only processing-job history.
#[async_trait]
pub trait ProcessingJobRepository: Send + Sync {
    /// Enqueue a pending job for an item's uploaded images. Generated
    /// content will be written in `user_language`.
    async fn create(
        &self,
        item_id: Uuid,
        original_images: Vec<String>,
        user_language: &str,
    ) -> Result<Uuid>;

    async fn get(&self, id: Uuid) -> Result<ProcessingJob>;

    /// Claim the oldest pending job, marking it processing. Safe to call
    /// from concurrent workers; each job is claimed exactly once.
    async fn claim_next(&self) -> Result<Option<ProcessingJob>>;

    async fn complete(&self, id: Uuid, completion: JobCompletion) -> Result<()>;

    async fn fail(&self, id: Uuid, error_message: &str) -> Result<()>;

    /// The newest job for an item, which is the authoritative one.
    async fn latest_for_item(&self, item_id: Uuid) -> Result<Option<ProcessingJob>>;

    /// Re-enqueue a failed job as a fresh pending row.
    async fn retry(&self, id: Uuid) -> Result<Uuid>;

    /// Move jobs from one item to another (draft → final item).
    async fn repoint(&self, from_item: Uuid, to_item: Uuid) -> Result<u64>;
}

// =============================================================================
// MESSAGE REPOSITORY
// =============================================================================

/// Fields for sending a message.
#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub item_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub content: String,
}

/// Repository for direct messages and derived conversations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn send(&self, req: SendMessageRequest) -> Result<Uuid>;

    /// Conversations for a user, newest activity first.
    async fn conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>>;

    /// Full thread between two users, oldest first.
    async fn thread(&self, user_id: Uuid, counterpart_id: Uuid) -> Result<Vec<Message>>;

    /// Mark everything the counterpart sent to `user_id` as read.
    async fn mark_read(&self, user_id: Uuid, counterpart_id: Uuid) -> Result<u64>;

    async fn unread_count(&self, user_id: Uuid) -> Result<i64>;
}

// =============================================================================
// REQUEST REPOSITORY
// =============================================================================

/// Repository for buy/rent requests.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Create a pending request from `requester_id` to the item's owner.
    async fn create(
        &self,
        item_id: Uuid,
        requester_id: Uuid,
        message: Option<String>,
    ) -> Result<Uuid>;

    async fn get(&self, id: Uuid) -> Result<ItemRequest>;

    /// Requests sent by or addressed to a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ItemRequest>>;

    /// Transition a request's status. Only the owner may accept/decline;
    /// only the requester may cancel.
    async fn set_status(&self, id: Uuid, actor: Uuid, status: RequestStatus) -> Result<()>;
}

// =============================================================================
// CLOCK
// =============================================================================

/// Time source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
