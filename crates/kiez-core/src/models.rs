//! Domain models for kiezmarkt: items, images, owners, processing jobs,
//! messaging, and the request/response structs shared across crates.
//!
//! Enum string forms match the Postgres enum labels (snake_case), so the
//! `Display`/`FromStr` pairs are the single source of truth for the wire
//! and database representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

/// Item category. The canonical allowed set lives in the database enum;
/// AI suggestions are clamped against the *live* set, not this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Electronics,
    Furniture,
    Clothing,
    Books,
    Sports,
    Tools,
    Kitchen,
    Garden,
    Toys,
    Vehicles,
    Rooms,
    Other,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "electronics",
            Self::Furniture => "furniture",
            Self::Clothing => "clothing",
            Self::Books => "books",
            Self::Sports => "sports",
            Self::Tools => "tools",
            Self::Kitchen => "kitchen",
            Self::Garden => "garden",
            Self::Toys => "toys",
            Self::Vehicles => "vehicles",
            Self::Rooms => "rooms",
            Self::Other => "other",
        }
    }

    /// Every category variant, in display order.
    pub fn all() -> &'static [ItemCategory] {
        &[
            Self::Electronics,
            Self::Furniture,
            Self::Clothing,
            Self::Books,
            Self::Sports,
            Self::Tools,
            Self::Kitchen,
            Self::Garden,
            Self::Toys,
            Self::Vehicles,
            Self::Rooms,
            Self::Other,
        ]
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electronics" => Ok(Self::Electronics),
            "furniture" => Ok(Self::Furniture),
            "clothing" => Ok(Self::Clothing),
            "books" => Ok(Self::Books),
            "sports" => Ok(Self::Sports),
            "tools" => Ok(Self::Tools),
            "kitchen" => Ok(Self::Kitchen),
            "garden" => Ok(Self::Garden),
            "toys" => Ok(Self::Toys),
            "vehicles" => Ok(Self::Vehicles),
            "rooms" => Ok(Self::Rooms),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown item category: {}", s)),
        }
    }
}

/// Physical condition of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCondition {
    New,
    #[default]
    Used,
    Broken,
}

impl ItemCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Broken => "broken",
        }
    }
}

impl std::fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemCondition {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "used" => Ok(Self::Used),
            "broken" => Ok(Self::Broken),
            _ => Err(format!("unknown item condition: {}", s)),
        }
    }
}

/// How an item is offered: for sale, for rent, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    #[default]
    Sell,
    Rent,
    Both,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::Rent => "rent",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ListingType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sell" => Ok(Self::Sell),
            "rent" => Ok(Self::Rent),
            "both" => Ok(Self::Both),
            _ => Err(format!("unknown listing type: {}", s)),
        }
    }
}

/// Item lifecycle status. The wizard creates `Draft`; publishing promotes
/// to `Available`; owners drive the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Draft,
    Available,
    Reserved,
    Rented,
    Sold,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Rented => "rented",
            Self::Sold => "sold",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "rented" => Ok(Self::Rented),
            "sold" => Ok(Self::Sold),
            _ => Err(format!("unknown item status: {}", s)),
        }
    }
}

/// Billing period for rentals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalPeriod {
    Hourly,
    Daily,
    Weekly,
}

impl RentalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for RentalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RentalPeriod {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            _ => Err(format!("unknown rental period: {}", s)),
        }
    }
}

/// Role granting mutation rights over an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerRole {
    #[default]
    Owner,
    CoOwner,
}

impl OwnerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::CoOwner => "co_owner",
        }
    }
}

impl std::fmt::Display for OwnerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OwnerRole {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "owner" => Ok(Self::Owner),
            "co_owner" => Ok(Self::CoOwner),
            _ => Err(format!("unknown owner role: {}", s)),
        }
    }
}

/// Status of an AI processing job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown job status: {}", s)),
        }
    }
}

/// Status of a buy/rent request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("unknown request status: {}", s)),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A marketplace item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    /// Creating user (distinct from the owner rows, which may grow).
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub condition: ItemCondition,
    pub listing_type: ListingType,
    pub sale_price: Option<f64>,
    pub rental_price: Option<f64>,
    pub rental_period: Option<RentalPeriod>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One image attached to an item. Exactly one per item is primary, and the
/// primary image always has the lowest display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemImage {
    pub id: Uuid,
    pub item_id: Uuid,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    /// Dense, zero-based position within the item's gallery.
    pub display_order: i32,
    pub is_primary: bool,
    pub is_processed: bool,
    pub processing_metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Ownership join row. Every item has at least one owner at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOwner {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub role: OwnerRole,
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// Joined profile data, when fetched with the owner list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

/// One AI-generation attempt for an item. History is append-only; the
/// newest row per item is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub item_id: Uuid,
    pub status: JobStatus,
    pub original_images: Vec<String>,
    pub thumbnail_images: Vec<String>,
    /// Response language for generated content.
    pub user_language: String,
    pub ai_generated_title: Option<String>,
    pub ai_generated_description: Option<String>,
    pub error_message: Option<String>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ProcessingJob {
    /// URL of the image AI generation runs on (selection order 0).
    pub fn primary_image(&self) -> Option<&str> {
        self.original_images.first().map(String::as_str)
    }
}

/// Minimal user profile, as joined into owner/message listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// A direct message between two users, optionally anchored to an item or
/// a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub item_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Derived, non-persisted grouping of messages by counterpart (and item).
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    /// The other participant.
    pub counterpart_id: Uuid,
    pub item_id: Option<Uuid>,
    pub last_message: Message,
    pub unread_count: i64,
}

/// A request to buy or rent an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub id: Uuid,
    pub item_id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An enabled social/SSO login provider, as reported by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialProvider {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub enabled: bool,
    pub icon: String,
}

// ============================================================================
// Requests
// ============================================================================

/// Fields for creating a published item row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub condition: ItemCondition,
    pub listing_type: ListingType,
    pub sale_price: Option<f64>,
    pub rental_price: Option<f64>,
    pub rental_period: Option<RentalPeriod>,
    pub status: ItemStatus,
}

/// An image picked by the user but not yet uploaded: raw bytes plus the
/// metadata needed for validation and key generation.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl NewImage {
    /// File extension for the storage key, falling back to `jpg`.
    /// Filenames come straight from the client, so anything beyond
    /// short alphanumeric extensions is ignored rather than copied
    /// into an object key.
    pub fn extension(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((_, ext))
                if !ext.is_empty()
                    && ext.len() <= 8
                    && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ext
            }
            _ => "jpg",
        }
    }
}

/// Filters for item listing queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<ItemCategory>,
    pub status: Option<ItemStatus>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_category_round_trip() {
        for cat in ItemCategory::all() {
            assert_eq!(ItemCategory::from_str(cat.as_str()).unwrap(), *cat);
        }
    }

    #[test]
    fn test_category_from_str_case_insensitive() {
        assert_eq!(ItemCategory::from_str("Rooms").unwrap(), ItemCategory::Rooms);
        assert_eq!(ItemCategory::from_str("TOOLS").unwrap(), ItemCategory::Tools);
    }

    #[test]
    fn test_category_from_str_unknown() {
        assert!(ItemCategory::from_str("spaceships").is_err());
    }

    #[test]
    fn test_condition_default_is_used() {
        assert_eq!(ItemCondition::default(), ItemCondition::Used);
    }

    #[test]
    fn test_listing_type_default_is_sell() {
        assert_eq!(ListingType::default(), ListingType::Sell);
    }

    #[test]
    fn test_item_status_round_trip() {
        for s in ["draft", "available", "reserved", "rented", "sold"] {
            assert_eq!(ItemStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_owner_role_accepts_hyphenated() {
        assert_eq!(OwnerRole::from_str("co-owner").unwrap(), OwnerRole::CoOwner);
        assert_eq!(OwnerRole::from_str("co_owner").unwrap(), OwnerRole::CoOwner);
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_primary_image() {
        let job = ProcessingJob {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            original_images: vec!["a.jpg".into(), "b.jpg".into()],
            thumbnail_images: vec![],
            user_language: "en".into(),
            ai_generated_title: None,
            ai_generated_description: None,
            error_message: None,
            processing_started_at: None,
            processing_completed_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(job.primary_image(), Some("a.jpg"));
    }

    #[test]
    fn test_new_image_extension() {
        let img = NewImage {
            filename: "photo.PNG".into(),
            content_type: "image/png".into(),
            bytes: vec![],
        };
        assert_eq!(img.extension(), "PNG");

        let no_ext = NewImage {
            filename: "photo".into(),
            content_type: "image/jpeg".into(),
            bytes: vec![],
        };
        assert_eq!(no_ext.extension(), "jpg");
    }

    #[test]
    fn test_new_image_extension_rejects_path_fragments() {
        for name in ["x.a/../../../evil", "x.js%00", "x.done-with-it-longer", "x."] {
            let img = NewImage {
                filename: name.to_string(),
                content_type: "image/jpeg".into(),
                bytes: vec![],
            };
            assert_eq!(img.extension(), "jpg", "filename {:?}", name);
        }
    }

    #[test]
    fn test_social_provider_serde_type_field() {
        let p = SocialProvider {
            id: "google".into(),
            name: "Google".into(),
            provider_type: "oauth".into(),
            enabled: true,
            icon: "google".into(),
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "oauth");
    }

    #[test]
    fn test_enum_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ItemCategory::Electronics).unwrap(),
            "\"electronics\""
        );
        assert_eq!(serde_json::to_string(&JobStatus::Failed).unwrap(), "\"failed\"");
    }
}
