//! The listing content pipeline: thumbnail generation followed by AI
//! content suggestion, executed as one processing job per upload batch.
//!
//! Per-image thumbnail failures are logged and skipped so one bad file
//! never sinks the batch. A failed AI call fails the job (the wizard
//! shows the error and the details form starts blank); thumbnails written
//! before the failure stay on their image rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use kiez_core::defaults::{PRIMARY_THUMBNAIL_SIZE, THUMBNAIL_SIZES};
use kiez_core::{
    AiSuggestion, Error, ImageProcessingUpdate, ImageRepository, ItemRepository, JobCompletion,
    Result, UpdateItemRequest,
};
use kiez_db::{parse_storage_url, thumbnail_key, Database, ObjectStore, THUMBNAILS_BUCKET};
use kiez_inference::ListingContentBackend;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler producing thumbnails and AI-suggested content for an upload
/// batch.
pub struct ListingContentHandler {
    db: Arc<Database>,
    store: ObjectStore,
    backend: Arc<dyn ListingContentBackend>,
}

/// Thumbnail renditions written for one original.
struct ImageRenditions {
    original_url: String,
    thumbnails: Vec<(u32, String)>,
}

impl ImageRenditions {
    /// Card thumbnail: prefer the 300px rendition, then larger, then
    /// smaller.
    fn primary_thumbnail(&self) -> Option<&str> {
        let preference = [PRIMARY_THUMBNAIL_SIZE, 600, 150];
        preference.iter().find_map(|size| {
            self.thumbnails
                .iter()
                .find(|(s, _)| s == size)
                .map(|(_, url)| url.as_str())
        })
    }
}

impl ListingContentHandler {
    pub fn new(
        db: Arc<Database>,
        store: ObjectStore,
        backend: Arc<dyn ListingContentBackend>,
    ) -> Self {
        Self { db, store, backend }
    }

    /// Write all renditions for one original image.
    async fn make_renditions(&self, original_url: &str) -> Result<ImageRenditions> {
        let (bucket, key) = parse_storage_url(original_url).ok_or_else(|| {
            Error::Storage(format!("unrecognized storage URL: {}", original_url))
        })?;
        let bytes = self.store.download(&bucket, &key).await?;

        let mut thumbnails = Vec::new();
        for size in THUMBNAIL_SIZES {
            let thumb_key = thumbnail_key(&key, size);
            self.store
                .upload(THUMBNAILS_BUCKET, &thumb_key, &bytes)
                .await?;
            thumbnails.push((size, self.store.public_url(THUMBNAILS_BUCKET, &thumb_key)));
        }

        Ok(ImageRenditions {
            original_url: original_url.to_string(),
            thumbnails,
        })
    }

    /// Run AI generation on the primary image and write the suggestion
    /// onto the item row.
    async fn generate_content(&self, ctx: &JobContext) -> Result<AiSuggestion> {
        let primary_url = ctx
            .job
            .primary_image()
            .ok_or_else(|| Error::Generation("job has no images to analyze".into()))?;
        let (bucket, key) = parse_storage_url(primary_url)
            .ok_or_else(|| Error::Storage(format!("unrecognized storage URL: {}", primary_url)))?;

        let bytes = self.store.download(&bucket, &key).await?;
        let mime_type = ObjectStore::content_type(&bytes);

        let raw = self
            .backend
            .generate(&bytes, mime_type, &ctx.job.user_language)
            .await?;

        let allowed = self.db.items.category_values().await?;
        let suggestion = AiSuggestion::resolve(raw, &allowed);

        // Persist suggestions onto the draft so a reloading client sees
        // them even without the job row.
        self.db
            .items
            .update(
                ctx.item_id(),
                UpdateItemRequest {
                    title: Some(suggestion.title.clone()),
                    description: Some(suggestion.description.clone()),
                    category: suggestion.category.parse().ok(),
                    condition: Some(suggestion.condition),
                    listing_type: Some(suggestion.listing_type),
                    sale_price: Some(suggestion.sale_price),
                    ..Default::default()
                },
            )
            .await?;

        Ok(suggestion)
    }
}

#[async_trait]
impl JobHandler for ListingContentHandler {
    async fn execute(&self, ctx: JobContext) -> JobResult {
        let item_id = ctx.item_id();
        let mut renditions: Vec<ImageRenditions> = Vec::new();

        for original_url in &ctx.job.original_images {
            match self.make_renditions(original_url).await {
                Ok(r) => renditions.push(r),
                Err(e) => {
                    tracing::warn!(
                        subsystem = "jobs",
                        component = "listing_content",
                        item_id = %item_id,
                        image_url = %original_url,
                        error = %e,
                        "Thumbnail generation failed for image, skipping"
                    );
                }
            }
        }

        // Attach renditions to the matching image rows.
        match self.db.images.list_for_item(item_id).await {
            Ok(images) => {
                for image in &images {
                    let Some(r) = renditions
                        .iter()
                        .find(|r| r.original_url == image.image_url)
                    else {
                        continue;
                    };
                    let update = ImageProcessingUpdate {
                        thumbnail_url: r.primary_thumbnail().map(String::from),
                        processing_metadata: json!({
                            "thumbnails": r.thumbnails.iter()
                                .map(|(size, url)| {
                                    (size.to_string(), serde_json::Value::from(url.as_str()))
                                })
                                .collect::<serde_json::Map<_, _>>(),
                            "processed_at": Utc::now(),
                        }),
                    };
                    if let Err(e) = self.db.images.mark_processed(image.id, update).await {
                        tracing::warn!(
                            subsystem = "jobs",
                            component = "listing_content",
                            image_id = %image.id,
                            error = %e,
                            "Failed to record thumbnails on image row"
                        );
                    }
                }
            }
            Err(e) => return JobResult::Failed(format!("failed to load item images: {}", e)),
        }

        let thumbnail_images: Vec<String> = renditions
            .iter()
            .flat_map(|r| r.thumbnails.iter().map(|(_, url)| url.clone()))
            .collect();

        tracing::info!(
            subsystem = "jobs",
            component = "listing_content",
            op = "thumbnails",
            item_id = %item_id,
            image_count = ctx.job.original_images.len(),
            thumbnail_count = thumbnail_images.len(),
            "Thumbnail generation finished"
        );

        match self.generate_content(&ctx).await {
            Ok(suggestion) => JobResult::Success(JobCompletion {
                thumbnail_images,
                ai_generated_title: Some(suggestion.title),
                ai_generated_description: Some(suggestion.description),
            }),
            Err(e) => JobResult::Failed(format!("AI content generation failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renditions(sizes: &[u32]) -> ImageRenditions {
        ImageRenditions {
            original_url: "http://s/storage/item-images/a.png".into(),
            thumbnails: sizes
                .iter()
                .map(|s| (*s, format!("http://s/storage/item-thumbnails/a_thumb_{s}.png")))
                .collect(),
        }
    }

    #[test]
    fn test_primary_thumbnail_prefers_300() {
        let r = renditions(&[150, 300, 600]);
        assert!(r.primary_thumbnail().unwrap().contains("_thumb_300"));
    }

    #[test]
    fn test_primary_thumbnail_falls_back_600_then_150() {
        let r = renditions(&[150, 600]);
        assert!(r.primary_thumbnail().unwrap().contains("_thumb_600"));
        let r = renditions(&[150]);
        assert!(r.primary_thumbnail().unwrap().contains("_thumb_150"));
    }

    #[test]
    fn test_primary_thumbnail_none_when_empty() {
        assert!(renditions(&[]).primary_thumbnail().is_none());
    }
}
