//! Orchestration behind the two wizard endpoints.
//!
//! The image step anchors uploads on a throwaway draft item so the
//! gallery and processing job have a real row to hang off before the
//! user has filled in any details. The details step creates the final
//! item and re-points everything; the draft is deleted only after the
//! transfer fully succeeded, so a failed submission can always be
//! retried against the same draft.
//!
//! Each submission drives a [`Wizard`] state machine through its
//! transitions, so invalid sequences (a second upload while one is in
//! flight, an analysis result with no job) are rejected in one place.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use kiez_core::defaults::{JOB_TIMEOUT_SECS, MAX_IMAGES};
use kiez_core::{
    plan_uploads, AiInvocationMode, CreateImageRequest, Error, ImageRepository, ImageSelection,
    ItemRepository, ItemStatus, JobEvent, JobFeed, JobStatus, JobSubscription, ListingForm,
    MissingField, NewImage, OwnerRepository, OwnerRole, ProcessingJobRepository, ProcessingState,
    RejectedImage, Result, SubmitMode, Wizard,
};
use kiez_db::{Database, ObjectStore, IMAGES_BUCKET};

/// Result of the image submission step, echoed back to the client.
#[derive(Debug, Serialize)]
pub struct ImageBatchOutcome {
    /// Draft item anchoring the uploads; `None` when images were skipped.
    pub draft_item_id: Option<Uuid>,
    /// Public URLs of the stored originals, in display order.
    pub image_urls: Vec<String>,
    /// Processing job enqueued for AI generation, when requested.
    pub job_id: Option<Uuid>,
    /// Terminal job status, only populated by an inline-blocking wait.
    pub job_status: Option<JobStatus>,
    /// Files rejected during selection, with reasons.
    pub rejected: Vec<RejectedImage>,
}

impl ImageBatchOutcome {
    fn skipped(rejected: Vec<RejectedImage>) -> Self {
        Self {
            draft_item_id: None,
            image_urls: Vec::new(),
            job_id: None,
            job_status: None,
            rejected,
        }
    }
}

/// Details-step submission after form validation concerns are applied.
#[derive(Debug)]
pub struct SubmitDetailsRequest {
    pub form: ListingForm,
    /// Draft from the image step, if one was created.
    pub draft_item_id: Option<Uuid>,
    /// Images added on the details step itself.
    pub new_images: Vec<NewImage>,
}

#[derive(Clone)]
pub struct ListingWizardService {
    db: Arc<Database>,
    store: ObjectStore,
    feed: JobFeed,
}

impl ListingWizardService {
    pub fn new(db: Arc<Database>, store: ObjectStore, feed: JobFeed) -> Self {
        Self { db, store, feed }
    }

    /// Image submission step.
    ///
    /// `WithAi` requires at least one accepted image; `SkipAi` uploads
    /// without enqueueing a job; `SkipImages` advances with nothing
    /// stored at all. `invocation` controls whether an enqueued analysis
    /// is awaited before responding (inline), reported for polling
    /// (background), or merely kicked off (fire-and-forget).
    pub async fn submit_images(
        &self,
        user_id: Uuid,
        language: &str,
        mode: SubmitMode,
        invocation: AiInvocationMode,
        images: Vec<NewImage>,
    ) -> Result<ImageBatchOutcome> {
        let mut wizard = Wizard::new(invocation);

        if mode == SubmitMode::SkipImages {
            wizard.skip_images()?;
            return Ok(ImageBatchOutcome::skipped(Vec::new()));
        }

        let selection = ImageSelection::from_batch(images, 0, MAX_IMAGES);
        if selection.is_empty() {
            if mode == SubmitMode::WithAi {
                return Err(Error::Validation(
                    "AI generation requires at least one image".to_string(),
                ));
            }
            // Nothing usable and no analysis wanted: report the rejects
            // without anchoring an empty draft.
            return Ok(ImageBatchOutcome::skipped(selection.rejected().to_vec()));
        }

        let draft_id = self.db.items.insert_draft(user_id).await?;
        wizard.begin_upload(draft_id)?;
        info!(
            subsystem = "wizard",
            item_id = %draft_id,
            user_id = %user_id,
            image_count = selection.accepted().len(),
            "Draft created for upload batch"
        );

        let rejected = selection.rejected().to_vec();
        let accepted = selection.into_accepted();
        let image_urls = self.upload_batch(draft_id, 0, &accepted).await?;

        let mut job_id = None;
        let mut job_status = None;
        if mode == SubmitMode::WithAi {
            // Subscribe before the job exists so an inline wait cannot
            // miss a fast worker's terminal event.
            let mut events = self.feed.subscribe_item(draft_id);
            let id = self
                .db
                .jobs
                .create(draft_id, image_urls.clone(), language)
                .await?;
            wizard.uploads_complete(id)?;
            info!(subsystem = "wizard", item_id = %draft_id, job_id = %id, "Processing job enqueued");

            if invocation == AiInvocationMode::InlineBlocking {
                if let Some(event) = self.await_terminal(&mut events, id).await {
                    let outcome = match event.status {
                        JobStatus::Failed => ProcessingState::Failed {
                            message: event
                                .error_message
                                .unwrap_or_else(|| "analysis failed".into()),
                        },
                        _ => ProcessingState::Completed { suggestion: None },
                    };
                    job_status = Some(event.status);
                    wizard.processing_finished(outcome)?;
                }
            }
            events.close();
            job_id = Some(id);
        } else {
            wizard.uploads_complete_without_ai()?;
        }

        Ok(ImageBatchOutcome {
            draft_item_id: Some(draft_id),
            image_urls,
            job_id,
            job_status,
            rejected,
        })
    }

    /// Block until the job reaches a terminal status, bounded by the
    /// worker's own job timeout. A timed-out or lost wait is not an
    /// error; the analysis keeps running and lands on the draft as if
    /// the mode had been background.
    async fn await_terminal(
        &self,
        events: &mut JobSubscription,
        job_id: Uuid,
    ) -> Option<JobEvent> {
        let wait = Duration::from_secs(JOB_TIMEOUT_SECS);
        let found = tokio::time::timeout(wait, async {
            while let Some(event) = events.next().await {
                if event.job_id == job_id && event.status.is_terminal() {
                    return Some(event);
                }
            }
            None
        })
        .await;

        match found {
            Ok(event) => event,
            Err(_) => {
                warn!(
                    subsystem = "wizard",
                    job_id = %job_id,
                    "Inline analysis did not finish in time, continuing without it"
                );
                None
            }
        }
    }

    /// Details submission step. Returns the final item's id.
    pub async fn submit_details(&self, user_id: Uuid, req: SubmitDetailsRequest) -> Result<Uuid> {
        // The draft id comes from the client; re-pointing and deleting it
        // is only allowed for the user who created it, and only while it
        // is still a draft.
        if let Some(draft) = req.draft_item_id {
            let draft_item = self.db.items.get(draft).await?;
            if draft_item.user_id != user_id || draft_item.status != ItemStatus::Draft {
                return Err(Error::Forbidden(format!(
                    "item {} is not the caller's wizard draft",
                    draft
                )));
            }
        }

        let validated = req.form.validate().map_err(|missing| {
            Error::Validation(format!(
                "missing required fields: {}",
                missing
                    .iter()
                    .map(MissingField::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        let item_id = self
            .db
            .items
            .insert(validated.into_create_request(user_id))
            .await?;
        self.db
            .owners
            .add(item_id, user_id, OwnerRole::Owner, None)
            .await?;

        let existing = match req.draft_item_id {
            Some(draft) => self.db.images.list_for_item(draft).await?.len(),
            None => 0,
        };

        if !req.new_images.is_empty() {
            let selection = ImageSelection::from_batch(req.new_images, existing, MAX_IMAGES);
            let accepted = selection.into_accepted();
            // New images land directly on the final item; the draft's
            // images keep their original keys and are re-pointed below.
            self.upload_batch(item_id, existing as i32, &accepted).await?;
        }

        if let Some(draft) = req.draft_item_id {
            let moved_images = self.db.images.repoint(draft, item_id).await?;
            let moved_jobs = self.db.jobs.repoint(draft, item_id).await?;
            info!(
                subsystem = "wizard",
                item_id = %item_id,
                draft_id = %draft,
                moved_images,
                moved_jobs,
                "Draft contents transferred to final item"
            );
            // Transfer verified; the draft is now empty and disposable.
            if let Err(e) = self.db.items.delete(draft).await {
                warn!(subsystem = "wizard", draft_id = %draft, error = %e, "Failed to delete draft");
            }
        }

        info!(subsystem = "wizard", item_id = %item_id, user_id = %user_id, "Listing published");
        Ok(item_id)
    }

    /// Upload a batch of images for an item and insert their rows.
    /// `offset` is the display order the batch starts at; the first
    /// uploaded image becomes primary only when the gallery was empty.
    pub async fn upload_batch(
        &self,
        item_id: Uuid,
        offset: i32,
        images: &[NewImage],
    ) -> Result<Vec<String>> {
        let batch_millis = Utc::now().timestamp_millis();
        let planned = plan_uploads(item_id, batch_millis, images);

        let mut urls = Vec::with_capacity(planned.len());
        for (upload, image) in planned.iter().zip(images) {
            self.store
                .upload(IMAGES_BUCKET, &upload.key, &image.bytes)
                .await?;
            let url = self.store.public_url(IMAGES_BUCKET, &upload.key);
            self.db
                .images
                .insert(CreateImageRequest {
                    item_id,
                    image_url: url.clone(),
                    display_order: offset + upload.display_order,
                    is_primary: offset == 0 && upload.is_primary,
                })
                .await?;
            urls.push(url);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiez_db::FilesystemBackend;

    /// Service over a lazily-connecting pool: usable for paths that must
    /// return before touching the database.
    fn detached_service() -> ListingWizardService {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/kiez_unused")
            .unwrap();
        let dir = std::env::temp_dir().join(format!("kiez-wizard-{}", Uuid::new_v4()));
        let store = ObjectStore::new(
            Arc::new(FilesystemBackend::new(dir)),
            "http://localhost:3000",
            b"test-key".to_vec(),
        );
        ListingWizardService::new(Arc::new(Database::new(pool)), store, JobFeed::new(32))
    }

    fn text_file(name: &str) -> NewImage {
        NewImage {
            filename: name.to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![0u8; 8],
        }
    }

    #[tokio::test]
    async fn test_skip_ai_with_no_accepted_images_creates_no_draft() {
        let service = detached_service();
        let outcome = service
            .submit_images(
                Uuid::new_v4(),
                "en",
                SubmitMode::SkipAi,
                AiInvocationMode::Background,
                vec![text_file("notes.txt")],
            )
            .await
            .unwrap();

        assert!(outcome.draft_item_id.is_none());
        assert!(outcome.image_urls.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_with_ai_requires_an_accepted_image() {
        let service = detached_service();
        let err = service
            .submit_images(
                Uuid::new_v4(),
                "en",
                SubmitMode::WithAi,
                AiInvocationMode::Background,
                vec![text_file("notes.txt")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_skip_images_touches_nothing() {
        let service = detached_service();
        let outcome = service
            .submit_images(
                Uuid::new_v4(),
                "en",
                SubmitMode::SkipImages,
                AiInvocationMode::Background,
                Vec::new(),
            )
            .await
            .unwrap();
        assert!(outcome.draft_item_id.is_none());
        assert!(outcome.job_id.is_none());
    }
}

#[cfg(test)]
mod db_tests {
    //! Require a live Postgres; run with `cargo test -- --ignored`.

    use super::*;
    use kiez_db::test_fixtures::TestDatabase;
    use kiez_db::FilesystemBackend;
    use kiez_jobs::{JobWorker, NoOpHandler, WorkerConfig};

    fn service_over(db: Arc<Database>, feed: JobFeed) -> ListingWizardService {
        let dir = std::env::temp_dir().join(format!("kiez-wizard-{}", Uuid::new_v4()));
        let store = ObjectStore::new(
            Arc::new(FilesystemBackend::new(dir)),
            "http://localhost:3000",
            b"test-key".to_vec(),
        );
        ListingWizardService::new(db, store, feed)
    }

    fn png(name: &str) -> NewImage {
        NewImage {
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0u8; 16],
        }
    }

    fn form(title: &str) -> ListingForm {
        let mut form = ListingForm::default();
        form.title = title.to_string();
        form.category = "tools".to_string();
        form.condition = "used".to_string();
        form.listing_type = "sell".to_string();
        form
    }

    #[tokio::test]
    #[ignore]
    async fn test_details_rejects_foreign_draft() {
        let test_db = TestDatabase::new().await;
        let db = Arc::new(Database::new(test_db.pool.clone()));
        let victim = test_db.seed_user("victim").await;
        let attacker = test_db.seed_user("attacker").await;

        let service = service_over(db.clone(), JobFeed::new(32));
        let outcome = service
            .submit_images(
                victim,
                "en",
                SubmitMode::SkipAi,
                AiInvocationMode::Background,
                vec![png("mine.png")],
            )
            .await
            .unwrap();
        let draft = outcome.draft_item_id.unwrap();

        let err = service
            .submit_details(
                attacker,
                SubmitDetailsRequest {
                    form: form("Stolen Gallery"),
                    draft_item_id: Some(draft),
                    new_images: Vec::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        // The victim's draft and its gallery are untouched.
        let intact = db.items.get(draft).await.unwrap();
        assert_eq!(intact.user_id, victim);
        assert_eq!(db.images.list_for_item(draft).await.unwrap().len(), 1);

        test_db.cleanup().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_details_rejects_published_item_as_draft() {
        let test_db = TestDatabase::new().await;
        let db = Arc::new(Database::new(test_db.pool.clone()));
        let user = test_db.seed_user("publisher").await;

        let service = service_over(db.clone(), JobFeed::new(32));
        let item_id = service
            .submit_details(
                user,
                SubmitDetailsRequest {
                    form: form("Published Drill"),
                    draft_item_id: None,
                    new_images: Vec::new(),
                },
            )
            .await
            .unwrap();

        // A live listing must not be consumable as a wizard draft, even
        // by its own creator.
        let err = service
            .submit_details(
                user,
                SubmitDetailsRequest {
                    form: form("Second Listing"),
                    draft_item_id: Some(item_id),
                    new_images: Vec::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        test_db.cleanup().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_inline_invocation_waits_for_terminal_status() {
        let test_db = TestDatabase::new().await;
        let db = Arc::new(Database::new(test_db.pool.clone()));
        let user = test_db.seed_user("inline-user").await;

        let feed = JobFeed::new(32);
        let worker = JobWorker::new(
            db.clone(),
            WorkerConfig::default().with_poll_interval(50),
            Arc::new(NoOpHandler),
            feed.clone(),
        );
        let handle = worker.start();

        let service = service_over(db.clone(), feed);
        let outcome = service
            .submit_images(
                user,
                "en",
                SubmitMode::WithAi,
                AiInvocationMode::InlineBlocking,
                vec![png("drill.png")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.job_status, Some(JobStatus::Completed));
        let job = db
            .jobs
            .latest_for_item(outcome.draft_item_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        handle.shutdown().await.unwrap();
        test_db.cleanup().await;
    }
}
