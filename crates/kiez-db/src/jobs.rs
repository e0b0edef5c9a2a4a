//! Processing job repository implementation.
//!
//! Job history is append-only: retries insert a fresh pending row instead
//! of rewinding the failed one, and the newest row per item is the
//! authoritative record of that item's pipeline.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kiez_core::{
    Error, JobCompletion, JobStatus, ProcessingJob, ProcessingJobRepository, Result,
};

/// PostgreSQL implementation of ProcessingJobRepository.
pub struct PgProcessingJobRepository {
    pool: Pool<Postgres>,
}

const JOB_COLUMNS: &str = "id, item_id, status::text, original_images, thumbnail_images, \
     user_language, ai_generated_title, ai_generated_description, error_message, \
     processing_started_at, processing_completed_at, created_at";

impl PgProcessingJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert string from database to JobStatus.
    fn str_to_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending, // fallback
        }
    }

    /// Parse a job row into a ProcessingJob struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> ProcessingJob {
        ProcessingJob {
            id: row.get("id"),
            item_id: row.get("item_id"),
            status: Self::str_to_status(row.get("status")),
            original_images: row.get("original_images"),
            thumbnail_images: row.get("thumbnail_images"),
            user_language: row.get("user_language"),
            ai_generated_title: row.get("ai_generated_title"),
            ai_generated_description: row.get("ai_generated_description"),
            error_message: row.get("error_message"),
            processing_started_at: row.get("processing_started_at"),
            processing_completed_at: row.get("processing_completed_at"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ProcessingJobRepository for PgProcessingJobRepository {
    async fn create(
        &self,
        item_id: Uuid,
        original_images: Vec<String>,
        user_language: &str,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO item_processing_jobs (id, item_id, status, original_images, user_language)
             VALUES ($1, $2, 'pending'::processing_job_status, $3, $4)",
        )
        .bind(id)
        .bind(item_id)
        .bind(&original_images)
        .bind(user_language)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "db",
            component = "jobs",
            op = "create",
            job_id = %id,
            item_id = %item_id,
            image_count = original_images.len(),
            "Processing job enqueued"
        );
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<ProcessingJob> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM item_processing_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).ok_or(Error::JobNotFound(id))
    }

    async fn claim_next(&self) -> Result<Option<ProcessingJob>> {
        let now = Utc::now();

        // FOR UPDATE SKIP LOCKED lets concurrent workers claim without
        // blocking each other; each job is claimed exactly once.
        let row = sqlx::query(&format!(
            "UPDATE item_processing_jobs
             SET status = 'processing'::processing_job_status, processing_started_at = $1
             WHERE id = (
                 SELECT id FROM item_processing_jobs
                 WHERE status = 'pending'::processing_job_status
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn complete(&self, id: Uuid, completion: JobCompletion) -> Result<()> {
        let result = sqlx::query(
            "UPDATE item_processing_jobs
             SET status = 'completed'::processing_job_status,
                 thumbnail_images = $2,
                 ai_generated_title = $3,
                 ai_generated_description = $4,
                 processing_completed_at = $5
             WHERE id = $1 AND status = 'processing'::processing_job_status",
        )
        .bind(id)
        .bind(&completion.thumbnail_images)
        .bind(&completion.ai_generated_title)
        .bind(&completion.ai_generated_description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!(
                "job {} is not in processing state, cannot complete",
                id
            )));
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE item_processing_jobs
             SET status = 'failed'::processing_job_status,
                 error_message = $2,
                 processing_completed_at = $3
             WHERE id = $1 AND status = 'processing'::processing_job_status",
        )
        .bind(id)
        .bind(error_message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!(
                "job {} is not in processing state, cannot fail",
                id
            )));
        }
        Ok(())
    }

    async fn latest_for_item(&self, item_id: Uuid) -> Result<Option<ProcessingJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM item_processing_jobs
             WHERE item_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn retry(&self, id: Uuid) -> Result<Uuid> {
        let failed = self.get(id).await?;
        if failed.status != JobStatus::Failed {
            return Err(Error::Job(format!(
                "job {} is {}, only failed jobs can be retried",
                id, failed.status
            )));
        }
        // Fresh pending row; the failed one stays as history.
        self.create(failed.item_id, failed.original_images, &failed.user_language)
            .await
    }

    async fn repoint(&self, from_item: Uuid, to_item: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE item_processing_jobs SET item_id = $2 WHERE item_id = $1",
        )
        .bind(from_item)
        .bind(to_item)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}
