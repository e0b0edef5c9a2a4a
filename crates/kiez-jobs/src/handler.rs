//! Job handler trait and execution context.

use async_trait::async_trait;
use uuid::Uuid;

use kiez_core::{JobCompletion, ProcessingJob};

/// Context provided to job handlers.
pub struct JobContext {
    /// The claimed job being processed.
    pub job: ProcessingJob,
}

impl JobContext {
    pub fn new(job: ProcessingJob) -> Self {
        Self { job }
    }

    /// The item this job belongs to.
    pub fn item_id(&self) -> Uuid {
        self.job.item_id
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed; results are written to the job row.
    Success(JobCompletion),
    /// Job failed with an error message.
    Failed(String),
}

/// Trait for processing-job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}

/// No-op handler for testing.
#[derive(Default)]
pub struct NoOpHandler;

#[async_trait]
impl JobHandler for NoOpHandler {
    async fn execute(&self, _ctx: JobContext) -> JobResult {
        JobResult::Success(JobCompletion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kiez_core::JobStatus;

    fn job(item_id: Uuid) -> ProcessingJob {
        ProcessingJob {
            id: Uuid::new_v4(),
            item_id,
            status: JobStatus::Processing,
            original_images: vec!["http://store/a.png".into()],
            thumbnail_images: vec![],
            user_language: "en".into(),
            ai_generated_title: None,
            ai_generated_description: None,
            error_message: None,
            processing_started_at: Some(Utc::now()),
            processing_completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_noop_handler_succeeds() {
        let item_id = Uuid::new_v4();
        let ctx = JobContext::new(job(item_id));
        assert_eq!(ctx.item_id(), item_id);
        let result = NoOpHandler.execute(ctx).await;
        assert!(matches!(result, JobResult::Success(_)));
    }
}
