//! Background job processing for listing uploads.
//!
//! Each upload batch creates one processing job. The worker claims
//! pending jobs, generates thumbnail renditions, asks the AI backend for
//! listing content, and publishes per-item status events that clients can
//! stream while the wizard waits.

pub mod handler;
pub mod listing_content;
pub mod worker;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use listing_content::ListingContentHandler;
pub use worker::{JobWorker, WorkerConfig, WorkerEvent, WorkerHandle};
