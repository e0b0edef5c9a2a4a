//! Shared defaults and limits.

use std::time::Duration;

/// Maximum images per listing.
pub const MAX_IMAGES: usize = 8;

/// Per-file upload size limit (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Generated titles are truncated to this length.
pub const AI_TITLE_MAX_CHARS: usize = 60;

/// Thumbnail renditions produced for each uploaded image, in pixels.
pub const THUMBNAIL_SIZES: [u32; 3] = [150, 300, 600];

/// Rendition preferred as an item's card thumbnail. Falls back to the
/// larger then the smaller size when unavailable.
pub const PRIMARY_THUMBNAIL_SIZE: u32 = 300;

/// Width requested when downloading an image for AI analysis.
pub const AI_IMAGE_WIDTH: u32 = 1200;

/// JPEG quality requested when downloading an image for AI analysis.
pub const AI_IMAGE_QUALITY: u32 = 85;

/// How long a signed download URL stays valid.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(600);

/// Worker poll interval when the job queue is empty.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum processing jobs executed concurrently by one worker.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Wall-clock limit for a single processing job.
pub const JOB_TIMEOUT_SECS: u64 = 120;

/// Title given to the temporary draft created before upload.
pub const DRAFT_TITLE: &str = "New Draft Item";
