//! Structured logging field name constants for kiezmarkt.
//!
//! All crates use these constants so log aggregation tools can query by
//! the same field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → job → sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "gemini", "pool", "worker", "object_storage"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "upload_images", "generate_content", "claim_next"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Item UUID being operated on.
pub const ITEM_ID: &str = "item_id";

/// Image UUID being operated on.
pub const IMAGE_ID: &str = "image_id";

/// Processing job UUID.
pub const JOB_ID: &str = "job_id";

/// Profile UUID of the acting user.
pub const USER_ID: &str = "user_id";

/// Conversation counterpart UUID.
pub const COUNTERPART_ID: &str = "counterpart_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of images in an upload or processing batch.
pub const IMAGE_COUNT: &str = "image_count";

/// Number of thumbnail renditions produced.
pub const THUMBNAIL_COUNT: &str = "thumbnail_count";

/// Byte length of a prompt or response.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";
