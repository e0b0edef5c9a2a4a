//! The listing-creation wizard as a pure state machine.
//!
//! The wizard owns no IO. It tracks which step the user is on, whether an
//! AI analysis is in flight, and which way the user chose to finish the
//! flow. The API layer drives the transitions and performs the uploads,
//! job creation, and item finalization this module plans.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{MAX_IMAGE_BYTES, MAX_IMAGES};
use crate::error::{Error, Result};
use crate::models::NewImage;
use crate::suggestion::AiSuggestion;

/// The two pages of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Upload,
    Details,
}

/// How the AI analysis is invoked relative to the user's flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiInvocationMode {
    /// Block on the details step until the suggestion arrives.
    InlineBlocking,
    /// Move to details immediately; merge the suggestion when it lands.
    #[default]
    Background,
    /// Kick off analysis and never wait for it.
    FireAndForget,
}

/// How the user chose to leave the upload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Upload images and run the AI analysis.
    WithAi,
    /// Upload images, skip the analysis.
    SkipAi,
    /// No images at all; straight to a blank details form.
    SkipImages,
}

/// Lifecycle of the image/AI pipeline for one draft.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingState {
    Idle,
    Uploading,
    Processing { job_id: Uuid },
    Completed { suggestion: Option<AiSuggestion> },
    Failed { message: String },
}

impl ProcessingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Wizard state for one listing-creation session.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    mode: AiInvocationMode,
    draft_item_id: Option<Uuid>,
    processing: ProcessingState,
}

impl Wizard {
    pub fn new(mode: AiInvocationMode) -> Self {
        Self {
            step: WizardStep::Upload,
            mode,
            draft_item_id: None,
            processing: ProcessingState::Idle,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn mode(&self) -> AiInvocationMode {
        self.mode
    }

    pub fn draft_item_id(&self) -> Option<Uuid> {
        self.draft_item_id
    }

    pub fn processing(&self) -> &ProcessingState {
        &self.processing
    }

    /// Record the temporary draft created for image storage and begin the
    /// upload phase.
    pub fn begin_upload(&mut self, draft_item_id: Uuid) -> Result<()> {
        if self.step != WizardStep::Upload {
            return Err(Error::Validation(
                "uploads are only accepted on the upload step".into(),
            ));
        }
        if !matches!(self.processing, ProcessingState::Idle) {
            return Err(Error::Validation("an upload is already in progress".into()));
        }
        self.draft_item_id = Some(draft_item_id);
        self.processing = ProcessingState::Uploading;
        Ok(())
    }

    /// Uploads finished and a processing job was enqueued. In background
    /// and fire-and-forget modes this also advances to the details step.
    pub fn uploads_complete(&mut self, job_id: Uuid) -> Result<()> {
        if !matches!(self.processing, ProcessingState::Uploading) {
            return Err(Error::Validation("no upload in progress".into()));
        }
        self.processing = ProcessingState::Processing { job_id };
        if self.mode != AiInvocationMode::InlineBlocking {
            self.step = WizardStep::Details;
        }
        Ok(())
    }

    /// Uploads finished with no analysis requested. The pipeline settles
    /// immediately and the wizard moves on to the details form.
    pub fn uploads_complete_without_ai(&mut self) -> Result<()> {
        if !matches!(self.processing, ProcessingState::Uploading) {
            return Err(Error::Validation("no upload in progress".into()));
        }
        self.processing = ProcessingState::Completed { suggestion: None };
        self.step = WizardStep::Details;
        Ok(())
    }

    /// The processing job reached a terminal status.
    pub fn processing_finished(&mut self, outcome: ProcessingState) -> Result<()> {
        if !outcome.is_terminal() {
            return Err(Error::Validation(
                "processing outcome must be completed or failed".into(),
            ));
        }
        if !matches!(self.processing, ProcessingState::Processing { .. }) {
            return Err(Error::Validation("no processing job in flight".into()));
        }
        self.processing = outcome;
        // A failed analysis never blocks the flow; the details form just
        // starts blank.
        self.step = WizardStep::Details;
        Ok(())
    }

    /// Skip images entirely and go straight to an empty details form.
    pub fn skip_images(&mut self) -> Result<()> {
        if self.step != WizardStep::Upload || !matches!(self.processing, ProcessingState::Idle) {
            return Err(Error::Validation(
                "images can only be skipped before any upload starts".into(),
            ));
        }
        self.step = WizardStep::Details;
        Ok(())
    }

    /// Return to the upload step. Only allowed once processing is settled,
    /// otherwise the in-flight job would race a second upload batch.
    pub fn back_to_upload(&mut self) -> Result<()> {
        if self.step != WizardStep::Details {
            return Err(Error::Validation("already on the upload step".into()));
        }
        if matches!(
            self.processing,
            ProcessingState::Uploading | ProcessingState::Processing { .. }
        ) {
            return Err(Error::Validation(
                "cannot go back while images are still processing".into(),
            ));
        }
        self.step = WizardStep::Upload;
        Ok(())
    }

    /// The suggestion to pre-fill the details form with, if any arrived.
    pub fn suggestion(&self) -> Option<&AiSuggestion> {
        match &self.processing {
            ProcessingState::Completed { suggestion } => suggestion.as_ref(),
            _ => None,
        }
    }
}

/// A batch of images validated against the upload limits.
#[derive(Debug, Default)]
pub struct ImageSelection {
    accepted: Vec<NewImage>,
    rejected: Vec<RejectedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedImage {
    pub filename: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotAnImage,
    TooLarge,
    TooMany,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotAnImage => "not an image",
            Self::TooLarge => "larger than 5 MiB",
            Self::TooMany => "image limit reached",
        };
        write!(f, "{}", s)
    }
}

impl ImageSelection {
    /// Validate a batch against the per-file rules and the remaining
    /// capacity (`existing` images are already attached to the item).
    /// Invalid files are reported, never silently dropped.
    pub fn from_batch(images: Vec<NewImage>, existing: usize, max: usize) -> Self {
        let mut selection = Self::default();
        let mut capacity = max.saturating_sub(existing);
        for image in images {
            let reason = if !image.content_type.starts_with("image/") {
                Some(RejectReason::NotAnImage)
            } else if image.bytes.len() > MAX_IMAGE_BYTES {
                Some(RejectReason::TooLarge)
            } else if capacity == 0 {
                Some(RejectReason::TooMany)
            } else {
                None
            };
            match reason {
                Some(reason) => selection.rejected.push(RejectedImage {
                    filename: image.filename.clone(),
                    reason,
                }),
                None => {
                    capacity -= 1;
                    selection.accepted.push(image);
                }
            }
        }
        selection
    }

    pub fn accepted(&self) -> &[NewImage] {
        &self.accepted
    }

    pub fn rejected(&self) -> &[RejectedImage] {
        &self.rejected
    }

    pub fn into_accepted(self) -> Vec<NewImage> {
        self.accepted
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// One upload slot produced by [`plan_uploads`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    /// Object key under the images bucket.
    pub key: String,
    pub display_order: i32,
    pub is_primary: bool,
}

/// Lay out object keys and ordering for a batch of uploads. Index 0 is
/// the primary image; keys carry the batch timestamp so re-uploads never
/// collide.
pub fn plan_uploads(item_id: Uuid, batch_millis: i64, images: &[NewImage]) -> Vec<PlannedUpload> {
    images
        .iter()
        .enumerate()
        .map(|(i, image)| PlannedUpload {
            key: format!("{}/{}-{}.{}", item_id, batch_millis, i, image.extension()),
            display_order: i as i32,
            is_primary: i == 0,
        })
        .collect()
}

/// Check that a proposed display order is a permutation of the item's
/// current image ids.
pub fn validate_reorder(current: &[Uuid], proposed: &[Uuid]) -> Result<()> {
    if current.len() != proposed.len() {
        return Err(Error::Validation(format!(
            "reorder must cover all {} images, got {}",
            current.len(),
            proposed.len()
        )));
    }
    let mut sorted_current: Vec<Uuid> = current.to_vec();
    let mut sorted_proposed: Vec<Uuid> = proposed.to_vec();
    sorted_current.sort();
    sorted_proposed.sort();
    if sorted_current != sorted_proposed {
        return Err(Error::Validation(
            "reorder must be a permutation of the item's images".into(),
        ));
    }
    Ok(())
}
