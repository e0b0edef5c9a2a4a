//! # kiez-core
//!
//! Core types, traits, and abstractions for the kiezmarkt marketplace.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other kiezmarkt crates depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod form;
pub mod logging;
pub mod models;
pub mod suggestion;
pub mod traits;
pub mod wizard;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{JobEvent, JobFeed, JobSubscription};
pub use form::{ListingForm, MissingField, ValidatedListing};
pub use models::*;
pub use suggestion::{clamp_price, AiSuggestion, RawSuggestion};
pub use traits::*;
pub use wizard::{
    plan_uploads, validate_reorder, AiInvocationMode, ImageSelection, PlannedUpload,
    ProcessingState, RejectReason, RejectedImage, SubmitMode, Wizard, WizardStep,
};
