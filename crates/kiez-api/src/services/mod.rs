//! Service layer for kiez-api.

pub mod listing_wizard;

pub use listing_wizard::{ImageBatchOutcome, ListingWizardService, SubmitDetailsRequest};
