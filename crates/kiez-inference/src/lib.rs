//! # kiez-inference
//!
//! Vision-language model backends for kiezmarkt listing generation.
//!
//! This crate provides:
//! - The [`ListingContentBackend`] trait
//! - A Google Gemini implementation
//! - Prompt construction with per-user response language
//! - Lenient parsing of model output (JSON first, prose fallback)
//!
//! # Feature Flags
//!
//! - `mock`: Expose the mock backend outside of tests

pub mod gemini;
pub mod generator;
pub mod language;

// Mock backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use gemini::{GeminiBackend, DEFAULT_GEMINI_MODEL};
pub use generator::{build_prompt, parse_model_output, ListingContentBackend};
pub use language::language_instruction;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockContentBackend;
