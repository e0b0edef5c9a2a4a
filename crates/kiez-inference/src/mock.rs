//! Mock listing content backend for deterministic testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use kiez_core::{Error, RawSuggestion, Result};

use crate::generator::ListingContentBackend;

/// Mock backend that returns a canned suggestion and records its calls.
#[derive(Clone)]
pub struct MockContentBackend {
    suggestion: RawSuggestion,
    fail_with: Option<String>,
    calls: Arc<AtomicUsize>,
    languages: Arc<Mutex<Vec<String>>>,
}

impl Default for MockContentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentBackend {
    pub fn new() -> Self {
        Self {
            suggestion: RawSuggestion {
                title: "Mock Item".to_string(),
                description: "A mock item description.".to_string(),
                category: Some("other".to_string()),
                condition: Some("used".to_string()),
                listing_type: Some("sell".to_string()),
                sale_price: Some(10.0),
            },
            fail_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
            languages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_suggestion(mut self, suggestion: RawSuggestion) -> Self {
        self.suggestion = suggestion;
        self
    }

    /// Make every call fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Languages requested, in call order.
    pub fn requested_languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingContentBackend for MockContentBackend {
    async fn generate(
        &self,
        _image_data: &[u8],
        _mime_type: &str,
        language: &str,
    ) -> Result<RawSuggestion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(language.to_string());
        match &self.fail_with {
            Some(message) => Err(Error::Generation(message.clone())),
            None => Ok(self.suggestion.clone()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fail_with.is_none())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_suggestion_and_records_calls() {
        let backend = MockContentBackend::new();
        let s = backend.generate(b"img", "image/png", "de").await.unwrap();
        assert_eq!(s.title, "Mock Item");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.requested_languages(), vec!["de".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let backend = MockContentBackend::new().with_failure("offline");
        let err = backend.generate(b"img", "image/png", "en").await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(!backend.health_check().await.unwrap());
    }
}
