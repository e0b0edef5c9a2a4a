//! Listing content generation: backend trait, prompt, and the lenient
//! parser shared by every backend.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use kiez_core::defaults::AI_TITLE_MAX_CHARS;
use kiez_core::{RawSuggestion, Result};

use crate::language::language_instruction;

/// Backend that turns an item photo into suggested listing content.
#[async_trait]
pub trait ListingContentBackend: Send + Sync {
    /// Generate listing content for an image, responding in `language`.
    async fn generate(
        &self,
        image_data: &[u8],
        mime_type: &str,
        language: &str,
    ) -> Result<RawSuggestion>;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Build the generation prompt for the given response language.
pub fn build_prompt(language: &str) -> String {
    format!(
        r#"{}

Analyze this image of an item that someone wants to list for sale or rent. Generate:

1. A concise, appealing title (max 60 characters)
2. A detailed description (100-200 words) that includes:
   - What the item is
   - Its condition and notable features
   - Potential uses or benefits
   - Any visible details that make it appealing

Be descriptive but honest. Focus on what you can actually see in the image.

Format your response as JSON:
{{
  "title": "your generated title",
  "description": "your generated description",
  "category": "one of: electronics, tools, furniture, books, sports, clothing, kitchen, garden, toys, vehicles, rooms, other",
  "condition": "one of: new, used, broken",
  "listing_type": "sell (default), rent, or both. Use rent for rooms.",
  "sale_price": number // suggested sale price in EUR, non-negative
}}"#,
        language_instruction(language)
    )
}

fn json_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Loose shape of the JSON the model is asked to emit.
#[derive(serde::Deserialize)]
struct ModelJson {
    title: Option<serde_json::Value>,
    description: Option<serde_json::Value>,
    category: Option<serde_json::Value>,
    condition: Option<serde_json::Value>,
    listing_type: Option<serde_json::Value>,
    sale_price: Option<serde_json::Value>,
}

fn value_to_lower_string(v: Option<serde_json::Value>) -> Option<String> {
    match v {
        Some(serde_json::Value::String(s)) => Some(s.to_lowercase()),
        _ => None,
    }
}

/// Cap a title at [`AI_TITLE_MAX_CHARS`] without splitting a character.
fn cap_title(title: &str) -> String {
    title.chars().take(AI_TITLE_MAX_CHARS).collect()
}

/// Parse raw model output into a suggestion.
///
/// First tries the first `{...}` block as JSON; a parse failure or a
/// missing title/description falls back to treating the first non-empty
/// line as the title (stripping any leading `title:` label) and the rest
/// as the description. The parser never fails: worst case it returns the
/// generic fallback text.
pub fn parse_model_output(text: &str) -> RawSuggestion {
    if let Some(m) = json_block_regex().find(text) {
        if let Ok(parsed) = serde_json::from_str::<ModelJson>(m.as_str()) {
            let title = parsed.title.as_ref().and_then(|v| v.as_str()).unwrap_or("");
            let description = parsed
                .description
                .as_ref()
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if !title.is_empty() && !description.is_empty() {
                return RawSuggestion {
                    title: cap_title(title),
                    description: description.to_string(),
                    category: value_to_lower_string(parsed.category),
                    condition: value_to_lower_string(parsed.condition),
                    listing_type: value_to_lower_string(parsed.listing_type),
                    sale_price: parsed.sale_price.and_then(|v| v.as_f64()),
                };
            }
        }
    }

    // Unstructured fallback.
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let title = lines
        .first()
        .map(|l| {
            let stripped = strip_title_label(l);
            cap_title(stripped)
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Quality Item".to_string());
    let description = if lines.len() > 1 {
        lines[1..].join(" ")
    } else {
        "A quality item in good condition.".to_string()
    };

    RawSuggestion {
        title,
        description,
        category: None,
        condition: None,
        listing_type: None,
        sale_price: None,
    }
}

fn strip_title_label(line: &str) -> &str {
    let lower = line.to_lowercase();
    if lower.starts_with("title:") {
        line["title:".len()..].trim_start()
    } else if lower.starts_with("title") {
        line["title".len()..].trim_start()
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_language_and_schema() {
        let prompt = build_prompt("de");
        assert!(prompt.starts_with("Bitte antworten Sie auf Deutsch."));
        assert!(prompt.contains("\"title\""));
        assert!(prompt.contains("max 60 characters"));
    }

    #[test]
    fn test_parse_clean_json() {
        let text = r#"{"title": "Cordless Drill", "description": "A solid drill.",
                       "category": "Tools", "condition": "Used",
                       "listing_type": "sell", "sale_price": 45.5}"#;
        let s = parse_model_output(text);
        assert_eq!(s.title, "Cordless Drill");
        assert_eq!(s.description, "A solid drill.");
        assert_eq!(s.category.as_deref(), Some("tools"));
        assert_eq!(s.condition.as_deref(), Some("used"));
        assert_eq!(s.sale_price, Some(45.5));
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = "Here is your listing:\n```json\n{\"title\": \"Lamp\", \"description\": \"A lamp.\"}\n```\nEnjoy!";
        let s = parse_model_output(text);
        assert_eq!(s.title, "Lamp");
        assert_eq!(s.description, "A lamp.");
        assert_eq!(s.category, None);
    }

    #[test]
    fn test_parse_caps_title_at_60_chars() {
        let long = "x".repeat(100);
        let text = format!("{{\"title\": \"{long}\", \"description\": \"d\"}}");
        let s = parse_model_output(&text);
        assert_eq!(s.title.chars().count(), 60);
    }

    #[test]
    fn test_parse_fallback_unstructured() {
        let text = "Title: Garden Chair\nA sturdy wooden chair.\nGreat for balconies.";
        let s = parse_model_output(text);
        assert_eq!(s.title, "Garden Chair");
        assert_eq!(s.description, "A sturdy wooden chair. Great for balconies.");
        assert_eq!(s.condition, None);
    }

    #[test]
    fn test_parse_fallback_single_line() {
        let s = parse_model_output("Garden Chair");
        assert_eq!(s.title, "Garden Chair");
        assert_eq!(s.description, "A quality item in good condition.");
    }

    #[test]
    fn test_parse_fallback_empty_input() {
        let s = parse_model_output("");
        assert_eq!(s.title, "Quality Item");
        assert_eq!(s.description, "A quality item in good condition.");
    }

    #[test]
    fn test_parse_json_missing_description_falls_back() {
        let text = "{\"title\": \"Lamp\"}";
        let s = parse_model_output(text);
        // The JSON block itself becomes the fallback's first line.
        assert_eq!(s.description, "A quality item in good condition.");
    }

    #[test]
    fn test_non_numeric_price_ignored() {
        let text = r#"{"title": "Lamp", "description": "d", "sale_price": "cheap"}"#;
        let s = parse_model_output(text);
        assert_eq!(s.sale_price, None);
    }
}
