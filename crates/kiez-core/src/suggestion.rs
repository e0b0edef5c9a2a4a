//! Clamping and resolution of AI-suggested listing content.
//!
//! The vision model returns loosely structured content; nothing in it can
//! be trusted against the database enums. Resolution clamps every optional
//! field: category against the *live* allowed set (fetched from the record
//! store, not hardcoded), condition and listing type against the fixed
//! enums, and the price to a non-negative amount in cents. Invalid or
//! missing values fall back to safe defaults rather than failing.

use serde::{Deserialize, Serialize};

use crate::models::{ItemCondition, ListingType};

/// Unvalidated content as produced by a generation backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSuggestion {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub listing_type: Option<String>,
    pub sale_price: Option<f64>,
}

/// A suggestion with every field clamped to allowed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSuggestion {
    pub title: String,
    pub description: String,
    /// Lowercased, guaranteed to be in the allowed set (or `other`).
    pub category: String,
    pub condition: ItemCondition,
    pub listing_type: ListingType,
    /// Non-negative, rounded to cents.
    pub sale_price: Option<f64>,
}

impl AiSuggestion {
    /// Clamp a raw suggestion against the live category set.
    ///
    /// Defaults: category → `other`, condition → `used`, listing type →
    /// `sell`. Rooms can never be sold, so a resolved `rooms` category
    /// forces the listing type to `rent` even when the model said `sell`.
    pub fn resolve(raw: RawSuggestion, allowed_categories: &[String]) -> Self {
        let category_str = raw
            .category
            .as_deref()
            .unwrap_or("other")
            .trim()
            .to_lowercase();
        let category = if allowed_categories.iter().any(|c| c == &category_str) {
            category_str
        } else {
            "other".to_string()
        };

        let condition = raw
            .condition
            .as_deref()
            .and_then(|s| s.trim().to_lowercase().parse().ok())
            .unwrap_or(ItemCondition::Used);

        let mut listing_type = raw
            .listing_type
            .as_deref()
            .and_then(|s| s.trim().to_lowercase().parse().ok())
            .unwrap_or(ListingType::Sell);
        if category == "rooms" && listing_type == ListingType::Sell {
            listing_type = ListingType::Rent;
        }

        let sale_price = raw.sale_price.and_then(clamp_price);

        Self {
            title: raw.title,
            description: raw.description,
            category,
            condition,
            listing_type,
            sale_price,
        }
    }
}

/// Clamp a suggested price to a non-negative amount rounded to cents.
/// Non-finite values are discarded.
pub fn clamp_price(price: f64) -> Option<f64> {
    if !price.is_finite() {
        return None;
    }
    let p = price.max(0.0);
    Some((p * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["electronics", "tools", "rooms", "other"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn raw(category: &str, listing_type: &str) -> RawSuggestion {
        RawSuggestion {
            title: "Drill Set".into(),
            description: "A cordless drill with bits.".into(),
            category: Some(category.into()),
            condition: Some("used".into()),
            listing_type: Some(listing_type.into()),
            sale_price: Some(45.0),
        }
    }

    #[test]
    fn test_resolve_keeps_allowed_category() {
        let s = AiSuggestion::resolve(raw("tools", "sell"), &allowed());
        assert_eq!(s.category, "tools");
        assert_eq!(s.listing_type, ListingType::Sell);
        assert_eq!(s.sale_price, Some(45.0));
    }

    #[test]
    fn test_resolve_unknown_category_defaults_to_other() {
        let s = AiSuggestion::resolve(raw("spaceships", "sell"), &allowed());
        assert_eq!(s.category, "other");
    }

    #[test]
    fn test_resolve_missing_category_defaults_to_other() {
        let mut r = raw("tools", "sell");
        r.category = None;
        let s = AiSuggestion::resolve(r, &allowed());
        assert_eq!(s.category, "other");
    }

    #[test]
    fn test_resolve_rooms_never_sell() {
        let s = AiSuggestion::resolve(raw("rooms", "sell"), &allowed());
        assert_eq!(s.category, "rooms");
        assert_eq!(s.listing_type, ListingType::Rent);
    }

    #[test]
    fn test_resolve_rooms_both_is_kept() {
        // Only `sell` is forbidden for rooms; `both` passes through.
        let s = AiSuggestion::resolve(raw("rooms", "both"), &allowed());
        assert_eq!(s.listing_type, ListingType::Both);
    }

    #[test]
    fn test_resolve_invalid_condition_defaults_to_used() {
        let mut r = raw("tools", "sell");
        r.condition = Some("mint".into());
        let s = AiSuggestion::resolve(r, &allowed());
        assert_eq!(s.condition, ItemCondition::Used);
    }

    #[test]
    fn test_resolve_invalid_listing_type_defaults_to_sell() {
        let mut r = raw("tools", "lease");
        let s = AiSuggestion::resolve(r.clone(), &allowed());
        assert_eq!(s.listing_type, ListingType::Sell);

        r.listing_type = None;
        let s = AiSuggestion::resolve(r, &allowed());
        assert_eq!(s.listing_type, ListingType::Sell);
    }

    #[test]
    fn test_resolve_case_and_whitespace() {
        let mut r = raw(" Rooms ", " SELL ");
        r.condition = Some("NEW".into());
        let s = AiSuggestion::resolve(r, &allowed());
        assert_eq!(s.category, "rooms");
        assert_eq!(s.condition, ItemCondition::New);
        assert_eq!(s.listing_type, ListingType::Rent);
    }

    #[test]
    fn test_clamp_price_negative() {
        assert_eq!(clamp_price(-10.0), Some(0.0));
    }

    #[test]
    fn test_clamp_price_rounds_to_cents() {
        assert_eq!(clamp_price(19.999), Some(20.0));
        assert_eq!(clamp_price(45.124), Some(45.12));
    }

    #[test]
    fn test_clamp_price_non_finite() {
        assert_eq!(clamp_price(f64::NAN), None);
        assert_eq!(clamp_price(f64::INFINITY), None);
    }
}
