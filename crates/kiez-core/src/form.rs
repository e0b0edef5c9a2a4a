//! The item details form: collects user-supplied or AI-suggested listing
//! attributes and validates them before an item row may be written.
//!
//! AI suggestions are merged non-destructively: a suggestion only fills
//! fields the user has not touched, so user edits always win. The
//! rooms-can-only-be-rented rule is enforced at the option level (the
//! `sell` choice is never offered for rooms), not just at validation time.

use serde::{Deserialize, Serialize};

use crate::models::{ItemCategory, ItemCondition, ItemStatus, ListingType, RentalPeriod};
use crate::suggestion::AiSuggestion;

/// Required fields a submission can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Title,
    Category,
    Condition,
    ListingType,
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::Condition => "condition",
            Self::ListingType => "listing_type",
        };
        write!(f, "{}", s)
    }
}

/// Editable form state. All fields are strings, exactly as a client would
/// submit them; prices parse at validation time (blank/invalid → none).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub listing_type: String,
    pub sale_price: String,
    pub rental_price: String,
    pub rental_period: String,
}

/// A form that passed validation, with typed fields ready for the record
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedListing {
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub condition: ItemCondition,
    pub listing_type: ListingType,
    pub sale_price: Option<f64>,
    pub rental_price: Option<f64>,
    pub rental_period: Option<RentalPeriod>,
    pub status: ItemStatus,
}

impl ValidatedListing {
    /// Turn the validated form into the item-creation request for a user.
    pub fn into_create_request(self, user_id: uuid::Uuid) -> crate::models::CreateItemRequest {
        crate::models::CreateItemRequest {
            user_id,
            title: self.title,
            description: self.description,
            category: self.category,
            condition: self.condition,
            listing_type: self.listing_type,
            sale_price: self.sale_price,
            rental_price: self.rental_price,
            rental_period: self.rental_period,
            status: self.status,
        }
    }
}

impl ListingForm {
    /// Start an empty form, pre-filled from an AI suggestion if present.
    pub fn with_suggestion(suggestion: Option<&AiSuggestion>) -> Self {
        let mut form = Self::default();
        if let Some(s) = suggestion {
            form.apply_suggestion(s);
        }
        form
    }

    /// Merge a suggestion into the form without clobbering anything the
    /// user already typed. Called again when a background job completes
    /// after the form is already on screen.
    pub fn apply_suggestion(&mut self, suggestion: &AiSuggestion) {
        if self.title.is_empty() {
            self.title = suggestion.title.clone();
        }
        if self.description.is_empty() {
            self.description = suggestion.description.clone();
        }
        if self.category.is_empty() {
            self.category = suggestion.category.clone();
        }
        if self.condition.is_empty() {
            self.condition = suggestion.condition.to_string();
        }
        if self.listing_type.is_empty() {
            self.listing_type = suggestion.listing_type.to_string();
        }
        if self.sale_price.is_empty() {
            if let Some(price) = suggestion.sale_price {
                self.sale_price = format!("{:.2}", price);
            }
        }
    }

    /// Listing-type choices offered for a category. Rooms are rent-only,
    /// so `sell` is filtered out of the options rather than rejected
    /// after the fact.
    pub fn listing_type_options(category: &str) -> Vec<ListingType> {
        let all = [ListingType::Sell, ListingType::Rent, ListingType::Both];
        all.into_iter()
            .filter(|t| category != "rooms" || *t != ListingType::Sell)
            .collect()
    }

    /// Validate required fields and map prices. On failure, reports every
    /// missing field; no partial result is produced.
    pub fn validate(&self) -> std::result::Result<ValidatedListing, Vec<MissingField>> {
        let mut missing = Vec::new();

        if self.title.trim().is_empty() {
            missing.push(MissingField::Title);
        }
        let category: Option<ItemCategory> = self.category.parse().ok();
        if category.is_none() {
            missing.push(MissingField::Category);
        }
        let condition: Option<ItemCondition> = self.condition.parse().ok();
        if condition.is_none() {
            missing.push(MissingField::Condition);
        }
        let listing_type: Option<ListingType> = self.listing_type.parse().ok();
        if listing_type.is_none() {
            missing.push(MissingField::ListingType);
        }

        if !missing.is_empty() {
            return Err(missing);
        }

        let category = category.unwrap();
        let mut listing_type = listing_type.unwrap();
        // Option filtering already hides `sell` for rooms; coerce anyway in
        // case a stale client submits it.
        if category == ItemCategory::Rooms && listing_type == ListingType::Sell {
            listing_type = ListingType::Rent;
        }

        Ok(ValidatedListing {
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            category,
            condition: condition.unwrap(),
            listing_type,
            sale_price: parse_price(&self.sale_price),
            rental_price: parse_price(&self.rental_price),
            rental_period: self.rental_period.parse().ok(),
            status: ItemStatus::Available,
        })
    }
}

/// Map a price field to a nullable amount: blank or unparseable input is
/// `None`, never an error.
pub fn parse_price(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|p| p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion() -> AiSuggestion {
        AiSuggestion {
            title: "Drill Set".into(),
            description: "A cordless drill with bits.".into(),
            category: "tools".into(),
            condition: ItemCondition::Used,
            listing_type: ListingType::Sell,
            sale_price: Some(45.0),
        }
    }

    fn filled_form() -> ListingForm {
        ListingForm {
            title: "Bike".into(),
            description: "City bike".into(),
            category: "sports".into(),
            condition: "used".into(),
            listing_type: "sell".into(),
            sale_price: "120".into(),
            rental_price: String::new(),
            rental_period: String::new(),
        }
    }

    #[test]
    fn test_with_suggestion_prefills() {
        let form = ListingForm::with_suggestion(Some(&suggestion()));
        assert_eq!(form.title, "Drill Set");
        assert_eq!(form.category, "tools");
        assert_eq!(form.listing_type, "sell");
        assert_eq!(form.sale_price, "45.00");
    }

    #[test]
    fn test_with_no_suggestion_is_empty() {
        let form = ListingForm::with_suggestion(None);
        assert!(form.title.is_empty());
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_apply_suggestion_keeps_user_edits() {
        let mut form = ListingForm::with_suggestion(Some(&suggestion()));
        form.title = "Pro Drill Set".into();
        // Suggestion re-applied (e.g. background job finished again).
        form.apply_suggestion(&suggestion());
        assert_eq!(form.title, "Pro Drill Set");
        assert_eq!(form.category, "tools");
    }

    #[test]
    fn test_user_edit_wins_through_validation() {
        let mut form = ListingForm::with_suggestion(Some(&suggestion()));
        form.title = "Pro Drill Set".into();
        let v = form.validate().unwrap();
        assert_eq!(v.title, "Pro Drill Set");
        assert_eq!(v.category, ItemCategory::Tools);
        assert_eq!(v.sale_price, Some(45.0));
    }

    #[test]
    fn test_validate_reports_all_missing_fields() {
        let form = ListingForm {
            description: "no required fields".into(),
            ..Default::default()
        };
        let missing = form.validate().unwrap_err();
        assert_eq!(
            missing,
            vec![
                MissingField::Title,
                MissingField::Category,
                MissingField::Condition,
                MissingField::ListingType,
            ]
        );
    }

    #[test]
    fn test_validate_single_missing_field() {
        let mut form = filled_form();
        form.condition = String::new();
        let missing = form.validate().unwrap_err();
        assert_eq!(missing, vec![MissingField::Condition]);
    }

    #[test]
    fn test_validate_whitespace_title_is_missing() {
        let mut form = filled_form();
        form.title = "   ".into();
        assert_eq!(form.validate().unwrap_err(), vec![MissingField::Title]);
    }

    #[test]
    fn test_validate_maps_prices() {
        let mut form = filled_form();
        form.sale_price = "45.50".into();
        form.rental_price = "not a number".into();
        let v = form.validate().unwrap();
        assert_eq!(v.sale_price, Some(45.5));
        assert_eq!(v.rental_price, None);
    }

    #[test]
    fn test_validate_published_status() {
        assert_eq!(filled_form().validate().unwrap().status, ItemStatus::Available);
    }

    #[test]
    fn test_listing_type_options_rooms_exclude_sell() {
        let opts = ListingForm::listing_type_options("rooms");
        assert!(!opts.contains(&ListingType::Sell));
        assert!(opts.contains(&ListingType::Rent));
        assert!(opts.contains(&ListingType::Both));
    }

    #[test]
    fn test_listing_type_options_other_categories_full() {
        let opts = ListingForm::listing_type_options("tools");
        assert_eq!(opts.len(), 3);
    }

    #[test]
    fn test_validate_coerces_rooms_sell() {
        let mut form = filled_form();
        form.category = "rooms".into();
        form.listing_type = "sell".into();
        let v = form.validate().unwrap();
        assert_eq!(v.listing_type, ListingType::Rent);
    }

    #[test]
    fn test_parse_price_blank_and_invalid() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("  "), None);
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price("12.5"), Some(12.5));
        assert_eq!(parse_price(" 9 "), Some(9.0));
    }
}
