//! Data models for scraped price listings and persisted quotations

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod quotation;

pub use quotation::{
    ComponentLine, ComponentSlot, Platform, Quotation, QuotationDraft, QuotationInputError,
    TableRow, TableSubmission,
};

/// A single store price scraped from the comparison site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub product_name: String,
    /// Display form as it appeared on the page, e.g. `$1,234.50`
    pub price: String,
    pub raw_price: f64,
    pub store: String,
    pub store_location: String,
    pub availability: Availability,
    pub update_date: Option<String>,
    pub url: Option<String>,
    pub description: String,
}

/// Stock status inferred from the free text of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Backorder")]
    Backorder,
    #[serde(rename = "Pre-order")]
    PreOrder,
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Availability {
    /// Classifies listing text by case-insensitive substring search.
    ///
    /// Precedence is fixed: an "in stock" mention wins over everything else,
    /// and a bare "updated:" stamp only counts as available when no explicit
    /// stock wording is present.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();

        if lower.contains("in stock") {
            Self::InStock
        } else if lower.contains("out of stock") {
            Self::OutOfStock
        } else if lower.contains("backorder") {
            Self::Backorder
        } else if lower.contains("pre-order") {
            Self::PreOrder
        } else if lower.contains("updated:") {
            Self::Available
        } else {
            Self::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::OutOfStock => "Out of Stock",
            Self::Backorder => "Backorder",
            Self::PreOrder => "Pre-order",
            Self::Available => "Available",
            Self::Unknown => "Unknown",
        }
    }

    /// CSS class used by the rendered results table
    pub fn css_class(self) -> &'static str {
        match self {
            Self::InStock => "in-stock",
            Self::OutOfStock => "out-of-stock",
            Self::Backorder => "backorder",
            Self::PreOrder => "pre-order",
            Self::Available | Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_precedence() {
        assert_eq!(
            Availability::classify("In Stock - updated: 01-02-2025"),
            Availability::InStock
        );
        assert_eq!(
            Availability::classify("OUT OF STOCK, backorder available"),
            Availability::OutOfStock
        );
        assert_eq!(
            Availability::classify("Backorder, pre-order now"),
            Availability::Backorder
        );
        assert_eq!(Availability::classify("Pre-Order today"), Availability::PreOrder);
        assert_eq!(
            Availability::classify("price updated: 03-04-2025"),
            Availability::Available
        );
        assert_eq!(Availability::classify("call for price"), Availability::Unknown);
    }

    #[test]
    fn availability_serializes_as_display_label() {
        let json = serde_json::to_string(&Availability::OutOfStock).unwrap();
        assert_eq!(json, "\"Out of Stock\"");
        assert_eq!(Availability::PreOrder.to_string(), "Pre-order");
    }

    #[test]
    fn listing_uses_camel_case_fields() {
        let listing = ListingRecord {
            id: "abc".to_string(),
            product_name: "RTX 5080".to_string(),
            price: "$1,999.00".to_string(),
            raw_price: 1999.0,
            store: "Scorptec".to_string(),
            store_location: "VIC".to_string(),
            availability: Availability::InStock,
            update_date: None,
            url: None,
            description: String::new(),
        };

        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["productName"], "RTX 5080");
        assert_eq!(value["rawPrice"], 1999.0);
        assert_eq!(value["availability"], "In Stock");
        assert!(value["updateDate"].is_null());
    }
}
