//! Store filtering and summaries over a completed search

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::ListingRecord;

pub mod export;
pub mod table;

pub use export::{export_csv, export_filename};
pub use table::render_table;

/// Stores listed individually in the filter panel
pub const MAJOR_STORES: [&str; 10] = [
    "Mwave Australia",
    "Scorptec",
    "UMart",
    "PC Case Gear",
    "PLE Computers",
    "CCPU Computers",
    "Computer Alliance",
    "JW Computers",
    "SkyComp Technology",
    "I-Tech",
];

/// Selection applied by the "default stores" preset
pub const DEFAULT_STORES: [&str; 3] = ["Mwave Australia", "Scorptec", "UMart"];

/// Sentinel selection matching every store not in [`MAJOR_STORES`]
pub const OTHERS: &str = "Others";

/// Prices at or above this are treated as placeholders, not real prices
pub const PLACEHOLDER_PRICE_THRESHOLD: f64 = 999_999.0;

/// Set of checked store names, possibly including [`OTHERS`].
///
/// An empty selection means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    selected: BTreeSet<String>,
}

impl StoreFilter {
    pub fn new<I, S>(stores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected = stores
            .into_iter()
            .map(Into::into)
            .map(|store: String| store.trim().to_string())
            .filter(|store| !store.is_empty())
            .collect();
        Self { selected }
    }

    /// Parses a comma-separated selection such as `Scorptec,UMart,Others`.
    pub fn from_query(stores: Option<&str>) -> Self {
        stores.map_or_else(Self::default, |list| Self::new(list.split(',')))
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_STORES)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn matches(&self, listing: &ListingRecord) -> bool {
        if self.selected.is_empty() {
            return true;
        }

        self.selected.iter().any(|selected| {
            if selected == OTHERS {
                !MAJOR_STORES.contains(&listing.store.as_str())
            } else {
                listing.store.contains(selected.as_str())
            }
        })
    }

    /// Listings passing the filter, in their original order.
    pub fn apply<'a>(&self, listings: &'a [ListingRecord]) -> Vec<&'a ListingRecord> {
        listings.iter().filter(|listing| self.matches(listing)).collect()
    }
}

/// Headline figures shown above the results table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub price_range: String,
    pub average_price: String,
}

impl PriceSummary {
    pub fn from_listings<'a, I>(listings: I) -> Self
    where
        I: IntoIterator<Item = &'a ListingRecord>,
    {
        let mut count = 0;
        let mut prices = Vec::new();
        for listing in listings {
            count += 1;
            if listing.raw_price < PLACEHOLDER_PRICE_THRESHOLD {
                prices.push(listing.raw_price);
            }
        }

        if prices.is_empty() {
            return Self {
                count,
                min: None,
                max: None,
                average: None,
                price_range: "N/A".to_string(),
                average_price: "N/A".to_string(),
            };
        }

        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = prices.iter().sum::<f64>() / prices.len() as f64;

        Self {
            count,
            min: Some(min),
            max: Some(max),
            average: Some(average),
            price_range: format!("${min:.2} - ${max:.2}"),
            average_price: format!("${average:.2}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Availability;

    pub(crate) fn listing(store: &str, name: &str, raw_price: f64) -> ListingRecord {
        ListingRecord {
            id: format!("{store}-{name}"),
            product_name: name.to_string(),
            price: format!("${raw_price:.2}"),
            raw_price,
            store: store.to_string(),
            store_location: "VIC".to_string(),
            availability: Availability::InStock,
            update_date: None,
            url: None,
            description: String::new(),
        }
    }

    fn mixed_stores() -> Vec<ListingRecord> {
        vec![
            listing("Scorptec", "a", 10.0),
            listing("UMart", "b", 20.0),
            listing("PC Case Gear", "c", 30.0),
            listing("Scorptec", "d", 40.0),
            listing("Bob's Bits", "e", 50.0),
        ]
    }

    #[test]
    fn filter_keeps_only_selected_store() {
        let listings = mixed_stores();
        let filtered = StoreFilter::new(["Scorptec"]).apply(&listings);

        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|l| l.store.contains("Scorptec")));
    }

    #[test]
    fn empty_selection_returns_everything() {
        let listings = mixed_stores();
        assert_eq!(StoreFilter::default().apply(&listings).len(), listings.len());
        assert!(StoreFilter::from_query(Some(" , ")).is_empty());
        assert!(StoreFilter::from_query(None).is_empty());
    }

    #[test]
    fn others_matches_stores_outside_the_major_list() {
        let listings = mixed_stores();
        let filtered = StoreFilter::from_query(Some("Others")).apply(&listings);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].store, "Bob's Bits");

        let combined = StoreFilter::from_query(Some("UMart,Others")).apply(&listings);
        let names: Vec<_> = combined.iter().map(|l| l.product_name.as_str()).collect();
        assert_eq!(names, ["b", "e"]);
    }

    #[test]
    fn store_names_match_by_substring() {
        let listings = vec![listing("Mwave Australia", "x", 1.0)];
        assert_eq!(StoreFilter::new(["Mwave"]).apply(&listings).len(), 1);
        assert_eq!(StoreFilter::defaults().apply(&listings).len(), 1);
    }

    #[test]
    fn summary_formats_range_and_average() {
        let listings = mixed_stores();
        let summary = PriceSummary::from_listings(&listings);

        assert_eq!(summary.count, 5);
        assert_eq!(summary.price_range, "$10.00 - $50.00");
        assert_eq!(summary.average_price, "$30.00");
    }

    #[test]
    fn summary_ignores_placeholder_prices() {
        let listings = vec![listing("UMart", "real", 100.0), listing("UMart", "tba", 999_999.0)];
        let summary = PriceSummary::from_listings(&listings);

        assert_eq!(summary.count, 2);
        assert_eq!(summary.price_range, "$100.00 - $100.00");
        assert_eq!(summary.average_price, "$100.00");

        let only_placeholder = vec![listing("UMart", "tba", 1_000_000.0)];
        let summary = PriceSummary::from_listings(&only_placeholder);
        assert_eq!(summary.price_range, "N/A");
        assert_eq!(summary.average_price, "N/A");

        let empty: Vec<ListingRecord> = Vec::new();
        assert_eq!(PriceSummary::from_listings(&empty).count, 0);
    }
}
