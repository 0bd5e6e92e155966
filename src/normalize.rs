//! Clean-up applied to listings after all pages are collected

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::ListingRecord;

/// Longest product name kept for display, in characters
pub const MAX_NAME_CHARS: usize = 80;

/// Vendor and bus prefixes that add nothing to a product name
const VENDOR_PREFIXES: [&str; 2] = ["PCI-E", "Nvidia"];

static BRACKET_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*?\]\s*").expect("valid bracket code regex"));
static VENDOR_PREFIX_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    VENDOR_PREFIXES
        .iter()
        .map(|prefix| {
            Regex::new(&format!(r"(?i)^{}\s+", regex::escape(prefix)))
                .expect("valid vendor prefix regex")
        })
        .collect()
});
static PICKUP_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+pick\s?up only[^,]*$").expect("valid pickup regex"));
static BONUS_OFFER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\*[^,]*$").expect("valid bonus offer regex"));
static AVAIL_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[Avail:.*?\]$").expect("valid availability regex"));

/// Strips listing boilerplate from a product name and caps its length.
pub fn clean_product_name(name: &str) -> String {
    let mut cleaned = BRACKET_CODE_RE.replace(name, "").into_owned();
    for prefix in VENDOR_PREFIX_RES.iter() {
        cleaned = prefix.replace(&cleaned, "").into_owned();
    }
    cleaned = PICKUP_ONLY_RE.replace(&cleaned, "").into_owned();
    cleaned = BONUS_OFFER_RE.replace(&cleaned, "").into_owned();
    cleaned = AVAIL_BRACKET_RE.replace(&cleaned, "").into_owned();

    let cleaned = cleaned.trim();
    if cleaned.chars().count() > MAX_NAME_CHARS {
        let head: String = cleaned.chars().take(MAX_NAME_CHARS - 3).collect();
        format!("{head}...")
    } else {
        cleaned.to_string()
    }
}

/// Cleans names, drops repeated listings and sorts by ascending price.
///
/// Duplicates (same listing id, typically the same listing showing up on two
/// adjacent pages) keep their first occurrence. The sort is stable, so equal
/// prices stay in page/row order.
pub fn normalize_listings(listings: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut seen = HashSet::new();
    let mut normalized: Vec<ListingRecord> = listings
        .into_iter()
        .filter(|listing| seen.insert(listing.id.clone()))
        .map(|mut listing| {
            listing.product_name = clean_product_name(&listing.product_name);
            listing
        })
        .collect();

    normalized.sort_by(|a, b| a.raw_price.total_cmp(&b.raw_price));
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;

    fn listing(id: &str, name: &str, raw_price: f64) -> ListingRecord {
        ListingRecord {
            id: id.to_string(),
            product_name: name.to_string(),
            price: format!("${raw_price:.2}"),
            raw_price,
            store: "Scorptec".to_string(),
            store_location: String::new(),
            availability: Availability::Unknown,
            update_date: None,
            url: None,
            description: String::new(),
        }
    }

    #[test]
    fn strips_codes_prefixes_and_bonus_suffix() {
        assert_eq!(
            clean_product_name("[ABC123] PCI-E Nvidia RTX 5080, *Bonus headset"),
            "RTX 5080"
        );
    }

    #[test]
    fn strips_pickup_and_availability_annotations() {
        assert_eq!(
            clean_product_name("Corsair RM850x PSU pick up only from Sydney store"),
            "Corsair RM850x PSU"
        );
        assert_eq!(
            clean_product_name("Samsung 990 Pro 2TB [Avail: 3-5 days]"),
            "Samsung 990 Pro 2TB"
        );
        assert_eq!(clean_product_name("nvidia geforce RTX 4060"), "geforce RTX 4060");
    }

    #[test]
    fn long_names_are_truncated_with_ellipsis() {
        let long = "X".repeat(120);
        let cleaned = clean_product_name(&long);
        assert_eq!(cleaned.chars().count(), MAX_NAME_CHARS);
        assert!(cleaned.ends_with("..."));

        let exact = "Y".repeat(MAX_NAME_CHARS);
        assert_eq!(clean_product_name(&exact), exact);
    }

    #[test]
    fn sorts_ascending_and_keeps_ties_in_order() {
        let sorted = normalize_listings(vec![
            listing("a", "first 300", 300.0),
            listing("b", "first 100", 100.0),
            listing("c", "second 300", 300.0),
            listing("d", "second 100", 100.0),
        ]);

        let names: Vec<_> = sorted.iter().map(|l| l.product_name.as_str()).collect();
        assert_eq!(names, ["first 100", "second 100", "first 300", "second 300"]);
        assert!(sorted.windows(2).all(|w| w[0].raw_price <= w[1].raw_price));
    }

    #[test]
    fn drops_repeated_listing_ids() {
        let normalized = normalize_listings(vec![
            listing("same", "from page one", 50.0),
            listing("other", "unique", 60.0),
            listing("same", "from page two", 50.0),
        ]);

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].product_name, "from page one");
    }
}
