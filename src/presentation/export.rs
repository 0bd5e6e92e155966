use std::sync::LazyLock;

use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use regex::Regex;

use crate::models::ListingRecord;

const CSV_HEADER: [&str; 6] = ["Rank", "Product Name", "Price", "Store", "Availability", "Updated"];

static FILENAME_UNSAFE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid filename regex"));

/// Renders listings as CSV, ranked from 1 in the given order.
///
/// Every field is quoted and rows end with `\n`.
///
/// # Errors
/// Returns an error if a record cannot be written.
pub fn export_csv(listings: &[&ListingRecord]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;

    for (index, listing) in listings.iter().enumerate() {
        let rank = (index + 1).to_string();
        let price = if listing.price.is_empty() { "N/A" } else { listing.price.as_str() };
        writer.write_record([
            rank.as_str(),
            listing.product_name.as_str(),
            price,
            listing.store.as_str(),
            listing.availability.label(),
            listing.update_date.as_deref().unwrap_or("-"),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV export: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV export is not valid UTF-8")
}

/// `staticice-prices-rtx-5080.csv` style download name for a query
pub fn export_filename(query: &str) -> String {
    format!(
        "staticice-prices-{}.csv",
        FILENAME_UNSAFE_RE.replace_all(query, "-")
    )
}
