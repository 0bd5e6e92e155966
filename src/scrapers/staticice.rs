//! StaticICE result-page parser
//!
//! Results are rendered as a table of two-cell rows: the first cell holds the
//! price (linked to a redirect/detail URL), the second the product text, the
//! store link and free-text stock and update stamps. The markup is not a
//! contract, so anything that does not look like a listing row is skipped and
//! a page that no longer matches degrades to zero listings.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::{Availability, ListingRecord};
use crate::traits::UpstreamConfig;

/// Phrase the site puts in the `title` of every store link
pub const STORE_LINK_MARKER: &str = "Click to visit";

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"tr[valign="top"]"#).expect("valid row selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid cell selector"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));
static STORE_LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!(r#"a[title*="{STORE_LINK_MARKER}"]"#))
        .expect("valid store link selector")
});

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+(\.\d+)?").expect("valid price regex"));
static UPDATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"updated:\s*(\d{2}-\d{2}-\d{4})").expect("valid update date regex")
});

/// Why a candidate row did not become a listing
#[derive(Debug, Clone, PartialEq)]
enum RowSkip {
    NoPrice,
    NoProductName,
    NoStore,
    /// The row looked like a listing but a value could not be interpreted
    Fault(String),
}

/// Parses one page of search results.
///
/// Listings come back in page order; sorting happens after aggregation.
pub fn parse_page(html: &str, upstream: &UpstreamConfig) -> Vec<ListingRecord> {
    let document = Html::parse_document(html);
    let mut listings = Vec::new();

    for (index, row) in document.select(&ROW_SELECTOR).enumerate() {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        if cells.len() != 2 {
            continue;
        }

        match parse_row(cells[0], cells[1], upstream) {
            Ok(listing) => listings.push(listing),
            Err(RowSkip::Fault(reason)) => {
                warn!(row = index, %reason, "Skipping listing row that failed to parse");
            }
            Err(skip) => debug!(row = index, ?skip, "Row is not a listing"),
        }
    }

    debug!(
        "Parsed {} listings from {} page",
        listings.len(),
        upstream.name
    );
    listings
}

fn parse_row(
    price_cell: ElementRef,
    description_cell: ElementRef,
    upstream: &UpstreamConfig,
) -> Result<ListingRecord, RowSkip> {
    let price_text = price_cell.text().collect::<String>();
    let price = PRICE_RE
        .find(&price_text)
        .map(|m| m.as_str().to_string())
        .ok_or(RowSkip::NoPrice)?;
    let raw_price = parse_price(&price)?;

    let url = price_cell
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| upstream.absolute_url(href));

    let description = description_cell.text().collect::<String>().trim().to_string();

    let product_name = description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or(RowSkip::NoProductName)?;

    let (store, store_location) = description_cell
        .select(&STORE_LINK_SELECTOR)
        .next()
        .map(|link| split_store_label(&link.text().collect::<String>()))
        .filter(|(store, _)| !store.is_empty())
        .ok_or(RowSkip::NoStore)?;

    let availability = Availability::classify(&description);
    let update_date = UPDATED_RE
        .captures(&description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let id = listing_id(url.as_deref(), &store, &product_name, &price);

    Ok(ListingRecord {
        id,
        product_name,
        price,
        raw_price,
        store,
        store_location,
        availability,
        update_date,
        url,
        description,
    })
}

/// `$1,234.50` -> `1234.5`
fn parse_price(price: &str) -> Result<f64, RowSkip> {
    let digits: String = price.chars().filter(|c| *c != '$' && *c != ',').collect();

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        Ok(value) => Err(RowSkip::Fault(format!("price {price} parsed to {value}"))),
        Err(e) => Err(RowSkip::Fault(format!("price {price} is not numeric: {e}"))),
    }
}

/// Splits `Scorptec (VIC)` into store name and location.
fn split_store_label(label: &str) -> (String, String) {
    let label = label.trim();
    let (name, rest) = label.split_once('(').unwrap_or((label, ""));
    let location = rest.split_once(')').map_or(rest, |(inside, _)| inside);

    (name.trim().to_string(), location.trim().to_string())
}

/// Stable identity of a listing: the detail URL when present, otherwise the
/// store, name and price together.
fn listing_id(url: Option<&str>, store: &str, product_name: &str, price: &str) -> String {
    match url {
        Some(url) => format!("{:x}", md5::compute(url)),
        None => format!("{:x}", md5::compute(format!("{store}|{product_name}|{price}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fixtures::{listing_row, results_page};

    fn upstream() -> UpstreamConfig {
        UpstreamConfig::staticice("https://www.staticice.com.au")
    }

    #[test]
    fn parses_one_listing_per_well_formed_row() {
        let html = results_page(&[
            listing_row("$1,234.50", "Gigabyte RTX 5080 Gaming OC", "Scorptec (VIC)", "/cgi-bin/redirect.cgi?n=1", "In Stock updated: 01-09-2025"),
            listing_row("$999", "ASUS RTX 5070 Ti", "UMart (QLD)", "/cgi-bin/redirect.cgi?n=2", "updated: 02-09-2025"),
        ]);

        let listings = parse_page(&html, &upstream());
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.product_name, "Gigabyte RTX 5080 Gaming OC");
        assert_eq!(first.price, "$1,234.50");
        assert!((first.raw_price - 1234.50).abs() < f64::EPSILON);
        assert_eq!(first.store, "Scorptec");
        assert_eq!(first.store_location, "VIC");
        assert_eq!(first.availability, Availability::InStock);
        assert_eq!(first.update_date.as_deref(), Some("01-09-2025"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.staticice.com.au/cgi-bin/redirect.cgi?n=1")
        );
        assert!(first.description.contains("Scorptec (VIC)"));

        let second = &listings[1];
        assert!((second.raw_price - 999.0).abs() < f64::EPSILON);
        assert_eq!(second.availability, Availability::Available);
        assert_eq!(second.store, "UMart");
    }

    #[test]
    fn keeps_page_order_without_sorting() {
        let html = results_page(&[
            listing_row("$500.00", "Expensive", "Scorptec (VIC)", "/r?n=1", ""),
            listing_row("$100.00", "Cheap", "UMart (QLD)", "/r?n=2", ""),
        ]);

        let names: Vec<_> = parse_page(&html, &upstream())
            .into_iter()
            .map(|l| l.product_name)
            .collect();
        assert_eq!(names, ["Expensive", "Cheap"]);
    }

    #[test]
    fn skips_rows_without_a_dollar_amount() {
        let html = results_page(&[
            listing_row("POA", "Call for price", "Scorptec (VIC)", "/r?n=1", ""),
            listing_row("$45.00", "Thermal paste", "UMart (QLD)", "/r?n=2", ""),
        ]);

        let listings = parse_page(&html, &upstream());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].product_name, "Thermal paste");
    }

    #[test]
    fn skips_rows_without_a_store_link() {
        let html = r#"<html><body><table>
            <tr valign="top"><td><a href="/r?n=1">$10.00</a></td><td>Orphan product
            no store here</td></tr>
        </table></body></html>"#;

        assert!(parse_page(html, &upstream()).is_empty());
    }

    #[test]
    fn ignores_rows_that_are_not_two_cells() {
        let html = r#"<html><body><table>
            <tr valign="top"><td>$10.00</td></tr>
            <tr valign="top"><td>$10.00</td><td>Name</td><td>Extra</td></tr>
            <tr><td>$10.00</td><td>No valign</td></tr>
        </table></body></html>"#;

        assert!(parse_page(html, &upstream()).is_empty());
    }

    #[test]
    fn unrelated_markup_yields_no_listings() {
        let html = "<html><body><h1>No results</h1><p>Try again</p></body></html>";
        assert!(parse_page(html, &upstream()).is_empty());
        assert!(parse_page("", &upstream()).is_empty());
    }

    #[test]
    fn listing_without_detail_link_has_no_url() {
        let html = r#"<html><body><table>
            <tr valign="top"><td>$89.95</td><td>Noctua NH-U12S
            <a href="https://shop.example" title="Click to visit PLE Computers">PLE Computers (WA)</a>
            out of stock</td></tr>
        </table></body></html>"#;

        let listings = parse_page(html, &upstream());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].url, None);
        assert_eq!(listings[0].store, "PLE Computers");
        assert_eq!(listings[0].store_location, "WA");
        assert_eq!(listings[0].availability, Availability::OutOfStock);
        assert_eq!(listings[0].id.len(), 32);
    }

    #[test]
    fn store_label_without_location() {
        assert_eq!(
            split_store_label(" Mwave Australia "),
            ("Mwave Australia".to_string(), String::new())
        );
        assert_eq!(
            split_store_label("PC Case Gear (VIC) "),
            ("PC Case Gear".to_string(), "VIC".to_string())
        );
    }

    #[test]
    fn price_strips_symbol_and_separators() {
        assert!((parse_price("$12,345.67").unwrap() - 12345.67).abs() < 1e-9);
        assert!(matches!(parse_price("$,"), Err(RowSkip::Fault(_))));
    }
}
