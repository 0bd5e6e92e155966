use std::fmt::Write;

use crate::models::ListingRecord;

/// How many leading rows get a rank badge
const HIGHLIGHTED_RANKS: usize = 3;

/// Renders the ranked results table as an HTML fragment.
pub fn render_table(listings: &[&ListingRecord]) -> String {
    if listings.is_empty() {
        return r#"<div class="no-results">No pricing data found.</div>"#.to_string();
    }

    let mut html = String::from(concat!(
        r#"<div class="pricing-table-container"><table class="pricing-table"><thead><tr>"#,
        r#"<th class="rank-column">#</th>"#,
        r#"<th class="product-column">Product</th>"#,
        r#"<th class="price-column">Price</th>"#,
        r#"<th class="store-column">Store</th>"#,
        r#"<th class="availability-column">Status</th>"#,
        r#"<th class="action-column">View</th>"#,
        "</tr></thead><tbody>\n",
    ));

    for (index, listing) in listings.iter().enumerate() {
        write_row(&mut html, index + 1, listing);
    }

    html.push_str("</tbody></table></div>");
    html
}

fn write_row(html: &mut String, rank: usize, listing: &ListingRecord) {
    let highlighted = rank <= HIGHLIGHTED_RANKS;
    let name = escape_html(&listing.product_name);
    let store = escape_html(&listing.store);
    let price = if listing.price.is_empty() {
        "N/A".to_string()
    } else {
        escape_html(&listing.price)
    };

    // Writing into a String cannot fail.
    let _ = write!(
        html,
        r#"<tr class="pricing-row{}"><td class="rank-cell">"#,
        if highlighted { format!(" rank-{rank}") } else { String::new() }
    );
    if highlighted {
        let _ = write!(html, r#"<span class="rank-badge">{rank}</span>"#);
    } else {
        let _ = write!(html, "{rank}");
    }
    let _ = write!(
        html,
        r#"</td><td class="product-cell"><div class="product-name" title="{name}">{name}</div></td>"#
    );
    let _ = write!(
        html,
        r#"<td class="price-cell"><span class="price-value">{price}</span></td><td class="store-cell">{store}</td>"#
    );
    let _ = write!(
        html,
        r#"<td class="availability-cell"><span class="availability-status {}">{}</span>"#,
        listing.availability.css_class(),
        listing.availability.label()
    );
    if let Some(date) = &listing.update_date {
        let _ = write!(html, r#"<div class="update-date">Updated: {}</div>"#, escape_html(date));
    }
    html.push_str(r#"</td><td class="action-cell">"#);
    if let Some(url) = &listing.url {
        let _ = write!(
            html,
            r#"<a href="{}" target="_blank" rel="noopener" class="view-btn" title="View on {store}">View</a>"#,
            escape_html(url)
        );
    }
    html.push_str("</td></tr>\n");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
