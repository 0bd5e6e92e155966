//! Quotation records and the mapping between the quotation table form and the
//! wide, flat database row (`{slot}_details`, `{slot}_unit`, `{slot}_price`,
//! `{slot}_upgrade_note` for each of the 13 component slots).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// The fixed component slots of a PC build quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentSlot {
    Cpu,
    CpuCooling,
    Motherboard,
    Ram,
    Storage1,
    Storage2,
    Gpu,
    Case,
    Psu,
    SysFan,
    Os,
    Monitor,
    Others,
}

impl ComponentSlot {
    /// Slots in form/table order.
    pub const ALL: [Self; 13] = [
        Self::Cpu,
        Self::CpuCooling,
        Self::Motherboard,
        Self::Ram,
        Self::Storage1,
        Self::Storage2,
        Self::Gpu,
        Self::Case,
        Self::Psu,
        Self::SysFan,
        Self::Os,
        Self::Monitor,
        Self::Others,
    ];

    /// Column prefix in the `quotations` table and key prefix in flat JSON
    pub fn key(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::CpuCooling => "cpu_cooling",
            Self::Motherboard => "motherboard",
            Self::Ram => "ram",
            Self::Storage1 => "storage1",
            Self::Storage2 => "storage2",
            Self::Gpu => "gpu",
            Self::Case => "case",
            Self::Psu => "psu",
            Self::SysFan => "sys_fan",
            Self::Os => "os",
            Self::Monitor => "monitor",
            Self::Others => "others",
        }
    }

    /// Row label used by the quotation entry and edit tables
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::CpuCooling => "CPU Cooling",
            Self::Motherboard => "Motherboard",
            Self::Ram => "RAM",
            Self::Storage1 => "Storage 1",
            Self::Storage2 => "Storage 2",
            Self::Gpu => "GPU",
            Self::Case => "Case",
            Self::Psu => "PSU",
            Self::SysFan => "System Fan",
            Self::Os => "OS",
            Self::Monitor => "Monitor",
            Self::Others => "Others",
        }
    }

    /// Longer heading shown on the dashboard card
    pub fn heading(self) -> &'static str {
        match self {
            Self::Cpu => "CPU/Processor",
            Self::CpuCooling => "CPU Cooling",
            Self::Motherboard => "Motherboard",
            Self::Ram => "RAM/Memory",
            Self::Storage1 => "Primary Storage",
            Self::Storage2 => "Secondary Storage",
            Self::Gpu => "Graphics Card",
            Self::Case => "PC Case",
            Self::Psu => "Power Supply",
            Self::SysFan => "System Fans",
            Self::Os => "Operating System",
            Self::Monitor => "Monitor",
            Self::Others => "Other Components",
        }
    }

    /// Resolves a table row label to its slot.
    ///
    /// Matching ignores case, spaces, slashes and underscores, and accepts the
    /// row label, the dashboard heading or the column prefix.
    pub fn from_label(part: &str) -> Option<Self> {
        let wanted = squash(part);
        if wanted.is_empty() {
            return None;
        }

        Self::ALL.into_iter().find(|slot| {
            squash(slot.label()) == wanted
                || squash(slot.heading()) == wanted
                || squash(slot.key()) == wanted
        })
    }

    pub fn column(self, field: &str) -> String {
        format!("{}_{field}", self.key())
    }
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// One component row of a quotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentLine {
    pub details: String,
    pub unit: i64,
    pub price: Option<f64>,
    pub upgrade_note: Option<String>,
}

static EMPTY_LINE: ComponentLine = ComponentLine {
    details: String::new(),
    unit: 0,
    price: None,
    upgrade_note: None,
};

impl ComponentLine {
    /// Unit price times quantity; rows with no units contribute nothing.
    pub fn subtotal(&self) -> f64 {
        if self.unit > 0 {
            #[allow(clippy::cast_precision_loss)]
            let units = self.unit as f64;
            self.price.unwrap_or(0.0) * units
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.details.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "AMD")]
    Amd,
    #[serde(rename = "INTEL")]
    Intel,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd => "AMD",
            Self::Intel => "INTEL",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = QuotationInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AMD" => Ok(Self::Amd),
            "INTEL" => Ok(Self::Intel),
            _ => Err(QuotationInputError::UnknownPlatform(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuotationInputError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a number: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("unknown platform \"{0}\" (expected AMD or INTEL)")]
    UnknownPlatform(String),

    #[error("field `{field}` is not an RFC 3339 timestamp: {value}")]
    InvalidTimestamp { field: String, value: String },
}

/// Quotation contents before they are assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotationDraft {
    pub customer_name: String,
    pub platform: Platform,
    pub final_price: f64,
    pub components: BTreeMap<ComponentSlot, ComponentLine>,
    /// Set when the client wants to keep an existing creation time
    pub created_at: Option<DateTime<Utc>>,
}

impl QuotationDraft {
    pub fn component(&self, slot: ComponentSlot) -> &ComponentLine {
        self.components.get(&slot).unwrap_or(&EMPTY_LINE)
    }

    /// Builds a draft from the flat JSON record used by the records page.
    ///
    /// Numbers may arrive as JSON numbers or numeric strings; empty strings
    /// mean "not set".
    ///
    /// # Errors
    ///
    /// Returns [`QuotationInputError`] when a required field is missing or a
    /// value cannot be coerced to its column type.
    pub fn from_flat(record: &Map<String, Value>) -> Result<Self, QuotationInputError> {
        let customer_name = coerce_text(record.get("customer_name"))
            .filter(|name| !name.trim().is_empty())
            .ok_or(QuotationInputError::MissingField("customer_name"))?;

        let platform: Platform = coerce_text(record.get("platform"))
            .ok_or(QuotationInputError::MissingField("platform"))?
            .parse()?;

        let final_price =
            coerce_number("final_price", record.get("final_price"))?.unwrap_or(0.0);

        let mut components = BTreeMap::new();
        for slot in ComponentSlot::ALL {
            let details_key = slot.column("details");
            let unit_key = slot.column("unit");
            let price_key = slot.column("price");
            let note_key = slot.column("upgrade_note");

            let line = ComponentLine {
                details: coerce_text(record.get(&details_key))
                    .map(|details| details.trim().to_string())
                    .unwrap_or_default(),
                unit: coerce_count(&unit_key, record.get(&unit_key))?,
                price: coerce_number(&price_key, record.get(&price_key))?,
                upgrade_note: coerce_text(record.get(&note_key)).and_then(non_empty),
            };
            components.insert(slot, line);
        }

        let created_at = coerce_timestamp("created_at", record.get("created_at"))?;

        Ok(Self {
            customer_name: customer_name.trim().to_string(),
            platform,
            final_price,
            components,
            created_at,
        })
    }

    /// Builds a draft from the new-quotation table submission.
    ///
    /// Rows are matched to slots by their part label; rows that match no
    /// slot are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QuotationInputError`] for a missing customer name, an unknown
    /// platform, or values that cannot be coerced.
    pub fn from_table(form: &TableSubmission) -> Result<Self, QuotationInputError> {
        let customer_name = form.customer_name.trim();
        if customer_name.is_empty() {
            return Err(QuotationInputError::MissingField("customerName"));
        }

        let platform: Platform = form.platform.parse()?;
        let final_price = coerce_number("finalPrice", Some(&form.final_price))?.unwrap_or(0.0);

        let mut components: BTreeMap<ComponentSlot, ComponentLine> = ComponentSlot::ALL
            .into_iter()
            .map(|slot| (slot, ComponentLine::default()))
            .collect();

        for row in &form.table_data {
            let Some(slot) = ComponentSlot::from_label(&row.part) else {
                warn!(part = %row.part, "Ignoring quotation row with unknown part label");
                continue;
            };

            let line = ComponentLine {
                details: row.details.trim().to_string(),
                unit: coerce_count(&slot.column("unit"), Some(&row.unit))?,
                price: coerce_number(&slot.column("price"), Some(&row.price))?,
                upgrade_note: non_empty(row.upgrade_note.clone()),
            };
            components.insert(slot, line);
        }

        let created_at = form
            .date
            .as_deref()
            .map(|raw| parse_timestamp("date", raw))
            .transpose()?;

        Ok(Self {
            customer_name: customer_name.to_string(),
            platform,
            final_price,
            components,
            created_at,
        })
    }
}

/// One row of the quotation entry table as posted by the browser
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub part: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub unit: Value,
    #[serde(default)]
    pub upgrade_note: String,
    #[serde(default)]
    pub price: Value,
}

/// Body of `POST /quotation`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSubmission {
    #[serde(default)]
    pub table_data: Vec<TableRow>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub final_price: Value,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// A stored quotation.
///
/// Serializes as the flat wide record, plus a derived `calculated_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quotation {
    pub id: i64,
    pub customer_name: String,
    pub platform: Platform,
    pub final_price: f64,
    pub components: BTreeMap<ComponentSlot, ComponentLine>,
    pub created_at: DateTime<Utc>,
}

impl Quotation {
    pub fn component(&self, slot: ComponentSlot) -> &ComponentLine {
        self.components.get(&slot).unwrap_or(&EMPTY_LINE)
    }

    /// Sum of `price * unit` over all slots, rounded to cents.
    pub fn calculated_price(&self) -> f64 {
        let total: f64 = ComponentSlot::ALL
            .into_iter()
            .map(|slot| self.component(slot).subtotal())
            .sum();
        (total * 100.0).round() / 100.0
    }

    pub fn to_flat(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("id".to_string(), Value::from(self.id));
        record.insert(
            "customer_name".to_string(),
            Value::from(self.customer_name.clone()),
        );
        record.insert("platform".to_string(), Value::from(self.platform.as_str()));
        record.insert("final_price".to_string(), Value::from(self.final_price));
        record.insert(
            "calculated_price".to_string(),
            Value::from(self.calculated_price()),
        );
        record.insert(
            "created_at".to_string(),
            Value::from(self.created_at.to_rfc3339()),
        );

        for slot in ComponentSlot::ALL {
            let line = self.component(slot);
            record.insert(slot.column("details"), Value::from(line.details.clone()));
            record.insert(slot.column("unit"), Value::from(line.unit));
            record.insert(
                slot.column("price"),
                line.price.map_or(Value::Null, Value::from),
            );
            record.insert(
                slot.column("upgrade_note"),
                line.upgrade_note.clone().map_or(Value::Null, Value::from),
            );
        }

        record
    }
}

impl Serialize for Quotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_flat().serialize(serializer)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_number(field: &str, value: Option<&Value>) -> Result<Option<f64>, QuotationInputError> {
    let invalid = |raw: String| QuotationInputError::InvalidNumber {
        field: field.to_string(),
        value: raw,
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| invalid(s.clone()))
        }
        Some(other) => Err(invalid(other.to_string())),
    }
}

fn coerce_count(field: &str, value: Option<&Value>) -> Result<i64, QuotationInputError> {
    let Some(number) = coerce_number(field, value)? else {
        return Ok(0);
    };

    #[allow(clippy::cast_possible_truncation)]
    Ok(number.trunc() as i64)
}

fn coerce_timestamp(
    field: &str,
    value: Option<&Value>,
) -> Result<Option<DateTime<Utc>>, QuotationInputError> {
    match coerce_text(value) {
        Some(raw) if !raw.trim().is_empty() => parse_timestamp(field, &raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, QuotationInputError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| QuotationInputError::InvalidTimestamp {
            field: field.to_string(),
            value: raw.to_string(),
        })
}
