use std::collections::BTreeMap;

/// Listing column holding the "code name" identity of an offering.
pub const KEY_COLUMN: &str = "股票代號 名稱";
pub const RATE_OF_RETURN_COLUMN: &str = "報酬率(%)";
pub const PROFIT_COLUMN: &str = "獲利";
pub const REMARK_COLUMN: &str = "備註";

/// Marks both the listing table and the rows still open for subscription.
pub const SUBSCRIPTION_OPEN_MARKER: &str = "申購中";

/// One listing row. Equality is structural over every column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Item {
    fields: BTreeMap<String, String>,
}

impl Item {
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn key(&self) -> &str {
        self.get(KEY_COLUMN).unwrap_or("")
    }

    pub fn rate_of_return(&self) -> Option<f64> {
        self.get(RATE_OF_RETURN_COLUMN).and_then(parse_number)
    }

    pub fn profit(&self) -> Option<f64> {
        self.get(PROFIT_COLUMN).and_then(parse_number)
    }
}

/// Ordered rows plus the ordered column list they were read with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub items: Vec<Item>,
}

/// The persisted qualifying set of the most recent run.
pub type Snapshot = Dataset;

impl Dataset {
    pub fn new(columns: Vec<String>, items: Vec<Item>) -> Self {
        Self { columns, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Parses a listing number such as `"25.3%"`, `"12,000"` or `"--"`.
/// Placeholders and garbage yield `None`, never an error.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replace('%', "")
        .replace("--", "")
        .replace(',', "")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonical cell text for a numeric column; empty when the value is absent.
pub fn normalize_number(raw: &str) -> String {
    parse_number(raw).map(format_number).unwrap_or_default()
}

pub fn format_number(value: f64) -> String {
    value.to_string()
}
