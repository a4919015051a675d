use crate::domain::item::{
    normalize_number, Dataset, Item, KEY_COLUMN, PROFIT_COLUMN, RATE_OF_RETURN_COLUMN,
    REMARK_COLUMN, SUBSCRIPTION_OPEN_MARKER,
};
use crate::ingest::error::FetchError;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("table selector must parse"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector must parse"));
static CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("cell selector must parse"));

const REQUIRED_COLUMNS: [&str; 4] = [
    KEY_COLUMN,
    REMARK_COLUMN,
    RATE_OF_RETURN_COLUMN,
    PROFIT_COLUMN,
];

/// Extracts the open-subscription rows from the listing page.
pub fn parse_listing(html: &str) -> Result<Dataset, FetchError> {
    let document = Html::parse_document(html);

    let table = find_listing_table(&document).ok_or_else(|| {
        FetchError::shape(format!("no table containing {SUBSCRIPTION_OPEN_MARKER}"))
    })?;

    let rows: Vec<Vec<(String, bool)>> = table
        .select(&ROW)
        .map(|row| {
            row.select(&CELL)
                .map(|cell| (cell_text(&cell), cell.value().name() == "th"))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    // Header is the first all-<th> row, else the first row.
    let header_idx = rows
        .iter()
        .position(|cells| cells.iter().all(|(_, is_th)| *is_th))
        .unwrap_or(0);
    let Some(header) = rows.get(header_idx) else {
        return Err(FetchError::shape("listing table has no rows"));
    };
    let columns = dedupe_columns(header.iter().map(|(text, _)| text.clone()).collect());

    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(FetchError::shape(format!(
                "listing table is missing column {required}"
            )));
        }
    }

    let mut items = Vec::new();
    for cells in rows.iter().skip(header_idx + 1) {
        let mut fields: Vec<(String, String)> = Vec::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let raw = cells.get(idx).map(|(text, _)| text.as_str()).unwrap_or("");
            let value = if column == RATE_OF_RETURN_COLUMN || column == PROFIT_COLUMN {
                normalize_number(raw)
            } else {
                raw.to_string()
            };
            fields.push((column.clone(), value));
        }

        let item = Item::from_fields(fields);
        let open = item
            .get(REMARK_COLUMN)
            .is_some_and(|remark| remark.trim().contains(SUBSCRIPTION_OPEN_MARKER));
        if open {
            items.push(item);
        }
    }

    Ok(Dataset::new(columns, items))
}

/// First table in document order mentioning the marker, preferring the
/// innermost one when layout tables nest around it.
fn find_listing_table(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&TABLE).find(|table| {
        contains_marker(table)
            && !table
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .any(|inner| inner.value().name() == "table" && contains_marker(&inner))
    })
}

fn contains_marker(element: &ElementRef<'_>) -> bool {
    element
        .text()
        .collect::<String>()
        .contains(SUBSCRIPTION_OPEN_MARKER)
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn dedupe_columns(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{name}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}
