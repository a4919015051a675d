use crate::config::Settings;
use crate::domain::item::{Dataset, Item};

pub const DEFAULT_MIN_RATE_OF_RETURN: f64 = 20.0;
pub const DEFAULT_MIN_PROFIT: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCriteria {
    /// Rows strictly above this rate of return (percent) qualify.
    pub min_rate_of_return: f64,

    /// Rows strictly above this expected profit (TWD) qualify.
    pub min_profit: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_rate_of_return: DEFAULT_MIN_RATE_OF_RETURN,
            min_profit: DEFAULT_MIN_PROFIT,
        }
    }
}

impl FilterCriteria {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_rate_of_return: settings.min_rate_of_return,
            min_profit: settings.min_profit,
        }
    }

    pub fn qualifies(&self, item: &Item) -> bool {
        // Absent values fail their clause instead of erroring.
        let by_rate = item
            .rate_of_return()
            .is_some_and(|r| r > self.min_rate_of_return);
        let by_profit = item.profit().is_some_and(|p| p > self.min_profit);
        by_rate || by_profit
    }

    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        Dataset {
            columns: dataset.columns.clone(),
            items: dataset
                .items
                .iter()
                .filter(|item| self.qualifies(item))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::{KEY_COLUMN, PROFIT_COLUMN, RATE_OF_RETURN_COLUMN};

    fn item(key: &str, rate: &str, profit: &str) -> Item {
        Item::from_fields([
            (KEY_COLUMN, key),
            (RATE_OF_RETURN_COLUMN, rate),
            (PROFIT_COLUMN, profit),
        ])
    }

    #[test]
    fn retains_on_either_clause() {
        let c = FilterCriteria::default();
        assert!(c.qualifies(&item("A", "", "15000")));
        assert!(c.qualifies(&item("B", "25", "")));
        assert!(c.qualifies(&item("C", "25", "15000")));
        assert!(!c.qualifies(&item("D", "10", "500")));
    }

    #[test]
    fn thresholds_are_strict() {
        let c = FilterCriteria::default();
        assert!(!c.qualifies(&item("A", "20", "10000")));
        assert!(c.qualifies(&item("B", "20.01", "10000")));
    }

    #[test]
    fn missing_columns_never_qualify() {
        let c = FilterCriteria::default();
        assert!(!c.qualifies(&Item::from_fields([(KEY_COLUMN, "X")])));
    }

    #[test]
    fn unset_settings_yield_default_criteria() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(FilterCriteria::from_settings(&settings), FilterCriteria::default());
    }

    #[test]
    fn apply_keeps_source_order_and_columns() {
        let columns = vec![
            KEY_COLUMN.to_string(),
            RATE_OF_RETURN_COLUMN.to_string(),
            PROFIT_COLUMN.to_string(),
        ];
        let dataset = Dataset::new(
            columns.clone(),
            vec![
                item("Z", "30", ""),
                item("Y", "1", "1"),
                item("X", "", "20000"),
            ],
        );

        let out = FilterCriteria::default().apply(&dataset);
        assert_eq!(out.columns, columns);
        let keys: Vec<_> = out.items.iter().map(Item::key).collect();
        assert_eq!(keys, vec!["Z", "X"]);
    }
}
