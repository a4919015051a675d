use crate::domain::item::{format_number, Item};

pub const NEW_ITEMS_HEADER: &str = "📢 新增符合條件申購標的：";
pub const ALL_ITEMS_HEADER: &str = "📢 今日符合條件申購標的：";
pub const RECORD_DELIMITER: &str = "、";

pub fn format_record(item: &Item) -> String {
    let rate = item.rate_of_return().map(format_number).unwrap_or_default();
    let profit = item.profit().map(format_number).unwrap_or_default();
    format!("{}(投報率:{rate}% 獲利:{profit}元)", item.key())
}

pub fn format_message(header: &str, items: &[Item]) -> anyhow::Result<String> {
    anyhow::ensure!(!items.is_empty(), "refusing to format a message with no items");

    let records: Vec<String> = items.iter().map(format_record).collect();
    Ok(format!("{header}\n{}", records.join(RECORD_DELIMITER)))
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
    fn renders_inline_record() {
        assert_eq!(
            format_record(&item("6901 鑽石投資", "45.2", "13560")),
            "6901 鑽石投資(投報率:45.2% 獲利:13560元)"
        );
        assert_eq!(
            format_record(&item("7705 三商餐飲", "", "15000")),
            "7705 三商餐飲(投報率:% 獲利:15000元)"
        );
    }

    #[test]
    fn joins_records_under_header() {
        let msg = format_message(
            NEW_ITEMS_HEADER,
            &[item("A", "25", "1"), item("B", "", "20000")],
        )
        .unwrap();
        assert_eq!(
            msg,
            "📢 新增符合條件申購標的：\nA(投報率:25% 獲利:1元)、B(投報率:% 獲利:20000元)"
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(format_message(ALL_ITEMS_HEADER, &[]).is_err());
    }
}
