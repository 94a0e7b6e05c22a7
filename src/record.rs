use serde::{Deserialize, Serialize};

use crate::inference::{UNCATEGORIZED, UNSPECIFIED};

/// タイトル・価格・説明が取れなかった場合
pub const NOT_AVAILABLE: &str = "N/A";
/// 産地・重量が取れなかった場合
pub const NO_VALUE: &str = "-";

/// CSVの列名（この順で出力する）
pub const CSV_HEADER: [&str; 7] = [
    "Title",
    "Price",
    "Description",
    "Origin",
    "Weight",
    "Size",
    "Category",
];

/// 商品1件分のデータ（全フィールド必ず埋まる）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Origin")]
    pub origin: String,
    #[serde(rename = "Weight")]
    pub weight: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Category")]
    pub category: String,
}

impl Default for ProductRecord {
    fn default() -> Self {
        Self {
            title: NOT_AVAILABLE.to_string(),
            price: NOT_AVAILABLE.to_string(),
            description: NOT_AVAILABLE.to_string(),
            origin: NO_VALUE.to_string(),
            weight: NO_VALUE.to_string(),
            size: UNSPECIFIED.to_string(),
            category: UNCATEGORIZED.to_string(),
        }
    }
}

impl ProductRecord {
    /// CSV列順の値
    pub fn to_csv_record(&self) -> [&str; 7] {
        [
            self.title.as_str(),
            self.price.as_str(),
            self.description.as_str(),
            self.origin.as_str(),
            self.weight.as_str(),
            self.size.as_str(),
            self.category.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_all_sentinels() {
        let record = ProductRecord::default();
        assert_eq!(
            record.to_csv_record(),
            ["N/A", "N/A", "N/A", "-", "-", "Unspecified", "Uncategorized"]
        );
    }
}
