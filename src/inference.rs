//! キーワード表によるサイズ・カテゴリ推定
//!
//! 小文字化した入力に対し、表の宣言順にキーワードの部分一致を調べて
//! 最初に当たったラベルを返す。単語境界は見ない（"red" は "bred" にも一致する）。

use serde::{Deserialize, Serialize};

/// サイズ不明
pub const UNSPECIFIED: &str = "Unspecified";
/// カテゴリ不明
pub const UNCATEGORIZED: &str = "Uncategorized";

/// ラベルとキーワード群
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub label: String,
    pub keywords: Vec<String>,
}

impl KeywordEntry {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// 宣言順を保持するキーワード表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
}

impl KeywordTable {
    pub fn new(entries: Vec<KeywordEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    /// 最初に一致したラベル
    ///
    /// 単語境界は見ない部分一致なので、"Thoroughbred" は "red" に一致する。
    pub fn lookup(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .keywords
                    .iter()
                    .any(|keyword| text.contains(&keyword.to_lowercase()))
            })
            .map(|entry| entry.label.as_str())
    }

    /// 容量の既定表
    pub fn default_sizes() -> Self {
        Self::new(vec![
            KeywordEntry::new("180ML", &["180", "180ml"]),
            KeywordEntry::new("375ML", &["375", "375ml"]),
            KeywordEntry::new("700ML", &["700", "700ml"]),
            KeywordEntry::new("750ML", &["750", "750ml"]),
            KeywordEntry::new("1500ML", &["1500", "1500ml"]),
        ])
    }

    /// ワイン種別の既定表
    pub fn default_categories() -> Self {
        Self::new(vec![
            KeywordEntry::new(
                "White Wine",
                &[
                    "blanc",
                    "chardonnay",
                    "moscato",
                    "gewürztraminer",
                    "verdejo",
                    "blanco",
                    "white",
                    "sauvignon blanc",
                    "pinot grigio",
                    "riesling",
                    "albariño",
                    "viognier",
                ],
            ),
            KeywordEntry::new(
                "Red Wine",
                &[
                    "merlot",
                    "red",
                    "malbec",
                    "cabernet",
                    "rosso",
                    "pinot noir",
                    "shiraz",
                    "syrah",
                    "tempranillo",
                    "sangiovese",
                    "grenache",
                    "zinfandel",
                ],
            ),
            KeywordEntry::new("Rose Wine", &["rosé", "rosado", "rosato", "pink", "blush"]),
            KeywordEntry::new(
                "Sparkling Wine",
                &[
                    "champagne",
                    "prosecco",
                    "cava",
                    "asti",
                    "crémant",
                    "sparkling",
                    "spumante",
                    "sekt",
                    "franciacorta",
                ],
            ),
            KeywordEntry::new(
                "Fortified Wine",
                &["port", "sherry", "madeira", "marsala", "porto"],
            ),
        ])
    }
}

/// サイズ表とカテゴリ表の組
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInference {
    sizes: KeywordTable,
    categories: KeywordTable,
}

impl Default for FieldInference {
    fn default() -> Self {
        Self::new(KeywordTable::default_sizes(), KeywordTable::default_categories())
    }
}

impl FieldInference {
    pub fn new(sizes: KeywordTable, categories: KeywordTable) -> Self {
        Self { sizes, categories }
    }

    /// テキストから容量ラベルを推定
    pub fn size(&self, text: &str) -> &str {
        self.sizes.lookup(text).unwrap_or(UNSPECIFIED)
    }

    /// テキストからカテゴリを推定
    pub fn category(&self, text: &str) -> &str {
        self.categories.lookup(text).unwrap_or(UNCATEGORIZED)
    }

    pub(crate) fn sizes(&self) -> &KeywordTable {
        &self.sizes
    }

    pub(crate) fn categories(&self) -> &KeywordTable {
        &self.categories
    }
}
