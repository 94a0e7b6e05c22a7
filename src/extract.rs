//! 商品詳細ページのフィールド抽出

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::SelectorConfig;
use crate::inference::{FieldInference, KeywordTable, UNCATEGORIZED, UNSPECIFIED};
use crate::record::{ProductRecord, NOT_AVAILABLE, NO_VALUE};
use crate::selector::{Selector, SelectorCascade};
use crate::traits::PageSource;

/// 7フィールドを読み込み済みページから取り出す
#[derive(Debug, Clone)]
pub struct ProductFieldExtractor {
    selectors: SelectorConfig,
    inference: FieldInference,
    timeout: Duration,
}

impl ProductFieldExtractor {
    pub fn new(selectors: SelectorConfig, inference: FieldInference, timeout: Duration) -> Self {
        Self {
            selectors,
            inference,
            timeout,
        }
    }

    /// 全フィールドを抽出する。見つからないフィールドは番兵値で埋まる
    pub async fn extract<S: PageSource>(&self, source: &S) -> ProductRecord {
        let title = self.title(source).await;
        let price = self.price(source).await;
        let description = self.description(source).await;
        let origin = self.origin(source).await;
        let weight = self.weight(source).await;
        let size = self.size(source).await;
        let category = self.category(source).await;

        ProductRecord {
            title: title.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            price: price.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            description: description.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            origin,
            weight,
            size,
            category,
        }
    }

    pub async fn title<S: PageSource>(&self, source: &S) -> Option<String> {
        self.field(source, "title", &self.selectors.title).await
    }

    pub async fn price<S: PageSource>(&self, source: &S) -> Option<String> {
        self.field(source, "price", &self.selectors.price).await
    }

    pub async fn description<S: PageSource>(&self, source: &S) -> Option<String> {
        self.field(source, "description", &self.selectors.description)
            .await
    }

    pub async fn origin<S: PageSource>(&self, source: &S) -> String {
        self.field(source, "origin", &self.selectors.origin)
            .await
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    pub async fn weight<S: PageSource>(&self, source: &S) -> String {
        self.field(source, "weight", &self.selectors.weight)
            .await
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    /// 構造化された値 → タイトルからの推定 → "Unspecified"
    pub async fn size<S: PageSource>(&self, source: &S) -> String {
        if let Some(size) = self.field(source, "size", &self.selectors.size).await {
            return canonical(self.inference.sizes(), size);
        }

        match self.title(source).await {
            Some(title) => {
                let size = self.inference.size(&title);
                debug!("Size inferred from title {:?}: {}", title, size);
                size.to_string()
            }
            None => UNSPECIFIED.to_string(),
        }
    }

    /// 構造化された値 → タイトルからの推定 → 説明からの推定 → "Uncategorized"
    pub async fn category<S: PageSource>(&self, source: &S) -> String {
        if let Some(category) = self.field(source, "category", &self.selectors.category).await {
            return canonical(self.inference.categories(), category);
        }

        if let Some(title) = self.title(source).await {
            let category = self.inference.category(&title);
            if category != UNCATEGORIZED {
                debug!("Category inferred from title: {}", category);
                return category.to_string();
            }
        }

        if let Some(description) = self.description(source).await {
            let category = self.inference.category(&description);
            if category != UNCATEGORIZED {
                debug!("Category inferred from description: {}", category);
                return category.to_string();
            }
        }

        UNCATEGORIZED.to_string()
    }

    async fn field<S: PageSource>(
        &self,
        source: &S,
        name: &str,
        selectors: &[Selector],
    ) -> Option<String> {
        let value = SelectorCascade::new(selectors, self.timeout)
            .text(source, None)
            .await;
        if value.is_none() {
            warn!("No {} found with any selector", name);
        }
        value
    }
}

/// 表に載っている値なら正規ラベルに、そうでなければサイト上の表記のまま
fn canonical(table: &KeywordTable, value: String) -> String {
    match table.lookup(&value) {
        Some(label) => label.to_string(),
        None => value,
    }
}
