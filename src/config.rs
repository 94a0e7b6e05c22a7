use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScraperError;
use crate::inference::{FieldInference, KeywordTable};
use crate::retry::{check_secs, clamp_secs, DelayRange, RetryPolicy};
use crate::selector::{selectors, Selector};

pub const DEFAULT_BASE_URL: &str = "https://wineworld.lk";
pub const DEFAULT_CATEGORY_URL_TEMPLATE: &str =
    "https://wineworld.lk/product-category/wines/page/{page}/";

/// スクレイパー全体の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    /// `{page}` をページ番号に置換して一覧ページURLを作る
    pub category_url_template: String,
    pub page_limit: u32,
    /// 連続失敗の上限
    pub failure_budget: u32,
    pub headless: bool,
    pub debug: bool,
    pub element_timeout_secs: f64,
    pub long_timeout_secs: f64,
    pub page_load_timeout_secs: u64,
    pub retry: RetryPolicy,
    pub delays: Delays,
    pub selectors: SelectorConfig,
    pub sizes: KeywordTable,
    pub categories: KeywordTable,
    pub output: OutputPaths,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            category_url_template: DEFAULT_CATEGORY_URL_TEMPLATE.to_string(),
            page_limit: 500,
            failure_budget: 5,
            headless: true,
            debug: false,
            element_timeout_secs: 5.0,
            long_timeout_secs: 20.0,
            page_load_timeout_secs: 60,
            retry: RetryPolicy::default(),
            delays: Delays::default(),
            selectors: SelectorConfig::default(),
            sizes: KeywordTable::default_sizes(),
            categories: KeywordTable::default_categories(),
            output: OutputPaths::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// TOMLファイルを既定値に重ねて読み込む
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ScraperError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| ScraperError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScraperError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ScraperError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScraperError> {
        url::Url::parse(&self.base_url)
            .map_err(|e| ScraperError::Config(format!("base_url {}: {}", self.base_url, e)))?;
        if !self.category_url_template.contains("{page}") {
            return Err(ScraperError::Config(
                "category_url_template must contain {page}".into(),
            ));
        }
        if self.page_limit == 0 {
            return Err(ScraperError::Config("page_limit must be at least 1".into()));
        }
        check_secs("element_timeout_secs", self.element_timeout_secs)?;
        check_secs("long_timeout_secs", self.long_timeout_secs)?;
        self.retry.backoff.validate("retry.backoff")?;
        self.delays.validate()
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_failure_budget(mut self, failure_budget: u32) -> Self {
        self.failure_budget = failure_budget;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_delays(mut self, delays: Delays) -> Self {
        self.delays = delays;
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorConfig) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_long_timeout(mut self, timeout: Duration) -> Self {
        self.long_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// 通常の要素待機
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs_f64(clamp_secs(self.element_timeout_secs))
    }

    /// ポップアップ・セクションリンクの待機
    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs_f64(clamp_secs(self.long_timeout_secs))
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    /// 指定ページ番号の一覧ページURL
    pub fn category_page_url(&self, page: u32) -> String {
        self.category_url_template
            .replace("{page}", &page.to_string())
    }

    pub fn inference(&self) -> FieldInference {
        FieldInference::new(self.sizes.clone(), self.categories.clone())
    }
}

/// 各種ランダム待機
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    /// ページ読み込み後・商品間
    pub request: DelayRange,
    /// ポップアップを閉じた後
    pub interstitial: DelayRange,
    /// セクション遷移後
    pub section: DelayRange,
    /// 次ページボタン探索前
    pub before_next: DelayRange,
    /// 次ページ描画待ち
    pub after_next: DelayRange,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            request: DelayRange::new(1.0, 3.0),
            interstitial: DelayRange::new(1.0, 2.0),
            section: DelayRange::new(2.0, 3.0),
            before_next: DelayRange::new(1.0, 2.0),
            after_next: DelayRange::new(2.0, 4.0),
        }
    }
}

impl Delays {
    /// 待機なし（テスト用途など）
    pub fn none() -> Self {
        Self {
            request: DelayRange::ZERO,
            interstitial: DelayRange::ZERO,
            section: DelayRange::ZERO,
            before_next: DelayRange::ZERO,
            after_next: DelayRange::ZERO,
        }
    }

    pub fn validate(&self) -> Result<(), ScraperError> {
        self.request.validate("delays.request")?;
        self.interstitial.validate("delays.interstitial")?;
        self.section.validate("delays.section")?;
        self.before_next.validate("delays.before_next")?;
        self.after_next.validate("delays.after_next")
    }
}

/// フィールドごとの優先順セレクタ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub product_items: Vec<Selector>,
    pub product_links: Vec<Selector>,
    pub next_page: Vec<Selector>,
    pub age_gate: Vec<Selector>,
    pub promo_close: Vec<Selector>,
    pub section: Vec<Selector>,
    pub title: Vec<Selector>,
    pub price: Vec<Selector>,
    pub description: Vec<Selector>,
    pub origin: Vec<Selector>,
    pub weight: Vec<Selector>,
    pub size: Vec<Selector>,
    pub category: Vec<Selector>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            product_items: selectors(["//ul[@class='products column-3']/li", ".products li"]),
            product_links: selectors(["a", "a[href*='product']"]),
            next_page: selectors([
                "//a[@class='next page-numbers']",
                "//a[contains(@class, 'next')]",
                ".next.page-numbers",
                "a.next",
                "[rel='next']",
            ]),
            age_gate: selectors(["button.age-gate__submit.age-gate__submit--yes"]),
            promo_close: selectors(["button.pum-close.popmake-close"]),
            section: selectors(["a[href='https://wineworld.lk/product-category/wines/']"]),
            title: selectors([
                "h1.product_title",
                ".product_title",
                "div.summary.entry-summary > h1",
            ]),
            price: selectors([
                "p.price bdi",
                "div.summary p.price bdi",
                "div.breadcrumb-wrapper + h1 + p bdi",
                "//p[@class='price']//bdi",
            ]),
            description: selectors([
                "//div[contains(@class,'short-description')]/p",
                "//div[contains(@class,'woocommerce-product-details__short-description')]/p",
                "p.price + div p",
                "div[class*='short-description'] p",
            ]),
            origin: selectors([
                "tr.woocommerce-product-attributes-item--attribute_pa_country td.woocommerce-product-attributes-item__value",
                "tr.woocommerce-product-attributes-item--attribute_pa_country td",
                "table.woocommerce-product-attributes tr:nth-child(4) td",
            ]),
            weight: selectors([
                "tr.woocommerce-product-attributes-item--weight td.woocommerce-product-attributes-item__value",
                "tr.woocommerce-product-attributes-item--weight td",
                "table.woocommerce-product-attributes tr:nth-child(1) td",
            ]),
            size: selectors([
                "//table[contains(@class,'woocommerce-product-attributes')]//th[contains(.,'Size')]/following-sibling::td",
                "tr.woocommerce-product-attributes-item--attribute_pa_size td.woocommerce-product-attributes-item__value",
                "table.woocommerce-product-attributes tr:nth-child(2) td",
            ]),
            category: selectors([
                "tr.woocommerce-product-attributes-item--attribute_pa_ww-category td.woocommerce-product-attributes-item__value",
                "tr.woocommerce-product-attributes-item--attribute_pa_ww-category td",
                "table.woocommerce-product-attributes tr:nth-child(3) td",
                "tr.woocommerce-product-attributes-item--attribute_pa_ww-category td p",
                "table.woocommerce-product-attributes tbody tr:nth-child(3) td",
                "tr[class*='ww-category'] td",
                "table.shop_attributes tr:nth-child(3) td",
            ]),
        }
    }
}

/// 出力先
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub links: PathBuf,
    pub snapshot: PathBuf,
    pub csv: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            links: PathBuf::from("wine_links.txt"),
            snapshot: PathBuf::from("wine_links_final.json"),
            csv: PathBuf::from("wine_products.csv"),
        }
    }
}
