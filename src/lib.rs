//! ワインショップ用スクレイパーライブラリ
//!
//! - 一覧ページをページ送りしながら商品リンクを収集
//! - 商品ページから7項目（タイトル・価格・説明・産地・重量・容量・種類）を抽出
//! - 容量・種類はページに無ければタイトルや説明のキーワードから推定
//!
//! ブラウザ操作は [`PageSource`] に抽象化されており、巡回・抽出のロジックは
//! Chromium なしでテストできる。
//!
//! # 使用例
//!
//! ```rust,ignore
//! use wine_scraper::{ScrapeMode, ScrapeRequest, ScraperConfig, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new(ScraperConfig::default())
//!         .with_mode(ScrapeMode::Full)
//!         .with_page_limit(3)
//!         .with_headless(false);
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("links: {}, products: {}", result.links.len(), result.records().len());
//! }
//! ```

pub mod batch;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod inference;
pub mod links;
pub mod output;
pub mod record;
pub mod retry;
pub mod selector;
pub mod service;
pub mod traits;
pub mod walker;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use batch::{BatchReport, BatchScrapeOrchestrator};
pub use browser::{BrowserOptions, ChromiumPageSource};
pub use config::ScraperConfig;
pub use error::ScraperError;
pub use extract::ProductFieldExtractor;
pub use inference::FieldInference;
pub use links::{LinkCollector, LinkSet, LinkStats};
pub use output::{CsvSink, RecordSink};
pub use record::ProductRecord;
pub use retry::{DelayRange, RetryPolicy};
pub use selector::{Selector, SelectorCascade};
pub use service::{ScrapeMode, ScrapeRequest, ScrapeResult, ScraperService};
pub use traits::PageSource;
pub use walker::{PaginationWalker, Termination, WalkReport};
