//! 商品URL一覧の一括スクレイプ

use std::future::Future;

use tracing::{error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::extract::ProductFieldExtractor;
use crate::output::RecordSink;
use crate::record::ProductRecord;
use crate::retry::{DelayRange, RetryPolicy};
use crate::traits::PageSource;

/// 一括スクレイプの結果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// 成功分（入力順）
    pub records: Vec<ProductRecord>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_urls: Vec<String>,
    /// 出力先に書き出したか
    pub persisted: bool,
    pub interrupted: bool,
}

/// URLごとに読み込み → 抽出を行う
pub struct BatchScrapeOrchestrator<S: PageSource> {
    source: S,
    extractor: ProductFieldExtractor,
    retry: RetryPolicy,
    delay: DelayRange,
    sink: Option<Box<dyn RecordSink>>,
}

impl<S: PageSource> BatchScrapeOrchestrator<S> {
    pub fn new(source: S, config: &ScraperConfig) -> Self {
        let extractor = ProductFieldExtractor::new(
            config.selectors.clone(),
            config.inference(),
            config.element_timeout(),
        );
        Self {
            source,
            extractor,
            retry: config.retry,
            delay: config.delays.request,
            sink: None,
        }
    }

    /// 成功分の書き出し先を設定
    pub fn with_sink(mut self, sink: impl RecordSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Ctrl-C で中断できる一括スクレイプ
    pub async fn run(self, urls: &[String]) -> BatchReport {
        self.run_until(urls, async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    pub async fn run_until<F>(mut self, urls: &[String], shutdown: F) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        let mut report = BatchReport::default();

        tokio::select! {
            biased;
            _ = shutdown => {
                warn!("Data scraping interrupted by user");
                report.interrupted = true;
            }
            _ = self.scrape_all(urls, &mut report) => {}
        }

        if let Err(e) = self.source.close().await {
            warn!("Error closing page source: {}", e);
        }

        info!(
            "Attempted {} products, succeeded {}",
            report.attempted, report.succeeded
        );

        if report.records.is_empty() {
            warn!("Data scraping unsuccessful!");
            return report;
        }

        if let Some(sink) = &self.sink {
            match sink.write_records(&report.records) {
                Ok(written) => {
                    report.persisted = written;
                    info!(
                        "Scraping completed. {} products saved to {}",
                        report.records.len(),
                        sink.destination()
                    );
                }
                Err(e) => error!("Error saving to {}: {}", sink.destination(), e),
            }
        }
        report
    }

    async fn scrape_all(&self, urls: &[String], report: &mut BatchReport) {
        if urls.is_empty() {
            error!("No URLs to scrape!");
            return;
        }

        for (i, url) in urls.iter().enumerate() {
            info!("Scraping product {}/{}: {}", i + 1, urls.len(), url);
            report.attempted += 1;

            match self.scrape_product(url).await {
                Ok(record) => {
                    info!("Successfully scraped: {}", record.title);
                    report.records.push(record);
                    report.succeeded += 1;
                }
                Err(e) => {
                    error!("Error scraping {}: {}", url, e);
                    report.failed_urls.push(url.clone());
                }
            }

            if i + 1 < urls.len() {
                self.delay.pause().await;
            }
        }
    }

    async fn scrape_product(&self, url: &str) -> Result<ProductRecord, ScraperError> {
        self.retry
            .run("Product page load", || self.source.load(url))
            .await?;
        Ok(self.extractor.extract(&self.source).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Delays;
    use crate::testing::{FixtureElement, FixturePage, FixtureSource};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MemorySink(Arc<Mutex<Vec<ProductRecord>>>);

    impl RecordSink for MemorySink {
        fn write_records(&self, records: &[ProductRecord]) -> Result<bool, ScraperError> {
            self.0.lock().unwrap().extend_from_slice(records);
            Ok(true)
        }

        fn destination(&self) -> String {
            "memory".to_string()
        }
    }

    fn config() -> ScraperConfig {
        ScraperConfig::default()
            .with_delays(Delays::none())
            .with_retry(RetryPolicy::new(3, DelayRange::ZERO))
            .with_element_timeout(Duration::ZERO)
    }

    fn product_page(title: &str) -> FixturePage {
        FixturePage::new()
            .with("h1.product_title", FixtureElement::text(title))
            .with("p.price bdi", FixtureElement::text("Rs. 3,000.00"))
    }

    fn urls(slugs: &[&str]) -> Vec<String> {
        slugs
            .iter()
            .map(|s| format!("https://wineworld.lk/product/{}/", s))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_load_is_skipped() {
        let urls = urls(&["merlot", "broken", "prosecco"]);
        let source = FixtureSource::new()
            .with_page(&urls[0], product_page("Yellow Tail Merlot"))
            .with_page(&urls[1], product_page("Never Loaded"))
            .with_page(&urls[2], product_page("Mionetto Prosecco"))
            .failing_load(&urls[1], 3);
        let log = source.log();
        let sink = MemorySink::default();

        let report = BatchScrapeOrchestrator::new(source, &config())
            .with_sink(sink.clone())
            .run_until(&urls, std::future::pending())
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].title, "Yellow Tail Merlot");
        assert_eq!(report.records[0].category, "Red Wine");
        assert_eq!(report.records[1].title, "Mionetto Prosecco");
        assert_eq!(report.failed_urls, vec![urls[1].clone()]);
        assert!(report.persisted);
        assert_eq!(sink.0.lock().unwrap().len(), 2);
        assert!(log.closed());
    }

    #[tokio::test]
    async fn test_nothing_persisted_when_all_fail() {
        let urls = urls(&["a", "b"]);
        let sink = MemorySink::default();

        let report = BatchScrapeOrchestrator::new(FixtureSource::new(), &config())
            .with_sink(sink.clone())
            .run_until(&urls, std::future::pending())
            .await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 0);
        assert!(report.records.is_empty());
        assert!(!report.persisted);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_url_list() {
        let report = BatchScrapeOrchestrator::new(FixtureSource::new(), &config())
            .run_until(&[], std::future::pending())
            .await;

        assert_eq!(report.attempted, 0);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_closes_source() {
        let urls = urls(&["a"]);
        let source = FixtureSource::new().with_page(&urls[0], product_page("A"));
        let log = source.log();

        let report = BatchScrapeOrchestrator::new(source, &config())
            .run_until(&urls, async {})
            .await;

        assert!(report.interrupted);
        assert_eq!(report.attempted, 0);
        assert!(log.closed());
    }
}
