use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{info, warn};

use crate::batch::{BatchReport, BatchScrapeOrchestrator};
use crate::browser::{BrowserOptions, ChromiumPageSource};
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::links::LinkSet;
use crate::output::{save_links, save_links_snapshot, CsvSink};
use crate::record::ProductRecord;
use crate::walker::{PaginationWalker, Termination, WalkReport};

/// 実行する処理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrapeMode {
    /// リンク収集のみ
    Links,
    /// 既知のリンクから商品データを取得
    Products,
    /// リンク収集 → 商品データ取得
    #[default]
    Full,
}

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub config: ScraperConfig,
    pub mode: ScrapeMode,
    /// 以前の実行で集めたリンク（resume 時、または Products の入力）
    pub known_links: Vec<String>,
}

impl ScrapeRequest {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            mode: ScrapeMode::default(),
            known_links: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ScrapeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.config.page_limit = page_limit;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn with_links_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.links = path.into();
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.snapshot = path.into();
        self
    }

    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.csv = path.into();
        self
    }

    pub fn with_known_links(mut self, links: Vec<String>) -> Self {
        self.known_links = links;
        self
    }
}

/// スクレイピング結果
#[derive(Debug, Clone, Default)]
pub struct ScrapeResult {
    /// 重複なしのリンク（既知のリンクが先頭）
    pub links: Vec<String>,
    pub walk: Option<WalkReport>,
    pub batch: Option<BatchReport>,
}

impl ScrapeResult {
    pub fn records(&self) -> &[ProductRecord] {
        self.batch
            .as_ref()
            .map(|batch| batch.records.as_slice())
            .unwrap_or_default()
    }
}

/// 既知のリンクの後ろに巡回結果を重複なしで連結し、リンクファイルとスナップショットに保存
///
/// 1件もなければ既存のファイルには触れない。
pub fn persist_links(
    config: &ScraperConfig,
    known_links: &[String],
    report: &WalkReport,
) -> Result<Vec<String>, ScraperError> {
    let mut merged = LinkSet::new(config.base_url.clone());
    merged.extend(known_links);
    let added = merged.extend(&report.links);
    if !known_links.is_empty() {
        info!(
            "Resumed from {} known links, {} new links added",
            known_links.len(),
            added
        );
    }

    let links = merged.into_vec();
    if links.is_empty() {
        warn!(
            "No links collected; keeping existing {:?}",
            config.output.links
        );
        return Ok(links);
    }
    save_links(&config.output.links, &links)?;
    save_links_snapshot(&config.output.snapshot, &links)?;
    Ok(links)
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// リンク収集と商品取得はそれぞれ別のブラウザセッションで行う。
#[derive(Debug, Clone, Default)]
pub struct ScraperService;

impl ScraperService {
    pub fn new() -> Self {
        Self
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!(
            "スクレイピングリクエスト受信: mode={:?}, page_limit={}, known_links={}",
            req.mode,
            req.config.page_limit,
            req.known_links.len()
        );

        Box::pin(async move {
            let ScrapeRequest {
                config,
                mode,
                known_links,
            } = req;
            let mut result = ScrapeResult::default();

            if mode == ScrapeMode::Products {
                result.links = known_links;
            } else {
                let source = ChromiumPageSource::launch(BrowserOptions::from(&config)).await?;
                let report = PaginationWalker::new(source, config.clone()).walk().await;
                report.stats.log();
                result.links = persist_links(&config, &known_links, &report)?;
                let interrupted = report.termination == Termination::Interrupted;
                result.walk = Some(report);

                if interrupted && mode == ScrapeMode::Full {
                    warn!("Link collection interrupted; skipping product scraping");
                    return Ok(result);
                }
            }

            if mode == ScrapeMode::Links {
                return Ok(result);
            }
            if result.links.is_empty() {
                warn!("No links to scrape products from");
                return Ok(result);
            }

            let source = ChromiumPageSource::launch(BrowserOptions::from(&config)).await?;
            let batch = BatchScrapeOrchestrator::new(source, &config)
                .with_sink(CsvSink::new(config.output.csv.clone()))
                .run(&result.links)
                .await;

            info!(
                "スクレイピング完了: links={}, products={}/{}",
                result.links.len(),
                batch.succeeded,
                batch.attempted
            );
            result.batch = Some(batch);
            Ok(result)
        })
    }
}
