//! 一覧ページのページ送り巡回
//!
//! トップページ読み込み → ポップアップ処理 → ワイン一覧へ遷移 → リンク収集と
//! 次ページ遷移を繰り返す。終了状態に関わらず最後に PageSource を閉じる。

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::links::{LinkCollector, LinkSet, LinkStats};
use crate::selector::{Selector, SelectorCascade};
use crate::traits::PageSource;

/// 巡回の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    LoadingBase,
    HandlingInterstitials,
    NavigatingToSection,
    ScrapingPage,
    Advancing,
    Done,
    Failed,
}

impl WalkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WalkState::Done | WalkState::Failed)
    }
}

/// 終了理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// 次ページがなくなった
    Exhausted,
    /// ページ上限に達した
    PageLimit,
    /// 連続失敗が上限に達した
    FailureBudget,
    /// 必須ステップの失敗
    Failed(String),
    /// 外部からの中断
    Interrupted,
}

/// 巡回中の状態（巡回ごとに作り直す）
#[derive(Debug)]
pub struct TraversalState {
    pub current_page: u32,
    pub page_limit: u32,
    pub collected: LinkSet,
    pub consecutive_failures: u32,
    state: WalkState,
    termination: Option<Termination>,
    pages_scraped: u32,
    links_seen: usize,
}

impl TraversalState {
    fn new(config: &ScraperConfig) -> Self {
        Self {
            current_page: 1,
            page_limit: config.page_limit,
            collected: LinkSet::new(config.base_url.clone()),
            consecutive_failures: 0,
            state: WalkState::LoadingBase,
            termination: None,
            pages_scraped: 0,
            links_seen: 0,
        }
    }

    fn finish(&mut self, termination: Termination) -> WalkState {
        self.termination = Some(termination);
        WalkState::Done
    }

    fn fail(&mut self, reason: String) -> WalkState {
        error!("{}", reason);
        self.termination = Some(Termination::Failed(reason));
        WalkState::Failed
    }
}

/// 巡回結果
#[derive(Debug, Clone)]
pub struct WalkReport {
    /// 重複なし・発見順
    pub links: Vec<String>,
    pub pages_scraped: u32,
    pub termination: Termination,
    pub stats: LinkStats,
}

/// ページ送りしながら商品リンクを集める
pub struct PaginationWalker<S: PageSource> {
    source: S,
    collector: LinkCollector,
    config: ScraperConfig,
}

impl<S: PageSource> PaginationWalker<S> {
    pub fn new(source: S, config: ScraperConfig) -> Self {
        let collector = LinkCollector::new(
            config.base_url.clone(),
            config.selectors.product_items.clone(),
            config.selectors.product_links.clone(),
        );
        Self {
            source,
            collector,
            config,
        }
    }

    /// Ctrl-C で中断できる巡回
    pub async fn walk(self) -> WalkReport {
        self.walk_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// `shutdown` が完了した時点で中断する巡回
    pub async fn walk_until<F>(mut self, shutdown: F) -> WalkReport
    where
        F: Future<Output = ()>,
    {
        info!("Starting wine link scraping process...");
        let mut traversal = TraversalState::new(&self.config);

        tokio::select! {
            biased;
            _ = shutdown => warn!("Scraping interrupted by user"),
            _ = self.traverse(&mut traversal) => {}
        }

        match self.source.close().await {
            Ok(()) => info!("Page source closed"),
            Err(e) => warn!("Error closing page source: {}", e),
        }

        let stats = LinkStats::new(traversal.links_seen, traversal.collected.len());
        let termination = traversal
            .termination
            .take()
            .unwrap_or(Termination::Interrupted);
        info!(
            "Scraping finished ({:?}). Total links collected: {}",
            termination,
            traversal.collected.len()
        );

        WalkReport {
            links: traversal.collected.into_vec(),
            pages_scraped: traversal.pages_scraped,
            termination,
            stats,
        }
    }

    async fn traverse(&self, traversal: &mut TraversalState) {
        while !traversal.state.is_terminal() {
            debug!("Walk state: {:?}", traversal.state);
            traversal.state = self.step(traversal).await;
        }
    }

    async fn step(&self, t: &mut TraversalState) -> WalkState {
        let state = t.state;
        match state {
            WalkState::LoadingBase => match self.load(&self.config.base_url).await {
                Ok(()) => WalkState::HandlingInterstitials,
                Err(e) => t.fail(format!("Failed to load base page: {}", e)),
            },
            WalkState::HandlingInterstitials => match self.handle_interstitials().await {
                Ok(()) => WalkState::NavigatingToSection,
                Err(e) => t.fail(format!("Failed to handle popups: {}", e)),
            },
            WalkState::NavigatingToSection => match self.navigate_to_section().await {
                Ok(()) => {
                    info!("Starting pagination...");
                    WalkState::ScrapingPage
                }
                Err(e) => t.fail(format!("Failed to navigate to wine section: {}", e)),
            },
            WalkState::ScrapingPage => {
                self.scrape_page(t).await;
                WalkState::Advancing
            }
            WalkState::Advancing => self.advance(t).await,
            WalkState::Done | WalkState::Failed => state,
        }
    }

    /// リトライ付き読み込み＋ランダム待機
    async fn load(&self, url: &str) -> Result<(), ScraperError> {
        info!("Loading: {}", url);
        self.config
            .retry
            .run("Page load", || self.source.load(url))
            .await?;
        self.config.delays.request.pause().await;
        Ok(())
    }

    async fn handle_interstitials(&self) -> Result<(), ScraperError> {
        self.dismiss(
            "age verification popup",
            &self.config.selectors.age_gate,
            self.config.long_timeout(),
        )
        .await?;
        self.dismiss(
            "promotional popup",
            &self.config.selectors.promo_close,
            self.config.element_timeout(),
        )
        .await
    }

    /// 表示されていれば閉じる。表示されていないのは正常
    async fn dismiss(
        &self,
        name: &str,
        selectors: &[Selector],
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let cascade = SelectorCascade::new(selectors, timeout);
        let Some((button, _)) = cascade.element(&self.source, None).await else {
            info!("No {} found", name);
            return Ok(());
        };

        self.source.click(&button).await.map_err(|e| {
            warn!("Error handling {}: {}", name, e);
            e
        })?;
        info!("Closed {}", name);
        self.config.delays.interstitial.pause().await;
        Ok(())
    }

    async fn navigate_to_section(&self) -> Result<(), ScraperError> {
        let cascade =
            SelectorCascade::new(&self.config.selectors.section, self.config.long_timeout());
        let (link, _) = cascade
            .element(&self.source, None)
            .await
            .ok_or_else(|| ScraperError::ElementNotFound("wine section link".into()))?;

        self.source.click(&link).await?;
        info!("Successfully navigated to wine section");
        self.config.delays.section.pause().await;
        Ok(())
    }

    async fn scrape_page(&self, t: &mut TraversalState) {
        info!("Scraping page {}...", t.current_page);
        let page_links = self.collector.collect(&self.source).await;
        t.pages_scraped += 1;
        t.links_seen += page_links.len();

        if page_links.is_empty() {
            // 一時的な描画不良の可能性があるので次ページは試す
            warn!("No links found on page {}", t.current_page);
            t.consecutive_failures += 1;
            return;
        }

        let added = t.collected.extend(&page_links);
        t.consecutive_failures = 0;
        info!(
            "Page {}: Found {} links ({} new). Total: {}",
            t.current_page,
            page_links.len(),
            added,
            t.collected.len()
        );
    }

    async fn advance(&self, t: &mut TraversalState) -> WalkState {
        if self.over_budget(t) {
            error!(
                "{} consecutive failures, giving up at page {}",
                t.consecutive_failures, t.current_page
            );
            return t.finish(Termination::FailureBudget);
        }

        self.config.delays.before_next.pause().await;

        let cascade =
            SelectorCascade::new(&self.config.selectors.next_page, self.config.element_timeout());
        let Some((next, selector)) = cascade.element(&self.source, None).await else {
            info!("No next button found - reached end of pagination");
            return t.finish(Termination::Exhausted);
        };
        debug!("Found next button with selector: {}", selector);

        if let Err(e) = self.source.click(&next).await {
            error!("Error on page {}: {}", t.current_page, e);
            t.consecutive_failures += 1;
            if self.over_budget(t) {
                return t.finish(Termination::FailureBudget);
            }

            // テンプレートURLで直接次ページを開く
            let url = self.config.category_page_url(t.current_page + 1);
            if let Err(e) = self.load(&url).await {
                warn!("Could not open page {} directly: {}", t.current_page + 1, e);
                return WalkState::Advancing;
            }
        } else {
            info!("Clicked next button, moving to page {}", t.current_page + 1);
            self.config.delays.after_next.pause().await;
        }

        t.current_page += 1;
        if t.current_page > t.page_limit {
            info!("Reached page limit of {}", t.page_limit);
            return t.finish(Termination::PageLimit);
        }
        WalkState::ScrapingPage
    }

    fn over_budget(&self, t: &TraversalState) -> bool {
        t.consecutive_failures >= self.config.failure_budget.max(1)
    }
}
