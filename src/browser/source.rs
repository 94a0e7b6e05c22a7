use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ScraperError;
use crate::selector::{Selector, SelectorKind};
use crate::traits::PageSource;

use super::types::{BrowserOptions, POLL_INTERVAL, USER_AGENTS};

/// ブラウザ1つ・タブ1つの PageSource
pub struct ChromiumPageSource {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    options: BrowserOptions,
    closed: bool,
}

impl ChromiumPageSource {
    /// ブラウザを起動して空のタブを開く
    pub async fn launch(options: BrowserOptions) -> Result<Self, ScraperError> {
        info!("Initializing browser...");

        // 同時起動でプロファイルが衝突しないようにする
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("wine-scraper-{}", unique_id));

        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(random_user_agent);
        debug!("Using User-Agent: {}", user_agent);

        let (width, height) = options.window_size;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .user_data_dir(&user_data_dir);

        if let Ok(chrome_path) =
            std::env::var("CHROME_PATH").or_else(|_| std::env::var("CHROMIUM_PATH"))
        {
            builder = builder.chrome_executable(chrome_path);
        }

        if !options.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(options.page_load_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", user_agent));

        if options.disable_images {
            builder = builder.arg("--blink-settings=imagesEnabled=false");
        }

        if options.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {:?}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        info!("Browser initialized successfully");
        Ok(Self {
            browser,
            page,
            handler,
            options,
            closed: false,
        })
    }

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| ScraperError::load(url, e))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| ScraperError::load(url, e))?;
            Ok::<(), ScraperError>(())
        };

        match tokio::time::timeout(self.options.page_load_timeout, navigation).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScraperError::load(
                    url,
                    format!(
                        "{}秒以内に読み込みが完了しませんでした",
                        self.options.page_load_timeout.as_secs()
                    ),
                ))
            }
        }

        self.wait_for_body(url).await
    }

    async fn wait_for_body(&self, url: &str) -> Result<(), ScraperError> {
        let deadline = Instant::now() + self.options.body_timeout;
        loop {
            if self.page.find_element("body").await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::load(url, "body 待機のタイムアウト"));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn log_screenshot(&self, url: &str) {
        match self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("Screenshot of {}: data:image/png;base64,{}", url, encoded);
            }
            Err(e) => debug!("Failed to capture screenshot: {}", e),
        }
    }

    /// 1回だけ問い合わせる。見つからなければ None
    async fn query_first(
        &self,
        scope: Option<&Element>,
        selector: &Selector,
    ) -> Result<Option<Element>, ScraperError> {
        let found = match (scope, selector.kind()) {
            (None, SelectorKind::Path) => self.page.find_xpath(selector.pattern()).await,
            (None, SelectorKind::Simple) => self.page.find_element(selector.pattern()).await,
            (Some(element), SelectorKind::Simple) => {
                element.find_element(selector.pattern()).await
            }
            (Some(_), SelectorKind::Path) => return Err(scoped_path(selector)),
        };
        Ok(found.ok())
    }
}

fn random_user_agent() -> String {
    USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())].to_string()
}

fn scoped_path(selector: &Selector) -> ScraperError {
    ScraperError::UnsupportedSelector(format!("要素内でのパス検索: {}", selector))
}

#[async_trait]
impl PageSource for ChromiumPageSource {
    type Element = Element;

    async fn load(&self, url: &str) -> Result<(), ScraperError> {
        debug!("Loading page: {}", url);
        let result = self.navigate(url).await;
        if let Err(e) = &result {
            warn!("Failed to load {}: {}", url, e);
            if self.options.debug {
                self.log_screenshot(url).await;
            }
        }
        result
    }

    async fn find_first(
        &self,
        scope: Option<&Element>,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<Element>, ScraperError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.query_first(scope, selector).await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_all(
        &self,
        scope: Option<&Element>,
        selector: &Selector,
    ) -> Result<Vec<Element>, ScraperError> {
        let found = match (scope, selector.kind()) {
            (None, SelectorKind::Path) => self.page.find_xpaths(selector.pattern()).await,
            (None, SelectorKind::Simple) => self.page.find_elements(selector.pattern()).await,
            (Some(element), SelectorKind::Simple) => {
                element.find_elements(selector.pattern()).await
            }
            (Some(_), SelectorKind::Path) => return Err(scoped_path(selector)),
        };
        found.map_err(|e| ScraperError::JavaScript(format!("{}: {}", selector, e)))
    }

    async fn click(&self, element: &Element) -> Result<(), ScraperError> {
        // オーバーレイに遮られてもクリックできるようスクリプトで実行
        element
            .call_js_fn(
                "function() { this.scrollIntoView({block: 'center'}); this.click(); }",
                false,
            )
            .await
            .map_err(|e| ScraperError::Interaction(e.to_string()))?;
        Ok(())
    }

    async fn text(&self, element: &Element) -> Result<String, ScraperError> {
        let text = element
            .inner_text()
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, ScraperError> {
        element
            .attribute(name)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!("Closing browser...");

        if let Err(e) = self.page.clone().close().await {
            debug!("Failed to close page: {}", e);
        }
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ終了エラー: {}", e)));
        if let Err(e) = self.browser.wait().await {
            debug!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
        result
    }
}
