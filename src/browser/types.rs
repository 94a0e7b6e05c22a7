//! ブラウザ起動オプション

use std::time::Duration;

use crate::config::ScraperConfig;

/// 起動ごとにランダムに選ぶ User-Agent
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// 要素待機時のポーリング間隔
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// ChromiumPageSource の起動設定
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// 読み込み失敗時にスクリーンショットをログ出力
    pub debug: bool,
    pub window_size: (u32, u32),
    /// None なら USER_AGENTS から選ぶ
    pub user_agent: Option<String>,
    pub page_load_timeout: Duration,
    /// 読み込み後の body 待機
    pub body_timeout: Duration,
    pub disable_images: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            debug: false,
            window_size: (1920, 1080),
            user_agent: None,
            page_load_timeout: Duration::from_secs(60),
            body_timeout: Duration::from_secs(20),
            disable_images: true,
        }
    }
}

impl From<&ScraperConfig> for BrowserOptions {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            headless: config.headless,
            debug: config.debug,
            page_load_timeout: config.page_load_timeout(),
            body_timeout: config.long_timeout(),
            ..Default::default()
        }
    }
}
