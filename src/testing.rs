//! テスト用の PageSource 実装
//!
//! ページを「セレクタ文字列 → 要素列」の表として持つ。クリックでページ遷移する
//! リンクや、読み込み失敗を仕込める。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::selector::Selector;
use crate::traits::PageSource;

#[derive(Debug, Clone, Default)]
pub struct FixtureElement {
    text: String,
    attributes: HashMap<String, String>,
    children: HashMap<String, Vec<FixtureElement>>,
    navigates_to: Option<String>,
    click_fails: bool,
}

impl FixtureElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// href 属性付きのアンカー
    pub fn link(href: &str) -> Self {
        Self::default().with_attr("href", href)
    }

    /// `a` を子に持つ商品アイテム
    pub fn item(href: &str) -> Self {
        Self::default().with_child("a", Self::link(href))
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, selector: &str, child: FixtureElement) -> Self {
        self.children
            .entry(selector.to_string())
            .or_default()
            .push(child);
        self
    }

    pub fn navigates_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_string());
        self
    }

    pub fn click_fails(mut self) -> Self {
        self.click_fails = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    elements: HashMap<String, Vec<FixtureElement>>,
    failing: HashSet<String>,
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: &str, element: FixtureElement) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    /// このセレクタの評価をエラーにする
    pub fn failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }
}

/// テスト側から観測する操作履歴
#[derive(Debug, Default)]
pub struct FixtureLog {
    loads: Mutex<Vec<String>>,
    clicks: Mutex<usize>,
    closed: AtomicBool,
}

impl FixtureLog {
    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> usize {
        *self.clicks.lock().unwrap()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct FixtureSource {
    pages: HashMap<String, FixturePage>,
    /// URL → 残り失敗回数
    failing_loads: Mutex<HashMap<String, u32>>,
    current: Mutex<Option<String>>,
    log: Arc<FixtureLog>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: FixturePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// 読み込みを `times` 回失敗させる
    pub fn failing_load(self, url: &str, times: u32) -> Self {
        self.failing_loads
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    /// 読み込み履歴を残さずに現在ページを切り替える
    pub fn open(&self, url: &str) {
        *self.current.lock().unwrap() = Some(url.to_string());
    }

    pub fn log(&self) -> Arc<FixtureLog> {
        Arc::clone(&self.log)
    }

    fn lookup(
        &self,
        scope: Option<&FixtureElement>,
        selector: &Selector,
    ) -> Result<Vec<FixtureElement>, ScraperError> {
        let pattern = selector.pattern();
        if let Some(element) = scope {
            return Ok(element.children.get(pattern).cloned().unwrap_or_default());
        }

        let current = self.current.lock().unwrap().clone();
        let Some(page) = current.and_then(|url| self.pages.get(&url)) else {
            return Ok(Vec::new());
        };
        if page.failing.contains(pattern) {
            return Err(ScraperError::JavaScript(format!("invalid selector {}", pattern)));
        }
        Ok(page.elements.get(pattern).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PageSource for FixtureSource {
    type Element = FixtureElement;

    async fn load(&self, url: &str) -> Result<(), ScraperError> {
        self.log.loads.lock().unwrap().push(url.to_string());

        if let Some(remaining) = self.failing_loads.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScraperError::load(url, "connection reset"));
            }
        }
        if !self.pages.contains_key(url) {
            return Err(ScraperError::load(url, "not found"));
        }
        self.open(url);
        Ok(())
    }

    async fn find_first(
        &self,
        scope: Option<&FixtureElement>,
        selector: &Selector,
        _timeout: Duration,
    ) -> Result<Option<FixtureElement>, ScraperError> {
        Ok(self.lookup(scope, selector)?.into_iter().next())
    }

    async fn find_all(
        &self,
        scope: Option<&FixtureElement>,
        selector: &Selector,
    ) -> Result<Vec<FixtureElement>, ScraperError> {
        self.lookup(scope, selector)
    }

    async fn click(&self, element: &FixtureElement) -> Result<(), ScraperError> {
        *self.log.clicks.lock().unwrap() += 1;
        if element.click_fails {
            return Err(ScraperError::Interaction("element detached".into()));
        }
        if let Some(url) = &element.navigates_to {
            self.open(url);
        }
        Ok(())
    }

    async fn text(&self, element: &FixtureElement) -> Result<String, ScraperError> {
        Ok(element.text.clone())
    }

    async fn attribute(
        &self,
        element: &FixtureElement,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        Ok(element.attributes.get(name).cloned())
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.log.closed.store(true, Ordering::SeqCst);
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}
