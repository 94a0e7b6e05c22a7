//! セレクタとセレクタカスケード
//!
//! 優先順に並んだセレクタを順に試し、最初に空でないテキスト（または要素）が
//! 得られたものを採用する。個々のセレクタの失敗は debug ログに留める。

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::traits::PageSource;

/// クエリ構文の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// XPath（先頭が `/`）
    Path,
    /// CSSセレクタ
    Simple,
}

/// 1つのセレクタ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Selector {
    kind: SelectorKind,
    pattern: String,
}

impl Selector {
    /// パターンの先頭文字で構文を判定して作成
    pub fn parse(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let kind = if pattern.trim_start().starts_with('/') {
            SelectorKind::Path
        } else {
            SelectorKind::Simple
        };
        Self { kind, pattern }
    }

    pub fn kind(&self) -> SelectorKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_path(&self) -> bool {
        self.kind == SelectorKind::Path
    }
}

impl From<String> for Selector {
    fn from(pattern: String) -> Self {
        Selector::parse(pattern)
    }
}

impl From<&str> for Selector {
    fn from(pattern: &str) -> Self {
        Selector::parse(pattern)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.pattern
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// 文字列リストからセレクタ列を作る
pub fn selectors<I, S>(patterns: I) -> Vec<Selector>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    patterns.into_iter().map(Selector::parse).collect()
}

/// 優先順セレクタの評価器
#[derive(Debug, Clone, Copy)]
pub struct SelectorCascade<'a> {
    selectors: &'a [Selector],
    timeout: Duration,
}

impl<'a> SelectorCascade<'a> {
    pub fn new(selectors: &'a [Selector], timeout: Duration) -> Self {
        Self { selectors, timeout }
    }

    /// 最初に見つかった要素のトリム済みテキスト（空文字は不一致扱い）
    pub async fn text<S: PageSource>(
        &self,
        source: &S,
        scope: Option<&S::Element>,
    ) -> Option<String> {
        for selector in self.selectors {
            let element = match source.find_first(scope, selector, self.timeout).await {
                Ok(Some(element)) => element,
                Ok(None) => {
                    debug!("Selector {} matched nothing", selector);
                    continue;
                }
                Err(e) => {
                    debug!("Selector {} failed: {}", selector, e);
                    continue;
                }
            };

            match source.text(&element).await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        return Some(text.to_string());
                    }
                    debug!("Selector {} matched an empty element", selector);
                }
                Err(e) => debug!("Reading text for {} failed: {}", selector, e),
            }
        }
        None
    }

    /// 最初に見つかった要素そのもの
    pub async fn element<S: PageSource>(
        &self,
        source: &S,
        scope: Option<&S::Element>,
    ) -> Option<(S::Element, &'a Selector)> {
        for selector in self.selectors {
            match source.find_first(scope, selector, self.timeout).await {
                Ok(Some(element)) => return Some((element, selector)),
                Ok(None) => debug!("Selector {} matched nothing", selector),
                Err(e) => debug!("Selector {} failed: {}", selector, e),
            }
        }
        None
    }
}
