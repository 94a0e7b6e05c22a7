use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::selector::Selector;

/// ページ操作の抽象（ブラウザ自動化層が実装する）
#[async_trait]
pub trait PageSource: Send + Sync {
    /// 要素ハンドル
    type Element: Send + Sync;

    /// URLを1回だけ読み込む（リトライは呼び出し側の RetryPolicy で行う）
    async fn load(&self, url: &str) -> Result<(), ScraperError>;

    /// 要素が現れるまで最大 `timeout` 待機し、最初の一致を返す
    ///
    /// `scope` を渡すとその要素の子孫だけを対象にする。
    async fn find_first(
        &self,
        scope: Option<&Self::Element>,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<Self::Element>, ScraperError>;

    /// 一致する要素をすべて返す（待機なし、空もありうる）
    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>, ScraperError>;

    /// スクリプト経由でクリック
    async fn click(&self, element: &Self::Element) -> Result<(), ScraperError>;

    /// 要素のテキスト
    async fn text(&self, element: &Self::Element) -> Result<String, ScraperError>;

    /// 要素の属性値
    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;
}
