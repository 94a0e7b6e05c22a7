use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("ページ読み込みエラー: {url}: {message}")]
    Load { url: String, message: String },

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("操作エラー: {0}")]
    Interaction(String),

    #[error("JavaScriptエラー: {0}")]
    JavaScript(String),

    #[error("未対応のセレクタ: {0}")]
    UnsupportedSelector(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("CSV出力エラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON出力エラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

impl ScraperError {
    /// リトライで回復しうるエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScraperError::Load { .. } | ScraperError::Navigation(_) | ScraperError::Timeout(_)
        )
    }

    pub(crate) fn load(url: impl Into<String>, message: impl ToString) -> Self {
        ScraperError::Load {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ScraperError::load("https://example.com", "timeout").is_retryable());
        assert!(ScraperError::Timeout("body".into()).is_retryable());
        assert!(!ScraperError::ElementNotFound("next".into()).is_retryable());
        assert!(!ScraperError::Config("bad".into()).is_retryable());
    }
}
