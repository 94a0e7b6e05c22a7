//! Chromium による PageSource 実装
//!
//! chromiumoxide で Chrome/Chromium を起動し、1タブを使い回して
//! ページ読み込みと要素操作を行う。

mod source;
mod types;

pub use source::ChromiumPageSource;
pub use types::{BrowserOptions, USER_AGENTS};
