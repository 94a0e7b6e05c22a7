//! ランダム待機とリトライ

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::ScraperError;

/// 設定できる待機・タイムアウトの上限（秒）
pub const MAX_WAIT_SECS: f64 = 3600.0;

/// 負値・NaN は 0、無限大や巨大値は上限に丸める
pub(crate) fn clamp_secs(secs: f64) -> f64 {
    secs.max(0.0).min(MAX_WAIT_SECS)
}

/// 秒数が有限かつ 0..=MAX_WAIT_SECS か
pub(crate) fn check_secs(name: &str, secs: f64) -> Result<(), ScraperError> {
    if secs.is_finite() && (0.0..=MAX_WAIT_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ScraperError::Config(format!(
            "{} must be between 0 and {} seconds: {}",
            name, MAX_WAIT_SECS, secs
        )))
    }
}

/// 待機時間の範囲（秒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange::new(0.0, 0.0);

    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn validate(&self, name: &str) -> Result<(), ScraperError> {
        check_secs(&format!("{}.min_secs", name), self.min_secs)?;
        check_secs(&format!("{}.max_secs", name), self.max_secs)
    }

    /// 範囲内のランダムな時間
    pub fn sample(&self) -> Duration {
        let min = clamp_secs(self.min_secs);
        let max = clamp_secs(self.max_secs);
        let secs = if max > min {
            rand::rng().random_range(min..max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }

    /// ランダム時間だけ待機
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// 明示的なリトライ方針
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: DelayRange::new(2.0, 5.0),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: DelayRange) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// リトライ可能なエラーの間は操作を繰り返す
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let attempts = self.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let backoff = self.backoff.sample();
                    warn!("{} attempt {} failed: {}", label, attempt, e);
                    info!("Retrying in {:.1}s...", backoff.as_secs_f64());
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!("{}: all {} attempts failed", label, attempts);
                    }
                    return Err(e);
                }
            }
        }
    }
}
