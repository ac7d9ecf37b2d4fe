//! 重试策略
//!
//! 对单次服务调用做有界的指数退避重试，终止性错误立即返回

use std::future::Future;
use std::time::Duration;

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 指数退避重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            constants::DEFAULT_RETRY_BASE_DELAY,
            constants::DEFAULT_RETRY_MAX_DELAY,
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// 第 `attempt` 次（从 1 开始）失败后的退避时间：`base * 2^(attempt-1)`，不超过上限
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// 结合服务端提示的实际等待时间，提示只会延长等待
    pub fn wait_for(&self, attempt: usize, error: &TranslationError) -> Duration {
        let delay = self.delay_for(attempt);
        match error.retry_after() {
            Some(hint) if hint > delay => hint.min(self.max_delay),
            _ => delay,
        }
    }

    /// 执行操作，可重试错误在退避后再次尝试
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> TranslationResult<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = TranslationResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("{} 在第 {} 次尝试后成功", label, attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                tracing::error!("{} 遇到不可重试错误: {}", label, error);
                return Err(error);
            }
            if attempt >= self.max_attempts {
                tracing::error!("{} 已用尽 {} 次尝试: {}", label, self.max_attempts, error);
                return Err(error);
            }

            let wait = self.wait_for(attempt, &error);
            tracing::warn!(
                "{} 失败: {}，{:.1}s 后重试 (尝试 {}/{})",
                label,
                error,
                wait.as_secs_f32(),
                attempt,
                self.max_attempts
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
