use std::time::Duration;
use tokio::time::sleep;

use crate::services::feed_client::FeedError;

/// 指数退避重试工具。抓取器本身不重试，重试策略属于调用方；
/// 这里只对网络层失败（超时/连接）重试，协议错误和服务端拒绝直接返回。
///
/// # Arguments
/// * `max_retries` - 最大重试次数（不含首次请求，总共最多执行 max_retries + 1 次）
/// * `base_delay` - 首次重试前的等待时间，之后逐次翻倍
/// * `operation` - 异步操作闭包
pub async fn retry_with_backoff<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    operation: F,
) -> Result<T, FeedError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_retryable() || attempt >= max_retries {
                    return Err(e);
                }
                let delay = base_delay * (1u32 << attempt);
                log::warn!(
                    "资讯请求失败（第 {} 次），{}ms 后重试: {}",
                    attempt + 1,
                    delay.as_millis(),
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
