use anyhow::Result;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT,
};
use std::time::Duration;

use crate::models::config::FeedConfig;

/// 资讯服务端专用 HTTP client。
/// 服务端校验 Origin/Referer/X-Requested-With，缺一个就会被拒。
/// Content-Type 固定为表单类型——服务端就认这个，哪怕请求体实际是 JSON。
/// 开启 cookie store 以复用 init_session 建立的会话。
pub fn build_feed_client(config: &FeedConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6"),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
    );
    headers.insert(ORIGIN, HeaderValue::from_str(&config.base_url)?);
    headers.insert(
        REFERER,
        HeaderValue::from_str(&format!(
            "{}/site/tdx_zxts/page_main.html?tabsel=0",
            config.base_url
        ))?,
    );
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .cookie_store(true)
        .build()?;
    Ok(client)
}
