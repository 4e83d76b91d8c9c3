use anyhow::Result;
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::config::FeedConfig;
use crate::utils::http::build_feed_client;

/// 抓取失败的三类情形，调用方据此决定重试/终止
#[derive(Debug, Error)]
pub enum FeedError {
    /// 网络层失败（超时/连接中断），换个时间重试可能成功
    #[error("网络请求失败: {0}")]
    Transport(#[source] reqwest::Error),
    /// HTTP 状态非 200，或响应体不是合法 JSON；不改请求就不会好
    #[error("协议错误: {0}")]
    Protocol(String),
    /// 服务端信封报错（ErrorCode != 0），带服务端错误码和说明
    #[error("服务端返回错误 {code}: {message}")]
    Remote { code: i64, message: String },
}

impl FeedError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Transport(_))
    }
}

/// 一页原始数据：列名与行元组平行返回（服务端自描述格式）。
/// 列顺序不保证跨版本稳定，消费方必须按列名对齐，不能按固定下标取值。
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub column_names: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// 单次抓取的结果：有数据、或数据已取完（正常终止信号，不是错误）
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Page(FeedPage),
    EndOfFeed,
}

/// 翻页数据源。生产实现是 [`TdxFeedClient`]，测试用桩实现替换。
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<FetchOutcome, FeedError>;
}

// 服务端信封: { ErrorCode, ErrorInfo?, ResultSets?: [{ ColName, Content }] }
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "ErrorCode")]
    error_code: i64,
    #[serde(rename = "ErrorInfo", default)]
    error_info: Option<String>,
    #[serde(rename = "ResultSets", default)]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(rename = "ColName", default)]
    col_name: Vec<String>,
    #[serde(rename = "Content", default)]
    content: Vec<Vec<Value>>,
}

/// 通达信资讯特色（zxts）要闻播报接口的抓取客户端。
/// 每次调用拉取一页，无内部状态、不缓存响应、不做重试。
pub struct TdxFeedClient {
    client: reqwest::Client,
    config: FeedConfig,
}

impl TdxFeedClient {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = build_feed_client(&config)?;
        Ok(Self { client, config })
    }

    /// 先访问一次入口页，让服务端在 cookie jar 里种会话。
    /// 失败不致命：部分点位不校验会话，直接抓也能成功。
    pub async fn init_session(&self) -> Result<()> {
        let url = format!(
            "{}/site/tdx_zxts/page_main.html?tabsel=0",
            self.config.base_url
        );
        let resp = self.client.get(&url).send().await?;
        log::debug!("会话初始化完成，状态码: {}", resp.status());
        Ok(())
    }

    fn request_body(&self, page: u32, page_size: u32) -> String {
        let as_of = self.config.as_of.unwrap_or_else(today_cst);
        // Params 第2、5位为服务端保留参数，抓包观察值固定为 "" 和 "0"
        json!({
            "CallName": "tdxzb_zxts_ywbb",
            "Params": [
                format!("{} 00:00:00", as_of.format("%Y-%m-%d")),
                "",
                page,
                page_size,
                "0"
            ],
            "secuparse": true,
            "parsefld": "summary",
            "tdxPageID": "_UrlEncode",
        })
        .to_string()
    }
}

impl FeedSource for TdxFeedClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<FetchOutcome, FeedError> {
        let url = format!("{}/TQLEX?Entry=CWServ.tdxzb_zxts_ywbb", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .body(self.request_body(page, page_size))
            .send()
            .await
            .map_err(FeedError::Transport)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FeedError::Protocol(format!("HTTP 状态 {}", status)));
        }

        let text = resp.text().await.map_err(FeedError::Transport)?;
        let outcome = decode_envelope(&text)?;
        if let FetchOutcome::Page(ref p) = outcome {
            log::debug!("第 {} 页获取到 {} 条记录", page, p.rows.len());
        }
        Ok(outcome)
    }
}

/// 解析服务端信封。ErrorCode != 0 为服务端拒绝；
/// 成功但没有结果集（或结果集为空）视为数据已取完。
fn decode_envelope(body: &str) -> Result<FetchOutcome, FeedError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| FeedError::Protocol(format!("响应不是合法 JSON: {}", e)))?;

    if envelope.error_code != 0 {
        return Err(FeedError::Remote {
            code: envelope.error_code,
            message: envelope.error_info.unwrap_or_default(),
        });
    }

    let Some(result_set) = envelope.result_sets.into_iter().next() else {
        return Ok(FetchOutcome::EndOfFeed);
    };
    if result_set.content.is_empty() {
        return Ok(FetchOutcome::EndOfFeed);
    }

    Ok(FetchOutcome::Page(FeedPage {
        column_names: result_set.col_name,
        rows: result_set.content,
    }))
}

/// 东八区当天（服务端按北京时间记日）
fn today_cst() -> NaiveDate {
    let cst = FixedOffset::east_opt(8 * 3600).unwrap();
    Utc::now().with_timezone(&cst).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success_envelope() {
        let body = r#"{
            "ErrorCode": 0,
            "ResultSets": [{
                "ColName": ["pos", "rec_id", "title"],
                "Content": [[1, 1001, "测试公告"], [2, 1002, "第二条"]]
            }]
        }"#;
        let outcome = decode_envelope(body).unwrap();
        match outcome {
            FetchOutcome::Page(page) => {
                assert_eq!(page.column_names, vec!["pos", "rec_id", "title"]);
                assert_eq!(page.rows.len(), 2);
                assert_eq!(page.rows[0][1], serde_json::json!(1001));
            }
            FetchOutcome::EndOfFeed => panic!("应返回数据页"),
        }
    }

    #[test]
    fn test_decode_remote_error() {
        let body = r#"{"ErrorCode": -100, "ErrorInfo": "权限不足"}"#;
        match decode_envelope(body) {
            Err(FeedError::Remote { code, message }) => {
                assert_eq!(code, -100);
                assert_eq!(message, "权限不足");
            }
            other => panic!("应返回 Remote 错误: {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_result_sets_is_end_of_feed() {
        // 成功但无 ResultSets 字段 = 空页
        let body = r#"{"ErrorCode": 0}"#;
        assert!(matches!(
            decode_envelope(body).unwrap(),
            FetchOutcome::EndOfFeed
        ));
    }

    #[test]
    fn test_decode_empty_content_is_end_of_feed() {
        let body = r#"{"ErrorCode": 0, "ResultSets": [{"ColName": ["pos"], "Content": []}]}"#;
        assert!(matches!(
            decode_envelope(body).unwrap(),
            FetchOutcome::EndOfFeed
        ));
    }

    #[test]
    fn test_decode_malformed_body_is_protocol_error() {
        let body = "<html>Bad Gateway</html>";
        assert!(matches!(
            decode_envelope(body),
            Err(FeedError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let config = FeedConfig {
            as_of: Some(NaiveDate::from_ymd_opt(2025, 9, 24).unwrap()),
            ..FeedConfig::default()
        };
        let client = TdxFeedClient::new(config).unwrap();
        let body: Value = serde_json::from_str(&client.request_body(3, 50)).unwrap();
        assert_eq!(body["CallName"], "tdxzb_zxts_ywbb");
        assert_eq!(body["Params"][0], "2025-09-24 00:00:00");
        assert_eq!(body["Params"][2], 3);
        assert_eq!(body["Params"][3], 50);
        assert_eq!(body["secuparse"], true);
    }
}
