use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 资讯服务端连接配置。
/// 不同接入点（快线/备用线路）只改 base_url，不再为每个点位单独写客户端。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// 服务端地址，如 http://fast1.tdx.com.cn:7615
    pub base_url: String,
    /// 服务端校验浏览器特征，UA 不能省
    pub user_agent: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
    /// 查询基准日期；缺省为东八区当天
    pub as_of: Option<NaiveDate>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://fast1.tdx.com.cn:7615".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36 Edg/140.0.0.0"
                .to_string(),
            timeout_secs: 15,
            as_of: None,
        }
    }
}

/// 翻页抓取参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 每页条数，必须大于 0
    pub page_size: u32,
    /// 最多抓取页数
    pub max_pages: u32,
    /// 页间延迟（毫秒），避免对共享服务端请求过快
    pub page_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 10,
            page_delay_ms: 1000,
        }
    }
}
