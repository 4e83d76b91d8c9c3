use serde::{Deserialize, Serialize};

/// 一条公告/资讯记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    /// 服务端分配的全局唯一记录ID，去重主键
    pub record_id: i64,
    /// 当页内序号（每页重新编号，不是身份标识）
    pub position: i64,
    /// 标题，常见格式: "公司名(6位代码)<分隔符>公告正文"
    pub title: String,
    /// 发布时间 "YYYY-MM-DD HH:MM:SS"，最新在前查询的排序键
    pub issue_date: String,
    /// 摘要，多数情况与标题相同
    pub summary: String,
    /// 来源（交易所/通讯社名称）
    pub source: String,
    pub relate_id: i64,
    pub proc_id: i64,
    /// 服务端标记位，观察到 0/1/4；原样保留，不做布尔解释
    pub mark_id: i64,
    /// 从标题提取的股票代码（6位数字），非个股资讯为空
    pub stock_code: Option<String>,
    /// 从标题提取的股票名称
    pub stock_name: Option<String>,
}

/// 从标题提取出的股票信息；宏观/市场类资讯两个字段都为空
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedStockInfo {
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
}

/// 单页入库结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageStats {
    /// 新增行数
    pub inserted: usize,
    /// record_id 已存在、被忽略的行数
    pub duplicate: usize,
    /// 缺少必需字段或写入出错、被跳过的行数
    pub failed: usize,
}

/// 一次翻页抓取的汇总结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicate: usize,
    pub failed: usize,
    /// 成功拉取到响应的页数（抓取失败的页不计）
    pub pages_fetched: u32,
}

impl IngestReport {
    pub fn absorb(&mut self, stats: PageStats) {
        self.inserted += stats.inserted;
        self.duplicate += stats.duplicate;
        self.failed += stats.failed;
    }
}

/// 按来源统计
#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// 按个股统计
#[derive(Debug, Clone, Serialize)]
pub struct StockCount {
    pub stock_code: String,
    pub stock_name: String,
    pub count: i64,
}

/// 库内数据概览
#[derive(Debug, Clone, Serialize)]
pub struct NewsStatistics {
    pub total_count: i64,
    /// 涉及的不同个股数
    pub stock_count: i64,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub sources: Vec<SourceCount>,
    /// 公告数最多的前10只个股
    pub hot_stocks: Vec<StockCount>,
}
