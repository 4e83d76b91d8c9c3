use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::Value;
use tokio::time::sleep;

use crate::db::database::Database;
use crate::models::announcement::{AnnouncementRecord, ExtractedStockInfo, IngestReport, PageStats};
use crate::models::config::IngestConfig;
use crate::services::feed_client::{FeedPage, FeedSource, FetchOutcome};

static STOCK_TITLE_RE: OnceLock<Regex> = OnceLock::new();

/// 从标题中提取股票代码和名称。
/// 个股公告标题格式: "蓝特光学(688127):2025年第二次临时股东大会决议公告"；
/// 宏观/市场类资讯匹配不到属正常情况，两个字段均为空。
/// 纯函数，同一标题多次提取结果一致。
pub fn extract_stock_info(title: &str) -> ExtractedStockInfo {
    let re = STOCK_TITLE_RE
        .get_or_init(|| Regex::new(r"^([^()]+)\(([0-9]{6})\)").expect("股票标题正则"));
    match re.captures(title) {
        Some(caps) => ExtractedStockInfo {
            stock_code: Some(caps[2].to_string()),
            stock_name: Some(caps[1].trim().to_string()),
        },
        None => ExtractedStockInfo::default(),
    }
}

/// 将一页原始数据入库，按 record_id 去重（INSERT OR IGNORE）。
/// 单行缺必需字段或写入出错只计入 failed，不中断整页。
pub fn ingest_page(page: &FeedPage, db: &Database) -> PageStats {
    let mut stats = PageStats::default();
    for row in &page.rows {
        let Some(record) = map_row(&page.column_names, row) else {
            stats.failed += 1;
            continue;
        };
        match db.insert_announcement(&record) {
            Ok(true) => stats.inserted += 1,
            Ok(false) => stats.duplicate += 1,
            Err(e) => {
                log::error!("写入公告失败 rec_id={}: {}", record.record_id, e);
                stats.failed += 1;
            }
        }
    }
    stats
}

/// 顺序翻页抓取并入库，一页完全处理完才请求下一页。
///
/// 停止条件，先到先停：
/// - 短页（少于 page_size 条）或空页：数据已取完
/// - 抓取失败：按"没有更多数据"处理，不算崩溃
/// - 达到 max_pages
/// - 页间检查到 cancel 信号（页内不中断），返回已累计的部分结果
///
/// 只有第 1 页就拉不到数据才作为错误上报给调用方。
pub async fn paginate_and_ingest(
    feed: &impl FeedSource,
    db: &Database,
    opts: &IngestConfig,
    cancel: &AtomicBool,
) -> Result<IngestReport> {
    if opts.page_size == 0 {
        return Err(anyhow!("page_size 必须大于 0"));
    }

    let mut report = IngestReport::default();

    for page in 1..=opts.max_pages {
        if cancel.load(Ordering::Relaxed) {
            log::info!("收到停止信号，翻页提前结束（已完成 {} 页）", report.pages_fetched);
            break;
        }
        if page > 1 && opts.page_delay_ms > 0 {
            sleep(Duration::from_millis(opts.page_delay_ms)).await;
        }

        let outcome = match feed.fetch_page(page, opts.page_size).await {
            Ok(outcome) => outcome,
            Err(e) if page == 1 => {
                return Err(anyhow::Error::new(e).context("首页抓取失败，服务端不可达"));
            }
            Err(e) => {
                log::warn!("第 {} 页抓取失败，停止翻页: {}", page, e);
                break;
            }
        };

        match outcome {
            FetchOutcome::EndOfFeed => {
                report.pages_fetched += 1;
                log::info!("第 {} 页无数据，已取完", page);
                break;
            }
            FetchOutcome::Page(feed_page) => {
                report.pages_fetched += 1;
                let row_count = feed_page.rows.len();
                let stats = ingest_page(&feed_page, db);
                report.absorb(stats);
                log::info!(
                    "第 {} 页入库: 新增 {} 重复 {} 失败 {}",
                    page,
                    stats.inserted,
                    stats.duplicate,
                    stats.failed
                );
                if (row_count as u32) < opts.page_size {
                    log::info!("第 {} 页不足 {} 条，已取完", page, opts.page_size);
                    break;
                }
            }
        }
    }

    log::info!(
        "抓取完成: {} 页，新增 {} 重复 {} 失败 {}",
        report.pages_fetched,
        report.inserted,
        report.duplicate,
        report.failed
    );
    Ok(report)
}

/// 按列名对齐一行数据并组装记录。
/// rec_id 和 title 为必需字段，缺失返回 None；
/// relate_id/Proc_Id/Mark_Id 缺失按 0 落库（有损但确定，保证聚合查询不碰 NULL）。
fn map_row(column_names: &[String], row: &[Value]) -> Option<AnnouncementRecord> {
    if row.len() < column_names.len() {
        return None;
    }
    let fields: HashMap<&str, &Value> = column_names
        .iter()
        .map(String::as_str)
        .zip(row.iter())
        .collect();

    let record_id = field_i64(&fields, "rec_id")?;
    let title = fields.get("title").and_then(|v| v.as_str())?.to_string();

    let info = extract_stock_info(&title);
    Some(AnnouncementRecord {
        record_id,
        position: field_i64(&fields, "pos").unwrap_or(0),
        issue_date: field_str(&fields, "issue_date"),
        summary: field_str(&fields, "summary"),
        source: field_str(&fields, "src_info"),
        relate_id: field_i64(&fields, "relate_id").unwrap_or(0),
        proc_id: field_i64(&fields, "Proc_Id").unwrap_or(0),
        mark_id: field_i64(&fields, "Mark_Id").unwrap_or(0),
        stock_code: info.stock_code,
        stock_name: info.stock_name,
        title,
    })
}

fn field_i64(fields: &HashMap<&str, &Value>, name: &str) -> Option<i64> {
    match fields.get(name) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn field_str(fields: &HashMap<&str, &Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_map_row_full() {
        let cols = names(&[
            "pos", "rec_id", "title", "issue_date", "summary", "src_info", "relate_id",
            "Proc_Id", "Mark_Id",
        ]);
        let row = vec![
            json!(1),
            json!(88001),
            json!("贵州茅台(600519):关于回购公司股份的进展公告"),
            json!("2025-09-24 18:30:00"),
            json!("回购进展"),
            json!("上交所"),
            json!(12),
            json!(3),
            json!(1),
        ];
        let record = map_row(&cols, &row).unwrap();
        assert_eq!(record.record_id, 88001);
        assert_eq!(record.position, 1);
        assert_eq!(record.stock_code.as_deref(), Some("600519"));
        assert_eq!(record.stock_name.as_deref(), Some("贵州茅台"));
        assert_eq!(record.source, "上交所");
        assert_eq!(record.mark_id, 1);
    }

    #[test]
    fn test_map_row_missing_rec_id() {
        let cols = names(&["pos", "rec_id", "title"]);
        let row = vec![json!(1), Value::Null, json!("标题")];
        assert!(map_row(&cols, &row).is_none());
    }

    #[test]
    fn test_map_row_missing_title() {
        let cols = names(&["pos", "rec_id", "title"]);
        let row = vec![json!(1), json!(1001), Value::Null];
        assert!(map_row(&cols, &row).is_none());
    }

    #[test]
    fn test_map_row_short_row() {
        // 行比列名短，对不上号，整行跳过
        let cols = names(&["pos", "rec_id", "title"]);
        let row = vec![json!(1), json!(1001)];
        assert!(map_row(&cols, &row).is_none());
    }

    #[test]
    fn test_map_row_absent_metadata_defaults_to_zero() {
        let cols = names(&["rec_id", "title"]);
        let row = vec![json!(1001), json!("无元数据的资讯")];
        let record = map_row(&cols, &row).unwrap();
        assert_eq!(record.relate_id, 0);
        assert_eq!(record.proc_id, 0);
        assert_eq!(record.mark_id, 0);
        assert_eq!(record.issue_date, "");
        assert_eq!(record.source, "");
    }

    #[test]
    fn test_map_row_numeric_string_rec_id() {
        // 服务端偶发把数字列发成字符串
        let cols = names(&["rec_id", "title"]);
        let row = vec![json!("1001"), json!("标题")];
        assert_eq!(map_row(&cols, &row).unwrap().record_id, 1001);
    }

    #[test]
    fn test_map_row_column_order_independent() {
        // 列顺序不保证稳定，必须按列名对齐
        let cols = names(&["title", "rec_id", "pos"]);
        let row = vec![json!("标题"), json!(7), json!(3)];
        let record = map_row(&cols, &row).unwrap();
        assert_eq!(record.record_id, 7);
        assert_eq!(record.position, 3);
    }
}
