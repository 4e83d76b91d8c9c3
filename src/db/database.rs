use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use crate::models::announcement::{
    AnnouncementRecord, NewsStatistics, SourceCount, StockCount,
};

const SELECT_COLUMNS: &str = "position, record_id, title, issue_date, summary, source, \
     relate_id, proc_id, mark_id, stock_code, stock_name";

/// 公告库。写入方只有抓取流水线；查询侧（统计/检索/导出）可随时并发读，
/// 单行 INSERT OR IGNORE 各自原子，读到半页数据是允许的。
/// 本子系统视角下 append-only：记录落库后不改不删。
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(dir) = db_path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// 测试用内存库
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS announcements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                position INTEGER NOT NULL DEFAULT 0,
                record_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL,
                issue_date TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT '',
                relate_id INTEGER NOT NULL DEFAULT 0,
                proc_id INTEGER NOT NULL DEFAULT 0,
                mark_id INTEGER NOT NULL DEFAULT 0,
                stock_code TEXT,
                stock_name TEXT,
                crawl_time TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_ann_record_id ON announcements(record_id);
            CREATE INDEX IF NOT EXISTS idx_ann_stock_code ON announcements(stock_code);
            CREATE INDEX IF NOT EXISTS idx_ann_issue_date ON announcements(issue_date);
            CREATE INDEX IF NOT EXISTS idx_ann_source ON announcements(source);
            ",
        )?;
        Ok(())
    }

    /// 按 record_id 去重写入，已存在时静默忽略（去重机制本身，不是错误）。
    /// 返回 true 表示新增，false 表示重复。
    pub fn insert_announcement(&self, r: &AnnouncementRecord) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO announcements \
             (position, record_id, title, issue_date, summary, source, relate_id, proc_id, mark_id, stock_code, stock_name) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                r.position,
                r.record_id,
                r.title,
                r.issue_date,
                r.summary,
                r.source,
                r.relate_id,
                r.proc_id,
                r.mark_id,
                r.stock_code,
                r.stock_name
            ],
        )?;
        Ok(changed > 0)
    }

    /// 最新 N 条，按发布时间倒序
    pub fn latest(&self, limit: usize) -> Result<Vec<AnnouncementRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM announcements ORDER BY issue_date DESC LIMIT ?1",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![limit], row_to_record)?;
        collect(rows)
    }

    /// 某只个股的公告，按发布时间倒序
    pub fn find_by_stock(&self, stock_code: &str, limit: usize) -> Result<Vec<AnnouncementRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM announcements WHERE stock_code = ?1 ORDER BY issue_date DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![stock_code, limit], row_to_record)?;
        collect(rows)
    }

    /// 某个来源的公告，按发布时间倒序
    pub fn find_by_source(&self, source: &str, limit: usize) -> Result<Vec<AnnouncementRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM announcements WHERE source = ?1 ORDER BY issue_date DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![source, limit], row_to_record)?;
        collect(rows)
    }

    /// 标题/摘要关键词检索
    pub fn search(&self, keyword: &str, limit: usize) -> Result<Vec<AnnouncementRecord>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", keyword);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM announcements WHERE title LIKE ?1 OR summary LIKE ?1 \
             ORDER BY issue_date DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![pattern, limit], row_to_record)?;
        collect(rows)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let total = conn.query_row("SELECT COUNT(*) FROM announcements", [], |row| row.get(0))?;
        Ok(total)
    }

    /// 按来源统计条数，多的在前
    pub fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) FROM announcements GROUP BY source ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SourceCount {
                source: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// 库内概览：总量、个股数、时间范围、来源分布、公告最多的前10只个股
    pub fn statistics(&self) -> Result<NewsStatistics> {
        let sources = self.source_counts()?;
        let conn = self.conn.lock().unwrap();

        let total_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM announcements", [], |row| row.get(0))?;
        let stock_count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT stock_code) FROM announcements WHERE stock_code IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let (earliest, latest) = conn.query_row(
            "SELECT MIN(issue_date), MAX(issue_date) FROM announcements",
            [],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT stock_code, stock_name, COUNT(*) as count FROM announcements \
             WHERE stock_code IS NOT NULL \
             GROUP BY stock_code, stock_name ORDER BY count DESC LIMIT 10",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StockCount {
                stock_code: row.get(0)?,
                stock_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                count: row.get(2)?,
            })
        })?;
        let mut hot_stocks = Vec::new();
        for row in rows {
            hot_stocks.push(row?);
        }

        Ok(NewsStatistics {
            total_count,
            stock_count,
            earliest,
            latest,
            sources,
            hot_stocks,
        })
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AnnouncementRecord> {
    Ok(AnnouncementRecord {
        position: row.get(0)?,
        record_id: row.get(1)?,
        title: row.get(2)?,
        issue_date: row.get(3)?,
        summary: row.get(4)?,
        source: row.get(5)?,
        relate_id: row.get(6)?,
        proc_id: row.get(7)?,
        mark_id: row.get(8)?,
        stock_code: row.get(9)?,
        stock_name: row.get(10)?,
    })
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<AnnouncementRecord>>,
) -> Result<Vec<AnnouncementRecord>> {
    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
