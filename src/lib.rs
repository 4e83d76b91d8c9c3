pub mod models;
pub mod services;
pub mod db;
pub mod utils;

pub use db::database::Database;
pub use models::announcement::{
    AnnouncementRecord, ExtractedStockInfo, IngestReport, NewsStatistics, PageStats,
};
pub use models::config::{FeedConfig, IngestConfig};
pub use services::feed_client::{FeedError, FeedPage, FeedSource, FetchOutcome, TdxFeedClient};
pub use services::ingest::{extract_stock_info, ingest_page, paginate_and_ingest};
