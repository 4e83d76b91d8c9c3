pub mod feed_client;
pub mod ingest;
