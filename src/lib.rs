pub mod config;
pub mod crawl;
pub mod db;
pub mod discovery;
pub mod enrich;
pub mod entity;
pub mod environment;
pub mod error;
pub mod extract;
pub mod http;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod storage;
pub mod util;
pub mod validate;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_PIPELINE: &str = "pipeline";
pub const TARGET_STORAGE: &str = "storage";
