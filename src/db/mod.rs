// Re-export the Database struct and other public items
mod article;
pub mod core;
mod schema;

pub use self::article::StoredArticle;
pub use self::core::Database;
pub use self::core::DbLockErrorExt;
pub use sqlx::Row;
