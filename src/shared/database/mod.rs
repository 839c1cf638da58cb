/// データベース接続管理
pub mod connection;

/// スキーママイグレーション
pub mod migrations;

pub use connection::{open_database, open_in_memory_database};
pub use migrations::run_migrations;
