//! Relational access walkthrough: raw SQL, table metadata, entity mapping
//! and a small persistence façade over SQLite.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod result;
pub mod schema;
pub mod sql;

pub use config::{ConfigError, StoreConfig, StoreLocation};
pub use engine::{Conn, Engine, Session};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogSink};
pub use model::address::{Address, AddressId};
pub use model::mapping::{entity_metadata, Mapped};
pub use model::user::{User, UserId};
pub use repo::error::{RepoError, RepoResult};
pub use repo::user_repo::{Repo, UserRepository};
pub use result::{FromRow, ResultSet, Row, RowMapping};
pub use schema::{Column, ColumnType, Metadata, SchemaError, Table};
pub use sql::{insert, select, text, update, Executable, IntoValue, Params, Statement};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
