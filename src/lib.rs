//! tabledb - a schema-driven table database on page-linked record storage.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            tabledb                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                  Database (db/)                          │   │
//! │  │    Registry + Request/Response + background flusher      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Query Engine (query/)                      │   │
//! │  │   create | update | find | find_unique | delete          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐   │
//! │  │     Schema (schema/)     │  │  Type System (types/)    │   │
//! │  │ tables, fields, relations│  │ Value, coercion, compare │   │
//! │  └──────────────────────────┘  └──────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Row Store & Indexes (rows/)                       │   │
//! │  │   primary key → page, unique value → primary key         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   Page + PageHeader + PagingManager + DiskManager        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`types`] - Field types, values, coercion and comparison
//! - [`schema`] - Table and field definitions, relation validation
//! - [`storage`] - Page formats, page files and page chains
//! - [`rows`] - Row storage and unique indexes
//! - [`query`] - Query execution
//! - [`db`] - Database context and request handling
//!
//! # Quick Start
//! ```
//! use tabledb::schema::{FieldDescriptor, TableDescriptor};
//! use tabledb::{Config, Database};
//!
//! let db = Database::open(Config::in_memory()).unwrap();
//! db.create_database(
//!     "blog",
//!     vec![TableDescriptor::new("user")
//!         .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
//!         .field(FieldDescriptor::new("email", "String").prop("unique", "true"))],
//! )
//! .unwrap();
//!
//! let created = db.execute_json(
//!     "blog",
//!     r#"{"action": "create", "table": "user", "data": {"email": "a@b.c"}}"#,
//! );
//! assert_eq!(created.status, 201);
//!
//! let found = db.execute_json(
//!     "blog",
//!     r#"{"action": "findUnique", "table": "user", "where": {"email": "a@b.c"}}"#,
//! );
//! assert_eq!(found.data["id"], 1);
//! ```

pub mod common;
pub mod db;
pub mod query;
pub mod rows;
pub mod schema;
pub mod storage;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use common::config::Config;
pub use common::{Error, PageId, Result};

pub use db::{Action, Database, Request, Response};
pub use rows::Row;
pub use storage::{StatsSnapshot, StorageStats};
pub use types::Value;
