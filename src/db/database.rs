//! Database - the registry of named schemas and their persistence.
//!
//! # On-disk layout
//! ```text
//! <data_dir>/
//! ├── meta.json                 {"databases": ["shop", ...]}
//! └── shop/
//!     ├── schema.json           descriptors + table state
//!     ├── item/                 one file per page, named by page id
//!     │   ├── 2f1c...e9
//!     │   └── 8a03...41
//!     └── order/
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::common::config::{Config, META_FILE, SCHEMA_FILE};
use crate::common::{Error, Result};
use crate::db::flusher::Flusher;
use crate::db::{handler, Request, Response};
use crate::schema::{Schema, SchemaState, TableDescriptor};
use crate::storage::{write_synced, StatsSnapshot, StorageStats};

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaFile {
    databases: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaFile {
    descriptors: Vec<TableDescriptor>,
    state: SchemaState,
}

/// One named database: its schema behind a reader-writer lock, plus the
/// storage counters shared by its tables.
#[derive(Debug)]
struct Entry {
    schema: RwLock<Schema>,
    stats: Arc<StorageStats>,
}

#[derive(Debug)]
struct Registry {
    config: Config,
    databases: RwLock<BTreeMap<String, Arc<Entry>>>,
}

impl Registry {
    /// Data directory, unless running in memory.
    fn root(&self) -> Option<&Path> {
        if self.config.in_memory {
            None
        } else {
            self.config.data_dir.as_deref()
        }
    }

    /// Flush every database, carrying on past failures. Returns the first.
    fn flush(&self) -> Result<()> {
        let Some(root) = self.root() else {
            return Ok(());
        };
        let databases = self.databases.read();
        let mut failure = None;
        for (name, entry) in databases.iter() {
            if let Err(e) = flush_entry(root, name, entry) {
                failure.get_or_insert(e);
            }
        }
        write_meta(root, databases.keys())?;
        failure.map_or(Ok(()), Err)
    }
}

/// A set of named databases, each with its own schema.
///
/// Requests against one database run under that schema's lock: reads
/// share it, writes hold it exclusively. Disk-backed databases are flushed
/// by a background thread once writes go quiet for the configured
/// interval, and synchronously on [`shutdown`](Database::shutdown).
///
/// # Example
/// ```
/// use tabledb::schema::{FieldDescriptor, TableDescriptor};
/// use tabledb::{Config, Database};
///
/// let db = Database::open(Config::in_memory()).unwrap();
/// db.create_database(
///     "shop",
///     vec![TableDescriptor::new("item")
///         .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
///         .field(FieldDescriptor::new("name", "String").prop("unique", "true"))],
/// )
/// .unwrap();
///
/// let response = db.execute_json("shop", r#"{"action": "create", "table": "item", "data": {"name": "pen"}}"#);
/// assert_eq!(response.status, 201);
/// ```
#[derive(Debug)]
pub struct Database {
    registry: Arc<Registry>,
    flusher: Mutex<Option<Flusher>>,
}

impl Database {
    /// Open the databases listed in the data directory, or start empty in
    /// memory.
    ///
    /// # Errors
    /// - `Error::Config` for an unusable configuration
    /// - `Error::Io` / `Error::Json` if the metadata cannot be read
    /// - schema and storage errors while reopening a database
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let registry = Registry {
            config,
            databases: RwLock::new(BTreeMap::new()),
        };

        if let Some(root) = registry.root() {
            fs::create_dir_all(root)?;
            let mut databases = registry.databases.write();
            for name in read_meta(root)?.databases {
                let entry = load_entry(root, &name)?;
                databases.insert(name, Arc::new(entry));
            }
            info!(dir = %root.display(), databases = databases.len(), "databases loaded");
        }

        let registry = Arc::new(registry);
        let flusher = match registry.root() {
            Some(_) => {
                let worker_registry = registry.clone();
                Some(Flusher::spawn(registry.config.write_interval, move || {
                    worker_registry.flush()
                })?)
            }
            None => None,
        };

        Ok(Self {
            registry,
            flusher: Mutex::new(flusher),
        })
    }

    pub fn config(&self) -> &Config {
        &self.registry.config
    }

    /// Create a database from table descriptors and persist it at once.
    ///
    /// # Errors
    /// - `Error::BadRequest` for an invalid name
    /// - `Error::DatabaseExists` if the name is taken
    /// - `Error::SchemaParse` / `Error::InvalidRelation` for a bad schema
    pub fn create_database(&self, name: &str, tables: Vec<TableDescriptor>) -> Result<()> {
        validate_name(name)?;
        let mut databases = self.registry.databases.write();
        if databases.contains_key(name) {
            return Err(Error::DatabaseExists(name.to_string()));
        }

        let stats = Arc::new(StorageStats::new());
        let dir = self.registry.root().map(|root| root.join(name));
        let schema = Schema::open(name, tables, dir.as_deref(), stats.clone(), None)?;
        let entry = Arc::new(Entry {
            schema: RwLock::new(schema),
            stats,
        });

        if let Some(root) = self.registry.root() {
            flush_entry(root, name, &entry)?;
        }
        databases.insert(name.to_string(), entry);
        if let Some(root) = self.registry.root() {
            write_meta(root, databases.keys())?;
        }

        info!(database = name, "database created");
        Ok(())
    }

    /// Remove a database and its files.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        let mut databases = self.registry.databases.write();
        if databases.remove(name).is_none() {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }

        if let Some(root) = self.registry.root() {
            let dir = root.join(name);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            write_meta(root, databases.keys())?;
        }

        info!(database = name, "database dropped");
        Ok(())
    }

    /// Names of all databases, sorted.
    pub fn list_databases(&self) -> Vec<String> {
        self.registry.databases.read().keys().cloned().collect()
    }

    /// Run a request against database `db`.
    ///
    /// Failures come back as error responses; fatal storage errors are
    /// also logged.
    pub fn execute(&self, db: &str, request: &Request) -> Response {
        let Some(entry) = self.entry(db) else {
            return Response::error(&Error::DatabaseNotFound(db.to_string()));
        };

        let read_only = request.action.is_read_only();
        let result = if read_only {
            handler::handle(&entry.schema.read(), request)
        } else {
            let result = handler::handle(&entry.schema.write(), request);
            if result.is_ok() {
                self.touch();
            }
            result
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_fatal() || matches!(e, Error::TableUnavailable(_)) {
                    error!(database = db, table = %request.table, error = %e, "request failed");
                } else {
                    debug!(database = db, table = %request.table, error = %e, "request rejected");
                }
                Response::error(&e)
            }
        }
    }

    /// Decode a JSON request and run it.
    pub fn execute_json(&self, db: &str, raw: &str) -> Response {
        match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.execute(db, &request),
            Err(e) => Response::from(Error::from(e)),
        }
    }

    /// Run `f` with shared access to a database's schema.
    pub fn with_schema<R>(&self, db: &str, f: impl FnOnce(&Schema) -> R) -> Result<R> {
        let entry = self
            .entry(db)
            .ok_or_else(|| Error::DatabaseNotFound(db.to_string()))?;
        let schema = entry.schema.read();
        Ok(f(&schema))
    }

    /// Storage counters of a database.
    pub fn stats(&self, db: &str) -> Result<StatsSnapshot> {
        self.entry(db)
            .map(|entry| entry.stats.snapshot())
            .ok_or_else(|| Error::DatabaseNotFound(db.to_string()))
    }

    /// Write every dirty page and the metadata of every database.
    pub fn flush(&self) -> Result<()> {
        self.registry.flush()
    }

    /// Stop the background flusher and flush synchronously.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) -> Result<()> {
        if let Some(mut flusher) = self.flusher.lock().take() {
            flusher.stop();
            info!("database shutting down");
        }
        self.flush()
    }

    fn entry(&self, db: &str) -> Option<Arc<Entry>> {
        self.registry.databases.read().get(db).cloned()
    }

    fn touch(&self) {
        if let Some(flusher) = self.flusher.lock().as_ref() {
            flusher.touch();
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "flush on drop failed");
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::BadRequest(format!("Invalid database name {name:?}")))
    }
}

fn read_meta(root: &Path) -> Result<MetaFile> {
    match fs::read(root.join(META_FILE)) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MetaFile::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_meta<'a>(root: &Path, names: impl Iterator<Item = &'a String>) -> Result<()> {
    let meta = MetaFile {
        databases: names.cloned().collect(),
    };
    write_synced(&root.join(META_FILE), &serde_json::to_vec_pretty(&meta)?)
}

fn schema_path(root: &Path, name: &str) -> PathBuf {
    root.join(name).join(SCHEMA_FILE)
}

fn load_entry(root: &Path, name: &str) -> Result<Entry> {
    let path = schema_path(root, name);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(database = name, "listed database has no schema file");
            return Err(Error::DatabaseNotFound(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let file: SchemaFile = serde_json::from_slice(&bytes)?;

    let stats = Arc::new(StorageStats::new());
    let schema = Schema::open(
        name,
        file.descriptors,
        Some(&root.join(name)),
        stats.clone(),
        Some(file.state),
    )?;
    debug!(database = name, "database loaded");
    Ok(Entry {
        schema: RwLock::new(schema),
        stats,
    })
}

/// Write a database's pages, then its schema file. The schema file is
/// written even when some table failed, so healthy tables stay reachable.
fn flush_entry(root: &Path, name: &str, entry: &Entry) -> Result<()> {
    let schema = entry.schema.read();
    let flushed = schema.flush();

    fs::create_dir_all(root.join(name))?;
    let file = SchemaFile {
        descriptors: schema.descriptors().to_vec(),
        state: schema.state(),
    };
    write_synced(&schema_path(root, name), &serde_json::to_vec_pretty(&file)?)?;
    let pages = flushed?;
    debug!(database = name, pages, "database flushed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::{posts, table_a, users};
    use crate::db::Action;
    use serde_json::json;
    use tempfile::tempdir;

    fn create_a(db: &Database, b: &str) -> Response {
        db.execute(
            "test",
            &Request::new(Action::Create, "a").with_data(json!({ "b": b })),
        )
    }

    #[test]
    fn test_in_memory_registry() {
        let db = Database::open(Config::in_memory()).unwrap();
        db.create_database("test", vec![table_a()]).unwrap();
        assert_eq!(db.list_databases(), ["test"]);

        assert!(matches!(
            db.create_database("test", vec![table_a()]),
            Err(Error::DatabaseExists(_))
        ));
        assert!(matches!(db.create_database("bad/name", vec![]), Err(Error::BadRequest(_))));

        db.drop_database("test").unwrap();
        assert!(db.list_databases().is_empty());
        assert!(matches!(db.drop_database("test"), Err(Error::DatabaseNotFound(_))));
    }

    #[test]
    fn test_execute_unknown_database() {
        let db = Database::open(Config::in_memory()).unwrap();
        let response = db.execute_json("nope", r#"{"action": "findMany", "table": "a"}"#);
        assert_eq!(response.status, 404);
        assert_eq!(response.message, "Database not found with name nope");
    }

    #[test]
    fn test_execute_bad_json() {
        let db = Database::open(Config::in_memory()).unwrap();
        let response = db.execute_json("test", r#"{"action": "explode", "table": "a"}"#);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_invalid_schema_is_not_registered() {
        let db = Database::open(Config::in_memory()).unwrap();
        let err = db.create_database("test", vec![posts()]).unwrap_err();
        assert!(matches!(err, Error::InvalidRelation { .. }));
        assert!(db.list_databases().is_empty());
    }

    #[test]
    fn test_reopen_restores_rows_and_indexes() {
        let dir = tempdir().unwrap();
        {
            let db = Database::open(Config::new(dir.path())).unwrap();
            db.create_database("test", vec![table_a(), users(), posts()]).unwrap();
            assert_eq!(create_a(&db, "hello").status, 201);
            assert_eq!(create_a(&db, "world").status, 201);
            let response = db.execute_json(
                "test",
                r#"{"action": "deleteUnique", "table": "a", "where": {"b": "hello"}}"#,
            );
            assert_eq!(response.status, 200);
            db.shutdown().unwrap();
        }

        let db = Database::open(Config::new(dir.path())).unwrap();
        assert_eq!(db.list_databases(), ["test"]);

        let response = db.execute_json("test", r#"{"action": "findMany", "table": "a"}"#);
        assert_eq!(response.message, "Found 1 rows in table a");
        assert_eq!(response.data[0]["b"], json!("world"));

        // the deleted value is free, the live one is still taken
        assert_eq!(create_a(&db, "hello").status, 201);
        assert_eq!(create_a(&db, "world").status, 409);

        // ids continue past the last one minted
        let response = create_a(&db, "again");
        assert_eq!(response.data["id"], json!(4));
    }

    #[test]
    fn test_drop_removes_files() {
        let dir = tempdir().unwrap();
        let db = Database::open(Config::new(dir.path())).unwrap();
        db.create_database("test", vec![table_a()]).unwrap();
        assert!(dir.path().join("test").join(SCHEMA_FILE).exists());

        db.drop_database("test").unwrap();
        assert!(!dir.path().join("test").exists());
        drop(db);

        let db = Database::open(Config::new(dir.path())).unwrap();
        assert!(db.list_databases().is_empty());
    }

    #[test]
    fn test_stats_and_schema_access() {
        let db = Database::open(Config::in_memory()).unwrap();
        db.create_database("test", vec![table_a()]).unwrap();
        create_a(&db, "x");

        let stats = db.stats("test").unwrap();
        assert!(stats.pages_allocated >= 1);
        let rows = db
            .with_schema("test", |schema| schema.table("a").map(|t| t.rows().len()))
            .unwrap();
        assert_eq!(rows.unwrap().unwrap(), 1);
        assert!(db.stats("other").is_err());
    }

    #[test]
    fn test_background_flush() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path()).with_write_interval(std::time::Duration::from_millis(20));
        let db = Database::open(config).unwrap();
        db.create_database("test", vec![table_a()]).unwrap();
        create_a(&db, "hello");

        let path = dir.path().join("test").join(SCHEMA_FILE);
        let start = std::time::Instant::now();
        loop {
            let file: SchemaFile = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
            if file.state.tables["a"].last_id == 1 {
                break;
            }
            assert!(start.elapsed() < std::time::Duration::from_secs(5), "flush never happened");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }

    #[test]
    fn test_only_successful_writes_schedule_a_flush() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path()).with_write_interval(std::time::Duration::from_millis(20));
        let db = Database::open(config).unwrap();
        db.create_database("test", vec![table_a()]).unwrap();
        assert_eq!(create_a(&db, "x").status, 201);

        let schema_file = dir.path().join("test").join(SCHEMA_FILE);
        let start = std::time::Instant::now();
        loop {
            let file: SchemaFile = serde_json::from_slice(&fs::read(&schema_file).unwrap()).unwrap();
            if file.state.tables["a"].last_id == 1 {
                break;
            }
            assert!(start.elapsed() < std::time::Duration::from_secs(5), "flush never happened");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        // let the running flush finish its metadata write
        std::thread::sleep(std::time::Duration::from_millis(100));

        let meta = dir.path().join(META_FILE);
        fs::remove_file(&meta).unwrap();
        assert_eq!(create_a(&db, "x").status, 409);
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(!meta.exists());

        assert_eq!(create_a(&db, "y").status, 201);
        let start = std::time::Instant::now();
        while !meta.exists() {
            assert!(start.elapsed() < std::time::Duration::from_secs(5), "flush never happened");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }
}
