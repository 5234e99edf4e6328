//! The database handle: one SQLite connection and the four CRUD operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, error, info};

use crate::config::{DatabaseConfig, FailurePolicy};
use crate::error::{Error, Result};
use crate::sink::{DiagnosticSink, TracingSink};
use crate::statement::{self, ColumnValueMap};
use crate::value::Value;

/// One result record: column name → value.
///
/// Result columns sharing a name collapse into one key (the last one wins);
/// alias them (`SELECT a.id AS a_id, b.id AS b_id ...`) to keep both.
pub type Row = HashMap<String, Value>;

/// What [`Database::insert`] reports on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnId {
    /// Number of rows the statement affected.
    #[default]
    AffectedRows,
    /// Rowid assigned to the new row, or zero when the table has no
    /// `INTEGER PRIMARY KEY` rowid alias (including `WITHOUT ROWID` tables).
    GeneratedId,
}

impl From<bool> for ReturnId {
    fn from(return_generated_id: bool) -> Self {
        if return_generated_id {
            ReturnId::GeneratedId
        } else {
            ReturnId::AffectedRows
        }
    }
}

/// Handle owning at most one live connection.
///
/// Starts disconnected. [`connect`](Self::connect) moves it to connected for
/// the rest of its life; there is no disconnect. Every query on a
/// disconnected handle fails with [`Error::NotConnected`].
///
/// Not `Sync`. Hosts that share one handle across tasks wrap it in
/// [`SharedDatabase`](crate::SharedDatabase).
pub struct Database {
    connection: Option<Connection>,
    sink: Arc<dyn DiagnosticSink>,
    policy: FailurePolicy,
    /// Set through [`Database::with_failure_policy`]; outranks the config.
    pinned_policy: Option<FailurePolicy>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            connection: None,
            sink: Arc::new(TracingSink),
            policy: FailurePolicy::Return,
            pinned_policy: None,
        }
    }

    /// Register the sink notified on every failed statement, replacing the
    /// default [`TracingSink`].
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Fix the failure policy; the config's policy is then ignored on connect.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self.pinned_policy = Some(policy);
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the connection described by `config`.
    ///
    /// The config's failure policy applies unless one was set with
    /// [`with_failure_policy`](Self::with_failure_policy). On failure the
    /// handle stays disconnected.
    pub fn connect(&mut self, config: &DatabaseConfig) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::AlreadyConnected);
        }
        self.policy = self.pinned_policy.unwrap_or(config.failure_policy);
        let connection = match open(config) {
            Ok(connection) => connection,
            Err(err) => {
                let err = Error::connection(&config.database, &err);
                error!(database = %config.database, code = err.code(), "{err}");
                return Err(self.apply_policy(err));
            }
        };
        info!(database = %config.database, read_only = config.read_only, "connected");
        self.connection = Some(connection);
        Ok(())
    }

    /// Run `sql` and collect every result row, in engine order.
    ///
    /// A query that matches nothing yields an empty vector. Every row holds
    /// one key per distinct result column name; see [`Row`].
    pub fn select(&self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.conn()?;
        let rows = collect_rows(conn, sql);
        let rows = self.check(sql, rows)?;
        debug!(sql, rows = rows.len(), "select");
        Ok(rows)
    }

    /// First row [`select`](Self::select) yields for `sql`, or an empty row.
    pub fn row(&self, sql: &str) -> Result<Row> {
        Ok(self.select(sql)?.into_iter().next().unwrap_or_default())
    }

    /// Insert one row built from `data`.
    ///
    /// Returns the affected row count, or the generated id when asked for
    /// with [`ReturnId::GeneratedId`].
    pub fn insert(
        &self,
        table: &str,
        data: &ColumnValueMap,
        return_id: impl Into<ReturnId>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        let sql = statement::insert_sql(table, data)?;
        let affected = self.check(&sql, conn.execute(&sql, []))?;
        debug!(sql = %sql, affected, "insert");
        match return_id.into() {
            ReturnId::AffectedRows => Ok(affected as i64),
            ReturnId::GeneratedId => {
                let id = conn.last_insert_rowid();
                let has_rowid_alias = self.check(&sql, has_rowid_alias(conn, table))?;
                Ok(if has_rowid_alias { id } else { 0 })
            }
        }
    }

    /// Set the columns in `data` on every row matching `where_clause`.
    ///
    /// `true` means the statement ran, not that any row changed.
    pub fn update(&self, table: &str, data: &ColumnValueMap, where_clause: &str) -> Result<bool> {
        let conn = self.conn()?;
        let sql = statement::update_sql(table, data, where_clause)?;
        let affected = self.check(&sql, conn.execute(&sql, []))?;
        debug!(sql = %sql, affected, "update");
        Ok(true)
    }

    /// Delete every row matching `where_clause`.
    ///
    /// `true` means the statement ran, not that any row was removed.
    pub fn delete(&self, table: &str, where_clause: &str) -> Result<bool> {
        let conn = self.conn()?;
        let sql = statement::delete_sql(table, where_clause);
        let affected = self.check(&sql, conn.execute(&sql, []))?;
        debug!(sql = %sql, affected, "delete");
        Ok(true)
    }

    /// Run one or more raw statements (DDL, bulk writes) returning no rows.
    ///
    /// Returns the number of rows inserted, updated or deleted by the whole
    /// batch; DDL counts as zero.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        let conn = self.conn()?;
        let before = self.check(TOTAL_CHANGES_SQL, total_changes(conn))?;
        self.check(sql, conn.execute_batch(sql))?;
        let after = self.check(TOTAL_CHANGES_SQL, total_changes(conn))?;
        let changes = usize::try_from(after - before).unwrap_or(0);
        debug!(sql, changes, "execute");
        Ok(changes)
    }

    fn conn(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(Error::NotConnected)
    }

    /// Classify the engine outcome of `sql`, reporting a failure to the sink.
    fn check<T>(&self, sql: &str, result: rusqlite::Result<T>) -> Result<T> {
        result.map_err(|err| {
            let err = Error::query(sql, &err);
            self.sink.on_query_failure(&err);
            self.apply_policy(err)
        })
    }

    fn apply_policy(&self, err: Error) -> Error {
        if self.policy == FailurePolicy::Terminate {
            eprintln!("{err}");
            std::process::exit(1);
        }
        err
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connected", &self.is_connected())
            .field("policy", &self.policy)
            .finish()
    }
}

fn open(config: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if config.read_only {
        flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
    } else {
        flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
    }
    let conn = Connection::open_with_flags(&config.database, flags)?;
    if let Some(ms) = config.busy_timeout_ms {
        conn.busy_timeout(Duration::from_millis(ms))?;
    }
    if let Some(sql) = &config.init_sql {
        conn.execute_batch(sql)?;
    }
    Ok(conn)
}

fn collect_rows(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            map.insert(name.clone(), Value::from(row.get_ref(i)?));
        }
        result.push(map);
    }
    Ok(result)
}

const TOTAL_CHANGES_SQL: &str = "SELECT total_changes()";

fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(TOTAL_CHANGES_SQL, [], |row| row.get(0))
}

/// Whether `table` is a rowid table whose single-column `INTEGER PRIMARY
/// KEY` aliases the rowid, i.e. SQLite assigns its value on insert.
///
/// Unqualified names resolve like SQLite does: `temp` first, then `main`,
/// then attached schemas.
fn has_rowid_alias(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let (schema, name) = statement::split_table_name(table);
    let mut stmt = conn.prepare(
        "SELECT schema, name, wr FROM pragma_table_list \
         WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
    )?;
    let candidates = stmt
        .query_map([&name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let found = match &schema {
        Some(wanted) => candidates
            .into_iter()
            .find(|(schema, ..)| schema.eq_ignore_ascii_case(wanted)),
        None => candidates.into_iter().min_by_key(|(schema, ..)| match schema.as_str() {
            "temp" => 0,
            "main" => 1,
            _ => 2,
        }),
    };
    let Some((schema, name, without_rowid)) = found else {
        return Ok(false);
    };
    if without_rowid {
        return Ok(false);
    }
    let mut stmt = conn.prepare("SELECT type FROM pragma_table_info(?1, ?2) WHERE pk > 0")?;
    let key_types = stmt
        .query_map([&name, &schema], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(matches!(key_types.as_slice(), [ty] if ty.eq_ignore_ascii_case("INTEGER")))
}
