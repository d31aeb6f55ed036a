//! `_TXR_DATABASE`: runs a query and returns its rows.
//!
//! Declared options: `{"client": "'sqlite' | 'pg'"}`.
//! Provided options: `{"client": "sqlite", "database": "/data/app.db", "query": "SELECT ..."}`.
//! Only the `sqlite` client is executed; other declared clients validate but
//! fail at execution time.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Map, Value};
use tracing::debug;
use txr_core::types::Job;

use crate::error::{PluginError, Result, ValidationError};
use crate::executor::{Executor, PluginKind};
use crate::options::{required_str, AllowList};

const CLIENT_OPTION: &str = "client";
const SQLITE: &str = "sqlite";

pub struct DatabaseExecutor;

#[async_trait]
impl Executor for DatabaseExecutor {
    fn kind(&self) -> PluginKind {
        PluginKind::Database
    }

    fn validate(&self, declared: &Value, provided: &Value) -> std::result::Result<(), ValidationError> {
        AllowList::from_declared(declared, CLIENT_OPTION)?.check(provided, CLIENT_OPTION)?;
        required_str(provided, "database")?;
        required_str(provided, "query")?;
        Ok(())
    }

    async fn execute(
        &self,
        _declared: &Value,
        job: &Job,
        _previous: Option<&Value>,
    ) -> Result<Option<Value>> {
        let options = &job.options;
        let client = options.get(CLIENT_OPTION).and_then(Value::as_str).unwrap_or_default();
        if client != SQLITE {
            return Err(PluginError::ExecutionFailed(format!(
                "client {client} is not supported"
            )));
        }

        let (database, query) = match (required_str(options, "database"), required_str(options, "query")) {
            (Ok(d), Ok(q)) => (d.to_string(), q.to_string()),
            (Err(e), _) | (_, Err(e)) => return Err(PluginError::ExecutionFailed(e.to_string())),
        };

        let job_id = job.id.clone();
        let result = tokio::task::spawn_blocking(move || run_query(&database, &query))
            .await
            .map_err(|e| PluginError::ExecutionFailed(format!("query task failed: {e}")))??;

        debug!(job_id = %job_id, "query executed");
        Ok(Some(result))
    }
}

/// Statements that return columns yield an array of row objects; anything
/// else yields `{"rows_affected": n}`.
fn run_query(database: &str, query: &str) -> Result<Value> {
    let conn = Connection::open_with_flags(
        database,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
    )?;
    let mut stmt = conn.prepare(query)?;

    if stmt.column_count() == 0 {
        let changed = stmt.execute([])?;
        return Ok(json!({ "rows_affected": changed }));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut obj = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            obj.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        out.push(Value::Object(obj));
    }
    Ok(Value::Array(out))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => json!(b),
    }
}
