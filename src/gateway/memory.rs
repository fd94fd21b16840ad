//! In-process gateway over JSON rows.
//!
//! Backs offline builds (`--seed data.json`) and every test that needs a
//! data service. Each table is a `Vec<Value>` behind a mutex; queries are
//! evaluated with [`Query::apply`] so filtering and ordering match the REST
//! dialect.
//!
//! Every call is recorded and failures can be injected per table (reads) or
//! after a number of successful writes, which is how partial background
//! activation is exercised.
//!
//! Seed file format: one JSON object mapping table names to row arrays.
//!
//! ```json
//! { "results": [ { "id": "r1", "year": "2025", ... } ], "teams": [] }
//! ```

use super::{Filter, Gateway, GatewayError, Query, tables};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(String),
    Insert(String),
    Update { table: String, filters: Vec<String> },
    Delete { table: String, filters: Vec<String> },
    Rpc(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Select(_))
    }
}

#[derive(Debug, Default)]
struct Failures {
    /// Reads of these tables fail with the given message.
    tables: HashMap<String, String>,
    /// Writes fail once this many have succeeded.
    writes_after: Option<(usize, String)>,
    writes_done: usize,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Failures>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table from a seed file.
    pub fn from_seed_file(path: &Path) -> Result<Self, GatewayError> {
        let content = std::fs::read_to_string(path)?;
        let raw: HashMap<String, Vec<Value>> = serde_json::from_str(&content)?;
        let gw = Self::new();
        *lock(&gw.tables) = raw;
        Ok(gw)
    }

    /// Append typed rows to a table.
    pub fn seed<T: Serialize>(&self, table: &str, rows: Vec<T>) {
        let values: Vec<Value> = rows
            .into_iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(values);
    }

    /// Current contents of a table, in storage order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Make every read of `table` fail with `message`.
    pub fn fail_table(&self, table: &str, message: &str) {
        lock(&self.failures)
            .tables
            .insert(table.to_string(), message.to_string());
    }

    /// Let `n` more writes succeed, then fail every write with `message`.
    pub fn fail_writes_after(&self, n: usize, message: &str) {
        let mut failures = lock(&self.failures);
        failures.writes_after = Some((failures.writes_done + n, message.to_string()));
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn check_write(&self) -> Result<(), GatewayError> {
        let mut failures = lock(&self.failures);
        if let Some((limit, message)) = &failures.writes_after
            && failures.writes_done >= *limit
        {
            return Err(GatewayError::Status {
                status: 503,
                message: message.clone(),
            });
        }
        failures.writes_done += 1;
        Ok(())
    }

    fn next_id(rows: &[Value], table: &str) -> String {
        format!("{}-{}", table, rows.len() + 1)
    }
}

fn describe(filters: &[Filter]) -> Vec<String> {
    filters
        .iter()
        .map(|f| {
            let (col, val) = f.to_pair();
            format!("{col}={val}")
        })
        .collect()
}

impl Gateway for MemoryGateway {
    fn select(&self, query: &Query) -> Result<Vec<Value>, GatewayError> {
        self.record(Call::Select(query.table.clone()));
        if let Some(message) = lock(&self.failures).tables.get(&query.table) {
            return Err(GatewayError::Status {
                status: 503,
                message: message.clone(),
            });
        }
        let tables = lock(&self.tables);
        let rows = tables.get(&query.table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(query.apply(rows))
    }

    fn insert(&self, table: &str, row: Value) -> Result<Value, GatewayError> {
        self.record(Call::Insert(table.to_string()));
        self.check_write()?;
        let Value::Object(mut fields) = row else {
            return Err(GatewayError::Invalid(format!(
                "insert into {table} expects an object"
            )));
        };
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table.to_string()).or_default();
        if !fields.contains_key("id") {
            fields.insert("id".into(), Value::String(Self::next_id(rows, table)));
        }
        if !fields.contains_key("created_at") {
            fields.insert(
                "created_at".into(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        let stored = Value::Object(fields);
        rows.push(stored.clone());
        Ok(stored)
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<usize, GatewayError> {
        self.record(Call::Update {
            table: table.to_string(),
            filters: describe(filters),
        });
        self.check_write()?;
        let patch: Map<String, Value> = match patch {
            Value::Object(m) => m,
            _ => {
                return Err(GatewayError::Invalid(format!(
                    "update of {table} expects an object"
                )));
            }
        };
        let mut tables = lock(&self.tables);
        let mut touched = 0;
        for row in tables.get_mut(table).into_iter().flatten() {
            if filters.iter().all(|f| f.matches(row))
                && let Value::Object(fields) = row
            {
                for (k, v) in &patch {
                    fields.insert(k.clone(), v.clone());
                }
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, GatewayError> {
        self.record(Call::Delete {
            table: table.to_string(),
            filters: describe(filters),
        });
        self.check_write()?;
        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filters.iter().all(|f| f.matches(row)));
        Ok(before - rows.len())
    }

    fn rpc(&self, function: &str, args: Value) -> Result<Value, GatewayError> {
        self.record(Call::Rpc(function.to_string()));
        self.check_write()?;
        match function {
            "set_active_background" => {
                let target = args
                    .get("target_id")
                    .map(super::query::param_text)
                    .ok_or_else(|| GatewayError::Invalid("missing target_id".into()))?;
                let mut store = lock(&self.tables);
                let rows = store.entry(tables::BACKGROUNDS.to_string()).or_default();
                let by_id = Filter::eq("id", target.as_str());
                if !rows.iter().any(|r| by_id.matches(r)) {
                    return Err(GatewayError::NotFound {
                        table: tables::BACKGROUNDS.to_string(),
                        id: target,
                    });
                }
                for row in rows.iter_mut() {
                    let active = by_id.matches(row);
                    if let Value::Object(fields) = row {
                        fields.insert("is_active".into(), Value::Bool(active));
                    }
                }
                Ok(Value::Null)
            }
            other => Err(GatewayError::UnknownFunction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn select_reads_seeded_rows() {
        let gw = MemoryGateway::new();
        gw.seed("teams", vec![json!({ "id": "t1", "name": "Blue", "points": 3 })]);
        let rows = gw.select(&Query::new("teams")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(gw.calls(), vec![Call::Select("teams".into())]);
    }

    #[test]
    fn select_of_unknown_table_is_empty() {
        let gw = MemoryGateway::new();
        assert!(gw.select(&Query::new("nothing")).unwrap().is_empty());
    }

    #[test]
    fn failed_table_returns_status_error() {
        let gw = MemoryGateway::new();
        gw.fail_table("teams", "relation does not exist");
        let err = gw.select(&Query::new("teams")).unwrap_err();
        assert_eq!(err.to_string(), "503: relation does not exist");
    }

    #[test]
    fn insert_assigns_id_and_timestamp() {
        let gw = MemoryGateway::new();
        let row = gw.insert("teams", json!({ "name": "Blue", "points": 0 })).unwrap();
        assert_eq!(row["id"], "teams-1");
        assert!(row["created_at"].is_string());
        assert_eq!(gw.rows("teams").len(), 1);
    }

    #[test]
    fn insert_rejects_non_object() {
        let gw = MemoryGateway::new();
        assert!(matches!(
            gw.insert("teams", json!([1, 2])),
            Err(GatewayError::Invalid(_))
        ));
    }

    #[test]
    fn update_touches_matching_rows_only() {
        let gw = MemoryGateway::new();
        gw.seed(
            "teams",
            vec![
                json!({ "id": "t1", "points": 1 }),
                json!({ "id": "t2", "points": 2 }),
            ],
        );
        let n = gw
            .update("teams", &[Filter::eq("id", "t2")], json!({ "points": 9 }))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(gw.rows("teams")[0]["points"], 1);
        assert_eq!(gw.rows("teams")[1]["points"], 9);
    }

    #[test]
    fn delete_removes_matching_rows() {
        let gw = MemoryGateway::new();
        gw.seed("teams", vec![json!({ "id": "t1" }), json!({ "id": "t2" })]);
        assert_eq!(gw.delete("teams", &[Filter::eq("id", "t1")]).unwrap(), 1);
        assert_eq!(gw.rows("teams").len(), 1);
    }

    #[test]
    fn writes_fail_after_budget() {
        let gw = MemoryGateway::new();
        gw.fail_writes_after(1, "down");
        assert!(gw.insert("teams", json!({ "name": "a" })).is_ok());
        assert!(gw.insert("teams", json!({ "name": "b" })).is_err());
        assert_eq!(gw.rows("teams").len(), 1);
    }

    #[test]
    fn unknown_rpc_is_error() {
        let gw = MemoryGateway::new();
        assert!(matches!(
            gw.rpc("drop_everything", json!({})),
            Err(GatewayError::UnknownFunction(_))
        ));
    }

    #[test]
    fn loads_seed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seed.json");
        std::fs::write(
            &path,
            r#"{ "teams": [ { "id": "t1", "name": "Blue", "points": 4 } ] }"#,
        )
        .unwrap();
        let gw = MemoryGateway::from_seed_file(&path).unwrap();
        assert_eq!(gw.rows("teams").len(), 1);
    }

    #[test]
    fn malformed_seed_file_is_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seed.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            MemoryGateway::from_seed_file(&path),
            Err(GatewayError::Json(_))
        ));
    }
}
