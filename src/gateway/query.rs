//! Select queries in the PostgREST dialect.
//!
//! A [`Query`] names a table, equality filters, an ordering and an optional
//! limit. It renders to URL query pairs for the REST gateway
//! (`select=*&year=eq.2025&order=created_at.desc&limit=6`) and evaluates
//! directly against JSON rows for the in-memory gateway, so both
//! implementations agree on semantics.

use serde_json::Value;
use std::cmp::Ordering;

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    /// Query-pair form: `("year", "eq.2025")`.
    pub fn to_pair(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", param_text(&self.value)))
    }

    /// Whether `row` satisfies the filter.
    ///
    /// Values compare by their textual form, the way the service coerces a
    /// URL parameter to the column type: `"2025"` matches `2025`.
    pub fn matches(&self, row: &Value) -> bool {
        row.get(&self.column)
            .is_some_and(|v| param_text(v) == param_text(&self.value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    fn to_param(&self) -> String {
        let dir = if self.descending { "desc" } else { "asc" };
        format!("{}.{}", self.column, dir)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// URL query pairs for the REST endpoint of this table.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(self.filters.iter().map(Filter::to_pair));
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(Order::to_param).collect();
            pairs.push(("order".to_string(), order.join(",")));
        }
        if let Some(n) = self.limit {
            pairs.push(("limit".to_string(), n.to_string()));
        }
        pairs
    }

    /// Evaluate against in-memory rows: filter, stable sort, then limit.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut out: Vec<Value> = rows
            .iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();
        if !self.order.is_empty() {
            out.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|o| {
                        let ord = compare_values(a.get(&o.column), b.get(&o.column));
                        if o.descending { ord.reverse() } else { ord }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}

/// Textual form of a JSON scalar as it appears in a URL parameter.
pub fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Nulls and missing columns sort after everything else.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => param_text(x).cmp(&param_text(y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_postgrest_pairs() {
        let q = Query::new("results")
            .eq("year", "2025")
            .order_desc("created_at")
            .limit(6);
        assert_eq!(
            q.to_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("year".to_string(), "eq.2025".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "6".to_string()),
            ]
        );
    }

    #[test]
    fn multiple_orders_join_with_comma() {
        let q = Query::new("teams").order_desc("points").order_asc("name");
        let order = q.to_pairs().into_iter().find(|(k, _)| k == "order").unwrap();
        assert_eq!(order.1, "points.desc,name.asc");
    }

    #[test]
    fn bool_filter_renders_lowercase() {
        assert_eq!(
            Filter::eq("is_active", true).to_pair(),
            ("is_active".to_string(), "eq.true".to_string())
        );
    }

    #[test]
    fn filter_matches_across_number_and_text() {
        let f = Filter::eq("year", "2025");
        assert!(f.matches(&json!({ "year": 2025 })));
        assert!(f.matches(&json!({ "year": "2025" })));
        assert!(!f.matches(&json!({ "year": "2024" })));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn apply_filters_sorts_and_limits() {
        let rows = vec![
            json!({ "name": "a", "points": 10 }),
            json!({ "name": "b", "points": 30 }),
            json!({ "name": "c", "points": 20 }),
        ];
        let out = Query::new("teams").order_desc("points").limit(2).apply(&rows);
        let names: Vec<&str> = out.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn apply_sort_is_stable_for_ties() {
        let rows = vec![
            json!({ "name": "first", "points": 5 }),
            json!({ "name": "second", "points": 5 }),
        ];
        let out = Query::new("teams").order_desc("points").apply(&rows);
        assert_eq!(out[0]["name"], "first");
    }

    #[test]
    fn nulls_sort_last_ascending() {
        let rows = vec![json!({ "n": null }), json!({ "n": 1 })];
        let out = Query::new("t").order_asc("n").apply(&rows);
        assert_eq!(out[0]["n"], 1);
    }
}
