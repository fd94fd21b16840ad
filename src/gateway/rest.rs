//! The live data service over HTTP.
//!
//! Tables live under `/rest/v1/<table>`, stored functions under
//! `/rest/v1/rpc/<fn>`. Every request carries the project key as `apikey`
//! and a bearer token: the signed-in user's access token when a session is
//! attached, otherwise the project key itself.

use super::{Filter, Gateway, GatewayError, Query};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

pub struct RestGateway {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: Client,
}

impl RestGateway {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            client,
        })
    }

    /// Send the given user access token instead of the project key.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    pub(crate) fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
        filters.iter().map(Filter::to_pair).collect()
    }
}

/// Turn a non-success response into [`GatewayError::Status`], keeping the
/// service's own message when it sends one.
pub(crate) fn check(resp: Response) -> Result<Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Best human-readable message in an error body.
///
/// PostgREST answers `{"message": ...}`, the auth service `{"msg": ...}` or
/// `{"error_description": ...}`. Anything else is passed through raw.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn json_or_null(resp: Response) -> Result<Value, GatewayError> {
    let text = resp.text()?;
    if text.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

fn row_count(value: &Value) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}

impl Gateway for RestGateway {
    fn select(&self, query: &Query) -> Result<Vec<Value>, GatewayError> {
        tracing::debug!(url = %self.table_url(&query.table), "GET");
        let resp = self
            .authorize(self.client.get(self.table_url(&query.table)))
            .query(&query.to_pairs())
            .send()?;
        Ok(check(resp)?.json()?)
    }

    fn insert(&self, table: &str, row: Value) -> Result<Value, GatewayError> {
        tracing::debug!(url = %self.table_url(table), "POST");
        let resp = self
            .authorize(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()?;
        let stored = json_or_null(check(resp)?)?;
        match stored {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Value::Object(_) => Ok(stored),
            _ => Err(GatewayError::Invalid(format!(
                "insert into {table} returned no row"
            ))),
        }
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<usize, GatewayError> {
        tracing::debug!(url = %self.table_url(table), "PATCH");
        let resp = self
            .authorize(self.client.patch(self.table_url(table)))
            .query(&Self::filter_pairs(filters))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()?;
        Ok(row_count(&json_or_null(check(resp)?)?))
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, GatewayError> {
        tracing::debug!(url = %self.table_url(table), "DELETE");
        let resp = self
            .authorize(self.client.delete(self.table_url(table)))
            .query(&Self::filter_pairs(filters))
            .header("Prefer", "return=representation")
            .send()?;
        Ok(row_count(&json_or_null(check(resp)?)?))
    }

    fn rpc(&self, function: &str, args: Value) -> Result<Value, GatewayError> {
        tracing::debug!(url = %self.rpc_url(function), "POST");
        let resp = self
            .authorize(self.client.post(self.rpc_url(function)))
            .json(&args)
            .send()?;
        json_or_null(check(resp)?)
    }
}
