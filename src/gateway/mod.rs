//! Access to the hosted data service.
//!
//! The service speaks a PostgREST-style dialect: every collection is a table
//! that answers filtered, ordered, limited selects and accepts inserts,
//! filtered updates and filtered deletes. Stored functions are reachable as
//! RPC calls.
//!
//! The [`Gateway`] trait exposes exactly those primitives over JSON values,
//! and [`collections`] layers typed queries (results for a year, teams by
//! points, ...) on top. Two implementations exist:
//!
//! | Gateway | Use |
//! |---------|-----|
//! | [`RestGateway`] | The live service over HTTP (`reqwest::blocking`) |
//! | [`MemoryGateway`] | Offline builds from a seed file, and tests |
//!
//! Authentication lives in [`auth`]; an authenticated session only changes
//! the bearer token the REST gateway sends.

pub mod auth;
pub mod collections;
pub mod memory;
pub mod query;
pub mod rest;

pub use memory::MemoryGateway;
pub use query::{Filter, Order, Query};
pub use rest::RestGateway;

use crate::config::ActivationMode;
use serde_json::{Value, json};
use thiserror::Error;

/// Names of the collections the site reads and writes.
pub mod tables {
    pub const RESULTS: &str = "results";
    pub const TEAMS: &str = "teams";
    pub const BACKGROUNDS: &str = "homepage_background";
    pub const NEWS: &str = "news";
    pub const GALLERY: &str = "gallery";
    pub const ABOUT: &str = "about_content";
    pub const TEAM_MEMBERS: &str = "team_members";
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The service answered with a non-success status.
    #[error("{status}: {message}")]
    Status { status: u16, message: String },
    #[error("Not authenticated: {0}")]
    Unauthorized(String),
    #[error("No {table} row with id '{id}'")]
    NotFound { table: String, id: String },
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Invalid data: {0}")]
    Invalid(String),
    /// The deactivate step succeeded but activating the target failed.
    /// No background is active until activation is retried.
    #[error(
        "Background activation incomplete: all backgrounds were deactivated but '{id}' could not be activated: {source}"
    )]
    PartialActivation {
        id: String,
        #[source]
        source: Box<GatewayError>,
    },
}

/// Primitive operations of the hosted data service.
///
/// Implementations must be `Sync`: the fetch stage issues independent queries
/// from rayon worker threads.
pub trait Gateway: Sync {
    /// Rows of `query.table` matching every filter, ordered and limited.
    fn select(&self, query: &Query) -> Result<Vec<Value>, GatewayError>;

    /// Insert one row. Returns the row as stored (with generated columns).
    fn insert(&self, table: &str, row: Value) -> Result<Value, GatewayError>;

    /// Merge `patch` into every row matching `filters`. Returns the number of
    /// rows touched.
    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<usize, GatewayError>;

    /// Delete every row matching `filters`. Returns the number of rows removed.
    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, GatewayError>;

    /// Call a stored function.
    fn rpc(&self, function: &str, args: Value) -> Result<Value, GatewayError>;

    /// Make `id` the single active homepage background.
    ///
    /// In [`ActivationMode::TwoStep`] this issues two writes: every active row
    /// is deactivated, then the target is activated. If the second write
    /// fails, no background is active and [`GatewayError::PartialActivation`]
    /// is returned. [`ActivationMode::Atomic`] delegates the swap to the
    /// stored function `function`, which performs it in one transaction.
    fn activate_background(
        &self,
        id: &str,
        mode: ActivationMode,
        function: &str,
    ) -> Result<(), GatewayError> {
        match mode {
            ActivationMode::TwoStep => {
                self.update(
                    tables::BACKGROUNDS,
                    &[Filter::eq("is_active", true)],
                    json!({ "is_active": false }),
                )?;
                let activated = self
                    .update(
                        tables::BACKGROUNDS,
                        &[Filter::eq("id", id)],
                        json!({ "is_active": true }),
                    )
                    .and_then(|n| {
                        if n == 0 {
                            Err(GatewayError::NotFound {
                                table: tables::BACKGROUNDS.to_string(),
                                id: id.to_string(),
                            })
                        } else {
                            Ok(())
                        }
                    });
                activated.map_err(|e| GatewayError::PartialActivation {
                    id: id.to_string(),
                    source: Box::new(e),
                })
            }
            ActivationMode::Atomic => {
                self.rpc(function, json!({ "target_id": id }))?;
                Ok(())
            }
        }
    }
}
