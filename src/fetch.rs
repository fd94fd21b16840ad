//! Stage 1: pull every collection the site needs into a snapshot.
//!
//! The snapshot is a JSON file (`snapshot.json` in the temp directory) that
//! the poster and generate stages read instead of talking to the gateway.
//! It also carries the resolved site config, so later stages never re-read
//! `config.toml`.
//!
//! A failing query does not fail the stage. Its collection is stored as
//! [`Loaded::Failed`] with the gateway's message and the page that shows it
//! renders a connection-error banner instead.
//!
//! ## Concurrency
//!
//! Results for every published year and the team leaderboard are fetched
//! concurrently on the rayon pool and joined before the snapshot is built.
//! The remaining collections are small and fetched in turn.

use crate::config::SiteConfig;
use crate::gateway::Gateway;
use crate::gateway::collections;
use crate::types::{
    GalleryItem, HomepageBackground, Loaded, NewsItem, ResultRow, Team, TeamMember,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the site shows, as of `fetched_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub years: Vec<YearResults>,
    pub teams: Loaded<Vec<Team>>,
    pub active_background: Loaded<Option<HomepageBackground>>,
    pub news: Loaded<Vec<NewsItem>>,
    pub gallery: Loaded<Vec<GalleryItem>>,
    pub about: Loaded<BTreeMap<String, String>>,
    pub team_members: Loaded<Vec<TeamMember>>,
    pub config: SiteConfig,
}

/// Result rows of one year, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearResults {
    pub year: String,
    pub results: Loaded<Vec<ResultRow>>,
}

impl Snapshot {
    pub fn year(&self, year: &str) -> Option<&YearResults> {
        self.years.iter().find(|y| y.year == year)
    }

    /// Names of collections whose query failed.
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut note = |name: String, err: Option<&str>| {
            if let Some(message) = err {
                out.push((name, message.to_string()));
            }
        };
        for y in &self.years {
            note(format!("results {}", y.year), y.results.error());
        }
        note("teams".into(), self.teams.error());
        note("background".into(), self.active_background.error());
        note("news".into(), self.news.error());
        note("gallery".into(), self.gallery.error());
        note("about".into(), self.about.error());
        note("team members".into(), self.team_members.error());
        out
    }

    pub fn save(&self, path: &Path) -> Result<(), FetchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Results of one year and the leaderboard, fetched side by side.
pub fn fetch_year(
    gw: &dyn Gateway,
    year: &str,
) -> (Loaded<Vec<ResultRow>>, Loaded<Vec<Team>>) {
    rayon::join(
        || Loaded::from_result(collections::results_for_year(gw, year)),
        || Loaded::from_result(collections::teams(gw)),
    )
}

/// Build a snapshot of every collection.
pub fn fetch(gw: &dyn Gateway, config: &SiteConfig) -> Snapshot {
    let (years, teams) = rayon::join(
        || {
            config
                .results
                .years
                .par_iter()
                .map(|year| YearResults {
                    year: year.clone(),
                    results: Loaded::from_result(collections::results_for_year(gw, year)),
                })
                .collect::<Vec<_>>()
        },
        || Loaded::from_result(collections::teams(gw)),
    );

    let snapshot = Snapshot {
        fetched_at: Utc::now(),
        years,
        teams,
        active_background: Loaded::from_result(collections::active_background(gw)),
        news: Loaded::from_result(collections::published_news(gw, None)),
        gallery: Loaded::from_result(collections::gallery(gw, None)),
        about: Loaded::from_result(collections::about_sections(gw)),
        team_members: Loaded::from_result(collections::team_members(gw)),
        config: config.clone(),
    };
    for (name, message) in snapshot.failures() {
        tracing::warn!(collection = %name, %message, "query failed");
    }
    snapshot
}
