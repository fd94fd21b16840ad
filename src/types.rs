//! Row types shared by every stage.
//!
//! These mirror the gateway collections one-to-one and are serialized into
//! the snapshot (stage 1) and processed manifest (stage 2) unchanged, so the
//! field names follow the gateway's column names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One placement in one program: row of the `results` collection.
///
/// At most one row exists per (year, event, category, position).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    pub event: String,
    pub category: String,
    /// Placement, 1 through 3.
    pub position: u8,
    pub participant: String,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A competing team on the points leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub points: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Image,
    Video,
}

impl BackgroundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackgroundKind::Image => "image",
            BackgroundKind::Video => "video",
        }
    }
}

impl std::str::FromStr for BackgroundKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(BackgroundKind::Image),
            "video" => Ok(BackgroundKind::Video),
            other => Err(format!("unknown background type '{other}' (expected image or video)")),
        }
    }
}

/// Hero background for the home page. At most one row is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomepageBackground {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsStatus {
    Published,
    Draft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Markdown body.
    #[serde(default)]
    pub content: Option<String>,
    pub category: String,
    pub status: NewsStatus,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub views: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub image_url: String,
    #[serde(default)]
    pub photographer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One named block of about-page copy (`mission`, `vision`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AboutContent {
    pub section: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A unique (event, category) pair derived from result rows. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    pub event: String,
    pub category: String,
}

impl Program {
    pub fn new(event: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            category: category.into(),
        }
    }

    /// Identity key: event and category joined with a dash.
    pub fn key(&self) -> String {
        format!("{}-{}", self.event, self.category)
    }

    pub fn matches(&self, row: &ResultRow) -> bool {
        row.event == self.event && row.category == self.category
    }
}

/// Everything a poster needs: the program and its winning rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterData {
    pub program: Program,
    pub winners: Vec<ResultRow>,
}

/// Outcome of one collection query.
///
/// A failed query never aborts a build: the failure is kept with its raw
/// message so the page can show it inline while rendering everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loaded<T> {
    Ready(T),
    Failed { message: String },
}

impl<T> Loaded<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Loaded::Ready(v),
            Err(e) => Loaded::Failed {
                message: e.to_string(),
            },
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loaded::Ready(v) => Some(v),
            Loaded::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loaded::Ready(_) => None,
            Loaded::Failed { message } => Some(message),
        }
    }
}

impl<T: Default> Default for Loaded<T> {
    fn default() -> Self {
        Loaded::Ready(T::default())
    }
}

/// Accept `"2025"` or `2025` for text columns the gateway may type as integer.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
