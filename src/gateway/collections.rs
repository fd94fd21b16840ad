//! Typed reads and writes over the site's collections.
//!
//! Each function is one query with fixed filters and ordering; callers never
//! assemble table names or column strings themselves.

use super::{Filter, Gateway, GatewayError, Query, tables};
use crate::types::{
    AboutContent, BackgroundKind, GalleryItem, HomepageBackground, NewsItem, ResultRow, Team,
    TeamMember,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(GatewayError::from))
        .collect()
}

fn select<T: DeserializeOwned>(gw: &dyn Gateway, query: Query) -> Result<Vec<T>, GatewayError> {
    tracing::debug!(table = %query.table, "select");
    decode(gw.select(&query)?)
}

// =============================================================================
// Reads
// =============================================================================

/// Result rows for one year, newest first.
pub fn results_for_year(gw: &dyn Gateway, year: &str) -> Result<Vec<ResultRow>, GatewayError> {
    select(
        gw,
        Query::new(tables::RESULTS)
            .eq("year", year)
            .order_desc("created_at"),
    )
}

/// All teams, highest points first.
pub fn teams(gw: &dyn Gateway) -> Result<Vec<Team>, GatewayError> {
    select(gw, Query::new(tables::TEAMS).order_desc("points"))
}

/// All homepage backgrounds, newest first.
pub fn backgrounds(gw: &dyn Gateway) -> Result<Vec<HomepageBackground>, GatewayError> {
    select(gw, Query::new(tables::BACKGROUNDS).order_desc("created_at"))
}

/// The active homepage background, if any.
pub fn active_background(gw: &dyn Gateway) -> Result<Option<HomepageBackground>, GatewayError> {
    let rows: Vec<HomepageBackground> = select(
        gw,
        Query::new(tables::BACKGROUNDS).eq("is_active", true).limit(1),
    )?;
    Ok(rows.into_iter().next())
}

/// Published news, newest first.
pub fn published_news(
    gw: &dyn Gateway,
    limit: Option<usize>,
) -> Result<Vec<NewsItem>, GatewayError> {
    let mut query = Query::new(tables::NEWS)
        .eq("status", "published")
        .order_desc("created_at");
    if let Some(n) = limit {
        query = query.limit(n);
    }
    select(gw, query)
}

/// Gallery items, newest first.
pub fn gallery(gw: &dyn Gateway, limit: Option<usize>) -> Result<Vec<GalleryItem>, GatewayError> {
    let mut query = Query::new(tables::GALLERY).order_desc("created_at");
    if let Some(n) = limit {
        query = query.limit(n);
    }
    select(gw, query)
}

/// About-page copy keyed by section name. Later rows win on duplicate sections.
pub fn about_sections(gw: &dyn Gateway) -> Result<BTreeMap<String, String>, GatewayError> {
    let rows: Vec<AboutContent> = select(gw, Query::new(tables::ABOUT))?;
    Ok(rows.into_iter().map(|r| (r.section, r.content)).collect())
}

/// Team members in the order they joined.
pub fn team_members(gw: &dyn Gateway) -> Result<Vec<TeamMember>, GatewayError> {
    select(gw, Query::new(tables::TEAM_MEMBERS).order_asc("created_at"))
}

// =============================================================================
// Writes
// =============================================================================

/// Fields of a result row supplied by an admin.
#[derive(Debug, Clone, Serialize)]
pub struct NewResult {
    pub year: String,
    pub event: String,
    pub category: String,
    pub position: u8,
    pub participant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

/// Insert a result row.
///
/// Rejects positions outside 1-3 and a position already taken in the same
/// (year, event, category).
pub fn insert_result(gw: &dyn Gateway, new: &NewResult) -> Result<ResultRow, GatewayError> {
    if !(1..=3).contains(&new.position) {
        return Err(GatewayError::Invalid(format!(
            "position must be 1, 2 or 3 (got {})",
            new.position
        )));
    }
    let taken = gw.select(
        &Query::new(tables::RESULTS)
            .eq("year", new.year.as_str())
            .eq("event", new.event.as_str())
            .eq("category", new.category.as_str())
            .eq("position", new.position)
            .limit(1),
    )?;
    if !taken.is_empty() {
        return Err(GatewayError::Invalid(format!(
            "position {} of {} - {} ({}) is already taken",
            new.position, new.event, new.category, new.year
        )));
    }
    let stored = gw.insert(tables::RESULTS, serde_json::to_value(new)?)?;
    Ok(serde_json::from_value(stored)?)
}

pub fn insert_team(gw: &dyn Gateway, name: &str, points: i64) -> Result<Team, GatewayError> {
    let stored = gw.insert(tables::TEAMS, json!({ "name": name, "points": points }))?;
    Ok(serde_json::from_value(stored)?)
}

pub fn set_team_points(gw: &dyn Gateway, id: &str, points: i64) -> Result<(), GatewayError> {
    let n = gw.update(
        tables::TEAMS,
        &[Filter::eq("id", id)],
        json!({ "points": points }),
    )?;
    require_one(n, tables::TEAMS, id)
}

/// Add an inactive background.
pub fn insert_background(
    gw: &dyn Gateway,
    kind: BackgroundKind,
    url: &str,
) -> Result<HomepageBackground, GatewayError> {
    let stored = gw.insert(
        tables::BACKGROUNDS,
        json!({ "type": kind.as_str(), "url": url, "is_active": false }),
    )?;
    Ok(serde_json::from_value(stored)?)
}

/// Delete one row by id. A missing row is an error.
pub fn delete_by_id(gw: &dyn Gateway, table: &str, id: &str) -> Result<(), GatewayError> {
    let n = gw.delete(table, &[Filter::eq("id", id)])?;
    require_one(n, table, id)
}

fn require_one(n: usize, table: &str, id: &str) -> Result<(), GatewayError> {
    if n == 0 {
        Err(GatewayError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::test_helpers::{result_row, seeded_gateway, team};
    use crate::types::NewsStatus;

    fn new_result(position: u8) -> NewResult {
        NewResult {
            year: "2025".into(),
            event: "Qawali".into(),
            category: "General".into(),
            position,
            participant: "Adil".into(),
            school: None,
            team: Some("Blue".into()),
        }
    }

    #[test]
    fn results_filtered_by_year() {
        let gw = MemoryGateway::new();
        let mut old = result_row("Quiz", "Junior", 1, "Old");
        old.year = "2024".into();
        gw.seed(tables::RESULTS, vec![result_row("Qawali", "General", 1, "New"), old]);

        let rows = results_for_year(&gw, "2024").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].participant, "Old");
    }

    #[test]
    fn year_without_rows_is_empty_not_error() {
        let gw = seeded_gateway();
        assert!(results_for_year(&gw, "1999").unwrap().is_empty());
    }

    #[test]
    fn teams_come_back_by_points() {
        let gw = MemoryGateway::new();
        gw.seed(tables::TEAMS, vec![team("Low", 1), team("High", 9)]);
        let names: Vec<String> = teams(&gw).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["High", "Low"]);
    }

    #[test]
    fn only_published_news_is_listed() {
        let gw = seeded_gateway();
        let news = published_news(&gw, None).unwrap();
        assert!(!news.is_empty());
        assert!(news.iter().all(|n| n.status == NewsStatus::Published));
    }

    #[test]
    fn news_limit_applies() {
        let gw = seeded_gateway();
        assert!(published_news(&gw, Some(1)).unwrap().len() <= 1);
    }

    #[test]
    fn team_members_oldest_first() {
        let gw = seeded_gateway();
        let members = team_members(&gw).unwrap();
        assert!(members.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn about_sections_fold_into_map() {
        let gw = seeded_gateway();
        let sections = about_sections(&gw).unwrap();
        assert!(sections.contains_key("mission"));
    }

    #[test]
    fn insert_result_round_trips() {
        let gw = MemoryGateway::new();
        let row = insert_result(&gw, &new_result(2)).unwrap();
        assert_eq!(row.position, 2);
        assert_eq!(row.team.as_deref(), Some("Blue"));
        assert_eq!(results_for_year(&gw, "2025").unwrap().len(), 1);
    }

    #[test]
    fn insert_result_rejects_taken_position() {
        let gw = MemoryGateway::new();
        insert_result(&gw, &new_result(1)).unwrap();
        let err = insert_result(&gw, &new_result(1)).unwrap_err();
        assert!(err.to_string().contains("already taken"));
    }

    #[test]
    fn insert_result_rejects_out_of_range_position() {
        let gw = MemoryGateway::new();
        assert!(matches!(
            insert_result(&gw, &new_result(4)),
            Err(GatewayError::Invalid(_))
        ));
        assert!(gw.rows(tables::RESULTS).is_empty());
    }

    #[test]
    fn set_points_on_missing_team_is_not_found() {
        let gw = MemoryGateway::new();
        assert!(matches!(
            set_team_points(&gw, "nope", 3),
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[test]
    fn new_background_starts_inactive() {
        let gw = MemoryGateway::new();
        let bg = insert_background(&gw, BackgroundKind::Video, "https://x/v.mp4").unwrap();
        assert!(!bg.is_active);
        assert!(active_background(&gw).unwrap().is_none());
    }

    #[test]
    fn delete_by_id_removes_row() {
        let gw = MemoryGateway::new();
        let t = insert_team(&gw, "Blue", 0).unwrap();
        delete_by_id(&gw, tables::TEAMS, &t.id).unwrap();
        assert!(teams(&gw).unwrap().is_empty());
        assert!(delete_by_id(&gw, tables::TEAMS, &t.id).is_err());
    }
}
