//! Shared test utilities for the muhimmath test suite.
//!
//! Row builders with fixed ids and timestamps, plus a [`MemoryGateway`]
//! seeded with a small but complete event: results for 2025 (none for
//! 2024), teams, backgrounds with one active, news in both statuses, gallery
//! items, about copy and team members.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let gw = seeded_gateway();
//! let rows = vec![result_row("Qawali", "General", 1, "Adil")];
//! ```

use chrono::{DateTime, TimeZone, Utc};

use crate::gateway::{MemoryGateway, tables};
use crate::types::{
    AboutContent, BackgroundKind, GalleryItem, HomepageBackground, NewsItem, NewsStatus,
    ResultRow, Team, TeamMember,
};

// =========================================================================
// Row builders
// =========================================================================

/// Fixed timestamp `minutes` after the 2025 event day opened.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 2, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// A 2025 result row. The id is derived from the placement so it is stable.
pub fn result_row(event: &str, category: &str, position: u8, participant: &str) -> ResultRow {
    ResultRow {
        id: format!("{event}-{category}-{position}").to_lowercase().replace(' ', "-"),
        year: "2025".to_string(),
        event: event.to_string(),
        category: category.to_string(),
        position,
        participant: participant.to_string(),
        school: None,
        team: None,
        created_at: at(0),
    }
}

pub fn team(name: &str, points: i64) -> Team {
    Team {
        id: format!("team-{}", name.to_lowercase()),
        name: name.to_string(),
        points,
    }
}

pub fn background(id: &str, active: bool) -> HomepageBackground {
    HomepageBackground {
        id: id.to_string(),
        kind: BackgroundKind::Image,
        url: format!("https://cdn.muhimmath.org/bg/{id}.jpg"),
        is_active: active,
        created_at: at(0),
    }
}

pub fn news_item(id: &str, title: &str, status: NewsStatus, minutes: i64) -> NewsItem {
    NewsItem {
        id: id.to_string(),
        title: title.to_string(),
        excerpt: Some(format!("{title} in brief")),
        content: Some(format!("# {title}\n\nFull **story** here.")),
        category: "Announcement".to_string(),
        status,
        is_featured: false,
        image_url: None,
        author: Some("Media Desk".to_string()),
        views: 0,
        created_at: at(minutes),
    }
}

pub fn gallery_item(id: &str, title: &str, category: &str, minutes: i64) -> GalleryItem {
    GalleryItem {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(format!("{title} on stage")),
        category: category.to_string(),
        image_url: format!("https://cdn.muhimmath.org/gallery/{id}.jpg"),
        photographer: None,
        created_at: at(minutes),
    }
}

// =========================================================================
// Seeded gateway
// =========================================================================

/// Result rows of the sample event: three programs, one with no second place.
pub fn sample_results() -> Vec<ResultRow> {
    let mut rows = vec![
        result_row("Qawali Competition", "General", 1, "Team Noor"),
        result_row("Qawali Competition", "General", 2, "Team Falah"),
        result_row("Qawali Competition", "General", 3, "Team Huda"),
        result_row("Arabic Song", "Junior", 1, "Adil"),
        result_row("Arabic Song", "Junior", 3, "Ameen"),
        result_row("Essay Writing", "Senior", 1, "Fathima"),
        result_row("Essay Writing", "Senior", 2, "Rahma"),
    ];
    for (i, row) in rows.iter_mut().enumerate() {
        row.created_at = at(i as i64);
        row.school = Some("Muhimmath HSS".to_string());
        row.team = Some(if i % 2 == 0 { "Blue" } else { "Green" }.to_string());
    }
    rows
}

pub fn sample_teams() -> Vec<Team> {
    vec![
        team("Blue", 120),
        team("Green", 150),
        team("Red", 95),
        team("Yellow", 150),
    ]
}

/// A gateway holding the whole sample event.
pub fn seeded_gateway() -> MemoryGateway {
    let gw = MemoryGateway::new();
    gw.seed(tables::RESULTS, sample_results());
    gw.seed(tables::TEAMS, sample_teams());
    gw.seed(
        tables::BACKGROUNDS,
        vec![background("bg-1", false), background("bg-2", true)],
    );
    gw.seed(
        tables::NEWS,
        vec![
            news_item("n1", "Registration Open", NewsStatus::Published, 10),
            news_item("n2", "Schedule Draft", NewsStatus::Draft, 20),
            news_item("n3", "Results Announced", NewsStatus::Published, 30),
        ],
    );
    gw.seed(
        tables::GALLERY,
        vec![
            gallery_item("g1", "Opening Ceremony", "Ceremonies", 5),
            gallery_item("g2", "Qawali Finals", "Competitions", 15),
        ],
    );
    gw.seed(
        tables::ABOUT,
        vec![
            AboutContent {
                section: "mission".to_string(),
                content: "Nurture talent through art and learning.".to_string(),
            },
            AboutContent {
                section: "vision".to_string(),
                content: "A festival for every student.".to_string(),
            },
        ],
    );
    gw.seed(
        tables::TEAM_MEMBERS,
        vec![
            TeamMember {
                id: "m2".to_string(),
                name: "Shameer".to_string(),
                position: "Coordinator".to_string(),
                bio: None,
                image_url: None,
                created_at: at(60),
            },
            TeamMember {
                id: "m1".to_string(),
                name: "Anas".to_string(),
                position: "Convenor".to_string(),
                bio: Some("Leads the organizing committee.".to_string()),
                image_url: None,
                created_at: at(0),
            },
        ],
    );
    gw
}
