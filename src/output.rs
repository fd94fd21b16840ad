//! CLI output formatting for all pipeline stages and commands.
//!
//! # Information-First Display
//!
//! Output is organized around what the site shows, not around files: years,
//! programs and teams lead each line, with paths and cache decisions as
//! indented context underneath.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! Results
//!     2025: 7 rows, 3 programs
//!     2024: 0 rows
//!     2023: Connection Error: 503: timeout
//! Teams: 4
//! Background: bg-2 (image)
//! News: 2 published
//! ```
//!
//! ## Posters
//!
//! ```text
//! 2025 (3 programs)
//!     001 Arabic Song - Junior
//!         ledger: rendered
//! ```
//!
//! ## Generate
//!
//! ```text
//! Home → index.html
//! Results 2025 → results/2025/index.html
//! Generated 9 pages, 15 posters, 2 assets
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::admin::AdminOutcome;
use crate::export::ShareOutcome;
use crate::fetch::Snapshot;
use crate::generate::GeneratedSite;
use crate::process::{CacheOutcome, ProcessEvent};
use crate::types::Loaded;
use crate::view::{ResultsView, Tab, ViewState};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

fn count_line<T>(label: &str, loaded: &Loaded<Vec<T>>, noun: &str) -> String {
    match loaded {
        Loaded::Ready(items) => format!("{}: {} {}", label, items.len(), noun),
        Loaded::Failed { message } => format!("{}: Connection Error: {}", label, message),
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 1: Fetch output
// ============================================================================

/// Format what the fetch stage pulled, one collection per line.
pub fn format_fetch_output(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec!["Results".to_string()];
    for year in &snapshot.years {
        let line = match &year.results {
            Loaded::Ready(rows) if rows.is_empty() => format!("{}: 0 rows", year.year),
            Loaded::Ready(rows) => format!(
                "{}: {} rows, {} programs",
                year.year,
                rows.len(),
                crate::aggregate::unique_programs(rows).len()
            ),
            Loaded::Failed { message } => {
                format!("{}: Connection Error: {}", year.year, message)
            }
        };
        lines.push(format!("{}{}", indent(1), line));
    }
    lines.push(count_line("Teams", &snapshot.teams, "teams"));
    lines.push(match &snapshot.active_background {
        Loaded::Ready(Some(bg)) => format!("Background: {} ({})", bg.id, bg.kind.as_str()),
        Loaded::Ready(None) => "Background: none active (fallback gradient)".to_string(),
        Loaded::Failed { message } => format!("Background: Connection Error: {}", message),
    });
    lines.push(count_line("News", &snapshot.news, "published"));
    lines.push(count_line("Gallery", &snapshot.gallery, "items"));
    lines.push(match &snapshot.about {
        Loaded::Ready(sections) => format!("About: {} sections", sections.len()),
        Loaded::Failed { message } => format!("About: Connection Error: {}", message),
    });
    lines.push(count_line("Team members", &snapshot.team_members, "members"));
    lines
}

pub fn print_fetch_output(snapshot: &Snapshot) {
    print_lines(format_fetch_output(snapshot));
}

// ============================================================================
// Stage 2: Poster output
// ============================================================================

/// Format a single poster progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::YearStarted { year, programs } => {
            vec![format!("{} ({} programs)", year, programs)]
        }
        ProcessEvent::YearSkipped { year, message } => {
            vec![format!("{} skipped: {}", year, message)]
        }
        ProcessEvent::PosterDone {
            program,
            style,
            outcome,
            ..
        } => {
            let status = match outcome {
                CacheOutcome::Cached => "cached",
                CacheOutcome::Copied => "copied",
                CacheOutcome::Rendered => "rendered",
            };
            vec![format!(
                "{}{} - {} [{}]: {}",
                indent(1),
                program.event,
                program.category,
                style,
                status
            )]
        }
    }
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

fn page_label(page: &str) -> String {
    match page {
        "index.html" => "Home".to_string(),
        "news.html" => "News".to_string(),
        "gallery.html" => "Gallery".to_string(),
        "about.html" => "About".to_string(),
        other => {
            if let Some(year) = other
                .strip_prefix("results/")
                .and_then(|rest| rest.strip_suffix("/index.html"))
            {
                format!("Results {}", year)
            } else if let Some(id) = other
                .strip_prefix("news/")
                .and_then(|rest| rest.strip_suffix(".html"))
            {
                format!("{}Article {}", indent(1), id)
            } else {
                other.to_string()
            }
        }
    }
}

/// Format generate stage output: each page with its path, then totals.
pub fn format_generate_output(site: &GeneratedSite) -> Vec<String> {
    let mut lines: Vec<String> = site
        .pages
        .iter()
        .map(|p| format!("{} \u{2192} {}", page_label(p), p))
        .collect();
    lines.push(format!(
        "Generated {} pages, {} posters, {} assets",
        site.pages.len(),
        site.posters,
        site.assets
    ));
    lines
}

pub fn print_generate_output(site: &GeneratedSite) {
    print_lines(format_generate_output(site));
}

// ============================================================================
// Results view output
// ============================================================================

/// Format the active tab of a results view, as the results screen lists it.
pub fn format_results_view(view: &ResultsView) -> Vec<String> {
    let tab = match view.tab() {
        Tab::Programs => "programs",
        Tab::Teams => "teams",
    };
    let mut header = format!("Results {} \u{00b7} {}", view.year(), tab);
    if !view.search().is_empty() {
        header.push_str(&format!(" \u{00b7} \"{}\"", view.search()));
    }
    let mut lines = vec![header];
    match view.state() {
        ViewState::Loading => lines.push("Loading...".to_string()),
        ViewState::Error(message) => {
            lines.push("Connection Error".to_string());
            lines.push(format!("{}{}", indent(1), message));
        }
        ViewState::NoPrograms => lines.push("No Programs Found".to_string()),
        ViewState::NoTeams => lines.push("No Teams Found".to_string()),
        ViewState::Programs(cards) => {
            for card in cards {
                lines.push(format!(
                    "{} {} - {}",
                    format_index(card.number),
                    card.program.event,
                    card.program.category
                ));
                let data = view.poster_data(&card.program);
                let podium = crate::aggregate::Podium::from_winners(&data.winners);
                for (position, row) in podium.placed() {
                    let team = row
                        .team
                        .as_deref()
                        .map(|t| format!(" ({})", t))
                        .unwrap_or_default();
                    lines.push(format!(
                        "{}{}. {}{}",
                        indent(1),
                        position,
                        truncate(&row.participant, 40),
                        team
                    ));
                }
            }
        }
        ViewState::Teams(teams) => {
            for ranked in teams {
                lines.push(format!(
                    "{} {} \u{2014} {} pts",
                    ranked.label(),
                    ranked.team.name,
                    ranked.team.points
                ));
            }
        }
    }
    lines
}

pub fn print_results_view(view: &ResultsView) {
    print_lines(format_results_view(view));
}

// ============================================================================
// Poster export output
// ============================================================================

pub fn format_poster_export(path: &Path, shared: Option<&ShareOutcome>) -> Vec<String> {
    let mut lines = vec![format!("Saved {}", path.display())];
    match shared {
        Some(ShareOutcome::Shared) => lines.push("Shared".to_string()),
        Some(ShareOutcome::LinkCopied) => lines.push("Link copied to clipboard!".to_string()),
        None => {}
    }
    lines
}

pub fn print_poster_export(path: &Path, shared: Option<&ShareOutcome>) {
    print_lines(format_poster_export(path, shared));
}

// ============================================================================
// Admin output
// ============================================================================

pub fn format_admin_outcome(outcome: &AdminOutcome) -> Vec<String> {
    match outcome {
        AdminOutcome::Backgrounds(list) if list.is_empty() => {
            vec!["No backgrounds".to_string()]
        }
        AdminOutcome::Backgrounds(list) => list
            .iter()
            .map(|bg| {
                format!(
                    "{} {} {} {}",
                    if bg.is_active { "*" } else { " " },
                    bg.id,
                    bg.kind.as_str(),
                    bg.url
                )
            })
            .collect(),
        AdminOutcome::BackgroundAdded(bg) => {
            vec![format!("Added {} background {} (inactive)", bg.kind.as_str(), bg.id)]
        }
        AdminOutcome::Activated { id } => vec![format!("Background {} is now active", id)],
        AdminOutcome::ResultAdded(row) => vec![format!(
            "Added {} - {} place {}: {} ({})",
            row.event, row.category, row.position, row.participant, row.id
        )],
        AdminOutcome::TeamAdded(team) => vec![format!(
            "Added team {} with {} points ({})",
            team.name, team.points, team.id
        )],
        AdminOutcome::PointsSet { id, points } => {
            vec![format!("Team {} now has {} points", id, points)]
        }
        AdminOutcome::Deleted { table, id } => vec![format!("Deleted {} from {}", id, table)],
    }
}

pub fn print_admin_outcome(outcome: &AdminOutcome) {
    print_lines(format_admin_outcome(outcome));
}

// ============================================================================
// Tests
// ============================================================================
