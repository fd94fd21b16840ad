//! Result aggregation: flat result rows → programs, podiums and team ranks.
//!
//! Everything here is a pure function over rows already fetched for one year.
//! No I/O, no gateway access; the view layer re-runs these whenever the year
//! (new rows) or the search term (same rows) changes.

use crate::types::{Program, ResultRow, Team};
use std::collections::HashSet;

/// Unique (event, category) pairs, sorted by event name ignoring case.
///
/// The first row seen for a pair defines the program's spelling. The sort is
/// stable, so programs sharing an event name keep the gateway's order.
pub fn unique_programs(results: &[ResultRow]) -> Vec<Program> {
    let mut seen = HashSet::new();
    let mut programs: Vec<Program> = results
        .iter()
        .filter(|r| seen.insert((r.event.as_str(), r.category.as_str())))
        .map(|r| Program::new(r.event.clone(), r.category.clone()))
        .collect();
    programs.sort_by_cached_key(|p| p.event.to_lowercase());
    programs
}

/// All rows belonging to one program, in fetch order.
pub fn program_winners(results: &[ResultRow], program: &Program) -> Vec<ResultRow> {
    results
        .iter()
        .filter(|r| program.matches(r))
        .cloned()
        .collect()
}

/// Case-insensitive substring match against event or category.
pub fn program_matches(program: &Program, term: &str) -> bool {
    let needle = term.to_lowercase();
    program.event.to_lowercase().contains(&needle)
        || program.category.to_lowercase().contains(&needle)
}

/// Programs whose event or category contains `term`. Empty term keeps all.
pub fn filter_programs(programs: &[Program], term: &str) -> Vec<Program> {
    programs
        .iter()
        .filter(|p| program_matches(p, term))
        .cloned()
        .collect()
}

/// First, second and third place of one program.
///
/// Any slot may be empty; that means "no entry for that rank". Rows with a
/// position outside 1–3 are ignored, and if two rows claim the same position
/// the first one wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Podium<'a> {
    slots: [Option<&'a ResultRow>; 3],
}

impl<'a> Podium<'a> {
    pub fn from_winners(winners: &'a [ResultRow]) -> Self {
        let mut slots = [None; 3];
        for row in winners {
            if let Some(slot) = (row.position as usize)
                .checked_sub(1)
                .and_then(|i| slots.get_mut(i))
                && slot.is_none()
            {
                *slot = Some(row);
            }
        }
        Self { slots }
    }

    /// Row at `position` (1-based).
    pub fn get(&self, position: u8) -> Option<&'a ResultRow> {
        (position as usize)
            .checked_sub(1)
            .and_then(|i| self.slots.get(i).copied().flatten())
    }

    pub fn first(&self) -> Option<&'a ResultRow> {
        self.get(1)
    }

    pub fn second(&self) -> Option<&'a ResultRow> {
        self.get(2)
    }

    pub fn third(&self) -> Option<&'a ResultRow> {
        self.get(3)
    }

    /// Occupied slots in rank order, as `(position, row)`.
    pub fn placed(&self) -> impl Iterator<Item = (u8, &'a ResultRow)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|row| (i as u8 + 1, row)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Visual treatment for a leaderboard row, chosen by rank index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankStyle {
    pub name: &'static str,
    pub solid: &'static str,
    pub gradient_from: &'static str,
    pub gradient_to: &'static str,
}

/// Leaderboard palette; rank `i` (0-based) uses `RANK_PALETTE[i % 5]`.
pub const RANK_PALETTE: [RankStyle; 5] = [
    RankStyle {
        name: "cyan",
        solid: "#06b6d4",
        gradient_from: "#22d3ee",
        gradient_to: "#0891b2",
    },
    RankStyle {
        name: "lime",
        solid: "#84cc16",
        gradient_from: "#a3e635",
        gradient_to: "#65a30d",
    },
    RankStyle {
        name: "amber",
        solid: "#f59e0b",
        gradient_from: "#fbbf24",
        gradient_to: "#d97706",
    },
    RankStyle {
        name: "purple",
        solid: "#a855f7",
        gradient_from: "#c084fc",
        gradient_to: "#9333ea",
    },
    RankStyle {
        name: "red",
        solid: "#ef4444",
        gradient_from: "#f87171",
        gradient_to: "#dc2626",
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct RankedTeam {
    /// 1-based rank.
    pub rank: usize,
    pub style: RankStyle,
    pub team: Team,
}

impl RankedTeam {
    /// Rank zero-padded to two digits (`"01"`, `"12"`).
    pub fn label(&self) -> String {
        format!("{:02}", self.rank)
    }
}

/// Order teams by points (highest first) and assign rank styling by index.
///
/// Ties are not broken: the sort is stable, so tied teams keep the order the
/// gateway returned them in.
pub fn rank_teams(teams: &[Team]) -> Vec<RankedTeam> {
    let mut sorted = teams.to_vec();
    sorted.sort_by(|a, b| b.points.cmp(&a.points));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, team)| RankedTeam {
            rank: i + 1,
            style: RANK_PALETTE[i % RANK_PALETTE.len()],
            team,
        })
        .collect()
}

/// Ranked teams whose name contains `term` (case-insensitive). Ranks are kept.
pub fn filter_teams(ranked: &[RankedTeam], term: &str) -> Vec<RankedTeam> {
    let needle = term.to_lowercase();
    ranked
        .iter()
        .filter(|r| r.team.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
