//! Results view state.
//!
//! One [`ResultsView`] per open results screen: the selected year, the tab,
//! the search term, the last loaded rows and the poster viewer. Nothing here
//! is global; two views never share state.
//!
//! ## Stale responses
//!
//! Switching years quickly can leave an older fetch still in flight. Every
//! fetch starts with [`ResultsView::begin_fetch`], which hands out a
//! [`FetchTicket`] carrying the current generation. [`ResultsView::apply`]
//! drops any response whose ticket is not from the latest generation, so a
//! slow 2023 response can never overwrite 2025 rows.

use crate::aggregate::{self, RankedTeam};
use crate::poster::{PosterStyle, StyleCursor};
use crate::types::{Loaded, PosterData, Program, ResultRow, Team};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Programs,
    Teams,
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "program" | "programs" => Ok(Tab::Programs),
            "team" | "teams" => Ok(Tab::Teams),
            other => Err(format!("unknown tab '{other}' (expected programs or teams)")),
        }
    }
}

/// Proof that a response belongs to a particular fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    year_index: usize,
}

/// A program as listed on the programs tab: 1-based card number plus pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramCard {
    pub number: usize,
    pub program: Program,
}

/// What the active tab currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    /// A query failed; the raw message is shown as-is.
    Error(String),
    /// The programs tab matched nothing.
    NoPrograms,
    /// The teams tab matched nothing.
    NoTeams,
    Programs(Vec<ProgramCard>),
    Teams(Vec<RankedTeam>),
}

/// The open poster viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct PosterViewer {
    pub data: PosterData,
    pub cursor: StyleCursor,
}

impl PosterViewer {
    pub fn style(&self) -> PosterStyle {
        self.cursor.current()
    }
}

#[derive(Debug)]
pub struct ResultsView {
    years: Vec<String>,
    year_index: usize,
    tab: Tab,
    search: String,
    generation: u64,
    loading: bool,
    results: Loaded<Vec<ResultRow>>,
    teams: Loaded<Vec<Team>>,
    programs: Vec<Program>,
    ranked: Vec<RankedTeam>,
    default_style: usize,
    poster: Option<PosterViewer>,
}

impl ResultsView {
    /// A view over `years` (newest first), starting at `year` when listed.
    pub fn new(years: Vec<String>, year: &str, default_style: usize) -> Self {
        let year_index = years.iter().position(|y| y == year).unwrap_or(0);
        Self {
            years,
            year_index,
            tab: Tab::default(),
            search: String::new(),
            generation: 0,
            loading: true,
            results: Loaded::default(),
            teams: Loaded::default(),
            programs: Vec::new(),
            ranked: Vec::new(),
            default_style,
            poster: None,
        }
    }

    pub fn year(&self) -> &str {
        self.years
            .get(self.year_index)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Start a fetch for the current year. Any earlier ticket becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            year_index: self.year_index,
        }
    }

    /// Switch year and start its fetch. Unknown years are rejected.
    pub fn select_year(&mut self, year: &str) -> Result<FetchTicket, String> {
        let index = self
            .years
            .iter()
            .position(|y| y == year)
            .ok_or_else(|| format!("year {year} is not published"))?;
        self.year_index = index;
        self.poster = None;
        Ok(self.begin_fetch())
    }

    /// Store a completed fetch. Returns `false` (and changes nothing) when
    /// the ticket is stale.
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        results: Loaded<Vec<ResultRow>>,
        teams: Loaded<Vec<Team>>,
    ) -> bool {
        if ticket.generation != self.generation || ticket.year_index != self.year_index {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping stale response"
            );
            return false;
        }
        self.programs = results
            .ready()
            .map(|rows| aggregate::unique_programs(rows))
            .unwrap_or_default();
        self.ranked = teams
            .ready()
            .map(|t| aggregate::rank_teams(t))
            .unwrap_or_default();
        self.results = results;
        self.teams = teams;
        self.loading = false;
        true
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Set the search term. Data is not refetched; only the listing changes.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    /// First failure message, results before teams.
    pub fn error(&self) -> Option<&str> {
        self.results.error().or_else(|| self.teams.error())
    }

    /// Programs matching the search, numbered in listing order.
    pub fn program_cards(&self) -> Vec<ProgramCard> {
        aggregate::filter_programs(&self.programs, &self.search)
            .into_iter()
            .enumerate()
            .map(|(i, program)| ProgramCard {
                number: i + 1,
                program,
            })
            .collect()
    }

    /// Teams matching the search. Ranks come from the full leaderboard.
    pub fn ranked_teams(&self) -> Vec<RankedTeam> {
        aggregate::filter_teams(&self.ranked, &self.search)
    }

    /// How many entries the active tab lists.
    pub fn published_count(&self) -> usize {
        match self.tab {
            Tab::Programs => self.program_cards().len(),
            Tab::Teams => self.ranked_teams().len(),
        }
    }

    pub fn state(&self) -> ViewState {
        if self.loading {
            return ViewState::Loading;
        }
        if let Some(message) = self.error() {
            return ViewState::Error(message.to_string());
        }
        match self.tab {
            Tab::Programs => {
                let cards = self.program_cards();
                if cards.is_empty() {
                    ViewState::NoPrograms
                } else {
                    ViewState::Programs(cards)
                }
            }
            Tab::Teams => {
                let teams = self.ranked_teams();
                if teams.is_empty() {
                    ViewState::NoTeams
                } else {
                    ViewState::Teams(teams)
                }
            }
        }
    }

    /// Winners of one loaded program.
    pub fn poster_data(&self, program: &Program) -> PosterData {
        let winners = self
            .results
            .ready()
            .map(|rows| aggregate::program_winners(rows, program))
            .unwrap_or_default();
        PosterData {
            program: program.clone(),
            winners,
        }
    }

    /// Open the poster viewer on a program, at the default style.
    pub fn open_poster(&mut self, program: &Program) -> &PosterViewer {
        let viewer = PosterViewer {
            data: self.poster_data(program),
            cursor: StyleCursor::new(self.default_style),
        };
        self.poster.insert(viewer)
    }

    pub fn poster(&self) -> Option<&PosterViewer> {
        self.poster.as_ref()
    }

    pub fn next_style(&mut self) -> Option<PosterStyle> {
        self.poster.as_mut().map(|p| p.cursor.next())
    }

    pub fn prev_style(&mut self) -> Option<PosterStyle> {
        self.poster.as_mut().map(|p| p.cursor.prev())
    }

    /// Close the viewer. The style position is forgotten.
    pub fn close_poster(&mut self) {
        self.poster = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{result_row, sample_results, sample_teams, team};

    fn years() -> Vec<String> {
        vec!["2025".into(), "2024".into(), "2023".into()]
    }

    fn loaded_view() -> ResultsView {
        let mut view = ResultsView::new(years(), "2025", 0);
        let ticket = view.begin_fetch();
        assert!(view.apply(
            ticket,
            Loaded::Ready(sample_results()),
            Loaded::Ready(sample_teams())
        ));
        view
    }

    #[test]
    fn starts_loading_at_requested_year() {
        let view = ResultsView::new(years(), "2024", 0);
        assert_eq!(view.year(), "2024");
        assert_eq!(view.state(), ViewState::Loading);
    }

    #[test]
    fn unknown_start_year_falls_back_to_first() {
        assert_eq!(ResultsView::new(years(), "1990", 0).year(), "2025");
    }

    #[test]
    fn programs_listed_sorted_and_numbered() {
        let view = loaded_view();
        let ViewState::Programs(cards) = view.state() else {
            panic!("expected programs");
        };
        let events: Vec<&str> = cards.iter().map(|c| c.program.event.as_str()).collect();
        assert_eq!(events, vec!["Arabic Song", "Essay Writing", "Qawali Competition"]);
        assert_eq!(cards[0].number, 1);
        assert_eq!(cards[2].number, 3);
    }

    #[test]
    fn search_renumbers_cards_without_refetch() {
        let mut view = loaded_view();
        view.set_search("qaw");
        let cards = view.program_cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].number, 1);
        assert!(!view.is_loading());
    }

    #[test]
    fn search_with_no_hits_is_no_programs() {
        let mut view = loaded_view();
        view.set_search("zzz");
        assert_eq!(view.state(), ViewState::NoPrograms);
        assert_eq!(view.published_count(), 0);
    }

    #[test]
    fn empty_year_is_no_programs() {
        let mut view = ResultsView::new(years(), "2025", 0);
        let ticket = view.select_year("2024").unwrap();
        view.apply(ticket, Loaded::Ready(vec![]), Loaded::Ready(sample_teams()));
        assert_eq!(view.state(), ViewState::NoPrograms);
    }

    #[test]
    fn teams_tab_ranks_and_filters() {
        let mut view = loaded_view();
        view.set_tab(Tab::Teams);
        let ViewState::Teams(teams) = view.state() else {
            panic!("expected teams");
        };
        assert_eq!(teams[0].team.points, 150);
        view.set_search("red");
        let hits = view.ranked_teams();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rank, 4);
    }

    #[test]
    fn no_teams_state() {
        let mut view = ResultsView::new(years(), "2025", 0);
        let ticket = view.begin_fetch();
        view.apply(ticket, Loaded::Ready(vec![]), Loaded::Ready(vec![]));
        view.set_tab(Tab::Teams);
        assert_eq!(view.state(), ViewState::NoTeams);
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut view = ResultsView::new(years(), "2025", 0);
        let old = view.select_year("2023").unwrap();
        let current = view.select_year("2025").unwrap();

        let late = vec![result_row("Old Event", "General", 1, "Stale")];
        assert!(!view.apply(old, Loaded::Ready(late), Loaded::Ready(vec![])));
        assert!(view.is_loading());

        assert!(view.apply(
            current,
            Loaded::Ready(sample_results()),
            Loaded::Ready(vec![team("Blue", 1)])
        ));
        assert!(view.program_cards().iter().all(|c| c.program.event != "Old Event"));
    }

    #[test]
    fn unpublished_year_rejected() {
        let mut view = ResultsView::new(years(), "2025", 0);
        assert!(view.select_year("2019").is_err());
        assert_eq!(view.year(), "2025");
    }

    #[test]
    fn query_failure_surfaces_raw_message() {
        let mut view = ResultsView::new(years(), "2025", 0);
        let ticket = view.begin_fetch();
        view.apply(
            ticket,
            Loaded::Failed {
                message: "JWT expired".into(),
            },
            Loaded::Ready(sample_teams()),
        );
        assert_eq!(view.state(), ViewState::Error("JWT expired".into()));
    }

    #[test]
    fn teams_failure_also_reported() {
        let mut view = ResultsView::new(years(), "2025", 0);
        let ticket = view.begin_fetch();
        view.apply(
            ticket,
            Loaded::Ready(sample_results()),
            Loaded::Failed {
                message: "teams down".into(),
            },
        );
        assert_eq!(view.error(), Some("teams down"));
    }

    #[test]
    fn poster_viewer_cycles_and_resets() {
        let mut view = loaded_view();
        let program = Program::new("Arabic Song", "Junior");
        let viewer = view.open_poster(&program);
        assert_eq!(viewer.style(), PosterStyle::Ledger);
        assert_eq!(viewer.data.winners.len(), 2);

        assert_eq!(view.prev_style(), Some(PosterStyle::Podium));
        assert_eq!(view.next_style(), Some(PosterStyle::Ledger));
        view.next_style();
        view.close_poster();
        assert!(view.next_style().is_none());

        let reopened = view.open_poster(&program);
        assert_eq!(reopened.style(), PosterStyle::Ledger);
    }

    #[test]
    fn default_style_applies_on_open() {
        let mut view = ResultsView::new(years(), "2025", 3);
        let ticket = view.begin_fetch();
        view.apply(ticket, Loaded::Ready(sample_results()), Loaded::Ready(vec![]));
        let viewer = view.open_poster(&Program::new("Essay Writing", "Senior"));
        assert_eq!(viewer.style(), PosterStyle::Parchment);
    }

    #[test]
    fn tab_parses_singular_and_plural() {
        assert_eq!("team".parse::<Tab>(), Ok(Tab::Teams));
        assert_eq!("Programs".parse::<Tab>(), Ok(Tab::Programs));
        assert!("news".parse::<Tab>().is_err());
    }
}
