//! Admin write operations.
//!
//! Every admin command maps to one [`AdminAction`], executed against any
//! [`Gateway`]. The CLI builds the gateway (an authenticated REST gateway, or
//! the in-memory one for `--seed` runs) and prints the [`AdminOutcome`].
//!
//! Writes are not retried. A failure is returned as-is and the command exits
//! non-zero with the gateway's message.

use crate::config::GatewayConfig;
use crate::gateway::collections::{self, NewResult};
use crate::gateway::{Gateway, GatewayError, tables};
use crate::types::{BackgroundKind, HomepageBackground, ResultRow, Team};

#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    ListBackgrounds,
    AddBackground { kind: BackgroundKind, url: String },
    DeleteBackground { id: String },
    ActivateBackground { id: String },
    AddResult(NewResultFields),
    DeleteResult { id: String },
    AddTeam { name: String, points: i64 },
    SetTeamPoints { id: String, points: i64 },
    DeleteTeam { id: String },
}

/// Result fields as typed on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResultFields {
    pub year: String,
    pub event: String,
    pub category: String,
    pub position: u8,
    pub participant: String,
    pub school: Option<String>,
    pub team: Option<String>,
}

impl From<NewResultFields> for NewResult {
    fn from(f: NewResultFields) -> Self {
        NewResult {
            year: f.year,
            event: f.event.trim().to_string(),
            category: f.category.trim().to_string(),
            position: f.position,
            participant: f.participant.trim().to_string(),
            school: f.school.filter(|s| !s.trim().is_empty()),
            team: f.team.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminOutcome {
    Backgrounds(Vec<HomepageBackground>),
    BackgroundAdded(HomepageBackground),
    Activated { id: String },
    ResultAdded(ResultRow),
    TeamAdded(Team),
    PointsSet { id: String, points: i64 },
    Deleted { table: &'static str, id: String },
}

/// Run one admin action.
pub fn execute(
    gw: &dyn Gateway,
    action: AdminAction,
    config: &GatewayConfig,
) -> Result<AdminOutcome, GatewayError> {
    tracing::debug!(?action, "admin action");
    let outcome = match action {
        AdminAction::ListBackgrounds => AdminOutcome::Backgrounds(collections::backgrounds(gw)?),
        AdminAction::AddBackground { kind, url } => {
            require_text("url", &url)?;
            AdminOutcome::BackgroundAdded(collections::insert_background(gw, kind, url.trim())?)
        }
        AdminAction::DeleteBackground { id } => delete(gw, tables::BACKGROUNDS, id)?,
        AdminAction::ActivateBackground { id } => {
            gw.activate_background(&id, config.activation, &config.activation_function)?;
            AdminOutcome::Activated { id }
        }
        AdminAction::AddResult(fields) => {
            require_text("event", &fields.event)?;
            require_text("category", &fields.category)?;
            require_text("participant", &fields.participant)?;
            AdminOutcome::ResultAdded(collections::insert_result(gw, &fields.into())?)
        }
        AdminAction::DeleteResult { id } => delete(gw, tables::RESULTS, id)?,
        AdminAction::AddTeam { name, points } => {
            require_text("name", &name)?;
            AdminOutcome::TeamAdded(collections::insert_team(gw, name.trim(), points)?)
        }
        AdminAction::SetTeamPoints { id, points } => {
            collections::set_team_points(gw, &id, points)?;
            AdminOutcome::PointsSet { id, points }
        }
        AdminAction::DeleteTeam { id } => delete(gw, tables::TEAMS, id)?,
    };
    Ok(outcome)
}

fn delete(gw: &dyn Gateway, table: &'static str, id: String) -> Result<AdminOutcome, GatewayError> {
    collections::delete_by_id(gw, table, &id)?;
    Ok(AdminOutcome::Deleted { table, id })
}

fn require_text(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::Invalid(format!("{field} must not be empty")));
    }
    Ok(())
}
