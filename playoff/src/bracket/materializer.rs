//! Persists a built bracket as matches and rounds.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::builder::{Bracket, NodeId};
use crate::db::repository::BracketRepository;
use crate::tournament::{
    errors::{TournamentError, TournamentResult},
    models::{BracketEntry, MatchId, MatchStatus, TeamId, TournamentId},
};

/// One node of a bracket, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMatch {
    /// Node id in the source bracket
    pub node: NodeId,
    /// Initial status
    pub status: MatchStatus,
    /// First participant slot
    pub participant1: Option<TeamId>,
    /// Second participant slot
    pub participant2: Option<TeamId>,
    /// Round number
    pub round_number: u32,
    /// Parent node, `None` for the final
    pub parent: Option<NodeId>,
    /// Set for byes that already hold their team
    pub finished_at: Option<DateTime<Utc>>,
}

/// Storage-ready form of a bracket, matches in node creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketPlan {
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// One entry per node
    pub matches: Vec<PlannedMatch>,
}

impl BracketPlan {
    /// Translate a bracket arena node by node
    pub fn from_bracket(
        tournament_id: TournamentId,
        bracket: &Bracket<TeamId>,
        now: DateTime<Utc>,
    ) -> Self {
        let matches = bracket
            .nodes()
            .iter()
            .map(|node| {
                let participant1 = node.participants.first().copied();
                let participant2 = node.participants.get(1).copied();
                let holds_team = participant1.is_some();

                PlannedMatch {
                    node: node.id,
                    status: node.status,
                    participant1,
                    participant2,
                    round_number: node.round,
                    parent: bracket.parent_of(node.id),
                    finished_at: (node.is_walk_over() && holds_team).then_some(now),
                }
            })
            .collect();

        Self {
            tournament_id,
            matches,
        }
    }
}

/// Map every planned match's parent node onto the persisted match id.
///
/// `match_ids[i]` must be the id stored for `plan.matches[i]`.
///
/// # Errors
///
/// * `TournamentError::InvariantViolation` - the id list does not line up
///   with the plan, or a parent node is unknown
pub fn resolve_parents(
    plan: &BracketPlan,
    match_ids: &[MatchId],
) -> TournamentResult<Vec<Option<MatchId>>> {
    if plan.matches.len() != match_ids.len() {
        return Err(TournamentError::InvariantViolation(format!(
            "{} matches stored for a bracket of {} nodes",
            match_ids.len(),
            plan.matches.len()
        )));
    }

    plan.matches
        .iter()
        .map(|planned| match planned.parent {
            None => Ok(None),
            Some(node) => match_ids.get(node).copied().map(Some).ok_or_else(|| {
                TournamentError::InvariantViolation(format!(
                    "Node {} points at unknown parent node {node}",
                    planned.node
                ))
            }),
        })
        .collect()
}

/// Store `bracket` for a tournament, exactly once.
///
/// # Errors
///
/// * `TournamentError::AlreadyExists` - the tournament already has a bracket
/// * `TournamentError::NotFound` - the tournament does not exist
pub async fn materialize<R>(
    repo: &R,
    tournament_id: TournamentId,
    bracket: &Bracket<TeamId>,
) -> TournamentResult<Vec<BracketEntry>>
where
    R: BracketRepository + ?Sized,
{
    let plan = BracketPlan::from_bracket(tournament_id, bracket, Utc::now());
    repo.create_bracket(&plan).await
}
