//! Advancing winners and recording eliminations once a match concludes.
//!
//! Every step re-reads state from storage and writes only on change, so
//! running the propagation twice for the same match leaves storage exactly as
//! one run does. Slot values of a parent are never incremental: they are
//! re-derived from the outcomes of all its children under the parent's lock,
//! and stored only if no other writer changed the parent since it was read.

use std::sync::Arc;

use chrono::Utc;

use super::errors::{TournamentError, TournamentResult};
use super::locks::KeyedLocks;
use super::models::{
    Match, MatchId, MatchOutcome, MatchStatus, NewPlace, TeamId, Tournament, TournamentId,
    TournamentStatus, UpdatedEntities,
};
use crate::db::repository::BracketRepository;
use crate::placement::{CHAMPION_LABEL, RUNNER_UP_LABEL, placement_label};

/// Participant slots of a match, `(participant1, participant2)`
pub type Slots = (Option<TeamId>, Option<TeamId>);

/// Slot values a parent receives from its children.
///
/// Returns `Ok(None)` while any child is still undecided. The first child's
/// winner fills slot 1 and the second child's winner slot 2. A walk-over
/// parent inserted to equalize depth has a single child and fills slot 1 only.
///
/// # Errors
///
/// * `TournamentError::InvariantViolation` - not one or two children
pub fn derive_slots(children: &[Match]) -> TournamentResult<Option<Slots>> {
    let winners: Option<Vec<TeamId>> = children
        .iter()
        .map(|child| child.outcome().map(|outcome| outcome.winner))
        .collect();

    match (children.len(), winners) {
        (1 | 2, None) => Ok(None),
        (_, Some(winners)) if winners.len() == 1 => Ok(Some((Some(winners[0]), None))),
        (_, Some(winners)) if winners.len() == 2 => {
            Ok(Some((Some(winners[0]), Some(winners[1]))))
        }
        (count, _) => Err(TournamentError::InvariantViolation(format!(
            "A match must have one or two feeding matches, found {count}"
        ))),
    }
}

/// Result of advancing winners into a parent match
struct Advance {
    /// Parent after the step
    parent: Match,
    /// Whether the parent was written
    written: bool,
}

/// Drives winners up the bracket and records places
pub struct ResultPropagator {
    repo: Arc<dyn BracketRepository>,
    locks: Arc<KeyedLocks<MatchId>>,
}

impl ResultPropagator {
    /// Create a propagator sharing the match locks of the caller
    pub fn new(repo: Arc<dyn BracketRepository>, locks: Arc<KeyedLocks<MatchId>>) -> Self {
        Self { repo, locks }
    }

    /// Propagate the outcome of a concluded match.
    ///
    /// Fills the parent's slots once all its children concluded, records the
    /// loser's place band and, for the final, ranks both finalists and
    /// finishes the tournament. A walk-over parent that receives its team
    /// concludes at once and the propagation continues from it.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - unknown match
    /// * `TournamentError::BusinessRuleViolation` - the match has not concluded
    /// * `TournamentError::InvariantViolation` - the stored bracket is inconsistent
    pub async fn propagate(&self, match_id: MatchId) -> TournamentResult<UpdatedEntities> {
        let mut updated = UpdatedEntities::default();
        let mut current = match_id;

        loop {
            let entry = self
                .repo
                .get_entry(current)
                .await?
                .ok_or_else(|| TournamentError::NotFound(format!("Match {current}")))?;

            let outcome = entry.fixture.outcome().ok_or_else(|| {
                TournamentError::BusinessRuleViolation(format!(
                    "Match {current} has not concluded"
                ))
            })?;

            let tournament_id = entry.round.tournament_id;
            let tournament = self.repo.get_tournament(tournament_id).await?.ok_or_else(|| {
                TournamentError::InvariantViolation(format!(
                    "Match {current} belongs to missing tournament {tournament_id}"
                ))
            })?;

            let Some(parent_id) = entry.round.next_match else {
                self.conclude_final(tournament, outcome, &mut updated).await?;
                return Ok(updated);
            };

            let advance = self.advance(parent_id).await?;
            let parent = advance.parent;
            if advance.written {
                updated.matches.push(parent.clone());
            }

            if let Some(loser) = outcome.loser {
                // A loser whose next match would have been a bye went out one round later.
                let round = match parent.status {
                    MatchStatus::WalkOver => entry.round.number + 1,
                    _ => entry.round.number,
                };
                self.record_elimination(&tournament, loser, round, &mut updated)
                    .await?;
            }

            if parent.status != MatchStatus::WalkOver || !parent.is_concluded() {
                return Ok(updated);
            }

            log::debug!("Walk-over match {parent_id} concluded, advancing its team");
            current = parent_id;
        }
    }

    /// Re-derive and store the parent's slots under the parent's lock
    async fn advance(&self, parent_id: MatchId) -> TournamentResult<Advance> {
        let _guard = self.locks.lock(parent_id).await;

        let mut parent = self
            .repo
            .get_entry(parent_id)
            .await?
            .ok_or_else(|| {
                TournamentError::InvariantViolation(format!("Next match {parent_id} is missing"))
            })?
            .fixture;

        let children = self.repo.children_of(parent_id).await?;
        let Some(slots) = derive_slots(&children)? else {
            log::debug!("Match {parent_id} still waits for a feeding match");
            return Ok(Advance {
                parent,
                written: false,
            });
        };

        if (parent.participant1, parent.participant2) == slots {
            return Ok(Advance {
                parent,
                written: false,
            });
        }

        if matches!(parent.status, MatchStatus::Ongoing | MatchStatus::Finished) {
            log::warn!(
                "Match {parent_id} is already {}, keeping its participants",
                parent.status
            );
            return Ok(Advance {
                parent,
                written: false,
            });
        }

        let expected = parent.clone();
        (parent.participant1, parent.participant2) = slots;
        if parent.status == MatchStatus::WalkOver && parent.finished_at.is_none() {
            parent.finished_at = Some(Utc::now());
        }

        parent
            .validate()
            .map_err(TournamentError::InvariantViolation)?;

        if !self.repo.update_match(&expected, &parent).await? {
            // Another process filled the parent first; continue from what it stored.
            log::debug!("Match {parent_id} was advanced concurrently");
            let stored = self
                .repo
                .get_entry(parent_id)
                .await?
                .ok_or_else(|| {
                    TournamentError::InvariantViolation(format!(
                        "Next match {parent_id} is missing"
                    ))
                })?
                .fixture;
            return Ok(Advance {
                parent: stored,
                written: false,
            });
        }

        log::debug!(
            "Match {parent_id} participants set to {:?} / {:?}",
            parent.participant1,
            parent.participant2
        );

        Ok(Advance {
            parent,
            written: true,
        })
    }

    async fn conclude_final(
        &self,
        mut tournament: Tournament,
        outcome: MatchOutcome,
        updated: &mut UpdatedEntities,
    ) -> TournamentResult<()> {
        self.record_places(tournament.id, outcome.winner, CHAMPION_LABEL, updated)
            .await?;
        if let Some(loser) = outcome.loser {
            self.record_places(tournament.id, loser, RUNNER_UP_LABEL, updated)
                .await?;
        }

        if tournament.status == TournamentStatus::Active {
            tournament.status = TournamentStatus::Finished;
            tournament.finished_at = Some(Utc::now());
            self.repo.update_tournament(&tournament).await?;

            log::info!(
                "Tournament {} finished, won by team {}",
                tournament.id,
                outcome.winner
            );
            updated.tournament = Some(tournament);
        }

        Ok(())
    }

    async fn record_elimination(
        &self,
        tournament: &Tournament,
        loser: TeamId,
        round: u32,
        updated: &mut UpdatedEntities,
    ) -> TournamentResult<()> {
        let label = placement_label(tournament.team_count(), round).map_err(|e| {
            log::error!(
                "No place for team {loser} of tournament {}: {e}",
                tournament.id
            );
            TournamentError::from(e)
        })?;

        self.record_places(tournament.id, loser, &label, updated)
            .await
    }

    /// One place per team member; existing records are left alone
    async fn record_places(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
        label: &str,
        updated: &mut UpdatedEntities,
    ) -> TournamentResult<()> {
        let team = self.repo.get_team(team_id).await?.ok_or_else(|| {
            TournamentError::InvariantViolation(format!("Team {team_id} is missing"))
        })?;

        for user_id in team.members {
            let place = NewPlace {
                tournament_id,
                team_id,
                user_id,
                label: label.to_string(),
            };

            if let Some(created) = self.repo.insert_place(&place).await? {
                updated.places.push(created);
            }
        }

        Ok(())
    }
}
