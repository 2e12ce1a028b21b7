//! In-memory `BracketRepository`.
//!
//! Mirrors the constraints of the PostgreSQL schema (unique names, one
//! bracket per tournament, one place per user/team/tournament) so engine
//! behavior is the same on both backends. State sits behind a single
//! `std::sync::Mutex` that is never held across an `.await`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::repository::BracketRepository;
use crate::bracket::materializer::{BracketPlan, resolve_parents};
use crate::tournament::{
    errors::{TournamentError, TournamentResult},
    models::{
        BracketEntry, Match, MatchId, NewPlace, NewTeam, NewTournament, Place, Round, Team,
        TeamId, Tournament, TournamentId, TournamentStatus,
    },
};

#[derive(Default)]
struct State {
    teams: BTreeMap<TeamId, Team>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    matches: BTreeMap<MatchId, Match>,
    rounds: BTreeMap<MatchId, Round>,
    places: Vec<Place>,
    last_team_id: i64,
    last_tournament_id: i64,
    last_match_id: i64,
    last_place_id: i64,
}

impl State {
    fn entry(&self, match_id: MatchId) -> Option<BracketEntry> {
        let fixture = self.matches.get(&match_id)?.clone();
        let round = self.rounds.get(&match_id)?.clone();
        Some(BracketEntry { fixture, round })
    }
}

/// Process-local bracket storage
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BracketRepository for InMemoryRepository {
    async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team> {
        let mut state = self.state();

        if state.teams.values().any(|t| t.name == team.name) {
            return Err(TournamentError::AlreadyExists(format!(
                "Team '{}'",
                team.name
            )));
        }

        state.last_team_id += 1;
        let created = Team {
            id: state.last_team_id,
            name: team.name.clone(),
            members: team.members.clone(),
            created_at: Utc::now(),
        };
        state.teams.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>> {
        Ok(self.state().teams.get(&team_id).cloned())
    }

    async fn create_tournament(&self, tournament: &NewTournament) -> TournamentResult<Tournament> {
        let mut state = self.state();

        if state.tournaments.values().any(|t| t.name == tournament.name) {
            return Err(TournamentError::AlreadyExists(format!(
                "Tournament '{}'",
                tournament.name
            )));
        }

        state.last_tournament_id += 1;
        let created = Tournament {
            id: state.last_tournament_id,
            name: tournament.name.clone(),
            description: tournament.description.clone(),
            status: TournamentStatus::Opened,
            limit: tournament.limit,
            teams: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        state.tournaments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Tournament>> {
        Ok(self.state().tournaments.get(&tournament_id).cloned())
    }

    async fn add_team_to_tournament(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        let mut state = self.state();

        if !state.teams.contains_key(&team_id) {
            return Err(TournamentError::NotFound(format!("Team {team_id}")));
        }

        let tournament = state
            .tournaments
            .get_mut(&tournament_id)
            .ok_or_else(|| TournamentError::NotFound(format!("Tournament {tournament_id}")))?;

        if tournament.teams.contains(&team_id) {
            return Err(TournamentError::AlreadyExists(format!(
                "Team {team_id} in tournament {tournament_id}"
            )));
        }

        tournament.teams.push(team_id);
        Ok(())
    }

    async fn update_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        let mut state = self.state();

        let stored = state
            .tournaments
            .get_mut(&tournament.id)
            .ok_or_else(|| TournamentError::NotFound(format!("Tournament {}", tournament.id)))?;

        stored.status = tournament.status;
        stored.started_at = tournament.started_at;
        stored.finished_at = tournament.finished_at;
        Ok(())
    }

    async fn create_bracket(&self, plan: &BracketPlan) -> TournamentResult<Vec<BracketEntry>> {
        let mut state = self.state();

        if !state.tournaments.contains_key(&plan.tournament_id) {
            return Err(TournamentError::NotFound(format!(
                "Tournament {}",
                plan.tournament_id
            )));
        }

        if state
            .rounds
            .values()
            .any(|round| round.tournament_id == plan.tournament_id)
        {
            return Err(TournamentError::AlreadyExists(format!(
                "Tournament {} bracket already exists",
                plan.tournament_id
            )));
        }

        let first_id = state.last_match_id + 1;
        let ids: Vec<MatchId> = (first_id..).take(plan.matches.len()).collect();
        // Resolve before writing anything so a bad plan leaves no trace.
        let parents = resolve_parents(plan, &ids)?;

        let mut entries = Vec::with_capacity(plan.matches.len());
        for ((planned, id), next_match) in plan.matches.iter().zip(ids).zip(parents) {
            let entry = BracketEntry {
                fixture: Match {
                    id,
                    status: planned.status,
                    participant1: planned.participant1,
                    participant2: planned.participant2,
                    score1: None,
                    score2: None,
                    finished_at: planned.finished_at,
                },
                round: Round {
                    tournament_id: plan.tournament_id,
                    number: planned.round_number,
                    match_id: id,
                    next_match,
                },
            };
            state.matches.insert(id, entry.fixture.clone());
            state.rounds.insert(id, entry.round.clone());
            state.last_match_id = id;
            entries.push(entry);
        }

        Ok(entries)
    }

    async fn bracket_exists(&self, tournament_id: TournamentId) -> TournamentResult<bool> {
        Ok(self
            .state()
            .rounds
            .values()
            .any(|round| round.tournament_id == tournament_id))
    }

    async fn get_entry(&self, match_id: MatchId) -> TournamentResult<Option<BracketEntry>> {
        Ok(self.state().entry(match_id))
    }

    async fn list_entries(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketEntry>> {
        let state = self.state();

        let mut entries: Vec<BracketEntry> = state
            .rounds
            .values()
            .filter(|round| round.tournament_id == tournament_id)
            .filter_map(|round| state.entry(round.match_id))
            .collect();
        entries.sort_by_key(|entry| (entry.round.number, entry.fixture.id));
        Ok(entries)
    }

    async fn children_of(&self, match_id: MatchId) -> TournamentResult<Vec<Match>> {
        let state = self.state();

        // BTreeMap iteration is already in id (creation) order.
        Ok(state
            .rounds
            .values()
            .filter(|round| round.next_match == Some(match_id))
            .filter_map(|round| state.matches.get(&round.match_id).cloned())
            .collect())
    }

    async fn update_match(&self, expected: &Match, fixture: &Match) -> TournamentResult<bool> {
        fixture.validate().map_err(TournamentError::InvariantViolation)?;

        let mut state = self.state();
        let stored = state
            .matches
            .get_mut(&fixture.id)
            .ok_or_else(|| TournamentError::NotFound(format!("Match {}", fixture.id)))?;

        if (stored.status, stored.participant1, stored.participant2)
            != (expected.status, expected.participant1, expected.participant2)
        {
            return Ok(false);
        }

        *stored = fixture.clone();
        Ok(true)
    }

    async fn insert_place(&self, place: &NewPlace) -> TournamentResult<Option<Place>> {
        let mut state = self.state();

        let duplicate = state.places.iter().any(|p| {
            p.user_id == place.user_id
                && p.team_id == place.team_id
                && p.tournament_id == place.tournament_id
        });
        if duplicate {
            return Ok(None);
        }

        state.last_place_id += 1;
        let created = Place {
            id: state.last_place_id,
            tournament_id: place.tournament_id,
            team_id: place.team_id,
            user_id: place.user_id,
            label: place.label.clone(),
            created_at: Utc::now(),
        };
        state.places.push(created.clone());
        Ok(Some(created))
    }

    async fn list_places(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Place>> {
        Ok(self
            .state()
            .places
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }
}
