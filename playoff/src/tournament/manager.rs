//! Tournament manager: registration, bracket initialization and results.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::errors::{TournamentError, TournamentResult};
use super::locks::KeyedLocks;
use super::models::{
    BracketEntry, Match, MatchId, MatchStatus, NewTeam, NewTournament, Place, Team, TeamId,
    Tournament, TournamentId, TournamentStatus, UpdatedEntities,
};
use super::propagation::ResultPropagator;
use crate::bracket::{self, materialize};
use crate::config::{EngineConfig, TeamLimits};
use crate::db::repository::BracketRepository;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repo: Arc<dyn BracketRepository>,
    limits: TeamLimits,
    tournament_locks: Arc<KeyedLocks<TournamentId>>,
    match_locks: Arc<KeyedLocks<MatchId>>,
    propagator: Arc<ResultPropagator>,
}

impl TournamentManager {
    /// Create a new tournament manager with the default 4-16 team bounds
    pub fn new(repo: Arc<dyn BracketRepository>) -> Self {
        Self::with_limits(repo, TeamLimits::default())
    }

    /// Create a manager from the loaded engine configuration
    pub fn from_config(repo: Arc<dyn BracketRepository>, config: &EngineConfig) -> Self {
        Self::with_limits(repo, config.limits)
    }

    /// Create a manager with custom team bounds
    pub fn with_limits(repo: Arc<dyn BracketRepository>, limits: TeamLimits) -> Self {
        let match_locks = Arc::new(KeyedLocks::new());
        let propagator = Arc::new(ResultPropagator::new(
            Arc::clone(&repo),
            Arc::clone(&match_locks),
        ));

        Self {
            repo,
            limits,
            tournament_locks: Arc::new(KeyedLocks::new()),
            match_locks,
            propagator,
        }
    }

    /// Propagator used after every result submission
    pub fn propagator(&self) -> &ResultPropagator {
        &self.propagator
    }

    /// Create a team of one or two users
    pub async fn create_team(&self, team: NewTeam) -> TournamentResult<Team> {
        team.validate().map_err(TournamentError::InvalidInput)?;

        let created = self.repo.create_team(&team).await?;
        log::info!("Created team {} ({})", created.id, created.name);
        Ok(created)
    }

    /// Create a tournament accepting registrations
    pub async fn create_tournament(
        &self,
        tournament: NewTournament,
    ) -> TournamentResult<Tournament> {
        if tournament.name.trim().is_empty() {
            return Err(TournamentError::InvalidInput(
                "Tournament name can not be empty".to_string(),
            ));
        }

        if !self.limits.contains(tournament.limit) {
            return Err(TournamentError::InvalidInput(format!(
                "Team limit must be between {} and {}, got {}",
                self.limits.min_teams, self.limits.max_teams, tournament.limit
            )));
        }

        let created = self.repo.create_tournament(&tournament).await?;
        log::info!(
            "Created tournament {} ({}) for up to {} teams",
            created.id,
            created.name,
            created.limit
        );
        Ok(created)
    }

    /// Get tournament by ID
    pub async fn tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .get_tournament(tournament_id)
            .await?
            .ok_or_else(|| TournamentError::NotFound(format!("Tournament {tournament_id}")))
    }

    /// Register a team for a tournament
    ///
    /// A user may only play for one team per tournament.
    pub async fn register_team(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<Tournament> {
        let _guard = self.tournament_locks.lock(tournament_id).await;

        let mut tournament = self.tournament(tournament_id).await?;

        if tournament.status != TournamentStatus::Opened {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Tournament {tournament_id} is not accepting registrations"
            )));
        }

        if tournament.team_count() >= tournament.limit {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Tournament {tournament_id} is full"
            )));
        }

        let team = self
            .repo
            .get_team(team_id)
            .await?
            .ok_or_else(|| TournamentError::NotFound(format!("Team {team_id}")))?;

        if tournament.teams.contains(&team_id) {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Team {team_id} is already registered"
            )));
        }

        for registered_id in &tournament.teams {
            let Some(registered) = self.repo.get_team(*registered_id).await? else {
                continue;
            };

            if let Some(user_id) = team
                .members
                .iter()
                .find(|member| registered.members.contains(member))
            {
                return Err(TournamentError::BusinessRuleViolation(format!(
                    "User {user_id} already plays for team {registered_id}"
                )));
            }
        }

        self.repo
            .add_team_to_tournament(tournament_id, team_id)
            .await?;
        tournament.teams.push(team_id);

        log::info!(
            "Team {team_id} registered for tournament {tournament_id} ({}/{})",
            tournament.team_count(),
            tournament.limit
        );
        Ok(tournament)
    }

    /// Close registration and build the bracket in registration order
    pub async fn activate_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketEntry>> {
        let _guard = self.tournament_locks.lock(tournament_id).await;

        let tournament = self.tournament(tournament_id).await?;

        if tournament.status != TournamentStatus::Opened {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Tournament {tournament_id} can not be activated"
            )));
        }

        if !self.limits.contains(tournament.team_count()) {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Need at least {} teams to start, have {}",
                self.limits.min_teams,
                tournament.team_count()
            )));
        }

        let roster = tournament.teams.clone();
        self.build_bracket(tournament, &roster).await
    }

    /// Build and store the bracket of a tournament, seeded in `teams` order.
    ///
    /// `teams` must hold exactly the registered roster. An `Opened`
    /// tournament becomes `Active` once its bracket is stored.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidInput` - team count out of bounds, duplicate
    ///   teams, or a list that differs from the roster
    /// * `TournamentError::NotFound` - unknown tournament
    /// * `TournamentError::AlreadyExists` - the bracket was already built
    /// * `TournamentError::BusinessRuleViolation` - the tournament is over
    pub async fn initialize_bracket(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
    ) -> TournamentResult<Vec<BracketEntry>> {
        if !self.limits.contains(teams.len()) {
            return Err(TournamentError::InvalidInput(format!(
                "A bracket needs {} to {} teams, got {}",
                self.limits.min_teams,
                self.limits.max_teams,
                teams.len()
            )));
        }

        let unique: HashSet<TeamId> = teams.iter().copied().collect();
        if unique.len() != teams.len() {
            return Err(TournamentError::InvalidInput(
                "Teams list contains duplicates".to_string(),
            ));
        }

        let _guard = self.tournament_locks.lock(tournament_id).await;

        let tournament = self.tournament(tournament_id).await?;

        if matches!(
            tournament.status,
            TournamentStatus::Finished | TournamentStatus::Cancelled
        ) {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Tournament {tournament_id} is over"
            )));
        }

        let roster: HashSet<TeamId> = tournament.teams.iter().copied().collect();
        if roster != unique {
            return Err(TournamentError::InvalidInput(format!(
                "Teams list does not match the roster of tournament {tournament_id}"
            )));
        }

        self.build_bracket(tournament, teams).await
    }

    /// Caller holds the tournament lock
    async fn build_bracket(
        &self,
        mut tournament: Tournament,
        teams: &[TeamId],
    ) -> TournamentResult<Vec<BracketEntry>> {
        if self.repo.bracket_exists(tournament.id).await? {
            return Err(TournamentError::AlreadyExists(format!(
                "Tournament {} bracket already exists",
                tournament.id
            )));
        }

        let bracket = bracket::build(teams)?;
        let entries = materialize(self.repo.as_ref(), tournament.id, &bracket).await?;

        log::info!(
            "Bracket of {} matches over {} rounds created for tournament {}",
            entries.len(),
            bracket.depth(),
            tournament.id
        );

        if tournament.status == TournamentStatus::Opened {
            tournament.status = TournamentStatus::Active;
            tournament.started_at = Some(Utc::now());
            self.repo.update_tournament(&tournament).await?;
        }

        Ok(entries)
    }

    /// Cancel a tournament that has not finished
    pub async fn cancel_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        let _guard = self.tournament_locks.lock(tournament_id).await;

        let mut tournament = self.tournament(tournament_id).await?;

        match tournament.status {
            TournamentStatus::Finished => {
                return Err(TournamentError::BusinessRuleViolation(format!(
                    "Tournament {tournament_id} already finished"
                )));
            }
            TournamentStatus::Cancelled => return Ok(tournament),
            TournamentStatus::Opened | TournamentStatus::Active => {}
        }

        tournament.status = TournamentStatus::Cancelled;
        tournament.finished_at = Some(Utc::now());
        self.repo.update_tournament(&tournament).await?;

        log::info!("Tournament {tournament_id} cancelled");
        Ok(tournament)
    }

    /// Mark a scheduled match with both participants as being played
    pub async fn start_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let _guard = self.match_locks.lock(match_id).await;

        let mut fixture = self.playable_match(match_id).await?;

        if fixture.status != MatchStatus::Scheduled {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Match {match_id} is {}, not scheduled",
                fixture.status
            )));
        }

        if fixture.participant_count() != 2 {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Match {match_id} participants are not decided yet"
            )));
        }

        let expected = fixture.clone();
        fixture.status = MatchStatus::Ongoing;
        self.store_transition(match_id, &expected, &fixture).await?;
        Ok(fixture)
    }

    /// Record the final score of a match and propagate its outcome
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidInput` - a negative score
    /// * `TournamentError::NotFound` - unknown match
    /// * `TournamentError::BusinessRuleViolation` - equal scores, a match that
    ///   already concluded or is a walk-over, undecided participants, or a
    ///   tournament that is not active
    pub async fn submit_match_result(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> TournamentResult<UpdatedEntities> {
        if score1 < 0 || score2 < 0 {
            return Err(TournamentError::InvalidInput(
                "Scores can not be negative".to_string(),
            ));
        }

        let guard = self.match_locks.lock(match_id).await;

        let mut fixture = self.playable_match(match_id).await?;

        match fixture.status {
            MatchStatus::Finished => {
                log::warn!("Result submitted twice for match {match_id}");
                return Err(TournamentError::BusinessRuleViolation(format!(
                    "Match {match_id} is already finished"
                )));
            }
            MatchStatus::WalkOver => {
                return Err(TournamentError::BusinessRuleViolation(format!(
                    "Match {match_id} is a walk-over"
                )));
            }
            MatchStatus::Scheduled | MatchStatus::Ongoing => {}
        }

        if score1 == score2 {
            return Err(TournamentError::BusinessRuleViolation(
                "Match scores can not be equal".to_string(),
            ));
        }

        let (Some(first), Some(second)) = (fixture.participant1, fixture.participant2) else {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Match {match_id} participants are not decided yet"
            )));
        };

        if first == second {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Team {first} can not play against itself"
            )));
        }

        let expected = fixture.clone();
        fixture.status = MatchStatus::Finished;
        fixture.score1 = Some(score1);
        fixture.score2 = Some(score2);
        fixture.finished_at = Some(Utc::now());
        self.store_transition(match_id, &expected, &fixture).await?;
        drop(guard);

        log::debug!("Match {match_id} finished {score1}:{score2}");

        let mut updated = UpdatedEntities {
            matches: vec![fixture],
            ..Default::default()
        };
        updated.extend(self.propagator.propagate(match_id).await?);
        Ok(updated)
    }

    /// Conclude a match holding exactly one participant as a walk-over.
    ///
    /// Calling it again for a concluded walk-over re-drives the propagation,
    /// which writes nothing new when everything is already in place.
    pub async fn submit_walk_over(&self, match_id: MatchId) -> TournamentResult<UpdatedEntities> {
        let guard = self.match_locks.lock(match_id).await;

        let mut fixture = self.playable_match(match_id).await?;

        if fixture.status == MatchStatus::Finished {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Match {match_id} is already finished"
            )));
        }

        if fixture.status == MatchStatus::WalkOver && fixture.is_concluded() {
            drop(guard);
            return self.propagator.propagate(match_id).await;
        }

        if fixture.participant_count() != 1 {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Match {match_id} needs exactly one participant for a walk-over, has {}",
                fixture.participant_count()
            )));
        }

        let expected = fixture.clone();
        fixture.status = MatchStatus::WalkOver;
        fixture.finished_at = Some(Utc::now());
        self.store_transition(match_id, &expected, &fixture).await?;
        drop(guard);

        let mut updated = UpdatedEntities {
            matches: vec![fixture],
            ..Default::default()
        };
        updated.extend(self.propagator.propagate(match_id).await?);
        Ok(updated)
    }

    /// All matches of a tournament, by round and then creation order
    pub async fn bracket(&self, tournament_id: TournamentId) -> TournamentResult<Vec<BracketEntry>> {
        self.tournament(tournament_id).await?;

        let mut entries = self.repo.list_entries(tournament_id).await?;
        entries.sort_by_key(|entry| (entry.round.number, entry.fixture.id));
        Ok(entries)
    }

    /// Places recorded so far
    pub async fn places(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Place>> {
        self.tournament(tournament_id).await?;
        self.repo.list_places(tournament_id).await
    }

    /// Load a match whose tournament is being played
    async fn playable_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let entry = self
            .repo
            .get_entry(match_id)
            .await?
            .ok_or_else(|| TournamentError::NotFound(format!("Match {match_id}")))?;

        let tournament = self.tournament(entry.round.tournament_id).await?;
        if tournament.status != TournamentStatus::Active {
            return Err(TournamentError::BusinessRuleViolation(format!(
                "Tournament {} is not active",
                tournament.id
            )));
        }

        Ok(entry.fixture)
    }

    /// Write a state change of a match, rejecting it when another writer
    /// changed the match since it was read
    async fn store_transition(
        &self,
        match_id: MatchId,
        expected: &Match,
        fixture: &Match,
    ) -> TournamentResult<()> {
        if self.repo.update_match(expected, fixture).await? {
            return Ok(());
        }

        log::warn!("Match {match_id} changed while a {} update was pending", fixture.status);
        Err(TournamentError::BusinessRuleViolation(format!(
            "Match {match_id} was updated concurrently"
        )))
    }
}
