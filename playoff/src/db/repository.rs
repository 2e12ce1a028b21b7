//! Repository trait definitions for testability and dependency injection.
//!
//! [`BracketRepository`] is the storage contract of the bracket engine. The
//! PostgreSQL implementation lives here; an in-memory implementation is in
//! [`super::memory`].

#![allow(clippy::needless_raw_string_hashes)]

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use super::timeouts::{
    DEFAULT_QUERY_TIMEOUT, DEFAULT_TRANSACTION_TIMEOUT, TimeoutError, with_timeout,
};
use crate::bracket::materializer::{BracketPlan, resolve_parents};
use crate::tournament::{
    errors::{TournamentError, TournamentResult},
    models::{
        BracketEntry, Match, MatchId, NewPlace, NewTeam, NewTournament, Place, Round, Team,
        TeamId, Tournament, TournamentId, TournamentStatus,
    },
};

/// Storage operations needed by the bracket engine
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Create a team
    async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team>;

    /// Find team by ID
    async fn get_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>>;

    /// Create a tournament in the `Opened` state
    async fn create_tournament(&self, tournament: &NewTournament) -> TournamentResult<Tournament>;

    /// Find tournament by ID, roster in registration order
    async fn get_tournament(&self, tournament_id: TournamentId)
    -> TournamentResult<Option<Tournament>>;

    /// Append a team to the tournament roster
    async fn add_team_to_tournament(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()>;

    /// Persist status and timestamps of a tournament
    async fn update_tournament(&self, tournament: &Tournament) -> TournamentResult<()>;

    /// Atomically check that the tournament has no bracket and store `plan`.
    ///
    /// Entries are returned in plan order. Fails with `AlreadyExists` when a
    /// bracket is present, including when a concurrent call won the race.
    async fn create_bracket(&self, plan: &BracketPlan) -> TournamentResult<Vec<BracketEntry>>;

    /// Whether the tournament already has a bracket
    async fn bracket_exists(&self, tournament_id: TournamentId) -> TournamentResult<bool>;

    /// Match and round by match ID
    async fn get_entry(&self, match_id: MatchId) -> TournamentResult<Option<BracketEntry>>;

    /// Every match and round of a tournament
    async fn list_entries(&self, tournament_id: TournamentId)
    -> TournamentResult<Vec<BracketEntry>>;

    /// Matches whose winner advances into `match_id`, in creation order
    async fn children_of(&self, match_id: MatchId) -> TournamentResult<Vec<Match>>;

    /// Persist status, participants, scores and finish time of a match.
    ///
    /// The write happens only while the stored match still has the status and
    /// participants of `expected`. Returns `false` when another writer changed
    /// the match first, in which case nothing is written.
    ///
    /// Fails with `NotFound` for an unknown match.
    async fn update_match(&self, expected: &Match, fixture: &Match) -> TournamentResult<bool>;

    /// Insert a place record unless (user, team, tournament) already has one.
    ///
    /// Returns `None` when the record already existed.
    async fn insert_place(&self, place: &NewPlace) -> TournamentResult<Option<Place>>;

    /// Place records of a tournament in creation order
    async fn list_places(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Place>>;
}

const ENTRY_SELECT: &str = r#"
    SELECT m.id AS match_id, m.status, m.participant1_id, m.participant2_id,
           m.score1, m.score2, m.finished_at,
           r.tournament_id, r.number, r.next_match_id
    FROM rounds r
    JOIN matches m ON m.id = r.match_id
"#;

/// Default PostgreSQL implementation of `BracketRepository`
#[derive(Clone)]
pub struct PgBracketRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn insert_bracket(&self, plan: &BracketPlan) -> TournamentResult<Vec<BracketEntry>> {
        let mut tx = self.pool.begin().await?;

        // Locking the tournament row serializes concurrent builders.
        sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
            .bind(plan.tournament_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                TournamentError::NotFound(format!("Tournament {}", plan.tournament_id))
            })?;

        let existing = sqlx::query("SELECT 1 FROM rounds WHERE tournament_id = $1 LIMIT 1")
            .bind(plan.tournament_id)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(bracket_exists_error(plan.tournament_id));
        }

        let mut fixtures = Vec::with_capacity(plan.matches.len());
        for planned in &plan.matches {
            let row = sqlx::query(
                r#"
                INSERT INTO matches (status, participant1_id, participant2_id, finished_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(planned.status.as_str())
            .bind(planned.participant1)
            .bind(planned.participant2)
            .bind(planned.finished_at.map(|dt| dt.naive_utc()))
            .fetch_one(&mut *tx)
            .await?;

            fixtures.push(Match {
                id: row.get("id"),
                status: planned.status,
                participant1: planned.participant1,
                participant2: planned.participant2,
                score1: None,
                score2: None,
                finished_at: planned.finished_at,
            });
        }

        let ids: Vec<MatchId> = fixtures.iter().map(|fixture| fixture.id).collect();
        let parents = resolve_parents(plan, &ids)?;

        let mut entries = Vec::with_capacity(fixtures.len());
        for ((planned, fixture), next_match) in plan.matches.iter().zip(fixtures).zip(parents) {
            insert_round(&mut tx, plan.tournament_id, planned.round_number, fixture.id, next_match)
                .await?;

            entries.push(BracketEntry {
                round: Round {
                    tournament_id: plan.tournament_id,
                    number: planned.round_number,
                    match_id: fixture.id,
                    next_match,
                },
                fixture,
            });
        }

        tx.commit().await?;

        log::debug!(
            "Stored {} matches for tournament {}",
            entries.len(),
            plan.tournament_id
        );
        Ok(entries)
    }
}

async fn insert_round(
    tx: &mut Transaction<'_, Postgres>,
    tournament_id: TournamentId,
    number: u32,
    match_id: MatchId,
    next_match: Option<MatchId>,
) -> TournamentResult<()> {
    sqlx::query(
        "INSERT INTO rounds (tournament_id, number, match_id, next_match_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(tournament_id)
    .bind(number as i32)
    .bind(match_id)
    .bind(next_match)
    .execute(&mut **tx)
    .await
    // The partial unique index on the final catches a racing builder.
    .map_err(|e| conflict_or_database(e, || bracket_exists_error(tournament_id)))?;

    Ok(())
}

fn bracket_exists_error(tournament_id: TournamentId) -> TournamentError {
    TournamentError::AlreadyExists(format!("Tournament {tournament_id} bracket already exists"))
}

fn conflict_or_database(
    err: sqlx::Error,
    conflict: impl FnOnce() -> TournamentError,
) -> TournamentError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict(),
        _ => TournamentError::Database(err),
    }
}

fn conflict_or_timeout(
    err: TimeoutError,
    conflict: impl FnOnce() -> TournamentError,
) -> TournamentError {
    match err {
        TimeoutError::Database(e) => conflict_or_database(e, conflict),
        other => other.into(),
    }
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    let status: String = row.get("status");

    Ok(Match {
        id: row.get("match_id"),
        status: status.parse().map_err(TournamentError::InvariantViolation)?,
        participant1: row.get("participant1_id"),
        participant2: row.get("participant2_id"),
        score1: row.get("score1"),
        score2: row.get("score2"),
        finished_at: row
            .get::<Option<NaiveDateTime>, _>("finished_at")
            .map(|dt| dt.and_utc()),
    })
}

fn entry_from_row(row: &PgRow) -> TournamentResult<BracketEntry> {
    let fixture = match_from_row(row)?;
    let number: i32 = row.get("number");

    Ok(BracketEntry {
        round: Round {
            tournament_id: row.get("tournament_id"),
            number: number as u32,
            match_id: fixture.id,
            next_match: row.get("next_match_id"),
        },
        fixture,
    })
}

fn team_from_row(row: &PgRow) -> Team {
    Team {
        id: row.get("id"),
        name: row.get("name"),
        members: row.get("member_ids"),
        created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn place_from_row(row: &PgRow) -> Place {
    Place {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        team_id: row.get("team_id"),
        user_id: row.get("user_id"),
        label: row.get("label"),
        created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO teams (name, member_ids) VALUES ($1, $2) RETURNING id, name, member_ids, created_at",
            )
            .bind(&team.name)
            .bind(&team.members)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(|e| {
            conflict_or_timeout(e, || {
                TournamentError::AlreadyExists(format!("Team '{}'", team.name))
            })
        })?;

        Ok(team_from_row(&row))
    }

    async fn get_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("SELECT id, name, member_ids, created_at FROM teams WHERE id = $1")
                .bind(team_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(team_from_row))
    }

    async fn create_tournament(&self, tournament: &NewTournament) -> TournamentResult<Tournament> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournaments (name, description, status, team_limit)
                VALUES ($1, $2, 'opened', $3)
                RETURNING id, created_at
                "#,
            )
            .bind(&tournament.name)
            .bind(&tournament.description)
            .bind(tournament.limit as i32)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(|e| {
            conflict_or_timeout(e, || {
                TournamentError::AlreadyExists(format!("Tournament '{}'", tournament.name))
            })
        })?;

        Ok(Tournament {
            id: row.get("id"),
            name: tournament.name.clone(),
            description: tournament.description.clone(),
            status: TournamentStatus::Opened,
            limit: tournament.limit,
            teams: Vec::new(),
            created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
            started_at: None,
            finished_at: None,
        })
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Tournament>> {
        let Some(row) = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT id, name, description, status, team_limit, created_at, started_at, finished_at
                FROM tournaments
                WHERE id = $1
                "#,
            )
            .bind(tournament_id)
            .fetch_optional(&self.pool),
        )
        .await?
        else {
            return Ok(None);
        };

        let teams: Vec<TeamId> = with_timeout(
            self.query_timeout,
            sqlx::query_scalar(
                "SELECT team_id FROM tournament_teams WHERE tournament_id = $1 ORDER BY id",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;

        let status: String = row.get("status");
        let limit: i32 = row.get("team_limit");

        Ok(Some(Tournament {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            status: status.parse().map_err(TournamentError::InvariantViolation)?,
            limit: limit as usize,
            teams,
            created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
            started_at: row
                .get::<Option<NaiveDateTime>, _>("started_at")
                .map(|dt| dt.and_utc()),
            finished_at: row
                .get::<Option<NaiveDateTime>, _>("finished_at")
                .map(|dt| dt.and_utc()),
        }))
    }

    async fn add_team_to_tournament(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("INSERT INTO tournament_teams (tournament_id, team_id) VALUES ($1, $2)")
                .bind(tournament_id)
                .bind(team_id)
                .execute(&self.pool),
        )
        .await
        .map_err(|e| {
            conflict_or_timeout(e, || {
                TournamentError::AlreadyExists(format!(
                    "Team {team_id} in tournament {tournament_id}"
                ))
            })
        })?;

        Ok(())
    }

    async fn update_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                "UPDATE tournaments SET status = $1, started_at = $2, finished_at = $3 WHERE id = $4",
            )
            .bind(tournament.status.as_str())
            .bind(tournament.started_at.map(|dt| dt.naive_utc()))
            .bind(tournament.finished_at.map(|dt| dt.naive_utc()))
            .bind(tournament.id)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::NotFound(format!(
                "Tournament {}",
                tournament.id
            )));
        }

        Ok(())
    }

    async fn create_bracket(&self, plan: &BracketPlan) -> TournamentResult<Vec<BracketEntry>> {
        match tokio::time::timeout(DEFAULT_TRANSACTION_TIMEOUT, self.insert_bracket(plan)).await {
            Ok(result) => result,
            Err(_) => Err(TournamentError::Timeout(DEFAULT_TRANSACTION_TIMEOUT)),
        }
    }

    async fn bracket_exists(&self, tournament_id: TournamentId) -> TournamentResult<bool> {
        let exists: bool = with_timeout(
            self.query_timeout,
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM rounds WHERE tournament_id = $1)")
                .bind(tournament_id)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(exists)
    }

    async fn get_entry(&self, match_id: MatchId) -> TournamentResult<Option<BracketEntry>> {
        let query = format!("{ENTRY_SELECT} WHERE m.id = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&query).bind(match_id).fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn list_entries(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketEntry>> {
        let query = format!("{ENTRY_SELECT} WHERE r.tournament_id = $1 ORDER BY r.number, m.id");
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&query).bind(tournament_id).fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn children_of(&self, match_id: MatchId) -> TournamentResult<Vec<Match>> {
        let query = format!("{ENTRY_SELECT} WHERE r.next_match_id = $1 ORDER BY m.id");
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&query).bind(match_id).fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn update_match(&self, expected: &Match, fixture: &Match) -> TournamentResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                UPDATE matches
                SET status = $1, participant1_id = $2, participant2_id = $3,
                    score1 = $4, score2 = $5, finished_at = $6
                WHERE id = $7
                  AND status = $8
                  AND participant1_id IS NOT DISTINCT FROM $9
                  AND participant2_id IS NOT DISTINCT FROM $10
                "#,
            )
            .bind(fixture.status.as_str())
            .bind(fixture.participant1)
            .bind(fixture.participant2)
            .bind(fixture.score1)
            .bind(fixture.score2)
            .bind(fixture.finished_at.map(|dt| dt.naive_utc()))
            .bind(fixture.id)
            .bind(expected.status.as_str())
            .bind(expected.participant1)
            .bind(expected.participant2)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: bool = with_timeout(
            self.query_timeout,
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM matches WHERE id = $1)")
                .bind(fixture.id)
                .fetch_one(&self.pool),
        )
        .await?;

        if !exists {
            return Err(TournamentError::NotFound(format!("Match {}", fixture.id)));
        }

        log::debug!("Match {} changed concurrently, update skipped", fixture.id);
        Ok(false)
    }

    async fn insert_place(&self, place: &NewPlace) -> TournamentResult<Option<Place>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO places (tournament_id, team_id, user_id, label)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, team_id, tournament_id) DO NOTHING
                RETURNING id, tournament_id, team_id, user_id, label, created_at
                "#,
            )
            .bind(place.tournament_id)
            .bind(place.team_id)
            .bind(place.user_id)
            .bind(&place.label)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(place_from_row))
    }

    async fn list_places(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Place>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, team_id, user_id, label, created_at
                FROM places
                WHERE tournament_id = $1
                ORDER BY id
                "#,
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(place_from_row).collect())
    }
}
