//! Tournament data models: teams, matches, rounds and placements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Tournament ID type
pub type TournamentId = i64;

/// Team ID type
pub type TeamId = i64;

/// User ID type
pub type UserId = i64;

/// Persisted match ID type
pub type MatchId = i64;

/// Place record ID type
pub type PlaceId = i64;

/// A team of one or two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team ID
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Member user IDs (one or two, distinct)
    pub members: Vec<UserId>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

/// Request to create a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
    /// Display name
    pub name: String,
    /// Member user IDs
    pub members: Vec<UserId>,
}

impl NewTeam {
    /// Check the roster shape of the team
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Team name can not be empty".to_string());
        }

        match self.members.as_slice() {
            [_] => Ok(()),
            [a, b] if a != b => Ok(()),
            [_, _] => Err("Team members must be different users".to_string()),
            _ => Err(format!(
                "A team has one or two members, {} given",
                self.members.len()
            )),
        }
    }
}

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Accepting team registrations
    Opened,
    /// Bracket built, matches being played
    Active,
    /// Final concluded
    Finished,
    /// Tournament cancelled
    Cancelled,
}

impl TournamentStatus {
    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Opened => "opened",
            TournamentStatus::Active => "active",
            TournamentStatus::Finished => "finished",
            TournamentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opened" => Ok(TournamentStatus::Opened),
            "active" => Ok(TournamentStatus::Active),
            "finished" => Ok(TournamentStatus::Finished),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(format!("Unknown tournament status: {other}")),
        }
    }
}

/// Request to create a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    /// Tournament name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maximum number of teams
    pub limit: usize,
}

/// Tournament information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Tournament name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Current status
    pub status: TournamentStatus,
    /// Maximum number of teams
    pub limit: usize,
    /// Registered teams in registration order
    pub teams: Vec<TeamId>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
    /// Started at timestamp
    pub started_at: Option<DateTime<Utc>>,
    /// Finished at timestamp
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Number of registered teams
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Waiting to be played
    Scheduled,
    /// Being played
    Ongoing,
    /// Played, both scores recorded
    Finished,
    /// At most one participant; advances without play
    WalkOver,
}

impl MatchStatus {
    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Finished => "finished",
            MatchStatus::WalkOver => "walk_over",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "ongoing" => Ok(MatchStatus::Ongoing),
            "finished" => Ok(MatchStatus::Finished),
            "walk_over" => Ok(MatchStatus::WalkOver),
            other => Err(format!("Unknown match status: {other}")),
        }
    }
}

/// Winner and loser of a concluded match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Advancing team
    pub winner: TeamId,
    /// Eliminated team (None on a walk-over)
    pub loser: Option<TeamId>,
}

/// Persisted match
///
/// `finished_at` is set for every `Finished` match and for every walk-over
/// holding its team. A walk-over inserted to equalize bracket depth is stored
/// empty with `finished_at = None` and receives its timestamp when the winner
/// of its feeding match arrives. Readers must not treat `WalkOver` alone as
/// concluded; use [`Match::is_concluded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match ID
    pub id: MatchId,
    /// Current status
    pub status: MatchStatus,
    /// First participant slot
    pub participant1: Option<TeamId>,
    /// Second participant slot
    pub participant2: Option<TeamId>,
    /// Score of participant 1
    pub score1: Option<i32>,
    /// Score of participant 2
    pub score2: Option<i32>,
    /// Finished at timestamp
    pub finished_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Number of occupied participant slots
    pub fn participant_count(&self) -> usize {
        usize::from(self.participant1.is_some()) + usize::from(self.participant2.is_some())
    }

    /// The only participant, if exactly one slot is occupied
    pub fn sole_participant(&self) -> Option<TeamId> {
        match (self.participant1, self.participant2) {
            (Some(team), None) | (None, Some(team)) => Some(team),
            _ => None,
        }
    }

    /// Winner and loser, derived from the stored scores every time.
    ///
    /// Returns `None` while the match has not concluded: it is not finished,
    /// or it is a walk-over still waiting for its participant.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        match self.status {
            MatchStatus::Finished => {
                let (p1, p2) = (self.participant1?, self.participant2?);
                let (s1, s2) = (self.score1?, self.score2?);
                match s1.cmp(&s2) {
                    std::cmp::Ordering::Greater => Some(MatchOutcome {
                        winner: p1,
                        loser: Some(p2),
                    }),
                    std::cmp::Ordering::Less => Some(MatchOutcome {
                        winner: p2,
                        loser: Some(p1),
                    }),
                    std::cmp::Ordering::Equal => None,
                }
            }
            MatchStatus::WalkOver => self.sole_participant().map(|winner| MatchOutcome {
                winner,
                loser: None,
            }),
            MatchStatus::Scheduled | MatchStatus::Ongoing => None,
        }
    }

    /// Whether the match reached a terminal state with a known winner
    pub fn is_concluded(&self) -> bool {
        self.outcome().is_some()
    }

    /// Check the storage invariants of a match
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(p1), Some(p2)) = (self.participant1, self.participant2) {
            if p1 == p2 {
                return Err(format!("Match {} has team {p1} on both sides", self.id));
            }
        }

        match (self.score1, self.score2) {
            (None, None) => {}
            (Some(s1), Some(s2)) if s1 != s2 && s1 >= 0 && s2 >= 0 => {}
            _ => {
                return Err(format!(
                    "Match {} scores must be both absent or both present, non-negative and unequal",
                    self.id
                ));
            }
        }

        match self.status {
            MatchStatus::Finished => {
                if self.score1.is_none() || self.finished_at.is_none() {
                    return Err(format!(
                        "Finished match {} needs scores and a finish time",
                        self.id
                    ));
                }
            }
            MatchStatus::WalkOver => {
                if self.score1.is_some() || self.participant_count() > 1 {
                    return Err(format!(
                        "Walk-over match {} carries scores or two participants",
                        self.id
                    ));
                }
            }
            MatchStatus::Scheduled | MatchStatus::Ongoing => {
                if self.score1.is_some() || self.finished_at.is_some() {
                    return Err(format!(
                        "Unfinished match {} carries a result",
                        self.id
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Position of a match in a tournament bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// Round number (1 = first round)
    pub number: u32,
    /// The match this round describes
    pub match_id: MatchId,
    /// Match the winner advances to (None for the final)
    pub next_match: Option<MatchId>,
}

impl Round {
    /// Whether this is the tournament final
    pub fn is_final(&self) -> bool {
        self.next_match.is_none()
    }
}

/// A persisted match together with its round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketEntry {
    /// The match
    pub fixture: Match,
    /// Its bracket position
    pub round: Round,
}

/// Final-standing record for one user of one team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    /// Place ID
    pub id: PlaceId,
    /// Tournament
    pub tournament_id: TournamentId,
    /// Team the user played for
    pub team_id: TeamId,
    /// User
    pub user_id: UserId,
    /// Rank label, e.g. `"1"` or `"5-8"`
    pub label: String,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

/// Place record to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlace {
    /// Tournament
    pub tournament_id: TournamentId,
    /// Team the user played for
    pub team_id: TeamId,
    /// User
    pub user_id: UserId,
    /// Rank label
    pub label: String,
}

/// Entities mutated by a result submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedEntities {
    /// Matches written, in write order
    pub matches: Vec<Match>,
    /// Place records created
    pub places: Vec<Place>,
    /// Tournament, when its status changed
    pub tournament: Option<Tournament>,
}

impl UpdatedEntities {
    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.places.is_empty() && self.tournament.is_none()
    }

    pub(crate) fn extend(&mut self, other: UpdatedEntities) {
        self.matches.extend(other.matches);
        self.places.extend(other.places);
        if other.tournament.is_some() {
            self.tournament = other.tournament;
        }
    }
}
