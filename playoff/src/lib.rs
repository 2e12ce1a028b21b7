//! # Playoff
//!
//! A single-elimination tournament bracket engine.
//!
//! Given the registered teams of a tournament, the engine builds a balanced
//! knockout bracket (inserting walk-overs where the team count is not a power
//! of two), stores it, and keeps it moving as results come in: winners are
//! advanced into their next match and every eliminated player receives a
//! final-standing band such as `"5-8"`.
//!
//! ## Lifecycle
//!
//! - **Opened**: teams register
//! - **Active**: the bracket is built, matches are played and results submitted
//! - **Finished**: the final concluded, finalists ranked `"1"` and `"2"`
//! - **Cancelled**: stopped before the final
//!
//! ## Core Modules
//!
//! - [`bracket`]: pure bracket construction and persistence planning
//! - [`placement`]: rank band of a team eliminated in a given round
//! - [`tournament`]: tournament manager, result propagation and models
//! - [`db`]: storage contract with PostgreSQL and in-memory implementations
//! - [`config`]: environment driven engine configuration
//!
//! ## Example
//!
//! ```
//! use playoff::placement_label;
//!
//! // First-round losers of an 8-team draw share places 5 to 8
//! assert_eq!(placement_label(8, 1).unwrap(), "5-8");
//! ```

/// Bracket construction and persistence planning.
pub mod bracket;
pub use bracket::{Bracket, BracketError, BracketPlan, MatchNode, build};

/// Engine configuration.
pub mod config;
pub use config::{ConfigError, EngineConfig, MAX_TEAMS, MIN_TEAMS, TeamLimits};

/// Storage layer.
pub mod db;
pub use db::{
    BracketRepository, Database, DatabaseConfig, InMemoryRepository, PgBracketRepository,
};

/// Final-standing labels.
pub mod placement;
pub use placement::{PlacementError, bracket_depth, placement_label};

/// Tournament management and result propagation.
pub mod tournament;
pub use tournament::{
    ResultPropagator, TournamentError, TournamentManager, TournamentResult, UpdatedEntities,
};
