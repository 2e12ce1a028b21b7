//! Tournament module for single-elimination brackets.
//!
//! This module provides:
//! - Team and tournament registration
//! - Bracket initialization from the registered roster
//! - Match result and walk-over submission
//! - Winner advancement and final-standing places
//!
//! ## Example
//!
//! ```
//! use playoff::db::InMemoryRepository;
//! use playoff::tournament::{NewTeam, NewTournament, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(InMemoryRepository::new()));
//!
//!     let tournament = manager
//!         .create_tournament(NewTournament {
//!             name: "Friday Cup".to_string(),
//!             description: String::new(),
//!             limit: 8,
//!         })
//!         .await?;
//!
//!     for (i, name) in ["Foxes", "Hares", "Lynx", "Otters"].into_iter().enumerate() {
//!         let team = manager
//!             .create_team(NewTeam {
//!                 name: name.to_string(),
//!                 members: vec![i as i64 + 1],
//!             })
//!             .await?;
//!         manager.register_team(tournament.id, team.id).await?;
//!     }
//!
//!     let bracket = manager.activate_tournament(tournament.id).await?;
//!     let updated = manager
//!         .submit_match_result(bracket[0].fixture.id, 3, 1)
//!         .await?;
//!     assert_eq!(updated.places[0].label, "3-4");
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod locks;
pub mod manager;
pub mod models;
pub mod propagation;

pub use errors::{TournamentError, TournamentResult};
pub use locks::KeyedLocks;
pub use manager::TournamentManager;
pub use models::{
    BracketEntry, Match, MatchId, MatchOutcome, MatchStatus, NewPlace, NewTeam, NewTournament,
    Place, PlaceId, Round, Team, TeamId, Tournament, TournamentId, TournamentStatus,
    UpdatedEntities, UserId,
};
pub use propagation::{ResultPropagator, Slots, derive_slots};
