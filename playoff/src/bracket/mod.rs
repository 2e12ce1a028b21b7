//! Bracket construction and persistence.
//!
//! - [`builder`] turns an ordered team list into an arena of match nodes with
//!   child→parent links, inserting walk-over nodes where subtrees of unequal
//!   depth meet.
//! - [`materializer`] persists such an arena once per tournament as matches
//!   and rounds.
//!
//! ## Example
//!
//! ```
//! use playoff::bracket;
//! use playoff::tournament::MatchStatus;
//!
//! let bracket = bracket::build(&["A", "B", "C", "D", "E"]).unwrap();
//!
//! assert_eq!(bracket.depth(), 3);
//! assert_eq!(bracket.node(bracket.root()).status, MatchStatus::Scheduled);
//! assert_eq!(bracket.walk_over_count(), 2);
//! ```

pub mod builder;
pub mod materializer;

pub use builder::{Bracket, BracketError, BracketResult, MatchNode, NodeId, build};
pub use materializer::{BracketPlan, PlannedMatch, materialize, resolve_parents};
