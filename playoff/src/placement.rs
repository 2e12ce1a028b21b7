//! Final-standing rank bands for eliminated teams.
//!
//! Every team knocked out in the same (effective) round shares one band of the
//! standings, e.g. all first-round losers of an 8-team draw finish `"5-8"`.
//! The two finalists are ranked `"1"` and `"2"` directly by the propagator and
//! never go through [`placement_label`].

use thiserror::Error;

/// Label given to the tournament winner
pub const CHAMPION_LABEL: &str = "1";

/// Label given to the losing finalist
pub const RUNNER_UP_LABEL: &str = "2";

/// Placement errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Team count must be at least one
    #[error("Invalid team count: {0}")]
    InvalidInput(usize),

    /// The round has no rank band for this bracket size
    #[error("Round {round} has no placement band for {team_count} teams")]
    InvalidRound { team_count: usize, round: u32 },
}

/// Result type for placement calculations
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Smallest `k` such that `team_count <= 2^k`.
///
/// This is the number of rounds a full power-of-two draw of this size plays,
/// and for every `team_count >= 2` it equals the depth of the bracket built by
/// [`crate::bracket::build`].
///
/// # Errors
///
/// * `PlacementError::InvalidInput` - `team_count` is zero
pub fn bracket_depth(team_count: usize) -> PlacementResult<u32> {
    if team_count < 1 {
        return Err(PlacementError::InvalidInput(team_count));
    }

    Ok(team_count.next_power_of_two().trailing_zeros())
}

/// Rank band for a team eliminated in `round`.
///
/// Round 1 losers share `2^(depth-1)+1 ..= team_count`. Losers of a later
/// round `r` share `2^(depth-r)+1 ..= 2^(depth-r+1)`, so the band halves with
/// every round until the final, whose participants are ranked 1 and 2.
///
/// # Arguments
///
/// * `team_count` - Number of teams in the tournament
/// * `round` - Effective elimination round (1 = first round)
///
/// # Errors
///
/// * `PlacementError::InvalidInput` - `team_count` is zero
/// * `PlacementError::InvalidRound` - round 0, the final round, or deeper
///
/// # Example
///
/// ```
/// use playoff::placement::placement_label;
///
/// assert_eq!(placement_label(8, 1).unwrap(), "5-8");
/// assert_eq!(placement_label(8, 2).unwrap(), "3-4");
/// assert!(placement_label(8, 3).is_err());
/// ```
pub fn placement_label(team_count: usize, round: u32) -> PlacementResult<String> {
    let depth = bracket_depth(team_count)?;

    if round == 0 || round >= depth {
        return Err(PlacementError::InvalidRound { team_count, round });
    }

    if round == 1 {
        let first_rank = (1usize << (depth - 1)) + 1;
        return Ok(format!("{first_rank}-{team_count}"));
    }

    let upper = 1usize << (depth - round + 1);
    Ok(format!("{}-{}", upper / 2 + 1, upper))
}

/// Check that a stored label is either a plain rank (`"1"`) or a
/// `"lo-hi"` band of one or two digit ranks with `lo <= hi`.
pub fn validate_label(label: &str) -> bool {
    fn rank(part: &str) -> Option<u32> {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok().filter(|r| *r > 0)
    }

    match label.split_once('-') {
        None => rank(label).is_some(),
        Some((lo, hi)) => matches!((rank(lo), rank(hi)), (Some(lo), Some(hi)) if lo <= hi),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_depth() {
        assert_eq!(bracket_depth(1), Ok(0));
        assert_eq!(bracket_depth(2), Ok(1));
        assert_eq!(bracket_depth(4), Ok(2));
        assert_eq!(bracket_depth(5), Ok(3));
        assert_eq!(bracket_depth(8), Ok(3));
        assert_eq!(bracket_depth(9), Ok(4));
        assert_eq!(bracket_depth(16), Ok(4));
        assert_eq!(bracket_depth(0), Err(PlacementError::InvalidInput(0)));
    }

    #[test]
    fn test_first_round_band() {
        assert_eq!(placement_label(4, 1).unwrap(), "3-4");
        assert_eq!(placement_label(5, 1).unwrap(), "5-5");
        assert_eq!(placement_label(7, 1).unwrap(), "5-7");
        assert_eq!(placement_label(12, 1).unwrap(), "9-12");
        assert_eq!(placement_label(16, 1).unwrap(), "9-16");
    }

    #[test]
    fn test_later_round_bands() {
        assert_eq!(placement_label(8, 2).unwrap(), "3-4");
        assert_eq!(placement_label(16, 2).unwrap(), "5-8");
        assert_eq!(placement_label(16, 3).unwrap(), "3-4");
        assert_eq!(placement_label(11, 2).unwrap(), "5-8");
    }

    #[test]
    fn test_final_and_deeper_rounds_rejected() {
        assert_eq!(
            placement_label(4, 2),
            Err(PlacementError::InvalidRound {
                team_count: 4,
                round: 2
            })
        );
        assert!(placement_label(16, 4).is_err());
        assert!(placement_label(16, 9).is_err());
        assert!(placement_label(6, 0).is_err());
    }

    #[test]
    fn test_zero_teams_rejected() {
        assert_eq!(placement_label(0, 1), Err(PlacementError::InvalidInput(0)));
    }

    #[test]
    fn test_full_draw_partitions_ranks() {
        // A power-of-two draw loses half the field each round.
        for depth in 2..=4u32 {
            let teams = 1usize << depth;
            let mut covered = 2; // finalists
            for round in 1..depth {
                let label = placement_label(teams, round).unwrap();
                let (lo, hi) = label.split_once('-').unwrap();
                let (lo, hi): (usize, usize) = (lo.parse().unwrap(), hi.parse().unwrap());
                assert_eq!(hi - lo + 1, teams >> round, "band size for round {round}");
                covered += hi - lo + 1;
            }
            assert_eq!(covered, teams);
        }
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("1"));
        assert!(validate_label("2"));
        assert!(validate_label("3-4"));
        assert!(validate_label("9-16"));
        assert!(!validate_label(""));
        assert!(!validate_label("0"));
        assert!(!validate_label("4-3"));
        assert!(!validate_label("100-101"));
        assert!(!validate_label("a-b"));
        assert!(!validate_label("3-"));
        assert!(!validate_label("3-4-5"));
    }
}
