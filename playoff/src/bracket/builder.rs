//! Divide-and-conquer bracket builder.
//!
//! The team list is split into a left half of `ceil(n/2)` teams and a right
//! remainder, each half becomes a subtree, and a new match joins the two
//! subtree roots. Seeding order is the caller's: the input order decides the
//! pairings. Node ids follow creation order (left subtree, right subtree,
//! depth equalizer if any, then the joining parent).

use serde::Serialize;
use thiserror::Error;

use crate::tournament::models::MatchStatus;

/// Index of a node in a [`Bracket`] arena
pub type NodeId = usize;

/// Bracket construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
    /// No teams were given
    #[error("Teams list can not be empty")]
    Empty,
}

/// Result type for bracket construction
pub type BracketResult<T> = Result<T, BracketError>;

/// Transient match created during bracket construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchNode<T> {
    /// Creation-order identifier
    pub id: NodeId,
    /// `Scheduled` or `WalkOver`
    pub status: MatchStatus,
    /// Teams known at construction time (0, 1 or 2)
    pub participants: Vec<T>,
    /// Round number, leaves are round 1
    pub round: u32,
}

impl<T> MatchNode<T> {
    /// Whether this node is a bye (a leaf with one team or a depth equalizer)
    pub fn is_walk_over(&self) -> bool {
        self.status == MatchStatus::WalkOver
    }
}

/// Arena of match nodes plus the child→parent adjacency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bracket<T> {
    nodes: Vec<MatchNode<T>>,
    parents: Vec<Option<NodeId>>,
    root: NodeId,
}

impl<T> Bracket<T> {
    /// The final
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// All nodes in creation order
    pub fn nodes(&self) -> &[MatchNode<T>] {
        &self.nodes
    }

    /// Node by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this bracket
    pub fn node(&self, id: NodeId) -> &MatchNode<T> {
        &self.nodes[id]
    }

    /// Parent of a node, `None` for the root
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied().flatten()
    }

    /// Children of a node in creation order
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| **parent == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    /// Every node with its parent, in creation order
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, Option<NodeId>)> + '_ {
        self.parents.iter().copied().enumerate()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a bracket holds at least one node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Round number of the final
    pub fn depth(&self) -> u32 {
        self.nodes[self.root].round
    }

    /// Number of walk-over nodes, leaf byes and depth equalizers alike
    pub fn walk_over_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_walk_over()).count()
    }

    /// Teams placed at construction time, in creation order of their nodes
    pub fn seeded_teams(&self) -> impl Iterator<Item = &T> + '_ {
        self.nodes.iter().flat_map(|node| node.participants.iter())
    }
}

/// Build a single-elimination bracket for `teams` in the given seeding order.
///
/// # Errors
///
/// * `BracketError::Empty` - no teams were given
pub fn build<T: Clone>(teams: &[T]) -> BracketResult<Bracket<T>> {
    if teams.is_empty() {
        return Err(BracketError::Empty);
    }

    let mut arena = Arena {
        nodes: Vec::new(),
        parents: Vec::new(),
    };
    let root = arena.split(teams);

    Ok(Bracket {
        nodes: arena.nodes,
        parents: arena.parents,
        root,
    })
}

struct Arena<T> {
    nodes: Vec<MatchNode<T>>,
    parents: Vec<Option<NodeId>>,
}

impl<T: Clone> Arena<T> {
    fn push(&mut self, status: MatchStatus, participants: Vec<T>, round: u32) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(MatchNode {
            id,
            status,
            participants,
            round,
        });
        self.parents.push(None);
        id
    }

    fn split(&mut self, teams: &[T]) -> NodeId {
        match teams.len() {
            1 => self.push(MatchStatus::WalkOver, teams.to_vec(), 1),
            2 => self.push(MatchStatus::Scheduled, teams.to_vec(), 1),
            len => {
                let (left, right) = teams.split_at(len.div_ceil(2));
                let mut upper = self.split(left);
                let mut lower = self.split(right);

                // The left half is never the shorter one, but equalize whichever side is.
                match self.nodes[upper].round.cmp(&self.nodes[lower].round) {
                    std::cmp::Ordering::Greater => lower = self.equalize(lower),
                    std::cmp::Ordering::Less => upper = self.equalize(upper),
                    std::cmp::Ordering::Equal => {}
                }

                let round = self.nodes[upper].round.max(self.nodes[lower].round) + 1;
                let parent = self.push(MatchStatus::Scheduled, Vec::new(), round);
                self.parents[upper] = Some(parent);
                self.parents[lower] = Some(parent);
                parent
            }
        }
    }

    /// Wrap a shallower subtree root in an empty walk-over one round deeper.
    fn equalize(&mut self, shallow: NodeId) -> NodeId {
        let round = self.nodes[shallow].round + 1;
        let bye = self.push(MatchStatus::WalkOver, Vec::new(), round);
        self.parents[shallow] = Some(bye);
        bye
    }
}
