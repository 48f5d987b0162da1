//! This module provides the ReactionSpace struct, which fixes the bit layout shared by every
//! encoded flux mode of an analysis
use std::fmt::{Display, Formatter};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flux_mode::bit_vector::WORD_BITS;

/// Direction in which a reaction carries flux
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Negative flux through a reversible reaction
    Reverse,
    /// Positive flux
    Forward,
}

impl Direction {
    /// Unit coefficient carrying the sign of this direction
    pub fn unit(&self) -> f64 {
        match self {
            Direction::Reverse => -1.,
            Direction::Forward => 1.,
        }
    }
}

/// A reaction together with the direction it is active in
///
/// Ordering is by direction first and then by reaction index, so a sorted collection of
/// these matches a sorted sequence of `(sign, reaction_index)` tuples.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionDirection {
    /// Direction the reaction is active in
    pub direction: Direction,
    /// Index of the reaction in the [`ReactionSpace`]
    pub reaction: usize,
}

impl ReactionDirection {
    pub fn forward(reaction: usize) -> Self {
        ReactionDirection {
            direction: Direction::Forward,
            reaction,
        }
    }

    pub fn reverse(reaction: usize) -> Self {
        ReactionDirection {
            direction: Direction::Reverse,
            reaction,
        }
    }
}

/// Ordered set of reactions, and the subset of them which are reversible
///
/// Bits are assigned by walking the reactions in order, giving each a forward bit,
/// immediately followed by a reverse bit if the reaction is reversible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReactionSpaceDefinition", into = "ReactionSpaceDefinition")]
pub struct ReactionSpace {
    /// Reaction ids, in bit order
    reaction_ids: IndexSet<String>,
    /// Reaction ids which occupy a reverse bit as well as a forward bit
    reversible: IndexSet<String>,
    /// Forward bit of each reaction, indexed by reaction index
    forward_bits: Vec<usize>,
    /// Reaction direction held by each bit, indexed by bit
    slots: Vec<ReactionDirection>,
}

impl ReactionSpace {
    /// Create a new reaction space
    ///
    /// # Parameters
    /// - reaction_ids: Ordered reaction ids, must be unique
    /// - reversible: Ids of the reversible reactions, must all be in `reaction_ids`
    ///
    /// # Examples
    /// ```rust
    /// use efmrs_core::flux_mode::reaction_space::ReactionSpace;
    /// let space = ReactionSpace::new(
    ///     vec!["r1".to_string(), "r2".to_string(), "r3".to_string()],
    ///     vec!["r2".to_string()],
    /// ).unwrap();
    /// assert_eq!(space.bit_count(), 4);
    /// ```
    pub fn new<I, J>(reaction_ids: I, reversible: J) -> Result<ReactionSpace, ReactionSpaceError>
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let mut ids: IndexSet<String> = IndexSet::new();
        for id in reaction_ids {
            if ids.contains(&id) {
                return Err(ReactionSpaceError::DuplicateReaction(id));
            }
            ids.insert(id);
        }
        let mut reversible_ids: IndexSet<String> = IndexSet::new();
        for id in reversible {
            if !ids.contains(&id) {
                return Err(ReactionSpaceError::UnknownReversibleReaction(id));
            }
            reversible_ids.insert(id);
        }

        let mut forward_bits = Vec::with_capacity(ids.len());
        let mut slots = Vec::with_capacity(ids.len() + reversible_ids.len());
        for (index, id) in ids.iter().enumerate() {
            forward_bits.push(slots.len());
            slots.push(ReactionDirection::forward(index));
            if reversible_ids.contains(id) {
                slots.push(ReactionDirection::reverse(index));
            }
        }

        Ok(ReactionSpace {
            reaction_ids: ids,
            reversible: reversible_ids,
            forward_bits,
            slots,
        })
    }

    /// Reaction ids in bit order
    pub fn reaction_ids(&self) -> impl Iterator<Item = &str> {
        self.reaction_ids.iter().map(|id| id.as_str())
    }

    /// Number of reactions in the space
    pub fn reaction_count(&self) -> usize {
        self.reaction_ids.len()
    }

    /// Total number of bits of an encoded flux mode
    pub fn bit_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of 64 bit words of an encoded flux mode
    pub fn word_count(&self) -> usize {
        self.bit_count().div_ceil(WORD_BITS)
    }

    pub fn is_reversible(&self, reaction_id: &str) -> bool {
        self.reversible.contains(reaction_id)
    }

    /// Position of a reaction in the space
    pub fn index_of(&self, reaction_id: &str) -> Option<usize> {
        self.reaction_ids.get_index_of(reaction_id)
    }

    /// Id of the reaction at `index`
    pub fn reaction_id(&self, index: usize) -> Option<&str> {
        self.reaction_ids.get_index(index).map(|id| id.as_str())
    }

    /// Bit holding the given reaction direction, None if the reaction doesn't exist or can't
    /// run in that direction
    pub fn bit_of(&self, reaction_direction: ReactionDirection) -> Option<usize> {
        let forward = *self.forward_bits.get(reaction_direction.reaction)?;
        match reaction_direction.direction {
            Direction::Forward => Some(forward),
            Direction::Reverse => {
                let id = self.reaction_ids.get_index(reaction_direction.reaction)?;
                if self.reversible.contains(id) {
                    Some(forward + 1)
                } else {
                    None
                }
            }
        }
    }

    /// Reaction direction held by `bit`
    pub fn direction_of(&self, bit: usize) -> Option<ReactionDirection> {
        self.slots.get(bit).copied()
    }

    /// Human-readable label of a reaction direction, the reaction id for forward activity
    /// and the id prefixed with `-` for reverse activity
    pub fn label(&self, reaction_direction: ReactionDirection) -> Option<String> {
        let id = self.reaction_id(reaction_direction.reaction)?;
        Some(match reaction_direction.direction {
            Direction::Forward => id.to_string(),
            Direction::Reverse => format!("-{}", id),
        })
    }

    /// Parse a label produced by [`ReactionSpace::label`]
    pub fn parse_label(&self, label: &str) -> Option<ReactionDirection> {
        if let Some(index) = self.index_of(label) {
            return Some(ReactionDirection::forward(index));
        }
        let index = self.index_of(label.strip_prefix('-')?)?;
        let reaction_direction = ReactionDirection::reverse(index);
        self.bit_of(reaction_direction).map(|_| reaction_direction)
    }
}

impl Display for ReactionSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ReactionSpace({} reactions, {} reversible, {} bits)",
            self.reaction_count(),
            self.reversible.len(),
            self.bit_count()
        )
    }
}

/// Serialized form of a [`ReactionSpace`]
#[derive(Serialize, Deserialize)]
struct ReactionSpaceDefinition {
    reaction_ids: Vec<String>,
    reversible: Vec<String>,
}

impl TryFrom<ReactionSpaceDefinition> for ReactionSpace {
    type Error = ReactionSpaceError;

    fn try_from(value: ReactionSpaceDefinition) -> Result<Self, Self::Error> {
        ReactionSpace::new(value.reaction_ids, value.reversible)
    }
}

impl From<ReactionSpace> for ReactionSpaceDefinition {
    fn from(value: ReactionSpace) -> Self {
        ReactionSpaceDefinition {
            reaction_ids: value.reaction_ids.into_iter().collect(),
            reversible: value.reversible.into_iter().collect(),
        }
    }
}

/// Errors associated with constructing a ReactionSpace
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReactionSpaceError {
    /// A reaction id was listed more than once
    #[error("Reaction {0} appears more than once in the reaction space")]
    DuplicateReaction(String),
    /// A reversible reaction id isn't one of the reactions of the space
    #[error("Reversible reaction {0} is not part of the reaction space")]
    UnknownReversibleReaction(String),
}
