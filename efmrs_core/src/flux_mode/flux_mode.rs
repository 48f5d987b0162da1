//! This module provides the FluxMode struct, the packed binary representation of an elementary
//! flux mode (or of a pattern shared between several of them)
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flux_mode::bit_vector::BitVector;
use crate::flux_mode::reaction_space::{ReactionDirection, ReactionSpace};

/// Represents an elementary flux mode, or a pattern of reaction directions
///
/// The active reaction directions are held in a [`BitVector`] laid out by a
/// [`ReactionSpace`]. A fully quantified flux mode also holds one non-zero coefficient per
/// set bit, in bit order, while a pattern holds none.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "FluxModeDefinition", into = "FluxModeDefinition")]
pub struct FluxMode {
    /// Active reaction directions
    bits: BitVector,
    /// Flux through each active reaction direction, in bit order
    coefficients: Option<Vec<f64>>,
}

impl FluxMode {
    /// Encode a map of reaction ids to fluxes
    ///
    /// Positive fluxes set the forward bit of a reaction, negative fluxes set the reverse bit
    /// (which only reversible reactions have). Reactions not in the map, or with a zero flux,
    /// are inactive.
    ///
    /// # Examples
    /// ```rust
    /// use efmrs_core::flux_mode::flux_mode::FluxMode;
    /// use efmrs_core::flux_mode::reaction_space::ReactionSpace;
    /// use indexmap::IndexMap;
    /// let space = ReactionSpace::new(
    ///     vec!["r1".to_string(), "r2".to_string()],
    ///     vec!["r2".to_string()],
    /// ).unwrap();
    /// let mut fluxes = IndexMap::new();
    /// fluxes.insert("r1".to_string(), 2.0);
    /// fluxes.insert("r2".to_string(), -1.0);
    /// let efm = FluxMode::encode(&space, &fluxes).unwrap();
    /// assert_eq!(efm.length(), 2);
    /// assert_eq!(efm.decode(&space, false), fluxes);
    /// ```
    pub fn encode(
        space: &ReactionSpace,
        fluxes: &IndexMap<String, f64>,
    ) -> Result<FluxMode, FluxModeError> {
        for (id, &flux) in fluxes {
            if space.index_of(id).is_none() {
                return Err(FluxModeError::UnknownReaction(id.clone()));
            }
            if !flux.is_finite() {
                return Err(FluxModeError::NonFiniteFlux {
                    reaction: id.clone(),
                    flux,
                });
            }
            if flux < 0. && !space.is_reversible(id) {
                return Err(FluxModeError::IrreversibleReverseFlux {
                    reaction: id.clone(),
                    flux,
                });
            }
        }

        let mut bits = BitVector::new(space.bit_count());
        let mut coefficients = Vec::new();
        // Walking the reactions in space order visits the bits in increasing order
        for (index, id) in space.reaction_ids().enumerate() {
            let flux = match fluxes.get(id) {
                Some(&flux) if flux != 0. => flux,
                _ => continue,
            };
            let reaction_direction = if flux > 0. {
                ReactionDirection::forward(index)
            } else {
                ReactionDirection::reverse(index)
            };
            let bit = space
                .bit_of(reaction_direction)
                .ok_or_else(|| FluxModeError::UnknownReaction(id.to_string()))?;
            bits.set_bit(bit);
            coefficients.push(flux);
        }

        Ok(FluxMode {
            bits,
            coefficients: Some(coefficients),
        })
    }

    /// Create a pattern from raw bits
    pub fn from_bits(bits: BitVector) -> FluxMode {
        FluxMode {
            bits,
            coefficients: None,
        }
    }

    /// Create a pattern with exactly the given reaction directions active
    pub fn from_directions<'a, I>(
        space: &ReactionSpace,
        directions: I,
    ) -> Result<FluxMode, FluxModeError>
    where
        I: IntoIterator<Item = &'a ReactionDirection>,
    {
        let mut bits = BitVector::new(space.bit_count());
        for reaction_direction in directions {
            let bit = space
                .bit_of(*reaction_direction)
                .ok_or(FluxModeError::InvalidDirection(*reaction_direction))?;
            bits.set_bit(bit);
        }
        Ok(FluxMode::from_bits(bits))
    }

    /// Decode into an ordered map of reaction ids to fluxes
    ///
    /// If `binary_form_only` is set (or this is a pattern without coefficients), every active
    /// reaction maps to 1 or -1 depending on its direction.
    pub fn decode(&self, space: &ReactionSpace, binary_form_only: bool) -> IndexMap<String, f64> {
        let mut decoded = IndexMap::new();
        for (position, bit) in self.bits.iter_ones().enumerate() {
            let reaction_direction = match space.direction_of(bit) {
                Some(reaction_direction) => reaction_direction,
                None => continue,
            };
            let id = match space.reaction_id(reaction_direction.reaction) {
                Some(id) => id.to_string(),
                None => continue,
            };
            let flux = match (&self.coefficients, binary_form_only) {
                (Some(coefficients), false) => coefficients[position],
                _ => reaction_direction.direction.unit(),
            };
            decoded.insert(id, flux);
        }
        decoded
    }

    /// Active reaction directions, in bit order
    pub fn directions(&self, space: &ReactionSpace) -> Vec<ReactionDirection> {
        self.bits
            .iter_ones()
            .filter_map(|bit| space.direction_of(bit))
            .collect()
    }

    /// Pattern of the reaction directions active in both `self` and `other`
    pub fn intersection(&self, other: &FluxMode) -> FluxMode {
        FluxMode::from_bits(self.bits.and(&other.bits))
    }

    /// Number of active reaction directions
    pub fn length(&self) -> usize {
        self.bits.count_ones()
    }

    /// Whether every reaction direction active in `pattern` is active in `self`
    pub fn contains(&self, pattern: &FluxMode) -> bool {
        pattern.bits.is_subset_of(&self.bits)
    }

    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    /// Whether this is a pattern, i.e. carries no coefficients
    pub fn is_pattern(&self) -> bool {
        self.coefficients.is_none()
    }

    /// Drop the coefficients, keeping only the active reaction directions
    pub fn to_pattern(&self) -> FluxMode {
        FluxMode::from_bits(self.bits.clone())
    }
}

/// Serialized form of a [`FluxMode`]
#[derive(Serialize, Deserialize)]
struct FluxModeDefinition {
    bits: BitVector,
    coefficients: Option<Vec<f64>>,
}

impl TryFrom<FluxModeDefinition> for FluxMode {
    type Error = FluxModeError;

    fn try_from(value: FluxModeDefinition) -> Result<Self, Self::Error> {
        if let Some(coefficients) = &value.coefficients {
            let active = value.bits.count_ones();
            if coefficients.len() != active {
                return Err(FluxModeError::CoefficientCount {
                    active,
                    found: coefficients.len(),
                });
            }
            if let Some(&flux) = coefficients.iter().find(|c| !c.is_finite() || **c == 0.) {
                return Err(FluxModeError::InvalidCoefficient(flux));
            }
        }
        Ok(FluxMode {
            bits: value.bits,
            coefficients: value.coefficients,
        })
    }
}

impl From<FluxMode> for FluxModeDefinition {
    fn from(value: FluxMode) -> Self {
        FluxModeDefinition {
            bits: value.bits,
            coefficients: value.coefficients,
        }
    }
}

// Coefficients are compared bitwise so that equality and hashing agree
impl PartialEq for FluxMode {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
            && match (&self.coefficients, &other.coefficients) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
                }
                _ => false,
            }
    }
}

impl Eq for FluxMode {}

impl Hash for FluxMode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
        match &self.coefficients {
            Some(coefficients) => {
                state.write_u8(1);
                coefficients.len().hash(state);
                coefficients.iter().for_each(|c| c.to_bits().hash(state));
            }
            None => state.write_u8(0),
        }
    }
}

/// Errors associated with encoding flux modes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxModeError {
    /// A flux was given for a reaction outside of the reaction space
    #[error("Reaction {0} is not part of the reaction space")]
    UnknownReaction(String),
    /// A negative flux was given for an irreversible reaction
    #[error("Reaction {reaction} is irreversible but was given flux {flux}")]
    IrreversibleReverseFlux { reaction: String, flux: f64 },
    /// A flux was NaN or infinite
    #[error("Reaction {reaction} was given non-finite flux {flux}")]
    NonFiniteFlux { reaction: String, flux: f64 },
    /// A reaction direction doesn't exist in the reaction space
    #[error("Reaction direction {0:?} is not part of the reaction space")]
    InvalidDirection(ReactionDirection),
    /// Flux modes built from different reaction spaces were mixed
    #[error("Flux mode {id} has {found} words, expected {expected}")]
    WidthMismatch {
        id: usize,
        expected: usize,
        found: usize,
    },
    /// A serialized flux mode doesn't hold one coefficient per active reaction direction
    #[error("Flux mode has {active} active reaction directions but {found} coefficients")]
    CoefficientCount { active: usize, found: usize },
    /// A serialized flux mode holds a zero or non-finite coefficient
    #[error("Flux mode coefficient {0} is not a non-zero finite value")]
    InvalidCoefficient(f64),
    /// Encoding one of a collection of flux modes failed
    #[error("Invalid flux mode {id}: {source}")]
    InvalidFluxMode {
        id: usize,
        #[source]
        source: Box<FluxModeError>,
    },
}
