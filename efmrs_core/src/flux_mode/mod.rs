//! Module providing the packed binary representation of elementary flux modes

pub mod bit_vector;
pub mod flux_mode;
pub mod reaction_space;

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::flux_mode::flux_mode::{FluxMode, FluxModeError};
use crate::flux_mode::reaction_space::ReactionSpace;

/// Identifier of a flux mode within a collection
pub type FluxModeId = usize;

/// Collection of flux modes keyed by id, iterated in ascending id order
pub type FluxModes = BTreeMap<FluxModeId, FluxMode>;

/// Encode a collection of reaction to flux maps against a single reaction space
///
/// # Examples
/// ```rust
/// use std::collections::BTreeMap;
/// use efmrs_core::flux_mode::encode_flux_modes;
/// use efmrs_core::flux_mode::reaction_space::ReactionSpace;
/// use indexmap::IndexMap;
/// let space = ReactionSpace::new(
///     vec!["r1".to_string(), "r2".to_string()],
///     Vec::<String>::new(),
/// ).unwrap();
/// let mut raw = BTreeMap::new();
/// raw.insert(1, IndexMap::from([("r1".to_string(), 1.0)]));
/// raw.insert(2, IndexMap::from([("r1".to_string(), 1.0), ("r2".to_string(), 4.0)]));
/// let efms = encode_flux_modes(&space, &raw).unwrap();
/// assert_eq!(efms[&2].length(), 2);
/// ```
pub fn encode_flux_modes(
    space: &ReactionSpace,
    raw: &BTreeMap<FluxModeId, IndexMap<String, f64>>,
) -> Result<FluxModes, FluxModeError> {
    raw.iter()
        .map(|(&id, fluxes)| {
            FluxMode::encode(space, fluxes)
                .map(|efm| (id, efm))
                .map_err(|err| FluxModeError::InvalidFluxMode {
                    id,
                    source: Box::new(err),
                })
        })
        .collect()
}

/// Check that every flux mode of a collection has the same word count, returning it
pub(crate) fn common_width(flux_modes: &FluxModes) -> Result<Option<usize>, FluxModeError> {
    let mut width = None;
    for (&id, efm) in flux_modes {
        let found = efm.bits().width();
        match width {
            None => width = Some(found),
            Some(expected) if expected != found => {
                return Err(FluxModeError::WidthMismatch {
                    id,
                    expected,
                    found,
                })
            }
            _ => {}
        }
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fluxes, six_reaction_space};

    #[test]
    fn encode_collection() {
        let space = six_reaction_space();
        let mut raw = BTreeMap::new();
        raw.insert(1, fluxes(&[("r1", 10.), ("r2", 10.), ("r3", 10.)]));
        raw.insert(2, fluxes(&[("r1", 10.), ("r3", 10.), ("r4", 10.), ("r6", 10.)]));
        let efms = encode_flux_modes(&space, &raw).unwrap();
        assert_eq!(efms.len(), 2);
        assert_eq!(efms[&1].length(), 3);
        assert_eq!(efms[&2].length(), 4);
        assert_eq!(common_width(&efms), Ok(Some(1)));
    }

    #[test]
    fn encode_collection_reports_id() {
        let space = six_reaction_space();
        let mut raw = BTreeMap::new();
        raw.insert(1, fluxes(&[("r1", 1.)]));
        raw.insert(7, fluxes(&[("r4", -1.)]));
        match encode_flux_modes(&space, &raw) {
            Err(FluxModeError::InvalidFluxMode { id, source }) => {
                assert_eq!(id, 7);
                assert!(matches!(
                    *source,
                    FluxModeError::IrreversibleReverseFlux { .. }
                ));
            }
            other => panic!("Invalid flux mode not caught: {:?}", other),
        }
    }

    #[test]
    fn mismatched_widths() {
        let mut efms = FluxModes::new();
        efms.insert(1, FluxMode::from_bits(bit_vector::BitVector::new(64)));
        efms.insert(2, FluxMode::from_bits(bit_vector::BitVector::new(65)));
        assert_eq!(
            common_width(&efms),
            Err(FluxModeError::WidthMismatch {
                id: 2,
                expected: 1,
                found: 2
            })
        );
        assert_eq!(common_width(&FluxModes::new()), Ok(None));
    }
}
