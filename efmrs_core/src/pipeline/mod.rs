//! Module connecting the classifiers to an external flux mode enumerator
//!
//! The enumerator itself (and whatever process it runs) is supplied by the caller through the
//! [`FluxModeEnumerator`] trait, this module only turns its textual output into flux modes.

pub mod enumerator_output;

use log::debug;
use thiserror::Error;

use crate::configuration::configured;
use crate::flux_mode::flux_mode::FluxModeError;
use crate::flux_mode::reaction_space::ReactionSpace;
use crate::flux_mode::{encode_flux_modes, FluxModes};
use crate::pipeline::enumerator_output::parse_flux_assignments;

/// What an enumerator is asked to produce
#[derive(Clone, Debug)]
pub struct EnumerationRequest<'rs> {
    /// Reaction space the flux modes will be encoded in
    pub reaction_space: &'rs ReactionSpace,
    /// Reaction ids in the order the enumerator writes fluxes in
    pub columns: Vec<String>,
    /// Fluxes with an absolute value at or below this are zero
    pub tolerance: f64,
}

impl<'rs> EnumerationRequest<'rs> {
    /// Create a request whose columns follow the reaction space order
    pub fn new(reaction_space: &'rs ReactionSpace) -> Self {
        EnumerationRequest {
            reaction_space,
            columns: reaction_space.reaction_ids().map(String::from).collect(),
            tolerance: configured(|c| c.tolerance),
        }
    }
}

/// Something able to enumerate the elementary flux modes of a network, writing one flux
/// assignment per line
pub trait FluxModeEnumerator {
    fn run(&self, request: &EnumerationRequest) -> Result<String, EnumeratorError>;
}

impl<F> FluxModeEnumerator for F
where
    F: Fn(&EnumerationRequest) -> Result<String, EnumeratorError>,
{
    fn run(&self, request: &EnumerationRequest) -> Result<String, EnumeratorError> {
        self(request)
    }
}

/// Run an enumerator and encode its output
pub fn enumerate_flux_modes<E: FluxModeEnumerator>(
    enumerator: &E,
    request: &EnumerationRequest,
) -> Result<FluxModes, EnumeratorError> {
    let output = enumerator.run(request)?;
    let assignments = parse_flux_assignments(&request.columns, &output, request.tolerance)?;
    debug!("Enumerator produced {} flux modes.", assignments.len());
    Ok(encode_flux_modes(request.reaction_space, &assignments)?)
}

/// Errors associated with running an enumerator and reading its output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnumeratorError {
    /// The enumerator failed to run
    #[error("Enumerator failed: {0}")]
    Failed(String),
    /// A value couldn't be parsed as a number
    #[error("Unable to parse {value:?} on line {line}")]
    MalformedValue { line: usize, value: String },
    /// A value parsed to NaN or infinity
    #[error("Non-finite value {value:?} on line {line}")]
    NonFiniteValue { line: usize, value: String },
    /// A line had the wrong number of values
    #[error("Line {line} has {found} values, expected {expected}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// The fluxes read couldn't be encoded
    #[error(transparent)]
    InvalidFluxMode(#[from] FluxModeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::pattern_miner::PatternMiner;
    use crate::test_utils::{fluxes, six_reaction_space};

    #[test]
    fn enumerate_and_mine() {
        let space = six_reaction_space();
        let enumerator = |request: &EnumerationRequest| -> Result<String, EnumeratorError> {
            assert_eq!(request.columns.len(), 6);
            Ok("10 10 10 0 0 0\n10 0 10 10 0 10\n".to_string())
        };
        let request = EnumerationRequest::new(&space);
        let efms = enumerate_flux_modes(&enumerator, &request).unwrap();
        assert_eq!(efms.len(), 2);
        let patterns = PatternMiner::with_min_pattern_len(2).classify(&efms).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            patterns.patterns[&1].decode(&space, false),
            fluxes(&[("r1", 1.), ("r3", 1.)])
        );
    }

    #[test]
    fn enumerator_failures_propagate() {
        let space = six_reaction_space();
        let enumerator = |_: &EnumerationRequest| -> Result<String, EnumeratorError> {
            Err(EnumeratorError::Failed("exit status 1".to_string()))
        };
        assert_eq!(
            enumerate_flux_modes(&enumerator, &EnumerationRequest::new(&space)),
            Err(EnumeratorError::Failed("exit status 1".to_string()))
        );
    }

    #[test]
    fn inconsistent_directions_are_rejected() {
        let space = six_reaction_space();
        // r1 is irreversible
        let enumerator = |_: &EnumerationRequest| -> Result<String, EnumeratorError> {
            Ok("-1 0 0 0 0 1\n".to_string())
        };
        assert!(matches!(
            enumerate_flux_modes(&enumerator, &EnumerationRequest::new(&space)),
            Err(EnumeratorError::InvalidFluxMode(
                FluxModeError::InvalidFluxMode { id: 1, .. }
            ))
        ));
    }
}
