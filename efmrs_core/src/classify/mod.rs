//! Module for extracting structure shared between elementary flux modes
//!
//! Three independent classifiers are provided:
//! - [`pattern_miner::PatternMiner`], level-wise discovery of the reaction patterns shared by
//!   groups of flux modes
//! - [`clique_detector::CliqueDetector`], maximal cliques of the reaction co-occurrence graph
//! - [`acom::AcomClassifier`], agglomerative clustering of flux modes by motif resemblance

pub mod acom;
pub mod clique_detector;
pub mod hierarchy;
pub mod pattern_miner;

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flux_mode::flux_mode::{FluxMode, FluxModeError};
use crate::flux_mode::reaction_space::ReactionSpace;
use crate::flux_mode::{common_width, FluxModeId, FluxModes};

/// Identifier of a pattern within a [`PatternSet`], numbered from 1
pub type PatternId = usize;

/// Patterns found by a classifier, and the flux modes containing each of them
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    /// Map of pattern ids to patterns (flux modes without coefficients)
    pub patterns: BTreeMap<PatternId, FluxMode>,
    /// Map of pattern ids to the ids of the flux modes containing the pattern
    pub support: BTreeMap<PatternId, BTreeSet<FluxModeId>>,
}

impl PatternSet {
    /// Number patterns from 1 in the order given
    pub(crate) fn from_ranked(ranked: Vec<(FluxMode, BTreeSet<FluxModeId>)>) -> PatternSet {
        let mut pattern_set = PatternSet::default();
        for (index, (pattern, support)) in ranked.into_iter().enumerate() {
            pattern_set.patterns.insert(index + 1, pattern);
            pattern_set.support.insert(index + 1, support);
        }
        pattern_set
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate over (id, pattern, support) in id order
    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &FluxMode, &BTreeSet<FluxModeId>)> {
        self.patterns.iter().filter_map(|(&id, pattern)| {
            self.support.get(&id).map(|support| (id, pattern, support))
        })
    }
}

/// Ids of every flux mode containing `pattern`
pub(crate) fn support_of(pattern: &FluxMode, flux_modes: &FluxModes) -> BTreeSet<FluxModeId> {
    flux_modes
        .iter()
        .filter(|(_, efm)| efm.contains(pattern))
        .map(|(&id, _)| id)
        .collect()
}

/// Attach full support sets to a list of patterns, in parallel
pub(crate) fn with_support(
    patterns: Vec<FluxMode>,
    flux_modes: &FluxModes,
) -> Vec<(FluxMode, BTreeSet<FluxModeId>)> {
    patterns
        .into_par_iter()
        .map(|pattern| {
            let support = support_of(&pattern, flux_modes);
            (pattern, support)
        })
        .collect()
}

/// Validate that the flux modes share one width, matching the reaction space if one is given
pub(crate) fn validate_flux_modes(
    flux_modes: &FluxModes,
    space: Option<&ReactionSpace>,
) -> Result<(), ClassificationError> {
    let width = common_width(flux_modes)?;
    if let (Some(found), Some(space)) = (width, space) {
        if found != space.word_count() {
            let id = flux_modes.keys().next().copied().unwrap_or_default();
            return Err(FluxModeError::WidthMismatch {
                id,
                expected: space.word_count(),
                found,
            }
            .into());
        }
    }
    Ok(())
}

/// Run `op` on a dedicated rayon pool with `processes` worker threads
pub(crate) fn run_in_pool<R, F>(processes: usize, op: F) -> Result<R, ClassificationError>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(processes.max(1))
        .build()
        .map_err(|err| ClassificationError::ThreadPool(err.to_string()))?;
    Ok(pool.install(op))
}

/// Errors associated with classifying flux modes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    /// The flux modes given couldn't be classified together
    #[error(transparent)]
    InvalidInput(#[from] FluxModeError),
    /// The search grew past its configured limit, the thresholds are likely too permissive
    #[error("Found more than {limit} {what}, try stricter thresholds")]
    Unbounded { what: &'static str, limit: usize },
    /// Worker threads couldn't be started
    #[error("Unable to start worker threads: {0}")]
    ThreadPool(String),
}
