//! Shared fixtures for the unit tests
use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::flux_mode::reaction_space::ReactionSpace;
use crate::flux_mode::{encode_flux_modes, FluxModeId, FluxModes};

/// Initialize env_logger for tests. Safe to call multiple times.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Build a reaction to flux map
pub fn fluxes(entries: &[(&str, f64)]) -> IndexMap<String, f64> {
    entries
        .iter()
        .map(|(id, flux)| (id.to_string(), *flux))
        .collect()
}

/// Build a reaction space from reaction ids and reversible reaction ids
pub fn reaction_space(reactions: &[&str], reversible: &[&str]) -> ReactionSpace {
    ReactionSpace::new(
        reactions.iter().map(|id| id.to_string()),
        reversible.iter().map(|id| id.to_string()),
    )
    .unwrap()
}

/// Reactions r1 to r6, with r2 and r3 reversible
pub fn six_reaction_space() -> ReactionSpace {
    reaction_space(&["r1", "r2", "r3", "r4", "r5", "r6"], &["r2", "r3"])
}

/// Encode flux modes given as lists of active reactions (prefix `-` for reverse activity),
/// numbered from 1
pub fn flux_modes(space: &ReactionSpace, modes: &[&[&str]]) -> FluxModes {
    let raw: BTreeMap<FluxModeId, IndexMap<String, f64>> = modes
        .iter()
        .enumerate()
        .map(|(index, reactions)| {
            let map = reactions
                .iter()
                .map(|label| match label.strip_prefix('-') {
                    Some(id) => (id.to_string(), -10.),
                    None => (label.to_string(), 10.),
                })
                .collect();
            (index + 1, map)
        })
        .collect();
    encode_flux_modes(space, &raw).unwrap()
}
