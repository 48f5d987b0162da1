//! Core rust implementation of efm.rs, a crate for encoding and classifying elementary flux modes.

pub mod classify;
pub mod configuration;
pub mod flux_mode;
pub mod pipeline;
#[cfg(test)]
mod test_utils;
