use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use efmrs_core::classify::acom::{AcomClassifier, AcomConfigBuilder};
use efmrs_core::classify::clique_detector::{CliqueConfigBuilder, CliqueDetector};
use efmrs_core::classify::pattern_miner::{MinerConfigBuilder, PatternMiner};
use efmrs_core::classify::PatternSet;
use efmrs_core::flux_mode::flux_mode::FluxMode;
use efmrs_core::flux_mode::reaction_space::ReactionSpace;
use efmrs_core::flux_mode::{encode_flux_modes, FluxModeId, FluxModes};
use indexmap::IndexMap;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

type Fluxes = IndexMap<String, f64>;
type PyPatterns = BTreeMap<usize, (Fluxes, BTreeSet<FluxModeId>)>;
type PyClusters = Vec<(Vec<String>, BTreeSet<FluxModeId>)>;

fn value_error<E: Display>(err: E) -> PyErr {
    PyValueError::new_err(err.to_string())
}

#[pyclass(name = "ReactionSpace")]
struct PyReactionSpace {
    inner: ReactionSpace,
}

#[pymethods]
impl PyReactionSpace {
    #[new]
    #[pyo3(signature = (reaction_ids, reversible = Vec::new()))]
    fn new(reaction_ids: Vec<String>, reversible: Vec<String>) -> PyResult<Self> {
        let inner = ReactionSpace::new(reaction_ids, reversible).map_err(value_error)?;
        Ok(PyReactionSpace { inner })
    }

    fn reaction_ids(&self) -> Vec<String> {
        self.inner.reaction_ids().map(String::from).collect()
    }

    fn bit_count(&self) -> usize {
        self.inner.bit_count()
    }

    fn is_reversible(&self, reaction_id: &str) -> bool {
        self.inner.is_reversible(reaction_id)
    }

    fn __repr__(&self) -> String {
        format!("ReactionSpace({})", self.inner)
    }
}

#[pyclass(name = "FluxMode")]
struct PyFluxMode {
    inner: FluxMode,
}

#[pymethods]
impl PyFluxMode {
    #[staticmethod]
    fn encode(space: PyRef<'_, PyReactionSpace>, fluxes: Fluxes) -> PyResult<Self> {
        let inner = FluxMode::encode(&space.inner, &fluxes).map_err(value_error)?;
        Ok(PyFluxMode { inner })
    }

    #[pyo3(signature = (space, binary_form_only = false))]
    fn decode(&self, space: PyRef<'_, PyReactionSpace>, binary_form_only: bool) -> Fluxes {
        self.inner.decode(&space.inner, binary_form_only)
    }

    fn intersection(&self, other: PyRef<'_, PyFluxMode>) -> PyFluxMode {
        PyFluxMode {
            inner: self.inner.intersection(&other.inner),
        }
    }

    fn length(&self) -> usize {
        self.inner.length()
    }

    fn contains(&self, pattern: PyRef<'_, PyFluxMode>) -> bool {
        self.inner.contains(&pattern.inner)
    }

    fn is_pattern(&self) -> bool {
        self.inner.is_pattern()
    }
}

fn encode_all(
    space: &ReactionSpace,
    flux_modes: &BTreeMap<FluxModeId, Fluxes>,
) -> PyResult<FluxModes> {
    encode_flux_modes(space, flux_modes).map_err(value_error)
}

fn decode_patterns(space: &ReactionSpace, pattern_set: &PatternSet) -> PyPatterns {
    pattern_set
        .iter()
        .map(|(id, pattern, support)| (id, (pattern.decode(space, false), support.clone())))
        .collect()
}

/// Mine the reaction patterns shared by groups of flux modes
#[pyfunction]
#[pyo3(signature = (space, flux_modes, min_pattern_len, min_efm_num = None, max_pattern_num = None, processes = None))]
fn mine_patterns(
    py: Python<'_>,
    space: PyRef<'_, PyReactionSpace>,
    flux_modes: BTreeMap<FluxModeId, Fluxes>,
    min_pattern_len: usize,
    min_efm_num: Option<usize>,
    max_pattern_num: Option<usize>,
    processes: Option<usize>,
) -> PyResult<PyPatterns> {
    let efms = encode_all(&space.inner, &flux_modes)?;
    let mut builder = MinerConfigBuilder::default();
    builder.min_pattern_len(min_pattern_len);
    if let Some(min_efm_num) = min_efm_num {
        builder.min_efm_num(min_efm_num);
    }
    if let Some(max_pattern_num) = max_pattern_num {
        builder.max_pattern_num(max_pattern_num);
    }
    if let Some(processes) = processes {
        builder.processes(processes);
    }
    let miner = PatternMiner::new(builder.build().map_err(value_error)?);
    let patterns = py
        .allow_threads(|| miner.classify(&efms))
        .map_err(value_error)?;
    Ok(decode_patterns(&space.inner, &patterns))
}

/// Find the maximal cliques of co-occurring reaction directions
#[pyfunction]
#[pyo3(signature = (space, flux_modes, min_clique_size, efm_num = None, processes = None))]
fn detect_cliques(
    py: Python<'_>,
    space: PyRef<'_, PyReactionSpace>,
    flux_modes: BTreeMap<FluxModeId, Fluxes>,
    min_clique_size: usize,
    efm_num: Option<usize>,
    processes: Option<usize>,
) -> PyResult<PyPatterns> {
    let efms = encode_all(&space.inner, &flux_modes)?;
    let mut builder = CliqueConfigBuilder::default();
    builder.min_clique_size(min_clique_size);
    if let Some(efm_num) = efm_num {
        builder.efm_num(efm_num);
    }
    if let Some(processes) = processes {
        builder.processes(processes);
    }
    let detector = CliqueDetector::new(builder.build().map_err(value_error)?);
    let reaction_space = &space.inner;
    let patterns = py
        .allow_threads(|| detector.detect(reaction_space, &efms))
        .map_err(value_error)?;
    Ok(decode_patterns(&space.inner, &patterns))
}

/// Cluster flux modes by their common motifs
///
/// Returns None for no flux modes, otherwise the clusters as (motif labels, members) pairs,
/// the outliers, and the neighbour threshold used.
#[pyfunction]
#[pyo3(signature = (space, flux_modes, min_motif_length, neighbour_threshold = None, processes = None))]
fn acom_classify(
    py: Python<'_>,
    space: PyRef<'_, PyReactionSpace>,
    flux_modes: BTreeMap<FluxModeId, Fluxes>,
    min_motif_length: usize,
    neighbour_threshold: Option<usize>,
    processes: Option<usize>,
) -> PyResult<Option<(PyClusters, BTreeSet<FluxModeId>, usize)>> {
    let efms = encode_all(&space.inner, &flux_modes)?;
    let mut builder = AcomConfigBuilder::default();
    builder.min_motif_length(min_motif_length);
    if let Some(neighbour_threshold) = neighbour_threshold {
        builder.neighbour_threshold(neighbour_threshold);
    }
    if let Some(processes) = processes {
        builder.processes(processes);
    }
    let classifier = AcomClassifier::new(builder.build().map_err(value_error)?);
    let reaction_space = &space.inner;
    let classified = py.allow_threads(|| classifier.classify(reaction_space, &efms));
    let classification = match classified.map_err(value_error)? {
        Some(classification) => classification,
        None => return Ok(None),
    };
    let clusters = classification
        .clusters
        .iter()
        .map(|(motif, members)| {
            let labels = motif
                .iter()
                .filter_map(|&direction| space.inner.label(direction))
                .collect();
            (labels, members.clone())
        })
        .collect();
    Ok(Some((
        clusters,
        classification.outliers,
        classification.neighbour_threshold,
    )))
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyReactionSpace>()?;
    m.add_class::<PyFluxMode>()?;
    m.add_function(wrap_pyfunction!(mine_patterns, m)?)?;
    m.add_function(wrap_pyfunction!(detect_cliques, m)?)?;
    m.add_function(wrap_pyfunction!(acom_classify, m)?)?;
    Ok(())
}
