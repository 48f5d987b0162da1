//! Patterns built from the maximal cliques of a reaction co-occurrence graph
//!
//! Two reaction directions are connected when they are active together in at least `efm_num`
//! flux modes. Every maximal clique of this graph which is large enough becomes a pattern.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use derive_builder::Builder;
use log::{debug, info, trace};
use petgraph::algo::{maximal_cliques, tarjan_scc};
use petgraph::graphmap::UnGraphMap;
use rayon::prelude::*;

use crate::classify::{
    run_in_pool, validate_flux_modes, with_support, ClassificationError, PatternSet,
};
use crate::configuration::configured;
use crate::flux_mode::flux_mode::FluxMode;
use crate::flux_mode::reaction_space::{ReactionDirection, ReactionSpace};
use crate::flux_mode::FluxModes;

/// Options of the [`CliqueDetector`]
#[derive(Builder, Clone, Debug)]
pub struct CliqueConfig {
    /// Minimum number of reaction directions in a reported clique
    pub min_clique_size: usize,
    /// Minimum number of flux modes two reaction directions must share to be connected
    #[builder(default = "configured(|c| c.efm_num)")]
    pub efm_num: usize,
    /// Maximum number of maximal cliques enumerated, over all components, before giving up
    #[builder(default = "configured(|c| c.max_clique_num)")]
    pub max_clique_num: usize,
    /// Worker threads used for counting and for processing components
    #[builder(default = "configured(|c| c.processes)")]
    pub processes: usize,
}

type CoOccurrenceGraph = UnGraphMap<ReactionDirection, usize>;
type PairCounts = HashMap<(ReactionDirection, ReactionDirection), usize>;

/// Finds patterns as maximal cliques of co-occurring reaction directions
pub struct CliqueDetector {
    config: CliqueConfig,
}

impl CliqueDetector {
    pub fn new(config: CliqueConfig) -> Self {
        CliqueDetector { config }
    }

    pub fn config(&self) -> &CliqueConfig {
        &self.config
    }

    /// Find the clique patterns of the given flux modes
    ///
    /// Patterns are numbered from 1 in order of their sorted reaction directions, and each is
    /// reported with every flux mode containing it.
    pub fn detect(
        &self,
        space: &ReactionSpace,
        flux_modes: &FluxModes,
    ) -> Result<PatternSet, ClassificationError> {
        validate_flux_modes(flux_modes, Some(space))?;
        run_in_pool(self.config.processes, || self.detect_in_pool(space, flux_modes))?
    }

    fn detect_in_pool(
        &self,
        space: &ReactionSpace,
        flux_modes: &FluxModes,
    ) -> Result<PatternSet, ClassificationError> {
        let counts = co_occurrences(space, flux_modes);
        let graph = self.co_occurrence_graph(&counts);
        let components = connected_components(&graph);
        debug!(
            "Co-occurrence graph has {} vertices and {} edges in {} components.",
            graph.node_count(),
            graph.edge_count(),
            components.len()
        );

        let enumerated = AtomicUsize::new(0);
        let limit = self.config.max_clique_num;
        let per_component = components
            .par_iter()
            .map(|component| component_cliques(&graph, component, &enumerated, limit))
            .collect::<Result<Vec<_>, _>>()?;
        let mut cliques: Vec<Vec<ReactionDirection>> = per_component
            .into_iter()
            .flatten()
            .filter(|clique| clique.len() >= self.config.min_clique_size)
            .collect();
        cliques.sort();

        let patterns = cliques
            .iter()
            .map(|clique| FluxMode::from_directions(space, clique))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Clique detection found {} cliques, {} of at least {} directions.",
            enumerated.load(Ordering::Relaxed),
            patterns.len(),
            self.config.min_clique_size
        );
        Ok(PatternSet::from_ranked(with_support(patterns, flux_modes)))
    }

    /// Connect every pair of reaction directions which co-occur often enough, weighting each
    /// edge by the number of shared flux modes
    fn co_occurrence_graph(&self, counts: &PairCounts) -> CoOccurrenceGraph {
        let mut pairs: Vec<(ReactionDirection, ReactionDirection, usize)> = counts
            .iter()
            .filter(|&(_, &count)| count >= self.config.efm_num)
            .map(|(&(a, b), &count)| (a, b, count))
            .collect();
        pairs.sort();
        CoOccurrenceGraph::from_edges(pairs)
    }
}

/// Count, for each unordered pair of reaction directions, the flux modes they are both active in
fn co_occurrences(space: &ReactionSpace, flux_modes: &FluxModes) -> PairCounts {
    flux_modes
        .par_iter()
        .fold(PairCounts::new, |mut counts, (_, efm)| {
            let directions = efm.directions(space);
            for (position, &a) in directions.iter().enumerate() {
                for &b in &directions[position + 1..] {
                    *counts.entry((a.min(b), a.max(b))).or_default() += 1;
                }
            }
            counts
        })
        .reduce(PairCounts::new, |mut left, right| {
            for (pair, count) in right {
                *left.entry(pair).or_default() += count;
            }
            left
        })
}

/// Split the graph into connected components, each sorted
///
/// Every edge of an undirected graph runs both ways, so its strongly connected components
/// are its connected components.
fn connected_components(graph: &CoOccurrenceGraph) -> Vec<Vec<ReactionDirection>> {
    let mut components = tarjan_scc(graph);
    components.iter_mut().for_each(|component| component.sort());
    components.sort();
    components
}

/// Enumerate the maximal cliques of one component, each sorted, adding them to the count
/// shared by every component
fn component_cliques(
    graph: &CoOccurrenceGraph,
    component: &[ReactionDirection],
    enumerated: &AtomicUsize,
    limit: usize,
) -> Result<Vec<Vec<ReactionDirection>>, ClassificationError> {
    let unbounded = || ClassificationError::Unbounded {
        what: "cliques",
        limit,
    };
    if enumerated.load(Ordering::Relaxed) > limit {
        return Err(unbounded());
    }
    let mut subgraph = CoOccurrenceGraph::new();
    for &vertex in component {
        subgraph.add_node(vertex);
        for (_, neighbour, &count) in graph.edges(vertex) {
            subgraph.add_edge(vertex, neighbour, count);
        }
    }
    let cliques: Vec<Vec<ReactionDirection>> = maximal_cliques(&subgraph)
        .into_iter()
        .map(|clique| {
            let mut clique: Vec<ReactionDirection> = clique.into_iter().collect();
            clique.sort();
            clique
        })
        .collect();
    trace!(
        "Component of {} vertices has {} maximal cliques.",
        component.len(),
        cliques.len()
    );
    if enumerated.fetch_add(cliques.len(), Ordering::Relaxed) + cliques.len() > limit {
        return Err(unbounded());
    }
    Ok(cliques)
}
