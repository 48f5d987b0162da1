//! ACoM, agglomeration of common motifs (Peres et al. 2011)
//!
//! Flux modes are grouped by the reaction directions they share. Each flux mode seeds a cluster
//! with the flux modes resembling it, clusters with overlapping motifs are merged, and the flux
//! modes left over are attached to any cluster they share a long enough motif with.
//!
//! The procedure is greedy, so its result depends on the order flux modes and clusters are
//! visited in. Flux modes are always visited in ascending id order and clusters in ascending
//! motif order, making the result one reproducible choice among several equally valid ones.
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use derive_builder::Builder;
use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classify::{run_in_pool, validate_flux_modes, ClassificationError};
use crate::configuration::configured;
use crate::flux_mode::reaction_space::{ReactionDirection, ReactionSpace};
use crate::flux_mode::{FluxModeId, FluxModes};

/// Set of reaction directions, kept sorted
pub type Motif = BTreeSet<ReactionDirection>;

/// Map of cluster motifs to the ids of their member flux modes
pub type Clusters = BTreeMap<Motif, BTreeSet<FluxModeId>>;

/// Options of the [`AcomClassifier`]
#[derive(Builder, Clone, Debug)]
pub struct AcomConfig {
    /// Minimum number of reaction directions in a cluster motif
    pub min_motif_length: usize,
    /// Minimum resemblance for two flux modes to be neighbours, defaults to the rounded mean
    /// resemblance
    #[builder(default, setter(strip_option))]
    pub neighbour_threshold: Option<usize>,
    /// Worker threads used for the resemblance matrix and cluster seeding
    #[builder(default = "configured(|c| c.processes)")]
    pub processes: usize,
}

/// Result of an ACoM classification
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AcomClassification {
    /// Clusters keyed by their motif
    #[serde(with = "cluster_list")]
    pub clusters: Clusters,
    /// Flux modes belonging to no cluster
    pub outliers: BTreeSet<FluxModeId>,
    /// Resemblance threshold which was used
    pub neighbour_threshold: usize,
}

/// Pairwise motif resemblance of a collection of flux modes
///
/// Only the lower triangle (including the diagonal) is stored.
pub struct ResemblanceMatrix {
    rows: Vec<Vec<usize>>,
}

impl ResemblanceMatrix {
    pub fn new(motifs: &[Motif]) -> Self {
        let rows: Vec<Vec<usize>> = (0..motifs.len())
            .into_par_iter()
            .map(|i| {
                (0..=i)
                    .map(|j| motifs[i].intersection(&motifs[j]).count())
                    .collect::<Vec<usize>>()
            })
            .collect();
        ResemblanceMatrix { rows }
    }

    /// Resemblance of the flux modes at positions `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> usize {
        if j <= i {
            self.rows[i][j]
        } else {
            self.rows[j][i]
        }
    }

    /// Rounded mean over the stored triangle
    pub fn default_threshold(&self) -> usize {
        let (total, count) = self
            .rows
            .iter()
            .flatten()
            .fold((0usize, 0usize), |(total, count), &value| {
                (total + value, count + 1)
            });
        if count == 0 {
            return 0;
        }
        (total as f64 / count as f64).round() as usize
    }
}

/// Clusters flux modes by common motifs
pub struct AcomClassifier {
    config: AcomConfig,
}

impl AcomClassifier {
    pub fn new(config: AcomConfig) -> Self {
        AcomClassifier { config }
    }

    pub fn config(&self) -> &AcomConfig {
        &self.config
    }

    /// Cluster the given flux modes, returning None if there are none
    pub fn classify(
        &self,
        space: &ReactionSpace,
        flux_modes: &FluxModes,
    ) -> Result<Option<AcomClassification>, ClassificationError> {
        validate_flux_modes(flux_modes, Some(space))?;
        if flux_modes.is_empty() {
            return Ok(None);
        }
        let classification =
            run_in_pool(self.config.processes, || self.agglomerate(space, flux_modes))?;
        Ok(Some(classification))
    }

    fn agglomerate(&self, space: &ReactionSpace, flux_modes: &FluxModes) -> AcomClassification {
        let ids: Vec<FluxModeId> = flux_modes.keys().copied().collect();
        let motifs: Vec<Motif> = flux_modes
            .values()
            .map(|efm| efm.directions(space).into_iter().collect())
            .collect();
        let resemblance = ResemblanceMatrix::new(&motifs);
        let threshold = self
            .config
            .neighbour_threshold
            .unwrap_or_else(|| resemblance.default_threshold());
        debug!(
            "Resemblance of {} flux modes computed, neighbour threshold {}.",
            ids.len(),
            threshold
        );

        let seeds: Vec<Option<(Motif, BTreeSet<usize>)>> = (0..ids.len())
            .into_par_iter()
            .map(|seed| self.seed_cluster(seed, &motifs, &resemblance, threshold))
            .collect();
        let mut outliers: BTreeSet<FluxModeId> = ids.iter().copied().collect();
        let mut clusters = Clusters::new();
        for (motif, neighbours) in seeds.into_iter().flatten() {
            let members = clusters.entry(motif).or_default();
            for position in neighbours {
                members.insert(ids[position]);
                outliers.remove(&ids[position]);
            }
        }
        debug!(
            "Seeding produced {} clusters, {} outliers.",
            clusters.len(),
            outliers.len()
        );

        self.merge_clusters(&mut clusters);
        assign_exclusively(&mut clusters);
        debug!("Merging left {} clusters.", clusters.len());

        let motif_of: BTreeMap<FluxModeId, &Motif> =
            ids.iter().copied().zip(motifs.iter()).collect();
        self.reclassify_outliers(&mut clusters, &mut outliers, &motif_of);
        info!(
            "ACoM finished with {} clusters and {} outliers.",
            clusters.len(),
            outliers.len()
        );

        AcomClassification {
            clusters,
            outliers,
            neighbour_threshold: threshold,
        }
    }

    /// Grow a cluster around the flux mode at position `seed`, returning its motif and the
    /// positions of its members, or None if it gathers no neighbours or its motif gets too
    /// short
    fn seed_cluster(
        &self,
        seed: usize,
        motifs: &[Motif],
        resemblance: &ResemblanceMatrix,
        threshold: usize,
    ) -> Option<(Motif, BTreeSet<usize>)> {
        let mut motif = motifs[seed].clone();
        let mut neighbours = BTreeSet::from([seed]);
        for other in (0..motifs.len()).filter(|&other| other != seed) {
            if resemblance.get(seed, other) < threshold {
                continue;
            }
            motif = &motif & &motifs[other];
            if motif.len() < self.config.min_motif_length {
                trace!("Seed at position {} abandoned at position {}.", seed, other);
                return None;
            }
            neighbours.insert(other);
        }
        if neighbours.len() > 1 {
            Some((motif, neighbours))
        } else {
            None
        }
    }

    /// Merge clusters with overlapping motifs until no pair overlaps enough
    fn merge_clusters(&self, clusters: &mut Clusters) {
        loop {
            let keys: Vec<&Motif> = clusters.keys().collect();
            let mut merge = None;
            'search: for (position, first) in keys.iter().enumerate() {
                for second in &keys[position + 1..] {
                    let shared: Motif = *first & *second;
                    if shared.len() >= self.config.min_motif_length {
                        merge = Some(((*first).clone(), (*second).clone(), shared));
                        break 'search;
                    }
                }
            }
            let (first, second, shared) = match merge {
                Some(merge) => merge,
                None => return,
            };
            let mut members = clusters.remove(&first).unwrap_or_default();
            members.extend(clusters.remove(&second).unwrap_or_default());
            clusters.entry(shared).or_default().extend(members);
        }
    }

    /// Attach outliers to the first cluster sharing a long enough motif with them, narrowing
    /// the cluster motif if needed
    fn reclassify_outliers(
        &self,
        clusters: &mut Clusters,
        outliers: &mut BTreeSet<FluxModeId>,
        motif_of: &BTreeMap<FluxModeId, &Motif>,
    ) {
        let mut pass = 0;
        while !outliers.is_empty() {
            pass += 1;
            let mut reclassified = BTreeSet::new();
            for &id in outliers.iter() {
                let motif = match motif_of.get(&id) {
                    Some(motif) => *motif,
                    None => continue,
                };
                let found = clusters.keys().find_map(|key| {
                    let shared: Motif = key & motif;
                    (shared.len() >= self.config.min_motif_length).then(|| (key.clone(), shared))
                });
                let (key, shared) = match found {
                    Some(found) => found,
                    None => continue,
                };
                if shared.len() < key.len() {
                    let mut members = clusters.remove(&key).unwrap_or_default();
                    members.insert(id);
                    clusters.entry(shared).or_default().extend(members);
                } else {
                    clusters.entry(key).or_default().insert(id);
                }
                reclassified.insert(id);
            }
            debug!(
                "[pass:{}] {} outliers reclassified.",
                pass,
                reclassified.len()
            );
            if reclassified.is_empty() {
                return;
            }
            outliers.retain(|id| !reclassified.contains(id));
        }
    }
}

/// Keep each flux mode only in the cluster with the longest motif claiming it (the smallest
/// motif on ties), dropping clusters left empty
fn assign_exclusively(clusters: &mut Clusters) {
    let mut order: Vec<Motif> = clusters.keys().cloned().collect();
    order.sort_by_key(|motif| (Reverse(motif.len()), motif.clone()));
    let mut claimed: BTreeSet<FluxModeId> = BTreeSet::new();
    for motif in order {
        if let Some(members) = clusters.get_mut(&motif) {
            members.retain(|id| claimed.insert(*id));
        }
    }
    clusters.retain(|_, members| !members.is_empty());
}

/// Serialize clusters as a list of (motif, members) pairs, since motifs can't be map keys in
/// most formats
mod cluster_list {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Clusters, Motif};
    use crate::flux_mode::FluxModeId;

    pub fn serialize<S: Serializer>(clusters: &Clusters, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(clusters.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Clusters, D::Error> {
        let pairs: Vec<(Motif, BTreeSet<FluxModeId>)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{flux_modes, init_logger, reaction_space};

    fn classifier(min_motif_length: usize, neighbour_threshold: Option<usize>) -> AcomClassifier {
        let mut builder = AcomConfigBuilder::default();
        builder.min_motif_length(min_motif_length);
        if let Some(threshold) = neighbour_threshold {
            builder.neighbour_threshold(threshold);
        }
        AcomClassifier::new(builder.build().unwrap())
    }

    fn motif(space: &ReactionSpace, labels: &[&str]) -> Motif {
        labels
            .iter()
            .map(|label| space.parse_label(label).unwrap())
            .collect()
    }

    /// Members and outliers cover every flux mode exactly once, and members contain their motif
    fn assert_partition(result: &AcomClassification, efms: &FluxModes, space: &ReactionSpace) {
        let mut seen = result.outliers.clone();
        for (key, members) in &result.clusters {
            for id in members {
                assert!(seen.insert(*id), "Flux mode {} classified twice", id);
                let active: Motif = efms[id].directions(space).into_iter().collect();
                assert!(key.is_subset(&active));
            }
        }
        assert_eq!(seen, efms.keys().copied().collect::<BTreeSet<_>>());
    }

    #[test]
    fn two_clusters_and_an_outlier() {
        init_logger();
        let space = reaction_space(&["r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8"], &[]);
        let efms = flux_modes(
            &space,
            &[
                &["r1", "r2", "r3", "r4"],
                &["r1", "r2", "r3", "r5"],
                &["r1", "r2", "r3", "r6"],
                &["r5", "r6", "r7", "r8"],
                &["r4", "r6", "r7", "r8"],
                &["r1", "r7"],
            ],
        );
        let result = classifier(3, Some(3)).classify(&space, &efms).unwrap().unwrap();
        let mut expected = Clusters::new();
        expected.insert(motif(&space, &["r1", "r2", "r3"]), BTreeSet::from([1, 2, 3]));
        expected.insert(motif(&space, &["r6", "r7", "r8"]), BTreeSet::from([4, 5]));
        assert_eq!(result.clusters, expected);
        assert_eq!(result.outliers, BTreeSet::from([6]));
        assert_eq!(result.neighbour_threshold, 3);
        assert_partition(&result, &efms, &space);
    }

    #[test]
    fn default_threshold_is_rounded_mean() {
        let space = reaction_space(&["r1", "r2", "r3", "r4"], &[]);
        let efms = flux_modes(&space, &[&["r1", "r2", "r3"], &["r1", "r2", "r4"]]);
        let motifs: Vec<Motif> = efms
            .values()
            .map(|efm| efm.directions(&space).into_iter().collect())
            .collect();
        let matrix = ResemblanceMatrix::new(&motifs);
        assert_eq!(matrix.get(0, 1), 2);
        assert_eq!(matrix.get(1, 0), 2);
        assert_eq!(matrix.get(1, 1), 3);
        // (3 + 2 + 3) / 3 rounds to 3
        assert_eq!(matrix.default_threshold(), 3);

        let result = classifier(2, None).classify(&space, &efms).unwrap().unwrap();
        assert_eq!(result.neighbour_threshold, 3);
        assert!(result.clusters.is_empty());
        assert_eq!(result.outliers, BTreeSet::from([1, 2]));

        let result = classifier(2, Some(2)).classify(&space, &efms).unwrap().unwrap();
        let mut expected = Clusters::new();
        expected.insert(motif(&space, &["r1", "r2"]), BTreeSet::from([1, 2]));
        assert_eq!(result.clusters, expected);
        assert!(result.outliers.is_empty());
    }

    #[test]
    fn short_motifs_abandon_the_seed() {
        let space = reaction_space(&["r1", "r2", "r3", "r4", "r5", "r6"], &[]);
        let efms = flux_modes(
            &space,
            &[&["r1", "r2", "r3"], &["r1", "r2", "r4"], &["r1", "r5", "r6"]],
        );
        let result = classifier(2, Some(1)).classify(&space, &efms).unwrap().unwrap();
        assert!(result.clusters.is_empty());
        assert_eq!(result.outliers, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn overlapping_clusters_merge_and_outliers_join() {
        init_logger();
        let space = reaction_space(&["a", "b", "c", "d", "e", "f", "g", "h"], &[]);
        let efms = flux_modes(
            &space,
            &[
                &["a", "b", "c", "d"],
                &["a", "b", "c", "d", "e"],
                &["a", "b", "c", "e", "f"],
                &["a", "b", "c", "g", "h"],
            ],
        );
        let result = classifier(3, Some(4)).classify(&space, &efms).unwrap().unwrap();
        let mut expected = Clusters::new();
        expected.insert(motif(&space, &["a", "b", "c"]), BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(result.clusters, expected);
        assert!(result.outliers.is_empty());
        assert_partition(&result, &efms, &space);
    }

    #[test]
    fn outliers_narrow_cluster_motifs() {
        let space = reaction_space(&["a", "b", "c", "d", "x", "y", "z"], &[]);
        let efms = flux_modes(
            &space,
            &[&["a", "b", "c", "d"], &["a", "b", "c", "d"], &["a", "b", "c", "x", "y", "z"]],
        );
        let result = classifier(3, Some(4)).classify(&space, &efms).unwrap().unwrap();
        let mut expected = Clusters::new();
        expected.insert(motif(&space, &["a", "b", "c"]), BTreeSet::from([1, 2, 3]));
        assert_eq!(result.clusters, expected);
        assert!(result.outliers.is_empty());
    }

    #[test]
    fn shared_members_are_assigned_once() {
        let space = reaction_space(&["r1", "r2", "r3", "r4", "r5", "r6"], &["r2"]);
        let efms = flux_modes(
            &space,
            &[
                &["r1", "r2", "r3", "r4"],
                &["r1", "r2", "r5", "r6"],
                &["r3", "r4", "r5", "r6"],
                &["r1", "-r2", "r3", "r5"],
                &["r2", "r4", "r6"],
            ],
        );
        for threshold in 1..4 {
            for min_motif_length in 1..4 {
                let result = classifier(min_motif_length, Some(threshold))
                    .classify(&space, &efms)
                    .unwrap()
                    .unwrap();
                assert_partition(&result, &efms, &space);
                for key in result.clusters.keys() {
                    assert!(key.len() >= min_motif_length);
                }
            }
        }
    }

    #[test]
    fn empty_input() {
        let space = reaction_space(&["r1"], &[]);
        assert_eq!(
            classifier(1, None).classify(&space, &FluxModes::new()),
            Ok(None)
        );
    }

    #[test]
    fn serialized_clusters_are_a_list() {
        let space = reaction_space(&["r1", "r2", "r3", "r4"], &[]);
        let efms = flux_modes(&space, &[&["r1", "r2", "r3"], &["r1", "r2", "r4"]]);
        let result = classifier(2, Some(2)).classify(&space, &efms).unwrap().unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["clusters"].as_array().unwrap().len(), 1);
        assert_eq!(value["clusters"][0][1], serde_json::json!([1, 2]));
        assert_eq!(value["outliers"], serde_json::json!([]));
        let back: AcomClassification = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn repeatable_and_parallel() {
        let space = reaction_space(
            &["r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9"],
            &["r2"],
        );
        let efms = flux_modes(
            &space,
            &[
                &["r1", "r2", "r3", "r4"],
                &["r1", "-r2", "r3", "r5"],
                &["r1", "r2", "r3", "r6"],
                &["r5", "r6", "r7", "r8"],
                &["r4", "r6", "r7", "r8", "r9"],
                &["r1", "r7", "r9"],
                &["r1", "r2", "r4", "r9"],
            ],
        );
        let sequential = classifier(2, None).classify(&space, &efms).unwrap().unwrap();
        assert_eq!(
            Some(sequential.clone()),
            classifier(2, None).classify(&space, &efms).unwrap()
        );
        let parallel = AcomClassifier::new(
            AcomConfigBuilder::default()
                .min_motif_length(2)
                .processes(4)
                .build()
                .unwrap(),
        )
        .classify(&space, &efms)
        .unwrap()
        .unwrap();
        assert_eq!(sequential, parallel);
        assert_partition(&parallel, &efms, &space);
    }
}
