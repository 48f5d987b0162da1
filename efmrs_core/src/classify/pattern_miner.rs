//! Level-wise discovery of the reaction patterns shared by groups of elementary flux modes
//!
//! Level 2 intersects every pair of flux modes. Each following level intersects the patterns
//! found at the previous level with every flux mode not yet supporting them, until no new
//! pattern appears. A pattern which is narrowed further by a wider group of flux modes is
//! dropped in favour of the narrower pattern, so the reported patterns are those shared by
//! the largest groups.
use std::collections::{BTreeSet, HashMap, HashSet};

use derive_builder::Builder;
use log::{debug, info, trace};
use rayon::prelude::*;

use crate::classify::{
    run_in_pool, validate_flux_modes, with_support, ClassificationError, PatternSet,
};
use crate::configuration::configured;
use crate::flux_mode::flux_mode::FluxMode;
use crate::flux_mode::{FluxModeId, FluxModes};

/// Options of the [`PatternMiner`]
#[derive(Builder, Clone, Debug)]
pub struct MinerConfig {
    /// Minimum number of reaction directions in a pattern, the only pruning of the search so it
    /// should scale with the typical flux mode length
    pub min_pattern_len: usize,
    /// Keep only this many patterns, those with the widest support
    #[builder(default, setter(strip_option))]
    pub max_pattern_num: Option<usize>,
    /// Minimum number of flux modes supporting a reported pattern
    #[builder(default = "configured(|c| c.min_efm_num)")]
    pub min_efm_num: usize,
    /// Maximum number of distinct patterns held during the search
    #[builder(default = "configured(|c| c.max_registry_size)")]
    pub max_registry_size: usize,
    /// Worker threads used for the pairwise pass
    #[builder(default = "configured(|c| c.processes)")]
    pub processes: usize,
}

/// Patterns found so far, with the flux modes known to support them
struct PatternRegistry {
    support: HashMap<FluxMode, BTreeSet<FluxModeId>>,
    /// Patterns narrowed by a wider group of flux modes
    removed: HashSet<FluxMode>,
    limit: usize,
}

impl PatternRegistry {
    fn new(limit: usize) -> Self {
        PatternRegistry {
            support: HashMap::new(),
            removed: HashSet::new(),
            limit,
        }
    }

    /// Merge `members` into the support of `pattern`, returning whether the pattern is new
    fn register(
        &mut self,
        pattern: FluxMode,
        members: BTreeSet<FluxModeId>,
    ) -> Result<bool, ClassificationError> {
        if let Some(support) = self.support.get_mut(&pattern) {
            support.extend(members);
            return Ok(false);
        }
        if self.support.len() >= self.limit {
            return Err(ClassificationError::Unbounded {
                what: "patterns",
                limit: self.limit,
            });
        }
        self.support.insert(pattern, members);
        Ok(true)
    }
}

type PairPatterns = HashMap<FluxMode, BTreeSet<FluxModeId>>;

/// Finds the maximal reaction patterns shared by two or more flux modes
pub struct PatternMiner {
    config: MinerConfig,
}

impl PatternMiner {
    pub fn new(config: MinerConfig) -> Self {
        PatternMiner { config }
    }

    /// Create a miner with default options besides the minimum pattern length
    pub fn with_min_pattern_len(min_pattern_len: usize) -> Self {
        PatternMiner::new(MinerConfig {
            min_pattern_len,
            max_pattern_num: None,
            min_efm_num: configured(|c| c.min_efm_num),
            max_registry_size: configured(|c| c.max_registry_size),
            processes: configured(|c| c.processes),
        })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Find the patterns shared by the given flux modes
    ///
    /// Patterns are numbered from 1, widest support first, and each is reported with every
    /// flux mode containing it.
    ///
    /// # Examples
    /// ```rust
    /// use std::collections::BTreeSet;
    /// use efmrs_core::classify::pattern_miner::PatternMiner;
    /// use efmrs_core::flux_mode::flux_mode::FluxMode;
    /// use efmrs_core::flux_mode::reaction_space::ReactionSpace;
    /// use efmrs_core::flux_mode::FluxModes;
    /// use indexmap::IndexMap;
    /// let space = ReactionSpace::new(
    ///     ["r1", "r2", "r3", "r4"].map(String::from),
    ///     Vec::<String>::new(),
    /// ).unwrap();
    /// let mut efms = FluxModes::new();
    /// efms.insert(1, FluxMode::encode(&space, &IndexMap::from([
    ///     ("r1".to_string(), 1.0), ("r2".to_string(), 1.0), ("r3".to_string(), 1.0),
    /// ])).unwrap());
    /// efms.insert(2, FluxMode::encode(&space, &IndexMap::from([
    ///     ("r1".to_string(), 1.0), ("r2".to_string(), 1.0), ("r4".to_string(), 1.0),
    /// ])).unwrap());
    /// let patterns = PatternMiner::with_min_pattern_len(2).classify(&efms).unwrap();
    /// assert_eq!(patterns.len(), 1);
    /// assert_eq!(patterns.support[&1], BTreeSet::from([1, 2]));
    /// ```
    pub fn classify(&self, flux_modes: &FluxModes) -> Result<PatternSet, ClassificationError> {
        validate_flux_modes(flux_modes, None)?;
        if flux_modes.len() < 2 {
            debug!(
                "Pattern mining skipped, {} flux modes given.",
                flux_modes.len()
            );
            return Ok(PatternSet::default());
        }
        run_in_pool(self.config.processes, || self.mine(flux_modes))?
    }

    fn mine(&self, flux_modes: &FluxModes) -> Result<PatternSet, ClassificationError> {
        let mut registry = PatternRegistry::new(self.config.max_registry_size);

        let pairs = self.pair_patterns(flux_modes)?;
        let mut frontier: Vec<FluxMode> = Vec::with_capacity(pairs.len());
        for (pattern, members) in pairs {
            registry.register(pattern.clone(), members)?;
            frontier.push(pattern);
        }
        frontier.sort_by(|a, b| a.bits().cmp(b.bits()));
        debug!("[level:2] {} patterns found.", frontier.len());

        let mut level = 2;
        while !frontier.is_empty() {
            level += 1;
            frontier = self.extend_level(&frontier, flux_modes, &mut registry)?;
            debug!(
                "[level:{}] {} new patterns ({} registered, {} narrowed).",
                level,
                frontier.len(),
                registry.support.len(),
                registry.removed.len()
            );
        }

        let retained: Vec<FluxMode> = registry
            .support
            .into_keys()
            .filter(|pattern| !registry.removed.contains(pattern))
            .collect();
        let mut ranked: Vec<(FluxMode, BTreeSet<FluxModeId>)> = with_support(retained, flux_modes)
            .into_iter()
            .filter(|(_, support)| support.len() >= self.config.min_efm_num)
            .collect();
        ranked.sort_by(|(a, a_support), (b, b_support)| {
            b_support
                .len()
                .cmp(&a_support.len())
                .then_with(|| b.length().cmp(&a.length()))
                .then_with(|| a.bits().cmp(b.bits()))
        });
        if let Some(max_pattern_num) = self.config.max_pattern_num {
            ranked.truncate(max_pattern_num);
        }
        info!(
            "Pattern mining finished after {} levels with {} patterns.",
            level,
            ranked.len()
        );
        Ok(PatternSet::from_ranked(ranked))
    }

    /// Intersect every pair of flux modes, merging identical patterns
    fn pair_patterns(&self, flux_modes: &FluxModes) -> Result<PairPatterns, ClassificationError> {
        let entries: Vec<(FluxModeId, &FluxMode)> =
            flux_modes.iter().map(|(&id, efm)| (id, efm)).collect();
        let min_pattern_len = self.config.min_pattern_len;
        let limit = self.config.max_registry_size;
        let over_limit = || ClassificationError::Unbounded {
            what: "patterns",
            limit,
        };

        (0..entries.len())
            .into_par_iter()
            .try_fold(PairPatterns::new, |mut found, first| {
                let (first_id, first_efm) = entries[first];
                for &(second_id, second_efm) in &entries[first + 1..] {
                    let pattern = first_efm.intersection(second_efm);
                    if pattern.length() < min_pattern_len {
                        continue;
                    }
                    let support = found.entry(pattern).or_default();
                    support.insert(first_id);
                    support.insert(second_id);
                    if found.len() > limit {
                        return Err(over_limit());
                    }
                }
                Ok(found)
            })
            .try_reduce(PairPatterns::new, |mut left, right| {
                for (pattern, support) in right {
                    left.entry(pattern).or_default().extend(support);
                }
                if left.len() > limit {
                    return Err(over_limit());
                }
                Ok(left)
            })
    }

    /// Intersect each frontier pattern with every flux mode outside its support, returning the
    /// patterns seen for the first time
    fn extend_level(
        &self,
        frontier: &[FluxMode],
        flux_modes: &FluxModes,
        registry: &mut PatternRegistry,
    ) -> Result<Vec<FluxMode>, ClassificationError> {
        let mut next: Vec<FluxMode> = Vec::new();
        for parent in frontier {
            let support = match registry.support.get(parent) {
                Some(support) => support.clone(),
                None => continue,
            };
            for (&id, efm) in flux_modes {
                if support.contains(&id) {
                    continue;
                }
                let candidate = parent.intersection(efm);
                if candidate.length() < self.config.min_pattern_len {
                    continue;
                }
                let mut members = support.clone();
                members.insert(id);
                let is_new = registry.register(candidate.clone(), members)?;
                if candidate != *parent {
                    trace!(
                        "Pattern of length {} narrowed to {} by flux mode {}.",
                        parent.length(),
                        candidate.length(),
                        id
                    );
                    registry.removed.insert(parent.clone());
                    if is_new {
                        next.push(candidate);
                    }
                }
            }
        }
        next.sort_by(|a, b| a.bits().cmp(b.bits()));
        Ok(next)
    }
}
