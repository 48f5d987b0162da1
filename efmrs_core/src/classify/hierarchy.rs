//! Module providing the hierarchy of patterns ordered by inclusion
//!
//! A pattern is the parent of another when its reaction directions are a strict subset of the
//! other's, with no pattern in between.
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{PatternId, PatternSet};

/// Inclusion hierarchy of the patterns of a [`PatternSet`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternHierarchy {
    /// More specific patterns directly below each pattern
    children: BTreeMap<PatternId, BTreeSet<PatternId>>,
    /// More general patterns directly above each pattern
    parents: BTreeMap<PatternId, BTreeSet<PatternId>>,
}

impl PatternHierarchy {
    pub fn new(pattern_set: &PatternSet) -> Self {
        let ids: Vec<PatternId> = pattern_set.patterns.keys().copied().collect();
        let strictly_below = |general: PatternId, specific: PatternId| {
            let general = &pattern_set.patterns[&general];
            let specific = &pattern_set.patterns[&specific];
            specific.contains(general) && general.length() < specific.length()
        };

        let mut hierarchy = PatternHierarchy::default();
        for &id in &ids {
            hierarchy.children.insert(id, BTreeSet::new());
            hierarchy.parents.insert(id, BTreeSet::new());
        }
        for &general in &ids {
            for &specific in &ids {
                if !strictly_below(general, specific) {
                    continue;
                }
                let covered = ids.iter().any(|&between| {
                    strictly_below(general, between) && strictly_below(between, specific)
                });
                if !covered {
                    hierarchy
                        .children
                        .entry(general)
                        .or_default()
                        .insert(specific);
                    hierarchy
                        .parents
                        .entry(specific)
                        .or_default()
                        .insert(general);
                }
            }
        }
        hierarchy
    }

    /// Patterns with no more general pattern above them
    pub fn roots(&self) -> Vec<PatternId> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.is_empty())
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn children(&self, id: PatternId) -> Option<&BTreeSet<PatternId>> {
        self.children.get(&id)
    }

    pub fn parents(&self, id: PatternId) -> Option<&BTreeSet<PatternId>> {
        self.parents.get(&id)
    }

    /// Every pattern below `id`, depth first
    pub fn descendants(&self, id: PatternId) -> Vec<PatternId> {
        let mut visited = BTreeSet::from([id]);
        self.walk(self.children_of(id), &mut visited)
    }

    /// Every pattern, depth first from the roots in id order, each visited once
    pub fn depth_first(&self) -> Vec<PatternId> {
        let mut visited = BTreeSet::new();
        self.walk(self.roots(), &mut visited)
    }

    fn children_of(&self, id: PatternId) -> Vec<PatternId> {
        self.children
            .get(&id)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Depth first walk from `starts` with an explicit stack
    fn walk(&self, starts: Vec<PatternId>, visited: &mut BTreeSet<PatternId>) -> Vec<PatternId> {
        let mut order = Vec::new();
        let mut stack: Vec<PatternId> = starts.into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.children_of(id).into_iter().rev());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{flux_modes, reaction_space};

    fn nested_patterns() -> PatternSet {
        let space = reaction_space(&["r1", "r2", "r3", "r4", "r5"], &[]);
        let efms = flux_modes(
            &space,
            &[
                &["r1"],
                &["r1", "r2"],
                &["r1", "r3"],
                &["r1", "r2", "r3"],
                &["r4", "r5"],
            ],
        );
        PatternSet::from_ranked(
            efms.iter()
                .map(|(&id, efm)| (efm.to_pattern(), BTreeSet::from([id])))
                .collect(),
        )
    }

    #[test]
    fn direct_links_only() {
        let hierarchy = PatternHierarchy::new(&nested_patterns());
        assert_eq!(hierarchy.roots(), vec![1, 5]);
        assert_eq!(hierarchy.children(1), Some(&BTreeSet::from([2, 3])));
        // 1 is below 4 only through 2 and 3
        assert_eq!(hierarchy.parents(4), Some(&BTreeSet::from([2, 3])));
        assert_eq!(hierarchy.children(5), Some(&BTreeSet::new()));
        assert_eq!(hierarchy.children(9), None);
    }

    #[test]
    fn traversals_visit_each_pattern_once() {
        let hierarchy = PatternHierarchy::new(&nested_patterns());
        assert_eq!(hierarchy.depth_first(), vec![1, 2, 4, 3, 5]);
        assert_eq!(hierarchy.descendants(1), vec![2, 4, 3]);
        assert_eq!(hierarchy.descendants(3), vec![4]);
        assert!(hierarchy.descendants(4).is_empty());
    }

    #[test]
    fn empty_hierarchy() {
        let hierarchy = PatternHierarchy::new(&PatternSet::default());
        assert!(hierarchy.roots().is_empty());
        assert!(hierarchy.depth_first().is_empty());
    }
}
