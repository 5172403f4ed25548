//! Structural candidate generation, one case arm per transformation kind.
//!
//! Candidates only carry the loops a transformation would touch. Factors
//! are chosen later (by the caller or, for skewing, by the oracle).

use crate::transform::ActionKind;
use crate::tree::{IteratorId, IteratorTree, PerRoot};
use crate::utils::errors::SchedResult;

/// Loops of one candidate, outermost first.
pub type Candidate = Vec<IteratorId>;

/// Candidates grouped by root, in root order.
pub type Candidates = PerRoot<Vec<Candidate>>;

impl ActionKind {
    /// Structurally possible parameter sets for this kind on `tree`.
    pub fn candidates(&self, tree: &IteratorTree) -> SchedResult<Candidates> {
        match self {
            // Any loop of any section can be marked.
            ActionKind::Parallelization | ActionKind::Reversal => {
                let sections = tree.get_candidate_sections()?;
                Ok(sections.map(|_, sections| {
                    sections
                        .into_iter()
                        .flatten()
                        .map(|node| vec![node])
                        .collect()
                }))
            }
            // Two successive levels inside one section.
            ActionKind::Skewing | ActionKind::Tiling2D => {
                let sections = tree.get_candidate_sections()?;
                Ok(sections.map(|_, sections| {
                    sections
                        .iter()
                        .filter(|s| s.len() > 1)
                        .flat_map(|s| s.windows(2).map(|pair| pair.to_vec()))
                        .collect()
                }))
            }
            ActionKind::Interchange => {
                let mut candidates = PerRoot::new();
                for root in tree.roots() {
                    let order = tree.iter_preorder(root)?;
                    let mut pairs = Vec::new();
                    for (index, first) in order.iter().enumerate() {
                        for second in &order[index + 1..] {
                            if tree.are_siblings(first, second)? || tree.is_ancestor(first, second)? {
                                pairs.push(vec![first.clone(), second.clone()]);
                            }
                        }
                    }
                    candidates.push(root.clone(), pairs);
                }
                Ok(candidates)
            }
            // Innermost loops that carry work.
            ActionKind::Unrolling => {
                let mut candidates = PerRoot::new();
                for root in tree.roots() {
                    let mut innermost = Vec::new();
                    for id in tree.iter_preorder(root)? {
                        let node = tree.get_iterator_node(&id)?;
                        if node.is_leaf() && !node.computations().is_empty() {
                            innermost.push(vec![id]);
                        }
                    }
                    candidates.push(root.clone(), innermost);
                }
                Ok(candidates)
            }
        }
    }
}
