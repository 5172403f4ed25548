//! Sequential parallelization: for every root, mark the first loop the
//! oracle accepts as parallel.

use super::{SearchConfig, SearchOutcome, SearchStatistics, SearchStrategy};
use crate::oracle::LegalityOracle;
use crate::program::Program;
use crate::schedule::Schedule;
use crate::transform::{ActionKind, TransformationAction};
use crate::utils::errors::SchedResult;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Greedy first-legal-wins parallelization, one root at a time.
///
/// Candidates of a root are tried outermost first. Each trial is a fresh
/// copy of the best schedule so far; the first legal trial replaces it and
/// the search moves on to the next root.
pub struct SequentialParallelization {
    config: SearchConfig,
}

impl SequentialParallelization {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

impl Default for SequentialParallelization {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl SearchStrategy for SequentialParallelization {
    fn search(&mut self, program: Arc<Program>, oracle: &dyn LegalityOracle) -> SchedResult<SearchOutcome> {
        let start = Instant::now();
        let mut stats = SearchStatistics::default();
        let tree = &program.tree;
        let candidates = ActionKind::Parallelization.candidates(tree)?;
        let mut best = Schedule::new(Arc::clone(&program));
        let limit = self.config.max_candidates_per_root.unwrap_or(usize::MAX);

        'roots: for root in tree.roots() {
            stats.roots_visited += 1;
            let Some(root_candidates) = candidates.get(root) else {
                continue;
            };

            for (index, candidate) in root_candidates.iter().take(limit).enumerate() {
                if !self.config.oracle_budget_left(stats.oracle_calls) {
                    info!("oracle budget of {} calls exhausted", stats.oracle_calls);
                    break 'roots;
                }

                let mut actions = Vec::with_capacity(candidate.len());
                for node in candidate {
                    let comps = tree.get_iterator_subtree_computations(node)?;
                    if !comps.is_empty() {
                        actions.push(TransformationAction::parallelization(node.clone(), comps)?);
                    }
                }
                if actions.is_empty() {
                    debug!("root {}: candidate {} has no computations below it", root, index);
                    stats.candidates_skipped += 1;
                    continue;
                }

                let mut trial = best.clone();
                trial.add_optimizations(actions);
                stats.candidates_tried += 1;
                stats.oracle_calls += 1;

                match trial.is_legal(oracle) {
                    Ok(true) => {
                        info!("root {}: accepted candidate {} -> {}", root, index, trial);
                        best = trial;
                        stats.accepted += 1;
                        break;
                    }
                    Ok(false) => {
                        debug!("root {}: candidate {} rejected", root, index);
                        stats.rejected += 1;
                    }
                    Err(e) if e.is_oracle_failure() => {
                        warn!("root {}: candidate {} dropped: {}", root, index, e);
                        stats.oracle_failures += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        stats.elapsed = start.elapsed();
        info!("{} search on {}: {}", self.name(), program.name, stats);

        if best.is_empty() {
            Ok(SearchOutcome::not_found(stats))
        } else {
            Ok(SearchOutcome::found(best, stats))
        }
    }

    fn name(&self) -> &str {
        "sequential-parallelization"
    }
}
