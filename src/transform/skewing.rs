//! Loop skewing.
//!
//! Skewing rewrites `j' = j + f * i` on two successive loops, typically to
//! expose wavefront parallelism:
//!
//! ```text
//! for i = 0 to N:                 for i = 0 to N:
//!   for j = 0 to M:       =>        for j' = i to M + i:
//!     A[i][j] = A[i-1][j]              A[i][j'-i] = A[i-1][j'-i]
//!              + A[i][j-1]                        + A[i][j'-i-1]
//! ```
//!
//! Candidate pairs come from the tree. The factors depend on the
//! dependences of the program and on what the schedule already did, so
//! they are delegated to the oracle's solver.

use crate::oracle::LegalityOracle;
use crate::program::Program;
use crate::transform::{ActionKind, TransformationAction};
use crate::tree::IteratorId;
use crate::utils::errors::{ScheduleError, SchedResult};
use log::debug;

/// Ask the oracle for skewing factors. No factors is a hard failure.
pub fn resolve_factors(
    oracle: &dyn LegalityOracle,
    program: &Program,
    loop_levels: (usize, usize),
    schedule_so_far: &[TransformationAction],
    target_computations: &[String],
) -> SchedResult<(i64, i64)> {
    let factors = oracle.solve_skewing(program, schedule_so_far, loop_levels, target_computations)?;
    match factors {
        Some(factors) => {
            debug!(
                "skewing L{},L{} solved with factors {:?}",
                loop_levels.0, loop_levels.1, factors
            );
            Ok(factors)
        }
        None => Err(ScheduleError::SolverFailure {
            outer: loop_levels.0,
            inner: loop_levels.1,
        }),
    }
}

impl TransformationAction {
    /// Build a skewing of `outer`/`inner` with factors from the solver.
    pub fn solved_skewing(
        oracle: &dyn LegalityOracle,
        program: &Program,
        schedule_so_far: &[TransformationAction],
        outer: &IteratorId,
        inner: &IteratorId,
    ) -> SchedResult<Self> {
        let tree = &program.tree;
        let levels = tree.get_iterator_levels(&[outer.clone(), inner.clone()])?;
        let comps = tree.get_iterator_subtree_computations(outer)?;
        if comps.is_empty() {
            return Err(ScheduleError::EmptyTargetSet(ActionKind::Skewing.name()));
        }
        let factors = resolve_factors(oracle, program, (levels[0], levels[1]), schedule_so_far, &comps)?;
        Self::skewing(outer.clone(), inner.clone(), factors, comps)
    }
}
