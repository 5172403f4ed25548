//! The external legality oracle.
//!
//! The oracle is the only authority on whether a sequence of
//! transformations is legal for a program, and on which factors make a
//! skew legal. Calls are blocking and may be slow. A failed call is an
//! error, never an implicit "illegal".

pub mod command;

pub use command::{CommandOracle, CommandOracleConfig};

use crate::program::Program;
use crate::transform::TransformationAction;
use crate::utils::errors::SchedResult;

/// Black-box legality and skewing service.
pub trait LegalityOracle: Send + Sync {
    /// Whether applying `schedule` in order to `program` preserves its semantics.
    fn is_legal(&self, program: &Program, schedule: &[TransformationAction]) -> SchedResult<bool>;

    /// Skewing factors for the loops at `loop_levels`, applied after
    /// `schedule`, or `None` when no legal skew exists.
    fn solve_skewing(
        &self,
        program: &Program,
        schedule: &[TransformationAction],
        loop_levels: (usize, usize),
        computations: &[String],
    ) -> SchedResult<Option<(i64, i64)>>;

    fn name(&self) -> &str {
        "oracle"
    }
}
