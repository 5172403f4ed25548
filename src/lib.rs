//! # polysched - Schedule search over loop nests
//!
//! Core of a search-based loop scheduler for polyhedral programs:
//! - Iterator trees built from per-loop annotations
//! - Candidate sections and candidate generation per transformation kind
//! - Atomic loop interchange on the tree
//! - Schedules of transformation actions checked by an external oracle
//! - Pluggable search strategies (sequential parallelization built in)
//!
//! ## Architecture
//!
//! ```text
//! Annotations → IteratorTree → Candidates → TransformationAction → Schedule ⇄ Oracle
//!                                                                     ↑
//!                                                           SearchStrategy
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use polysched::prelude::*;
//! use std::sync::Arc;
//!
//! let program = Arc::new(Program::from_path("blur.json")?);
//! let oracle = CommandOracle::new(CommandOracleConfig::new("legality-oracle"));
//! let mut search = SequentialParallelization::new(SearchConfig::default());
//!
//! match search.search(program, &oracle)?.schedule {
//!     Some(schedule) => println!("{}", schedule.compiler_calls()?),
//!     None => println!("no schedule found"),
//! }
//! ```

#![warn(clippy::all)]

pub mod tree;
pub mod transform;
pub mod oracle;
pub mod schedule;
pub mod search;
pub mod program;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::oracle::{CommandOracle, CommandOracleConfig, LegalityOracle};
    pub use crate::program::Program;
    pub use crate::schedule::Schedule;
    pub use crate::search::{
        SearchConfig, SearchOutcome, SearchStatistics, SearchStrategy, SequentialParallelization,
    };
    pub use crate::transform::{ActionKind, ActionParam, Candidates, TransformationAction};
    pub use crate::tree::{
        IteratorAnnotation, IteratorId, IteratorNode, IteratorTree, LoopBound, ProgramAnnotation,
        SharedTree,
    };
    pub use crate::utils::errors::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
