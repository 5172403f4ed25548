//! Search strategies over schedules.
//!
//! A strategy is a policy over four steps: generate candidates from the
//! tree, extend a trial copy of the best schedule, ask the oracle, accept
//! or reject. Strategies only depend on the tree, action and schedule
//! layers, so they can be swapped freely.
//!
//! # Example
//!
//! ```ignore
//! use polysched::search::{SearchConfig, SearchStrategy, SequentialParallelization};
//!
//! let mut search = SequentialParallelization::new(SearchConfig::default());
//! let outcome = search.search(program, &oracle)?;
//! match outcome.schedule {
//!     Some(schedule) => println!("{}", schedule),
//!     None => println!("no schedule found"),
//! }
//! ```

mod config;
mod sequential;

pub use config::SearchConfig;
pub use sequential::SequentialParallelization;

use crate::oracle::LegalityOracle;
use crate::program::Program;
use crate::schedule::Schedule;
use crate::utils::errors::SchedResult;
use std::sync::Arc;
use std::time::Duration;

/// Trait for search strategies
pub trait SearchStrategy {
    /// Search for a legal schedule of `program`.
    ///
    /// Oracle failures on individual candidates are absorbed as
    /// rejections. Structural errors abort the search.
    fn search(&mut self, program: Arc<Program>, oracle: &dyn LegalityOracle) -> SchedResult<SearchOutcome>;

    /// Get name of the strategy
    fn name(&self) -> &str;
}

/// Result of a search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Accepted schedule, or `None` when no action was ever accepted.
    /// An empty schedule is never returned as a success.
    pub schedule: Option<Schedule>,
    /// Statistics from the search
    pub statistics: SearchStatistics,
}

impl SearchOutcome {
    pub fn found(schedule: Schedule, statistics: SearchStatistics) -> Self {
        Self {
            schedule: Some(schedule),
            statistics,
        }
    }

    pub fn not_found(statistics: SearchStatistics) -> Self {
        Self {
            schedule: None,
            statistics,
        }
    }

    pub fn is_found(&self) -> bool {
        self.schedule.is_some()
    }
}

/// Counters collected while searching
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStatistics {
    /// Roots processed
    pub roots_visited: usize,
    /// Candidates turned into a trial schedule
    pub candidates_tried: usize,
    /// Candidates dropped before reaching the oracle
    pub candidates_skipped: usize,
    /// Legality queries sent
    pub oracle_calls: usize,
    /// Trials committed as the new best schedule
    pub accepted: usize,
    /// Trials the oracle judged illegal
    pub rejected: usize,
    /// Trials dropped because the oracle failed
    pub oracle_failures: usize,
    /// Wall-clock time of the search
    pub elapsed: Duration,
}

impl std::fmt::Display for SearchStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} roots, {} candidates tried ({} skipped), {} oracle calls, {} accepted, {} rejected, {} oracle failures in {:.3}s",
            self.roots_visited,
            self.candidates_tried,
            self.candidates_skipped,
            self.oracle_calls,
            self.accepted,
            self.rejected,
            self.oracle_failures,
            self.elapsed.as_secs_f64()
        )
    }
}
