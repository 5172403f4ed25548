//! Schedules: ordered transformation sequences for one program.

use crate::oracle::LegalityOracle;
use crate::program::Program;
use crate::transform::TransformationAction;
use crate::utils::errors::SchedResult;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// An ordered list of actions applied to one program, with the oracle's
/// verdict cached until the next change.
///
/// `clone()` copies the action list and the cached verdict but shares the
/// program, so a search can extend a trial branch without touching the
/// best known schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    program: Arc<Program>,
    actions: Vec<TransformationAction>,
    legality: Option<bool>,
}

impl Schedule {
    /// Empty schedule for `program`.
    pub fn new(program: Arc<Program>) -> Self {
        Self {
            program,
            actions: Vec::new(),
            legality: None,
        }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn actions(&self) -> &[TransformationAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Append an action and forget the cached verdict.
    pub fn add_optimization(&mut self, action: TransformationAction) {
        self.actions.push(action);
        self.legality = None;
    }

    pub fn add_optimizations(&mut self, actions: impl IntoIterator<Item = TransformationAction>) {
        self.actions.extend(actions);
        self.legality = None;
    }

    /// Cached verdict, if the oracle has been asked since the last change.
    pub fn cached_legality(&self) -> Option<bool> {
        self.legality
    }

    /// Ask the oracle unless a verdict is cached. Errors are not cached.
    pub fn is_legal(&mut self, oracle: &dyn LegalityOracle) -> SchedResult<bool> {
        if let Some(legal) = self.legality {
            return Ok(legal);
        }
        let legal = oracle.is_legal(&self.program, &self.actions)?;
        debug!("{} schedule {} -> {}", oracle.name(), self, if legal { "legal" } else { "illegal" });
        self.legality = Some(legal);
        Ok(legal)
    }

    /// Short forms joined by `|`, e.g. `P(L0)|S(L1,L2,1,1)`.
    pub fn short_form(&self) -> SchedResult<String> {
        let parts = self
            .actions
            .iter()
            .map(|a| a.short_form(&self.program.tree))
            .collect::<SchedResult<Vec<_>>>()?;
        Ok(parts.join("|"))
    }

    /// Compiler calls grouped by computation.
    ///
    /// Computations come in absolute order, followed by targets the tree
    /// does not know in first-use order. The calls of one computation keep
    /// the order in which their actions were added.
    pub fn compiler_calls(&self) -> SchedResult<String> {
        let tree = &self.program.tree;
        let mut order: Vec<&str> = tree.computations().iter().map(String::as_str).collect();
        for comp in self.actions.iter().flat_map(|a| a.comps()) {
            if tree.computation_rank(comp).is_none() && !order.contains(&comp.as_str()) {
                order.push(comp);
            }
        }

        let mut calls = String::new();
        for comp in order {
            for action in self.actions.iter().filter(|a| a.comps().iter().any(|c| c == comp)) {
                calls.push_str(&action.compiler_call(tree, comp)?);
            }
        }
        Ok(calls)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.short_form() {
            Ok(s) if s.is_empty() => write!(f, "<empty>"),
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "<{} actions>", self.actions.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::iterator_tree::tests::sample_annotation;
    use crate::tree::IteratorId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Legal while the schedule is shorter than `limit`; counts calls.
    struct LengthOracle {
        limit: usize,
        calls: AtomicUsize,
    }

    impl LegalityOracle for LengthOracle {
        fn is_legal(&self, _: &Program, schedule: &[TransformationAction]) -> SchedResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(schedule.len() < self.limit)
        }

        fn solve_skewing(
            &self,
            _: &Program,
            _: &[TransformationAction],
            _: (usize, usize),
            _: &[String],
        ) -> SchedResult<Option<(i64, i64)>> {
            Ok(None)
        }
    }

    fn program() -> Arc<Program> {
        Arc::new(Program::new("sample", sample_annotation()).unwrap())
    }

    fn par(node: &str, comp: &str) -> TransformationAction {
        TransformationAction::parallelization(IteratorId::new(node), vec![comp.to_string()]).unwrap()
    }

    #[test]
    fn test_verdict_is_cached_until_mutation() {
        let oracle = LengthOracle {
            limit: 2,
            calls: AtomicUsize::new(0),
        };
        let mut schedule = Schedule::new(program());
        schedule.add_optimization(par("i", "comp01"));
        assert!(schedule.is_legal(&oracle).unwrap());
        assert!(schedule.is_legal(&oracle).unwrap());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);

        schedule.add_optimization(par("l", "comp03"));
        assert_eq!(schedule.cached_legality(), None);
        assert!(!schedule.is_legal(&oracle).unwrap());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clone_is_independent_and_shares_program() {
        let mut best = Schedule::new(program());
        best.add_optimization(par("i", "comp01"));
        let mut trial = best.clone();
        trial.add_optimization(par("l", "comp03"));

        assert_eq!(best.len(), 1);
        assert_eq!(trial.len(), 2);
        assert!(Arc::ptr_eq(best.program(), trial.program()));
    }

    #[test]
    fn test_rendering() {
        let mut schedule = Schedule::new(program());
        assert_eq!(schedule.to_string(), "<empty>");
        schedule.add_optimization(par("l", "comp03"));
        schedule.add_optimization(par("i", "comp01"));
        assert_eq!(schedule.short_form().unwrap(), "P(L3)|P(L1)");
        assert_eq!(
            schedule.compiler_calls().unwrap(),
            "\n\tcomp01.tag_parallel_level(1);\n\tcomp03.tag_parallel_level(3);"
        );
    }

    #[test]
    fn test_compiler_calls_keep_order_within_a_computation() {
        let mut schedule = Schedule::new(program());
        schedule.add_optimization(
            TransformationAction::interchange(
                IteratorId::new("j"),
                IteratorId::new("k"),
                vec!["comp03".to_string(), "comp04".to_string()],
            )
            .unwrap(),
        );
        schedule.add_optimization(par("l", "comp03"));
        schedule.add_optimization(par("i", "comp01"));
        schedule.add_optimization(par("m", "external"));

        assert_eq!(
            schedule.compiler_calls().unwrap(),
            concat!(
                "\n\tcomp01.tag_parallel_level(1);",
                "\n\tcomp03.interchange(1, 2);",
                "\n\tcomp03.tag_parallel_level(3);",
                "\n\tcomp04.interchange(1, 2);",
                "\n\texternal.tag_parallel_level(3);",
            )
        );
    }
}
