//! Loop transformations that make up a schedule.
//!
//! A [`TransformationAction`] is one optimization step: a kind, its
//! parameters and the computations it targets. The kinds are a closed sum
//! type; candidate generation and rendering are case arms on
//! [`ActionKind`] in the submodules.

pub mod candidates;
pub mod skewing;
pub mod render;

pub use candidates::{Candidate, Candidates};

use crate::tree::{IteratorId, IteratorTree};
use crate::utils::errors::{ScheduleError, SchedResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transformation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Mark one loop parallel
    Parallelization,
    /// Skew two nested loops by two factors
    Skewing,
    /// Swap two loops
    Interchange,
    /// Reverse the iteration order of one loop
    Reversal,
    /// Unroll one loop by a factor
    Unrolling,
    /// Tile two nested loops
    Tiling2D,
}

/// What a parameter position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    Loop,
    Factor,
}

impl ParamShape {
    fn describe(self) -> &'static str {
        match self {
            ParamShape::Loop => "loop",
            ParamShape::Factor => "factor",
        }
    }
}

use ParamShape::{Factor, Loop};

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Parallelization,
        ActionKind::Skewing,
        ActionKind::Interchange,
        ActionKind::Reversal,
        ActionKind::Unrolling,
        ActionKind::Tiling2D,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Parallelization => "parallelization",
            ActionKind::Skewing => "skewing",
            ActionKind::Interchange => "interchange",
            ActionKind::Reversal => "reversal",
            ActionKind::Unrolling => "unrolling",
            ActionKind::Tiling2D => "tiling2d",
        }
    }

    /// Parameter layout, position by position.
    pub fn shape(&self) -> &'static [ParamShape] {
        match self {
            ActionKind::Parallelization | ActionKind::Reversal => &[Loop],
            ActionKind::Interchange => &[Loop, Loop],
            ActionKind::Unrolling => &[Loop, Factor],
            ActionKind::Skewing | ActionKind::Tiling2D => &[Loop, Loop, Factor, Factor],
        }
    }

    pub fn arity(&self) -> usize {
        self.shape().len()
    }

    /// Number of loop parameters, i.e. the length of a candidate.
    pub fn loop_count(&self) -> usize {
        self.shape().iter().filter(|s| **s == Loop).count()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parallelization" | "parallel" | "p" => Ok(ActionKind::Parallelization),
            "skewing" | "skew" | "s" => Ok(ActionKind::Skewing),
            "interchange" | "i" => Ok(ActionKind::Interchange),
            "reversal" | "r" => Ok(ActionKind::Reversal),
            "unrolling" | "unroll" | "u" => Ok(ActionKind::Unrolling),
            "tiling2d" | "tiling" | "t2" => Ok(ActionKind::Tiling2D),
            _ => Err(format!(
                "Unknown transformation: '{}'. Valid options: parallelization, skewing, interchange, reversal, unrolling, tiling2d",
                s
            )),
        }
    }
}

/// One transformation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionParam {
    /// A loop of the tree
    Loop(IteratorId),
    /// A numeric factor (skew factor, unroll factor, tile size)
    Factor(i64),
}

impl ActionParam {
    fn shape(&self) -> ParamShape {
        match self {
            ActionParam::Loop(_) => Loop,
            ActionParam::Factor(_) => Factor,
        }
    }
}

impl From<IteratorId> for ActionParam {
    fn from(id: IteratorId) -> Self {
        ActionParam::Loop(id)
    }
}

impl From<i64> for ActionParam {
    fn from(v: i64) -> Self {
        ActionParam::Factor(v)
    }
}

/// A validated optimization step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformationAction {
    kind: ActionKind,
    params: Vec<ActionParam>,
    comps: Vec<String>,
}

impl TransformationAction {
    /// Build an action, checking arity, parameter shape and targets.
    pub fn new(kind: ActionKind, params: Vec<ActionParam>, comps: Vec<String>) -> SchedResult<Self> {
        if params.len() != kind.arity() {
            return Err(ScheduleError::InvalidParameterCount {
                kind: kind.name(),
                expected: kind.arity(),
                found: params.len(),
            });
        }
        for (index, (param, expected)) in params.iter().zip(kind.shape()).enumerate() {
            if param.shape() != *expected {
                return Err(ScheduleError::InvalidParameter {
                    kind: kind.name(),
                    index,
                    expected: expected.describe(),
                });
            }
        }
        if comps.is_empty() {
            return Err(ScheduleError::EmptyTargetSet(kind.name()));
        }
        Ok(Self { kind, params, comps })
    }

    pub fn parallelization(node: IteratorId, comps: Vec<String>) -> SchedResult<Self> {
        Self::new(ActionKind::Parallelization, vec![node.into()], comps)
    }

    pub fn skewing(
        outer: IteratorId,
        inner: IteratorId,
        factors: (i64, i64),
        comps: Vec<String>,
    ) -> SchedResult<Self> {
        Self::new(
            ActionKind::Skewing,
            vec![outer.into(), inner.into(), factors.0.into(), factors.1.into()],
            comps,
        )
    }

    pub fn interchange(first: IteratorId, second: IteratorId, comps: Vec<String>) -> SchedResult<Self> {
        Self::new(ActionKind::Interchange, vec![first.into(), second.into()], comps)
    }

    pub fn reversal(node: IteratorId, comps: Vec<String>) -> SchedResult<Self> {
        Self::new(ActionKind::Reversal, vec![node.into()], comps)
    }

    pub fn unrolling(node: IteratorId, factor: i64, comps: Vec<String>) -> SchedResult<Self> {
        Self::new(ActionKind::Unrolling, vec![node.into(), factor.into()], comps)
    }

    pub fn tiling_2d(
        outer: IteratorId,
        inner: IteratorId,
        sizes: (i64, i64),
        comps: Vec<String>,
    ) -> SchedResult<Self> {
        Self::new(
            ActionKind::Tiling2D,
            vec![outer.into(), inner.into(), sizes.0.into(), sizes.1.into()],
            comps,
        )
    }

    /// Build an action from a candidate and its factors, targeting every
    /// computation below the candidate loops.
    pub fn from_candidate(
        kind: ActionKind,
        tree: &IteratorTree,
        candidate: &[IteratorId],
        factors: &[i64],
    ) -> SchedResult<Self> {
        let mut comps: Vec<String> = Vec::new();
        for node in candidate {
            for comp in tree.get_iterator_subtree_computations(node)? {
                if !comps.contains(&comp) {
                    comps.push(comp);
                }
            }
        }
        let params = candidate
            .iter()
            .cloned()
            .map(ActionParam::Loop)
            .chain(factors.iter().copied().map(ActionParam::Factor))
            .collect();
        Self::new(kind, params, comps)
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn params(&self) -> &[ActionParam] {
        &self.params
    }

    /// Target computations.
    pub fn comps(&self) -> &[String] {
        &self.comps
    }

    pub fn loops(&self) -> Vec<&IteratorId> {
        self.params
            .iter()
            .filter_map(|p| match p {
                ActionParam::Loop(id) => Some(id),
                ActionParam::Factor(_) => None,
            })
            .collect()
    }

    pub fn factors(&self) -> Vec<i64> {
        self.params
            .iter()
            .filter_map(|p| match p {
                ActionParam::Factor(v) => Some(*v),
                ActionParam::Loop(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::iterator_tree::tests::sample_tree;

    fn id(s: &str) -> IteratorId {
        IteratorId::new(s)
    }

    #[test]
    fn test_arity_is_checked() {
        let err = TransformationAction::new(
            ActionKind::Skewing,
            vec![id("j").into(), id("k").into()],
            vec!["comp03".into()],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidParameterCount { expected: 4, found: 2, .. }
        ));
    }

    #[test]
    fn test_shape_is_checked() {
        let err = TransformationAction::new(
            ActionKind::Unrolling,
            vec![ActionParam::Factor(4), ActionParam::Factor(4)],
            vec!["c".into()],
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidParameter { index: 0, .. }));
    }

    #[test]
    fn test_targets_required() {
        let err = TransformationAction::parallelization(id("i"), vec![]).unwrap_err();
        assert!(matches!(err, ScheduleError::EmptyTargetSet("parallelization")));
    }

    #[test]
    fn test_from_candidate_collects_subtree_computations() {
        let tree = sample_tree();
        let action = TransformationAction::from_candidate(
            ActionKind::Skewing,
            &tree,
            &[id("j"), id("k")],
            &[1, 2],
        )
        .unwrap();
        assert_eq!(action.comps(), &["comp03", "comp04"]);
        assert_eq!(action.loops(), vec![&id("j"), &id("k")]);
        assert_eq!(action.factors(), vec![1, 2]);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("skew".parse::<ActionKind>().unwrap(), ActionKind::Skewing);
        assert_eq!("Tiling2D".parse::<ActionKind>().unwrap(), ActionKind::Tiling2D);
        assert!("fusion".parse::<ActionKind>().is_err());
        for kind in ActionKind::ALL {
            assert_eq!(kind.name().parse::<ActionKind>().unwrap(), kind);
        }
    }
}
