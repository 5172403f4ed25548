//! Iterator nodes: one loop level of a loop nest.

use crate::utils::errors::{ScheduleError, SchedResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an iterator node.
///
/// This is the lookup key into the tree. The display name of a node may
/// repeat after transformations, the id never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IteratorId(String);

impl IteratorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IteratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IteratorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IteratorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A loop extent. Stored as given, never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoopBound {
    /// Constant bound
    Int(i64),
    /// Symbolic expression such as `N` or `N - 1`
    Symbolic(String),
}

impl fmt::Display for LoopBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopBound::Int(v) => write!(f, "{}", v),
            LoopBound::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

/// A single loop of the nest.
///
/// Nodes are values: the tree replaces them wholesale instead of editing
/// fields in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorNode {
    id: IteratorId,
    name: String,
    lower_bound: LoopBound,
    upper_bound: LoopBound,
    parent: Option<IteratorId>,
    children: Vec<IteratorId>,
    computations: Vec<String>,
    level: usize,
}

impl IteratorNode {
    pub fn id(&self) -> &IteratorId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower_bound(&self) -> &LoopBound {
        &self.lower_bound
    }

    pub fn upper_bound(&self) -> &LoopBound {
        &self.upper_bound
    }

    pub fn parent(&self) -> Option<&IteratorId> {
        self.parent.as_ref()
    }

    /// Child loops, in nesting order.
    pub fn children(&self) -> &[IteratorId] {
        &self.children
    }

    /// Computations attached directly at this level.
    pub fn computations(&self) -> &[String] {
        &self.computations
    }

    /// Depth from the root (root = 0).
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// A pass-through level: exactly one child and no work of its own.
    pub fn is_pass_through(&self) -> bool {
        self.children.len() == 1 && self.computations.is_empty()
    }

    /// Start a copy of this node that keeps its identity and bounds but
    /// takes a new position in the tree.
    pub(crate) fn relocated(
        &self,
        parent: Option<IteratorId>,
        children: Vec<IteratorId>,
        computations: Vec<String>,
        level: usize,
    ) -> IteratorNode {
        IteratorNode {
            id: self.id.clone(),
            name: self.name.clone(),
            lower_bound: self.lower_bound.clone(),
            upper_bound: self.upper_bound.clone(),
            parent,
            children,
            computations,
            level,
        }
    }

    /// Same node with only its parent link replaced.
    pub(crate) fn with_parent(&self, parent: Option<IteratorId>) -> IteratorNode {
        IteratorNode {
            parent,
            ..self.clone()
        }
    }
}

impl fmt::Display for IteratorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}, {}) L{}",
            self.name, self.lower_bound, self.upper_bound, self.level
        )
    }
}

/// Builder for [`IteratorNode`]. Every field must be set before `build`.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    id: Option<IteratorId>,
    name: Option<String>,
    lower_bound: Option<LoopBound>,
    upper_bound: Option<LoopBound>,
    parent: Option<Option<IteratorId>>,
    children: Option<Vec<IteratorId>>,
    computations: Option<Vec<String>>,
    level: Option<usize>,
}

impl NodeSpec {
    pub fn new(id: impl Into<IteratorId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Display name. Defaults to the id when not given.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bounds(mut self, lower: LoopBound, upper: LoopBound) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    /// Parent link; `None` marks a root.
    pub fn parent(mut self, parent: Option<IteratorId>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn children(mut self, children: Vec<IteratorId>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn computations(mut self, computations: Vec<String>) -> Self {
        self.computations = Some(computations);
        self
    }

    pub fn level(mut self, level: usize) -> Self {
        self.level = Some(level);
        self
    }

    pub fn build(self) -> SchedResult<IteratorNode> {
        let id = self
            .id
            .ok_or_else(|| ScheduleError::invalid_node("<unnamed>", "missing id"))?;
        let missing = |field: &str| ScheduleError::invalid_node(id.as_str(), format!("missing {}", field));

        let lower_bound = self.lower_bound.ok_or_else(|| missing("lower bound"))?;
        let upper_bound = self.upper_bound.ok_or_else(|| missing("upper bound"))?;
        let parent = self.parent.ok_or_else(|| missing("parent"))?;
        let children = self.children.ok_or_else(|| missing("children"))?;
        let computations = self.computations.ok_or_else(|| missing("computations"))?;
        let level = self.level.ok_or_else(|| missing("level"))?;

        if parent.is_none() && level != 0 {
            return Err(ScheduleError::invalid_node(
                id.as_str(),
                format!("root must be at level 0, got {}", level),
            ));
        }
        if parent.is_some() && level == 0 {
            return Err(ScheduleError::invalid_node(id.as_str(), "non-root node at level 0"));
        }
        if children.contains(&id) || parent.as_ref() == Some(&id) {
            return Err(ScheduleError::invalid_node(id.as_str(), "node references itself"));
        }

        Ok(IteratorNode {
            name: self.name.unwrap_or_else(|| id.as_str().to_string()),
            id,
            lower_bound,
            upper_bound,
            parent,
            children,
            computations,
            level,
        })
    }
}
