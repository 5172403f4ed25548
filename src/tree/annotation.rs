//! Declarative program annotation consumed by `IteratorTree::from_annotations`.
//!
//! The JSON shape is
//!
//! ```text
//! {
//!   "iterators": {
//!     "i": { "parent_iterator": null, "lower_bound": 0, "upper_bound": "N",
//!            "child_iterators": ["j"], "computations_list": [] },
//!     ...
//!   }
//! }
//! ```
//!
//! Entry order in `iterators` is kept as written because root order is
//! taken from it.

use crate::tree::node::{IteratorId, LoopBound};
use crate::utils::errors::SchedResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One entry of the `iterators` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IteratorAnnotation {
    pub parent_iterator: Option<IteratorId>,
    pub lower_bound: LoopBound,
    pub upper_bound: LoopBound,
    #[serde(default)]
    pub child_iterators: Vec<IteratorId>,
    #[serde(default)]
    pub computations_list: Vec<String>,
}

impl IteratorAnnotation {
    pub fn new(parent: Option<&str>, lower: LoopBound, upper: LoopBound) -> Self {
        Self {
            parent_iterator: parent.map(IteratorId::from),
            lower_bound: lower,
            upper_bound: upper,
            child_iterators: Vec::new(),
            computations_list: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: &[&str]) -> Self {
        self.child_iterators = children.iter().map(|c| IteratorId::from(*c)).collect();
        self
    }

    pub fn with_computations(mut self, comps: &[&str]) -> Self {
        self.computations_list = comps.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Ordered `iterators` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IteratorTable(IndexMap<IteratorId, IteratorAnnotation>);

impl IteratorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. An existing id keeps its position and gets the new entry.
    pub fn insert(&mut self, id: impl Into<IteratorId>, entry: IteratorAnnotation) {
        self.0.insert(id.into(), entry);
    }

    pub fn get(&self, id: &IteratorId) -> Option<&IteratorAnnotation> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &IteratorId) -> bool {
        self.0.contains_key(id)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, IteratorId, IteratorAnnotation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The part of a program annotation this crate reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramAnnotation {
    pub iterators: IteratorTable,
}

impl ProgramAnnotation {
    pub fn from_json_str(json: &str) -> SchedResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SchedResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
