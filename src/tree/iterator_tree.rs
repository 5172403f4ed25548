//! The iterator forest of a program.
//!
//! Nodes refer to each other by [`IteratorId`] only and the tree owns every
//! node through an id-keyed map, so structural edits never have to chase
//! references.

use crate::tree::annotation::ProgramAnnotation;
use crate::tree::node::{IteratorId, IteratorNode, NodeSpec};
use crate::utils::errors::{ScheduleError, SchedResult};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// A maximal linear chain of iterators.
pub type Section = Vec<IteratorId>;

/// A mapping keyed by root id that iterates in root order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerRoot<T> {
    entries: IndexMap<IteratorId, T>,
}

impl<T> PerRoot<T> {
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    pub fn push(&mut self, root: IteratorId, value: T) {
        self.entries.insert(root, value);
    }

    pub fn get(&self, root: &IteratorId) -> Option<&T> {
        self.entries.get(root)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, IteratorId, T> {
        self.entries.iter()
    }

    pub fn roots(&self) -> indexmap::map::Keys<'_, IteratorId, T> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Transform every value, keeping the root order.
    pub fn map<U>(self, mut f: impl FnMut(&IteratorId, T) -> U) -> PerRoot<U> {
        PerRoot {
            entries: self
                .entries
                .into_iter()
                .map(|(r, v)| {
                    let u = f(&r, v);
                    (r, u)
                })
                .collect(),
        }
    }
}

impl<T> Default for PerRoot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for PerRoot<T> {
    type Item = (IteratorId, T);
    type IntoIter = indexmap::map::IntoIter<IteratorId, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Forest of loop nests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IteratorTree {
    pub(crate) roots: Vec<IteratorId>,
    pub(crate) iterators: HashMap<IteratorId, IteratorNode>,
    pub(crate) computations: Vec<String>,
    pub(crate) computation_owner: HashMap<String, IteratorId>,
    pub(crate) computations_absolute_order: HashMap<String, usize>,
}

impl IteratorTree {
    /// Build the forest from an annotation.
    ///
    /// Entries may appear in any order: references are checked against the
    /// whole table first, then levels are assigned breadth-first from the
    /// roots.
    pub fn from_annotations(annotation: &ProgramAnnotation) -> SchedResult<Self> {
        let table = &annotation.iterators;
        let mut roots = Vec::new();

        for (id, entry) in table.iter() {
            match &entry.parent_iterator {
                None => roots.push(id.clone()),
                Some(parent) => {
                    let parent_entry = table.get(parent).ok_or_else(|| ScheduleError::MissingParent {
                        node: id.clone(),
                        parent: parent.clone(),
                    })?;
                    if !parent_entry.child_iterators.contains(id) {
                        return Err(ScheduleError::invalid_node(
                            id.as_str(),
                            format!("parent {} does not list it as a child", parent),
                        ));
                    }
                }
            }

            let mut seen = HashSet::new();
            for child in &entry.child_iterators {
                let child_entry = table
                    .get(child)
                    .ok_or_else(|| ScheduleError::UnknownNode(child.clone()))?;
                if child_entry.parent_iterator.as_ref() != Some(id) {
                    return Err(ScheduleError::invalid_node(
                        child.as_str(),
                        format!("listed as a child of {} but names another parent", id),
                    ));
                }
                if !seen.insert(child) {
                    return Err(ScheduleError::invalid_node(
                        id.as_str(),
                        format!("child {} listed twice", child),
                    ));
                }
            }
        }

        if roots.is_empty() && !table.is_empty() {
            return Err(ScheduleError::InvalidAnnotation("no root iterator".to_string()));
        }

        let mut iterators = HashMap::with_capacity(table.len());
        let mut queue: VecDeque<(IteratorId, usize)> = roots.iter().map(|r| (r.clone(), 0)).collect();
        while let Some((id, level)) = queue.pop_front() {
            let entry = table.get(&id).ok_or_else(|| ScheduleError::UnknownNode(id.clone()))?;
            let node = NodeSpec::new(id.clone())
                .bounds(entry.lower_bound.clone(), entry.upper_bound.clone())
                .parent(entry.parent_iterator.clone())
                .children(entry.child_iterators.clone())
                .computations(entry.computations_list.clone())
                .level(level)
                .build()?;
            queue.extend(entry.child_iterators.iter().map(|c| (c.clone(), level + 1)));
            iterators.insert(id, node);
        }

        if iterators.len() != table.len() {
            let stray = table
                .iter()
                .map(|(id, _)| id)
                .find(|id| !iterators.contains_key(*id))
                .map(|id| id.to_string())
                .unwrap_or_default();
            return Err(ScheduleError::invalid_node(stray, "not reachable from any root"));
        }

        let mut tree = IteratorTree {
            roots,
            iterators,
            ..Default::default()
        };
        tree.index_computations()?;
        Ok(tree)
    }

    /// Rebuild the computation list, owner map and absolute order by a
    /// pre-order, root-major walk.
    fn index_computations(&mut self) -> SchedResult<()> {
        let mut computations = Vec::new();
        let mut owner = HashMap::new();
        for root in &self.roots {
            for id in self.iter_preorder(root)? {
                for comp in self.iterators[&id].computations() {
                    if let Some(previous) = owner.insert(comp.clone(), id.clone()) {
                        return Err(ScheduleError::invalid_node(
                            id.as_str(),
                            format!("computation {} already attached to {}", comp, previous),
                        ));
                    }
                    computations.push(comp.clone());
                }
            }
        }
        self.computations_absolute_order = computations
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i + 1))
            .collect();
        self.computations = computations;
        self.computation_owner = owner;
        Ok(())
    }

    pub fn roots(&self) -> &[IteratorId] {
        &self.roots
    }

    pub fn computations(&self) -> &[String] {
        &self.computations
    }

    pub fn computations_absolute_order(&self) -> &HashMap<String, usize> {
        &self.computations_absolute_order
    }

    /// 1-based position of a computation in the canonical order.
    pub fn computation_rank(&self, name: &str) -> Option<usize> {
        self.computations_absolute_order.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.iterators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterators.is_empty()
    }

    pub fn contains(&self, id: &IteratorId) -> bool {
        self.iterators.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &IteratorNode> {
        self.iterators.values()
    }

    pub fn get_iterator_node(&self, id: &IteratorId) -> SchedResult<&IteratorNode> {
        self.iterators
            .get(id)
            .ok_or_else(|| ScheduleError::UnknownNode(id.clone()))
    }

    /// Nodes below `root` in pre-order, `root` first.
    pub fn iter_preorder(&self, root: &IteratorId) -> SchedResult<Vec<IteratorId>> {
        let mut order = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            let node = self.get_iterator_node(&id)?;
            stack.extend(node.children().iter().rev().cloned());
            order.push(id);
        }
        Ok(order)
    }

    /// Split every root's tree into maximal linear chains.
    ///
    /// A chain keeps going through nodes with exactly one child and no
    /// computations and stops at the first node that has computations, no
    /// children, or several children. The stopping node's children each
    /// start a new chain. Chains are emitted breadth-first by discovery.
    pub fn get_candidate_sections(&self) -> SchedResult<PerRoot<Vec<Section>>> {
        let mut sections = PerRoot::new();
        for root in &self.roots {
            let mut list = Vec::new();
            let mut to_visit = VecDeque::from([root.clone()]);
            while let Some(start) = to_visit.pop_front() {
                let (section, next) = self.section_of_node(&start)?;
                list.push(section);
                to_visit.extend(next.iter().cloned());
            }
            sections.push(root.clone(), list);
        }
        Ok(sections)
    }

    fn section_of_node(&self, start: &IteratorId) -> SchedResult<(Section, &[IteratorId])> {
        let mut section = vec![start.clone()];
        let mut current = self.get_iterator_node(start)?;
        while current.is_pass_through() {
            let next = &current.children()[0];
            section.push(next.clone());
            current = self.get_iterator_node(next)?;
        }
        Ok((section, current.children()))
    }

    /// Computations at `id` followed by those of each child subtree in
    /// child order.
    pub fn get_iterator_subtree_computations(&self, id: &IteratorId) -> SchedResult<Vec<String>> {
        let mut computations = Vec::new();
        for node_id in self.iter_preorder(id)? {
            computations.extend(self.iterators[&node_id].computations().iter().cloned());
        }
        Ok(computations)
    }

    pub fn get_root_of_node(&self, id: &IteratorId) -> SchedResult<IteratorId> {
        let mut node = self.get_iterator_node(id)?;
        for _ in 0..self.iterators.len() {
            match node.parent() {
                None => return Ok(node.id().clone()),
                Some(parent) => node = self.get_iterator_node(parent)?,
            }
        }
        Err(ScheduleError::invalid_node(id.as_str(), "parent chain does not end at a root"))
    }

    /// Node owning `name`, or its ancestor at `level` when given.
    pub fn get_iterator_of_computation(&self, name: &str, level: Option<usize>) -> SchedResult<&IteratorNode> {
        let owner_id = self
            .computation_owner
            .get(name)
            .ok_or_else(|| ScheduleError::UnknownComputation(name.to_string()))?;
        let mut node = self.get_iterator_node(owner_id)?;
        let Some(level) = level else {
            return Ok(node);
        };
        if node.level() < level {
            return Err(ScheduleError::LevelOutOfRange {
                computation: name.to_string(),
                requested: level,
                depth: node.level(),
            });
        }
        while node.level() > level {
            let parent = node
                .parent()
                .ok_or_else(|| ScheduleError::invalid_node(node.id().as_str(), "non-root without parent"))?;
            node = self.get_iterator_node(parent)?;
        }
        Ok(node)
    }

    pub fn get_iterator_levels(&self, ids: &[IteratorId]) -> SchedResult<Vec<usize>> {
        ids.iter()
            .map(|id| self.get_iterator_node(id).map(|n| n.level()))
            .collect()
    }

    /// Level found by counting ancestors instead of reading the cached field.
    pub fn get_level_of_node(&self, id: &IteratorId) -> SchedResult<usize> {
        let mut node = self.get_iterator_node(id)?;
        let mut level = 0;
        while let Some(parent) = node.parent() {
            level += 1;
            if level > self.iterators.len() {
                return Err(ScheduleError::invalid_node(id.as_str(), "parent chain contains a cycle"));
            }
            node = self.get_iterator_node(parent)?;
        }
        Ok(level)
    }

    /// True when `ancestor` lies strictly above `descendant`.
    pub fn is_ancestor(&self, ancestor: &IteratorId, descendant: &IteratorId) -> SchedResult<bool> {
        let mut node = self.get_iterator_node(descendant)?;
        self.get_iterator_node(ancestor)?;
        while let Some(parent) = node.parent() {
            if parent == ancestor {
                return Ok(true);
            }
            node = self.get_iterator_node(parent)?;
        }
        Ok(false)
    }

    /// True when both nodes hang off the same parent. Roots are never siblings.
    pub fn are_siblings(&self, a: &IteratorId, b: &IteratorId) -> SchedResult<bool> {
        let pa = self.get_iterator_node(a)?.parent();
        let pb = self.get_iterator_node(b)?.parent();
        Ok(a != b && pa.is_some() && pa == pb)
    }

    /// Verify the structural invariants of the forest.
    pub fn check_invariants(&self) -> SchedResult<()> {
        let mut seen = HashSet::new();
        for root in &self.roots {
            let node = self.get_iterator_node(root)?;
            if node.parent().is_some() || node.level() != 0 {
                return Err(ScheduleError::invalid_node(root.as_str(), "root with parent or non-zero level"));
            }
            for id in self.iter_preorder(root)? {
                if !seen.insert(id.clone()) {
                    return Err(ScheduleError::invalid_node(id.as_str(), "reachable twice"));
                }
                let node = &self.iterators[&id];
                for child in node.children() {
                    let child_node = self.get_iterator_node(child)?;
                    if child_node.parent() != Some(&id) {
                        return Err(ScheduleError::invalid_node(child.as_str(), "parent link disagrees with child list"));
                    }
                    if child_node.level() != node.level() + 1 {
                        return Err(ScheduleError::invalid_node(child.as_str(), "level is not parent level + 1"));
                    }
                }
            }
        }
        if seen.len() != self.iterators.len() {
            return Err(ScheduleError::InvalidAnnotation(format!(
                "{} iterators unreachable from the roots",
                self.iterators.len() - seen.len()
            )));
        }
        for (comp, owner) in &self.computation_owner {
            if !self.get_iterator_node(owner)?.computations().contains(comp) {
                return Err(ScheduleError::invalid_node(owner.as_str(), format!("does not hold {}", comp)));
            }
        }
        Ok(())
    }
}

impl fmt::Display for IteratorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            let Ok(order) = self.iter_preorder(root) else {
                continue;
            };
            for id in order {
                let node = &self.iterators[&id];
                write!(f, "{:indent$}{}", "", node, indent = node.level() * 2)?;
                if !node.computations().is_empty() {
                    write!(f, " {{{}}}", node.computations().join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
