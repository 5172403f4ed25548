//! Loop interchange on the iterator tree.
//!
//! Interchange swaps the positions of two iterators: each node keeps its
//! own name and bounds but takes over the other's parent slot, children,
//! computations and level. Example on `i -> j -> {S}`:
//!
//! ```text
//! for i:            for j:
//!   for j:    =>      for i:
//!     S                 S
//! ```

use crate::tree::iterator_tree::IteratorTree;
use crate::tree::node::{IteratorId, IteratorNode};
use crate::utils::errors::{ScheduleError, SchedResult};
use log::trace;
use std::collections::HashMap;

impl IteratorTree {
    /// Swap the tree positions of `first` and `second`.
    ///
    /// Every replacement node is staged before anything is written, so a
    /// failure leaves the tree exactly as it was.
    pub fn interchange(&mut self, first: &IteratorId, second: &IteratorId) -> SchedResult<()> {
        let lookup = |id: &IteratorId| {
            self.iterators
                .get(id)
                .cloned()
                .ok_or_else(|| ScheduleError::DisconnectedNodes {
                    first: first.clone(),
                    second: second.clone(),
                    missing: id.clone(),
                })
        };
        let n1 = lookup(first)?;
        let n2 = lookup(second)?;
        if first == second {
            return Ok(());
        }

        let swap = |id: &IteratorId| -> IteratorId {
            if id == first {
                second.clone()
            } else if id == second {
                first.clone()
            } else {
                id.clone()
            }
        };

        // When the two are parent and child, the child moves up into the
        // parent's slot and the former parent hangs directly below it.
        let new_parent1 = if n2.parent() == Some(first) {
            Some(second.clone())
        } else {
            n2.parent().cloned()
        };
        let new_parent2 = if n1.parent() == Some(second) {
            Some(first.clone())
        } else {
            n1.parent().cloned()
        };

        // Mapping through `swap` keeps a node from listing itself as a child
        // when the pair is adjacent.
        let new_node1 = n1.relocated(
            new_parent1,
            n2.children().iter().map(swap).collect(),
            n2.computations().to_vec(),
            n2.level(),
        );
        let new_node2 = n2.relocated(
            new_parent2,
            n1.children().iter().map(swap).collect(),
            n1.computations().to_vec(),
            n1.level(),
        );

        let mut staged: HashMap<IteratorId, IteratorNode> = HashMap::new();
        let mut new_roots = self.roots.clone();

        // Old parent slots now hold the other node. Two siblings share one
        // parent list, so the whole list goes through `swap` at once.
        let mut old_parents: Vec<Option<&IteratorId>> = Vec::new();
        if n1.parent() != Some(second) {
            old_parents.push(n1.parent());
        }
        if n2.parent() != Some(first) && !old_parents.contains(&n2.parent()) {
            old_parents.push(n2.parent());
        }
        for parent in old_parents {
            match parent {
                None => new_roots = new_roots.iter().map(swap).collect(),
                Some(pid) => {
                    let parent_node = self
                        .iterators
                        .get(pid)
                        .ok_or_else(|| ScheduleError::UnknownNode(pid.clone()))?;
                    let children = parent_node.children().iter().map(swap).collect();
                    staged.insert(
                        pid.clone(),
                        parent_node.relocated(
                            parent_node.parent().cloned(),
                            children,
                            parent_node.computations().to_vec(),
                            parent_node.level(),
                        ),
                    );
                }
            }
        }

        // Subtrees that moved under a new occupant point back at it.
        for (owner, children) in [(first, new_node1.children()), (second, new_node2.children())] {
            for child in children.iter().filter(|c| *c != first && *c != second) {
                let current = match staged.get(child) {
                    Some(node) => node,
                    None => self
                        .iterators
                        .get(child)
                        .ok_or_else(|| ScheduleError::UnknownNode(child.clone()))?,
                };
                let updated = current.with_parent(Some(owner.clone()));
                staged.insert(child.clone(), updated);
            }
        }

        let mut owners = Vec::new();
        owners.extend(new_node1.computations().iter().map(|c| (c.clone(), first.clone())));
        owners.extend(new_node2.computations().iter().map(|c| (c.clone(), second.clone())));

        trace!(
            "interchange {} <-> {}: {} neighbour nodes rewritten",
            first,
            second,
            staged.len()
        );

        staged.insert(first.clone(), new_node1);
        staged.insert(second.clone(), new_node2);
        self.iterators.extend(staged);
        self.roots = new_roots;
        self.computation_owner.extend(owners);

        debug_assert!(self.check_invariants().is_ok());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::iterator_tree::tests::{arb_annotation, ids, sample_tree};
    use crate::tree::iterator_tree::IteratorTree;
    use crate::tree::node::IteratorId;
    use crate::utils::errors::ScheduleError;
    use proptest::prelude::*;

    fn id(s: &str) -> IteratorId {
        IteratorId::new(s)
    }

    #[test]
    fn test_interchange_siblings() {
        let mut tree = sample_tree();
        tree.interchange(&id("i"), &id("j")).unwrap();

        let i = tree.get_iterator_node(&id("i")).unwrap();
        let j = tree.get_iterator_node(&id("j")).unwrap();
        assert_eq!(i.parent(), Some(&id("root")));
        assert_eq!(j.parent(), Some(&id("root")));
        assert_eq!(i.children(), ids(&["k"]).as_slice());
        assert!(j.children().is_empty());
        assert_eq!(j.computations(), &["comp01"]);
        assert_eq!(tree.get_iterator_node(&id("k")).unwrap().parent(), Some(&id("i")));
        assert_eq!(tree.get_iterator_node(&id("root")).unwrap().children(), ids(&["j", "i"]).as_slice());
        assert_eq!(tree.get_iterator_of_computation("comp01", None).unwrap().id(), &id("j"));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_interchange_parent_and_child() {
        let mut tree = sample_tree();
        tree.interchange(&id("j"), &id("k")).unwrap();

        let j = tree.get_iterator_node(&id("j")).unwrap();
        let k = tree.get_iterator_node(&id("k")).unwrap();
        assert_eq!(k.parent(), Some(&id("root")));
        assert_eq!(k.children(), ids(&["j"]).as_slice());
        assert_eq!(k.level(), 1);
        assert_eq!(j.parent(), Some(&id("k")));
        assert_eq!(j.children(), ids(&["l", "m"]).as_slice());
        assert_eq!(j.level(), 2);
        assert_eq!(tree.get_iterator_node(&id("l")).unwrap().parent(), Some(&id("j")));
        assert_eq!(tree.get_iterator_node(&id("m")).unwrap().parent(), Some(&id("j")));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_interchange_child_and_parent_argument_order() {
        let mut a = sample_tree();
        let mut b = sample_tree();
        a.interchange(&id("j"), &id("k")).unwrap();
        b.interchange(&id("k"), &id("j")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interchange_with_root() {
        let mut tree = sample_tree();
        tree.interchange(&id("root"), &id("j")).unwrap();

        assert_eq!(tree.roots(), ids(&["j"]).as_slice());
        let j = tree.get_iterator_node(&id("j")).unwrap();
        assert_eq!(j.parent(), None);
        assert_eq!(j.children(), ids(&["i", "root"]).as_slice());
        let root = tree.get_iterator_node(&id("root")).unwrap();
        assert_eq!(root.parent(), Some(&id("j")));
        assert_eq!(root.children(), ids(&["k"]).as_slice());
        assert_eq!(tree.get_iterator_node(&id("k")).unwrap().parent(), Some(&id("root")));
        assert_eq!(tree.get_iterator_node(&id("i")).unwrap().parent(), Some(&id("j")));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_interchange_distant_ancestor() {
        let mut tree = sample_tree();
        tree.interchange(&id("root"), &id("k")).unwrap();

        assert_eq!(tree.roots(), ids(&["k"]).as_slice());
        assert_eq!(tree.get_iterator_node(&id("j")).unwrap().parent(), Some(&id("k")));
        assert_eq!(tree.get_iterator_node(&id("j")).unwrap().children(), ids(&["root"]).as_slice());
        assert_eq!(tree.get_iterator_node(&id("root")).unwrap().children(), ids(&["l", "m"]).as_slice());
        assert_eq!(tree.get_iterator_levels(&ids(&["k", "j", "root", "l"])).unwrap(), vec![0, 1, 2, 3]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_interchange_twice_restores_structure() {
        let original = sample_tree();
        let recorded: Vec<_> = ["root", "i", "j", "k", "l", "m"]
            .iter()
            .map(|n| original.get_iterator_node(&id(n)).unwrap().parent().cloned())
            .collect();

        for (a, b) in [("i", "j"), ("j", "k"), ("root", "j"), ("i", "l")] {
            let mut tree = original.clone();
            tree.interchange(&id(a), &id(b)).unwrap();
            assert_ne!(tree, original);
            tree.interchange(&id(a), &id(b)).unwrap();

            let parents: Vec<_> = ["root", "i", "j", "k", "l", "m"]
                .iter()
                .map(|n| tree.get_iterator_node(&id(n)).unwrap().parent().cloned())
                .collect();
            assert_eq!(parents, recorded);
            assert_eq!(tree, original);
        }
    }

    #[test]
    fn test_interchange_unknown_node_leaves_tree_untouched() {
        let mut tree = sample_tree();
        let before = tree.clone();
        let err = tree.interchange(&id("i"), &id("ghost")).unwrap_err();
        assert!(matches!(err, ScheduleError::DisconnectedNodes { ref missing, .. } if missing.as_str() == "ghost"));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_interchange_with_itself_is_noop() {
        let mut tree = sample_tree();
        let before = tree.clone();
        tree.interchange(&id("k"), &id("k")).unwrap();
        assert_eq!(tree, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_interchange_keeps_invariants_and_undoes_itself(
            annotation in arb_annotation(),
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
        ) {
            let original = IteratorTree::from_annotations(&annotation).unwrap();
            let n = annotation.iterators.len();
            let first = IteratorId::new(format!("n{}", a.index(n)));
            let second = IteratorId::new(format!("n{}", b.index(n)));

            let mut tree = original.clone();
            tree.interchange(&first, &second).unwrap();
            prop_assert_eq!(tree.check_invariants().map_err(|e| e.to_string()), Ok(()));
            prop_assert_eq!(tree.roots().len(), original.roots().len());

            tree.interchange(&first, &second).unwrap();
            prop_assert_eq!(tree.check_invariants().map_err(|e| e.to_string()), Ok(()));
            prop_assert_eq!(tree, original);
        }
    }
}
