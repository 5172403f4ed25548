//! Iterator trees: the loop structure of a program.
//!
//! - [`node`]: single loop levels
//! - [`annotation`]: the declarative input the tree is built from
//! - [`iterator_tree`]: the forest and its structural queries
//! - [`interchange`]: position swap of two loops
//! - [`shared`]: lock-guarded handle for concurrent readers

pub mod node;
pub mod annotation;
pub mod iterator_tree;
pub mod interchange;
pub mod shared;

pub use node::{IteratorId, IteratorNode, LoopBound, NodeSpec};
pub use annotation::{IteratorAnnotation, IteratorTable, ProgramAnnotation};
pub use iterator_tree::{IteratorTree, PerRoot, Section};
pub use shared::SharedTree;
