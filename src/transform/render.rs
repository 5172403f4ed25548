//! Textual forms of an action.
//!
//! Loops are printed by their current level in the tree, so the same
//! action renders differently after an interchange moved its loops.

use crate::transform::{ActionKind, ActionParam, ParamShape, TransformationAction};
use crate::tree::IteratorTree;
use crate::utils::errors::SchedResult;

impl TransformationAction {
    /// Parameters with loops replaced by their level.
    fn rendered_params(&self, tree: &IteratorTree) -> SchedResult<Vec<String>> {
        self.params()
            .iter()
            .map(|p| match p {
                ActionParam::Loop(id) => tree.get_iterator_node(id).map(|n| n.level().to_string()),
                ActionParam::Factor(v) => Ok(v.to_string()),
            })
            .collect()
    }

    /// Compact form such as `P(L0)` or `S(L0,L1,1,2)`.
    pub fn short_form(&self, tree: &IteratorTree) -> SchedResult<String> {
        let params = self.rendered_params(tree)?;
        let args: Vec<String> = params
            .iter()
            .zip(self.kind().shape())
            .map(|(p, shape)| match shape {
                ParamShape::Loop => format!("L{}", p),
                ParamShape::Factor => p.clone(),
            })
            .collect();
        let tag = match self.kind() {
            ActionKind::Parallelization => "P",
            ActionKind::Skewing => "S",
            ActionKind::Interchange => "I",
            ActionKind::Reversal => "R",
            ActionKind::Unrolling => "U",
            ActionKind::Tiling2D => "T2",
        };
        Ok(format!("{}({})", tag, args.join(",")))
    }

    fn call_name(&self) -> &'static str {
        match self.kind() {
            ActionKind::Parallelization => "tag_parallel_level",
            ActionKind::Skewing => "skew",
            ActionKind::Interchange => "interchange",
            ActionKind::Reversal => "loop_reversal",
            ActionKind::Unrolling => "unroll",
            ActionKind::Tiling2D => "tile",
        }
    }

    /// The call applying this action to `comp`, e.g.
    /// `\n\tcomp00.skew(0, 1, 1, 2);`.
    pub fn compiler_call(&self, tree: &IteratorTree, comp: &str) -> SchedResult<String> {
        let params = self.rendered_params(tree)?.join(", ");
        Ok(format!("\n\t{}.{}({});", comp, self.call_name(), params))
    }

    /// One compiler call per target computation, in target order.
    pub fn compiler_calls(&self, tree: &IteratorTree) -> SchedResult<String> {
        let params = self.rendered_params(tree)?.join(", ");
        Ok(self
            .comps()
            .iter()
            .map(|comp| format!("\n\t{}.{}({});", comp, self.call_name(), params))
            .collect())
    }
}
