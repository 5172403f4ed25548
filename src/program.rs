//! A program under optimization: its annotation and the tree built from it.

use crate::tree::{IteratorTree, ProgramAnnotation};
use crate::utils::errors::SchedResult;
use std::path::Path;

/// A loaded program. Schedules share it through an `Arc` and never copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Name used when talking to the oracle
    pub name: String,
    /// Annotation the tree was built from
    pub annotation: ProgramAnnotation,
    /// Loop structure
    pub tree: IteratorTree,
}

impl Program {
    pub fn new(name: impl Into<String>, annotation: ProgramAnnotation) -> SchedResult<Self> {
        let tree = IteratorTree::from_annotations(&annotation)?;
        Ok(Self {
            name: name.into(),
            annotation,
            tree,
        })
    }

    pub fn from_json_str(name: impl Into<String>, json: &str) -> SchedResult<Self> {
        Self::new(name, ProgramAnnotation::from_json_str(json)?)
    }

    /// Load an annotation file. The program is named after the file stem.
    pub fn from_path(path: impl AsRef<Path>) -> SchedResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".to_string());
        Self::new(name, ProgramAnnotation::from_path(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_from_json() {
        let json = r#"{"iterators": {
            "i": {"parent_iterator": null, "lower_bound": 0, "upper_bound": "N",
                  "child_iterators": ["j"], "computations_list": []},
            "j": {"parent_iterator": "i", "lower_bound": 0, "upper_bound": "M",
                  "child_iterators": [], "computations_list": ["comp00"]}
        }}"#;
        let program = Program::from_json_str("blur", json).unwrap();
        assert_eq!(program.name, "blur");
        assert_eq!(program.tree.len(), 2);
        assert_eq!(program.tree.computations(), &["comp00"]);
    }

    #[test]
    fn test_program_rejects_bad_json() {
        assert!(Program::from_json_str("bad", "{").is_err());
    }
}
