use std::cmp::Ordering;

use serde::Serialize;

use super::FileResult;
use crate::compiler::DiagnosticEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    /// `/`-separated path relative to the scan root; empty for the root.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    pub success_count: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<Vec<DiagnosticEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<DiagnosticEvent>>,
}

impl TreeNode {
    fn folder(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            kind: NodeKind::Folder,
            children: Some(Vec::new()),
            success_count: 0,
            failed_count: 0,
            success: None,
            failed: None,
        }
    }

    fn file(name: &str, path: String, result: &FileResult) -> Self {
        Self {
            name: name.to_string(),
            path,
            kind: NodeKind::File,
            children: None,
            success_count: result.success.len(),
            failed_count: result.failed.len(),
            success: Some(result.success.clone()),
            failed: Some(result.failed.clone()),
        }
    }

    /// Descend by child name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.as_ref()?.iter().find(|c| c.name == name)
    }
}

pub fn build_tree(files: &[FileResult]) -> TreeNode {
    let mut root = TreeNode::folder("root", String::new());

    for file in files {
        let parts: Vec<&str> = file.path.split('/').filter(|p| !p.is_empty()).collect();
        let mut current = &mut root;

        for (i, part) in parts.iter().enumerate() {
            let is_file = i + 1 == parts.len();
            let path = parts[..=i].join("/");
            let Some(children) = current.children.as_mut() else {
                break;
            };

            let index = match children.iter().position(|c| c.name == *part) {
                Some(index) => index,
                None => {
                    children.push(if is_file {
                        TreeNode::file(part, path, file)
                    } else {
                        TreeNode::folder(part, path)
                    });
                    children.len() - 1
                }
            };
            current = &mut children[index];
        }
    }

    aggregate_counts(&mut root);
    sort_tree(&mut root);
    root
}

fn aggregate_counts(node: &mut TreeNode) {
    let Some(children) = node.children.as_mut() else {
        return;
    };

    let (mut success, mut failed) = (0, 0);
    for child in children.iter_mut() {
        aggregate_counts(child);
        success += child.success_count;
        failed += child.failed_count;
    }
    node.success_count = success;
    node.failed_count = failed;
}

fn sort_tree(node: &mut TreeNode) {
    let Some(children) = node.children.as_mut() else {
        return;
    };

    children.sort_by(|a, b| match (a.kind, b.kind) {
        (NodeKind::Folder, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Folder) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
    children.iter_mut().for_each(sort_tree);
}
