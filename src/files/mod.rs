//! The files module: a general file tree with download, upload and delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::share::Share;

pub mod source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Directory,
}

/// A single node in the exposed file tree. Paths are absolute within the
/// source root, e.g. `/test1/inner/foo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub name: String,
    pub path: String,
    #[serde(rename = "updated_at")]
    pub mod_time: DateTime<Utc>,
    #[serde(default)]
    pub children: Vec<Item>,
}

/// Restricts a full tree to what a share grant may see.
///
/// Walks to the node at the grant's `name`; that node becomes the visible
/// root. Of its immediate children only those admitted by the allow-list
/// survive, with their subtrees intact; deeper levels are not re-filtered
/// here because every leaf access is checked exactly against the allow-list
/// anyway. Returns `None` when the granted subtree does not exist.
pub fn scoped_tree(root: &Item, share: &Share) -> Option<Item> {
    let mut node = root;
    for segment in share.name.split('/').filter(|s| !s.is_empty()) {
        node = node
            .children
            .iter()
            .find(|child| child.kind == ItemKind::Directory && child.name == segment)?;
    }

    let mut scoped = node.clone();
    scoped.children.retain(|child| share.includes_path(&child.path));
    Some(scoped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleKind;

    fn dir(name: &str, path: &str, children: Vec<Item>) -> Item {
        Item {
            kind: ItemKind::Directory,
            name: name.to_string(),
            path: path.to_string(),
            mod_time: Utc::now(),
            children,
        }
    }

    fn file(name: &str, path: &str) -> Item {
        Item {
            kind: ItemKind::File,
            name: name.to_string(),
            path: path.to_string(),
            mod_time: Utc::now(),
            children: Vec::new(),
        }
    }

    fn tree() -> Item {
        dir(
            "/",
            "/",
            vec![
                file("foo", "/foo"),
                dir(
                    "test1",
                    "/test1",
                    vec![
                        dir("inner", "/test1/inner", vec![file("foo", "/test1/inner/foo")]),
                        file("secret", "/test1/secret"),
                    ],
                ),
                dir("test2", "/test2", vec![]),
            ],
        )
    }

    fn share(name: &str, items: &[&str]) -> Share {
        Share {
            slug: "baz".to_string(),
            kind: ModuleKind::Files,
            name: name.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
            expires_at: None,
        }
    }

    #[test]
    fn scoped_tree_roots_at_the_granted_subtree() {
        let scoped = scoped_tree(&tree(), &share("/test1", &["/test1/inner"])).unwrap();

        assert_eq!(scoped.name, "test1");
        assert_eq!(scoped.path, "/test1");
        assert_eq!(scoped.children.len(), 1);
        assert_eq!(scoped.children[0].path, "/test1/inner");
        // The admitted child keeps its subtree.
        assert_eq!(scoped.children[0].children.len(), 1);
        assert_eq!(scoped.children[0].children[0].path, "/test1/inner/foo");
    }

    #[test]
    fn scoped_tree_drops_siblings_outside_the_allow_list() {
        let scoped = scoped_tree(&tree(), &share("/test1", &["/test1/inner"])).unwrap();
        assert!(scoped.children.iter().all(|c| c.path != "/test1/secret"));
    }

    #[test]
    fn scoped_tree_misses_unknown_subtrees() {
        assert!(scoped_tree(&tree(), &share("/missing", &["/missing/x"])).is_none());
        assert!(scoped_tree(&tree(), &share("/foo", &["/foo/x"])).is_none());
    }
}
