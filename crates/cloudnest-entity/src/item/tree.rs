//! Derived hierarchical views over items.

use serde::{Deserialize, Serialize};

use cloudnest_core::types::ItemId;

use super::model::Item;

/// A node in a forest built from a flat listing.
///
/// Folder children are nested as nodes; files are kept as plain items.
/// Nodes are rebuilt from the cache after every refetch, never patched.
/// `children`, `files` and `isLoaded` are required on input so a persisted
/// forest is never mistaken for a flat item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// The wrapped item.
    #[serde(flatten)]
    pub item: Item,
    /// Child folders.
    pub children: Vec<TreeNode>,
    /// Child files.
    pub files: Vec<Item>,
    /// Whether this node's own listing has been fetched.
    #[serde(rename = "isLoaded")]
    pub is_loaded: bool,
}

impl TreeNode {
    /// Wrap an item with no children.
    pub fn new(item: Item) -> Self {
        Self {
            item,
            children: Vec::new(),
            files: Vec::new(),
            is_loaded: false,
        }
    }

    /// The item id.
    pub fn id(&self) -> &ItemId {
        &self.item.id
    }

    /// The item name.
    pub fn name(&self) -> &str {
        &self.item.name
    }

    /// Depth-first, pre-order iteration over this node and its descendants.
    pub fn iter(&self) -> TreeIter<'_> {
        TreeIter { stack: vec![self] }
    }

    /// Find a descendant (or self) by id.
    pub fn find(&self, id: &ItemId) -> Option<&TreeNode> {
        self.iter().find(|node| node.id() == id)
    }

    /// Number of folders in this subtree, self included.
    pub fn folder_count(&self) -> usize {
        self.iter().filter(|node| node.item.is_folder()).count()
    }
}

impl Drop for TreeNode {
    // Unlink descendants onto a heap stack so deep chains drop in a loop.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Iterator over a subtree without recursion.
#[derive(Debug)]
pub struct TreeIter<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Folder id.
    pub id: ItemId,
    /// Folder display name.
    pub name: String,
    /// Slash-joined names from the root down to this folder.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        let mut root = TreeNode::new(Item::folder("1", "A"));
        let mut child = TreeNode::new(Item::folder("2", "B").with_parent("1"));
        child
            .children
            .push(TreeNode::new(Item::folder("3", "C").with_parent("2")));
        root.children.push(child);
        root.files.push(Item::file("4", "a.txt").with_parent("1"));
        root
    }

    #[test]
    fn test_iter_is_preorder() {
        let root = sample();
        let ids: Vec<&str> = root.iter().map(|n| n.id().as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_find_and_count() {
        let root = sample();
        assert_eq!(root.find(&ItemId::from("3")).map(|n| n.name()), Some("C"));
        assert!(root.find(&ItemId::from("4")).is_none());
        assert_eq!(root.folder_count(), 3);
    }

    #[test]
    fn test_deep_chain_drops_without_overflow() {
        let depth = 100_000;
        let mut node = TreeNode::new(Item::folder("0", "f0"));
        for i in 1..depth {
            let mut parent = TreeNode::new(Item::folder(i.to_string(), format!("f{i}")));
            parent.children.push(node);
            node = parent;
        }
        assert_eq!(node.folder_count(), depth);
        drop(node);
    }

    #[test]
    fn test_serialized_shape_is_flat_item_plus_children() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["type"], "folder");
        assert_eq!(json["isLoaded"], false);
        assert_eq!(json["files"][0]["name"], "a.txt");
    }
}
