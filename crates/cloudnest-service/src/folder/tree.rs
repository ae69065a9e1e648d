//! Forest building, breadcrumb resolution and move-target selection.
//!
//! Parent links come from the server and may be inconsistent, so every
//! walk here is iterative and bounded: a cycle is cut, never followed.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use cloudnest_core::config::search::TreeConfig;
use cloudnest_core::types::ItemId;
use cloudnest_entity::{Item, PathSegment, TreeNode};

/// Walk state while breaking parent cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

/// Builds hierarchical views from flat listings.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    /// Parent ids that mean "root".
    root_sentinels: Vec<String>,
    /// Breadcrumb hop cap.
    max_path_hops: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(&TreeConfig::default())
    }
}

impl TreeBuilder {
    /// Creates a new tree builder.
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            root_sentinels: config.root_sentinels.clone(),
            max_path_hops: config.max_path_hops.max(1),
        }
    }

    /// The configured breadcrumb hop cap.
    pub fn max_path_hops(&self) -> usize {
        self.max_path_hops
    }

    /// The parent id of an item, with root sentinels mapped to `None`.
    pub fn parent_of<'a>(&self, item: &'a Item) -> Option<&'a ItemId> {
        item.effective_parent(&self.root_sentinels)
    }

    /// Turn a flat listing into a forest.
    ///
    /// Folders nest under their parent's `children`, files under its
    /// `files`. An item becomes a root when its parent is null, a sentinel,
    /// absent from `items`, not a folder, or itself. When parent links form
    /// a cycle, one member of the cycle is promoted to root. Roots keep
    /// input order, as do siblings. Later duplicates of an id are ignored.
    pub fn build_forest(&self, items: &[Item]) -> Vec<TreeNode> {
        let (items, index) = dedup(items);
        let n = items.len();

        let mut parent: Vec<Option<usize>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.parent_of(item)
                    .and_then(|pid| index.get(pid).copied())
                    .filter(|&p| p != i && items[p].is_folder())
            })
            .collect();

        let cut = break_cycles(&mut parent);
        if cut > 0 {
            warn!(cut, "Parent cycle in listing, promoted members to root");
        }

        let mut folder_children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut file_children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match parent[i] {
                Some(p) if item.is_folder() => folder_children[p].push(i),
                Some(p) => file_children[p].push(i),
                None => roots.push(i),
            }
        }

        // Post-order assembly: a node is built once all its children are.
        let mut slots: Vec<Option<TreeNode>> = vec![None; n];
        let mut forest = Vec::with_capacity(roots.len());
        let mut stack: Vec<(usize, bool)> = Vec::new();
        for root in roots {
            stack.push((root, false));
            while let Some((i, expanded)) = stack.pop() {
                if !expanded {
                    stack.push((i, true));
                    stack.extend(folder_children[i].iter().rev().map(|&c| (c, false)));
                    continue;
                }
                let mut node = TreeNode::new(items[i].clone());
                node.children = folder_children[i]
                    .iter()
                    .filter_map(|&c| slots[c].take())
                    .collect();
                node.files = file_children[i].iter().map(|&f| items[f].clone()).collect();
                slots[i] = Some(node);
            }
            if let Some(node) = slots[root].take() {
                forest.push(node);
            }
        }

        debug!(items = n, roots = forest.len(), "Built forest");
        forest
    }

    /// Resolve the breadcrumb trail for a folder, root first.
    ///
    /// The walk stops at a null/sentinel parent, a parent missing from
    /// `items`, an already-visited id, or after the hop cap. An unknown
    /// `folder_id` yields a single `Folder <id>` placeholder.
    pub fn resolve_path(&self, folder_id: &ItemId, items: &[Item]) -> Vec<PathSegment> {
        let (items, index) = dedup(items);

        let Some(&start) = index.get(folder_id) else {
            let name = format!("Folder {folder_id}");
            return vec![PathSegment {
                id: folder_id.clone(),
                path: name.clone(),
                name,
            }];
        };

        let mut chain: Vec<usize> = Vec::new();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut current = Some(start);
        while let Some(i) = current {
            if chain.len() >= self.max_path_hops {
                warn!(folder_id = %folder_id, hops = chain.len(), "Breadcrumb hop cap reached");
                break;
            }
            if !visited.insert(i) {
                warn!(folder_id = %folder_id, "Parent cycle while resolving breadcrumb");
                break;
            }
            chain.push(i);
            current = self
                .parent_of(&items[i])
                .and_then(|pid| index.get(pid).copied());
        }

        let mut path = String::new();
        chain
            .iter()
            .rev()
            .map(|&i| {
                let item = &items[i];
                if !path.is_empty() {
                    path.push('/');
                }
                path.push_str(&item.name);
                PathSegment {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    path: path.clone(),
                }
            })
            .collect()
    }

    /// Every id in `items` that descends from one of `roots`, roots included.
    pub fn descendants(&self, items: &[Item], roots: &[ItemId]) -> HashSet<ItemId> {
        let mut children: HashMap<&ItemId, Vec<&ItemId>> = HashMap::new();
        for item in items {
            if let Some(pid) = self.parent_of(item) {
                children.entry(pid).or_default().push(&item.id);
            }
        }

        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut queue: VecDeque<&ItemId> = roots.iter().collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(kids) = children.get(id) {
                queue.extend(kids.iter().copied());
            }
        }
        seen
    }

    /// Folder forest offered as move destinations for `subjects`.
    ///
    /// Each subject and everything under it is excluded. Exclusion only
    /// sees the links present in `folders`; a stale listing can let an
    /// invalid destination through, which the backend must reject.
    pub fn move_targets(&self, folders: &[Item], subjects: &[ItemId]) -> Vec<TreeNode> {
        let excluded = self.descendants(folders, subjects);
        let candidates: Vec<Item> = folders
            .iter()
            .filter(|item| item.is_folder() && !excluded.contains(&item.id))
            .cloned()
            .collect();
        self.build_forest(&candidates)
    }
}

/// Drop later duplicates and index the rest by id.
fn dedup(items: &[Item]) -> (Vec<&Item>, HashMap<&ItemId, usize>) {
    let mut unique = Vec::with_capacity(items.len());
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        if index.contains_key(&item.id) {
            debug!(id = %item.id, "Duplicate id in listing, keeping first");
            continue;
        }
        index.insert(&item.id, unique.len());
        unique.push(item);
    }
    (unique, index)
}

/// Cut one parent link per cycle. Returns the number of links cut.
fn break_cycles(parent: &mut [Option<usize>]) -> usize {
    let mut mark = vec![Mark::Unvisited; parent.len()];
    let mut path = Vec::new();
    let mut cut = 0;

    for start in 0..parent.len() {
        let mut current = start;
        while mark[current] == Mark::Unvisited {
            mark[current] = Mark::Active;
            path.push(current);
            match parent[current] {
                Some(p) if mark[p] == Mark::Active => {
                    parent[current] = None;
                    cut += 1;
                    break;
                }
                Some(p) => current = p,
                None => break,
            }
        }
        for i in path.drain(..) {
            mark[i] = Mark::Done;
        }
    }
    cut
}
