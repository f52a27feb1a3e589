/// Arena-backed path tree built from canonical records.
///
/// All nodes live in a single `Vec<PathNode>` sorted by path key, so parents
/// always precede their children and output order is deterministic no
/// matter how the input records were ordered.
use crate::model::ScanRecord;
use crate::normalize::paths::{leaf_name, parent_path, path_key};
use compact_str::CompactString;
use std::collections::HashMap;

/// Lightweight index into the arena `Vec<PathNode>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct PathNode {
    /// Leaf name as it appears in the record.
    pub name: CompactString,
    /// Case- and separator-folded path used for lookups and ordering.
    pub key: String,
    /// Position of the source record in the input slice.
    pub record: usize,
    /// `None` when the parent path has no record of its own.
    pub parent: Option<NodeIndex>,
    /// 0 for tree roots.
    pub depth: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PathTree {
    pub nodes: Vec<PathNode>,
    pub roots: Vec<NodeIndex>,
}

impl PathTree {
    /// Build the tree. Records sharing a key are collapsed to the first one
    /// in (key, path, type, size) order.
    pub fn build(records: &[ScanRecord]) -> Self {
        let mut order: Vec<(String, usize)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (path_key(&r.path), i))
            .collect();
        order.sort_by(|(ka, a), (kb, b)| {
            let (ra, rb) = (&records[*a], &records[*b]);
            ka.cmp(kb)
                .then_with(|| ra.path.cmp(&rb.path))
                .then_with(|| ra.item_type.cmp(&rb.item_type))
                .then_with(|| ra.size_bytes.cmp(&rb.size_bytes))
        });
        order.dedup_by(|later, earlier| later.0 == earlier.0);

        let mut tree = Self {
            nodes: Vec::with_capacity(order.len()),
            roots: Vec::new(),
        };
        let mut by_key: HashMap<String, NodeIndex> = HashMap::with_capacity(order.len());

        for (key, record) in order {
            // A parent key is a prefix of its child's, so it sorts earlier.
            let parent = parent_path(&key).and_then(|p| by_key.get(p)).copied();
            let depth = parent.map_or(0, |p| tree.nodes[p.idx()].depth + 1);
            let idx = NodeIndex::new(tree.nodes.len());
            if parent.is_none() {
                tree.roots.push(idx);
            }
            tree.nodes.push(PathNode {
                name: CompactString::new(leaf_name(&records[record].path)),
                key: key.clone(),
                record,
                parent,
                depth,
            });
            by_key.insert(key, idx);
        }
        tree
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, idx: NodeIndex) -> &PathNode {
        &self.nodes[idx.idx()]
    }

    /// Deepest nodes first, ties broken by key. Every child precedes its
    /// parent.
    pub fn bottom_up_order(&self) -> Vec<NodeIndex> {
        let mut order: Vec<NodeIndex> = (0..self.nodes.len()).map(NodeIndex::new).collect();
        order.sort_by(|a, b| {
            let (na, nb) = (self.node(*a), self.node(*b));
            nb.depth.cmp(&na.depth).then_with(|| na.key.cmp(&nb.key))
        });
        order
    }
}
