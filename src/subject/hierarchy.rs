//! Tree index over subject names.
//!
//! Each node is one segment of a subject path: `A.B.C` is three nested
//! nodes under the root. Nodes are created lazily as subjects are observed
//! or loaded, carry a selection flag (whether matching messages are shown),
//! an expansion flag (persisted for the UI), and the number of records
//! classified at exactly that node.
//!
//! # Storage
//!
//! Nodes live in a map keyed by [`NodeId`]. IDs are never reused, so an ID
//! held across a [`SubjectHierarchy::remove_all`] or a prune simply stops
//! resolving. Children are kept ordered by segment name.
//!
//! # Locking
//!
//! One reader/writer lock guards the whole tree. Lookups share it; every
//! structural change takes it exclusively for the full operation.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::{EventSubscriber, ProjectClosing};
use crate::identifiers::NodeId;
use crate::project::SubjectRecord;

use super::name::{SEPARATOR, SubjectName, validate_segment};

// ============================================================================
// SubjectNode
// ============================================================================

/// Point-in-time copy of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectNode {
    /// Node ID.
    pub id: NodeId,
    /// Segment name; empty for the root.
    pub name: String,
    /// Parent node; `None` for the root.
    pub parent: Option<NodeId>,
    /// Whether messages under this node are shown.
    pub selected: bool,
    /// Whether the node is expanded in the subject explorer.
    pub expanded: bool,
    /// Records classified at exactly this node.
    pub records_here: usize,
    /// Number of direct children.
    pub child_count: usize,
}

impl SubjectNode {
    /// Returns `true` if the node has no children.
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    /// Returns `true` if this is the root node.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ============================================================================
// Tree internals
// ============================================================================

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    selected: bool,
    expanded: bool,
    records: usize,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>, selected: bool) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            selected,
            expanded: true,
            records: 0,
        }
    }
}

#[derive(Debug)]
struct Tree {
    root: NodeId,
    nodes: FxHashMap<NodeId, Node>,
}

impl Tree {
    fn new() -> Self {
        let root = NodeId::next();
        let mut nodes = FxHashMap::default();
        nodes.insert(root, Node::new(String::new(), None, true));
        Self { root, nodes }
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| Error::node_not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or_else(|| Error::node_not_found(id))
    }

    /// Position of `name` among the children of `parent`: `Ok` if present.
    fn search_child(&self, parent: &Node, name: &str) -> std::result::Result<usize, usize> {
        parent
            .children
            .binary_search_by(|child| self.nodes[child].name.as_str().cmp(name))
    }

    fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(&parent)?;
        self.search_child(node, name).ok().map(|i| node.children[i])
    }

    /// Returns the child named `name`, creating it if absent.
    fn get_or_create(&mut self, parent: NodeId, name: &str, selected: bool) -> Result<NodeId> {
        let position = self.search_child(self.node(parent)?, name);
        match position {
            Ok(i) => Ok(self.nodes[&parent].children[i]),
            Err(i) => {
                let id = NodeId::next();
                self.nodes
                    .insert(id, Node::new(name.to_owned(), Some(parent), selected));
                self.node_mut(parent)?.children.insert(i, id);
                debug!(node = %id, name, parent = %parent, "Subject node created");
                Ok(id)
            }
        }
    }

    /// Walks `subject` from the root, creating missing nodes with the
    /// parent's selection.
    fn insert_path(&mut self, subject: &SubjectName) -> NodeId {
        let mut current = self.root;
        for segment in subject.segments() {
            let selected = self.nodes[&current].selected;
            if let Ok(id) = self.get_or_create(current, segment, selected) {
                current = id;
            }
        }
        current
    }

    fn find_path(&self, subject: &SubjectName) -> Option<NodeId> {
        subject
            .segments()
            .iter()
            .try_fold(self.root, |node, segment| self.child(node, segment))
    }

    /// Removes `id` and its subtree from the map. Does not touch the parent.
    fn drop_subtree(&mut self, id: NodeId) -> usize {
        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    /// Node IDs in post-order (children before parents).
    fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.nodes[&id].children.iter().rev() {
                stack.push((*child, false));
            }
        }
        order
    }

    fn snapshot(&self, id: NodeId, node: &Node) -> SubjectNode {
        SubjectNode {
            id,
            name: node.name.clone(),
            parent: node.parent,
            selected: node.selected,
            expanded: node.expanded,
            records_here: node.records,
            child_count: node.children.len(),
        }
    }

    fn to_record(&self, id: NodeId) -> SubjectRecord {
        let node = &self.nodes[&id];
        SubjectRecord {
            name: node.name.clone(),
            selected: node.selected,
            expanded: node.expanded,
            children: node.children.iter().map(|c| self.to_record(*c)).collect(),
        }
    }

    /// Loads `record` and its subtree under `parent`.
    ///
    /// An invalid record is skipped with its subtree; its siblings still
    /// load. Returns `(created, skipped)`.
    fn load_record(&mut self, parent: NodeId, record: &SubjectRecord) -> (usize, usize) {
        let before = self.nodes.len();
        let id = match validate_segment(&record.name)
            .and_then(|()| self.get_or_create(parent, &record.name, record.selected))
        {
            Ok(id) => id,
            Err(e) => {
                warn!(subject = %record.name, error = %e, "Skipping subject record");
                return (0, 1);
            }
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            node.expanded = record.expanded;
        }

        let mut created = self.nodes.len() - before;
        let mut skipped = 0;
        for child in &record.children {
            let (c, s) = self.load_record(id, child);
            created += c;
            skipped += s;
        }
        (created, skipped)
    }
}

// ============================================================================
// SubjectHierarchy
// ============================================================================

/// Thread-safe subject tree.
///
/// # Example
///
/// ```ignore
/// let hierarchy = SubjectHierarchy::new();
/// let subject = SubjectName::parse("ORDERS.EU")?;
///
/// hierarchy.record_added(&subject);
/// assert_eq!(hierarchy.len(), 3); // root, ORDERS, EU
/// ```
pub struct SubjectHierarchy {
    tree: RwLock<Tree>,
}

impl Default for SubjectHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SubjectHierarchy - Structure
// ============================================================================

impl SubjectHierarchy {
    /// Creates a tree holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree::new()),
        }
    }

    /// Returns the root node ID.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.tree.read().root
    }

    /// Returns the child of `parent` named `name`, creating it with the given
    /// selection if absent. An existing node keeps its selection.
    ///
    /// # Errors
    ///
    /// - [`Error::NodeNotFound`] if `parent` does not exist
    /// - [`Error::InvalidSubject`] if `name` is not a valid segment
    pub fn get_subject_element(&self, parent: NodeId, name: &str, selected: bool) -> Result<NodeId> {
        validate_segment(name)?;
        self.tree.write().get_or_create(parent, name, selected)
    }

    /// Returns the node for `subject`, creating missing nodes.
    ///
    /// New nodes inherit their parent's selection.
    pub fn insert_subject(&self, subject: &SubjectName) -> NodeId {
        self.tree.write().insert_path(subject)
    }

    /// Returns the node for `subject` without creating anything.
    #[must_use]
    pub fn find(&self, subject: &SubjectName) -> Option<NodeId> {
        self.tree.read().find_path(subject)
    }

    /// Resets the tree to just the root.
    pub fn remove_all(&self) {
        let mut tree = self.tree.write();
        let root = tree.root;
        let children = tree
            .nodes
            .get_mut(&root)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        let removed: usize = children.into_iter().map(|c| tree.drop_subtree(c)).sum();
        if removed > 0 {
            info!(removed, "Subject tree reset");
        }
    }

    /// Detaches `node` and its subtree from the tree.
    ///
    /// Returns the number of nodes removed.
    ///
    /// # Errors
    ///
    /// - [`Error::RootNode`] if `node` is the root
    /// - [`Error::NodeNotFound`] if `node` does not exist
    pub fn remove_node_from_parent(&self, node: NodeId) -> Result<usize> {
        let mut tree = self.tree.write();
        let parent = tree.node(node)?.parent.ok_or(Error::RootNode)?;
        tree.node_mut(parent)?.children.retain(|c| *c != node);
        let removed = tree.drop_subtree(node);
        debug!(node = %node, removed, "Subject node removed");
        Ok(removed)
    }

    /// Removes every non-root node that has no records and no children left.
    ///
    /// Runs one post-order pass: children are decided before their parent,
    /// so a parent emptied by the pass is removed in the same pass.
    ///
    /// Returns the number of nodes removed.
    pub fn prune_empty(&self) -> usize {
        let mut tree = self.tree.write();
        let mut doomed: FxHashSet<NodeId> = FxHashSet::default();
        let mut order = Vec::new();

        for id in tree.post_order() {
            let node = &tree.nodes[&id];
            let is_leaf = node.children.iter().all(|c| doomed.contains(c));
            if node.parent.is_some() && is_leaf && node.records == 0 {
                doomed.insert(id);
                order.push(id);
            }
        }

        for id in &order {
            if let Some(node) = tree.nodes.remove(id)
                && let Some(parent) = node.parent
                && let Some(parent) = tree.nodes.get_mut(&parent)
            {
                parent.children.retain(|c| c != id);
            }
        }

        if !order.is_empty() {
            info!(removed = order.len(), "Pruned empty subjects");
        }
        order.len()
    }
}

// ============================================================================
// SubjectHierarchy - Records
// ============================================================================

impl SubjectHierarchy {
    /// Classifies one record under `subject`, creating nodes as needed.
    pub fn record_added(&self, subject: &SubjectName) -> NodeId {
        let mut tree = self.tree.write();
        let id = tree.insert_path(subject);
        if let Ok(node) = tree.node_mut(id) {
            node.records += 1;
        }
        id
    }

    /// Declassifies one record. Returns `false` if no record was counted at
    /// `subject`.
    pub fn record_removed(&self, subject: &SubjectName) -> bool {
        let mut tree = self.tree.write();
        let Some(id) = tree.find_path(subject) else {
            return false;
        };
        match tree.node_mut(id) {
            Ok(node) if node.records > 0 => {
                node.records -= 1;
                true
            }
            _ => false,
        }
    }

    /// Sets every record count to zero, keeping the nodes.
    pub fn clear_records(&self) {
        for node in self.tree.write().nodes.values_mut() {
            node.records = 0;
        }
    }
}

// ============================================================================
// SubjectHierarchy - Selection
// ============================================================================

impl SubjectHierarchy {
    /// Sets the selection flag of one node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] if `node` does not exist.
    pub fn set_selected(&self, node: NodeId, selected: bool) -> Result<()> {
        self.tree.write().node_mut(node)?.selected = selected;
        Ok(())
    }

    /// Sets the expansion flag of one node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] if `node` does not exist.
    pub fn set_expanded(&self, node: NodeId, expanded: bool) -> Result<()> {
        self.tree.write().node_mut(node)?.expanded = expanded;
        Ok(())
    }

    /// Selects every node, breadth first from the root.
    pub fn select_all(&self) {
        let mut tree = self.tree.write();
        let mut queue = VecDeque::from([tree.root]);
        while let Some(id) = queue.pop_front() {
            if let Ok(node) = tree.node_mut(id) {
                node.selected = true;
                queue.extend(node.children.iter().copied());
            }
        }
    }

    /// Collapses every node except the root.
    pub fn collapse_all(&self) {
        let mut tree = self.tree.write();
        let root = tree.root;
        for (id, node) in &mut tree.nodes {
            node.expanded = *id == root;
        }
    }

    /// Returns whether messages on `subject` are shown.
    ///
    /// Uses the deepest existing node on the path; unknown subjects follow
    /// their closest known ancestor.
    #[must_use]
    pub fn is_shown(&self, subject: &SubjectName) -> bool {
        let tree = self.tree.read();
        let mut current = tree.root;
        for segment in subject.segments() {
            match tree.child(current, segment) {
                Some(child) => current = child,
                None => break,
            }
        }
        tree.nodes[&current].selected
    }
}

// ============================================================================
// SubjectHierarchy - Queries
// ============================================================================

impl SubjectHierarchy {
    /// Returns a copy of one node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<SubjectNode> {
        let tree = self.tree.read();
        tree.nodes.get(&id).map(|node| tree.snapshot(id, node))
    }

    /// Returns the children of `id` in name order; empty if `id` is unknown.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .read()
            .nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Returns the segment names from the root (exclusive) to `id`.
    #[must_use]
    pub fn path(&self, id: NodeId) -> Option<Vec<String>> {
        let tree = self.tree.read();
        let mut segments = Vec::new();
        let mut current = tree.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.clone());
            current = tree.nodes.get(&parent)?;
        }
        segments.reverse();
        Some(segments)
    }

    /// Returns the dotted subject for `id`; empty for the root.
    #[must_use]
    pub fn full_name(&self, id: NodeId) -> Option<String> {
        self.path(id)
            .map(|segments| segments.join(&*SEPARATOR.to_string()))
    }

    /// Returns the number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.read().nodes.len()
    }

    /// Returns `true` if only the root remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

// ============================================================================
// SubjectHierarchy - Persistence
// ============================================================================

impl SubjectHierarchy {
    /// Returns the root's children as persisted records.
    #[must_use]
    pub fn to_records(&self) -> Vec<SubjectRecord> {
        let tree = self.tree.read();
        tree.nodes[&tree.root]
            .children
            .iter()
            .map(|c| tree.to_record(*c))
            .collect()
    }

    /// Merges persisted records under the root.
    ///
    /// A record with an invalid name is skipped together with its subtree;
    /// the rest still load. Returns `(created, skipped)`.
    pub fn load_records(&self, records: &[SubjectRecord]) -> (usize, usize) {
        let mut tree = self.tree.write();
        let root = tree.root;
        let mut created = 0;
        let mut skipped = 0;
        for record in records {
            let (c, s) = tree.load_record(root, record);
            created += c;
            skipped += s;
        }
        (created, skipped)
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl EventSubscriber for SubjectHierarchy {
    fn on_project_closing(&self, _event: &ProjectClosing) {
        self.remove_all();
    }
}

impl fmt::Debug for SubjectHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectHierarchy")
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
