// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hierarchy tree synchronization.
//!
//! [`TreeSync`] owns the UI-facing tree derived from the engine graph, the
//! set of expanded rows and the search-filtered view. It never edits the
//! tree in place: every engine change produces a fresh derivation.
//!
//! Any operation naming a key that is no longer in the base tree is a
//! silent no-op, since UI events and engine mutations race.

use crate::config::TreeConfig;
use crate::engine::{NodeKind, SceneGraph, SceneNodeRef};
use crate::events::{GraphChanged, Subscription};
use crate::snapshot::{self, SnapshotError, UiTreeNode};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Shared, immutable forest handed to the UI
pub type Forest = Arc<Vec<UiTreeNode>>;

/// A flattened, currently visible hierarchy row
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    /// Node identity
    pub key: SceneNodeRef,
    /// Display name
    pub title: String,
    /// Nesting depth, roots are 0
    pub depth: usize,
    /// Engine visibility
    pub visible: bool,
    /// Whether the row carries a visibility icon
    pub show_visibility_toggle: bool,
    /// Node classification
    pub kind: NodeKind,
    /// Whether the node has children in the current view
    pub has_children: bool,
    /// Whether the children are shown
    pub expanded: bool,
}

/// Keeps the hierarchy tree in step with the engine graph
#[derive(Debug)]
pub struct TreeSync {
    /// Last derived tree
    base: Forest,
    /// Search-filtered view, the same `Arc` as `base` when not searching
    view: Forest,
    /// Parent of every node in `base`, `None` for roots
    parents: HashMap<SceneNodeRef, Option<SceneNodeRef>>,
    /// Expanded rows
    expanded: HashSet<SceneNodeRef>,
    /// Rows folded by hand while search results are shown expanded
    search_collapsed: HashSet<SceneNodeRef>,
    /// Current search query
    search: String,
    /// Row the UI should scroll to next
    scroll_target: Option<SceneNodeRef>,
    /// Reveal requested before the node showed up in the tree
    pending_reveal: Option<SceneNodeRef>,
    /// Incremented on every derivation
    revision: u64,
    config: TreeConfig,
}

impl TreeSync {
    /// Create an empty tree
    pub fn new(config: TreeConfig) -> Self {
        let base: Forest = Arc::new(Vec::new());
        Self {
            view: Arc::clone(&base),
            base,
            parents: HashMap::new(),
            expanded: HashSet::new(),
            search_collapsed: HashSet::new(),
            search: String::new(),
            scroll_target: None,
            pending_reveal: None,
            revision: 0,
            config,
        }
    }

    /// Drain a burst of change notifications and re-derive at most once
    pub fn sync_from<G>(
        &mut self,
        graph: &G,
        changes: &mut Subscription<GraphChanged>,
    ) -> Result<bool, SnapshotError>
    where
        G: SceneGraph + ?Sized,
    {
        let burst = changes.drain();
        if burst.is_empty() {
            return Ok(false);
        }

        tracing::debug!(
            events = burst.len(),
            structural = burst.iter().any(|c| c.structural),
            "Coalesced graph changes"
        );
        self.on_graph_changed(graph)?;
        Ok(true)
    }

    /// Re-derive the base tree from the engine graph and republish
    pub fn on_graph_changed<G>(&mut self, graph: &G) -> Result<(), SnapshotError>
    where
        G: SceneGraph + ?Sized,
    {
        let forest = snapshot::snapshot_all(graph)?;

        let parents = index_parents(&forest);

        self.base = Arc::new(forest);
        self.parents = parents;
        self.revision += 1;

        // Drop expand state for nodes the engine no longer has
        let before = self.expanded.len();
        self.expanded.retain(|key| self.parents.contains_key(key));
        if self.expanded.len() != before {
            tracing::trace!("Pruned {} stale expanded keys", before - self.expanded.len());
        }
        self.search_collapsed.retain(|key| self.parents.contains_key(key));

        if self.scroll_target.is_some_and(|key| !self.contains(key)) {
            self.scroll_target = None;
        }

        self.refresh_view();

        if let Some(key) = self.pending_reveal {
            if self.contains(key) {
                self.reveal_and_select(key);
            }
        }

        tracing::debug!(
            revision = self.revision,
            nodes = self.parents.len(),
            "Hierarchy re-derived"
        );
        Ok(())
    }

    /// Change the search query and recompute the filtered view
    pub fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.search {
            return;
        }
        self.search = text;
        self.search_collapsed.clear();
        self.refresh_view();
    }

    /// Current search query
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Whether a search query is active
    pub fn is_searching(&self) -> bool {
        !self.search.is_empty()
    }

    /// The last derived, unfiltered tree
    pub fn base_tree(&self) -> &Forest {
        &self.base
    }

    /// The tree as displayed, after search filtering
    pub fn view(&self) -> &Forest {
        &self.view
    }

    /// Derivation counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `key` is in the base tree
    pub fn contains(&self, key: SceneNodeRef) -> bool {
        self.parents.contains_key(&key)
    }

    /// Parent of `key` in the base tree
    pub fn parent_of(&self, key: SceneNodeRef) -> Option<SceneNodeRef> {
        self.parents.get(&key).copied().flatten()
    }

    /// Ancestors of `key`, nearest first
    pub fn ancestors(&self, key: SceneNodeRef) -> Vec<SceneNodeRef> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_of(key);
        while let Some(parent) = current {
            // Derivation rejects cycles, so this terminates
            ancestors.push(parent);
            current = self.parent_of(parent);
        }
        ancestors
    }

    /// Currently expanded keys
    pub fn expanded_keys(&self) -> &HashSet<SceneNodeRef> {
        &self.expanded
    }

    /// Whether `key` is expanded
    pub fn is_expanded(&self, key: SceneNodeRef) -> bool {
        self.expanded.contains(&key)
    }

    /// Expand a row
    pub fn expand(&mut self, key: SceneNodeRef) {
        if !self.contains(key) {
            return;
        }
        self.expanded.insert(key);
    }

    /// Collapse a row, also forgetting expand state below it
    pub fn collapse(&mut self, key: SceneNodeRef) {
        if !self.contains(key) {
            return;
        }
        self.expanded.remove(&key);

        if !self.config.prune_descendants_on_collapse {
            return;
        }

        let Some(node) = find_in(&self.base, key) else {
            return;
        };
        for descendant in collect_keys(&node.children) {
            self.expanded.remove(&descendant);
        }
    }

    /// Expand if collapsed, collapse if expanded.
    ///
    /// While search results are shown expanded this folds or unfolds the
    /// row for the current query only and leaves the expanded set alone.
    pub fn toggle(&mut self, key: SceneNodeRef) {
        if self.forces_open() {
            if !self.contains(key) {
                return;
            }
            if !self.search_collapsed.remove(&key) {
                self.search_collapsed.insert(key);
            }
            return;
        }

        if self.is_expanded(key) {
            self.collapse(key);
        } else {
            self.expand(key);
        }
    }

    /// Expand every node that has children
    pub fn expand_all(&mut self) {
        self.expanded.extend(collect_parents(&self.base));
        self.search_collapsed.clear();
    }

    /// Collapse everything
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
        if self.forces_open() {
            self.search_collapsed.extend(collect_parents(&self.view));
        }
    }

    /// Expand every ancestor of `key` and schedule scrolling to it.
    ///
    /// Idempotent. If the node is not in the tree yet the request is kept and
    /// honored by the next derivation that contains it.
    pub fn reveal_and_select(&mut self, key: SceneNodeRef) {
        if !self.contains(key) {
            self.pending_reveal = Some(key);
            return;
        }

        self.pending_reveal = None;
        let ancestors = self.ancestors(key);
        for ancestor in &ancestors {
            self.search_collapsed.remove(ancestor);
        }
        self.expanded.extend(ancestors);
        self.scroll_target = Some(key);
    }

    /// Forget a reveal that is still waiting for its node
    pub fn cancel_pending_reveal(&mut self) {
        self.pending_reveal = None;
    }

    /// Row the UI should scroll to, if any
    pub fn scroll_target(&self) -> Option<SceneNodeRef> {
        self.scroll_target
    }

    /// Take the scroll request once the UI has acted on it
    pub fn take_scroll_target(&mut self) -> Option<SceneNodeRef> {
        self.scroll_target.take()
    }

    /// Flatten the view into the rows currently on screen.
    ///
    /// While searching, surviving nodes are shown expanded if configured,
    /// except rows folded by hand during this search.
    pub fn rows(&self) -> Vec<TreeRow> {
        let force_open = self.forces_open();
        let mut rows = Vec::new();
        let mut stack: Vec<(&UiTreeNode, usize)> = self.view.iter().rev().map(|node| (node, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            let has_children = !node.children.is_empty();
            let expanded = has_children
                && if force_open {
                    !self.search_collapsed.contains(&node.key)
                } else {
                    self.expanded.contains(&node.key)
                };
            rows.push(TreeRow {
                key: node.key,
                title: node.title.clone(),
                depth,
                visible: node.visible,
                show_visibility_toggle: node.show_visibility_toggle,
                kind: node.kind,
                has_children,
                expanded,
            });
            if expanded {
                stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
            }
        }
        rows
    }

    fn forces_open(&self) -> bool {
        self.is_searching() && self.config.auto_expand_on_search
    }

    fn refresh_view(&mut self) {
        self.view = if self.search.is_empty() {
            Arc::clone(&self.base)
        } else {
            Arc::new(filter_tree(&self.base, &self.search))
        };
    }
}

impl Default for TreeSync {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

enum Visit<'a> {
    Enter(&'a UiTreeNode),
    Exit(&'a UiTreeNode),
}

/// Keep nodes whose title contains `query` (case-sensitive) and their ancestors.
///
/// Post-order: each child's filtered subtree is computed before deciding
/// whether the parent survives.
pub fn filter_tree(nodes: &[UiTreeNode], query: &str) -> Vec<UiTreeNode> {
    let mut work: Vec<Visit<'_>> = nodes.iter().rev().map(Visit::Enter).collect();
    // Surviving children per open node; the bottom level collects the roots
    let mut kept: Vec<Vec<UiTreeNode>> = vec![Vec::new()];

    while let Some(step) = work.pop() {
        match step {
            Visit::Enter(node) => {
                work.push(Visit::Exit(node));
                work.extend(node.children.iter().rev().map(Visit::Enter));
                kept.push(Vec::new());
            }
            Visit::Exit(node) => {
                let children = kept.pop().unwrap_or_default();
                if children.is_empty() && !node.title.contains(query) {
                    continue;
                }
                if let Some(siblings) = kept.last_mut() {
                    siblings.push(UiTreeNode {
                        key: node.key,
                        title: node.title.clone(),
                        visible: node.visible,
                        show_visibility_toggle: node.show_visibility_toggle,
                        kind: node.kind,
                        children,
                    });
                }
            }
        }
    }

    kept.pop().unwrap_or_default()
}

fn index_parents(nodes: &[UiTreeNode]) -> HashMap<SceneNodeRef, Option<SceneNodeRef>> {
    let mut parents = HashMap::new();
    let mut stack: Vec<(&UiTreeNode, Option<SceneNodeRef>)> = nodes.iter().map(|node| (node, None)).collect();
    while let Some((node, parent)) = stack.pop() {
        parents.insert(node.key, parent);
        stack.extend(node.children.iter().map(|child| (child, Some(node.key))));
    }
    parents
}

fn find_in(nodes: &[UiTreeNode], key: SceneNodeRef) -> Option<&UiTreeNode> {
    nodes.iter().find_map(|node| node.find(key))
}

fn collect_keys(nodes: &[UiTreeNode]) -> Vec<SceneNodeRef> {
    let mut keys = Vec::new();
    let mut stack: Vec<&UiTreeNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        keys.push(node.key);
        stack.extend(node.children.iter());
    }
    keys
}

/// Keys of every node with at least one child
fn collect_parents(nodes: &[UiTreeNode]) -> Vec<SceneNodeRef> {
    let mut keys = Vec::new();
    let mut stack: Vec<&UiTreeNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        if !node.children.is_empty() {
            keys.push(node.key);
            stack.extend(node.children.iter());
        }
    }
    keys
}
