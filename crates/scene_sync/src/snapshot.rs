// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph snapshot reader.
//!
//! Derives the display-oriented [`UiTreeNode`] forest from the engine graph.

use crate::engine::{NodeKind, SceneGraph, SceneNodeRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Snapshot errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// The same node was reached twice along one root-to-leaf path
    #[error("Cycle in scene graph at node {0}")]
    CyclicGraph(SceneNodeRef),
}

/// Presentation record for one row of the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiTreeNode {
    /// Node identity, also the UI key
    pub key: SceneNodeRef,
    /// Display name
    pub title: String,
    /// Engine visibility
    pub visible: bool,
    /// Whether the row carries a visibility icon
    pub show_visibility_toggle: bool,
    /// Node classification
    pub kind: NodeKind,
    /// Children in engine order
    pub children: Vec<UiTreeNode>,
}

impl UiTreeNode {
    /// Number of nodes in this subtree, including self
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Always false; a node is at least itself
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Find a node by key in this subtree, depth first
    pub fn find(&self, key: SceneNodeRef) -> Option<&UiTreeNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.key == key {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

impl Drop for UiTreeNode {
    // Flatten the subtree so a deep chain does not drop recursively
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Derive the UI forest for `roots`, preserving child order.
///
/// Roots or children the engine can no longer resolve are skipped.
pub fn snapshot<G>(graph: &G, roots: &[SceneNodeRef]) -> Result<Vec<UiTreeNode>, SnapshotError>
where
    G: SceneGraph + ?Sized,
{
    let mut path = HashSet::new();
    let mut forest = Vec::with_capacity(roots.len());
    for root in roots {
        if let Some(node) = visit(graph, *root, &mut path)? {
            forest.push(node);
        }
    }
    Ok(forest)
}

/// Snapshot every root the graph reports
pub fn snapshot_all<G>(graph: &G) -> Result<Vec<UiTreeNode>, SnapshotError>
where
    G: SceneGraph + ?Sized,
{
    snapshot(graph, &graph.roots())
}

enum Frame {
    Enter(SceneNodeRef),
    Exit,
}

/// Build one root's subtree with an explicit work stack.
///
/// `path` holds the nodes between the root and the one being entered; a
/// node already on it closes a cycle.
fn visit<G>(
    graph: &G,
    root: SceneNodeRef,
    path: &mut HashSet<SceneNodeRef>,
) -> Result<Option<UiTreeNode>, SnapshotError>
where
    G: SceneGraph + ?Sized,
{
    let mut work = vec![Frame::Enter(root)];
    let mut open: Vec<UiTreeNode> = Vec::new();
    let mut built = None;

    while let Some(frame) = work.pop() {
        match frame {
            Frame::Enter(key) => {
                if !path.insert(key) {
                    return Err(SnapshotError::CyclicGraph(key));
                }

                let Some(info) = graph.resolve(key) else {
                    tracing::trace!("Skipping unresolvable node {key}");
                    path.remove(&key);
                    continue;
                };

                work.push(Frame::Exit);
                work.extend(info.children.iter().rev().map(|child| Frame::Enter(*child)));
                open.push(UiTreeNode {
                    key,
                    title: info.name,
                    visible: info.visible,
                    show_visibility_toggle: info.kind.shows_visibility_toggle(),
                    kind: info.kind,
                    children: Vec::with_capacity(info.children.len()),
                });
            }
            Frame::Exit => {
                let Some(node) = open.pop() else {
                    continue;
                };
                path.remove(&node.key);
                match open.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => built = Some(node),
                }
            }
        }
    }

    Ok(built)
}
