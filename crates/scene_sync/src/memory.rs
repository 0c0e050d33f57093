// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory scene collaborator.
//!
//! A complete [`SceneEditor`] backed by a plain node map. It executes
//! commands, keeps undo/redo history, publishes change notifications on
//! [`SceneEvents`] and logs every command call it receives. Used by the
//! headless harness and by tests.

use crate::engine::{
    AttributePath, CommandSource, EditorError, InsertionPolicy, NodeDescriptor, NodeInfo, NodeKind,
    SceneEditor, SceneGraph, SceneNodeRef,
};
use crate::events::{GraphChanged, SceneEvents, SelectionChanged};
use crate::history::{History, HistoryError, Operation, StateSnapshot};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A command call received through [`SceneEditor`]
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    /// `select`
    Select(Option<SceneNodeRef>),
    /// `addObject`
    AddObject {
        /// Origin tag
        source: CommandSource,
        /// Requested node
        descriptor: NodeDescriptor,
    },
    /// `removeObject`
    RemoveObject {
        /// Origin tag
        source: CommandSource,
        /// Target node
        node: SceneNodeRef,
    },
    /// `moveObject`
    MoveObject {
        /// Dragged node
        dragged: SceneNodeRef,
        /// Drop target
        target: SceneNodeRef,
        /// Placement policy
        policy: InsertionPolicy,
    },
    /// `setValue`
    SetValue {
        /// Target node
        node: SceneNodeRef,
        /// Attribute address
        path: AttributePath,
        /// New value
        value: serde_json::Value,
    },
    /// `undo`
    Undo,
    /// `redo`
    Redo,
}

/// Stored node
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryNode {
    name: String,
    kind: NodeKind,
    visible: bool,
    parent: Option<SceneNodeRef>,
    children: Vec<SceneNodeRef>,
    /// Dotted attribute path to JSON text
    attributes: IndexMap<String, String>,
}

impl MemoryNode {
    fn new(name: impl Into<String>, kind: NodeKind, parent: Option<SceneNodeRef>) -> Self {
        Self {
            name: name.into(),
            kind,
            visible: true,
            parent,
            children: Vec::new(),
            attributes: IndexMap::new(),
        }
    }
}

/// The undoable part of the scene
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SceneData {
    nodes: IndexMap<SceneNodeRef, MemoryNode>,
}

impl SceneData {
    fn attach(&mut self, node: SceneNodeRef, data: MemoryNode) {
        let parent = data.parent;
        self.nodes.insert(node, data);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(node);
        }
    }

    /// Node and all of its descendants
    fn subtree(&self, node: SceneNodeRef) -> Vec<SceneNodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes.get(&current) {
                out.push(current);
                stack.extend(data.children.iter().copied());
            }
        }
        out
    }

    fn remove_subtree(&mut self, node: SceneNodeRef) -> Vec<SceneNodeRef> {
        let removed = self.subtree(node);
        if let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.retain(|c| *c != node);
            }
        }
        for id in &removed {
            self.nodes.shift_remove(id);
        }
        removed
    }
}

/// In-memory scene implementing the collaborator contract
#[derive(Debug)]
pub struct MemoryScene {
    data: SceneData,
    selected: Option<SceneNodeRef>,
    history: History,
    events: SceneEvents,
    calls: Vec<EditorCall>,
}

impl MemoryScene {
    /// Create an empty scene with its own channels
    pub fn new() -> Self {
        Self::with_events(SceneEvents::new())
    }

    /// Create an empty scene publishing on `events`
    pub fn with_events(events: SceneEvents) -> Self {
        Self {
            data: SceneData::default(),
            selected: None,
            history: History::new(),
            events,
            calls: Vec::new(),
        }
    }

    /// Notification channels of this scene
    pub fn events(&self) -> &SceneEvents {
        &self.events
    }

    /// Engine-internal insertion, outside the command layer
    pub fn insert(&mut self, name: impl Into<String>, kind: NodeKind, parent: Option<SceneNodeRef>) -> SceneNodeRef {
        let id = SceneNodeRef::new();
        self.insert_with_id(id, name, kind, parent);
        id
    }

    /// Engine-internal insertion with a chosen identity
    pub fn insert_with_id(
        &mut self,
        id: SceneNodeRef,
        name: impl Into<String>,
        kind: NodeKind,
        parent: Option<SceneNodeRef>,
    ) {
        let parent = parent.filter(|p| self.data.nodes.contains_key(p));
        self.data.attach(id, MemoryNode::new(name, kind, parent));
        self.publish_graph(true);
    }

    /// Engine-internal removal of a subtree, outside the command layer
    pub fn detach(&mut self, node: SceneNodeRef) {
        if self.data.remove_subtree(node).is_empty() {
            return;
        }
        self.fix_selection();
        self.publish_graph(true);
    }

    /// Every command call received so far
    pub fn calls(&self) -> &[EditorCall] {
        &self.calls
    }

    /// Forget the call log
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Engine-side selection
    pub fn selected(&self) -> Option<SceneNodeRef> {
        self.selected
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Value of an attribute set through `set_value`
    pub fn attribute(&self, node: SceneNodeRef, path: &AttributePath) -> Option<serde_json::Value> {
        let text = self.data.nodes.get(&node)?.attributes.get(&path.to_string())?;
        serde_json::from_str(text).ok()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.data.nodes.len()
    }

    /// Whether the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.data.nodes.is_empty()
    }

    fn publish_graph(&self, structural: bool) {
        self.events.graph_changed.publish(GraphChanged { structural });
    }

    fn publish_selection(&self) {
        self.events
            .object_selected
            .publish(SelectionChanged { node: self.selected });
    }

    /// Clear the selection if its node is gone
    fn fix_selection(&mut self) {
        if self.selected.is_some_and(|n| !self.data.nodes.contains_key(&n)) {
            self.selected = None;
            self.publish_selection();
        }
    }

    /// Run `mutate` and record it as one undoable operation
    fn record<F>(&mut self, description: String, source: CommandSource, mutate: F) -> Result<(), EditorError>
    where
        F: FnOnce(&mut SceneData) -> Result<(), EditorError>,
    {
        let before = StateSnapshot::from_value(&self.data).map_err(history_error)?;
        mutate(&mut self.data)?;
        let after = StateSnapshot::from_value(&self.data).map_err(history_error)?;
        self.history.commit(Operation {
            description,
            source,
            before,
            after,
        });
        Ok(())
    }

    fn restore(&mut self, snapshot: &StateSnapshot) -> Result<(), EditorError> {
        self.data = snapshot.to_value().map_err(history_error)?;
        self.fix_selection();
        self.publish_graph(true);
        Ok(())
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph for MemoryScene {
    fn roots(&self) -> Vec<SceneNodeRef> {
        self.data
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    fn resolve(&self, node: SceneNodeRef) -> Option<NodeInfo> {
        self.data.nodes.get(&node).map(|data| NodeInfo {
            name: data.name.clone(),
            kind: data.kind,
            visible: data.visible,
            children: data.children.clone(),
        })
    }

    fn contains(&self, node: SceneNodeRef) -> bool {
        self.data.nodes.contains_key(&node)
    }
}

impl SceneEditor for MemoryScene {
    fn select(&mut self, node: Option<SceneNodeRef>) -> Result<(), EditorError> {
        self.calls.push(EditorCall::Select(node));
        if let Some(node) = node {
            if !self.contains(node) {
                return Err(EditorError::NodeNotFound(node));
            }
        }
        self.selected = node;
        self.publish_selection();
        Ok(())
    }

    fn add_object(&mut self, source: CommandSource, object: NodeDescriptor) -> Result<(), EditorError> {
        self.calls.push(EditorCall::AddObject {
            source,
            descriptor: object.clone(),
        });

        let id = SceneNodeRef::new();
        let description = format!("Add {}", object.name);
        self.record(description, source, |data| {
            let mut node = MemoryNode::new(object.name.clone(), object.kind(), None);
            for (key, value) in &object.parameters {
                node.attributes.insert(key.clone(), serde_json::Value::from(*value).to_string());
            }
            data.attach(id, node);
            Ok(())
        })?;

        tracing::debug!("Added {} as {id}", object.name);
        self.publish_graph(true);
        // New objects become the active selection
        self.selected = Some(id);
        self.publish_selection();
        Ok(())
    }

    fn remove_object(&mut self, source: CommandSource, node: SceneNodeRef) -> Result<(), EditorError> {
        self.calls.push(EditorCall::RemoveObject { source, node });

        let name = match self.data.nodes.get(&node) {
            Some(data) => data.name.clone(),
            None => return Err(EditorError::NodeNotFound(node)),
        };
        self.record(format!("Remove {name}"), source, |data| {
            data.remove_subtree(node);
            Ok(())
        })?;

        self.fix_selection();
        self.publish_graph(true);
        Ok(())
    }

    fn move_object(
        &mut self,
        dragged: SceneNodeRef,
        target: SceneNodeRef,
        policy: InsertionPolicy,
    ) -> Result<(), EditorError> {
        self.calls.push(EditorCall::MoveObject {
            dragged,
            target,
            policy,
        });

        for node in [dragged, target] {
            if !self.contains(node) {
                return Err(EditorError::NodeNotFound(node));
            }
        }
        if self.data.subtree(dragged).contains(&target) {
            return Err(EditorError::Rejected(format!("{target} is inside {dragged}")));
        }

        self.record("Move Node".to_string(), CommandSource::Editor, |data| {
            let old_parent = data.nodes.get(&dragged).and_then(|n| n.parent);
            if let Some(old) = old_parent.and_then(|p| data.nodes.get_mut(&p)) {
                old.children.retain(|c| *c != dragged);
            }
            if let Some(node) = data.nodes.get_mut(&dragged) {
                node.parent = Some(target);
            }
            let Some(parent) = data.nodes.get_mut(&target) else {
                return Err(EditorError::NodeNotFound(target));
            };
            match policy {
                InsertionPolicy::AppendLast => parent.children.push(dragged),
                InsertionPolicy::Prepend => parent.children.insert(0, dragged),
            }
            Ok(())
        })?;

        self.publish_graph(true);
        Ok(())
    }

    fn set_value(
        &mut self,
        node: SceneNodeRef,
        path: &AttributePath,
        value: serde_json::Value,
    ) -> Result<(), EditorError> {
        self.calls.push(EditorCall::SetValue {
            node,
            path: path.clone(),
            value: value.clone(),
        });

        if !self.contains(node) {
            return Err(EditorError::NodeNotFound(node));
        }
        if path.is_empty() {
            return Err(EditorError::UnsupportedAttribute(path.clone()));
        }

        let invalid = |reason: &str| EditorError::InvalidValue {
            path: path.clone(),
            reason: reason.to_string(),
        };
        let description = format!("Set {path}");
        let segments: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        match segments.as_slice() {
            ["name"] => {
                let name = value.as_str().ok_or_else(|| invalid("expected a string"))?.to_string();
                self.record(description, CommandSource::Editor, |data| {
                    if let Some(n) = data.nodes.get_mut(&node) {
                        n.name = name;
                    }
                    Ok(())
                })?;
            }
            ["isVisible"] => {
                let visible = value.as_bool().ok_or_else(|| invalid("expected a boolean"))?;
                self.record(description, CommandSource::Editor, |data| {
                    if let Some(n) = data.nodes.get_mut(&node) {
                        n.visible = visible;
                    }
                    Ok(())
                })?;
            }
            _ => {
                let key = path.to_string();
                let text = value.to_string();
                self.record(description, CommandSource::Editor, |data| {
                    if let Some(n) = data.nodes.get_mut(&node) {
                        n.attributes.insert(key, text);
                    }
                    Ok(())
                })?;
            }
        }

        self.publish_graph(false);
        Ok(())
    }

    fn undo(&mut self) -> Result<(), EditorError> {
        self.calls.push(EditorCall::Undo);
        let snapshot = match self.history.undo() {
            Ok(op) => op.before.clone(),
            Err(HistoryError::NothingToUndo) => return Err(EditorError::NothingToUndo),
            Err(err) => return Err(history_error(err)),
        };
        self.restore(&snapshot)
    }

    fn redo(&mut self) -> Result<(), EditorError> {
        self.calls.push(EditorCall::Redo);
        let snapshot = match self.history.redo() {
            Ok(op) => op.after.clone(),
            Err(HistoryError::NothingToRedo) => return Err(EditorError::NothingToRedo),
            Err(err) => return Err(history_error(err)),
        };
        self.restore(&snapshot)
    }
}

fn history_error(err: HistoryError) -> EditorError {
    EditorError::Rejected(err.to_string())
}
