// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection bridge between the hierarchy and the engine.
//!
//! The engine holds the single source of truth for selection. A row click
//! only asks the engine to select; local state changes when the engine's
//! selection notification comes back. Handling a notification never calls
//! back into the engine, so the two channels cannot ping-pong.

use crate::engine::{EditorError, SceneEditor, SceneNodeRef};
use crate::events::{SelectionChanged, Subscription};
use crate::tree_sync::TreeSync;

/// Confirmed selection state as shown by the hierarchy
#[derive(Debug, Default)]
pub struct SelectionBridge {
    /// Engine-confirmed selection
    selected: Option<SceneNodeRef>,
}

impl SelectionBridge {
    /// Create with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a row click: forward to the engine, leave local state alone.
    ///
    /// Clicking a node the engine no longer has does nothing.
    pub fn click<E>(&self, editor: &mut E, key: SceneNodeRef) -> Result<(), EditorError>
    where
        E: SceneEditor + ?Sized,
    {
        if !editor.contains(key) {
            tracing::debug!("Ignoring click on stale node {key}");
            return Ok(());
        }
        editor.select(Some(key))
    }

    /// Ask the engine to clear its selection
    pub fn clear<E>(&self, editor: &mut E) -> Result<(), EditorError>
    where
        E: SceneEditor + ?Sized,
    {
        editor.select(None)
    }

    /// Apply an engine selection notification
    pub fn on_selection_changed(&mut self, node: Option<SceneNodeRef>, tree: &mut TreeSync) {
        self.selected = node;
        match node {
            Some(key) => tree.reveal_and_select(key),
            None => tree.cancel_pending_reveal(),
        }
        tracing::debug!("Selection confirmed: {:?}", node);
    }

    /// Apply every pending notification in order, returning how many
    pub fn sync_from(&mut self, events: &mut Subscription<SelectionChanged>, tree: &mut TreeSync) -> usize {
        let pending = events.drain();
        for event in &pending {
            self.on_selection_changed(event.node, tree);
        }
        pending.len()
    }

    /// Confirmed selection
    pub fn selected(&self) -> Option<SceneNodeRef> {
        self.selected
    }

    /// Selected keys as the tree widget expects them: empty or exactly one
    pub fn selected_keys(&self) -> Vec<SceneNodeRef> {
        self.selected.into_iter().collect()
    }

    /// Whether `key` is the confirmed selection
    pub fn is_selected(&self, key: SceneNodeRef) -> bool {
        self.selected == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NodeKind;
    use crate::memory::{EditorCall, MemoryScene};

    fn scene_with_nodes() -> (MemoryScene, SceneNodeRef, SceneNodeRef, SceneNodeRef) {
        let mut scene = MemoryScene::new();
        let root = scene.insert("Root", NodeKind::Container, None);
        let b = scene.insert("B", NodeKind::Container, Some(root));
        let c = scene.insert("C", NodeKind::Mesh, Some(b));
        (scene, root, b, c)
    }

    #[test]
    fn test_click_waits_for_engine_echo() {
        let (mut scene, root, b, c) = scene_with_nodes();
        let mut echoes = scene.events().object_selected.subscribe();
        let mut tree = TreeSync::default();
        tree.on_graph_changed(&scene).unwrap();
        let mut bridge = SelectionBridge::new();

        bridge.click(&mut scene, c).unwrap();
        assert_eq!(bridge.selected(), None);
        assert_eq!(scene.calls(), [EditorCall::Select(Some(c))]);

        assert_eq!(bridge.sync_from(&mut echoes, &mut tree), 1);
        assert_eq!(bridge.selected_keys(), vec![c]);
        assert!(tree.is_expanded(root));
        assert!(tree.is_expanded(b));
        assert_eq!(tree.scroll_target(), Some(c));
    }

    #[test]
    fn test_notification_never_calls_select() {
        let (mut scene, _, b, c) = scene_with_nodes();
        let mut tree = TreeSync::default();
        tree.on_graph_changed(&scene).unwrap();
        let mut bridge = SelectionBridge::new();

        bridge.on_selection_changed(Some(b), &mut tree);
        bridge.on_selection_changed(Some(c), &mut tree);
        bridge.on_selection_changed(None, &mut tree);

        assert!(scene.calls().is_empty());
        assert!(bridge.selected_keys().is_empty());
        // Still usable afterwards
        bridge.clear(&mut scene).unwrap();
        assert_eq!(scene.calls(), [EditorCall::Select(None)]);
    }

    #[test]
    fn test_selection_stays_single_valued() {
        let (mut scene, root, b, c) = scene_with_nodes();
        let mut echoes = scene.events().object_selected.subscribe();
        let mut tree = TreeSync::default();
        tree.on_graph_changed(&scene).unwrap();
        let mut bridge = SelectionBridge::new();

        for key in [root, c, b, c] {
            bridge.click(&mut scene, key).unwrap();
            assert!(bridge.selected_keys().len() <= 1);
        }
        bridge.on_selection_changed(Some(root), &mut tree);
        assert_eq!(bridge.selected_keys().len(), 1);
        bridge.sync_from(&mut echoes, &mut tree);
        assert_eq!(bridge.selected_keys(), vec![c]);
    }

    #[test]
    fn test_click_on_stale_node_is_noop() {
        let (mut scene, ..) = scene_with_nodes();
        let bridge = SelectionBridge::new();
        bridge.click(&mut scene, SceneNodeRef::new()).unwrap();
        assert!(scene.calls().is_empty());
    }

    #[test]
    fn test_selection_before_graph_change_still_reveals() {
        let (mut scene, root, b, _) = scene_with_nodes();
        let mut tree = TreeSync::default();
        tree.on_graph_changed(&scene).unwrap();
        let mut bridge = SelectionBridge::new();

        let fresh = SceneNodeRef::new();
        bridge.on_selection_changed(Some(fresh), &mut tree);
        assert_eq!(tree.scroll_target(), None);

        scene.insert_with_id(fresh, "Fresh", NodeKind::Light, Some(b));
        tree.on_graph_changed(&scene).unwrap();
        assert!(tree.is_expanded(root));
        assert!(tree.is_expanded(b));
        assert_eq!(tree.scroll_target(), Some(fresh));
        assert!(bridge.is_selected(fresh));
    }
}
