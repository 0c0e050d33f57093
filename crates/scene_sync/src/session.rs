// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session wiring.
//!
//! [`EditorSession`] owns the hierarchy state, the selection bridge, the
//! command gateway and the asset tracker together with their event
//! subscriptions. The host calls [`EditorSession::pump`] once per frame and
//! feeds UI input through [`EditorSession::apply`].

use crate::asset_tracker::{AssetLoadTracker, IndicatorEffect, ProgressEvent};
use crate::commands::{CommandGateway, DispatchOutcome};
use crate::config::SyncConfig;
use crate::engine::{NodeDescriptor, SceneEditor, SceneGraph, SceneNodeRef};
use crate::events::{GraphChanged, SceneEvents, SelectionChanged, Subscription};
use crate::selection::SelectionBridge;
use crate::snapshot::SnapshotError;
use crate::tree_sync::TreeSync;
use std::time::Instant;

/// Input coming from the hierarchy panel
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Row clicked
    Click(SceneNodeRef),
    /// Expander arrow clicked
    ToggleExpand(SceneNodeRef),
    /// Eye icon clicked
    ToggleVisibility(SceneNodeRef),
    /// Delete requested for a row
    Delete(SceneNodeRef),
    /// Row dropped onto another row
    Drop {
        /// Dragged row
        dragged: SceneNodeRef,
        /// Row it was dropped on
        target: SceneNodeRef,
    },
    /// Inline rename committed
    Rename {
        /// Renamed row
        node: SceneNodeRef,
        /// New display name
        name: String,
    },
    /// Entry picked from the add menu
    Add(NodeDescriptor),
    /// Search box edited
    Search(String),
    /// Expand every row
    ExpandAll,
    /// Collapse every row
    CollapseAll,
    /// Undo shortcut
    Undo,
    /// Redo shortcut
    Redo,
}

impl UiAction {
    /// Whether the action only touches local UI state
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::ToggleExpand(_) | Self::Search(_) | Self::ExpandAll | Self::CollapseAll
        )
    }
}

/// What one [`EditorSession::pump`] call did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PumpReport {
    /// Whether the tree was re-derived
    pub rederived: bool,
    /// Selection notifications applied
    pub selection_events: usize,
    /// Indicator changes for the UI
    pub effects: Vec<IndicatorEffect>,
}

impl PumpReport {
    /// Whether anything changed
    pub fn is_idle(&self) -> bool {
        !self.rederived && self.selection_events == 0 && self.effects.is_empty()
    }
}

/// Per-editor state and subscriptions
#[derive(Debug)]
pub struct EditorSession {
    tree: TreeSync,
    selection: SelectionBridge,
    gateway: CommandGateway,
    assets: AssetLoadTracker,
    graph_events: Subscription<GraphChanged>,
    selection_events: Subscription<SelectionChanged>,
    load_events: Subscription<ProgressEvent>,
    save_events: Subscription<ProgressEvent>,
}

impl EditorSession {
    /// Create a session subscribed to `events`
    pub fn new(config: &SyncConfig, events: &SceneEvents) -> Self {
        Self {
            tree: TreeSync::new(config.tree.clone()),
            selection: SelectionBridge::new(),
            gateway: CommandGateway::new(config.gateway.clone()),
            assets: AssetLoadTracker::new(config.assets.clone()),
            graph_events: events.graph_changed.subscribe(),
            selection_events: events.object_selected.subscribe(),
            load_events: events.load_progress.subscribe(),
            save_events: events.save_progress.subscribe(),
        }
    }

    /// Derive the tree from scratch, e.g. right after attaching
    pub fn refresh<G>(&mut self, graph: &G) -> Result<(), SnapshotError>
    where
        G: SceneGraph + ?Sized,
    {
        self.graph_events.drain();
        self.tree.on_graph_changed(graph)
    }

    /// Process every pending notification and advance indicator timers
    pub fn pump<G>(&mut self, graph: &G, now: Instant) -> Result<PumpReport, SnapshotError>
    where
        G: SceneGraph + ?Sized,
    {
        let mut report = PumpReport {
            rederived: self.tree.sync_from(graph, &mut self.graph_events)?,
            selection_events: self.selection.sync_from(&mut self.selection_events, &mut self.tree),
            effects: Vec::new(),
        };

        for event in self.load_events.drain().iter().chain(self.save_events.drain().iter()) {
            report.effects.extend(self.assets.on_event(event, now));
        }
        report.effects.extend(self.assets.tick(now));
        Ok(report)
    }

    /// Route one UI action. Local-only actions return `None`.
    pub fn apply<E>(&mut self, editor: &mut E, action: UiAction) -> Option<DispatchOutcome>
    where
        E: SceneEditor + ?Sized,
    {
        tracing::trace!("UI action {action:?}");
        match action {
            UiAction::Click(key) => {
                if !editor.contains(key) {
                    return Some(DispatchOutcome::Stale(key));
                }
                Some(match self.selection.click(editor, key) {
                    Ok(()) => DispatchOutcome::Issued,
                    Err(err) => {
                        tracing::warn!("Engine refused selection of {key}: {err}");
                        DispatchOutcome::Failed(err)
                    }
                })
            }
            UiAction::ToggleExpand(key) => {
                self.tree.toggle(key);
                None
            }
            UiAction::ToggleVisibility(key) => Some(self.gateway.toggle_visibility(editor, key)),
            UiAction::Delete(key) => Some(self.gateway.remove(editor, key)),
            UiAction::Drop { dragged, target } => Some(self.gateway.drop_onto(editor, dragged, target)),
            UiAction::Rename { node, name } => Some(self.gateway.rename(editor, node, name)),
            UiAction::Add(descriptor) => Some(self.gateway.add(editor, descriptor)),
            UiAction::Search(text) => {
                self.tree.set_search(text);
                None
            }
            UiAction::ExpandAll => {
                self.tree.expand_all();
                None
            }
            UiAction::CollapseAll => {
                self.tree.collapse_all();
                None
            }
            UiAction::Undo => Some(self.gateway.undo(editor)),
            UiAction::Redo => Some(self.gateway.redo(editor)),
        }
    }

    /// Hierarchy state
    pub fn tree(&self) -> &TreeSync {
        &self.tree
    }

    /// Mutable hierarchy state, e.g. to take the scroll target
    pub fn tree_mut(&mut self) -> &mut TreeSync {
        &mut self.tree
    }

    /// Confirmed selection
    pub fn selection(&self) -> &SelectionBridge {
        &self.selection
    }

    /// Command gateway
    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    /// Asset progress indicators
    pub fn assets(&self) -> &AssetLoadTracker {
        &self.assets
    }

    /// Mutable asset tracker, e.g. for task error callbacks
    pub fn assets_mut(&mut self) -> &mut AssetLoadTracker {
        &mut self.assets
    }
}
